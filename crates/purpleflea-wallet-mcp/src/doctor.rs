use crate::{
    api::parse_base_url,
    config::{apply_env_overrides, BaseUrlSource, ConfigStore, WalletMcpConfig, BASE_URL_ENV},
    paths::{WalletMcpPaths, CONFIG_DIR_ENV, DATA_DIR_ENV},
    rpc::mcp_server::all_tools,
};
use eyre::Context as _;
use serde_json::json;
use std::path::PathBuf;

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty())
}

struct PathsReport {
    config_dir: PathBuf,
    data_dir: PathBuf,
    log_file: PathBuf,
}

struct ConfigReport {
    path: PathBuf,
    exists: bool,
    parse_ok: bool,
    error: Option<String>,
}

struct ApiReport {
    base_url: String,
    source: BaseUrlSource,
    valid: bool,
    error: Option<String>,
    timeout_seconds: u64,
}

struct DoctorReport {
    version: &'static str,
    paths: PathsReport,
    config: ConfigReport,
    api: ApiReport,
    tools: Vec<&'static str>,
    env: serde_json::Value,
}

fn collect_with_env(
    paths: &WalletMcpPaths,
    lookup: impl Fn(&str) -> Option<String>,
) -> DoctorReport {
    let store = ConfigStore::new(paths);
    let config_path = store.path().to_path_buf();
    let config_exists = config_path.exists();

    // A broken config file still gets a report; fall back to defaults for the api section.
    let (cfg, config_err) = match store.load_with_env(&lookup) {
        Ok(cfg) => (cfg, None),
        Err(e) => {
            let mut cfg = WalletMcpConfig::default();
            apply_env_overrides(&mut cfg, &lookup);
            (cfg, Some(format!("{e:#}")))
        }
    };

    let url_err = parse_base_url(&cfg.api.base_url).err().map(|e| e.to_string());

    let env = json!({
      BASE_URL_ENV: lookup(BASE_URL_ENV),
      CONFIG_DIR_ENV: lookup(CONFIG_DIR_ENV),
      DATA_DIR_ENV: lookup(DATA_DIR_ENV),
      "RUST_LOG": lookup("RUST_LOG"),
    });

    DoctorReport {
        version: env!("CARGO_PKG_VERSION"),
        paths: PathsReport {
            config_dir: paths.config_dir.clone(),
            data_dir: paths.data_dir.clone(),
            log_file: paths.log_file.clone(),
        },
        config: ConfigReport {
            path: config_path,
            exists: config_exists,
            parse_ok: config_err.is_none(),
            error: config_err,
        },
        api: ApiReport {
            valid: url_err.is_none(),
            error: url_err,
            source: cfg.base_url_source,
            timeout_seconds: cfg.api.timeout_seconds,
            base_url: cfg.api.base_url,
        },
        tools: all_tools().map(|t| t.name).collect(),
        env,
    }
}

fn print_json(out: &mut impl std::io::Write, r: &DoctorReport) -> eyre::Result<()> {
    let s = serde_json::to_string_pretty(&json!({
      "ok": r.config.parse_ok && r.api.valid,
      "version": r.version,
      "paths": {
        "config_dir": r.paths.config_dir,
        "data_dir": r.paths.data_dir,
        "log_file": r.paths.log_file,
      },
      "config": {
        "path": r.config.path,
        "exists": r.config.exists,
        "parse_ok": r.config.parse_ok,
        "error": r.config.error,
      },
      "api": {
        "base_url": r.api.base_url,
        "source": r.api.source,
        "valid": r.api.valid,
        "error": r.api.error,
        "timeout_seconds": r.api.timeout_seconds,
      },
      "tools": {
        "count": r.tools.len(),
        "names": r.tools,
      },
      "env": r.env,
      "hints": [
        "Point your agent's MCP config at: purpleflea-wallet-mcp mcp",
        "Set WALLET_API_URL (or [api].base_url in config.toml) to use a different backend.",
        "Credentials (service_key, api_key) are passed per tool call and never stored.",
      ]
    }))
    .context("serialize doctor json")?;
    writeln!(out, "{s}").context("write doctor json")?;
    Ok(())
}

fn print_human(out: &mut impl std::io::Write, r: &DoctorReport) -> eyre::Result<()> {
    writeln!(out, "Purple Flea Wallet MCP doctor (v{})", r.version).context("write header")?;
    writeln!(out).context("write newline")?;

    writeln!(out, "Paths:").context("write paths header")?;
    writeln!(out, "  config_dir: {}", r.paths.config_dir.display()).context("write paths")?;
    writeln!(out, "  data_dir:   {}", r.paths.data_dir.display()).context("write paths")?;
    writeln!(out, "  log_file:   {}", r.paths.log_file.display()).context("write paths")?;
    writeln!(out).context("write newline")?;

    writeln!(out, "Config:").context("write config header")?;
    writeln!(out, "  config.toml: {}", r.config.path.display()).context("write config")?;
    if !r.config.exists {
        writeln!(out, "  status: missing (defaults apply)").context("write config")?;
    } else if r.config.parse_ok {
        writeln!(out, "  status: ok").context("write config")?;
    } else {
        writeln!(out, "  status: invalid").context("write config")?;
        if let Some(e) = &r.config.error {
            let first = e.lines().next().unwrap_or("parse error");
            writeln!(out, "  error: {first}").context("write config")?;
        }
    }
    writeln!(out).context("write newline")?;

    writeln!(out, "Wallet API:").context("write api header")?;
    writeln!(out, "  base_url: {} ({:?})", r.api.base_url, r.api.source).context("write api")?;
    writeln!(out, "  timeout:  {}s", r.api.timeout_seconds).context("write api")?;
    match &r.api.error {
        None => writeln!(out, "  status: ok").context("write api")?,
        Some(e) => writeln!(out, "  status: invalid ({e})").context("write api")?,
    }
    writeln!(out).context("write newline")?;

    writeln!(out, "Tools ({}):", r.tools.len()).context("write tools header")?;
    writeln!(out, "  {}", r.tools.join(", ")).context("write tools")?;
    writeln!(out).context("write newline")?;

    writeln!(out, "Env:").context("write env header")?;
    for key in [BASE_URL_ENV, CONFIG_DIR_ENV, DATA_DIR_ENV, "RUST_LOG"] {
        writeln!(
            out,
            "  {key}: {:?}",
            r.env.get(key).and_then(serde_json::Value::as_str)
        )
        .context("write env")?;
    }
    Ok(())
}

pub fn run(as_json: bool) -> eyre::Result<()> {
    let paths = WalletMcpPaths::discover()?;
    let report = collect_with_env(&paths, env_opt);
    let mut out = std::io::stdout().lock();
    if as_json {
        print_json(&mut out, &report)?;
    } else {
        print_human(&mut out, &report)?;
    }
    Ok(())
}
