use eyre::Context as _;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};

use crate::paths::WalletMcpPaths;

pub const DEFAULT_BASE_URL: &str = "https://wallet.purpleflea.com";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// Environment override for the backend base URL. Takes precedence over `config.toml`.
pub const BASE_URL_ENV: &str = "WALLET_API_URL";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BaseUrlSource {
    #[default]
    Default,
    ConfigFile,
    Env,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Wallet backend base URL. Request paths are resolved against it.
    pub base_url: String,
    /// Deadline for a single request, in seconds.
    pub timeout_seconds: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
        }
    }
}

impl ApiConfig {
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletMcpConfig {
    pub api: ApiConfig,

    /// Where `api.base_url` came from. Reported by `doctor`; never read from disk.
    #[serde(skip)]
    pub base_url_source: BaseUrlSource,
}

/// Apply environment overrides. `lookup` stands in for `std::env::var` so tests stay hermetic.
pub fn apply_env_overrides(cfg: &mut WalletMcpConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup(BASE_URL_ENV) {
        let t = v.trim();
        if !t.is_empty() {
            t.clone_into(&mut cfg.api.base_url);
            cfg.base_url_source = BaseUrlSource::Env;
        }
    }
}

fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(paths: &WalletMcpPaths) -> Self {
        Self {
            path: paths.config_file(),
        }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Read `config.toml` if present. A missing file yields defaults; nothing is written.
    pub fn load_file(&self) -> eyre::Result<WalletMcpConfig> {
        if !self.path.exists() {
            return Ok(WalletMcpConfig::default());
        }
        let s = fs::read_to_string(&self.path)
            .with_context(|| format!("read {}", self.path.display()))?;
        let mut cfg: WalletMcpConfig = toml::from_str(&s).context("parse config.toml")?;
        let raw: toml::Table = toml::from_str(&s).context("parse config.toml")?;
        if raw
            .get("api")
            .and_then(toml::Value::as_table)
            .is_some_and(|api| api.contains_key("base_url"))
        {
            cfg.base_url_source = BaseUrlSource::ConfigFile;
        }
        Ok(cfg)
    }

    /// Resolve the process configuration once: file, then environment.
    pub fn load(&self) -> eyre::Result<WalletMcpConfig> {
        self.load_with_env(process_env)
    }

    pub fn load_with_env(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> eyre::Result<WalletMcpConfig> {
        let mut cfg = self.load_file()?;
        apply_env_overrides(&mut cfg, lookup);
        if cfg.api.timeout_seconds == 0 {
            eyre::bail!("config invalid: api.timeout_seconds must be >= 1");
        }
        Ok(cfg)
    }
}
