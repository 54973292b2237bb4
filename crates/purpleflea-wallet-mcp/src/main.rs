#![expect(
    clippy::multiple_crate_versions,
    reason = "transitive dependency duplication"
)]

use clap::{Parser, Subcommand};
use eyre::Context as _;
use tracing_subscriber::prelude::*;

mod api;
mod cli_output;
mod config;
mod doctor;
mod errors;
mod paths;
mod rpc;

#[derive(Parser, Debug)]
#[command(name = "purpleflea-wallet-mcp", version)]
struct Cli {
    /// Defaults to `mcp` so agent configs can launch the bare binary.
    #[command(subcommand)]
    cmd: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the MCP server over stdio.
    Mcp,

    /// Print the `tools/list` payload (names, descriptions, input schemas) as JSON.
    Tools,

    /// Print resolved paths (useful for debugging).
    Paths,

    /// Print a quick self-diagnostic report (safe to paste; contains no secrets).
    Doctor {
        /// Emit JSON to stdout (machine-readable).
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

fn init_logging(paths: &paths::WalletMcpPaths) -> tracing_appender::non_blocking::WorkerGuard {
    let env_filter = tracing_subscriber::EnvFilter::from_default_env();
    let file_appender = tracing_appender::rolling::never(&paths.data_dir, paths.log_file_name());
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    // stdout carries JSON-RPC frames; logs go to stderr and the log file only.
    let stderr_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(std::io::stderr)
        .with_filter(env_filter.clone());
    let file_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(file_writer)
        .with_filter(env_filter);

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .init();

    guard
}

fn write_stdout_json(v: &serde_json::Value, what: &str) -> eyre::Result<()> {
    use std::io::Write as _;
    let s = serde_json::to_string_pretty(v).with_context(|| format!("serialize {what}"))?;
    writeln!(std::io::stdout().lock(), "{s}").with_context(|| format!("write {what}"))?;
    Ok(())
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    let paths = paths::WalletMcpPaths::discover()?;
    std::fs::create_dir_all(&paths.data_dir).context("create data dir")?;
    let _log_guard = init_logging(&paths);

    match cli.cmd.unwrap_or(Command::Mcp) {
        Command::Mcp => {
            let cfg = config::ConfigStore::new(&paths)
                .load()
                .context("load config")?;
            if cli_output::mcp_banner_enabled() {
                cli_output::print_mcp_banner(
                    env!("CARGO_PKG_VERSION"),
                    &cfg.api.base_url,
                    rpc::mcp_server::all_tools().count(),
                );
            }
            rpc::mcp_server::run(&cfg).await.context("mcp server failed")
        }
        Command::Tools => write_stdout_json(&rpc::mcp_server::list_tools_result(), "tool list"),
        Command::Paths => write_stdout_json(
            &serde_json::json!({
              "config_dir": paths.config_dir,
              "data_dir": paths.data_dir,
              "config_file": paths.config_file(),
              "log_file": paths.log_file,
            }),
            "paths",
        ),
        Command::Doctor { json } => doctor::run(json).context("doctor failed"),
    }
}
