//! Centralised helpers for user-facing CLI output written to stderr.

use std::io::{IsTerminal as _, Write as _};

pub const BANNER_ENV: &str = "WALLET_MCP_BANNER";

fn stderr_writeln(s: &str) {
    let mut stderr = std::io::stderr().lock();
    if stderr.write_all(s.as_bytes()).is_err() {
        return;
    }
    if stderr.write_all(b"\n").is_err() {
        return;
    }
    let _flush = stderr.flush();
}

fn banner_forced(v: &str) -> bool {
    let v = v.trim().to_ascii_lowercase();
    !(v.is_empty() || v == "0" || v == "false" || v == "no" || v == "off")
}

/// Show the banner only when stderr is a terminal, unless `WALLET_MCP_BANNER` says otherwise.
pub fn mcp_banner_enabled() -> bool {
    std::env::var(BANNER_ENV).map_or_else(
        |_e| std::io::stderr().is_terminal(),
        |v| banner_forced(&v),
    )
}

fn banner_text(version: &str, backend: &str, tool_count: usize) -> String {
    format!(
        "Purple Flea Wallet MCP\n======================\nVersion : v{version}\nBackend : {backend}\nTools   : {tool_count}\nMode    : stdio\n\nTip: if your agent can't connect, run `purpleflea-wallet-mcp doctor`."
    )
}

/// Print the MCP startup banner to stderr. stdout belongs to the protocol.
pub fn print_mcp_banner(version: &str, backend: &str, tool_count: usize) {
    stderr_writeln(&banner_text(version, backend, tool_count));
}
