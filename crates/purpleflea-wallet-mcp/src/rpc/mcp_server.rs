use crate::{api::WalletApi, config::WalletMcpConfig};
use eyre::Context as _;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt as _, AsyncRead, AsyncWrite, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

mod jsonrpc;
mod tools;
mod transport;

pub use jsonrpc::{err, ok, JsonRpcResponse};
pub use tools::{all_tools, handle_tools_call, list_tools_result, ToolRegistry};

pub const MAX_JSONRPC_LINE_BYTES: usize = 1_000_000;

const RESPONSE_QUEUE: usize = 64;

#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    jsonrpc: String,
    id: Value,
    method: String,
    #[serde(default)]
    params: Value,
}

#[derive(Debug, Deserialize)]
struct JsonRpcNotification {
    jsonrpc: String,
}

fn handle_initialize(req_id: Value) -> JsonRpcResponse {
    ok(
        req_id,
        json!({
          "protocolVersion": "2025-06-18",
          "serverInfo": { "name": "purpleflea-wallet", "version": env!("CARGO_PKG_VERSION") },
          "capabilities": { "tools": {} }
        }),
    )
}

pub async fn run(cfg: &WalletMcpConfig) -> eyre::Result<()> {
    let api = WalletApi::new(&cfg.api).context("configure wallet api")?;
    info!(
        base_url = %api.base_url(),
        source = ?cfg.base_url_source,
        timeout_seconds = cfg.api.timeout_seconds,
        "mcp server starting"
    );
    serve(ToolRegistry::new(api), tokio::io::stdin(), tokio::io::stdout()).await
}

/// Serve MCP over newline-delimited JSON-RPC until `input` reaches EOF.
///
/// `tools/call` requests run concurrently, each on its own task; everything else is answered
/// inline. Responses reach `output` through a single writer task, so frames never interleave.
/// On EOF, in-flight calls are awaited and their responses flushed before returning.
pub async fn serve<R, W>(registry: ToolRegistry, input: R, output: W) -> eyre::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let registry = Arc::new(registry);
    let (tx, mut rx) = mpsc::channel::<JsonRpcResponse>(RESPONSE_QUEUE);
    let writer = tokio::spawn(async move {
        let mut output = output;
        while let Some(resp) = rx.recv().await {
            transport::write_frame(&mut output, &resp).await?;
        }
        Ok::<(), eyre::Report>(())
    });

    let mut calls = JoinSet::new();
    let mut lines = BufReader::new(input).lines();

    while let Some(line) = lines.next_line().await? {
        while let Some(done) = calls.try_join_next() {
            if let Err(e) = done {
                warn!(error = %e, "tool call task failed");
            }
        }

        if line.len() > MAX_JSONRPC_LINE_BYTES {
            warn!(bytes = line.len(), "jsonrpc line too long; closing session");
            break;
        }
        if line.trim().is_empty() {
            continue;
        }
        let v: Value = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "invalid json on stdin");
                continue;
            }
        };

        // Ignore notifications (no "id").
        if v.get("id").is_none() {
            if let Ok(note) = serde_json::from_value::<JsonRpcNotification>(v.clone()) {
                if note.jsonrpc == "2.0" {
                    continue;
                }
            }
        }

        let req: JsonRpcRequest = match serde_json::from_value(v) {
            Ok(parsed_req) => parsed_req,
            Err(e) => {
                warn!(error = %e, "failed to parse jsonrpc request");
                continue;
            }
        };

        let resp = if req.jsonrpc == "2.0" {
            debug!(method = %req.method, "jsonrpc request");
            match req.method.as_str() {
                "initialize" => handle_initialize(req.id),
                "ping" => ok(req.id, json!({})),
                "tools/list" => ok(req.id, list_tools_result()),
                "tools/call" => {
                    let name = req
                        .params
                        .get("name")
                        .and_then(Value::as_str)
                        .unwrap_or("")
                        .to_owned();
                    let args = req.params.get("arguments").cloned().unwrap_or(Value::Null);
                    let registry = Arc::clone(&registry);
                    let tx = tx.clone();
                    calls.spawn(async move {
                        let resp = handle_tools_call(req.id, &name, args, &registry).await;
                        if tx.send(resp).await.is_err() {
                            warn!(tool = %name, "stdout writer closed; dropping tool response");
                        }
                    });
                    continue;
                }
                _ => err(req.id, -32601, "method not found"),
            }
        } else {
            err(req.id, -32600, "invalid jsonrpc version")
        };

        if tx.send(resp).await.is_err() {
            break;
        }
    }

    while let Some(done) = calls.join_next().await {
        if let Err(e) = done {
            warn!(error = %e, "tool call task failed");
        }
    }
    drop(tx);
    writer.await.context("join stdout writer")??;
    info!("stdin closed; mcp server exiting");
    Ok(())
}
