mod info;
mod schema;
mod swap;
mod wallet;

pub use schema::ToolSpec;

use serde_json::{json, Value};
use tracing::{debug, warn};

use super::jsonrpc::{err, ok, tool_err, tool_ok, JsonRpcResponse};
use crate::api::WalletApi;
use crate::errors::ToolError;

/// Every tool served over MCP, in catalogue order.
pub fn all_tools() -> impl Iterator<Item = &'static ToolSpec> {
    wallet::TOOLS
        .iter()
        .chain(swap::TOOLS)
        .chain(info::TOOLS)
}

pub fn find(name: &str) -> Option<&'static ToolSpec> {
    all_tools().find(|t| t.name == name)
}

pub fn list_tools_result() -> Value {
    let tools: Vec<Value> = all_tools().map(ToolSpec::descriptor).collect();
    json!({ "tools": tools })
}

/// Stateless lookup-and-dispatch table. Shared across concurrent calls.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    api: WalletApi,
}

impl ToolRegistry {
    pub const fn new(api: WalletApi) -> Self {
        Self { api }
    }

    /// Validate `args` against `spec`, run its single HTTP exchange, then reshape the payload if
    /// the tool asks for it.
    pub async fn invoke(&self, spec: &ToolSpec, args: Value) -> Result<Value, ToolError> {
        let args = spec.validate(args)?;
        debug!(tool = spec.name, "tool call");
        let payload = self.api.dispatch((spec.request)(&args)?).await?;
        match spec.reshape {
            Some(reshape) => Ok(reshape(&args, &payload)?),
            None => Ok(payload),
        }
    }
}

pub async fn handle_tools_call(
    req_id: Value,
    tool_name: &str,
    args: Value,
    registry: &ToolRegistry,
) -> JsonRpcResponse {
    let Some(spec) = find(tool_name) else {
        return err(req_id, -32601, "unknown tool");
    };
    match registry.invoke(spec, args).await {
        Ok(payload) => ok(req_id, tool_ok(&payload)),
        Err(te) => {
            warn!(tool = spec.name, code = te.code, error = %te.message, "tool call failed");
            ok(req_id, tool_err(te))
        }
    }
}
