use crate::errors::ToolError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    code: i64,
    message: String,
    #[serde(skip_serializing_if = "Value::is_null", default)]
    data: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

pub fn ok(id: Value, result: Value) -> JsonRpcResponse {
    JsonRpcResponse {
        jsonrpc: "2.0".into(),
        id,
        result: Some(result),
        error: None,
    }
}

pub fn err(id: Value, code: i64, message: impl Into<String>) -> JsonRpcResponse {
    JsonRpcResponse {
        jsonrpc: "2.0".into(),
        id,
        result: None,
        error: Some(JsonRpcError {
            code,
            message: message.into(),
            data: Value::Null,
        }),
    }
}

fn text_result(text: String, is_error: bool) -> Value {
    json!({
      "content": [{ "type": "text", "text": text }],
      "isError": is_error
    })
}

/// Successful tool output: the backend payload, pretty-printed, as a single text block.
pub fn tool_ok(payload: &Value) -> Value {
    let text = serde_json::to_string_pretty(payload).unwrap_or_else(|_e| payload.to_string());
    text_result(text, false)
}

/// Failed tool output: the error message as plain text, flagged with `isError`.
pub fn tool_err(tool_error: ToolError) -> Value {
    text_result(tool_error.message, true)
}
