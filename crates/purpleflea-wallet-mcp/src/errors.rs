use std::time::Duration;
use thiserror::Error;

/// A tool failure returned to the MCP client.
///
/// Only `message` reaches the client; `code` is for logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolError {
    pub code: &'static str,
    pub message: String,
}

impl ToolError {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Failure of a single outbound exchange with the wallet backend.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The backend answered with a non-2xx status.
    #[error("API {status}: {message}")]
    Http { status: u16, message: String },

    #[error("request timed out after {}s", .after.as_secs())]
    Timeout { after: Duration },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("backend returned a non-JSON body (status {status})")]
    InvalidBody { status: u16 },

    #[error("invalid request url: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Timeout { .. }
            | Self::Transport(_)
            | Self::InvalidBody { .. }
            | Self::InvalidUrl(_) => None,
        }
    }
}

/// Tool arguments rejected by the declared input schema.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ArgsError {
    #[error("arguments must be a JSON object")]
    NotAnObject,

    #[error("missing required parameter: {0}")]
    Missing(&'static str),

    #[error("parameter {name} must be a {expected}")]
    WrongType {
        name: &'static str,
        expected: &'static str,
    },

    #[error("unexpected parameter: {0}")]
    Unexpected(String),
}

impl From<ApiError> for ToolError {
    fn from(e: ApiError) -> Self {
        let code = match &e {
            ApiError::Http { .. } => "backend_error",
            ApiError::Timeout { .. } => "timeout",
            ApiError::Transport(_) => "transport_error",
            ApiError::InvalidBody { .. } => "invalid_response",
            ApiError::InvalidUrl(_) => "invalid_request",
        };
        Self::new(code, e.to_string())
    }
}

impl From<ArgsError> for ToolError {
    fn from(e: ArgsError) -> Self {
        Self::new("invalid_arguments", e.to_string())
    }
}
