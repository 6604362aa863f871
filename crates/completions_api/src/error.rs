use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompletionsApiError {
    #[error("missing API key")]
    MissingApiKey,

    #[error("invalid header {name}")]
    InvalidHeader { name: String },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),

    /// Non-success status or explicit `error` field; `message` carries the
    /// upstream error text verbatim.
    #[error("upstream error (status {status}): {message}")]
    Upstream { status: u16, message: String },

    #[error("response stream contained no decodable content")]
    EmptyResponse,

    #[error("no response chunk arrived within {0:?}")]
    Timeout(Duration),

    #[error("retry exhausted after max attempts (status: {status:?}, last_error: {last_error:?})")]
    RetryExhausted {
        status: Option<u16>,
        last_error: Option<String>,
    },

    #[error("request was cancelled")]
    Cancelled,

    #[error("{0}")]
    Unknown(String),
}

/// Error-bearing body shape: `{"error": "..."}` with a plain string, or an
/// object carrying a `message` field.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub error: Option<Value>,
}

/// Extract the upstream error message for a non-success response.
///
/// The `error` field's string value is surfaced verbatim. Bodies that fail to
/// parse fall back to the raw text, then to the canonical status reason.
pub fn parse_error_message(status: StatusCode, body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        match parsed.error {
            Some(Value::String(message)) if !message.is_empty() => return message,
            Some(Value::Object(fields)) => {
                if let Some(message) = fields.get("message").and_then(Value::as_str) {
                    if !message.is_empty() {
                        return message.to_string();
                    }
                }
            }
            _ => {}
        }
    }

    if body.trim().is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        body.to_string()
    }
}
