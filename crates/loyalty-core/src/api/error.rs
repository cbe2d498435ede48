//! Error type for backend calls.

use serde_json::Value;

/// Result type for backend calls.
pub type ApiResult<T> = Result<T, ApiError>;

/// Failure of a backend call.
///
/// `Http` means the server answered with a non-2xx status; `Network` means it
/// could not be reached at all.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },
    #[error("could not reach server: {0}")]
    Network(String),
    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Builds an HTTP error, preferring the message carried by a JSON body.
    pub fn from_response(status: reqwest::StatusCode, body: &str) -> Self {
        let message = message_from_body(body).unwrap_or_else(|| status.to_string());
        Self::Http {
            status: status.as_u16(),
            message,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Network(_) | Self::Decode(_) => None,
        }
    }

    /// Server-provided (or fallback) message for HTTP errors.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Http { message, .. } => Some(message),
            Self::Network(_) | Self::Decode(_) => None,
        }
    }

    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Network(format!("request timed out: {err}"))
        } else {
            Self::Network(err.to_string())
        }
    }
}

/// Extracts a human-readable message from a JSON error body.
///
/// Accepts `{"message": "..."}`, `{"message": ["a", "b"]}`,
/// `{"error": {"message": "..."}}` and `{"error": "..."}`.
fn message_from_body(body: &str) -> Option<String> {
    let json: Value = serde_json::from_str(body).ok()?;

    let text = |value: &Value| -> Option<String> {
        match value {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Array(items) => {
                let parts: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
                (!parts.is_empty()).then(|| parts.join(", "))
            }
            _ => None,
        }
    };

    if let Some(msg) = json.get("message").and_then(text) {
        return Some(msg);
    }
    match json.get("error")? {
        Value::Object(obj) => obj.get("message").and_then(text),
        other => text(other),
    }
}
