//! Mapping of failed HTTP exchanges onto [`report_core::Error`]
//!
//! The backend reports failures as JSON `{"detail": ...}` (occasionally
//! `{"message": ...}`); proxies in front of it may answer with plain text or
//! an empty body.

use report_core::Error;
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;

/// Human message carried by an error response body.
///
/// `detail` wins over `message`; non-string values are rendered as JSON. A
/// body that is not a JSON object is used verbatim. Empty bodies fall back to
/// the reason phrase of `status`.
pub fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(Value::Object(fields)) = serde_json::from_str::<Value>(body) {
        let field = ["detail", "message"]
            .into_iter()
            .filter_map(|key| fields.get(key))
            .find(|value| !value.is_null() && value.as_str() != Some(""));
        if let Some(value) = field {
            return match value {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            };
        }
    }

    if !body.trim().is_empty() {
        return body.to_string();
    }

    status
        .canonical_reason()
        .map_or_else(|| format!("HTTP {}", status.as_u16()), str::to_string)
}

/// Error for a non-success response
pub fn status_error(status: StatusCode, body: &str) -> Error {
    let message = error_message(status, body);
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::Auth(message),
        _ => Error::Api {
            status: status.as_u16(),
            message,
        },
    }
}

/// Error for a request that produced no usable response
pub fn transport_error(operation: &str, bound: Duration, err: &reqwest::Error) -> Error {
    if err.is_timeout() {
        return Error::timeout(operation, bound);
    }
    Error::Transport(format!("{operation}: {err}"))
}
