//! Failure taxonomy for the API pipeline.
//!
//! Classification is kept free of side effects: turning a transport error or
//! a failed response into an [`ApiError`], and picking the message a user
//! should see, are plain functions. The client decides when to notify.

use serde_json::Value;
use thiserror::Error;

/// Shown when a failure carries no server-supplied `error` string.
pub const FALLBACK_MESSAGE: &str = "request failed";

#[derive(Debug, Error)]
pub enum ApiError {
    /// No response was received (DNS, connect, reset, body read).
    #[error("Network error: {source}")]
    Network {
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-2xx status.
    #[error("HTTP {status}: {message}")]
    Http {
        status: u16,
        /// Raw response body (lossy UTF-8).
        body: String,
        /// Message extracted from the body, or [`FALLBACK_MESSAGE`].
        message: String,
    },

    /// The request exceeded the client's timeout ceiling.
    #[error("Request timed out")]
    Timeout {
        #[source]
        source: reqwest::Error,
    },

    /// The caller cancelled the request.
    #[error("Request cancelled")]
    Cancelled,

    /// A 2xx response whose body did not match the expected payload type.
    #[error("Failed to decode response body: {source}")]
    Decode {
        #[source]
        source: serde_json::Error,
        body: String,
    },

    /// The request body could not be serialized; nothing was sent.
    #[error("Failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),

    /// The underlying HTTP client could not be built.
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl ApiError {
    /// Classify a reqwest error raised before a status was available.
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout { source: err }
        } else {
            ApiError::Network { source: err }
        }
    }

    /// Build the error for a non-success status and its body.
    pub fn from_status(status: u16, body: &[u8]) -> Self {
        ApiError::Http {
            status,
            body: String::from_utf8_lossy(body).into_owned(),
            message: extract_message(body),
        }
    }

    pub fn from_decode(source: serde_json::Error, body: &[u8]) -> Self {
        ApiError::Decode {
            source,
            body: String::from_utf8_lossy(body).into_owned(),
        }
    }

    /// The message to show the user, or `None` when nothing should be shown.
    ///
    /// Cancellation is caller-initiated, and encode/construction failures
    /// happen before anything is sent, so none of them produce a notification.
    pub fn notice(&self) -> Option<&str> {
        match self {
            ApiError::Http { message, .. } => Some(message.as_str()),
            ApiError::Network { .. } | ApiError::Timeout { .. } | ApiError::Decode { .. } => {
                Some(FALLBACK_MESSAGE)
            }
            ApiError::Cancelled | ApiError::Encode(_) | ApiError::Client(_) => None,
        }
    }

    /// HTTP status, when the server responded.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }
}

/// Pick the user-facing message out of a failure body.
///
/// A non-empty string field `error` in a JSON object wins; anything else
/// (empty body, non-JSON, missing or non-string field) gives
/// [`FALLBACK_MESSAGE`].
pub fn extract_message(body: &[u8]) -> String {
    serde_json::from_slice::<Value>(body)
        .ok()
        .as_ref()
        .and_then(|v| v.get("error"))
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| FALLBACK_MESSAGE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_message_uses_error_field() {
        assert_eq!(extract_message(br#"{"error":"invalid token"}"#), "invalid token");
    }

    #[test]
    fn test_extract_message_fallbacks() {
        assert_eq!(extract_message(b""), FALLBACK_MESSAGE);
        assert_eq!(extract_message(b"<html>Bad Gateway</html>"), FALLBACK_MESSAGE);
        assert_eq!(extract_message(br#"{"message":"nope"}"#), FALLBACK_MESSAGE);
        assert_eq!(extract_message(br#"{"error":""}"#), FALLBACK_MESSAGE);
        assert_eq!(extract_message(br#"{"error":{"code":3}}"#), FALLBACK_MESSAGE);
        assert_eq!(extract_message(br#"["error"]"#), FALLBACK_MESSAGE);
    }

    #[test]
    fn test_from_status_keeps_body_and_message() {
        let err = ApiError::from_status(401, br#"{"error":"invalid token"}"#);
        assert_eq!(err.status(), Some(401));
        assert!(err.is_unauthorized());
        assert_eq!(err.notice(), Some("invalid token"));
        assert!(matches!(err, ApiError::Http { ref body, .. } if body.contains("invalid token")));
        assert_eq!(err.to_string(), "HTTP 401: invalid token");
    }

    #[test]
    fn test_from_status_empty_body_uses_fallback() {
        let err = ApiError::from_status(500, b"");
        assert_eq!(err.notice(), Some(FALLBACK_MESSAGE));
        assert!(!err.is_unauthorized());
    }

    #[test]
    fn test_notice_per_variant() {
        assert_eq!(ApiError::Cancelled.notice(), None);

        let decode_err = serde_json::from_str::<u32>("\"x\"").unwrap_err();
        let err = ApiError::from_decode(decode_err, b"\"x\"");
        assert_eq!(err.notice(), Some(FALLBACK_MESSAGE));
        assert_eq!(err.status(), None);
    }
}
