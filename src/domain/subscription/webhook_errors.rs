//! Webhook boundary errors.
//!
//! Only failures that happen before an event is accepted live here. Once a
//! payload has been verified and parsed, handler failures are logged and the
//! delivery is acknowledged.

use axum::http::StatusCode;
use thiserror::Error;

/// Errors that reject a webhook delivery.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WebhookError {
    /// No `Stripe-Signature` header on the request.
    #[error("Missing signature header")]
    MissingSignature,

    /// No `v1` signature matched the payload.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Signature timestamp is older than the tolerance window.
    #[error("Timestamp out of range")]
    TimestampOutOfRange,

    /// Signature timestamp is in the future beyond clock skew tolerance.
    #[error("Invalid timestamp")]
    InvalidTimestamp,

    /// Signature header or JSON payload could not be parsed.
    #[error("Parse error: {0}")]
    ParseError(String),
}

impl WebhookError {
    /// Maps the error to an HTTP status code.
    ///
    /// All of these are 4xx: the provider should not redeliver a payload
    /// that failed authentication or parsing.
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::MissingSignature
            | WebhookError::InvalidSignature
            | WebhookError::TimestampOutOfRange => StatusCode::UNAUTHORIZED,
            WebhookError::InvalidTimestamp | WebhookError::ParseError(_) => {
                StatusCode::BAD_REQUEST
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authentication_failures_are_unauthorized() {
        assert_eq!(
            WebhookError::InvalidSignature.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            WebhookError::MissingSignature.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            WebhookError::TimestampOutOfRange.status_code(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn malformed_payload_is_bad_request() {
        let err = WebhookError::ParseError("expected value".to_string());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Parse error: expected value");
    }

    #[test]
    fn future_timestamp_is_bad_request() {
        assert_eq!(
            WebhookError::InvalidTimestamp.status_code(),
            StatusCode::BAD_REQUEST
        );
    }
}
