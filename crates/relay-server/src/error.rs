//! Mapping of relay failures to HTTP responses.

use crate::metrics;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use notify_relay_core::RelayError;
use relay_protocol::ErrorBody;
use thiserror::Error;
use tracing::error;

/// Errors returned by HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Failure inside the relay core.
    #[error(transparent)]
    Relay(#[from] RelayError),

    /// Message body over the configured limit.
    #[error("Message exceeds the {limit} byte limit")]
    PayloadTooLarge {
        /// Configured limit.
        limit: usize,
    },

    /// Request body could not be understood.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl ApiError {
    /// Machine-readable error kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Relay(RelayError::NoSuchChannel(_)) => "no_such_channel",
            ApiError::Relay(RelayError::InvalidInput(_)) => "invalid_input",
            ApiError::Relay(RelayError::IdSpaceExhausted(_)) => "id_space_exhausted",
            ApiError::Relay(RelayError::Store(_)) => "store",
            ApiError::PayloadTooLarge { .. } => "payload_too_large",
            ApiError::BadRequest(_) => "bad_request",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::Relay(RelayError::NoSuchChannel(_)) => StatusCode::NOT_FOUND,
            ApiError::Relay(RelayError::InvalidInput(_)) | ApiError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Relay(RelayError::IdSpaceExhausted(_)) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Relay(RelayError::Store(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
            metrics::record_error(self.kind());
        }

        let mut body = ErrorBody::new(self.kind(), self.to_string());
        if let ApiError::Relay(err) = &self {
            if let Some(channel_id) = err.missing_channel() {
                body = body.with_channel(channel_id);
            }
        }

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (
                ApiError::from(RelayError::NoSuchChannel("x".into())),
                StatusCode::NOT_FOUND,
            ),
            (
                ApiError::from(RelayError::InvalidInput("bad")),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::from(RelayError::IdSpaceExhausted(5)),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                ApiError::PayloadTooLarge { limit: 5 },
                StatusCode::PAYLOAD_TOO_LARGE,
            ),
            (ApiError::BadRequest("nope".into()), StatusCode::BAD_REQUEST),
        ];

        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }
}
