//! RPC error types and their HTTP rendering.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use credscore_engine::{CreditError, ErrorKind};
use credscore_utils::format_duration;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error(transparent)]
    Credit(#[from] CreditError),

    #[error("missing caller identity header")]
    MissingCaller,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("server error: {0}")]
    Server(String),
}

/// JSON body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
}

impl RpcError {
    pub fn status(&self) -> StatusCode {
        match self {
            RpcError::Credit(err) => credit_status(err),
            RpcError::MissingCaller => StatusCode::UNAUTHORIZED,
            RpcError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            RpcError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            RpcError::Credit(err) => err.code(),
            RpcError::MissingCaller => "missing_caller",
            RpcError::InvalidRequest(_) => "invalid_request",
            RpcError::Server(_) => "server",
        }
    }

    fn retry_after_secs(&self) -> Option<u64> {
        match self {
            RpcError::Credit(CreditError::RateLimited { retry_after_secs }) => Some(*retry_after_secs),
            _ => None,
        }
    }
}

fn credit_status(err: &CreditError) -> StatusCode {
    match err {
        CreditError::InvalidPayment { .. } => StatusCode::PAYMENT_REQUIRED,
        CreditError::Ownership(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => match err.kind() {
            ErrorKind::RetryLater => StatusCode::TOO_MANY_REQUESTS,
            ErrorKind::Permanent => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::NeedsAuthorization => StatusCode::FORBIDDEN,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        },
    }
}

impl IntoResponse for RpcError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(code = self.code(), "request failed: {self}");
        } else {
            tracing::debug!(code = self.code(), "request rejected: {self}");
        }

        let retry_after_secs = self.retry_after_secs();
        let message = match retry_after_secs {
            Some(secs) => format!("{self} ({})", format_duration(secs)),
            None => self.to_string(),
        };
        let body = ErrorBody {
            error: self.code(),
            message,
            retry_after_secs,
        };

        let mut response = (status, Json(body)).into_response();
        if let Some(secs) = retry_after_secs {
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use credscore_types::{Amount, Identity, ScoreDelta, TokenId};

    #[test]
    fn statuses_follow_error_taxonomy() {
        let cases = [
            (CreditError::RateLimited { retry_after_secs: 3 }, StatusCode::TOO_MANY_REQUESTS),
            (CreditError::RecordLocked(TokenId::FIRST), StatusCode::FORBIDDEN),
            (CreditError::AlreadyOwnsRecord(Identity::new("a")), StatusCode::CONFLICT),
            (CreditError::Unauthorized(Identity::new("a")), StatusCode::FORBIDDEN),
            (
                CreditError::DeltaOutOfRange { delta: ScoreDelta::new(11), max: 10 },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                CreditError::InvalidPayment { expected: Amount::new(5), got: Amount::new(4) },
                StatusCode::PAYMENT_REQUIRED,
            ),
            (CreditError::Snapshot("bad".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(RpcError::from(err).status(), status);
        }
        assert_eq!(RpcError::MissingCaller.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn rate_limited_sets_retry_after() {
        let response = RpcError::from(CreditError::RateLimited { retry_after_secs: 90 }).into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "90");
    }
}
