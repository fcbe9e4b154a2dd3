//! Extraction of the acting identity from request headers.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use credscore_types::Identity;

use crate::error::RpcError;

/// Header carrying the caller's identity.
pub const CALLER_HEADER: &str = "x-credscore-caller";

/// The identity on whose behalf a request acts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller(pub Identity);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = RpcError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(CALLER_HEADER)
            .ok_or(RpcError::MissingCaller)?
            .to_str()
            .map_err(|_| RpcError::InvalidRequest(format!("{CALLER_HEADER} is not valid ASCII")))?;
        let identity = raw
            .parse::<Identity>()
            .map_err(|e| RpcError::InvalidRequest(e.to_string()))?;
        Ok(Caller(identity))
    }
}
