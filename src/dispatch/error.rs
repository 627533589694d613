//! Dispatcher errors.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::routing::RouteError;

#[derive(Debug, Error)]
pub enum DispatchError {
    /// Mount patterns must end with '/'.
    #[error("mount pattern '{0}' must end with '/'")]
    InvalidMountPattern(String),

    #[error(transparent)]
    Route(#[from] RouteError),

    /// A request kept forwarding past the configured limit.
    #[error("forward limit of {limit} exceeded")]
    ForwardLimitExceeded { limit: usize },
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
    }
}
