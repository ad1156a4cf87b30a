//! HTTP error responses.
//!
//! Every service error becomes a JSON body `{code, message}` with a status
//! chosen by kind: validation 422, forbidden 403, not found 404, conflicts
//! and nothing-applied 409, store unavailable 503. A batch that applied
//! nothing also carries its report so the caller can roll back.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use tracing::warn;
use wire::ErrorCode;

use crate::services::access::AccessError;
use crate::services::batch::BatchError;
use crate::services::board::BoardError;
use crate::services::element::ElementError;
use crate::services::store::StoreError;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
    pub report: Option<serde_json::Value>,
}

impl ApiError {
    #[must_use]
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self { status, code, message: message.into(), report: None }
    }

    fn coded(status: StatusCode, err: &impl ErrorCode) -> Self {
        Self::new(status, err.error_code(), err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            warn!(status = %self.status, code = self.code, message = %self.message, "request failed");
        }
        let mut body = serde_json::json!({ "code": self.code, "message": self.message });
        if let Some(report) = self.report {
            body["report"] = report;
        }
        (self.status, Json(body)).into_response()
    }
}

// =============================================================================
// STATUS MAPPING
// =============================================================================

fn store_status(err: &StoreError) -> StatusCode {
    match err {
        StoreError::NotFound(_) => StatusCode::NOT_FOUND,
        StoreError::Conflict(_) => StatusCode::CONFLICT,
        StoreError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

fn access_status(err: &AccessError) -> StatusCode {
    match err {
        AccessError::BoardNotFound(_) | AccessError::ProjectNotFound(_) => StatusCode::NOT_FOUND,
        AccessError::Forbidden { .. } | AccessError::NotOwner => StatusCode::FORBIDDEN,
        AccessError::OwnerImmutable => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

impl From<AccessError> for ApiError {
    fn from(err: AccessError) -> Self {
        Self::coded(access_status(&err), &err)
    }
}

impl From<BoardError> for ApiError {
    fn from(err: BoardError) -> Self {
        let status = match &err {
            BoardError::Access(e) => access_status(e),
            BoardError::InvalidTitle(_) | BoardError::InvalidColor(_) => StatusCode::UNPROCESSABLE_ENTITY,
            // A wrong token must not reveal that the board exists.
            BoardError::ShareDenied(_) => StatusCode::NOT_FOUND,
            BoardError::Store(e) => store_status(e),
        };
        Self::coded(status, &err)
    }
}

impl From<ElementError> for ApiError {
    fn from(err: ElementError) -> Self {
        let status = match &err {
            ElementError::Empty
            | ElementError::TooMany { .. }
            | ElementError::Invalid { .. }
            | ElementError::UnknownChild { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ElementError::AlreadyExists(_) => StatusCode::CONFLICT,
            ElementError::Access(e) => access_status(e),
            ElementError::Store(e) => store_status(e),
        };
        Self::coded(status, &err)
    }
}

impl From<BatchError> for ApiError {
    fn from(err: BatchError) -> Self {
        let status = match &err {
            BatchError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            BatchError::Forbidden { .. } => StatusCode::FORBIDDEN,
            BatchError::BoardNotFound(_) => StatusCode::NOT_FOUND,
            BatchError::NothingApplied { .. } => StatusCode::CONFLICT,
            BatchError::Store(e) => store_status(e),
        };
        let mut api = Self::coded(status, &err);
        if let BatchError::NothingApplied { report } = &err {
            api.report = serde_json::to_value(report).ok();
        }
        api
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
