//! Uniform `{success, data?, error?}` response envelope.

use crate::workflow::services::{ErrorKind, WorkflowError, WorkflowResult};
use serde::{Deserialize, Serialize};
use tracing::error;

/// Error body of a failed response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Stable error code, e.g. `CONFLICT`.
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

impl ApiError {
    /// Creates an error body of the given kind.
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            code: kind.code().to_owned(),
            message: message.into(),
        }
    }
}

impl From<&WorkflowError> for ApiError {
    fn from(err: &WorkflowError) -> Self {
        let kind = err.kind();
        if kind == ErrorKind::Internal {
            error!(error = %err, "workflow request failed");
            return Self::new(kind, "internal error");
        }
        Self::new(kind, err.to_string())
    }
}

/// Response envelope shared by every endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    /// `true` when `data` is present.
    pub success: bool,
    /// Payload of a successful call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Reason of a failed call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

impl<T> ApiResponse<T> {
    /// Wraps a payload.
    #[must_use]
    pub const fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Wraps an error body.
    #[must_use]
    pub const fn failure(error: ApiError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
        }
    }

    /// HTTP status code matching the envelope.
    #[must_use]
    pub fn http_status(&self) -> u16 {
        self.error
            .as_ref()
            .and_then(|error| {
                [
                    ErrorKind::Validation,
                    ErrorKind::Forbidden,
                    ErrorKind::Conflict,
                    ErrorKind::NotFound,
                    ErrorKind::NoOpTransition,
                    ErrorKind::Internal,
                ]
                .into_iter()
                .find(|kind| kind.code() == error.code)
            })
            .map_or(200, ErrorKind::http_status)
    }
}

impl<T> From<WorkflowResult<T>> for ApiResponse<T> {
    fn from(result: WorkflowResult<T>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(err) => Self::failure(ApiError::from(&err)),
        }
    }
}
