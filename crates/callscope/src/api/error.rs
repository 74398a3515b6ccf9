//! API error handling with structured responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::gong::GongError;

/// Message for unexpected failures that escape a handler.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// Error type for API handlers.
///
/// Client-facing messages are fixed per call site; whatever detail is safe
/// to share travels in the `details` field.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(&'static str),

    /// Required credentials are absent, so the upstream call was never made.
    #[error("{0}")]
    Unconfigured(&'static str),

    #[error("{message}")]
    Internal {
        message: &'static str,
        details: Option<String>,
    },

    /// Upstream rejection, relayed with its original status code.
    #[error("{message}")]
    Upstream {
        status: StatusCode,
        message: &'static str,
        details: String,
    },
}

impl ApiError {
    pub fn internal(message: &'static str) -> Self {
        Self::Internal {
            message,
            details: None,
        }
    }

    /// Map a Gong client failure, keeping the route's fixed message.
    ///
    /// Upstream rejections pass their status and body through; transport
    /// failures become a 500 with the failure as detail.
    pub fn gong(err: GongError, message: &'static str) -> Self {
        match err {
            GongError::Upstream { status, body } => Self::Upstream {
                status,
                message,
                details: body,
            },
            GongError::Transport(source) => Self::Internal {
                message: INTERNAL_ERROR_MESSAGE,
                details: Some(source.to_string()),
            },
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unconfigured(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Upstream { status, .. } => *status,
        }
    }

    fn details(&self) -> Option<&str> {
        match self {
            Self::BadRequest(_) | Self::Unconfigured(_) => None,
            Self::Internal { details, .. } => details.as_deref(),
            Self::Upstream { details, .. } => Some(details),
        }
    }
}

/// Structured error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.to_string();

        match &self {
            ApiError::BadRequest(_) => {
                debug!(message = %message, "client error");
            }
            ApiError::Unconfigured(_) => {
                error!(message = %message, "credentials not configured");
            }
            ApiError::Internal { details, .. } => {
                error!(message = %message, details = ?details, "API error");
            }
            ApiError::Upstream {
                status, details, ..
            } => {
                warn!(status = %status, details = %details, "upstream request failed");
            }
        }

        let body = ErrorResponse {
            error: message,
            details: self.details().map(str::to_string),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;
