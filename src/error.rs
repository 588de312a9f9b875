//! Registry error types with HTTP status code mapping.
//!
//! [`RegistryError`] is the central error type for the registry. Each
//! variant maps to an HTTP status code, a numeric error code, and the
//! negative errno a C client of the service map would see.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{ServiceKey, SessionId};

const EINVAL: i32 = 22;
const ENOTCONN: i32 = 107;
const EEXIST: i32 = 17;
const ENOENT: i32 = 2;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 2002,
///     "errno": -17,
///     "message": "already registered: laundry/pid42"
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code (see ranges on [`RegistryError`]).
    pub code: u32,
    /// Negative errno equivalent.
    pub errno: i32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Registry error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category          | HTTP Status                     |
/// |-----------|-------------------|---------------------------------|
/// | 1000–1999 | Validation        | 400 Bad Request                 |
/// | 2000–2999 | Session / Registry| 404 / 409 / 412                 |
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Malformed names or payload.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The session is unknown or already closed.
    #[error("session {0} is not connected")]
    NotConnected(SessionId),

    /// The key is already registered and has not been removed yet.
    #[error("already registered: {0}")]
    AlreadyRegistered(ServiceKey),

    /// The session holds no live registration.
    #[error("session {0} has no live registration")]
    NotRegistered(SessionId),

    /// No entry for the key in the store.
    #[error("service not found: {0}")]
    ServiceNotFound(ServiceKey),
}

impl RegistryError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::NotConnected(_) => 2001,
            Self::AlreadyRegistered(_) => 2002,
            Self::NotRegistered(_) => 2003,
            Self::ServiceNotFound(_) => 2004,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotConnected(_) | Self::ServiceNotFound(_) => StatusCode::NOT_FOUND,
            Self::AlreadyRegistered(_) => StatusCode::CONFLICT,
            Self::NotRegistered(_) => StatusCode::PRECONDITION_FAILED,
        }
    }

    /// Returns the negative errno a C client would receive.
    #[must_use]
    pub const fn errno(&self) -> i32 {
        match self {
            Self::InvalidRequest(_) => -EINVAL,
            Self::NotConnected(_) => -ENOTCONN,
            Self::AlreadyRegistered(_) => -EEXIST,
            Self::NotRegistered(_) | Self::ServiceNotFound(_) => -ENOENT,
        }
    }
}

impl From<JsonRejection> for RegistryError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidRequest(rejection.body_text())
    }
}

impl IntoResponse for RegistryError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                errno: self.errno(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}
