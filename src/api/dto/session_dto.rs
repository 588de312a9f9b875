//! Session DTOs: connect, register, status update, session info.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{KvMap, KvPayload, ServiceKey, SessionId, SessionState};
use crate::service::SessionInfo;

/// Response body for `POST /sessions` (201 Created).
#[derive(Debug, Serialize, ToSchema)]
pub struct ConnectResponse {
    /// New session identifier.
    pub session_id: SessionId,
    /// Always `connected`.
    pub state: SessionState,
}

/// A registration key as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RegistrationDto {
    /// Service (daemon type) name.
    pub service_name: String,
    /// Instance name.
    pub instance_name: String,
}

impl From<&ServiceKey> for RegistrationDto {
    fn from(key: &ServiceKey) -> Self {
        Self {
            service_name: key.service_name().to_string(),
            instance_name: key.instance_name().to_string(),
        }
    }
}

/// Response body for `GET /sessions/:id`.
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionInfoResponse {
    /// Session identifier.
    pub session_id: SessionId,
    /// Lifecycle state.
    pub state: SessionState,
    /// Live registration, if any.
    pub registration: Option<RegistrationDto>,
    /// Connection time; absent once disconnected.
    pub connected_at: Option<DateTime<Utc>>,
}

impl From<SessionInfo> for SessionInfoResponse {
    fn from(info: SessionInfo) -> Self {
        Self {
            session_id: info.session_id,
            state: info.state,
            registration: info.registration.as_ref().map(RegistrationDto::from),
            connected_at: info.connected_at,
        }
    }
}

/// Request body for `POST /sessions/:id/register`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    /// Service (daemon type) name, e.g. `"laundry"`.
    pub service_name: String,
    /// Instance name, unique within the service.
    pub instance_name: String,
    /// Metadata as a JSON object, `[key, value]` pairs, or a packed
    /// NUL-separated string.
    #[serde(default)]
    #[schema(value_type = Object)]
    pub metadata: KvPayload,
}

/// Response body for `POST /sessions/:id/register` (201 Created).
#[derive(Debug, Serialize, ToSchema)]
pub struct RegisterResponse {
    /// Registering session.
    pub session_id: SessionId,
    /// Registered key.
    pub registration: RegistrationDto,
    /// Session state after registering.
    pub state: SessionState,
}

/// Request body for `PUT /sessions/:id/status`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    /// New status as a JSON object, `[key, value]` pairs, or a packed
    /// NUL-separated string. Replaces the previous status wholesale.
    #[serde(default)]
    #[schema(value_type = Object)]
    pub status: KvPayload,
}

/// Response body for `PUT /sessions/:id/status`.
#[derive(Debug, Serialize, ToSchema)]
pub struct UpdateStatusResponse {
    /// Reporting session.
    pub session_id: SessionId,
    /// Status now stored for the registration.
    #[schema(value_type = Object)]
    pub status: KvMap,
}
