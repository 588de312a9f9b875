//! Session handlers: connect, inspect, register, update status, close.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router};

use crate::api::dto::{
    ConnectResponse, RegisterRequest, RegisterResponse, RegistrationDto, SessionInfoResponse,
    UpdateStatusRequest, UpdateStatusResponse,
};
use crate::app_state::AppState;
use crate::domain::{SessionId, SessionState};
use crate::error::{ErrorResponse, RegistryError};

/// `POST /sessions`: Open a session.
#[utoipa::path(
    post,
    path = "/api/v1/sessions",
    tag = "Sessions",
    summary = "Open a session",
    description = "Connects a new client session. Registration and status updates are scoped to it.",
    responses(
        (status = 201, description = "Session opened", body = ConnectResponse),
    )
)]
pub async fn connect(State(state): State<AppState>) -> impl IntoResponse {
    let session_id = state.registry_service.connect().await;
    (
        StatusCode::CREATED,
        Json(ConnectResponse {
            session_id,
            state: SessionState::Connected,
        }),
    )
}

/// `GET /sessions/:id`: Describe a session.
#[utoipa::path(
    get,
    path = "/api/v1/sessions/{id}",
    tag = "Sessions",
    summary = "Get session state",
    description = "Returns the lifecycle state and live registration of a session. Unknown sessions report `disconnected`.",
    params(
        ("id" = uuid::Uuid, Path, description = "Session UUID"),
    ),
    responses(
        (status = 200, description = "Session state", body = SessionInfoResponse),
    )
)]
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> impl IntoResponse {
    let info = state
        .registry_service
        .session_info(SessionId::from_uuid(id))
        .await;
    Json(SessionInfoResponse::from(info))
}

/// `DELETE /sessions/:id`: Close a session and deregister immediately.
#[utoipa::path(
    delete,
    path = "/api/v1/sessions/{id}",
    tag = "Sessions",
    summary = "Close a session",
    description = "Ends the session and removes its registration without waiting for expiry. Idempotent.",
    params(
        ("id" = uuid::Uuid, Path, description = "Session UUID"),
    ),
    responses(
        (status = 204, description = "Session closed"),
    )
)]
pub async fn close_session(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> impl IntoResponse {
    let _ = state
        .registry_service
        .close(SessionId::from_uuid(id))
        .await;
    StatusCode::NO_CONTENT
}

/// `POST /sessions/:id/register`: Register a daemon instance.
///
/// # Errors
///
/// Returns [`RegistryError`] if the session is not connected, the body or
/// metadata is malformed, or the key is already registered.
#[utoipa::path(
    post,
    path = "/api/v1/sessions/{id}/register",
    tag = "Sessions",
    summary = "Register a service instance",
    description = "Registers `service_name/instance_name` with immutable metadata. A session holds at most one live registration.",
    params(
        ("id" = uuid::Uuid, Path, description = "Session UUID"),
    ),
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registered", body = RegisterResponse),
        (status = 400, description = "Malformed names or metadata", body = ErrorResponse),
        (status = 404, description = "Session not connected", body = ErrorResponse),
        (status = 409, description = "Already registered", body = ErrorResponse),
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, RegistryError> {
    let Json(req) = payload?;
    let session_id = SessionId::from_uuid(id);
    let metadata = req.metadata.into_map()?;

    let key = state
        .registry_service
        .register(session_id, &req.service_name, &req.instance_name, metadata)
        .await?;

    let response = RegisterResponse {
        session_id,
        registration: RegistrationDto::from(&key),
        state: SessionState::Registered,
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// `PUT /sessions/:id/status`: Replace the status blob.
///
/// # Errors
///
/// Returns [`RegistryError`] if the body is malformed, the session is not
/// connected, or it holds no live registration.
#[utoipa::path(
    put,
    path = "/api/v1/sessions/{id}/status",
    tag = "Sessions",
    summary = "Update status",
    description = "Replaces the status of the session's registration and refreshes its liveness.",
    params(
        ("id" = uuid::Uuid, Path, description = "Session UUID"),
    ),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Status stored", body = UpdateStatusResponse),
        (status = 400, description = "Malformed status", body = ErrorResponse),
        (status = 404, description = "Session not connected", body = ErrorResponse),
        (status = 412, description = "Session not registered", body = ErrorResponse),
    )
)]
pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
    payload: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> Result<impl IntoResponse, RegistryError> {
    let Json(req) = payload?;
    let session_id = SessionId::from_uuid(id);
    let status = req.status.into_map()?;

    state
        .registry_service
        .update_status(session_id, status.clone())
        .await?;

    Ok(Json(UpdateStatusResponse { session_id, status }))
}

/// Session routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/sessions", post(connect))
        .route("/sessions/{id}", get(get_session).delete(close_session))
        .route("/sessions/{id}/register", post(register))
        .route("/sessions/{id}/status", put(update_status))
}
