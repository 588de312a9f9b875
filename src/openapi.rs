//! OpenAPI document for the REST surface, with an optional Swagger UI.

use axum::Router;
use utoipa::OpenApi;

use crate::api::dto::{
    ConnectResponse, RegisterRequest, RegisterResponse, RegistrationDto, ServiceDumpResponse,
    ServiceEntryDto, ServiceListResponse, ServiceSummaryDto, SessionInfoResponse,
    UpdateStatusRequest, UpdateStatusResponse,
};
use crate::api::handlers::system::HealthResponse;
use crate::app_state::AppState;
use crate::domain::{SessionId, SessionState, Timestamp};
use crate::error::{ErrorBody, ErrorResponse};

/// OpenAPI specification for the service-map API.
#[derive(Debug, OpenApi)]
#[openapi(
    paths(
        crate::api::handlers::system::health_handler,
        crate::api::handlers::session::connect,
        crate::api::handlers::session::get_session,
        crate::api::handlers::session::close_session,
        crate::api::handlers::session::register,
        crate::api::handlers::session::update_status,
        crate::api::handlers::service_map::dump,
        crate::api::handlers::service_map::list_services,
    ),
    components(
        schemas(
            ConnectResponse,
            RegisterRequest,
            RegisterResponse,
            RegistrationDto,
            SessionInfoResponse,
            UpdateStatusRequest,
            UpdateStatusResponse,
            ServiceDumpResponse,
            ServiceEntryDto,
            ServiceListResponse,
            ServiceSummaryDto,
            HealthResponse,
            SessionId,
            SessionState,
            Timestamp,
            ErrorResponse,
            ErrorBody,
        )
    ),
    tags(
        (name = "System", description = "Health check"),
        (name = "Sessions", description = "Session lifecycle, registration and status updates"),
        (name = "Service map", description = "Live registrations and per-service counts"),
    ),
    info(
        title = "service-map",
        description = "Service registry with heartbeat liveness and TTL expiry",
    )
)]
pub struct ApiDoc;

/// Router serving the OpenAPI JSON and, with the `swagger-ui` feature,
/// the interactive UI at `/swagger-ui`.
#[cfg(feature = "swagger-ui")]
pub fn routes() -> Router<AppState> {
    use utoipa_swagger_ui::SwaggerUi;

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

/// Router serving the OpenAPI JSON.
#[cfg(not(feature = "swagger-ui"))]
pub fn routes() -> Router<AppState> {
    use axum::Json;
    use axum::routing::get;

    Router::new().route(
        "/api-docs/openapi.json",
        get(|| async { Json(ApiDoc::openapi()) }),
    )
}
