//! Service-map inspection: full dump and per-service summary.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::{ServiceDumpResponse, ServiceListResponse, ServiceSummaryDto};
use crate::app_state::AppState;

/// `GET /service-map`: Dump every live registration.
#[utoipa::path(
    get,
    path = "/api/v1/service-map",
    tag = "Service map",
    summary = "Dump the service map",
    description = "Returns every live registration with metadata, latest status and liveness stamp. Closed and expired entries never appear.",
    responses(
        (status = 200, description = "Service map snapshot", body = ServiceDumpResponse),
    )
)]
pub async fn dump(State(state): State<AppState>) -> impl IntoResponse {
    let dump = state.registry_service.dump().await;
    Json(ServiceDumpResponse::from(dump))
}

/// `GET /services`: Live instance count per service.
#[utoipa::path(
    get,
    path = "/api/v1/services",
    tag = "Service map",
    summary = "List services",
    description = "Returns the number of live instances for each registered service name.",
    responses(
        (status = 200, description = "Per-service counts", body = ServiceListResponse),
    )
)]
pub async fn list_services(State(state): State<AppState>) -> impl IntoResponse {
    let services: Vec<ServiceSummaryDto> = state
        .registry_service
        .summary()
        .await
        .into_iter()
        .map(ServiceSummaryDto::from)
        .collect();
    let total_instances = services.iter().map(|s| s.instances).sum();
    Json(ServiceListResponse {
        services,
        total_instances,
    })
}

/// Service-map routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/service-map", get(dump))
        .route("/services", get(list_services))
}
