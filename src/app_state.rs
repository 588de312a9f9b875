//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::domain::EventBus;
use crate::service::RegistryService;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Registry service for all business logic.
    pub registry_service: Arc<RegistryService>,
    /// Event bus for WebSocket subscriptions.
    pub event_bus: EventBus,
}

impl AppState {
    /// Builds state around a service, sharing its event bus.
    #[must_use]
    pub fn new(registry_service: Arc<RegistryService>) -> Self {
        let event_bus = registry_service.event_bus().clone();
        Self {
            registry_service,
            event_bus,
        }
    }
}
