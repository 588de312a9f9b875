//! Service layer: business logic orchestration.
//!
//! [`RegistryService`] enforces session and uniqueness preconditions over
//! the [`crate::domain::RegistryStore`] and emits events through the
//! [`crate::domain::EventBus`]. [`ExpiryScheduler`] evicts registrations
//! whose TTL has lapsed.

pub mod expiry;
pub mod registry_service;

pub use expiry::ExpiryScheduler;
pub use registry_service::{RegistryService, ServiceDump, ServiceSummary, SessionInfo};
