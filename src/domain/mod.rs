//! Domain layer: identities, the service map store, sessions and events.
//!
//! This module contains the server-side domain model: the registration
//! key and entry types, the monotonic clock, the key/value payload codec,
//! the session table, the event bus for broadcasting map changes, and the
//! registry store that holds every live registration.

pub mod clock;
pub mod event_bus;
pub mod kv;
pub mod registry_event;
pub mod registry_store;
pub mod service_entry;
pub mod service_key;
pub mod session;
pub mod session_id;

pub use clock::{Clock, ManualClock, MonotonicClock, Timestamp};
pub use event_bus::EventBus;
pub use kv::{KvMap, KvPayload};
pub use registry_event::{RegistryEvent, RemovalReason};
pub use registry_store::{RegistryStore, Removed};
pub use service_entry::ServiceEntry;
pub use service_key::ServiceKey;
pub use session::{SessionState, SessionTable};
pub use session_id::SessionId;
