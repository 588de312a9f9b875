//! # service-map
//!
//! Service registry with heartbeat liveness and TTL expiry.
//!
//! Daemons open a session, register one `service_name/instance_name` key
//! with immutable metadata, and then push status blobs. Each status update
//! refreshes the entry's liveness. A background scheduler evicts entries
//! that stay silent for longer than the TTL, and closing a session removes
//! its entry at once. Readers can dump the whole map over REST or follow
//! changes over a WebSocket.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP, WebSocket)
//!     │
//!     ├── REST Handlers (api/)
//!     ├── WS Handler (ws/)
//!     │
//!     ├── RegistryService (service/)
//!     ├── ExpiryScheduler (service/)
//!     ├── EventBus (domain/)
//!     │
//!     ├── SessionTable (domain/)
//!     └── RegistryStore (domain/)
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod openapi;
pub mod service;
pub mod ws;
