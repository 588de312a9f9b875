//! Data Transfer Objects for REST request/response serialization.

pub mod service_map_dto;
pub mod session_dto;

pub use service_map_dto::*;
pub use session_dto::*;
