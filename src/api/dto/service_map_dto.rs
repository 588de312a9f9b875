//! Service-map DTOs for the dump and per-service summary.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{KvMap, ServiceEntry, SessionId, Timestamp};
use crate::service::{ServiceDump, ServiceSummary};

/// One live registration in a dump.
#[derive(Debug, Serialize, ToSchema)]
pub struct ServiceEntryDto {
    /// Service name.
    pub service_name: String,
    /// Instance name.
    pub instance_name: String,
    /// Registration metadata.
    #[schema(value_type = Object)]
    pub metadata: KvMap,
    /// Latest status.
    #[schema(value_type = Object)]
    pub status: KvMap,
    /// Monotonic milliseconds of the last registration or status update.
    pub last_seen: Timestamp,
    /// Wall-clock registration time.
    pub registered_at: DateTime<Utc>,
    /// Wall-clock time of the last status update.
    pub status_updated_at: Option<DateTime<Utc>>,
    /// Epoch at which the entry was created.
    pub start_epoch: u64,
    /// Owning session.
    pub owner: SessionId,
}

impl From<ServiceEntry> for ServiceEntryDto {
    fn from(entry: ServiceEntry) -> Self {
        Self {
            service_name: entry.key.service_name().to_string(),
            instance_name: entry.key.instance_name().to_string(),
            metadata: entry.metadata,
            status: entry.status,
            last_seen: entry.last_seen,
            registered_at: entry.registered_at,
            status_updated_at: entry.status_updated_at,
            start_epoch: entry.start_epoch,
            owner: entry.owner,
        }
    }
}

/// Response body for `GET /service-map`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ServiceDumpResponse {
    /// Service-map epoch of this snapshot.
    pub epoch: u64,
    /// Live entries in registration order.
    pub entries: Vec<ServiceEntryDto>,
}

impl From<ServiceDump> for ServiceDumpResponse {
    fn from(dump: ServiceDump) -> Self {
        Self {
            epoch: dump.epoch,
            entries: dump.entries.into_iter().map(ServiceEntryDto::from).collect(),
        }
    }
}

/// Live instance count for one service.
#[derive(Debug, Serialize, ToSchema)]
pub struct ServiceSummaryDto {
    /// Service name.
    pub service_name: String,
    /// Number of live instances.
    pub instances: usize,
}

impl From<ServiceSummary> for ServiceSummaryDto {
    fn from(summary: ServiceSummary) -> Self {
        Self {
            service_name: summary.service_name,
            instances: summary.instances,
        }
    }
}

/// Response body for `GET /services`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ServiceListResponse {
    /// Per-service counts, sorted by name.
    pub services: Vec<ServiceSummaryDto>,
    /// Sum of all instance counts.
    pub total_instances: usize,
}
