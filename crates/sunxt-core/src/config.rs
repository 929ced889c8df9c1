// ── Runtime coordinator configuration ──
//
// Describes *which* device to poll and at what cadence. Built by the
// host (or by `sunxt-config` from a profile) and handed in; the core
// never reads config files. Fixed for the life of a coordinator.

use std::time::Duration;

use sunxt_api::{RequestTimeouts, TransportConfig};

use crate::model::DerivedFields;

/// Default poll cadence.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Configuration for a single device coordinator.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Device IP address (or host, when built programmatically).
    pub host: String,
    /// Label used in log fields; typically the serial number.
    pub name: String,
    /// Time between poll ticks.
    pub poll_interval: Duration,
    /// Per-request deadlines (read 10s, write 5s, probe 5s).
    pub timeouts: RequestTimeouts,
    /// HTTP client settings, used only when the coordinator builds its
    /// own client.
    pub transport: TransportConfig,
    /// Companion keys written alongside certain keys.
    pub derived_fields: DerivedFields,
}

impl CoordinatorConfig {
    pub fn new(host: impl Into<String>) -> Self {
        let host = host.into();
        Self {
            name: host.clone(),
            host,
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeouts: RequestTimeouts::default(),
            transport: TransportConfig::default(),
            derived_fields: DerivedFields::default(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}
