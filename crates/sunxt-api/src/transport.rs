// Shared transport configuration for building reqwest::Client instances.
//
// The device speaks plain HTTP on the LAN, so the only knobs are the
// client-wide ceiling, connect timeout, and per-request deadlines.

use std::time::Duration;

/// Per-request deadlines for each endpoint.
///
/// Distinct from the poll interval: a read may take longer than one
/// interval, in which case the following ticks are skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTimeouts {
    /// `GET /read` during polling.
    pub read: Duration,
    /// `POST /write`.
    pub write: Duration,
    /// `GET /read` during device acceptance.
    pub probe: Duration,
}

impl Default for RequestTimeouts {
    fn default() -> Self {
        Self {
            read: Duration::from_secs(10),
            write: Duration::from_secs(5),
            probe: Duration::from_secs(5),
        }
    }
}

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Upper bound applied by the client to every request.
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(5),
            user_agent: concat!("sunxt/", env!("CARGO_PKG_VERSION")).into(),
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, crate::error::Error> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .connect_timeout(self.connect_timeout)
            .user_agent(self.user_agent.as_str())
            .build()
            .map_err(|e| crate::error::Error::ClientBuild(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_timeouts_match_device_cadence() {
        let t = RequestTimeouts::default();
        assert_eq!(t.read, Duration::from_secs(10));
        assert_eq!(t.write, Duration::from_secs(5));
        assert_eq!(t.probe, Duration::from_secs(5));
    }

    #[test]
    fn default_transport_builds() {
        assert!(TransportConfig::default().build_client().is_ok());
    }
}
