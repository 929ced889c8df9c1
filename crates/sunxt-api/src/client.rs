// Device HTTP client
//
// Wraps `reqwest::Client` with device URL construction, per-request
// deadlines, status checking, and `state.reported` unwrapping. The
// client is cheap to clone; clones share the connection pool.

use std::net::IpAddr;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::models::{DeviceIdentity, ReportedState, WriteBody, extract_reported};
use crate::transport::{RequestTimeouts, TransportConfig};

/// Validate a user-supplied device address.
///
/// The device is addressed by IP on the local network; hostnames are
/// rejected here so that a typo fails before any request is made.
pub fn validate_address(input: &str) -> Result<IpAddr, Error> {
    input.trim().parse::<IpAddr>().map_err(|_| Error::InvalidAddress {
        input: input.to_owned(),
    })
}

/// Base URL for a device host (`http://{host}`), bracketing IPv6 literals.
pub fn device_base_url(host: &str) -> Result<Url, Error> {
    let host = host.trim();
    let authority = match host.parse::<IpAddr>() {
        Ok(IpAddr::V6(v6)) => format!("[{v6}]"),
        _ => host.to_owned(),
    };
    Ok(Url::parse(&format!("http://{authority}/"))?)
}

/// HTTP client for a single device's local API.
///
/// All methods apply their own deadline from [`RequestTimeouts`]; a
/// request that exceeds it is abandoned and reported as
/// [`Error::Timeout`].
#[derive(Debug, Clone)]
pub struct DeviceClient {
    http: reqwest::Client,
    base_url: Url,
    timeouts: RequestTimeouts,
}

impl DeviceClient {
    /// Create a client for `host` with a freshly built `reqwest::Client`.
    pub fn new(host: &str, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self {
            http,
            base_url: device_base_url(host)?,
            timeouts: RequestTimeouts::default(),
        })
    }

    /// Create a client on top of a shared, host-owned `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self {
            http,
            base_url,
            timeouts: RequestTimeouts::default(),
        }
    }

    /// Replace the per-request deadlines.
    pub fn with_timeouts(mut self, timeouts: RequestTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// The device base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── Endpoints ────────────────────────────────────────────────────

    /// `GET /read` and return the `state.reported` map.
    pub async fn read_state(&self) -> Result<ReportedState, Error> {
        self.read_with_deadline(self.timeouts.read).await
    }

    /// `POST /write` with `{"state": body}`.
    ///
    /// Succeeds on any 2xx. The response body is not interpreted.
    pub async fn write_state(&self, body: &WriteBody) -> Result<(), Error> {
        let url = self.endpoint("write")?;
        let deadline = self.timeouts.write;
        debug!(keys = ?body.state.keys().collect::<Vec<_>>(), "POST {}", url);

        let resp = self
            .http
            .post(url)
            .timeout(deadline)
            .json(body)
            .send()
            .await
            .map_err(|e| transport_error(e, deadline))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Http {
                status: status.as_u16(),
                body,
            });
        }
        trace!(%status, "write accepted");
        Ok(())
    }

    /// Read the serial number and model (`SN`, `DevType`) used to accept
    /// a device before a coordinator is created for it.
    pub async fn probe_identity(&self) -> Result<DeviceIdentity, Error> {
        let reported = self.read_with_deadline(self.timeouts.probe).await?;
        DeviceIdentity::from_reported(&reported)
    }

    // ── Request helpers ──────────────────────────────────────────────

    async fn read_with_deadline(&self, deadline: Duration) -> Result<ReportedState, Error> {
        let url = self.endpoint("read")?;
        debug!("GET {}", url);

        let resp = self
            .http
            .get(url)
            .timeout(deadline)
            .send()
            .await
            .map_err(|e| transport_error(e, deadline))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Http {
                status: status.as_u16(),
                body,
            });
        }

        let body = resp
            .text()
            .await
            .map_err(|e| transport_error(e, deadline))?;
        let value: Value = serde_json::from_str(&body).map_err(|e| {
            let preview: String = body.chars().take(200).collect();
            Error::Deserialization {
                message: format!("{e} (body preview: {preview:?})"),
                body: body.clone(),
            }
        })?;
        trace!(body = %body, "raw device state");

        extract_reported(value)
    }

    /// Build `{base}/{path}`.
    fn endpoint(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}/{path}"))?)
    }
}

fn transport_error(err: reqwest::Error, deadline: Duration) -> Error {
    if err.is_timeout() {
        Error::Timeout {
            timeout_ms: u64::try_from(deadline.as_millis()).unwrap_or(u64::MAX),
        }
    } else {
        Error::Transport(err)
    }
}
