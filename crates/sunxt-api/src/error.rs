use thiserror::Error;

/// Top-level error type for the `sunxt-api` crate.
///
/// Covers every failure mode of the device's local HTTP API: transport,
/// non-success responses, undecodable bodies, and identity probing.
/// `sunxt-core` maps these into its coordinator-level taxonomy.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, reset, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request exceeded its per-request deadline and was abandoned.
    #[error("Request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// The HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),

    // ── Device responses ────────────────────────────────────────────
    /// Non-2xx status. Carries the raw response body for diagnostics.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Body was not valid JSON (includes the empty-body case).
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    /// Body was JSON but `state.reported` is missing or not an object.
    #[error("Malformed device state: {reason}")]
    MalformedState { reason: String },

    // ── Device acceptance ───────────────────────────────────────────
    /// The configured host is not an IP address.
    #[error("Invalid device address: {input}")]
    InvalidAddress { input: String },

    /// `state.reported.SN` missing or not a string.
    #[error("Device did not report a serial number")]
    MissingSerial,

    /// `state.reported.DevType` missing or not a string.
    #[error("Device did not report a model")]
    MissingModel,
}

impl Error {
    /// Returns `true` if the device could not be reached at all
    /// (as opposed to answering with something unusable).
    pub fn is_connectivity(&self) -> bool {
        match self {
            Self::Transport(e) => e.status().is_none(),
            Self::Timeout { .. } => true,
            _ => false,
        }
    }

}

#[cfg(test)]
mod tests {
    use super::Error;

    #[test]
    fn timeout_counts_as_connectivity() {
        let err = Error::Timeout { timeout_ms: 10_000 };
        assert!(err.is_connectivity());
    }

    #[test]
    fn rejection_is_not_connectivity() {
        let err = Error::Http {
            status: 400,
            body: "bad key".into(),
        };
        assert!(!err.is_connectivity());
        assert_eq!(err.to_string(), "HTTP 400: bad key");
    }
}
