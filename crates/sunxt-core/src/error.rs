// ── Core error types ──
//
// Coordinator-level errors. Consumers never see reqwest errors or raw
// JSON failures directly; the `From<sunxt_api::Error>` impl folds them
// into the four conditions a host reacts to differently.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Device errors ────────────────────────────────────────────────
    /// Network unreachable, connection refused, or deadline exceeded.
    #[error("Cannot reach device: {reason}")]
    Connectivity { reason: String },

    /// Device answered with a non-2xx status.
    #[error("Device rejected request (HTTP {status}): {body}")]
    Protocol { status: u16, body: String },

    /// Read body was not JSON, or `state.reported` was missing or not an object.
    #[error("Malformed device state: {reason}")]
    MalformedState { reason: String },

    /// The first read after creation failed; the coordinator never came up.
    #[error("Device not ready: {source}")]
    NotReady { source: Box<CoreError> },

    // ── Acceptance errors ────────────────────────────────────────────
    #[error("Invalid device address: {input}")]
    InvalidAddress { input: String },

    /// The identity probe found no string `SN`.
    #[error("Device did not report a serial number (SN)")]
    MissingSerial,

    /// The identity probe found no string `DevType`.
    #[error("Device did not report a model (DevType)")]
    MissingModel,

    // ── Lifecycle errors ─────────────────────────────────────────────
    #[error("Coordinator is not running")]
    NotRunning,

    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// Wrap a first-refresh failure.
    pub(crate) fn not_ready(cause: CoreError) -> Self {
        Self::NotReady {
            source: Box::new(cause),
        }
    }

    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Connectivity { .. })
    }

    /// Status and body of a rejected request.
    pub fn rejection(&self) -> Option<(u16, &str)> {
        match self {
            Self::Protocol { status, body } => Some((*status, body.as_str())),
            _ => None,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<sunxt_api::Error> for CoreError {
    fn from(err: sunxt_api::Error) -> Self {
        match err {
            sunxt_api::Error::Transport(e) => CoreError::Connectivity {
                reason: e.to_string(),
            },
            sunxt_api::Error::Timeout { timeout_ms } => CoreError::Connectivity {
                reason: format!("request timed out after {timeout_ms}ms"),
            },
            sunxt_api::Error::Http { status, body } => CoreError::Protocol { status, body },
            sunxt_api::Error::Deserialization { message, body: _ } => {
                CoreError::MalformedState { reason: message }
            }
            sunxt_api::Error::MalformedState { reason } => CoreError::MalformedState { reason },
            sunxt_api::Error::InvalidAddress { input } => CoreError::InvalidAddress { input },
            sunxt_api::Error::MissingSerial => CoreError::MissingSerial,
            sunxt_api::Error::MissingModel => CoreError::MissingModel,
            sunxt_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            sunxt_api::Error::ClientBuild(message) => CoreError::Config { message },
        }
    }
}
