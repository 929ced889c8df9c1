// ── Command API ──
//
// All writes flow through a unified `Command` enum. Each variant lowers
// to a `WriteRequest`, which the coordinator's command processor sends
// to the device one at a time.

pub mod requests;

use crate::error::CoreError;
use crate::model::StateValue;

pub use requests::WriteRequest;

/// A command envelope sent through the command channel.
/// Contains the command and a oneshot response channel.
pub(crate) struct CommandEnvelope {
    pub command: Command,
    pub response_tx: tokio::sync::oneshot::Sender<Result<CommandResult, CoreError>>,
}

/// All user-initiated mutations of a device.
///
/// Range and domain checks are the caller's job: a `SetNumber` is sent
/// exactly as given. Use [`crate::points::clamp_number`] first.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Toggle a 0/1 flag.
    SetSwitch { key: String, on: bool },
    /// Set an integer parameter.
    SetNumber { key: String, value: i64 },
    /// Set a text parameter. Derived fields (e.g. `MD → MM`) are added.
    SetText { key: String, value: String },
    /// Momentary action such as a restart. Writes `1` and leaves the
    /// local state alone, since the device never reports it back.
    Press { key: String },
    /// Raw single-key write.
    Write(WriteRequest),
}

impl Command {
    pub fn key(&self) -> &str {
        match self {
            Self::SetSwitch { key, .. }
            | Self::SetNumber { key, .. }
            | Self::SetText { key, .. }
            | Self::Press { key } => key,
            Self::Write(request) => request.key(),
        }
    }

    /// Lower to the wire-level request.
    pub fn into_request(self) -> WriteRequest {
        match self {
            Self::SetSwitch { key, on } => WriteRequest::new(key, i64::from(on)),
            Self::SetNumber { key, value } => WriteRequest::new(key, value),
            Self::SetText { key, value } => WriteRequest::new(key, value),
            Self::Press { key } => WriteRequest::momentary(key, StateValue::Integer(1)),
            Self::Write(request) => request,
        }
    }
}

/// Terminal outcome of an accepted write.
///
/// Rejected and failed writes surface as `Err(CoreError::Protocol)` and
/// `Err(CoreError::Connectivity)` respectively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    /// Device accepted the write and these keys were patched locally.
    Applied { keys: Vec<String> },
    /// Device accepted a momentary write; nothing was patched.
    Sent,
}
