//! Polling state coordinator between `sunxt-api` and host integrations.
//!
//! This crate owns the device lifecycle, the cached state, and the write
//! path for one SunEnergyXT storage unit:
//!
//! - **[`Coordinator`]**: Central facade. [`start()`](Coordinator::start)
//!   performs a first refresh, then spawns a poll task and a command
//!   processor. [`write()`](Coordinator::write) and
//!   [`execute()`](Coordinator::execute) push mutations to the device and
//!   patch local state once the device accepts them.
//!
//! - **[`StateStore`]**: Single owner of [`DeviceState`] and the time of the
//!   last successful poll, published through a `tokio::sync::watch` channel.
//!   Mutated only by wholesale replacement (poll) or per-key patch (write).
//!
//! - **[`StateStream`]**: Subscription handle exposing `current()` /
//!   `latest()` / `changed()` and a `Stream` adapter.
//!
//! - **[`Command`]**: Typed mutations (switch, number, text, press)
//!   routed through an `mpsc` channel to the command processor.
//!
//! - **[`points`]**: Per-key metadata and typed reads for control
//!   surfaces: scaling, precision, and numeric ranges.

pub mod command;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod model;
pub mod points;
pub mod store;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use command::{Command, CommandResult, WriteRequest};
pub use config::{CoordinatorConfig, DEFAULT_POLL_INTERVAL};
pub use coordinator::{Coordinator, CoordinatorEvent, CoordinatorStatus, RefreshOutcome};
pub use error::CoreError;
pub use model::{
    DerivationRule, DerivedField, DerivedFields, DeviceIdentity, DeviceState, StateValue,
};
pub use store::{StateSnapshot, StateStore};
pub use stream::{StateStream, StateWatchStream};

pub use sunxt_api::{RequestTimeouts, TransportConfig};
