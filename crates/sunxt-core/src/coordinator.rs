// ── Coordinator ──
//
// Lifecycle management for one device: first refresh, periodic polling,
// sequential write processing, and change notification through the
// state store.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::{Mutex, broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use sunxt_api::{DeviceClient, validate_address};

use crate::command::{Command, CommandEnvelope, CommandResult, WriteRequest};
use crate::config::CoordinatorConfig;
use crate::error::CoreError;
use crate::model::{DeviceIdentity, DeviceState, StateValue};
use crate::store::StateStore;
use crate::stream::StateStream;

const COMMAND_CHANNEL_SIZE: usize = 16;
const EVENT_CHANNEL_SIZE: usize = 64;

// ── Status and events ────────────────────────────────────────────

/// Lifecycle state observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorStatus {
    Idle,
    Starting,
    Running,
    /// The first refresh failed. `start()` may be retried.
    NotReady,
    Stopped,
}

/// Change notifications published to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum CoordinatorEvent {
    /// A poll replaced the state.
    Refreshed { at: DateTime<Utc>, keys: usize },
    /// An accepted write patched these keys.
    Patched { keys: Vec<String> },
    /// One poll cycle failed; the previous state is retained.
    PollFailed { message: String },
}

/// Result of an on-demand refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Applied,
    /// Another fetch was already in flight.
    Skipped,
}

// ── Coordinator ──────────────────────────────────────────────────

/// The main entry point for hosts.
///
/// Cheaply cloneable via `Arc<CoordinatorInner>`. Owns the device's
/// state store; the HTTP client may be shared with the host.
#[derive(Clone)]
pub struct Coordinator {
    inner: Arc<CoordinatorInner>,
}

struct CoordinatorInner {
    config: CoordinatorConfig,
    client: DeviceClient,
    store: Arc<StateStore>,
    status: watch::Sender<CoordinatorStatus>,
    event_tx: broadcast::Sender<CoordinatorEvent>,
    command_tx: mpsc::Sender<CommandEnvelope>,
    command_rx: Mutex<Option<mpsc::Receiver<CommandEnvelope>>>,
    /// Held for the duration of a fetch; at most one is in flight.
    poll_gate: Mutex<()>,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Coordinator {
    /// Create a coordinator with its own HTTP client. Does NOT fetch --
    /// call [`start()`](Self::start).
    pub fn new(config: CoordinatorConfig) -> Result<Self, CoreError> {
        let client = DeviceClient::new(&config.host, &config.transport)?;
        Ok(Self::with_client(config, client))
    }

    /// Create a coordinator on top of a host-provided client. The
    /// client's deadlines are replaced by `config.timeouts`.
    pub fn with_client(config: CoordinatorConfig, client: DeviceClient) -> Self {
        let client = client.with_timeouts(config.timeouts);
        let (status, _) = watch::channel(CoordinatorStatus::Idle);
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);

        Self {
            inner: Arc::new(CoordinatorInner {
                config,
                client,
                store: Arc::new(StateStore::new()),
                status,
                event_tx,
                command_tx,
                command_rx: Mutex::new(Some(command_rx)),
                poll_gate: Mutex::new(()),
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Validate the address, probe the device's identity, and start a
    /// coordinator for it. The probe's serial becomes the log label.
    pub async fn accept(config: CoordinatorConfig) -> Result<(Self, DeviceIdentity), CoreError> {
        validate_address(&config.host)?;
        let client = DeviceClient::new(&config.host, &config.transport)?
            .with_timeouts(config.timeouts);
        let identity = client.probe_identity().await?;
        info!(serial = %identity.serial, model = %identity.model, host = %config.host, "device accepted");

        let config = config.with_name(identity.serial.clone());
        let coordinator = Self::with_client(config, client);
        coordinator.start().await?;
        Ok((coordinator, identity))
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &Arc<StateStore> {
        &self.inner.store
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Fetch once, then spawn the poll and command tasks.
    ///
    /// If that first fetch fails the coordinator does not come up: the
    /// error is returned as [`CoreError::NotReady`], no task is spawned,
    /// and the state stays empty. Calling `start()` on a running
    /// coordinator is a no-op.
    pub async fn start(&self) -> Result<(), CoreError> {
        // Concurrent starts queue here; the loser sees `Running`.
        let mut handles = self.inner.task_handles.lock().await;

        let current = *self.inner.status.borrow();
        match current {
            CoordinatorStatus::Running => return Ok(()),
            CoordinatorStatus::Stopped => return Err(CoreError::NotRunning),
            CoordinatorStatus::Idle | CoordinatorStatus::Starting | CoordinatorStatus::NotReady => {}
        }
        self.inner.status.send_replace(CoordinatorStatus::Starting);

        let first = {
            let _gate = self.inner.poll_gate.lock().await;
            self.fetch_and_apply().await
        };
        if let Err(e) = first {
            warn!(device = %self.inner.config.name, error = %e, "device not ready");
            self.inner.status.send_replace(CoordinatorStatus::NotReady);
            return Err(CoreError::not_ready(e));
        }

        if let Some(rx) = self.inner.command_rx.lock().await.take() {
            let coordinator = self.clone();
            handles.push(tokio::spawn(command_processor_task(coordinator, rx)));
        }

        let period = self.inner.config.poll_interval;
        if !period.is_zero() {
            let coordinator = self.clone();
            let cancel = self.inner.cancel.clone();
            handles.push(tokio::spawn(poll_task(coordinator, period, cancel)));
        }

        self.inner.status.send_replace(CoordinatorStatus::Running);
        info!(device = %self.inner.config.name, interval = ?period, "coordinator running");
        Ok(())
    }

    /// Cancel background tasks and wait for them to finish. An in-flight
    /// fetch is abandoned. The coordinator cannot be restarted.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }

        self.inner.status.send_replace(CoordinatorStatus::Stopped);
        debug!(device = %self.inner.config.name, "coordinator stopped");
    }

    // ── Polling ──────────────────────────────────────────────────

    /// Run one poll cycle now, unless one is already in flight.
    ///
    /// Only a running coordinator polls: before a successful `start()`
    /// or after `shutdown()` this returns [`CoreError::NotRunning`] and
    /// the state is left alone. A failed cycle leaves the state and
    /// timestamp untouched, is logged and broadcast as
    /// [`CoordinatorEvent::PollFailed`], and is returned.
    pub async fn refresh(&self) -> Result<RefreshOutcome, CoreError> {
        if *self.inner.status.borrow() != CoordinatorStatus::Running {
            return Err(CoreError::NotRunning);
        }
        self.poll_once().await
    }

    /// Gate, fetch, and apply one cycle.
    async fn poll_once(&self) -> Result<RefreshOutcome, CoreError> {
        let Ok(_gate) = self.inner.poll_gate.try_lock() else {
            debug!(device = %self.inner.config.name, "fetch in flight, skipping");
            return Ok(RefreshOutcome::Skipped);
        };

        match self.fetch_and_apply().await {
            Ok(()) => Ok(RefreshOutcome::Applied),
            Err(e) => {
                warn!(device = %self.inner.config.name, error = %e, "poll cycle failed");
                let _ = self.inner.event_tx.send(CoordinatorEvent::PollFailed {
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Fetch `/read` and replace the state. Caller holds the poll gate.
    async fn fetch_and_apply(&self) -> Result<(), CoreError> {
        let reported = self.inner.client.read_state().await?;
        let state = DeviceState::from(reported);
        let keys = state.len();
        let at = self.inner.store.replace_all(state);
        debug!(device = %self.inner.config.name, keys, "state refreshed");
        let _ = self
            .inner
            .event_tx
            .send(CoordinatorEvent::Refreshed { at, keys });
        Ok(())
    }

    // ── Writes ───────────────────────────────────────────────────

    /// Write one key and mirror it locally once accepted.
    pub async fn write(
        &self,
        key: impl Into<String>,
        value: impl Into<StateValue>,
    ) -> Result<CommandResult, CoreError> {
        self.execute(Command::Write(WriteRequest::new(key, value)))
            .await
    }

    /// Execute a command.
    ///
    /// Sends the command through the internal channel to the command
    /// processor task and awaits the result. Writes are never retried.
    pub async fn execute(&self, cmd: Command) -> Result<CommandResult, CoreError> {
        if *self.inner.status.borrow() != CoordinatorStatus::Running {
            return Err(CoreError::NotRunning);
        }

        let (tx, rx) = oneshot::channel();
        self.inner
            .command_tx
            .send(CommandEnvelope {
                command: cmd,
                response_tx: tx,
            })
            .await
            .map_err(|_| CoreError::NotRunning)?;

        rx.await.map_err(|_| CoreError::NotRunning)?
    }

    /// Send a write and, on success, patch local state.
    async fn apply_write(&self, request: WriteRequest) -> Result<CommandResult, CoreError> {
        let entries = request.entries(&self.inner.config.derived_fields);
        let body = WriteRequest::body(&entries);
        debug!(device = %self.inner.config.name, key = request.key(), "sending write");

        if let Err(e) = self.inner.client.write_state(&body).await {
            let err = CoreError::from(e);
            warn!(device = %self.inner.config.name, key = request.key(), error = %err, "write failed");
            return Err(err);
        }

        if !request.applies_locally() {
            return Ok(CommandResult::Sent);
        }

        let keys = self.inner.store.patch(entries);
        let _ = self
            .inner
            .event_tx
            .send(CoordinatorEvent::Patched { keys: keys.clone() });
        Ok(CommandResult::Applied { keys })
    }

    // ── State observation ────────────────────────────────────────

    /// Current device state.
    pub fn state(&self) -> Arc<DeviceState> {
        self.inner.store.state()
    }

    /// Subscribe to state changes.
    pub fn subscribe(&self) -> StateStream {
        StateStream::new(self.inner.store.subscribe())
    }

    /// Subscribe to the event broadcast stream.
    pub fn events(&self) -> broadcast::Receiver<CoordinatorEvent> {
        self.inner.event_tx.subscribe()
    }

    /// Subscribe to lifecycle changes.
    pub fn status(&self) -> watch::Receiver<CoordinatorStatus> {
        self.inner.status.subscribe()
    }

    pub fn last_success(&self) -> Option<DateTime<Utc>> {
        self.inner.store.last_success()
    }

    pub fn staleness(&self) -> Option<TimeDelta> {
        self.inner.store.snapshot().staleness()
    }

    /// RFC 3339 time of the last successful poll.
    pub fn last_report_time(&self) -> Option<String> {
        self.inner.store.snapshot().last_report_time()
    }
}

// ── Background tasks ─────────────────────────────────────────────

/// Poll on a fixed cadence. Ticks that come due while a fetch is still
/// running are dropped rather than queued.
async fn poll_task(coordinator: Coordinator, period: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    // Failures are logged and broadcast inside `poll_once`.
                    _ = coordinator.poll_once() => {}
                }
            }
        }
    }
}

/// Process commands from the mpsc channel, one at a time.
async fn command_processor_task(coordinator: Coordinator, mut rx: mpsc::Receiver<CommandEnvelope>) {
    let cancel = coordinator.inner.cancel.clone();

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            envelope = rx.recv() => {
                let Some(envelope) = envelope else { break };
                let result = coordinator.apply_write(envelope.command.into_request()).await;
                let _ = envelope.response_tx.send(result);
            }
        }
    }
}
