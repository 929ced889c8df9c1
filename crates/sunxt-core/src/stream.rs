// ── Reactive state stream ──
//
// Subscription type for read-side adapters that re-render whenever the
// device state changes (poll replace or write patch).

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::store::StateSnapshot;

/// A subscription to the device state.
///
/// Provides both point-in-time snapshot access and change notification
/// via [`changed()`](Self::changed) or by converting to a `Stream`.
pub struct StateStream {
    current: StateSnapshot,
    receiver: watch::Receiver<StateSnapshot>,
}

impl StateStream {
    pub(crate) fn new(mut receiver: watch::Receiver<StateSnapshot>) -> Self {
        let current = receiver.borrow_and_update().clone();
        Self { current, receiver }
    }

    /// Get the snapshot captured at creation time (or at the last `changed()`).
    pub fn current(&self) -> &StateSnapshot {
        &self.current
    }

    /// Get the latest snapshot (may have changed since creation).
    pub fn latest(&self) -> StateSnapshot {
        self.receiver.borrow().clone()
    }

    /// Wait for the next change, returning the new snapshot.
    /// Returns `None` if the coordinator has been dropped.
    pub async fn changed(&mut self) -> Option<StateSnapshot> {
        self.receiver.changed().await.ok()?;
        let snap = self.receiver.borrow_and_update().clone();
        self.current = snap.clone();
        Some(snap)
    }

    /// Convert into a `Stream` for use with `StreamExt` combinators.
    ///
    /// The stream yields the current snapshot first, then one item per
    /// observed change.
    pub fn into_stream(self) -> StateWatchStream {
        StateWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter backed by a `watch::Receiver`.
pub struct StateWatchStream {
    inner: WatchStream<StateSnapshot>,
}

impl Stream for StateWatchStream {
    type Item = StateSnapshot;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

#[cfg(test)]
mod tests {
    use tokio_test::{assert_pending, assert_ready, task};

    use super::*;
    use crate::model::{DeviceState, StateValue};
    use crate::store::StateStore;

    #[test]
    fn changed_waits_for_a_mutation() {
        let store = StateStore::new();
        let mut stream = StateStream::new(store.subscribe());
        assert!(stream.current().state.is_empty());

        let mut changed = task::spawn(stream.changed());
        assert_pending!(changed.poll());

        store.replace_all([("SC", 60_i64)].into_iter().collect::<DeviceState>());
        assert!(changed.is_woken());
        let snap = assert_ready!(changed.poll());
        drop(changed);

        let snap = snap.map(|s| s.state.get("SC").cloned());
        assert_eq!(snap, Some(Some(StateValue::Integer(60))));
        assert_eq!(stream.current().version, 1);
    }
}
