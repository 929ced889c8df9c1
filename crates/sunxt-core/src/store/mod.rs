// ── Reactive device state store ──
//
// Single holder for the device's last known state and the time of the
// last successful poll. Both live in one `watch` channel so every
// mutation is serialized by the channel's lock and readers never see a
// new map paired with an old timestamp.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::watch;

use crate::model::{DeviceState, StateValue};

/// An immutable view of the store at one point in time.
#[derive(Debug, Clone, Default)]
pub struct StateSnapshot {
    pub state: Arc<DeviceState>,
    /// Set only when a poll succeeds; speculative patches leave it alone.
    pub last_success: Option<DateTime<Utc>>,
    /// Bumped on every mutation.
    pub version: u64,
}

impl StateSnapshot {
    /// Age of the data relative to the last successful poll.
    pub fn staleness(&self) -> Option<TimeDelta> {
        self.last_success.map(|t| Utc::now() - t)
    }

    /// `last_success` as RFC 3339, the form readers attach to their values.
    pub fn last_report_time(&self) -> Option<String> {
        self.last_success.map(|t| t.to_rfc3339())
    }
}

/// Owner of [`DeviceState`].
///
/// `replace_all` and `patch` are the only mutators. Readers get `Arc`
/// snapshots and can never mutate the map in place.
pub struct StateStore {
    snapshot: watch::Sender<StateSnapshot>,
}

impl StateStore {
    pub(crate) fn new() -> Self {
        let (snapshot, _) = watch::channel(StateSnapshot::default());
        Self { snapshot }
    }

    /// Replace the whole state with a fresh poll result and stamp it.
    pub(crate) fn replace_all(&self, state: DeviceState) -> DateTime<Utc> {
        let now = Utc::now();
        // `send_modify` updates unconditionally, even with zero receivers.
        self.snapshot.send_modify(|snap| {
            snap.state = Arc::new(state);
            snap.last_success = Some(now);
            snap.version += 1;
        });
        now
    }

    /// Overwrite individual keys after an accepted write. Returns the
    /// keys that were written.
    pub(crate) fn patch<I>(&self, entries: I) -> Vec<String>
    where
        I: IntoIterator<Item = (String, StateValue)>,
    {
        let mut keys = Vec::new();
        self.snapshot.send_modify(|snap| {
            let state = Arc::make_mut(&mut snap.state);
            for (key, value) in entries {
                keys.push(key.clone());
                state.insert(key, value);
            }
            snap.version += 1;
        });
        keys
    }

    /// Current snapshot (cheap clone).
    pub fn snapshot(&self) -> StateSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn state(&self) -> Arc<DeviceState> {
        Arc::clone(&self.snapshot.borrow().state)
    }

    pub fn get(&self, key: &str) -> Option<StateValue> {
        self.snapshot.borrow().state.get(key).cloned()
    }

    pub fn last_success(&self) -> Option<DateTime<Utc>> {
        self.snapshot.borrow().last_success
    }

    pub fn version(&self) -> u64 {
        self.snapshot.borrow().version
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<StateSnapshot> {
        self.snapshot.subscribe()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn state(pairs: &[(&str, i64)]) -> DeviceState {
        pairs.iter().map(|(k, v)| (*k, *v)).collect()
    }

    #[test]
    fn starts_empty_and_uninitialized() {
        let store = StateStore::new();
        assert!(store.state().is_empty());
        assert!(store.last_success().is_none());
        assert_eq!(store.version(), 0);
    }

    #[test]
    fn replace_all_discards_previous_keys() {
        let store = StateStore::new();
        store.replace_all(state(&[("PV", 100), ("SC", 50)]));
        store.replace_all(state(&[("PV", 120)]));

        let current = store.state();
        assert_eq!(current.len(), 1);
        assert_eq!(current.get("PV"), Some(&StateValue::Integer(120)));
        assert!(current.get("SC").is_none());
        assert_eq!(store.version(), 2);
    }

    #[test]
    fn patch_keeps_timestamp_and_other_keys() {
        let store = StateStore::new();
        let stamped = store.replace_all(state(&[("GS", 0), ("SC", 50)]));

        let keys = store.patch([("GS".to_owned(), StateValue::from(800))]);

        assert_eq!(keys, vec!["GS".to_owned()]);
        assert_eq!(store.get("GS"), Some(StateValue::Integer(800)));
        assert_eq!(store.get("SC"), Some(StateValue::Integer(50)));
        assert_eq!(store.last_success(), Some(stamped));
    }

    #[test]
    fn earlier_snapshots_are_unaffected_by_patch() {
        let store = StateStore::new();
        store.replace_all(state(&[("GS", 0)]));
        let before = store.state();

        store.patch([("GS".to_owned(), StateValue::from(800))]);

        assert_eq!(before.get("GS"), Some(&StateValue::Integer(0)));
        assert_eq!(store.get("GS"), Some(StateValue::Integer(800)));
    }

    #[test]
    fn subscribers_see_mutations() {
        let store = StateStore::new();
        let mut rx = store.subscribe();
        store.replace_all(state(&[("PV", 1)]));
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().version, 1);
    }

    #[test]
    fn snapshot_reports_staleness_once_stamped() {
        let store = StateStore::new();
        assert!(store.snapshot().staleness().is_none());
        store.replace_all(DeviceState::default());
        let snap = store.snapshot();
        assert!(snap.staleness().unwrap() >= TimeDelta::zero());
        assert!(snap.last_report_time().unwrap().contains('T'));
    }
}
