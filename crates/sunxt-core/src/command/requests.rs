// ── Write requests ──
//
// A `WriteRequest` is one key/value mutation plus whether the value
// should be mirrored into local state once the device accepts it.

use serde_json::{Map, Value};

use sunxt_api::WriteBody;

use crate::model::{DerivedFields, StateValue};

#[derive(Debug, Clone, PartialEq)]
pub struct WriteRequest {
    key: String,
    value: StateValue,
    apply_locally: bool,
}

impl WriteRequest {
    /// A write whose value is patched into local state on success.
    pub fn new(key: impl Into<String>, value: impl Into<StateValue>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            apply_locally: true,
        }
    }

    /// A fire-and-forget action; local state is not patched.
    pub fn momentary(key: impl Into<String>, value: impl Into<StateValue>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            apply_locally: false,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &StateValue {
        &self.value
    }

    pub fn applies_locally(&self) -> bool {
        self.apply_locally
    }

    /// The primary entry followed by any derived companions.
    pub fn entries(&self, derived: &DerivedFields) -> Vec<(String, StateValue)> {
        let mut entries = vec![(self.key.clone(), self.value.clone())];
        entries.extend(derived.expand(&self.key, &self.value));
        entries
    }

    /// Wire body for a set of entries.
    pub(crate) fn body(entries: &[(String, StateValue)]) -> WriteBody {
        let state: Map<String, Value> = entries
            .iter()
            .map(|(k, v)| (k.clone(), Value::from(v.clone())))
            .collect();
        WriteBody::new(state)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn plain_write_has_single_entry() {
        let req = WriteRequest::new("GS", 2400);
        let entries = req.entries(&DerivedFields::default());
        assert_eq!(entries, vec![("GS".to_owned(), StateValue::Integer(2400))]);
        let body = WriteRequest::body(&entries);
        assert_eq!(serde_json::to_value(body).unwrap(), json!({"state": {"GS": 2400}}));
    }

    #[test]
    fn mode_write_carries_manual_flag() {
        let req = WriteRequest::new("MD", "");
        let entries = req.entries(&DerivedFields::default());
        let body = WriteRequest::body(&entries);
        assert_eq!(
            serde_json::to_value(body).unwrap(),
            json!({"state": {"MD": "", "MM": 0}})
        );
    }
}
