// Wire types for the device's `/read` and `/write` endpoints.
//
// Both endpoints wrap their payload in a `state` object. Reads nest the
// actual key/value map one level deeper, under `state.reported`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Error;

/// The flat key/value map found at `state.reported`.
pub type ReportedState = Map<String, Value>;

/// Body of a `POST /write`: `{"state": {<key>: <value>, ...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteBody {
    pub state: Map<String, Value>,
}

impl WriteBody {
    pub fn new(state: Map<String, Value>) -> Self {
        Self { state }
    }

    /// Single-key body.
    pub fn single(key: impl Into<String>, value: Value) -> Self {
        let mut state = Map::new();
        state.insert(key.into(), value);
        Self { state }
    }
}

/// Serial number and model reported by the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    pub serial: String,
    pub model: String,
}

impl DeviceIdentity {
    /// Extract identity from a reported state map. The serial is checked
    /// first, so a device missing both reports `MissingSerial`.
    pub fn from_reported(reported: &ReportedState) -> Result<Self, Error> {
        let serial = reported
            .get("SN")
            .and_then(Value::as_str)
            .ok_or(Error::MissingSerial)?;
        let model = reported
            .get("DevType")
            .and_then(Value::as_str)
            .ok_or(Error::MissingModel)?;
        Ok(Self {
            serial: serial.to_owned(),
            model: model.to_owned(),
        })
    }
}

/// Pull `state.reported` out of a decoded `/read` body.
///
/// Anything other than an object at that path is a failure: a
/// `reported` that is an array, string, or null is not a partial success.
pub fn extract_reported(body: Value) -> Result<ReportedState, Error> {
    let Value::Object(mut root) = body else {
        return Err(Error::MalformedState {
            reason: format!("expected JSON object, got {}", kind(&body)),
        });
    };
    let Some(Value::Object(mut state)) = root.remove("state") else {
        return Err(Error::MalformedState {
            reason: "missing `state` object".into(),
        });
    };
    match state.remove("reported") {
        Some(Value::Object(reported)) => Ok(reported),
        Some(other) => Err(Error::MalformedState {
            reason: format!("`state.reported` is {}, expected object", kind(&other)),
        }),
        None => Err(Error::MalformedState {
            reason: "missing `state.reported`".into(),
        }),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn extracts_reported_object() {
        let reported = extract_reported(json!({"state": {"reported": {"PV": "123"}}})).unwrap();
        assert_eq!(reported.get("PV"), Some(&json!("123")));
        assert_eq!(reported.len(), 1);
    }

    #[test]
    fn rejects_non_object_reported() {
        for bad in [json!([1, 2]), json!("on"), Value::Null] {
            let result = extract_reported(json!({"state": {"reported": bad}}));
            assert!(
                matches!(result, Err(Error::MalformedState { .. })),
                "expected MalformedState, got: {result:?}"
            );
        }
    }

    #[test]
    fn rejects_missing_state() {
        let result = extract_reported(json!({"status": "ok"}));
        assert!(matches!(result, Err(Error::MalformedState { .. })));

        let result = extract_reported(json!({"state": {"desired": {}}}));
        match result {
            Err(Error::MalformedState { reason }) => assert!(reason.contains("reported")),
            other => panic!("expected MalformedState, got: {other:?}"),
        }
    }

    #[test]
    fn identity_requires_string_serial_then_model() {
        let both = json!({"SN": "AB12", "DevType": "SunEnergyXT 500"});
        let id = DeviceIdentity::from_reported(both.as_object().unwrap()).unwrap();
        assert_eq!(id.serial, "AB12");
        assert_eq!(id.model, "SunEnergyXT 500");

        let numeric_sn = json!({"SN": 42, "DevType": "x"});
        assert!(matches!(
            DeviceIdentity::from_reported(numeric_sn.as_object().unwrap()),
            Err(Error::MissingSerial)
        ));

        let no_model = json!({"SN": "AB12"});
        assert!(matches!(
            DeviceIdentity::from_reported(no_model.as_object().unwrap()),
            Err(Error::MissingModel)
        ));
    }

    #[test]
    fn write_body_serializes_under_state() {
        let body = WriteBody::single("GS", json!(2400));
        assert_eq!(serde_json::to_value(&body).unwrap(), json!({"state": {"GS": 2400}}));
    }
}
