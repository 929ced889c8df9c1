// ── Point catalogue ──
//
// Static per-key metadata used by control surfaces to interpret raw
// device values (units, scale, precision) and to bound numeric writes.
// The coordinator never consults these tables.

use tracing::warn;

use crate::model::{DeviceState, StateValue};

/// Model string whose power setpoints are capped at 800 W.
pub const MODEL_500: &str = "SunEnergyXT 500";

const MODEL_500_POWER_CAP: i64 = 800;

/// What a key represents on the control surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointKind {
    Sensor,
    Number,
    Switch,
    Text,
    Button,
}

/// Inclusive bounds and step for a numeric setpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberRange {
    pub min: i64,
    pub max: i64,
    pub step: i64,
}

impl NumberRange {
    /// Clamp into the range and truncate toward zero. `NaN` maps to `min`.
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss, clippy::as_conversions)]
    pub fn clamp(&self, value: f64) -> i64 {
        if value.is_nan() {
            return self.min;
        }
        value.clamp(self.min as f64, self.max as f64) as i64
    }
}

/// Metadata for one device key.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointMeta {
    pub key: &'static str,
    pub kind: PointKind,
    pub unit: Option<&'static str>,
    /// Multiplier applied to the raw value before display.
    pub scale: Option<f64>,
    /// Decimal places kept after scaling.
    pub precision: Option<u32>,
    pub range: Option<NumberRange>,
}

impl PointMeta {
    const fn status(key: &'static str) -> Self {
        Self {
            key,
            kind: PointKind::Sensor,
            unit: None,
            scale: None,
            precision: None,
            range: None,
        }
    }

    const fn measured(key: &'static str, unit: &'static str) -> Self {
        Self {
            key,
            kind: PointKind::Sensor,
            unit: Some(unit),
            scale: Some(1.0),
            precision: None,
            range: None,
        }
    }

    const fn scaled(key: &'static str, unit: &'static str, scale: f64, precision: u32) -> Self {
        Self {
            key,
            kind: PointKind::Sensor,
            unit: Some(unit),
            scale: Some(scale),
            precision: Some(precision),
            range: None,
        }
    }

    const fn number(key: &'static str, unit: &'static str, min: i64, max: i64, step: i64) -> Self {
        Self {
            key,
            kind: PointKind::Number,
            unit: Some(unit),
            scale: None,
            precision: None,
            range: Some(NumberRange { min, max, step }),
        }
    }

    const fn control(key: &'static str, kind: PointKind) -> Self {
        Self {
            key,
            kind,
            unit: None,
            scale: None,
            precision: None,
            range: None,
        }
    }
}

pub const SENSORS: &[PointMeta] = &[
    PointMeta::status("WS"),
    PointMeta::measured("WR", "dB"),
    PointMeta::status("ST"),
    PointMeta::measured("IW", "W"),
    PointMeta::measured("OP", "W"),
    PointMeta::measured("PV", "W"),
    PointMeta::measured("PV1", "W"),
    PointMeta::measured("PV2", "W"),
    PointMeta::measured("PV3", "W"),
    PointMeta::measured("PV4", "W"),
    PointMeta::scaled("II1", "A", 0.1, 1),
    PointMeta::scaled("II2", "A", 0.1, 1),
    PointMeta::scaled("II3", "A", 0.1, 1),
    PointMeta::scaled("II4", "A", 0.1, 1),
    PointMeta::scaled("VP1", "V", 0.1, 1),
    PointMeta::scaled("VP2", "V", 0.1, 1),
    PointMeta::scaled("VP3", "V", 0.1, 1),
    PointMeta::scaled("VP4", "V", 0.1, 1),
    PointMeta::measured("GP", "W"),
    PointMeta::measured("LP", "W"),
    PointMeta::scaled("GD1", "kWh", 0.001, 3),
    PointMeta::scaled("GD2", "kWh", 0.001, 3),
    PointMeta::scaled("LD", "kWh", 0.001, 3),
    PointMeta::measured("SC", "%"),
    PointMeta::measured("SC0", "%"),
    PointMeta::measured("SC1", "%"),
    PointMeta::measured("SC2", "%"),
    PointMeta::measured("SC3", "%"),
    PointMeta::measured("SC4", "%"),
    PointMeta::measured("SC5", "%"),
    PointMeta::status("ON"),
    PointMeta::status("ES"),
    PointMeta::status("BS0"),
    PointMeta::status("BS1"),
    PointMeta::status("BS2"),
    PointMeta::status("BS3"),
    PointMeta::status("BS4"),
    PointMeta::status("BS5"),
    PointMeta::status("AS"),
    PointMeta::status("DS"),
    PointMeta::status("SN"),
    PointMeta::status("MS"),
];

pub const NUMBERS: &[PointMeta] = &[
    PointMeta::number("GS", "W", -2400, 2400, 10),
    PointMeta::number("IS", "W", 1, 2400, 10),
    PointMeta::number("SI", "%", 1, 30, 1),
    PointMeta::number("SA", "%", 70, 100, 1),
    PointMeta::number("SO", "%", 1, 30, 1),
    PointMeta::number("PT", "min", 30, 1440, 1),
];

pub const SWITCHES: &[PointMeta] = &[
    PointMeta::control("LM", PointKind::Switch),
    PointMeta::control("MM", PointKind::Switch),
    PointMeta::control("PM", PointKind::Switch),
];

pub const TEXTS: &[PointMeta] = &[
    PointMeta::control("MD", PointKind::Text),
    PointMeta::control("TZ", PointKind::Text),
];

pub const BUTTONS: &[PointMeta] = &[PointMeta::control("RT", PointKind::Button)];

/// Every catalogued point.
pub fn all() -> impl Iterator<Item = &'static PointMeta> {
    SENSORS
        .iter()
        .chain(NUMBERS)
        .chain(SWITCHES)
        .chain(TEXTS)
        .chain(BUTTONS)
}

pub fn lookup(key: &str) -> Option<&'static PointMeta> {
    all().find(|meta| meta.key == key)
}

/// Writable range of a numeric key, with model-specific limits applied.
pub fn number_range(key: &str, model: &str) -> Option<NumberRange> {
    let mut range = NUMBERS.iter().find(|meta| meta.key == key)?.range?;
    if model == MODEL_500 && matches!(key, "GS" | "IS") {
        range.max = MODEL_500_POWER_CAP;
    }
    Some(range)
}

/// Bring a requested setpoint into the key's writable range.
///
/// `None` when the key is not a catalogued number.
pub fn clamp_number(key: &str, model: &str, value: f64) -> Option<i64> {
    number_range(key, model).map(|range| range.clamp(value))
}

// ── Typed reads ──────────────────────────────────────────────────

/// Display value of a sensor.
///
/// Unscaled keys pass the raw value through. Scaled keys are multiplied
/// and rounded; a raw value that does not parse as a number is returned
/// as-is.
pub fn sensor_value(state: &DeviceState, key: &str) -> Option<StateValue> {
    let raw = state.get(key).filter(|v| !v.is_null())?;
    let Some(meta) = SENSORS.iter().find(|meta| meta.key == key) else {
        return Some(raw.clone());
    };
    let Some(scale) = meta.scale else {
        return Some(raw.clone());
    };
    let Some(number) = raw.as_f64() else {
        return Some(raw.clone());
    };

    let scaled = number * scale;
    Some(match meta.precision {
        Some(places) => StateValue::Float(round_to(scaled, places)),
        None => integral_or_float(scaled),
    })
}

/// Current setpoint of a numeric key. `None` when absent or unparsable.
pub fn number_value(state: &DeviceState, key: &str) -> Option<f64> {
    let raw = state.get(key).filter(|v| !v.is_null())?;
    let value = raw.as_f64();
    if value.is_none() {
        warn!(key, raw = %raw, "unparsable numeric value");
    }
    value
}

/// A 0/1 flag. Absent or unparsable reads as off.
pub fn switch_value(state: &DeviceState, key: &str) -> bool {
    state
        .get(key)
        .and_then(StateValue::as_flag)
        .unwrap_or(false)
}

/// Text form of a value. Absent reads as empty.
pub fn text_value(state: &DeviceState, key: &str) -> String {
    state.get(key).map(ToString::to_string).unwrap_or_default()
}

fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10_f64.powi(i32::try_from(places).unwrap_or(i32::MAX));
    (value * factor).round() / factor
}

#[allow(clippy::cast_possible_truncation, clippy::as_conversions)]
fn integral_or_float(value: f64) -> StateValue {
    if value.fract() == 0.0 && value.is_finite() && value.abs() < 9.0e15 {
        StateValue::Integer(value as i64)
    } else {
        StateValue::Float(value)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn state(pairs: &[(&str, StateValue)]) -> DeviceState {
        pairs.iter().cloned().collect()
    }

    #[test]
    fn measured_text_reads_as_integer() {
        let s = state(&[("PV", StateValue::from("123"))]);
        assert_eq!(sensor_value(&s, "PV"), Some(StateValue::Integer(123)));
    }

    #[test]
    fn scaled_sensor_rounds_to_precision() {
        let s = state(&[("II1", StateValue::from("123")), ("GD1", StateValue::from(12_345))]);
        assert_eq!(sensor_value(&s, "II1"), Some(StateValue::Float(12.3)));
        assert_eq!(sensor_value(&s, "GD1"), Some(StateValue::Float(12.345)));
    }

    #[test]
    fn sensor_edge_cases() {
        let s = state(&[
            ("VP1", StateValue::from("n/a")),
            ("SN", StateValue::from("XT500A0001")),
            ("LP", StateValue::Null),
        ]);
        assert_eq!(sensor_value(&s, "VP1"), Some(StateValue::from("n/a")));
        assert_eq!(sensor_value(&s, "SN"), Some(StateValue::from("XT500A0001")));
        assert_eq!(sensor_value(&s, "LP"), None);
        assert_eq!(sensor_value(&s, "PV"), None);
    }

    #[test]
    fn grid_setpoint_is_clamped() {
        assert_eq!(clamp_number("GS", "SunEnergyXT 1000", 5000.0), Some(2400));
        assert_eq!(clamp_number("GS", "SunEnergyXT 1000", -9000.0), Some(-2400));
        assert_eq!(clamp_number("SA", "SunEnergyXT 1000", 85.7), Some(85));
        assert_eq!(clamp_number("PT", "", f64::NAN), Some(30));
        assert_eq!(clamp_number("XX", "", 1.0), None);
    }

    #[test]
    fn model_500_caps_power_setpoints() {
        assert_eq!(clamp_number("GS", MODEL_500, 2400.0), Some(800));
        assert_eq!(clamp_number("IS", MODEL_500, 1000.0), Some(800));
        assert_eq!(number_range("SI", MODEL_500).map(|r| r.max), Some(30));
    }

    #[test]
    fn number_reads_are_lenient() {
        let s = state(&[("GS", StateValue::from("800")), ("SA", StateValue::from("high"))]);
        assert_eq!(number_value(&s, "GS"), Some(800.0));
        assert_eq!(number_value(&s, "SA"), None);
        assert_eq!(number_value(&s, "PT"), None);
    }

    #[test]
    fn switch_and_text_defaults() {
        let s = state(&[("LM", StateValue::from("1")), ("PM", StateValue::from("x"))]);
        assert!(switch_value(&s, "LM"));
        assert!(!switch_value(&s, "PM"));
        assert!(!switch_value(&s, "MM"));
        assert_eq!(text_value(&s, "TZ"), "");
        assert_eq!(text_value(&s, "LM"), "1");
    }

    #[test]
    fn lookup_covers_every_kind() {
        assert_eq!(lookup("RT").map(|m| m.kind), Some(PointKind::Button));
        assert_eq!(lookup("MD").map(|m| m.kind), Some(PointKind::Text));
        assert_eq!(lookup("GD2").and_then(|m| m.unit), Some("kWh"));
        assert!(lookup("ZZ").is_none());
    }
}
