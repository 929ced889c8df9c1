// ── Derived write fields ──
//
// Some keys imply a companion key on write. Setting the mode text `MD`
// also sets the manual-mode flag `MM`: blank text turns it off, any
// other text turns it on. The table is consulted both when building the
// write payload and when patching local state after the write succeeds.

use super::StateValue;

/// How a derived value is computed from the written value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivationRule {
    /// `0` when the written value is blank text, `1` otherwise.
    NonEmptyFlag,
}

impl DerivationRule {
    pub fn derive(self, value: &StateValue) -> StateValue {
        match self {
            Self::NonEmptyFlag => {
                let blank = value.is_null() || value.to_string().trim().is_empty();
                StateValue::Integer(i64::from(!blank))
            }
        }
    }
}

/// A declared `source → (target, rule)` mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedField {
    pub source: String,
    pub target: String,
    pub rule: DerivationRule,
}

impl DerivedField {
    pub fn new(source: impl Into<String>, target: impl Into<String>, rule: DerivationRule) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            rule,
        }
    }
}

/// The set of derived fields a coordinator applies to writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedFields(Vec<DerivedField>);

impl DerivedFields {
    pub fn new(fields: Vec<DerivedField>) -> Self {
        Self(fields)
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Companion entries implied by writing `value` to `key`.
    pub fn expand(&self, key: &str, value: &StateValue) -> Vec<(String, StateValue)> {
        self.0
            .iter()
            .filter(|f| f.source == key)
            .map(|f| (f.target.clone(), f.rule.derive(value)))
            .collect()
    }
}

impl Default for DerivedFields {
    /// `MD → MM` (manual mode follows whether a mode schedule is set).
    fn default() -> Self {
        Self::new(vec![DerivedField::new("MD", "MM", DerivationRule::NonEmptyFlag)])
    }
}
