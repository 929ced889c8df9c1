// ── Domain model ──

pub mod derived;
pub mod value;

pub use derived::{DerivationRule, DerivedField, DerivedFields};
pub use value::{DeviceState, StateValue};

pub use sunxt_api::DeviceIdentity;
