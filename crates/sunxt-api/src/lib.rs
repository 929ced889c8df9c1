//! Async client for the local HTTP API of SunEnergyXT storage units.
//!
//! The device exposes two endpoints:
//!
//! - `GET /read` returns `{"state": {"reported": {<key>: <scalar>, ...}}}`
//! - `POST /write` accepts `{"state": {<key>: <scalar>, ...}}`
//!
//! [`DeviceClient`] wraps both with per-request deadlines and maps every
//! failure into [`Error`]. Higher-level polling and state caching live in
//! `sunxt-core`.

pub mod client;
pub mod error;
pub mod models;
pub mod transport;

pub use client::{DeviceClient, device_base_url, validate_address};
pub use error::Error;
pub use models::{DeviceIdentity, ReportedState, WriteBody, extract_reported};
pub use transport::{RequestTimeouts, TransportConfig};
