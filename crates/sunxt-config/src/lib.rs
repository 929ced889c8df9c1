//! Device profiles for SunEnergyXT tools.
//!
//! TOML profiles layered with `SUNXT_` environment overrides, and
//! translation to `sunxt_core::CoordinatorConfig`. The core crate never
//! reads files; hosts that want persisted devices go through here.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use sunxt_core::{CoordinatorConfig, DeviceIdentity, RequestTimeouts};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no device named '{name}'")]
    UnknownDevice { name: String },

    #[error("no device selected and no default device configured")]
    NoDefaultDevice,

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    /// Device used when none is named.
    pub default_device: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named device profiles.
    #[serde(default)]
    pub devices: HashMap<String, DeviceProfile>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    #[serde(default = "default_read_timeout")]
    pub read_timeout_secs: u64,

    #[serde(default = "default_write_timeout")]
    pub write_timeout_secs: u64,

    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            read_timeout_secs: default_read_timeout(),
            write_timeout_secs: default_write_timeout(),
            probe_timeout_secs: default_probe_timeout(),
        }
    }
}

fn default_poll_interval() -> u64 {
    3
}
fn default_read_timeout() -> u64 {
    10
}
fn default_write_timeout() -> u64 {
    5
}
fn default_probe_timeout() -> u64 {
    5
}

/// A named device.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DeviceProfile {
    /// Device IP address on the local network.
    pub host: String,

    /// Serial number reported at acceptance (`SN`).
    pub serial: Option<String>,

    /// Model reported at acceptance (`DevType`).
    pub model: Option<String>,

    /// Override poll interval.
    pub poll_interval_secs: Option<u64>,

    /// Override read deadline.
    pub read_timeout_secs: Option<u64>,

    /// Override write deadline.
    pub write_timeout_secs: Option<u64>,
}

impl DeviceProfile {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            serial: None,
            model: None,
            poll_interval_secs: None,
            read_timeout_secs: None,
            write_timeout_secs: None,
        }
    }
}

impl Config {
    /// Look up a device by name, falling back to `default_device`.
    pub fn device(&self, name: Option<&str>) -> Result<(&str, &DeviceProfile), ConfigError> {
        let name = name
            .or(self.default_device.as_deref())
            .ok_or(ConfigError::NoDefaultDevice)?;
        self.devices
            .get_key_value(name)
            .map(|(k, v)| (k.as_str(), v))
            .ok_or_else(|| ConfigError::UnknownDevice { name: name.into() })
    }

    /// Record an accepted device under `name`. The first device added
    /// becomes the default.
    pub fn add_device(&mut self, name: impl Into<String>, host: impl Into<String>, identity: &DeviceIdentity) {
        let name = name.into();
        let mut profile = DeviceProfile::new(host);
        profile.serial = Some(identity.serial.clone());
        profile.model = Some(identity.model.clone());
        if self.default_device.is_none() {
            self.default_device = Some(name.clone());
        }
        self.devices.insert(name, profile);
    }

    /// Build the coordinator config for a named (or the default) device.
    pub fn coordinator_config(&self, name: Option<&str>) -> Result<CoordinatorConfig, ConfigError> {
        let (name, profile) = self.device(name)?;
        profile_to_coordinator_config(profile, name, &self.defaults)
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "sunxt", "sunxt").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("sunxt");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from a specific file, then apply `SUNXT_` environment overrides.
///
/// Nested keys use a double underscore, e.g.
/// `SUNXT_DEFAULTS__POLL_INTERVAL_SECS=5`. A missing file yields the
/// defaults.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    debug!(path = %path.display(), "loading config");

    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("SUNXT_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Translation ─────────────────────────────────────────────────────

/// Build a `CoordinatorConfig` from a profile, with profile overrides
/// taking precedence over the global defaults.
///
/// The serial (when known) becomes the coordinator's log label.
pub fn profile_to_coordinator_config(
    profile: &DeviceProfile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<CoordinatorConfig, ConfigError> {
    sunxt_api::validate_address(&profile.host).map_err(|_| ConfigError::Validation {
        field: "host".into(),
        reason: format!("not an IP address: {}", profile.host),
    })?;

    let poll = profile
        .poll_interval_secs
        .unwrap_or(defaults.poll_interval_secs);
    if poll == 0 {
        return Err(ConfigError::Validation {
            field: "poll_interval_secs".into(),
            reason: "must be at least 1".into(),
        });
    }

    let timeouts = RequestTimeouts {
        read: Duration::from_secs(
            profile
                .read_timeout_secs
                .unwrap_or(defaults.read_timeout_secs),
        ),
        write: Duration::from_secs(
            profile
                .write_timeout_secs
                .unwrap_or(defaults.write_timeout_secs),
        ),
        probe: Duration::from_secs(defaults.probe_timeout_secs),
    };

    let mut config = CoordinatorConfig::new(profile.host.trim())
        .with_name(profile.serial.as_deref().unwrap_or(profile_name));
    config.poll_interval = Duration::from_secs(poll);
    config.timeouts = timeouts;
    Ok(config)
}
