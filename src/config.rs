//! # Configuration
//!
//! Layered configuration for the release trigger:
//!
//! 1. Built-in defaults ([`ReleaseConfig::default`])
//! 2. An optional TOML file (explicit path, or `RELEASE_CONFIG_PATH`)
//! 3. Environment variables prefixed with `RELEASE_`, e.g.
//!    `RELEASE_UNKNOWN_PARAMETER_POLICY=pass_through`
//!
//! ```toml
//! unknown_parameter_policy = "ignore"
//! event_channel_capacity = 4096
//! ```

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{ReleaseError, Result};
use crate::events::publisher::DEFAULT_EVENT_CHANNEL_CAPACITY;

/// Environment variable naming the configuration file
pub const CONFIG_PATH_ENV: &str = "RELEASE_CONFIG_PATH";

/// What to do with explicit parameters the target job does not declare
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownParameterPolicy {
    /// Fail the step before anything is scheduled
    #[default]
    Reject,
    /// Forward them after the declared parameters, in caller order
    PassThrough,
    /// Drop them
    Ignore,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReleaseConfig {
    pub unknown_parameter_policy: UnknownParameterPolicy,
    /// Buffered host events per subscriber before a slow router lags; read by
    /// [`InMemoryHost::from_config`](crate::host::InMemoryHost::from_config)
    pub event_channel_capacity: usize,
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        Self {
            unknown_parameter_policy: UnknownParameterPolicy::default(),
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
        }
    }
}

impl ReleaseConfig {
    /// Load from the file named by `RELEASE_CONFIG_PATH` (if set) and the environment
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from);
        Self::load_from(path.as_deref())
    }

    /// Load from an optional TOML file and the environment
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Some(path) = path {
            debug!(path = %path.display(), "Loading release configuration file");
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
        }

        let config: Self = builder
            .add_source(
                Environment::with_prefix("RELEASE")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        debug!(config = ?config, "Release configuration loaded");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.event_channel_capacity == 0 {
            return Err(ReleaseError::ConfigLoad(
                "event_channel_capacity must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn with_unknown_parameter_policy(mut self, policy: UnknownParameterPolicy) -> Self {
        self.unknown_parameter_policy = policy;
        self
    }

    pub fn with_event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity;
        self
    }
}
