//! Configuration management for a bus participant process.
//!
//! Provides hierarchical configuration loading and validation with:
//! - Default values as code base
//! - Configuration file named by `CONFIG_PATH`
//! - Environment variable overrides (`IWC__` prefix, `__` separator)
//! - Component-wise validation
mod directory;
mod endpoint;
mod intents;
pub use directory::*;
pub use endpoint::*;
pub use intents::*;


use std::env;
use std::fmt::Debug;

use config::Config;
use config::ConfigError;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Main configuration container for one participant process
///
/// Combines all directory configurations with hierarchical override support:
/// 1. Default values from code implementation
/// 2. Configuration file specified by `CONFIG_PATH`
/// 3. Environment variables (highest priority)
#[derive(Serialize, Deserialize, Clone, Default)]
pub struct BusConfig {
    /// Identity of this participant on the bus
    #[serde(default)]
    pub participant: ParticipantConfig,
    /// Names directory: addresses, multicast groups, routers, api descriptors
    #[serde(default)]
    pub names: NamesConfig,
    /// Data directory: free-form shared values and lists
    #[serde(default)]
    pub data: DataConfig,
    /// Intents directory: handler registrations and in-flight invocations
    #[serde(default)]
    pub intents: IntentsConfig,
    /// Externally persisted node data
    #[serde(default)]
    pub endpoint: EndpointConfig,
}

impl Debug for BusConfig {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("BusConfig")
            .field("participant", &self.participant)
            .field("names", &self.names.directory.name)
            .field("data", &self.data.directory.name)
            .field("intents", &self.intents.directory.name)
            .finish()
    }
}

impl BusConfig {
    /// Loads configuration from hierarchical sources without validation.
    ///
    /// Configuration sources are merged in the following order (later sources override earlier):
    /// 1. Type defaults (lowest priority)
    /// 2. Configuration file from `CONFIG_PATH` environment variable (if set)
    /// 3. Environment variables with `IWC__` prefix (highest priority)
    ///
    /// # Note
    /// Validation is deferred so further overrides can be applied with
    /// `with_override_config()`. Callers MUST call `validate()` before use.
    ///
    /// # Examples
    /// ```ignore
    /// std::env::set_var("IWC__NAMES__LIVENESS__DROP_THRESHOLD", "5");
    /// let cfg = BusConfig::new()?.validate()?;
    /// ```
    pub fn new() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Ok(config_path) = env::var("CONFIG_PATH") {
            builder = builder.add_source(File::with_name(&config_path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("IWC")
                .separator("__")
                .ignore_empty(true)
                .try_parsing(true),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Applies additional configuration overrides from file without validation.
    ///
    /// Merging order (later sources override earlier):
    /// 1. Current configuration values
    /// 2. New configuration file
    /// 3. Latest environment variables (highest priority)
    pub fn with_override_config(
        &self,
        path: &str,
    ) -> Result<Self> {
        let config: Self = Config::builder()
            .add_source(Config::try_from(self)?)
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("IWC")
                    .separator("__")
                    .ignore_empty(true)
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Validates every section and returns the validated instance.
    pub fn validate(self) -> Result<Self> {
        self.participant.validate()?;
        self.names.validate()?;
        self.data.validate()?;
        self.intents.validate()?;
        self.endpoint.validate()?;
        Ok(self)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ParticipantConfig {
    /// Peer identifier handed to the intent chooser so it can find its way back to this bus
    #[serde(default = "default_bus_root")]
    pub bus_root: String,
}

impl Default for ParticipantConfig {
    fn default() -> Self {
        Self {
            bus_root: default_bus_root(),
        }
    }
}

impl ParticipantConfig {
    fn validate(&self) -> Result<()> {
        if self.bus_root.trim().is_empty() {
            return Err(config_error("participant.bus_root cannot be empty"));
        }
        Ok(())
    }
}

fn default_bus_root() -> String {
    "ozpIwc.peer".to_string()
}

pub(super) fn config_error(message: impl Into<String>) -> Error {
    Error::Config(ConfigError::Message(message.into()))
}
