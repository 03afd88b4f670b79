use serde::Deserialize;
use serde::Serialize;

use super::config_error;
use crate::constants::DATA_API;
use crate::constants::NAMES_API;
use crate::Result;

/// Settings shared by every directory instance
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DirectoryConfig {
    /// Name the directory answers to (`dst` of inbound packets, `src` of responses)
    pub name: String,

    /// Heartbeat-driven eviction of stale entities
    #[serde(default)]
    pub liveness: LivenessConfig,
}

impl DirectoryConfig {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            liveness: LivenessConfig::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(config_error("directory name cannot be empty"));
        }
        self.liveness.validate()
    }
}

/// Liveness sweeper parameters
///
/// An entity is evicted once `now - last_updated > heartbeat_interval_ms * drop_threshold`.
/// The sweep itself runs every `heartbeat_interval_ms`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct LivenessConfig {
    #[serde(default)]
    pub enabled: bool,

    /// How often participants are expected to refresh their entries
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,

    /// Missed heartbeats tolerated before eviction
    #[serde(default = "default_drop_threshold")]
    pub drop_threshold: u64,
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            drop_threshold: default_drop_threshold(),
        }
    }
}

impl LivenessConfig {
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            ..Default::default()
        }
    }

    /// Age beyond which an entity is considered dead
    pub fn ttl_ms(&self) -> u64 {
        self.heartbeat_interval_ms.saturating_mul(self.drop_threshold)
    }

    pub fn validate(&self) -> Result<()> {
        if self.heartbeat_interval_ms < 1 {
            return Err(config_error("liveness.heartbeat_interval_ms must be at least 1ms"));
        }
        if self.drop_threshold < 1 {
            return Err(config_error("liveness.drop_threshold must be greater than 0"));
        }
        Ok(())
    }
}

fn default_heartbeat_interval_ms() -> u64 {
    10_000
}

fn default_drop_threshold() -> u64 {
    3
}

/// One pre-populated `/api/*` entry of the names directory
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ApiDescriptor {
    pub resource: String,
    pub actions: Vec<String>,
}

impl ApiDescriptor {
    fn new(
        resource: &str,
        actions: &[&str],
    ) -> Self {
        Self {
            resource: resource.to_string(),
            actions: actions.iter().map(|a| a.to_string()).collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NamesConfig {
    #[serde(default = "default_names_directory")]
    pub directory: DirectoryConfig,

    /// Entries describing the available directories and their actions
    #[serde(default = "default_bootstrap")]
    pub bootstrap: Vec<ApiDescriptor>,
}

impl Default for NamesConfig {
    fn default() -> Self {
        Self {
            directory: default_names_directory(),
            bootstrap: default_bootstrap(),
        }
    }
}

impl NamesConfig {
    pub fn validate(&self) -> Result<()> {
        self.directory.validate()?;
        for descriptor in &self.bootstrap {
            if !descriptor.resource.starts_with("/api/") {
                return Err(config_error(format!(
                    "names.bootstrap resource {} must live under /api/",
                    descriptor.resource
                )));
            }
        }
        Ok(())
    }
}

fn default_names_directory() -> DirectoryConfig {
    DirectoryConfig {
        name: NAMES_API.to_string(),
        liveness: LivenessConfig::enabled(),
    }
}

fn default_bootstrap() -> Vec<ApiDescriptor> {
    const COMMON: [&str; 5] = ["get", "set", "delete", "watch", "unwatch"];
    let with = |extra: &[&'static str]| {
        let mut actions: Vec<&str> = COMMON.to_vec();
        actions.extend_from_slice(extra);
        actions
    };

    vec![
        ApiDescriptor::new("/api/data.api", &with(&["addChild", "removeChild"])),
        ApiDescriptor::new(
            "/api/intents.api",
            &with(&["register", "unregister", "invoke"]),
        ),
        ApiDescriptor::new("/api/names.api", &with(&[])),
        ApiDescriptor::new("/api/system.api", &with(&[])),
    ]
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DataConfig {
    #[serde(default = "default_data_directory")]
    pub directory: DirectoryConfig,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            directory: default_data_directory(),
        }
    }
}

impl DataConfig {
    pub fn validate(&self) -> Result<()> {
        self.directory.validate()
    }
}

fn default_data_directory() -> DirectoryConfig {
    DirectoryConfig::named(DATA_API)
}
