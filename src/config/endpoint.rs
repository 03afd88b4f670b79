use serde::Deserialize;
use serde::Serialize;

use super::config_error;
use crate::Result;

/// Externally persisted node data
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EndpointConfig {
    /// Path of the root link document
    #[serde(default = "default_api_root")]
    pub api_root: String,

    /// Fetch remote entities while transitioning to leader
    #[serde(default = "default_load_on_leadership")]
    pub load_on_leadership: bool,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            api_root: default_api_root(),
            load_on_leadership: default_load_on_leadership(),
        }
    }
}

impl EndpointConfig {
    pub fn validate(&self) -> Result<()> {
        if self.api_root.is_empty() {
            return Err(config_error("endpoint.api_root cannot be empty"));
        }
        Ok(())
    }
}

fn default_api_root() -> String {
    "/api".to_string()
}

fn default_load_on_leadership() -> bool {
    true
}
