use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use super::config_error;
use super::DirectoryConfig;
use crate::constants::INTENTS_API;
use crate::Result;

/// Intent resolution settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct IntentsConfig {
    #[serde(default = "default_intents_directory")]
    pub directory: DirectoryConfig,

    /// Location of the chooser presented when several handlers match
    #[serde(default = "default_chooser_uri")]
    pub chooser_uri: String,

    /// Window features passed through to the chooser
    #[serde(default = "default_chooser_features")]
    pub chooser_features: String,

    /// Upper bound on a preference lookup; expiry counts as "no preference"
    #[serde(default = "default_preference_timeout_ms")]
    pub preference_timeout_ms: u64,
}

impl Default for IntentsConfig {
    fn default() -> Self {
        Self {
            directory: default_intents_directory(),
            chooser_uri: default_chooser_uri(),
            chooser_features: default_chooser_features(),
            preference_timeout_ms: default_preference_timeout_ms(),
        }
    }
}

impl IntentsConfig {
    pub fn preference_timeout(&self) -> Duration {
        Duration::from_millis(self.preference_timeout_ms)
    }

    pub fn validate(&self) -> Result<()> {
        self.directory.validate()?;
        if self.chooser_uri.trim().is_empty() {
            return Err(config_error("intents.chooser_uri cannot be empty"));
        }
        if self.preference_timeout_ms < 1 {
            return Err(config_error("intents.preference_timeout_ms must be at least 1ms"));
        }
        Ok(())
    }
}

fn default_intents_directory() -> DirectoryConfig {
    DirectoryConfig::named(INTENTS_API)
}

fn default_chooser_uri() -> String {
    "intentsChooser.html".to_string()
}

fn default_chooser_features() -> String {
    "width=330,height=500".to_string()
}

fn default_preference_timeout_ms() -> u64 {
    1_000
}
