use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde_json::json;
use serde_json::Value;
use tracing::info;

use crate::CollaboratorError;

/// Remembers which handler a user picked for an intent.
///
/// Best effort: failures are logged and read as "no preference".
#[cfg_attr(test, automock)]
#[async_trait]
pub trait PreferenceStore: Send + Sync + 'static {
    async fn get_preference(
        &self,
        intent: &str,
    ) -> Result<Option<String>, CollaboratorError>;

    async fn set_preference(
        &self,
        intent: &str,
        handler: &str,
    ) -> Result<(), CollaboratorError>;
}

/// Arguments the chooser is opened with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChooserRequest {
    pub chooser_uri: String,
    /// Bus the chooser reports its selection back to
    pub peer: String,
    /// Directory name followed by the in-flight resource
    pub intent_selection: String,
    pub features: String,
    pub candidates: Vec<String>,
}

impl ChooserRequest {
    pub fn params(&self) -> Value {
        json!({
            "ozpIwc.peer": self.peer,
            "ozpIwc.intentSelection": self.intent_selection,
        })
    }
}

/// Presents the candidates to the user.
///
/// The selection does not come back through this call: the chooser writes a
/// `delivering` state update onto the in-flight record, or never answers at all.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Chooser: Send + Sync + 'static {
    async fn open(
        &self,
        request: ChooserRequest,
    ) -> Result<(), CollaboratorError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoPreferences;

#[async_trait]
impl PreferenceStore for NoPreferences {
    async fn get_preference(
        &self,
        _intent: &str,
    ) -> Result<Option<String>, CollaboratorError> {
        Ok(None)
    }

    async fn set_preference(
        &self,
        _intent: &str,
        _handler: &str,
    ) -> Result<(), CollaboratorError> {
        Ok(())
    }
}

/// Chooser for headless processes: records the request and leaves the choice open.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingChooser;

#[async_trait]
impl Chooser for LoggingChooser {
    async fn open(
        &self,
        request: ChooserRequest,
    ) -> Result<(), CollaboratorError> {
        info!(
            uri = %request.chooser_uri,
            params = %request.params(),
            features = %request.features,
            candidates = ?request.candidates,
            "chooser requested"
        );
        Ok(())
    }
}
