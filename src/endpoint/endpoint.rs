use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde_json::Value;

use crate::CollaboratorError;

/// Narrow contract of the persistence service.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Endpoint: Send + Sync + 'static {
    async fn get(
        &self,
        path: &str,
    ) -> Result<Value, CollaboratorError>;

    async fn put(
        &self,
        path: &str,
        payload: Value,
    ) -> Result<(), CollaboratorError>;

    async fn delete(
        &self,
        path: &str,
    ) -> Result<(), CollaboratorError>;
}
