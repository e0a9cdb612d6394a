//! Storage interface for service metadata.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use super::error::PersistenceError;
use crate::models::{Method, Service};

/// Stores services keyed by namespace, method and path.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ServiceRepository: Send + Sync {
    /// Stores a new service. Fails if one is already stored under the same
    /// namespace, method and path.
    async fn create_service(&self, service: Service) -> Result<(), PersistenceError>;

    /// Replaces a stored service.
    async fn modify_service(&self, service: Service) -> Result<(), PersistenceError>;

    /// Removes a stored service.
    async fn delete_service(
        &self,
        namespace: &str,
        method: Method,
        path: &str,
    ) -> Result<(), PersistenceError>;

    /// Retrieves a service by its exact path template.
    async fn get_service(
        &self,
        namespace: &str,
        method: Method,
        path: &str,
    ) -> Result<Option<Service>, PersistenceError>;

    /// Lists the namespace's services whose path starts with `prefix`,
    /// ordered by path and method.
    async fn list_services(
        &self,
        namespace: &str,
        prefix: &str,
    ) -> Result<Vec<Service>, PersistenceError>;
}
