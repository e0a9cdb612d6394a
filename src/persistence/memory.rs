//! In-memory service repository.

use async_trait::async_trait;
use dashmap::{DashMap, mapref::entry::Entry};

use super::{error::PersistenceError, traits::ServiceRepository};
use crate::{
    engine::capabilities::ModuleResolver,
    models::{Method, Module, Service},
};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ServiceKey {
    namespace: String,
    method: Method,
    path: String,
}

impl ServiceKey {
    fn new(namespace: &str, method: Method, path: &str) -> Self {
        Self { namespace: namespace.to_string(), method, path: path.to_string() }
    }

    fn of(service: &Service) -> Result<Self, PersistenceError> {
        let method = service.method.ok_or_else(|| {
            PersistenceError::InvalidInput(format!("Service {} has no method", service.path))
        })?;
        if service.path.is_empty() {
            return Err(PersistenceError::InvalidInput("Service path is empty".to_string()));
        }
        Ok(Self::new(&service.namespace, method, &service.path))
    }
}

impl std::fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.namespace, self.method, self.path)
    }
}

/// Keeps services in a concurrent map. Also resolves LOCAL services as
/// modules.
#[derive(Debug, Default)]
pub struct InMemoryServiceRepository {
    services: DashMap<ServiceKey, Service>,
}

impl InMemoryServiceRepository {
    /// Creates an empty repository.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ServiceRepository for InMemoryServiceRepository {
    #[tracing::instrument(skip(self, service), level = "debug", fields(namespace = %service.namespace, path = %service.path))]
    async fn create_service(&self, service: Service) -> Result<(), PersistenceError> {
        let key = ServiceKey::of(&service)?;
        match self.services.entry(key.clone()) {
            Entry::Occupied(_) => Err(PersistenceError::AlreadyExists(key.to_string())),
            Entry::Vacant(entry) => {
                entry.insert(service);
                tracing::debug!(service = %key, "Service created.");
                Ok(())
            }
        }
    }

    #[tracing::instrument(skip(self, service), level = "debug", fields(namespace = %service.namespace, path = %service.path))]
    async fn modify_service(&self, service: Service) -> Result<(), PersistenceError> {
        let key = ServiceKey::of(&service)?;
        match self.services.get_mut(&key) {
            Some(mut stored) => {
                *stored = service;
                tracing::debug!(service = %key, "Service modified.");
                Ok(())
            }
            None => Err(PersistenceError::NotFound(key.to_string())),
        }
    }

    async fn delete_service(
        &self,
        namespace: &str,
        method: Method,
        path: &str,
    ) -> Result<(), PersistenceError> {
        let key = ServiceKey::new(namespace, method, path);
        match self.services.remove(&key) {
            Some(_) => {
                tracing::debug!(service = %key, "Service deleted.");
                Ok(())
            }
            None => Err(PersistenceError::NotFound(key.to_string())),
        }
    }

    async fn get_service(
        &self,
        namespace: &str,
        method: Method,
        path: &str,
    ) -> Result<Option<Service>, PersistenceError> {
        Ok(self
            .services
            .get(&ServiceKey::new(namespace, method, path))
            .map(|entry| entry.value().clone()))
    }

    async fn list_services(
        &self,
        namespace: &str,
        prefix: &str,
    ) -> Result<Vec<Service>, PersistenceError> {
        let mut services: Vec<Service> = self
            .services
            .iter()
            .filter(|entry| entry.key().namespace == namespace && entry.key().path.starts_with(prefix))
            .map(|entry| entry.value().clone())
            .collect();
        services.sort_by(|a, b| a.path.cmp(&b.path).then_with(|| a.method.cmp(&b.method)));
        Ok(services)
    }
}

impl ModuleResolver for InMemoryServiceRepository {
    fn select(&self, namespace: &str, path: &str) -> Option<Module> {
        self.services
            .get(&ServiceKey::new(namespace, Method::Local, path))
            .and_then(|entry| Module::from_service(entry.value()))
    }
}
