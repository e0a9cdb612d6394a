//! Modules are LOCAL services other scripts pull in through `require`.

use serde::{Deserialize, Serialize};

use super::service::{Method, Service};

/// A dependency module as seen by the module resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    /// Namespace the module lives in.
    pub namespace: String,
    /// Path the module is resolved by.
    pub path: String,
    /// Display name.
    pub name: String,
    /// Script text of the module.
    pub source: String,
}

impl Module {
    /// Builds a module from a LOCAL service. Returns `None` for routable
    /// services.
    pub fn from_service(service: &Service) -> Option<Self> {
        if service.method != Some(Method::Local) {
            return None;
        }
        Some(Self {
            namespace: service.namespace.clone(),
            path: service.path.clone(),
            name: service.name.clone(),
            source: service.source.clone(),
        })
    }
}
