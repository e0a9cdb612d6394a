//! A builder for creating `Service` instances in tests.

use crate::models::{DataType, Method, Param, Service};

/// A builder for creating `Service` instances in tests.
pub struct ServiceBuilder {
    namespace: Option<String>,
    path: Option<String>,
    method: Option<Method>,
    name: Option<String>,
    source: Option<String>,
    params: Vec<Param>,
}

impl Default for ServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceBuilder {
    /// Creates a new `ServiceBuilder` instance.
    pub fn new() -> Self {
        ServiceBuilder {
            namespace: None,
            path: None,
            method: None,
            name: None,
            source: None,
            params: Vec::new(),
        }
    }

    /// Sets the namespace for the service.
    pub fn namespace(mut self, namespace: &str) -> Self {
        self.namespace = Some(namespace.to_string());
        self
    }

    /// Sets the path for the service.
    pub fn path(mut self, path: &str) -> Self {
        self.path = Some(path.to_string());
        self
    }

    /// Sets the method for the service.
    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Sets the display name for the service.
    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    /// Sets the script source for the service.
    pub fn source(mut self, source: &str) -> Self {
        self.source = Some(source.to_string());
        self
    }

    /// Declares a parameter.
    pub fn param(mut self, name: &str, data_type: DataType) -> Self {
        self.params.push(Param::new(name, data_type));
        self
    }

    /// Builds the `Service` instance.
    pub fn build(self) -> Service {
        Service {
            namespace: self.namespace.unwrap_or("test".to_string()),
            path: self.path.unwrap_or("/test".to_string()),
            method: Some(self.method.unwrap_or(Method::Get)),
            name: self.name.unwrap_or_default(),
            source: self.source.unwrap_or("setRespData(true);".to_string()),
            params: self.params,
        }
    }
}
