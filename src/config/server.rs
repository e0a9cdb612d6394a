use serde::Deserialize;

/// Configuration for the HTTP server.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Address and port for the HTTP server to listen on.
    #[serde(default = "default_listen_address")]
    pub listen_address: String,

    /// Namespace used when a request carries no `namespace` header.
    #[serde(default = "default_namespace")]
    pub default_namespace: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { listen_address: default_listen_address(), default_namespace: default_namespace() }
    }
}

/// Provides the default value for listen_address.
fn default_listen_address() -> String {
    "0.0.0.0:8080".to_string()
}

/// Provides the default value for default_namespace.
fn default_namespace() -> String {
    "default".to_string()
}

#[cfg(test)]
mod tests {
    use config::Config;

    use super::*;

    #[test]
    fn test_default_server_config() {
        let yaml = r#""#; // Empty YAML should use defaults
        let config = Config::builder()
            .add_source(config::File::from_str(yaml, config::FileFormat::Yaml))
            .build()
            .unwrap()
            .try_deserialize::<ServerConfig>()
            .unwrap();
        assert_eq!(config.listen_address, default_listen_address());
        assert_eq!(config.default_namespace, "default");
    }

    #[test]
    fn test_custom_server_config() {
        let yaml = r#"
          listen_address: "0.0.0.0:3333"
          default_namespace: "tenant-a"
        "#;
        let config = Config::builder()
            .add_source(config::File::from_str(yaml, config::FileFormat::Yaml))
            .build()
            .unwrap()
            .try_deserialize::<ServerConfig>()
            .unwrap();
        assert_eq!(config.listen_address, "0.0.0.0:3333");
        assert_eq!(config.default_namespace, "tenant-a");
    }
}
