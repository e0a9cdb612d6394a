use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{deserialize_duration_from_ms, serialize_duration_to_ms};

/// Configuration for Rhai script execution including security limits and
/// other settings
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RhaiConfig {
    /// Maximum number of operations a script can perform
    #[serde(default = "default_max_operations")]
    pub max_operations: u64,

    /// Maximum function call nesting depth, including nested `require` calls
    #[serde(default = "default_max_call_levels")]
    pub max_call_levels: usize,

    /// Maximum size of strings in characters
    #[serde(default = "default_max_string_size")]
    pub max_string_size: usize,

    /// Maximum number of array elements
    #[serde(default = "default_max_array_size")]
    pub max_array_size: usize,

    /// Maximum number of object map properties
    #[serde(default = "default_max_map_size")]
    pub max_map_size: usize,

    /// Maximum time an invocation may take before the caller gives up on it
    #[serde(
        default = "default_execution_timeout",
        deserialize_with = "deserialize_duration_from_ms",
        serialize_with = "serialize_duration_to_ms"
    )]
    pub execution_timeout: Duration,
}

impl Default for RhaiConfig {
    fn default() -> Self {
        Self {
            max_operations: default_max_operations(),
            max_call_levels: default_max_call_levels(),
            max_string_size: default_max_string_size(),
            max_array_size: default_max_array_size(),
            max_map_size: default_max_map_size(),
            execution_timeout: default_execution_timeout(),
        }
    }
}

fn default_max_operations() -> u64 {
    1_000_000
}

fn default_max_call_levels() -> usize {
    32
}

fn default_max_string_size() -> usize {
    1_048_576
}

fn default_max_array_size() -> usize {
    10_000
}

fn default_max_map_size() -> usize {
    10_000
}

fn default_execution_timeout() -> Duration {
    Duration::from_millis(5_000)
}

#[cfg(test)]
mod tests {
    use config::Config;

    use super::*;

    #[test]
    fn test_rhai_config_default() {
        let config = RhaiConfig::default();
        assert_eq!(config.max_operations, 1_000_000);
        assert_eq!(config.max_call_levels, 32);
        assert_eq!(config.max_string_size, 1_048_576);
        assert_eq!(config.max_array_size, 10_000);
        assert_eq!(config.max_map_size, 10_000);
        assert_eq!(config.execution_timeout, Duration::from_millis(5_000));
    }

    #[test]
    fn test_rhai_config_custom_values_yaml() {
        let yaml = "
            max_operations: 50000
            max_call_levels: 5
            max_string_size: 4096
            max_array_size: 500
            max_map_size: 200
            execution_timeout: 3000
        ";

        let builder =
            Config::builder().add_source(config::File::from_str(yaml, config::FileFormat::Yaml));
        let config: RhaiConfig = builder.build().unwrap().try_deserialize().unwrap();

        assert_eq!(config.max_operations, 50_000);
        assert_eq!(config.max_call_levels, 5);
        assert_eq!(config.max_string_size, 4_096);
        assert_eq!(config.max_array_size, 500);
        assert_eq!(config.max_map_size, 200);
        assert_eq!(config.execution_timeout, Duration::from_millis(3_000));
    }

    #[test]
    fn test_rhai_config_partial_yaml_uses_defaults() {
        let yaml = "
            max_operations: 75000
            execution_timeout: 7500
        ";

        let builder =
            Config::builder().add_source(config::File::from_str(yaml, config::FileFormat::Yaml));
        let config: RhaiConfig = builder.build().unwrap().try_deserialize().unwrap();

        assert_eq!(config.max_operations, 75_000);
        assert_eq!(config.max_call_levels, default_max_call_levels());
        assert_eq!(config.max_string_size, default_max_string_size());
        assert_eq!(config.max_array_size, default_max_array_size());
        assert_eq!(config.execution_timeout, Duration::from_millis(7_500));
    }
}
