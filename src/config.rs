use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;
use validator::{Validate, ValidationError};

use crate::node::StoreRef;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    #[error("Parse error for {field}: {value} - {source}")]
    Parse {
        field: String,
        value: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Engine configuration with validation
#[derive(Clone, Debug, Validate, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Batch width for node reference prefetching (0 or less disables batching)
    pub bulk_fetch_size: i32,

    /// Permission evaluation budget when a query sets no explicit maximum
    #[validate(range(min = 1, message = "Max permission checks must be at least 1"))]
    pub max_permission_checks: usize,

    /// Store searched when a query names none
    #[validate(custom(function = "validate_store_ref"))]
    pub default_store: String,

    /// Tenant domain stripped from store identifiers
    pub tenant_domain: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            bulk_fetch_size: 1000,
            max_permission_checks: 1000,
            default_store: "workspace://SpacesStore".to_string(),
            tenant_domain: None,
        }
    }
}

fn validate_store_ref(value: &str) -> Result<(), ValidationError> {
    value
        .parse::<StoreRef>()
        .map(|_| ())
        .map_err(|_| ValidationError::new("store_ref").with_message("Default store must look like protocol://identifier".into()))
}

impl EngineConfig {
    /// Create configuration from environment variables with validation
    pub fn from_env() -> Result<Self, ConfigError> {
        let tenant_domain = env::var("EAVQUERY_TENANT_DOMAIN")
            .ok()
            .filter(|domain| !domain.trim().is_empty());
        let config = Self {
            bulk_fetch_size: parse_env_var("EAVQUERY_BULK_FETCH_SIZE", "1000")?,
            max_permission_checks: parse_env_var("EAVQUERY_MAX_PERMISSION_CHECKS", "1000")?,
            default_store: env::var("EAVQUERY_DEFAULT_STORE")
                .unwrap_or_else(|_| "workspace://SpacesStore".to_string()),
            tenant_domain,
        };

        config.validate()?;
        Ok(config)
    }

    /// Create configuration from CLI arguments with validation
    pub fn from_cli(cli: CliConfig) -> Result<Self, ConfigError> {
        let config = Self {
            bulk_fetch_size: cli.bulk_fetch_size,
            max_permission_checks: cli.max_permission_checks,
            default_store: cli.default_store,
            tenant_domain: cli.tenant_domain,
        };

        config.validate()?;
        Ok(config)
    }

    /// Create configuration from YAML file
    pub fn from_yaml_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Parse {
            field: "yaml_file".to_string(),
            value: "file read failed".to_string(),
            source: Box::new(e),
        })?;

        let config: Self = serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
            field: "yaml_content".to_string(),
            value: content,
            source: Box::new(e),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Parsed form of `default_store`
    pub fn default_store_ref(&self) -> Result<StoreRef, ConfigError> {
        self.default_store
            .parse()
            .map_err(|e| ConfigError::Parse {
                field: "default_store".to_string(),
                value: self.default_store.clone(),
                source: Box::new(e),
            })
    }
}

/// CLI configuration (parsed from command line arguments)
#[derive(Clone, Debug)]
pub struct CliConfig {
    pub bulk_fetch_size: i32,
    pub max_permission_checks: usize,
    pub default_store: String,
    pub tenant_domain: Option<String>,
}

/// Parse an environment variable with a default value
fn parse_env_var<T: std::str::FromStr>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value = env::var(key).unwrap_or_else(|_| default.to_string());
    value.parse().map_err(|e| ConfigError::Parse {
        field: key.to_string(),
        value,
        source: Box::new(e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.bulk_fetch_size, 1000);
        assert_eq!(config.default_store_ref().unwrap(), StoreRef::workspace());
    }

    #[test]
    fn test_zero_permission_checks() {
        let config = EngineConfig {
            max_permission_checks: 0, // Invalid
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_default_store() {
        let config = EngineConfig {
            default_store: "SpacesStore".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_non_positive_bulk_size_is_valid() {
        let config = EngineConfig {
            bulk_fetch_size: -1,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_from_env() {
        env::set_var("EAVQUERY_BULK_FETCH_SIZE", "25");
        env::set_var("EAVQUERY_TENANT_DOMAIN", "acme");
        let config = EngineConfig::from_env().unwrap();
        env::remove_var("EAVQUERY_BULK_FETCH_SIZE");
        env::remove_var("EAVQUERY_TENANT_DOMAIN");
        assert_eq!(config.bulk_fetch_size, 25);
        assert_eq!(config.tenant_domain.as_deref(), Some("acme"));
        assert_eq!(config.max_permission_checks, 1000);
    }

    #[test]
    #[serial]
    fn test_from_env_parse_error() {
        env::set_var("EAVQUERY_MAX_PERMISSION_CHECKS", "lots");
        let result = EngineConfig::from_env();
        env::remove_var("EAVQUERY_MAX_PERMISSION_CHECKS");
        assert!(matches!(result, Err(ConfigError::Parse { field, .. }) if field == "EAVQUERY_MAX_PERMISSION_CHECKS"));
    }
}
