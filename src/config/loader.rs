//! Tenant file loading from disk.

use std::path::Path;
use std::fs;
use crate::config::schema::TenantsFile;
use crate::config::validation::{validate_tenants, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    /// No tenant file path was configured.
    NotConfigured,
    Io(std::io::Error),
    Parse(serde_yaml::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NotConfigured => write!(f, "No domain config file configured"),
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(e) => Some(e),
            _ => None,
        }
    }
}

/// Load and validate the tenant file from YAML.
pub fn load_tenants(path: &Path) -> Result<TenantsFile, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let tenants: TenantsFile = serde_yaml::from_str(&content).map_err(ConfigError::Parse)?;

    validate_tenants(&tenants).map_err(ConfigError::Validation)?;

    Ok(tenants)
}
