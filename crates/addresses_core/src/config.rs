//! Address store configuration.
//!
//! # Responsibility
//! - Hold the classification allow-list and default label.
//! - Load overrides from JSON, with every key optional.
//!
//! # Invariants
//! - Configuration is resolved once and passed explicitly; nothing in core
//!   reads ambient global settings.
//! - When custom types are disallowed, `default_type` must be in `types`.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

const DEFAULT_TYPES: &[&str] = &["home", "work", "billing", "shipping", "mailing", "other"];
const DEFAULT_TYPE: &str = "home";

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    /// `default_type` is not accepted by the configured allow-list.
    InvalidDefault(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "failed to read address config: {err}"),
            Self::Parse(err) => write!(f, "invalid address config: {err}"),
            Self::InvalidDefault(value) => write!(
                f,
                "default_type `{value}` is not in types and custom types are disabled"
            ),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Parse(err) => Some(err),
            Self::InvalidDefault(_) => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

/// Classification settings for addresses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AddressConfig {
    /// Known classification labels.
    pub types: Vec<String>,
    /// Label used when a payload carries no `type`.
    pub default_type: String,
    /// When false, only labels in `types` pass validation.
    pub allow_custom_types: bool,
}

impl Default for AddressConfig {
    fn default() -> Self {
        Self {
            types: DEFAULT_TYPES.iter().map(|value| value.to_string()).collect(),
            default_type: DEFAULT_TYPE.to_string(),
            allow_custom_types: true,
        }
    }
}

impl AddressConfig {
    /// Parses JSON overrides on top of defaults.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.check()?;
        Ok(config)
    }

    /// Reads and parses a JSON config file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Returns whether `label` is an acceptable classification.
    pub fn accepts_type(&self, label: &str) -> bool {
        self.allow_custom_types || self.types.iter().any(|known| known == label)
    }

    fn check(&self) -> Result<(), ConfigError> {
        if !self.accepts_type(&self.default_type) {
            return Err(ConfigError::InvalidDefault(self.default_type.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{AddressConfig, ConfigError};

    #[test]
    fn defaults_match_packaged_settings() {
        let config = AddressConfig::default();
        assert_eq!(config.default_type, "home");
        assert!(config.allow_custom_types);
        assert_eq!(
            config.types,
            vec!["home", "work", "billing", "shipping", "mailing", "other"]
        );
    }

    #[test]
    fn partial_json_keeps_defaults_for_missing_keys() {
        let config = AddressConfig::from_json_str(r#"{ "allow_custom_types": false }"#).unwrap();
        assert!(!config.allow_custom_types);
        assert_eq!(config.default_type, "home");
        assert!(config.accepts_type("work"));
        assert!(!config.accepts_type("warehouse"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = AddressConfig::from_json_str(r#"{ "tenancy": "multi" }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn default_outside_allow_list_is_rejected() {
        let err = AddressConfig::from_json_str(
            r#"{ "types": ["work"], "allow_custom_types": false }"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidDefault(value) if value == "home"));
    }

    #[test]
    fn reads_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("addresses.json");
        std::fs::write(&path, r#"{ "default_type": "work" }"#).unwrap();

        let config = AddressConfig::from_json_file(&path).unwrap();
        assert_eq!(config.default_type, "work");
    }
}
