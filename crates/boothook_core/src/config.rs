//! Host integration configuration.
//!
//! # Responsibility
//! - Carry the application root explicitly instead of discovering it from the
//!   installer's working directory.
//! - Name the metadata keys the host adapter reads from package extras.
//!
//! # Invariants
//! - `application_dir` and all keys are non-empty after loading.

use crate::strategy::DEFAULT_INSTALLER_KEY;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Default key inside package extras holding the contribution declaration.
pub const DEFAULT_EXTRA_KEY: &str = "boothook-installer";
/// Default prefix of package types handled by the host adapter.
pub const DEFAULT_PACKAGE_TYPE_PREFIX: &str = "boothook-";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct HostConfig {
    pub application_dir: PathBuf,
    pub extra_key: String,
    pub package_type_prefix: String,
    pub installer_key: String,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            application_dir: PathBuf::from("."),
            extra_key: DEFAULT_EXTRA_KEY.to_string(),
            package_type_prefix: DEFAULT_PACKAGE_TYPE_PREFIX.to_string(),
            installer_key: DEFAULT_INSTALLER_KEY.to_string(),
        }
    }
}

impl HostConfig {
    /// Creates a default config rooted at `application_dir`.
    pub fn for_application(application_dir: impl Into<PathBuf>) -> Self {
        Self {
            application_dir: application_dir.into(),
            ..Self::default()
        }
    }

    /// Parses a JSON config document; missing fields take defaults.
    pub fn from_json_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(input).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a JSON config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let input = std::fs::read_to_string(path).map_err(|err| ConfigError::Read {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        Self::from_json_str(&input)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.application_dir.as_os_str().is_empty() {
            return Err(ConfigError::EmptyValue("applicationDir"));
        }
        if self.extra_key.trim().is_empty() {
            return Err(ConfigError::EmptyValue("extraKey"));
        }
        if self.package_type_prefix.trim().is_empty() {
            return Err(ConfigError::EmptyValue("packageTypePrefix"));
        }
        if self.installer_key.trim().is_empty() {
            return Err(ConfigError::EmptyValue("installerKey"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Read { path: PathBuf, message: String },
    Parse(String),
    EmptyValue(&'static str),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read { path, message } => {
                write!(f, "failed to read config `{}`: {message}", path.display())
            }
            Self::Parse(message) => write!(f, "invalid config: {message}"),
            Self::EmptyValue(field) => write!(f, "config field `{field}` must not be empty"),
        }
    }
}

impl Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::{ConfigError, HostConfig, DEFAULT_EXTRA_KEY};
    use std::io::Write;
    use std::path::PathBuf;

    #[test]
    fn missing_fields_take_defaults() {
        let config =
            HostConfig::from_json_str(r#"{ "applicationDir": "/srv/app" }"#).expect("parse");
        assert_eq!(config.application_dir, PathBuf::from("/srv/app"));
        assert_eq!(config.extra_key, DEFAULT_EXTRA_KEY);
        assert_eq!(config.installer_key, "installer-class");
    }

    #[test]
    fn rejects_empty_keys() {
        let err = HostConfig::from_json_str(r#"{ "extraKey": "  " }"#).expect_err("must fail");
        assert_eq!(err, ConfigError::EmptyValue("extraKey"));
    }

    #[test]
    fn rejects_unknown_fields() {
        let err = HostConfig::from_json_str(r#"{ "vendorDir": "/x" }"#).expect_err("must fail");
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, r#"{{ "applicationDir": "/srv/app", "packageTypePrefix": "acme-" }}"#)
            .expect("write config");

        let config = HostConfig::load(file.path()).expect("load");
        assert_eq!(config.package_type_prefix, "acme-");
    }

    #[test]
    fn load_reports_missing_file() {
        let err = HostConfig::load(&PathBuf::from("/nonexistent/boothook.json"))
            .expect_err("must fail");
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
