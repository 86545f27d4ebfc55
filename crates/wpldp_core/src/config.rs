//! Runtime settings and well-known store keys.
//!
//! # Responsibility
//! - Carry the values the core needs from its host: target data-model
//!   version, resource API path segment, legacy key prefix, deprecated
//!   containers.
//! - Load those values from a JSON document with per-field defaults.
//!
//! # Invariants
//! - `target_version` and `api_path` are never empty after validation.

use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Key-value store key of the version marker.
pub const VERSION_MARKER_KEY: &str = "wpldp_version";
/// Key-value store key of the "initialize containers" checkbox.
pub const CONTAINER_INIT_FLAG_KEY: &str = "container_init";
/// Key-value store key of the JSON-LD context URL.
pub const CONTEXT_URL_KEY: &str = "context_url";

pub const DEFAULT_TARGET_VERSION: &str = "2.0.7";
pub const DEFAULT_REINIT_THRESHOLD: &str = "1.1.0";
pub const DEFAULT_API_PATH: &str = "api/ldp/";
pub const DEFAULT_LEGACY_PREFIX: &str = "ldp_";
pub const DEFAULT_TRANSIENT_MARKER: &str = "transient";
pub const DEFAULT_CONTEXT_URL: &str = "http://lov.okfn.org/dataset/lov/context";

/// A container slug retired by the data-model migration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeprecatedContainer {
    pub slug: String,
    /// Slug whose category inherits the retired container's resources.
    #[serde(default)]
    pub successor: Option<String>,
}

impl DeprecatedContainer {
    pub fn new(slug: &str, successor: Option<&str>) -> Self {
        Self {
            slug: slug.to_string(),
            successor: successor.map(str::to_string),
        }
    }
}

/// Core settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LdpSettings {
    /// Data-model version this build migrates to.
    pub target_version: String,
    /// Targets at or above this version force a container reinit on upgrade.
    pub reinit_threshold: String,
    /// Path segment marking the resource API, e.g. `api/ldp/`.
    pub api_path: String,
    /// Namespace prefix stripped from legacy keys on upgrade.
    pub legacy_prefix: String,
    pub deprecated_containers: Vec<DeprecatedContainer>,
    /// Option keys containing this marker are purged on upgrade.
    pub transient_marker: String,
    pub context_url: String,
    /// Directory holding `<slug>.json` model documents. Built-in models are
    /// used when unset.
    pub model_dir: Option<PathBuf>,
}

impl Default for LdpSettings {
    fn default() -> Self {
        Self {
            target_version: DEFAULT_TARGET_VERSION.to_string(),
            reinit_threshold: DEFAULT_REINIT_THRESHOLD.to_string(),
            api_path: DEFAULT_API_PATH.to_string(),
            legacy_prefix: DEFAULT_LEGACY_PREFIX.to_string(),
            deprecated_containers: vec![
                DeprecatedContainer::new("actor", Some("person")),
                DeprecatedContainer::new("project", Some("initiative")),
                DeprecatedContainer::new("resource", None),
                DeprecatedContainer::new("idea", None),
            ],
            transient_marker: DEFAULT_TRANSIENT_MARKER.to_string(),
            context_url: DEFAULT_CONTEXT_URL.to_string(),
            model_dir: None,
        }
    }
}

impl LdpSettings {
    /// Parses settings from JSON text. Missing fields take their defaults.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let settings: Self = serde_json::from_str(text).map_err(ConfigError::Parse)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Loads settings from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|err| ConfigError::Io {
            path: path.to_path_buf(),
            source: err,
        })?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target_version.trim().is_empty() {
            return Err(ConfigError::Invalid("target_version cannot be empty"));
        }
        if self.api_path.trim().is_empty() {
            return Err(ConfigError::Invalid("api_path cannot be empty"));
        }
        Ok(())
    }
}

/// Settings loading errors.
#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(serde_json::Error),
    Invalid(&'static str),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read settings `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid settings JSON: {err}"),
            Self::Invalid(message) => write!(f, "invalid settings: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, LdpSettings, DEFAULT_API_PATH};

    #[test]
    fn partial_json_keeps_defaults() {
        let settings = LdpSettings::from_json_str(r#"{"target_version": "2.1.0"}"#)
            .expect("partial settings should parse");
        assert_eq!(settings.target_version, "2.1.0");
        assert_eq!(settings.api_path, DEFAULT_API_PATH);
        assert_eq!(settings.deprecated_containers.len(), 4);
    }

    #[test]
    fn empty_api_path_is_rejected() {
        let err = LdpSettings::from_json_str(r#"{"api_path": " "}"#)
            .expect_err("blank api path must be rejected");
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = LdpSettings::load(dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
