//! Configuration (reflekt.toml)
//!
//! ```toml
//! [cache]
//! eviction_interval_secs = 300
//!
//! [access]
//! setter_retry_limit = 5
//!
//! [scan]
//! unit_extension = "class"
//! classpath = ["target/classes"]
//! default_archives = ["application.jar", "app.jar"]
//! system_namespaces = ["java.", "javax.", "jdk."]
//! ```
//!
//! Every key is optional. `REFLEKT_CLASSPATH` (platform path-list syntax)
//! appends to `scan.classpath`.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::reflect::constants::{FieldFilter, DEFAULT_SYSTEM_NAMESPACES};
use crate::reflect::DEFAULT_SETTER_RETRY_LIMIT;
use crate::scan::{ScanOptions, DEFAULT_ARCHIVE_NAMES, DEFAULT_UNIT_EXTENSION};

/// Default configuration file name
pub const CONFIG_FILE_NAME: &str = "reflekt.toml";

/// Environment variable extending the class path
pub const CLASSPATH_ENV: &str = "REFLEKT_CLASSPATH";

/// Errors that can occur while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Failed to render TOML
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A value is out of range
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReflektConfig {
    /// Accessor cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Member access settings
    #[serde(default)]
    pub access: AccessConfig,

    /// Namespace scanning settings
    #[serde(default)]
    pub scan: ScanConfig,
}

/// `[cache]`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheConfig {
    /// Seconds between full cache evictions (default: 300)
    #[serde(default = "default_eviction_interval_secs")]
    pub eviction_interval_secs: u64,
}

/// `[access]`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccessConfig {
    /// Mutator attempts before falling back to direct field access (default: 5)
    #[serde(default = "default_setter_retry_limit")]
    pub setter_retry_limit: usize,
}

/// `[scan]`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScanConfig {
    /// Compiled-unit extension, without the dot (default: "class")
    #[serde(default = "default_unit_extension")]
    pub unit_extension: String,

    /// Directory roots for the directory walk
    #[serde(default)]
    pub classpath: Vec<PathBuf>,

    /// Archive names tried after the code sources
    #[serde(default = "default_archives")]
    pub default_archives: Vec<PathBuf>,

    /// Archive tried last
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive: Option<PathBuf>,

    /// Namespace prefixes treated as platform library types
    #[serde(default = "default_system_namespaces")]
    pub system_namespaces: Vec<String>,
}

fn default_eviction_interval_secs() -> u64 {
    300
}

fn default_setter_retry_limit() -> usize {
    DEFAULT_SETTER_RETRY_LIMIT
}

fn default_unit_extension() -> String {
    DEFAULT_UNIT_EXTENSION.to_string()
}

fn default_archives() -> Vec<PathBuf> {
    DEFAULT_ARCHIVE_NAMES.iter().map(PathBuf::from).collect()
}

fn default_system_namespaces() -> Vec<String> {
    DEFAULT_SYSTEM_NAMESPACES.iter().map(|s| s.to_string()).collect()
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            eviction_interval_secs: default_eviction_interval_secs(),
        }
    }
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            setter_retry_limit: default_setter_retry_limit(),
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            unit_extension: default_unit_extension(),
            classpath: Vec::new(),
            default_archives: default_archives(),
            archive: None,
            system_namespaces: default_system_namespaces(),
        }
    }
}

impl ReflektConfig {
    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a string
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let mut config: ReflektConfig = toml::from_str(content)?;
        config.scan.unit_extension = config.scan.unit_extension.trim_start_matches('.').to_string();
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if given, else `reflekt.toml` in `dir` if present, else defaults
    pub fn discover(path: Option<&Path>, dir: &Path) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let candidate = dir.join(CONFIG_FILE_NAME);
                if candidate.is_file() {
                    Self::from_file(&candidate)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache.eviction_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "cache.eviction_interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.access.setter_retry_limit == 0 {
            return Err(ConfigError::Invalid(
                "access.setter_retry_limit must be at least 1".to_string(),
            ));
        }
        if self.scan.unit_extension.is_empty() {
            return Err(ConfigError::Invalid(
                "scan.unit_extension cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Apply `REFLEKT_CLASSPATH` from the process environment
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(raw) = std::env::var_os(CLASSPATH_ENV) {
            self.extend_classpath(&raw);
        }
        self
    }

    /// Append every entry of a platform path list to the class path
    pub fn extend_classpath(&mut self, raw: &OsStr) {
        for entry in std::env::split_paths(raw) {
            if !entry.as_os_str().is_empty() && !self.scan.classpath.contains(&entry) {
                self.scan.classpath.push(entry);
            }
        }
    }

    /// Render as TOML
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Eviction interval as a duration
    pub fn eviction_interval(&self) -> Duration {
        Duration::from_secs(self.cache.eviction_interval_secs)
    }

    /// Options for a [`NamespaceScanner`](crate::scan::NamespaceScanner)
    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            unit_extension: self.scan.unit_extension.clone(),
            classpath: self.scan.classpath.clone(),
            self_location: None,
            default_archives: self.scan.default_archives.clone(),
            explicit_archive: self.scan.archive.clone(),
        }
    }

    /// Declared-field filter using the configured system namespaces
    pub fn field_filter(&self) -> FieldFilter {
        FieldFilter {
            system_namespaces: self.scan.system_namespaces.clone(),
            ..FieldFilter::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_file() {
        let config = ReflektConfig::from_toml_str("").unwrap();
        assert_eq!(config, ReflektConfig::default());
        assert_eq!(config.eviction_interval(), Duration::from_secs(300));
        assert_eq!(config.access.setter_retry_limit, 5);
        assert_eq!(config.scan.unit_extension, "class");
        assert_eq!(
            config.scan.default_archives,
            vec![PathBuf::from("application.jar"), PathBuf::from("app.jar")]
        );
        assert!(config.scan.system_namespaces.contains(&"java.".to_string()));
    }

    #[test]
    fn test_overrides() {
        let config = ReflektConfig::from_toml_str(
            r#"
[cache]
eviction_interval_secs = 60

[access]
setter_retry_limit = 2

[scan]
unit_extension = ".unit"
classpath = ["build/classes", "build/resources"]
archive = "dist/service.jar"
system_namespaces = ["std."]
"#,
        )
        .unwrap();

        assert_eq!(config.eviction_interval(), Duration::from_secs(60));
        assert_eq!(config.access.setter_retry_limit, 2);
        assert_eq!(config.scan.unit_extension, "unit");
        assert_eq!(config.scan.classpath.len(), 2);
        assert_eq!(config.scan.default_archives.len(), 2);

        let options = config.scan_options();
        assert_eq!(options.explicit_archive, Some(PathBuf::from("dist/service.jar")));
        assert_eq!(config.field_filter().system_namespaces, vec!["std.".to_string()]);
    }

    #[test]
    fn test_validation() {
        let err = ReflektConfig::from_toml_str("[cache]\neviction_interval_secs = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = ReflektConfig::from_toml_str("[access]\nsetter_retry_limit = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = ReflektConfig::from_toml_str("[cache]\neviction_interval_secs = \"soon\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_extend_classpath() {
        let mut config = ReflektConfig::default();
        config.scan.classpath.push(PathBuf::from("a"));
        let joined = std::env::join_paths(["a", "b", "c"]).unwrap();
        config.extend_classpath(&joined);
        assert_eq!(
            config.scan.classpath,
            vec![PathBuf::from("a"), PathBuf::from("b"), PathBuf::from("c")]
        );
    }

    #[test]
    fn test_toml_round_trip() {
        let config = ReflektConfig::default();
        let rendered = config.to_toml_string().unwrap();
        assert!(rendered.contains("eviction_interval_secs = 300"));
        assert_eq!(ReflektConfig::from_toml_str(&rendered).unwrap(), config);
    }

    #[test]
    fn test_discover_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            ReflektConfig::discover(None, dir.path()).unwrap(),
            ReflektConfig::default()
        );

        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "[access]\nsetter_retry_limit = 9\n").unwrap();
        let config = ReflektConfig::discover(None, dir.path()).unwrap();
        assert_eq!(config.access.setter_retry_limit, 9);
    }
}
