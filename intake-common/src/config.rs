//! Configuration loading and resolution
//!
//! Settings are resolved in priority order:
//! 1. Command-line arguments
//! 2. Environment variables (collected together with the CLI by clap)
//! 3. TOML configuration file
//! 4. Built-in defaults
//!
//! A missing default config file is not an error; an explicitly named one is.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_UPLOAD_DIR: &str = "uploads";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Bootstrap configuration read from TOML
///
/// Every field is optional so a partial file still parses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// Path to the Google service-account JSON key
    #[serde(default)]
    pub google_key_file: Option<PathBuf>,

    /// Destination spreadsheet identifier
    #[serde(default)]
    pub spreadsheet_id: Option<String>,

    /// Drive folder receiving uploaded files
    #[serde(default)]
    pub drive_folder_id: Option<String>,

    /// CORS origins; empty or `*` allows any origin
    #[serde(default)]
    pub allowed_origins: Option<Vec<String>>,

    #[serde(default)]
    pub host: Option<String>,

    #[serde(default)]
    pub port: Option<u16>,

    /// Directory for staged uploads
    #[serde(default)]
    pub upload_dir: Option<PathBuf>,

    /// Request body limit in bytes
    #[serde(default)]
    pub max_upload_bytes: Option<usize>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Command-line (and environment) overrides
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_path: Option<PathBuf>,
    pub google_key_file: Option<PathBuf>,
    pub spreadsheet_id: Option<String>,
    pub drive_folder_id: Option<String>,
    pub allowed_origins: Option<Vec<String>>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub upload_dir: Option<PathBuf>,
}

/// Fully resolved service configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntakeConfig {
    pub google_key_file: PathBuf,
    pub spreadsheet_id: String,
    pub drive_folder_id: String,
    pub allowed_origins: Vec<String>,
    pub host: String,
    pub port: u16,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub log_level: String,
}

impl IntakeConfig {
    /// Read the TOML file named by the overrides (or the default location)
    /// and resolve against it.
    pub fn load(overrides: ConfigOverrides) -> Result<Self> {
        let toml_config = load_toml_config(overrides.config_path.as_deref())?;
        Self::resolve(overrides, toml_config)
    }

    /// Merge overrides over TOML values over defaults.
    pub fn resolve(overrides: ConfigOverrides, toml_config: TomlConfig) -> Result<Self> {
        let google_key_file = overrides
            .google_key_file
            .filter(|p| !p.as_os_str().is_empty())
            .or(toml_config.google_key_file)
            .ok_or_else(|| {
                missing(
                    "credentials file",
                    "--google-key-file",
                    "GOOGLE_KEY_FILE",
                    "google_key_file",
                )
            })?;

        let spreadsheet_id = non_blank(overrides.spreadsheet_id)
            .or_else(|| non_blank(toml_config.spreadsheet_id))
            .ok_or_else(|| {
                missing(
                    "spreadsheet id",
                    "--spreadsheet-id",
                    "SPREADSHEET_ID",
                    "spreadsheet_id",
                )
            })?;

        let drive_folder_id = non_blank(overrides.drive_folder_id)
            .or_else(|| non_blank(toml_config.drive_folder_id))
            .ok_or_else(|| {
                missing(
                    "storage folder id",
                    "--drive-folder-id",
                    "GDRIVE_FOLDER_ID",
                    "drive_folder_id",
                )
            })?;

        let allowed_origins = overrides
            .allowed_origins
            .or(toml_config.allowed_origins)
            .unwrap_or_default()
            .into_iter()
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();

        let max_upload_bytes = toml_config
            .max_upload_bytes
            .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);
        if max_upload_bytes == 0 {
            return Err(Error::Config("max_upload_bytes must be greater than zero".to_string()));
        }

        Ok(Self {
            google_key_file,
            spreadsheet_id,
            drive_folder_id,
            allowed_origins,
            host: non_blank(overrides.host)
                .or_else(|| non_blank(toml_config.host))
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: overrides.port.or(toml_config.port).unwrap_or(DEFAULT_PORT),
            upload_dir: overrides
                .upload_dir
                .or(toml_config.upload_dir)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_UPLOAD_DIR)),
            max_upload_bytes,
            log_level: toml_config.logging.level,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn allows_any_origin(&self) -> bool {
        self.allowed_origins.is_empty() || self.allowed_origins.iter().any(|o| o == "*")
    }
}

/// Default config file: `<config dir>/intake/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("intake").join("config.toml"))
}

/// Load TOML configuration.
///
/// An explicit path must exist. Without one, the default location is tried
/// and its absence only produces a warning.
pub fn load_toml_config(explicit: Option<&Path>) -> Result<TomlConfig> {
    if let Some(path) = explicit {
        return read_toml_config(path);
    }

    match default_config_path() {
        Some(path) if path.exists() => read_toml_config(&path),
        Some(path) => {
            warn!(
                "Config file not found at {}, using command line, environment and defaults",
                path.display()
            );
            Ok(TomlConfig::default())
        }
        None => {
            warn!(
                "Could not determine config directory, \
                 using command line, environment and defaults"
            );
            Ok(TomlConfig::default())
        }
    }
}

pub fn read_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    let config = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;
    info!("Loaded TOML configuration from {}", path.display());
    Ok(config)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn missing(what: &str, flag: &str, env: &str, key: &str) -> Error {
    Error::Config(format!(
        "{what} not configured. Set one of:\n\
         1. Command line: {flag} <value>\n\
         2. Environment: {env}=<value>\n\
         3. TOML config: {key} = \"<value>\""
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn required_overrides() -> ConfigOverrides {
        ConfigOverrides {
            google_key_file: Some(PathBuf::from("/etc/intake/key.json")),
            spreadsheet_id: Some("sheet-123".to_string()),
            drive_folder_id: Some("folder-456".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults_apply() {
        let config = IntakeConfig::resolve(required_overrides(), TomlConfig::default()).unwrap();
        assert_eq!(config.host, DEFAULT_HOST);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.upload_dir, PathBuf::from(DEFAULT_UPLOAD_DIR));
        assert_eq!(config.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
        assert_eq!(config.log_level, "info");
        assert!(config.allows_any_origin());
        assert_eq!(config.bind_address(), "0.0.0.0:3000");
    }

    #[test]
    fn test_overrides_beat_toml() {
        let toml_config = TomlConfig {
            spreadsheet_id: Some("from-toml".to_string()),
            port: Some(8080),
            ..Default::default()
        };
        let overrides = ConfigOverrides {
            port: Some(9090),
            ..required_overrides()
        };

        let config = IntakeConfig::resolve(overrides, toml_config).unwrap();
        assert_eq!(config.spreadsheet_id, "sheet-123");
        assert_eq!(config.port, 9090);
    }

    #[test]
    fn test_blank_override_falls_back_to_toml() {
        let toml_config = TomlConfig {
            drive_folder_id: Some("toml-folder".to_string()),
            ..Default::default()
        };
        let overrides = ConfigOverrides {
            drive_folder_id: Some("   ".to_string()),
            ..required_overrides()
        };

        let config = IntakeConfig::resolve(overrides, toml_config).unwrap();
        assert_eq!(config.drive_folder_id, "toml-folder");
    }

    #[test]
    fn test_missing_spreadsheet_id_is_config_error() {
        let overrides = ConfigOverrides {
            spreadsheet_id: None,
            ..required_overrides()
        };
        let err = IntakeConfig::resolve(overrides, TomlConfig::default()).unwrap_err();
        match err {
            Error::Config(msg) => assert!(msg.contains("SPREADSHEET_ID")),
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn test_origin_list_trimmed() {
        let overrides = ConfigOverrides {
            allowed_origins: Some(vec![
                " https://a.example ".to_string(),
                String::new(),
                "https://b.example".to_string(),
            ]),
            ..required_overrides()
        };
        let config = IntakeConfig::resolve(overrides, TomlConfig::default()).unwrap();
        assert_eq!(config.allowed_origins, vec!["https://a.example", "https://b.example"]);
        assert!(!config.allows_any_origin());
    }

    #[test]
    fn test_wildcard_origin_allows_any() {
        let overrides = ConfigOverrides {
            allowed_origins: Some(vec!["*".to_string()]),
            ..required_overrides()
        };
        let config = IntakeConfig::resolve(overrides, TomlConfig::default()).unwrap();
        assert!(config.allows_any_origin());
    }

    #[test]
    fn test_zero_body_limit_rejected() {
        let toml_config = TomlConfig {
            max_upload_bytes: Some(0),
            ..Default::default()
        };
        assert!(IntakeConfig::resolve(required_overrides(), toml_config).is_err());
    }
}
