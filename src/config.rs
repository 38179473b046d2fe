//! Configuration management for CrabCapture
//!
//! Selects the source backend, the scaler behaviour and the log level.
//! Settings come from a TOML file, optionally overridden by
//! `CRABCAPTURE__SECTION__KEY` environment variables.

use crate::errors::CaptureError;
use crate::scaler::{OutputFormatPolicy, ScaleFilter};
use crate::types::SourceKind;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Environment variable naming an alternative config file.
pub const CONFIG_PATH_ENV: &str = "CRABCAPTURE_CONFIG";
const ENV_PREFIX: &str = "CRABCAPTURE";

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrabCaptureConfig {
    pub source: SourceConfig,
    pub capture: CaptureConfig,
    pub logging: LoggingConfig,
}

/// Where sources come from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// `file` scans a directory, `device` lists cameras
    pub kind: SourceKind,
    /// Directory scanned for media files; empty means the home directory
    pub media_directory: String,
    /// File extensions picked up by the scan
    pub extensions: Vec<String>,
}

/// Negotiation and scaling behaviour
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// `canonical` pins scaler output to BGR32, `requested` follows the caller
    pub output_format: OutputFormatPolicy,
    /// Resampling filter used when the requested size differs from the source
    pub filter: ScaleFilter,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level when `RUST_LOG` is unset
    pub level: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::File,
            media_directory: String::new(),
            extensions: vec!["y4m".to_string()],
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl SourceConfig {
    /// The configured directory, falling back to the user's home directory.
    pub fn resolve_media_directory(&self) -> Result<PathBuf, CaptureError> {
        if !self.media_directory.is_empty() {
            return Ok(PathBuf::from(&self.media_directory));
        }
        dirs::home_dir()
            .ok_or_else(|| CaptureError::Config("no home directory to scan".to_string()))
    }
}

impl CrabCaptureConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, CaptureError> {
        let path = path.as_ref();

        if !path.exists() {
            log::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| CaptureError::Config(format!("Failed to read config file: {}", e)))?;

        let config: CrabCaptureConfig = toml::from_str(&contents)
            .map_err(|e| CaptureError::Config(format!("Failed to parse config file: {}", e)))?;

        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Load the file (if present) with environment overrides on top.
    ///
    /// `CRABCAPTURE__SOURCE__KIND=device` overrides `source.kind`;
    /// `CRABCAPTURE__SOURCE__EXTENSIONS=y4m,yuv` takes a comma list.
    pub fn load_layered<P: AsRef<Path>>(path: P) -> Result<Self, CaptureError> {
        let settings = config::Config::builder()
            .add_source(
                config::File::from(path.as_ref())
                    .format(config::FileFormat::Toml)
                    .required(false),
            )
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("source.extensions")
                    .try_parsing(true),
            )
            .build()?;

        let config: CrabCaptureConfig = settings.try_deserialize()?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), CaptureError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                CaptureError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| CaptureError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| CaptureError::Config(format!("Failed to write config file: {}", e)))?;

        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// `$CRABCAPTURE_CONFIG`, or `crabcapture.toml` in the working directory
    pub fn default_path() -> PathBuf {
        std::env::var_os(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("crabcapture.toml"))
    }

    /// Load from default location, falling back to defaults on any error
    pub fn load_or_default() -> Self {
        Self::load_layered(Self::default_path()).unwrap_or_else(|e| {
            log::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.source.kind == SourceKind::File
            && self.source.extensions.iter().all(|e| e.trim_matches('.').is_empty())
        {
            return Err("File sources need at least one extension".to_string());
        }
        if log::LevelFilter::from_str(&self.logging.level).is_err() {
            return Err(format!("Invalid log level: {}", self.logging.level));
        }
        Ok(())
    }
}
