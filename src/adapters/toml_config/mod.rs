// TOML config adapter - file layer of the configuration hierarchy

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{DecimateError, DecimateResult};
use crate::utils::logging::LoggingConfig;

/// File looked up in the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "decimx.toml";

/// Contents of a configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct FileConfig {
    pub decimate: DecimateSection,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

/// `[decimate]` table; every key is optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct DecimateSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_repeats: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub codec: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bit_rate: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crf: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overwrite: Option<bool>,
}

impl FileConfig {
    /// Parse configuration text
    pub fn parse(content: &str) -> DecimateResult<Self> {
        toml::from_str(content)
            .map_err(|e| DecimateError::config(format!("failed to parse TOML config: {}", e)))
    }

    /// Read and parse a configuration file
    pub fn load(path: &Path) -> DecimateResult<Self> {
        if !path.exists() {
            return Err(DecimateError::config(format!(
                "config file does not exist: {}",
                path.display()
            )));
        }
        let content = std::fs::read_to_string(path)?;
        let config = Self::parse(&content)
            .map_err(|e| DecimateError::config(format!("{}: {}", path.display(), e)))?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load `explicit` if given, otherwise `decimx.toml` in the working
    /// directory if present, otherwise defaults.
    ///
    /// A missing explicit file is an error; a missing default file is not.
    pub fn discover(explicit: Option<&Path>) -> DecimateResult<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None => {
                let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
                if fallback.exists() {
                    Self::load(&fallback)
                } else {
                    debug!("No {} found, using defaults", DEFAULT_CONFIG_FILE);
                    Ok(Self::default())
                }
            }
        }
    }

    /// Serialize back to TOML
    pub fn to_toml(&self) -> DecimateResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| DecimateError::config(format!("failed to serialize config: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::logging::{LogFormat, LogLevel};
    use tempfile::TempDir;

    #[test]
    fn test_parse_full_file() {
        let config = FileConfig::parse(
            r#"
            [decimate]
            num_repeats = 5
            key_mode = "exact"
            codec = "ffv1"
            crf = 20
            overwrite = true

            [logging]
            level = "debug"
            format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.decimate.num_repeats, Some(5));
        assert_eq!(config.decimate.key_mode.as_deref(), Some("exact"));
        assert_eq!(config.decimate.codec.as_deref(), Some("ffv1"));
        assert_eq!(config.decimate.crf, Some(20));
        assert_eq!(config.decimate.bit_rate, None);
        assert_eq!(config.decimate.overwrite, Some(true));

        let logging = config.logging.unwrap();
        assert_eq!(logging.level, LogLevel::Debug);
        assert_eq!(logging.format, LogFormat::Json);
    }

    #[test]
    fn test_empty_file_is_default() {
        assert_eq!(FileConfig::parse("").unwrap(), FileConfig::default());
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let err = FileConfig::parse("[decimate]\nthreshold = 0.5\n").unwrap_err();
        assert!(matches!(err, DecimateError::Config { .. }));

        assert!(FileConfig::parse("[output]\ncontainer = \"mp4\"\n").is_err());
    }

    #[test]
    fn test_load_from_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[decimate]\nnum_repeats = 1\n").unwrap();

        let config = FileConfig::discover(Some(&path)).unwrap();
        assert_eq!(config.decimate.num_repeats, Some(1));
    }

    #[test]
    fn test_missing_explicit_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.toml");
        assert!(matches!(
            FileConfig::discover(Some(&path)),
            Err(DecimateError::Config { .. })
        ));
    }

    #[test]
    fn test_serialize_round_trip() {
        let mut config = FileConfig::default();
        config.decimate.num_repeats = Some(4);
        let text = config.to_toml().unwrap();
        assert_eq!(FileConfig::parse(&text).unwrap(), config);
    }
}
