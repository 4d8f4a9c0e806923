//! Configuration persistence
//!
//! Every tunable struct in the engine derives serde and implements
//! [`Config`], so it can be read from or written to a `.toml` or `.ron` file
//! chosen by extension. Compiled-in defaults come from `Default`.

use std::path::Path;

pub use serde::{Deserialize, Serialize};

/// File-backed configuration
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from a `.toml` or `.ron` file
    fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;

        match ConfigFormat::from_path(path)? {
            ConfigFormat::Toml => toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string())),
            ConfigFormat::Ron => ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string())),
        }
    }

    /// Load from `path` when it exists, otherwise fall back to defaults
    ///
    /// A file that exists but fails to parse is still an error.
    fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            log::info!("Loading configuration from {}", path.display());
            Self::load_from_file(path)
        } else {
            log::debug!("No configuration at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Save configuration to a `.toml` or `.ron` file
    fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = match ConfigFormat::from_path(path)? {
            ConfigFormat::Toml => {
                toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
            }
            ConfigFormat::Ron => ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?,
        };

        std::fs::write(path, contents)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
enum ConfigFormat {
    Toml,
    Ron,
}

impl ConfigFormat {
    fn from_path(path: &Path) -> Result<Self, ConfigError> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(Self::Toml),
            Some("ron") => Ok(Self::Ron),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    struct SampleConfig {
        substeps: u32,
        strength: f64,
        title: String,
    }

    impl Default for SampleConfig {
        fn default() -> Self {
            Self {
                substeps: 100,
                strength: 6.674e-18,
                title: "MoonLight".to_string(),
            }
        }
    }

    impl Config for SampleConfig {}

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("moonlight_config_{}_{name}", std::process::id()))
    }

    #[test]
    fn test_toml_round_trip() {
        let path = temp_path("sample.toml");
        let config = SampleConfig {
            substeps: 7,
            ..Default::default()
        };
        config.save_to_file(&path).expect("save toml");
        let loaded = SampleConfig::load_from_file(&path).expect("load toml");
        assert_eq!(loaded, config);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_ron_round_trip() {
        let path = temp_path("sample.ron");
        let config = SampleConfig {
            title: "Gravity".to_string(),
            ..Default::default()
        };
        config.save_to_file(&path).expect("save ron");
        let loaded = SampleConfig::load_from_file(&path).expect("load ron");
        assert_eq!(loaded, config);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_unsupported_extension() {
        let result = SampleConfig::default().save_to_file(temp_path("sample.json"));
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let loaded = SampleConfig::load_or_default(temp_path("missing.toml")).expect("defaults");
        assert_eq!(loaded, SampleConfig::default());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let path = temp_path("partial.toml");
        std::fs::write(&path, "substeps = 3\n").expect("write");
        let loaded = SampleConfig::load_from_file(&path).expect("load");
        assert_eq!(loaded.substeps, 3);
        assert_eq!(loaded.title, "MoonLight");
        let _ = std::fs::remove_file(&path);
    }
}
