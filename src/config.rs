//! Tool configuration with TOML persistence.
//!
//! Supports loading from file and sensible defaults; command-line flags
//! override whatever is loaded here.

use crate::error::ConfigError;
use crate::listing::Separator;
use crate::render::{Graticule, MollviewParams, Norm};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct ToolsConfig {
    /// List builder configuration
    pub list: ListConfig,

    /// Map rendering configuration
    pub render: RenderConfig,

    /// Viewer window configuration
    pub viewer: ViewerConfig,
}

/// List builder configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ListConfig {
    /// File name suffix to match, including the dot
    pub extension: String,

    /// What to write after each file name
    pub separator: Separator,

    /// Sort names instead of keeping directory order
    pub sort: bool,
}

/// Map rendering configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RenderConfig {
    /// Image width in pixels (16-16384)
    pub width: u32,

    /// Colour scale normalization
    pub norm: Norm,

    /// Lowest displayed value on a log scale
    pub log_min: f64,

    /// Draw the coordinate grid
    pub graticule: bool,

    /// Spacing between parallels in degrees
    pub dpar_deg: f64,

    /// Spacing between meridians in degrees
    pub dmer_deg: f64,
}

/// Viewer window configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ViewerConfig {
    pub window_width: f32,
    pub window_height: f32,
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            extension: ".root".to_string(),
            separator: Separator::None,
            sort: false,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1200,
            norm: Norm::Log,
            log_min: 1.0,
            graticule: true,
            dpar_deg: 30.0,
            dmer_deg: 30.0,
        }
    }
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            window_width: 1280.0,
            window_height: 820.0,
        }
    }
}

impl RenderConfig {
    /// Rendering parameters described by this configuration
    pub fn to_params(&self) -> MollviewParams {
        MollviewParams {
            width: self.width,
            norm: self.norm,
            min: match self.norm {
                Norm::Log => Some(self.log_min),
                Norm::Linear => None,
            },
            max: None,
            graticule: self.graticule.then_some(Graticule {
                dpar_deg: self.dpar_deg,
                dmer_deg: self.dmer_deg,
            }),
        }
    }
}

impl ToolsConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&contents).map_err(|source| ConfigError::InvalidFormat {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load configuration with fallback to defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Self::default();
        }
        Self::load_from_file(path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Explicit `--config` path if given, otherwise the default location.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match explicit {
            Some(path) => Self::load_from_file(path)?,
            None => Self::load_or_default(Self::default_path()),
        };
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();

        // Create parent directory if needed
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::SaveFailed {
                path: path.to_path_buf(),
                source,
            })?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|source| ConfigError::SerializationFailed { source })?;

        std::fs::write(path, contents).map_err(|source| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Get default config file path
    pub fn default_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("skymap-tools");

        config_dir.join("config.toml")
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.list.extension.is_empty() || self.list.extension.contains(['/', '\\']) {
            return Err(ConfigError::ValidationFailed {
                reason: format!("Invalid list extension '{}'", self.list.extension),
            });
        }

        if !(16..=16384).contains(&self.render.width) {
            return Err(ConfigError::ValidationFailed {
                reason: format!("Render width {} out of range 16-16384", self.render.width),
            });
        }

        if self.render.log_min <= 0.0 {
            return Err(ConfigError::ValidationFailed {
                reason: format!("Log minimum {} must be positive", self.render.log_min),
            });
        }

        let spacings = [
            ("dpar_deg", self.render.dpar_deg),
            ("dmer_deg", self.render.dmer_deg),
        ];
        for (name, spacing) in spacings {
            if !(spacing > 0.0 && spacing <= 180.0) {
                return Err(ConfigError::ValidationFailed {
                    reason: format!("Graticule {} = {} out of range (0, 180]", name, spacing),
                });
            }
        }

        if self.viewer.window_width < 100.0 || self.viewer.window_height < 100.0 {
            return Err(ConfigError::ValidationFailed {
                reason: "Viewer window must be at least 100x100".to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = ToolsConfig::default();
        config.validate().expect("Default config should be valid");
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: ToolsConfig = toml::from_str(
            r#"
            [list]
            extension = ".fits"
            separator = "newline"

            [render]
            norm = "linear"
            "#,
        )
        .unwrap();
        assert_eq!(config.list.extension, ".fits");
        assert_eq!(config.list.separator, Separator::Newline);
        assert!(!config.list.sort);
        assert_eq!(config.render.norm, Norm::Linear);
        assert_eq!(config.render.width, 1200);
    }

    #[test]
    fn test_default_list_format_has_no_separator() {
        assert_eq!(ToolsConfig::default().list.separator, Separator::None);
        let config: ToolsConfig = toml::from_str("[list]\nsort = true\n").unwrap();
        assert_eq!(config.list.separator, Separator::None);
    }

    #[test]
    fn test_default_path_location() {
        let path = ToolsConfig::default_path();
        assert!(path.ends_with("skymap-tools/config.toml"));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = ToolsConfig::default();
        config.list.sort = true;
        config.render.dpar_deg = 15.0;
        config.save_to_file(&path).unwrap();

        let loaded = ToolsConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_invalid_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[render]\nwidth = \"wide\"\n").unwrap();

        let err = ToolsConfig::load_from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidFormat { .. }));
        assert_eq!(ToolsConfig::load_or_default(&path), ToolsConfig::default());
    }

    #[test]
    fn test_validation() {
        let mut config = ToolsConfig::default();
        config.render.log_min = 0.0;
        assert!(config.validate().is_err());

        let mut config = ToolsConfig::default();
        config.list.extension = "a/b".to_string();
        assert!(config.validate().is_err());

        let mut config = ToolsConfig::default();
        config.render.dmer_deg = 400.0;
        assert!(config.validate().is_err());

        let mut config = ToolsConfig::default();
        config.render.width = 8;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_to_params() {
        let mut render = RenderConfig::default();
        let params = render.to_params();
        assert_eq!(params.min, Some(1.0));
        assert!(params.graticule.is_some());

        render.norm = Norm::Linear;
        render.graticule = false;
        let params = render.to_params();
        assert_eq!(params.min, None);
        assert!(params.graticule.is_none());
    }
}
