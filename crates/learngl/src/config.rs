use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use glshader::PipelineOptions;
use serde::{Deserialize, Serialize};

/// Looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "learngl.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub window: WindowConfig,
    pub clear: ClearConfig,
    pub pipeline: PipelineOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub width: u32,
    pub height: u32,
    pub title: String,
    pub vsync: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            title: "LearnOpenGL".to_string(),
            vsync: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClearConfig {
    pub color: [f32; 4],
}

impl Default for ClearConfig {
    fn default() -> Self {
        Self {
            color: [0.2, 0.3, 0.3, 1.0],
        }
    }
}

impl AppConfig {
    /// Loads `explicit` if given (it must exist), else `learngl.toml` from the
    /// working directory if present, else defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => {
                if !path.exists() {
                    bail!("config file not found at {}", path.display());
                }
                Self::load(path)
            }
            None => Self::load_or_default(&PathBuf::from(DEFAULT_CONFIG_FILE)),
        }
    }

    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file at {}", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file at {}", path.display()))?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.window.width == 0 || self.window.height == 0 {
            bail!(
                "window size must be greater than zero (got {}x{})",
                self.window.width,
                self.window.height
            );
        }
        if self
            .clear
            .color
            .iter()
            .any(|channel| !(0.0..=1.0).contains(channel))
        {
            bail!("clear color channels must be within 0.0..=1.0");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glshader::MissingUniformPolicy;
    use tempfile::TempDir;

    #[test]
    fn missing_default_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let config = AppConfig::load_or_default(&dir.path().join("learngl.toml")).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.window.width, 800);
        assert_eq!(config.clear.color, [0.2, 0.3, 0.3, 1.0]);
    }

    #[test]
    fn partial_file_overrides_only_given_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("learngl.toml");
        fs::write(
            &path,
            "[window]\nwidth = 1024\n\n[pipeline]\nmissing_uniform = \"warn-once\"\n",
        )
        .unwrap();

        let config = AppConfig::discover(Some(&path)).unwrap();
        assert_eq!(config.window.width, 1024);
        assert_eq!(config.window.height, 600);
        assert_eq!(config.pipeline.missing_uniform, MissingUniformPolicy::WarnOnce);
        assert!(config.pipeline.cache_uniform_locations);
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(AppConfig::discover(Some(&dir.path().join("absent.toml"))).is_err());
    }

    #[test]
    fn rejects_zero_sized_window() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("learngl.toml");
        fs::write(&path, "[window]\nwidth = 0\n").unwrap();
        let err = AppConfig::discover(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("greater than zero"));
    }
}
