use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tileworld_input::ObserverController;
use tileworld_render::RenderConfig;
use tileworld_stream::StreamConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub width: u32,
    pub height: u32,
    pub title: String,
    pub fullscreen: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            title: "tileworld".into(),
            fullscreen: false,
        }
    }
}

/// Everything the desktop app reads at startup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub window: WindowConfig,
    pub stream: StreamConfig,
    pub render: RenderConfig,
    pub controller: ObserverController,
    /// Texture atlas for the world. A generated checkerboard when unset.
    pub texture: Option<PathBuf>,
    /// WGSL replacement for the built-in shader.
    pub shader: Option<PathBuf>,
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub radius: Option<f32>,
    pub fullscreen: bool,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub texture: Option<PathBuf>,
    pub shader: Option<PathBuf>,
}

impl AppConfig {
    /// Defaults, or the JSON file at `path` layered over them.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config = serde_json::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        tracing::info!(path = %path.display(), "config loaded");
        Ok(config)
    }

    pub fn apply(&mut self, overrides: &Overrides) {
        if let Some(radius) = overrides.radius {
            self.stream.radius = radius;
        }
        if overrides.fullscreen {
            self.window.fullscreen = true;
        }
        if let Some(width) = overrides.width {
            self.window.width = width;
        }
        if let Some(height) = overrides.height {
            self.window.height = height;
        }
        if let Some(texture) = &overrides.texture {
            self.texture = Some(texture.clone());
        }
        if let Some(shader) = &overrides.shader {
            self.shader = Some(shader.clone());
        }
    }

    /// Reject configs that could only fail later, after the window is up.
    pub fn validate(&self) -> Result<()> {
        self.stream.validate()?;
        if self.window.width == 0 || self.window.height == 0 {
            bail!(
                "window size must be non-zero, got {}x{}",
                self.window.width,
                self.window.height
            );
        }
        let render = &self.render;
        if !(render.near > 0.0 && render.far > render.near) {
            bail!("clip planes must satisfy 0 < near < far, got {} / {}", render.near, render.far);
        }
        if !(render.fov_degrees > 0.0 && render.fov_degrees < 180.0) {
            bail!("fov must be between 0 and 180 degrees, got {}", render.fov_degrees);
        }
        for (what, path) in [("texture", &self.texture), ("shader", &self.shader)] {
            if let Some(path) = path {
                if !path.is_file() {
                    bail!("{what} file not found: {}", path.display());
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_classic_setup() {
        let config = AppConfig::load(None).unwrap();
        assert_eq!(config.window.width, 1920);
        assert_eq!(config.window.height, 1080);
        assert_eq!(config.window.title, "tileworld");
        assert_eq!(config.stream.radius, 64.0);
        assert_eq!(config.render.fps_cap, 120);
        assert_eq!(config.controller.speed, 0.3);
        config.validate().unwrap();
    }

    #[test]
    fn file_values_layer_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tileworld.json");
        std::fs::write(
            &path,
            r#"{ "stream": { "radius": 96.0 }, "window": { "fullscreen": true } }"#,
        )
        .unwrap();

        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.stream.radius, 96.0);
        assert_eq!(config.stream.tile_edge, 16);
        assert!(config.window.fullscreen);
        assert_eq!(config.window.width, 1920);
    }

    #[test]
    fn overrides_win() {
        let mut config = AppConfig::default();
        config.apply(&Overrides {
            radius: Some(32.0),
            width: Some(800),
            height: Some(600),
            ..Default::default()
        });
        assert_eq!(config.stream.radius, 32.0);
        assert_eq!((config.window.width, config.window.height), (800, 600));
        assert!(!config.window.fullscreen);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ radius: ").unwrap();
        let err = AppConfig::load(Some(&path)).unwrap_err();
        assert!(format!("{err:#}").contains("parsing config"));
    }

    #[test]
    fn missing_texture_fails_validation() {
        let config = AppConfig {
            texture: Some(PathBuf::from("/nonexistent/atlas.png")),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("texture file not found"));
    }

    #[test]
    fn bad_stream_values_fail_validation() {
        let mut config = AppConfig::default();
        config.apply(&Overrides {
            radius: Some(-1.0),
            ..Default::default()
        });
        assert!(config.validate().is_err());
    }
}
