use serde::Deserialize;
use std::f32::consts::TAU;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::mesh::surface::SurfaceParams;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub terrain: TerrainConfig,
    #[serde(default)]
    pub viewer: ViewerConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Geometry and relief constants. Fixed for the lifetime of a session.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct TerrainConfig {
    #[serde(default = "default_width_segments")]
    pub width_segments: NonZeroUsize,
    #[serde(default = "default_height_segments")]
    pub height_segments: NonZeroUsize,
    #[serde(default = "default_radius")]
    pub radius_top: f32,
    #[serde(default = "default_radius")]
    pub radius_bottom: f32,
    #[serde(default = "default_height")]
    pub height: f32,
    #[serde(default = "default_height_scale")]
    pub height_scale: f32,
    #[serde(default = "default_caps")]
    pub caps: bool,
}

/// Display-only parameters handed to the viewer. Never affect export.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct ViewerConfig {
    /// Euler rotation in radians, each axis in `[0, 2π]`.
    #[serde(default)]
    pub rotation: [f32; 3],
}

#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_directory")]
    pub directory: PathBuf,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            width_segments: default_width_segments(),
            height_segments: default_height_segments(),
            radius_top: default_radius(),
            radius_bottom: default_radius(),
            height: default_height(),
            height_scale: default_height_scale(),
            caps: default_caps(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_directory(),
        }
    }
}

const fn nonzero(n: usize) -> NonZeroUsize {
    match NonZeroUsize::new(n) {
        Some(n) => n,
        None => panic!("segment count must be non-zero"),
    }
}

pub const WIDTH_SEGMENTS: NonZeroUsize = nonzero(50);
pub const HEIGHT_SEGMENTS: NonZeroUsize = nonzero(100);
pub const RADIUS: f32 = 10.0;
pub const HEIGHT: f32 = 100.0;
pub const HEIGHT_SCALE: f32 = 100.0;

fn default_width_segments() -> NonZeroUsize { WIDTH_SEGMENTS }
fn default_height_segments() -> NonZeroUsize { HEIGHT_SEGMENTS }
fn default_radius() -> f32 { RADIUS }
fn default_height() -> f32 { HEIGHT }
fn default_height_scale() -> f32 { HEIGHT_SCALE }
fn default_caps() -> bool { true }
fn default_directory() -> PathBuf { PathBuf::from(".") }

impl TerrainConfig {
    pub fn surface_params(&self) -> SurfaceParams {
        SurfaceParams {
            radius_top: self.radius_top,
            radius_bottom: self.radius_bottom,
            height: self.height,
            width_segments: self.width_segments,
            height_segments: self.height_segments,
            caps: self.caps,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [("radius_top", self.radius_top), ("radius_bottom", self.radius_bottom)] {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(field, format!("{} is not a finite non-negative radius", value)));
            }
        }
        if !self.height.is_finite() || self.height <= 0.0 {
            return Err(invalid("height", format!("{} is not a finite positive height", self.height)));
        }
        if !self.height_scale.is_finite() || self.height_scale < 0.0 {
            return Err(invalid(
                "height_scale",
                format!("{} is not a finite non-negative scale", self.height_scale),
            ));
        }
        Ok(())
    }
}

impl ViewerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(angle) = self.rotation.iter().find(|a| !(0.0..=TAU).contains(*a)) {
            return Err(invalid("rotation", format!("{} is outside [0, 2π]", angle)));
        }
        Ok(())
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.terrain.validate()?;
        self.viewer.validate()
    }
}

fn invalid(field: &'static str, reason: String) -> ConfigError {
    ConfigError::Invalid { field, reason }
}

pub fn parse_config(content: &str, path: &Path) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    config.validate()?;
    Ok(config)
}

pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&content, path)
}
