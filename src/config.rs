//! Configuration parsing and management for screenstage

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, StageError};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub model: ModelConfig,
    pub screen: ScreenConfig,
    pub capture: CaptureConfig,
    pub rig: RigTuning,
    pub paging: PagingConfig,
    pub http: HttpConfig,
    /// Scroll keyframes, ordered by document position
    pub keyframes: Vec<KeyframeConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: ModelConfig::default(),
            screen: ScreenConfig::default(),
            capture: CaptureConfig::default(),
            rig: RigTuning::default(),
            paging: PagingConfig::default(),
            http: HttpConfig::default(),
            keyframes: default_keyframes(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, StageError> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ConfigError::ReadFile(format!("{}: {}", path.as_ref().display(), e))
        })?;

        Self::from_toml(&contents)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(s: &str) -> Result<Self, StageError> {
        toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()).into())
    }

    /// Load configuration from default paths
    pub fn load() -> Result<Self, StageError> {
        let paths = [
            PathBuf::from("config.toml"),
            PathBuf::from("config/default.toml"),
        ];

        for path in &paths {
            if path.exists() {
                tracing::info!("Loading config from: {}", path.display());
                return Self::from_file(path);
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), StageError> {
        if self.screen.reference_height == 0 {
            return Err(ConfigError::InvalidValue {
                field: "screen.reference_height".to_string(),
                message: "Reference height must be greater than 0".to_string(),
            }
            .into());
        }

        if self.capture.max_fps <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "capture.max_fps".to_string(),
                message: "Capture rate must be greater than 0".to_string(),
            }
            .into());
        }

        for (name, value) in [("rig.ease", self.rig.ease), ("rig.tilt_ease", self.rig.tilt_ease)] {
            if !(0.0..=1.0).contains(&value) || value == 0.0 {
                return Err(ConfigError::InvalidValue {
                    field: name.to_string(),
                    message: "Damping ratio must be in (0.0, 1.0]".to_string(),
                }
                .into());
            }
        }

        if self.rig.min_scale > self.rig.max_scale {
            return Err(ConfigError::InvalidValue {
                field: "rig.min_scale".to_string(),
                message: "min_scale must not exceed max_scale".to_string(),
            }
            .into());
        }

        if self.rig.driver == RigDriverKind::Scroll && self.keyframes.len() < 2 {
            return Err(ConfigError::InvalidValue {
                field: "keyframes".to_string(),
                message: "Scroll driver requires at least 2 keyframes".to_string(),
            }
            .into());
        }

        if self.http.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "http.port".to_string(),
                message: "Port must be greater than 0".to_string(),
            }
            .into());
        }

        Ok(())
    }
}

/// Model loading configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Path to the GLB model file
    pub path: String,
    /// Largest bounding-box side after normalization, in world units
    pub target_size: f32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: "assets/models/terminal.glb".to_string(),
            target_size: 2.2,
        }
    }
}

/// Screen material binding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenConfig {
    /// Sub-material name to rebind (case-insensitive, trimmed)
    pub target_material: String,
    /// Fixed capture height in pixels; width follows the screen aspect
    pub reference_height: u32,
    /// Emissive intensity applied to the rebound material
    pub emissive_intensity: f32,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            target_material: "material.003".to_string(),
            reference_height: 1024,
            emissive_intensity: 1.6,
        }
    }
}

/// Live document capture configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Steady-state snapshot rate ceiling in frames per second
    pub max_fps: f32,
    /// Settle delay after the source reports ready, in milliseconds
    pub settle_delay_ms: u64,
    /// Request a transparent background from the raster primitive
    pub transparent_background: bool,
    /// Request cross-origin-safe capture from the raster primitive
    pub cross_origin_safe: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            max_fps: 30.0,
            settle_delay_ms: 50,
            transparent_background: true,
            cross_origin_safe: true,
        }
    }
}

/// Which signal drives the rig's target pose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RigDriverKind {
    /// Discrete viewport-mode pose table
    Responsive,
    /// Scroll-indexed keyframe interpolation
    Scroll,
}

impl Default for RigDriverKind {
    fn default() -> Self {
        Self::Responsive
    }
}

/// Rig damping and responsive-scale tuning parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RigTuning {
    /// Target-pose source: "responsive" or "scroll"
    pub driver: RigDriverKind,

    // --- Damping ratios (per frame, not per second) ---
    #[serde(default = "default_0_08")]
    pub ease: f32,
    #[serde(default = "default_0_2")]
    pub tilt_ease: f32,

    // --- Pointer tilt limits ---
    #[serde(default = "default_4_0")]
    pub max_yaw_deg: f32,
    #[serde(default = "default_0_0")]
    pub max_pitch_deg: f32,

    // --- Responsive scale ---
    #[serde(default = "default_0_5")]
    pub min_scale: f32,
    #[serde(default = "default_2_5")]
    pub max_scale: f32,
    /// Viewport height at which the height factor reaches 1.0
    #[serde(default = "default_900_0")]
    pub height_reference: f32,
    /// Lower clamp for the height factor on short viewports
    #[serde(default = "default_0_75")]
    pub min_height_factor: f32,
}

fn default_0_08() -> f32 { 0.08 }
fn default_0_2() -> f32 { 0.2 }
fn default_4_0() -> f32 { 4.0 }
fn default_0_0() -> f32 { 0.0 }
fn default_0_5() -> f32 { 0.5 }
fn default_2_5() -> f32 { 2.5 }
fn default_900_0() -> f32 { 900.0 }
fn default_0_75() -> f32 { 0.75 }

impl Default for RigTuning {
    fn default() -> Self {
        Self {
            driver: RigDriverKind::default(),
            ease: default_0_08(),
            tilt_ease: default_0_2(),
            max_yaw_deg: default_4_0(),
            max_pitch_deg: default_0_0(),
            min_scale: default_0_5(),
            max_scale: default_2_5(),
            height_reference: default_900_0(),
            min_height_factor: default_0_75(),
        }
    }
}

/// Scroll paging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PagingConfig {
    /// Enable anchor-to-anchor paging jumps
    pub enabled: bool,
    /// Scroll distance within which a jump counts as settled, in pixels
    pub settle_epsilon: f32,
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            settle_epsilon: 2.0,
        }
    }
}

/// One scroll keyframe: a pose anchored to a document section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyframeConfig {
    /// Section anchor selector, e.g. "#home"
    pub anchor: String,
    /// Rig position
    pub position: [f32; 3],
    /// Rig rotation as XYZ Euler angles in degrees
    pub rotation_deg: [f32; 3],
    /// Uniform rig scale
    pub scale: f32,
}

fn default_keyframes() -> Vec<KeyframeConfig> {
    vec![
        KeyframeConfig {
            anchor: "#home".to_string(),
            position: [1.0, 0.5, 2.7],
            rotation_deg: [0.0, -43.0, 0.0],
            scale: 1.15,
        },
        KeyframeConfig {
            anchor: "#about".to_string(),
            position: [1.5, 1.18, 0.4],
            rotation_deg: [0.0, -14.3, 0.0],
            scale: 1.15,
        },
        KeyframeConfig {
            anchor: "#inquire".to_string(),
            position: [0.0, -0.1, 1.5],
            rotation_deg: [0.0, 0.0, 0.0],
            scale: 1.9,
        },
    ]
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Enable HTTP server
    pub enabled: bool,
    /// HTTP server host
    pub host: String,
    /// HTTP server port
    pub port: u16,
    /// Enable CORS
    pub cors_enabled: bool,
    /// Allowed origins for CORS
    pub cors_origins: Vec<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "127.0.0.1".to_string(),
            port: 8080,
            cors_enabled: true,
            cors_origins: vec!["*".to_string()],
        }
    }
}
