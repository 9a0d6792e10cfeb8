use std::path::PathBuf;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Serde default functions
// ---------------------------------------------------------------------------

fn default_cache_dir() -> PathBuf {
    PathBuf::from("/tmp/strider")
}

fn default_model_name() -> String {
    "MotionTrackingCost".into()
}

// ---------------------------------------------------------------------------
// TrackingWeights
// ---------------------------------------------------------------------------

/// Per-field weights of the motion tracking cost.
///
/// Leg fields apply identically to every leg. Values are the diagonal of the
/// quadratic weight, so the cost stores their square roots.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackingWeights {
    pub euler_xyz: Vector3<f64>,
    pub com_position: Vector3<f64>,
    pub com_angular_velocity: Vector3<f64>,
    pub com_linear_velocity: Vector3<f64>,
    /// HAA, HFE, KFE.
    pub joint_position: Vector3<f64>,
    pub foot_position: Vector3<f64>,
    pub foot_velocity: Vector3<f64>,
    pub contact_force: Vector3<f64>,
}

impl Default for TrackingWeights {
    fn default() -> Self {
        Self {
            euler_xyz: Vector3::new(100.0, 300.0, 300.0),
            com_position: Vector3::new(0.0, 0.0, 1000.0),
            com_angular_velocity: Vector3::new(5.0, 10.0, 10.0),
            com_linear_velocity: Vector3::new(15.0, 15.0, 30.0),
            joint_position: Vector3::new(2.0, 2.0, 1.0),
            foot_position: Vector3::new(0.1, 0.1, 0.1),
            foot_velocity: Vector3::new(1.0, 1.0, 5.0),
            contact_force: Vector3::new(0.01, 0.01, 0.01),
        }
    }
}

impl TrackingWeights {
    /// Every weight must be finite and non-negative.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in self.named_values() {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidWeight { field, value });
            }
        }
        Ok(())
    }

    /// Parse the table named `table` out of a TOML document.
    pub fn from_toml_str(content: &str, table: &str) -> Result<Self, ConfigError> {
        let document: toml::Table = content.parse()?;
        let value = document
            .get(table)
            .cloned()
            .ok_or_else(|| ConfigError::MissingTable(table.to_string()))?;
        let file: TrackingWeightsFile = value.try_into()?;
        let weights = Self::from(file);
        weights.validate()?;
        Ok(weights)
    }

    /// Load from the table named `table` of a TOML file.
    pub fn from_file(path: impl AsRef<std::path::Path>, table: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content, table)
    }

    fn named_values(&self) -> [(&'static str, f64); 24] {
        [
            ("roll", self.euler_xyz.x),
            ("pitch", self.euler_xyz.y),
            ("yaw", self.euler_xyz.z),
            ("base_position_x", self.com_position.x),
            ("base_position_y", self.com_position.y),
            ("base_position_z", self.com_position.z),
            ("base_angular_vel_x", self.com_angular_velocity.x),
            ("base_angular_vel_y", self.com_angular_velocity.y),
            ("base_angular_vel_z", self.com_angular_velocity.z),
            ("base_linear_vel_x", self.com_linear_velocity.x),
            ("base_linear_vel_y", self.com_linear_velocity.y),
            ("base_linear_vel_z", self.com_linear_velocity.z),
            ("joint_position_HAA", self.joint_position.x),
            ("joint_position_HFE", self.joint_position.y),
            ("joint_position_KFE", self.joint_position.z),
            ("foot_position_x", self.foot_position.x),
            ("foot_position_y", self.foot_position.y),
            ("foot_position_z", self.foot_position.z),
            ("foot_velocity_x", self.foot_velocity.x),
            ("foot_velocity_y", self.foot_velocity.y),
            ("foot_velocity_z", self.foot_velocity.z),
            ("contact_force_x", self.contact_force.x),
            ("contact_force_y", self.contact_force.y),
            ("contact_force_z", self.contact_force.z),
        ]
    }
}

/// On-disk layout: one named scalar per weight.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[allow(non_snake_case)]
struct TrackingWeightsFile {
    roll: f64,
    pitch: f64,
    yaw: f64,
    base_position_x: f64,
    base_position_y: f64,
    base_position_z: f64,
    base_angular_vel_x: f64,
    base_angular_vel_y: f64,
    base_angular_vel_z: f64,
    base_linear_vel_x: f64,
    base_linear_vel_y: f64,
    base_linear_vel_z: f64,
    joint_position_HAA: f64,
    joint_position_HFE: f64,
    joint_position_KFE: f64,
    foot_position_x: f64,
    foot_position_y: f64,
    foot_position_z: f64,
    foot_velocity_x: f64,
    foot_velocity_y: f64,
    foot_velocity_z: f64,
    contact_force_x: f64,
    contact_force_y: f64,
    contact_force_z: f64,
}

impl From<TrackingWeightsFile> for TrackingWeights {
    fn from(f: TrackingWeightsFile) -> Self {
        Self {
            euler_xyz: Vector3::new(f.roll, f.pitch, f.yaw),
            com_position: Vector3::new(f.base_position_x, f.base_position_y, f.base_position_z),
            com_angular_velocity: Vector3::new(
                f.base_angular_vel_x,
                f.base_angular_vel_y,
                f.base_angular_vel_z,
            ),
            com_linear_velocity: Vector3::new(
                f.base_linear_vel_x,
                f.base_linear_vel_y,
                f.base_linear_vel_z,
            ),
            joint_position: Vector3::new(
                f.joint_position_HAA,
                f.joint_position_HFE,
                f.joint_position_KFE,
            ),
            foot_position: Vector3::new(f.foot_position_x, f.foot_position_y, f.foot_position_z),
            foot_velocity: Vector3::new(f.foot_velocity_x, f.foot_velocity_y, f.foot_velocity_z),
            contact_force: Vector3::new(f.contact_force_x, f.contact_force_y, f.contact_force_z),
        }
    }
}

// ---------------------------------------------------------------------------
// AdSettings
// ---------------------------------------------------------------------------

/// Settings handed to the derivative backend when compiling a residual.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdSettings {
    /// Name of the compiled model; part of the cache key.
    #[serde(default = "default_model_name")]
    pub model_name: String,

    /// Build-cache location; part of the cache key.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Discard any cached evaluator and compile again.
    #[serde(default)]
    pub recompile: bool,
}

impl Default for AdSettings {
    fn default() -> Self {
        Self {
            model_name: default_model_name(),
            cache_dir: default_cache_dir(),
            recompile: false,
        }
    }
}

impl AdSettings {
    pub fn new(model_name: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            ..Self::default()
        }
    }

    /// Builder: set the recompile flag.
    #[must_use]
    pub const fn with_recompile(mut self, recompile: bool) -> Self {
        self.recompile = recompile;
        self
    }

    /// Builder: set the cache directory.
    #[must_use]
    pub fn with_cache_dir(mut self, cache_dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = cache_dir.into();
        self
    }

    /// Location the compiled model is keyed under.
    pub fn model_path(&self) -> PathBuf {
        self.cache_dir.join(&self.model_name)
    }
}
