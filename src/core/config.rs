//! Simulation configuration
//!
//! Everything tunable lives in one [`SimConfig`], loadable from RON or JSON.
//! Missing sections and fields fall back to their defaults.

use std::fs;
use std::path::{Path, PathBuf};

use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::progression::ProgressionParams;
use crate::ai::NpcParams;
use crate::vehicle::{LocomotionParams, StabilizerParams};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Fixed-step loop settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimSettings {
    /// Fixed tick length in seconds
    pub dt: f32,
    /// Ticks to run when no count is given on the command line
    pub ticks: u32,
    /// Base seed for every random stream
    pub seed: u64,
}

impl Default for SimSettings {
    fn default() -> Self {
        Self {
            dt: 0.02,
            ticks: 3000,
            seed: 0,
        }
    }
}

/// Square walled arena centred on the origin, ground top at y = 0
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaSettings {
    pub half_extent: f32,
    pub wall_height: f32,
    pub wall_thickness: f32,
}

impl Default for ArenaSettings {
    fn default() -> Self {
        Self {
            half_extent: 40.0,
            wall_height: 3.0,
            wall_thickness: 1.0,
        }
    }
}

/// Chassis box shared by every vehicle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleShape {
    pub half_extents: Vec3,
    pub density: f32,
}

impl Default for VehicleShape {
    fn default() -> Self {
        Self {
            half_extents: Vec3::new(1.0, 0.5, 2.0),
            density: 1.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub sim: SimSettings,
    pub arena: ArenaSettings,
    pub vehicle: VehicleShape,
    pub player: LocomotionParams,
    pub npc: NpcParams,
    pub stabilizer: StabilizerParams,
    pub progression: ProgressionParams,
}

impl SimConfig {
    /// Load by file extension (`.ron` or `.json`) and validate.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or fails validation
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let config = match path.extension().and_then(|e| e.to_str()) {
            Some("ron") => Self::load_ron(path)?,
            Some("json") => Self::load_json(path)?,
            _ => {
                return Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    message: "expected a .ron or .json file".to_string(),
                });
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Load from a RON file without validating
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed
    pub fn load_ron(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = read(path)?;
        ron::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Load from a JSON file without validating
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = read(path)?;
        serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Check value ranges the controllers rely on.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("sim.dt", self.sim.dt)?;
        positive("arena.half_extent", self.arena.half_extent)?;
        positive("arena.wall_height", self.arena.wall_height)?;
        positive("arena.wall_thickness", self.arena.wall_thickness)?;
        positive("vehicle.density", self.vehicle.density)?;
        if self.vehicle.half_extents.min_element() <= 0.0 {
            return Err(ConfigError::Invalid(
                "vehicle.half_extents must be positive".to_string(),
            ));
        }

        non_negative("player.acceleration", self.player.acceleration)?;
        non_negative("player.turn_rate", self.player.turn_rate)?;
        non_negative("player.top_speed", self.player.top_speed)?;

        let npc = &self.npc;
        non_negative("npc.move_acceleration", npc.move_acceleration)?;
        non_negative("npc.wander_acceleration", npc.wander_acceleration)?;
        non_negative("npc.turn_speed", npc.turn_speed)?;
        non_negative("npc.detection_radius", npc.detection_radius)?;
        non_negative("npc.avoidance_strength", npc.avoidance_strength)?;
        positive("npc.wander_interval", npc.wander_interval)?;
        positive("npc.obstacle_detect_distance", npc.obstacle_detect_distance)?;
        if !(0.0..=180.0).contains(&npc.obstacle_jitter_angle) {
            return Err(ConfigError::Invalid(format!(
                "npc.obstacle_jitter_angle must be within [0, 180], got {}",
                npc.obstacle_jitter_angle
            )));
        }

        non_negative("stabilizer.upright_torque_gain", self.stabilizer.upright_torque_gain)?;
        non_negative("stabilizer.deadband_deg", self.stabilizer.deadband_deg)?;

        non_negative("progression.speed_increment", self.progression.speed_increment)?;
        non_negative("progression.avoidance_increment", self.progression.avoidance_increment)?;
        non_negative("progression.detect_increment", self.progression.detect_increment)?;
        Ok(())
    }
}

fn read(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn positive(field: &str, value: f32) -> Result<(), ConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!("{field} must be positive, got {value}")))
    }
}

fn non_negative(field: &str, value: f32) -> Result<(), ConfigError> {
    if value >= 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!(
            "{field} must be non-negative, got {value}"
        )))
    }
}
