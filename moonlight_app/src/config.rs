//! Scenario configuration

use moonlight_engine::config::{Config, ConfigError};
use moonlight_engine::foundation::math::Vec3;
use moonlight_engine::physics::{GravityConfig, ParticleLifeConfig};
use moonlight_engine::{EngineConfig, EngineError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default configuration file, relative to the working directory
pub const CONFIG_PATH: &str = "resources/config/moonlight.toml";

/// One particle type of the particle life scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticleTypeConfig {
    /// Display name
    pub name: String,
    /// Particle color
    pub color: Vec3,
    /// Number of particles
    pub count: usize,
}

impl ParticleTypeConfig {
    fn new(name: &str, color: Vec3, count: usize) -> Self {
        Self {
            name: name.to_string(),
            color,
            count,
        }
    }
}

/// Solar system gravity settings
///
/// Kept apart from [`GravityConfig`] so that a partial `[gravity]` table
/// falls back to the scenario's gravitational constant rather than the
/// physics system's.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolarGravitySettings {
    /// Gravitational constant
    pub strength: f32,
    /// Substeps per frame
    pub substeps: u32,
}

impl Default for SolarGravitySettings {
    fn default() -> Self {
        Self {
            strength: 6.674e-18,
            substeps: 100,
        }
    }
}

impl From<SolarGravitySettings> for GravityConfig {
    fn from(settings: SolarGravitySettings) -> Self {
        Self {
            strength: settings.strength,
            substeps: settings.substeps,
        }
    }
}

/// Particle life scenario settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticleLifeSettings {
    /// Simulation tunables
    pub simulation: ParticleLifeConfig,
    /// Types created at start, in id order
    pub types: Vec<ParticleTypeConfig>,
    /// Mesh shared by every particle
    pub model: String,
}

impl Default for ParticleLifeSettings {
    fn default() -> Self {
        Self {
            simulation: ParticleLifeConfig::default(),
            types: vec![
                ParticleTypeConfig::new("red", Vec3::new(1.0, 0.0, 0.0), 50),
                ParticleTypeConfig::new("green", Vec3::new(0.0, 1.0, 0.0), 50),
                ParticleTypeConfig::new("blue", Vec3::new(0.0, 0.0, 1.0), 50),
                ParticleTypeConfig::new("white", Vec3::new(1.0, 1.0, 1.0), 50),
            ],
            model: "resources/models/sphere.obj".to_string(),
        }
    }
}

/// Settings shared by every scenario binary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Window, renderer, camera and inspector settings
    pub engine: EngineConfig,
    /// Solar system gravity
    pub gravity: SolarGravitySettings,
    /// Particle life
    pub particle_life: ParticleLifeSettings,
    /// Directory searched for the test scene's models
    pub models_dir: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            gravity: SolarGravitySettings::default(),
            particle_life: ParticleLifeSettings::default(),
            models_dir: "resources/models".to_string(),
        }
    }
}

impl Config for AppConfig {}

/// Failures that end a scenario binary
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// Configuration file unreadable
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Engine failure
    #[error("{0}")]
    Engine(#[from] EngineError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_defaults_match_scenarios() {
        let config = AppConfig::default();
        assert_relative_eq!(config.gravity.strength, 6.674e-18);
        assert_eq!(config.gravity.substeps, 100);
        assert_eq!(config.particle_life.types.len(), 4);
        assert!(config.particle_life.types.iter().all(|t| t.count == 50));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            models_dir = "assets/models"

            [gravity]
            substeps = 10
            "#,
        )
        .expect("parse");

        assert_eq!(config.models_dir, "assets/models");
        assert_eq!(config.gravity.substeps, 10);
        assert_relative_eq!(config.gravity.strength, 6.674e-18);
        assert_eq!(config.particle_life, ParticleLifeSettings::default());
    }

    #[test]
    fn test_partial_gravity_table_keeps_solar_constant() {
        let config: AppConfig = toml::from_str("[gravity]\nsubsteps = 25\n").expect("parse");
        let physics = GravityConfig::from(config.gravity);

        assert_eq!(physics.substeps, 25);
        assert_relative_eq!(physics.strength, 6.674e-18);

        let config: AppConfig = toml::from_str("[gravity]\nstrength = 1.0e-10\n").expect("parse");
        assert_relative_eq!(config.gravity.strength, 1.0e-10);
        assert_eq!(config.gravity.substeps, 100);
    }

    #[test]
    fn test_shipped_config_parses() {
        let config: AppConfig =
            toml::from_str(include_str!("../../resources/config/moonlight.toml")).expect("parse shipped config");

        assert_eq!(config.engine.window.width, 1280);
        assert_eq!(config.engine.window.title, "MoonLight");
        assert_relative_eq!(config.gravity.strength, 6.674e-18);
        assert_eq!(config.particle_life, ParticleLifeSettings::default());
        assert_eq!(config.models_dir, "resources/models");
    }

    #[test]
    fn test_config_round_trips_ron() {
        let path = std::env::temp_dir().join(format!("moonlight_app_{}.ron", std::process::id()));
        let config = AppConfig::default();
        config.save_to_file(&path).expect("save");
        let loaded = AppConfig::load_from_file(&path).expect("load");
        let _ = std::fs::remove_file(&path);
        assert_eq!(loaded, config);
    }
}
