//! MoonLight demo scenarios
//!
//! Each scenario implements [`Application`](moonlight_engine::Application)
//! for the Vulkan backend and is started by its own binary:
//!
//! - `moonlight_gravity`: a sun and four planets under N-body gravity
//! - `moonlight_particle_life`: colored particle types attracting and
//!   repelling each other
//! - `moonlight_test_scene`: static models lit by a ring of point lights

#![warn(missing_docs)]

pub mod config;
pub mod gravity;
pub mod particle_life;
pub mod systems;
pub mod test_scene;

pub use config::{AppConfig, ScenarioError, SolarGravitySettings, CONFIG_PATH};
pub use gravity::GravityScenario;
pub use particle_life::ParticleLifeScenario;
pub use systems::SceneRenderSystems;
pub use test_scene::TestScene;

use moonlight_engine::config::Config;
use moonlight_engine::{Application, EngineConfig};
use moonlight_engine::render::vulkan::VulkanBackend;

/// Initialize logging, load [`CONFIG_PATH`] and run the scenario built by
/// `build` in a window titled `title`
///
/// Errors are logged and printed to stderr; the returned code is non-zero on
/// failure.
pub fn run_scenario<A, F>(title: &str, build: F) -> std::process::ExitCode
where
    A: Application<VulkanBackend>,
    F: FnOnce(&AppConfig) -> A,
{
    moonlight_engine::foundation::logging::init();

    match try_run(title, build) {
        Ok(()) => {
            log::info!("{title} finished");
            std::process::ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{title} failed: {e}");
            eprintln!("error: {e}");
            std::process::ExitCode::FAILURE
        }
    }
}

fn try_run<A, F>(title: &str, build: F) -> Result<(), ScenarioError>
where
    A: Application<VulkanBackend>,
    F: FnOnce(&AppConfig) -> A,
{
    let config = AppConfig::load_or_default(CONFIG_PATH)?;
    let engine = EngineConfig {
        window: moonlight_engine::WindowConfig {
            title: title.to_string(),
            ..config.engine.window.clone()
        },
        ..config.engine.clone()
    };

    log::info!("Starting {title}");
    let app = build(&config);
    moonlight_engine::launch(engine, app)?;
    Ok(())
}
