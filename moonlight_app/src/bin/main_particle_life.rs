//! Particle life demo

use moonlight_app::ParticleLifeScenario;

fn main() -> std::process::ExitCode {
    moonlight_app::run_scenario("MoonLight Particle Life", |config| {
        ParticleLifeScenario::new(config.particle_life.clone())
    })
}
