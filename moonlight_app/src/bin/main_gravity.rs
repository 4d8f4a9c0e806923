//! Solar system gravity demo

use moonlight_app::GravityScenario;

fn main() -> std::process::ExitCode {
    moonlight_app::run_scenario("MoonLight Gravity", |config| GravityScenario::new(config.gravity.into()))
}
