//! Static test scene

use moonlight_app::TestScene;

fn main() -> std::process::ExitCode {
    moonlight_app::run_scenario("MoonLight Test Scene", |config| TestScene::new(&config.models_dir))
}
