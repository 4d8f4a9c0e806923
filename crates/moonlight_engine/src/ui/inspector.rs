//! Keyboard driven inspector that reports through the log

use serde::{Deserialize, Serialize};

use crate::foundation::time::Time;
use crate::input::{InputManager, KeyCode};
use crate::render::camera::Camera;
use crate::scene::GameObjectManager;

const MIN_TIME_SCALE: f32 = 1.0 / 64.0;
const MAX_TIME_SCALE: f32 = 64.0;

/// Mutable frame state exposed to an inspector
pub struct InspectorView<'a> {
    /// Frame clock, including the time scale
    pub time: &'a mut Time,
    /// Viewer, including the grid settings
    pub camera: &'a mut Camera,
    /// Entity store
    pub objects: &'a mut GameObjectManager,
    /// Key edges sampled this frame
    pub input: &'a InputManager,
}

/// Per-frame debug collaborator
pub trait Inspector {
    /// Inspect (and possibly edit) the frame state
    fn inspect(&mut self, view: InspectorView<'_>);
}

/// [`LogInspector`] settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InspectorConfig {
    /// Seconds between frame summaries; 0 disables them
    pub summary_interval: f32,
    /// Toggle the grid
    pub toggle_grid: KeyCode,
    /// Double the time scale
    pub speed_up: KeyCode,
    /// Halve the time scale
    pub slow_down: KeyCode,
    /// Pause or resume the simulation
    pub pause: KeyCode,
    /// Shrink the grid cells
    pub grid_smaller: KeyCode,
    /// Grow the grid cells
    pub grid_larger: KeyCode,
    /// Toggle the per-entity property listing
    pub list_entities: KeyCode,
}

impl Default for InspectorConfig {
    fn default() -> Self {
        Self {
            summary_interval: 5.0,
            toggle_grid: KeyCode::G,
            speed_up: KeyCode::Equal,
            slow_down: KeyCode::Minus,
            pause: KeyCode::P,
            grid_smaller: KeyCode::LeftBracket,
            grid_larger: KeyCode::RightBracket,
            list_entities: KeyCode::I,
        }
    }
}

/// Default inspector: hotkeys plus a periodic summary at `info`
#[derive(Debug)]
pub struct LogInspector {
    config: InspectorConfig,
    next_summary: f32,
    paused_scale: Option<f32>,
}

impl Default for LogInspector {
    fn default() -> Self {
        Self::new(InspectorConfig::default())
    }
}

impl LogInspector {
    /// Create an inspector with `config`
    pub fn new(config: InspectorConfig) -> Self {
        Self {
            next_summary: config.summary_interval,
            config,
            paused_scale: None,
        }
    }

    /// Whether the simulation is paused by this inspector
    pub fn is_paused(&self) -> bool {
        self.paused_scale.is_some()
    }

    fn handle_keys(&mut self, view: &mut InspectorView<'_>) {
        let keys = self.config.clone();
        let input = view.input;

        if input.just_pressed(keys.toggle_grid) {
            view.camera.enable_grid = !view.camera.enable_grid;
            log::info!("Grid {}", if view.camera.enable_grid { "enabled" } else { "disabled" });
        }
        if input.just_pressed(keys.grid_larger) {
            view.camera.grid_size = view.camera.grid_size.saturating_add(1);
            log::info!("Grid size {}", view.camera.grid_size);
        }
        if input.just_pressed(keys.grid_smaller) {
            view.camera.grid_size = (view.camera.grid_size - 1).max(1);
            log::info!("Grid size {}", view.camera.grid_size);
        }

        if input.just_pressed(keys.pause) {
            match self.paused_scale.take() {
                Some(scale) => {
                    view.time.set_time_scale(scale);
                    log::info!("Resumed at time scale {scale}");
                }
                None => {
                    self.paused_scale = Some(view.time.time_scale());
                    view.time.set_time_scale(0.0);
                    log::info!("Paused");
                }
            }
        }
        if !self.is_paused() {
            let scale = view.time.time_scale();
            if input.just_pressed(keys.speed_up) {
                view.time.set_time_scale((scale * 2.0).min(MAX_TIME_SCALE));
                log::info!("Time scale {}", view.time.time_scale());
            }
            if input.just_pressed(keys.slow_down) {
                view.time.set_time_scale((scale * 0.5).max(MIN_TIME_SCALE));
                log::info!("Time scale {}", view.time.time_scale());
            }
        }

        if input.just_pressed(keys.list_entities) {
            let show = !view.objects.iter().any(|object| object.ui.show_properties);
            for object in view.objects.iter_mut() {
                object.ui.show_properties = show;
            }
            log_entities(view.objects);
        }
    }

    fn log_summary(&mut self, view: &InspectorView<'_>) {
        if self.config.summary_interval <= 0.0 || view.time.total_time() < self.next_summary {
            return;
        }
        self.next_summary = view.time.total_time() + self.config.summary_interval;

        let p = view.camera.position();
        log::info!(
            "frame {} | {:.1} fps | dt {:.4}s (pure {:.4}s, scale {}) | {} objects | camera ({:.2}, {:.2}, {:.2})",
            view.time.frame_count(),
            view.time.fps(),
            view.time.delta_time(),
            view.time.pure_delta_time(),
            view.time.time_scale(),
            view.objects.len(),
            p.x,
            p.y,
            p.z
        );

        for object in view.objects.iter().filter(|object| object.ui.show_properties) {
            let t = object.transform;
            log::info!(
                "  {} [{}] pos ({:.3}, {:.3}, {:.3}) vel ({:.3}, {:.3}, {:.3}) mass {}",
                object.name,
                object.id(),
                t.translation.x,
                t.translation.y,
                t.translation.z,
                object.rigid_body.velocity.x,
                object.rigid_body.velocity.y,
                object.rigid_body.velocity.z,
                object.rigid_body.mass
            );
        }
    }
}

impl Inspector for LogInspector {
    fn inspect(&mut self, mut view: InspectorView<'_>) {
        self.handle_keys(&mut view);
        self.log_summary(&view);
    }
}

fn log_entities(objects: &GameObjectManager) {
    let mut ids = objects.ids();
    ids.sort_unstable();
    log::info!("{} game objects:", ids.len());
    for object in ids.into_iter().filter_map(|id| objects.get(id)) {
        let light = object
            .point_light
            .map(|light| format!(" light {}", light.light_intensity))
            .unwrap_or_default();
        log::info!("  [{}] {}{}", object.id(), object.name, light);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::headless::HeadlessWindow;
    use crate::render::Extent2D;
    use approx::assert_relative_eq;

    struct Fixture {
        time: Time,
        camera: Camera,
        objects: GameObjectManager,
        input: InputManager,
        window: HeadlessWindow,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                time: Time::from_delta(0.016),
                camera: Camera::new(),
                objects: GameObjectManager::new(2),
                input: InputManager::new(),
                window: HeadlessWindow::new(Extent2D::new(800, 600)),
            }
        }

        fn tap(&mut self, inspector: &mut LogInspector, key: KeyCode) {
            self.window.press(key);
            self.input.update(&self.window);
            inspector.inspect(InspectorView {
                time: &mut self.time,
                camera: &mut self.camera,
                objects: &mut self.objects,
                input: &self.input,
            });
            self.window.release(key);
            self.input.update(&self.window);
        }
    }

    #[test]
    fn test_grid_toggle() {
        let mut fixture = Fixture::new();
        let mut inspector = LogInspector::default();

        fixture.tap(&mut inspector, KeyCode::G);
        assert!(fixture.camera.enable_grid);
        fixture.tap(&mut inspector, KeyCode::G);
        assert!(!fixture.camera.enable_grid);
    }

    #[test]
    fn test_grid_size_never_below_one() {
        let mut fixture = Fixture::new();
        let mut inspector = LogInspector::default();

        fixture.tap(&mut inspector, KeyCode::LeftBracket);
        assert_eq!(fixture.camera.grid_size, 1);
        fixture.tap(&mut inspector, KeyCode::RightBracket);
        assert_eq!(fixture.camera.grid_size, 2);
    }

    #[test]
    fn test_time_scale_keys() {
        let mut fixture = Fixture::new();
        let mut inspector = LogInspector::default();

        fixture.tap(&mut inspector, KeyCode::Equal);
        assert_relative_eq!(fixture.time.time_scale(), 2.0);
        fixture.tap(&mut inspector, KeyCode::Minus);
        fixture.tap(&mut inspector, KeyCode::Minus);
        assert_relative_eq!(fixture.time.time_scale(), 0.5);
    }

    #[test]
    fn test_pause_restores_previous_scale() {
        let mut fixture = Fixture::new();
        let mut inspector = LogInspector::default();
        fixture.time.set_time_scale(4.0);

        fixture.tap(&mut inspector, KeyCode::P);
        assert!(inspector.is_paused());
        assert_relative_eq!(fixture.time.delta_time(), 0.0);

        fixture.tap(&mut inspector, KeyCode::Equal);
        assert_relative_eq!(fixture.time.time_scale(), 0.0);

        fixture.tap(&mut inspector, KeyCode::P);
        assert_relative_eq!(fixture.time.time_scale(), 4.0);
    }

    #[test]
    fn test_listing_toggles_property_flags() {
        let mut fixture = Fixture::new();
        let mut inspector = LogInspector::default();
        fixture.objects.create_game_object();
        fixture.objects.make_default_point_light();

        fixture.tap(&mut inspector, KeyCode::I);
        assert!(fixture.objects.iter().all(|object| object.ui.show_properties));
        fixture.tap(&mut inspector, KeyCode::I);
        assert!(fixture.objects.iter().all(|object| !object.ui.show_properties));
    }

    #[test]
    fn test_held_key_fires_once() {
        let mut fixture = Fixture::new();
        let mut inspector = LogInspector::default();

        fixture.window.press(KeyCode::G);
        for _ in 0..3 {
            fixture.input.update(&fixture.window);
            inspector.inspect(InspectorView {
                time: &mut fixture.time,
                camera: &mut fixture.camera,
                objects: &mut fixture.objects,
                input: &fixture.input,
            });
        }
        assert!(fixture.camera.enable_grid);
    }
}
