//! Engine loop and configuration

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::{AppError, Application, StartContext, UpdateContext};
use crate::config::{Config, ConfigError};
use crate::foundation::math::{utils, Vec3};
use crate::foundation::time::Time;
use crate::input::{InputManager, InputState, KeyCode};
use crate::render::lighting;
use crate::render::vulkan::{GlfwWindow, VulkanBackend, VulkanContext, VulkanError, WindowError};
use crate::render::{
    Camera, CameraController, CameraControllerConfig, FrameInfo, GlobalUbo, RenderBackend, RenderError, Renderer,
    RendererConfig, Window,
};
use crate::scene::{GameObjectManager, SceneError};
use crate::ui::{Inspector, InspectorConfig, InspectorView, LogInspector};

/// Window settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Window title
    pub title: String,
    /// Initial width in screen coordinates
    pub width: u32,
    /// Initial height in screen coordinates
    pub height: u32,
    /// Whether the user may resize the window
    pub resizable: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "MoonLight".to_string(),
            width: 800,
            height: 600,
            resizable: true,
        }
    }
}

/// Projection and controller settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Vertical field of view in degrees
    pub fov_degrees: f32,
    /// Near clip distance
    pub near: f32,
    /// Far clip distance
    pub far: f32,
    /// Viewer start position
    pub initial_position: Vec3,
    /// Free-fly controller tunables
    pub controller: CameraControllerConfig,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 50.0,
            near: 0.1,
            far: 1000.0,
            initial_position: Vec3::new(0.0, -1.0, -5.0),
            controller: CameraControllerConfig::default(),
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Window configuration
    pub window: WindowConfig,
    /// Renderer configuration
    pub renderer: RendererConfig,
    /// Camera configuration
    pub camera: CameraConfig,
    /// Inspector configuration
    pub inspector: InspectorConfig,
}

impl Config for EngineConfig {}

/// Engine-level errors
#[derive(Error, Debug)]
pub enum EngineError {
    /// Configuration could not be loaded
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Window system failure
    #[error("Window error: {0}")]
    Window(#[from] WindowError),

    /// Vulkan setup failure
    #[error("Vulkan error: {0}")]
    Vulkan(#[from] VulkanError),

    /// Frame orchestration failure
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    /// Scene snapshot failure
    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),

    /// Error returned by the application
    #[error("Application error: {0}")]
    Application(#[from] AppError),
}

/// Owns the renderer, window and scene and drives the frame loop
///
/// The renderer is declared before the window so GPU resources are released
/// while the surface's window still exists.
pub struct Engine<B: RenderBackend, W: Window + InputState> {
    renderer: Renderer<B>,
    window: W,
    objects: GameObjectManager,
    camera: Camera,
    controller: CameraController,
    input: InputManager,
    inspector: Box<dyn Inspector>,
    time: Time,
    ubo: GlobalUbo,
    aspect_ratio: f32,
    config: EngineConfig,
}

impl<B: RenderBackend, W: Window + InputState> Engine<B, W> {
    /// Assemble an engine around an initialized renderer and window
    pub fn new(renderer: Renderer<B>, window: W, config: EngineConfig) -> Self {
        let mut camera = Camera::new();
        camera.viewer.translation = config.camera.initial_position;
        camera.update_view();

        Self {
            objects: GameObjectManager::new(renderer.frames_in_flight()),
            renderer,
            window,
            camera,
            controller: CameraController::new(config.camera.controller),
            input: InputManager::new(),
            inspector: Box::new(LogInspector::new(config.inspector.clone())),
            time: Time::new(),
            ubo: GlobalUbo::default(),
            aspect_ratio: 0.0,
            config,
        }
    }

    /// Replace the default [`LogInspector`]
    pub fn with_inspector(mut self, inspector: impl Inspector + 'static) -> Self {
        self.inspector = Box::new(inspector);
        self
    }

    /// Run `app` until the window closes, then drain the device
    pub fn run<A: Application<B>>(&mut self, app: &mut A) -> Result<(), EngineError> {
        app.start(&mut StartContext {
            backend: self.renderer.backend(),
            shader_dir: Path::new(&self.config.renderer.shader_dir),
            objects: &mut self.objects,
            camera: &mut self.camera,
            ubo: &mut self.ubo,
        })?;
        log::info!("Application started with {} game objects", self.objects.len());

        // Setup time must not show up as the first frame's delta
        self.time = Time::new();

        while !self.window.should_close() {
            self.window.poll_events();
            self.time.update();
            self.input.update(&self.window);

            if self.input.just_pressed(KeyCode::Escape) {
                self.window.set_should_close(true);
                continue;
            }

            self.controller
                .move_camera(&mut self.camera, &mut self.window, self.time.pure_delta_time());

            app.update(
                &mut UpdateContext {
                    objects: &mut self.objects,
                    camera: &mut self.camera,
                    input: &self.input,
                },
                &self.time,
            )?;

            self.inspector.inspect(InspectorView {
                time: &mut self.time,
                camera: &mut self.camera,
                objects: &mut self.objects,
                input: &self.input,
            });

            self.refresh_projection();
            self.render_frame(app)?;
        }

        log::info!("Main loop finished after {} frames, draining device", self.time.frame_count());
        self.renderer.wait_idle()?;
        Ok(())
    }

    fn render_frame<A: Application<B>>(&mut self, app: &mut A) -> Result<(), EngineError> {
        let Some(command) = self.renderer.begin_frame(&mut self.window)? else {
            return Ok(());
        };
        let frame_index = self.renderer.frame_index();

        self.objects.update_buffer(frame_index)?;
        lighting::update_point_lights(&self.objects, &mut self.ubo);
        self.ubo.set_camera(&self.camera);

        let global_descriptor_set = self.renderer.allocate_global_set()?;
        self.renderer.write_global_uniforms(&self.ubo)?;

        self.renderer.begin_swapchain_render_pass(command)?;
        {
            let mut frame = FrameInfo {
                frame_index,
                time: &self.time,
                command,
                camera: &self.camera,
                global_descriptor_set,
                frame_pool: self.renderer.frame_pool_mut(),
                game_objects: &self.objects,
            };
            app.render_systems(&mut frame)?;
        }
        self.renderer.end_swapchain_render_pass(command)?;
        self.renderer.end_frame(&mut self.window)?;
        Ok(())
    }

    fn refresh_projection(&mut self) {
        let aspect = self.renderer.aspect_ratio();
        if (aspect - self.aspect_ratio).abs() <= f32::EPSILON {
            return;
        }
        self.aspect_ratio = aspect;

        let camera = &self.config.camera;
        self.camera.set_perspective_projection(
            utils::deg_to_rad(camera.fov_degrees),
            aspect,
            camera.near,
            camera.far,
        );
        log::debug!("Projection updated for aspect ratio {aspect:.3}");
    }

    /// Frame orchestrator
    pub fn renderer(&self) -> &Renderer<B> {
        &self.renderer
    }

    /// Window
    pub fn window(&self) -> &W {
        &self.window
    }

    /// Entity store
    pub fn objects(&self) -> &GameObjectManager {
        &self.objects
    }

    /// Viewer
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Frame clock
    pub fn time(&self) -> &Time {
        &self.time
    }

    /// Global uniforms as last written
    pub fn ubo(&self) -> &GlobalUbo {
        &self.ubo
    }
}

/// Open a GLFW window, bring up Vulkan and run `app` until it closes
pub fn launch<A: Application<VulkanBackend>>(config: EngineConfig, app: A) -> Result<(), EngineError> {
    config.renderer.validate()?;

    let window = GlfwWindow::new(
        &config.window.title,
        config.window.width,
        config.window.height,
        config.window.resizable,
    )?;
    let context = Arc::new(VulkanContext::new(
        &window,
        &config.window.title,
        config.renderer.enable_validation,
    )?);
    let backend = VulkanBackend::new(context, window.framebuffer_extent(), &config.renderer)?;
    let renderer = Renderer::new(backend, config.renderer.clear_color)?;

    let mut engine = Engine::new(renderer, window, config);
    // Declared after the engine so its pipelines are destroyed first
    let mut app = app;
    engine.run(&mut app)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::headless::{HeadlessBackend, HeadlessWindow};
    use crate::render::Extent2D;
    use approx::assert_relative_eq;

    #[derive(Default)]
    struct CountingApp {
        starts: u32,
        updates: u32,
        renders: u32,
        pool_allocations: usize,
    }

    impl Application<HeadlessBackend> for CountingApp {
        fn start(&mut self, ctx: &mut StartContext<'_, HeadlessBackend>) -> Result<(), AppError> {
            self.starts += 1;
            ctx.objects
                .make_point_light(0.5, 0.1, Vec3::new(1.0, 0.0, 0.0))
                .transform
                .translation = Vec3::new(0.0, -2.0, 0.0);
            ctx.objects.create_game_object().with_name("body");
            Ok(())
        }

        fn update(&mut self, ctx: &mut UpdateContext<'_>, _time: &Time) -> Result<(), AppError> {
            self.updates += 1;
            for object in ctx.objects.iter_mut() {
                object.transform.translation.x += 1.0;
            }
            Ok(())
        }

        fn render_systems(&mut self, frame: &mut FrameInfo<'_, HeadlessBackend>) -> Result<(), AppError> {
            self.renders += 1;
            assert_eq!(frame.game_objects.frame_buffer(frame.frame_index)?.len(), 2);
            frame.frame_pool.allocate(crate::render::headless::HeadlessLayout(1))?;
            self.pool_allocations = self.pool_allocations.max(frame.frame_pool.live_allocations());
            Ok(())
        }
    }

    fn headless_engine(window: HeadlessWindow) -> Engine<HeadlessBackend, HeadlessWindow> {
        let backend = HeadlessBackend::new(2, 3, Extent2D::new(800, 600));
        let renderer = Renderer::new(backend, [0.0, 0.0, 0.0, 1.0]).expect("renderer");
        Engine::new(renderer, window, EngineConfig::default())
    }

    #[test]
    fn test_engine_renders_until_close_and_drains_once() {
        let mut engine = headless_engine(HeadlessWindow::new(Extent2D::new(800, 600)).close_after(6));
        let mut app = CountingApp::default();

        engine.run(&mut app).expect("run");

        assert_eq!(app.starts, 1);
        assert_eq!(app.updates, 6);
        assert_eq!(app.renders, 6);
        // Global set plus the app's own set
        assert_eq!(app.pool_allocations, 2);

        let stats = engine.renderer().stats();
        assert_eq!(stats.frames_rendered, 6);
        assert_eq!(stats.frames_skipped, 0);
        assert_eq!(engine.renderer().backend().submissions(), 6);
        assert_eq!(engine.renderer().backend().wait_idle_calls(), 1);
        assert!(engine.renderer().backend().max_frames_pending() <= 2);
    }

    #[test]
    fn test_engine_uploads_lights_and_camera() {
        let mut engine = headless_engine(HeadlessWindow::new(Extent2D::new(800, 600)).close_after(2));
        engine.run(&mut CountingApp::default()).expect("run");

        let ubo = engine.ubo();
        assert_eq!(ubo.num_lights, 1);
        assert_eq!(ubo.point_lights[0].color, [1.0, 0.0, 0.0, 0.5]);
        assert_relative_eq!(ubo.point_lights[0].position[0], 2.0);

        let uploaded = engine
            .renderer()
            .backend()
            .uniforms(1)
            .expect("slot 1 written");
        assert_eq!(uploaded.num_lights, 1);
        assert_eq!(uploaded.projection, engine.ubo().projection);
    }

    #[test]
    fn test_escape_closes_without_rendering() {
        let mut window = HeadlessWindow::new(Extent2D::new(800, 600)).close_after(10);
        window.press(KeyCode::Escape);
        let mut engine = headless_engine(window);
        let mut app = CountingApp::default();

        engine.run(&mut app).expect("run");

        assert!(engine.window().should_close());
        assert_eq!(app.updates, 0);
        assert_eq!(engine.renderer().stats().frames_rendered, 0);
        assert_eq!(engine.renderer().backend().wait_idle_calls(), 1);
    }

    #[test]
    fn test_projection_follows_swapchain_aspect() {
        let mut engine = headless_engine(HeadlessWindow::new(Extent2D::new(800, 600)).close_after(1));
        engine.run(&mut CountingApp::default()).expect("run");

        let projection = engine.camera().projection();
        let tan_half = (utils::deg_to_rad(50.0) / 2.0).tan();
        assert_relative_eq!(projection[(1, 1)], 1.0 / tan_half, epsilon = 1e-5);
        assert_relative_eq!(projection[(0, 0)], 1.0 / (tan_half * 800.0 / 600.0), epsilon = 1e-5);
        assert_relative_eq!(engine.camera().far(), 1000.0);
    }

    #[test]
    fn test_config_defaults_round_trip_toml() {
        let config = EngineConfig::default();
        let text = toml::to_string_pretty(&config).expect("serialize");
        let parsed: EngineConfig = toml::from_str(&text).expect("parse");
        assert_eq!(parsed, config);
        assert_eq!(parsed.window.title, "MoonLight");
    }
}
