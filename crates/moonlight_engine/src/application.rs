//! Application trait and lifecycle contexts

use std::path::Path;

use thiserror::Error;

use crate::assets::AssetError;
use crate::config::ConfigError;
use crate::foundation::time::Time;
use crate::input::InputManager;
use crate::physics::PhysicsError;
use crate::render::vulkan::VulkanError;
use crate::render::{Camera, FrameInfo, GlobalUbo, RenderBackend, RenderError};
use crate::scene::{GameObjectManager, SceneError};

/// Everything an application may touch while setting up
pub struct StartContext<'a, B: RenderBackend> {
    /// Backend, for building render sub-systems
    pub backend: &'a B,
    /// Directory holding compiled shaders
    pub shader_dir: &'a Path,
    /// Entity store
    pub objects: &'a mut GameObjectManager,
    /// Viewer
    pub camera: &'a mut Camera,
    /// Global uniforms; lights are refilled every frame, ambient persists
    pub ubo: &'a mut GlobalUbo,
}

/// Everything an application may touch during a frame update
pub struct UpdateContext<'a> {
    /// Entity store
    pub objects: &'a mut GameObjectManager,
    /// Viewer
    pub camera: &'a mut Camera,
    /// Key edges sampled this frame
    pub input: &'a InputManager,
}

/// Application lifecycle trait
///
/// Implement this to plug a scenario into the [`Engine`](crate::Engine).
/// The engine owns the loop; the application only reacts to it.
pub trait Application<B: RenderBackend> {
    /// Called once before the first frame
    fn start(&mut self, ctx: &mut StartContext<'_, B>) -> Result<(), AppError>;

    /// Called every frame after input is sampled and before rendering
    fn update(&mut self, ctx: &mut UpdateContext<'_>, time: &Time) -> Result<(), AppError>;

    /// Record draw commands inside the swapchain render pass
    fn render_systems(&mut self, _frame: &mut FrameInfo<'_, B>) -> Result<(), AppError> {
        Ok(())
    }
}

/// Application-level errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Physics precondition violated
    #[error("Physics error: {0}")]
    Physics(#[from] PhysicsError),

    /// Asset loading error
    #[error("Asset error: {0}")]
    Asset(#[from] AssetError),

    /// Rendering error
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    /// Vulkan error while building render sub-systems
    #[error("Vulkan error: {0}")]
    Vulkan(#[from] VulkanError),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Scene error
    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),

    /// Custom application error
    #[error("Application error: {0}")]
    Custom(String),
}
