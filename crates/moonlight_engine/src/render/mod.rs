//! Rendering
//!
//! ```text
//!            Engine loop
//!                │
//!                ▼
//!        Renderer<B> (frame state machine, per-slot FramePool)
//!                │  RenderBackend trait
//!      ┌─────────┴──────────┐
//!      ▼                    ▼
//!  VulkanBackend       HeadlessBackend
//!  (ash + glfw)        (in-memory, tests)
//! ```
//!
//! Render sub-systems in [`systems`] record draw commands for the Vulkan
//! backend from the per-frame [`FrameInfo`].

pub mod backend;
pub mod camera;
pub mod frame_info;
pub mod headless;
pub mod lighting;
pub mod mesh;
pub mod renderer;
pub mod systems;
pub mod vulkan;
pub mod window;

pub use backend::{AcquireResult, DescriptorAllocator, DescriptorSetOf, Extent2D, PresentResult, RenderBackend};
pub use camera::{Camera, CameraController, CameraControllerConfig};
pub use frame_info::{DirectionalLight, FrameInfo, GlobalUbo, PointLight, MAX_LIGHTS};
pub use mesh::{Mesh, Vertex};
pub use renderer::{FramePhase, FramePool, FrameStats, Renderer, RendererConfig};
pub use window::Window;

use thiserror::Error;

/// Rendering errors
#[derive(Error, Debug)]
pub enum RenderError {
    /// Error from the Vulkan backend
    #[error("Vulkan error: {0}")]
    Vulkan(#[from] vulkan::VulkanError),

    /// Scene data unavailable for the frame being recorded
    #[error("Scene error: {0}")]
    Scene(#[from] crate::scene::SceneError),

    /// A frame call made out of order
    #[error("Invalid renderer state: {reason}")]
    InvalidState {
        /// What was wrong
        reason: String,
    },

    /// A frame pool ran out of descriptor sets
    #[error("Descriptor pool for frame slot {slot} is exhausted")]
    PoolExhausted {
        /// Frame slot whose pool is full
        slot: usize,
    },

    /// Backend specific failure
    #[error("Backend error: {0}")]
    Backend(String),
}

impl RenderError {
    pub(crate) fn invalid_state(reason: impl Into<String>) -> Self {
        Self::InvalidState { reason: reason.into() }
    }
}

/// Result type for rendering operations
pub type RenderResult<T> = Result<T, RenderError>;
