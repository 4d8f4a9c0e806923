//! # MoonLight Engine
//!
//! A small real-time 3D engine with Vulkan rendering and N-body physics.
//!
//! ## Features
//!
//! - **Frames in flight**: a frame orchestrator that keeps up to three frames
//!   queued on the GPU, each with its own fence, command buffer, uniform
//!   buffer and descriptor pool
//! - **Swapchain recovery**: stale and resized surfaces are rebuilt without
//!   stalling the loop
//! - **Physics**: pairwise gravity with substepping and a particle-life
//!   attraction model
//! - **Headless backend**: the whole frame loop runs without a GPU in tests
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use moonlight_engine::prelude::*;
//!
//! struct MyApp;
//!
//! impl Application<VulkanBackend> for MyApp {
//!     fn start(&mut self, ctx: &mut StartContext<'_, VulkanBackend>) -> Result<(), AppError> {
//!         ctx.objects.make_default_point_light();
//!         Ok(())
//!     }
//!
//!     fn update(&mut self, _ctx: &mut UpdateContext<'_>, _time: &Time) -> Result<(), AppError> {
//!         Ok(())
//!     }
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     moonlight_engine::foundation::logging::init();
//!     moonlight_engine::launch(EngineConfig::default(), MyApp)?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::module_name_repetitions,
    clippy::similar_names,
    clippy::too_many_arguments,
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::missing_errors_doc
)]

pub mod assets;
pub mod config;
pub mod foundation;
pub mod input;
pub mod physics;
pub mod render;
pub mod scene;
pub mod ui;

mod application;
mod engine;

pub use application::{AppError, Application, StartContext, UpdateContext};
pub use engine::{launch, CameraConfig, Engine, EngineConfig, EngineError, WindowConfig};

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        assets::{AssetError, ImageLoader, ObjLoader, TextureData},
        config::Config,
        foundation::{
            math::{Mat4, Transform, Vec3, Vec4},
            time::Time,
        },
        input::{InputManager, KeyCode, MouseButton},
        physics::{GravityConfig, GravityPhysicsSystem, ParticleLifeConfig, ParticleLifeSystem},
        render::{
            systems::{GridSystem, PointLightSystem, SimpleRenderSystem},
            vulkan::VulkanBackend,
            Camera, FrameInfo, Mesh, RenderBackend, Renderer, RendererConfig,
        },
        scene::{GameObject, GameObjectId, GameObjectManager},
        AppError, Application, Engine, EngineConfig, EngineError, StartContext, UpdateContext,
    };
}
