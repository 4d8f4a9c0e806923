//! Render sub-systems shared by every scenario

use moonlight_engine::render::systems::{GridSystem, PointLightSystem, SimpleRenderSystem};
use moonlight_engine::render::vulkan::VulkanBackend;
use moonlight_engine::render::FrameInfo;
use moonlight_engine::{AppError, StartContext};

/// Lit meshes, light billboards and the ground grid, in draw order
pub struct SceneRenderSystems {
    simple: SimpleRenderSystem,
    point_lights: PointLightSystem,
    grid: GridSystem,
}

impl SceneRenderSystems {
    /// Build every pipeline against the engine's render pass
    pub fn new(ctx: &StartContext<'_, VulkanBackend>) -> Result<Self, AppError> {
        Ok(Self {
            simple: SimpleRenderSystem::new(ctx.backend, ctx.shader_dir)?,
            point_lights: PointLightSystem::new(ctx.backend, ctx.shader_dir)?,
            grid: GridSystem::new(ctx.backend, ctx.shader_dir)?,
        })
    }

    /// Record opaque meshes first, then the blended passes
    pub fn render(&mut self, frame: &FrameInfo<'_, VulkanBackend>) -> Result<(), AppError> {
        self.simple.render(frame)?;
        self.point_lights.render(frame)?;
        self.grid.render(frame);
        Ok(())
    }
}
