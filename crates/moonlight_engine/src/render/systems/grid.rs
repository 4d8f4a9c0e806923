//! Infinite ground grid drawn from the camera planes

use std::path::Path;
use std::sync::Arc;

use ash::vk;
use bytemuck::{Pod, Zeroable};

use super::{bind_global_set, push_constants};
use crate::render::camera::Camera;
use crate::render::frame_info::FrameInfo;
use crate::render::vulkan::{GraphicsPipeline, PipelineConfig, VulkanBackend, VulkanContext, VulkanResult};

const PUSH_STAGES: vk::ShaderStageFlags =
    vk::ShaderStageFlags::from_raw(vk::ShaderStageFlags::VERTEX.as_raw() | vk::ShaderStageFlags::FRAGMENT.as_raw());

// Two triangles per plane quad, three planes
const GRID_VERTICES: u32 = 18;

/// Grid push constants
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GridPushConstants {
    /// Camera near plane
    pub near: f32,
    /// Camera far plane
    pub far: f32,
    /// Cell size in world units
    pub grid_size: i32,
}

impl GridPushConstants {
    /// Read the planes and cell size from `camera`
    pub fn from_camera(camera: &Camera) -> Self {
        Self {
            near: camera.near(),
            far: camera.far(),
            grid_size: camera.grid_size,
        }
    }
}

/// Vertex-less grid pass, drawn only when the camera enables it
pub struct GridSystem {
    context: Arc<VulkanContext>,
    pipeline: GraphicsPipeline,
}

impl GridSystem {
    /// Build the pipeline from `grid.{vert,frag}.spv` in `shader_dir`
    pub fn new(backend: &VulkanBackend, shader_dir: &Path) -> VulkanResult<Self> {
        let context = Arc::clone(backend.context());
        let config = PipelineConfig::default()
            .without_vertex_input()
            .with_alpha_blending()
            .with_push_constants(PUSH_STAGES, std::mem::size_of::<GridPushConstants>() as u32);

        let pipeline = GraphicsPipeline::from_files(
            context.device().clone(),
            backend.render_pass(),
            shader_dir,
            "grid.vert",
            "grid.frag",
            &[backend.global_layout()],
            &config,
        )?;

        Ok(Self { context, pipeline })
    }

    /// Record the grid draw
    pub fn render(&self, frame: &FrameInfo<'_, VulkanBackend>) {
        if !frame.camera.enable_grid {
            return;
        }

        let device = self.context.device();
        self.pipeline.bind(frame.command);
        bind_global_set(frame, device, self.pipeline.layout());
        push_constants(
            device,
            frame.command,
            self.pipeline.layout(),
            PUSH_STAGES,
            &GridPushConstants::from_camera(frame.camera),
        );
        unsafe {
            device.cmd_draw(frame.command, GRID_VERTICES, 1, 0, 0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_constants_follow_camera() {
        let mut camera = Camera::new();
        camera.set_perspective_projection(1.0, 1.0, 0.1, 1000.0);
        camera.grid_size = 4;

        let push = GridPushConstants::from_camera(&camera);
        assert_eq!(push, GridPushConstants { near: 0.1, far: 1000.0, grid_size: 4 });
        assert_eq!(std::mem::size_of::<GridPushConstants>(), 12);
    }
}
