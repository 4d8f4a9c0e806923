//! Point light billboards

use std::path::Path;
use std::sync::Arc;

use ash::vk;
use bytemuck::{Pod, Zeroable};

use super::{bind_global_set, push_constants};
use crate::foundation::math::Vec3;
use crate::render::frame_info::FrameInfo;
use crate::render::vulkan::{GraphicsPipeline, PipelineConfig, VulkanBackend, VulkanContext, VulkanResult};
use crate::render::RenderResult;
use crate::scene::{GameObject, GameObjectManager};

const PUSH_STAGES: vk::ShaderStageFlags =
    vk::ShaderStageFlags::from_raw(vk::ShaderStageFlags::VERTEX.as_raw() | vk::ShaderStageFlags::FRAGMENT.as_raw());

const BILLBOARD_VERTICES: u32 = 6;

/// Per-light push constants
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct PointLightPushConstants {
    /// World position; w = 1
    pub position: [f32; 4],
    /// Color; w is intensity
    pub color: [f32; 4],
    /// Billboard radius
    pub radius: f32,
    _padding: [f32; 3],
}

impl PointLightPushConstants {
    /// Build from a light entity, `None` if it has no light component
    pub fn from_object(object: &GameObject) -> Option<Self> {
        let light = object.point_light?;
        let t = object.transform.translation;
        let c = object.color;
        Some(Self {
            position: [t.x, t.y, t.z, 1.0],
            color: [c.x, c.y, c.z, light.light_intensity],
            radius: object.transform.scale.x,
            _padding: [0.0; 3],
        })
    }
}

/// Draws a glowing billboard per light
///
/// The light array of the global uniforms is filled by the engine through
/// [`crate::render::lighting::update_point_lights`] before this runs.
pub struct PointLightSystem {
    context: Arc<VulkanContext>,
    pipeline: GraphicsPipeline,
}

impl PointLightSystem {
    /// Build the pipeline from `point_light.{vert,frag}.spv` in `shader_dir`
    pub fn new(backend: &VulkanBackend, shader_dir: &Path) -> VulkanResult<Self> {
        let context = Arc::clone(backend.context());
        let config = PipelineConfig::default()
            .without_vertex_input()
            .with_alpha_blending()
            .with_push_constants(PUSH_STAGES, std::mem::size_of::<PointLightPushConstants>() as u32);

        let pipeline = GraphicsPipeline::from_files(
            context.device().clone(),
            backend.render_pass(),
            shader_dir,
            "point_light.vert",
            "point_light.frag",
            &[backend.global_layout()],
            &config,
        )?;

        Ok(Self { context, pipeline })
    }

    /// Record one billboard per light, farthest first
    pub fn render(&self, frame: &FrameInfo<'_, VulkanBackend>) -> RenderResult<()> {
        let lights = sorted_back_to_front(frame.game_objects, frame.camera.position());
        if lights.is_empty() {
            return Ok(());
        }

        let device = self.context.device();
        self.pipeline.bind(frame.command);
        bind_global_set(frame, device, self.pipeline.layout());

        for push in lights {
            push_constants(device, frame.command, self.pipeline.layout(), PUSH_STAGES, &push);
            unsafe {
                device.cmd_draw(frame.command, BILLBOARD_VERTICES, 1, 0, 0);
            }
        }
        Ok(())
    }
}

/// Light push constants ordered by decreasing distance from `eye`
///
/// Ties keep id order so the draw order is stable between frames.
pub fn sorted_back_to_front(objects: &GameObjectManager, eye: Vec3) -> Vec<PointLightPushConstants> {
    let mut lights: Vec<_> = objects
        .iter()
        .filter_map(|object| {
            let push = PointLightPushConstants::from_object(object)?;
            let distance_sq = (object.transform.translation - eye).norm_squared();
            Some((object.id(), distance_sq, push))
        })
        .collect();

    lights.sort_by_key(|(id, _, _)| *id);
    lights.sort_by(|(_, a, _), (_, b, _)| b.total_cmp(a));
    lights.into_iter().map(|(_, _, push)| push).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_push_constants_layout() {
        assert_eq!(std::mem::size_of::<PointLightPushConstants>(), 48);
    }

    #[test]
    fn test_lights_sorted_farthest_first() {
        let mut objects = GameObjectManager::new(1);
        for x in [1.0, 5.0, 3.0] {
            objects
                .make_point_light(1.0, 0.1, Vec3::new(1.0, 1.0, 1.0))
                .transform
                .translation = Vec3::new(x, 0.0, 0.0);
        }
        objects.create_game_object();

        let sorted = sorted_back_to_front(&objects, Vec3::zeros());
        let xs: Vec<f32> = sorted.iter().map(|push| push.position[0]).collect();
        assert_eq!(xs, vec![5.0, 3.0, 1.0]);
    }

    #[test]
    fn test_radius_comes_from_scale_x() {
        let mut objects = GameObjectManager::new(1);
        objects.make_point_light(0.7, 0.25, Vec3::new(0.5, 0.5, 0.5));

        let sorted = sorted_back_to_front(&objects, Vec3::zeros());
        assert_eq!(sorted.len(), 1);
        assert_relative_eq!(sorted[0].radius, 0.25);
        assert_relative_eq!(sorted[0].color[3], 0.7);
    }
}
