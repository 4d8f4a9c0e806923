//! Per-frame context and the global uniform block

use bytemuck::{Pod, Zeroable};

use super::backend::{DescriptorSetOf, RenderBackend};
use super::camera::Camera;
use super::renderer::FramePool;
use crate::foundation::math::{utils, Mat4, Vec4};
use crate::foundation::time::Time;
use crate::scene::GameObjectManager;

/// Capacity of the point light array in [`GlobalUbo`]
pub const MAX_LIGHTS: usize = 10;

/// Point light as laid out in the uniform block
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct PointLight {
    /// World position; w ignored
    pub position: [f32; 4],
    /// Color; w is intensity
    pub color: [f32; 4],
}

/// Directional light as laid out in the uniform block
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct DirectionalLight {
    /// Light position; w ignored
    pub position: [f32; 4],
    /// Color; w is intensity
    pub color: [f32; 4],
}

/// Camera and lighting data shared by every shader (set 0, binding 0)
///
/// Every member is 16-byte aligned so the struct matches the std140 block in
/// the shaders byte for byte.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GlobalUbo {
    /// Projection matrix, column major
    pub projection: [[f32; 4]; 4],
    /// View matrix, column major
    pub view: [[f32; 4]; 4],
    /// Inverse view matrix, column major
    pub inverse_view: [[f32; 4]; 4],
    /// Directional light
    pub directional_light: DirectionalLight,
    /// Ambient color; w is intensity
    pub ambient_light_color: [f32; 4],
    /// Active point lights, first `num_lights` entries
    pub point_lights: [PointLight; MAX_LIGHTS],
    /// Number of valid `point_lights`
    pub num_lights: i32,
    _padding: [i32; 3],
}

impl Default for GlobalUbo {
    fn default() -> Self {
        let identity = utils::to_cols_array(&Mat4::identity());
        Self {
            projection: identity,
            view: identity,
            inverse_view: identity,
            directional_light: DirectionalLight::default(),
            ambient_light_color: [1.0, 1.0, 1.0, 0.02],
            point_lights: [PointLight::default(); MAX_LIGHTS],
            num_lights: 0,
            _padding: [0; 3],
        }
    }
}

impl GlobalUbo {
    /// Copy the camera matrices into the block
    pub fn set_camera(&mut self, camera: &Camera) {
        self.projection = utils::to_cols_array(camera.projection());
        self.view = utils::to_cols_array(camera.view());
        self.inverse_view = utils::to_cols_array(camera.inverse_view());
    }

    /// Set the ambient color and intensity
    pub fn set_ambient(&mut self, color: Vec4) {
        self.ambient_light_color = color.into();
    }

    /// Raw bytes for upload
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

/// Everything a render sub-system needs to record one frame
///
/// Built fresh by the engine loop after `begin_frame` and dropped before the
/// render pass ends.
pub struct FrameInfo<'a, B: RenderBackend> {
    /// Frame-in-flight slot, `0..frames_in_flight`
    pub frame_index: usize,
    /// Frame clock
    pub time: &'a Time,
    /// Command buffer being recorded
    pub command: B::Command,
    /// Viewer
    pub camera: &'a Camera,
    /// Global set bound to this slot's uniform buffer
    pub global_descriptor_set: DescriptorSetOf<B>,
    /// This slot's scratch descriptor pool, reset at the start of the frame
    pub frame_pool: &'a mut FramePool<B::FramePool>,
    /// Scene, read only while recording
    pub game_objects: &'a GameObjectManager,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_ubo_is_std140_sized() {
        // 3 mat4 + directional light + ambient + 10 lights + int padded to 16
        let expected = 3 * 64 + 32 + 16 + MAX_LIGHTS * 32 + 16;
        assert_eq!(std::mem::size_of::<GlobalUbo>(), expected);
        assert_eq!(std::mem::size_of::<GlobalUbo>() % 16, 0);
    }

    #[test]
    fn test_default_ambient() {
        let ubo = GlobalUbo::default();
        assert_eq!(ubo.ambient_light_color, [1.0, 1.0, 1.0, 0.02]);
        assert_eq!(ubo.num_lights, 0);
        assert_eq!(ubo.as_bytes().len(), std::mem::size_of::<GlobalUbo>());
    }
}
