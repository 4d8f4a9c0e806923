//! Lit mesh rendering

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use ash::vk;
use bytemuck::{Pod, Zeroable};

use super::{bind_global_set, push_constants};
use crate::foundation::math::utils;
use crate::render::frame_info::FrameInfo;
use crate::render::mesh::Mesh;
use crate::render::vulkan::{GpuMesh, GraphicsPipeline, PipelineConfig, VulkanBackend, VulkanContext, VulkanResult};
use crate::render::RenderResult;
use crate::scene::ObjectBufferData;

const PUSH_STAGES: vk::ShaderStageFlags =
    vk::ShaderStageFlags::from_raw(vk::ShaderStageFlags::VERTEX.as_raw() | vk::ShaderStageFlags::FRAGMENT.as_raw());

/// Per-draw push constants
///
/// The normal matrix is padded into a mat4 whose last column carries the
/// object's color, which the shader multiplies into the vertex color.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct SimplePushConstants {
    /// Model matrix, column major
    pub model_matrix: [[f32; 4]; 4],
    /// Inverse transpose of the model's upper 3x3, column major; column 3
    /// is the object color with w = 1
    pub normal_matrix: [[f32; 4]; 4],
}

impl SimplePushConstants {
    /// Build from one snapshot entry
    pub fn from_entry(entry: &ObjectBufferData) -> Self {
        let mut normal_matrix = utils::to_cols_array(&utils::mat3_to_mat4(&entry.normal_matrix));
        normal_matrix[3] = [entry.color.x, entry.color.y, entry.color.z, 1.0];
        Self {
            model_matrix: utils::to_cols_array(&entry.model_matrix),
            normal_matrix,
        }
    }
}

/// Draws every snapshot entry whose entity carries a mesh
///
/// GPU buffers are uploaded on first use and cached per shared mesh. The
/// cache keeps its `Arc` so a cached address is never reused by another mesh.
pub struct SimpleRenderSystem {
    context: Arc<VulkanContext>,
    pipeline: GraphicsPipeline,
    meshes: HashMap<*const Mesh, (Arc<Mesh>, GpuMesh)>,
}

impl SimpleRenderSystem {
    /// Build the pipeline from `simple_shader.{vert,frag}.spv` in `shader_dir`
    pub fn new(backend: &VulkanBackend, shader_dir: &Path) -> VulkanResult<Self> {
        let context = Arc::clone(backend.context());
        let config = PipelineConfig::default()
            .with_push_constants(PUSH_STAGES, std::mem::size_of::<SimplePushConstants>() as u32);

        let pipeline = GraphicsPipeline::from_files(
            context.device().clone(),
            backend.render_pass(),
            shader_dir,
            "simple_shader.vert",
            "simple_shader.frag",
            &[backend.global_layout()],
            &config,
        )?;

        Ok(Self {
            context,
            pipeline,
            meshes: HashMap::new(),
        })
    }

    /// Number of meshes with GPU buffers
    pub fn cached_meshes(&self) -> usize {
        self.meshes.len()
    }

    /// Record draws for the frame's snapshot
    pub fn render(&mut self, frame: &FrameInfo<'_, VulkanBackend>) -> RenderResult<()> {
        let device = self.context.device();
        self.pipeline.bind(frame.command);
        bind_global_set(frame, device, self.pipeline.layout());

        for entry in frame.game_objects.frame_buffer(frame.frame_index)? {
            let Some(mesh) = frame.game_objects.get(entry.id).and_then(|object| object.mesh.as_ref()) else {
                continue;
            };

            let key = Arc::as_ptr(mesh);
            if !self.meshes.contains_key(&key) {
                let gpu_mesh = GpuMesh::upload(&self.context, mesh)?;
                log::debug!("Uploaded mesh with {} vertices", mesh.vertices.len());
                self.meshes.insert(key, (Arc::clone(mesh), gpu_mesh));
            }
            let Some((_, gpu_mesh)) = self.meshes.get(&key) else {
                continue;
            };

            push_constants(
                device,
                frame.command,
                self.pipeline.layout(),
                PUSH_STAGES,
                &SimplePushConstants::from_entry(entry),
            );
            gpu_mesh.bind(frame.command);
            gpu_mesh.draw(frame.command);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{Transform, Vec3};
    use crate::scene::GameObjectId;
    use approx::assert_relative_eq;

    #[test]
    fn test_push_constants_layout() {
        assert_eq!(std::mem::size_of::<SimplePushConstants>(), 128);
    }

    #[test]
    fn test_push_constants_pack_color_with_normal_matrix() {
        let transform = Transform {
            translation: Vec3::new(1.0, 2.0, 3.0),
            rotation: Vec3::zeros(),
            scale: Vec3::new(2.0, 1.0, 1.0),
        };
        let entry = ObjectBufferData {
            id: GameObjectId(0),
            model_matrix: transform.mat4(),
            normal_matrix: transform.normal_matrix(),
            color: Vec3::new(0.2, 0.4, 0.6),
        };

        let push = SimplePushConstants::from_entry(&entry);
        assert_relative_eq!(push.model_matrix[3][0], 1.0);
        assert_relative_eq!(push.model_matrix[3][2], 3.0);
        assert_relative_eq!(push.normal_matrix[0][0], 0.5);
        assert_relative_eq!(push.normal_matrix[0][3], 0.0);
        assert_eq!(push.normal_matrix[3], [0.2, 0.4, 0.6, 1.0]);
    }
}
