//! Mesh data uploaded to GPU buffers

use ash::{vk, Device};

use super::buffer::Buffer;
use super::context::VulkanContext;
use super::{VulkanError, VulkanResult};
use crate::render::mesh::Mesh;

/// Vertex and optional index buffer for one [`Mesh`]
pub struct GpuMesh {
    device: Device,
    vertex_buffer: Buffer,
    vertex_count: u32,
    index_buffer: Option<Buffer>,
    index_count: u32,
}

impl GpuMesh {
    /// Upload `mesh`
    pub fn upload(context: &VulkanContext, mesh: &Mesh) -> VulkanResult<Self> {
        mesh.validate().map_err(|e| VulkanError::InvalidOperation {
            reason: format!("cannot upload mesh: {e}"),
        })?;
        if mesh.vertices.len() < 3 {
            return Err(VulkanError::InvalidOperation {
                reason: "mesh needs at least 3 vertices".to_string(),
            });
        }

        let vertex_buffer = Buffer::with_data(
            context,
            bytemuck::cast_slice(&mesh.vertices),
            vk::BufferUsageFlags::VERTEX_BUFFER,
        )?;

        let index_buffer = if mesh.is_indexed() {
            Some(Buffer::with_data(
                context,
                bytemuck::cast_slice(&mesh.indices),
                vk::BufferUsageFlags::INDEX_BUFFER,
            )?)
        } else {
            None
        };

        Ok(Self {
            device: context.device().clone(),
            vertex_buffer,
            vertex_count: count_u32(mesh.vertices.len())?,
            index_buffer,
            index_count: count_u32(mesh.indices.len())?,
        })
    }

    /// Bind vertex (and index) buffers
    pub fn bind(&self, command_buffer: vk::CommandBuffer) {
        unsafe {
            self.device
                .cmd_bind_vertex_buffers(command_buffer, 0, &[self.vertex_buffer.handle()], &[0]);
            if let Some(index_buffer) = &self.index_buffer {
                self.device
                    .cmd_bind_index_buffer(command_buffer, index_buffer.handle(), 0, vk::IndexType::UINT32);
            }
        }
    }

    /// Draw the whole mesh
    pub fn draw(&self, command_buffer: vk::CommandBuffer) {
        unsafe {
            if self.index_buffer.is_some() {
                self.device
                    .cmd_draw_indexed(command_buffer, self.index_count, 1, 0, 0, 0);
            } else {
                self.device.cmd_draw(command_buffer, self.vertex_count, 1, 0, 0);
            }
        }
    }
}

fn count_u32(len: usize) -> VulkanResult<u32> {
    u32::try_from(len).map_err(|_| VulkanError::InvalidOperation {
        reason: format!("{len} elements exceed the u32 draw range"),
    })
}
