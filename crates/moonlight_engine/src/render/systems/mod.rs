//! Render sub-systems
//!
//! Each system owns one graphics pipeline built against the swapchain render
//! pass and the global set layout, and records its draws from a
//! [`FrameInfo`](super::FrameInfo) inside the render pass.

pub mod grid;
pub mod point_light;
pub mod simple_render;

pub use grid::GridSystem;
pub use point_light::PointLightSystem;
pub use simple_render::SimpleRenderSystem;

use ash::vk;

use super::frame_info::FrameInfo;
use super::vulkan::VulkanBackend;

/// Bind the frame's global set at set 0 for `layout`
pub(crate) fn bind_global_set(frame: &FrameInfo<'_, VulkanBackend>, device: &ash::Device, layout: vk::PipelineLayout) {
    unsafe {
        device.cmd_bind_descriptor_sets(
            frame.command,
            vk::PipelineBindPoint::GRAPHICS,
            layout,
            0,
            &[frame.global_descriptor_set],
            &[],
        );
    }
}

/// Record `data` as the push constant block for `layout`
pub(crate) fn push_constants<T: bytemuck::Pod>(
    device: &ash::Device,
    command: vk::CommandBuffer,
    layout: vk::PipelineLayout,
    stages: vk::ShaderStageFlags,
    data: &T,
) {
    unsafe {
        device.cmd_push_constants(command, layout, stages, 0, bytemuck::bytes_of(data));
    }
}
