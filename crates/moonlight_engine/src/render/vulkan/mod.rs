//! Vulkan backend
//!
//! RAII wrappers over `ash` objects plus [`VulkanBackend`], the
//! [`RenderBackend`](super::RenderBackend) the engine drives on real
//! hardware. Every wrapper holds a clone of the `ash::Device` it was created
//! from and destroys its handle on drop.

pub mod backend;
pub mod buffer;
pub mod commands;
pub mod context;
pub mod descriptor_set;
pub mod framebuffer;
pub mod model;
pub mod render_pass;
pub mod shader;
pub mod swapchain;
pub mod sync;
pub mod vertex_layout;
pub mod window;

pub use backend::VulkanBackend;
pub use buffer::Buffer;
pub use commands::CommandPool;
pub use context::{LogicalDevice, PhysicalDeviceInfo, VulkanContext, VulkanInstance};
pub use descriptor_set::{DescriptorPool, DescriptorSetLayout, DescriptorSetLayoutBuilder};
pub use framebuffer::{DepthBuffer, Framebuffer};
pub use model::GpuMesh;
pub use render_pass::RenderPass;
pub use shader::{GraphicsPipeline, PipelineConfig, ShaderModule};
pub use swapchain::Swapchain;
pub use sync::{Fence, FrameSync, Semaphore};
pub use vertex_layout::VulkanVertexLayout;
pub use window::{GlfwWindow, WindowError};

use ash::vk;
use thiserror::Error;

/// Vulkan-specific error types
#[derive(Error, Debug)]
pub enum VulkanError {
    /// General Vulkan API error with result code
    #[error("Vulkan API error: {0:?}")]
    Api(vk::Result),

    /// Invalid operation attempted
    #[error("Invalid operation: {reason}")]
    InvalidOperation {
        /// Description of why the operation is invalid
        reason: String,
    },

    /// Vulkan context initialization failed
    #[error("Initialization failed: {0}")]
    InitializationFailed(String),

    /// No suitable memory type found for allocation
    #[error("No suitable memory type found")]
    NoSuitableMemoryType,

    /// Window system failure
    #[error("Window error: {0}")]
    Window(#[from] WindowError),
}

/// Result type for Vulkan operations
pub type VulkanResult<T> = Result<T, VulkanError>;
