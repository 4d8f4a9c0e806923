//! Vulkan implementation of the frame backend
//!
//! Each frame slot owns a [`FrameSync`], a primary command buffer and a
//! persistently mapped uniform buffer. Each swapchain image owns a depth
//! buffer and a framebuffer; those are rebuilt with the swapchain.

use std::sync::Arc;

use ash::vk;

use super::buffer::Buffer;
use super::commands::{self, CommandPool};
use super::context::VulkanContext;
use super::descriptor_set::{self, DescriptorPool, DescriptorSetLayout, DescriptorSetLayoutBuilder, FRAME_POOL_MAX_SETS};
use super::framebuffer::{DepthBuffer, Framebuffer};
use super::render_pass::RenderPass;
use super::swapchain::Swapchain;
use super::sync::FrameSync;
use super::{VulkanError, VulkanResult};
use crate::render::backend::{AcquireResult, Extent2D, PresentResult, RenderBackend};
use crate::render::frame_info::GlobalUbo;
use crate::render::renderer::RendererConfig;
use crate::render::RenderResult;

struct FrameResources {
    sync: FrameSync,
    command_buffer: vk::CommandBuffer,
    uniforms: Buffer,
}

/// [`RenderBackend`] over a Vulkan device and GLFW surface
pub struct VulkanBackend {
    frames: Vec<FrameResources>,
    framebuffers: Vec<Framebuffer>,
    depth_buffers: Vec<DepthBuffer>,
    swapchain: Swapchain,
    render_pass: RenderPass,
    global_set_layout: DescriptorSetLayout,
    command_pool: CommandPool,
    acquire_timeout_ns: u64,
    prefer_mailbox: bool,
    context: Arc<VulkanContext>,
}

impl VulkanBackend {
    /// Create the swapchain and per-slot resources for `config.max_frames_in_flight` slots
    pub fn new(context: Arc<VulkanContext>, extent: Extent2D, config: &RendererConfig) -> VulkanResult<Self> {
        let device = context.device().clone();

        let swapchain = Swapchain::new(&context, to_vk_extent(extent), config.prefer_mailbox, None)?;
        let render_pass = RenderPass::new_forward_pass(device.clone(), swapchain.format().format)?;
        let (depth_buffers, framebuffers) = create_attachments(&context, &swapchain, &render_pass)?;

        let global_set_layout = DescriptorSetLayoutBuilder::new()
            .add_uniform_buffer(0, vk::ShaderStageFlags::ALL_GRAPHICS)
            .build(&device)?;

        let command_pool = CommandPool::new(device.clone(), context.graphics_queue_family())?;
        let slot_count = u32::try_from(config.max_frames_in_flight).map_err(|_| VulkanError::InvalidOperation {
            reason: "too many frames in flight".to_string(),
        })?;
        let command_buffers = command_pool.allocate_command_buffers(slot_count)?;

        let ubo_size = std::mem::size_of::<GlobalUbo>() as vk::DeviceSize;
        let frames = command_buffers
            .into_iter()
            .map(|command_buffer| {
                let mut uniforms = Buffer::new(
                    &context,
                    ubo_size,
                    vk::BufferUsageFlags::UNIFORM_BUFFER,
                    vk::MemoryPropertyFlags::HOST_VISIBLE,
                )?;
                uniforms.map()?;
                Ok(FrameResources {
                    sync: FrameSync::new(&device)?,
                    command_buffer,
                    uniforms,
                })
            })
            .collect::<VulkanResult<Vec<_>>>()?;

        log::info!(
            "Vulkan backend ready: {} frame slots, {} swapchain images",
            frames.len(),
            swapchain.image_count()
        );

        Ok(Self {
            frames,
            framebuffers,
            depth_buffers,
            swapchain,
            render_pass,
            global_set_layout,
            command_pool,
            acquire_timeout_ns: config.acquire_timeout_ns,
            prefer_mailbox: config.prefer_mailbox,
            context,
        })
    }

    /// Shared device context
    pub fn context(&self) -> &Arc<VulkanContext> {
        &self.context
    }

    /// Swapchain render pass, for pipeline creation
    pub fn render_pass(&self) -> vk::RenderPass {
        self.render_pass.handle()
    }

    /// Global set layout handle, for pipeline layouts
    pub fn global_layout(&self) -> vk::DescriptorSetLayout {
        self.global_set_layout.handle()
    }

    fn frame(&self, slot: usize) -> VulkanResult<&FrameResources> {
        self.frames.get(slot).ok_or_else(|| VulkanError::InvalidOperation {
            reason: format!("frame slot {slot} out of range"),
        })
    }

    fn frame_mut(&mut self, slot: usize) -> VulkanResult<&mut FrameResources> {
        self.frames.get_mut(slot).ok_or_else(|| VulkanError::InvalidOperation {
            reason: format!("frame slot {slot} out of range"),
        })
    }
}

impl RenderBackend for VulkanBackend {
    type Command = vk::CommandBuffer;
    type FramePool = DescriptorPool;

    fn frames_in_flight(&self) -> usize {
        self.frames.len()
    }

    fn create_frame_pool(&mut self, slot: usize) -> RenderResult<DescriptorPool> {
        Ok(DescriptorPool::new(self.context.device().clone(), slot, FRAME_POOL_MAX_SETS)?)
    }

    fn global_set_layout(&self) -> vk::DescriptorSetLayout {
        self.global_set_layout.handle()
    }

    fn extent(&self) -> Extent2D {
        let extent = self.swapchain.extent();
        Extent2D::new(extent.width, extent.height)
    }

    fn image_count(&self) -> usize {
        self.swapchain.image_count()
    }

    fn wait_for_frame(&mut self, slot: usize) -> RenderResult<bool> {
        Ok(self.frame(slot)?.sync.in_flight.wait(self.acquire_timeout_ns)?)
    }

    fn acquire_next_image(&mut self, slot: usize) -> RenderResult<AcquireResult> {
        let semaphore = self.frame(slot)?.sync.image_available.handle();
        let result = unsafe {
            self.context.swapchain_loader().acquire_next_image(
                self.swapchain.handle(),
                self.acquire_timeout_ns,
                semaphore,
                vk::Fence::null(),
            )
        };

        match result {
            Ok((image_index, suboptimal)) => Ok(AcquireResult::Acquired {
                image_index,
                suboptimal,
            }),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(AcquireResult::OutOfDate),
            Err(vk::Result::TIMEOUT | vk::Result::NOT_READY) => Ok(AcquireResult::Timeout),
            Err(e) => Err(VulkanError::Api(e).into()),
        }
    }

    fn begin_command_buffer(&mut self, slot: usize) -> RenderResult<vk::CommandBuffer> {
        let command_buffer = self.frame(slot)?.command_buffer;
        commands::begin_one_time(self.context.device(), command_buffer)?;
        Ok(command_buffer)
    }

    fn begin_render_pass(&mut self, command: vk::CommandBuffer, image_index: u32, clear_color: [f32; 4]) -> RenderResult<()> {
        let framebuffer = self
            .framebuffers
            .get(image_index as usize)
            .ok_or_else(|| VulkanError::InvalidOperation {
                reason: format!("no framebuffer for swapchain image {image_index}"),
            })?;

        commands::begin_render_pass(
            self.context.device(),
            command,
            self.render_pass.handle(),
            framebuffer.handle(),
            self.swapchain.extent(),
            clear_color,
        );
        Ok(())
    }

    fn end_render_pass(&mut self, command: vk::CommandBuffer) -> RenderResult<()> {
        unsafe { self.context.device().cmd_end_render_pass(command) };
        Ok(())
    }

    fn write_global_uniforms(&mut self, slot: usize, ubo: &GlobalUbo) -> RenderResult<()> {
        let uniforms = &mut self.frame_mut(slot)?.uniforms;
        uniforms.write_bytes(ubo.as_bytes())?;
        uniforms.flush()?;
        Ok(())
    }

    fn bind_global_uniforms(&mut self, slot: usize, set: vk::DescriptorSet) -> RenderResult<()> {
        let buffer = self.frame(slot)?.uniforms.handle();
        descriptor_set::write_uniform_buffer(self.context.device(), set, 0, buffer);
        Ok(())
    }

    fn submit_and_present(&mut self, slot: usize, command: vk::CommandBuffer, image_index: u32) -> RenderResult<PresentResult> {
        let device = self.context.device();
        let frame = self.frame(slot)?;

        unsafe { device.end_command_buffer(command).map_err(VulkanError::Api)? };

        let wait_semaphores = [frame.sync.image_available.handle()];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let signal_semaphores = [frame.sync.render_finished.handle()];
        let command_buffers = [command];
        let submit_info = vk::SubmitInfo::builder()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores)
            .build();

        // Reset only once a submission is certain to signal it again
        frame.sync.in_flight.reset()?;
        unsafe {
            device
                .queue_submit(self.context.graphics_queue(), &[submit_info], frame.sync.in_flight.handle())
                .map_err(VulkanError::Api)?;
        }

        let swapchains = [self.swapchain.handle()];
        let image_indices = [image_index];
        let present_info = vk::PresentInfoKHR::builder()
            .wait_semaphores(&signal_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        let result = unsafe {
            self.context
                .swapchain_loader()
                .queue_present(self.context.present_queue(), &present_info)
        };

        match result {
            Ok(false) => Ok(PresentResult::Presented),
            Ok(true) => Ok(PresentResult::Suboptimal),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(PresentResult::OutOfDate),
            Err(e) => Err(VulkanError::Api(e).into()),
        }
    }

    fn recreate_swapchain(&mut self, extent: Extent2D) -> RenderResult<()> {
        self.framebuffers.clear();
        self.depth_buffers.clear();

        let swapchain = Swapchain::new(&self.context, to_vk_extent(extent), self.prefer_mailbox, Some(&self.swapchain))?;
        let old = std::mem::replace(&mut self.swapchain, swapchain);
        if !old.compatible_with(&self.swapchain) {
            return Err(VulkanError::InvalidOperation {
                reason: "swapchain image format changed".to_string(),
            }
            .into());
        }
        drop(old);

        let (depth_buffers, framebuffers) = create_attachments(&self.context, &self.swapchain, &self.render_pass)?;
        self.depth_buffers = depth_buffers;
        self.framebuffers = framebuffers;
        Ok(())
    }

    fn wait_idle(&mut self) -> RenderResult<()> {
        Ok(self.context.wait_idle()?)
    }
}

impl Drop for VulkanBackend {
    fn drop(&mut self) {
        if let Err(e) = self.context.wait_idle() {
            log::error!("Device wait failed while destroying the Vulkan backend: {e}");
        }
    }
}

fn create_attachments(
    context: &VulkanContext,
    swapchain: &Swapchain,
    render_pass: &RenderPass,
) -> VulkanResult<(Vec<DepthBuffer>, Vec<Framebuffer>)> {
    let extent = swapchain.extent();
    let mut depth_buffers = Vec::with_capacity(swapchain.image_count());
    let mut framebuffers = Vec::with_capacity(swapchain.image_count());

    for &color_view in swapchain.image_views() {
        let depth = DepthBuffer::new(context, extent)?;
        let attachments = [color_view, depth.image_view()];
        framebuffers.push(Framebuffer::new(
            context.device().clone(),
            render_pass.handle(),
            &attachments,
            extent,
        )?);
        depth_buffers.push(depth);
    }

    Ok((depth_buffers, framebuffers))
}

fn to_vk_extent(extent: Extent2D) -> vk::Extent2D {
    vk::Extent2D {
        width: extent.width,
        height: extent.height,
    }
}
