//! Backend abstraction for the frame orchestrator
//!
//! The [`Renderer`](super::Renderer) drives a frame through these calls in a
//! fixed order. Every per-frame resource is addressed by `slot`, the
//! frame-in-flight index in `0..frames_in_flight()`, so a backend can keep
//! one fence, command buffer, uniform buffer and descriptor pool per slot
//! and never share them between frames the GPU may still be reading.

use std::fmt;

use super::frame_info::GlobalUbo;
use super::RenderResult;

/// Framebuffer size in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Extent2D {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Extent2D {
    /// Create an extent
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Whether either side is zero (minimized window)
    pub fn is_zero(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Width over height; 1.0 for a degenerate extent
    pub fn aspect_ratio(&self) -> f32 {
        if self.is_zero() {
            1.0
        } else {
            #[allow(clippy::cast_precision_loss)]
            let ratio = self.width as f32 / self.height as f32;
            ratio
        }
    }
}

/// Outcome of acquiring the next presentable image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireResult {
    /// An image is ready for rendering
    Acquired {
        /// Swapchain image to render into
        image_index: u32,
        /// The swapchain still works but no longer matches the surface
        suboptimal: bool,
    },
    /// The swapchain no longer matches the surface and must be rebuilt
    OutOfDate,
    /// No image became available within the timeout
    Timeout,
}

/// Outcome of submitting and presenting a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentResult {
    /// Presented normally
    Presented,
    /// Presented, but the swapchain should be rebuilt
    Suboptimal,
    /// Not presented; the swapchain must be rebuilt
    OutOfDate,
}

/// A descriptor pool that is reset wholesale once per frame cycle
pub trait DescriptorAllocator {
    /// Layout handle sets are allocated against
    type Layout: Copy;
    /// Allocated set handle
    type Set: Copy + fmt::Debug;

    /// Free every set allocated since the last reset
    fn reset(&mut self) -> RenderResult<()>;

    /// Allocate one set with `layout`
    fn allocate(&mut self, layout: Self::Layout) -> RenderResult<Self::Set>;
}

/// Descriptor set handle produced by a backend's frame pools
pub type DescriptorSetOf<B> = <<B as RenderBackend>::FramePool as DescriptorAllocator>::Set;

/// GPU backend driven by the frame orchestrator
pub trait RenderBackend {
    /// Command buffer handle
    type Command: Copy + PartialEq + fmt::Debug;
    /// Per-slot descriptor pool
    type FramePool: DescriptorAllocator;

    /// Number of frame slots the backend keeps resources for
    fn frames_in_flight(&self) -> usize;

    /// Create the descriptor pool for `slot`
    fn create_frame_pool(&mut self, slot: usize) -> RenderResult<Self::FramePool>;

    /// Layout of the global (camera and lights) descriptor set
    fn global_set_layout(&self) -> <Self::FramePool as DescriptorAllocator>::Layout;

    /// Current swapchain extent
    fn extent(&self) -> Extent2D;

    /// Number of swapchain images
    fn image_count(&self) -> usize;

    /// Block until the GPU has finished the last submission from `slot`
    ///
    /// Returns `false` if the configured timeout elapsed first.
    fn wait_for_frame(&mut self, slot: usize) -> RenderResult<bool>;

    /// Acquire the next swapchain image for `slot`
    fn acquire_next_image(&mut self, slot: usize) -> RenderResult<AcquireResult>;

    /// Reset and begin `slot`'s command buffer
    fn begin_command_buffer(&mut self, slot: usize) -> RenderResult<Self::Command>;

    /// Begin the swapchain render pass targeting `image_index`
    fn begin_render_pass(&mut self, command: Self::Command, image_index: u32, clear_color: [f32; 4]) -> RenderResult<()>;

    /// End the swapchain render pass
    fn end_render_pass(&mut self, command: Self::Command) -> RenderResult<()>;

    /// Write and flush `slot`'s global uniform buffer
    fn write_global_uniforms(&mut self, slot: usize, ubo: &GlobalUbo) -> RenderResult<()>;

    /// Point `set` at `slot`'s global uniform buffer
    fn bind_global_uniforms(
        &mut self,
        slot: usize,
        set: <Self::FramePool as DescriptorAllocator>::Set,
    ) -> RenderResult<()>;

    /// End the command buffer, submit it signalling `slot`'s fence, present
    fn submit_and_present(&mut self, slot: usize, command: Self::Command, image_index: u32) -> RenderResult<PresentResult>;

    /// Rebuild the swapchain and everything sized to it
    fn recreate_swapchain(&mut self, extent: Extent2D) -> RenderResult<()>;

    /// Block until the device has no work in flight
    fn wait_idle(&mut self) -> RenderResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_extent_aspect_ratio() {
        assert_relative_eq!(Extent2D::new(800, 600).aspect_ratio(), 800.0 / 600.0);
        assert_relative_eq!(Extent2D::new(0, 600).aspect_ratio(), 1.0);
        assert!(Extent2D::new(800, 0).is_zero());
    }
}
