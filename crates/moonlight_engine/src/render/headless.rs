//! In-memory backend and window
//!
//! `HeadlessBackend` keeps the same per-slot bookkeeping a GPU backend does
//! (fence state, command buffer, uniform buffer, descriptor pool) without a
//! device. It rejects the orderings a real driver would punish, such as
//! reusing a slot whose fence was never waited on or rebuilding the
//! swapchain with work still in flight, so the [`Renderer`](super::Renderer)
//! can be exercised without a GPU.

use std::collections::HashSet;

use super::backend::{AcquireResult, DescriptorAllocator, Extent2D, PresentResult, RenderBackend};
use super::frame_info::GlobalUbo;
use super::window::Window;
use super::{RenderError, RenderResult};
use crate::input::{InputState, KeyCode, MouseButton};

const DEFAULT_POOL_CAPACITY: usize = 16;

/// Command buffer handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadlessCommand {
    slot: usize,
    generation: u64,
}

/// Descriptor set layout handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadlessLayout(pub u32);

/// Descriptor set handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadlessSet {
    /// Slot whose pool produced the set
    pub slot: usize,
    /// Position in the pool since its last reset
    pub index: usize,
}

/// Fixed-capacity descriptor pool
#[derive(Debug)]
pub struct HeadlessFramePool {
    slot: usize,
    capacity: usize,
    allocated: usize,
}

impl DescriptorAllocator for HeadlessFramePool {
    type Layout = HeadlessLayout;
    type Set = HeadlessSet;

    fn reset(&mut self) -> RenderResult<()> {
        self.allocated = 0;
        Ok(())
    }

    fn allocate(&mut self, _layout: HeadlessLayout) -> RenderResult<HeadlessSet> {
        if self.allocated >= self.capacity {
            return Err(RenderError::PoolExhausted { slot: self.slot });
        }
        let set = HeadlessSet {
            slot: self.slot,
            index: self.allocated,
        };
        self.allocated += 1;
        Ok(set)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FenceState {
    Signaled,
    Pending,
}

#[derive(Debug)]
struct Slot {
    fence: FenceState,
    recording: Option<HeadlessCommand>,
    in_render_pass: bool,
    uniforms: Option<GlobalUbo>,
    bound_set: Option<HeadlessSet>,
}

/// Backend that records frame bookkeeping in memory
#[derive(Debug)]
pub struct HeadlessBackend {
    slots: Vec<Slot>,
    image_count: u32,
    next_image: u32,
    extent: Extent2D,
    pool_capacity: usize,
    generation: u64,
    fail_next_acquire: bool,
    stall_next_wait: bool,
    suboptimal_present: bool,
    fence_waits: u64,
    submissions: u64,
    rebuilds: u64,
    wait_idle_calls: u64,
    max_pending: usize,
}

impl HeadlessBackend {
    /// Backend with `frames_in_flight` slots and `image_count` swapchain images
    pub fn new(frames_in_flight: usize, image_count: u32, extent: Extent2D) -> Self {
        let slots = (0..frames_in_flight)
            .map(|_| Slot {
                fence: FenceState::Signaled,
                recording: None,
                in_render_pass: false,
                uniforms: None,
                bound_set: None,
            })
            .collect();

        Self {
            slots,
            image_count: image_count.max(1),
            next_image: 0,
            extent,
            pool_capacity: DEFAULT_POOL_CAPACITY,
            generation: 0,
            fail_next_acquire: false,
            stall_next_wait: false,
            suboptimal_present: false,
            fence_waits: 0,
            submissions: 0,
            rebuilds: 0,
            wait_idle_calls: 0,
            max_pending: 0,
        }
    }

    /// Limit every frame pool to `capacity` sets
    pub fn with_pool_capacity(mut self, capacity: usize) -> Self {
        self.pool_capacity = capacity;
        self
    }

    /// Report the swapchain out of date on the next acquire
    pub fn fail_next_acquire(&mut self) {
        self.fail_next_acquire = true;
    }

    /// Time out the next fence wait
    pub fn stall_next_wait(&mut self) {
        self.stall_next_wait = true;
    }

    /// Report the next present as suboptimal
    pub fn report_suboptimal_present(&mut self) {
        self.suboptimal_present = true;
    }

    /// A command handle no slot will ever hand out
    pub fn foreign_command() -> HeadlessCommand {
        HeadlessCommand {
            slot: usize::MAX,
            generation: 0,
        }
    }

    /// Fence waits performed
    pub fn fence_waits(&self) -> u64 {
        self.fence_waits
    }

    /// Frames submitted
    pub fn submissions(&self) -> u64 {
        self.submissions
    }

    /// Swapchain rebuilds performed
    pub fn rebuilds(&self) -> u64 {
        self.rebuilds
    }

    /// Device drains performed
    pub fn wait_idle_calls(&self) -> u64 {
        self.wait_idle_calls
    }

    /// Most slots ever pending at once
    pub fn max_frames_pending(&self) -> usize {
        self.max_pending
    }

    /// Last uniforms written to `slot`
    pub fn uniforms(&self, slot: usize) -> Option<&GlobalUbo> {
        self.slots.get(slot).and_then(|s| s.uniforms.as_ref())
    }

    /// Set last bound to `slot`'s uniform buffer
    pub fn bound_set(&self, slot: usize) -> Option<HeadlessSet> {
        self.slots.get(slot).and_then(|s| s.bound_set)
    }

    fn slot(&self, slot: usize) -> RenderResult<&Slot> {
        self.slots
            .get(slot)
            .ok_or_else(|| RenderError::invalid_state(format!("frame slot {slot} out of range")))
    }

    fn slot_mut(&mut self, slot: usize) -> RenderResult<&mut Slot> {
        self.slots
            .get_mut(slot)
            .ok_or_else(|| RenderError::invalid_state(format!("frame slot {slot} out of range")))
    }

    fn recording_slot(&mut self, command: HeadlessCommand) -> RenderResult<&mut Slot> {
        let slot = self.slot_mut(command.slot)?;
        if slot.recording != Some(command) {
            return Err(RenderError::invalid_state(format!("{command:?} is not recording")));
        }
        Ok(slot)
    }

    fn pending_count(&self) -> usize {
        self.slots.iter().filter(|s| s.fence == FenceState::Pending).count()
    }
}

impl RenderBackend for HeadlessBackend {
    type Command = HeadlessCommand;
    type FramePool = HeadlessFramePool;

    fn frames_in_flight(&self) -> usize {
        self.slots.len()
    }

    fn create_frame_pool(&mut self, slot: usize) -> RenderResult<HeadlessFramePool> {
        self.slot(slot)?;
        Ok(HeadlessFramePool {
            slot,
            capacity: self.pool_capacity,
            allocated: 0,
        })
    }

    fn global_set_layout(&self) -> HeadlessLayout {
        HeadlessLayout(0)
    }

    fn extent(&self) -> Extent2D {
        self.extent
    }

    fn image_count(&self) -> usize {
        self.image_count as usize
    }

    fn wait_for_frame(&mut self, slot: usize) -> RenderResult<bool> {
        if std::mem::take(&mut self.stall_next_wait) {
            return Ok(false);
        }
        self.slot_mut(slot)?.fence = FenceState::Signaled;
        self.fence_waits += 1;
        Ok(true)
    }

    fn acquire_next_image(&mut self, slot: usize) -> RenderResult<AcquireResult> {
        if self.slot(slot)?.fence == FenceState::Pending {
            return Err(RenderError::invalid_state(format!(
                "acquire on slot {slot} before its fence was waited on"
            )));
        }
        if std::mem::take(&mut self.fail_next_acquire) {
            return Ok(AcquireResult::OutOfDate);
        }
        let image_index = self.next_image;
        self.next_image = (self.next_image + 1) % self.image_count;
        Ok(AcquireResult::Acquired {
            image_index,
            suboptimal: false,
        })
    }

    fn begin_command_buffer(&mut self, slot: usize) -> RenderResult<HeadlessCommand> {
        self.generation += 1;
        let command = HeadlessCommand {
            slot,
            generation: self.generation,
        };
        let state = self.slot_mut(slot)?;
        if state.fence == FenceState::Pending {
            return Err(RenderError::invalid_state(format!(
                "command buffer of slot {slot} reset while the GPU may use it"
            )));
        }
        state.recording = Some(command);
        state.in_render_pass = false;
        Ok(command)
    }

    fn begin_render_pass(&mut self, command: HeadlessCommand, image_index: u32, _clear_color: [f32; 4]) -> RenderResult<()> {
        if image_index >= self.image_count {
            return Err(RenderError::invalid_state(format!("image index {image_index} out of range")));
        }
        let slot = self.recording_slot(command)?;
        if slot.in_render_pass {
            return Err(RenderError::invalid_state("render pass already begun"));
        }
        slot.in_render_pass = true;
        Ok(())
    }

    fn end_render_pass(&mut self, command: HeadlessCommand) -> RenderResult<()> {
        let slot = self.recording_slot(command)?;
        if !slot.in_render_pass {
            return Err(RenderError::invalid_state("no render pass to end"));
        }
        slot.in_render_pass = false;
        Ok(())
    }

    fn write_global_uniforms(&mut self, slot: usize, ubo: &GlobalUbo) -> RenderResult<()> {
        self.slot_mut(slot)?.uniforms = Some(*ubo);
        Ok(())
    }

    fn bind_global_uniforms(&mut self, slot: usize, set: HeadlessSet) -> RenderResult<()> {
        if set.slot != slot {
            return Err(RenderError::invalid_state(format!(
                "set from slot {} bound to slot {slot}",
                set.slot
            )));
        }
        self.slot_mut(slot)?.bound_set = Some(set);
        Ok(())
    }

    fn submit_and_present(&mut self, slot: usize, command: HeadlessCommand, _image_index: u32) -> RenderResult<PresentResult> {
        let state = self.recording_slot(command)?;
        if state.in_render_pass {
            return Err(RenderError::invalid_state("submitted inside a render pass"));
        }
        if command.slot != slot {
            return Err(RenderError::invalid_state(format!(
                "command from slot {} submitted on slot {slot}",
                command.slot
            )));
        }
        state.recording = None;
        state.fence = FenceState::Pending;

        self.submissions += 1;
        self.max_pending = self.max_pending.max(self.pending_count());

        if std::mem::take(&mut self.suboptimal_present) {
            Ok(PresentResult::Suboptimal)
        } else {
            Ok(PresentResult::Presented)
        }
    }

    fn recreate_swapchain(&mut self, extent: Extent2D) -> RenderResult<()> {
        if self.pending_count() > 0 {
            return Err(RenderError::invalid_state("swapchain rebuilt with frames in flight"));
        }
        if extent.is_zero() {
            return Err(RenderError::invalid_state("swapchain rebuilt with a zero extent"));
        }
        self.extent = extent;
        self.next_image = 0;
        self.rebuilds += 1;
        Ok(())
    }

    fn wait_idle(&mut self) -> RenderResult<()> {
        for slot in &mut self.slots {
            slot.fence = FenceState::Signaled;
        }
        self.wait_idle_calls += 1;
        Ok(())
    }
}

/// Scriptable window with keyboard and mouse state
#[derive(Debug, Default)]
pub struct HeadlessWindow {
    extent: Extent2D,
    resized: bool,
    should_close: bool,
    close_after_polls: Option<u64>,
    polls: u64,
    minimized_waits: u32,
    restore_extent: Extent2D,
    wait_event_calls: u32,
    keys: HashSet<KeyCode>,
    buttons: HashSet<MouseButton>,
    cursor: (f64, f64),
    cursor_captured: bool,
}

impl HeadlessWindow {
    /// Window with a framebuffer of `extent`
    pub fn new(extent: Extent2D) -> Self {
        Self {
            extent,
            ..Self::default()
        }
    }

    /// Request close after `polls` event polls
    pub fn close_after(mut self, polls: u64) -> Self {
        self.close_after_polls = Some(polls);
        self
    }

    /// Resize the framebuffer and raise the resize flag
    pub fn resize(&mut self, extent: Extent2D) {
        self.extent = extent;
        self.resized = true;
    }

    /// Minimize; the framebuffer returns as `restored` after `waits` event waits
    pub fn minimize_for(&mut self, waits: u32, restored: Extent2D) {
        self.extent = Extent2D::default();
        self.minimized_waits = waits;
        self.restore_extent = restored;
        self.resized = true;
    }

    /// Number of blocking event waits
    pub fn wait_event_calls(&self) -> u32 {
        self.wait_event_calls
    }

    /// Number of event polls
    pub fn polls(&self) -> u64 {
        self.polls
    }

    /// Hold `key` down
    pub fn press(&mut self, key: KeyCode) {
        self.keys.insert(key);
    }

    /// Release `key`
    pub fn release(&mut self, key: KeyCode) {
        self.keys.remove(&key);
    }

    /// Hold `button` down
    pub fn press_button(&mut self, button: MouseButton) {
        self.buttons.insert(button);
    }

    /// Move the cursor
    pub fn set_cursor(&mut self, x: f64, y: f64) {
        self.cursor = (x, y);
    }

    /// Whether the cursor is captured
    pub fn cursor_captured(&self) -> bool {
        self.cursor_captured
    }
}

impl Window for HeadlessWindow {
    fn should_close(&self) -> bool {
        self.should_close
    }

    fn set_should_close(&mut self, close: bool) {
        self.should_close = close;
    }

    fn poll_events(&mut self) {
        self.polls += 1;
        if self.close_after_polls.is_some_and(|limit| self.polls >= limit) {
            self.should_close = true;
        }
    }

    fn wait_events(&mut self) {
        self.wait_event_calls += 1;
        if self.minimized_waits > 0 {
            self.minimized_waits -= 1;
            if self.minimized_waits == 0 {
                self.extent = self.restore_extent;
            }
        }
    }

    fn framebuffer_extent(&self) -> Extent2D {
        self.extent
    }

    fn was_resized(&self) -> bool {
        self.resized
    }

    fn reset_resized_flag(&mut self) {
        self.resized = false;
    }
}

impl InputState for HeadlessWindow {
    fn is_key_pressed(&self, key: KeyCode) -> bool {
        self.keys.contains(&key)
    }

    fn is_mouse_button_pressed(&self, button: MouseButton) -> bool {
        self.buttons.contains(&button)
    }

    fn cursor_position(&self) -> (f64, f64) {
        self.cursor
    }

    fn set_cursor_captured(&mut self, captured: bool) {
        self.cursor_captured = captured;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_slot_rejects_reuse() {
        let mut backend = HeadlessBackend::new(1, 2, Extent2D::new(10, 10));
        assert!(backend.wait_for_frame(0).expect("wait"));
        let command = backend.begin_command_buffer(0).expect("begin");
        backend.submit_and_present(0, command, 0).expect("submit");

        assert!(backend.acquire_next_image(0).is_err());
        assert!(backend.begin_command_buffer(0).is_err());
        assert!(backend.recreate_swapchain(Extent2D::new(20, 20)).is_err());

        backend.wait_idle().expect("idle");
        backend.recreate_swapchain(Extent2D::new(20, 20)).expect("rebuild");
        assert_eq!(backend.extent(), Extent2D::new(20, 20));
    }

    #[test]
    fn test_pool_capacity() {
        let mut backend = HeadlessBackend::new(2, 2, Extent2D::new(10, 10)).with_pool_capacity(1);
        let mut pool = backend.create_frame_pool(1).expect("pool");
        let layout = backend.global_set_layout();
        assert_eq!(pool.allocate(layout).expect("set"), HeadlessSet { slot: 1, index: 0 });
        assert!(matches!(pool.allocate(layout), Err(RenderError::PoolExhausted { slot: 1 })));
        pool.reset().expect("reset");
        assert!(pool.allocate(layout).is_ok());
    }

    #[test]
    fn test_images_rotate() {
        let mut backend = HeadlessBackend::new(1, 3, Extent2D::new(10, 10));
        let images: Vec<_> = (0..4)
            .map(|_| match backend.acquire_next_image(0).expect("acquire") {
                AcquireResult::Acquired { image_index, .. } => image_index,
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(images, vec![0, 1, 2, 0]);
    }

    #[test]
    fn test_window_closes_after_polls() {
        let mut window = HeadlessWindow::new(Extent2D::new(10, 10)).close_after(2);
        window.poll_events();
        assert!(!window.should_close());
        window.poll_events();
        assert!(window.should_close());
    }
}
