//! Window abstraction consumed by the renderer and engine loop

use super::backend::Extent2D;

/// Minimal window interface: lifecycle, events and framebuffer size
pub trait Window {
    /// Whether the user asked to close the window
    fn should_close(&self) -> bool;

    /// Request (or cancel) closing the window
    fn set_should_close(&mut self, close: bool);

    /// Process pending events without blocking
    fn poll_events(&mut self);

    /// Block until at least one event arrives
    fn wait_events(&mut self);

    /// Framebuffer size in pixels; zero while minimized
    fn framebuffer_extent(&self) -> Extent2D;

    /// Whether the framebuffer was resized since the flag was last reset
    fn was_resized(&self) -> bool;

    /// Clear the resize flag after the swapchain has been rebuilt
    fn reset_resized_flag(&mut self);
}
