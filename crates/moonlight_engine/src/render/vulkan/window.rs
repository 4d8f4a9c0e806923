//! Window management using GLFW
//!
//! Provides window creation, event handling and surface creation for Vulkan

use ash::vk;
use thiserror::Error;

use crate::input::{InputState, KeyCode, MouseButton};
use crate::render::backend::Extent2D;
use crate::render::window::Window;

/// Window management errors
#[derive(Error, Debug)]
pub enum WindowError {
    /// GLFW could not be initialized
    #[error("GLFW initialization failed")]
    InitializationFailed,

    /// GLFW could not create the window
    #[error("Window creation failed")]
    CreationFailed,

    /// GLFW reported an error
    #[error("GLFW error: {0}")]
    GlfwError(String),
}

/// Result type for window operations
pub type WindowResult<T> = Result<T, WindowError>;

/// GLFW window wrapper with proper resource management
pub struct GlfwWindow {
    glfw: glfw::Glfw,
    window: glfw::PWindow,
    events: glfw::GlfwReceiver<(f64, glfw::WindowEvent)>,
    framebuffer_resized: bool,
}

impl GlfwWindow {
    /// Create a window with no client API, ready for a Vulkan surface
    pub fn new(title: &str, width: u32, height: u32, resizable: bool) -> WindowResult<Self> {
        let mut glfw = glfw::init(glfw::fail_on_errors).map_err(|_| WindowError::InitializationFailed)?;

        if !glfw.vulkan_supported() {
            return Err(WindowError::GlfwError("Vulkan is not supported by GLFW".to_string()));
        }

        glfw.window_hint(glfw::WindowHint::ClientApi(glfw::ClientApiHint::NoApi));
        glfw.window_hint(glfw::WindowHint::Resizable(resizable));

        let (mut window, events) = glfw
            .create_window(width, height, title, glfw::WindowMode::Windowed)
            .ok_or(WindowError::CreationFailed)?;

        window.set_key_polling(true);
        window.set_close_polling(true);
        window.set_framebuffer_size_polling(true);

        log::info!("Created {width}x{height} window \"{title}\"");

        Ok(Self {
            glfw,
            window,
            events,
            framebuffer_resized: false,
        })
    }

    /// Get required Vulkan instance extensions from GLFW
    pub fn required_instance_extensions(&self) -> WindowResult<Vec<String>> {
        self.glfw
            .get_required_instance_extensions()
            .ok_or_else(|| WindowError::GlfwError("Failed to get required extensions".to_string()))
    }

    /// Create Vulkan surface using GLFW's built-in functionality
    pub fn create_vulkan_surface(&self, instance: vk::Instance) -> WindowResult<vk::SurfaceKHR> {
        let mut surface = vk::SurfaceKHR::null();
        let result = self.window.create_window_surface(instance, std::ptr::null(), &mut surface);

        if result == vk::Result::SUCCESS {
            Ok(surface)
        } else {
            Err(WindowError::GlfwError(format!("Failed to create Vulkan surface: {result:?}")))
        }
    }

    fn drain_events(&mut self) {
        for (_, event) in glfw::flush_messages(&self.events) {
            match event {
                glfw::WindowEvent::FramebufferSize(width, height) => {
                    log::debug!("Framebuffer resized to {width}x{height}");
                    self.framebuffer_resized = true;
                }
                glfw::WindowEvent::Close => self.window.set_should_close(true),
                _ => {}
            }
        }
    }
}

impl Window for GlfwWindow {
    fn should_close(&self) -> bool {
        self.window.should_close()
    }

    fn set_should_close(&mut self, close: bool) {
        self.window.set_should_close(close);
    }

    fn poll_events(&mut self) {
        self.glfw.poll_events();
        self.drain_events();
    }

    fn wait_events(&mut self) {
        self.glfw.wait_events();
        self.drain_events();
    }

    fn framebuffer_extent(&self) -> Extent2D {
        let (width, height) = self.window.get_framebuffer_size();
        Extent2D::new(u32::try_from(width).unwrap_or(0), u32::try_from(height).unwrap_or(0))
    }

    fn was_resized(&self) -> bool {
        self.framebuffer_resized
    }

    fn reset_resized_flag(&mut self) {
        self.framebuffer_resized = false;
    }
}

impl InputState for GlfwWindow {
    fn is_key_pressed(&self, key: KeyCode) -> bool {
        self.window.get_key(glfw_key(key)) == glfw::Action::Press
    }

    fn is_mouse_button_pressed(&self, button: MouseButton) -> bool {
        let button = match button {
            MouseButton::Left => glfw::MouseButton::Button1,
            MouseButton::Right => glfw::MouseButton::Button2,
            MouseButton::Middle => glfw::MouseButton::Button3,
        };
        self.window.get_mouse_button(button) == glfw::Action::Press
    }

    fn cursor_position(&self) -> (f64, f64) {
        self.window.get_cursor_pos()
    }

    fn set_cursor_captured(&mut self, captured: bool) {
        let mode = if captured {
            glfw::CursorMode::Disabled
        } else {
            glfw::CursorMode::Normal
        };
        if self.window.get_cursor_mode() != mode {
            self.window.set_cursor_mode(mode);
        }
    }
}

fn glfw_key(key: KeyCode) -> glfw::Key {
    match key {
        KeyCode::A => glfw::Key::A,
        KeyCode::C => glfw::Key::C,
        KeyCode::D => glfw::Key::D,
        KeyCode::E => glfw::Key::E,
        KeyCode::G => glfw::Key::G,
        KeyCode::I => glfw::Key::I,
        KeyCode::J => glfw::Key::J,
        KeyCode::K => glfw::Key::K,
        KeyCode::M => glfw::Key::M,
        KeyCode::N => glfw::Key::N,
        KeyCode::P => glfw::Key::P,
        KeyCode::Q => glfw::Key::Q,
        KeyCode::R => glfw::Key::R,
        KeyCode::S => glfw::Key::S,
        KeyCode::T => glfw::Key::T,
        KeyCode::V => glfw::Key::V,
        KeyCode::W => glfw::Key::W,
        KeyCode::Space => glfw::Key::Space,
        KeyCode::Escape => glfw::Key::Escape,
        KeyCode::LeftShift => glfw::Key::LeftShift,
        KeyCode::Equal => glfw::Key::Equal,
        KeyCode::Minus => glfw::Key::Minus,
        KeyCode::LeftBracket => glfw::Key::LeftBracket,
        KeyCode::RightBracket => glfw::Key::RightBracket,
        KeyCode::Up => glfw::Key::Up,
        KeyCode::Down => glfw::Key::Down,
        KeyCode::Left => glfw::Key::Left,
        KeyCode::Right => glfw::Key::Right,
    }
}
