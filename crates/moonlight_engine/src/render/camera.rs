//! # Camera and free-fly controller
//!
//! World space is Vulkan style: +x right, +y down, +z forward. Projections
//! map depth to `[0, 1]`. The camera owns a viewer transform that the
//! [`CameraController`] moves; [`Camera::update_view`] derives the view
//! matrix from it with the same Y-X-Z rotation order entities use.

use serde::{Deserialize, Serialize};

use crate::foundation::math::{constants, Mat4, Transform, Vec3};
use crate::input::{InputState, KeyMappings};

/// Default up vector (world -y)
pub const DEFAULT_UP: Vec3 = Vec3::new(0.0, -1.0, 0.0);

/// Pitch limit in radians (about 85 degrees)
const PITCH_LIMIT: f32 = 1.5;

/// Cursor pixels to radians
const MOUSE_SENSITIVITY: f32 = 0.001;

/// Projection, view and viewer state
#[derive(Debug, Clone)]
pub struct Camera {
    projection: Mat4,
    view: Mat4,
    inverse_view: Mat4,
    near: f32,
    far: f32,
    /// Viewer placement driven by the controller
    pub viewer: Transform,
    /// Grid cell size in world units
    pub grid_size: i32,
    /// Whether the debug grid is drawn
    pub enable_grid: bool,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            projection: Mat4::identity(),
            view: Mat4::identity(),
            inverse_view: Mat4::identity(),
            near: 0.1,
            far: 100.0,
            viewer: Transform::default(),
            grid_size: 1,
            enable_grid: false,
        }
    }
}

impl Camera {
    /// Create a camera at the origin with identity matrices
    pub fn new() -> Self {
        Self::default()
    }

    /// Orthographic projection of the given box
    pub fn set_orthographic_projection(&mut self, left: f32, right: f32, top: f32, bottom: f32, near: f32, far: f32) {
        let mut m = Mat4::identity();
        m[(0, 0)] = 2.0 / (right - left);
        m[(1, 1)] = 2.0 / (bottom - top);
        m[(2, 2)] = 1.0 / (far - near);
        m[(0, 3)] = -(right + left) / (right - left);
        m[(1, 3)] = -(bottom + top) / (bottom - top);
        m[(2, 3)] = -near / (far - near);
        self.projection = m;
        self.near = near;
        self.far = far;
    }

    /// Perspective projection with vertical field of view `fovy` (radians)
    ///
    /// A zero aspect ratio is ignored and logged, keeping the previous matrix.
    pub fn set_perspective_projection(&mut self, fovy: f32, aspect: f32, near: f32, far: f32) {
        if aspect.abs() <= f32::EPSILON {
            log::warn!("Ignoring perspective projection with aspect ratio {aspect}");
            return;
        }

        let tan_half_fovy = (fovy / 2.0).tan();
        let mut m = Mat4::zeros();
        m[(0, 0)] = 1.0 / (aspect * tan_half_fovy);
        m[(1, 1)] = 1.0 / tan_half_fovy;
        m[(2, 2)] = far / (far - near);
        m[(3, 2)] = 1.0;
        m[(2, 3)] = -(far * near) / (far - near);
        self.projection = m;
        self.near = near;
        self.far = far;
    }

    /// Look from `position` along `direction`
    pub fn set_view_direction(&mut self, position: Vec3, direction: Vec3, up: Vec3) {
        let w = direction.normalize();
        let u = w.cross(&up).normalize();
        let v = w.cross(&u);
        self.set_view_basis(position, u, v, w);
    }

    /// Look from `position` toward `target`
    pub fn set_view_target(&mut self, position: Vec3, target: Vec3, up: Vec3) {
        self.set_view_direction(position, target - position, up);
    }

    /// Place the viewer and rebuild the view from Tait-Bryan angles
    pub fn set_view_yxz(&mut self, position: Vec3, rotation: Vec3) {
        self.viewer.translation = position;
        self.viewer.rotation = rotation;
        self.update_view();
    }

    /// Rebuild the view matrix from the viewer transform
    pub fn update_view(&mut self) {
        let (s1, c1) = self.viewer.rotation.y.sin_cos();
        let (s2, c2) = self.viewer.rotation.x.sin_cos();
        let (s3, c3) = self.viewer.rotation.z.sin_cos();
        let u = Vec3::new(c1 * c3 + s1 * s2 * s3, c2 * s3, c1 * s2 * s3 - c3 * s1);
        let v = Vec3::new(c3 * s1 * s2 - c1 * s3, c2 * c3, c1 * c3 * s2 + s1 * s3);
        let w = Vec3::new(c2 * s1, -s2, c1 * c2);
        self.set_view_basis(self.viewer.translation, u, v, w);
    }

    fn set_view_basis(&mut self, position: Vec3, u: Vec3, v: Vec3, w: Vec3) {
        self.view = Mat4::new(
            u.x, u.y, u.z, -u.dot(&position),
            v.x, v.y, v.z, -v.dot(&position),
            w.x, w.y, w.z, -w.dot(&position),
            0.0, 0.0, 0.0, 1.0,
        );
        self.inverse_view = Mat4::new(
            u.x, v.x, w.x, position.x,
            u.y, v.y, w.y, position.y,
            u.z, v.z, w.z, position.z,
            0.0, 0.0, 0.0, 1.0,
        );
    }

    /// Projection matrix
    pub fn projection(&self) -> &Mat4 {
        &self.projection
    }

    /// View matrix
    pub fn view(&self) -> &Mat4 {
        &self.view
    }

    /// Inverse view matrix (camera to world)
    pub fn inverse_view(&self) -> &Mat4 {
        &self.inverse_view
    }

    /// Camera position in world space
    pub fn position(&self) -> Vec3 {
        self.inverse_view.fixed_view::<3, 1>(0, 3).into_owned()
    }

    /// Near clip distance
    pub fn near(&self) -> f32 {
        self.near
    }

    /// Far clip distance
    pub fn far(&self) -> f32 {
        self.far
    }
}

/// Controller tunables
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraControllerConfig {
    /// Key bindings
    pub keys: KeyMappings,
    /// Units per second
    pub move_speed: f32,
    /// Extra units per second while the boost key is held
    pub speed_boost: f32,
    /// Mouse look multiplier
    pub look_speed: f32,
}

impl Default for CameraControllerConfig {
    fn default() -> Self {
        Self {
            keys: KeyMappings::default(),
            move_speed: 3.0,
            speed_boost: 6.0,
            look_speed: 2.0,
        }
    }
}

/// Free-fly keyboard and mouse camera controller
#[derive(Debug, Clone)]
pub struct CameraController {
    config: CameraControllerConfig,
    previous_cursor: Option<(f64, f64)>,
}

impl Default for CameraController {
    fn default() -> Self {
        Self::new(CameraControllerConfig::default())
    }
}

impl CameraController {
    /// Create a controller
    pub fn new(config: CameraControllerConfig) -> Self {
        Self {
            config,
            previous_cursor: None,
        }
    }

    /// Tunables
    pub fn config(&self) -> &CameraControllerConfig {
        &self.config
    }

    /// Apply one frame of input to the camera's viewer and refresh its view
    ///
    /// `pure_dt` is unscaled so the camera still moves while time is paused.
    pub fn move_camera(&mut self, camera: &mut Camera, input: &mut dyn InputState, pure_dt: f32) {
        let keys = self.config.keys;
        let (x, y) = input.cursor_position();
        let (px, py) = self.previous_cursor.unwrap_or((x, y));
        self.previous_cursor = Some((x, y));

        #[allow(clippy::cast_possible_truncation)]
        let (dx, dy) = ((x - px) as f32, (y - py) as f32);

        let mut rotate = Vec3::zeros();
        if input.is_mouse_button_pressed(keys.look) {
            input.set_cursor_captured(true);
            rotate.x -= dy;
            rotate.y += dx;
        } else {
            input.set_cursor_captured(false);
        }

        if rotate.dot(&rotate) > f32::EPSILON {
            // Speed is |delta| / dt, applied over dt: the frame time cancels.
            let mouse_speed = (dx * dx + dy * dy).sqrt() * MOUSE_SENSITIVITY * self.config.look_speed;
            camera.viewer.rotation += mouse_speed * rotate.normalize();
        }

        let rotation = &mut camera.viewer.rotation;
        rotation.x = rotation.x.clamp(-PITCH_LIMIT, PITCH_LIMIT);
        rotation.y = rotation.y.rem_euclid(constants::TAU);

        let yaw = rotation.y;
        let pitch = -rotation.x;
        let forward = Vec3::new(yaw.sin() * pitch.cos(), pitch.sin(), yaw.cos() * pitch.cos());
        let right = Vec3::new(forward.z, 0.0, -forward.x);

        let mut direction = Vec3::zeros();
        let mut apply = |pressed: bool, delta: Vec3| {
            if pressed {
                direction += delta;
            }
        };
        apply(input.is_key_pressed(keys.move_forward), forward);
        apply(input.is_key_pressed(keys.move_backward), -forward);
        apply(input.is_key_pressed(keys.move_right), right);
        apply(input.is_key_pressed(keys.move_left), -right);
        apply(input.is_key_pressed(keys.move_up), DEFAULT_UP);
        apply(input.is_key_pressed(keys.move_down), -DEFAULT_UP);

        if direction.dot(&direction) > f32::EPSILON {
            let mut speed = self.config.move_speed;
            if input.is_key_pressed(keys.speed_boost) {
                speed += self.config.speed_boost;
            }
            camera.viewer.translation += speed * pure_dt * direction.normalize();
        }

        camera.update_view();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{KeyCode, MouseButton};
    use approx::assert_relative_eq;
    use std::collections::HashSet;

    #[derive(Default)]
    struct ScriptedInput {
        keys: HashSet<KeyCode>,
        look: bool,
        cursor: (f64, f64),
        captured: bool,
    }

    impl InputState for ScriptedInput {
        fn is_key_pressed(&self, key: KeyCode) -> bool {
            self.keys.contains(&key)
        }
        fn is_mouse_button_pressed(&self, button: MouseButton) -> bool {
            self.look && button == MouseButton::Right
        }
        fn cursor_position(&self) -> (f64, f64) {
            self.cursor
        }
        fn set_cursor_captured(&mut self, captured: bool) {
            self.captured = captured;
        }
    }

    #[test]
    fn test_perspective_matrix_entries() {
        let mut camera = Camera::new();
        let fovy = 50.0_f32.to_radians();
        camera.set_perspective_projection(fovy, 2.0, 0.1, 1000.0);

        let t = (fovy / 2.0).tan();
        let p = camera.projection();
        assert_relative_eq!(p[(0, 0)], 1.0 / (2.0 * t));
        assert_relative_eq!(p[(1, 1)], 1.0 / t);
        assert_relative_eq!(p[(2, 2)], 1000.0 / (1000.0 - 0.1));
        assert_relative_eq!(p[(3, 2)], 1.0);
        assert_relative_eq!(p[(2, 3)], -(1000.0 * 0.1) / (1000.0 - 0.1));
        assert_relative_eq!(camera.near(), 0.1);
        assert_relative_eq!(camera.far(), 1000.0);
    }

    #[test]
    fn test_perspective_maps_near_and_far_to_unit_depth() {
        let mut camera = Camera::new();
        camera.set_perspective_projection(1.0, 1.0, 0.5, 50.0);
        let project = |z: f32| {
            let clip = camera.projection() * nalgebra::Vector4::new(0.0, 0.0, z, 1.0);
            clip.z / clip.w
        };
        assert_relative_eq!(project(0.5), 0.0, epsilon = 1e-6);
        assert_relative_eq!(project(50.0), 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_orthographic_maps_box_to_ndc() {
        let mut camera = Camera::new();
        camera.set_orthographic_projection(-2.0, 2.0, -1.0, 1.0, 0.0, 10.0);
        let corner = camera.projection() * nalgebra::Vector4::new(2.0, 1.0, 10.0, 1.0);
        assert_relative_eq!(corner.x, 1.0);
        assert_relative_eq!(corner.y, 1.0);
        assert_relative_eq!(corner.z, 1.0);
    }

    #[test]
    fn test_view_and_inverse_view_are_inverses() {
        let mut camera = Camera::new();
        camera.set_view_target(Vec3::new(1.0, -2.0, -5.0), Vec3::zeros(), DEFAULT_UP);
        assert_relative_eq!(camera.view() * camera.inverse_view(), Mat4::identity(), epsilon = 1e-5);
        assert_relative_eq!(camera.position(), Vec3::new(1.0, -2.0, -5.0), epsilon = 1e-6);
    }

    #[test]
    fn test_update_view_matches_viewer() {
        let mut camera = Camera::new();
        camera.set_view_yxz(Vec3::new(0.0, -1.0, -5.0), Vec3::new(0.2, 1.0, 0.0));
        assert_relative_eq!(camera.view() * camera.inverse_view(), Mat4::identity(), epsilon = 1e-5);
        assert_relative_eq!(camera.position(), Vec3::new(0.0, -1.0, -5.0), epsilon = 1e-6);
    }

    #[test]
    fn test_forward_key_moves_along_z() {
        let mut camera = Camera::new();
        let mut controller = CameraController::default();
        let mut input = ScriptedInput::default();
        input.keys.insert(KeyCode::W);

        controller.move_camera(&mut camera, &mut input, 0.5);
        assert_relative_eq!(camera.viewer.translation, Vec3::new(0.0, 0.0, 1.5), epsilon = 1e-6);

        input.keys.insert(KeyCode::LeftShift);
        controller.move_camera(&mut camera, &mut input, 0.5);
        assert_relative_eq!(camera.viewer.translation.z, 1.5 + 4.5, epsilon = 1e-5);
    }

    #[test]
    fn test_up_key_moves_toward_negative_y() {
        let mut camera = Camera::new();
        let mut controller = CameraController::default();
        let mut input = ScriptedInput::default();
        input.keys.insert(KeyCode::E);

        controller.move_camera(&mut camera, &mut input, 1.0);
        assert_relative_eq!(camera.viewer.translation, Vec3::new(0.0, -3.0, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn test_pitch_is_clamped() {
        let mut camera = Camera::new();
        let mut controller = CameraController::default();
        let mut input = ScriptedInput::default();
        controller.move_camera(&mut camera, &mut input, 0.016);

        input.look = true;
        input.cursor = (0.0, -100_000.0);
        controller.move_camera(&mut camera, &mut input, 0.016);

        assert!(input.captured);
        assert_relative_eq!(camera.viewer.rotation.x, PITCH_LIMIT);
    }

    #[test]
    fn test_yaw_wraps_into_full_turn() {
        let mut camera = Camera::new();
        camera.viewer.rotation.y = -0.5;
        let mut controller = CameraController::default();
        let mut input = ScriptedInput::default();
        controller.move_camera(&mut camera, &mut input, 0.016);

        assert_relative_eq!(camera.viewer.rotation.y, constants::TAU - 0.5, epsilon = 1e-6);
        assert!(!input.captured);
    }
}
