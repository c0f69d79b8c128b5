use glam::{Mat4, Vec3};

pub const YAW: f32 = 0.0;
pub const PITCH: f32 = 0.0;
pub const SPEED: f32 = 2.5;
pub const SENSITIVITY: f32 = 0.1;
pub const ZOOM: f32 = 45.0;

pub const NEAR_PLANE: f32 = 0.1;
pub const FAR_PLANE: f32 = 100.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CameraMovement {
    Forward,
    Backward,
    Left,
    Right,
}

/// Fly-through camera driven by Euler angles, in degrees.
#[derive(Clone, Debug)]
pub struct Camera {
    pub position: Vec3,
    front: Vec3,
    up: Vec3,
    right: Vec3,
    world_up: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub movement_speed: f32,
    pub mouse_sensitivity: f32,
    /// Vertical field of view in degrees.
    pub zoom: f32,
}

impl Camera {
    pub fn new(position: Vec3) -> Self {
        Self::with_angles(position, Vec3::Y, YAW, PITCH)
    }

    pub fn with_angles(position: Vec3, world_up: Vec3, yaw: f32, pitch: f32) -> Self {
        let mut camera = Self {
            position,
            front: Vec3::NEG_Z,
            up: world_up,
            right: Vec3::X,
            world_up,
            yaw,
            pitch,
            movement_speed: SPEED,
            mouse_sensitivity: SENSITIVITY,
            zoom: ZOOM,
        };
        camera.update_vectors();
        camera
    }

    pub fn front(&self) -> Vec3 {
        self.front
    }

    pub fn up(&self) -> Vec3 {
        self.up
    }

    pub fn right(&self) -> Vec3 {
        self.right
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.front, self.up)
    }

    pub fn projection(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.zoom.to_radians(), aspect, NEAR_PLANE, FAR_PLANE)
    }

    pub fn process_keyboard(&mut self, direction: CameraMovement, delta_time: f32) {
        let velocity = self.movement_speed * delta_time;
        match direction {
            CameraMovement::Forward => self.position += self.front * velocity,
            CameraMovement::Backward => self.position -= self.front * velocity,
            CameraMovement::Left => self.position -= self.right * velocity,
            CameraMovement::Right => self.position += self.right * velocity,
        }
    }

    /// Offsets are in pixels; positive `y_offset` looks up.
    pub fn process_mouse_movement(&mut self, x_offset: f32, y_offset: f32, constrain_pitch: bool) {
        self.yaw += x_offset * self.mouse_sensitivity;
        self.pitch += y_offset * self.mouse_sensitivity;

        if constrain_pitch {
            self.pitch = self.pitch.clamp(-89.0, 89.0);
        }
        self.update_vectors();
    }

    pub fn process_mouse_scroll(&mut self, y_offset: f32) {
        self.zoom = (self.zoom - y_offset).clamp(1.0, 45.0);
    }

    fn update_vectors(&mut self) {
        let (yaw, pitch) = (self.yaw.to_radians(), self.pitch.to_radians());
        self.front = Vec3::new(yaw.cos() * pitch.cos(), pitch.sin(), yaw.sin() * pitch.cos()).normalize();
        self.right = self.front.cross(self.world_up).normalize();
        self.up = self.right.cross(self.front).normalize();
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Vec3::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_yaw_looks_down_positive_x() {
        let camera = Camera::new(Vec3::new(0.0, 10.0, -20.0));
        assert!(camera.front().abs_diff_eq(Vec3::X, 1e-6));
        assert!(camera.right().abs_diff_eq(Vec3::Z, 1e-6));
        assert!(camera.up().abs_diff_eq(Vec3::Y, 1e-6));
    }

    #[test]
    fn pitch_is_constrained() {
        let mut camera = Camera::default();
        camera.process_mouse_movement(0.0, 10_000.0, true);
        assert_eq!(camera.pitch, 89.0);
        camera.process_mouse_movement(0.0, -100_000.0, false);
        assert!(camera.pitch < -89.0);
    }

    #[test]
    fn scroll_clamps_zoom() {
        let mut camera = Camera::default();
        camera.process_mouse_scroll(100.0);
        assert_eq!(camera.zoom, 1.0);
        camera.process_mouse_scroll(-100.0);
        assert_eq!(camera.zoom, 45.0);
    }

    #[test]
    fn keyboard_moves_along_front_and_right() {
        let mut camera = Camera::default();
        camera.process_keyboard(CameraMovement::Forward, 2.0);
        assert!(camera.position.abs_diff_eq(Vec3::new(5.0, 0.0, 0.0), 1e-5));
        camera.process_keyboard(CameraMovement::Left, 1.0);
        assert!(camera.position.abs_diff_eq(Vec3::new(5.0, 0.0, -2.5), 1e-5));
    }

    #[test]
    fn view_matrix_maps_target_onto_negative_z() {
        let camera = Camera::new(Vec3::new(0.0, 10.0, -20.0));
        let target = camera.position + camera.front() * 3.0;
        let in_view = camera.view_matrix().transform_point3(target);
        assert!(in_view.abs_diff_eq(Vec3::new(0.0, 0.0, -3.0), 1e-5));
    }
}
