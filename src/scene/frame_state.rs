use glam::{Mat4, Vec2, Vec3};

use crate::renderer::lights::MAX_POINT_LIGHTS;
use crate::renderer::postprocess::PostKernel;
use crate::scene::transform::ModelTransform;
use crate::settings::RenderSettings;

pub const LIGHT_COLORS: [Vec3; MAX_POINT_LIGHTS] = [
    Vec3::new(0.15, 0.43, 0.89),
    Vec3::new(0.15, 0.89, 0.33),
    Vec3::new(1.0, 1.0, 0.15),
    Vec3::new(1.0, 0.15, 0.15),
];

pub const INITIAL_LIGHT_POSITIONS: [Vec3; MAX_POINT_LIGHTS] = [
    Vec3::new(1.61, 2.41, -13.09),
    Vec3::new(1.61, 8.06, -13.09),
    Vec3::new(1.61, 2.41, -19.44),
    Vec3::new(1.61, 8.06, -19.44),
];

pub const SHADOW_LIGHT_POSITION: Vec3 = Vec3::new(-2.0, 4.0, -1.0);

/// Half extent and depth range of the orthographic shadow frustum.
const SHADOW_EXTENT: f32 = 10.0;
const SHADOW_NEAR: f32 = 1.0;
const SHADOW_FAR: f32 = 20.0;

/// Point-light orbits around (1, 5, -15): blue and green on radius 3,
/// yellow and red on radius 2.
pub fn orbit_positions(time: f32) -> [Vec3; MAX_POINT_LIGHTS] {
    let (s, c) = time.sin_cos();
    [
        Vec3::new(1.0 + c * 3.0, 5.0 + c * 3.0, -15.0 + s * 3.0),
        Vec3::new(1.0 - c * 3.0, 5.0 - c * 3.0, -15.0 - s * 3.0),
        Vec3::new(1.0 - s * 2.0, 5.0 - c * 2.0, -15.0 - c * 2.0),
        Vec3::new(1.0 + s * 2.0, 5.0 + c * 2.0, -15.0 + c * 2.0),
    ]
}

/// Everything that changes between frames and is shared by input handling,
/// the parameter window and the pass orchestrator.
#[derive(Clone, Debug)]
pub struct FrameState {
    pub point_light_positions: [Vec3; MAX_POINT_LIGHTS],
    pub point_light_colors: [Vec3; MAX_POINT_LIGHTS],
    pub animate_lights: bool,
    pub kernel: PostKernel,
    pub clear_color: [f32; 4],
    pub camera_movement_enabled: bool,
    pub first_mouse: bool,
    pub last_cursor: Vec2,
    pub house: ModelTransform,
    pub character: ModelTransform,
    pub floor: ModelTransform,
    pub shadow_light_position: Vec3,
    pub shadows_enabled: bool,
    /// Seconds since startup.
    pub elapsed: f32,
    /// Seconds spent on the previous frame.
    pub delta_time: f32,
    /// Width and height the projection is built for.
    pub viewport: (u32, u32),
}

impl FrameState {
    pub fn new(settings: &RenderSettings) -> Self {
        Self {
            kernel: settings.initial_kernel,
            clear_color: settings.clear_color,
            viewport: (settings.resolution.width, settings.resolution.height),
            ..Self::default()
        }
    }

    pub fn aspect(&self) -> f32 {
        let (width, height) = self.viewport;
        width.max(1) as f32 / height.max(1) as f32
    }

    /// Steps the clock and, when enabled, moves the point lights along their
    /// orbits.
    pub fn advance(&mut self, delta_time: f32) {
        self.delta_time = delta_time;
        self.elapsed += delta_time;
        if self.animate_lights {
            self.point_light_positions = orbit_positions(self.elapsed);
        }
    }

    pub fn toggle_camera_movement(&mut self) {
        self.camera_movement_enabled = !self.camera_movement_enabled;
        self.first_mouse = true;
        log::debug!(
            "Camera movement {}",
            if self.camera_movement_enabled { "enabled" } else { "disabled" }
        );
    }

    /// Offset since the last cursor event, y reversed so moving up is positive.
    /// `None` while camera movement is off. The first event after a reset only
    /// records the position.
    pub fn cursor_offset(&mut self, x: f32, y: f32) -> Option<Vec2> {
        if !self.camera_movement_enabled {
            return None;
        }
        let position = Vec2::new(x, y);
        if self.first_mouse {
            self.last_cursor = position;
            self.first_mouse = false;
        }
        let offset = Vec2::new(position.x - self.last_cursor.x, self.last_cursor.y - position.y);
        self.last_cursor = position;
        Some(offset)
    }

    /// Orthographic projection times a view from the shadow light toward the
    /// origin.
    pub fn light_space_matrix(&self) -> Mat4 {
        let projection = Mat4::orthographic_rh(
            -SHADOW_EXTENT,
            SHADOW_EXTENT,
            -SHADOW_EXTENT,
            SHADOW_EXTENT,
            SHADOW_NEAR,
            SHADOW_FAR,
        );
        let view = Mat4::look_at_rh(self.shadow_light_position, Vec3::ZERO, Vec3::Y);
        projection * view
    }
}

impl Default for FrameState {
    fn default() -> Self {
        Self {
            point_light_positions: INITIAL_LIGHT_POSITIONS,
            point_light_colors: LIGHT_COLORS,
            animate_lights: true,
            kernel: PostKernel::Disabled,
            clear_color: [0.45, 0.55, 0.60, 1.0],
            camera_movement_enabled: true,
            first_mouse: true,
            last_cursor: Vec2::new(640.0, 360.0),
            house: ModelTransform::house(),
            character: ModelTransform::character(),
            floor: ModelTransform::floor(),
            shadow_light_position: SHADOW_LIGHT_POSITION,
            shadows_enabled: true,
            elapsed: 0.0,
            delta_time: 0.0,
            viewport: (1280, 720),
        }
    }
}
