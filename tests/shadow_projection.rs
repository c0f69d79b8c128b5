use glam::{Mat4, Vec3};
use techdemo::scene::FrameState;

const EPSILON: f32 = 1e-5;

/// CPU copy of the lookup in `lit.wgsl`: shadow-map uv plus depth, or `None`
/// when the point falls outside the light frustum and counts as lit.
fn project_shadow_cpu(light_space: Mat4, world_pos: Vec3) -> Option<Vec3> {
    let clip = light_space * world_pos.extend(1.0);
    let ndc = clip.truncate() / clip.w;
    let uv = (ndc.x * 0.5 + 0.5, 0.5 - ndc.y * 0.5);
    let outside = ndc.z > 1.0 || uv.0 < 0.0 || uv.0 > 1.0 || uv.1 < 0.0 || uv.1 > 1.0;
    (!outside).then(|| Vec3::new(uv.0, uv.1, ndc.z))
}

fn shadow_bias(normal: Vec3, light_dir: Vec3) -> f32 {
    (0.05 * (1.0 - normal.dot(light_dir))).max(0.005)
}

#[test]
fn scene_center_projects_to_middle_of_shadow_map() {
    let state = FrameState::default();
    let projected = project_shadow_cpu(state.light_space_matrix(), Vec3::ZERO).unwrap();
    assert!((projected.x - 0.5).abs() < EPSILON);
    assert!((projected.y - 0.5).abs() < EPSILON);
    assert!(projected.z > 0.0 && projected.z < 1.0);
}

#[test]
fn shadow_texture_v_axis_is_flipped_from_clip_space() {
    let state = FrameState::default();
    let light_space = state.light_space_matrix();
    let up = project_shadow_cpu(light_space, Vec3::new(0.0, 2.0, 0.0)).unwrap();
    let down = project_shadow_cpu(light_space, Vec3::new(0.0, -2.0, 0.0)).unwrap();
    assert!(up.y < down.y);
}

#[test]
fn points_beyond_the_frustum_are_lit() {
    let state = FrameState::default();
    let light_space = state.light_space_matrix();
    assert!(project_shadow_cpu(light_space, Vec3::new(40.0, 0.0, 0.0)).is_none());
    // past the far plane, directly behind the origin as seen from the light
    let far = -state.shadow_light_position.normalize() * 30.0;
    assert!(project_shadow_cpu(light_space, far).is_none());
}

#[test]
fn occluder_between_light_and_floor_is_closer_in_depth() {
    let state = FrameState::default();
    let light_space = state.light_space_matrix();
    let receiver = Vec3::ZERO;
    let occluder = state.shadow_light_position * 0.5;

    let r = project_shadow_cpu(light_space, receiver).unwrap();
    let o = project_shadow_cpu(light_space, occluder).unwrap();
    assert!((r.x - o.x).abs() < EPSILON && (r.y - o.y).abs() < EPSILON);
    assert!(o.z < r.z - shadow_bias(Vec3::Y, state.shadow_light_position.normalize()));
}

#[test]
fn bias_grows_at_grazing_angles() {
    let light_dir = Vec3::Y;
    assert_eq!(shadow_bias(Vec3::Y, light_dir), 0.005);
    assert!((shadow_bias(Vec3::X, light_dir) - 0.05).abs() < EPSILON);
}

#[test]
fn ground_around_the_origin_stays_inside_the_light_frustum() {
    let state = FrameState::default();
    let light_space = state.light_space_matrix();
    for x in -5..=5 {
        for z in -5..=5 {
            let point = Vec3::new(x as f32, 0.0, z as f32);
            assert!(
                project_shadow_cpu(light_space, point).is_some(),
                "{point} fell outside the shadow map"
            );
        }
    }
}
