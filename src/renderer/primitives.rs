use super::vertex::{v, ScreenVertex, TexturedVertex, Vertex};

/// Faces of a unit cube as (normal, u axis, v axis) with `u x v = normal`,
/// so the emitted triangles wind counter-clockwise seen from outside.
const CUBE_FACES: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
    ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
    ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
    ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
    ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
    ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
    ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
];

/// Corner order of a face, as (u sign, v sign, uv). Two triangles: 0-1-2, 2-3-0.
const FACE_CORNERS: [(f32, f32, [f32; 2]); 6] = [
    (-1.0, -1.0, [0.0, 1.0]),
    (1.0, -1.0, [1.0, 1.0]),
    (1.0, 1.0, [1.0, 0.0]),
    (1.0, 1.0, [1.0, 0.0]),
    (-1.0, 1.0, [0.0, 0.0]),
    (-1.0, -1.0, [0.0, 1.0]),
];

/// 36 non-indexed vertices of a cube spanning [-0.5, 0.5].
pub fn cube_vertices() -> Vec<Vertex> {
    let mut verts = Vec::with_capacity(36);
    for (normal, u, w) in CUBE_FACES {
        for (su, sv, uv) in FACE_CORNERS {
            let pos = [
                0.5 * (normal[0] + su * u[0] + sv * w[0]),
                0.5 * (normal[1] + su * u[1] + sv * w[1]),
                0.5 * (normal[2] + su * u[2] + sv * w[2]),
            ];
            verts.push(v(pos, normal, uv));
        }
    }
    verts
}

/// Positions only, for the skybox. Drawn from inside, so winding does not matter.
pub fn skybox_positions() -> Vec<[f32; 3]> {
    cube_vertices().into_iter().map(|vert| vert.pos).collect()
}

/// A 20x20 quad in the z = -10 plane facing -Z. The floor transform rotates
/// it flat and scales it up.
pub fn floor_vertices() -> Vec<Vertex> {
    let n = [0.0, 0.0, -1.0];
    vec![
        v([-10.0, -10.0, -10.0], n, [0.0, 0.0]),
        v([-10.0, 10.0, -10.0], n, [0.0, 1.0]),
        v([10.0, 10.0, -10.0], n, [1.0, 1.0]),
        v([10.0, 10.0, -10.0], n, [1.0, 1.0]),
        v([10.0, -10.0, -10.0], n, [1.0, 0.0]),
        v([-10.0, -10.0, -10.0], n, [0.0, 0.0]),
    ]
}

/// Unit quad standing on its left edge, used for grass and windows.
pub fn billboard_vertices() -> Vec<TexturedVertex> {
    let tv = |pos: [f32; 3], uv: [f32; 2]| TexturedVertex { pos, uv };
    vec![
        tv([0.0, 0.5, 0.0], [0.0, 0.0]),
        tv([0.0, -0.5, 0.0], [0.0, 1.0]),
        tv([1.0, -0.5, 0.0], [1.0, 1.0]),
        tv([0.0, 0.5, 0.0], [0.0, 0.0]),
        tv([1.0, -0.5, 0.0], [1.0, 1.0]),
        tv([1.0, 0.5, 0.0], [1.0, 0.0]),
    ]
}

/// Full-screen quad in clip space. uv (0, 0) is the top-left texel.
pub fn screen_quad_vertices() -> Vec<ScreenVertex> {
    let sv = |pos: [f32; 2], uv: [f32; 2]| ScreenVertex { pos, uv };
    vec![
        sv([-1.0, 1.0], [0.0, 0.0]),
        sv([-1.0, -1.0], [0.0, 1.0]),
        sv([1.0, -1.0], [1.0, 1.0]),
        sv([-1.0, 1.0], [0.0, 0.0]),
        sv([1.0, -1.0], [1.0, 1.0]),
        sv([1.0, 1.0], [1.0, 0.0]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn winding_normal(a: [f32; 3], b: [f32; 3], c: [f32; 3]) -> Vec3 {
        let (a, b, c) = (Vec3::from(a), Vec3::from(b), Vec3::from(c));
        (b - a).cross(c - a)
    }

    #[test]
    fn cube_triangles_wind_outward() {
        let verts = cube_vertices();
        assert_eq!(verts.len(), 36);
        for tri in verts.chunks(3) {
            let geometric = winding_normal(tri[0].pos, tri[1].pos, tri[2].pos);
            assert!(geometric.dot(Vec3::from(tri[0].normal)) > 0.0);
        }
    }

    #[test]
    fn cube_stays_within_unit_bounds() {
        for vert in cube_vertices() {
            for c in vert.pos {
                assert!(c.abs() <= 0.5 + f32::EPSILON);
            }
        }
    }

    #[test]
    fn floor_winding_matches_its_normal() {
        let verts = floor_vertices();
        for tri in verts.chunks(3) {
            let geometric = winding_normal(tri[0].pos, tri[1].pos, tri[2].pos);
            assert!(geometric.dot(Vec3::from(tri[0].normal)) > 0.0);
        }
    }

    #[test]
    fn screen_quad_is_counter_clockwise() {
        let verts = screen_quad_vertices();
        for tri in verts.chunks(3) {
            let [a, b, c] = [tri[0].pos, tri[1].pos, tri[2].pos];
            let z = (b[0] - a[0]) * (c[1] - a[1]) - (b[1] - a[1]) * (c[0] - a[0]);
            assert!(z > 0.0);
        }
    }
}
