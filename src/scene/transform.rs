use glam::{Mat3, Mat4, Vec3};

/// Where the rotation sits relative to the translation in the composed matrix.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransformOrder {
    /// `R * T * S`: the translation is applied in the rotated frame.
    RotateFirst,
    /// `T * R * S`
    TranslateFirst,
}

/// Axis-angle placement edited through the parameter window.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ModelTransform {
    pub translation: Vec3,
    pub rotation_axis: Vec3,
    pub rotation_degrees: f32,
    pub scale: f32,
    pub order: TransformOrder,
}

impl Default for ModelTransform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation_axis: Vec3::Y,
            rotation_degrees: 0.0,
            scale: 1.0,
            order: TransformOrder::TranslateFirst,
        }
    }
}

impl ModelTransform {
    pub fn house() -> Self {
        Self {
            translation: Vec3::ONE,
            rotation_axis: Vec3::X,
            rotation_degrees: 360.0,
            scale: 1.0,
            order: TransformOrder::RotateFirst,
        }
    }

    pub fn character() -> Self {
        Self {
            translation: Vec3::new(14.0, 0.0, 1.0),
            rotation_axis: Vec3::Y,
            rotation_degrees: 90.0,
            scale: 0.5,
            order: TransformOrder::RotateFirst,
        }
    }

    pub fn floor() -> Self {
        Self {
            translation: Vec3::new(15.0, -48.96, 0.0),
            rotation_axis: Vec3::X,
            rotation_degrees: 90.0,
            scale: 5.0,
            order: TransformOrder::TranslateFirst,
        }
    }

    /// A zero axis (every slider at 0) means no rotation.
    pub fn rotation(&self) -> Mat4 {
        self.rotation_axis
            .try_normalize()
            .map(|axis| Mat4::from_axis_angle(axis, self.rotation_degrees.to_radians()))
            .unwrap_or(Mat4::IDENTITY)
    }

    pub fn matrix(&self) -> Mat4 {
        let translation = Mat4::from_translation(self.translation);
        let scale = Mat4::from_scale(Vec3::splat(self.scale));
        match self.order {
            TransformOrder::RotateFirst => self.rotation() * translation * scale,
            TransformOrder::TranslateFirst => translation * self.rotation() * scale,
        }
    }
}

/// Inverse-transpose of the upper 3x3, for transforming normals.
pub fn normal_matrix(model: Mat4) -> Mat3 {
    let upper = Mat3::from_mat4(model);
    if upper.determinant().abs() <= f32::EPSILON {
        return upper;
    }
    upper.inverse().transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_identity() {
        let m = ModelTransform::default().matrix();
        assert!(m.abs_diff_eq(Mat4::IDENTITY, 1e-6));
    }

    #[test]
    fn rotate_first_moves_translation_into_rotated_frame() {
        let transform = ModelTransform {
            translation: Vec3::new(1.0, 0.0, 0.0),
            rotation_axis: Vec3::Y,
            rotation_degrees: 90.0,
            scale: 1.0,
            order: TransformOrder::RotateFirst,
        };
        let p = transform.matrix().transform_point3(Vec3::ZERO);
        // +X rotated a quarter turn about +Y ends up on -Z
        assert!(p.abs_diff_eq(Vec3::new(0.0, 0.0, -1.0), 1e-6));

        let translate_first = ModelTransform {
            order: TransformOrder::TranslateFirst,
            ..transform
        };
        let q = translate_first.matrix().transform_point3(Vec3::ZERO);
        assert!(q.abs_diff_eq(Vec3::X, 1e-6));
    }

    #[test]
    fn floor_lies_flat_facing_up() {
        let floor = ModelTransform::floor().matrix();
        let normal = normal_matrix(floor) * Vec3::NEG_Z;
        assert!(normal.normalize().abs_diff_eq(Vec3::Y, 1e-5));

        let corner = floor.transform_point3(Vec3::new(-10.0, -10.0, -10.0));
        assert!((corner.y - 1.04).abs() < 1e-3);
    }

    #[test]
    fn zero_axis_skips_rotation() {
        let transform = ModelTransform {
            rotation_axis: Vec3::ZERO,
            rotation_degrees: 45.0,
            translation: Vec3::new(2.0, 3.0, 4.0),
            ..ModelTransform::default()
        };
        let p = transform.matrix().transform_point3(Vec3::ZERO);
        assert!(p.abs_diff_eq(Vec3::new(2.0, 3.0, 4.0), 1e-6));
        assert!(!transform.matrix().is_nan());
    }

    #[test]
    fn normal_matrix_undoes_non_uniform_scale() {
        let model = Mat4::from_scale(Vec3::new(4.0, 1.0, 1.0));
        let n = normal_matrix(model) * Vec3::new(1.0, 1.0, 0.0);
        assert!(n.y > n.x);
    }
}
