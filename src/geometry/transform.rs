use nalgebra::{Matrix3, Matrix4, Point3, Rotation3, Unit, Vector3};

/// Static constructors for the transform matrices the scene layer needs
pub struct TransformFactory;

impl TransformFactory {
    /// Rotation about an arbitrary axis
    pub fn rotation(axis: &Vector3<f32>, angle_rad: f32) -> Matrix4<f32> {
        let axis_unit = Unit::new_normalize(*axis);
        Matrix4::from(Rotation3::from_axis_angle(&axis_unit, angle_rad))
    }

    pub fn rotation_y(angle_rad: f32) -> Matrix4<f32> {
        Matrix4::from_euler_angles(0.0, angle_rad, 0.0)
    }

    pub fn translation(translation: &Vector3<f32>) -> Matrix4<f32> {
        Matrix4::new_translation(translation)
    }

    pub fn scaling(scale: f32) -> Matrix4<f32> {
        Matrix4::new_scaling(scale)
    }

    pub fn scaling_nonuniform(scale: &Vector3<f32>) -> Matrix4<f32> {
        Matrix4::new_nonuniform_scaling(scale)
    }

    /// Right-handed look-at view matrix
    pub fn view(eye: &Point3<f32>, target: &Point3<f32>, up: &Vector3<f32>) -> Matrix4<f32> {
        Matrix4::look_at_rh(eye, target, &Unit::new_normalize(*up))
    }

    /// GL-style perspective, clip z in [-w, w]
    pub fn perspective(aspect_ratio: f32, fov_y_rad: f32, near: f32, far: f32) -> Matrix4<f32> {
        Matrix4::new_perspective(aspect_ratio, fov_y_rad, near, far)
    }
}

/// Inverse transpose of the upper 3x3, `None` when `model` is singular.
pub fn compute_normal_matrix(model: &Matrix4<f32>) -> Option<Matrix3<f32>> {
    model
        .try_inverse()
        .map(|inv| inv.transpose().fixed_view::<3, 3>(0, 0).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normal_matrix_undoes_nonuniform_scale() {
        let model = TransformFactory::scaling_nonuniform(&Vector3::new(2.0, 1.0, 1.0));
        let n = compute_normal_matrix(&model).unwrap() * Vector3::new(1.0, 1.0, 0.0);
        assert!((n.x - 0.5).abs() < 1e-6);
        assert!((n.y - 1.0).abs() < 1e-6);
        assert!(compute_normal_matrix(&Matrix4::zeros()).is_none());
    }

    #[test]
    fn rotation_matches_rotation_y() {
        let a = TransformFactory::rotation(&Vector3::y(), 0.7);
        let b = TransformFactory::rotation_y(0.7);
        assert!((a - b).norm() < 1e-6);
    }
}
