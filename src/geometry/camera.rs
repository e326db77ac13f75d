use crate::geometry::frustum::Frustum;
use crate::geometry::transform::TransformFactory;
use nalgebra::{Matrix4, Point3, Vector3};

/// Perspective camera; every setter refreshes the cached matrices.
#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
    pub right: Vector3<f32>,
    /// Vertical field of view in radians
    pub fov_y: f32,
    pub aspect_ratio: f32,
    pub near: f32,
    pub far: f32,
    pub view_matrix: Matrix4<f32>,
    pub projection_matrix: Matrix4<f32>,
    pub view_projection_matrix: Matrix4<f32>,
}

impl Camera {
    pub fn new_perspective(
        position: Point3<f32>,
        target: Point3<f32>,
        up: Vector3<f32>,
        fov_y_degrees: f32,
        aspect_ratio: f32,
        near: f32,
        far: f32,
    ) -> Self {
        let mut camera = Camera {
            position,
            target,
            up: up.normalize(),
            right: Vector3::x(),
            fov_y: fov_y_degrees.to_radians(),
            aspect_ratio,
            near,
            far,
            view_matrix: Matrix4::identity(),
            projection_matrix: Matrix4::identity(),
            view_projection_matrix: Matrix4::identity(),
        };
        camera.update_matrices();
        camera
    }

    /// Re-orthogonalizes `right` and `up` against the view direction.
    fn update_camera_basis(&mut self) {
        let forward = (self.target - self.position).normalize();
        self.right = forward.cross(&self.up).normalize();
        self.up = self.right.cross(&forward).normalize();
    }

    pub fn update_matrices(&mut self) {
        self.update_camera_basis();
        self.view_matrix = TransformFactory::view(&self.position, &self.target, &self.up);
        self.projection_matrix =
            TransformFactory::perspective(self.aspect_ratio, self.fov_y, self.near, self.far);
        self.view_projection_matrix = self.projection_matrix * self.view_matrix;
    }

    /// Rotates the eye around the target.
    pub fn orbit(&mut self, axis: &Vector3<f32>, angle_rad: f32) {
        let offset = self.position - self.target;
        let rotated = TransformFactory::rotation(axis, angle_rad).transform_vector(&offset);
        self.position = self.target + rotated;
        self.update_matrices();
    }

    pub fn orbit_y(&mut self, angle_degrees: f32) {
        self.orbit(&Vector3::y(), angle_degrees.to_radians());
    }

    pub fn set_aspect_ratio(&mut self, aspect_ratio: f32) {
        self.aspect_ratio = aspect_ratio;
        self.update_matrices();
    }

    pub fn frustum(&self) -> Frustum {
        Frustum::from_matrix(&self.view_projection_matrix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> Camera {
        Camera::new_perspective(
            Point3::new(0.0, 0.0, 5.0),
            Point3::origin(),
            Vector3::new(0.0, 2.0, 0.0),
            45.0,
            1.0,
            0.1,
            100.0,
        )
    }

    #[test]
    fn target_projects_to_screen_center() {
        let cam = camera();
        let clip = cam.view_projection_matrix * Point3::origin().to_homogeneous();
        assert!((clip.x / clip.w).abs() < 1e-6);
        assert!((clip.y / clip.w).abs() < 1e-6);
        assert_eq!(cam.up, Vector3::y());
        assert_eq!(cam.right, Vector3::x());
    }

    #[test]
    fn orbit_keeps_distance_and_target_visible() {
        let mut cam = camera();
        cam.orbit_y(90.0);
        assert!(((cam.position - cam.target).norm() - 5.0).abs() < 1e-5);
        assert!((cam.position.x - 5.0).abs() < 1e-4);
        assert!(cam.frustum().intersects_point(&Point3::origin()));
        assert!(!cam.frustum().intersects_point(&Point3::new(8.0, 0.0, 0.0)));
    }
}
