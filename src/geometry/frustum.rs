use crate::geometry::bounding_box::BoundingBox;
use crate::geometry::plane::{Plane, PlaneIntersects};
use nalgebra::{Matrix4, Point3, Vector4};

pub const CLIP_PLANE_COUNT: usize = 6;

pub const CLIP_POSITIVE_X: u8 = 1 << 0;
pub const CLIP_NEGATIVE_X: u8 = 1 << 1;
pub const CLIP_POSITIVE_Y: u8 = 1 << 2;
pub const CLIP_NEGATIVE_Y: u8 = 1 << 3;
pub const CLIP_POSITIVE_Z: u8 = 1 << 4;
pub const CLIP_NEGATIVE_Z: u8 = 1 << 5;

/// Homogeneous clip plane `i`; a vertex is inside when `dot(plane, pos) >= 0`.
/// Plane `i` corresponds to mask bit `1 << i`.
#[inline]
pub fn clip_plane(i: usize) -> Vector4<f32> {
    match i {
        0 => Vector4::new(-1.0, 0.0, 0.0, 1.0),
        1 => Vector4::new(1.0, 0.0, 0.0, 1.0),
        2 => Vector4::new(0.0, -1.0, 0.0, 1.0),
        3 => Vector4::new(0.0, 1.0, 0.0, 1.0),
        4 => Vector4::new(0.0, 0.0, -1.0, 1.0),
        _ => Vector4::new(0.0, 0.0, 1.0, 1.0),
    }
}

/// Bit set of the clip planes `pos` lies outside of
#[inline]
pub fn clip_mask(pos: &Vector4<f32>) -> u8 {
    (0..CLIP_PLANE_COUNT).fold(0u8, |mask, i| {
        if clip_plane(i).dot(pos) < 0.0 {
            mask | (1 << i)
        } else {
            mask
        }
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrustumPlane {
    Near = 0,
    Far,
    Top,
    Bottom,
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrustumCorner {
    NearTopLeft = 0,
    NearTopRight,
    NearBottomLeft,
    NearBottomRight,
    FarTopLeft,
    FarTopRight,
    FarBottomLeft,
    FarBottomRight,
}

/// View volume as six inward-facing planes, its eight corners and their AABB.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frustum {
    pub planes: [Plane; 6],
    pub corners: [Point3<f32>; 8],
    pub bbox: BoundingBox,
}

impl Frustum {
    /// Extracts the planes of `view_projection` (GL clip conventions,
    /// z in [-w, w]). A singular matrix leaves every corner at the origin.
    pub fn from_matrix(view_projection: &Matrix4<f32>) -> Self {
        let row = |i: usize| -> Vector4<f32> { view_projection.row(i).transpose() };
        let (r0, r1, r2, r3) = (row(0), row(1), row(2), row(3));
        let planes = [
            Plane::from_coefficients(&(r3 + r2)),
            Plane::from_coefficients(&(r3 - r2)),
            Plane::from_coefficients(&(r3 - r1)),
            Plane::from_coefficients(&(r3 + r1)),
            Plane::from_coefficients(&(r3 + r0)),
            Plane::from_coefficients(&(r3 - r0)),
        ];

        let ndc = [
            (-1.0, 1.0, -1.0),
            (1.0, 1.0, -1.0),
            (-1.0, -1.0, -1.0),
            (1.0, -1.0, -1.0),
            (-1.0, 1.0, 1.0),
            (1.0, 1.0, 1.0),
            (-1.0, -1.0, 1.0),
            (1.0, -1.0, 1.0),
        ];
        let corners = match view_projection.try_inverse() {
            Some(inv) => ndc.map(|(x, y, z)| inv.transform_point(&Point3::new(x, y, z))),
            None => [Point3::origin(); 8],
        };
        let bbox = BoundingBox::from_points(&corners).unwrap_or_default();

        Self {
            planes,
            corners,
            bbox,
        }
    }

    pub fn plane(&self, which: FrustumPlane) -> &Plane {
        &self.planes[which as usize]
    }

    pub fn corner(&self, which: FrustumCorner) -> &Point3<f32> {
        &self.corners[which as usize]
    }

    fn none_behind(&self, test: impl Fn(&Plane) -> PlaneIntersects) -> bool {
        self.planes
            .iter()
            .all(|plane| test(plane) != PlaneIntersects::Back)
    }

    /// Conservative: a box near a frustum edge may pass without being visible.
    pub fn intersects_box(&self, bbox: &BoundingBox) -> bool {
        self.bbox.intersects(bbox) && self.none_behind(|p| p.intersects_box(bbox))
    }

    pub fn intersects_point(&self, p: &Point3<f32>) -> bool {
        self.none_behind(|plane| plane.intersects_point(p))
    }

    pub fn intersects_segment(&self, p0: &Point3<f32>, p1: &Point3<f32>) -> bool {
        self.none_behind(|plane| plane.intersects_segment(p0, p1))
    }

    pub fn intersects_triangle(
        &self,
        p0: &Point3<f32>,
        p1: &Point3<f32>,
        p2: &Point3<f32>,
    ) -> bool {
        self.none_behind(|plane| plane.intersects_triangle(p0, p1, p2))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    fn camera_frustum() -> Frustum {
        let view = Matrix4::look_at_rh(
            &Point3::new(0.0, 0.0, 5.0),
            &Point3::origin(),
            &Vector3::y(),
        );
        let proj = Matrix4::new_perspective(1.0, 60f32.to_radians(), 1.0, 20.0);
        Frustum::from_matrix(&(proj * view))
    }

    #[test]
    fn clip_mask_sets_one_bit_per_violated_plane() {
        assert_eq!(clip_mask(&Vector4::new(0.0, 0.0, 0.0, 1.0)), 0);
        assert_eq!(clip_mask(&Vector4::new(2.0, 0.0, 0.0, 1.0)), CLIP_POSITIVE_X);
        assert_eq!(
            clip_mask(&Vector4::new(-2.0, 3.0, -4.0, 1.0)),
            CLIP_NEGATIVE_X | CLIP_POSITIVE_Y | CLIP_NEGATIVE_Z
        );
        assert_eq!(clip_mask(&Vector4::new(0.0, -1.0, 1.0, 1.0)), 0);
        assert_eq!(clip_mask(&Vector4::new(0.0, -1.5, 1.5, 1.0)), CLIP_NEGATIVE_Y | CLIP_POSITIVE_Z);
    }

    #[test]
    fn planes_face_inward() {
        let frustum = camera_frustum();
        let inside = Point3::new(0.0, 0.0, 0.0);
        for plane in &frustum.planes {
            assert!(plane.distance(&inside) > 0.0);
        }
        let near = frustum.plane(FrustumPlane::Near);
        assert!((near.distance(&Point3::new(0.0, 0.0, 4.0))).abs() < 1e-4);
    }

    #[test]
    fn corners_match_near_and_far_planes() {
        let frustum = camera_frustum();
        let ntl = frustum.corner(FrustumCorner::NearTopLeft);
        let fbr = frustum.corner(FrustumCorner::FarBottomRight);
        assert!((ntl.z - 4.0).abs() < 1e-3);
        assert!(ntl.x < 0.0 && ntl.y > 0.0);
        assert!((fbr.z + 15.0).abs() < 1e-2);
        assert!(fbr.x > 0.0 && fbr.y < 0.0);
        assert!(frustum.bbox.min.z < -14.9 && frustum.bbox.max.z > 3.9);
    }

    #[test]
    fn rejects_geometry_behind_any_plane() {
        let frustum = camera_frustum();
        assert!(frustum.intersects_point(&Point3::new(0.0, 0.0, -3.0)));
        assert!(!frustum.intersects_point(&Point3::new(0.0, 0.0, 6.0)));
        assert!(!frustum.intersects_point(&Point3::new(50.0, 0.0, -3.0)));

        let a = Point3::new(-50.0, 0.0, -3.0);
        let b = Point3::new(50.0, 0.0, -3.0);
        assert!(frustum.intersects_segment(&a, &b));
        assert!(frustum.intersects_triangle(&a, &b, &Point3::new(0.0, 40.0, -3.0)));
        assert!(!frustum.intersects_segment(
            &Point3::new(0.0, 0.0, 6.0),
            &Point3::new(1.0, 0.0, 7.0)
        ));

        let visible = BoundingBox::new(Point3::new(-1.0, -1.0, -1.0), Point3::new(1.0, 1.0, 1.0));
        let behind = BoundingBox::new(Point3::new(-1.0, -1.0, 8.0), Point3::new(1.0, 1.0, 9.0));
        let beyond = BoundingBox::new(Point3::new(-1.0, -1.0, -40.0), Point3::new(1.0, 1.0, -30.0));
        assert!(frustum.intersects_box(&visible));
        assert!(!frustum.intersects_box(&behind));
        assert!(!frustum.intersects_box(&beyond));
    }
}
