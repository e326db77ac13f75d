use crate::geometry::bounding_box::BoundingBox;
use nalgebra::{Point3, Vector3, Vector4};

/// Result of classifying geometry against a plane
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaneIntersects {
    Cross,
    Tangent,
    Front,
    Back,
}

/// `dot(normal, p) + d = 0` with a unit normal
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    normal: Vector3<f32>,
    d: f32,
}

impl Default for Plane {
    fn default() -> Self {
        Self {
            normal: Vector3::z(),
            d: 0.0,
        }
    }
}

impl Plane {
    /// Plane through `point` facing `normal`
    pub fn new(normal: &Vector3<f32>, point: &Point3<f32>) -> Self {
        let mut plane = Self::default();
        plane.set(normal, point);
        plane
    }

    pub fn set(&mut self, normal: &Vector3<f32>, point: &Point3<f32>) {
        self.normal = normal.normalize();
        self.d = -self.normal.dot(&point.coords);
    }

    /// From `(a, b, c, d)` coefficients, normalized.
    pub fn from_coefficients(c: &Vector4<f32>) -> Self {
        let len = c.xyz().norm();
        if len <= 0.0 {
            return Self::default();
        }
        Self {
            normal: c.xyz() / len,
            d: c.w / len,
        }
    }

    pub fn normal(&self) -> &Vector3<f32> {
        &self.normal
    }

    pub fn offset(&self) -> f32 {
        self.d
    }

    /// Signed distance, positive on the normal side
    #[inline]
    pub fn distance(&self, p: &Point3<f32>) -> f32 {
        self.normal.dot(&p.coords) + self.d
    }

    pub fn intersects_box(&self, bbox: &BoundingBox) -> PlaneIntersects {
        let center = bbox.center();
        let extent = (bbox.max - bbox.min) * 0.5;
        let d = self.distance(&center);
        let r = (extent.x * self.normal.x).abs()
            + (extent.y * self.normal.y).abs()
            + (extent.z * self.normal.z).abs();
        if d == r {
            PlaneIntersects::Tangent
        } else if d.abs() < r {
            PlaneIntersects::Cross
        } else if d > 0.0 {
            PlaneIntersects::Front
        } else {
            PlaneIntersects::Back
        }
    }

    pub fn intersects_point(&self, p: &Point3<f32>) -> PlaneIntersects {
        let d = self.distance(p);
        if d == 0.0 {
            PlaneIntersects::Tangent
        } else if d > 0.0 {
            PlaneIntersects::Front
        } else {
            PlaneIntersects::Back
        }
    }

    pub fn intersects_segment(&self, p0: &Point3<f32>, p1: &Point3<f32>) -> PlaneIntersects {
        let s0 = self.intersects_point(p0);
        let s1 = self.intersects_point(p1);
        if s0 == s1 {
            s0
        } else if s0 == PlaneIntersects::Tangent || s1 == PlaneIntersects::Tangent {
            PlaneIntersects::Tangent
        } else {
            PlaneIntersects::Cross
        }
    }

    pub fn intersects_triangle(
        &self,
        p0: &Point3<f32>,
        p1: &Point3<f32>,
        p2: &Point3<f32>,
    ) -> PlaneIntersects {
        let s0 = self.intersects_segment(p0, p1);
        let s1 = self.intersects_segment(p0, p2);
        let s2 = self.intersects_segment(p1, p2);
        if s0 == s1 && s0 == s2 {
            s0
        } else if [s0, s1, s2].contains(&PlaneIntersects::Cross) {
            PlaneIntersects::Cross
        } else {
            PlaneIntersects::Tangent
        }
    }
}
