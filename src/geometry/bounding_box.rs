use nalgebra::{Matrix4, Point3};

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Point3<f32>,
    pub max: Point3<f32>,
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self {
            min: Point3::origin(),
            max: Point3::origin(),
        }
    }
}

impl BoundingBox {
    pub fn new(min: Point3<f32>, max: Point3<f32>) -> Self {
        Self { min, max }
    }

    /// Smallest box containing every point; `None` for an empty slice.
    pub fn from_points(points: &[Point3<f32>]) -> Option<Self> {
        let first = points.first()?;
        let mut bbox = Self::new(*first, *first);
        for p in &points[1..] {
            bbox.expand(p);
        }
        Some(bbox)
    }

    pub fn expand(&mut self, p: &Point3<f32>) {
        self.min = Point3::from(self.min.coords.inf(&p.coords));
        self.max = Point3::from(self.max.coords.sup(&p.coords));
    }

    pub fn center(&self) -> Point3<f32> {
        nalgebra::center(&self.min, &self.max)
    }

    /// Near face first, counter-clockwise from the bottom left, then far face.
    pub fn corners(&self) -> [Point3<f32>; 8] {
        let (lo, hi) = (self.min, self.max);
        [
            Point3::new(lo.x, lo.y, hi.z),
            Point3::new(hi.x, lo.y, hi.z),
            Point3::new(hi.x, hi.y, hi.z),
            Point3::new(lo.x, hi.y, hi.z),
            Point3::new(lo.x, lo.y, lo.z),
            Point3::new(hi.x, lo.y, lo.z),
            Point3::new(hi.x, hi.y, lo.z),
            Point3::new(lo.x, hi.y, lo.z),
        ]
    }

    /// Box enclosing the eight transformed corners.
    pub fn transform(&self, matrix: &Matrix4<f32>) -> Self {
        let corners = self.corners().map(|c| matrix.transform_point(&c));
        let mut bbox = Self::new(corners[0], corners[0]);
        for c in &corners[1..] {
            bbox.expand(c);
        }
        bbox
    }

    /// Overlap test; touching faces count as intersecting.
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        (0..3).all(|i| self.min[i] <= other.max[i] && self.max[i] >= other.min[i])
    }

    pub fn merge(&mut self, other: &BoundingBox) {
        self.expand(&other.min);
        self.expand(&other.max);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    fn unit() -> BoundingBox {
        BoundingBox::new(Point3::new(-1.0, -1.0, -1.0), Point3::new(1.0, 1.0, 1.0))
    }

    #[test]
    fn merge_and_intersect() {
        let mut a = unit();
        let b = BoundingBox::new(Point3::new(0.5, 0.5, 0.5), Point3::new(3.0, 2.0, 2.0));
        let far = BoundingBox::new(Point3::new(5.0, 5.0, 5.0), Point3::new(6.0, 6.0, 6.0));
        assert!(a.intersects(&b));
        assert!(!a.intersects(&far));
        let touching = BoundingBox::new(Point3::new(1.0, 0.0, 0.0), Point3::new(2.0, 1.0, 1.0));
        assert!(a.intersects(&touching));

        a.merge(&far);
        assert_eq!(a.min, Point3::new(-1.0, -1.0, -1.0));
        assert_eq!(a.max, Point3::new(6.0, 6.0, 6.0));
    }

    #[test]
    fn transform_encloses_rotated_corners() {
        let rot = Matrix4::from_axis_angle(&Vector3::z_axis(), std::f32::consts::FRAC_PI_4);
        let moved = unit().transform(&(Matrix4::new_translation(&Vector3::new(10.0, 0.0, 0.0)) * rot));
        let r = std::f32::consts::SQRT_2;
        assert!((moved.max.x - (10.0 + r)).abs() < 1e-5);
        assert!((moved.min.y + r).abs() < 1e-5);
        assert!((moved.max.z - 1.0).abs() < 1e-6);
    }

    #[test]
    fn from_points_covers_all() {
        assert!(BoundingBox::from_points(&[]).is_none());
        let bbox = BoundingBox::from_points(&[
            Point3::new(1.0, -2.0, 0.0),
            Point3::new(-1.0, 4.0, 2.0),
        ])
        .unwrap();
        assert_eq!(bbox.center(), Point3::new(0.0, 1.0, 1.0));
    }
}
