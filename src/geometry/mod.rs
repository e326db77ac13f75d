pub mod bounding_box;
pub mod camera;
pub mod frustum;
pub mod plane;
pub mod transform;
