//! Stages of a draw call, from vertex shading to the multisample resolve.

pub mod clipping;
pub mod fragment_processor;
pub mod msaa;
pub mod pixel_quad;
pub(crate) mod raster_target;
pub mod rasterizer;
pub mod vertex_processor;
pub mod viewport;

pub use rasterizer::{DrawContext, DrawCounters};
pub use vertex_processor::{GeometryBuffers, PrimitiveHolder, VertexHolder};
pub use viewport::Viewport;
