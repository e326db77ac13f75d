pub mod model;
pub mod viewer;

pub use model::{Mesh, ModelNode, Vertex};
pub use viewer::{RenderOutput, SceneViewer};
