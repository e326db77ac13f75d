pub mod basic;

pub use basic::{BaseColorShader, DepthShader, LambertShader, SceneUniforms};
