//! Multithreaded software rasterization pipeline.
//!
//! `core` holds the renderer and its pipeline stages, `geometry` the
//! camera and culling math; `io`, `scene`, `shaders` and `utils` make up the
//! headless viewer built on top of them.

pub mod core;
pub mod geometry;
pub mod io;
pub mod scene;
pub mod shaders;
pub mod utils;
