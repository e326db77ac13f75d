//! Programmable stages and the resources they read.

use crate::core::texture::{SamplerDesc, Texture};
use crate::core::vertex::VertexInput;
use nalgebra::{Matrix4, Vector2, Vector4};
use std::collections::HashMap;

/// Named block of float uniforms
#[derive(Debug, Clone, Default)]
pub struct UniformBlock {
    name: String,
    data: Vec<f32>,
}

impl UniformBlock {
    pub fn new(name: &str, size: usize) -> Self {
        Self {
            name: name.to_string(),
            data: vec![0.0; size],
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Copies `data` starting at float `offset`; writes past the end are dropped.
    pub fn set_data(&mut self, offset: usize, data: &[f32]) {
        if offset >= self.data.len() {
            return;
        }
        let n = data.len().min(self.data.len() - offset);
        self.data[offset..offset + n].copy_from_slice(&data[..n]);
    }

    pub fn set_vec4(&mut self, offset: usize, v: &Vector4<f32>) {
        self.set_data(offset, v.as_slice());
    }

    /// Column-major, like `nalgebra`
    pub fn set_mat4(&mut self, offset: usize, m: &Matrix4<f32>) {
        self.set_data(offset, m.as_slice());
    }

    pub fn float(&self, offset: usize) -> f32 {
        self.data.get(offset).copied().unwrap_or(0.0)
    }

    pub fn vec4(&self, offset: usize) -> Vector4<f32> {
        Vector4::from_fn(|i, _| self.float(offset + i))
    }

    pub fn mat4(&self, offset: usize) -> Matrix4<f32> {
        Matrix4::from_fn(|r, c| self.float(offset + c * 4 + r))
    }
}

/// Named texture binding with the sampler state applied to it
#[derive(Debug, Clone, Default)]
pub struct UniformSampler {
    name: String,
    desc: SamplerDesc,
    texture: Option<Texture>,
}

impl UniformSampler {
    pub fn new(name: &str, desc: SamplerDesc) -> Self {
        Self {
            name: name.to_string(),
            desc,
            texture: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Binds `texture`; cloning a texture shares its pixel storage.
    pub fn set_texture(&mut self, mut texture: Texture) {
        texture.set_sampler_desc(self.desc);
        self.texture = Some(texture);
    }

    pub fn texture(&self) -> Option<&Texture> {
        self.texture.as_ref()
    }
}

/// Everything a shader can read besides its vertex attributes or varyings
#[derive(Debug, Clone, Default)]
pub struct ShaderResources {
    blocks: HashMap<String, UniformBlock>,
    samplers: HashMap<String, UniformSampler>,
}

impl ShaderResources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_block(&mut self, block: UniformBlock) {
        self.blocks.insert(block.name.clone(), block);
    }

    pub fn add_sampler(&mut self, sampler: UniformSampler) {
        self.samplers.insert(sampler.name.clone(), sampler);
    }

    pub fn block(&self, name: &str) -> Option<&UniformBlock> {
        self.blocks.get(name)
    }

    pub fn block_mut(&mut self, name: &str) -> Option<&mut UniformBlock> {
        self.blocks.get_mut(name)
    }

    pub fn sampler(&self, name: &str) -> Option<&UniformSampler> {
        self.samplers.get(name)
    }

    pub fn texture(&self, name: &str) -> Option<&Texture> {
        self.sampler(name)?.texture()
    }
}

/// Fragment shader result. A discarded fragment writes nothing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FragmentOutput {
    pub color: Vector4<f32>,
    pub depth: Option<f32>,
    pub discard: bool,
}

impl FragmentOutput {
    pub fn color(color: Vector4<f32>) -> Self {
        Self {
            color,
            depth: None,
            discard: false,
        }
    }

    pub fn discarded() -> Self {
        Self {
            color: Vector4::zeros(),
            depth: None,
            discard: true,
        }
    }
}

/// Per-lane fragment state. The four lanes of a 2x2 quad are laid out
/// as `0 = (x, y)`, `1 = (x + 1, y)`, `2 = (x, y + 1)`, `3 = (x + 1, y + 1)`.
#[derive(Debug, Clone, Copy)]
pub struct FragmentInput<'a> {
    /// Window position of the shading sample, interpolated depth, and 1/w
    pub frag_coord: Vector4<f32>,
    pub front_facing: bool,
    pub lane: usize,
    pub quad_varyings: [&'a [f32]; 4],
}

impl<'a> FragmentInput<'a> {
    pub fn varyings(&self) -> &'a [f32] {
        self.quad_varyings[self.lane]
    }

    pub fn varying(&self, i: usize) -> f32 {
        self.varyings().get(i).copied().unwrap_or(0.0)
    }

    fn lane_varying(&self, lane: usize, i: usize) -> f32 {
        self.quad_varyings[lane].get(i).copied().unwrap_or(0.0)
    }

    /// Horizontal finite difference of varying `i` across the quad row
    pub fn dfdx(&self, i: usize) -> f32 {
        let (a, b) = if self.lane < 2 { (0, 1) } else { (2, 3) };
        self.lane_varying(b, i) - self.lane_varying(a, i)
    }

    /// Vertical finite difference of varying `i` across the quad column
    pub fn dfdy(&self, i: usize) -> f32 {
        let (a, b) = if self.lane % 2 == 0 { (0, 2) } else { (1, 3) };
        self.lane_varying(b, i) - self.lane_varying(a, i)
    }

    /// Mip level for a texture coordinate stored in varyings `uv`, `uv + 1`.
    pub fn texture_lod(&self, uv: usize, texture_size: Vector2<f32>) -> f32 {
        let dx = Vector2::new(self.dfdx(uv), self.dfdx(uv + 1)).component_mul(&texture_size);
        let dy = Vector2::new(self.dfdy(uv), self.dfdy(uv + 1)).component_mul(&texture_size);
        let rho = dx.norm_squared().max(dy.norm_squared()).sqrt();
        if rho <= 0.0 {
            return 0.0;
        }
        rho.log2().max(0.0)
    }
}

/// A compiled shader program: the vertex stage writes `varyings_count()`
/// floats per vertex, the fragment stage reads them back interpolated.
pub trait ShaderProgram: Send + Sync {
    fn varyings_count(&self) -> usize;

    /// Returns the clip-space position.
    fn vertex_shader(
        &self,
        input: &VertexInput<'_>,
        resources: &ShaderResources,
        varyings: &mut [f32],
    ) -> Vector4<f32>;

    fn fragment_shader(&self, input: &FragmentInput<'_>, resources: &ShaderResources)
    -> FragmentOutput;

    /// Side of the square rasterized for point primitives
    fn point_size(&self, _resources: &ShaderResources) -> f32 {
        1.0
    }

    /// Programs that return a fragment depth disable early depth testing.
    fn writes_depth(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_block_round_trips_matrices() {
        let mut block = UniformBlock::new("transform", 20);
        let m = Matrix4::new(
            1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0,
        );
        block.set_mat4(0, &m);
        block.set_vec4(16, &Vector4::new(1.0, 0.5, 0.25, 0.0));
        assert_eq!(block.mat4(0), m);
        assert_eq!(block.vec4(16).y, 0.5);
        block.set_data(18, &[9.0, 9.0, 9.0]);
        assert_eq!(block.float(19), 9.0);
        assert_eq!(block.float(20), 0.0);
    }

    #[test]
    fn derivatives_are_quad_differences() {
        let lanes: [&[f32]; 4] = [&[0.0, 0.0], &[1.0, 0.0], &[0.0, 2.0], &[1.0, 2.0]];
        for lane in 0..4 {
            let input = FragmentInput {
                frag_coord: Vector4::zeros(),
                front_facing: true,
                lane,
                quad_varyings: lanes,
            };
            assert_eq!(input.dfdx(0), 1.0);
            assert_eq!(input.dfdy(1), 2.0);
            assert_eq!(input.dfdy(0), 0.0);
        }
    }

    #[test]
    fn lod_grows_with_texel_footprint() {
        let lanes: [&[f32]; 4] = [&[0.0, 0.0], &[0.25, 0.0], &[0.0, 0.25], &[0.25, 0.25]];
        let input = FragmentInput {
            frag_coord: Vector4::zeros(),
            front_facing: true,
            lane: 0,
            quad_varyings: lanes,
        };
        // a quarter of a 16-texel texture per pixel: 4 texels, lod 2
        let lod = input.texture_lod(0, Vector2::new(16.0, 16.0));
        assert!((lod - 2.0).abs() < 1e-5);
        let flat = FragmentInput {
            quad_varyings: [&[0.5, 0.5]; 4],
            ..input
        };
        assert_eq!(flat.texture_lod(0, Vector2::new(16.0, 16.0)), 0.0);
    }
}
