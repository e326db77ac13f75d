//! Shader programs used by the headless viewer.
//!
//! All of them read the `"scene"` uniform block laid out by the offsets
//! below and the vertex layout of [`crate::scene::model::Vertex`].

use crate::core::shader::{
    FragmentInput, FragmentOutput, ShaderProgram, ShaderResources, UniformBlock,
};
use crate::core::vertex::VertexInput;
use crate::scene::model::{ATTRIBUTE_COLOR, ATTRIBUTE_NORMAL, ATTRIBUTE_POSITION};
use nalgebra::{Matrix4, Vector3, Vector4};

pub const SCENE_BLOCK: &str = "scene";

pub const UNIFORM_MVP: usize = 0;
pub const UNIFORM_MODEL: usize = 16;
pub const UNIFORM_NORMAL_MATRIX: usize = 32;
pub const UNIFORM_LIGHT_POSITION: usize = 48;
pub const UNIFORM_LIGHT_COLOR: usize = 52;
pub const UNIFORM_BASE_COLOR: usize = 56;
pub const UNIFORM_POINT_SIZE: usize = 60;
pub const SCENE_BLOCK_SIZE: usize = 64;

const AMBIENT: f32 = 0.15;

/// Typed view over the `"scene"` block
#[derive(Debug, Clone, PartialEq)]
pub struct SceneUniforms {
    pub mvp: Matrix4<f32>,
    pub model: Matrix4<f32>,
    /// Inverse transpose of `model`, upper 3x3 used
    pub normal_matrix: Matrix4<f32>,
    pub light_position: Vector3<f32>,
    pub light_color: Vector3<f32>,
    pub base_color: Vector4<f32>,
    pub point_size: f32,
}

impl Default for SceneUniforms {
    fn default() -> Self {
        Self {
            mvp: Matrix4::identity(),
            model: Matrix4::identity(),
            normal_matrix: Matrix4::identity(),
            light_position: Vector3::new(0.0, 10.0, 0.0),
            light_color: Vector3::new(1.0, 1.0, 1.0),
            base_color: Vector4::new(1.0, 1.0, 1.0, 1.0),
            point_size: 1.0,
        }
    }
}

impl SceneUniforms {
    pub fn to_block(&self) -> UniformBlock {
        let mut block = UniformBlock::new(SCENE_BLOCK, SCENE_BLOCK_SIZE);
        block.set_mat4(UNIFORM_MVP, &self.mvp);
        block.set_mat4(UNIFORM_MODEL, &self.model);
        block.set_mat4(UNIFORM_NORMAL_MATRIX, &self.normal_matrix);
        block.set_vec4(UNIFORM_LIGHT_POSITION, &self.light_position.push(1.0));
        block.set_vec4(UNIFORM_LIGHT_COLOR, &self.light_color.push(1.0));
        block.set_vec4(UNIFORM_BASE_COLOR, &self.base_color);
        block.set_data(UNIFORM_POINT_SIZE, &[self.point_size]);
        block
    }

    /// Resources holding just this block
    pub fn to_resources(&self) -> ShaderResources {
        let mut resources = ShaderResources::new();
        resources.add_block(self.to_block());
        resources
    }
}

fn scene_block(resources: &ShaderResources) -> Option<&UniformBlock> {
    resources.block(SCENE_BLOCK)
}

fn mvp(resources: &ShaderResources) -> Matrix4<f32> {
    scene_block(resources).map_or_else(Matrix4::identity, |b| b.mat4(UNIFORM_MVP))
}

fn scene_point_size(resources: &ShaderResources) -> f32 {
    scene_block(resources)
        .map(|b| b.float(UNIFORM_POINT_SIZE))
        .filter(|s| *s > 0.0)
        .unwrap_or(1.0)
}

/// Constant color from the uniform block.
#[derive(Debug, Clone, Copy, Default)]
pub struct BaseColorShader;

impl ShaderProgram for BaseColorShader {
    fn varyings_count(&self) -> usize {
        0
    }

    fn vertex_shader(
        &self,
        input: &VertexInput<'_>,
        resources: &ShaderResources,
        _varyings: &mut [f32],
    ) -> Vector4<f32> {
        mvp(resources) * input.vec3(ATTRIBUTE_POSITION).push(1.0)
    }

    fn fragment_shader(
        &self,
        _input: &FragmentInput<'_>,
        resources: &ShaderResources,
    ) -> FragmentOutput {
        let color = scene_block(resources)
            .map_or_else(|| Vector4::new(1.0, 1.0, 1.0, 1.0), |b| b.vec4(UNIFORM_BASE_COLOR));
        FragmentOutput::color(color)
    }

    fn point_size(&self, resources: &ShaderResources) -> f32 {
        scene_point_size(resources)
    }
}

/// Vertex color with ambient plus diffuse from one point light. Vertices
/// with a zero normal are passed through unlit.
#[derive(Debug, Clone, Copy, Default)]
pub struct LambertShader;

impl LambertShader {
    const WORLD_POS: usize = 0;
    const NORMAL: usize = 3;
    const COLOR: usize = 6;
}

impl ShaderProgram for LambertShader {
    fn varyings_count(&self) -> usize {
        9
    }

    fn vertex_shader(
        &self,
        input: &VertexInput<'_>,
        resources: &ShaderResources,
        varyings: &mut [f32],
    ) -> Vector4<f32> {
        let position = input.vec3(ATTRIBUTE_POSITION).push(1.0);
        let (mvp, model, normal_matrix) = match scene_block(resources) {
            Some(b) => (
                b.mat4(UNIFORM_MVP),
                b.mat4(UNIFORM_MODEL),
                b.mat4(UNIFORM_NORMAL_MATRIX),
            ),
            None => (Matrix4::identity(), Matrix4::identity(), Matrix4::identity()),
        };
        let world = model * position;
        let normal = (normal_matrix * input.vec3(ATTRIBUTE_NORMAL).push(0.0)).xyz();
        let color = input.vec3(ATTRIBUTE_COLOR);

        varyings[Self::WORLD_POS..Self::WORLD_POS + 3].copy_from_slice(world.xyz().as_slice());
        varyings[Self::NORMAL..Self::NORMAL + 3].copy_from_slice(normal.as_slice());
        varyings[Self::COLOR..Self::COLOR + 3].copy_from_slice(color.as_slice());
        mvp * position
    }

    fn fragment_shader(&self, input: &FragmentInput<'_>, resources: &ShaderResources) -> FragmentOutput {
        let v = |i: usize| Vector3::new(input.varying(i), input.varying(i + 1), input.varying(i + 2));
        let color = v(Self::COLOR);
        let normal = v(Self::NORMAL);
        if normal.norm_squared() < 1e-12 {
            return FragmentOutput::color(color.push(1.0));
        }

        let (light_position, light_color, alpha) = match scene_block(resources) {
            Some(b) => (
                b.vec4(UNIFORM_LIGHT_POSITION).xyz(),
                b.vec4(UNIFORM_LIGHT_COLOR).xyz(),
                b.vec4(UNIFORM_BASE_COLOR).w,
            ),
            None => (Vector3::new(0.0, 10.0, 0.0), Vector3::new(1.0, 1.0, 1.0), 1.0),
        };
        let n = normal.normalize();
        let l = (light_position - v(Self::WORLD_POS)).normalize();
        let diffuse = n.dot(&l).max(0.0);
        let lit = color.component_mul(&(light_color * diffuse + Vector3::repeat(AMBIENT)));
        FragmentOutput::color(lit.push(alpha))
    }

    fn point_size(&self, resources: &ShaderResources) -> f32 {
        scene_point_size(resources)
    }
}

/// Window depth as gray, near is black.
#[derive(Debug, Clone, Copy, Default)]
pub struct DepthShader;

impl ShaderProgram for DepthShader {
    fn varyings_count(&self) -> usize {
        0
    }

    fn vertex_shader(
        &self,
        input: &VertexInput<'_>,
        resources: &ShaderResources,
        _varyings: &mut [f32],
    ) -> Vector4<f32> {
        mvp(resources) * input.vec3(ATTRIBUTE_POSITION).push(1.0)
    }

    fn fragment_shader(&self, input: &FragmentInput<'_>, _resources: &ShaderResources) -> FragmentOutput {
        let d = input.frag_coord.z.clamp(0.0, 1.0);
        FragmentOutput::color(Vector4::new(d, d, d, 1.0))
    }

    fn point_size(&self, resources: &ShaderResources) -> f32 {
        scene_point_size(resources)
    }
}
