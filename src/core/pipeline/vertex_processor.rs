//! Per-draw geometry: vertex shading, primitive assembly and the
//! single-threaded stages that run before rasterization.

use crate::core::pipeline::viewport::Viewport;
use crate::core::render_states::{PolygonMode, PrimitiveType};
use crate::core::shader::{ShaderProgram, ShaderResources};
use crate::core::vertex::VertexArrayObject;
use nalgebra::{Vector3, Vector4};

/// One post-transform vertex
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexHolder {
    pub discard: bool,
    /// Index of the source vertex in the vertex array
    pub index: usize,
    pub clip_pos: Vector4<f32>,
    /// Window x, y, depth and 1/w after the viewport transform
    pub frag_pos: Vector4<f32>,
    pub clip_mask: u8,
}

impl VertexHolder {
    fn new(index: usize, clip_pos: Vector4<f32>) -> Self {
        Self {
            discard: false,
            index,
            clip_pos,
            frag_pos: Vector4::zeros(),
            clip_mask: 0,
        }
    }
}

/// One point, line or triangle; unused index slots repeat the last vertex
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrimitiveHolder {
    pub discard: bool,
    pub front_facing: bool,
    pub indices: [usize; 3],
}

impl PrimitiveHolder {
    pub fn new(indices: [usize; 3]) -> Self {
        Self {
            discard: false,
            front_facing: true,
            indices,
        }
    }
}

/// Vertex and primitive lists of the draw in flight. Varyings live in one
/// flat arena, `varyings_count` floats per vertex, so clipping can append
/// vertices without allocating per vertex.
#[derive(Debug, Clone, Default)]
pub struct GeometryBuffers {
    pub varyings_count: usize,
    pub primitive_type: PrimitiveType,
    pub vertices: Vec<VertexHolder>,
    pub varyings: Vec<f32>,
    pub primitives: Vec<PrimitiveHolder>,
}

impl GeometryBuffers {
    /// Clears the lists, keeping their allocations.
    pub fn reset(&mut self, varyings_count: usize, primitive_type: PrimitiveType) {
        self.varyings_count = varyings_count;
        self.primitive_type = primitive_type;
        self.vertices.clear();
        self.varyings.clear();
        self.primitives.clear();
    }

    #[inline]
    pub fn vertex_varyings(&self, vertex: usize) -> &[f32] {
        let n = self.varyings_count;
        &self.varyings[vertex * n..(vertex + 1) * n]
    }

    pub fn live_primitives(&self) -> impl Iterator<Item = &PrimitiveHolder> {
        self.primitives.iter().filter(|p| !p.discard)
    }

    pub fn live_primitive_count(&self) -> usize {
        self.live_primitives().count()
    }

    /// Appends the vertex `a + (b - a) * t`, interpolating clip position and
    /// varyings, and returns its index.
    pub fn interpolate_vertex(&mut self, a: usize, b: usize, t: f32) -> usize {
        let va = self.vertices[a];
        let vb = self.vertices[b];
        let vertex = VertexHolder::new(va.index, va.clip_pos.lerp(&vb.clip_pos, t));

        let n = self.varyings_count;
        let start = self.varyings.len();
        self.varyings.reserve(n);
        for i in 0..n {
            let (x, y) = (self.varyings[a * n + i], self.varyings[b * n + i]);
            self.varyings.push(x + (y - x) * t);
        }
        debug_assert_eq!(start, self.vertices.len() * n);
        self.vertices.push(vertex);
        self.vertices.len() - 1
    }

    /// Runs the vertex stage once for every vertex of the array.
    pub fn shade_vertices(
        &mut self,
        vao: &VertexArrayObject,
        program: &dyn ShaderProgram,
        resources: &ShaderResources,
    ) {
        let n = self.varyings_count;
        let count = vao.vertex_count();
        self.vertices.reserve(count);
        self.varyings.resize(count * n, 0.0);
        for index in 0..count {
            let Some(input) = vao.vertex(index) else {
                break;
            };
            let out = &mut self.varyings[index * n..(index + 1) * n];
            let clip_pos = program.vertex_shader(&input, resources, out);
            self.vertices.push(VertexHolder::new(index, clip_pos));
        }
    }

    /// Groups indices into primitives of the current type. Incomplete
    /// trailing groups and groups with out-of-range indices are dropped.
    /// Returns the number of dropped groups.
    pub fn assemble(&mut self, indices: &[u32]) -> usize {
        let per = self.primitive_type.vertex_count();
        let count = self.vertices.len();
        let mut dropped = 0;
        self.primitives.reserve(indices.len() / per);
        for group in indices.chunks(per) {
            if group.len() < per || group.iter().any(|&i| i as usize >= count) {
                dropped += 1;
                continue;
            }
            let a = group[0] as usize;
            let b = group.get(1).map_or(a, |&i| i as usize);
            let c = group.get(2).map_or(b, |&i| i as usize);
            self.primitives.push(PrimitiveHolder::new([a, b, c]));
        }
        dropped
    }

    /// Flags every vertex not referenced by a surviving primitive.
    pub fn mark_used_vertices(&mut self) {
        for v in self.vertices.iter_mut() {
            v.discard = true;
        }
        for p in self.primitives.iter().filter(|p| !p.discard) {
            for &i in &p.indices {
                self.vertices[i].discard = false;
            }
        }
    }

    /// `frag = clip / w` with `frag.w = 1 / w`.
    pub fn perspective_divide(&mut self) {
        for v in self.vertices.iter_mut().filter(|v| !v.discard) {
            let inv_w = 1.0 / v.clip_pos.w;
            v.frag_pos = v.clip_pos * inv_w;
            v.frag_pos.w = inv_w;
        }
    }

    pub fn viewport_transform(&mut self, viewport: &Viewport) {
        for v in self.vertices.iter_mut().filter(|v| !v.discard) {
            v.frag_pos = viewport.transform(&v.frag_pos);
        }
    }

    /// Sets the facing of triangles from their window-space winding
    /// (counter-clockwise is front), discards zero-area triangles and, when
    /// `cull_back` is set, back faces. Zero-length lines are discarded too.
    /// Returns the number of primitives removed.
    pub fn cull_faces(&mut self, cull_back: bool) -> usize {
        let mut culled = 0;
        match self.primitive_type {
            PrimitiveType::Triangle => {
                for p in self.primitives.iter_mut().filter(|p| !p.discard) {
                    let [a, b, c] = p.indices.map(|i| self.vertices[i].frag_pos.xyz());
                    let area = signed_area(&a, &b, &c);
                    p.front_facing = area > 0.0;
                    if area == 0.0 || (cull_back && !p.front_facing) {
                        p.discard = true;
                        culled += 1;
                    }
                }
            }
            PrimitiveType::Line => {
                for p in self.primitives.iter_mut().filter(|p| !p.discard) {
                    let a = self.vertices[p.indices[0]].frag_pos;
                    let b = self.vertices[p.indices[1]].frag_pos;
                    if a.x == b.x && a.y == b.y {
                        p.discard = true;
                        culled += 1;
                    }
                }
            }
            PrimitiveType::Point => {}
        }
        culled
    }

    /// Rewrites surviving triangles as their edges or corners for the
    /// line and point polygon modes.
    pub fn expand_polygon_mode(&mut self, mode: PolygonMode) {
        if self.primitive_type != PrimitiveType::Triangle || mode == PolygonMode::Fill {
            return;
        }
        let triangles = std::mem::take(&mut self.primitives);
        for tri in triangles.iter().filter(|p| !p.discard) {
            let [a, b, c] = tri.indices;
            let parts: [[usize; 3]; 3] = match mode {
                PolygonMode::Line => [[a, b, b], [b, c, c], [c, a, a]],
                _ => [[a, a, a], [b, b, b], [c, c, c]],
            };
            for indices in parts {
                self.primitives.push(PrimitiveHolder {
                    discard: false,
                    front_facing: tri.front_facing,
                    indices,
                });
            }
        }
        self.primitive_type = match mode {
            PolygonMode::Line => PrimitiveType::Line,
            _ => PrimitiveType::Point,
        };
    }
}

/// z of `(b - a) x (c - a)`: twice the signed window-space area
#[inline]
pub fn signed_area(a: &Vector3<f32>, b: &Vector3<f32>, c: &Vector3<f32>) -> f32 {
    (b - a).cross(&(c - a)).z
}
