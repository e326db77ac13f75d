//! Scene geometry drawn by the headless viewer.

use crate::core::render_states::PrimitiveType;
use crate::core::vertex::{VertexArray, VertexAttributeDesc};
use crate::geometry::bounding_box::BoundingBox;
use nalgebra::{Matrix4, Point3, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Attribute locations of [`Vertex`] in the interleaved vertex buffer
pub const ATTRIBUTE_POSITION: usize = 0;
pub const ATTRIBUTE_NORMAL: usize = 1;
pub const ATTRIBUTE_COLOR: usize = 2;

const FLOATS_PER_VERTEX: usize = 9;
const VERTEX_BYTES: usize = FLOATS_PER_VERTEX * std::mem::size_of::<f32>();

const VERTEX_ATTRIBUTES: [VertexAttributeDesc; 3] = [
    VertexAttributeDesc {
        size: 3,
        stride: VERTEX_BYTES,
        offset: 0,
    },
    VertexAttributeDesc {
        size: 3,
        stride: VERTEX_BYTES,
        offset: 3 * 4,
    },
    VertexAttributeDesc {
        size: 3,
        stride: VERTEX_BYTES,
        offset: 6 * 4,
    },
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: Point3<f32>,
    /// Zero for unlit helper geometry
    pub normal: Vector3<f32>,
    pub color: Vector3<f32>,
}

impl Vertex {
    pub fn new(position: Point3<f32>, normal: Vector3<f32>, color: Vector3<f32>) -> Self {
        Self {
            position,
            normal,
            color,
        }
    }

    pub fn unlit(position: Point3<f32>, color: Vector3<f32>) -> Self {
        Self::new(position, Vector3::zeros(), color)
    }
}

/// Indexed geometry of one primitive type
#[derive(Debug, Clone)]
pub struct Mesh {
    pub name: String,
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub primitive_type: PrimitiveType,
    /// Rasterized point side for point meshes
    pub point_size: f32,
    /// Helper geometry: depth tested, never written, always filled
    pub overlay: bool,
}

impl Mesh {
    pub fn new(
        name: &str,
        vertices: Vec<Vertex>,
        indices: Vec<u32>,
        primitive_type: PrimitiveType,
    ) -> Self {
        Self {
            name: name.to_string(),
            vertices,
            indices,
            primitive_type,
            point_size: 1.0,
            overlay: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.indices.is_empty()
    }

    pub fn primitive_count(&self) -> usize {
        self.indices.len() / self.primitive_type.vertex_count()
    }

    /// Local-space bounds; `None` for a mesh without vertices.
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        let points: Vec<Point3<f32>> = self.vertices.iter().map(|v| v.position).collect();
        BoundingBox::from_points(&points)
    }

    /// Interleaved `position, normal, color` floats.
    pub fn vertex_buffer(&self) -> Vec<f32> {
        let mut data = Vec::with_capacity(self.vertices.len() * FLOATS_PER_VERTEX);
        for v in &self.vertices {
            data.extend_from_slice(v.position.coords.as_slice());
            data.extend_from_slice(v.normal.as_slice());
            data.extend_from_slice(v.color.as_slice());
        }
        data
    }

    /// Borrowed description for `Renderer::create_vertex_array_object`.
    pub fn vertex_array<'a>(&'a self, vertex_buffer: &'a [f32]) -> VertexArray<'a> {
        VertexArray {
            vertex_size: VERTEX_BYTES,
            attributes: &VERTEX_ATTRIBUTES,
            vertex_buffer,
            index_buffer: &self.indices,
        }
    }

    /// Gives every triangle its own vertices and a color seeded by the face
    /// index, so the same mesh always comes out the same.
    pub fn colorize(&mut self) {
        if self.primitive_type != PrimitiveType::Triangle {
            return;
        }
        let mut vertices = Vec::with_capacity(self.indices.len());
        for (face_index, face) in self.indices.chunks_exact(3).enumerate() {
            let color = face_color(face_index);
            for &i in face {
                if let Some(v) = self.vertices.get(i as usize) {
                    vertices.push(Vertex { color, ..*v });
                }
            }
        }
        self.indices = (0..vertices.len() as u32).collect();
        self.vertices = vertices;
    }
}

/// Pseudo-random color in `[0.3, 0.7)` per channel, fixed for a face index.
pub fn face_color(face_index: usize) -> Vector3<f32> {
    let mut rng = StdRng::seed_from_u64(face_index as u64);
    Vector3::new(
        0.3 + rng.random::<f32>() * 0.4,
        0.3 + rng.random::<f32>() * 0.4,
        0.3 + rng.random::<f32>() * 0.4,
    )
}

/// Node of the model tree; owns its meshes and its children.
#[derive(Debug, Clone)]
pub struct ModelNode {
    pub name: String,
    /// Relative to the parent node
    pub transform: Matrix4<f32>,
    pub meshes: Vec<Mesh>,
    pub children: Vec<ModelNode>,
}

impl ModelNode {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            transform: Matrix4::identity(),
            meshes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_mesh(name: &str, mesh: Mesh) -> Self {
        let mut node = Self::new(name);
        node.meshes.push(mesh);
        node
    }

    pub fn add_child(&mut self, child: ModelNode) {
        self.children.push(child);
    }

    /// Calls `f` for every mesh with its world transform, parents first.
    pub fn visit_meshes<'a, F>(&'a self, parent: &Matrix4<f32>, f: &mut F)
    where
        F: FnMut(&'a Mesh, &Matrix4<f32>),
    {
        let world = parent * self.transform;
        for mesh in &self.meshes {
            f(mesh, &world);
        }
        for child in &self.children {
            child.visit_meshes(&world, f);
        }
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len() + self.children.iter().map(ModelNode::mesh_count).sum::<usize>()
    }

    /// World-space bounds of the whole tree
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        let mut bounds: Option<BoundingBox> = None;
        self.visit_meshes(&Matrix4::identity(), &mut |mesh, world| {
            if let Some(local) = mesh.bounding_box() {
                let b = local.transform(world);
                match bounds.as_mut() {
                    Some(acc) => acc.merge(&b),
                    None => bounds = Some(b),
                }
            }
        });
        bounds
    }

    pub fn colorize(&mut self) {
        for mesh in &mut self.meshes {
            mesh.colorize();
        }
        for child in &mut self.children {
            child.colorize();
        }
    }

    /// Unit cube centered at the origin, flat normals, counter-clockwise
    /// faces seen from outside.
    pub fn cube(color: Vector3<f32>) -> Self {
        let faces: [(Vector3<f32>, Vector3<f32>, Vector3<f32>); 6] = [
            (Vector3::x(), Vector3::y(), -Vector3::z()),
            (-Vector3::x(), Vector3::y(), Vector3::z()),
            (Vector3::y(), -Vector3::z(), Vector3::x()),
            (-Vector3::y(), Vector3::z(), Vector3::x()),
            (Vector3::z(), Vector3::y(), Vector3::x()),
            (-Vector3::z(), Vector3::y(), -Vector3::x()),
        ];
        let mut vertices = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);
        for (normal, up, right) in faces {
            let base = vertices.len() as u32;
            let center = normal * 0.5;
            for (u, v) in [(-0.5, -0.5), (0.5, -0.5), (0.5, 0.5), (-0.5, 0.5)] {
                let p = center + right * u + up * v;
                vertices.push(Vertex::new(Point3::from(p), normal, color));
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }
        Self::with_mesh("cube", Mesh::new("cube", vertices, indices, PrimitiveType::Triangle))
    }

    /// Grid lines on the XZ plane plus red, green and blue axes.
    pub fn world_axis(half_extent: i32) -> Self {
        let extent = half_extent as f32;
        let grid = Vector3::new(0.35, 0.35, 0.35);
        let mut vertices = Vec::new();
        for i in -half_extent..=half_extent {
            let t = i as f32;
            vertices.push(Vertex::unlit(Point3::new(t, 0.0, -extent), grid));
            vertices.push(Vertex::unlit(Point3::new(t, 0.0, extent), grid));
            vertices.push(Vertex::unlit(Point3::new(-extent, 0.0, t), grid));
            vertices.push(Vertex::unlit(Point3::new(extent, 0.0, t), grid));
        }
        for axis in 0..3 {
            let mut color = Vector3::zeros();
            color[axis] = 1.0;
            let mut end = Point3::origin();
            end[axis] = extent;
            vertices.push(Vertex::unlit(Point3::origin(), color));
            vertices.push(Vertex::unlit(end, color));
        }
        let indices = (0..vertices.len() as u32).collect();
        let mut mesh = Mesh::new("world_axis", vertices, indices, PrimitiveType::Line);
        mesh.overlay = true;
        Self::with_mesh("world_axis", mesh)
    }

    /// Square floor facing +Y at height `y`.
    pub fn floor(half_extent: f32, y: f32, color: Vector3<f32>) -> Self {
        let n = Vector3::y();
        let e = half_extent;
        let vertices = vec![
            Vertex::new(Point3::new(-e, y, e), n, color),
            Vertex::new(Point3::new(e, y, e), n, color),
            Vertex::new(Point3::new(e, y, -e), n, color),
            Vertex::new(Point3::new(-e, y, -e), n, color),
        ];
        let indices = vec![0, 1, 2, 0, 2, 3];
        Self::with_mesh("floor", Mesh::new("floor", vertices, indices, PrimitiveType::Triangle))
    }

    /// Single point marking the light position.
    pub fn light_point(position: Point3<f32>, color: Vector3<f32>) -> Self {
        let mut mesh = Mesh::new(
            "light",
            vec![Vertex::unlit(position, color)],
            vec![0],
            PrimitiveType::Point,
        );
        mesh.point_size = 10.0;
        mesh.overlay = true;
        Self::with_mesh("light", mesh)
    }
}
