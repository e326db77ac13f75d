use crate::core::log_context::LogContext;
use nalgebra::{Vector2, Vector3, Vector4};

/// One float attribute inside an interleaved vertex: component count plus
/// stride and offset in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttributeDesc {
    pub size: usize,
    pub stride: usize,
    pub offset: usize,
}

/// Caller-side description of vertex data. The renderer copies the
/// buffers when it builds a [`VertexArrayObject`].
#[derive(Debug, Clone, Copy)]
pub struct VertexArray<'a> {
    /// Bytes per vertex
    pub vertex_size: usize,
    pub attributes: &'a [VertexAttributeDesc],
    pub vertex_buffer: &'a [f32],
    pub index_buffer: &'a [u32],
}

/// Attribute location in floats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AttributeLayout {
    size: usize,
    offset: usize,
}

/// Owned copy of vertex and index data bound for drawing.
#[derive(Debug, Clone)]
pub struct VertexArrayObject {
    vertex_stride: usize,
    vertex_count: usize,
    attributes: Vec<AttributeLayout>,
    vertices: Vec<f32>,
    indices: Vec<u32>,
    log: LogContext,
}

const FLOAT_SIZE: usize = std::mem::size_of::<f32>();

impl VertexArrayObject {
    /// Validates the layout and copies both buffers.
    pub fn new(array: &VertexArray<'_>, log: LogContext) -> Option<Self> {
        if array.vertex_size == 0 || array.vertex_size % FLOAT_SIZE != 0 {
            log.error(format_args!(
                "vertex array: vertex size {} is not a positive multiple of {}",
                array.vertex_size, FLOAT_SIZE
            ));
            return None;
        }
        let vertex_stride = array.vertex_size / FLOAT_SIZE;

        let mut attributes = Vec::with_capacity(array.attributes.len());
        for (location, desc) in array.attributes.iter().enumerate() {
            let aligned = desc.offset % FLOAT_SIZE == 0 && desc.stride % FLOAT_SIZE == 0;
            let offset = desc.offset / FLOAT_SIZE;
            if !aligned || desc.size == 0 || desc.size > 4 || offset + desc.size > vertex_stride {
                log.error(format_args!(
                    "vertex array: attribute {} (size {}, stride {}, offset {}) does not fit a {}-byte vertex",
                    location, desc.size, desc.stride, desc.offset, array.vertex_size
                ));
                return None;
            }
            if desc.stride != array.vertex_size {
                log.warn(format_args!(
                    "vertex array: attribute {} stride {} differs from vertex size {}, using vertex size",
                    location, desc.stride, array.vertex_size
                ));
            }
            attributes.push(AttributeLayout {
                size: desc.size,
                offset,
            });
        }

        let vertex_count = array.vertex_buffer.len() / vertex_stride;
        if let Some(&bad) = array.index_buffer.iter().find(|&&i| i as usize >= vertex_count) {
            log.warn(format_args!(
                "vertex array: index {} out of range for {} vertices, primitives using it are dropped",
                bad, vertex_count
            ));
        }

        Some(Self {
            vertex_stride,
            vertex_count,
            attributes,
            vertices: array.vertex_buffer[..vertex_count * vertex_stride].to_vec(),
            indices: array.index_buffer.to_vec(),
            log,
        })
    }

    /// Overwrites the start of the vertex data. Extra floats beyond the
    /// allocated size are ignored; returns `false` when that happens.
    pub fn update_vertex_data(&mut self, data: &[f32]) -> bool {
        let n = data.len().min(self.vertices.len());
        self.vertices[..n].copy_from_slice(&data[..n]);
        if n < data.len() {
            self.log.warn(format_args!(
                "vertex array: update of {} floats truncated to {}",
                data.len(),
                n
            ));
            return false;
        }
        true
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn attribute_count(&self) -> usize {
        self.attributes.len()
    }

    pub fn vertex(&self, index: usize) -> Option<VertexInput<'_>> {
        if index >= self.vertex_count {
            return None;
        }
        let start = index * self.vertex_stride;
        Some(VertexInput {
            data: &self.vertices[start..start + self.vertex_stride],
            attributes: &self.attributes,
        })
    }
}

/// Attribute view of one vertex, handed to the vertex shader
#[derive(Debug, Clone, Copy)]
pub struct VertexInput<'a> {
    data: &'a [f32],
    attributes: &'a [AttributeLayout],
}

impl<'a> VertexInput<'a> {
    /// Raw components of attribute `location`; empty if it does not exist.
    pub fn attribute(&self, location: usize) -> &'a [f32] {
        match self.attributes.get(location) {
            Some(a) => &self.data[a.offset..a.offset + a.size],
            None => &[],
        }
    }

    fn component(&self, location: usize, i: usize, default: f32) -> f32 {
        self.attribute(location).get(i).copied().unwrap_or(default)
    }

    pub fn vec2(&self, location: usize) -> Vector2<f32> {
        Vector2::new(self.component(location, 0, 0.0), self.component(location, 1, 0.0))
    }

    pub fn vec3(&self, location: usize) -> Vector3<f32> {
        Vector3::new(
            self.component(location, 0, 0.0),
            self.component(location, 1, 0.0),
            self.component(location, 2, 0.0),
        )
    }

    /// Missing components default to (0, 0, 0, 1).
    pub fn vec4(&self, location: usize) -> Vector4<f32> {
        Vector4::new(
            self.component(location, 0, 0.0),
            self.component(location, 1, 0.0),
            self.component(location, 2, 0.0),
            self.component(location, 3, 1.0),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> [VertexAttributeDesc; 2] {
        [
            VertexAttributeDesc {
                size: 3,
                stride: 20,
                offset: 0,
            },
            VertexAttributeDesc {
                size: 2,
                stride: 20,
                offset: 12,
            },
        ]
    }

    #[test]
    fn copies_buffers_and_reads_attributes() {
        let attributes = layout();
        let mut vertices = vec![1.0, 2.0, 3.0, 0.5, 0.25, 4.0, 5.0, 6.0, 1.0, 1.0];
        let indices = [0u32, 1, 1];
        let vao = VertexArrayObject::new(
            &VertexArray {
                vertex_size: 20,
                attributes: &attributes,
                vertex_buffer: &vertices,
                index_buffer: &indices,
            },
            LogContext::silent(),
        )
        .unwrap();

        vertices[0] = 100.0;
        let v0 = vao.vertex(0).unwrap();
        assert_eq!(v0.vec3(0), Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(v0.vec4(0), Vector4::new(1.0, 2.0, 3.0, 1.0));
        assert_eq!(v0.vec2(1), Vector2::new(0.5, 0.25));
        assert!(v0.attribute(7).is_empty());
        assert_eq!(vao.vertex_count(), 2);
        assert!(vao.vertex(2).is_none());
    }

    #[test]
    fn update_is_bounded_by_allocation() {
        let attributes = layout();
        let vertices = [0.0f32; 10];
        let mut vao = VertexArrayObject::new(
            &VertexArray {
                vertex_size: 20,
                attributes: &attributes,
                vertex_buffer: &vertices,
                index_buffer: &[0],
            },
            LogContext::silent(),
        )
        .unwrap();
        assert!(vao.update_vertex_data(&[9.0; 5]));
        assert_eq!(vao.vertex(0).unwrap().vec3(0), Vector3::new(9.0, 9.0, 9.0));
        assert!(!vao.update_vertex_data(&[7.0; 12]));
        assert_eq!(vao.vertex(1).unwrap().vec2(1), Vector2::new(7.0, 7.0));
        assert_eq!(vao.vertex_count(), 2);
    }

    #[test]
    fn misaligned_layout_is_rejected() {
        let attributes = [VertexAttributeDesc {
            size: 3,
            stride: 12,
            offset: 2,
        }];
        let array = VertexArray {
            vertex_size: 12,
            attributes: &attributes,
            vertex_buffer: &[0.0; 6],
            index_buffer: &[],
        };
        assert!(VertexArrayObject::new(&array, LogContext::silent()).is_none());
    }
}
