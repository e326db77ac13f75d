//! Homogeneous clip-space clipping against the six view-volume planes.

use crate::core::pipeline::vertex_processor::{GeometryBuffers, PrimitiveHolder};
use crate::core::render_states::PrimitiveType;
use crate::geometry::frustum::{CLIP_PLANE_COUNT, clip_mask, clip_plane};

/// Computes every vertex's clip mask, then trivially rejects, keeps or
/// clips each primitive. Triangles clipped into polygons are split into a
/// fan: the first triangle reuses the primitive slot, the rest are appended.
/// Returns the number of primitives discarded.
pub fn clip_primitives(geo: &mut GeometryBuffers) -> usize {
    for v in geo.vertices.iter_mut() {
        v.clip_mask = clip_mask(&v.clip_pos);
    }

    let mut discarded = 0;
    let original = geo.primitives.len();
    for i in 0..original {
        if geo.primitives[i].discard {
            continue;
        }
        let keep = match geo.primitive_type {
            PrimitiveType::Point => clip_point(geo, i),
            PrimitiveType::Line => clip_line(geo, i),
            PrimitiveType::Triangle => clip_triangle(geo, i),
        };
        if !keep {
            geo.primitives[i].discard = true;
            discarded += 1;
        }
    }
    discarded
}

fn mask_of(geo: &GeometryBuffers, vertex: usize) -> u8 {
    geo.vertices[vertex].clip_mask
}

fn plane_distance(geo: &GeometryBuffers, plane: usize, vertex: usize) -> f32 {
    clip_plane(plane).dot(&geo.vertices[vertex].clip_pos)
}

fn clip_point(geo: &GeometryBuffers, i: usize) -> bool {
    mask_of(geo, geo.primitives[i].indices[0]) == 0
}

/// Parametric clip of the segment to `[t0, t1]`.
fn clip_line(geo: &mut GeometryBuffers, i: usize) -> bool {
    let [a, b, _] = geo.primitives[i].indices;
    let (mask_a, mask_b) = (mask_of(geo, a), mask_of(geo, b));
    if mask_a | mask_b == 0 {
        return true;
    }
    if mask_a & mask_b != 0 {
        return false;
    }

    let (mut t0, mut t1) = (0.0f32, 1.0f32);
    for plane in 0..CLIP_PLANE_COUNT {
        if (mask_a | mask_b) & (1 << plane) == 0 {
            continue;
        }
        let da = plane_distance(geo, plane, a);
        let db = plane_distance(geo, plane, b);
        if da < 0.0 && db < 0.0 {
            return false;
        }
        if da < 0.0 {
            t0 = t0.max(da / (da - db));
        } else if db < 0.0 {
            t1 = t1.min(da / (da - db));
        }
    }
    if t0 >= t1 {
        return false;
    }

    let new_a = if mask_a != 0 {
        geo.interpolate_vertex(a, b, t0)
    } else {
        a
    };
    let new_b = if mask_b != 0 {
        geo.interpolate_vertex(a, b, t1)
    } else {
        b
    };
    geo.primitives[i].indices = [new_a, new_b, new_b];
    true
}

/// Sutherland-Hodgman against each plane any vertex violates.
fn clip_triangle(geo: &mut GeometryBuffers, i: usize) -> bool {
    let indices = geo.primitives[i].indices;
    let masks = indices.map(|v| mask_of(geo, v));
    let any = masks[0] | masks[1] | masks[2];
    if any == 0 {
        return true;
    }
    if masks[0] & masks[1] & masks[2] != 0 {
        return false;
    }

    let mut polygon: Vec<usize> = indices.to_vec();
    let mut next: Vec<usize> = Vec::with_capacity(9);
    for plane in 0..CLIP_PLANE_COUNT {
        if any & (1 << plane) == 0 {
            continue;
        }
        if polygon.len() < 3 {
            return false;
        }
        next.clear();
        let mut prev = polygon[polygon.len() - 1];
        let mut d_prev = plane_distance(geo, plane, prev);
        for &curr in &polygon {
            let d = plane_distance(geo, plane, curr);
            if (d_prev < 0.0) != (d < 0.0) {
                let t = d_prev / (d_prev - d);
                next.push(geo.interpolate_vertex(prev, curr, t));
            }
            if d >= 0.0 {
                next.push(curr);
            }
            prev = curr;
            d_prev = d;
        }
        std::mem::swap(&mut polygon, &mut next);
    }
    if polygon.len() < 3 {
        return false;
    }

    let front_facing = geo.primitives[i].front_facing;
    geo.primitives[i].indices = [polygon[0], polygon[1], polygon[2]];
    for k in 3..polygon.len() {
        geo.primitives.push(PrimitiveHolder {
            discard: false,
            front_facing,
            indices: [polygon[0], polygon[k - 1], polygon[k]],
        });
    }
    true
}
