//! 2x2 pixel quad sampling state for triangle rasterization.

use crate::core::thread_pool::Rect;
use nalgebra::{Vector2, Vector3, Vector4};

/// Sub-pixel sample positions relative to the pixel's top-left corner
pub struct SamplePattern {
    pub offsets: &'static [(f32, f32)],
}

impl SamplePattern {
    /// Rotated grid for 4x, pixel center otherwise
    pub fn get_pattern(sample_count: usize) -> Self {
        match sample_count {
            4 => Self {
                offsets: &[(0.375, 0.875), (0.875, 0.625), (0.125, 0.375), (0.625, 0.125)],
            },
            _ => Self {
                offsets: &[(0.5, 0.5)],
            },
        }
    }
}

/// Index of the pixel-center sample when multisampling
pub const CENTER_SAMPLE: usize = 4;
const MAX_SAMPLES: usize = 5;

#[derive(Debug, Clone, Copy, Default)]
pub struct SampleContext {
    pub inside: bool,
    /// Framebuffer pixel the sample belongs to
    pub fb_pos: (usize, usize),
    /// Window-space position
    pub position: Vector2<f32>,
    /// Perspective-corrected weights
    pub barycentric: Vector3<f32>,
    /// Window depth, linear in screen space
    pub depth: f32,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PixelContext {
    pub inside: bool,
    /// Covered real samples (the center sample is not counted)
    pub coverage: usize,
    pub samples: [SampleContext; MAX_SAMPLES],
    /// Sample whose attributes drive the fragment shader
    pub shading_sample: usize,
}

impl PixelContext {
    pub fn shading(&self) -> &SampleContext {
        &self.samples[self.shading_sample]
    }
}

/// Per-worker quad scratch. Lanes are `0 = (x, y)`, `1 = (x + 1, y)`,
/// `2 = (x, y + 1)`, `3 = (x + 1, y + 1)`.
#[derive(Debug, Clone)]
pub struct PixelQuadContext {
    pub pixels: [PixelContext; 4],
    pub front_facing: bool,
    sample_count: usize,
    /// Real samples plus the center when multisampling
    stored_samples: usize,

    vert_pos: [Vector2<f32>; 3],
    vert_z: Vector3<f32>,
    vert_w: Vector3<f32>,
    inv_area: f32,

    varyings_count: usize,
    varyings_pool: Vec<f32>,
}

impl PixelQuadContext {
    pub fn new(varyings_count: usize, sample_count: usize) -> Self {
        let stored_samples = if sample_count > 1 {
            sample_count + 1
        } else {
            1
        };
        Self {
            pixels: [PixelContext::default(); 4],
            front_facing: true,
            sample_count,
            stored_samples,
            vert_pos: [Vector2::zeros(); 3],
            vert_z: Vector3::zeros(),
            vert_w: Vector3::zeros(),
            inv_area: 0.0,
            varyings_count,
            varyings_pool: vec![0.0; 4 * varyings_count],
        }
    }

    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    /// Binds a triangle given its window positions (`w` holding 1/w_clip).
    /// Returns `false` for a zero-area triangle.
    pub fn set_triangle(&mut self, frag_pos: [&Vector4<f32>; 3], front_facing: bool) -> bool {
        self.vert_pos = frag_pos.map(|p| Vector2::new(p.x, p.y));
        self.vert_z = Vector3::new(frag_pos[0].z, frag_pos[1].z, frag_pos[2].z);
        self.vert_w = Vector3::new(frag_pos[0].w, frag_pos[1].w, frag_pos[2].w);
        self.front_facing = front_facing;
        let area = edge(&self.vert_pos[0], &self.vert_pos[1], &self.vert_pos[2]);
        if area == 0.0 {
            self.inv_area = 0.0;
            return false;
        }
        self.inv_area = 1.0 / area;
        true
    }

    /// Screen-space barycentric weights of `p`
    #[inline]
    pub fn barycentric(&self, p: &Vector2<f32>) -> Vector3<f32> {
        let [v0, v1, v2] = &self.vert_pos;
        Vector3::new(
            edge(v1, v2, p) * self.inv_area,
            edge(v2, v0, p) * self.inv_area,
            edge(v0, v1, p) * self.inv_area,
        )
    }

    /// Places the quad with its top-left pixel at (`x`, `y`).
    pub fn init(&mut self, x: usize, y: usize) {
        let pattern = SamplePattern::get_pattern(self.sample_count);
        for (lane, pixel) in self.pixels.iter_mut().enumerate() {
            let px = x + (lane & 1);
            let py = y + (lane >> 1);
            for (i, (dx, dy)) in pattern.offsets.iter().enumerate() {
                pixel.samples[i].fb_pos = (px, py);
                pixel.samples[i].position = Vector2::new(px as f32 + dx, py as f32 + dy);
            }
            if self.stored_samples > pattern.offsets.len() {
                let center = &mut pixel.samples[CENTER_SAMPLE];
                center.fb_pos = (px, py);
                center.position = Vector2::new(px as f32 + 0.5, py as f32 + 0.5);
            }
        }
    }

    /// Evaluates every sample of the quad against the bound triangle.
    /// Pixels outside `bounds` never count as covered. Returns `true` when
    /// at least one sample of the quad is covered.
    pub fn evaluate_coverage(&mut self, bounds: &Rect) -> bool {
        let mut any = false;
        for lane in 0..4 {
            let mut pixel = self.pixels[lane];
            let (px, py) = pixel.samples[0].fb_pos;
            let in_bounds = bounds.contains(px, py);

            for s in 0..self.stored_samples {
                let sample = &mut pixel.samples[s];
                let bc = self.barycentric(&sample.position);
                sample.inside = in_bounds && bc.x >= 0.0 && bc.y >= 0.0 && bc.z >= 0.0;
                sample.depth = bc.dot(&self.vert_z);
                sample.barycentric = self.perspective_correct(&bc);
            }

            if self.sample_count > 1 {
                pixel.coverage = pixel.samples[..self.sample_count]
                    .iter()
                    .filter(|s| s.inside)
                    .count();
                pixel.inside = pixel.coverage > 0;
                pixel.shading_sample = if pixel.samples[CENTER_SAMPLE].inside {
                    CENTER_SAMPLE
                } else {
                    pixel.samples[..self.sample_count]
                        .iter()
                        .position(|s| s.inside)
                        .unwrap_or(CENTER_SAMPLE)
                };
            } else {
                pixel.inside = pixel.samples[0].inside;
                pixel.coverage = usize::from(pixel.inside);
                pixel.shading_sample = 0;
            }

            any |= pixel.inside;
            self.pixels[lane] = pixel;
        }
        any
    }

    #[inline]
    fn perspective_correct(&self, bc: &Vector3<f32>) -> Vector3<f32> {
        let weighted = bc.component_mul(&self.vert_w);
        let sum = weighted.x + weighted.y + weighted.z;
        if sum == 0.0 {
            return *bc;
        }
        weighted / sum
    }

    /// Interpolates the vertex varyings at each lane's shading sample.
    pub fn interpolate_varyings(&mut self, vertex_varyings: [&[f32]; 3]) {
        let vc = self.varyings_count;
        if vc == 0 {
            return;
        }
        for lane in 0..4 {
            let bc = self.pixels[lane].shading().barycentric;
            let out = &mut self.varyings_pool[lane * vc..(lane + 1) * vc];
            for (i, v) in out.iter_mut().enumerate() {
                *v = bc.x * vertex_varyings[0][i]
                    + bc.y * vertex_varyings[1][i]
                    + bc.z * vertex_varyings[2][i];
            }
        }
    }

    /// Interpolated varyings of all four lanes
    pub fn quad_varyings(&self) -> [&[f32]; 4] {
        let vc = self.varyings_count;
        [0, 1, 2, 3].map(|lane| &self.varyings_pool[lane * vc..(lane + 1) * vc])
    }

    /// Window position and depth of a lane's shading sample, with 1/w
    pub fn frag_coord(&self, lane: usize) -> Vector4<f32> {
        let sample = self.pixels[lane].shading();
        let inv_w = sample.barycentric.dot(&self.vert_w);
        Vector4::new(sample.position.x, sample.position.y, sample.depth, inv_w)
    }
}

/// Twice the signed area of (a, b, p)
#[inline]
fn edge(a: &Vector2<f32>, b: &Vector2<f32>, p: &Vector2<f32>) -> f32 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}
