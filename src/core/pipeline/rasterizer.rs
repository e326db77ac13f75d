//! Block-parallel rasterization, fragment shading and per-sample output.
//!
//! The target region is split into disjoint blocks; every block walks the
//! full primitive list in submission order, so each pixel sees the same
//! sequence of writes whatever the thread count.

use crate::core::pipeline::fragment_processor::output_color;
use crate::core::pipeline::pixel_quad::{PixelContext, PixelQuadContext};
use crate::core::pipeline::raster_target::{BlockTarget, RasterTarget};
use crate::core::pipeline::vertex_processor::{GeometryBuffers, PrimitiveHolder};
use crate::core::pipeline::viewport::Viewport;
use crate::core::render_states::{PrimitiveType, RenderStates};
use crate::core::shader::{FragmentInput, FragmentOutput, ShaderProgram, ShaderResources};
use crate::core::thread_pool::{Rect, WorkerPool, partition_blocks};
use nalgebra::Vector4;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Shading counters shared by the workers of one draw
#[derive(Debug, Default)]
pub struct DrawCounters {
    pub quads_shaded: AtomicUsize,
    pub fragment_invocations: AtomicUsize,
    pub early_z_rejected: AtomicUsize,
}

#[derive(Debug, Default, Clone, Copy)]
struct BlockCounters {
    quads_shaded: usize,
    fragment_invocations: usize,
    early_z_rejected: usize,
}

impl DrawCounters {
    fn add(&self, block: &BlockCounters) {
        self.quads_shaded
            .fetch_add(block.quads_shaded, Ordering::Relaxed);
        self.fragment_invocations
            .fetch_add(block.fragment_invocations, Ordering::Relaxed);
        self.early_z_rejected
            .fetch_add(block.early_z_rejected, Ordering::Relaxed);
    }
}

/// Everything the raster stage reads; immutable for the whole draw.
pub struct DrawContext<'a> {
    pub geometry: &'a GeometryBuffers,
    pub states: &'a RenderStates,
    pub program: &'a dyn ShaderProgram,
    pub resources: &'a ShaderResources,
    pub viewport: &'a Viewport,
    pub early_z: bool,
    pub point_size: f32,
    pub counters: &'a DrawCounters,
}

impl DrawContext<'_> {
    fn early_z_enabled(&self, target: &RasterTarget<'_>) -> bool {
        self.early_z && self.states.depth_test && !self.program.writes_depth() && target.has_depth()
    }
}

/// Scratch reused across the blocks of one rayon job split
struct RasterScratch {
    quad: PixelQuadContext,
    varyings: Vec<f32>,
    counters: BlockCounters,
}

/// Rasterizes every live primitive into `target`, restricted to `region`.
pub(crate) fn rasterize(
    ctx: &DrawContext<'_>,
    target: &RasterTarget<'_>,
    pool: &WorkerPool,
    region: &Rect,
    block_size: usize,
) {
    let blocks = partition_blocks(region, block_size);
    let varyings_count = ctx.geometry.varyings_count;
    let sample_count = target.sample_count();
    let early_z = ctx.early_z_enabled(target);

    pool.run_blocks(
        &blocks,
        || RasterScratch {
            quad: PixelQuadContext::new(varyings_count, sample_count),
            varyings: vec![0.0; varyings_count],
            counters: BlockCounters::default(),
        },
        |scratch, block| {
            // SAFETY: partition_blocks returns pairwise disjoint rectangles and
            // each one is handed to exactly one task.
            let block_target = unsafe { target.block(*block) };
            scratch.counters = BlockCounters::default();
            rasterize_block(ctx, &block_target, scratch, early_z);
            ctx.counters.add(&scratch.counters);
        },
    );
}

fn rasterize_block(
    ctx: &DrawContext<'_>,
    target: &BlockTarget<'_, '_>,
    scratch: &mut RasterScratch,
    early_z: bool,
) {
    for primitive in ctx.geometry.live_primitives() {
        match ctx.geometry.primitive_type {
            PrimitiveType::Point => rasterize_point(ctx, target, scratch, primitive, early_z),
            PrimitiveType::Line => rasterize_line(ctx, target, scratch, primitive, early_z),
            PrimitiveType::Triangle => {
                rasterize_triangle(ctx, target, scratch, primitive, early_z)
            }
        }
    }
}

/// Pixels whose centers fall in `[min, max]`, clipped to `block`.
fn pixel_bounds(min_x: f32, min_y: f32, max_x: f32, max_y: f32, block: &Rect) -> Rect {
    let x0 = (min_x - 0.5).ceil().max(0.0) as usize;
    let y0 = (min_y - 0.5).ceil().max(0.0) as usize;
    let x1 = (max_x + 0.5).floor().max(0.0) as usize;
    let y1 = (max_y + 0.5).floor().max(0.0) as usize;
    Rect::new(x0, y0, x1, y1).intersect(block)
}

fn rasterize_triangle(
    ctx: &DrawContext<'_>,
    target: &BlockTarget<'_, '_>,
    scratch: &mut RasterScratch,
    primitive: &PrimitiveHolder,
    early_z: bool,
) {
    let geo = ctx.geometry;
    let [p0, p1, p2] = primitive.indices.map(|i| &geo.vertices[i].frag_pos);

    // every pixel overlapping the bounding box
    let bounds = pixel_bounds(
        p0.x.min(p1.x).min(p2.x) - 0.5,
        p0.y.min(p1.y).min(p2.y) - 0.5,
        p0.x.max(p1.x).max(p2.x) + 0.5,
        p0.y.max(p1.y).max(p2.y) + 0.5,
        target.rect(),
    );
    if bounds.is_empty() {
        return;
    }

    let quad = &mut scratch.quad;
    if !quad.set_triangle([p0, p1, p2], primitive.front_facing) {
        return;
    }
    let varyings = primitive.indices.map(|i| geo.vertex_varyings(i));

    // quads sit on even coordinates so lane pairs match across blocks
    for y in (bounds.y0 & !1..bounds.y1).step_by(2) {
        for x in (bounds.x0 & !1..bounds.x1).step_by(2) {
            quad.init(x, y);
            if !quad.evaluate_coverage(&bounds) {
                continue;
            }
            shade_quad(ctx, target, quad, varyings, &mut scratch.counters, early_z);
        }
    }
}

fn shade_quad(
    ctx: &DrawContext<'_>,
    target: &BlockTarget<'_, '_>,
    quad: &mut PixelQuadContext,
    varyings: [&[f32]; 3],
    counters: &mut BlockCounters,
    early_z: bool,
) {
    let mut alive = quad.pixels.map(|p| p.inside);
    if early_z {
        for (lane, pixel) in quad.pixels.iter().enumerate() {
            if alive[lane] && !early_depth_test(ctx, target, pixel) {
                alive[lane] = false;
                counters.early_z_rejected += 1;
            }
        }
        if !alive.iter().any(|&a| a) {
            return;
        }
    }

    quad.interpolate_varyings(varyings);
    counters.quads_shaded += 1;
    counters.fragment_invocations += 4;

    let quad_varyings = quad.quad_varyings();
    let outputs: [FragmentOutput; 4] = std::array::from_fn(|lane| {
        let input = FragmentInput {
            frag_coord: quad.frag_coord(lane),
            front_facing: quad.front_facing,
            lane,
            quad_varyings,
        };
        ctx.program.fragment_shader(&input, ctx.resources)
    });

    for lane in 0..4 {
        let output = &outputs[lane];
        if !alive[lane] || output.discard {
            continue;
        }
        let pixel = &quad.pixels[lane];
        let sample_total = quad.sample_count();
        for s in 0..sample_total {
            let sample = &pixel.samples[s];
            if !sample.inside {
                continue;
            }
            let (x, y) = sample.fb_pos;
            write_sample(ctx, target, x, y, s, output.depth.unwrap_or(sample.depth), output);
        }
    }
}

/// Single-sampled pixels test their shading sample; multi-sampled pixels
/// pass when any covered sample passes.
fn early_depth_test(
    ctx: &DrawContext<'_>,
    target: &BlockTarget<'_, '_>,
    pixel: &PixelContext,
) -> bool {
    let func = ctx.states.depth_func;
    let test = |s: usize| {
        let sample = &pixel.samples[s];
        let (x, y) = sample.fb_pos;
        target
            .depth(x, y, s)
            .is_none_or(|stored| func.test(ctx.viewport.clamp_depth(sample.depth), stored))
    };
    let samples = target.sample_count();
    if samples > 1 {
        (0..samples).any(|s| pixel.samples[s].inside && test(s))
    } else {
        test(0)
    }
}

/// Depth test, depth write and color output for one sample.
fn write_sample(
    ctx: &DrawContext<'_>,
    target: &BlockTarget<'_, '_>,
    x: usize,
    y: usize,
    sample: usize,
    depth: f32,
    output: &FragmentOutput,
) {
    let states = ctx.states;
    let depth = ctx.viewport.clamp_depth(depth);
    if states.depth_test {
        if let Some(stored) = target.depth(x, y, sample) {
            if !states.depth_func.test(depth, stored) {
                return;
            }
            if states.depth_mask {
                target.set_depth(x, y, sample, depth);
            }
        }
    }

    let (stored, params) = if states.blend {
        (target.color(x, y, sample), Some(&states.blend_params))
    } else {
        (None, None)
    };
    target.set_color(x, y, sample, output_color(&output.color, stored, params));
}

/// Pixels sharing one set of attributes: a point sprite or one step of a
/// line
struct FlatFragment<'v> {
    depth: f32,
    inv_w: f32,
    varyings: &'v [f32],
}

/// First and one-past-last pixel whose center lies in
/// `[center - extent / 2, center + extent / 2)` along one axis.
fn centered_span(center: f32, extent: f32) -> (usize, usize) {
    let half = extent.max(1.0) / 2.0;
    let first = (center - half - 0.5).ceil().max(0.0) as usize;
    let end = (center + half - 0.5).ceil().max(0.0) as usize;
    (first, end)
}

/// Shades each pixel of `pixels` once and writes every sample of it.
fn shade_pixels(
    ctx: &DrawContext<'_>,
    target: &BlockTarget<'_, '_>,
    counters: &mut BlockCounters,
    early_z: bool,
    pixels: Rect,
    fragment: &FlatFragment<'_>,
) {
    let bounds = pixels.intersect(target.rect());
    if bounds.is_empty() {
        return;
    }
    let depth = ctx.viewport.clamp_depth(fragment.depth);
    let samples = target.sample_count();

    for y in bounds.y0..bounds.y1 {
        for x in bounds.x0..bounds.x1 {
            // every sample is covered, so any passing sample keeps the pixel
            if early_z {
                let passes = (0..samples).any(|s| {
                    target
                        .depth(x, y, s)
                        .is_none_or(|stored| ctx.states.depth_func.test(depth, stored))
                });
                if !passes {
                    counters.early_z_rejected += 1;
                    continue;
                }
            }
            counters.fragment_invocations += 1;
            let input = FragmentInput {
                frag_coord: Vector4::new(x as f32 + 0.5, y as f32 + 0.5, depth, fragment.inv_w),
                front_facing: true,
                lane: 0,
                quad_varyings: [fragment.varyings; 4],
            };
            let output = ctx.program.fragment_shader(&input, ctx.resources);
            if output.discard {
                continue;
            }
            let frag_depth = output.depth.unwrap_or(depth);
            for s in 0..samples {
                write_sample(ctx, target, x, y, s, frag_depth, &output);
            }
        }
    }
}

/// Square of side `point_size` around the vertex.
fn rasterize_point(
    ctx: &DrawContext<'_>,
    target: &BlockTarget<'_, '_>,
    scratch: &mut RasterScratch,
    primitive: &PrimitiveHolder,
    early_z: bool,
) {
    let index = primitive.indices[0];
    let pos = ctx.geometry.vertices[index].frag_pos;
    let (x0, x1) = centered_span(pos.x, ctx.point_size);
    let (y0, y1) = centered_span(pos.y, ctx.point_size);
    let fragment = FlatFragment {
        depth: pos.z,
        inv_w: pos.w,
        varyings: ctx.geometry.vertex_varyings(index),
    };
    shade_pixels(
        ctx,
        target,
        &mut scratch.counters,
        early_z,
        Rect::new(x0, y0, x1, y1),
        &fragment,
    );
}

/// Bresenham walk along the major axis from the first to the second
/// endpoint. Each step covers `line_width` pixels across the minor axis, so
/// no pixel is shaded twice by one line.
fn rasterize_line(
    ctx: &DrawContext<'_>,
    target: &BlockTarget<'_, '_>,
    scratch: &mut RasterScratch,
    primitive: &PrimitiveHolder,
    early_z: bool,
) {
    let geo = ctx.geometry;
    let [ia, ib, _] = primitive.indices;
    let (pa, pb) = (geo.vertices[ia].frag_pos, geo.vertices[ib].frag_pos);
    let width = ctx.states.line_width.max(1.0);

    let reach = width / 2.0 + 1.0;
    let extent = pixel_bounds(
        pa.x.min(pb.x) - reach,
        pa.y.min(pb.y) - reach,
        pa.x.max(pb.x) + reach,
        pa.y.max(pb.y) + reach,
        target.rect(),
    );
    if extent.is_empty() {
        return;
    }

    let (va, vb) = (geo.vertex_varyings(ia), geo.vertex_varyings(ib));
    let mut x0 = pa.x.floor() as i64;
    let mut y0 = pa.y.floor() as i64;
    let mut x1 = pb.x.floor() as i64;
    let mut y1 = pb.y.floor() as i64;

    let steep = (y1 - y0).abs() > (x1 - x0).abs();
    if steep {
        std::mem::swap(&mut x0, &mut y0);
        std::mem::swap(&mut x1, &mut y1);
    }
    let reversed = x0 > x1;
    if reversed {
        std::mem::swap(&mut x0, &mut x1);
        std::mem::swap(&mut y0, &mut y1);
    }

    let dx = x1 - x0;
    let dy = (y1 - y0).abs();
    let y_step = if y0 < y1 { 1 } else { -1 };
    let mut error = dx / 2;
    let mut y = y0;

    // x runs along the major axis, y along the minor one
    for x in x0..=x1 {
        let mut t = if dx == 0 {
            0.0
        } else {
            (x - x0) as f32 / dx as f32
        };
        if reversed {
            t = 1.0 - t;
        }

        if x >= 0 {
            let major = x as usize;
            let (lo, hi) = centered_span(y as f32 + 0.5, width);
            let pixels = if steep {
                Rect::new(lo, major, hi, major + 1)
            } else {
                Rect::new(major, lo, major + 1, hi)
            };
            for (out, (a, b)) in scratch.varyings.iter_mut().zip(va.iter().zip(vb)) {
                *out = a + (b - a) * t;
            }
            let fragment = FlatFragment {
                depth: pa.z + (pb.z - pa.z) * t,
                inv_w: pa.w + (pb.w - pa.w) * t,
                varyings: &scratch.varyings,
            };
            shade_pixels(ctx, target, &mut scratch.counters, early_z, pixels, &fragment);
        }

        error -= dy;
        if error < 0 {
            y += y_step;
            error += dx;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_bounds_select_covered_centers() {
        let block = Rect::new(0, 0, 64, 64);
        // centers 2.5 ..= 5.5
        assert_eq!(pixel_bounds(2.2, 0.0, 5.5, 0.6, &block), Rect::new(2, 0, 6, 1));
        assert!(pixel_bounds(-8.0, -8.0, -1.0, -1.0, &block).is_empty());
        assert_eq!(pixel_bounds(60.0, 60.0, 90.0, 90.0, &block), Rect::new(60, 60, 64, 64));
    }
}
