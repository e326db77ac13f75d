use nalgebra::Vector4;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use softrender::core::buffer::BufferLayout;
use softrender::core::frame_buffer::FrameBuffer;
use softrender::core::log_context::LogContext;
use softrender::core::render_states::{
    BlendParameters, ClearStates, PolygonMode, PrimitiveType, RenderStates,
};
use softrender::core::renderer::{DrawStats, Renderer, RendererConfig, SoftRenderer};
use softrender::core::shader::{FragmentInput, FragmentOutput, ShaderProgram, ShaderResources};
use softrender::core::texture::{TextureDesc, TextureFormat, TextureUsage};
use softrender::core::vertex::{VertexArray, VertexAttributeDesc, VertexInput};
use std::sync::Arc;

const SIZE: usize = 16;
const RED: [u8; 4] = [255, 0, 0, 255];
const CLEAR: [u8; 4] = [0, 0, 0, 255];

/// Clip position and color straight from the vertex, color interpolated.
struct ColorShader {
    point_size: f32,
}

impl ShaderProgram for ColorShader {
    fn varyings_count(&self) -> usize {
        4
    }

    fn vertex_shader(
        &self,
        input: &VertexInput<'_>,
        _resources: &ShaderResources,
        varyings: &mut [f32],
    ) -> Vector4<f32> {
        varyings.copy_from_slice(input.vec4(1).as_slice());
        input.vec4(0)
    }

    fn fragment_shader(&self, input: &FragmentInput<'_>, _resources: &ShaderResources) -> FragmentOutput {
        let v = input.varyings();
        FragmentOutput::color(Vector4::new(v[0], v[1], v[2], v[3]))
    }

    fn point_size(&self, _resources: &ShaderResources) -> f32 {
        self.point_size
    }
}

/// Interleaved `x y z w r g b a` vertices
#[derive(Default)]
struct Mesh {
    vertices: Vec<f32>,
    indices: Vec<u32>,
}

impl Mesh {
    /// Adds a vertex given in window coordinates of the SIZE x SIZE target.
    fn window_vertex(&mut self, x: f32, y: f32, z: f32, color: [f32; 4]) -> u32 {
        let ndc = |v: f32| v / (SIZE as f32 / 2.0) - 1.0;
        self.vertex([ndc(x), ndc(y), z, 1.0], color)
    }

    fn vertex(&mut self, clip: [f32; 4], color: [f32; 4]) -> u32 {
        let index = (self.vertices.len() / 8) as u32;
        self.vertices.extend_from_slice(&clip);
        self.vertices.extend_from_slice(&color);
        index
    }

    fn triangle(&mut self, a: u32, b: u32, c: u32) {
        self.indices.extend_from_slice(&[a, b, c]);
    }

    /// Window-space rectangle at depth `z`, two counter-clockwise triangles.
    fn rect(&mut self, x0: f32, y0: f32, x1: f32, y1: f32, z: f32, color: [f32; 4]) {
        let a = self.window_vertex(x0, y0, z, color);
        let b = self.window_vertex(x1, y0, z, color);
        let c = self.window_vertex(x1, y1, z, color);
        let d = self.window_vertex(x0, y1, z, color);
        self.triangle(a, b, c);
        self.triangle(a, c, d);
    }
}

struct Draw {
    mesh: Mesh,
    states: RenderStates,
}

impl Draw {
    fn triangles(mesh: Mesh) -> Self {
        Self {
            mesh,
            states: RenderStates::default(),
        }
    }
}

struct Target {
    width: usize,
    height: usize,
    multi_sample: bool,
    depth: bool,
}

impl Default for Target {
    fn default() -> Self {
        Self {
            width: SIZE,
            height: SIZE,
            multi_sample: false,
            depth: false,
        }
    }
}

fn config(threads: usize) -> RendererConfig {
    RendererConfig {
        threads,
        block_size: 8,
        ..Default::default()
    }
}

fn frame_buffer(renderer: &SoftRenderer, target: &Target) -> FrameBuffer {
    let color_desc = TextureDesc {
        width: target.width,
        height: target.height,
        format: TextureFormat::Rgba8,
        usage: TextureUsage::ATTACHMENT_COLOR,
        multi_sample: target.multi_sample,
        ..Default::default()
    };
    let mut frame_buffer = renderer.create_frame_buffer(true);
    assert!(frame_buffer.set_color_attachment(renderer.create_texture(&color_desc).unwrap(), 0));
    if target.depth {
        let depth_desc = TextureDesc {
            format: TextureFormat::Float32,
            usage: TextureUsage::ATTACHMENT_DEPTH,
            ..color_desc
        };
        assert!(frame_buffer.set_depth_attachment(renderer.create_texture(&depth_desc).unwrap()));
    }
    frame_buffer
}

/// Runs one pass and returns the resolved frame buffer and the summed stats.
fn render_with(
    renderer: &mut SoftRenderer,
    target: &Target,
    draws: &[Draw],
    point_size: f32,
) -> (FrameBuffer, DrawStats) {
    let frame_buffer = frame_buffer(renderer, target);
    assert!(renderer.begin_render_pass(frame_buffer, &ClearStates::color_and_depth([0.0, 0.0, 0.0, 1.0])));
    let program = renderer.create_shader_program(ColorShader { point_size });
    renderer.set_shader_program(program);

    let attributes = [0, 16].map(|offset| VertexAttributeDesc {
        size: 4,
        stride: 32,
        offset,
    });
    let mut stats = DrawStats::default();
    for draw in draws {
        let vao = renderer
            .create_vertex_array_object(&VertexArray {
                vertex_size: 32,
                attributes: &attributes,
                vertex_buffer: &draw.mesh.vertices,
                index_buffer: &draw.mesh.indices,
            })
            .unwrap();
        renderer.set_vertex_array_object(Arc::new(vao));
        let states = renderer.create_pipeline_states(&draw.states);
        renderer.set_pipeline_states(&states);
        renderer.draw();
        stats += renderer.last_draw_stats();
    }
    (renderer.end_render_pass().unwrap(), stats)
}

fn render(config: RendererConfig, target: &Target, draws: &[Draw]) -> (FrameBuffer, DrawStats) {
    let mut renderer = SoftRenderer::new(config, LogContext::silent()).unwrap();
    render_with(&mut renderer, target, draws, 1.0)
}

fn pixels(frame_buffer: &FrameBuffer) -> Vec<[u8; 4]> {
    frame_buffer
        .read_color_rgba(false)
        .unwrap()
        .chunks_exact(4)
        .map(|p| [p[0], p[1], p[2], p[3]])
        .collect()
}

fn pixel(frame_buffer: &FrameBuffer, x: usize, y: usize) -> [u8; 4] {
    pixels(frame_buffer)[y * frame_buffer.width() + x]
}

#[test]
fn full_viewport_quad_fills_every_pixel() {
    let mut mesh = Mesh::default();
    mesh.rect(0.0, 0.0, SIZE as f32, SIZE as f32, 0.0, [1.0, 0.0, 0.0, 1.0]);
    let (fb, stats) = render(config(2), &Target::default(), &[Draw::triangles(mesh)]);

    assert!(pixels(&fb).iter().all(|p| *p == RED));
    assert_eq!(stats.primitives_after_clip, 2);
    assert_eq!(stats.primitives_culled, 0);
    assert_eq!(stats.fragment_invocations, stats.quads_shaded * 4);
}

#[test]
fn triangle_outside_the_frustum_changes_nothing() {
    let mut mesh = Mesh::default();
    let color = [1.0, 0.0, 0.0, 1.0];
    let a = mesh.vertex([2.0, 0.0, 0.0, 1.0], color);
    let b = mesh.vertex([3.0, 0.0, 0.0, 1.0], color);
    let c = mesh.vertex([2.5, 1.0, 0.0, 1.0], color);
    mesh.triangle(a, b, c);
    let (fb, stats) = render(config(2), &Target::default(), &[Draw::triangles(mesh)]);

    assert!(pixels(&fb).iter().all(|p| *p == CLEAR));
    assert_eq!(stats.primitives_after_clip, 0);
    assert_eq!(stats.quads_shaded, 0);
}

#[test]
fn only_covered_quads_are_shaded() {
    let color = [1.0, 0.0, 0.0, 1.0];

    // covers the center of pixel (5, 5) only
    let mut mesh = Mesh::default();
    let a = mesh.window_vertex(5.2, 5.2, 0.0, color);
    let b = mesh.window_vertex(5.9, 5.2, 0.0, color);
    let c = mesh.window_vertex(5.2, 5.9, 0.0, color);
    mesh.triangle(a, b, c);
    let (fb, stats) = render(config(1), &Target::default(), &[Draw::triangles(mesh)]);
    assert_eq!(stats.quads_shaded, 1);
    assert_eq!(stats.fragment_invocations, 4);
    assert_eq!(pixels(&fb).iter().filter(|p| **p == RED).count(), 1);
    assert_eq!(pixel(&fb, 5, 5), RED);

    // a sliver between pixel centers
    let mut mesh = Mesh::default();
    let a = mesh.window_vertex(5.6, 5.6, 0.0, color);
    let b = mesh.window_vertex(5.9, 5.6, 0.0, color);
    let c = mesh.window_vertex(5.6, 5.9, 0.0, color);
    mesh.triangle(a, b, c);
    let (fb, stats) = render(config(1), &Target::default(), &[Draw::triangles(mesh)]);
    assert_eq!(stats.quads_shaded, 0);
    assert_eq!(stats.fragment_invocations, 0);
    assert!(pixels(&fb).iter().all(|p| *p == CLEAR));
}

#[test]
fn back_faces_are_culled_when_enabled() {
    let color = [1.0, 0.0, 0.0, 1.0];
    let mut mesh = Mesh::default();
    let a = mesh.window_vertex(2.0, 2.0, 0.0, color);
    let b = mesh.window_vertex(2.0, 12.0, 0.0, color);
    let c = mesh.window_vertex(12.0, 2.0, 0.0, color);
    mesh.triangle(a, b, c);
    let draw = Draw {
        mesh,
        states: RenderStates {
            cull_face: true,
            ..Default::default()
        },
    };
    let (fb, stats) = render(config(2), &Target::default(), &[draw]);
    assert_eq!(stats.primitives_culled, 1);
    assert!(pixels(&fb).iter().all(|p| *p == CLEAR));
}

fn occluded_scene() -> Vec<Draw> {
    let depth_states = RenderStates {
        depth_test: true,
        ..Default::default()
    };
    let mut near = Mesh::default();
    near.rect(0.0, 0.0, 16.0, 16.0, -0.5, [0.0, 1.0, 0.0, 1.0]);
    let mut far = Mesh::default();
    far.rect(2.0, 2.0, 14.0, 14.0, 0.5, [1.0, 0.0, 0.0, 1.0]);
    vec![
        Draw {
            mesh: near,
            states: depth_states,
        },
        Draw {
            mesh: far,
            states: depth_states,
        },
    ]
}

#[test]
fn early_z_skips_occluded_fragments_without_changing_the_image() {
    let target = Target {
        depth: true,
        ..Default::default()
    };
    let (with_early_z, on) = render(config(2), &target, &occluded_scene());
    let (without, off) = render(
        RendererConfig {
            early_z: false,
            ..config(2)
        },
        &target,
        &occluded_scene(),
    );

    assert_eq!(pixels(&with_early_z), pixels(&without));
    assert!(pixels(&with_early_z).iter().all(|p| *p == [0, 255, 0, 255]));
    assert!(on.early_z_rejected > 0);
    assert_eq!(off.early_z_rejected, 0);
    assert!(on.fragment_invocations < off.fragment_invocations);
    assert_eq!(with_early_z.read_depth(false), without.read_depth(false));
}

#[test]
fn early_z_can_be_toggled_at_runtime() {
    let target = Target {
        depth: true,
        ..Default::default()
    };
    let mut renderer = SoftRenderer::new(config(2), LogContext::silent()).unwrap();
    let (_, on) = render_with(&mut renderer, &target, &occluded_scene(), 1.0);
    renderer.set_enable_early_z(false);
    let (_, off) = render_with(&mut renderer, &target, &occluded_scene(), 1.0);
    assert!(on.early_z_rejected > 0);
    assert_eq!(off.early_z_rejected, 0);
    assert_eq!(renderer.total_stats().draws, 4);
}

fn random_scene(seed: u64) -> Vec<Draw> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut mesh = Mesh::default();
    for _ in 0..60 {
        let mut corner = || {
            let clip = [
                rng.random_range(-1.3..1.3),
                rng.random_range(-1.3..1.3),
                rng.random_range(-0.9..0.9),
                1.0,
            ];
            let color = [
                rng.random::<f32>(),
                rng.random::<f32>(),
                rng.random::<f32>(),
                rng.random_range(0.3..1.0),
            ];
            (clip, color)
        };
        let (a, b, c) = (corner(), corner(), corner());
        let ia = mesh.vertex(a.0, a.1);
        let ib = mesh.vertex(b.0, b.1);
        let ic = mesh.vertex(c.0, c.1);
        mesh.triangle(ia, ib, ic);
    }
    vec![Draw {
        mesh,
        states: RenderStates {
            depth_test: true,
            blend: true,
            blend_params: BlendParameters::alpha_blending(),
            ..Default::default()
        },
    }]
}

#[test]
fn multithreaded_output_matches_single_thread() {
    let target = Target {
        width: 61,
        height: 47,
        depth: true,
        ..Default::default()
    };
    for seed in [1, 2, 3] {
        let (single, single_stats) = render(config(1), &target, &random_scene(seed));
        let (multi, multi_stats) = render(config(4), &target, &random_scene(seed));
        assert_eq!(
            single.read_color_rgba(false),
            multi.read_color_rgba(false),
            "seed {seed}"
        );
        assert_eq!(single.read_depth(false), multi.read_depth(false), "seed {seed}");
        assert_eq!(single_stats, multi_stats, "seed {seed}");
    }
}

#[test]
fn buffer_layouts_produce_identical_images() {
    let target = Target {
        width: 37,
        height: 29,
        depth: true,
        ..Default::default()
    };
    let images: Vec<_> = [BufferLayout::Linear, BufferLayout::Tiled, BufferLayout::Morton]
        .into_iter()
        .map(|buffer_layout| {
            let config = RendererConfig {
                buffer_layout,
                ..config(3)
            };
            render(config, &target, &random_scene(9)).0.read_color_rgba(true)
        })
        .collect();
    assert_eq!(images[0], images[1]);
    assert_eq!(images[0], images[2]);
}

#[test]
fn msaa_resolve_weights_edge_pixels_by_coverage() {
    let target = Target {
        multi_sample: true,
        ..Default::default()
    };
    // right edge at x = 8.5: two of the four samples of column 8 lie left of it
    let mut mesh = Mesh::default();
    let color = [1.0, 0.0, 0.0, 1.0];
    let a = mesh.window_vertex(0.0, 0.0, 0.0, color);
    let b = mesh.window_vertex(8.5, 0.0, 0.0, color);
    let c = mesh.window_vertex(8.5, 16.0, 0.0, color);
    mesh.triangle(a, b, c);
    let (fb, _) = render(config(2), &target, &[Draw::triangles(mesh)]);

    assert!(fb.is_multi_sample());
    assert_eq!(pixel(&fb, 7, 2), RED);
    assert_eq!(pixel(&fb, 8, 2), [128, 0, 0, 255]);
    assert_eq!(pixel(&fb, 9, 2), CLEAR);
}

#[test]
fn points_cover_a_square_of_their_size() {
    let mut mesh = Mesh::default();
    mesh.window_vertex(8.0, 8.0, 0.0, [1.0, 0.0, 0.0, 1.0]);
    mesh.indices.push(0);
    let draw = Draw {
        mesh,
        states: RenderStates {
            primitive_type: PrimitiveType::Point,
            ..Default::default()
        },
    };
    let mut renderer = SoftRenderer::new(config(2), LogContext::silent()).unwrap();
    let (fb, stats) = render_with(&mut renderer, &Target::default(), &[draw], 3.0);

    assert_eq!(stats.fragment_invocations, 9);
    for y in 0..SIZE {
        for x in 0..SIZE {
            let inside = (6..9).contains(&x) && (6..9).contains(&y);
            assert_eq!(pixel(&fb, x, y) == RED, inside, "pixel ({x}, {y})");
        }
    }
}

#[test]
fn lines_walk_every_pixel_between_endpoints() {
    let mut mesh = Mesh::default();
    let a = mesh.window_vertex(2.5, 4.5, 0.0, [1.0, 0.0, 0.0, 1.0]);
    let b = mesh.window_vertex(12.5, 4.5, 0.0, [0.0, 0.0, 1.0, 1.0]);
    mesh.indices.extend_from_slice(&[a, b]);
    let draw = Draw {
        mesh,
        states: RenderStates {
            primitive_type: PrimitiveType::Line,
            ..Default::default()
        },
    };
    let (fb, _) = render(config(2), &Target::default(), &[draw]);

    let lit: Vec<(usize, usize)> = (0..SIZE)
        .flat_map(|y| (0..SIZE).map(move |x| (x, y)))
        .filter(|&(x, y)| pixel(&fb, x, y) != CLEAR)
        .collect();
    assert_eq!(lit, (2..=12).map(|x| (x, 4)).collect::<Vec<_>>());
    // color runs from red to blue
    assert_eq!(pixel(&fb, 2, 4), RED);
    assert_eq!(pixel(&fb, 12, 4), [0, 0, 255, 255]);
}

#[test]
fn wide_lines_blend_each_pixel_once() {
    let color = [1.0, 0.0, 0.0, 0.5];
    let mut mesh = Mesh::default();
    let a = mesh.window_vertex(2.5, 4.5, 0.0, color);
    let b = mesh.window_vertex(12.5, 4.5, 0.0, color);
    mesh.indices.extend_from_slice(&[a, b]);
    let draw = Draw {
        mesh,
        states: RenderStates {
            primitive_type: PrimitiveType::Line,
            line_width: 3.0,
            blend: true,
            blend_params: BlendParameters::alpha_blending(),
            ..Default::default()
        },
    };
    let (fb, stats) = render(config(2), &Target::default(), &[draw]);

    assert_eq!(stats.fragment_invocations, 11 * 3);
    for y in 0..SIZE {
        for x in 0..SIZE {
            let inside = (2..=12).contains(&x) && (3..6).contains(&y);
            let red = pixel(&fb, x, y)[0];
            assert_eq!(red, if inside { 128 } else { 0 }, "pixel ({x}, {y})");
        }
    }
}

#[test]
fn multisampled_points_pass_early_z_on_any_sample() {
    let target = Target {
        multi_sample: true,
        depth: true,
        ..Default::default()
    };
    let depth_states = RenderStates {
        depth_test: true,
        ..Default::default()
    };

    // near triangle covering the left half of column 8 only
    let mut occluder = Mesh::default();
    let red = [1.0, 0.0, 0.0, 1.0];
    let a = occluder.window_vertex(0.0, 0.0, -0.5, red);
    let b = occluder.window_vertex(8.5, 0.0, -0.5, red);
    let c = occluder.window_vertex(8.5, 16.0, -0.5, red);
    occluder.triangle(a, b, c);

    let mut point = Mesh::default();
    point.window_vertex(8.5, 2.5, 0.5, [0.0, 1.0, 0.0, 1.0]);
    point.indices.push(0);

    let draws = [
        Draw {
            mesh: occluder,
            states: depth_states,
        },
        Draw {
            mesh: point,
            states: RenderStates {
                primitive_type: PrimitiveType::Point,
                ..depth_states
            },
        },
    ];
    let mut renderer = SoftRenderer::new(config(2), LogContext::silent()).unwrap();
    let (fb, _) = render_with(&mut renderer, &target, &draws, 1.0);

    let point_stats = renderer.last_draw_stats();
    assert_eq!(point_stats.fragment_invocations, 1);
    assert_eq!(point_stats.early_z_rejected, 0);
    // two samples keep the occluder, the uncovered two take the point
    assert_eq!(pixel(&fb, 8, 2), [128, 128, 0, 255]);
}

#[test]
fn line_polygon_mode_draws_only_edges() {
    let mut mesh = Mesh::default();
    mesh.rect(2.0, 2.0, 13.0, 13.0, 0.0, [1.0, 1.0, 1.0, 1.0]);
    let draw = Draw {
        mesh,
        states: RenderStates {
            polygon_mode: PolygonMode::Line,
            ..Default::default()
        },
    };
    let (fb, stats) = render(config(2), &Target::default(), &[draw]);
    assert_eq!(stats.quads_shaded, 0);
    // off the edges and off the shared diagonal
    assert_eq!(pixel(&fb, 10, 5), CLEAR);
    assert_ne!(pixel(&fb, 2, 7), CLEAR);
    assert_ne!(pixel(&fb, 7, 7), CLEAR);
    assert_ne!(pixel(&fb, 7, 2), CLEAR);
}

#[test]
fn draw_without_a_pass_is_ignored() {
    let mut renderer = SoftRenderer::new(config(1), LogContext::silent()).unwrap();
    renderer.draw();
    assert_eq!(renderer.last_draw_stats(), DrawStats::default());
    assert!(renderer.end_render_pass().is_none());
}
