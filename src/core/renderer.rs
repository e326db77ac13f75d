//! Renderer contract and its software implementation.

use crate::core::buffer::BufferLayout;
use crate::core::frame_buffer::FrameBuffer;
use crate::core::log_context::LogContext;
use crate::core::pipeline::clipping::clip_primitives;
use crate::core::pipeline::msaa::resolve_frame_buffer;
use crate::core::pipeline::raster_target::RasterTarget;
use crate::core::pipeline::rasterizer::{DrawContext, DrawCounters, rasterize};
use crate::core::pipeline::{GeometryBuffers, Viewport};
use crate::core::render_states::{ClearStates, RenderStates};
use crate::core::shader::{ShaderProgram, ShaderResources, UniformBlock, UniformSampler};
use crate::core::texture::{
    Rgba, SamplerDesc, Texel, Texture, TextureDesc, TextureFormat, TextureSoft,
};
use crate::core::thread_pool::{DEFAULT_BLOCK_SIZE, WorkerPool};
use crate::core::vertex::{VertexArray, VertexArrayObject};
use nalgebra::Vector4;
use std::ops::AddAssign;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RendererType {
    Software,
}

/// Operations every renderer backend offers, so a scene can drive any of
/// them the same way.
pub trait Renderer {
    fn renderer_type(&self) -> RendererType;

    fn create_frame_buffer(&self, offscreen: bool) -> FrameBuffer;
    fn create_texture(&self, desc: &TextureDesc) -> Option<Texture>;
    fn create_vertex_array_object(&self, array: &VertexArray<'_>) -> Option<VertexArrayObject>;
    fn create_shader_program<S: ShaderProgram + 'static>(&self, program: S) -> Arc<dyn ShaderProgram>
    where
        Self: Sized;
    fn create_pipeline_states(&self, states: &RenderStates) -> RenderStates;
    fn create_uniform_block(&self, name: &str, size: usize) -> UniformBlock;
    fn create_uniform_sampler(&self, name: &str, desc: &SamplerDesc) -> UniformSampler;

    /// Binds `frame_buffer` and applies the clear. Returns `false` when the
    /// frame buffer is unusable.
    fn begin_render_pass(&mut self, frame_buffer: FrameBuffer, clear: &ClearStates) -> bool;
    fn set_viewport(&mut self, x: f32, y: f32, width: f32, height: f32);
    fn set_depth_range(&mut self, min_depth: f32, max_depth: f32);
    fn set_vertex_array_object(&mut self, vao: Arc<VertexArrayObject>);
    fn set_shader_program(&mut self, program: Arc<dyn ShaderProgram>);
    fn set_shader_resources(&mut self, resources: Arc<ShaderResources>);
    fn set_pipeline_states(&mut self, states: &RenderStates);
    fn draw(&mut self);
    /// Finishes the pass and hands the frame buffer back, resolved.
    fn end_render_pass(&mut self) -> Option<FrameBuffer>;
    fn wait_idle(&self);
}

/// Worker and memory settings of a [`SoftRenderer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RendererConfig {
    /// Worker threads, 0 for the available parallelism
    pub threads: usize,
    /// Side of the square screen blocks handed to workers
    pub block_size: usize,
    pub early_z: bool,
    pub buffer_layout: BufferLayout,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            threads: 0,
            block_size: DEFAULT_BLOCK_SIZE,
            early_z: true,
            buffer_layout: BufferLayout::Tiled,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrawStats {
    pub draws: usize,
    pub vertices_shaded: usize,
    pub primitives_after_clip: usize,
    pub primitives_culled: usize,
    pub quads_shaded: usize,
    pub fragment_invocations: usize,
    pub early_z_rejected: usize,
}

impl AddAssign for DrawStats {
    fn add_assign(&mut self, rhs: Self) {
        self.draws += rhs.draws;
        self.vertices_shaded += rhs.vertices_shaded;
        self.primitives_after_clip += rhs.primitives_after_clip;
        self.primitives_culled += rhs.primitives_culled;
        self.quads_shaded += rhs.quads_shaded;
        self.fragment_invocations += rhs.fragment_invocations;
        self.early_z_rejected += rhs.early_z_rejected;
    }
}

/// CPU rasterizer. Vertex processing runs on the calling thread; the raster
/// stage is split into screen blocks and run on the worker pool.
pub struct SoftRenderer {
    config: RendererConfig,
    log: LogContext,
    pool: WorkerPool,

    frame_buffer: Option<FrameBuffer>,
    viewport: Viewport,
    vao: Option<Arc<VertexArrayObject>>,
    program: Option<Arc<dyn ShaderProgram>>,
    resources: Arc<ShaderResources>,
    states: RenderStates,

    geometry: GeometryBuffers,
    last_stats: DrawStats,
    total_stats: DrawStats,
}

impl SoftRenderer {
    pub fn new(config: RendererConfig, log: LogContext) -> Result<Self, String> {
        let pool = WorkerPool::new(config.threads, log)?;
        log.info(format_args!(
            "software renderer: {} threads, {}px blocks, {} layout, early-z {}",
            pool.thread_count(),
            config.block_size,
            config.buffer_layout.name(),
            if config.early_z { "on" } else { "off" }
        ));
        Ok(Self {
            config,
            log,
            pool,
            frame_buffer: None,
            viewport: Viewport::default(),
            vao: None,
            program: None,
            resources: Arc::new(ShaderResources::new()),
            states: RenderStates::default(),
            geometry: GeometryBuffers::default(),
            last_stats: DrawStats::default(),
            total_stats: DrawStats::default(),
        })
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn log(&self) -> LogContext {
        self.log
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    pub fn set_enable_early_z(&mut self, enable: bool) {
        self.config.early_z = enable;
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn last_draw_stats(&self) -> DrawStats {
        self.last_stats
    }

    /// Sum over every draw since the renderer was created
    pub fn total_stats(&self) -> DrawStats {
        self.total_stats
    }

    fn clear(frame_buffer: &mut FrameBuffer, clear: &ClearStates) {
        if clear.color_flag {
            let [r, g, b, a] = clear.clear_color;
            let color = Rgba::from_vec4(&Vector4::new(r, g, b, a));
            if let Some(image) = frame_buffer.color_image_mut() {
                image.set_all(color);
            }
        }
        if clear.depth_flag {
            if let Some(image) = frame_buffer.depth_image_mut() {
                image.set_all(clear.clear_depth);
            }
        }
    }
}

impl Renderer for SoftRenderer {
    fn renderer_type(&self) -> RendererType {
        RendererType::Software
    }

    fn create_frame_buffer(&self, offscreen: bool) -> FrameBuffer {
        FrameBuffer::new(offscreen, self.log)
    }

    fn create_texture(&self, desc: &TextureDesc) -> Option<Texture> {
        let layout = self.config.buffer_layout;
        match desc.format {
            TextureFormat::Rgba8 => TextureSoft::new(desc, layout, self.log).map(Texture::Rgba8),
            TextureFormat::Float32 => {
                TextureSoft::new(desc, layout, self.log).map(Texture::Float32)
            }
        }
    }

    fn create_vertex_array_object(&self, array: &VertexArray<'_>) -> Option<VertexArrayObject> {
        VertexArrayObject::new(array, self.log)
    }

    fn create_shader_program<S: ShaderProgram + 'static>(&self, program: S) -> Arc<dyn ShaderProgram> {
        Arc::new(program)
    }

    fn create_pipeline_states(&self, states: &RenderStates) -> RenderStates {
        let mut states = *states;
        if states.line_width <= 0.0 {
            self.log.warn(format_args!(
                "line width {} is not positive, using 1",
                states.line_width
            ));
            states.line_width = 1.0;
        }
        states
    }

    fn create_uniform_block(&self, name: &str, size: usize) -> UniformBlock {
        UniformBlock::new(name, size)
    }

    fn create_uniform_sampler(&self, name: &str, desc: &SamplerDesc) -> UniformSampler {
        UniformSampler::new(name, *desc)
    }

    fn begin_render_pass(&mut self, mut frame_buffer: FrameBuffer, clear: &ClearStates) -> bool {
        if !frame_buffer.is_valid() {
            self.log
                .warn(format_args!("begin_render_pass: frame buffer is not complete"));
            return false;
        }
        if self.frame_buffer.is_some() {
            self.log.warn(format_args!(
                "begin_render_pass: previous pass was not ended, dropping it"
            ));
        }
        Self::clear(&mut frame_buffer, clear);
        if self.viewport.width <= 0.0 || self.viewport.height <= 0.0 {
            self.viewport.set_rect(
                0.0,
                0.0,
                frame_buffer.width() as f32,
                frame_buffer.height() as f32,
            );
        }
        self.frame_buffer = Some(frame_buffer);
        true
    }

    fn set_viewport(&mut self, x: f32, y: f32, width: f32, height: f32) {
        self.viewport.set_rect(x, y, width, height);
    }

    fn set_depth_range(&mut self, min_depth: f32, max_depth: f32) {
        self.viewport.set_depth_range(min_depth, max_depth);
    }

    fn set_vertex_array_object(&mut self, vao: Arc<VertexArrayObject>) {
        self.vao = Some(vao);
    }

    fn set_shader_program(&mut self, program: Arc<dyn ShaderProgram>) {
        self.program = Some(program);
    }

    fn set_shader_resources(&mut self, resources: Arc<ShaderResources>) {
        self.resources = resources;
    }

    fn set_pipeline_states(&mut self, states: &RenderStates) {
        self.states = *states;
    }

    fn draw(&mut self) {
        let Some(frame_buffer) = self.frame_buffer.as_mut() else {
            self.log.warn(format_args!("draw: no render pass in progress"));
            return;
        };
        let (Some(vao), Some(program)) = (self.vao.clone(), self.program.clone()) else {
            self.log
                .warn(format_args!("draw: vertex array or shader program not bound"));
            return;
        };
        let start = Instant::now();
        let states = self.states;
        let resources = Arc::clone(&self.resources);
        let geo = &mut self.geometry;

        geo.reset(program.varyings_count(), states.primitive_type);
        geo.shade_vertices(&vao, program.as_ref(), &resources);
        let dropped = geo.assemble(vao.indices());
        let clipped = clip_primitives(geo);
        let after_clip = geo.live_primitive_count();
        geo.mark_used_vertices();
        geo.perspective_divide();
        geo.viewport_transform(&self.viewport);
        let culled = geo.cull_faces(states.cull_face);
        geo.expand_polygon_mode(states.polygon_mode);
        let live = geo.live_primitive_count();
        self.log.trace(format_args!(
            "draw: {} vertices, {} invalid groups, {} clipped, {} culled, {} to raster",
            vao.vertex_count(),
            dropped,
            clipped,
            culled,
            live
        ));

        let counters = DrawCounters::default();
        if live > 0 {
            let region = self
                .viewport
                .pixel_rect(frame_buffer.width(), frame_buffer.height());
            let ctx = DrawContext {
                geometry: &self.geometry,
                states: &states,
                program: program.as_ref(),
                resources: &resources,
                viewport: &self.viewport,
                early_z: self.config.early_z,
                point_size: program.point_size(&resources),
                counters: &counters,
            };
            let target = RasterTarget::new(frame_buffer);
            rasterize(&ctx, &target, &self.pool, &region, self.config.block_size);
        }

        let stats = DrawStats {
            draws: 1,
            vertices_shaded: vao.vertex_count(),
            primitives_after_clip: after_clip,
            primitives_culled: culled,
            quads_shaded: counters.quads_shaded.load(Ordering::Relaxed),
            fragment_invocations: counters.fragment_invocations.load(Ordering::Relaxed),
            early_z_rejected: counters.early_z_rejected.load(Ordering::Relaxed),
        };
        self.last_stats = stats;
        self.total_stats += stats;
        self.log.debug(format_args!(
            "draw finished in {:?}: {} quads, {} fragment invocations, {} early-z rejects",
            start.elapsed(),
            stats.quads_shaded,
            stats.fragment_invocations,
            stats.early_z_rejected
        ));
    }

    fn end_render_pass(&mut self) -> Option<FrameBuffer> {
        let mut frame_buffer = self.frame_buffer.take()?;
        let resolved = resolve_frame_buffer(&mut frame_buffer, &self.pool);
        if resolved > 0 {
            self.log
                .trace(format_args!("resolved {} multi-sampled attachments", resolved));
        }
        Some(frame_buffer)
    }

    fn wait_idle(&self) {
        self.pool.wait_idle();
    }
}
