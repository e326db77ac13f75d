//! Headless viewer: builds a scene from [`RenderSettings`], draws it with the
//! software renderer and writes the images.

use crate::core::frame_buffer::FrameBuffer;
use crate::core::log_context::LogContext;
use crate::core::renderer::{DrawStats, Renderer, SoftRenderer};
use crate::core::shader::ShaderProgram;
use crate::core::texture::{TextureDesc, TextureFormat, TextureUsage};
use crate::geometry::camera::Camera;
use crate::geometry::transform::compute_normal_matrix;
use crate::io::obj_loader::load_obj_model;
use crate::io::render_settings::{RenderSettings, ShadingMode, parse_point3, parse_vec3};
use crate::scene::model::{Mesh, ModelNode};
use crate::shaders::{BaseColorShader, DepthShader, LambertShader, SceneUniforms};
use crate::utils::save_utils::save_render_result;
use nalgebra::{Matrix3, Matrix4, Point3, Vector3};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// Result of one rendered frame
pub struct RenderOutput {
    pub frame_buffer: FrameBuffer,
    /// Summed over every draw of the frame
    pub stats: DrawStats,
    pub meshes_drawn: usize,
    /// Meshes skipped because their bounds lie outside the view frustum
    pub meshes_culled: usize,
}

pub struct SceneViewer {
    settings: RenderSettings,
    camera: Camera,
    renderer: SoftRenderer,
    log: LogContext,
}

impl SceneViewer {
    pub fn new(settings: RenderSettings, log: LogContext) -> Result<Self, String> {
        settings.validate()?;
        let camera = Camera::new_perspective(
            parse_point3(&settings.camera_from)?,
            parse_point3(&settings.camera_at)?,
            parse_vec3(&settings.camera_up)?,
            settings.camera_fov,
            settings.aspect_ratio(),
            settings.camera_near,
            settings.camera_far,
        );
        let renderer = SoftRenderer::new(settings.renderer_config(), log)?;
        Ok(Self {
            settings,
            camera,
            renderer,
            log,
        })
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    /// The model (OBJ or built-in cube) plus the enabled helper geometry.
    pub fn build_scene(&self) -> Result<ModelNode, String> {
        let settings = &self.settings;
        let base_color = settings.base_color_vec();

        let mut model = match &settings.obj {
            Some(path) => load_obj_model(path, base_color, self.log)?,
            None => ModelNode::cube(base_color),
        };
        if settings.colorize {
            model.colorize();
        }
        let bounds = model.bounding_box();

        let mut root = ModelNode::new("scene");
        root.add_child(model);

        if settings.floor {
            let (y, half_extent) = bounds.map_or((-0.5, 2.0), |b| {
                let size = b.max - b.min;
                (b.min.y, size.x.max(size.z).max(1.0) * 1.5)
            });
            root.add_child(ModelNode::floor(half_extent, y, Vector3::new(0.55, 0.55, 0.55)));
        }
        if settings.world_axis {
            root.add_child(ModelNode::world_axis(5));
        }
        if settings.point_light {
            root.add_child(ModelNode::light_point(
                Point3::from(settings.light_position_vec()),
                settings.light_color_vec(),
            ));
        }
        Ok(root)
    }

    /// Color plus depth target sized and sampled per the settings.
    pub fn create_frame_buffer(&self) -> Result<FrameBuffer, String> {
        let multi_sample = self.settings.msaa == 4;
        let color_desc = TextureDesc {
            width: self.settings.width,
            height: self.settings.height,
            format: TextureFormat::Rgba8,
            usage: TextureUsage::ATTACHMENT_COLOR | TextureUsage::RENDERER_OUTPUT,
            multi_sample,
            tag: "viewer color".to_string(),
            ..Default::default()
        };
        let depth_desc = TextureDesc {
            format: TextureFormat::Float32,
            usage: TextureUsage::ATTACHMENT_DEPTH,
            tag: "viewer depth".to_string(),
            ..color_desc.clone()
        };

        let color = self
            .renderer
            .create_texture(&color_desc)
            .ok_or("failed to create color attachment")?;
        let depth = self
            .renderer
            .create_texture(&depth_desc)
            .ok_or("failed to create depth attachment")?;

        let mut frame_buffer = self.renderer.create_frame_buffer(true);
        if !frame_buffer.set_color_attachment(color, 0) || !frame_buffer.set_depth_attachment(depth) {
            return Err("failed to attach render targets".to_string());
        }
        Ok(frame_buffer)
    }

    fn create_program(&self) -> Arc<dyn ShaderProgram> {
        match self.settings.shading {
            ShadingMode::BaseColor => self.renderer.create_shader_program(BaseColorShader),
            ShadingMode::Lambert => self.renderer.create_shader_program(LambertShader),
            ShadingMode::Depth => self.renderer.create_shader_program(DepthShader),
        }
    }

    /// Draws every mesh of `scene` that survives frustum culling.
    pub fn render(&mut self, scene: &ModelNode) -> Result<RenderOutput, String> {
        let frame_start = Instant::now();
        let frame_buffer = self.create_frame_buffer()?;
        let (width, height) = (frame_buffer.width(), frame_buffer.height());

        let mut meshes: Vec<(&Mesh, Matrix4<f32>)> = Vec::new();
        scene.visit_meshes(&Matrix4::identity(), &mut |mesh, world| {
            if !mesh.is_empty() {
                meshes.push((mesh, *world));
            }
        });

        let frustum = self.camera.frustum();
        let program = self.create_program();
        let base_states = self.renderer.create_pipeline_states(&self.settings.render_states());
        let view_projection = self.camera.view_projection_matrix;
        let uniforms = SceneUniforms {
            light_position: self.settings.light_position_vec(),
            light_color: self.settings.light_color_vec(),
            base_color: self.settings.base_color_vec().push(1.0),
            ..Default::default()
        };

        if !self
            .renderer
            .begin_render_pass(frame_buffer, &self.settings.clear_states())
        {
            return Err("render pass could not start".to_string());
        }
        self.renderer
            .set_viewport(0.0, 0.0, width as f32, height as f32);
        self.renderer.set_shader_program(program);

        let mut stats = DrawStats::default();
        let mut meshes_drawn = 0;
        let mut meshes_culled = 0;
        for (mesh, world) in meshes {
            let visible = mesh
                .bounding_box()
                .is_some_and(|b| frustum.intersects_box(&b.transform(&world)));
            if !visible {
                self.log.debug(format_args!("mesh '{}' outside the frustum, skipped", mesh.name));
                meshes_culled += 1;
                continue;
            }

            let vertex_data = mesh.vertex_buffer();
            let Some(vao) = self
                .renderer
                .create_vertex_array_object(&mesh.vertex_array(&vertex_data))
            else {
                return Err(format!("mesh '{}' has an invalid vertex layout", mesh.name));
            };

            let normal_matrix = compute_normal_matrix(&world).unwrap_or_else(|| {
                self.log.warn(format_args!(
                    "mesh '{}' has a singular transform, normals left untransformed",
                    mesh.name
                ));
                Matrix3::identity()
            });
            let mesh_uniforms = SceneUniforms {
                mvp: view_projection * world,
                model: world,
                normal_matrix: normal_matrix.to_homogeneous(),
                point_size: mesh.point_size,
                ..uniforms.clone()
            };
            let mut states = base_states;
            states.primitive_type = mesh.primitive_type;
            if mesh.overlay {
                states.depth_mask = false;
                states.cull_face = false;
                states.polygon_mode = Default::default();
            }

            self.renderer.set_vertex_array_object(Arc::new(vao));
            self.renderer
                .set_shader_resources(Arc::new(mesh_uniforms.to_resources()));
            self.renderer.set_pipeline_states(&states);
            self.renderer.draw();
            stats += self.renderer.last_draw_stats();
            meshes_drawn += 1;
        }

        let frame_buffer = self
            .renderer
            .end_render_pass()
            .ok_or("render pass returned no frame buffer")?;
        self.log.info(format_args!(
            "frame {}x{} ({}x MSAA): {} meshes drawn, {} culled, {} fragment invocations in {:?}",
            width,
            height,
            self.settings.msaa,
            meshes_drawn,
            meshes_culled,
            stats.fragment_invocations,
            frame_start.elapsed()
        ));

        Ok(RenderOutput {
            frame_buffer,
            stats,
            meshes_drawn,
            meshes_culled,
        })
    }

    /// Builds, renders and saves one frame. Returns the written files.
    pub fn run(&mut self) -> Result<Vec<PathBuf>, String> {
        let scene = self.build_scene()?;
        self.log.info(format_args!(
            "scene ready: {} meshes, camera at {:?}",
            scene.mesh_count(),
            self.camera.position
        ));
        let output = self.render(&scene)?;
        save_render_result(
            &output.frame_buffer,
            &self.settings.output_dir,
            &self.settings.output,
            self.settings.save_depth,
            self.settings.clear_depth,
        )
    }
}
