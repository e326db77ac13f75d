use crate::core::buffer::BufferLayout;
use crate::core::render_states::{
    BlendFactor, BlendFunction, BlendParameters, ClearStates, DepthFunction, PolygonMode,
    RenderStates,
};
use crate::core::renderer::RendererConfig;
use crate::core::thread_pool::DEFAULT_BLOCK_SIZE;
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// Shader injected by the headless viewer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShadingMode {
    /// Constant `base_color`
    BaseColor,
    /// Vertex color lit by the point light
    #[default]
    Lambert,
    /// Grayscale window depth
    Depth,
}

/// Everything the headless viewer can be configured with, one field per
/// TOML key. Vector values are kept as `"x,y,z"` strings and parsed on use.
#[derive(Debug, Clone)]
pub struct RenderSettings {
    // [files]
    /// OBJ model; the built-in cube is drawn when unset
    pub obj: Option<String>,
    /// Base name of the written images
    pub output: String,
    pub output_dir: String,

    // [render]
    pub width: usize,
    pub height: usize,
    /// 1 or 4
    pub msaa: usize,
    pub early_z: bool,
    /// Worker threads, 0 for all cores
    pub threads: usize,
    pub block_size: usize,
    pub buffer_layout: BufferLayout,
    pub save_depth: bool,
    /// Random per-face colors instead of the base color
    pub colorize: bool,
    pub shading: ShadingMode,

    // [pipeline]
    pub depth_test: bool,
    pub depth_mask: bool,
    pub depth_func: DepthFunction,
    pub cull_face: bool,
    pub blend: bool,
    pub blend_src: BlendFactor,
    pub blend_dst: BlendFactor,
    pub blend_func: BlendFunction,
    pub polygon_mode: PolygonMode,
    pub line_width: f32,

    // [clear]
    pub clear_color: String,
    pub clear_depth: f32,

    // [camera]
    pub camera_from: String,
    pub camera_at: String,
    pub camera_up: String,
    /// Vertical field of view in degrees
    pub camera_fov: f32,
    pub camera_near: f32,
    pub camera_far: f32,

    // [scene]
    pub world_axis: bool,
    pub floor: bool,
    pub point_light: bool,
    pub light_position: String,
    pub light_color: String,
    pub base_color: String,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            obj: None,
            output: "output".to_string(),
            output_dir: "output_softrender".to_string(),

            width: 800,
            height: 600,
            msaa: 1,
            early_z: true,
            threads: 0,
            block_size: DEFAULT_BLOCK_SIZE,
            buffer_layout: BufferLayout::Tiled,
            save_depth: true,
            colorize: false,
            shading: ShadingMode::Lambert,

            depth_test: true,
            depth_mask: true,
            depth_func: DepthFunction::Less,
            cull_face: false,
            blend: false,
            blend_src: BlendFactor::SrcAlpha,
            blend_dst: BlendFactor::OneMinusSrcAlpha,
            blend_func: BlendFunction::Add,
            polygon_mode: PolygonMode::Fill,
            line_width: 1.0,

            clear_color: "0.1,0.1,0.12".to_string(),
            clear_depth: 1.0,

            camera_from: "2.5,2,3.5".to_string(),
            camera_at: "0,0,0".to_string(),
            camera_up: "0,1,0".to_string(),
            camera_fov: 45.0,
            camera_near: 0.1,
            camera_far: 100.0,

            world_axis: false,
            floor: true,
            point_light: true,
            light_position: "1.2,1.5,1.2".to_string(),
            light_color: "1,1,1".to_string(),
            base_color: "0.8,0.8,0.8".to_string(),
        }
    }
}

pub fn parse_vec3(s: &str) -> Result<Vector3<f32>, String> {
    let parts: Vec<&str> = s.split(',').collect();
    if parts.len() != 3 {
        return Err(format!("expected 3 comma separated values, got '{}'", s));
    }
    let mut v = Vector3::zeros();
    for (slot, part) in v.iter_mut().zip(&parts) {
        *slot = part
            .trim()
            .parse::<f32>()
            .map_err(|e| format!("invalid number '{}': {}", part, e))?;
    }
    Ok(v)
}

pub fn parse_point3(s: &str) -> Result<Point3<f32>, String> {
    parse_vec3(s).map(Point3::from)
}

impl RenderSettings {
    pub fn renderer_config(&self) -> RendererConfig {
        RendererConfig {
            threads: self.threads,
            block_size: self.block_size,
            early_z: self.early_z,
            buffer_layout: self.buffer_layout,
        }
    }

    pub fn render_states(&self) -> RenderStates {
        let mut blend_params = BlendParameters::default();
        blend_params.set_blend_factor(self.blend_src, self.blend_dst);
        blend_params.set_blend_func(self.blend_func);
        RenderStates {
            blend: self.blend,
            blend_params,
            depth_test: self.depth_test,
            depth_mask: self.depth_mask,
            depth_func: self.depth_func,
            cull_face: self.cull_face,
            polygon_mode: self.polygon_mode,
            line_width: self.line_width,
            ..Default::default()
        }
    }

    pub fn clear_states(&self) -> ClearStates {
        let c = self.clear_color_vec();
        ClearStates {
            clear_depth: self.clear_depth,
            ..ClearStates::color_and_depth([c.x, c.y, c.z, 1.0])
        }
    }

    /// The vector accessors fall back to the defaults; [`Self::validate`]
    /// rejects unparsable values before the viewer reads them.
    pub fn clear_color_vec(&self) -> Vector3<f32> {
        parse_vec3(&self.clear_color).unwrap_or_else(|_| Vector3::new(0.1, 0.1, 0.12))
    }

    pub fn light_position_vec(&self) -> Vector3<f32> {
        parse_vec3(&self.light_position).unwrap_or_else(|_| Vector3::new(1.2, 1.5, 1.2))
    }

    pub fn light_color_vec(&self) -> Vector3<f32> {
        parse_vec3(&self.light_color).unwrap_or_else(|_| Vector3::new(1.0, 1.0, 1.0))
    }

    pub fn base_color_vec(&self) -> Vector3<f32> {
        parse_vec3(&self.base_color).unwrap_or_else(|_| Vector3::new(0.8, 0.8, 0.8))
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }

    /// Checks what the viewer cannot recover from.
    pub fn validate(&self) -> Result<(), String> {
        if self.width == 0 || self.height == 0 {
            return Err("image width and height must be positive".to_string());
        }
        if let Some(obj_path) = &self.obj {
            if !std::path::Path::new(obj_path).exists() {
                return Err(format!("OBJ file '{}' not found", obj_path));
            }
        }
        if self.output_dir.trim().is_empty() {
            return Err("output directory must not be empty".to_string());
        }
        if self.output.trim().is_empty() {
            return Err("output name must not be empty".to_string());
        }
        if self.msaa != 1 && self.msaa != 4 {
            return Err(format!("msaa must be 1 or 4, got {}", self.msaa));
        }

        for (name, value) in [
            ("camera from", &self.camera_from),
            ("camera at", &self.camera_at),
            ("camera up", &self.camera_up),
            ("light position", &self.light_position),
            ("light color", &self.light_color),
            ("base color", &self.base_color),
            ("clear color", &self.clear_color),
        ] {
            parse_vec3(value).map_err(|e| format!("{} should be x,y,z: {}", name, e))?;
        }

        if !(self.camera_near > 0.0 && self.camera_far > self.camera_near) {
            return Err(format!(
                "camera clip range must satisfy 0 < near < far, got {}..{}",
                self.camera_near, self.camera_far
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_comma_separated_vectors() {
        assert_eq!(parse_vec3(" 1, -2.5 ,3").unwrap(), Vector3::new(1.0, -2.5, 3.0));
        assert!(parse_vec3("1,2").is_err());
        assert!(parse_vec3("1,x,3").is_err());
        assert_eq!(parse_point3("0,1,0").unwrap(), Point3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn defaults_are_valid() {
        let settings = RenderSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.renderer_config(), RendererConfig::default());
    }

    #[test]
    fn pipeline_section_maps_to_render_states() {
        let settings = RenderSettings {
            blend: true,
            cull_face: true,
            polygon_mode: PolygonMode::Line,
            ..Default::default()
        };
        let states = settings.render_states();
        assert!(states.blend && states.cull_face && states.depth_test);
        assert_eq!(states.blend_params, BlendParameters::alpha_blending());
        assert_eq!(states.polygon_mode, PolygonMode::Line);

        let clear = settings.clear_states();
        assert!(clear.color_flag && clear.depth_flag);
        assert_eq!(clear.clear_color[3], 1.0);
    }

    #[test]
    fn rejects_bad_sample_count_and_clip_range() {
        let settings = RenderSettings {
            msaa: 2,
            ..Default::default()
        };
        assert!(settings.validate().is_err());

        let settings = RenderSettings {
            camera_near: 5.0,
            camera_far: 1.0,
            ..Default::default()
        };
        assert!(settings.validate().is_err());

        let settings = RenderSettings {
            clear_color: "red".to_string(),
            ..Default::default()
        };
        assert!(settings.validate().unwrap_err().contains("clear color"));
        assert_eq!(settings.clear_color_vec(), Vector3::new(0.1, 0.1, 0.12));
    }
}
