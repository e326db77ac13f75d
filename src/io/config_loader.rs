use crate::core::log_context::LogContext;
use crate::io::render_settings::RenderSettings;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use toml::Value;

/// Reads and writes [`RenderSettings`] as TOML.
pub struct TomlConfigLoader;

impl TomlConfigLoader {
    pub fn load_from_file<P: AsRef<Path>>(path: P, log: LogContext) -> Result<RenderSettings, String> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            format!(
                "failed to read config file {}: {}",
                path.as_ref().display(),
                e
            )
        })?;

        Self::load_from_content(&content, log)
    }

    pub fn load_from_content(content: &str, log: LogContext) -> Result<RenderSettings, String> {
        let toml_value: Value =
            toml::from_str(content).map_err(|e| format!("failed to parse TOML: {}", e))?;

        Self::parse_toml_to_settings(toml_value, log)
    }

    pub fn save_to_file<P: AsRef<Path>>(settings: &RenderSettings, path: P) -> Result<(), String> {
        let toml_content = Self::settings_to_toml(settings)?;
        std::fs::write(path, toml_content).map_err(|e| format!("failed to write config file: {}", e))
    }

    /// Writes the defaults, with an OBJ path filled in, as a starting point.
    pub fn create_example_config<P: AsRef<Path>>(path: P) -> Result<(), String> {
        let settings = RenderSettings {
            obj: Some("obj/bunny.obj".to_string()),
            world_axis: true,
            ..Default::default()
        };
        Self::save_to_file(&settings, path)
    }

    // ===== TOML -> RenderSettings =====

    fn parse_toml_to_settings(toml: Value, log: LogContext) -> Result<RenderSettings, String> {
        let mut settings = RenderSettings::default();

        if let Some(files) = toml.get("files").and_then(|v| v.as_table()) {
            Self::parse_files_section(&mut settings, files)?;
        }
        if let Some(render) = toml.get("render").and_then(|v| v.as_table()) {
            Self::parse_render_section(&mut settings, render, log)?;
        }
        if let Some(pipeline) = toml.get("pipeline").and_then(|v| v.as_table()) {
            Self::parse_pipeline_section(&mut settings, pipeline, log)?;
        }
        if let Some(clear) = toml.get("clear").and_then(|v| v.as_table()) {
            Self::parse_clear_section(&mut settings, clear, log)?;
        }
        if let Some(camera) = toml.get("camera").and_then(|v| v.as_table()) {
            Self::parse_camera_section(&mut settings, camera, log)?;
        }
        if let Some(scene) = toml.get("scene").and_then(|v| v.as_table()) {
            Self::parse_scene_section(&mut settings, scene)?;
        }

        Ok(settings)
    }

    fn parse_files_section(
        settings: &mut RenderSettings,
        files: &toml::Table,
    ) -> Result<(), String> {
        if let Some(obj) = files.get("obj").and_then(|v| v.as_str()) {
            settings.obj = Some(obj.to_string());
        }
        if let Some(output) = files.get("output").and_then(|v| v.as_str()) {
            settings.output = output.to_string();
        }
        if let Some(output_dir) = files.get("output_dir").and_then(|v| v.as_str()) {
            settings.output_dir = output_dir.to_string();
        }
        Ok(())
    }

    fn parse_render_section(
        settings: &mut RenderSettings,
        render: &toml::Table,
        log: LogContext,
    ) -> Result<(), String> {
        if let Some(width) = render.get("width").and_then(|v| v.as_integer()) {
            if width > 0 {
                settings.width = width as usize;
            } else {
                log.warn(format_args!(
                    "render.width = {} is not positive, keeping {}", width, settings.width
                ));
            }
        }
        if let Some(height) = render.get("height").and_then(|v| v.as_integer()) {
            if height > 0 {
                settings.height = height as usize;
            } else {
                log.warn(format_args!(
                    "render.height = {} is not positive, keeping {}", height, settings.height
                ));
            }
        }
        if let Some(msaa) = render.get("msaa").and_then(|v| v.as_integer()) {
            match msaa {
                1 | 4 => settings.msaa = msaa as usize,
                _ => log.warn(format_args!(
                    "render.msaa = {} unsupported (1 or 4), keeping {}", msaa, settings.msaa
                )),
            }
        }
        if let Some(early_z) = render.get("early_z").and_then(|v| v.as_bool()) {
            settings.early_z = early_z;
        }
        if let Some(threads) = render.get("threads").and_then(|v| v.as_integer()) {
            if threads >= 0 {
                settings.threads = threads as usize;
            } else {
                log.warn(format_args!(
                    "render.threads = {} is negative, keeping {}", threads, settings.threads
                ));
            }
        }
        if let Some(block_size) = render.get("block_size").and_then(|v| v.as_integer()) {
            if (2..=1024).contains(&block_size) {
                settings.block_size = block_size as usize;
            } else {
                log.warn(format_args!(
                    "render.block_size = {} out of range 2..=1024, keeping {}",
                    block_size, settings.block_size
                ));
            }
        }
        if let Some(layout) = render.get("buffer_layout") {
            settings.buffer_layout = parse_enum("render.buffer_layout", layout)?;
        }
        if let Some(save_depth) = render.get("save_depth").and_then(|v| v.as_bool()) {
            settings.save_depth = save_depth;
        }
        if let Some(colorize) = render.get("colorize").and_then(|v| v.as_bool()) {
            settings.colorize = colorize;
        }
        if let Some(shading) = render.get("shading") {
            settings.shading = parse_enum("render.shading", shading)?;
        }
        Ok(())
    }

    fn parse_pipeline_section(
        settings: &mut RenderSettings,
        pipeline: &toml::Table,
        log: LogContext,
    ) -> Result<(), String> {
        if let Some(depth_test) = pipeline.get("depth_test").and_then(|v| v.as_bool()) {
            settings.depth_test = depth_test;
        }
        if let Some(depth_mask) = pipeline.get("depth_mask").and_then(|v| v.as_bool()) {
            settings.depth_mask = depth_mask;
        }
        if let Some(depth_func) = pipeline.get("depth_func") {
            settings.depth_func = parse_enum("pipeline.depth_func", depth_func)?;
        }
        if let Some(cull_face) = pipeline.get("cull_face").and_then(|v| v.as_bool()) {
            settings.cull_face = cull_face;
        }
        if let Some(blend) = pipeline.get("blend").and_then(|v| v.as_bool()) {
            settings.blend = blend;
        }
        if let Some(blend_src) = pipeline.get("blend_src") {
            settings.blend_src = parse_enum("pipeline.blend_src", blend_src)?;
        }
        if let Some(blend_dst) = pipeline.get("blend_dst") {
            settings.blend_dst = parse_enum("pipeline.blend_dst", blend_dst)?;
        }
        if let Some(blend_func) = pipeline.get("blend_func") {
            settings.blend_func = parse_enum("pipeline.blend_func", blend_func)?;
        }
        if let Some(polygon_mode) = pipeline.get("polygon_mode") {
            settings.polygon_mode = parse_enum("pipeline.polygon_mode", polygon_mode)?;
        }
        if let Some(line_width) = pipeline.get("line_width").and_then(as_number) {
            if line_width > 0.0 {
                settings.line_width = line_width as f32;
            } else {
                log.warn(format_args!(
                    "pipeline.line_width = {} is not positive, keeping {}",
                    line_width, settings.line_width
                ));
            }
        }
        Ok(())
    }

    fn parse_clear_section(
        settings: &mut RenderSettings,
        clear: &toml::Table,
        log: LogContext,
    ) -> Result<(), String> {
        if let Some(color) = clear.get("color").and_then(|v| v.as_str()) {
            settings.clear_color = color.to_string();
        }
        if let Some(depth) = clear.get("depth").and_then(as_number) {
            if (0.0..=1.0).contains(&depth) {
                settings.clear_depth = depth as f32;
            } else {
                log.warn(format_args!(
                    "clear.depth = {} outside [0, 1], keeping {}", depth, settings.clear_depth
                ));
            }
        }
        Ok(())
    }

    fn parse_camera_section(
        settings: &mut RenderSettings,
        camera: &toml::Table,
        log: LogContext,
    ) -> Result<(), String> {
        if let Some(from) = camera.get("from").and_then(|v| v.as_str()) {
            settings.camera_from = from.to_string();
        }
        if let Some(at) = camera.get("at").and_then(|v| v.as_str()) {
            settings.camera_at = at.to_string();
        }
        if let Some(up) = camera.get("up").and_then(|v| v.as_str()) {
            settings.camera_up = up.to_string();
        }
        if let Some(fov) = camera.get("fov").and_then(as_number) {
            if fov > 0.0 && fov < 180.0 {
                settings.camera_fov = fov as f32;
            } else {
                log.warn(format_args!(
                    "camera.fov = {} outside (0, 180), keeping {}", fov, settings.camera_fov
                ));
            }
        }
        if let Some(near) = camera.get("near").and_then(as_number) {
            if near > 0.0 {
                settings.camera_near = near as f32;
            } else {
                log.warn(format_args!(
                    "camera.near = {} is not positive, keeping {}", near, settings.camera_near
                ));
            }
        }
        if let Some(far) = camera.get("far").and_then(as_number) {
            if far > 0.0 {
                settings.camera_far = far as f32;
            } else {
                log.warn(format_args!(
                    "camera.far = {} is not positive, keeping {}", far, settings.camera_far
                ));
            }
        }
        Ok(())
    }

    fn parse_scene_section(
        settings: &mut RenderSettings,
        scene: &toml::Table,
    ) -> Result<(), String> {
        if let Some(world_axis) = scene.get("world_axis").and_then(|v| v.as_bool()) {
            settings.world_axis = world_axis;
        }
        if let Some(floor) = scene.get("floor").and_then(|v| v.as_bool()) {
            settings.floor = floor;
        }
        if let Some(point_light) = scene.get("point_light").and_then(|v| v.as_bool()) {
            settings.point_light = point_light;
        }
        if let Some(position) = scene.get("light_position").and_then(|v| v.as_str()) {
            settings.light_position = position.to_string();
        }
        if let Some(color) = scene.get("light_color").and_then(|v| v.as_str()) {
            settings.light_color = color.to_string();
        }
        if let Some(color) = scene.get("base_color").and_then(|v| v.as_str()) {
            settings.base_color = color.to_string();
        }
        Ok(())
    }

    // ===== RenderSettings -> TOML =====

    fn settings_to_toml(settings: &RenderSettings) -> Result<String, String> {
        let mut content = String::new();

        content.push_str("# softrender configuration\n\n");

        content.push_str("[files]\n");
        if let Some(obj) = &settings.obj {
            content.push_str(&format!("obj = \"{}\"\n", obj));
        } else {
            content.push_str("# obj = \"path/to/model.obj\"  # built-in cube when unset\n");
        }
        content.push_str(&format!("output = \"{}\"\n", settings.output));
        content.push_str(&format!("output_dir = \"{}\"\n", settings.output_dir));
        content.push('\n');

        content.push_str("[render]\n");
        content.push_str(&format!("width = {}\n", settings.width));
        content.push_str(&format!("height = {}\n", settings.height));
        content.push_str(&format!("msaa = {}  # 1 or 4\n", settings.msaa));
        content.push_str(&format!("early_z = {}\n", settings.early_z));
        content.push_str(&format!("threads = {}  # 0 = all cores\n", settings.threads));
        content.push_str(&format!("block_size = {}\n", settings.block_size));
        content.push_str(&format!(
            "buffer_layout = \"{}\"  # linear, tiled, morton\n",
            enum_name(&settings.buffer_layout)?
        ));
        content.push_str(&format!("save_depth = {}\n", settings.save_depth));
        content.push_str(&format!("colorize = {}\n", settings.colorize));
        content.push_str(&format!(
            "shading = \"{}\"  # base_color, lambert, depth\n",
            enum_name(&settings.shading)?
        ));
        content.push('\n');

        content.push_str("[pipeline]\n");
        content.push_str(&format!("depth_test = {}\n", settings.depth_test));
        content.push_str(&format!("depth_mask = {}\n", settings.depth_mask));
        content.push_str(&format!("depth_func = \"{}\"\n", enum_name(&settings.depth_func)?));
        content.push_str(&format!("cull_face = {}\n", settings.cull_face));
        content.push_str(&format!("blend = {}\n", settings.blend));
        content.push_str(&format!("blend_src = \"{}\"\n", enum_name(&settings.blend_src)?));
        content.push_str(&format!("blend_dst = \"{}\"\n", enum_name(&settings.blend_dst)?));
        content.push_str(&format!("blend_func = \"{}\"\n", enum_name(&settings.blend_func)?));
        content.push_str(&format!(
            "polygon_mode = \"{}\"  # point, line, fill\n",
            enum_name(&settings.polygon_mode)?
        ));
        content.push_str(&format!("line_width = {:?}\n", settings.line_width));
        content.push('\n');

        content.push_str("[clear]\n");
        content.push_str(&format!("color = \"{}\"\n", settings.clear_color));
        content.push_str(&format!("depth = {:?}\n", settings.clear_depth));
        content.push('\n');

        content.push_str("[camera]\n");
        content.push_str(&format!("from = \"{}\"\n", settings.camera_from));
        content.push_str(&format!("at = \"{}\"\n", settings.camera_at));
        content.push_str(&format!("up = \"{}\"\n", settings.camera_up));
        content.push_str(&format!("fov = {:?}\n", settings.camera_fov));
        content.push_str(&format!("near = {:?}\n", settings.camera_near));
        content.push_str(&format!("far = {:?}\n", settings.camera_far));
        content.push('\n');

        content.push_str("[scene]\n");
        content.push_str(&format!("world_axis = {}\n", settings.world_axis));
        content.push_str(&format!("floor = {}\n", settings.floor));
        content.push_str(&format!("point_light = {}\n", settings.point_light));
        content.push_str(&format!("light_position = \"{}\"\n", settings.light_position));
        content.push_str(&format!("light_color = \"{}\"\n", settings.light_color));
        content.push_str(&format!("base_color = \"{}\"\n", settings.base_color));

        Ok(content)
    }
}

/// Integers are accepted wherever a float is expected.
fn as_number(value: &Value) -> Option<f64> {
    value
        .as_float()
        .or_else(|| value.as_integer().map(|i| i as f64))
}

fn parse_enum<T: DeserializeOwned>(key: &str, value: &Value) -> Result<T, String> {
    value
        .clone()
        .try_into::<T>()
        .map_err(|e| format!("invalid value {} for {}: {}", value, key, e))
}

fn enum_name<T: Serialize>(value: &T) -> Result<String, String> {
    match Value::try_from(value) {
        Ok(Value::String(name)) => Ok(name),
        Ok(other) => Err(format!("expected a name, serialized to {}", other)),
        Err(e) => Err(format!("failed to serialize setting: {}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::buffer::BufferLayout;
    use crate::core::render_states::{BlendFactor, DepthFunction, PolygonMode};
    use crate::io::render_settings::ShadingMode;

    #[test]
    fn reads_every_section() {
        let settings = TomlConfigLoader::load_from_content(
            r#"
            [files]
            output = "frame"
            [render]
            width = 320
            height = 200
            msaa = 4
            threads = 2
            buffer_layout = "morton"
            shading = "depth"
            [pipeline]
            depth_func = "lequal"
            blend = true
            blend_src = "one"
            polygon_mode = "line"
            line_width = 3
            [clear]
            color = "1,0,0"
            depth = 0.5
            [camera]
            fov = 60
            far = 10.0
            [scene]
            floor = false
            "#,
            LogContext::silent(),
        )
        .unwrap();
        assert_eq!(settings.output, "frame");
        assert_eq!((settings.width, settings.height), (320, 200));
        assert_eq!(settings.msaa, 4);
        assert_eq!(settings.threads, 2);
        assert_eq!(settings.buffer_layout, BufferLayout::Morton);
        assert_eq!(settings.shading, ShadingMode::Depth);
        assert_eq!(settings.depth_func, DepthFunction::LEqual);
        assert!(settings.blend);
        assert_eq!(settings.blend_src, BlendFactor::One);
        assert_eq!(settings.polygon_mode, PolygonMode::Line);
        assert_eq!(settings.line_width, 3.0);
        assert_eq!(settings.clear_color, "1,0,0");
        assert_eq!(settings.clear_depth, 0.5);
        assert_eq!(settings.camera_fov, 60.0);
        assert_eq!(settings.camera_far, 10.0);
        assert!(!settings.floor);
    }

    #[test]
    fn unknown_enum_value_is_an_error() {
        let log = LogContext::silent();
        let err = TomlConfigLoader::load_from_content("[pipeline]\ndepth_func = \"sometimes\"", log)
            .unwrap_err();
        assert!(err.contains("pipeline.depth_func"), "{err}");
        assert!(TomlConfigLoader::load_from_content("[render]\nbuffer_layout = \"zigzag\"", log).is_err());
    }

    #[test]
    fn out_of_range_numbers_keep_defaults() {
        let defaults = RenderSettings::default();
        let settings = TomlConfigLoader::load_from_content(
            "[render]\nwidth = -5\nmsaa = 3\nblock_size = 0\n[camera]\nfov = 270.0",
            LogContext::silent(),
        )
        .unwrap();
        assert_eq!(settings.width, defaults.width);
        assert_eq!(settings.msaa, defaults.msaa);
        assert_eq!(settings.block_size, defaults.block_size);
        assert_eq!(settings.camera_fov, defaults.camera_fov);
    }

    #[test]
    fn written_config_reads_back() {
        let settings = RenderSettings {
            obj: Some("model.obj".to_string()),
            msaa: 4,
            buffer_layout: BufferLayout::Linear,
            polygon_mode: PolygonMode::Point,
            cull_face: true,
            ..Default::default()
        };
        let content = TomlConfigLoader::settings_to_toml(&settings).unwrap();
        let back = TomlConfigLoader::load_from_content(&content, LogContext::silent()).unwrap();
        assert_eq!(back.obj.as_deref(), Some("model.obj"));
        assert_eq!(back.msaa, 4);
        assert_eq!(back.buffer_layout, BufferLayout::Linear);
        assert_eq!(back.polygon_mode, PolygonMode::Point);
        assert!(back.cull_face);
        assert_eq!(back.line_width, settings.line_width);
        assert_eq!(back.camera_near, settings.camera_near);
    }
}
