use serde::{Deserialize, Serialize};

/// Depth comparison, evaluated as `incoming <op> stored`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepthFunction {
    Never,
    #[default]
    Less,
    Equal,
    #[serde(alias = "lequal")]
    LEqual,
    Greater,
    NotEqual,
    #[serde(alias = "gequal")]
    GEqual,
    Always,
}

impl DepthFunction {
    #[inline]
    pub fn test(self, incoming: f32, stored: f32) -> bool {
        match self {
            DepthFunction::Never => false,
            DepthFunction::Less => incoming < stored,
            DepthFunction::Equal => incoming == stored,
            DepthFunction::LEqual => incoming <= stored,
            DepthFunction::Greater => incoming > stored,
            DepthFunction::NotEqual => incoming != stored,
            DepthFunction::GEqual => incoming >= stored,
            DepthFunction::Always => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendFactor {
    Zero,
    One,
    SrcColor,
    SrcAlpha,
    DstColor,
    DstAlpha,
    OneMinusSrcColor,
    OneMinusSrcAlpha,
    OneMinusDstColor,
    OneMinusDstAlpha,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendFunction {
    #[default]
    Add,
    Subtract,
    ReverseSubtract,
    Min,
    Max,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolygonMode {
    Point,
    Line,
    #[default]
    Fill,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimitiveType {
    Point,
    Line,
    #[default]
    Triangle,
}

impl PrimitiveType {
    /// Number of vertex indices consumed per primitive
    pub fn vertex_count(self) -> usize {
        match self {
            PrimitiveType::Point => 1,
            PrimitiveType::Line => 2,
            PrimitiveType::Triangle => 3,
        }
    }
}

/// Separate RGB and alpha blend equations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlendParameters {
    pub blend_func_rgb: BlendFunction,
    pub blend_src_rgb: BlendFactor,
    pub blend_dst_rgb: BlendFactor,

    pub blend_func_alpha: BlendFunction,
    pub blend_src_alpha: BlendFactor,
    pub blend_dst_alpha: BlendFactor,
}

impl Default for BlendParameters {
    fn default() -> Self {
        Self {
            blend_func_rgb: BlendFunction::Add,
            blend_src_rgb: BlendFactor::One,
            blend_dst_rgb: BlendFactor::Zero,
            blend_func_alpha: BlendFunction::Add,
            blend_src_alpha: BlendFactor::One,
            blend_dst_alpha: BlendFactor::Zero,
        }
    }
}

impl BlendParameters {
    /// Same factors for RGB and alpha
    pub fn set_blend_factor(&mut self, src: BlendFactor, dst: BlendFactor) {
        self.blend_src_rgb = src;
        self.blend_src_alpha = src;
        self.blend_dst_rgb = dst;
        self.blend_dst_alpha = dst;
    }

    pub fn set_blend_func(&mut self, func: BlendFunction) {
        self.blend_func_rgb = func;
        self.blend_func_alpha = func;
    }

    /// Classic `src * a + dst * (1 - a)` transparency
    pub fn alpha_blending() -> Self {
        let mut params = Self::default();
        params.set_blend_factor(BlendFactor::SrcAlpha, BlendFactor::OneMinusSrcAlpha);
        params
    }
}

/// Fixed-function state captured by a pipeline-state object
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderStates {
    pub blend: bool,
    pub blend_params: BlendParameters,

    pub depth_test: bool,
    pub depth_mask: bool,
    pub depth_func: DepthFunction,

    pub cull_face: bool,
    pub primitive_type: PrimitiveType,
    pub polygon_mode: PolygonMode,

    pub line_width: f32,
}

impl Default for RenderStates {
    fn default() -> Self {
        Self {
            blend: false,
            blend_params: BlendParameters::default(),
            depth_test: false,
            depth_mask: true,
            depth_func: DepthFunction::Less,
            cull_face: false,
            primitive_type: PrimitiveType::Triangle,
            polygon_mode: PolygonMode::Fill,
            line_width: 1.0,
        }
    }
}

/// What `begin_render_pass` clears and to which values
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClearStates {
    pub color_flag: bool,
    pub depth_flag: bool,
    pub clear_color: [f32; 4],
    pub clear_depth: f32,
}

impl Default for ClearStates {
    fn default() -> Self {
        Self {
            color_flag: false,
            depth_flag: false,
            clear_color: [0.0, 0.0, 0.0, 0.0],
            clear_depth: 1.0,
        }
    }
}

impl ClearStates {
    pub fn color_and_depth(clear_color: [f32; 4]) -> Self {
        Self {
            color_flag: true,
            depth_flag: true,
            clear_color,
            clear_depth: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_functions_compare_incoming_against_stored() {
        assert!(DepthFunction::Less.test(0.2, 0.5));
        assert!(!DepthFunction::Less.test(0.5, 0.5));
        assert!(DepthFunction::LEqual.test(0.5, 0.5));
        assert!(DepthFunction::Greater.test(0.7, 0.5));
        assert!(DepthFunction::NotEqual.test(0.7, 0.5));
        assert!(!DepthFunction::Never.test(0.0, 1.0));
        assert!(DepthFunction::Always.test(2.0, 1.0));
    }

    #[test]
    fn enums_read_snake_case_names() {
        #[derive(Deserialize)]
        struct StateNames {
            func: DepthFunction,
            factor: BlendFactor,
            mode: PolygonMode,
        }
        let names: StateNames = toml::from_str(
            "func = \"lequal\"\nfactor = \"one_minus_src_alpha\"\nmode = \"line\"",
        )
        .unwrap();
        assert_eq!(names.func, DepthFunction::LEqual);
        assert_eq!(names.factor, BlendFactor::OneMinusSrcAlpha);
        assert_eq!(names.mode, PolygonMode::Line);

        let bad = "func = \"sometimes\"\nfactor = \"one\"\nmode = \"fill\"";
        assert!(toml::from_str::<StateNames>(bad).is_err());
    }
}
