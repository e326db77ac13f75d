//! Per-sample color operations.

use crate::core::render_states::{BlendFactor, BlendFunction, BlendParameters};
use crate::core::texture::{Rgba, Texel};
use nalgebra::Vector4;

fn blend_factor(factor: BlendFactor, src: &Vector4<f32>, dst: &Vector4<f32>) -> Vector4<f32> {
    match factor {
        BlendFactor::Zero => Vector4::zeros(),
        BlendFactor::One => Vector4::repeat(1.0),
        BlendFactor::SrcColor => *src,
        BlendFactor::SrcAlpha => Vector4::repeat(src.w),
        BlendFactor::DstColor => *dst,
        BlendFactor::DstAlpha => Vector4::repeat(dst.w),
        BlendFactor::OneMinusSrcColor => Vector4::repeat(1.0) - src,
        BlendFactor::OneMinusSrcAlpha => Vector4::repeat(1.0 - src.w),
        BlendFactor::OneMinusDstColor => Vector4::repeat(1.0) - dst,
        BlendFactor::OneMinusDstAlpha => Vector4::repeat(1.0 - dst.w),
    }
}

fn blend_function(
    func: BlendFunction,
    src: &Vector4<f32>,
    dst: &Vector4<f32>,
    src_factor: &Vector4<f32>,
    dst_factor: &Vector4<f32>,
) -> Vector4<f32> {
    let s = src.component_mul(src_factor);
    let d = dst.component_mul(dst_factor);
    match func {
        BlendFunction::Add => s + d,
        BlendFunction::Subtract => s - d,
        BlendFunction::ReverseSubtract => d - s,
        BlendFunction::Min => src.inf(dst),
        BlendFunction::Max => src.sup(dst),
    }
}

/// Combines `src` with the stored `dst` color; RGB and alpha use their own
/// function and factor pair.
pub fn blend(src: &Vector4<f32>, dst: &Vector4<f32>, params: &BlendParameters) -> Vector4<f32> {
    let rgb = blend_function(
        params.blend_func_rgb,
        src,
        dst,
        &blend_factor(params.blend_src_rgb, src, dst),
        &blend_factor(params.blend_dst_rgb, src, dst),
    );
    let alpha = blend_function(
        params.blend_func_alpha,
        src,
        dst,
        &blend_factor(params.blend_src_alpha, src, dst),
        &blend_factor(params.blend_dst_alpha, src, dst),
    );
    Vector4::new(rgb.x, rgb.y, rgb.z, alpha.w)
}

/// Final sample color: the shader output, blended against the stored
/// value when `params` is given.
#[inline]
pub fn output_color(
    shaded: &Vector4<f32>,
    stored: Option<Rgba>,
    params: Option<&BlendParameters>,
) -> Rgba {
    match (params, stored) {
        (Some(params), Some(dst)) => Rgba::from_vec4(&blend(shaded, &dst.to_vec4(), params)),
        _ => Rgba::from_vec4(shaded),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: &Vector4<f32>, b: &Vector4<f32>) -> bool {
        (a - b).abs().max() < 1e-6
    }

    #[test]
    fn default_parameters_replace_destination() {
        let src = Vector4::new(0.2, 0.4, 0.6, 0.8);
        let dst = Vector4::new(1.0, 1.0, 1.0, 1.0);
        assert!(close(&blend(&src, &dst, &BlendParameters::default()), &src));
    }

    #[test]
    fn alpha_blending_mixes_by_source_alpha() {
        let src = Vector4::new(1.0, 0.0, 0.0, 0.25);
        let dst = Vector4::new(0.0, 0.0, 1.0, 1.0);
        let out = blend(&src, &dst, &BlendParameters::alpha_blending());
        assert!(close(
            &out,
            &Vector4::new(0.25, 0.0, 0.75, 0.25 * 0.25 + 0.75)
        ));
    }

    #[test]
    fn rgb_and_alpha_use_separate_functions() {
        let mut params = BlendParameters::default();
        params.set_blend_factor(BlendFactor::One, BlendFactor::One);
        params.blend_func_rgb = BlendFunction::ReverseSubtract;
        params.blend_func_alpha = BlendFunction::Max;
        let src = Vector4::new(0.25, 0.5, 0.0, 0.3);
        let dst = Vector4::new(0.5, 0.5, 0.5, 0.9);
        let out = blend(&src, &dst, &params);
        assert!(close(&out, &Vector4::new(0.25, 0.0, 0.5, 0.9)));

        params.blend_func_rgb = BlendFunction::Min;
        // min ignores the factors
        params.blend_src_rgb = BlendFactor::Zero;
        let out = blend(&src, &dst, &params);
        assert!(close(&out, &Vector4::new(0.25, 0.5, 0.0, 0.9)));
    }

    #[test]
    fn output_color_converts_to_rgba8() {
        let shaded = Vector4::new(1.0, 0.5, 0.0, 1.0);
        assert_eq!(output_color(&shaded, Some([9, 9, 9, 9]), None), [255, 128, 0, 255]);
        let half = BlendParameters::alpha_blending();
        let translucent = Vector4::new(1.0, 1.0, 1.0, 0.5);
        assert_eq!(
            output_color(&translucent, Some([0, 0, 0, 255]), Some(&half)),
            [128, 128, 128, 191]
        );
    }
}
