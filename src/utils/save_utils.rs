use crate::core::frame_buffer::FrameBuffer;
use image::ColorType;
use std::path::{Path, PathBuf};

/// Writes tightly packed pixels of `color_type` as PNG.
pub fn save_image<P: AsRef<Path>>(
    path: P,
    data: &[u8],
    width: u32,
    height: u32,
    color_type: ColorType,
) -> Result<(), String> {
    let path = path.as_ref();
    image::save_buffer(path, data, width, height, color_type)
        .map_err(|e| format!("failed to save image {}: {}", path.display(), e))?;
    Ok(())
}

/// Maps the covered depth range onto `[0, 1]`.
///
/// Pixels still at `background` (the clear depth) or non-finite come out
/// as `NaN` so the colormap leaves them black.
pub fn normalize_depth(depth: &[f32], background: f32) -> Vec<f32> {
    let covered = |d: f32| d.is_finite() && d < background;
    let (min, max) = depth
        .iter()
        .copied()
        .filter(|&d| covered(d))
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), d| {
            (lo.min(d), hi.max(d))
        });
    if min > max {
        return vec![f32::NAN; depth.len()];
    }
    let range = max - min;
    let inv_range = if range > 1e-6 { 1.0 / range } else { 0.0 };

    depth
        .iter()
        .map(|&d| {
            if covered(d) {
                ((d - min) * inv_range).clamp(0.0, 1.0)
            } else {
                f32::NAN
            }
        })
        .collect()
}

/// JET colormap of normalized values into RGB8; `NaN` becomes black.
pub fn apply_colormap_jet(normalized: &[f32]) -> Vec<u8> {
    let mut result = vec![0u8; normalized.len() * 3];
    for (value, rgb) in normalized.iter().zip(result.chunks_exact_mut(3)) {
        if !value.is_finite() {
            continue;
        }
        let v = value.clamp(0.0, 1.0);
        let (r, g, b) = if v <= 0.25 {
            (0.0, v * 4.0, 1.0)
        } else if v <= 0.5 {
            (0.0, 1.0, 1.0 - (v - 0.25) * 4.0)
        } else if v <= 0.75 {
            ((v - 0.5) * 4.0, 1.0, 0.0)
        } else {
            (1.0, 1.0 - (v - 0.75) * 4.0, 0.0)
        };
        rgb[0] = (r * 255.0_f32).round() as u8;
        rgb[1] = (g * 255.0_f32).round() as u8;
        rgb[2] = (b * 255.0_f32).round() as u8;
    }
    result
}

/// Writes `<output_name>_color.png` and, when asked and present,
/// `<output_name>_depth.png` (near is red). Returns the written paths.
pub fn save_render_result(
    frame_buffer: &FrameBuffer,
    output_dir: &str,
    output_name: &str,
    save_depth: bool,
    clear_depth: f32,
) -> Result<Vec<PathBuf>, String> {
    std::fs::create_dir_all(output_dir)
        .map_err(|e| format!("failed to create output directory {}: {}", output_dir, e))?;

    let width = frame_buffer.width() as u32;
    let height = frame_buffer.height() as u32;
    let mut written = Vec::new();

    if let Some(color) = frame_buffer.read_color_rgba(true) {
        let color_path = Path::new(output_dir).join(format!("{}_color.png", output_name));
        save_image(&color_path, &color, width, height, ColorType::Rgba8)?;
        written.push(color_path);
    }

    if save_depth {
        if let Some(depth) = frame_buffer.read_depth(true) {
            let normalized: Vec<f32> = normalize_depth(&depth, clear_depth)
                .into_iter()
                .map(|d| 1.0 - d)
                .collect();
            let depth_colored = apply_colormap_jet(&normalized);
            let depth_path = Path::new(output_dir).join(format!("{}_depth.png", output_name));
            save_image(&depth_path, &depth_colored, width, height, ColorType::Rgb8)?;
            written.push(depth_path);
        }
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_normalization_skips_background() {
        let n = normalize_depth(&[0.2, 0.6, 1.0, f32::INFINITY, 0.4], 1.0);
        assert_eq!(n[0], 0.0);
        assert_eq!(n[1], 1.0);
        assert!((n[4] - 0.5).abs() < 1e-6);
        assert!(n[2].is_nan() && n[3].is_nan());

        assert!(normalize_depth(&[1.0, 1.0], 1.0).iter().all(|d| d.is_nan()));
    }

    #[test]
    fn jet_runs_blue_to_red() {
        let rgb = apply_colormap_jet(&[0.0, 1.0, f32::NAN, 0.5]);
        assert_eq!(&rgb[0..3], &[0, 0, 255]);
        assert_eq!(&rgb[3..6], &[255, 0, 0]);
        assert_eq!(&rgb[6..9], &[0, 0, 0]);
        assert_eq!(&rgb[9..12], &[0, 255, 0]);
    }
}
