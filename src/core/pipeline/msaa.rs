use crate::core::frame_buffer::FrameBuffer;
use crate::core::texture::{ImageBuffer, MSAA_SAMPLES, Rgba, Texel};
use crate::core::thread_pool::WorkerPool;
use rayon::prelude::*;

/// Averages the samples channel by channel, rounding to nearest.
/// Uncovered samples still hold the clear color, so partially covered
/// pixels come out weighted by their coverage.
#[inline]
pub fn resolve_color(samples: &[Rgba; MSAA_SAMPLES]) -> Rgba {
    let n = MSAA_SAMPLES as u32;
    let mut out = [0u8; 4];
    for (c, slot) in out.iter_mut().enumerate() {
        let sum: u32 = samples.iter().map(|s| s[c] as u32).sum();
        *slot = ((sum + n / 2) / n) as u8;
    }
    out
}

/// Nearest sample wins
#[inline]
pub fn resolve_depth(samples: &[f32; MSAA_SAMPLES]) -> f32 {
    samples.iter().copied().fold(f32::INFINITY, f32::min)
}

/// Collapses the per-sample buffer into the single-sample buffer.
/// Both buffers share layout and extent, so storage maps index to index.
fn resolve_image<T, F>(image: &mut ImageBuffer<T>, resolve: F) -> bool
where
    T: Texel,
    F: Fn(&[T; MSAA_SAMPLES]) -> T + Sync + Send,
{
    let ImageBuffer {
        buffer,
        buffer_ms4x,
        ..
    } = image;
    let Some(ms) = buffer_ms4x.as_ref() else {
        return false;
    };
    let src = ms.raw_data();
    let dst = buffer.raw_data_mut();
    if src.len() != dst.len() {
        return false;
    }
    dst.par_iter_mut()
        .zip(src.par_iter())
        .for_each(|(out, samples)| *out = resolve(samples));
    true
}

/// Resolves every multi-sampled attachment of `frame_buffer` on `pool`.
/// Returns the number of attachments resolved.
pub fn resolve_frame_buffer(frame_buffer: &mut FrameBuffer, pool: &WorkerPool) -> usize {
    if !frame_buffer.is_multi_sample() {
        return 0;
    }
    let (color, depth) = frame_buffer.images_mut();
    pool.install(|| {
        let mut resolved = 0;
        if let Some(image) = color {
            resolved += usize::from(resolve_image(image, resolve_color));
        }
        if let Some(image) = depth {
            resolved += usize::from(resolve_image(image, resolve_depth));
        }
        resolved
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::buffer::BufferLayout;
    use crate::core::log_context::LogContext;

    #[test]
    fn partial_coverage_is_weighted() {
        let red = [255, 0, 0, 255];
        let clear = [0, 0, 0, 255];
        assert_eq!(resolve_color(&[red, clear, red, clear]), [128, 0, 0, 255]);
        assert_eq!(resolve_color(&[red; 4]), red);
        assert_eq!(resolve_color(&[red, clear, clear, clear]), [64, 0, 0, 255]);
    }

    #[test]
    fn depth_keeps_the_nearest_sample() {
        assert_eq!(resolve_depth(&[1.0, 0.25, 1.0, 0.5]), 0.25);
    }

    #[test]
    fn image_resolve_writes_every_pixel() {
        let mut image = ImageBuffer::<Rgba>::new(BufferLayout::Tiled, 5, 3, true).unwrap();
        image.set_all([0, 0, 0, 0]);
        if let Some(ms) = image.buffer_ms4x.as_mut() {
            ms.set(4, 2, [[200, 100, 0, 255], [0, 0, 0, 255], [200, 100, 0, 255], [0, 0, 0, 255]]);
        }
        let pool = WorkerPool::new(2, LogContext::silent()).unwrap();
        assert!(pool.install(|| resolve_image(&mut image, resolve_color)));
        assert_eq!(image.buffer.get(4, 2), Some([100, 50, 0, 255]));
        assert_eq!(image.buffer.get(0, 0), Some([0, 0, 0, 0]));
    }
}
