//! Framebuffer access for the block rasterizer.

use crate::core::buffer::SharedView;
use crate::core::frame_buffer::FrameBuffer;
use crate::core::texture::{ImageBuffer, MSAA_SAMPLES, Rgba};
use crate::core::thread_pool::Rect;

/// Raw views over the bound attachments, valid for one draw.
///
/// With multisampling the views address the per-sample buffers; the
/// single-sample buffers are only written by the resolve.
pub(crate) struct RasterTarget<'a> {
    color: Option<SharedView<'a, Rgba>>,
    color_ms: Option<SharedView<'a, [Rgba; MSAA_SAMPLES]>>,
    depth: Option<SharedView<'a, f32>>,
    depth_ms: Option<SharedView<'a, [f32; MSAA_SAMPLES]>>,
    sample_count: usize,
}

impl<'a> RasterTarget<'a> {
    pub(crate) fn new(frame_buffer: &'a mut FrameBuffer) -> Self {
        let sample_count = frame_buffer.sample_count();
        let multi_sample = sample_count == MSAA_SAMPLES;
        let (color_image, depth_image) = frame_buffer.images_mut();

        let (color, color_ms) = match color_image {
            Some(image) => split_views(image, multi_sample),
            None => (None, None),
        };
        let (depth, depth_ms) = match depth_image {
            Some(image) => split_views(image, multi_sample),
            None => (None, None),
        };

        Self {
            color,
            color_ms,
            depth,
            depth_ms,
            sample_count,
        }
    }

    pub(crate) fn sample_count(&self) -> usize {
        self.sample_count
    }

    pub(crate) fn has_depth(&self) -> bool {
        self.depth.is_some() || self.depth_ms.is_some()
    }

    /// Access restricted to `rect`.
    ///
    /// # Safety
    /// While the returned value is alive no other `BlockTarget` of this
    /// target may cover any pixel of `rect`.
    pub(crate) unsafe fn block(&self, rect: Rect) -> BlockTarget<'_, 'a> {
        BlockTarget { target: self, rect }
    }
}

fn split_views<T: Copy + Default + Send + Sync>(
    image: &mut ImageBuffer<T>,
    multi_sample: bool,
) -> (Option<SharedView<'_, T>>, Option<SharedView<'_, [T; MSAA_SAMPLES]>>) {
    let ImageBuffer {
        buffer, buffer_ms4x, ..
    } = image;
    if multi_sample {
        (None, buffer_ms4x.as_mut().and_then(|b| b.shared_view()))
    } else {
        (buffer.shared_view(), None)
    }
}

/// Exclusive window onto one raster block; every access outside the block
/// is ignored.
pub(crate) struct BlockTarget<'t, 'a> {
    target: &'t RasterTarget<'a>,
    rect: Rect,
}

impl BlockTarget<'_, '_> {
    pub(crate) fn rect(&self) -> &Rect {
        &self.rect
    }

    pub(crate) fn sample_count(&self) -> usize {
        self.target.sample_count
    }

    pub(crate) fn depth(&self, x: usize, y: usize, sample: usize) -> Option<f32> {
        if !self.rect.contains(x, y) {
            return None;
        }
        // SAFETY: (x, y) lies in this block, which no other live block covers.
        unsafe {
            if let Some(ms) = &self.target.depth_ms {
                ms.read(x, y).map(|s| s[sample % MSAA_SAMPLES])
            } else {
                self.target.depth.as_ref()?.read(x, y)
            }
        }
    }

    pub(crate) fn set_depth(&self, x: usize, y: usize, sample: usize, value: f32) {
        if !self.rect.contains(x, y) {
            return;
        }
        // SAFETY: as in `depth`.
        unsafe {
            if let Some(ms) = &self.target.depth_ms {
                if let Some(mut samples) = ms.read(x, y) {
                    samples[sample % MSAA_SAMPLES] = value;
                    ms.write(x, y, samples);
                }
            } else if let Some(view) = &self.target.depth {
                view.write(x, y, value);
            }
        }
    }

    pub(crate) fn color(&self, x: usize, y: usize, sample: usize) -> Option<Rgba> {
        if !self.rect.contains(x, y) {
            return None;
        }
        // SAFETY: as in `depth`.
        unsafe {
            if let Some(ms) = &self.target.color_ms {
                ms.read(x, y).map(|s| s[sample % MSAA_SAMPLES])
            } else {
                self.target.color.as_ref()?.read(x, y)
            }
        }
    }

    pub(crate) fn set_color(&self, x: usize, y: usize, sample: usize, value: Rgba) {
        if !self.rect.contains(x, y) {
            return;
        }
        // SAFETY: as in `depth`.
        unsafe {
            if let Some(ms) = &self.target.color_ms {
                if let Some(mut samples) = ms.read(x, y) {
                    samples[sample % MSAA_SAMPLES] = value;
                    ms.write(x, y, samples);
                }
            } else if let Some(view) = &self.target.color {
                view.write(x, y, value);
            }
        }
    }
}
