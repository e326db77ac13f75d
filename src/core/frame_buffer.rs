use crate::core::log_context::LogContext;
use crate::core::texture::{ImageBuffer, MSAA_SAMPLES, Rgba, Texel, Texture, TextureSoft};

/// A texture level bound as a render target
#[derive(Debug, Clone)]
pub struct Attachment<T> {
    pub texture: TextureSoft<T>,
    pub layer: usize,
    pub level: usize,
}

impl<T: Texel> Attachment<T> {
    fn image(&self) -> Option<&ImageBuffer<T>> {
        self.texture.image(self.layer, self.level)
    }

    fn image_mut(&mut self) -> Option<&mut ImageBuffer<T>> {
        self.texture.image_mut(self.layer, self.level)
    }
}

/// Render target: an optional color and an optional depth attachment.
///
/// Color values are RGBA8 and depth is `f32`; the pipeline writes the
/// multi-sample buffers when the attachments are multi-sampled and fills the
/// single-sample buffers during the resolve at the end of the pass.
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    offscreen: bool,
    color: Option<Attachment<Rgba>>,
    depth: Option<Attachment<f32>>,
    log: LogContext,
}

impl FrameBuffer {
    pub fn new(offscreen: bool, log: LogContext) -> Self {
        Self {
            offscreen,
            color: None,
            depth: None,
            log,
        }
    }

    pub fn is_offscreen(&self) -> bool {
        self.offscreen
    }

    pub fn set_color_attachment(&mut self, texture: Texture, level: usize) -> bool {
        self.set_color_attachment_layer(texture, 0, level)
    }

    /// Binds one face/level of an RGBA8 texture as color target.
    pub fn set_color_attachment_layer(
        &mut self,
        texture: Texture,
        layer: usize,
        level: usize,
    ) -> bool {
        let texture = match texture {
            Texture::Rgba8(texture) => texture,
            other => {
                self.log.warn(format_args!(
                    "frame buffer: color attachment '{}' must be RGBA8",
                    other.desc().tag
                ));
                return false;
            }
        };
        if texture.image(layer, level).is_none() {
            self.log.warn(format_args!(
                "frame buffer: color attachment '{}' has no layer {} level {}",
                texture.desc().tag,
                layer,
                level
            ));
            return false;
        }
        self.color = Some(Attachment {
            texture,
            layer,
            level,
        });
        true
    }

    pub fn set_depth_attachment(&mut self, texture: Texture) -> bool {
        let texture = match texture {
            Texture::Float32(texture) => texture,
            other => {
                self.log.warn(format_args!(
                    "frame buffer: depth attachment '{}' must be Float32",
                    other.desc().tag
                ));
                return false;
            }
        };
        self.depth = Some(Attachment {
            texture,
            layer: 0,
            level: 0,
        });
        true
    }

    pub fn has_color(&self) -> bool {
        self.color.is_some()
    }

    pub fn has_depth(&self) -> bool {
        self.depth.is_some()
    }

    pub fn color_image(&self) -> Option<&ImageBuffer<Rgba>> {
        self.color.as_ref()?.image()
    }

    pub fn color_image_mut(&mut self) -> Option<&mut ImageBuffer<Rgba>> {
        self.color.as_mut()?.image_mut()
    }

    pub fn depth_image(&self) -> Option<&ImageBuffer<f32>> {
        self.depth.as_ref()?.image()
    }

    pub fn depth_image_mut(&mut self) -> Option<&mut ImageBuffer<f32>> {
        self.depth.as_mut()?.image_mut()
    }

    /// Both images at once, for the rasterizer
    pub(crate) fn images_mut(
        &mut self,
    ) -> (Option<&mut ImageBuffer<Rgba>>, Option<&mut ImageBuffer<f32>>) {
        let color = self.color.as_mut().and_then(|a| a.image_mut());
        let depth = self.depth.as_mut().and_then(|a| a.image_mut());
        (color, depth)
    }

    /// Extent of the attachments, color first
    pub fn size(&self) -> Option<(usize, usize)> {
        self.color_image()
            .map(|i| (i.width, i.height))
            .or_else(|| self.depth_image().map(|i| (i.width, i.height)))
    }

    pub fn width(&self) -> usize {
        self.size().map_or(0, |s| s.0)
    }

    pub fn height(&self) -> usize {
        self.size().map_or(0, |s| s.1)
    }

    pub fn sample_count(&self) -> usize {
        let color = self.color_image().map_or(1, |i| i.sample_count());
        let depth = self.depth_image().map_or(1, |i| i.sample_count());
        color.max(depth)
    }

    pub fn is_multi_sample(&self) -> bool {
        self.sample_count() == MSAA_SAMPLES
    }

    /// At least one attachment, and color/depth agree on size and sample count.
    pub fn is_valid(&self) -> bool {
        let color = self.color_image();
        let depth = self.depth_image();
        match (color, depth) {
            (None, None) => {
                self.log
                    .warn(format_args!("frame buffer: no attachments bound"));
                false
            }
            (Some(c), Some(d)) => {
                if (c.width, c.height) != (d.width, d.height) {
                    self.log.warn(format_args!(
                        "frame buffer: color {}x{} and depth {}x{} differ",
                        c.width, c.height, d.width, d.height
                    ));
                    return false;
                }
                if c.sample_count() != d.sample_count() {
                    self.log.warn(format_args!(
                        "frame buffer: color has {} samples, depth has {}",
                        c.sample_count(),
                        d.sample_count()
                    ));
                    return false;
                }
                true
            }
            _ => true,
        }
    }

    /// The color texture; shares storage with this frame buffer.
    pub fn color_texture(&self) -> Option<Texture> {
        self.color.as_ref().map(|a| Texture::Rgba8(a.texture.clone()))
    }

    pub fn depth_texture(&self) -> Option<Texture> {
        self.depth.as_ref().map(|a| Texture::Float32(a.texture.clone()))
    }

    /// Resolved color as tightly packed RGBA bytes, row-major.
    pub fn read_color_rgba(&self, flip_y: bool) -> Option<Vec<u8>> {
        let image = self.color_image()?;
        let pixels = image.buffer.to_linear(flip_y);
        Some(pixels.into_iter().flatten().collect())
    }

    /// Resolved depth values, row-major.
    pub fn read_depth(&self, flip_y: bool) -> Option<Vec<f32>> {
        Some(self.depth_image()?.buffer.to_linear(flip_y))
    }
}
