//! Textures, their images and the software sampler.

use crate::core::buffer::{BufferLayout, TiledBuffer};
use crate::core::log_context::LogContext;
use nalgebra::{Vector2, Vector3, Vector4};
use std::ops::BitOr;

/// 8-bit RGBA pixel
pub type Rgba = [u8; 4];

/// Element type that can be stored in a texture and read back as a vec4
pub trait Texel: Copy + Default + Send + Sync + 'static {
    fn to_vec4(self) -> Vector4<f32>;
    fn from_vec4(v: &Vector4<f32>) -> Self;
}

impl Texel for Rgba {
    #[inline]
    fn to_vec4(self) -> Vector4<f32> {
        Vector4::new(
            self[0] as f32 / 255.0,
            self[1] as f32 / 255.0,
            self[2] as f32 / 255.0,
            self[3] as f32 / 255.0,
        )
    }

    #[inline]
    fn from_vec4(v: &Vector4<f32>) -> Self {
        [
            unorm_to_u8(v.x),
            unorm_to_u8(v.y),
            unorm_to_u8(v.z),
            unorm_to_u8(v.w),
        ]
    }
}

impl Texel for f32 {
    #[inline]
    fn to_vec4(self) -> Vector4<f32> {
        Vector4::new(self, self, self, 1.0)
    }

    #[inline]
    fn from_vec4(v: &Vector4<f32>) -> Self {
        v.x
    }
}

/// Clamps to [0, 1] and rounds to the nearest 8-bit value
#[inline]
pub fn unorm_to_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextureType {
    #[default]
    Tex2D,
    Cube,
}

impl TextureType {
    pub fn layer_count(self) -> usize {
        match self {
            TextureType::Tex2D => 1,
            TextureType::Cube => 6,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextureFormat {
    #[default]
    Rgba8,
    Float32,
}

/// Bit set of intended texture uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextureUsage(u32);

impl TextureUsage {
    pub const SAMPLER: Self = Self(1 << 0);
    pub const UPLOAD_DATA: Self = Self(1 << 1);
    pub const ATTACHMENT_COLOR: Self = Self(1 << 2);
    pub const ATTACHMENT_DEPTH: Self = Self(1 << 3);
    pub const RENDERER_OUTPUT: Self = Self(1 << 4);

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for TextureUsage {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureDesc {
    pub width: usize,
    pub height: usize,
    pub texture_type: TextureType,
    pub format: TextureFormat,
    pub usage: TextureUsage,
    pub use_mipmaps: bool,
    pub multi_sample: bool,
    pub tag: String,
}

impl Default for TextureDesc {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            texture_type: TextureType::Tex2D,
            format: TextureFormat::Rgba8,
            usage: TextureUsage::SAMPLER,
            use_mipmaps: false,
            multi_sample: false,
            tag: String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterMode {
    Nearest,
    #[default]
    Linear,
    NearestMipmapNearest,
    LinearMipmapNearest,
    NearestMipmapLinear,
    LinearMipmapLinear,
}

impl FilterMode {
    fn uses_mipmaps(self) -> bool {
        !matches!(self, FilterMode::Nearest | FilterMode::Linear)
    }

    fn texel_linear(self) -> bool {
        matches!(
            self,
            FilterMode::Linear | FilterMode::LinearMipmapNearest | FilterMode::LinearMipmapLinear
        )
    }

    fn level_linear(self) -> bool {
        matches!(
            self,
            FilterMode::NearestMipmapLinear | FilterMode::LinearMipmapLinear
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WrapMode {
    Repeat,
    MirroredRepeat,
    #[default]
    ClampToEdge,
    ClampToBorder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BorderColor {
    #[default]
    Black,
    White,
}

impl BorderColor {
    fn to_vec4(self) -> Vector4<f32> {
        match self {
            BorderColor::Black => Vector4::new(0.0, 0.0, 0.0, 0.0),
            BorderColor::White => Vector4::new(1.0, 1.0, 1.0, 1.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerDesc {
    pub filter_min: FilterMode,
    pub filter_mag: FilterMode,
    pub wrap_s: WrapMode,
    pub wrap_t: WrapMode,
    pub wrap_r: WrapMode,
    pub border_color: BorderColor,
}

impl Default for SamplerDesc {
    fn default() -> Self {
        Self {
            filter_min: FilterMode::Nearest,
            filter_mag: FilterMode::Linear,
            wrap_s: WrapMode::ClampToEdge,
            wrap_t: WrapMode::ClampToEdge,
            wrap_r: WrapMode::ClampToEdge,
            border_color: BorderColor::Black,
        }
    }
}

/// Multi-sampled buffers store this many samples per pixel
pub const MSAA_SAMPLES: usize = 4;

/// One level of one layer: the single-sample buffer plus, for multi-sampled
/// render targets, the per-pixel sample array.
#[derive(Debug, Clone)]
pub struct ImageBuffer<T> {
    pub width: usize,
    pub height: usize,
    pub buffer: TiledBuffer<T>,
    pub buffer_ms4x: Option<TiledBuffer<[T; MSAA_SAMPLES]>>,
}

impl<T: Texel> ImageBuffer<T> {
    pub fn new(layout: BufferLayout, width: usize, height: usize, multi_sample: bool) -> Option<Self> {
        let buffer = TiledBuffer::with_size(layout, width, height)?;
        let buffer_ms4x = if multi_sample {
            Some(TiledBuffer::with_size(layout, width, height)?)
        } else {
            None
        };
        Some(Self {
            width,
            height,
            buffer,
            buffer_ms4x,
        })
    }

    pub fn sample_count(&self) -> usize {
        if self.buffer_ms4x.is_some() {
            MSAA_SAMPLES
        } else {
            1
        }
    }

    pub fn set_all(&mut self, value: T) {
        self.buffer.set_all(value);
        if let Some(ms) = self.buffer_ms4x.as_mut() {
            ms.set_all([value; MSAA_SAMPLES]);
        }
    }

    /// Clamped-to-edge texel fetch
    #[inline]
    fn fetch(&self, x: i64, y: i64) -> T {
        let x = x.clamp(0, self.width as i64 - 1) as usize;
        let y = y.clamp(0, self.height as i64 - 1) as usize;
        self.buffer.get(x, y).unwrap_or_default()
    }
}

/// Software texture: `layers[layer][level]`
#[derive(Debug, Clone)]
pub struct TextureSoft<T> {
    desc: TextureDesc,
    layout: BufferLayout,
    sampler: SamplerDesc,
    layers: Vec<Vec<ImageBuffer<T>>>,
    log: LogContext,
}

impl<T: Texel> TextureSoft<T> {
    /// Allocates level 0 of every layer. Returns `None` (and logs) for an
    /// invalid descriptor.
    pub fn new(desc: &TextureDesc, layout: BufferLayout, log: LogContext) -> Option<Self> {
        if desc.width == 0 || desc.height == 0 {
            log.error(format_args!(
                "texture '{}': invalid size {}x{}",
                desc.tag, desc.width, desc.height
            ));
            return None;
        }
        if desc.texture_type == TextureType::Cube && desc.width != desc.height {
            log.error(format_args!(
                "texture '{}': cube faces must be square, got {}x{}",
                desc.tag, desc.width, desc.height
            ));
            return None;
        }
        let mut desc = desc.clone();
        if desc.multi_sample && desc.use_mipmaps {
            log.warn(format_args!(
                "texture '{}': multi-sampled textures have no mipmaps, ignoring",
                desc.tag
            ));
            desc.use_mipmaps = false;
        }

        let mut layers = Vec::with_capacity(desc.texture_type.layer_count());
        for _ in 0..desc.texture_type.layer_count() {
            let image = ImageBuffer::new(layout, desc.width, desc.height, desc.multi_sample)?;
            layers.push(vec![image]);
        }

        log.trace(format_args!(
            "texture '{}' created: {}x{} {:?} {:?} layout={}",
            desc.tag,
            desc.width,
            desc.height,
            desc.texture_type,
            desc.format,
            layout.name()
        ));

        Some(Self {
            desc,
            layout,
            sampler: SamplerDesc::default(),
            layers,
            log,
        })
    }

    pub fn desc(&self) -> &TextureDesc {
        &self.desc
    }

    pub fn width(&self) -> usize {
        self.desc.width
    }

    pub fn height(&self) -> usize {
        self.desc.height
    }

    pub fn level_width(&self, level: usize) -> usize {
        (self.desc.width >> level).max(1)
    }

    pub fn level_height(&self, level: usize) -> usize {
        (self.desc.height >> level).max(1)
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn level_count(&self) -> usize {
        self.layers.first().map_or(0, |l| l.len())
    }

    pub fn is_multi_sample(&self) -> bool {
        self.desc.multi_sample
    }

    pub fn sampler(&self) -> &SamplerDesc {
        &self.sampler
    }

    pub fn set_sampler_desc(&mut self, sampler: SamplerDesc) {
        self.sampler = sampler;
    }

    pub fn image(&self, layer: usize, level: usize) -> Option<&ImageBuffer<T>> {
        self.layers.get(layer)?.get(level)
    }

    pub fn image_mut(&mut self, layer: usize, level: usize) -> Option<&mut ImageBuffer<T>> {
        self.layers.get_mut(layer)?.get_mut(level)
    }

    /// Uploads level 0 of each layer from row-major content (bottom row
    /// first). Any existing mip chain is rebuilt when mipmaps are enabled.
    pub fn set_image_data(&mut self, layers: &[&[T]]) -> bool {
        if layers.len() != self.layers.len() {
            self.log.warn(format_args!(
                "texture '{}': expected {} layers of data, got {}",
                self.desc.tag,
                self.layers.len(),
                layers.len()
            ));
            return false;
        }
        let (w, h) = (self.desc.width, self.desc.height);
        for (images, data) in self.layers.iter_mut().zip(layers) {
            let Some(buffer) = TiledBuffer::from_linear(self.layout, w, h, data) else {
                self.log.warn(format_args!(
                    "texture '{}': layer data too small ({} < {})",
                    self.desc.tag,
                    data.len(),
                    w * h
                ));
                return false;
            };
            images.truncate(1);
            images[0].buffer = buffer;
        }
        if self.desc.use_mipmaps {
            self.generate_mipmaps();
        }
        true
    }

    /// Replaces level 0 of `layer` with `buffer`, sharing its storage.
    pub fn set_layer_buffer(&mut self, layer: usize, buffer: TiledBuffer<T>) -> bool {
        let (w, h) = (self.desc.width, self.desc.height);
        if buffer.width() != w || buffer.height() != h {
            self.log.warn(format_args!(
                "texture '{}': buffer size {}x{} does not match {}x{}",
                self.desc.tag,
                buffer.width(),
                buffer.height(),
                w,
                h
            ));
            return false;
        }
        match self.layers.get_mut(layer) {
            Some(images) => {
                images.truncate(1);
                images[0].buffer = buffer;
                true
            }
            None => false,
        }
    }

    /// Rebuilds every level above 0 with a 2x2 box filter, down to 1x1.
    pub fn generate_mipmaps(&mut self) {
        if !self.desc.use_mipmaps {
            return;
        }
        let layout = self.layout;
        for images in self.layers.iter_mut() {
            images.truncate(1);
            loop {
                let Some(prev) = images.last() else { break };
                if prev.width == 1 && prev.height == 1 {
                    break;
                }
                let (w, h) = ((prev.width / 2).max(1), (prev.height / 2).max(1));
                let Some(mut next) = ImageBuffer::new(layout, w, h, false) else {
                    break;
                };
                for y in 0..h {
                    for x in 0..w {
                        let (sx, sy) = (2 * x as i64, 2 * y as i64);
                        let sum = prev.fetch(sx, sy).to_vec4()
                            + prev.fetch(sx + 1, sy).to_vec4()
                            + prev.fetch(sx, sy + 1).to_vec4()
                            + prev.fetch(sx + 1, sy + 1).to_vec4();
                        next.buffer.set(x, y, T::from_vec4(&(sum * 0.25)));
                    }
                }
                images.push(next);
            }
        }
        self.log.trace(format_args!(
            "texture '{}': {} mip levels",
            self.desc.tag,
            self.level_count()
        ));
    }

    /// Samples layer 0 at `uv` (origin bottom-left).
    pub fn sample_2d(&self, uv: &Vector2<f32>, lod: f32) -> Vector4<f32> {
        self.sample_layer(0, uv, lod)
    }

    /// Samples a cube texture along `dir`.
    pub fn sample_cube(&self, dir: &Vector3<f32>, lod: f32) -> Vector4<f32> {
        let (face, uv) = cube_face_uv(dir);
        self.sample_layer(face, &uv, lod)
    }

    fn sample_layer(&self, layer: usize, uv: &Vector2<f32>, lod: f32) -> Vector4<f32> {
        let Some(levels) = self.layers.get(layer) else {
            return Vector4::zeros();
        };
        if lod <= 0.0 || !self.sampler.filter_min.uses_mipmaps() || levels.len() <= 1 {
            let filter = if lod <= 0.0 {
                self.sampler.filter_mag
            } else {
                self.sampler.filter_min
            };
            return self.sample_image(&levels[0], uv, filter.texel_linear());
        }

        let max_level = (levels.len() - 1) as f32;
        let lod = lod.min(max_level);
        let filter = self.sampler.filter_min;
        if filter.level_linear() {
            let lo = lod.floor();
            let hi = (lo + 1.0).min(max_level);
            let t = lod - lo;
            let a = self.sample_image(&levels[lo as usize], uv, filter.texel_linear());
            let b = self.sample_image(&levels[hi as usize], uv, filter.texel_linear());
            a.lerp(&b, t)
        } else {
            let level = lod.round() as usize;
            self.sample_image(&levels[level], uv, filter.texel_linear())
        }
    }

    fn sample_image(&self, image: &ImageBuffer<T>, uv: &Vector2<f32>, linear: bool) -> Vector4<f32> {
        let (w, h) = (image.width as f32, image.height as f32);
        if linear {
            let fx = uv.x * w - 0.5;
            let fy = uv.y * h - 0.5;
            let (x0, y0) = (fx.floor(), fy.floor());
            let (tx, ty) = (fx - x0, fy - y0);
            let (x0, y0) = (x0 as i64, y0 as i64);
            let c00 = self.texel(image, x0, y0);
            let c10 = self.texel(image, x0 + 1, y0);
            let c01 = self.texel(image, x0, y0 + 1);
            let c11 = self.texel(image, x0 + 1, y0 + 1);
            c00.lerp(&c10, tx).lerp(&c01.lerp(&c11, tx), ty)
        } else {
            let x = (uv.x * w).floor() as i64;
            let y = (uv.y * h).floor() as i64;
            self.texel(image, x, y)
        }
    }

    /// Texel lookup after applying the wrap modes
    fn texel(&self, image: &ImageBuffer<T>, x: i64, y: i64) -> Vector4<f32> {
        let border = self.sampler.border_color;
        match (
            wrap_coord(x, image.width, self.sampler.wrap_s),
            wrap_coord(y, image.height, self.sampler.wrap_t),
        ) {
            (Some(x), Some(y)) => image.fetch(x, y).to_vec4(),
            _ => border.to_vec4(),
        }
    }
}

/// Maps an integer texel coordinate into `[0, size)`; `None` means border.
fn wrap_coord(c: i64, size: usize, mode: WrapMode) -> Option<i64> {
    let n = size as i64;
    match mode {
        WrapMode::Repeat => Some(c.rem_euclid(n)),
        WrapMode::MirroredRepeat => {
            let period = c.rem_euclid(2 * n);
            Some(if period < n { period } else { 2 * n - 1 - period })
        }
        WrapMode::ClampToEdge => Some(c.clamp(0, n - 1)),
        WrapMode::ClampToBorder => (0..n).contains(&c).then_some(c),
    }
}

/// Major-axis face selection: +X, -X, +Y, -Y, +Z, -Z
pub fn cube_face_uv(dir: &Vector3<f32>) -> (usize, Vector2<f32>) {
    let abs = dir.abs();
    let (face, sc, tc, ma) = if abs.x >= abs.y && abs.x >= abs.z {
        if dir.x >= 0.0 {
            (0, -dir.z, -dir.y, abs.x)
        } else {
            (1, dir.z, -dir.y, abs.x)
        }
    } else if abs.y >= abs.z {
        if dir.y >= 0.0 {
            (2, dir.x, dir.z, abs.y)
        } else {
            (3, dir.x, -dir.z, abs.y)
        }
    } else if dir.z >= 0.0 {
        (4, dir.x, -dir.y, abs.z)
    } else {
        (5, -dir.x, -dir.y, abs.z)
    };
    if ma <= 0.0 {
        return (0, Vector2::new(0.5, 0.5));
    }
    (
        face,
        Vector2::new((sc / ma + 1.0) * 0.5, (tc / ma + 1.0) * 0.5),
    )
}

/// A texture of either supported format. Cloning shares pixel storage.
#[derive(Debug, Clone)]
pub enum Texture {
    Rgba8(TextureSoft<Rgba>),
    Float32(TextureSoft<f32>),
}

impl Texture {
    pub fn desc(&self) -> &TextureDesc {
        match self {
            Texture::Rgba8(t) => t.desc(),
            Texture::Float32(t) => t.desc(),
        }
    }

    pub fn width(&self) -> usize {
        self.desc().width
    }

    pub fn height(&self) -> usize {
        self.desc().height
    }

    pub fn level_count(&self) -> usize {
        match self {
            Texture::Rgba8(t) => t.level_count(),
            Texture::Float32(t) => t.level_count(),
        }
    }

    pub fn set_sampler_desc(&mut self, sampler: SamplerDesc) {
        match self {
            Texture::Rgba8(t) => t.set_sampler_desc(sampler),
            Texture::Float32(t) => t.set_sampler_desc(sampler),
        }
    }

    pub fn generate_mipmaps(&mut self) {
        match self {
            Texture::Rgba8(t) => t.generate_mipmaps(),
            Texture::Float32(t) => t.generate_mipmaps(),
        }
    }

    pub fn sample_2d(&self, uv: &Vector2<f32>, lod: f32) -> Vector4<f32> {
        match self {
            Texture::Rgba8(t) => t.sample_2d(uv, lod),
            Texture::Float32(t) => t.sample_2d(uv, lod),
        }
    }

    pub fn sample_cube(&self, dir: &Vector3<f32>, lod: f32) -> Vector4<f32> {
        match self {
            Texture::Rgba8(t) => t.sample_cube(dir, lod),
            Texture::Float32(t) => t.sample_cube(dir, lod),
        }
    }

    pub fn as_rgba8(&self) -> Option<&TextureSoft<Rgba>> {
        match self {
            Texture::Rgba8(t) => Some(t),
            Texture::Float32(_) => None,
        }
    }

    pub fn as_rgba8_mut(&mut self) -> Option<&mut TextureSoft<Rgba>> {
        match self {
            Texture::Rgba8(t) => Some(t),
            Texture::Float32(_) => None,
        }
    }

    pub fn as_float32(&self) -> Option<&TextureSoft<f32>> {
        match self {
            Texture::Float32(t) => Some(t),
            Texture::Rgba8(_) => None,
        }
    }

    pub fn as_float32_mut(&mut self) -> Option<&mut TextureSoft<f32>> {
        match self {
            Texture::Float32(t) => Some(t),
            Texture::Rgba8(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker_2x2() -> TextureSoft<Rgba> {
        let desc = TextureDesc {
            width: 2,
            height: 2,
            usage: TextureUsage::SAMPLER | TextureUsage::UPLOAD_DATA,
            ..Default::default()
        };
        let mut tex = TextureSoft::new(&desc, BufferLayout::Tiled, LogContext::silent()).unwrap();
        let black = [0, 0, 0, 255];
        let white = [255, 255, 255, 255];
        assert!(tex.set_image_data(&[&[black, white, white, black]]));
        tex
    }

    #[test]
    fn nearest_sampling_hits_texel_centers() {
        let mut tex = checker_2x2();
        tex.set_sampler_desc(SamplerDesc {
            filter_mag: FilterMode::Nearest,
            ..Default::default()
        });
        let c = tex.sample_2d(&Vector2::new(0.25, 0.25), 0.0);
        assert_eq!(c.x, 0.0);
        let c = tex.sample_2d(&Vector2::new(0.75, 0.25), 0.0);
        assert_eq!(c.x, 1.0);
    }

    #[test]
    fn linear_sampling_blends_neighbours() {
        let tex = checker_2x2();
        let c = tex.sample_2d(&Vector2::new(0.5, 0.5), 0.0);
        assert!((c.x - 0.5).abs() < 1e-5);
        assert!((c.w - 1.0).abs() < 1e-5);
    }

    #[test]
    fn wrap_modes_map_coordinates() {
        assert_eq!(wrap_coord(-1, 4, WrapMode::Repeat), Some(3));
        assert_eq!(wrap_coord(5, 4, WrapMode::Repeat), Some(1));
        assert_eq!(wrap_coord(4, 4, WrapMode::MirroredRepeat), Some(3));
        assert_eq!(wrap_coord(-1, 4, WrapMode::MirroredRepeat), Some(0));
        assert_eq!(wrap_coord(9, 4, WrapMode::ClampToEdge), Some(3));
        assert_eq!(wrap_coord(-1, 4, WrapMode::ClampToBorder), None);
    }

    #[test]
    fn mipmaps_shrink_to_one_texel() {
        let desc = TextureDesc {
            width: 8,
            height: 4,
            use_mipmaps: true,
            ..Default::default()
        };
        let mut tex = TextureSoft::<f32>::new(&desc, BufferLayout::Linear, LogContext::silent()).unwrap();
        let data: Vec<f32> = (0..32).map(|i| (i % 2) as f32).collect();
        assert!(tex.set_image_data(&[&data]));
        assert_eq!(tex.level_count(), 4);
        assert_eq!(tex.level_width(3), 1);
        assert_eq!(tex.level_height(3), 1);
        let top = tex.image(0, 3).unwrap().buffer.get(0, 0).unwrap();
        assert!((top - 0.5).abs() < 1e-6);
    }

    #[test]
    fn cube_faces_follow_major_axis() {
        assert_eq!(cube_face_uv(&Vector3::new(1.0, 0.1, 0.2)).0, 0);
        assert_eq!(cube_face_uv(&Vector3::new(-1.0, 0.1, 0.2)).0, 1);
        assert_eq!(cube_face_uv(&Vector3::new(0.0, 2.0, 0.2)).0, 2);
        assert_eq!(cube_face_uv(&Vector3::new(0.0, -2.0, 0.2)).0, 3);
        assert_eq!(cube_face_uv(&Vector3::new(0.0, 0.0, 1.0)).0, 4);
        let (face, uv) = cube_face_uv(&Vector3::new(0.0, 0.0, -1.0));
        assert_eq!(face, 5);
        assert!((uv - Vector2::new(0.5, 0.5)).norm() < 1e-6);
    }

    #[test]
    fn invalid_descriptors_are_rejected() {
        let log = LogContext::silent();
        let zero = TextureDesc::default();
        assert!(TextureSoft::<Rgba>::new(&zero, BufferLayout::Tiled, log).is_none());
        let cube = TextureDesc {
            width: 4,
            height: 2,
            texture_type: TextureType::Cube,
            ..Default::default()
        };
        assert!(TextureSoft::<Rgba>::new(&cube, BufferLayout::Tiled, log).is_none());
    }

    #[test]
    fn layer_buffer_shares_storage() {
        let desc = TextureDesc {
            width: 4,
            height: 4,
            format: TextureFormat::Float32,
            ..Default::default()
        };
        let mut tex = TextureSoft::<f32>::new(&desc, BufferLayout::Tiled, LogContext::silent()).unwrap();
        let mut depth = TiledBuffer::<f32>::with_size(BufferLayout::Tiled, 4, 4).unwrap();
        depth.set_all(0.25);
        assert!(tex.set_layer_buffer(0, depth.clone()));
        assert!(tex.image(0, 0).unwrap().buffer.shares_storage_with(&depth));
        assert_eq!(tex.sample_2d(&Vector2::new(0.5, 0.5), 0.0).x, 0.25);
    }
}
