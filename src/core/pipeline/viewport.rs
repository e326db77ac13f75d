use crate::core::thread_pool::Rect;
use nalgebra::Vector4;

/// Pixel rectangle plus depth range, with the clip -> window affine
/// transform precomputed on every change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,

    pub abs_min_depth: f32,
    pub abs_max_depth: f32,
    /// Offset added after scaling (window center, depth mid-point)
    pub inner_o: Vector4<f32>,
    /// Scale applied to normalized device coordinates
    pub inner_p: Vector4<f32>,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0, 0.0, 1.0)
    }
}

impl Viewport {
    pub fn new(x: f32, y: f32, width: f32, height: f32, min_depth: f32, max_depth: f32) -> Self {
        let mut viewport = Self {
            x,
            y,
            width,
            height,
            min_depth,
            max_depth,
            abs_min_depth: 0.0,
            abs_max_depth: 0.0,
            inner_o: Vector4::zeros(),
            inner_p: Vector4::zeros(),
        };
        viewport.update();
        viewport
    }

    pub fn set_rect(&mut self, x: f32, y: f32, width: f32, height: f32) {
        self.x = x;
        self.y = y;
        self.width = width;
        self.height = height;
        self.update();
    }

    pub fn set_depth_range(&mut self, min_depth: f32, max_depth: f32) {
        self.min_depth = min_depth;
        self.max_depth = max_depth;
        self.update();
    }

    fn update(&mut self) {
        self.abs_min_depth = self.min_depth.min(self.max_depth);
        self.abs_max_depth = self.min_depth.max(self.max_depth);
        self.inner_o = Vector4::new(
            self.x + self.width / 2.0,
            self.y + self.height / 2.0,
            (self.min_depth + self.max_depth) / 2.0,
            0.0,
        );
        self.inner_p = Vector4::new(
            self.width / 2.0,
            self.height / 2.0,
            (self.max_depth - self.min_depth) / 2.0,
            1.0,
        );
    }

    /// NDC (w = 1/w_clip) to window coordinates; w passes through.
    #[inline]
    pub fn transform(&self, ndc: &Vector4<f32>) -> Vector4<f32> {
        ndc.component_mul(&self.inner_p) + self.inner_o
    }

    #[inline]
    pub fn clamp_depth(&self, depth: f32) -> f32 {
        depth.clamp(self.abs_min_depth, self.abs_max_depth)
    }

    /// Pixels covered by the viewport, clipped to a `width` x `height` target.
    pub fn pixel_rect(&self, width: usize, height: usize) -> Rect {
        let x0 = self.x.max(0.0).floor() as usize;
        let y0 = self.y.max(0.0).floor() as usize;
        let x1 = (self.x + self.width).max(0.0).ceil() as usize;
        let y1 = (self.y + self.height).max(0.0).ceil() as usize;
        Rect::new(x0, y0, x1, y1).intersect(&Rect::new(0, 0, width, height))
    }
}
