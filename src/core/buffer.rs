//! # Tiled pixel storage
//!
//! A 2D element store with a pluggable address mapping. The mapping is picked
//! once per buffer (a plain function pointer), so the per-pixel hot loop
//! never matches on the layout tag.

use serde::{Deserialize, Serialize};
use std::marker::PhantomData;
use std::sync::Arc;

/// Default tile side for the tiled and Morton layouts
pub const DEFAULT_TILE_SIZE: usize = 4;

/// Address-mapping strategy of a [`TiledBuffer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BufferLayout {
    Linear,
    #[default]
    Tiled,
    Morton,
}

impl BufferLayout {
    pub fn name(&self) -> &'static str {
        match self {
            BufferLayout::Linear => "linear",
            BufferLayout::Tiled => "tiled",
            BufferLayout::Morton => "morton",
        }
    }
}

type IndexFn = fn(&IndexMapper, usize, usize) -> usize;

/// Logical (x, y) -> physical offset mapping for one buffer extent
#[derive(Clone, Copy)]
pub struct IndexMapper {
    tile_bits: u32,
    tiles_x: usize,
    inner_width: usize,
    map: IndexFn,
}

impl std::fmt::Debug for IndexMapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexMapper")
            .field("tile_bits", &self.tile_bits)
            .field("tiles_x", &self.tiles_x)
            .field("inner_width", &self.inner_width)
            .finish()
    }
}

impl IndexMapper {
    /// Computes the physical extent for a layout and returns the mapper with it.
    fn init_layout(
        layout: BufferLayout,
        tile_size: usize,
        width: usize,
        height: usize,
    ) -> (Self, usize, usize) {
        match layout {
            BufferLayout::Linear => (
                Self {
                    tile_bits: 0,
                    tiles_x: width,
                    inner_width: width,
                    map: linear_index,
                },
                width,
                height,
            ),
            BufferLayout::Tiled | BufferLayout::Morton => {
                let tiles_x = width.div_ceil(tile_size);
                let tiles_y = height.div_ceil(tile_size);
                let inner_width = tiles_x * tile_size;
                let map: IndexFn = if layout == BufferLayout::Tiled {
                    tiled_index
                } else {
                    morton_index
                };
                (
                    Self {
                        tile_bits: tile_size.trailing_zeros(),
                        tiles_x,
                        inner_width,
                        map,
                    },
                    inner_width,
                    tiles_y * tile_size,
                )
            }
        }
    }

    #[inline(always)]
    pub fn index(&self, x: usize, y: usize) -> usize {
        (self.map)(self, x, y)
    }
}

fn linear_index(m: &IndexMapper, x: usize, y: usize) -> usize {
    x + y * m.inner_width
}

fn tiled_index(m: &IndexMapper, x: usize, y: usize) -> usize {
    let bits = m.tile_bits;
    let mask = (1usize << bits) - 1;
    let tile = (y >> bits) * m.tiles_x + (x >> bits);
    (tile << (bits * 2)) + ((y & mask) << bits) + (x & mask)
}

fn morton_index(m: &IndexMapper, x: usize, y: usize) -> usize {
    let bits = m.tile_bits;
    let mask = (1usize << bits) - 1;
    let tile = (y >> bits) * m.tiles_x + (x >> bits);
    (tile << (bits * 2)) + morton_interleave(x & mask, y & mask)
}

/// Interleaves the low 16 bits of x (even bits) and y (odd bits)
#[inline]
fn morton_interleave(x: usize, y: usize) -> usize {
    fn spread(mut v: usize) -> usize {
        v &= 0x0000_ffff;
        v = (v | (v << 8)) & 0x00ff_00ff;
        v = (v | (v << 4)) & 0x0f0f_0f0f;
        v = (v | (v << 2)) & 0x3333_3333;
        v = (v | (v << 1)) & 0x5555_5555;
        v
    }
    spread(x) | (spread(y) << 1)
}

/// Generic 2D buffer with layout-dependent addressing.
///
/// Storage is reference counted: cloning a buffer shares the elements, and the
/// first write through either handle detaches it (copy-on-write). This is how a
/// texture built from a rendered target avoids copying the pixels.
#[derive(Debug, Clone)]
pub struct TiledBuffer<T> {
    width: usize,
    height: usize,
    inner_width: usize,
    inner_height: usize,
    layout: BufferLayout,
    tile_size: usize,
    mapper: Option<IndexMapper>,
    data: Option<Arc<Vec<T>>>,
}

impl<T: Copy + Default> TiledBuffer<T> {
    pub fn new(layout: BufferLayout) -> Self {
        Self {
            width: 0,
            height: 0,
            inner_width: 0,
            inner_height: 0,
            layout,
            tile_size: DEFAULT_TILE_SIZE,
            mapper: None,
            data: None,
        }
    }

    /// Returns `None` when `tile_size` is not a power of two.
    pub fn with_tile_size(layout: BufferLayout, tile_size: usize) -> Option<Self> {
        if !tile_size.is_power_of_two() || tile_size > (1 << 15) {
            return None;
        }
        let mut buffer = Self::new(layout);
        buffer.tile_size = tile_size;
        Some(buffer)
    }

    /// Convenience constructor; `None` for a zero extent.
    pub fn with_size(layout: BufferLayout, width: usize, height: usize) -> Option<Self> {
        let mut buffer = Self::new(layout);
        buffer.create(width, height, None).then_some(buffer)
    }

    /// Builds a buffer from row-major (linear, bottom row first) content,
    /// rearranging it into the requested layout.
    pub fn from_linear(
        layout: BufferLayout,
        width: usize,
        height: usize,
        linear: &[T],
    ) -> Option<Self> {
        if linear.len() < width * height {
            return None;
        }
        let mut buffer = Self::with_size(layout, width, height)?;
        let mapper = buffer.mapper?;
        let data = buffer.raw_data_mut();
        for y in 0..height {
            for x in 0..width {
                data[mapper.index(x, y)] = linear[x + y * width];
            }
        }
        Some(buffer)
    }

    /// Allocates storage for `width` x `height` logical elements.
    ///
    /// `data`, if given, is copied verbatim and must already be in this
    /// buffer's layout. An unchanged extent keeps the current storage.
    /// Returns `false` for a zero extent.
    pub fn create(&mut self, width: usize, height: usize, data: Option<&[T]>) -> bool {
        if width == 0 || height == 0 {
            return false;
        }
        if self.width != width || self.height != height || self.data.is_none() {
            let (mapper, inner_width, inner_height) =
                IndexMapper::init_layout(self.layout, self.tile_size, width, height);
            self.width = width;
            self.height = height;
            self.inner_width = inner_width;
            self.inner_height = inner_height;
            self.mapper = Some(mapper);
            self.data = Some(Arc::new(vec![T::default(); inner_width * inner_height]));
        }
        if let Some(src) = data {
            let dst = self.raw_data_mut();
            let n = src.len().min(dst.len());
            dst[..n].copy_from_slice(&src[..n]);
        }
        true
    }

    pub fn destroy(&mut self) {
        self.width = 0;
        self.height = 0;
        self.inner_width = 0;
        self.inner_height = 0;
        self.mapper = None;
        self.data = None;
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn inner_width(&self) -> usize {
        self.inner_width
    }

    #[inline]
    pub fn inner_height(&self) -> usize {
        self.inner_height
    }

    pub fn layout(&self) -> BufferLayout {
        self.layout
    }

    pub fn tile_size(&self) -> usize {
        self.tile_size
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_none()
    }

    pub fn raw_data_size(&self) -> usize {
        self.data.as_ref().map_or(0, |d| d.len())
    }

    pub fn raw_data(&self) -> &[T] {
        self.data.as_ref().map_or(&[], |d| d.as_slice())
    }

    /// Mutable access to the physical storage, detaching shared storage first.
    pub fn raw_data_mut(&mut self) -> &mut [T] {
        match self.data.as_mut() {
            Some(data) => Arc::make_mut(data).as_mut_slice(),
            None => &mut [],
        }
    }

    /// True when both buffers currently point at the same storage
    pub fn shares_storage_with(&self, other: &TiledBuffer<T>) -> bool {
        match (&self.data, &other.data) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn mapper(&self) -> Option<IndexMapper> {
        self.mapper
    }

    /// Physical offset of (x, y), `None` outside the logical extent
    #[inline]
    pub fn index(&self, x: usize, y: usize) -> Option<usize> {
        match self.mapper {
            Some(mapper) if x < self.width && y < self.height => Some(mapper.index(x, y)),
            _ => None,
        }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Option<T> {
        let idx = self.index(x, y)?;
        self.data.as_ref().map(|d| d[idx])
    }

    #[inline]
    pub fn get_mut(&mut self, x: usize, y: usize) -> Option<&mut T> {
        let idx = self.index(x, y)?;
        self.data.as_mut().map(|d| &mut Arc::make_mut(d)[idx])
    }

    /// Out-of-range coordinates are ignored.
    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: T) {
        if let Some(slot) = self.get_mut(x, y) {
            *slot = value;
        }
    }

    /// Linearizes the logical content into `out` (row-major, `width` per row),
    /// reversing the row order when `flip_y` is set. Returns `false` when the
    /// buffer is empty or `out` is too small.
    pub fn copy_raw_data_to(&self, out: &mut [T], flip_y: bool) -> bool {
        let (Some(mapper), Some(data)) = (self.mapper, self.data.as_ref()) else {
            return false;
        };
        if out.len() < self.width * self.height {
            return false;
        }
        for y in 0..self.height {
            let src_y = if flip_y { self.height - 1 - y } else { y };
            let row = &mut out[y * self.width..(y + 1) * self.width];
            if self.layout == BufferLayout::Linear {
                let start = src_y * self.inner_width;
                row.copy_from_slice(&data[start..start + self.width]);
            } else {
                for (x, px) in row.iter_mut().enumerate() {
                    *px = data[mapper.index(x, src_y)];
                }
            }
        }
        true
    }

    pub fn to_linear(&self, flip_y: bool) -> Vec<T> {
        let mut out = vec![T::default(); self.width * self.height];
        self.copy_raw_data_to(&mut out, flip_y);
        out
    }

    pub fn clear(&mut self) {
        self.set_all(T::default());
    }

    pub fn set_all(&mut self, value: T) {
        if let Some(data) = self.data.as_mut() {
            match Arc::get_mut(data) {
                Some(owned) => owned.fill(value),
                // shared storage: a fresh allocation beats copying then overwriting
                None => *data = Arc::new(vec![value; data.len()]),
            }
        }
    }

    /// Raw shared view used by the block rasterizer.
    pub(crate) fn shared_view(&mut self) -> Option<SharedView<'_, T>> {
        let mapper = self.mapper?;
        let (width, height) = (self.width, self.height);
        let data = Arc::make_mut(self.data.as_mut()?);
        Some(SharedView {
            ptr: data.as_mut_ptr(),
            len: data.len(),
            mapper,
            width,
            height,
            _marker: PhantomData,
        })
    }
}

/// Unsynchronized view over a buffer's storage, shared between workers that
/// touch pairwise disjoint pixel rectangles.
///
/// The view mutably borrows the buffer for `'a`, so no other access to the
/// storage can exist while workers hold it.
pub(crate) struct SharedView<'a, T> {
    ptr: *mut T,
    len: usize,
    mapper: IndexMapper,
    width: usize,
    height: usize,
    _marker: PhantomData<&'a mut [T]>,
}

// Safety: the pointer comes from an exclusive borrow held for 'a. Concurrent
// users only ever go through `read`/`write`, whose callers guarantee that no
// two threads address the same (x, y) at once.
unsafe impl<T: Send> Send for SharedView<'_, T> {}
unsafe impl<T: Send> Sync for SharedView<'_, T> {}

impl<T: Copy> SharedView<'_, T> {
    #[inline]
    pub(crate) fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub(crate) fn height(&self) -> usize {
        self.height
    }

    /// # Safety
    /// No other thread may write (x, y) concurrently.
    #[inline]
    pub(crate) unsafe fn read(&self, x: usize, y: usize) -> Option<T> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = self.mapper.index(x, y);
        debug_assert!(idx < self.len);
        Some(unsafe { *self.ptr.add(idx) })
    }

    /// # Safety
    /// No other thread may read or write (x, y) concurrently.
    #[inline]
    pub(crate) unsafe fn write(&self, x: usize, y: usize, value: T) {
        if x >= self.width || y >= self.height {
            return;
        }
        let idx = self.mapper.index(x, y);
        debug_assert!(idx < self.len);
        unsafe { *self.ptr.add(idx) = value };
    }
}
