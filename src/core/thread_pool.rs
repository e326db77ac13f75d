//! Fixed-size worker pool and the screen partition it works on.

use crate::core::log_context::LogContext;
use rayon::prelude::*;
use std::sync::{Arc, Condvar, Mutex, PoisonError};

/// Half-open pixel rectangle `[x0, x1) x [y0, y1)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x0: usize,
    pub y0: usize,
    pub x1: usize,
    pub y1: usize,
}

impl Rect {
    pub fn new(x0: usize, y0: usize, x1: usize, y1: usize) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> usize {
        self.x1.saturating_sub(self.x0)
    }

    pub fn height(&self) -> usize {
        self.y1.saturating_sub(self.y0)
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    pub fn area(&self) -> usize {
        self.width() * self.height()
    }

    #[inline]
    pub fn contains(&self, x: usize, y: usize) -> bool {
        x >= self.x0 && x < self.x1 && y >= self.y0 && y < self.y1
    }

    pub fn intersect(&self, other: &Rect) -> Rect {
        let r = Rect {
            x0: self.x0.max(other.x0),
            y0: self.y0.max(other.y0),
            x1: self.x1.min(other.x1),
            y1: self.y1.min(other.y1),
        };
        if r.is_empty() {
            Rect::new(r.x0, r.y0, r.x0, r.y0)
        } else {
            r
        }
    }

    pub fn overlaps(&self, other: &Rect) -> bool {
        !self.intersect(other).is_empty()
    }
}

/// Default block side for raster work units
pub const DEFAULT_BLOCK_SIZE: usize = 32;

/// Splits `region` into blocks anchored at absolute multiples of
/// `block_size`, clipped to the region. Blocks are pairwise disjoint and
/// cover the region exactly once; `block_size` is rounded up to an even
/// number so a 2x2 quad at even coordinates never spans two blocks.
pub fn partition_blocks(region: &Rect, block_size: usize) -> Vec<Rect> {
    if region.is_empty() {
        return Vec::new();
    }
    let bs = block_size.max(2).next_multiple_of(2);
    let mut blocks = Vec::new();
    let mut by = region.y0 / bs * bs;
    while by < region.y1 {
        let mut bx = region.x0 / bs * bs;
        while bx < region.x1 {
            blocks.push(Rect {
                x0: bx.max(region.x0),
                y0: by.max(region.y0),
                x1: (bx + bs).min(region.x1),
                y1: (by + bs).min(region.y1),
            });
            bx += bs;
        }
        by += bs;
    }
    blocks
}

/// Counter of jobs submitted with [`WorkerPool::spawn`] that have not finished
#[derive(Default)]
struct Pending {
    count: Mutex<usize>,
    idle: Condvar,
}

/// Decrements the pending counter even if the job panics
struct PendingGuard(Arc<Pending>);

impl Drop for PendingGuard {
    fn drop(&mut self) {
        let mut count = self.0.count.lock().unwrap_or_else(PoisonError::into_inner);
        *count -= 1;
        if *count == 0 {
            self.0.idle.notify_all();
        }
    }
}

/// Fixed set of named worker threads.
pub struct WorkerPool {
    pool: rayon::ThreadPool,
    pending: Arc<Pending>,
    log: LogContext,
}

impl WorkerPool {
    /// `threads == 0` uses the available parallelism.
    pub fn new(threads: usize, log: LogContext) -> Result<Self, String> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("softrender-worker-{}", i))
            .build()
            .map_err(|e| format!("Failed to create worker pool: {}", e))?;
        log.debug(format_args!(
            "worker pool started with {} threads",
            pool.current_num_threads()
        ));
        Ok(Self {
            pool,
            pending: Arc::new(Pending::default()),
            log,
        })
    }

    pub fn thread_count(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Runs `task` once per block and returns when every block is done.
    ///
    /// Scratch state comes from `init`, which rayon calls once per job split
    /// rather than once per thread. A scratch value is reused across the
    /// blocks of its split, so `task` must reset whatever it relies on.
    pub fn run_blocks<S, I, F>(&self, blocks: &[Rect], init: I, task: F)
    where
        I: Fn() -> S + Sync + Send,
        F: Fn(&mut S, &Rect) + Sync + Send,
    {
        self.pool.install(|| {
            blocks
                .par_iter()
                .for_each_init(&init, |scratch, block| task(scratch, block));
        });
    }

    /// Runs `op` inside the pool so its rayon iterators use the pool's threads.
    pub fn install<R, OP>(&self, op: OP) -> R
    where
        OP: FnOnce() -> R + Send,
        R: Send,
    {
        self.pool.install(op)
    }

    /// Queues a detached job;[`WorkerPool::wait_idle`] waits for it.
    pub fn spawn<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        {
            let mut count = self
                .pending
                .count
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            *count += 1;
        }
        let guard = PendingGuard(Arc::clone(&self.pending));
        self.pool.spawn(move || {
            let _guard = guard;
            job();
        });
    }

    /// Blocks until every spawned job has finished.
    pub fn wait_idle(&self) {
        let mut count = self
            .pending
            .count
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if *count > 0 {
            self.log
                .trace(format_args!("waiting for {} pending jobs", *count));
        }
        while *count > 0 {
            count = self
                .pending
                .idle
                .wait(count)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.wait_idle();
    }
}
