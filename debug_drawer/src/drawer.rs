use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::vertex::DebugVertex;

/// Debug geometry accumulated for one tick.
///
/// `lines` holds vertex pairs, `quads` holds vertex quadruples in
/// counter-clockwise corner order.
#[derive(Debug, Clone, Default)]
pub struct DebugRenderData {
    pub lines: Vec<DebugVertex>,
    pub quads: Vec<DebugVertex>,
}

impl DebugRenderData {
    /// Number of line segments.
    pub fn line_count(&self) -> usize {
        self.lines.len() / 2
    }

    /// Number of filled quads.
    pub fn quad_count(&self) -> usize {
        self.quads.len() / 4
    }

    /// Check if there is nothing to draw.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty() && self.quads.is_empty()
    }

    fn clear(&mut self) {
        self.lines.clear();
        self.quads.clear();
    }

    fn append(&mut self, other: &DebugRenderData) {
        self.lines.extend_from_slice(&other.lines);
        self.quads.extend_from_slice(&other.quads);
    }
}

/// Thread-safe debug drawing accumulator.
///
/// Double-buffered:
/// - `frames[current_tick % 2]` is being written to by [`DebugDrawerContext`]s
/// - `frames[(current_tick + 1) % 2]` holds previous tick data, ready for rendering
///
/// Call [`advance_tick`](Self::advance_tick) once per frame before creating any contexts.
/// The renderer reads the previous tick's data via [`take_render_data`](Self::take_render_data).
pub struct DebugDrawer {
    current_tick: AtomicU64,
    frames: Mutex<[DebugRenderData; 2]>,
}

impl DebugDrawer {
    /// Create a new debug drawer starting at tick 0.
    pub fn new() -> Self {
        Self {
            current_tick: AtomicU64::new(0),
            frames: Mutex::new([DebugRenderData::default(), DebugRenderData::default()]),
        }
    }

    /// Get the current tick.
    pub fn current_tick(&self) -> u64 {
        self.current_tick.load(Ordering::Acquire)
    }

    /// Advance to the next tick.
    ///
    /// Increments the tick counter and clears the new write buffer.
    /// Call this once per frame at the start, before creating any contexts.
    pub fn advance_tick(&self) {
        let new_tick = self.current_tick.load(Ordering::Acquire) + 1;
        let write_index = (new_tick % 2) as usize;
        {
            let mut frames = self.frames.lock();
            frames[write_index].clear();
        }
        self.current_tick.store(new_tick, Ordering::Release);
    }

    /// Create a drawing context for the current tick.
    ///
    /// The context collects vertices locally and flushes them to the
    /// drawer on [`Drop`]; the mutex is only held during the flush.
    pub fn context(&self) -> DebugDrawerContext<'_> {
        let tick = self.current_tick.load(Ordering::Acquire);
        DebugDrawerContext {
            drawer: self,
            tick,
            data: DebugRenderData::default(),
        }
    }

    /// Take the previous tick's render data.
    ///
    /// Returns the geometry accumulated in tick N-1 (while tick N is being
    /// collected). The internal storage is left empty.
    pub fn take_render_data(&self) -> DebugRenderData {
        let tick = self.current_tick.load(Ordering::Acquire);
        let render_index = ((tick + 1) % 2) as usize;
        let mut frames = self.frames.lock();
        std::mem::take(&mut frames[render_index])
    }

    /// Append geometry from a finished context.
    fn flush(&self, tick: u64, data: DebugRenderData) {
        if data.is_empty() {
            return;
        }
        let current = self.current_tick.load(Ordering::Acquire);
        if tick != current {
            log::warn!(
                "DebugDrawerContext flushed for tick {} but current is {}; discarding",
                tick,
                current
            );
            return;
        }
        let write_index = (tick % 2) as usize;
        let mut frames = self.frames.lock();
        frames[write_index].append(&data);
    }
}

impl Default for DebugDrawer {
    fn default() -> Self {
        Self::new()
    }
}

/// A short-lived drawing context.
///
/// Collects debug geometry locally. On [`Drop`], flushes it to the parent
/// [`DebugDrawer`] under a brief lock.
///
/// Obtain via [`DebugDrawer::context()`].
pub struct DebugDrawerContext<'a> {
    drawer: &'a DebugDrawer,
    tick: u64,
    data: DebugRenderData,
}

impl DebugDrawerContext<'_> {
    /// Push two vertices forming a line segment.
    #[inline]
    pub fn push_line(&mut self, start: [f32; 3], end: [f32; 3], color: [f32; 4]) {
        self.data.lines.push(DebugVertex::new(start, color));
        self.data.lines.push(DebugVertex::new(end, color));
    }

    /// Push four corners forming a filled quad.
    #[inline]
    pub fn push_quad(&mut self, corners: [[f32; 3]; 4], color: [f32; 4]) {
        self.data
            .quads
            .extend(corners.map(|corner| DebugVertex::new(corner, color)));
    }
}

impl Drop for DebugDrawerContext<'_> {
    fn drop(&mut self) {
        let data = std::mem::take(&mut self.data);
        self.drawer.flush(self.tick, data);
    }
}
