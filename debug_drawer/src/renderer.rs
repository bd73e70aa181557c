use streamline_graphics::{
    BatchKind, GraphicsError, PrimitiveBatcher, ShaderHandle, StreamerConfig, StreamerFactory,
    StreamerStats,
};

use crate::drawer::DebugRenderData;
use crate::vertex::DebugVertex;

/// Default primitives per flushed batch, for both lines and quads.
const DEFAULT_BATCH_PRIMITIVES: u32 = 4096;

/// What one [`DebugDrawerRenderer::render`] call submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DebugRenderStats {
    pub line_count: usize,
    pub quad_count: usize,
    /// Draw calls issued for lines and quads together.
    pub batch_count: u64,
}

/// Streams debug geometry through a line batcher and a quad batcher.
///
/// Create once on the thread owning the graphics context. Each frame, pass
/// the result of [`DebugDrawer::take_render_data()`](crate::DebugDrawer::take_render_data)
/// to [`render`](Self::render).
pub struct DebugDrawerRenderer {
    lines: PrimitiveBatcher<DebugVertex>,
    quads: PrimitiveBatcher<DebugVertex>,
}

impl DebugDrawerRenderer {
    /// Create a renderer with the default batch size.
    pub fn new(factory: &StreamerFactory) -> Result<Self, GraphicsError> {
        Self::with_batch_size(factory, DEFAULT_BATCH_PRIMITIVES)
    }

    /// Create a renderer flushing every `max_primitives` lines or quads.
    pub fn with_batch_size(
        factory: &StreamerFactory,
        max_primitives: u32,
    ) -> Result<Self, GraphicsError> {
        let lines = PrimitiveBatcher::new(
            factory,
            DebugVertex::layout(),
            BatchKind::Lines,
            max_primitives,
            &StreamerConfig::new().with_label("debug_lines"),
        )?;
        let quads = PrimitiveBatcher::new(
            factory,
            DebugVertex::layout(),
            BatchKind::Quads,
            max_primitives,
            &StreamerConfig::new().with_label("debug_quads"),
        )?;
        log::debug!(
            "Debug drawer renderer using {} streaming, {} primitives per batch",
            factory.kind(),
            max_primitives
        );
        Ok(Self { lines, quads })
    }

    /// Draw `data` with `shader`. Quads are drawn before lines.
    ///
    /// The shader must consume `in_position` and `in_color`.
    pub fn render(
        &mut self,
        shader: &ShaderHandle,
        data: &DebugRenderData,
    ) -> Result<DebugRenderStats, GraphicsError> {
        let before = self.lines.stats().flushed_batch_count + self.quads.stats().flushed_batch_count;

        Self::stream(&mut self.quads, shader, &data.quads)?;
        Self::stream(&mut self.lines, shader, &data.lines)?;

        let after = self.lines.stats().flushed_batch_count + self.quads.stats().flushed_batch_count;
        Ok(DebugRenderStats {
            line_count: data.line_count(),
            quad_count: data.quad_count(),
            batch_count: after - before,
        })
    }

    fn stream(
        batcher: &mut PrimitiveBatcher<DebugVertex>,
        shader: &ShaderHandle,
        vertices: &[DebugVertex],
    ) -> Result<(), GraphicsError> {
        if vertices.is_empty() {
            return Ok(());
        }
        batcher.begin(shader)?;
        let pushed = batcher.push(vertices);
        let ended = batcher.end();
        pushed.and(ended)
    }

    /// Streamer counters of the line batcher.
    pub fn line_stats(&self) -> StreamerStats {
        self.lines.streamer_stats()
    }

    /// Streamer counters of the quad batcher.
    pub fn quad_stats(&self) -> StreamerStats {
        self.quads.streamer_stats()
    }

    /// Release both streamers.
    pub fn dispose(&mut self) -> Result<(), GraphicsError> {
        let lines = self.lines.dispose();
        let quads = self.quads.dispose();
        lines.and(quads)
    }
}

impl std::fmt::Debug for DebugDrawerRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DebugDrawerRenderer")
            .field("lines", &self.lines.stats())
            .field("quads", &self.quads.stats())
            .finish()
    }
}
