//! Primitive batching on top of a streamer.
//!
//! A [`PrimitiveBatcher`] collects whole primitives (quads or lines) of a
//! typed vertex and streams them in as few `render` calls as possible. Quads
//! are drawn as indexed triangle lists through a shared static
//! `0, 1, 2, 0, 2, 3` pattern; glyph runs are quads and take the same path.
//!
//! # Example
//!
//! ```ignore
//! let mut sprites = PrimitiveBatcher::<SpriteVertex>::new(
//!     &factory,
//!     VertexLayout::sprite(),
//!     BatchKind::Quads,
//!     1024,
//!     &StreamerConfig::new().with_label("sprites"),
//! )?;
//!
//! sprites.begin(&shader)?;
//! for sprite in &visible {
//!     sprites.push(&sprite.corners())?;
//! }
//! sprites.end()?;
//! ```

use std::sync::Arc;

use bytemuck::Pod;

use crate::error::GraphicsError;
use crate::mesh::{IndexData, VertexLayout};
use crate::shader::ShaderHandle;
use crate::stream::{
    PrimitiveBatch, PrimitiveStreamer, StreamerConfig, StreamerFactory, StreamerStats,
};
use crate::types::{IndexFormat, PrimitiveTopology};

/// Kind of primitive a batcher collects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BatchKind {
    /// Four vertices per primitive, drawn as two indexed triangles.
    Quads,
    /// Two vertices per primitive, drawn as a line segment.
    Lines,
}

impl BatchKind {
    /// Vertices making up one primitive.
    pub fn vertices_per_primitive(&self) -> u32 {
        match self {
            Self::Quads => 4,
            Self::Lines => 2,
        }
    }

    /// Vertices or indices drawn per primitive.
    pub fn draw_elements_per_primitive(&self) -> u32 {
        match self {
            Self::Quads => 6,
            Self::Lines => 2,
        }
    }

    /// Topology the primitives are drawn with.
    pub fn topology(&self) -> PrimitiveTopology {
        match self {
            Self::Quads => PrimitiveTopology::TriangleList,
            Self::Lines => PrimitiveTopology::LineList,
        }
    }
}

/// Counters reported by [`PrimitiveBatcher::stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BatchStats {
    /// Primitives handed to the streamer.
    pub rendered_primitive_count: u64,
    /// `render` calls issued.
    pub flushed_batch_count: u64,
    /// Most primitives in a single `render` call.
    pub largest_batch: u32,
}

/// Accumulates primitives of vertex type `V` and streams them in batches.
pub struct PrimitiveBatcher<V: Pod> {
    streamer: PrimitiveStreamer,
    kind: BatchKind,
    max_primitives: u32,
    vertices: Vec<V>,
    stats: BatchStats,
}

impl<V: Pod> PrimitiveBatcher<V> {
    /// Create a batcher flushing at most `max_primitives` per draw.
    ///
    /// # Errors
    ///
    /// Returns [`GraphicsError::InvalidLayout`] if `V` does not have the
    /// layout's stride, and [`GraphicsError::InvalidParameter`] if
    /// `max_primitives` is zero.
    pub fn new(
        factory: &StreamerFactory,
        layout: Arc<VertexLayout>,
        kind: BatchKind,
        max_primitives: u32,
        config: &StreamerConfig,
    ) -> Result<Self, GraphicsError> {
        let vertex_size = std::mem::size_of::<V>();
        if vertex_size != layout.vertex_stride() as usize {
            return Err(GraphicsError::InvalidLayout(format!(
                "vertex type is {} bytes but the layout stride is {}",
                vertex_size,
                layout.vertex_stride()
            )));
        }
        if max_primitives == 0 {
            return Err(GraphicsError::InvalidParameter(
                "batch size must be at least one primitive".to_string(),
            ));
        }

        let indices = match kind {
            BatchKind::Quads => {
                let vertex_count = u64::from(max_primitives) * 4;
                let format = if vertex_count <= IndexFormat::Uint16.addressable_vertices() {
                    IndexFormat::Uint16
                } else {
                    IndexFormat::Uint32
                };
                Some(IndexData::quads(max_primitives, format)?)
            }
            BatchKind::Lines => None,
        };
        let streamer = factory.create(layout, indices, config)?;

        Ok(Self {
            streamer,
            kind,
            max_primitives,
            vertices: Vec::with_capacity(
                max_primitives as usize * kind.vertices_per_primitive() as usize,
            ),
            stats: BatchStats::default(),
        })
    }

    /// Bind the streamer to `shader` and start collecting.
    pub fn begin(&mut self, shader: &ShaderHandle) -> Result<(), GraphicsError> {
        self.streamer.bind(shader)
    }

    /// Add whole primitives, flushing every time the batch fills up.
    ///
    /// `vertices` must hold a whole number of primitives.
    pub fn push(&mut self, vertices: &[V]) -> Result<(), GraphicsError> {
        let per_primitive = self.kind.vertices_per_primitive() as usize;
        if vertices.len() % per_primitive != 0 {
            return Err(GraphicsError::InvalidParameter(format!(
                "{} vertices do not form whole {:?} primitives",
                vertices.len(),
                self.kind
            )));
        }
        if self.streamer.bound_shader().is_none() {
            return Err(GraphicsError::NotBound);
        }

        let capacity = self.max_primitives as usize * per_primitive;
        let mut rest = vertices;
        while !rest.is_empty() {
            let room = capacity - self.vertices.len();
            let (now, later) = rest.split_at(room.min(rest.len()));
            self.vertices.extend_from_slice(now);
            if self.vertices.len() == capacity {
                self.flush()?;
            }
            rest = later;
        }
        Ok(())
    }

    /// Number of primitives waiting for the next flush.
    pub fn pending_primitives(&self) -> u32 {
        (self.vertices.len() / self.kind.vertices_per_primitive() as usize) as u32
    }

    /// Stream the pending primitives with one `render` call.
    pub fn flush(&mut self) -> Result<(), GraphicsError> {
        if self.vertices.is_empty() {
            return Ok(());
        }
        let primitives = self.pending_primitives();
        let batch = PrimitiveBatch::from_vertices(
            &self.vertices,
            primitives,
            primitives * self.kind.draw_elements_per_primitive(),
        );
        let result = self.streamer.render(self.kind.topology(), &batch);
        self.vertices.clear();
        result?;

        self.stats.rendered_primitive_count += u64::from(primitives);
        self.stats.flushed_batch_count += 1;
        self.stats.largest_batch = self.stats.largest_batch.max(primitives);
        Ok(())
    }

    /// Flush and unbind.
    pub fn end(&mut self) -> Result<(), GraphicsError> {
        let result = self.flush();
        self.streamer.unbind();
        result
    }

    /// Drop pending primitives and release the streamer.
    pub fn dispose(&mut self) -> Result<(), GraphicsError> {
        self.vertices.clear();
        self.streamer.dispose()
    }

    /// Get the primitive kind.
    pub fn kind(&self) -> BatchKind {
        self.kind
    }

    /// Most primitives per flush.
    pub fn max_primitives(&self) -> u32 {
        self.max_primitives
    }

    /// Get the batcher counters.
    pub fn stats(&self) -> BatchStats {
        self.stats
    }

    /// Get the streamer counters.
    pub fn streamer_stats(&self) -> StreamerStats {
        self.streamer.stats()
    }

    /// Get the underlying streamer.
    pub fn streamer(&self) -> &PrimitiveStreamer {
        &self.streamer
    }
}

impl<V: Pod> std::fmt::Debug for PrimitiveBatcher<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrimitiveBatcher")
            .field("kind", &self.kind)
            .field("max_primitives", &self.max_primitives)
            .field("pending", &self.pending_primitives())
            .field("streamer", &self.streamer)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use bytemuck::{Pod, Zeroable};

    use super::*;
    use crate::backend::GpuBackend;
    use crate::backend::dummy::{DummyBackend, GpuCompletion};
    use crate::stream::StrategyKind;

    #[repr(C)]
    #[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
    struct SpriteVertex {
        position: [f32; 2],
        uv: [f32; 2],
        color: [u8; 4],
    }

    fn quad(x: f32) -> [SpriteVertex; 4] {
        let v = |dx: f32, dy: f32| SpriteVertex {
            position: [x + dx, dy],
            uv: [dx, dy],
            color: [255; 4],
        };
        [v(0.0, 0.0), v(1.0, 0.0), v(1.0, 1.0), v(0.0, 1.0)]
    }

    fn setup(kind: StrategyKind) -> (Rc<DummyBackend>, StreamerFactory, ShaderHandle) {
        let dummy = Rc::new(DummyBackend::new().with_completion(GpuCompletion::Manual));
        let backend: Rc<dyn GpuBackend> = dummy.clone();
        let factory = StreamerFactory::with_strategy(backend, kind).unwrap();
        let shader = ShaderHandle::new(dummy.create_program(&[
            "in_position",
            "in_texcoord0",
            "in_color",
        ]));
        (dummy, factory, shader)
    }

    #[test]
    fn test_quads_flush_when_full() {
        let (dummy, factory, shader) = setup(StrategyKind::PersistentMapped);
        let mut batcher = PrimitiveBatcher::<SpriteVertex>::new(
            &factory,
            VertexLayout::sprite(),
            BatchKind::Quads,
            4,
            &StreamerConfig::new(),
        )
        .unwrap();

        batcher.begin(&shader).unwrap();
        for i in 0..10 {
            batcher.push(&quad(i as f32)).unwrap();
        }
        assert_eq!(batcher.pending_primitives(), 2);
        batcher.end().unwrap();

        let stats = batcher.stats();
        assert_eq!(stats.rendered_primitive_count, 10);
        assert_eq!(stats.flushed_batch_count, 3);
        assert_eq!(stats.largest_batch, 4);
        assert_eq!(batcher.streamer_stats().draw_call_count, 3);

        dummy.complete_all();
        assert_eq!(dummy.stats().hazards, 0);
        assert_eq!(dummy.stats().invalid_draws, 0);
    }

    #[test]
    fn test_push_many_primitives_at_once() {
        let (_dummy, factory, shader) = setup(StrategyKind::DiscardRespecify);
        let mut batcher = PrimitiveBatcher::<SpriteVertex>::new(
            &factory,
            VertexLayout::sprite(),
            BatchKind::Quads,
            3,
            &StreamerConfig::new(),
        )
        .unwrap();

        let run: Vec<SpriteVertex> = (0..7).flat_map(|i| quad(i as f32)).collect();
        batcher.begin(&shader).unwrap();
        batcher.push(&run).unwrap();
        batcher.end().unwrap();

        assert_eq!(batcher.stats().flushed_batch_count, 3);
        assert_eq!(batcher.streamer_stats().discarded_buffer_count, 3);
    }

    #[test]
    fn test_lines_use_array_draws() {
        let (dummy, factory, shader) = setup(StrategyKind::Legacy);
        let mut batcher = PrimitiveBatcher::<SpriteVertex>::new(
            &factory,
            VertexLayout::sprite(),
            BatchKind::Lines,
            16,
            &StreamerConfig::new(),
        )
        .unwrap();

        let q = quad(0.0);
        batcher.begin(&shader).unwrap();
        batcher.push(&q[..2]).unwrap();
        batcher.push(&q[2..]).unwrap();
        batcher.end().unwrap();

        assert_eq!(batcher.stats().rendered_primitive_count, 2);
        assert_eq!(dummy.stats().draw_calls, 1);
        assert_eq!(dummy.stats().live_buffers, 1);
    }

    #[test]
    fn test_push_validation() {
        let (_dummy, factory, shader) = setup(StrategyKind::DiscardRespecify);
        let mut batcher = PrimitiveBatcher::<SpriteVertex>::new(
            &factory,
            VertexLayout::sprite(),
            BatchKind::Quads,
            8,
            &StreamerConfig::new(),
        )
        .unwrap();

        let q = quad(0.0);
        assert_eq!(batcher.push(&q), Err(GraphicsError::NotBound));
        batcher.begin(&shader).unwrap();
        assert!(matches!(
            batcher.push(&q[..3]),
            Err(GraphicsError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_vertex_size_must_match_layout() {
        let (_dummy, factory, _shader) = setup(StrategyKind::DiscardRespecify);
        let result = PrimitiveBatcher::<[f32; 3]>::new(
            &factory,
            VertexLayout::sprite(),
            BatchKind::Lines,
            8,
            &StreamerConfig::new(),
        );
        assert!(matches!(result, Err(GraphicsError::InvalidLayout(_))));
    }

    #[test]
    fn test_large_quad_batches_use_wide_indices() {
        let (_dummy, factory, _shader) = setup(StrategyKind::DiscardRespecify);
        let batcher = PrimitiveBatcher::<SpriteVertex>::new(
            &factory,
            VertexLayout::sprite(),
            BatchKind::Quads,
            20_000,
            &StreamerConfig::new(),
        );
        assert!(batcher.is_ok());
    }
}
