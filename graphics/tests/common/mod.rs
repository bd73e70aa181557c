//! Common utilities for streaming integration tests.
//!
//! Every test runs against the simulated [`DummyBackend`], which executes
//! draws lazily in [`GpuCompletion::Manual`] mode and reports any draw whose
//! input bytes were overwritten before it executed.

use std::rc::Rc;
use std::sync::Arc;

use streamline_graphics::{
    DummyBackend, GpuBackend, GpuCompletion, PrimitiveStreamer, ShaderHandle, StrategyKind,
    StreamerConfig, StreamerFactory, VertexAttribute, VertexLayout,
};

/// Bytes per vertex of [`position_uv_layout`].
pub const UV_STRIDE: usize = 16;

/// Initialize logging once for the test binary.
pub fn init_logging() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init();
}

/// Position (float2) and texture coordinate (float2), 16 bytes per vertex.
pub fn position_uv_layout() -> Arc<VertexLayout> {
    let layout = VertexLayout::new(vec![
        VertexAttribute::position2(0),
        VertexAttribute::texcoord0(8),
    ])
    .expect("valid layout")
    .with_label("position_uv");
    Arc::new(layout)
}

/// Vertex bytes whose content depends on `seed`, so overwritten ranges are
/// always detected.
pub fn vertex_bytes(vertex_count: usize, seed: u32) -> Vec<u8> {
    (0..vertex_count * UV_STRIDE / 4)
        .flat_map(|i| (seed.wrapping_mul(7919) ^ i as u32).to_le_bytes())
        .collect()
}

// ============================================================================
// Test Context
// ============================================================================

/// A simulated backend, a factory pinned to one strategy and a shader
/// consuming [`position_uv_layout`].
pub struct TestContext {
    pub dummy: Rc<DummyBackend>,
    pub factory: StreamerFactory,
    pub shader: ShaderHandle,
}

impl TestContext {
    pub fn new(kind: StrategyKind, completion: GpuCompletion) -> Self {
        Self::from_backend(kind, DummyBackend::new().with_completion(completion))
    }

    /// Like [`new`](Self::new), but the backend records executed draws.
    pub fn recording(kind: StrategyKind, completion: GpuCompletion) -> Self {
        Self::from_backend(
            kind,
            DummyBackend::new()
                .with_completion(completion)
                .with_draw_recording(),
        )
    }

    fn from_backend(kind: StrategyKind, dummy: DummyBackend) -> Self {
        init_logging();
        let dummy = Rc::new(dummy);
        let backend: Rc<dyn GpuBackend> = dummy.clone();
        let factory = StreamerFactory::with_strategy(backend, kind).expect("strategy available");
        let shader = ShaderHandle::new(dummy.create_program(&["in_position", "in_texcoord0"]));
        Self {
            dummy,
            factory,
            shader,
        }
    }

    /// Create an unindexed streamer with `initial_capacity` bytes.
    pub fn streamer(&self, initial_capacity: u64) -> PrimitiveStreamer {
        let config = StreamerConfig::new()
            .with_initial_capacity(initial_capacity)
            .with_label("test");
        self.factory
            .create(position_uv_layout(), None, &config)
            .expect("streamer")
    }
}
