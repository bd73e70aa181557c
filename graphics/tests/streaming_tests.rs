//! Streaming integration tests.
//!
//! Each test drives the public streamer API against the simulated backend.
//! Tests are parameterized using `rstest` to run against every strategy.
//!
//! # Test Categories
//!
//! - **Selection Tests**: Capability probing picks the highest priority strategy
//! - **Synchronization Tests**: No draw ever reads bytes overwritten after submission
//! - **Ring Tests**: Wraparound, stalls and growth of the persistent ring
//! - **Lifecycle Tests**: Bind/unbind contract, disposal and error cleanup
//!
//! # Running Tests
//!
//! ```bash
//! cargo test --test streaming_tests
//! ```

mod common;

use bytemuck::{Pod, Zeroable};
use rstest::rstest;

use common::{TestContext, UV_STRIDE, position_uv_layout, vertex_bytes};
use streamline_graphics::{
    ApiVersion, BatchKind, CapabilityProbe, CapabilitySet, DummyFailure, GpuCompletion,
    GraphicsError, PrimitiveBatch, PrimitiveBatcher, PrimitiveTopology, ShaderHandle, StrategyKind,
    StreamerConfig, VertexLayout,
};

// ============================================================================
// Selection Tests
// ============================================================================

#[rstest]
#[case::gl46((4, 6), &[], Some(StrategyKind::PersistentMapped))]
#[case::gl33_buffer_storage((3, 3), &["GL_ARB_buffer_storage"], Some(StrategyKind::PersistentMapped))]
#[case::gl33((3, 3), &[], Some(StrategyKind::DiscardRespecify))]
#[case::gl21_vertex_array((2, 1), &["GL_ARB_vertex_array_object"], Some(StrategyKind::DiscardRespecify))]
#[case::gl21((2, 1), &[], Some(StrategyKind::Legacy))]
#[case::gl14_vertex_buffer((1, 4), &["GL_ARB_vertex_buffer_object"], Some(StrategyKind::Legacy))]
#[case::gl14((1, 4), &[], None)]
fn test_strategy_selection(
    #[case] version: (u32, u32),
    #[case] extensions: &[&str],
    #[case] expected: Option<StrategyKind>,
) {
    let capabilities = CapabilitySet::new(
        ApiVersion::new(version.0, version.1),
        extensions.iter().copied(),
    );
    let probe = CapabilityProbe::from_capabilities(capabilities);

    match expected {
        Some(kind) => {
            assert_eq!(probe.select().unwrap(), kind);
            assert_eq!(probe.supported_strategies().first(), Some(&kind));
        }
        None => {
            assert!(matches!(
                probe.select(),
                Err(GraphicsError::UnsupportedPlatform(_))
            ));
            assert!(probe.supported_strategies().is_empty());
        }
    }
}

// ============================================================================
// Synchronization Tests
// ============================================================================

/// Many frames of varying batch sizes while the simulated GPU lags behind.
#[rstest]
#[case::persistent(StrategyKind::PersistentMapped)]
#[case::discard(StrategyKind::DiscardRespecify)]
#[case::legacy(StrategyKind::Legacy)]
fn test_sustained_streaming_has_no_hazards(#[case] kind: StrategyKind) {
    let ctx = TestContext::new(kind, GpuCompletion::Manual);
    let mut streamer = ctx.streamer(960);
    streamer.bind(&ctx.shader).unwrap();

    let mut submitted = 0;
    for frame in 0..60u32 {
        for batch in 0..3u32 {
            let vertex_count = 3 + ((frame * 3 + batch) % 28) as usize;
            let data = vertex_bytes(vertex_count, frame * 3 + batch);
            let batch = PrimitiveBatch::new(&data, vertex_count as u32, vertex_count as u32);
            streamer.render(PrimitiveTopology::PointList, &batch).unwrap();
            submitted += 1;
        }
        ctx.dummy.advance(1);
    }
    ctx.dummy.complete_all();

    let gpu = ctx.dummy.stats();
    assert_eq!(gpu.hazards, 0);
    assert_eq!(gpu.invalid_draws, 0);
    assert_eq!(gpu.draw_calls, submitted);
    assert_eq!(gpu.executed_draws, submitted);
    assert_eq!(streamer.stats().draw_call_count, submitted);
}

#[rstest]
#[case::persistent(StrategyKind::PersistentMapped)]
#[case::discard(StrategyKind::DiscardRespecify)]
#[case::legacy(StrategyKind::Legacy)]
fn test_executed_bytes_match_submitted(#[case] kind: StrategyKind) {
    let ctx = TestContext::recording(kind, GpuCompletion::Manual);
    let mut streamer = ctx.streamer(480);
    streamer.bind(&ctx.shader).unwrap();

    let batches: Vec<Vec<u8>> = (0..10).map(|seed| vertex_bytes(12, seed)).collect();
    for data in &batches {
        let batch = PrimitiveBatch::new(data, 4, 12);
        streamer.render(PrimitiveTopology::TriangleList, &batch).unwrap();
    }
    ctx.dummy.complete_all();

    let executed = ctx.dummy.take_executed_draws();
    assert_eq!(executed.len(), batches.len());
    for (draw, data) in executed.iter().zip(&batches) {
        assert_eq!(draw.topology, PrimitiveTopology::TriangleList);
        assert_eq!(&draw.bytes, data);
    }
    assert_eq!(ctx.dummy.stats().hazards, 0);
}

/// Empty batches draw nothing but still count as renders.
#[rstest]
#[case::persistent(StrategyKind::PersistentMapped, 0)]
#[case::discard(StrategyKind::DiscardRespecify, 3)]
#[case::legacy(StrategyKind::Legacy, 3)]
fn test_empty_batch_skips_draw(#[case] kind: StrategyKind, #[case] expected_discards: u64) {
    let ctx = TestContext::new(kind, GpuCompletion::Immediate);
    let mut streamer = ctx.streamer(320);
    streamer.bind(&ctx.shader).unwrap();

    for _ in 0..3 {
        let batch = PrimitiveBatch::new(&[], 0, 0);
        streamer.render(PrimitiveTopology::LineList, &batch).unwrap();
    }

    let stats = streamer.stats();
    assert_eq!(stats.draw_call_count, 0);
    assert_eq!(stats.discarded_buffer_count, expected_discards);
    assert_eq!(ctx.dummy.stats().draw_calls, 0);
}

// ============================================================================
// Ring Tests
// ============================================================================

#[test]
fn test_ring_wraps_without_growth_when_gpu_keeps_up() {
    let ctx = TestContext::new(StrategyKind::PersistentMapped, GpuCompletion::Immediate);
    let mut streamer = ctx.streamer(1600);
    streamer.bind(&ctx.shader).unwrap();

    let data = vertex_bytes(40, 1);
    for _ in 0..5 {
        let batch = PrimitiveBatch::new(&data, 40, 40);
        streamer.render(PrimitiveTopology::PointList, &batch).unwrap();
    }

    let stats = streamer.stats();
    assert_eq!(stats.capacity_bytes, 1600);
    assert_eq!(stats.growth_count, 0);
    assert_eq!(stats.buffer_wait_count, 0);
    assert_eq!(stats.write_cursor_bytes, 640);
    assert_eq!(stats.draw_cursor_vertices, 40);
}

/// Three 640 byte batches into a 1600 byte ring: the third wraps onto the
/// still pending first range, stalls once and grows the ring by 7/4.
#[test]
fn test_stall_grows_persistent_ring() {
    let ctx = TestContext::new(StrategyKind::PersistentMapped, GpuCompletion::Manual);
    let mut streamer = ctx.streamer(1600);
    streamer.bind(&ctx.shader).unwrap();

    for seed in 0..3 {
        let data = vertex_bytes(640 / UV_STRIDE, seed);
        let batch = PrimitiveBatch::new(&data, 40, 40);
        streamer.render(PrimitiveTopology::PointList, &batch).unwrap();
    }

    let stats = streamer.stats();
    assert!(stats.buffer_wait_count >= 1);
    assert_eq!(stats.capacity_bytes, 2800);
    assert_eq!(stats.growth_count, 1);
    assert_eq!(stats.write_cursor_bytes, 640);
    assert_eq!(stats.draw_call_count, 3);

    ctx.dummy.complete_all();
    assert_eq!(ctx.dummy.stats().hazards, 0);
}

#[test]
fn test_growth_is_monotonic_and_stops_at_ceiling() {
    let ctx = TestContext::new(StrategyKind::PersistentMapped, GpuCompletion::Manual);
    let config = StreamerConfig::new()
        .with_initial_capacity(320)
        .with_max_growth_capacity(4000);
    let mut streamer = ctx
        .factory
        .create(position_uv_layout(), None, &config)
        .unwrap();
    streamer.bind(&ctx.shader).unwrap();

    let mut capacities = vec![streamer.stats().capacity_bytes];
    for seed in 0..80 {
        let data = vertex_bytes(10, seed);
        let batch = PrimitiveBatch::new(&data, 10, 10);
        streamer.render(PrimitiveTopology::PointList, &batch).unwrap();
        let capacity = streamer.stats().capacity_bytes;
        if capacities.last() != Some(&capacity) {
            capacities.push(capacity);
        }
    }

    assert_eq!(capacities, vec![320, 560, 980, 1715, 3001, 5251]);
    let stats = streamer.stats();
    assert_eq!(stats.growth_count, 5);
    assert!(stats.buffer_wait_count > 5);

    ctx.dummy.complete_all();
    assert_eq!(ctx.dummy.stats().hazards, 0);
}

#[test]
fn test_fence_wait_failure_propagates() {
    let ctx = TestContext::new(StrategyKind::PersistentMapped, GpuCompletion::Manual);
    let mut streamer = ctx.streamer(320);
    streamer.bind(&ctx.shader).unwrap();
    ctx.dummy.inject_failure(DummyFailure::FenceWait);

    let data = vertex_bytes(10, 0);
    let batch = PrimitiveBatch::new(&data, 10, 10);
    streamer.render(PrimitiveTopology::PointList, &batch).unwrap();
    streamer.render(PrimitiveTopology::PointList, &batch).unwrap();
    assert!(matches!(
        streamer.render(PrimitiveTopology::PointList, &batch),
        Err(GraphicsError::FenceWaitFailed(_))
    ));
}

#[rstest]
#[case::persistent(StrategyKind::PersistentMapped, 0)]
#[case::discard(StrategyKind::DiscardRespecify, 5)]
#[case::legacy(StrategyKind::Legacy, 5)]
fn test_discard_count_per_render(#[case] kind: StrategyKind, #[case] expected: u64) {
    let ctx = TestContext::new(kind, GpuCompletion::Immediate);
    let mut streamer = ctx.streamer(320);
    streamer.bind(&ctx.shader).unwrap();

    for seed in 0..5 {
        let data = vertex_bytes(8, seed);
        let batch = PrimitiveBatch::new(&data, 4, 8);
        streamer.render(PrimitiveTopology::LineList, &batch).unwrap();
    }

    let stats = streamer.stats();
    assert_eq!(stats.discarded_buffer_count, expected);
    assert_eq!(stats.draw_call_count, 5);
}

// ============================================================================
// Lifecycle Tests
// ============================================================================

#[rstest]
#[case::persistent(StrategyKind::PersistentMapped)]
#[case::discard(StrategyKind::DiscardRespecify)]
#[case::legacy(StrategyKind::Legacy)]
fn test_bind_unbind_contract(#[case] kind: StrategyKind) {
    let ctx = TestContext::new(kind, GpuCompletion::Immediate);
    let mut streamer = ctx.streamer(320);
    let other = ShaderHandle::new(ctx.dummy.create_program(&["in_position"]));
    let data = vertex_bytes(4, 0);
    let batch = PrimitiveBatch::new(&data, 2, 4);

    assert_eq!(
        streamer.render(PrimitiveTopology::LineList, &batch),
        Err(GraphicsError::NotBound)
    );

    streamer.bind(&ctx.shader).unwrap();
    streamer.bind(&ctx.shader).unwrap();
    assert_eq!(streamer.bind(&other), Err(GraphicsError::AlreadyBound));
    assert_eq!(streamer.bound_shader(), Some(&ctx.shader));
    streamer.render(PrimitiveTopology::LineList, &batch).unwrap();

    streamer.unbind();
    streamer.unbind();
    assert_eq!(streamer.bound_shader(), None);
    assert_eq!(
        streamer.render(PrimitiveTopology::LineList, &batch),
        Err(GraphicsError::NotBound)
    );

    streamer.bind(&other).unwrap();
    streamer.render(PrimitiveTopology::LineList, &batch).unwrap();
    assert_eq!(streamer.stats().draw_call_count, 2);
}

#[rstest]
#[case::persistent(StrategyKind::PersistentMapped)]
#[case::discard(StrategyKind::DiscardRespecify)]
#[case::legacy(StrategyKind::Legacy)]
fn test_dispose_releases_gpu_objects(#[case] kind: StrategyKind) {
    let ctx = TestContext::new(kind, GpuCompletion::Manual);
    let mut streamer = ctx.streamer(320);
    streamer.bind(&ctx.shader).unwrap();
    let data = vertex_bytes(10, 0);
    let batch = PrimitiveBatch::new(&data, 10, 10);
    streamer.render(PrimitiveTopology::PointList, &batch).unwrap();

    streamer.dispose().unwrap();
    streamer.dispose().unwrap();
    assert!(streamer.is_disposed());

    let gpu = ctx.dummy.stats();
    assert_eq!(gpu.live_buffers, 0);
    assert_eq!(gpu.live_vertex_arrays, 0);
    assert_eq!(gpu.live_fences, 0);
    assert_eq!(gpu.mapped_buffers, 0);
    assert_eq!(
        streamer.render(PrimitiveTopology::PointList, &batch),
        Err(GraphicsError::Disposed)
    );
}

#[rstest]
#[case::persistent(StrategyKind::PersistentMapped)]
#[case::discard(StrategyKind::DiscardRespecify)]
#[case::legacy(StrategyKind::Legacy)]
fn test_drop_releases_gpu_objects(#[case] kind: StrategyKind) {
    let ctx = TestContext::new(kind, GpuCompletion::Manual);
    {
        let mut streamer = ctx.streamer(320);
        streamer.bind(&ctx.shader).unwrap();
        let data = vertex_bytes(10, 0);
        let batch = PrimitiveBatch::new(&data, 10, 10);
        streamer.render(PrimitiveTopology::PointList, &batch).unwrap();
    }

    let gpu = ctx.dummy.stats();
    assert_eq!(gpu.live_buffers, 0);
    assert_eq!(gpu.live_vertex_arrays, 0);
    assert_eq!(gpu.live_fences, 0);
}

#[rstest]
#[case::persistent_map(StrategyKind::PersistentMapped, DummyFailure::MapBuffer)]
#[case::persistent_vertex_array(StrategyKind::PersistentMapped, DummyFailure::CreateVertexArray)]
#[case::discard_vertex_array(StrategyKind::DiscardRespecify, DummyFailure::CreateVertexArray)]
#[case::discard_buffer(StrategyKind::DiscardRespecify, DummyFailure::CreateBuffer)]
#[case::legacy_buffer(StrategyKind::Legacy, DummyFailure::CreateBuffer)]
fn test_construction_failure_leaks_nothing(
    #[case] kind: StrategyKind,
    #[case] failure: DummyFailure,
) {
    let ctx = TestContext::new(kind, GpuCompletion::Immediate);
    ctx.dummy.inject_failure(failure);

    let result = ctx
        .factory
        .create(position_uv_layout(), None, &StreamerConfig::new());
    assert!(result.is_err());

    let gpu = ctx.dummy.stats();
    assert_eq!(gpu.live_buffers, 0);
    assert_eq!(gpu.live_vertex_arrays, 0);
    assert_eq!(gpu.mapped_buffers, 0);
}

#[rstest]
#[case::persistent(StrategyKind::PersistentMapped)]
#[case::discard(StrategyKind::DiscardRespecify)]
#[case::legacy(StrategyKind::Legacy)]
fn test_invalid_batches_rejected(#[case] kind: StrategyKind) {
    let ctx = TestContext::new(kind, GpuCompletion::Immediate);
    let mut streamer = ctx.streamer(320);
    streamer.bind(&ctx.shader).unwrap();

    // Not a whole number of vertices
    let ragged = vec![0u8; UV_STRIDE + 3];
    assert!(matches!(
        streamer.render(PrimitiveTopology::PointList, &PrimitiveBatch::new(&ragged, 1, 1)),
        Err(GraphicsError::InvalidParameter(_))
    ));

    // More vertices drawn than supplied
    let data = vertex_bytes(2, 0);
    assert!(matches!(
        streamer.render(PrimitiveTopology::LineList, &PrimitiveBatch::new(&data, 2, 4)),
        Err(GraphicsError::InvalidParameter(_))
    ));
    assert_eq!(streamer.stats().draw_call_count, 0);
}

// ============================================================================
// Batcher Tests
// ============================================================================

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct SpriteVertex {
    position: [f32; 2],
    uv: [f32; 2],
    color: [u8; 4],
}

fn sprite(x: f32, y: f32) -> [SpriteVertex; 4] {
    let corner = |dx: f32, dy: f32| SpriteVertex {
        position: [x + dx, y + dy],
        uv: [dx, dy],
        color: [255, 128, 0, 255],
    };
    [
        corner(0.0, 0.0),
        corner(1.0, 0.0),
        corner(1.0, 1.0),
        corner(0.0, 1.0),
    ]
}

#[rstest]
#[case::persistent(StrategyKind::PersistentMapped)]
#[case::discard(StrategyKind::DiscardRespecify)]
#[case::legacy(StrategyKind::Legacy)]
fn test_quad_batcher_frames(#[case] kind: StrategyKind) {
    let ctx = TestContext::new(kind, GpuCompletion::Manual);
    let shader = ShaderHandle::new(
        ctx.dummy
            .create_program(&["in_position", "in_texcoord0", "in_color"]),
    );
    let mut batcher = PrimitiveBatcher::<SpriteVertex>::new(
        &ctx.factory,
        VertexLayout::sprite(),
        BatchKind::Quads,
        16,
        &StreamerConfig::new().with_label("sprites"),
    )
    .unwrap();

    for frame in 0..4 {
        batcher.begin(&shader).unwrap();
        for i in 0..100 {
            batcher.push(&sprite(i as f32, frame as f32)).unwrap();
        }
        batcher.end().unwrap();
        ctx.dummy.advance(2);
    }
    ctx.dummy.complete_all();

    let stats = batcher.stats();
    assert_eq!(stats.rendered_primitive_count, 400);
    // 100 quads in batches of 16: six full and one partial per frame
    assert_eq!(stats.flushed_batch_count, 28);
    assert_eq!(stats.largest_batch, 16);
    assert_eq!(batcher.streamer_stats().draw_call_count, 28);
    assert_eq!(ctx.dummy.stats().hazards, 0);
    assert_eq!(ctx.dummy.stats().invalid_draws, 0);
}

/// A full batch of quads fits the ring even when it exceeds the configured
/// initial capacity, since indexed rings never grow.
#[rstest]
#[case::persistent(StrategyKind::PersistentMapped)]
#[case::discard(StrategyKind::DiscardRespecify)]
#[case::legacy(StrategyKind::Legacy)]
fn test_full_quad_batch_beyond_initial_capacity(#[case] kind: StrategyKind) {
    let ctx = TestContext::new(kind, GpuCompletion::Immediate);
    let shader = ShaderHandle::new(
        ctx.dummy
            .create_program(&["in_position", "in_texcoord0", "in_color"]),
    );
    let mut batcher = PrimitiveBatcher::<SpriteVertex>::new(
        &ctx.factory,
        VertexLayout::sprite(),
        BatchKind::Quads,
        4096,
        &StreamerConfig::new(),
    )
    .unwrap();

    batcher.begin(&shader).unwrap();
    for i in 0..4096 {
        batcher.push(&sprite(i as f32, 0.0)).unwrap();
    }
    batcher.end().unwrap();

    let stats = batcher.stats();
    assert_eq!(stats.flushed_batch_count, 1);
    assert_eq!(stats.largest_batch, 4096);
    // 16384 vertices of 20 bytes
    assert!(batcher.streamer_stats().capacity_bytes >= 327_680);
    assert_eq!(ctx.dummy.stats().invalid_draws, 0);
}
