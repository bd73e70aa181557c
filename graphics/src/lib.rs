//! # Streamline Graphics
//!
//! Primitive streaming and GPU/CPU synchronization for dynamically generated
//! geometry (quads, lines, glyphs) rebuilt every frame.
//!
//! ## Overview
//!
//! This crate provides:
//! - [`GpuBackend`] - Trait over the graphics context, with a simulated
//!   [`DummyBackend`] and an OpenGL backend behind the `gl-backend` feature
//! - [`StreamerFactory`] - Probes the context once and creates streamers of
//!   the best supported strategy
//! - [`PrimitiveStreamer`] - Persistent-mapped ring, discard-and-respecify or
//!   legacy buffer streaming behind one `bind`/`render`/`unbind` contract
//! - [`FenceTracker`] - Per byte-range fences guarding the persistent ring
//! - [`PrimitiveBatcher`] - Quad and line batching on top of a streamer
//!
//! ## Example
//!
//! ```ignore
//! use std::rc::Rc;
//! use streamline_graphics::{
//!     DummyBackend, GpuBackend, PrimitiveBatch, PrimitiveTopology, ShaderHandle,
//!     StreamerConfig, StreamerFactory, VertexLayout,
//! };
//!
//! let dummy = Rc::new(DummyBackend::new());
//! let shader = ShaderHandle::new(dummy.create_program(&["in_position", "in_color"]));
//! let factory = StreamerFactory::new(dummy)?;
//! let mut streamer = factory.create(VertexLayout::position_color(), None, &StreamerConfig::new())?;
//!
//! streamer.bind(&shader)?;
//! streamer.render(PrimitiveTopology::LineList, &PrimitiveBatch::from_vertices(&lines, 1, 2))?;
//! streamer.unbind();
//! ```

pub mod backend;
pub mod batch;
pub mod capabilities;
pub mod error;
pub mod mesh;
pub mod resources;
pub mod shader;
pub mod stream;
pub mod sync;
pub mod types;

// Re-export main types for convenience
pub use backend::dummy::{DummyBackend, DummyFailure, DummyStats, GpuCompletion};
pub use backend::{FenceStatus, GpuBackend, GpuBuffer, GpuFence, GpuProgram, GpuVertexArray};
pub use batch::{BatchKind, BatchStats, PrimitiveBatcher};
pub use capabilities::{ApiVersion, CapabilitySet};
pub use error::GraphicsError;
pub use mesh::{IndexData, VertexAttribute, VertexAttributeFormat, VertexAttributeSemantic, VertexLayout};
pub use resources::{Buffer, MappedBuffer, RingAllocation, RingCursor, VertexArray};
pub use shader::ShaderHandle;
pub use stream::{
    CapabilityProbe, PrimitiveBatch, PrimitiveStreamer, StrategyKind, StreamerConfig,
    StreamerFactory, StreamerStats,
};
pub use sync::{FenceRange, FenceTracker};
pub use types::{BufferData, BufferDescriptor, BufferUsage, IndexFormat, PrimitiveTopology};

#[cfg(feature = "gl-backend")]
pub use backend::gl::GlBackend;

/// Graphics library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the graphics subsystem.
///
/// This should be called before using any graphics functionality.
pub fn init() {
    log::info!("Streamline Graphics v{} initialized", VERSION);
}
