//! Primitive streaming.
//!
//! A primitive streamer delivers CPU-generated vertex data to the GPU many
//! times per frame. Three strategies are available, tried in this order:
//!
//! | Strategy | Requires | Protocol |
//! |---|---|---|
//! | [`PersistentMappedStreamer`] | 4.4 or `GL_ARB_buffer_storage` | Ring buffer mapped once; fences guard wrapped ranges |
//! | [`DiscardStreamer`] | 3.0 or `GL_ARB_vertex_array_object` | Orphan the store, then upload, every draw |
//! | [`LegacyStreamer`] | 1.5 or `GL_ARB_vertex_buffer_object` | Synchronous full upload every draw |
//!
//! The [`StreamerFactory`] probes the context once and creates streamers of
//! the best supported strategy.
//!
//! # Example
//!
//! ```ignore
//! let factory = StreamerFactory::new(backend)?;
//! let mut streamer = factory.create(VertexLayout::sprite(), None, &StreamerConfig::new())?;
//!
//! streamer.bind(&shader)?;
//! streamer.render(
//!     PrimitiveTopology::TriangleList,
//!     &PrimitiveBatch::from_vertices(&vertices, 2, 6),
//! )?;
//! streamer.unbind();
//! ```

mod bind;
mod config;
mod discard;
mod legacy;
mod persistent;
mod probe;

use std::sync::Arc;

use bytemuck::Pod;

use crate::capabilities::CapabilitySet;
use crate::error::GraphicsError;
use crate::mesh::{IndexData, VertexLayout};
use crate::shader::ShaderHandle;
use crate::types::PrimitiveTopology;

pub use config::{DEFAULT_INITIAL_CAPACITY, DEFAULT_MAX_GROWTH_CAPACITY, StreamerConfig};
pub use discard::DiscardStreamer;
pub use legacy::LegacyStreamer;
pub use persistent::PersistentMappedStreamer;
pub use probe::{CapabilityProbe, StreamerFactory};

// ============================================================================
// Strategy selection
// ============================================================================

/// The streaming strategies, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StrategyKind {
    /// Persistently mapped ring buffer with fence-guarded ranges.
    PersistentMapped,
    /// Orphan-and-upload every draw.
    DiscardRespecify,
    /// Synchronous full upload every draw, no vertex array object.
    Legacy,
}

/// Capabilities a strategy needs: a minimum version or an extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StrategyRequirement {
    /// Minimum major version.
    pub major: u32,
    /// Minimum minor version.
    pub minor: u32,
    /// Extension that provides the feature on older versions.
    pub extension: &'static str,
}

impl StrategyKind {
    /// All strategies, highest priority first.
    pub const ALL: [StrategyKind; 3] = [
        StrategyKind::PersistentMapped,
        StrategyKind::DiscardRespecify,
        StrategyKind::Legacy,
    ];

    /// What the context must provide for this strategy.
    pub fn requirement(&self) -> StrategyRequirement {
        match self {
            Self::PersistentMapped => StrategyRequirement {
                major: 4,
                minor: 4,
                extension: "GL_ARB_buffer_storage",
            },
            Self::DiscardRespecify => StrategyRequirement {
                major: 3,
                minor: 0,
                extension: "GL_ARB_vertex_array_object",
            },
            Self::Legacy => StrategyRequirement {
                major: 1,
                minor: 5,
                extension: "GL_ARB_vertex_buffer_object",
            },
        }
    }

    /// Check whether `capabilities` satisfy this strategy.
    pub fn is_supported(&self, capabilities: &CapabilitySet) -> bool {
        let req = self.requirement();
        capabilities.has_capabilities(req.major, req.minor, Some(req.extension))
    }

    /// Get a human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::PersistentMapped => "persistent-mapped",
            Self::DiscardRespecify => "discard-respecify",
            Self::Legacy => "legacy",
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Batches and statistics
// ============================================================================

/// Vertex data for one `render` call.
///
/// `draw_count` is the number of vertices drawn for array draws, or the
/// number of indices for streamers created with index data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrimitiveBatch<'a> {
    data: &'a [u8],
    primitive_count: u32,
    draw_count: u32,
}

impl<'a> PrimitiveBatch<'a> {
    /// Create a batch from raw interleaved vertex bytes.
    pub fn new(data: &'a [u8], primitive_count: u32, draw_count: u32) -> Self {
        Self {
            data,
            primitive_count,
            draw_count,
        }
    }

    /// Create a batch from typed vertices.
    pub fn from_vertices<V: Pod>(vertices: &'a [V], primitive_count: u32, draw_count: u32) -> Self {
        Self::new(bytemuck::cast_slice(vertices), primitive_count, draw_count)
    }

    /// Raw vertex bytes.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Size of the vertex data in bytes.
    pub fn byte_len(&self) -> u64 {
        self.data.len() as u64
    }

    /// Number of primitives in the batch.
    pub fn primitive_count(&self) -> u32 {
        self.primitive_count
    }

    /// Number of vertices or indices to draw.
    pub fn draw_count(&self) -> u32 {
        self.draw_count
    }

    /// Check if the batch draws nothing.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty() || self.draw_count == 0
    }

    /// Check the batch against a layout and optional index data.
    ///
    /// Returns the number of vertices in the batch.
    pub(crate) fn validate(
        &self,
        layout: &VertexLayout,
        indices: Option<&IndexData>,
    ) -> Result<u32, GraphicsError> {
        let stride = layout.vertex_stride() as usize;
        if self.data.len() % stride != 0 {
            return Err(GraphicsError::InvalidParameter(format!(
                "batch of {} bytes is not a multiple of the {} byte stride",
                self.data.len(),
                stride
            )));
        }
        let vertex_count = u32::try_from(self.data.len() / stride).map_err(|_| {
            GraphicsError::InvalidParameter(format!("batch of {} bytes is too large", self.data.len()))
        })?;

        match indices {
            Some(indices) => {
                if self.draw_count > indices.count() {
                    return Err(GraphicsError::InvalidParameter(format!(
                        "draw of {} indices exceeds the {} supplied",
                        self.draw_count,
                        indices.count()
                    )));
                }
                if vertex_count > indices.max_vertex_count() {
                    return Err(GraphicsError::InvalidParameter(format!(
                        "batch of {} vertices exceeds the {} the index data addresses",
                        vertex_count,
                        indices.max_vertex_count()
                    )));
                }
            }
            None => {
                if self.draw_count > vertex_count {
                    return Err(GraphicsError::InvalidParameter(format!(
                        "draw of {} vertices exceeds the {} in the batch",
                        self.draw_count, vertex_count
                    )));
                }
            }
        }
        Ok(vertex_count)
    }
}

/// Per-streamer counters and cursors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StreamerStats {
    /// Current vertex buffer capacity in bytes.
    pub capacity_bytes: u64,
    /// Byte offset the next batch is written at.
    pub write_cursor_bytes: u64,
    /// Vertex index the next batch is drawn from.
    pub draw_cursor_vertices: u32,
    /// Buffer stores discarded and respecified.
    pub discarded_buffer_count: u64,
    /// Blocking waits on fences that were not signaled yet.
    pub buffer_wait_count: u64,
    /// Draw calls issued.
    pub draw_call_count: u64,
    /// Times the vertex buffer was enlarged.
    pub growth_count: u64,
}

// ============================================================================
// Streamer
// ============================================================================

/// A streamer of one of the available strategies.
///
/// Usage follows `bind`, any number of `render`, `unbind`, and finally
/// `dispose` (or drop). Streamers live on the thread owning the graphics
/// context.
#[derive(Debug)]
pub enum PrimitiveStreamer {
    /// Persistent-mapped ring buffer.
    PersistentMapped(PersistentMappedStreamer),
    /// Discard-and-respecify.
    DiscardRespecify(DiscardStreamer),
    /// Legacy buffer objects.
    Legacy(LegacyStreamer),
}

impl PrimitiveStreamer {
    /// Get the strategy of this streamer.
    pub fn kind(&self) -> StrategyKind {
        match self {
            Self::PersistentMapped(_) => StrategyKind::PersistentMapped,
            Self::DiscardRespecify(_) => StrategyKind::DiscardRespecify,
            Self::Legacy(_) => StrategyKind::Legacy,
        }
    }

    /// Bind the streamer to `shader`.
    ///
    /// Binding the shader that is already bound does nothing. Binding while
    /// a different shader is bound fails with [`GraphicsError::AlreadyBound`].
    pub fn bind(&mut self, shader: &ShaderHandle) -> Result<(), GraphicsError> {
        match self {
            Self::PersistentMapped(s) => s.bind(shader),
            Self::DiscardRespecify(s) => s.bind(shader),
            Self::Legacy(s) => s.bind(shader),
        }
    }

    /// Stream `batch` and draw it.
    pub fn render(
        &mut self,
        topology: PrimitiveTopology,
        batch: &PrimitiveBatch<'_>,
    ) -> Result<(), GraphicsError> {
        match self {
            Self::PersistentMapped(s) => s.render(topology, batch),
            Self::DiscardRespecify(s) => s.render(topology, batch),
            Self::Legacy(s) => s.render(topology, batch),
        }
    }

    /// Unbind the streamer. Does nothing if not bound.
    pub fn unbind(&mut self) {
        match self {
            Self::PersistentMapped(s) => s.unbind(),
            Self::DiscardRespecify(s) => s.unbind(),
            Self::Legacy(s) => s.unbind(),
        }
    }

    /// Release every GPU object of the streamer.
    ///
    /// Pending GPU work is waited out first. Later calls do nothing.
    pub fn dispose(&mut self) -> Result<(), GraphicsError> {
        match self {
            Self::PersistentMapped(s) => s.dispose(),
            Self::DiscardRespecify(s) => s.dispose(),
            Self::Legacy(s) => s.dispose(),
        }
    }

    /// Get the current counters.
    pub fn stats(&self) -> StreamerStats {
        match self {
            Self::PersistentMapped(s) => s.stats(),
            Self::DiscardRespecify(s) => s.stats(),
            Self::Legacy(s) => s.stats(),
        }
    }

    /// Get the shader currently bound, if any.
    pub fn bound_shader(&self) -> Option<&ShaderHandle> {
        match self {
            Self::PersistentMapped(s) => s.bound_shader(),
            Self::DiscardRespecify(s) => s.bound_shader(),
            Self::Legacy(s) => s.bound_shader(),
        }
    }

    /// Get the vertex layout.
    pub fn layout(&self) -> &Arc<VertexLayout> {
        match self {
            Self::PersistentMapped(s) => s.layout(),
            Self::DiscardRespecify(s) => s.layout(),
            Self::Legacy(s) => s.layout(),
        }
    }

    /// Check if the streamer has been disposed.
    pub fn is_disposed(&self) -> bool {
        match self {
            Self::PersistentMapped(s) => s.is_disposed(),
            Self::DiscardRespecify(s) => s.is_disposed(),
            Self::Legacy(s) => s.is_disposed(),
        }
    }
}

// Streamers own raw mappings and Rc backends
static_assertions::assert_not_impl_any!(PrimitiveStreamer: Send, Sync);
