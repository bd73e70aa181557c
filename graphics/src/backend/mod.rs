//! GPU backend abstraction layer.
//!
//! This module provides a trait-based abstraction over the graphics context,
//! so the streaming strategies can run against different implementations.
//!
//! # Available Backends
//!
//! - `dummy` (always compiled): simulated GPU for testing and benchmarking
//! - `gl-backend`: OpenGL backend using glow
//!
//! # Architecture
//!
//! Each backend implements the [`GpuBackend`] trait, which provides:
//! - Capability queries
//! - Buffer creation, (re)specification and persistent mapping
//! - Vertex input state (vertex arrays, attribute wiring)
//! - Draw submission
//! - Fence synchronization
//!
//! All calls are made from the thread that owns the graphics context. The
//! trait takes `&self` everywhere; backends keep their mutable state behind
//! interior mutability the same way a driver does.

#[cfg(feature = "gl-backend")]
pub mod gl;

pub mod dummy;

use crate::capabilities::CapabilitySet;
use crate::error::GraphicsError;
use crate::mesh::VertexAttribute;
use crate::resources::MappedBuffer;
use crate::types::{BufferData, BufferDescriptor, BufferUsage, IndexFormat, PrimitiveTopology};

/// Handle to a GPU buffer object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GpuBuffer {
    /// Dummy backend buffer
    Dummy {
        /// Backend-local object id.
        id: u64,
    },
    /// OpenGL buffer object
    #[cfg(feature = "gl-backend")]
    Gl(glow::NativeBuffer),
}

/// Handle to a vertex array object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GpuVertexArray {
    /// Dummy backend vertex array
    Dummy {
        /// Backend-local object id.
        id: u64,
    },
    /// OpenGL vertex array object
    #[cfg(feature = "gl-backend")]
    Gl(glow::NativeVertexArray),
}

/// Handle to a linked shader program.
///
/// Programs are compiled and linked outside this crate; the streaming layer
/// only queries attribute locations from them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GpuProgram {
    /// Dummy backend program
    Dummy {
        /// Backend-local object id.
        id: u64,
    },
    /// OpenGL program object
    #[cfg(feature = "gl-backend")]
    Gl(glow::NativeProgram),
}

/// Handle to a GPU fence (sync object).
///
/// A fence is inserted into the command stream after a draw and becomes
/// signaled once the GPU has finished every command submitted before it.
#[derive(Debug)]
pub enum GpuFence {
    /// Dummy backend fence
    Dummy {
        /// Backend-local object id.
        id: u64,
    },
    /// OpenGL sync object
    #[cfg(feature = "gl-backend")]
    Gl(glow::NativeFence),
}

/// Status of a fence returned by a non-blocking poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FenceStatus {
    /// The GPU has not reached the fence yet.
    Unsignaled,
    /// All commands before the fence have completed.
    Signaled,
}

impl FenceStatus {
    /// Check if the fence is signaled.
    pub fn is_signaled(&self) -> bool {
        matches!(self, Self::Signaled)
    }
}

/// Operations a graphics context must provide to the streaming layer.
pub trait GpuBackend: 'static {
    /// Get the backend name.
    fn name(&self) -> &'static str;

    /// Snapshot the API version and extensions of the context.
    fn capabilities(&self) -> CapabilitySet;

    // ========================================================================
    // Buffers
    // ========================================================================

    /// Create a buffer object.
    ///
    /// Persistent buffers get immutable storage of `descriptor.size` bytes.
    /// Other buffers start with a store of `descriptor.size` undefined bytes.
    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<GpuBuffer, GraphicsError>;

    /// Release a buffer object.
    fn destroy_buffer(&self, buffer: &GpuBuffer);

    /// Respecify the whole store of a (non-persistent) buffer.
    ///
    /// Draws already submitted keep reading the previous store.
    fn buffer_data(
        &self,
        buffer: &GpuBuffer,
        data: BufferData<'_>,
        usage: BufferUsage,
    ) -> Result<(), GraphicsError>;

    /// Overwrite part of the current store of a buffer.
    fn buffer_sub_data(
        &self,
        buffer: &GpuBuffer,
        offset: u64,
        data: &[u8],
    ) -> Result<(), GraphicsError>;

    /// Map the whole storage of a persistent buffer for coherent CPU writes.
    ///
    /// The mapping stays valid until [`unmap`](Self::unmap).
    fn map_persistent(&self, buffer: &GpuBuffer) -> Result<MappedBuffer, GraphicsError>;

    /// Unmap a buffer previously mapped with
    /// [`map_persistent`](Self::map_persistent).
    fn unmap(&self, buffer: &GpuBuffer);

    // ========================================================================
    // Vertex input
    // ========================================================================

    /// Create a vertex array object.
    fn create_vertex_array(&self) -> Result<GpuVertexArray, GraphicsError>;

    /// Release a vertex array object.
    fn destroy_vertex_array(&self, vertex_array: &GpuVertexArray);

    /// Bind a vertex array, or restore the default vertex input state.
    fn bind_vertex_array(&self, vertex_array: Option<&GpuVertexArray>);

    /// Bind the buffer attribute pointers will read from.
    fn bind_vertex_buffer(&self, buffer: Option<&GpuBuffer>);

    /// Bind the index buffer of the current vertex input state.
    fn bind_index_buffer(&self, buffer: Option<&GpuBuffer>);

    /// Look up the location of a named vertex input of a program.
    fn attribute_location(&self, program: &GpuProgram, name: &str) -> Option<u32>;

    /// Enable an attribute location reading `attribute` from the bound vertex
    /// buffer.
    fn enable_vertex_attribute(&self, location: u32, attribute: &VertexAttribute, stride: u32);

    /// Disable an attribute location.
    fn disable_vertex_attribute(&self, location: u32);

    // ========================================================================
    // Draws
    // ========================================================================

    /// Draw `vertex_count` vertices starting at `first_vertex`.
    fn draw_arrays(&self, topology: PrimitiveTopology, first_vertex: u32, vertex_count: u32);

    /// Draw `index_count` indices read from the bound index buffer at
    /// `byte_offset`, adding `base_vertex` to every index.
    fn draw_indexed(
        &self,
        topology: PrimitiveTopology,
        index_count: u32,
        format: IndexFormat,
        byte_offset: u64,
        base_vertex: u32,
    );

    // ========================================================================
    // Synchronization
    // ========================================================================

    /// Insert a fence after every command submitted so far.
    fn insert_fence(&self) -> Result<GpuFence, GraphicsError>;

    /// Query a fence without blocking.
    fn poll_fence(&self, fence: &GpuFence) -> Result<FenceStatus, GraphicsError>;

    /// Block until a fence is signaled. There is no timeout.
    fn wait_fence(&self, fence: &GpuFence) -> Result<(), GraphicsError>;

    /// Release a fence.
    fn delete_fence(&self, fence: GpuFence);
}
