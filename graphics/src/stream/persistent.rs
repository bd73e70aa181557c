//! Persistent-mapped ring buffer strategy.
//!
//! The vertex buffer gets immutable storage mapped once for coherent writes.
//! Batches are copied straight into the mapping at the ring's write cursor
//! and drawn at its draw cursor. A fence after every draw guards the bytes
//! the draw reads; the fence tracker waits for overlapping fences before the
//! ring wraps onto them. A stall means the ring is too small for the GPU's
//! latency, so the buffer grows by 7/4 (up to a ceiling) right after one.

use std::rc::Rc;
use std::sync::Arc;

use crate::backend::GpuBackend;
use crate::error::GraphicsError;
use crate::mesh::{IndexData, VertexLayout};
use crate::resources::{Buffer, MappedBuffer, RingCursor};
use crate::shader::ShaderHandle;
use crate::sync::FenceTracker;
use crate::types::{BufferDescriptor, BufferUsage, PrimitiveTopology};

use super::bind::{BindState, StaticIndices, submit_draw};
use super::config::StreamerConfig;
use super::{PrimitiveBatch, StreamerStats};

/// Capacity after one growth step: `floor(capacity * 1.75)`.
pub(crate) fn grown_capacity(capacity: u64) -> u64 {
    capacity.saturating_mul(7) / 4
}

/// Mapped vertex buffer. Unmapped before the buffer is released.
struct MappedStorage {
    buffer: Buffer,
    mapping: Option<MappedBuffer>,
}

impl MappedStorage {
    fn new(
        backend: &Rc<dyn GpuBackend>,
        capacity: u64,
        config: &StreamerConfig,
    ) -> Result<Self, GraphicsError> {
        let descriptor =
            BufferDescriptor::new(capacity, BufferUsage::VERTEX | BufferUsage::PERSISTENT)
                .with_label(config.buffer_label("ring"));
        let buffer = Buffer::new(backend, descriptor)?;
        // On failure the buffer is released by its drop
        let mapping = backend.map_persistent(buffer.raw())?;
        Ok(Self {
            buffer,
            mapping: Some(mapping),
        })
    }

    fn mapping(&mut self) -> Result<&mut MappedBuffer, GraphicsError> {
        self.mapping.as_mut().ok_or(GraphicsError::Disposed)
    }

    fn unmap(&mut self) {
        if self.mapping.take().is_some() {
            self.buffer.backend().unmap(self.buffer.raw());
        }
    }
}

impl Drop for MappedStorage {
    fn drop(&mut self) {
        self.unmap();
    }
}

/// Streamer writing into a persistently mapped ring buffer.
pub struct PersistentMappedStreamer {
    backend: Rc<dyn GpuBackend>,
    config: StreamerConfig,
    storage: Option<MappedStorage>,
    indices: Option<StaticIndices>,
    bind: BindState,
    fences: FenceTracker,
    ring: RingCursor,
    stats: StreamerStats,
    disposed: bool,
}

impl PersistentMappedStreamer {
    /// Create the streamer, allocating and mapping its ring buffer.
    pub fn new(
        backend: Rc<dyn GpuBackend>,
        layout: Arc<VertexLayout>,
        indices: Option<IndexData>,
        config: &StreamerConfig,
    ) -> Result<Self, GraphicsError> {
        let stride = layout.vertex_stride();
        // An indexed ring never grows, so it must hold every vertex the
        // indices address
        let capacity = match &indices {
            Some(data) => config
                .initial_capacity_for(stride)
                .max(u64::from(data.max_vertex_count()) * u64::from(stride)),
            None => config.initial_capacity_for(stride),
        };

        let indices = indices
            .map(|data| StaticIndices::upload(&backend, data, config))
            .transpose()?;
        let storage = MappedStorage::new(&backend, capacity, config)?;
        let bind = BindState::new(&backend, layout, true)?;

        log::debug!(
            "Persistent-mapped streamer {:?}: {} byte ring, stride {}",
            config.label,
            capacity,
            stride
        );

        Ok(Self {
            backend,
            config: config.clone(),
            storage: Some(storage),
            indices,
            bind,
            fences: FenceTracker::new(),
            ring: RingCursor::new(capacity, stride),
            stats: StreamerStats {
                capacity_bytes: capacity,
                ..Default::default()
            },
            disposed: false,
        })
    }

    /// Bind the streamer to `shader`.
    pub fn bind(&mut self, shader: &ShaderHandle) -> Result<(), GraphicsError> {
        let storage = self.storage.as_ref().ok_or(GraphicsError::Disposed)?;
        self.bind.bind(
            &*self.backend,
            shader,
            storage.buffer.raw(),
            self.indices.as_ref().map(StaticIndices::raw),
        )
    }

    /// Write `batch` into the ring and draw it.
    pub fn render(
        &mut self,
        topology: PrimitiveTopology,
        batch: &PrimitiveBatch<'_>,
    ) -> Result<(), GraphicsError> {
        if self.disposed {
            return Err(GraphicsError::Disposed);
        }
        self.bind.require_bound()?;
        batch.validate(self.bind.layout(), self.indices.as_ref().map(StaticIndices::data))?;
        if batch.is_empty() {
            return Ok(());
        }

        let size = batch.byte_len();
        if size > self.ring.capacity() {
            self.grow_to_fit(size)?;
        }

        let mut allocation = self.ring.allocate(size)?;
        let stalls = self
            .fences
            .wait_for_range(&*self.backend, allocation.offset, size)?;
        if stalls > 0 {
            self.stats.buffer_wait_count += u64::from(stalls);
            if self.can_grow() {
                self.grow(grown_capacity(self.ring.capacity()))?;
                allocation = self.ring.allocate(size)?;
            }
        }

        let storage = self.storage.as_mut().ok_or(GraphicsError::Disposed)?;
        storage
            .mapping()?
            .write(allocation.offset as usize, batch.data())?;

        submit_draw(
            &*self.backend,
            topology,
            batch.draw_count(),
            allocation.first_vertex,
            self.indices.as_ref(),
        );
        let fence = self.backend.insert_fence()?;
        self.fences.record(allocation.offset, size, fence);
        self.ring.advance(&allocation);
        self.stats.draw_call_count += 1;
        Ok(())
    }

    /// Unbind the streamer. Does nothing if not bound.
    pub fn unbind(&mut self) {
        self.bind.unbind(&*self.backend);
    }

    /// Unmap the ring, wait out pending fences, then release every GPU object.
    pub fn dispose(&mut self) -> Result<(), GraphicsError> {
        if self.disposed {
            return Ok(());
        }
        self.disposed = true;

        if let Some(storage) = &mut self.storage {
            storage.unmap();
        }
        let result = self.fences.wait_all(&*self.backend);
        self.fences.release(&*self.backend);
        self.bind.release(&*self.backend);
        self.storage = None;
        self.indices = None;

        log::debug!("Disposed persistent-mapped streamer {:?}", self.config.label);
        result.map(|_| ())
    }

    /// Get the current counters.
    pub fn stats(&self) -> StreamerStats {
        StreamerStats {
            capacity_bytes: self.ring.capacity(),
            write_cursor_bytes: self.ring.write_offset(),
            draw_cursor_vertices: self.ring.draw_vertex(),
            ..self.stats
        }
    }

    /// Number of fences still guarding ranges of the ring.
    pub fn pending_fence_count(&self) -> usize {
        self.fences.pending_count()
    }

    /// Get the shader currently bound, if any.
    pub fn bound_shader(&self) -> Option<&ShaderHandle> {
        self.bind.bound_shader()
    }

    /// Get the vertex layout.
    pub fn layout(&self) -> &Arc<VertexLayout> {
        self.bind.layout()
    }

    /// Check if the streamer has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Growth is off with a fixed index pattern and at the ceiling.
    fn can_grow(&self) -> bool {
        self.indices.is_none() && self.ring.capacity() < self.config.max_growth_capacity
    }

    fn grow_to_fit(&mut self, size: u64) -> Result<(), GraphicsError> {
        let mut capacity = self.ring.capacity();
        while capacity < size {
            if self.indices.is_some() || capacity >= self.config.max_growth_capacity {
                return Err(GraphicsError::InvalidParameter(format!(
                    "batch of {size} bytes does not fit the {capacity} byte ring and growth is not permitted"
                )));
            }
            let next = grown_capacity(capacity);
            // 7/4 of a one byte buffer rounds back down
            capacity = next.max(capacity + 1);
        }
        self.grow(capacity)
    }

    /// Replace the ring with a new buffer of `capacity` bytes.
    ///
    /// Every pending fence is waited out first; those waits are not stalls of
    /// the streaming protocol and are not counted. If the replacement cannot
    /// be allocated the streamer ends up disposed.
    fn grow(&mut self, capacity: u64) -> Result<(), GraphicsError> {
        log::debug!(
            "Growing ring {:?}: {} -> {} bytes",
            self.config.label,
            self.ring.capacity(),
            capacity
        );
        self.fences.wait_all(&*self.backend)?;
        // Unmap and release before allocating the replacement
        self.storage = None;
        let storage = match MappedStorage::new(&self.backend, capacity, &self.config) {
            Ok(storage) => storage,
            Err(e) => {
                // Without a ring the streamer is unusable: release the rest
                log::warn!("Ring {:?} lost while growing: {e}", self.config.label);
                self.disposed = true;
                self.bind.release(&*self.backend);
                self.indices = None;
                return Err(e);
            }
        };
        self.bind.buffer_replaced(&*self.backend, storage.buffer.raw());
        self.storage = Some(storage);
        self.ring.reset(capacity);
        self.stats.growth_count += 1;
        Ok(())
    }
}

impl Drop for PersistentMappedStreamer {
    fn drop(&mut self) {
        if let Err(e) = self.dispose() {
            log::warn!("Failed to dispose persistent-mapped streamer: {e}");
        }
    }
}

impl std::fmt::Debug for PersistentMappedStreamer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistentMappedStreamer")
            .field("label", &self.config.label)
            .field("ring", &self.ring)
            .field("pending_fences", &self.fences.pending_count())
            .field("bound", &self.bind.bound_shader())
            .field("disposed", &self.disposed)
            .finish()
    }
}
