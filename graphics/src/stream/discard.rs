//! Discard-and-respecify strategy.
//!
//! Every draw orphans the vertex buffer's store and uploads the batch into a
//! fresh one. The driver keeps the orphaned store alive for draws still
//! reading it, so the CPU never waits on the GPU and no fences are needed.

use std::rc::Rc;
use std::sync::Arc;

use crate::backend::GpuBackend;
use crate::error::GraphicsError;
use crate::mesh::{IndexData, VertexLayout};
use crate::resources::Buffer;
use crate::shader::ShaderHandle;
use crate::types::{BufferData, BufferDescriptor, BufferUsage, PrimitiveTopology};

use super::bind::{BindState, StaticIndices, submit_draw};
use super::config::StreamerConfig;
use super::{PrimitiveBatch, StreamerStats};

/// Streamer that orphans and re-uploads its vertex buffer every draw.
pub struct DiscardStreamer {
    backend: Rc<dyn GpuBackend>,
    label: Option<String>,
    buffer: Option<Buffer>,
    indices: Option<StaticIndices>,
    bind: BindState,
    capacity: u64,
    stats: StreamerStats,
    disposed: bool,
}

impl DiscardStreamer {
    /// Create the streamer and its vertex buffer.
    pub fn new(
        backend: Rc<dyn GpuBackend>,
        layout: Arc<VertexLayout>,
        indices: Option<IndexData>,
        config: &StreamerConfig,
    ) -> Result<Self, GraphicsError> {
        let capacity = config.initial_capacity_for(layout.vertex_stride());

        let indices = indices
            .map(|data| StaticIndices::upload(&backend, data, config))
            .transpose()?;
        let descriptor = BufferDescriptor::new(capacity, BufferUsage::VERTEX | BufferUsage::STREAM)
            .with_label(config.buffer_label("vertices"));
        let buffer = Buffer::new(&backend, descriptor)?;
        let bind = BindState::new(&backend, layout, true)?;

        log::debug!(
            "Discard streamer {:?}: {} byte store",
            config.label,
            capacity
        );

        Ok(Self {
            backend,
            label: config.label.clone(),
            buffer: Some(buffer),
            indices,
            bind,
            capacity,
            stats: StreamerStats {
                capacity_bytes: capacity,
                ..Default::default()
            },
            disposed: false,
        })
    }

    /// Bind the streamer to `shader`.
    pub fn bind(&mut self, shader: &ShaderHandle) -> Result<(), GraphicsError> {
        let buffer = self.buffer.as_ref().ok_or(GraphicsError::Disposed)?;
        self.bind.bind(
            &*self.backend,
            shader,
            buffer.raw(),
            self.indices.as_ref().map(StaticIndices::raw),
        )
    }

    /// Orphan the store, upload `batch` and draw it.
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
            // Still one render: counted, but nothing to upload or draw
            self.stats.discarded_buffer_count += 1;
            return Ok(());
        }

        let size = batch.byte_len();
        if size > self.capacity {
            log::debug!(
                "Discard streamer {:?}: store grows to fit {} -> {} bytes",
                self.label,
                self.capacity,
                size
            );
            self.capacity = size;
            self.stats.growth_count += 1;
        }

        let buffer = self.buffer.as_mut().ok_or(GraphicsError::Disposed)?;
        buffer.respecify(BufferData::Uninit(self.capacity), BufferUsage::STREAM)?;
        buffer.write(0, batch.data())?;
        self.stats.discarded_buffer_count += 1;

        submit_draw(
            &*self.backend,
            topology,
            batch.draw_count(),
            0,
            self.indices.as_ref(),
        );
        self.stats.draw_call_count += 1;
        Ok(())
    }

    /// Unbind the streamer. Does nothing if not bound.
    pub fn unbind(&mut self) {
        self.bind.unbind(&*self.backend);
    }

    /// Release every GPU object of the streamer.
    pub fn dispose(&mut self) -> Result<(), GraphicsError> {
        if self.disposed {
            return Ok(());
        }
        self.disposed = true;
        self.bind.release(&*self.backend);
        self.buffer = None;
        self.indices = None;
        log::debug!("Disposed discard streamer {:?}", self.label);
        Ok(())
    }

    /// Get the current counters.
    pub fn stats(&self) -> StreamerStats {
        StreamerStats {
            capacity_bytes: self.capacity,
            ..self.stats
        }
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
}

impl Drop for DiscardStreamer {
    fn drop(&mut self) {
        if let Err(e) = self.dispose() {
            log::warn!("Failed to dispose discard streamer: {e}");
        }
    }
}

impl std::fmt::Debug for DiscardStreamer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscardStreamer")
            .field("label", &self.label)
            .field("capacity", &self.capacity)
            .field("bound", &self.bind.bound_shader())
            .field("disposed", &self.disposed)
            .finish()
    }
}
