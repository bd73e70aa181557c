//! Legacy buffer object strategy.
//!
//! Every draw replaces the vertex buffer's contents with a plain synchronous
//! upload. There is no vertex array object: attribute wiring is global state,
//! established on `bind` and torn down on `unbind`.

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

/// Streamer that re-uploads its vertex buffer synchronously every draw.
pub struct LegacyStreamer {
    backend: Rc<dyn GpuBackend>,
    label: Option<String>,
    buffer: Option<Buffer>,
    indices: Option<StaticIndices>,
    bind: BindState,
    stats: StreamerStats,
    disposed: bool,
}

impl LegacyStreamer {
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
        let descriptor =
            BufferDescriptor::new(capacity, BufferUsage::VERTEX | BufferUsage::DYNAMIC)
                .with_label(config.buffer_label("vertices"));
        let buffer = Buffer::new(&backend, descriptor)?;
        let bind = BindState::new(&backend, layout, false)?;

        log::debug!("Legacy streamer {:?}: {} byte store", config.label, capacity);

        Ok(Self {
            backend,
            label: config.label.clone(),
            buffer: Some(buffer),
            indices,
            bind,
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

    /// Upload `batch` as the buffer's new contents and draw it.
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
        if size > self.stats.capacity_bytes {
            self.stats.capacity_bytes = size;
            self.stats.growth_count += 1;
        }

        let buffer = self.buffer.as_mut().ok_or(GraphicsError::Disposed)?;
        buffer.respecify(BufferData::Bytes(batch.data()), BufferUsage::DYNAMIC)?;
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

    /// Unbind the streamer and tear down the attribute wiring.
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
        log::debug!("Disposed legacy streamer {:?}", self.label);
        Ok(())
    }

    /// Get the current counters.
    pub fn stats(&self) -> StreamerStats {
        self.stats
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

impl Drop for LegacyStreamer {
    fn drop(&mut self) {
        if let Err(e) = self.dispose() {
            log::warn!("Failed to dispose legacy streamer: {e}");
        }
    }
}

impl std::fmt::Debug for LegacyStreamer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LegacyStreamer")
            .field("label", &self.label)
            .field("bound", &self.bind.bound_shader())
            .field("disposed", &self.disposed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::dummy::DummyBackend;

    #[test]
    fn test_wiring_is_global_state() {
        let dummy = Rc::new(DummyBackend::new());
        let backend: Rc<dyn GpuBackend> = dummy.clone();
        let mut s = LegacyStreamer::new(
            backend,
            VertexLayout::sprite(),
            None,
            &StreamerConfig::new().with_initial_capacity(40),
        )
        .unwrap();
        let shader = ShaderHandle::new(dummy.create_program(&["in_position", "in_color"]));

        s.bind(&shader).unwrap();
        let bytes = [9u8; 80];
        s.render(PrimitiveTopology::TriangleStrip, &PrimitiveBatch::new(&bytes, 2, 4))
            .unwrap();
        s.unbind();
        s.unbind();
        s.bind(&shader).unwrap();

        assert_eq!(dummy.stats().live_vertex_arrays, 0);
        assert_eq!(dummy.stats().attribute_wirings, 4);
        let stats = s.stats();
        assert_eq!(stats.discarded_buffer_count, 1);
        assert_eq!(stats.capacity_bytes, 80);
        assert_eq!(stats.growth_count, 1);
    }

    #[test]
    fn test_render_after_dispose() {
        let dummy = Rc::new(DummyBackend::new());
        let backend: Rc<dyn GpuBackend> = dummy.clone();
        let mut s =
            LegacyStreamer::new(backend, VertexLayout::sprite(), None, &StreamerConfig::new())
                .unwrap();
        s.dispose().unwrap();
        let bytes = [0u8; 20];
        assert_eq!(
            s.render(PrimitiveTopology::PointList, &PrimitiveBatch::new(&bytes, 1, 1)),
            Err(GraphicsError::Disposed)
        );
        assert_eq!(dummy.stats().live_buffers, 0);
    }
}
