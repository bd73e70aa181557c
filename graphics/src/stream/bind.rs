//! Bind and draw state shared by every streaming strategy.

use std::rc::Rc;
use std::sync::Arc;

use crate::backend::{GpuBackend, GpuBuffer};
use crate::error::GraphicsError;
use crate::mesh::{IndexData, VertexLayout};
use crate::resources::{Buffer, VertexArray};
use crate::shader::ShaderHandle;
use crate::types::{BufferDescriptor, BufferUsage, PrimitiveTopology};

use super::config::StreamerConfig;

/// Static index buffer uploaded once at construction.
pub(crate) struct StaticIndices {
    buffer: Buffer,
    data: IndexData,
}

impl StaticIndices {
    pub(crate) fn upload(
        backend: &Rc<dyn GpuBackend>,
        data: IndexData,
        config: &StreamerConfig,
    ) -> Result<Self, GraphicsError> {
        let descriptor = BufferDescriptor::new(
            data.bytes().len() as u64,
            BufferUsage::INDEX | BufferUsage::STATIC,
        )
        .with_label(config.buffer_label("indices"));
        let buffer = Buffer::with_contents(backend, descriptor, data.bytes())?;
        Ok(Self { buffer, data })
    }

    pub(crate) fn raw(&self) -> &GpuBuffer {
        self.buffer.raw()
    }

    pub(crate) fn data(&self) -> &IndexData {
        &self.data
    }
}

/// Which shader is bound and how the layout is wired to it.
///
/// With a vertex array, the attribute wiring is captured once and survives
/// `unbind`: binding the same shader again only rebinds the vertex array.
/// Without one, the wiring is global state, established on every `bind` and
/// torn down on `unbind`.
pub(crate) struct BindState {
    layout: Arc<VertexLayout>,
    vertex_array: Option<VertexArray>,
    bound: Option<ShaderHandle>,
    wired: Option<ShaderHandle>,
}

impl BindState {
    pub(crate) fn new(
        backend: &Rc<dyn GpuBackend>,
        layout: Arc<VertexLayout>,
        use_vertex_array: bool,
    ) -> Result<Self, GraphicsError> {
        let vertex_array = if use_vertex_array {
            Some(VertexArray::new(backend)?)
        } else {
            None
        };
        Ok(Self {
            layout,
            vertex_array,
            bound: None,
            wired: None,
        })
    }

    pub(crate) fn layout(&self) -> &Arc<VertexLayout> {
        &self.layout
    }

    pub(crate) fn bound_shader(&self) -> Option<&ShaderHandle> {
        self.bound.as_ref()
    }

    pub(crate) fn require_bound(&self) -> Result<&ShaderHandle, GraphicsError> {
        self.bound.as_ref().ok_or(GraphicsError::NotBound)
    }

    pub(crate) fn bind(
        &mut self,
        backend: &dyn GpuBackend,
        shader: &ShaderHandle,
        vertex_buffer: &GpuBuffer,
        index_buffer: Option<&GpuBuffer>,
    ) -> Result<(), GraphicsError> {
        match &self.bound {
            Some(current) if current == shader => return Ok(()),
            Some(_) => return Err(GraphicsError::AlreadyBound),
            None => {}
        }

        if let Some(vertex_array) = &self.vertex_array {
            vertex_array.bind();
        }
        if self.vertex_array.is_some() && self.wired.as_ref() == Some(shader) {
            log::trace!("Reusing vertex array wiring for {:?}", shader);
        } else {
            if let Some(previous) = self.wired.take() {
                self.layout.deactivate_attributes(backend, &previous);
            }
            self.wire(backend, shader, vertex_buffer, index_buffer);
        }

        self.bound = Some(*shader);
        Ok(())
    }

    pub(crate) fn unbind(&mut self, backend: &dyn GpuBackend) {
        let Some(shader) = self.bound.take() else {
            return;
        };
        match &self.vertex_array {
            Some(_) => backend.bind_vertex_array(None),
            None => {
                self.layout.deactivate_attributes(backend, &shader);
                backend.bind_index_buffer(None);
                backend.bind_vertex_buffer(None);
                self.wired = None;
            }
        }
    }

    /// Point the wiring at a reallocated vertex buffer.
    pub(crate) fn buffer_replaced(&mut self, backend: &dyn GpuBackend, vertex_buffer: &GpuBuffer) {
        match self.bound {
            Some(shader) => {
                if let Some(vertex_array) = &self.vertex_array {
                    vertex_array.bind();
                }
                backend.bind_vertex_buffer(Some(vertex_buffer));
                self.layout.activate_attributes(backend, &shader);
            }
            // Rewire on the next bind
            None => self.wired = None,
        }
    }

    /// Release the vertex array. The state is unusable afterwards.
    pub(crate) fn release(&mut self, backend: &dyn GpuBackend) {
        self.unbind(backend);
        self.vertex_array = None;
        self.wired = None;
    }

    fn wire(
        &mut self,
        backend: &dyn GpuBackend,
        shader: &ShaderHandle,
        vertex_buffer: &GpuBuffer,
        index_buffer: Option<&GpuBuffer>,
    ) {
        backend.bind_vertex_buffer(Some(vertex_buffer));
        let wired = self.layout.activate_attributes(backend, shader);
        if wired < self.layout.attribute_count() {
            log::debug!(
                "Shader {:?} consumes {} of {} layout attributes",
                shader,
                wired,
                self.layout.attribute_count()
            );
        }
        backend.bind_index_buffer(index_buffer);
        self.wired = Some(*shader);
    }
}

/// Submit one draw of a validated batch starting at `first_vertex`.
pub(crate) fn submit_draw(
    backend: &dyn GpuBackend,
    topology: PrimitiveTopology,
    draw_count: u32,
    first_vertex: u32,
    indices: Option<&StaticIndices>,
) {
    match indices {
        Some(indices) => {
            let format = indices.data().format();
            backend.draw_indexed(topology, draw_count, format, 0, first_vertex);
        }
        None => backend.draw_arrays(topology, first_vertex, draw_count),
    }
    log::trace!(
        "Draw {:?}: {} elements from vertex {}",
        topology,
        draw_count,
        first_vertex
    );
}
