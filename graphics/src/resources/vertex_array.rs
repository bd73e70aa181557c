//! Vertex array resource.

use std::rc::Rc;

use crate::backend::{GpuBackend, GpuVertexArray};
use crate::error::GraphicsError;

/// A vertex array object capturing attribute wiring and the index binding.
///
/// Released through its backend when dropped.
pub struct VertexArray {
    backend: Rc<dyn GpuBackend>,
    raw: GpuVertexArray,
}

impl VertexArray {
    /// Create a vertex array on `backend`.
    pub fn new(backend: &Rc<dyn GpuBackend>) -> Result<Self, GraphicsError> {
        let raw = backend.create_vertex_array()?;
        log::trace!("Created vertex array {:?}", raw);
        Ok(Self {
            backend: Rc::clone(backend),
            raw,
        })
    }

    /// Get the backend handle.
    pub fn raw(&self) -> &GpuVertexArray {
        &self.raw
    }

    /// Make this vertex array current.
    pub fn bind(&self) {
        self.backend.bind_vertex_array(Some(&self.raw));
    }
}

impl Drop for VertexArray {
    fn drop(&mut self) {
        self.backend.destroy_vertex_array(&self.raw);
    }
}

impl std::fmt::Debug for VertexArray {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("VertexArray").field(&self.raw).finish()
    }
}
