//! GPU buffer resource.

use std::rc::Rc;

use crate::backend::{GpuBackend, GpuBuffer};
use crate::error::GraphicsError;
use crate::types::{BufferData, BufferDescriptor, BufferUsage};

/// A GPU buffer object owned by the streaming layer.
///
/// The buffer is released through its backend when dropped, so a streamer
/// that fails halfway through construction never leaks the objects it has
/// already created.
///
/// # Example
///
/// ```ignore
/// let buffer = Buffer::new(&backend, BufferDescriptor::new(1024, BufferUsage::VERTEX))?;
/// println!("Buffer size: {}", buffer.size());
/// ```
pub struct Buffer {
    backend: Rc<dyn GpuBackend>,
    raw: GpuBuffer,
    descriptor: BufferDescriptor,
}

impl Buffer {
    /// Create a buffer on `backend`.
    pub fn new(
        backend: &Rc<dyn GpuBackend>,
        descriptor: BufferDescriptor,
    ) -> Result<Self, GraphicsError> {
        log::debug!(
            "Creating buffer {:?} ({} bytes, {:?})",
            descriptor.label,
            descriptor.size,
            descriptor.usage
        );
        let raw = backend.create_buffer(&descriptor)?;
        Ok(Self {
            backend: Rc::clone(backend),
            raw,
            descriptor,
        })
    }

    /// Create a buffer initialized with `contents`.
    pub fn with_contents(
        backend: &Rc<dyn GpuBackend>,
        descriptor: BufferDescriptor,
        contents: &[u8],
    ) -> Result<Self, GraphicsError> {
        let usage = descriptor.usage;
        let mut buffer = Self::new(backend, descriptor)?;
        buffer.respecify(BufferData::Bytes(contents), usage)?;
        Ok(buffer)
    }

    /// Get the backend the buffer lives on.
    pub fn backend(&self) -> &Rc<dyn GpuBackend> {
        &self.backend
    }

    /// Get the backend handle.
    pub fn raw(&self) -> &GpuBuffer {
        &self.raw
    }

    /// Get the buffer descriptor.
    pub fn descriptor(&self) -> &BufferDescriptor {
        &self.descriptor
    }

    /// Get the current store size in bytes.
    pub fn size(&self) -> u64 {
        self.descriptor.size
    }

    /// Get the buffer label, if set.
    pub fn label(&self) -> Option<&str> {
        self.descriptor.label.as_deref()
    }

    /// Replace the whole store of the buffer.
    ///
    /// Draws already submitted keep reading the previous store.
    pub fn respecify(
        &mut self,
        data: BufferData<'_>,
        usage: BufferUsage,
    ) -> Result<(), GraphicsError> {
        self.backend.buffer_data(&self.raw, data, usage)?;
        self.descriptor.size = data.size();
        Ok(())
    }

    /// Overwrite bytes of the current store starting at `offset`.
    pub fn write(&self, offset: u64, data: &[u8]) -> Result<(), GraphicsError> {
        self.backend.buffer_sub_data(&self.raw, offset, data)
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        log::trace!("Releasing buffer {:?}", self.descriptor.label);
        self.backend.destroy_buffer(&self.raw);
    }
}

impl std::fmt::Debug for Buffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Buffer")
            .field("raw", &self.raw)
            .field("size", &self.descriptor.size)
            .field("usage", &self.descriptor.usage)
            .field("label", &self.descriptor.label)
            .finish()
    }
}
