//! CPU view of persistently mapped buffer memory.

use std::ptr::NonNull;

use crate::error::GraphicsError;

/// A byte span of buffer memory mapped into the CPU address space.
///
/// Valid from the backend's `map_persistent` until the matching `unmap`.
/// The owner must stop using the span before unmapping; streamers keep the
/// mapping and the buffer together and unmap on disposal.
///
/// Writes are coherent: the GPU observes them without an explicit flush, so
/// the caller is responsible for not overwriting bytes a pending draw still
/// reads. See [`FenceTracker`](crate::sync::FenceTracker).
pub struct MappedBuffer {
    ptr: NonNull<u8>,
    len: usize,
}

impl MappedBuffer {
    /// Wrap a raw mapping.
    ///
    /// # Safety
    ///
    /// `ptr` must point to `len` bytes that are writable and stay valid until
    /// the backend unmaps the buffer. No other Rust reference may alias the
    /// span while this value exists.
    pub unsafe fn from_raw(ptr: NonNull<u8>, len: usize) -> Self {
        Self { ptr, len }
    }

    /// Size of the mapped span in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if the mapped span is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Copy `data` into the mapping at byte `offset`.
    pub fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), GraphicsError> {
        let in_bounds = offset
            .checked_add(data.len())
            .is_some_and(|end| end <= self.len);
        if !in_bounds {
            return Err(GraphicsError::InvalidParameter(format!(
                "write of {} bytes at offset {} exceeds mapping of {} bytes",
                data.len(),
                offset,
                self.len
            )));
        }

        // SAFETY: bounds checked above; the span is valid and unaliased per
        // the contract of `from_raw`, and `data` is a separate Rust slice.
        unsafe {
            std::ptr::copy_nonoverlapping(data.as_ptr(), self.ptr.as_ptr().add(offset), data.len());
        }
        Ok(())
    }
}

impl std::fmt::Debug for MappedBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MappedBuffer")
            .field("ptr", &self.ptr)
            .field("len", &self.len)
            .finish()
    }
}

// Mappings belong to the context thread
static_assertions::assert_not_impl_any!(MappedBuffer: Send, Sync);
