//! Ring cursor bookkeeping for streamed vertex data.
//!
//! A ring buffer pre-allocates one large buffer and writes consecutive
//! batches into it, wrapping around when a batch would run past the end.
//! [`RingCursor`] tracks the write position in bytes and the matching draw
//! position in vertices; synchronization with the GPU is handled separately
//! by the [`FenceTracker`](crate::sync::FenceTracker).
//!
//! # Example
//!
//! ```ignore
//! let mut ring = RingCursor::new(1600, 16);
//! let alloc = ring.allocate(640)?;   // offset 0, first vertex 0
//! let alloc = ring.allocate(640)?;   // offset 640, first vertex 40
//! let alloc = ring.allocate(640)?;   // wraps: offset 0, first vertex 0
//! assert!(alloc.wrapped);
//! ```

use crate::error::GraphicsError;

/// A sub-allocation from a ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RingAllocation {
    /// Byte offset into the ring buffer.
    pub offset: u64,
    /// Size of the allocation in bytes.
    pub size: u64,
    /// Index of the first vertex of the allocation.
    pub first_vertex: u32,
    /// Whether both cursors were reset to zero to make room.
    pub wrapped: bool,
}

impl RingAllocation {
    /// Get the end offset (offset + size).
    pub fn end(&self) -> u64 {
        self.offset + self.size
    }
}

/// Write and draw cursors over a ring of `capacity` bytes.
///
/// Invariant: `write_offset == draw_vertex * stride` and
/// `write_offset <= capacity`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RingCursor {
    capacity: u64,
    stride: u32,
    write_offset: u64,
    draw_vertex: u32,
    wrap_count: u64,
}

impl RingCursor {
    /// Create a cursor over `capacity` bytes of vertices of `stride` bytes.
    pub fn new(capacity: u64, stride: u32) -> Self {
        debug_assert!(stride > 0, "vertex stride cannot be zero");
        Self {
            capacity,
            stride,
            write_offset: 0,
            draw_vertex: 0,
            wrap_count: 0,
        }
    }

    /// Get the total capacity in bytes.
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Get the current write offset in bytes.
    pub fn write_offset(&self) -> u64 {
        self.write_offset
    }

    /// Get the vertex index the next batch starts at.
    pub fn draw_vertex(&self) -> u32 {
        self.draw_vertex
    }

    /// Get the number of times the cursors have wrapped around.
    pub fn wrap_count(&self) -> u64 {
        self.wrap_count
    }

    /// Get the amount of space remaining before wrapping.
    pub fn remaining(&self) -> u64 {
        self.capacity - self.write_offset
    }

    /// Check if a batch of `size` bytes fits without wrapping.
    pub fn can_allocate(&self, size: u64) -> bool {
        self.write_offset + size <= self.capacity
    }

    /// Reserve the span for the next batch, wrapping both cursors to zero if
    /// the batch would run past the end.
    ///
    /// The cursors are not advanced; call [`advance`](Self::advance) once the
    /// batch has been submitted.
    ///
    /// # Errors
    ///
    /// Returns [`GraphicsError::InvalidParameter`] if `size` is larger than
    /// the whole ring or not a whole number of vertices.
    pub fn allocate(&mut self, size: u64) -> Result<RingAllocation, GraphicsError> {
        if size > self.capacity {
            return Err(GraphicsError::InvalidParameter(format!(
                "batch of {size} bytes does not fit a ring of {} bytes",
                self.capacity
            )));
        }
        if size % u64::from(self.stride) != 0 {
            return Err(GraphicsError::InvalidParameter(format!(
                "batch of {size} bytes is not a multiple of the {} byte stride",
                self.stride
            )));
        }

        let wrapped = !self.can_allocate(size);
        if wrapped {
            self.wrap();
        }

        Ok(RingAllocation {
            offset: self.write_offset,
            size,
            first_vertex: self.draw_vertex,
            wrapped,
        })
    }

    /// Move both cursors past a submitted allocation.
    pub fn advance(&mut self, allocation: &RingAllocation) {
        debug_assert_eq!(allocation.offset, self.write_offset);
        debug_assert!(allocation.end() <= self.capacity);
        self.write_offset = allocation.end();
        // Whole vertices only, checked by `allocate`
        self.draw_vertex += (allocation.size / u64::from(self.stride)) as u32;
    }

    /// Reset both cursors to the start of the ring.
    pub fn wrap(&mut self) {
        log::trace!(
            "Ring wrap at offset {} of {} bytes",
            self.write_offset,
            self.capacity
        );
        self.write_offset = 0;
        self.draw_vertex = 0;
        self.wrap_count += 1;
    }

    /// Start over on a new buffer of `capacity` bytes.
    pub fn reset(&mut self, capacity: u64) {
        self.capacity = capacity;
        self.write_offset = 0;
        self.draw_vertex = 0;
    }
}
