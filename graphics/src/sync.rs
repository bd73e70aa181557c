//! CPU-GPU synchronization over byte ranges of a streamed buffer.
//!
//! Every draw that reads from a persistently mapped buffer is followed by a
//! fence covering the bytes it reads. Before the CPU writes into a range, the
//! [`FenceTracker`] retires every pending fence that overlaps it: signaled
//! fences are simply deleted, unsignaled ones are waited on (a stall).
//!
//! Ownership of a byte range passes to the GPU when its draw is submitted
//! and comes back only once its fence has been observed signaled.

use crate::backend::{FenceStatus, GpuBackend, GpuFence};
use crate::error::GraphicsError;

/// A fence guarding `[start, start + length)` of a buffer.
#[derive(Debug)]
pub struct FenceRange {
    start: u64,
    length: u64,
    fence: GpuFence,
}

impl FenceRange {
    /// Create a fenced range.
    pub fn new(start: u64, length: u64, fence: GpuFence) -> Self {
        Self {
            start,
            length,
            fence,
        }
    }

    /// First byte of the range.
    pub fn start(&self) -> u64 {
        self.start
    }

    /// Length of the range in bytes.
    pub fn length(&self) -> u64 {
        self.length
    }

    /// One past the last byte of the range.
    pub fn end(&self) -> u64 {
        self.start + self.length
    }

    /// Get the fence.
    pub fn fence(&self) -> &GpuFence {
        &self.fence
    }

    /// Check if this range intersects `[start, start + length)`.
    pub fn overlaps(&self, start: u64, length: u64) -> bool {
        length > 0 && self.length > 0 && self.start < start + length && start < self.end()
    }
}

/// Pending fences of one buffer, in submission order.
#[derive(Debug, Default)]
pub struct FenceTracker {
    ranges: Vec<FenceRange>,
}

impl FenceTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a fence protecting `[start, start + length)`.
    ///
    /// Ranges never overlap: the caller waits for a range before writing it,
    /// which retires every fence that covered it.
    pub fn record(&mut self, start: u64, length: u64, fence: GpuFence) {
        debug_assert!(
            !self.ranges.iter().any(|r| r.overlaps(start, length)),
            "fenced ranges overlap at [{start}, {})",
            start + length
        );
        self.ranges.push(FenceRange::new(start, length, fence));
    }

    /// Retire every pending fence overlapping `[start, start + length)`.
    ///
    /// Each fence is polled first; only fences that are not yet signaled are
    /// waited on. Returns the number of such blocking waits.
    ///
    /// # Errors
    ///
    /// Returns [`GraphicsError::FenceWaitFailed`] if the driver reports an
    /// error. The failing fence is deleted; the remaining ones stay tracked.
    pub fn wait_for_range(
        &mut self,
        backend: &dyn GpuBackend,
        start: u64,
        length: u64,
    ) -> Result<u32, GraphicsError> {
        let mut stalls = 0;
        let mut index = 0;
        while index < self.ranges.len() {
            if !self.ranges[index].overlaps(start, length) {
                index += 1;
                continue;
            }
            let range = self.ranges.remove(index);
            if Self::retire(backend, range)? {
                stalls += 1;
            }
        }
        Ok(stalls)
    }

    /// Retire every pending fence. Returns the number of blocking waits.
    pub fn wait_all(&mut self, backend: &dyn GpuBackend) -> Result<u32, GraphicsError> {
        let mut stalls = 0;
        // Oldest first: waiting on one fence completes everything before it
        while !self.ranges.is_empty() {
            let range = self.ranges.remove(0);
            if Self::retire(backend, range)? {
                stalls += 1;
            }
        }
        Ok(stalls)
    }

    /// Delete every pending fence without waiting.
    pub fn release(&mut self, backend: &dyn GpuBackend) {
        for range in self.ranges.drain(..) {
            backend.delete_fence(range.fence);
        }
    }

    /// Number of fences not yet retired.
    pub fn pending_count(&self) -> usize {
        self.ranges.len()
    }

    /// Check if no fence is pending.
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Pending ranges in submission order.
    pub fn ranges(&self) -> &[FenceRange] {
        &self.ranges
    }

    /// Returns whether a blocking wait was needed.
    fn retire(backend: &dyn GpuBackend, range: FenceRange) -> Result<bool, GraphicsError> {
        let result = match backend.poll_fence(&range.fence) {
            Ok(FenceStatus::Signaled) => Ok(false),
            Ok(FenceStatus::Unsignaled) => {
                log::trace!(
                    "Stalling on fence for bytes [{}, {})",
                    range.start,
                    range.end()
                );
                backend.wait_fence(&range.fence).map(|()| true)
            }
            Err(e) => Err(e),
        };
        backend.delete_fence(range.fence);
        result
    }
}
