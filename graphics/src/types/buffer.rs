//! Buffer types and descriptors.

use bitflags::bitflags;

bitflags! {
    /// Usage flags for buffers.
    ///
    /// Target flags (`VERTEX`, `INDEX`) describe how the buffer is bound.
    /// Hint flags (`STREAM`, `DYNAMIC`) are forwarded to the driver when the
    /// store is (re)specified. `PERSISTENT` requests immutable storage that
    /// stays mapped for writing while the GPU reads from it.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        /// Buffer can be used as a vertex buffer.
        const VERTEX = 1 << 0;
        /// Buffer can be used as an index buffer.
        const INDEX = 1 << 1;
        /// Contents are respecified every use.
        const STREAM = 1 << 2;
        /// Contents are modified repeatedly and used many times.
        const DYNAMIC = 1 << 3;
        /// Contents are specified once.
        const STATIC = 1 << 4;
        /// Immutable storage, persistently and coherently mapped for CPU writes.
        const PERSISTENT = 1 << 5;
    }
}

impl Default for BufferUsage {
    fn default() -> Self {
        Self::empty()
    }
}

/// Descriptor for creating a buffer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct BufferDescriptor {
    /// Debug label for the buffer.
    pub label: Option<String>,
    /// Size in bytes.
    pub size: u64,
    /// Usage flags.
    pub usage: BufferUsage,
}

impl BufferDescriptor {
    /// Create a new buffer descriptor.
    pub fn new(size: u64, usage: BufferUsage) -> Self {
        Self {
            label: None,
            size,
            usage,
        }
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Whether the buffer is allocated with persistent-mapping storage.
    pub fn is_persistent(&self) -> bool {
        self.usage.contains(BufferUsage::PERSISTENT)
    }
}

/// New contents for a buffer store being (re)specified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferData<'a> {
    /// Allocate a fresh store of the given size with undefined contents.
    ///
    /// Specifying a store without data orphans the previous one: the driver
    /// keeps it alive for draws still reading it and hands out new memory.
    Uninit(u64),
    /// Allocate a store sized to the slice and fill it.
    Bytes(&'a [u8]),
}

impl BufferData<'_> {
    /// Size in bytes of the new store.
    pub fn size(&self) -> u64 {
        match self {
            Self::Uninit(size) => *size,
            Self::Bytes(bytes) => bytes.len() as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_label() {
        let desc = BufferDescriptor::new(1024, BufferUsage::VERTEX | BufferUsage::STREAM)
            .with_label("quads");
        assert_eq!(desc.label.as_deref(), Some("quads"));
        assert_eq!(desc.size, 1024);
        assert!(!desc.is_persistent());
    }

    #[test]
    fn test_persistent_descriptor() {
        let desc = BufferDescriptor::new(64, BufferUsage::VERTEX | BufferUsage::PERSISTENT);
        assert!(desc.is_persistent());
    }

    #[test]
    fn test_buffer_data_size() {
        assert_eq!(BufferData::Uninit(256).size(), 256);
        assert_eq!(BufferData::Bytes(&[1, 2, 3]).size(), 3);
    }
}
