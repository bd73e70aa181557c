//! Primitive topology and index format enums.

/// How vertices are assembled into primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrimitiveTopology {
    /// Each vertex is a point.
    PointList,
    /// Every two vertices form a line segment.
    LineList,
    /// Consecutive vertices form a connected line strip.
    LineStrip,
    /// Every three vertices form a triangle.
    #[default]
    TriangleList,
    /// Consecutive vertices form a triangle strip.
    TriangleStrip,
}

impl PrimitiveTopology {
    /// Number of primitives assembled from `element_count` vertices or indices.
    pub fn primitive_count(&self, element_count: u32) -> u32 {
        match self {
            Self::PointList => element_count,
            Self::LineList => element_count / 2,
            Self::LineStrip => element_count.saturating_sub(1),
            Self::TriangleList => element_count / 3,
            Self::TriangleStrip => element_count.saturating_sub(2),
        }
    }
}

/// Element type of an index buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexFormat {
    /// 16-bit unsigned indices.
    Uint16,
    /// 32-bit unsigned indices.
    Uint32,
}

impl IndexFormat {
    /// Size of one index in bytes.
    pub fn size(&self) -> usize {
        match self {
            Self::Uint16 => 2,
            Self::Uint32 => 4,
        }
    }

    /// Number of distinct vertices an index of this type can address.
    pub fn addressable_vertices(&self) -> u64 {
        match self {
            Self::Uint16 => u16::MAX as u64 + 1,
            Self::Uint32 => u32::MAX as u64 + 1,
        }
    }
}
