//! Static index patterns supplied to a streamer at construction.

use crate::error::GraphicsError;
use crate::types::IndexFormat;

/// Index data uploaded once and reused by every indexed draw of a streamer.
///
/// Invariants, checked on construction:
/// - at least one index;
/// - every referenced vertex fits the addressable range of `format`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IndexData {
    format: IndexFormat,
    bytes: Vec<u8>,
    count: u32,
    max_vertex_count: u32,
}

impl IndexData {
    /// Create 16-bit index data.
    pub fn from_u16(indices: &[u16]) -> Result<Self, GraphicsError> {
        let bytes = indices.iter().flat_map(|i| i.to_le_bytes()).collect();
        let max = indices.iter().copied().max().map(u64::from);
        Self::build(IndexFormat::Uint16, bytes, indices.len(), max)
    }

    /// Create 32-bit index data.
    pub fn from_u32(indices: &[u32]) -> Result<Self, GraphicsError> {
        let bytes = indices.iter().flat_map(|i| i.to_le_bytes()).collect();
        let max = indices.iter().copied().max().map(u64::from);
        Self::build(IndexFormat::Uint32, bytes, indices.len(), max)
    }

    /// Create the index pattern for `quad_count` quads.
    ///
    /// Every quad is four consecutive vertices drawn as two triangles:
    /// `0, 1, 2, 0, 2, 3`.
    pub fn quads(quad_count: u32, format: IndexFormat) -> Result<Self, GraphicsError> {
        let vertex_count = u64::from(quad_count) * 4;
        if vertex_count > format.addressable_vertices() {
            return Err(GraphicsError::InvalidLayout(format!(
                "{quad_count} quads need {vertex_count} vertices, more than {format:?} can address"
            )));
        }

        let pattern = (0..quad_count).flat_map(|quad| {
            let base = quad * 4;
            [base, base + 1, base + 2, base, base + 2, base + 3]
        });
        match format {
            IndexFormat::Uint16 => {
                // Range checked above
                let indices: Vec<u16> = pattern.map(|i| i as u16).collect();
                Self::from_u16(&indices)
            }
            IndexFormat::Uint32 => Self::from_u32(&pattern.collect::<Vec<_>>()),
        }
    }

    fn build(
        format: IndexFormat,
        bytes: Vec<u8>,
        count: usize,
        max_index: Option<u64>,
    ) -> Result<Self, GraphicsError> {
        let Some(max_index) = max_index else {
            return Err(GraphicsError::InvalidLayout(
                "index data is empty".to_string(),
            ));
        };
        let count = u32::try_from(count).map_err(|_| {
            GraphicsError::InvalidLayout(format!("{count} indices exceed the draw range"))
        })?;
        let max_vertex_count = max_index + 1;
        if max_vertex_count > format.addressable_vertices() || max_vertex_count > u64::from(u32::MAX)
        {
            return Err(GraphicsError::InvalidLayout(format!(
                "index {max_index} is outside the {format:?} vertex range"
            )));
        }

        Ok(Self {
            format,
            bytes,
            count,
            max_vertex_count: max_vertex_count as u32,
        })
    }

    /// Get the index format.
    pub fn format(&self) -> IndexFormat {
        self.format
    }

    /// Raw little-endian index bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Number of indices.
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Largest referenced index plus one.
    pub fn max_vertex_count(&self) -> u32 {
        self.max_vertex_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quad_pattern() {
        let indices = IndexData::quads(2, IndexFormat::Uint16).unwrap();
        assert_eq!(indices.count(), 12);
        assert_eq!(indices.max_vertex_count(), 8);
        assert_eq!(indices.bytes().len(), 24);
        let decoded: Vec<u16> = indices
            .bytes()
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .collect();
        assert_eq!(decoded, vec![0, 1, 2, 0, 2, 3, 4, 5, 6, 4, 6, 7]);
    }

    #[test]
    fn test_empty_rejected() {
        assert!(matches!(
            IndexData::from_u16(&[]),
            Err(GraphicsError::InvalidLayout(_))
        ));
        assert!(IndexData::quads(0, IndexFormat::Uint32).is_err());
    }

    #[test]
    fn test_quad_range_limits() {
        // 16384 quads address exactly 65536 vertices
        assert!(IndexData::quads(16384, IndexFormat::Uint16).is_ok());
        assert!(matches!(
            IndexData::quads(16385, IndexFormat::Uint16),
            Err(GraphicsError::InvalidLayout(_))
        ));
        let wide = IndexData::quads(16385, IndexFormat::Uint32).unwrap();
        assert_eq!(wide.format(), IndexFormat::Uint32);
        assert_eq!(wide.max_vertex_count(), 65540);
    }

    #[test]
    fn test_max_vertex_count() {
        let indices = IndexData::from_u32(&[3, 9, 1]).unwrap();
        assert_eq!(indices.count(), 3);
        assert_eq!(indices.max_vertex_count(), 10);
    }
}
