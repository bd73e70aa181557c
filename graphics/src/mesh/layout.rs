//! Vertex layout definitions for streamed primitives.
//!
//! A vertex layout describes the fixed-size binary layout of one vertex in
//! an interleaved stream: an ordered list of attributes, each with a semantic,
//! a format and a byte offset. Layouts are validated on construction and are
//! immutable afterwards; they are shared via `Arc` between a renderer and the
//! streamers it creates.
//!
//! # Example
//!
//! ```ignore
//! // 2D sprite vertex: position (float2) + texcoord (float2) + color (unorm8x4)
//! let layout = Arc::new(VertexLayout::new(vec![
//!     VertexAttribute::new(VertexAttributeSemantic::Position, VertexAttributeFormat::Float2, 0),
//!     VertexAttribute::new(VertexAttributeSemantic::TexCoord0, VertexAttributeFormat::Float2, 8),
//!     VertexAttribute::new(VertexAttributeSemantic::Color, VertexAttributeFormat::Unorm8x4, 16),
//! ])?);
//! assert_eq!(layout.vertex_stride(), 20);
//! ```

use std::sync::Arc;

use crate::backend::GpuBackend;
use crate::error::GraphicsError;
use crate::shader::ShaderHandle;

/// Semantic meaning of a vertex attribute.
///
/// Semantics are used to match layout attributes with shader inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexAttributeSemantic {
    /// Vertex position (float2 for screen-space, float3 for world-space).
    Position,
    /// Vertex normal (typically float3).
    Normal,
    /// Texture coordinates set 0 (typically float2).
    TexCoord0,
    /// Texture coordinates set 1 (typically float2).
    TexCoord1,
    /// Vertex color (typically float4 or unorm4).
    Color,
}

impl VertexAttributeSemantic {
    /// Get a unique index for this semantic (used for matching).
    pub fn index(&self) -> u32 {
        match self {
            Self::Position => 0,
            Self::Normal => 1,
            Self::TexCoord0 => 2,
            Self::TexCoord1 => 3,
            Self::Color => 4,
        }
    }

    /// Name of the shader input this semantic binds to.
    pub fn shader_input_name(&self) -> &'static str {
        match self {
            Self::Position => "in_position",
            Self::Normal => "in_normal",
            Self::TexCoord0 => "in_texcoord0",
            Self::TexCoord1 => "in_texcoord1",
            Self::Color => "in_color",
        }
    }
}

/// Component type of a vertex attribute, as seen by the vertex fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentType {
    /// 32-bit float.
    Float,
    /// 32-bit signed integer.
    Int,
    /// 32-bit unsigned integer.
    Uint,
    /// 8-bit unsigned integer normalized to 0.0-1.0.
    Unorm8,
    /// 8-bit signed integer normalized to -1.0-1.0.
    Snorm8,
}

/// Format of a vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexAttributeFormat {
    /// Single 32-bit float.
    Float,
    /// Two 32-bit floats.
    Float2,
    /// Three 32-bit floats.
    Float3,
    /// Four 32-bit floats.
    Float4,
    /// Single 32-bit signed integer.
    Int,
    /// Two 32-bit signed integers.
    Int2,
    /// Four 32-bit signed integers.
    Int4,
    /// Single 32-bit unsigned integer.
    Uint,
    /// Two 32-bit unsigned integers.
    Uint2,
    /// Four 32-bit unsigned integers.
    Uint4,
    /// Four 8-bit unsigned integers (normalized to 0.0-1.0).
    Unorm8x4,
    /// Four 8-bit signed integers (normalized to -1.0-1.0).
    Snorm8x4,
}

impl VertexAttributeFormat {
    /// Get the size in bytes of this format.
    pub fn size(&self) -> u32 {
        match self {
            Self::Float | Self::Int | Self::Uint => 4,
            Self::Float2 | Self::Int2 | Self::Uint2 => 8,
            Self::Float3 => 12,
            Self::Float4 | Self::Int4 | Self::Uint4 => 16,
            Self::Unorm8x4 | Self::Snorm8x4 => 4,
        }
    }

    /// Number of components (1 to 4).
    pub fn component_count(&self) -> u32 {
        match self {
            Self::Float | Self::Int | Self::Uint => 1,
            Self::Float2 | Self::Int2 | Self::Uint2 => 2,
            Self::Float3 => 3,
            Self::Float4 | Self::Int4 | Self::Uint4 | Self::Unorm8x4 | Self::Snorm8x4 => 4,
        }
    }

    /// Component type of this format.
    pub fn component_type(&self) -> ComponentType {
        match self {
            Self::Float | Self::Float2 | Self::Float3 | Self::Float4 => ComponentType::Float,
            Self::Int | Self::Int2 | Self::Int4 => ComponentType::Int,
            Self::Uint | Self::Uint2 | Self::Uint4 => ComponentType::Uint,
            Self::Unorm8x4 => ComponentType::Unorm8,
            Self::Snorm8x4 => ComponentType::Snorm8,
        }
    }
}

/// A single vertex attribute description.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VertexAttribute {
    /// Semantic meaning of this attribute.
    pub semantic: VertexAttributeSemantic,
    /// Data format of this attribute.
    pub format: VertexAttributeFormat,
    /// Byte offset within the vertex.
    pub offset: u32,
}

impl VertexAttribute {
    /// Create a new vertex attribute.
    pub fn new(semantic: VertexAttributeSemantic, format: VertexAttributeFormat, offset: u32) -> Self {
        Self {
            semantic,
            format,
            offset,
        }
    }

    /// Create a 2D position attribute (float2).
    pub fn position2(offset: u32) -> Self {
        Self::new(VertexAttributeSemantic::Position, VertexAttributeFormat::Float2, offset)
    }

    /// Create a 3D position attribute (float3).
    pub fn position3(offset: u32) -> Self {
        Self::new(VertexAttributeSemantic::Position, VertexAttributeFormat::Float3, offset)
    }

    /// Create a texcoord0 attribute (float2).
    pub fn texcoord0(offset: u32) -> Self {
        Self::new(VertexAttributeSemantic::TexCoord0, VertexAttributeFormat::Float2, offset)
    }

    /// Create a color attribute (float4).
    pub fn color(offset: u32) -> Self {
        Self::new(VertexAttributeSemantic::Color, VertexAttributeFormat::Float4, offset)
    }

    /// Create a packed color attribute (unorm8x4).
    pub fn packed_color(offset: u32) -> Self {
        Self::new(VertexAttributeSemantic::Color, VertexAttributeFormat::Unorm8x4, offset)
    }

    /// Byte offset one past the end of this attribute.
    pub fn end(&self) -> u32 {
        self.offset + self.format.size()
    }
}

/// Describes the interleaved layout of one streamed vertex.
///
/// Invariants, checked by [`VertexLayout::new`]:
/// - at least one attribute;
/// - attributes are tightly packed in order: each offset equals the end of
///   the previous attribute, so offsets increase monotonically and the sum
///   of attribute sizes equals [`vertex_stride`](Self::vertex_stride).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VertexLayout {
    attributes: Vec<VertexAttribute>,
    stride: u32,
    label: Option<String>,
}

impl VertexLayout {
    /// Create a validated vertex layout.
    ///
    /// # Errors
    ///
    /// Returns [`GraphicsError::InvalidLayout`] if `attributes` is empty or
    /// the offsets are not tightly packed in increasing order.
    pub fn new(attributes: Vec<VertexAttribute>) -> Result<Self, GraphicsError> {
        if attributes.is_empty() {
            return Err(GraphicsError::InvalidLayout(
                "vertex layout has no attributes".to_string(),
            ));
        }

        let mut expected_offset = 0;
        for attr in &attributes {
            if attr.offset != expected_offset {
                return Err(GraphicsError::InvalidLayout(format!(
                    "attribute {:?} at offset {} but previous attributes end at {}",
                    attr.semantic, attr.offset, expected_offset
                )));
            }
            expected_offset = attr.end();
        }

        Ok(Self {
            attributes,
            stride: expected_offset,
            label: None,
        })
    }

    /// Set a debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Get the debug label, if set.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Number of attributes in the layout.
    pub fn attribute_count(&self) -> usize {
        self.attributes.len()
    }

    /// Size of one vertex in bytes.
    pub fn vertex_stride(&self) -> u32 {
        self.stride
    }

    /// The attributes in offset order.
    pub fn attributes(&self) -> &[VertexAttribute] {
        &self.attributes
    }

    /// Check if this layout has a specific semantic.
    pub fn has_semantic(&self, semantic: VertexAttributeSemantic) -> bool {
        self.attributes.iter().any(|attr| attr.semantic == semantic)
    }

    /// Get an attribute by semantic.
    pub fn get_attribute(&self, semantic: VertexAttributeSemantic) -> Option<&VertexAttribute> {
        self.attributes.iter().find(|attr| attr.semantic == semantic)
    }

    /// Wire every attribute to the matching input of `shader`.
    ///
    /// Reads from the vertex buffer currently bound on the backend. Attributes
    /// the shader does not consume are skipped. Returns the number of
    /// attributes that were wired.
    pub fn activate_attributes(&self, backend: &dyn GpuBackend, shader: &ShaderHandle) -> usize {
        let mut wired = 0;
        for attr in &self.attributes {
            match backend.attribute_location(shader.program(), attr.semantic.shader_input_name()) {
                Some(location) => {
                    backend.enable_vertex_attribute(location, attr, self.stride);
                    wired += 1;
                }
                None => log::trace!(
                    "shader {:?} has no input for {:?}; attribute skipped",
                    shader,
                    attr.semantic
                ),
            }
        }
        wired
    }

    /// Disable the shader inputs previously wired by
    /// [`activate_attributes`](Self::activate_attributes).
    pub fn deactivate_attributes(&self, backend: &dyn GpuBackend, shader: &ShaderHandle) {
        for attr in &self.attributes {
            if let Some(location) =
                backend.attribute_location(shader.program(), attr.semantic.shader_input_name())
            {
                backend.disable_vertex_attribute(location);
            }
        }
    }
}

// ============================================================================
// Common Layouts
// ============================================================================

impl VertexLayout {
    /// Screen-space sprite/glyph layout: float2 position + float2 texcoord +
    /// unorm8x4 color (20 bytes).
    pub fn sprite() -> Arc<Self> {
        Arc::new(Self {
            attributes: vec![
                VertexAttribute::position2(0),
                VertexAttribute::texcoord0(8),
                VertexAttribute::packed_color(16),
            ],
            stride: 20,
            label: Some("sprite".to_string()),
        })
    }

    /// World-space colored line layout: float3 position + float4 color
    /// (28 bytes).
    pub fn position_color() -> Arc<Self> {
        Arc::new(Self {
            attributes: vec![VertexAttribute::position3(0), VertexAttribute::color(12)],
            stride: 28,
            label: Some("position_color".to_string()),
        })
    }
}
