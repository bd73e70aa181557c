//! Vertex and index descriptions for streamed geometry.
//!
//! - [`VertexLayout`] - Describes the interleaved vertex format (shared via `Arc`)
//! - [`IndexData`] - Static index pattern reused by every indexed draw
//!
//! # Efficient Sharing via Arc
//!
//! Vertex layouts are wrapped in `Arc` since there are typically only a few
//! layout combinations across many streamers.

mod index;
mod layout;

pub use index::IndexData;
pub use layout::{
    ComponentType, VertexAttribute, VertexAttributeFormat, VertexAttributeSemantic, VertexLayout,
};
