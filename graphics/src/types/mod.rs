//! Common types and descriptors for streaming resources.
//!
//! This module contains usage flags, descriptor structs and the primitive
//! enums shared by every backend and strategy.

mod buffer;
mod primitive;

pub use buffer::{BufferData, BufferDescriptor, BufferUsage};
pub use primitive::{IndexFormat, PrimitiveTopology};
