//! GPU resources.
//!
//! This module contains the GPU resource owners used by the streamers:
//! - [`Buffer`] - GPU buffer object
//! - [`VertexArray`] - Vertex array object
//! - [`MappedBuffer`] - CPU view of persistently mapped buffer memory
//! - [`RingCursor`] - Write/draw cursors of a streaming ring buffer
//!
//! Resources hold an [`Rc`] to their backend and release themselves on drop.
//! They are bound to the thread that owns the graphics context.
//!
//! [`Rc`]: std::rc::Rc

mod buffer;
mod mapped;
mod ring_buffer;
mod vertex_array;

pub use buffer::Buffer;
pub use mapped::MappedBuffer;
pub use ring_buffer::{RingAllocation, RingCursor};
pub use vertex_array::VertexArray;
