use std::sync::Arc;

use streamline_graphics::VertexLayout;

/// A debug draw vertex: position + color.
///
/// Lines take two consecutive vertices, filled quads four.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DebugVertex {
    pub position: [f32; 3],
    pub color: [f32; 4],
}

impl DebugVertex {
    pub fn new(position: [f32; 3], color: [f32; 4]) -> Self {
        Self { position, color }
    }

    /// Layout matching this vertex: float3 position + float4 color.
    pub fn layout() -> Arc<VertexLayout> {
        VertexLayout::position_color()
    }
}
