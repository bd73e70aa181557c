//! Drawing helpers on [`DebugDrawerContext`].
//!
//! Shapes are flat: 2D helpers take XY coordinates plus a depth `z` and
//! expand to line segments or filled quads for the batchers.

use std::f32::consts::TAU;

use crate::drawer::DebugDrawerContext;

impl DebugDrawerContext<'_> {
    /// Draw a single line segment.
    pub fn draw_line(&mut self, start: [f32; 3], end: [f32; 3], color: [f32; 4]) {
        self.push_line(start, end, color);
    }

    /// Draw connected segments through `points`, closing the loop if asked.
    pub fn draw_polyline(&mut self, points: &[[f32; 3]], closed: bool, color: [f32; 4]) {
        for pair in points.windows(2) {
            self.push_line(pair[0], pair[1], color);
        }
        if closed && points.len() > 2 {
            self.push_line(points[points.len() - 1], points[0], color);
        }
    }

    /// Draw the outline of an axis-aligned rectangle (4 segments).
    pub fn draw_rect_outline(&mut self, min: [f32; 2], max: [f32; 2], z: f32, color: [f32; 4]) {
        let corners = rect_corners(min, max, z);
        self.draw_polyline(&corners, true, color);
    }

    /// Draw a circle outline approximated by `segments` segments.
    pub fn draw_circle(
        &mut self,
        center: [f32; 2],
        radius: f32,
        z: f32,
        segments: u32,
        color: [f32; 4],
    ) {
        let segments = segments.max(3);
        let point = |i: u32| {
            let angle = TAU * i as f32 / segments as f32;
            [
                center[0] + radius * angle.cos(),
                center[1] + radius * angle.sin(),
                z,
            ]
        };
        for i in 0..segments {
            self.push_line(point(i), point(i + 1), color);
        }
    }

    /// Draw a `+` marker of total width `size`.
    pub fn draw_cross(&mut self, center: [f32; 2], size: f32, z: f32, color: [f32; 4]) {
        let h = size * 0.5;
        let [x, y] = center;
        self.push_line([x - h, y, z], [x + h, y, z], color);
        self.push_line([x, y - h, z], [x, y + h, z], color);
    }

    /// Draw a filled quad from four corners in counter-clockwise order.
    pub fn draw_quad(&mut self, corners: [[f32; 3]; 4], color: [f32; 4]) {
        self.push_quad(corners, color);
    }

    /// Draw a filled axis-aligned rectangle at depth `z`.
    pub fn draw_rect(&mut self, min: [f32; 2], max: [f32; 2], z: f32, color: [f32; 4]) {
        self.push_quad(rect_corners(min, max, z), color);
    }

    /// Draw a segment `width` wide as a filled quad.
    ///
    /// Degenerate segments (both ends equal) draw nothing.
    pub fn draw_thick_line(
        &mut self,
        start: [f32; 2],
        end: [f32; 2],
        width: f32,
        z: f32,
        color: [f32; 4],
    ) {
        let (dx, dy) = (end[0] - start[0], end[1] - start[1]);
        let length = (dx * dx + dy * dy).sqrt();
        if length <= f32::EPSILON {
            return;
        }
        // Half-width normal
        let nx = -dy / length * width * 0.5;
        let ny = dx / length * width * 0.5;
        self.push_quad(
            [
                [start[0] + nx, start[1] + ny, z],
                [start[0] - nx, start[1] - ny, z],
                [end[0] - nx, end[1] - ny, z],
                [end[0] + nx, end[1] + ny, z],
            ],
            color,
        );
    }
}

fn rect_corners(min: [f32; 2], max: [f32; 2], z: f32) -> [[f32; 3]; 4] {
    [
        [min[0], min[1], z],
        [max[0], min[1], z],
        [max[0], max[1], z],
        [min[0], max[1], z],
    ]
}
