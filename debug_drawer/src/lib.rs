//! Debug drawing utilities for Streamline.
//!
//! Immediate-mode debug lines and filled quads, collected from any thread
//! with one-frame latency and streamed through primitive batchers.
//!
//! # Architecture
//!
//! - [`DebugDrawer`] - Thread-safe accumulator (store as a shared resource)
//! - [`DebugDrawerContext`] - Short-lived drawing context (created per-system)
//! - [`DebugDrawerRenderer`] - Line and quad batchers on the context thread
//!
//! # Usage
//!
//! ```ignore
//! // Setup (once, on the context thread)
//! let drawer = Arc::new(DebugDrawer::new());
//! let mut renderer = DebugDrawerRenderer::new(&factory)?;
//!
//! // Each frame:
//! drawer.advance_tick();
//!
//! // From any thread:
//! let mut ctx = drawer.context();
//! ctx.draw_line([0.0, 0.0, 0.0], [1.0, 1.0, 1.0], [1.0, 0.0, 0.0, 1.0]);
//! ctx.draw_rect([0.0, 0.0], [0.5, 0.5], 0.0, [0.0, 0.0, 1.0, 0.5]);
//! drop(ctx); // or let it go out of scope
//!
//! // At render time:
//! let stats = renderer.render(&shader, &drawer.take_render_data())?;
//! ```

mod draw_api;
mod drawer;
mod renderer;
mod vertex;

pub use drawer::{DebugDrawer, DebugDrawerContext, DebugRenderData};
pub use renderer::{DebugDrawerRenderer, DebugRenderStats};
pub use vertex::DebugVertex;

#[cfg(test)]
mod tests {
    use super::*;

    static_assertions::assert_impl_all!(DebugDrawer: Send, Sync);
}
