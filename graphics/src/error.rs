//! Graphics error types.

use std::fmt;

/// Errors that can occur in the streaming layer.
///
/// Construction-time and usage-contract violations are reported through this
/// type. Steady-state diagnostics (discarded buffers, fence stalls) are
/// exposed as counters on [`StreamerStats`](crate::stream::StreamerStats)
/// instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphicsError {
    /// No streaming strategy is supported by the active graphics context.
    UnsupportedPlatform(String),
    /// A vertex layout or index pattern is malformed.
    InvalidLayout(String),
    /// `bind` was called while a different shader is bound.
    AlreadyBound,
    /// `render` was called without a bound shader.
    NotBound,
    /// The driver reported an error instead of signaling a fence.
    FenceWaitFailed(String),
    /// Failed to create a GPU resource.
    ResourceCreationFailed(String),
    /// Failed to map buffer memory into the CPU address space.
    MapFailed(String),
    /// An invalid parameter was provided.
    InvalidParameter(String),
    /// The streamer has already been disposed.
    Disposed,
}

impl fmt::Display for GraphicsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedPlatform(msg) => write!(f, "unsupported platform: {msg}"),
            Self::InvalidLayout(msg) => write!(f, "invalid layout: {msg}"),
            Self::AlreadyBound => write!(f, "a different shader is already bound"),
            Self::NotBound => write!(f, "no shader is bound"),
            Self::FenceWaitFailed(msg) => write!(f, "fence wait failed: {msg}"),
            Self::ResourceCreationFailed(msg) => write!(f, "resource creation failed: {msg}"),
            Self::MapFailed(msg) => write!(f, "buffer mapping failed: {msg}"),
            Self::InvalidParameter(msg) => write!(f, "invalid parameter: {msg}"),
            Self::Disposed => write!(f, "streamer has been disposed"),
        }
    }
}

impl std::error::Error for GraphicsError {}
