//! Streamer configuration.

/// Default size of a streamer's first vertex buffer (64 KiB).
pub const DEFAULT_INITIAL_CAPACITY: u64 = 64 * 1024;

/// Default capacity above which a persistent ring stops growing (4 MiB).
pub const DEFAULT_MAX_GROWTH_CAPACITY: u64 = 4 * 1024 * 1024;

/// Configuration shared by all streaming strategies.
///
/// # Example
///
/// ```ignore
/// let config = StreamerConfig::new()
///     .with_initial_capacity(1600)
///     .with_label("glyphs");
/// let streamer = factory.create(layout, None, &config)?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StreamerConfig {
    /// Size in bytes of the first vertex buffer. Rounded up to whole vertices.
    pub initial_capacity: u64,
    /// Persistent rings grow after a stall only while below this size.
    pub max_growth_capacity: u64,
    /// Debug label for the buffers the streamer creates.
    pub label: Option<String>,
}

impl StreamerConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self {
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            max_growth_capacity: DEFAULT_MAX_GROWTH_CAPACITY,
            label: None,
        }
    }

    /// Set the initial buffer size in bytes.
    pub fn with_initial_capacity(mut self, bytes: u64) -> Self {
        self.initial_capacity = bytes;
        self
    }

    /// Set the growth ceiling in bytes.
    pub fn with_max_growth_capacity(mut self, bytes: u64) -> Self {
        self.max_growth_capacity = bytes;
        self
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Initial capacity rounded up to a whole number of vertices, at least one.
    pub fn initial_capacity_for(&self, stride: u32) -> u64 {
        let stride = u64::from(stride.max(1));
        self.initial_capacity.div_ceil(stride).max(1) * stride
    }

    /// Label for a buffer of this streamer.
    pub(crate) fn buffer_label(&self, suffix: &str) -> String {
        match &self.label {
            Some(label) => format!("{label}_{suffix}"),
            None => format!("stream_{suffix}"),
        }
    }
}

impl Default for StreamerConfig {
    fn default() -> Self {
        Self::new()
    }
}
