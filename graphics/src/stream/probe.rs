//! Capability probe and strategy selection.

use std::rc::Rc;
use std::sync::Arc;

use crate::backend::GpuBackend;
use crate::capabilities::CapabilitySet;
use crate::error::GraphicsError;
use crate::mesh::{IndexData, VertexLayout};

use super::config::StreamerConfig;
use super::{
    DiscardStreamer, LegacyStreamer, PersistentMappedStreamer, PrimitiveStreamer, StrategyKind,
};

type Constructor = fn(
    Rc<dyn GpuBackend>,
    Arc<VertexLayout>,
    Option<IndexData>,
    &StreamerConfig,
) -> Result<PrimitiveStreamer, GraphicsError>;

fn create_persistent(
    backend: Rc<dyn GpuBackend>,
    layout: Arc<VertexLayout>,
    indices: Option<IndexData>,
    config: &StreamerConfig,
) -> Result<PrimitiveStreamer, GraphicsError> {
    PersistentMappedStreamer::new(backend, layout, indices, config)
        .map(PrimitiveStreamer::PersistentMapped)
}

fn create_discard(
    backend: Rc<dyn GpuBackend>,
    layout: Arc<VertexLayout>,
    indices: Option<IndexData>,
    config: &StreamerConfig,
) -> Result<PrimitiveStreamer, GraphicsError> {
    DiscardStreamer::new(backend, layout, indices, config).map(PrimitiveStreamer::DiscardRespecify)
}

fn create_legacy(
    backend: Rc<dyn GpuBackend>,
    layout: Arc<VertexLayout>,
    indices: Option<IndexData>,
    config: &StreamerConfig,
) -> Result<PrimitiveStreamer, GraphicsError> {
    LegacyStreamer::new(backend, layout, indices, config).map(PrimitiveStreamer::Legacy)
}

/// Strategies with their constructors, highest priority first.
const STRATEGIES: [(StrategyKind, Constructor); 3] = [
    (StrategyKind::PersistentMapped, create_persistent),
    (StrategyKind::DiscardRespecify, create_discard),
    (StrategyKind::Legacy, create_legacy),
];

fn constructor_for(kind: StrategyKind) -> Constructor {
    match kind {
        StrategyKind::PersistentMapped => create_persistent,
        StrategyKind::DiscardRespecify => create_discard,
        StrategyKind::Legacy => create_legacy,
    }
}

/// Snapshot of the context's capabilities and the strategies they allow.
#[derive(Debug, Clone)]
pub struct CapabilityProbe {
    capabilities: CapabilitySet,
}

impl CapabilityProbe {
    /// Query the capabilities of `backend` once.
    pub fn new(backend: &dyn GpuBackend) -> Self {
        Self::from_capabilities(backend.capabilities())
    }

    /// Probe an existing capability snapshot.
    pub fn from_capabilities(capabilities: CapabilitySet) -> Self {
        Self { capabilities }
    }

    /// Get the capability snapshot.
    pub fn capabilities(&self) -> &CapabilitySet {
        &self.capabilities
    }

    /// Usable strategies, highest priority first.
    pub fn supported_strategies(&self) -> Vec<StrategyKind> {
        STRATEGIES
            .iter()
            .map(|(kind, _)| *kind)
            .filter(|kind| kind.is_supported(&self.capabilities))
            .collect()
    }

    /// Pick the highest priority usable strategy.
    ///
    /// # Errors
    ///
    /// Returns [`GraphicsError::UnsupportedPlatform`] if no strategy is usable.
    pub fn select(&self) -> Result<StrategyKind, GraphicsError> {
        self.supported_strategies()
            .first()
            .copied()
            .ok_or_else(|| self.unsupported("no streaming strategy is available"))
    }

    fn unsupported(&self, what: &str) -> GraphicsError {
        GraphicsError::UnsupportedPlatform(format!("{what} on a context with {}", self.capabilities))
    }
}

/// Creates streamers of one strategy, selected once.
///
/// # Example
///
/// ```ignore
/// let factory = StreamerFactory::new(Rc::clone(&backend))?;
/// log::info!("Streaming with {}", factory.kind());
/// let quads = factory.create(layout.clone(), Some(quad_indices), &config)?;
/// let lines = factory.create(layout, None, &config)?;
/// ```
#[derive(Clone)]
pub struct StreamerFactory {
    backend: Rc<dyn GpuBackend>,
    capabilities: CapabilitySet,
    kind: StrategyKind,
    constructor: Constructor,
}

impl StreamerFactory {
    /// Probe `backend` and select the best strategy it supports.
    pub fn new(backend: Rc<dyn GpuBackend>) -> Result<Self, GraphicsError> {
        let probe = CapabilityProbe::new(&*backend);
        let kind = probe.select()?;
        log::info!(
            "Selected {} streaming on {} ({})",
            kind,
            backend.name(),
            probe.capabilities()
        );
        Ok(Self::build(backend, probe, kind))
    }

    /// Use `kind` regardless of priority, if the backend supports it.
    pub fn with_strategy(
        backend: Rc<dyn GpuBackend>,
        kind: StrategyKind,
    ) -> Result<Self, GraphicsError> {
        let probe = CapabilityProbe::new(&*backend);
        if !kind.is_supported(probe.capabilities()) {
            return Err(probe.unsupported(&format!("{kind} streaming is not available")));
        }
        log::info!("Using requested {} streaming on {}", kind, backend.name());
        Ok(Self::build(backend, probe, kind))
    }

    fn build(backend: Rc<dyn GpuBackend>, probe: CapabilityProbe, kind: StrategyKind) -> Self {
        Self {
            backend,
            capabilities: probe.capabilities,
            kind,
            constructor: constructor_for(kind),
        }
    }

    /// Get the selected strategy.
    pub fn kind(&self) -> StrategyKind {
        self.kind
    }

    /// Get the backend streamers are created on.
    pub fn backend(&self) -> &Rc<dyn GpuBackend> {
        &self.backend
    }

    /// Get the capability snapshot taken at creation.
    pub fn capabilities(&self) -> &CapabilitySet {
        &self.capabilities
    }

    /// Create a streamer of the selected strategy.
    pub fn create(
        &self,
        layout: Arc<VertexLayout>,
        indices: Option<IndexData>,
        config: &StreamerConfig,
    ) -> Result<PrimitiveStreamer, GraphicsError> {
        (self.constructor)(Rc::clone(&self.backend), layout, indices, config)
    }
}

impl std::fmt::Debug for StreamerFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamerFactory")
            .field("backend", &self.backend.name())
            .field("kind", &self.kind)
            .field("capabilities", &self.capabilities)
            .finish()
    }
}
