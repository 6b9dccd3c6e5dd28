//! Session lifecycle: scale-resolved setup, worker ownership, registration.

use std::fmt;
use std::sync::Arc;
use std::thread::JoinHandle;

use anyhow::{anyhow, Result};
use display::{physical_extent, ScaleResolver};

use crate::capture::FrameSource;
use crate::context::{CloseSignal, SharedContext, SurfaceContext};
use crate::types::SessionConfig;
use crate::worker::{self, LoopPhase, PhaseCell};

/// Opaque identifier for a registered frame source. Zero is a valid id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(u64);

impl SourceId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The external frame-consumption subsystem the core registers sources with.
pub trait FrameSink {
    fn register_source(&self, source: Arc<FrameSource>) -> SourceId;
}

/// A live render session: the registered source id, the owned worker thread,
/// and the signal that stops it.
///
/// The worker handle is retained so `close` can shut the session down
/// deterministically; dropping the session without closing it detaches the
/// worker (it keeps rendering for the life of the process, and the registered
/// source keeps serving captures).
pub struct RenderSession {
    source_id: SourceId,
    source: Arc<FrameSource>,
    close: CloseSignal,
    phase: Arc<PhaseCell>,
    worker: Option<JoinHandle<()>>,
}

impl RenderSession {
    /// The id under which the session's frame source was registered.
    pub fn source_id(&self) -> SourceId {
        self.source_id
    }

    /// Direct handle to the session's frame source.
    pub fn source(&self) -> &Arc<FrameSource> {
        &self.source
    }

    /// Current phase of the render worker.
    pub fn phase(&self) -> LoopPhase {
        self.phase.get()
    }

    /// Requests the worker to stop and joins it.
    pub fn close(mut self) -> Result<()> {
        self.close.request_close();
        if let Some(handle) = self.worker.take() {
            handle
                .join()
                .map_err(|_| anyhow!("render worker panicked"))?;
        }
        Ok(())
    }
}

impl Drop for RenderSession {
    fn drop(&mut self) {
        if self.worker.is_some() {
            tracing::debug!(
                source_id = %self.source_id,
                "render session dropped without close; worker detached"
            );
        }
    }
}

/// Opens a render session for a logical-size request.
///
/// Resolves the display scale at the configured anchor, creates the surface
/// context at the physical size, starts the render worker, and registers the
/// capture source with `sink`. Returns as soon as the worker is spawned, so
/// a capture racing the first render observes a blank frame, which is fine
/// because the cache starts out zeroed.
///
/// Unlike a fatal platform failure, an unusable GPU environment is reported
/// as an error so the calling layer can surface it.
pub fn open_session(config: SessionConfig, sink: &dyn FrameSink) -> Result<RenderSession> {
    open_session_with_resolver(config, sink, ScaleResolver::detect())
}

/// As [`open_session`], with an explicit scale resolver (tests, embedders
/// with their own monitor tracking).
pub fn open_session_with_resolver(
    config: SessionConfig,
    sink: &dyn FrameSink,
    resolver: ScaleResolver,
) -> Result<RenderSession> {
    let (anchor_x, anchor_y) = config.screen_anchor;
    let scale = resolver.resolve(anchor_x, anchor_y);
    let (physical_width, physical_height) =
        physical_extent(config.logical_width, config.logical_height, scale);

    tracing::info!(
        logical_width = config.logical_width,
        logical_height = config.logical_height,
        scale,
        physical_width,
        physical_height,
        "opening render session"
    );

    let context = SharedContext::new(SurfaceContext::new(physical_width, physical_height)?);
    let close = CloseSignal::new();
    let phase = Arc::new(PhaseCell::default());
    let worker = worker::spawn(
        context.clone(),
        config.payload.clone(),
        phase.clone(),
        close.clone(),
        config.target_fps,
    )?;

    let source = Arc::new(FrameSource::new(context, resolver, config.screen_anchor));
    let source_id = sink.register_source(source.clone());

    Ok(RenderSession {
        source_id,
        source,
        close,
        phase,
        worker: Some(worker),
    })
}
