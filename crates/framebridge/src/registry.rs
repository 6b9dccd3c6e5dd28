//! The consumer-side frame source registry.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use renderer::{CaptureError, CapturedFrame, FrameSink, FrameSource, SourceId};

/// Holds every registered frame source under its opaque id.
///
/// Ids are allocated monotonically starting at zero (zero is a valid id).
/// Captured frames only live as long as their borrow of the source, so the
/// registry exposes them through the scoped [`FrameRegistry::with_frame`]
/// accessor rather than by return value.
#[derive(Default)]
pub struct FrameRegistry {
    sources: Mutex<HashMap<u64, Arc<FrameSource>>>,
    next_id: AtomicU64,
}

impl FrameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a registered source.
    pub fn source(&self, id: SourceId) -> Option<Arc<FrameSource>> {
        self.sources
            .lock()
            .expect("registry lock poisoned")
            .get(&id.raw())
            .cloned()
    }

    /// Captures a frame from source `id` and hands it to `consume`.
    ///
    /// Returns `None` when the id is unknown; otherwise the capture result
    /// with `consume`'s output.
    pub fn with_frame<R>(
        &self,
        id: SourceId,
        logical_width: u32,
        logical_height: u32,
        consume: impl FnOnce(&CapturedFrame<'_>) -> R,
    ) -> Option<Result<R, CaptureError>> {
        let source = self.source(id)?;
        Some(
            source
                .capture(logical_width, logical_height)
                .map(|frame| consume(&frame)),
        )
    }

    /// Removes a source, e.g. when its session is torn down.
    pub fn unregister(&self, id: SourceId) -> bool {
        self.sources
            .lock()
            .expect("registry lock poisoned")
            .remove(&id.raw())
            .is_some()
    }

    pub fn len(&self) -> usize {
        self.sources.lock().expect("registry lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FrameSink for FrameRegistry {
    fn register_source(&self, source: Arc<FrameSource>) -> SourceId {
        let id = SourceId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.sources
            .lock()
            .expect("registry lock poisoned")
            .insert(id.raw(), source);
        tracing::debug!(%id, "registered frame source");
        id
    }
}
