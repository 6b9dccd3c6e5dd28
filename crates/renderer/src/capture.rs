//! Pull-based frame capture for consumer threads.

use std::sync::{Mutex, MutexGuard};

use display::{physical_extent, ScaleResolver};
use thiserror::Error;

use crate::context::{ReadbackError, SharedContext};
use crate::pixels::{AllocationError, FrameCache};

/// Why a capture call produced no frame. The cache keeps its previous
/// contents on every error, so a later call can still succeed.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error(transparent)]
    Allocation(#[from] AllocationError),
    #[error(transparent)]
    Readback(#[from] ReadbackError),
}

/// The capture callback registered with the frame consumer.
///
/// Each `capture` call re-resolves the display scale, resizes the frame
/// cache when the scaled request changed, and reads the latest rendered
/// pixels back under the context lock. Frames are RGBA8, row-major,
/// **top-to-bottom**.
pub struct FrameSource {
    context: SharedContext,
    resolver: ScaleResolver,
    screen_anchor: (i32, i32),
    cache: Mutex<FrameCache>,
}

impl FrameSource {
    pub(crate) fn new(
        context: SharedContext,
        resolver: ScaleResolver,
        screen_anchor: (i32, i32),
    ) -> Self {
        Self {
            context,
            resolver,
            screen_anchor,
            cache: Mutex::new(FrameCache::new()),
        }
    }

    /// Captures the most recent frame at the scale-adjusted request size.
    ///
    /// The returned view borrows the internal cache and is valid until the
    /// next `capture` call; consumers that need to keep pixels longer must
    /// copy them out. A zero extent on either axis yields an empty frame
    /// without touching the GPU. Concurrent calls serialize on the cache
    /// lock, so a returned frame is never a torn mix of two renders.
    pub fn capture(
        &self,
        logical_width: u32,
        logical_height: u32,
    ) -> Result<CapturedFrame<'_>, CaptureError> {
        let scale = self.resolver.resolve(self.screen_anchor.0, self.screen_anchor.1);
        let (width, height) = physical_extent(logical_width, logical_height, scale);

        // Lock order: cache, then context. The render worker only ever takes
        // the context lock, so this order cannot deadlock.
        let mut cache = self.cache.lock().expect("frame cache lock poisoned");
        cache.ensure_size(width, height)?;

        if !cache.is_empty() {
            let ctx = self.context.bind();
            ctx.read_into(&mut cache)?;
        }

        Ok(CapturedFrame { cache })
    }
}

/// A borrowed view of the latest captured frame.
pub struct CapturedFrame<'a> {
    cache: MutexGuard<'a, FrameCache>,
}

impl CapturedFrame<'_> {
    /// Frame width in physical pixels.
    pub fn width(&self) -> u32 {
        self.cache.width()
    }

    /// Frame height in physical pixels.
    pub fn height(&self) -> u32 {
        self.cache.height()
    }

    /// RGBA8 pixel rows, top-to-bottom; `width() * height() * 4` bytes.
    pub fn bytes(&self) -> &[u8] {
        self.cache.bytes()
    }
}
