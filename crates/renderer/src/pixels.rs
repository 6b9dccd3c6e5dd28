//! The frame buffer cache: the latest captured frame as owned bytes.

use thiserror::Error;

/// Reallocation failed; the cache's previous contents are untouched.
#[derive(Debug, Error)]
#[error("failed to allocate {requested} bytes for a {width}x{height} frame")]
pub struct AllocationError {
    pub width: u32,
    pub height: u32,
    pub requested: usize,
}

/// Owned RGBA8 pixel storage for the most recently captured frame.
///
/// Invariant: `bytes.len() == width * height * 4` at all times. The buffer is
/// reallocated only when the requested dimensions differ from the stored
/// ones; both growth and shrink replace the allocation exactly, so capacity
/// never drifts from the frame size. Rows are stored top-to-bottom.
#[derive(Debug, Default)]
pub struct FrameCache {
    width: u32,
    height: u32,
    bytes: Vec<u8>,
}

impl FrameCache {
    /// An empty 0x0 cache; the state before the first successful capture.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Resizes the backing storage to `width * height * 4` bytes.
    ///
    /// Returns whether a reallocation happened. The fresh buffer is allocated
    /// before the old one is released, so an allocation failure leaves the
    /// previous frame intact and is reported to the caller.
    pub(crate) fn ensure_size(&mut self, width: u32, height: u32) -> Result<bool, AllocationError> {
        if self.width == width && self.height == height {
            return Ok(false);
        }

        let requested = width as usize * height as usize * 4;
        let mut fresh = Vec::new();
        if fresh.try_reserve_exact(requested).is_err() {
            return Err(AllocationError {
                width,
                height,
                requested,
            });
        }
        fresh.resize(requested, 0);

        self.bytes = fresh;
        self.width = width;
        self.height = height;
        Ok(true)
    }

    /// Copies rows out of a row-aligned readback mapping into the cache.
    ///
    /// The source is `native_height` rows of `padded_bytes_per_row` bytes,
    /// top-to-bottom. Rows and columns are clipped to whichever of the native
    /// and cached extents is smaller; any remaining cache area keeps its
    /// previous contents.
    pub(crate) fn fill_from_padded(
        &mut self,
        padded: &[u8],
        native_width: u32,
        native_height: u32,
        padded_bytes_per_row: usize,
    ) {
        let cache_row = self.width as usize * 4;
        let copy_bytes = cache_row.min(native_width as usize * 4);
        let copy_rows = (self.height as usize).min(native_height as usize);

        for row in 0..copy_rows {
            let src_start = row * padded_bytes_per_row;
            let dst_start = row * cache_row;
            self.bytes[dst_start..dst_start + copy_bytes]
                .copy_from_slice(&padded[src_start..src_start + copy_bytes]);
        }
    }
}
