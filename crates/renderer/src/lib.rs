//! Off-screen frame-source renderer for framebridge.
//!
//! The crate couples a continuously rendering GPU worker with an on-demand
//! pixel capture path, the two meeting only at a per-context lock:
//!
//! ```text
//!   open_session ──▶ SurfaceContext ──▶ render worker thread ──▶ draw/submit
//!        │                 ▲   (bind = lock, unbind = guard drop)
//!        │                 │
//!        └─▶ FrameSource ──┘◀── capture(w, h) from any consumer thread
//!                  │
//!                  └─▶ FrameCache (latest RGBA frame, resized on demand)
//! ```
//!
//! `SurfaceContext` owns the off-screen color target plus the readback
//! plumbing and is never touched without holding its guard. The render worker
//! re-acquires the guard once per frame and releases it before pacing, so a
//! capture is never starved for longer than one frame's encoding. The
//! `FrameSource` handed to the consumer sizes its cache from the
//! scale-adjusted request, reads the latest pixels back under the same guard,
//! and returns a view that borrows the cache, so the borrow checker enforces
//! the "valid until the next capture" contract.

mod capture;
mod compile;
mod context;
mod math;
mod pipeline;
mod pixels;
mod session;
mod types;
mod worker;

pub use capture::{CaptureError, CapturedFrame, FrameSource};
pub use context::{CloseSignal, ReadbackError, SharedContext, SurfaceContext};
pub use pixels::{AllocationError, FrameCache};
pub use session::{
    open_session, open_session_with_resolver, FrameSink, RenderSession, SourceId,
};
pub use types::{RenderPayload, SessionConfig};
pub use worker::LoopPhase;
