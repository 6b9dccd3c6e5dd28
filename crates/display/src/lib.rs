//! Monitor topology and display-scale resolution.
//!
//! The renderer sizes its surfaces in physical pixels, but callers speak in
//! logical pixels. This crate answers the one question that bridges the two:
//! "what is the rendering scale of the display under this point?". The lookup
//! never fails: when the platform cannot be queried the resolver falls back
//! to a 1.0 scale so a session can always be created.

mod monitors;
mod resolver;

pub use monitors::{detect_display_server, detect_monitors, DisplayServer, MonitorInfo};
pub use resolver::{physical_extent, ScaleResolver};
