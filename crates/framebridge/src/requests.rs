//! Typed creation requests parsed at the collaborator boundary.

use anyhow::{Context, Result};
use serde::Deserialize;

/// Upper bound on a requested logical extent; generous enough for any real
/// display, small enough to reject nonsense before it reaches the GPU.
pub const MAX_SURFACE_DIM: u32 = 16_384;

/// A validated "create a render surface" request.
///
/// The wire shape is a loose argument map; this type is the only way width
/// and height enter the core, so bounds are checked here once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct CreateSurfaceRequest {
    pub width: u32,
    pub height: u32,
}

impl CreateSurfaceRequest {
    /// Parses and validates a request from a JSON argument map.
    pub fn from_args(args: &serde_json::Value) -> Result<Self> {
        let request: Self = serde_json::from_value(args.clone())
            .context("createSurface arguments must be a map with integer width and height")?;
        request.validate()?;
        Ok(request)
    }

    pub fn validate(&self) -> Result<()> {
        if self.width > MAX_SURFACE_DIM || self.height > MAX_SURFACE_DIM {
            anyhow::bail!(
                "requested surface {}x{} exceeds the {MAX_SURFACE_DIM} pixel per-axis limit",
                self.width,
                self.height
            );
        }
        Ok(())
    }
}
