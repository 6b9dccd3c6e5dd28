/// Demonstration workload drawn by the render worker.
///
/// The payload stands in for arbitrary rendering logic; sessions that only
/// exercise the frame plumbing keep the default.
#[derive(Clone, Debug)]
pub enum RenderPayload {
    /// A colored triangle spinning with elapsed time, projected with the
    /// surface's aspect ratio.
    Triangle,
    /// A caller-supplied GLSL fragment shader evaluated over the full
    /// surface. The source provides `mainImage(out vec4 color, in vec2
    /// fragCoord)` and may use the `uTime`, `uTimeDelta`, `uFrame`, `uAspect`
    /// and `uResolution` macros injected by the wrapper.
    Fragment {
        source: String,
    },
}

impl Default for RenderPayload {
    fn default() -> Self {
        Self::Triangle
    }
}

/// Immutable configuration for one render session.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Requested surface size in logical pixels; scale adjustment happens at
    /// session setup.
    pub logical_width: u32,
    pub logical_height: u32,
    /// Virtual-desktop point used to pick the display whose scale applies.
    pub screen_anchor: (i32, i32),
    /// Optional FPS cap for the render worker; `None` renders back to back.
    pub target_fps: Option<f32>,
    /// Workload drawn each frame.
    pub payload: RenderPayload,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            logical_width: 1280,
            logical_height: 720,
            screen_anchor: (0, 0),
            target_fps: Some(60.0),
            payload: RenderPayload::default(),
        }
    }
}

impl SessionConfig {
    /// Convenience constructor for the common size-only request.
    pub fn sized(logical_width: u32, logical_height: u32) -> Self {
        Self {
            logical_width,
            logical_height,
            ..Self::default()
        }
    }
}
