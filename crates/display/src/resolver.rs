//! Point-to-scale lookup over a monitor snapshot.

use crate::monitors::{detect_monitors, MonitorInfo};

/// Resolves the display scale factor for a virtual-desktop point.
///
/// The resolver holds a snapshot of the monitor layout taken at construction.
/// `resolve` is a pure query: it picks the monitor containing the point, or
/// the nearest one when the point is off-screen, and reports its scale. It
/// can be called from any thread and never fails; an empty snapshot or a
/// nonsensical reported scale degrades to 1.0.
#[derive(Debug, Clone)]
pub struct ScaleResolver {
    monitors: Vec<MonitorInfo>,
}

impl ScaleResolver {
    /// Builds a resolver from the current platform monitor layout.
    pub fn detect() -> Self {
        Self::with_monitors(detect_monitors())
    }

    /// Builds a resolver over an explicit monitor list.
    pub fn with_monitors(monitors: Vec<MonitorInfo>) -> Self {
        Self { monitors }
    }

    /// Returns the scale factor of the display covering `(x, y)`, falling
    /// back to the nearest display, then to 1.0.
    pub fn resolve(&self, x: i32, y: i32) -> f64 {
        let monitor = self
            .monitors
            .iter()
            .find(|m| m.contains(x, y))
            .or_else(|| self.nearest(x, y));

        match monitor {
            Some(m) if m.scale_factor > 0.0 => m.scale_factor,
            Some(m) => {
                tracing::warn!(
                    name = %m.name,
                    scale = m.scale_factor,
                    "monitor reported a non-positive scale; using 1.0"
                );
                1.0
            }
            None => 1.0,
        }
    }

    fn nearest(&self, x: i32, y: i32) -> Option<&MonitorInfo> {
        self.monitors
            .iter()
            .min_by_key(|m| rect_distance_sq(m, x, y))
    }
}

impl Default for ScaleResolver {
    fn default() -> Self {
        Self::detect()
    }
}

/// Squared distance from a point to a monitor rectangle (0 when inside).
fn rect_distance_sq(m: &MonitorInfo, x: i32, y: i32) -> i64 {
    let dx = axis_distance(x, m.x, m.width);
    let dy = axis_distance(y, m.y, m.height);
    dx * dx + dy * dy
}

fn axis_distance(p: i32, start: i32, extent: u32) -> i64 {
    let p = i64::from(p);
    let lo = i64::from(start);
    let hi = lo + i64::from(extent) - 1;
    if p < lo {
        lo - p
    } else if p > hi {
        p - hi
    } else {
        0
    }
}

/// Converts a logical extent into physical pixels for a given scale factor.
///
/// Truncating, matching how window systems round surface sizes down; a zero
/// logical extent stays zero.
pub fn physical_extent(logical_width: u32, logical_height: u32, scale: f64) -> (u32, u32) {
    let width = (logical_width as f64 * scale) as u32;
    let height = (logical_height as f64 * scale) as u32;
    (width, height)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monitor(name: &str, x: i32, y: i32, width: u32, height: u32, scale: f64) -> MonitorInfo {
        MonitorInfo {
            name: name.to_string(),
            width,
            height,
            x,
            y,
            scale_factor: scale,
            primary: x == 0 && y == 0,
        }
    }

    fn dual_layout() -> Vec<MonitorInfo> {
        vec![
            monitor("left", 0, 0, 1920, 1080, 1.0),
            monitor("right", 1920, 0, 3840, 2160, 2.0),
        ]
    }

    #[test]
    fn resolves_containing_monitor() {
        let resolver = ScaleResolver::with_monitors(dual_layout());
        assert_eq!(resolver.resolve(100, 100), 1.0);
        assert_eq!(resolver.resolve(2000, 100), 2.0);
    }

    #[test]
    fn off_screen_point_uses_nearest_monitor() {
        let resolver = ScaleResolver::with_monitors(dual_layout());
        // Just right of the right monitor's far edge.
        assert_eq!(resolver.resolve(6000, 100), 2.0);
        // Above the left monitor.
        assert_eq!(resolver.resolve(10, -500), 1.0);
    }

    #[test]
    fn empty_snapshot_falls_back_to_unity() {
        let resolver = ScaleResolver::with_monitors(Vec::new());
        assert_eq!(resolver.resolve(0, 0), 1.0);
    }

    #[test]
    fn non_positive_scale_is_clamped_to_unity() {
        let resolver = ScaleResolver::with_monitors(vec![monitor("bad", 0, 0, 800, 600, 0.0)]);
        assert_eq!(resolver.resolve(10, 10), 1.0);
    }

    #[test]
    fn physical_extent_applies_scale() {
        assert_eq!(physical_extent(100, 100, 2.0), (200, 200));
        assert_eq!(physical_extent(1920, 1080, 1.25), (2400, 1350));
        assert_eq!(physical_extent(0, 50, 2.0), (0, 100));
    }
}
