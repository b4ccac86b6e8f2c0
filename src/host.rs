//! Host environment input snapshot.
//!
//! The hosting document reports viewport geometry, scroll position, pointer
//! coordinates, and the reduced-motion preference through the web bridge;
//! the render loop reads one immutable snapshot per tick.

use serde::{Deserialize, Serialize};

/// Viewport orientation, derived from width and height
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Landscape,
    Portrait,
}

/// Snapshot of host-environment signals consumed by the render loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostInput {
    /// Viewport width in CSS pixels
    pub width: f32,
    /// Viewport height in CSS pixels
    pub height: f32,
    /// Absolute scroll offset in CSS pixels
    pub scroll_y: f32,
    /// Pointer position normalized to [-1, 1] on both axes
    pub pointer_x: f32,
    pub pointer_y: f32,
    /// Host prefers-reduced-motion setting
    pub reduced_motion: bool,
}

impl Default for HostInput {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 800.0,
            scroll_y: 0.0,
            pointer_x: 0.0,
            pointer_y: 0.0,
            reduced_motion: false,
        }
    }
}

impl HostInput {
    /// Orientation derived from the viewport box
    pub fn orientation(&self) -> Orientation {
        if self.width >= self.height {
            Orientation::Landscape
        } else {
            Orientation::Portrait
        }
    }

    /// Scroll sample point used by the keyframe mapper: the vertical
    /// midpoint of the viewport in document coordinates.
    pub fn scroll_sample(&self) -> f32 {
        self.scroll_y + self.height * 0.5
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orientation() {
        let mut input = HostInput::default();
        assert_eq!(input.orientation(), Orientation::Landscape);

        input.width = 500.0;
        input.height = 900.0;
        assert_eq!(input.orientation(), Orientation::Portrait);
    }

    #[test]
    fn test_scroll_sample_is_viewport_midpoint() {
        let input = HostInput {
            scroll_y: 100.0,
            height: 800.0,
            ..Default::default()
        };
        assert_eq!(input.scroll_sample(), 500.0);
    }
}
