//! Discrete viewport modes and their static pose table.

use glam::{EulerRot, Quat, Vec3};

use crate::host::Orientation;

/// Discrete bucket of viewport size and orientation, each mapped to one
/// static pose
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewportMode {
    DesktopXl,
    Desktop,
    Tablet,
    PhoneLandscape,
    PhonePortrait,
}

impl ViewportMode {
    /// Classify a viewport from width breakpoints plus an orientation check
    pub fn classify(width: f32, orientation: Orientation) -> Self {
        if width >= 1440.0 {
            ViewportMode::DesktopXl
        } else if width >= 1280.0 {
            ViewportMode::Desktop
        } else if width >= 760.0 {
            ViewportMode::Tablet
        } else if orientation == Orientation::Landscape {
            ViewportMode::PhoneLandscape
        } else {
            ViewportMode::PhonePortrait
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ViewportMode::DesktopXl => "desktop-xl",
            ViewportMode::Desktop => "desktop",
            ViewportMode::Tablet => "tablet",
            ViewportMode::PhoneLandscape => "phone-landscape",
            ViewportMode::PhonePortrait => "phone-portrait",
        }
    }
}

/// A named static target transform plus optional environmental overrides
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: Quat,
    /// Uniform scale
    pub scale: f32,
    pub light_position: Option<Vec3>,
    pub shadow_opacity: Option<f32>,
    pub shadow_radius: Option<f32>,
}

impl Pose {
    /// Pose from a position, XYZ Euler rotation in degrees, and a scale
    pub fn from_euler_deg(position: Vec3, rotation_deg: [f32; 3], scale: f32) -> Self {
        Self {
            position,
            rotation: Quat::from_euler(
                EulerRot::XYZ,
                rotation_deg[0].to_radians(),
                rotation_deg[1].to_radians(),
                rotation_deg[2].to_radians(),
            ),
            scale,
            light_position: None,
            shadow_opacity: None,
            shadow_radius: None,
        }
    }
}

/// The static pose table. The `match` keeps it exhaustive over the mode
/// enumeration.
pub fn pose_for(mode: ViewportMode) -> Pose {
    match mode {
        ViewportMode::DesktopXl => Pose {
            light_position: Some(Vec3::new(-1.2, 6.0, 4.0)),
            shadow_opacity: Some(0.18),
            ..Pose::from_euler_deg(Vec3::new(1.1, 0.4, 2.4), [0.0, -35.0, 0.0], 1.2)
        },
        ViewportMode::Desktop => {
            Pose::from_euler_deg(Vec3::new(1.0, 0.5, 2.7), [0.0, -43.0, 0.0], 1.15)
        }
        ViewportMode::Tablet => Pose {
            shadow_opacity: Some(0.15),
            ..Pose::from_euler_deg(Vec3::new(0.6, 0.55, 2.2), [0.0, -24.0, 0.0], 1.0)
        },
        ViewportMode::PhoneLandscape => {
            Pose::from_euler_deg(Vec3::new(0.4, 0.35, 1.8), [0.0, -18.0, 0.0], 0.85)
        }
        ViewportMode::PhonePortrait => Pose {
            light_position: Some(Vec3::new(0.0, 5.0, 3.0)),
            shadow_radius: Some(6.0),
            ..Pose::from_euler_deg(Vec3::new(0.0, 0.75, 1.2), [0.0, -8.0, 0.0], 0.7)
        },
    }
}

/// Step function of viewport width: wider viewports let the model occupy a
/// larger on-screen fraction.
pub fn cover_fraction(width: f32) -> f32 {
    if width >= 1440.0 {
        0.42
    } else if width >= 1280.0 {
        0.38
    } else if width >= 760.0 {
        0.34
    } else {
        0.30
    }
}

/// Clamped height factor shrinking the apparent model on short viewports
pub fn height_factor(height: f32, reference: f32, min_factor: f32) -> f32 {
    (height / reference.max(1.0)).clamp(min_factor, 1.0)
}
