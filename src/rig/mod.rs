//! Responsive pose rig: viewport-mode pose table, scroll keyframes, and
//! the damped interpolation state advanced once per render tick.

pub mod keyframes;
pub mod pose;
pub mod state;

pub use keyframes::{Keyframe, KeyframeTrack, Pager};
pub use pose::{cover_fraction, height_factor, pose_for, Pose, ViewportMode};
pub use state::{damp, damp_vec3, responsive_scale, RigFrame, RigState};
