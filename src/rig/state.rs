//! Live rig state and damped interpolation.
//!
//! The render loop is the only writer: once per frame the state moves a
//! fixed fraction of the remaining distance toward its target pose, which
//! yields exponential convergence without ever overshooting.

use glam::{EulerRot, Quat, Vec2, Vec3};
use serde::Serialize;

use crate::config::RigTuning;
use crate::host::HostInput;
use crate::scene::CameraNode;

use super::pose::{self, Pose};

/// Light/shadow fallbacks for poses without environmental overrides
const DEFAULT_LIGHT_POSITION: Vec3 = Vec3::new(-1.2, 6.0, 4.0);
const DEFAULT_SHADOW_OPACITY: f32 = 0.18;
const DEFAULT_SHADOW_RADIUS: f32 = 4.0;

/// Fixed-fraction step toward a target
pub fn damp(current: f32, target: f32, ratio: f32) -> f32 {
    current + (target - current) * ratio
}

pub fn damp_vec3(current: Vec3, target: Vec3, ratio: f32) -> Vec3 {
    current + (target - current) * ratio
}

/// Per-tick transform published to the rendering collaborator
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RigFrame {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: f32,
    pub light_position: Vec3,
    pub shadow_opacity: f32,
    pub shadow_radius: f32,
}

/// The live, continuously-mutated rig transform
#[derive(Debug, Clone)]
pub struct RigState {
    position: Vec3,
    rotation: Quat,
    scale: f32,
    light_position: Vec3,
    shadow_opacity: f32,
    shadow_radius: f32,
    /// Damped pointer signal feeding the tilt offset
    pointer: Vec2,
}

impl RigState {
    /// State snapped to a pose, with environmental defaults filled in
    pub fn at(pose: &Pose) -> Self {
        Self {
            position: pose.position,
            rotation: pose.rotation,
            scale: pose.scale,
            light_position: pose.light_position.unwrap_or(DEFAULT_LIGHT_POSITION),
            shadow_opacity: pose.shadow_opacity.unwrap_or(DEFAULT_SHADOW_OPACITY),
            shadow_radius: pose.shadow_radius.unwrap_or(DEFAULT_SHADOW_RADIUS),
            pointer: Vec2::ZERO,
        }
    }

    /// Advance one frame toward the target pose.
    ///
    /// Position, scale, and light/shadow parameters damp by the fixed
    /// ratio; rotation slerps toward the pose rotation composed with the
    /// pointer-tilt offset. A reduced-motion host collapses both ratios to
    /// 1.0 so the rig snaps instead of animating.
    pub fn advance(&mut self, target: &Pose, input: &HostInput, tuning: &RigTuning) -> RigFrame {
        let (ease, tilt_ease) = if input.reduced_motion {
            (1.0, 1.0)
        } else {
            (tuning.ease, tuning.tilt_ease)
        };

        // The pointer signal is damped independently before it maps to a
        // bounded yaw/pitch offset
        let raw = Vec2::new(input.pointer_x, input.pointer_y);
        self.pointer += (raw - self.pointer) * tilt_ease;
        let yaw = -self.pointer.x * tuning.max_yaw_deg.to_radians();
        let pitch = self.pointer.y * tuning.max_pitch_deg.to_radians();
        let tilt = Quat::from_euler(EulerRot::XYZ, pitch, yaw, 0.0);

        let target_rotation = target.rotation * tilt;
        self.rotation = self.rotation.slerp(target_rotation, ease).normalize();

        self.position = damp_vec3(self.position, target.position, ease);
        self.scale = damp(self.scale, target.scale, ease);
        self.light_position = damp_vec3(
            self.light_position,
            target.light_position.unwrap_or(DEFAULT_LIGHT_POSITION),
            ease,
        );
        self.shadow_opacity = damp(
            self.shadow_opacity,
            target.shadow_opacity.unwrap_or(DEFAULT_SHADOW_OPACITY),
            ease,
        );
        self.shadow_radius = damp(
            self.shadow_radius,
            target.shadow_radius.unwrap_or(DEFAULT_SHADOW_RADIUS),
            ease,
        );

        self.frame()
    }

    pub fn frame(&self) -> RigFrame {
        RigFrame {
            position: self.position,
            rotation: self.rotation,
            scale: self.scale,
            light_position: self.light_position,
            shadow_opacity: self.shadow_opacity,
            shadow_radius: self.shadow_radius,
        }
    }
}

/// Responsive scale from the camera-to-rig distance, the camera's vertical
/// field of view, and the model's pre-scale bounding-sphere radius.
pub fn responsive_scale(
    camera: &CameraNode,
    rig_position: Vec3,
    base_radius: f32,
    input: &HostInput,
    tuning: &RigTuning,
) -> f32 {
    let distance = (camera.position - rig_position).length();
    let cover = pose::cover_fraction(input.width)
        * pose::height_factor(input.height, tuning.height_reference, tuning.min_height_factor);
    let half_height = distance * (camera.fov_y * 0.5).tan();
    let scale = cover * half_height / base_radius.max(f32::EPSILON);
    scale.clamp(tuning.min_scale, tuning.max_scale)
}
