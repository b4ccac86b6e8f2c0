//! Scroll-indexed keyframes and anchor paging.
//!
//! Maps an absolute scroll sample to a fractional position over an ordered
//! list of section keyframes, and optionally pages between anchors with
//! settle detection.

use glam::Vec3;

use crate::config::KeyframeConfig;

use super::pose::Pose;

/// A pose anchored to a document section
#[derive(Debug, Clone)]
pub struct Keyframe {
    /// Section anchor selector, e.g. "#home"
    pub anchor: String,
    pub position: Vec3,
    pub rotation: glam::Quat,
    pub scale: f32,
}

impl From<&KeyframeConfig> for Keyframe {
    fn from(cfg: &KeyframeConfig) -> Self {
        let pose = Pose::from_euler_deg(Vec3::from(cfg.position), cfg.rotation_deg, cfg.scale);
        Self {
            anchor: cfg.anchor.clone(),
            position: pose.position,
            rotation: pose.rotation,
            scale: pose.scale,
        }
    }
}

/// Ordered keyframes plus their anchors' absolute page offsets.
///
/// Offsets are recomputed by the host on every layout-affecting event
/// (resize, orientation change, content load) and pushed in whole.
#[derive(Debug, Clone, Default)]
pub struct KeyframeTrack {
    keyframes: Vec<Keyframe>,
    offsets: Vec<f32>,
}

impl KeyframeTrack {
    pub fn new(keyframes: Vec<Keyframe>) -> Self {
        let offsets = vec![0.0; keyframes.len()];
        Self { keyframes, offsets }
    }

    pub fn from_config(configs: &[KeyframeConfig]) -> Self {
        Self::new(configs.iter().map(Keyframe::from).collect())
    }

    pub fn len(&self) -> usize {
        self.keyframes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keyframes.is_empty()
    }

    pub fn offsets(&self) -> &[f32] {
        &self.offsets
    }

    /// Replace the anchor offsets after a layout change. A mismatched
    /// count keeps the shared prefix and logs the rest.
    pub fn set_offsets(&mut self, offsets: &[f32]) {
        if offsets.len() != self.keyframes.len() {
            tracing::warn!(
                "layout reported {} anchor offsets for {} keyframes",
                offsets.len(),
                self.keyframes.len()
            );
        }
        let n = offsets.len().min(self.keyframes.len());
        self.offsets[..n].copy_from_slice(&offsets[..n]);
    }

    /// Map a scroll sample to `(segment_index, t)`.
    ///
    /// Before the first anchor: `(0, 0)`. Within `[anchor[i], anchor[i+1])`:
    /// `(i, clamp01((y - a) / (b - a)))`. Past the last anchor:
    /// `(last_segment, 1)`.
    pub fn segment_at(&self, y: f32) -> (usize, f32) {
        if self.offsets.len() < 2 {
            return (0, 0.0);
        }
        if y < self.offsets[0] {
            return (0, 0.0);
        }
        for i in 0..self.offsets.len() - 1 {
            let start = self.offsets[i];
            let end = self.offsets[i + 1];
            if y >= start && y < end {
                return (i, ((y - start) / (end - start)).clamp(0.0, 1.0));
            }
        }
        (self.offsets.len() - 2, 1.0)
    }

    /// Interpolated pose at a scroll sample: linear for position and scale,
    /// spherical for rotation.
    pub fn sample(&self, y: f32) -> Option<Pose> {
        if self.keyframes.is_empty() {
            return None;
        }
        if self.keyframes.len() == 1 {
            let k = &self.keyframes[0];
            let mut pose = Pose::from_euler_deg(k.position, [0.0; 3], k.scale);
            pose.rotation = k.rotation;
            return Some(pose);
        }

        let (i, t) = self.segment_at(y);
        let a = &self.keyframes[i];
        let b = &self.keyframes[i + 1];
        let mut pose = Pose::from_euler_deg(a.position.lerp(b.position, t), [0.0; 3], 0.0);
        pose.rotation = a.rotation.slerp(b.rotation, t);
        pose.scale = a.scale + (b.scale - a.scale) * t;
        Some(pose)
    }

    /// Index of the anchor nearest to a scroll position
    pub fn nearest_index(&self, y: f32) -> usize {
        let mut best = 0;
        let mut best_distance = f32::INFINITY;
        for (i, &offset) in self.offsets.iter().enumerate() {
            let d = (y - offset).abs();
            if d < best_distance {
                best_distance = d;
                best = i;
            }
        }
        best
    }
}

/// Anchor-to-anchor paging with settle suppression.
///
/// While a jump is pending, further jump requests are dropped; the pending
/// state clears once the observed scroll position settles within an epsilon
/// of the target anchor.
#[derive(Debug, Clone)]
pub struct Pager {
    current: usize,
    target: usize,
    paging: bool,
    settle_epsilon: f32,
}

impl Pager {
    pub fn new(settle_epsilon: f32) -> Self {
        Self {
            current: 0,
            target: 0,
            paging: false,
            settle_epsilon,
        }
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn is_paging(&self) -> bool {
        self.paging
    }

    /// Request a jump by a signed number of sections. Returns the scroll
    /// offset to jump to, or `None` while suppressed or without anchors.
    pub fn request_step(&mut self, direction: i32, track: &KeyframeTrack) -> Option<f32> {
        let index = self.current.saturating_add_signed(direction as isize);
        self.request_index(index, track)
    }

    /// Request a jump to an explicit section index
    pub fn request_index(&mut self, index: usize, track: &KeyframeTrack) -> Option<f32> {
        if self.paging || track.is_empty() {
            return None;
        }
        let index = index.min(track.len() - 1);
        self.target = index;
        self.paging = true;
        Some(track.offsets()[index])
    }

    /// Observe the live scroll position; arrival within the epsilon ends
    /// the jump and commits the target as current.
    pub fn observe(&mut self, scroll_y: f32, track: &KeyframeTrack) {
        if !self.paging {
            return;
        }
        let Some(&target_offset) = track.offsets().get(self.target) else {
            self.paging = false;
            return;
        };
        if (scroll_y - target_offset).abs() < self.settle_epsilon {
            self.paging = false;
            self.current = self.target;
        }
    }

    /// Re-sync the current index to the nearest anchor after a layout
    /// change.
    pub fn resync(&mut self, scroll_y: f32, track: &KeyframeTrack) {
        if !track.is_empty() {
            self.current = track.nearest_index(scroll_y);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn track() -> KeyframeTrack {
        let mut track = KeyframeTrack::from_config(&Config::default().keyframes);
        track.set_offsets(&[0.0, 1000.0, 3000.0]);
        track
    }

    #[test]
    fn test_segment_mapping() {
        let track = track();
        assert_eq!(track.segment_at(500.0), (0, 0.5));
        assert_eq!(track.segment_at(-100.0), (0, 0.0));
        assert_eq!(track.segment_at(4000.0), (1, 1.0));
        assert_eq!(track.segment_at(1000.0), (1, 0.0));
        let (i, t) = track.segment_at(2000.0);
        assert_eq!(i, 1);
        assert!((t - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_sample_interpolates() {
        let track = track();
        let a = track.sample(0.0).unwrap();
        let mid = track.sample(500.0).unwrap();
        let b = track.sample(1000.0).unwrap();

        let expected = a.position.lerp(b.position, 0.5);
        assert!((mid.position - expected).length() < 1e-5);
        assert!((mid.scale - (a.scale + b.scale) * 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_single_anchor_track_is_constant() {
        let mut track = KeyframeTrack::from_config(&Config::default().keyframes[..1].to_vec());
        track.set_offsets(&[100.0]);
        assert_eq!(track.segment_at(5000.0), (0, 0.0));
        assert!(track.sample(5000.0).is_some());
    }

    #[test]
    fn test_pager_suppresses_until_settled() {
        let track = track();
        let mut pager = Pager::new(2.0);

        let target = pager.request_step(1, &track).unwrap();
        assert_eq!(target, 1000.0);
        assert!(pager.is_paging());

        // Further requests are dropped while in flight
        assert!(pager.request_step(1, &track).is_none());

        // Not yet within the epsilon
        pager.observe(900.0, &track);
        assert!(pager.is_paging());

        pager.observe(999.2, &track);
        assert!(!pager.is_paging());
        assert_eq!(pager.current(), 1);

        // Settled: the next request goes through
        assert_eq!(pager.request_step(1, &track).unwrap(), 3000.0);
    }

    #[test]
    fn test_pager_clamps_at_ends() {
        let track = track();
        let mut pager = Pager::new(2.0);
        // Stepping back from the first section stays at the first anchor
        assert_eq!(pager.request_step(-1, &track).unwrap(), 0.0);
    }

    #[test]
    fn test_resync_picks_nearest_anchor() {
        let track = track();
        let mut pager = Pager::new(2.0);
        pager.resync(2600.0, &track);
        assert_eq!(pager.current(), 2);
        pager.resync(400.0, &track);
        assert_eq!(pager.current(), 0);
    }
}
