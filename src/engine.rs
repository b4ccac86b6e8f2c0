//! Render loop driver.
//!
//! One logical loop owns all per-frame mutation: it reads the host input
//! snapshot, derives the target pose (viewport-mode table or scroll
//! keyframes), damps the rig toward it, runs the capture throttle check,
//! and publishes the frame transform for the rendering collaborator.

use std::sync::Arc;
use std::time::Instant;

use crate::capture::{CaptureCanvas, CaptureSession, DocumentSource, ScreenTexture};
use crate::config::{CaptureConfig, Config, PagingConfig, RigDriverKind, RigTuning};
use crate::host::HostInput;
use crate::loader::LoadedModel;
use crate::rig::{
    pose_for, responsive_scale, KeyframeTrack, Pager, Pose, RigFrame, RigState, ViewportMode,
};
use crate::scene::{CameraNode, GroupNode, LightNode, SceneNode};
use crate::screen::{bind_screen_texture, ScreenBinding};

/// Target-pose source for the rig
enum PoseDriver {
    /// Discrete viewport-mode pose table
    Responsive { mode: ViewportMode },
    /// Scroll-indexed keyframes, optionally paged
    Scroll {
        track: KeyframeTrack,
        pager: Option<Pager>,
    },
}

/// The frame-driven core: scene, rig state, and capture session
pub struct Engine<S: DocumentSource> {
    scene: SceneNode,
    camera: CameraNode,
    base_radius: f32,
    rig: RigState,
    driver: PoseDriver,
    tuning: RigTuning,
    canvas: ScreenTexture,
    binding: Option<ScreenBinding>,
    session: Option<CaptureSession<S>>,
    capture_config: CaptureConfig,
    paging_config: PagingConfig,
    last_viewport: (f32, f32),
}

impl<S: DocumentSource> Engine<S> {
    /// Assemble the engine from a loaded model: bind the screen material,
    /// size the capture pipeline, and start the capture session. Without a
    /// material match the capture pipeline stays inert.
    pub fn new(model: LoadedModel, source: Arc<S>, config: &Config) -> Self {
        let canvas = CaptureCanvas::shared(
            config.screen.reference_height,
            config.screen.reference_height,
        );

        let camera = model.root.find_camera().cloned().unwrap_or_default();
        let mut scene = SceneNode::Group(GroupNode {
            name: "stage".to_string(),
            children: vec![
                SceneNode::Camera(camera.clone()),
                SceneNode::Light(LightNode::default()),
                model.root,
            ],
        });

        let binding = bind_screen_texture(&mut scene, &*source, &canvas, &config.screen);
        match &binding {
            Some(b) => tracing::info!(
                "screen texture bound to {:?} at {}x{} (aspect {:.3})",
                b.mesh_names,
                b.width,
                b.height,
                b.aspect
            ),
            None => tracing::info!(
                "no material named '{}'; capture pipeline inert",
                config.screen.target_material
            ),
        }

        let session = binding
            .is_some()
            .then(|| CaptureSession::start(source, Arc::clone(&canvas), &config.capture));

        let driver = match config.rig.driver {
            RigDriverKind::Responsive => {
                let input = HostInput::default();
                PoseDriver::Responsive {
                    mode: ViewportMode::classify(input.width, input.orientation()),
                }
            }
            RigDriverKind::Scroll => PoseDriver::Scroll {
                track: KeyframeTrack::from_config(&config.keyframes),
                pager: config
                    .paging
                    .enabled
                    .then(|| Pager::new(config.paging.settle_epsilon)),
            },
        };

        let initial = match &driver {
            PoseDriver::Responsive { mode } => pose_for(*mode),
            PoseDriver::Scroll { track, .. } => {
                // Anchor offsets are unknown until the first layout report;
                // start on the first keyframe
                track
                    .sample(f32::NEG_INFINITY)
                    .unwrap_or_else(|| pose_for(ViewportMode::Desktop))
            }
        };

        Self {
            scene,
            camera,
            base_radius: model.base_radius,
            rig: RigState::at(&initial),
            driver,
            tuning: config.rig.clone(),
            canvas,
            binding,
            session,
            capture_config: config.capture.clone(),
            paging_config: config.paging.clone(),
            last_viewport: (0.0, 0.0),
        }
    }

    /// Advance one frame: drain coalesced capture events, damp the rig,
    /// run the capture throttle check, and return the frame to submit.
    pub fn tick(&mut self, input: &HostInput, now: Instant) -> RigFrame {
        let target = self.target_pose(input);
        let frame = self.rig.advance(&target, input, &self.tuning);

        // The rig drives the key light and shadow softness
        if let Some(light) = self.scene.find_light_mut() {
            light.position = frame.light_position;
            light.shadow_radius = frame.shadow_radius;
        }

        if let Some(session) = &mut self.session {
            session.tick(now);
        }

        frame
    }

    /// Compute the tick's target pose from the active driver
    fn target_pose(&mut self, input: &HostInput) -> Pose {
        match &mut self.driver {
            PoseDriver::Responsive { mode } => {
                // Modes are only recomputed on resize/orientation change
                if (input.width, input.height) != self.last_viewport {
                    self.last_viewport = (input.width, input.height);
                    let next = ViewportMode::classify(input.width, input.orientation());
                    if next != *mode {
                        tracing::debug!("viewport mode: {} -> {}", mode.as_str(), next.as_str());
                        *mode = next;
                    }
                }

                let mut pose = pose_for(*mode);
                if self.base_radius > 0.0 {
                    pose.scale *= responsive_scale(
                        &self.camera,
                        pose.position,
                        self.base_radius,
                        input,
                        &self.tuning,
                    );
                }
                pose
            }
            PoseDriver::Scroll { track, pager } => {
                if let Some(pager) = pager {
                    pager.observe(input.scroll_y, track);
                }
                track
                    .sample(input.scroll_sample())
                    .unwrap_or_else(|| pose_for(ViewportMode::Desktop))
            }
        }
    }

    /// Apply recomputed anchor offsets after a host layout change
    pub fn set_anchor_offsets(&mut self, offsets: &[f32], scroll_y: f32) {
        if let PoseDriver::Scroll { track, pager } = &mut self.driver {
            track.set_offsets(offsets);
            if let Some(pager) = pager {
                pager.resync(scroll_y, track);
            }
        }
    }

    /// Paging request from the host: returns the scroll offset to jump to,
    /// or `None` while a jump is pending or paging is off.
    pub fn request_page_step(&mut self, direction: i32) -> Option<f32> {
        if let PoseDriver::Scroll {
            track,
            pager: Some(pager),
        } = &mut self.driver
        {
            pager.request_step(direction, track)
        } else {
            None
        }
    }

    /// Paging request to an explicit section index
    pub fn request_page_index(&mut self, index: usize) -> Option<f32> {
        if let PoseDriver::Scroll {
            track,
            pager: Some(pager),
        } = &mut self.driver
        {
            pager.request_index(index, track)
        } else {
            None
        }
    }

    /// Swap the source document: the old session (and its observer) is torn
    /// down, a fresh one re-arms against the new document's readiness.
    pub fn replace_source(&mut self, source: Arc<S>) {
        if self.binding.is_none() {
            return;
        }
        if let Some(binding) = &self.binding {
            source.set_viewport(binding.width, binding.height);
        }
        self.session = Some(CaptureSession::start(
            source,
            Arc::clone(&self.canvas),
            &self.capture_config,
        ));
    }

    pub fn canvas(&self) -> &ScreenTexture {
        &self.canvas
    }

    pub fn binding(&self) -> Option<&ScreenBinding> {
        self.binding.as_ref()
    }

    pub fn scene(&self) -> &SceneNode {
        &self.scene
    }

    pub fn paging_enabled(&self) -> bool {
        self.paging_config.enabled
    }
}

/// Run the render loop at the display rate until shutdown.
///
/// The loop is the sole driver of per-frame mutation: each tick it drains
/// bridge commands, reads the host input snapshot, advances the engine, and
/// publishes the resulting frame.
pub async fn run_render_loop<S: DocumentSource>(
    state: Arc<crate::StageState>,
    mut engine: Engine<S>,
    fps: f32,
) {
    let mut interval =
        tokio::time::interval(std::time::Duration::from_secs_f32(1.0 / fps.max(1.0)));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let mut shutdown = state.subscribe_shutdown();
    let mut commands = match state.take_command_rx().await {
        Some(rx) => rx,
        None => {
            tracing::error!("render loop already running");
            return;
        }
    };

    tracing::info!("render loop started at {} fps", fps);
    loop {
        tokio::select! {
            _ = interval.tick() => {
                // Bridge commands arrive between frames and drain here
                while let Ok(command) = commands.try_recv() {
                    match command {
                        crate::StageCommand::Layout { offsets, scroll_y } => {
                            engine.set_anchor_offsets(&offsets, scroll_y);
                        }
                        crate::StageCommand::PageStep(direction) => {
                            if let Some(offset) = engine.request_page_step(direction) {
                                state.publish_jump(crate::PageJump { offset });
                            }
                        }
                        crate::StageCommand::PageIndex(index) => {
                            if let Some(offset) = engine.request_page_index(index) {
                                state.publish_jump(crate::PageJump { offset });
                            }
                        }
                    }
                }

                let input = state.get_input().await;
                let frame = engine.tick(&input, Instant::now());
                state.publish_frame(frame);
            }
            _ = shutdown.recv() => break,
        }
    }
    tracing::info!("render loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::PushedDocument;
    use crate::config::RigDriverKind;
    use crate::loader::normalize_scene;
    use crate::scene::{Geometry, Material, MaterialGroup, MeshNode};
    use glam::Vec3;

    fn screen_model() -> LoadedModel {
        let mut root = SceneNode::Mesh(MeshNode {
            name: "terminal".to_string(),
            geometry: Geometry {
                positions: vec![
                    Vec3::new(0.0, 0.0, 0.0),
                    Vec3::new(2.0, 0.0, 0.0),
                    Vec3::new(2.0, 1.0, 0.0),
                    Vec3::new(0.0, 1.0, 0.0),
                ],
                indices: Some(vec![0, 1, 2, 0, 2, 3]),
                uvs: None,
                groups: vec![MaterialGroup {
                    start: 0,
                    count: 6,
                    material_index: 0,
                }],
            },
            materials: vec![Material::named("Material.003")],
            cast_shadow: true,
            receive_shadow: false,
        });
        let (scale, radius) = normalize_scene(&mut root, 2.2);
        LoadedModel {
            root,
            base_radius: radius,
            normalize_scale: scale,
        }
    }

    #[tokio::test]
    async fn test_responsive_mode_switch_moves_target() {
        let config = Config::default();
        let mut engine = Engine::new(screen_model(), Arc::new(PushedDocument::new()), &config);

        let wide = HostInput {
            width: 1600.0,
            height: 900.0,
            ..Default::default()
        };
        let mut frame = engine.tick(&wide, Instant::now());
        for _ in 0..600 {
            frame = engine.tick(&wide, Instant::now());
        }
        let target = pose_for(ViewportMode::DesktopXl);
        assert!((frame.position - target.position).length() < 1e-2);

        // Shrinking the viewport re-targets the phone pose
        let narrow = HostInput {
            width: 500.0,
            height: 900.0,
            ..Default::default()
        };
        for _ in 0..600 {
            frame = engine.tick(&narrow, Instant::now());
        }
        let target = pose_for(ViewportMode::PhonePortrait);
        assert!((frame.position - target.position).length() < 1e-2);
    }

    #[tokio::test]
    async fn test_scroll_driver_follows_keyframes() {
        let mut config = Config::default();
        config.rig.driver = RigDriverKind::Scroll;
        config.paging.enabled = true;
        let mut engine = Engine::new(screen_model(), Arc::new(PushedDocument::new()), &config);
        engine.set_anchor_offsets(&[0.0, 1000.0, 3000.0], 0.0);

        // Sample point mid-way through the first segment
        let input = HostInput {
            scroll_y: 100.0,
            height: 800.0,
            reduced_motion: true,
            ..Default::default()
        };
        let frame = engine.tick(&input, Instant::now());

        let track = KeyframeTrack::from_config(&config.keyframes);
        let mut expected_track = track.clone();
        expected_track.set_offsets(&[0.0, 1000.0, 3000.0]);
        let expected = expected_track.sample(input.scroll_sample()).unwrap();
        assert!((frame.position - expected.position).length() < 1e-4);
    }

    #[tokio::test]
    async fn test_paging_through_engine() {
        let mut config = Config::default();
        config.rig.driver = RigDriverKind::Scroll;
        config.paging.enabled = true;
        let mut engine = Engine::new(screen_model(), Arc::new(PushedDocument::new()), &config);
        engine.set_anchor_offsets(&[0.0, 1000.0, 3000.0], 0.0);

        assert_eq!(engine.request_page_step(1), Some(1000.0));
        // Suppressed until the scroll settles at the target
        assert_eq!(engine.request_page_step(1), None);

        let settled = HostInput {
            scroll_y: 1000.5,
            ..Default::default()
        };
        engine.tick(&settled, Instant::now());
        assert_eq!(engine.request_page_step(1), Some(3000.0));
    }

    #[tokio::test]
    async fn test_unmatched_material_keeps_pipeline_inert() {
        let mut config = Config::default();
        config.screen.target_material = "nothing".to_string();
        let engine = Engine::new(screen_model(), Arc::new(PushedDocument::new()), &config);
        assert!(engine.binding().is_none());
        assert!(engine.session.is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_render_loop_publishes_frames_and_jumps() {
        use std::time::Duration;

        let mut config = Config::default();
        config.rig.driver = RigDriverKind::Scroll;
        config.paging.enabled = true;
        let state = crate::StageState::new(config.clone());
        let engine = Engine::new(screen_model(), Arc::new(PushedDocument::new()), &config);

        let mut frames = state.subscribe_frames();
        let mut jumps = state.subscribe_jumps();
        let loop_handle = tokio::spawn(run_render_loop(Arc::clone(&state), engine, 120.0));

        tokio::time::timeout(Duration::from_secs(2), frames.recv())
            .await
            .expect("no frame published")
            .unwrap();

        state.send_command(crate::StageCommand::Layout {
            offsets: vec![0.0, 1000.0, 3000.0],
            scroll_y: 0.0,
        });
        state.send_command(crate::StageCommand::PageStep(1));
        let jump = tokio::time::timeout(Duration::from_secs(2), jumps.recv())
            .await
            .expect("no jump published")
            .unwrap();
        assert_eq!(jump.offset, 1000.0);

        state.shutdown();
        loop_handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_binding_sizes_canvas() {
        let config = Config::default();
        let engine = Engine::new(screen_model(), Arc::new(PushedDocument::new()), &config);
        let binding = engine.binding().unwrap();
        assert!((binding.aspect - 2.0).abs() < 1e-3);
        assert_eq!(engine.canvas().lock().unwrap().width(), 2048);
    }
}
