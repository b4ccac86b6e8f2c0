//! screenstage - Live document showcase service
//!
//! A headless service that keeps a 3D showcase model's screen in sync with
//! a live HTML document and drives the model's pose from the hosting
//! viewport:
//! - Unwraps the screen sub-material of a loaded GLB model and binds a
//!   live capture canvas to its emissive channel
//! - Throttled, single-flight snapshots of the hosting document pushed
//!   over an HTTP bridge
//! - Damped pose interpolation from viewport modes or scroll keyframes,
//!   streamed back to the host as rig frames over SSE

pub mod capture;
pub mod config;
pub mod engine;
pub mod error;
pub mod host;
pub mod loader;
pub mod rig;
pub mod scene;
pub mod screen;
pub mod web;

pub use config::Config;
pub use error::{Result, StageError};

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, Mutex, RwLock};

use crate::capture::{PushedDocument, ScreenTexture};
use crate::host::HostInput;
use crate::rig::RigFrame;

/// Command from the web bridge to the render loop, drained once per tick
#[derive(Debug, Clone)]
pub enum StageCommand {
    /// Recomputed section anchor offsets after a layout change
    Layout { offsets: Vec<f32>, scroll_y: f32 },
    /// Page by a signed number of sections
    PageStep(i32),
    /// Page to an explicit section index
    PageIndex(usize),
}

/// A paging jump the host should perform
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct PageJump {
    /// Scroll offset of the target anchor
    pub offset: f32,
}

/// Application state shared between the render loop and the web bridge
#[derive(Debug)]
pub struct StageState {
    /// Current configuration
    pub config: RwLock<Config>,
    /// Latest host-environment snapshot
    pub input: RwLock<HostInput>,
    /// The pushed document source the hosting page feeds
    pub document: Arc<PushedDocument>,
    /// Capture canvas handle, set once the engine is assembled
    canvas: RwLock<Option<ScreenTexture>>,
    /// Channel for published rig frames
    frame_tx: broadcast::Sender<RigFrame>,
    /// Channel for paging jumps
    jump_tx: broadcast::Sender<PageJump>,
    /// Render-loop command queue
    command_tx: mpsc::UnboundedSender<StageCommand>,
    command_rx: Mutex<Option<mpsc::UnboundedReceiver<StageCommand>>>,
    /// Shutdown signal
    shutdown_tx: broadcast::Sender<()>,
}

impl StageState {
    /// Create a new application state with the given configuration
    pub fn new(config: Config) -> Arc<Self> {
        let (frame_tx, _) = broadcast::channel(64);
        let (jump_tx, _) = broadcast::channel(16);
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, _) = broadcast::channel(1);

        Arc::new(Self {
            config: RwLock::new(config),
            input: RwLock::new(HostInput::default()),
            document: Arc::new(PushedDocument::new()),
            canvas: RwLock::new(None),
            frame_tx,
            jump_tx,
            command_tx,
            command_rx: Mutex::new(Some(command_rx)),
            shutdown_tx,
        })
    }

    /// Store the latest host input; reports a resize to the document
    /// source when the viewport box changed.
    pub async fn update_input(&self, input: HostInput) {
        let mut current = self.input.write().await;
        let resized = (current.width, current.height) != (input.width, input.height);
        *current = input;
        drop(current);

        if resized {
            self.document.notify_resize();
        }
    }

    /// Get the current host input
    pub async fn get_input(&self) -> HostInput {
        self.input.read().await.clone()
    }

    /// Expose the capture canvas to the web bridge
    pub async fn set_canvas(&self, canvas: ScreenTexture) {
        *self.canvas.write().await = Some(canvas);
    }

    /// Capture canvas handle, if the pipeline is active
    pub async fn canvas(&self) -> Option<ScreenTexture> {
        self.canvas.read().await.clone()
    }

    /// Publish a rig frame to all subscribers
    pub fn publish_frame(&self, frame: RigFrame) {
        let _ = self.frame_tx.send(frame);
    }

    /// Subscribe to rig frame updates
    pub fn subscribe_frames(&self) -> broadcast::Receiver<RigFrame> {
        self.frame_tx.subscribe()
    }

    /// Publish a paging jump to all subscribers
    pub fn publish_jump(&self, jump: PageJump) {
        let _ = self.jump_tx.send(jump);
    }

    /// Subscribe to paging jumps
    pub fn subscribe_jumps(&self) -> broadcast::Receiver<PageJump> {
        self.jump_tx.subscribe()
    }

    /// Enqueue a command for the render loop
    pub fn send_command(&self, command: StageCommand) {
        let _ = self.command_tx.send(command);
    }

    /// Take the render loop's command receiver; `None` after the first call
    pub async fn take_command_rx(&self) -> Option<mpsc::UnboundedReceiver<StageCommand>> {
        self.command_rx.lock().await.take()
    }

    /// Subscribe to shutdown signal
    pub fn subscribe_shutdown(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Signal shutdown
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::DocumentSource as _;

    #[tokio::test]
    async fn test_resize_notification_on_input_change() {
        let state = StageState::new(Config::default());
        let mut rx = state.document.subscribe();

        let mut input = HostInput::default();
        input.scroll_y = 50.0;
        state.update_input(input.clone()).await;
        // Same viewport box: no resize event
        assert!(rx.try_recv().is_err());

        input.width = 640.0;
        state.update_input(input).await;
        assert_eq!(
            rx.try_recv().unwrap(),
            crate::capture::DocumentEvent::Resized
        );
    }

    #[tokio::test]
    async fn test_command_rx_taken_once() {
        let state = StageState::new(Config::default());
        assert!(state.take_command_rx().await.is_some());
        assert!(state.take_command_rx().await.is_none());
    }
}
