//! Raster-capture collaborator interface.
//!
//! The external primitive that turns a document subtree into an image is
//! reached through [`DocumentSource`]: an availability/readiness signal, a
//! viewport the aspect scaler can resize, an async snapshot call, and a
//! change-event subscription standing in for the mutation/resize observers.

use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};

use image::RgbaImage;
use tokio::sync::{broadcast, watch};

use crate::error::CaptureError;

/// Options forwarded to the raster primitive
#[derive(Debug, Clone, Copy)]
pub struct CaptureOptions {
    pub width: u32,
    pub height: u32,
    pub transparent_background: bool,
    pub cross_origin_safe: bool,
}

/// Change notification from the watched document subtree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentEvent {
    /// Attributes, child list, or text content changed
    Mutated,
    /// The hosting viewport was resized
    Resized,
}

/// The raster-capture collaborator.
///
/// `capture` suspends until a snapshot is produced; the session's
/// single-flight guard spans that suspension. Implementations broadcast
/// [`DocumentEvent`]s for subtree mutations and host resizes.
pub trait DocumentSource: Send + Sync + 'static {
    /// Whether the capture primitive has finished initializing
    fn is_available(&self) -> bool;

    /// Resize the off-screen viewport hosting the source content
    fn set_viewport(&self, width: u32, height: u32);

    /// Subscribe to document change events
    fn subscribe(&self) -> broadcast::Receiver<DocumentEvent>;

    /// Resolve once the document is ready for capture (fonts loaded and a
    /// first frame produced)
    fn wait_ready(&self) -> impl Future<Output = ()> + Send;

    /// Produce one raster snapshot of the watched subtree
    fn capture(
        &self,
        options: CaptureOptions,
    ) -> impl Future<Output = Result<RgbaImage, CaptureError>> + Send;
}

/// A document source fed by the hosting page itself.
///
/// The page renders its watched subtree and pushes PNG snapshots over the
/// web bridge; `capture` resolves with the most recently pushed frame,
/// waiting for the first one if none has arrived yet. Readiness is the
/// first pushed frame.
#[derive(Debug)]
pub struct PushedDocument {
    frames: watch::Sender<Option<RgbaImage>>,
    events_tx: broadcast::Sender<DocumentEvent>,
    viewport_width: AtomicU32,
    viewport_height: AtomicU32,
}

impl Default for PushedDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl PushedDocument {
    pub fn new() -> Self {
        let (frames, _) = watch::channel(None);
        let (events_tx, _) = broadcast::channel(16);
        Self {
            frames,
            events_tx,
            viewport_width: AtomicU32::new(0),
            viewport_height: AtomicU32::new(0),
        }
    }

    /// Store a snapshot pushed by the hosting page.
    ///
    /// The first push marks the document ready; every push counts as a
    /// content change so the session picks it up on its next tick.
    pub fn submit(&self, snapshot: RgbaImage) {
        self.frames.send_replace(Some(snapshot));
        let _ = self.events_tx.send(DocumentEvent::Mutated);
    }

    /// Forward a subtree mutation notification from the host
    pub fn notify_mutation(&self) {
        let _ = self.events_tx.send(DocumentEvent::Mutated);
    }

    /// Forward a hosting-viewport resize notification
    pub fn notify_resize(&self) {
        let _ = self.events_tx.send(DocumentEvent::Resized);
    }

    /// Viewport size last requested by the aspect scaler
    pub fn viewport(&self) -> (u32, u32) {
        (
            self.viewport_width.load(Ordering::Relaxed),
            self.viewport_height.load(Ordering::Relaxed),
        )
    }
}

impl DocumentSource for PushedDocument {
    fn is_available(&self) -> bool {
        self.frames.borrow().is_some()
    }

    fn set_viewport(&self, width: u32, height: u32) {
        self.viewport_width.store(width, Ordering::Relaxed);
        self.viewport_height.store(height, Ordering::Relaxed);
    }

    fn subscribe(&self) -> broadcast::Receiver<DocumentEvent> {
        self.events_tx.subscribe()
    }

    fn wait_ready(&self) -> impl Future<Output = ()> + Send {
        let mut rx = self.frames.subscribe();
        async move {
            let _ = rx.wait_for(Option::is_some).await;
        }
    }

    fn capture(
        &self,
        _options: CaptureOptions,
    ) -> impl Future<Output = Result<RgbaImage, CaptureError>> + Send {
        let mut rx = self.frames.subscribe();
        async move {
            let frame = rx
                .wait_for(Option::is_some)
                .await
                .map_err(|_| CaptureError::SourceUnavailable)?
                .clone();
            // wait_for only returns on Some
            frame.ok_or(CaptureError::SourceUnavailable)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn frame(px: u8) -> RgbaImage {
        RgbaImage::from_pixel(2, 2, Rgba([px, px, px, 255]))
    }

    fn opts() -> CaptureOptions {
        CaptureOptions {
            width: 2,
            height: 2,
            transparent_background: true,
            cross_origin_safe: true,
        }
    }

    #[tokio::test]
    async fn test_submit_marks_ready_and_serves_latest() {
        let doc = PushedDocument::new();
        assert!(!doc.is_available());

        doc.submit(frame(10));
        doc.submit(frame(20));
        assert!(doc.is_available());

        let snap = doc.capture(opts()).await.unwrap();
        assert_eq!(snap.get_pixel(0, 0), &Rgba([20, 20, 20, 255]));
    }

    #[tokio::test]
    async fn test_capture_waits_for_first_frame() {
        let doc = std::sync::Arc::new(PushedDocument::new());
        let capture = {
            let doc = std::sync::Arc::clone(&doc);
            tokio::spawn(async move { doc.capture(opts()).await })
        };
        // The pending capture resolves once the host pushes a frame
        tokio::task::yield_now().await;
        doc.submit(frame(3));
        let snap = capture.await.unwrap().unwrap();
        assert_eq!(snap.get_pixel(1, 1), &Rgba([3, 3, 3, 255]));
    }

    #[tokio::test]
    async fn test_submit_broadcasts_mutation() {
        let doc = PushedDocument::new();
        let mut rx = doc.subscribe();
        doc.submit(frame(1));
        assert_eq!(rx.recv().await.unwrap(), DocumentEvent::Mutated);

        doc.notify_resize();
        assert_eq!(rx.recv().await.unwrap(), DocumentEvent::Resized);
    }

    #[tokio::test]
    async fn test_wait_ready_resolves_after_first_push() {
        let doc = std::sync::Arc::new(PushedDocument::new());
        let waiter = {
            let doc = std::sync::Arc::clone(&doc);
            tokio::spawn(async move { doc.wait_ready().await })
        };
        doc.submit(frame(3));
        waiter.await.unwrap();
    }
}
