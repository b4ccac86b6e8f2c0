//! Live document capture session.
//!
//! Owns the single-flight guarantee: however many triggers fire (steady
//! polling, subtree mutations, host resizes), at most one snapshot is in
//! flight, and requests arriving meanwhile are dropped, not queued. One
//! session exists per source document; swapping the source replaces the
//! session wholesale.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::config::CaptureConfig;

use super::canvas::ScreenTexture;
use super::source::{CaptureOptions, DocumentSource};

/// Throttled, single-flight snapshot pipeline for one source document
pub struct CaptureSession<S: DocumentSource> {
    source: Arc<S>,
    canvas: ScreenTexture,
    transparent_background: bool,
    cross_origin_safe: bool,
    /// Set while a snapshot is awaited; spans the suspension
    in_flight: Arc<AtomicBool>,
    /// Coalesced change/resize requests, drained once per tick
    pending: Arc<AtomicBool>,
    /// Set once the source reported ready and the settle delay elapsed
    armed: Arc<AtomicBool>,
    last_capture: Option<Instant>,
    min_interval: Duration,
    watcher: JoinHandle<()>,
}

impl<S: DocumentSource> CaptureSession<S> {
    /// Start a session: arm once the source signals readiness (plus the
    /// configured settle delay), then forward its change events into the
    /// coalesced pending flag.
    pub fn start(source: Arc<S>, canvas: ScreenTexture, config: &CaptureConfig) -> Self {
        let in_flight = Arc::new(AtomicBool::new(false));
        let pending = Arc::new(AtomicBool::new(false));
        let armed = Arc::new(AtomicBool::new(false));

        let watcher = tokio::spawn({
            let source = Arc::clone(&source);
            let pending = Arc::clone(&pending);
            let armed = Arc::clone(&armed);
            let settle = Duration::from_millis(config.settle_delay_ms);
            async move {
                let mut rx = source.subscribe();
                source.wait_ready().await;
                tokio::time::sleep(settle).await;
                armed.store(true, Ordering::Release);
                // First capture goes through the next tick like any other
                pending.store(true, Ordering::Release);

                loop {
                    match rx.recv().await {
                        Ok(_) => {
                            pending.store(true, Ordering::Release);
                        }
                        Err(broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            }
        });

        Self {
            source,
            canvas,
            transparent_background: config.transparent_background,
            cross_origin_safe: config.cross_origin_safe,
            in_flight,
            pending,
            armed,
            last_capture: None,
            min_interval: Duration::from_secs_f32(1.0 / config.max_fps),
            watcher,
        }
    }

    /// Per-frame check: capture when a coalesced request is pending or the
    /// steady-state interval elapsed. Runs before frame submission.
    pub fn tick(&mut self, now: Instant) {
        let due = match self.last_capture {
            Some(t) => now.duration_since(t) >= self.min_interval,
            None => true,
        };
        let requested = self.pending.swap(false, Ordering::AcqRel);
        if !(due || requested) {
            return;
        }
        if self.request_capture() {
            self.last_capture = Some(now);
        }
    }

    /// Guarded capture entry point: no-op unless the session is armed, the
    /// source is available, and no capture is in flight. Returns whether a
    /// snapshot was started.
    pub fn request_capture(&self) -> bool {
        if !self.armed.load(Ordering::Acquire) || !self.source.is_available() {
            return false;
        }
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        let source = Arc::clone(&self.source);
        let canvas = Arc::clone(&self.canvas);
        let in_flight = Arc::clone(&self.in_flight);
        let options = {
            let canvas = canvas.lock().unwrap();
            CaptureOptions {
                width: canvas.width(),
                height: canvas.height(),
                transparent_background: self.transparent_background,
                cross_origin_safe: self.cross_origin_safe,
            }
        };

        tokio::spawn(async move {
            match source.capture(options).await {
                Ok(snapshot) => {
                    canvas.lock().unwrap().blit(&snapshot);
                }
                Err(e) => {
                    // Previous canvas contents stay visible
                    tracing::warn!("document snapshot failed: {}", e);
                }
            }
            in_flight.store(false, Ordering::Release);
        });
        true
    }

    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::Acquire)
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn canvas(&self) -> &ScreenTexture {
        &self.canvas
    }

    pub fn source(&self) -> &Arc<S> {
        &self.source
    }
}

impl<S: DocumentSource> Drop for CaptureSession<S> {
    fn drop(&mut self) {
        self.watcher.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::canvas::CaptureCanvas;
    use crate::capture::source::DocumentEvent;
    use crate::error::CaptureError;
    use image::{Rgba, RgbaImage};
    use std::future::Future;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Semaphore;

    /// Source whose captures block until a permit is released
    struct GatedSource {
        calls: AtomicUsize,
        gate: Semaphore,
        events: broadcast::Sender<DocumentEvent>,
        fail: bool,
    }

    impl GatedSource {
        fn new(fail: bool) -> Self {
            let (events, _) = broadcast::channel(16);
            Self {
                calls: AtomicUsize::new(0),
                gate: Semaphore::new(0),
                events,
                fail,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn release(&self) {
            self.gate.add_permits(1);
        }
    }

    impl DocumentSource for GatedSource {
        fn is_available(&self) -> bool {
            true
        }

        fn set_viewport(&self, _width: u32, _height: u32) {}

        fn subscribe(&self) -> broadcast::Receiver<DocumentEvent> {
            self.events.subscribe()
        }

        fn wait_ready(&self) -> impl Future<Output = ()> + Send {
            async {}
        }

        fn capture(
            &self,
            _options: CaptureOptions,
        ) -> impl Future<Output = Result<RgbaImage, CaptureError>> + Send {
            self.calls.fetch_add(1, Ordering::SeqCst);
            async move {
                let permit = self.gate.acquire().await.unwrap();
                permit.forget();
                if self.fail {
                    Err(CaptureError::Snapshot("raster primitive threw".to_string()))
                } else {
                    Ok(RgbaImage::from_pixel(2, 2, Rgba([9, 9, 9, 255])))
                }
            }
        }
    }

    fn test_config() -> CaptureConfig {
        CaptureConfig {
            max_fps: 30.0,
            settle_delay_ms: 0,
            ..Default::default()
        }
    }

    async fn armed_session(
        source: &Arc<GatedSource>,
        canvas: &ScreenTexture,
    ) -> CaptureSession<GatedSource> {
        let session = CaptureSession::start(Arc::clone(source), Arc::clone(canvas), &test_config());
        while !session.is_armed() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        session
    }

    async fn wait_for(mut cond: impl FnMut() -> bool) {
        for _ in 0..500 {
            if cond() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        panic!("condition not reached");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_single_flight_collapses_concurrent_requests() {
        let source = Arc::new(GatedSource::new(false));
        let canvas = CaptureCanvas::shared(2, 2);
        let session = armed_session(&source, &canvas).await;

        assert!(session.request_capture());
        wait_for(|| source.calls() == 1).await;

        // Second request while the first is still suspended: dropped
        assert!(!session.request_capture());
        assert_eq!(source.calls(), 1);

        source.release();
        wait_for(|| !session.in_flight()).await;

        // Released flag admits the next request
        assert!(session.request_capture());
        wait_for(|| source.calls() == 2).await;
        source.release();
        wait_for(|| !session.in_flight()).await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_failed_capture_releases_flag_and_keeps_canvas() {
        let source = Arc::new(GatedSource::new(true));
        let canvas = CaptureCanvas::shared(2, 2);
        canvas
            .lock()
            .unwrap()
            .blit(&RgbaImage::from_pixel(2, 2, Rgba([42, 42, 42, 255])));
        let session = armed_session(&source, &canvas).await;

        assert!(session.request_capture());
        source.release();
        wait_for(|| !session.in_flight()).await;

        let canvas = canvas.lock().unwrap();
        assert_eq!(canvas.pixels().get_pixel(0, 0), &Rgba([42, 42, 42, 255]));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_tick_throttles_steady_state_polls() {
        let source = Arc::new(GatedSource::new(false));
        let canvas = CaptureCanvas::shared(2, 2);
        let mut session = armed_session(&source, &canvas).await;
        // Consume the arming-time pending request so only the throttle drives
        session.pending.store(false, Ordering::SeqCst);

        let t0 = Instant::now();
        session.tick(t0);
        wait_for(|| source.calls() == 1).await;
        source.release();
        wait_for(|| !session.in_flight()).await;

        // Within the 30 Hz window: no new capture
        session.tick(t0 + Duration::from_millis(5));
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(source.calls(), 1);

        // Past the window: captures again
        session.tick(t0 + Duration::from_millis(40));
        wait_for(|| source.calls() == 2).await;
        source.release();
        wait_for(|| !session.in_flight()).await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_mutation_event_forces_capture_between_polls() {
        let source = Arc::new(GatedSource::new(false));
        let canvas = CaptureCanvas::shared(2, 2);
        let mut session = armed_session(&source, &canvas).await;
        session.pending.store(false, Ordering::SeqCst);

        let t0 = Instant::now();
        session.tick(t0);
        wait_for(|| source.calls() == 1).await;
        source.release();
        wait_for(|| !session.in_flight()).await;

        // A mutation inside the throttle window still triggers a capture
        let _ = source.events.send(DocumentEvent::Mutated);
        wait_for(|| session.pending.load(Ordering::SeqCst)).await;
        session.tick(t0 + Duration::from_millis(5));
        wait_for(|| source.calls() == 2).await;
        source.release();
        wait_for(|| !session.in_flight()).await;
    }
}
