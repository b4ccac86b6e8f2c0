//! Bridge endpoint handlers.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::stream::Stream;
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use crate::host::HostInput;
use crate::{StageCommand, StageState};

/// Recomputed anchor offsets after a host layout change
#[derive(Debug, Deserialize)]
pub struct LayoutUpdate {
    pub offsets: Vec<f32>,
    #[serde(default)]
    pub scroll_y: f32,
}

/// A paging request: a signed step or an explicit section index
#[derive(Debug, Deserialize)]
pub struct PageRequest {
    pub direction: Option<i32>,
    pub index: Option<usize>,
}

/// Current capture dimensions
#[derive(Debug, Serialize)]
pub struct ScreenInfo {
    pub width: u32,
    pub height: u32,
    pub aspect: f32,
}

/// POST /api/input: host viewport/scroll/pointer snapshot
pub async fn update_input(
    State(state): State<Arc<StageState>>,
    Json(input): Json<HostInput>,
) -> StatusCode {
    state.update_input(input).await;
    StatusCode::NO_CONTENT
}

/// POST /api/layout: anchor offsets recomputed by the host
pub async fn update_layout(
    State(state): State<Arc<StageState>>,
    Json(update): Json<LayoutUpdate>,
) -> StatusCode {
    state.send_command(StageCommand::Layout {
        offsets: update.offsets,
        scroll_y: update.scroll_y,
    });
    StatusCode::ACCEPTED
}

/// POST /api/page: wheel/touch/keyboard paging request
pub async fn request_page(
    State(state): State<Arc<StageState>>,
    Json(request): Json<PageRequest>,
) -> StatusCode {
    match (request.index, request.direction) {
        (Some(index), _) => state.send_command(StageCommand::PageIndex(index)),
        (None, Some(direction)) => state.send_command(StageCommand::PageStep(direction)),
        (None, None) => return StatusCode::BAD_REQUEST,
    }
    StatusCode::ACCEPTED
}

/// POST /api/mutation: watched-subtree change notification
pub async fn notify_mutation(State(state): State<Arc<StageState>>) -> StatusCode {
    state.document.notify_mutation();
    StatusCode::NO_CONTENT
}

/// POST /api/snapshot: PNG snapshot of the watched subtree
pub async fn submit_snapshot(State(state): State<Arc<StageState>>, body: Bytes) -> Response {
    match image::load_from_memory(&body) {
        Ok(decoded) => {
            state.document.submit(decoded.to_rgba8());
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => {
            let err = crate::error::CaptureError::Decode(e.to_string());
            tracing::warn!("rejecting snapshot: {}", err);
            (StatusCode::BAD_REQUEST, err.to_string()).into_response()
        }
    }
}

/// GET /api/frames: SSE stream of rig frames
pub async fn frame_stream(
    State(state): State<Arc<StageState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.subscribe_frames();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(frame) => serde_json::to_string(&frame)
            .ok()
            .map(|data| Ok(Event::default().event("frame").data(data))),
        // Skip lagged messages
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// GET /api/jumps: SSE stream of paging jumps
pub async fn jump_stream(
    State(state): State<Arc<StageState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.subscribe_jumps();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(jump) => serde_json::to_string(&jump)
            .ok()
            .map(|data| Ok(Event::default().event("jump").data(data))),
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// GET /api/screen: current capture dimensions
pub async fn screen_info(State(state): State<Arc<StageState>>) -> Response {
    match state.canvas().await {
        Some(canvas) => {
            let canvas = canvas.lock().unwrap();
            Json(ScreenInfo {
                width: canvas.width(),
                height: canvas.height(),
                aspect: canvas.aspect(),
            })
            .into_response()
        }
        None => StatusCode::SERVICE_UNAVAILABLE.into_response(),
    }
}

/// GET /api/texture.png: current capture canvas contents
pub async fn texture_png(State(state): State<Arc<StageState>>) -> Response {
    let Some(canvas) = state.canvas().await else {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    };
    let png = canvas.lock().unwrap().to_png();
    match png {
        Ok(bytes) => ([(header::CONTENT_TYPE, "image/png")], bytes).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}
