//! Web bridge between the hosting document and the stage service.
//!
//! The host pushes input, layout, paging, mutation, and snapshot events in
//! and reads rig frames, paging jumps, and the screen texture back out.

pub mod api;

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crate::config::HttpConfig;
use crate::error::{StageError, WebError};
use crate::StageState;

/// Web server for the host bridge
pub struct WebServer {
    app_state: Arc<StageState>,
    config: HttpConfig,
}

impl WebServer {
    /// Create a new web server
    pub fn new(app_state: Arc<StageState>, config: &HttpConfig) -> Self {
        Self {
            app_state,
            config: config.clone(),
        }
    }

    /// Build the router
    pub fn router(&self) -> Router {
        create_router(Arc::clone(&self.app_state), &self.config)
    }

    /// Bind and serve until the shutdown signal fires
    pub async fn serve(&self) -> Result<(), StageError> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| WebError::Bind(format!("{}: {}", addr, e)))?;
        tracing::info!("web bridge listening on {}", addr);

        let mut shutdown = self.app_state.subscribe_shutdown();
        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await
            .map_err(|e| WebError::Startup(e.to_string()).into())
    }
}

/// Build the bridge router
pub fn create_router(state: Arc<StageState>, config: &HttpConfig) -> Router {
    let router = Router::new()
        .route("/api/input", post(api::update_input))
        .route("/api/layout", post(api::update_layout))
        .route("/api/page", post(api::request_page))
        .route("/api/mutation", post(api::notify_mutation))
        .route("/api/snapshot", post(api::submit_snapshot))
        .route("/api/frames", get(api::frame_stream))
        .route("/api/jumps", get(api::jump_stream))
        .route("/api/screen", get(api::screen_info))
        .route("/api/texture.png", get(api::texture_png))
        .with_state(state);

    if config.cors_enabled {
        router.layer(cors_layer(config))
    } else {
        router
    }
}

fn cors_layer(config: &HttpConfig) -> CorsLayer {
    if config.cors_origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
