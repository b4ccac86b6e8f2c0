//! screenstage - Live document showcase service
//!
//! Main entry point for the CLI application.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use screenstage::{
    config::Config,
    engine::{run_render_loop, Engine},
    loader::{self, LogProgress},
    web::WebServer,
    StageState,
};

/// screenstage - live HTML-to-texture showcase service
#[derive(Parser, Debug)]
#[command(name = "screenstage", version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Model file path (overrides config)
    #[arg(short, long)]
    model: Option<String>,

    /// HTTP server port (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Disable HTTP server
    #[arg(long)]
    no_http: bool,

    /// Render loop rate in frames per second
    #[arg(long, default_value_t = 60.0)]
    fps: f32,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(log_level.into())
                .from_env_lossy(),
        )
        .init();

    info!("Starting {} v{}", screenstage::NAME, screenstage::VERSION);

    // Load configuration
    let mut config = if let Some(ref path) = args.config {
        Config::from_file(path)?
    } else {
        Config::load()?
    };

    // Apply CLI overrides
    if let Some(ref model) = args.model {
        config.model.path = model.clone();
    }
    if let Some(port) = args.port {
        config.http.port = port;
    }
    if args.no_http {
        config.http.enabled = false;
    }

    // Validate configuration
    config.validate()?;

    info!("Model: {}", config.model.path);
    info!("Rig driver: {:?}", config.rig.driver);
    info!("Screen material: {}", config.screen.target_material);
    info!("HTTP server: {}", config.http.enabled);

    // Create shared application state
    let state = StageState::new(config.clone());

    // Load the model and start the render loop. A load failure is fatal to
    // the 3D pipeline only; the bridge keeps serving.
    let mut sink = LogProgress;
    match loader::load_model(&config.model.path, config.model.target_size, &mut sink) {
        Ok(model) => {
            let engine = Engine::new(model, Arc::clone(&state.document), &config);
            state.set_canvas(Arc::clone(engine.canvas())).await;

            let loop_state = Arc::clone(&state);
            tokio::spawn(async move {
                run_render_loop(loop_state, engine, args.fps).await;
            });
        }
        Err(e) => {
            error!("3D pipeline disabled: {}", e);
        }
    }

    // Start HTTP server if enabled
    if config.http.enabled {
        let server = WebServer::new(Arc::clone(&state), &config.http);
        tokio::spawn(async move {
            if let Err(e) = server.serve().await {
                error!("Web server error: {}", e);
            }
        });
    }

    // Wait for Ctrl+C / SIGTERM
    shutdown_signal().await;
    info!("Shutdown signal received");
    state.shutdown();

    // Give tasks a moment to clean up
    tokio::time::sleep(tokio::time::Duration::from_millis(500)).await;

    info!("screenstage stopped");
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
