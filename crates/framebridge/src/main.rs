mod cli;
mod commands;
mod platform;
mod registry;
mod requests;

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use renderer::{RenderPayload, SessionConfig};
use tracing_subscriber::EnvFilter;

use commands::CommandHandler;
use registry::FrameRegistry;

fn main() -> Result<()> {
    let cli = cli::parse();
    initialise_tracing();

    tracing::info!(platform = %platform::platform_version(), "starting framebridge");

    let registry = Arc::new(FrameRegistry::new());
    let handler = CommandHandler::new(registry.clone());

    let mut config = SessionConfig::sized(cli.width, cli.height);
    if let Some(fps) = cli.fps {
        config.target_fps = (fps > 0.0).then_some(fps);
    }
    if let Some(path) = &cli.fragment {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read fragment payload at {}", path.display()))?;
        config.payload = RenderPayload::Fragment { source };
    }

    let source_id = handler.create_session(config)?;
    tracing::info!(%source_id, "session open; pulling frames");

    // Stand in for the consumer: pull frames at a steady cadence and report
    // capture latency, the way a compositor thread would.
    let deadline = Instant::now() + Duration::from_secs_f32(cli.seconds);
    let mut last_pull = Instant::now();
    while Instant::now() < deadline {
        let pull_started = Instant::now();
        let stats = registry.with_frame(source_id, cli.width, cli.height, |frame| {
            (frame.width(), frame.height(), frame.bytes().len())
        });
        match stats {
            Some(Ok((width, height, bytes))) => {
                let interval = pull_started.duration_since(last_pull);
                tracing::info!(
                    width,
                    height,
                    bytes,
                    capture_ms = pull_started.elapsed().as_secs_f64() * 1000.0,
                    pull_fps = 1.0 / interval.as_secs_f64().max(f64::EPSILON),
                    "captured frame"
                );
            }
            Some(Err(err)) => tracing::warn!(error = %err, "capture failed"),
            None => tracing::warn!(%source_id, "frame source vanished"),
        }
        last_pull = pull_started;
        thread::sleep(Duration::from_millis(100));
    }

    handler.shutdown()
}

fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
