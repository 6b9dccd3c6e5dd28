use std::path::PathBuf;

use clap::Parser;

/// Drives one off-screen render session and pulls frames from it.
#[derive(Debug, Parser)]
#[command(name = "framebridge", version, about)]
pub struct Cli {
    /// Requested surface width in logical pixels.
    #[arg(long, default_value_t = 640)]
    pub width: u32,

    /// Requested surface height in logical pixels.
    #[arg(long, default_value_t = 480)]
    pub height: u32,

    /// Render worker FPS cap; defaults to 60, pass 0 to render back to back.
    #[arg(long)]
    pub fps: Option<f32>,

    /// How long to keep pulling frames before shutting down.
    #[arg(long, default_value_t = 3.0)]
    pub seconds: f32,

    /// Optional GLSL fragment payload (a `mainImage` entry point) rendered
    /// instead of the demo triangle.
    #[arg(long)]
    pub fragment: Option<PathBuf>,
}

pub fn parse() -> Cli {
    Cli::parse()
}
