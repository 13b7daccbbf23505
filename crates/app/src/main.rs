//! Entry point for Trisoup.

mod cli;
mod scene;

use anyhow::Result;
use clap::Parser;

use crate::cli::Args;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let (width, height) = args.window_size();
    log::info!(
        "Starting Trisoup. Backend: {:?}, show_fps={}, window_size={}x{}",
        args.gpu_backend,
        args.show_fps,
        width,
        height
    );

    let scene = scene::build(&args)?;
    let config = platform::RunConfig {
        backends: args.gpu_backend.backends(),
        show_fps: args.show_fps,
        width,
        height,
        spin: args.spin,
    };
    platform::run_with_renderer(config, scene)?;

    log::info!("Graceful shutdown. Bye!");
    Ok(())
}
