//! screenshader - full-desktop post-processing compositor for X11
//!
//! Redirects every top-level window, composites them into an off-screen
//! target and draws that through a user-supplied GLSL effect onto the
//! composite overlay.

mod config;
mod signals;
mod watch;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use screenshader_core::{Compositor, LoopFlags};
use screenshader_x11::{X11Options, X11Platform};

use crate::config::{Config, Settings, PARAMS_ENV};

/// Run every window on the desktop through a GLSL post-processing shader
#[derive(Parser, Debug)]
#[command(name = "screenshader")]
#[command(version)]
#[command(after_help = "Default shader: shaders/crt.frag\n\
Send SIGUSR1 to hot-reload the shader.\n\
Send SIGINT/SIGTERM to stop.")]
pub struct Args {
    /// Fragment shader to apply
    pub shader: Option<PathBuf>,

    /// Configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Runtime parameter file
    #[arg(long, value_name = "PATH")]
    pub params: Option<PathBuf>,

    /// Reload the shader when it changes on disk
    #[arg(long)]
    pub watch: bool,

    /// Do not sync buffer swaps to the display refresh
    #[arg(long)]
    pub no_vsync: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<()> {
    let config = Config::load(args.config.as_deref())?;
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf));
    let settings = Settings::resolve(
        &args,
        config,
        std::env::var_os(PARAMS_ENV),
        exe_dir.as_deref(),
    );
    tracing::info!(
        "Shader {}, parameters {}",
        settings.shader.display(),
        settings.params_file.display()
    );

    let flags = LoopFlags::new();
    signals::install(&flags)?;

    let _watcher = if settings.watch {
        match watch::watch_shader(&settings.shader, &flags) {
            Ok(watcher) => Some(watcher),
            Err(e) => {
                tracing::warn!("{:#}, reload with SIGUSR1 instead", e);
                None
            }
        }
    } else {
        None
    };

    let platform = X11Platform::new(&X11Options {
        display: None,
        vsync: settings.vsync,
    })
    .context("Failed to set up X11 compositing")?;

    let mut compositor = Compositor::new(platform, settings.compositor_options(), flags)
        .context("Failed to start the compositor")?;
    tracing::info!("Running");

    let result = compositor.run();
    drop(compositor.shutdown());
    tracing::info!("Stopped");

    result.context("Compositor loop failed")
}
