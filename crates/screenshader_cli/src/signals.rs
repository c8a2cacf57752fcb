//! Signal handling
//!
//! Handlers only store into the loop's atomic flags.

use anyhow::{Context, Result};
use signal_hook::consts::{SIGINT, SIGTERM, SIGUSR1};
use signal_hook::flag;

use screenshader_core::LoopFlags;

/// SIGINT/SIGTERM request shutdown, SIGUSR1 requests a shader reload
pub fn install(flags: &LoopFlags) -> Result<()> {
    for signal in [SIGINT, SIGTERM] {
        flag::register(signal, flags.shutdown_flag())
            .with_context(|| format!("Failed to register handler for signal {}", signal))?;
    }
    flag::register(SIGUSR1, flags.reload_flag())
        .context("Failed to register SIGUSR1 handler")?;
    Ok(())
}
