//! Configuration file handling and settings resolution

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use screenshader_core::{CompositorOptions, DEFAULT_SHADER};

use crate::Args;

/// Environment variable overriding the parameter file path
pub const PARAMS_ENV: &str = "SCREENSHADER_PARAMS";

/// Top-level configuration (config.toml)
#[derive(Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub shader: ShaderConfig,
    #[serde(default)]
    pub params: ParamsConfig,
    #[serde(default)]
    pub frame: FrameConfig,
}

/// Effect shader settings
#[derive(Debug, Deserialize, Serialize, PartialEq)]
pub struct ShaderConfig {
    /// Fragment shader path
    #[serde(default = "default_shader")]
    pub path: PathBuf,
    /// Reload when the file changes on disk
    #[serde(default)]
    pub watch: bool,
}

fn default_shader() -> PathBuf {
    PathBuf::from(DEFAULT_SHADER)
}

impl Default for ShaderConfig {
    fn default() -> Self {
        Self {
            path: default_shader(),
            watch: false,
        }
    }
}

/// Runtime parameter file settings
#[derive(Debug, Deserialize, Serialize, PartialEq)]
pub struct ParamsConfig {
    #[serde(default = "default_params_file")]
    pub file: PathBuf,
    /// Loop iterations between checks
    #[serde(default = "default_poll_every")]
    pub poll_every: u32,
}

fn default_params_file() -> PathBuf {
    CompositorOptions::default().params_path
}

fn default_poll_every() -> u32 {
    CompositorOptions::default().poll_every
}

impl Default for ParamsConfig {
    fn default() -> Self {
        Self {
            file: default_params_file(),
            poll_every: default_poll_every(),
        }
    }
}

/// Frame pacing
#[derive(Debug, Deserialize, Serialize, PartialEq)]
pub struct FrameConfig {
    /// Longest wait for events between iterations
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_true")]
    pub vsync: bool,
}

fn default_interval_ms() -> u64 {
    CompositorOptions::default().frame_interval.as_millis() as u64
}

fn default_true() -> bool {
    true
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            vsync: true,
        }
    }
}

impl Config {
    /// Load the configuration
    ///
    /// An explicit path must exist. Otherwise the per-user file is used when
    /// present and defaults when not.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load_from(path),
            None => match default_config_path() {
                Some(path) if path.is_file() => Self::load_from(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    /// Load configuration from a file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }
}

/// `$XDG_CONFIG_HOME/screenshader/config.toml`, falling back to `~/.config`
fn default_config_path() -> Option<PathBuf> {
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))?;
    Some(base.join("screenshader").join("config.toml"))
}

/// Settings after merging arguments, environment and file
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub shader: PathBuf,
    pub watch: bool,
    pub params_file: PathBuf,
    pub poll_every: u32,
    pub frame_interval: Duration,
    pub vsync: bool,
}

impl Settings {
    /// Arguments win over the environment, which wins over the file.
    pub fn resolve(
        args: &Args,
        config: Config,
        params_env: Option<OsString>,
        exe_dir: Option<&Path>,
    ) -> Self {
        let shader = args.shader.clone().unwrap_or(config.shader.path);
        let params_file = args
            .params
            .clone()
            .or_else(|| params_env.filter(|v| !v.is_empty()).map(PathBuf::from))
            .unwrap_or(config.params.file);

        Self {
            shader: resolve_shader_path(&shader, exe_dir),
            watch: args.watch || config.shader.watch,
            params_file,
            poll_every: config.params.poll_every.max(1),
            frame_interval: Duration::from_millis(config.frame.interval_ms),
            vsync: config.frame.vsync && !args.no_vsync,
        }
    }

    pub fn compositor_options(&self) -> CompositorOptions {
        CompositorOptions {
            shader_path: self.shader.clone(),
            params_path: self.params_file.clone(),
            poll_every: self.poll_every,
            frame_interval: self.frame_interval,
        }
    }
}

/// Look a bare relative path up next to the executable first
///
/// Absolute paths and paths starting with `./` or `../` are used as given.
pub fn resolve_shader_path(path: &Path, exe_dir: Option<&Path>) -> PathBuf {
    if path.is_absolute() || path.starts_with(".") || path.starts_with("..") {
        return path.to_path_buf();
    }
    match exe_dir {
        Some(dir) if dir.join(path).is_file() => dir.join(path),
        _ => path.to_path_buf(),
    }
}
