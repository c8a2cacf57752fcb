//! The compositor loop
//!
//! One `Compositor` owns the platform (connection and GL context) together
//! with every piece of state the loop touches. Each iteration drains events,
//! handles at most one reload request, polls parameters on its interval,
//! renders when needed and then waits on the connection for at most one
//! frame interval.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::control::LoopFlags;
use crate::error::{CompositorError, Result};
use crate::events::WindowEvent;
use crate::fbconfig::FbConfigIndex;
use crate::params::{ParameterSet, ParameterStore, DEFAULT_PARAMS_PATH, DEFAULT_POLL_EVERY};
use crate::pipeline;
use crate::platform::Platform;
use crate::program::{ProgramManager, ShaderProgram};
use crate::registry::Registry;
use crate::tracker::{Dispatch, WindowTracker};
use crate::window::Size;

/// Default shader, relative to the executable's directory
pub const DEFAULT_SHADER: &str = "shaders/crt.frag";

/// Default upper bound on the wait between iterations
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Settings fixed for the compositor's lifetime
#[derive(Debug, Clone)]
pub struct CompositorOptions {
    pub shader_path: PathBuf,
    pub params_path: PathBuf,
    /// Iterations between parameter file checks
    pub poll_every: u32,
    pub frame_interval: Duration,
}

impl Default for CompositorOptions {
    fn default() -> Self {
        Self {
            shader_path: PathBuf::from(DEFAULT_SHADER),
            params_path: PathBuf::from(DEFAULT_PARAMS_PATH),
            poll_every: DEFAULT_POLL_EVERY,
            frame_interval: DEFAULT_FRAME_INTERVAL,
        }
    }
}

pub struct Compositor<P: Platform> {
    platform: P,
    tracker: WindowTracker<P::Config>,
    programs: ProgramManager,
    params: ParameterSet,
    store: ParameterStore,
    flags: LoopFlags,
    needs_redraw: bool,
    started: Instant,
    frame_interval: Duration,
}

impl<P: Platform> Compositor<P> {
    /// Build the compositor on an initialized platform
    ///
    /// Fails if no configuration supports pixmap binding, the off-screen
    /// target cannot be allocated, or the initial shader does not build.
    pub fn new(mut platform: P, options: CompositorOptions, flags: LoopFlags) -> Result<Self> {
        let started = Instant::now();
        let index = FbConfigIndex::from_candidates(platform.texture_configs());
        if index.is_empty() {
            return Err(CompositorError::NoBindableConfig);
        }
        tracing::info!(
            "Texture-from-pixmap configs for depths {:?}",
            index.available_depths()
        );

        let root_size = platform.root_size();
        tracing::info!("Screen: {}", root_size);
        platform.resize_target(root_size)?;

        let programs = ProgramManager::load(&mut platform, &options.shader_path)?;

        let mut tracker = WindowTracker::new(platform.root(), platform.overlay(), root_size, index);
        if let Err(e) = tracker.adopt_existing(&mut platform) {
            tracker.release_all(&mut platform);
            programs.destroy(&mut platform);
            return Err(e);
        }

        let mut store = ParameterStore::new(options.params_path, options.poll_every);
        let mut params = store.poll().unwrap_or_default();
        programs.resolve_params(&mut platform, &mut params);

        Ok(Self {
            platform,
            tracker,
            programs,
            params,
            store,
            flags,
            needs_redraw: true,
            started,
            frame_interval: options.frame_interval,
        })
    }

    /// Apply one window system event
    pub fn dispatch(&mut self, event: WindowEvent) -> Dispatch {
        let outcome = self.tracker.handle(&mut self.platform, event);
        match outcome {
            Dispatch::Ignored => {}
            Dispatch::Redraw => self.needs_redraw = true,
            Dispatch::RootResized(size) => {
                match self.platform.resize_target(size) {
                    Ok(()) => self.tracker.set_root_size(size),
                    Err(e) => tracing::warn!(
                        "Failed to resize off-screen target, staying at {}: {}",
                        self.tracker.root_size(),
                        e
                    ),
                }
                self.needs_redraw = true;
            }
        }
        outcome
    }

    /// Drain every pending event without blocking
    pub fn pump_events(&mut self) -> Result<usize> {
        let mut handled = 0;
        while let Some(event) = self.platform.next_event()? {
            self.dispatch(event);
            handled += 1;
        }
        Ok(handled)
    }

    /// Rebuild the effect from disk, keeping the current one on failure
    pub fn reload_shader(&mut self) -> bool {
        tracing::info!(
            "Reloading shader: {}",
            self.programs.source_path().display()
        );
        match self.programs.reload(&mut self.platform, &mut self.params) {
            Ok(()) => {
                self.needs_redraw = true;
                true
            }
            Err(e) => {
                tracing::warn!("Hot-reload failed, keeping current shader: {}", e);
                false
            }
        }
    }

    /// Re-read the parameter file if it changed
    pub fn poll_parameters(&mut self) -> bool {
        let Some(mut params) = self.store.poll() else {
            return false;
        };
        self.programs.resolve_params(&mut self.platform, &mut params);
        self.params = params;
        self.needs_redraw = true;
        true
    }

    /// Draw and present one frame
    pub fn render(&mut self) {
        let root = self.tracker.root_size();
        let time = self.started.elapsed().as_secs_f32();
        let result = pipeline::render_frame(
            &mut self.platform,
            self.tracker.registry_mut(),
            &self.programs,
            &self.params,
            root,
            time,
        );
        if let Err(e) = result {
            tracing::warn!("Frame not presented: {}", e);
        }
    }

    /// One pass of the main loop
    pub fn iterate(&mut self) -> Result<()> {
        self.pump_events()?;

        if self.flags.take_reload() {
            self.reload_shader();
            self.needs_redraw = true;
        }

        if self.store.tick() {
            self.poll_parameters();
        }

        if self.needs_redraw {
            self.render();
            self.needs_redraw = false;
        }

        self.platform.wait_for_events(self.frame_interval);

        // Effects animate with time, so every iteration redraws
        self.needs_redraw = true;
        Ok(())
    }

    /// Loop until shutdown is requested
    pub fn run(&mut self) -> Result<()> {
        tracing::info!("Compositor running");
        while !self.flags.should_stop() {
            self.iterate()?;
        }
        Ok(())
    }

    /// Release every window and GL object, returning the platform
    pub fn shutdown(mut self) -> P {
        tracing::info!("Shutting down");
        self.tracker.release_all(&mut self.platform);
        self.programs.destroy(&mut self.platform);
        self.platform
    }

    pub fn registry(&self) -> &Registry {
        self.tracker.registry()
    }

    pub fn params(&self) -> &ParameterSet {
        &self.params
    }

    pub fn post_program(&self) -> &ShaderProgram {
        self.programs.post()
    }

    pub fn root_size(&self) -> Size {
        self.tracker.root_size()
    }

    pub fn needs_redraw(&self) -> bool {
        self.needs_redraw
    }

    pub fn flags(&self) -> &LoopFlags {
        &self.flags
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }
}
