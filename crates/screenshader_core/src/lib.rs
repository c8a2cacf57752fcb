//! screenshader core
//!
//! Full-desktop post-processing compositor, independent of the window
//! system and graphics API it runs on.
//!
//! # Features
//!
//! - **Window tracking**: stacking-ordered registry driven by map, configure,
//!   reparent and circulate notifications
//! - **Damage scheduling**: per-window damage subscriptions mark textures dirty
//! - **Zero-copy binding**: window pixmaps bound as textures with rollback on failure
//! - **Two-pass pipeline**: composite into an off-screen target, then run the effect
//! - **Hot reload**: effect rebuilt in place, the old program kept on failure
//! - **Runtime parameters**: `name value` file applied as float uniforms

pub mod binder;
pub mod compositor;
pub mod control;
pub mod error;
pub mod events;
pub mod fbconfig;
pub mod params;
pub mod pipeline;
pub mod platform;
pub mod program;
pub mod registry;
pub mod shaders;
pub mod tracker;
pub mod window;

pub use compositor::{Compositor, CompositorOptions, DEFAULT_FRAME_INTERVAL, DEFAULT_SHADER};
pub use control::LoopFlags;
pub use error::{BindError, CompositorError, Result, ShaderError};
pub use events::{Place, WindowEvent};
pub use fbconfig::{DepthConfig, FbConfigCandidate, FbConfigIndex, TextureFormat};
pub use params::{Parameter, ParameterSet, ParameterStore};
pub use pipeline::{FrameUniforms, Viewport, WindowDraw};
pub use platform::{
    EventSource, PixmapBinder, Platform, ProgramId, RenderBackend, ShaderBackend, ShaderId,
    ShaderStage, UniformLocation, WindowSystem,
};
pub use program::{CompositeProgram, ProgramManager, ShaderProgram};
pub use registry::{Registry, Restack, WindowKey};
pub use tracker::{Dispatch, WindowTracker};
pub use window::{
    BoundResources, DamageId, Geometry, GpuPixmapId, PixmapId, Size, TextureId, TrackedWindow,
    WindowAttributes, WindowId, WindowState,
};
