//! Platform traits
//!
//! The compositor drives the window system and the GPU only through these
//! traits. The X11/GLX implementation lives in `screenshader_x11`.

use std::time::Duration;

use crate::error::{BindError, Result, ShaderError};
use crate::events::WindowEvent;
use crate::fbconfig::{DepthConfig, FbConfigCandidate};
use crate::params::Parameter;
use crate::pipeline::{FrameUniforms, WindowDraw};
use crate::program::{CompositeProgram, ShaderProgram};
use crate::window::{
    BoundResources, DamageId, GpuPixmapId, PixmapId, Size, TextureId, WindowAttributes, WindowId,
};

/// Shader stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

/// Compiled shader object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderId(pub u32);

/// Linked program object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramId(pub u32);

/// Resolved uniform location
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformLocation(pub i32);

/// Window server side of the compositor.
pub trait WindowSystem {
    /// Root window.
    fn root(&self) -> WindowId;

    /// Overlay window the final image is presented on.
    fn overlay(&self) -> WindowId;

    /// Current root dimensions.
    fn root_size(&self) -> Size;

    /// Children of the root, bottom to top.
    fn top_level_windows(&mut self) -> Result<Vec<WindowId>>;

    /// Query geometry, depth and viewability. `None` if the window is gone.
    fn attributes(&mut self, window: WindowId) -> Option<WindowAttributes>;

    /// Subscribe to content changes of a window.
    fn create_damage(&mut self, window: WindowId) -> Result<DamageId>;

    /// End a damage subscription.
    fn destroy_damage(&mut self, damage: DamageId);

    /// Acknowledge all accumulated damage.
    fn subtract_damage(&mut self, damage: DamageId);
}

/// Zero-copy binding of window contents to textures.
pub trait PixmapBinder {
    /// Platform surface configuration handle.
    type Config: Copy;

    /// Enumerate every configuration the driver offers.
    fn texture_configs(&mut self) -> Vec<FbConfigCandidate<Self::Config>>;

    /// Name a pixmap holding the window's redirected contents.
    fn name_pixmap(&mut self, window: WindowId) -> std::result::Result<PixmapId, String>;

    /// Wrap a named pixmap as a GPU pixmap of the given configuration.
    fn create_gpu_pixmap(
        &mut self,
        pixmap: PixmapId,
        config: &DepthConfig<Self::Config>,
    ) -> std::result::Result<GpuPixmapId, String>;

    /// Allocate a texture and bind the GPU pixmap's image into it.
    fn create_texture(&mut self, gpu_pixmap: GpuPixmapId)
        -> std::result::Result<TextureId, String>;

    /// Release and re-bind the image so the texture sees new contents.
    fn refresh_texture(&mut self, resources: &BoundResources);

    /// Release the GPU pixmap's image from its texture.
    fn release_image(&mut self, resources: &BoundResources);

    fn delete_texture(&mut self, texture: TextureId);

    fn destroy_gpu_pixmap(&mut self, gpu_pixmap: GpuPixmapId);

    fn free_pixmap(&mut self, pixmap: PixmapId);
}

/// Shader compilation and linking.
pub trait ShaderBackend {
    /// Compile one stage. `label` names the source in error messages.
    fn compile(
        &mut self,
        stage: ShaderStage,
        source: &str,
        label: &str,
    ) -> std::result::Result<ShaderId, ShaderError>;

    /// Link a vertex and fragment stage into a program.
    fn link(
        &mut self,
        vertex: ShaderId,
        fragment: ShaderId,
    ) -> std::result::Result<ProgramId, ShaderError>;

    fn delete_shader(&mut self, shader: ShaderId);

    fn delete_program(&mut self, program: ProgramId);

    /// Look up a uniform. `None` if the program has no active uniform by that name.
    fn uniform_location(&mut self, program: ProgramId, name: &str) -> Option<UniformLocation>;
}

/// The two render passes and presentation.
pub trait RenderBackend {
    /// Allocate or reallocate the off-screen target at `size`.
    fn resize_target(&mut self, size: Size) -> Result<()>;

    /// Draw every window into the off-screen target, bottom to top.
    fn composite_pass(&mut self, root: Size, program: &CompositeProgram, draws: &[WindowDraw]);

    /// Draw the off-screen target through the effect onto the presented surface.
    fn post_process_pass(
        &mut self,
        root: Size,
        program: &ShaderProgram,
        uniforms: FrameUniforms,
        params: &[Parameter],
    );

    /// Swap buffers.
    fn present(&mut self) -> Result<()>;
}

/// Source of window system notifications.
pub trait EventSource {
    /// Next pending event without blocking.
    fn next_event(&mut self) -> Result<Option<WindowEvent>>;

    /// Block until events are pending or `timeout` elapses.
    fn wait_for_events(&mut self, timeout: Duration);
}

/// Everything the compositor needs from its host.
pub trait Platform:
    WindowSystem + PixmapBinder + ShaderBackend + RenderBackend + EventSource
{
}

impl<T> Platform for T where
    T: WindowSystem + PixmapBinder + ShaderBackend + RenderBackend + EventSource
{
}
