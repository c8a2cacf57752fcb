//! screenshader X11 platform
//!
//! Composite/Damage/XFixes over x11rb, GLX texture-from-pixmap and the GL
//! passes over x11-dl and `gl`.
//!
//! # Features
//!
//! - **Redirection**: every top-level window rendered off-screen, overlay
//!   claimed and made input-transparent
//! - **Zero-copy binding**: per-depth GLX configurations, pixmaps bound as textures
//! - **Rendering**: framebuffer-backed composite pass, effect pass onto the overlay

mod binder;
pub mod display;
mod event_loop;
pub mod glx;
pub mod offscreen;
mod renderer;
mod shader;
mod xerror;

pub use display::X11Display;
pub use glx::{FbConfig, GlxContext};
pub use offscreen::{OffscreenTarget, QuadMesh};

use screenshader_core::Result;

/// Connection options
#[derive(Debug, Clone, Default)]
pub struct X11Options {
    /// Display name, `$DISPLAY` when `None`
    pub display: Option<String>,
    /// Sync buffer swaps to the display refresh
    pub vsync: bool,
}

/// X11/GLX implementation of every platform trait the compositor needs
pub struct X11Platform {
    // Field order is drop order: GL objects go before the context, the
    // context before the redirected connection.
    pub(crate) quad: QuadMesh,
    pub(crate) target: OffscreenTarget,
    pub(crate) glx: GlxContext,
    pub(crate) display: X11Display,
}

impl X11Platform {
    /// Redirect the display and bring up GL on the overlay.
    pub fn new(options: &X11Options) -> Result<Self> {
        let name = options.display.as_deref();
        let display = X11Display::connect(name)?;
        let glx = GlxContext::new(name, display.screen_num, display.overlay, options.vsync)?;
        let quad = QuadMesh::new();
        let target = OffscreenTarget::new();

        Ok(Self {
            quad,
            target,
            glx,
            display,
        })
    }
}
