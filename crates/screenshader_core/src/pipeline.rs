//! Two-pass render pipeline
//!
//! Pass 1 composites every bound window into the off-screen target, bottom
//! to top. Pass 2 runs the effect over that target onto the presented
//! surface.

use crate::binder;
use crate::error::Result;
use crate::params::ParameterSet;
use crate::platform::Platform;
use crate::program::ProgramManager;
use crate::registry::Registry;
use crate::window::{Geometry, Size, TextureId, WindowId};

/// Rectangle in the off-screen target (bottom-left origin)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn full(size: Size) -> Self {
        Self {
            x: 0,
            y: 0,
            width: size.width,
            height: size.height,
        }
    }

    /// Place a window's outer rectangle, borders included
    pub fn for_window(root_height: u32, geometry: &Geometry) -> Self {
        let width = geometry.width + 2 * geometry.border_width;
        let height = geometry.height + 2 * geometry.border_width;
        Self {
            x: geometry.x,
            y: root_height as i32 - geometry.y - height as i32,
            width,
            height,
        }
    }
}

/// One window drawn in pass 1
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowDraw {
    pub window: WindowId,
    pub texture: TextureId,
    pub viewport: Viewport,
}

/// Per-frame values for the effect's standard uniforms
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameUniforms {
    pub resolution: [f32; 2],
    /// Seconds since start
    pub time: f32,
}

/// Collect the windows to draw, refreshing dirty textures on the way
pub fn collect_draws<P: Platform>(
    platform: &mut P,
    registry: &mut Registry,
    root: Size,
) -> Vec<WindowDraw> {
    let keys: Vec<_> = registry.keys().collect();
    let mut draws = Vec::with_capacity(keys.len());
    for key in keys {
        let Some(window) = registry.get_by_key_mut(key) else {
            continue;
        };
        if !window.mapped || window.geometry.is_empty() {
            continue;
        }
        let Some(resources) = window.bound else {
            continue;
        };
        binder::refresh(platform, window);
        draws.push(WindowDraw {
            window: window.id,
            texture: resources.texture,
            viewport: Viewport::for_window(root.height, &window.geometry),
        });
    }
    draws
}

/// Render and present one frame
pub fn render_frame<P: Platform>(
    platform: &mut P,
    registry: &mut Registry,
    programs: &ProgramManager,
    params: &ParameterSet,
    root: Size,
    time: f32,
) -> Result<()> {
    let draws = collect_draws(platform, registry, root);
    platform.composite_pass(root, programs.composite(), &draws);

    let uniforms = FrameUniforms {
        resolution: [root.width as f32, root.height as f32],
        time,
    };
    platform.post_process_pass(root, programs.post(), uniforms, params.as_slice());
    platform.present()
}
