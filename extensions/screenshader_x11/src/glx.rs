//! GLX context on the composite overlay
//!
//! A second, Xlib-based connection carries every GLX request. It owns the
//! direct GL context, the GLX window wrapping the overlay and the
//! `GLX_EXT_texture_from_pixmap` entry points.

use std::ffi::{CStr, CString};
use std::os::raw::c_int;
use std::ptr;

use screenshader_core::{
    CompositorError, DepthConfig, FbConfigCandidate, GpuPixmapId, PixmapId, Result, TextureFormat,
};
use x11_dl::glx::{self, Glx};
use x11_dl::xlib::{self, Xlib};

use crate::xerror;

const GLX_BIND_TO_TEXTURE_RGB_EXT: c_int = 0x20D0;
const GLX_BIND_TO_TEXTURE_RGBA_EXT: c_int = 0x20D1;
const GLX_BIND_TO_TEXTURE_TARGETS_EXT: c_int = 0x20D3;
const GLX_TEXTURE_2D_BIT_EXT: c_int = 0x0002;
const GLX_TEXTURE_FORMAT_EXT: c_int = 0x20D5;
const GLX_TEXTURE_TARGET_EXT: c_int = 0x20D6;
const GLX_TEXTURE_FORMAT_RGB_EXT: c_int = 0x20D9;
const GLX_TEXTURE_FORMAT_RGBA_EXT: c_int = 0x20DA;
const GLX_TEXTURE_2D_EXT: c_int = 0x20DC;
const GLX_FRONT_LEFT_EXT: c_int = 0x20DE;

const TEXTURE_FROM_PIXMAP: &str = "GLX_EXT_texture_from_pixmap";

type TexImageFn = unsafe extern "C" fn(*mut xlib::Display, glx::GLXDrawable, c_int, *const c_int);
type SwapIntervalFn = unsafe extern "C" fn(*mut xlib::Display, glx::GLXDrawable, c_int);

/// Surface configuration handle handed to the core
pub type FbConfig = glx::GLXFBConfig;

/// Direct GL context current on the overlay
pub struct GlxContext {
    xlib: Xlib,
    glx: Glx,
    display: *mut xlib::Display,
    screen: c_int,
    context: glx::GLXContext,
    window: glx::GLXWindow,
    bind_tex_image: Option<TexImageFn>,
    release_tex_image: Option<TexImageFn>,
}

impl GlxContext {
    /// Open the GLX connection and make a context current on `overlay`.
    ///
    /// `vsync` selects the swap interval when `glXSwapIntervalEXT` exists.
    pub fn new(
        display_name: Option<&str>,
        screen: usize,
        overlay: u32,
        vsync: bool,
    ) -> Result<Self> {
        let xlib = Xlib::open().map_err(|e| CompositorError::Context(format!("libX11: {}", e)))?;
        let glx = Glx::open().map_err(|e| CompositorError::Context(format!("libGL: {}", e)))?;

        let name = display_name
            .map(CString::new)
            .transpose()
            .map_err(|e| CompositorError::Connection(e.to_string()))?;
        let display =
            unsafe { (xlib.XOpenDisplay)(name.as_ref().map_or(ptr::null(), |n| n.as_ptr())) };
        if display.is_null() {
            return Err(CompositorError::Connection(
                "XOpenDisplay returned no display".to_string(),
            ));
        }
        xerror::install(&xlib);

        // From here on, dropping `ctx` undoes whatever has been created
        let mut ctx = Self {
            xlib,
            glx,
            display,
            screen: c_int::try_from(screen).unwrap_or(0),
            context: ptr::null_mut(),
            window: 0,
            bind_tex_image: None,
            release_tex_image: None,
        };

        let (mut major, mut minor) = (0, 0);
        if unsafe { (ctx.glx.glXQueryVersion)(ctx.display, &mut major, &mut minor) } == 0 {
            return Err(CompositorError::MissingExtension("GLX".to_string()));
        }
        if !ctx.extensions().contains(TEXTURE_FROM_PIXMAP) {
            return Err(CompositorError::MissingExtension(TEXTURE_FROM_PIXMAP.to_string()));
        }
        tracing::info!("GLX {}.{}", major, minor);

        let config = ctx.window_config()?;
        ctx.context = unsafe {
            (ctx.glx.glXCreateNewContext)(
                ctx.display,
                config,
                glx::GLX_RGBA_TYPE,
                ptr::null_mut(),
                1,
            )
        };
        if ctx.context.is_null() {
            return Err(CompositorError::Context("glXCreateNewContext failed".to_string()));
        }

        xerror::clear();
        ctx.window = unsafe {
            (ctx.glx.glXCreateWindow)(ctx.display, config, xlib::Window::from(overlay), ptr::null())
        };
        if let Some(code) = xerror::sync_and_take(&ctx.xlib, ctx.display) {
            ctx.window = 0;
            return Err(CompositorError::Context(format!(
                "glXCreateWindow on overlay: {}",
                xerror::describe(code)
            )));
        }
        if ctx.window == 0 {
            return Err(CompositorError::Context("glXCreateWindow failed".to_string()));
        }

        let current = unsafe {
            (ctx.glx.glXMakeContextCurrent)(ctx.display, ctx.window, ctx.window, ctx.context)
        };
        if current == 0 {
            return Err(CompositorError::Context("glXMakeContextCurrent failed".to_string()));
        }

        gl::load_with(|symbol| ctx.proc_address(symbol).map_or(ptr::null(), |f| f as *const _));

        ctx.bind_tex_image = ctx
            .proc_address("glXBindTexImageEXT")
            .map(|f| unsafe { std::mem::transmute::<unsafe extern "C" fn(), TexImageFn>(f) });
        ctx.release_tex_image = ctx
            .proc_address("glXReleaseTexImageEXT")
            .map(|f| unsafe { std::mem::transmute::<unsafe extern "C" fn(), TexImageFn>(f) });
        if ctx.bind_tex_image.is_none() || ctx.release_tex_image.is_none() {
            return Err(CompositorError::MissingExtension(format!(
                "{} entry points",
                TEXTURE_FROM_PIXMAP
            )));
        }

        ctx.set_swap_interval(if vsync { 1 } else { 0 });

        let version = unsafe { gl::GetString(gl::VERSION) };
        if !version.is_null() {
            let version = unsafe { CStr::from_ptr(version.cast()) };
            tracing::info!("OpenGL {}", version.to_string_lossy());
        }

        Ok(ctx)
    }

    fn extensions(&self) -> String {
        let s = unsafe { (self.glx.glXQueryExtensionsString)(self.display, self.screen) };
        if s.is_null() {
            return String::new();
        }
        unsafe { CStr::from_ptr(s) }.to_string_lossy().into_owned()
    }

    fn proc_address(&self, symbol: &str) -> Option<unsafe extern "C" fn()> {
        let symbol = CString::new(symbol).ok()?;
        unsafe { (self.glx.glXGetProcAddress)(symbol.as_ptr().cast()) }
    }

    /// Double-buffered RGBA8 window configuration for the overlay
    fn window_config(&self) -> Result<glx::GLXFBConfig> {
        let attribs = [
            glx::GLX_DRAWABLE_TYPE,
            glx::GLX_WINDOW_BIT,
            glx::GLX_RENDER_TYPE,
            glx::GLX_RGBA_BIT,
            glx::GLX_DOUBLEBUFFER,
            1,
            glx::GLX_RED_SIZE,
            8,
            glx::GLX_GREEN_SIZE,
            8,
            glx::GLX_BLUE_SIZE,
            8,
            glx::GLX_ALPHA_SIZE,
            8,
            0,
        ];
        let mut count = 0;
        let configs = unsafe {
            (self.glx.glXChooseFBConfig)(self.display, self.screen, attribs.as_ptr(), &mut count)
        };
        if configs.is_null() || count <= 0 {
            if !configs.is_null() {
                unsafe { (self.xlib.XFree)(configs.cast()) };
            }
            return Err(CompositorError::Context(
                "no double-buffered RGBA8 window configuration".to_string(),
            ));
        }
        let config = unsafe { *configs };
        unsafe { (self.xlib.XFree)(configs.cast()) };
        Ok(config)
    }

    fn set_swap_interval(&self, interval: c_int) {
        match self.proc_address("glXSwapIntervalEXT") {
            Some(f) => {
                let swap =
                    unsafe { std::mem::transmute::<unsafe extern "C" fn(), SwapIntervalFn>(f) };
                unsafe { swap(self.display, self.window, interval) };
                tracing::debug!("Swap interval {}", interval);
            }
            None => tracing::warn!(
                "glXSwapIntervalEXT unavailable, swap interval left at driver default"
            ),
        }
    }

    fn config_attrib(&self, config: glx::GLXFBConfig, attrib: c_int) -> c_int {
        let mut value = 0;
        unsafe { (self.glx.glXGetFBConfigAttrib)(self.display, config, attrib, &mut value) };
        value
    }

    /// Describe every configuration on the screen for depth selection.
    pub fn texture_configs(&self) -> Vec<FbConfigCandidate<FbConfig>> {
        let mut count = 0;
        let configs = unsafe { (self.glx.glXGetFBConfigs)(self.display, self.screen, &mut count) };
        if configs.is_null() {
            return Vec::new();
        }
        let list =
            unsafe { std::slice::from_raw_parts(configs, usize::try_from(count).unwrap_or(0)) };

        let candidates = list
            .iter()
            .map(|&config| {
                let visual = unsafe { (self.glx.glXGetVisualFromFBConfig)(self.display, config) };
                let depth = if visual.is_null() {
                    None
                } else {
                    let depth = unsafe { (*visual).depth };
                    unsafe { (self.xlib.XFree)(visual.cast()) };
                    u8::try_from(depth).ok()
                };

                FbConfigCandidate {
                    config,
                    pixmap_drawable: self.config_attrib(config, glx::GLX_DRAWABLE_TYPE)
                        & glx::GLX_PIXMAP_BIT
                        != 0,
                    texture_2d_target: self.config_attrib(config, GLX_BIND_TO_TEXTURE_TARGETS_EXT)
                        & GLX_TEXTURE_2D_BIT_EXT
                        != 0,
                    double_buffered: self.config_attrib(config, glx::GLX_DOUBLEBUFFER) != 0,
                    bind_rgb: self.config_attrib(config, GLX_BIND_TO_TEXTURE_RGB_EXT) != 0,
                    bind_rgba: self.config_attrib(config, GLX_BIND_TO_TEXTURE_RGBA_EXT) != 0,
                    depth,
                }
            })
            .collect();

        unsafe { (self.xlib.XFree)(configs.cast()) };
        candidates
    }

    /// Wrap a named pixmap as a 2D-texture GLX pixmap.
    pub fn create_pixmap(
        &self,
        pixmap: PixmapId,
        config: &DepthConfig<FbConfig>,
    ) -> std::result::Result<GpuPixmapId, String> {
        let format = match config.format {
            TextureFormat::Rgb => GLX_TEXTURE_FORMAT_RGB_EXT,
            TextureFormat::Rgba => GLX_TEXTURE_FORMAT_RGBA_EXT,
        };
        let attribs = [
            GLX_TEXTURE_TARGET_EXT,
            GLX_TEXTURE_2D_EXT,
            GLX_TEXTURE_FORMAT_EXT,
            format,
            0,
        ];

        xerror::clear();
        let glx_pixmap = unsafe {
            (self.glx.glXCreatePixmap)(
                self.display,
                config.config,
                xlib::Pixmap::from(pixmap.0),
                attribs.as_ptr(),
            )
        };
        match xerror::sync_and_take(&self.xlib, self.display) {
            Some(code) => {
                if glx_pixmap != 0 {
                    self.destroy_pixmap(GpuPixmapId(u64::from(glx_pixmap)));
                }
                Err(xerror::describe(code))
            }
            None if glx_pixmap == 0 => Err("glXCreatePixmap returned no pixmap".to_string()),
            None => Ok(GpuPixmapId(u64::from(glx_pixmap))),
        }
    }

    pub fn destroy_pixmap(&self, pixmap: GpuPixmapId) {
        unsafe {
            (self.glx.glXDestroyPixmap)(self.display, pixmap.0 as glx::GLXPixmap);
            (self.xlib.XFlush)(self.display);
        }
    }

    /// Bind the pixmap's image to the texture currently bound to `GL_TEXTURE_2D`.
    ///
    /// Returns the X error the bind raised, if any.
    pub fn bind_image(&self, pixmap: GpuPixmapId) -> Option<i32> {
        let bind = self.bind_tex_image?;
        xerror::clear();
        unsafe {
            (self.glx.glXWaitX)();
            bind(self.display, pixmap.0 as glx::GLXDrawable, GLX_FRONT_LEFT_EXT, ptr::null());
        }
        xerror::sync_and_take(&self.xlib, self.display)
    }

    /// Rebind without a round trip, for per-frame refreshes.
    pub fn rebind_image(&self, pixmap: GpuPixmapId) {
        if let (Some(release), Some(bind)) = (self.release_tex_image, self.bind_tex_image) {
            let drawable = pixmap.0 as glx::GLXDrawable;
            unsafe {
                release(self.display, drawable, GLX_FRONT_LEFT_EXT, ptr::null());
                (self.glx.glXWaitX)();
                bind(self.display, drawable, GLX_FRONT_LEFT_EXT, ptr::null());
            }
        }
    }

    pub fn release_image(&self, pixmap: GpuPixmapId) {
        if let Some(release) = self.release_tex_image {
            unsafe {
                release(
                    self.display,
                    pixmap.0 as glx::GLXDrawable,
                    GLX_FRONT_LEFT_EXT,
                    ptr::null(),
                )
            };
        }
    }

    /// Swap the overlay's buffers, reporting a pending GL error.
    pub fn swap_buffers(&self) -> Result<()> {
        unsafe { (self.glx.glXSwapBuffers)(self.display, self.window) };
        let error = unsafe { gl::GetError() };
        if error != gl::NO_ERROR {
            return Err(CompositorError::Present(format!("GL error 0x{:x}", error)));
        }
        Ok(())
    }
}

impl Drop for GlxContext {
    fn drop(&mut self) {
        unsafe {
            (self.glx.glXMakeContextCurrent)(self.display, 0, 0, ptr::null_mut());
            if self.window != 0 {
                (self.glx.glXDestroyWindow)(self.display, self.window);
            }
            if !self.context.is_null() {
                (self.glx.glXDestroyContext)(self.display, self.context);
            }
            (self.xlib.XCloseDisplay)(self.display);
        }
    }
}
