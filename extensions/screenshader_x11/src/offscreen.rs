//! Off-screen render targets and the shared quad
//!
//! The composite pass renders into an RGBA8 texture attached to a
//! framebuffer object. GL stores that texture bottom row first, so after
//! compositing it is blitted upside down into a second texture whose row 0
//! is the top of the screen. The post-process pass samples that one while
//! drawing the same full-screen quad onto the overlay.

use std::mem::size_of;

use screenshader_core::shaders::{QUAD_STRIDE, QUAD_VERTICES};
use screenshader_core::{CompositorError, Result, Size};

/// One texture with a framebuffer object bound to it
pub(crate) struct ColorBuffer {
    pub(crate) framebuffer: u32,
    pub(crate) texture: u32,
}

impl ColorBuffer {
    fn new() -> Self {
        let mut framebuffer = 0;
        let mut texture = 0;
        unsafe {
            gl::GenFramebuffers(1, &mut framebuffer);
            gl::GenTextures(1, &mut texture);
            gl::BindTexture(gl::TEXTURE_2D, texture);
            gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_MIN_FILTER, gl::LINEAR as i32);
            gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_MAG_FILTER, gl::LINEAR as i32);
            gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_WRAP_S, gl::CLAMP_TO_EDGE as i32);
            gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_WRAP_T, gl::CLAMP_TO_EDGE as i32);
            gl::BindTexture(gl::TEXTURE_2D, 0);
        }
        Self {
            framebuffer,
            texture,
        }
    }

    /// Allocate storage and return the framebuffer completeness status
    fn allocate(&self, width: i32, height: i32) -> u32 {
        unsafe {
            gl::BindTexture(gl::TEXTURE_2D, self.texture);
            gl::TexImage2D(
                gl::TEXTURE_2D,
                0,
                gl::RGBA8 as i32,
                width,
                height,
                0,
                gl::RGBA,
                gl::UNSIGNED_BYTE,
                std::ptr::null(),
            );
            gl::BindTexture(gl::TEXTURE_2D, 0);

            gl::BindFramebuffer(gl::FRAMEBUFFER, self.framebuffer);
            gl::FramebufferTexture2D(
                gl::FRAMEBUFFER,
                gl::COLOR_ATTACHMENT0,
                gl::TEXTURE_2D,
                self.texture,
                0,
            );
            let status = gl::CheckFramebufferStatus(gl::FRAMEBUFFER);
            gl::BindFramebuffer(gl::FRAMEBUFFER, 0);
            status
        }
    }
}

impl Drop for ColorBuffer {
    fn drop(&mut self) {
        unsafe {
            gl::DeleteFramebuffers(1, &self.framebuffer);
            gl::DeleteTextures(1, &self.texture);
        }
    }
}

/// Framebuffer-backed colour targets sized to the root window
pub struct OffscreenTarget {
    /// Pass 1 output, bottom row first
    pub(crate) composite: ColorBuffer,
    /// Pass 2 input, top row first
    pub(crate) screen: ColorBuffer,
    size: Size,
}

impl OffscreenTarget {
    /// Create the framebuffer and texture objects without storage.
    pub fn new() -> Self {
        Self {
            composite: ColorBuffer::new(),
            screen: ColorBuffer::new(),
            size: Size::default(),
        }
    }

    pub fn size(&self) -> Size {
        self.size
    }

    /// Allocate storage at `size` and verify both framebuffers are complete
    pub fn resize(&mut self, size: Size) -> Result<()> {
        if self.size == size {
            return Ok(());
        }
        if size.is_empty() {
            return Err(CompositorError::RenderTarget(format!("empty size {}", size)));
        }
        let width = i32::try_from(size.width).map_err(|_| {
            CompositorError::RenderTarget(format!("width {} too large", size.width))
        })?;
        let height = i32::try_from(size.height).map_err(|_| {
            CompositorError::RenderTarget(format!("height {} too large", size.height))
        })?;

        for buffer in [&self.composite, &self.screen] {
            let status = buffer.allocate(width, height);
            if status != gl::FRAMEBUFFER_COMPLETE {
                self.size = Size::default();
                return Err(CompositorError::RenderTarget(format!(
                    "framebuffer status 0x{:x} at {}",
                    status, size
                )));
            }
        }

        self.size = size;
        tracing::debug!("Off-screen target {}", size);
        Ok(())
    }

    /// Copy the composite texture into the screen texture with rows reversed
    pub(crate) fn flip_to_screen(&self) {
        let width = i32::try_from(self.size.width).unwrap_or(i32::MAX);
        let height = i32::try_from(self.size.height).unwrap_or(i32::MAX);
        unsafe {
            gl::BindFramebuffer(gl::READ_FRAMEBUFFER, self.composite.framebuffer);
            gl::BindFramebuffer(gl::DRAW_FRAMEBUFFER, self.screen.framebuffer);
            gl::BlitFramebuffer(
                0,
                0,
                width,
                height,
                0,
                height,
                width,
                0,
                gl::COLOR_BUFFER_BIT,
                gl::NEAREST,
            );
            gl::BindFramebuffer(gl::FRAMEBUFFER, 0);
        }
    }
}

/// Vertex array holding the full-screen triangle strip
pub struct QuadMesh {
    pub(crate) vertex_array: u32,
    vertex_buffer: u32,
}

impl QuadMesh {
    pub fn new() -> Self {
        let mut vertex_array = 0;
        let mut vertex_buffer = 0;
        let stride = (QUAD_STRIDE * size_of::<f32>()) as i32;
        unsafe {
            gl::GenVertexArrays(1, &mut vertex_array);
            gl::GenBuffers(1, &mut vertex_buffer);
            gl::BindVertexArray(vertex_array);
            gl::BindBuffer(gl::ARRAY_BUFFER, vertex_buffer);
            gl::BufferData(
                gl::ARRAY_BUFFER,
                std::mem::size_of_val(&QUAD_VERTICES) as isize,
                QUAD_VERTICES.as_ptr().cast(),
                gl::STATIC_DRAW,
            );
            gl::EnableVertexAttribArray(0);
            gl::VertexAttribPointer(0, 2, gl::FLOAT, gl::FALSE, stride, std::ptr::null());
            gl::EnableVertexAttribArray(1);
            gl::VertexAttribPointer(
                1,
                2,
                gl::FLOAT,
                gl::FALSE,
                stride,
                (2 * size_of::<f32>()) as *const _,
            );
            gl::BindVertexArray(0);
            gl::BindBuffer(gl::ARRAY_BUFFER, 0);
        }
        Self {
            vertex_array,
            vertex_buffer,
        }
    }
}

impl Drop for QuadMesh {
    fn drop(&mut self) {
        unsafe {
            gl::DeleteBuffers(1, &self.vertex_buffer);
            gl::DeleteVertexArrays(1, &self.vertex_array);
        }
    }
}
