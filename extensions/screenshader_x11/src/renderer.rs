//! The two GL passes and presentation

use screenshader_core::shaders::QUAD_VERTEX_COUNT;
use screenshader_core::{
    CompositeProgram, FrameUniforms, Parameter, RenderBackend, Result, ShaderProgram, Size,
    Viewport, WindowDraw,
};

use crate::X11Platform;

fn set_viewport(viewport: Viewport) {
    unsafe {
        gl::Viewport(
            viewport.x,
            viewport.y,
            i32::try_from(viewport.width).unwrap_or(i32::MAX),
            i32::try_from(viewport.height).unwrap_or(i32::MAX),
        );
    }
}

impl RenderBackend for X11Platform {
    fn resize_target(&mut self, size: Size) -> Result<()> {
        self.target.resize(size)
    }

    fn composite_pass(&mut self, root: Size, program: &CompositeProgram, draws: &[WindowDraw]) {
        unsafe {
            gl::BindFramebuffer(gl::FRAMEBUFFER, self.target.composite.framebuffer);
            set_viewport(Viewport::full(root));
            gl::ClearColor(0.0, 0.0, 0.0, 1.0);
            gl::Clear(gl::COLOR_BUFFER_BIT);

            // Window pixmaps carry premultiplied alpha
            gl::Enable(gl::BLEND);
            gl::BlendFunc(gl::ONE, gl::ONE_MINUS_SRC_ALPHA);

            gl::UseProgram(program.program.0);
            gl::ActiveTexture(gl::TEXTURE0);
            if let Some(location) = program.texture {
                gl::Uniform1i(location.0, 0);
            }
            gl::BindVertexArray(self.quad.vertex_array);

            for draw in draws {
                set_viewport(draw.viewport);
                gl::BindTexture(gl::TEXTURE_2D, draw.texture.0);
                gl::DrawArrays(gl::TRIANGLE_STRIP, 0, QUAD_VERTEX_COUNT);
            }

            gl::BindTexture(gl::TEXTURE_2D, 0);
            gl::Disable(gl::BLEND);
            gl::BindFramebuffer(gl::FRAMEBUFFER, 0);
        }
        self.target.flip_to_screen();
    }

    fn post_process_pass(
        &mut self,
        root: Size,
        program: &ShaderProgram,
        uniforms: FrameUniforms,
        params: &[Parameter],
    ) {
        unsafe {
            gl::BindFramebuffer(gl::FRAMEBUFFER, 0);
            set_viewport(Viewport::full(root));
            gl::ClearColor(0.0, 0.0, 0.0, 1.0);
            gl::Clear(gl::COLOR_BUFFER_BIT);

            gl::UseProgram(program.program.0);
            gl::ActiveTexture(gl::TEXTURE0);
            gl::BindTexture(gl::TEXTURE_2D, self.target.screen.texture);
            if let Some(location) = program.screen {
                gl::Uniform1i(location.0, 0);
            }
            if let Some(location) = program.resolution {
                gl::Uniform2f(location.0, uniforms.resolution[0], uniforms.resolution[1]);
            }
            if let Some(location) = program.time {
                gl::Uniform1f(location.0, uniforms.time);
            }
            for param in params {
                if let Some(location) = param.location {
                    gl::Uniform1f(location.0, param.value);
                }
            }

            gl::BindVertexArray(self.quad.vertex_array);
            gl::DrawArrays(gl::TRIANGLE_STRIP, 0, QUAD_VERTEX_COUNT);
            gl::BindVertexArray(0);
            gl::BindTexture(gl::TEXTURE_2D, 0);
            gl::UseProgram(0);
        }
    }

    fn present(&mut self) -> Result<()> {
        self.glx.swap_buffers()
    }
}
