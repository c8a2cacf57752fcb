//! GLSL compilation through the current GL context

use std::ffi::CString;

use screenshader_core::{
    ProgramId, ShaderBackend, ShaderError, ShaderId, ShaderStage, UniformLocation,
};

use crate::X11Platform;

fn shader_log(shader: u32) -> String {
    let mut len = 0;
    unsafe { gl::GetShaderiv(shader, gl::INFO_LOG_LENGTH, &mut len) };
    let mut buf = vec![0u8; usize::try_from(len).unwrap_or(0).max(1)];
    let mut written = 0;
    unsafe {
        gl::GetShaderInfoLog(shader, len.max(1), &mut written, buf.as_mut_ptr().cast());
    }
    buf.truncate(usize::try_from(written).unwrap_or(0));
    String::from_utf8_lossy(&buf).trim_end().to_string()
}

fn program_log(program: u32) -> String {
    let mut len = 0;
    unsafe { gl::GetProgramiv(program, gl::INFO_LOG_LENGTH, &mut len) };
    let mut buf = vec![0u8; usize::try_from(len).unwrap_or(0).max(1)];
    let mut written = 0;
    unsafe {
        gl::GetProgramInfoLog(program, len.max(1), &mut written, buf.as_mut_ptr().cast());
    }
    buf.truncate(usize::try_from(written).unwrap_or(0));
    String::from_utf8_lossy(&buf).trim_end().to_string()
}

impl ShaderBackend for X11Platform {
    fn compile(
        &mut self,
        stage: ShaderStage,
        source: &str,
        label: &str,
    ) -> Result<ShaderId, ShaderError> {
        let kind = match stage {
            ShaderStage::Vertex => gl::VERTEX_SHADER,
            ShaderStage::Fragment => gl::FRAGMENT_SHADER,
        };
        let source = CString::new(source).map_err(|_| ShaderError::Compile {
            label: label.to_string(),
            log: "source contains a NUL byte".to_string(),
        })?;

        let shader = unsafe { gl::CreateShader(kind) };
        let mut status = 0;
        unsafe {
            gl::ShaderSource(shader, 1, &source.as_ptr(), std::ptr::null());
            gl::CompileShader(shader);
            gl::GetShaderiv(shader, gl::COMPILE_STATUS, &mut status);
        }
        if status == 0 {
            let log = shader_log(shader);
            unsafe { gl::DeleteShader(shader) };
            return Err(ShaderError::Compile {
                label: label.to_string(),
                log,
            });
        }
        Ok(ShaderId(shader))
    }

    fn link(&mut self, vertex: ShaderId, fragment: ShaderId) -> Result<ProgramId, ShaderError> {
        let program = unsafe { gl::CreateProgram() };
        let mut status = 0;
        unsafe {
            gl::AttachShader(program, vertex.0);
            gl::AttachShader(program, fragment.0);
            gl::LinkProgram(program);
            gl::GetProgramiv(program, gl::LINK_STATUS, &mut status);
            gl::DetachShader(program, vertex.0);
            gl::DetachShader(program, fragment.0);
        }
        if status == 0 {
            let log = program_log(program);
            unsafe { gl::DeleteProgram(program) };
            return Err(ShaderError::Link { log });
        }
        Ok(ProgramId(program))
    }

    fn delete_shader(&mut self, shader: ShaderId) {
        unsafe { gl::DeleteShader(shader.0) };
    }

    fn delete_program(&mut self, program: ProgramId) {
        unsafe { gl::DeleteProgram(program.0) };
    }

    fn uniform_location(&mut self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        let name = CString::new(name).ok()?;
        let location = unsafe { gl::GetUniformLocation(program.0, name.as_ptr()) };
        (location >= 0).then_some(UniformLocation(location))
    }
}
