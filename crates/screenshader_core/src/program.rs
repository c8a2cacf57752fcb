//! Shader program management and hot reload

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ShaderError;
use crate::params::ParameterSet;
use crate::platform::{ProgramId, ShaderBackend, ShaderId, ShaderStage, UniformLocation};
use crate::shaders::{self, uniforms};

/// Fixed program drawing one window texture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompositeProgram {
    pub program: ProgramId,
    pub texture: Option<UniformLocation>,
}

/// User effect program with its standard uniform locations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShaderProgram {
    pub program: ProgramId,
    pub screen: Option<UniformLocation>,
    pub resolution: Option<UniformLocation>,
    pub time: Option<UniformLocation>,
}

impl ShaderProgram {
    fn resolve<B: ShaderBackend + ?Sized>(backend: &mut B, program: ProgramId) -> Self {
        Self {
            program,
            screen: backend.uniform_location(program, uniforms::SCREEN),
            resolution: backend.uniform_location(program, uniforms::RESOLUTION),
            time: backend.uniform_location(program, uniforms::TIME),
        }
    }
}

/// Owns the shared vertex stage and both programs
#[derive(Debug)]
pub struct ProgramManager {
    vertex: ShaderId,
    composite: CompositeProgram,
    post: ShaderProgram,
    source_path: PathBuf,
}

impl ProgramManager {
    /// Build the vertex stage, the composite program and the effect at `source_path`
    pub fn load<B: ShaderBackend + ?Sized>(
        backend: &mut B,
        source_path: impl Into<PathBuf>,
    ) -> Result<Self, ShaderError> {
        let source_path = source_path.into();
        let vertex = backend.compile(
            ShaderStage::Vertex,
            shaders::QUAD_VERT,
            shaders::QUAD_VERT_LABEL,
        )?;

        let composite = match link_fragment(
            backend,
            vertex,
            shaders::COMPOSITE_FRAG,
            shaders::COMPOSITE_FRAG_LABEL,
        ) {
            Ok(program) => CompositeProgram {
                program,
                texture: backend.uniform_location(program, uniforms::TEXTURE),
            },
            Err(e) => {
                backend.delete_shader(vertex);
                return Err(e);
            }
        };

        let post = match build_post(backend, vertex, &source_path) {
            Ok(post) => post,
            Err(e) => {
                backend.delete_program(composite.program);
                backend.delete_shader(vertex);
                return Err(e);
            }
        };

        tracing::info!("Loaded post-process shader: {}", source_path.display());
        Ok(Self {
            vertex,
            composite,
            post,
            source_path,
        })
    }

    /// Rebuild the effect from disk
    ///
    /// On failure the current program stays active. On success the new
    /// program is swapped in, `params` are re-resolved against it, and the
    /// old program is deleted.
    pub fn reload<B: ShaderBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        params: &mut ParameterSet,
    ) -> Result<(), ShaderError> {
        let fresh = build_post(backend, self.vertex, &self.source_path)?;
        let old = std::mem::replace(&mut self.post, fresh);
        params.resolve_locations(|name| backend.uniform_location(fresh.program, name));
        backend.delete_program(old.program);
        tracing::info!("Shader reloaded: {}", self.source_path.display());
        Ok(())
    }

    /// Resolve parameter names against the active effect
    pub fn resolve_params<B: ShaderBackend + ?Sized>(
        &self,
        backend: &mut B,
        params: &mut ParameterSet,
    ) {
        let program = self.post.program;
        params.resolve_locations(|name| backend.uniform_location(program, name));
    }

    pub fn composite(&self) -> &CompositeProgram {
        &self.composite
    }

    pub fn post(&self) -> &ShaderProgram {
        &self.post
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// Delete every GL object this manager owns
    pub fn destroy<B: ShaderBackend + ?Sized>(self, backend: &mut B) {
        backend.delete_program(self.post.program);
        backend.delete_program(self.composite.program);
        backend.delete_shader(self.vertex);
    }
}

fn build_post<B: ShaderBackend + ?Sized>(
    backend: &mut B,
    vertex: ShaderId,
    path: &Path,
) -> Result<ShaderProgram, ShaderError> {
    let source = fs::read_to_string(path).map_err(|source| ShaderError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let label = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let program = link_fragment(backend, vertex, &source, &label)?;
    Ok(ShaderProgram::resolve(backend, program))
}

/// Compile a fragment stage and link it against `vertex`
///
/// The fragment shader object is deleted whether or not linking succeeds.
fn link_fragment<B: ShaderBackend + ?Sized>(
    backend: &mut B,
    vertex: ShaderId,
    source: &str,
    label: &str,
) -> Result<ProgramId, ShaderError> {
    let fragment = backend.compile(ShaderStage::Fragment, source, label)?;
    let linked = backend.link(vertex, fragment);
    backend.delete_shader(fragment);
    linked
}
