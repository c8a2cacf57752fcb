//! Compositor error types

use std::path::PathBuf;

use thiserror::Error;

use crate::window::WindowId;

/// Errors that stop the compositor from starting or keep running
#[derive(Error, Debug)]
pub enum CompositorError {
    /// Failed to open the windowing connection
    #[error("Failed to connect to the display: {0}")]
    Connection(String),

    /// A required protocol extension is missing or too old
    #[error("Required extension unavailable: {0}")]
    MissingExtension(String),

    /// No surface configuration supports zero-copy pixmap binding
    #[error("No surface configuration supports texture-from-pixmap binding")]
    NoBindableConfig,

    /// Failed to create the graphics context or presented surface
    #[error("Graphics context creation failed: {0}")]
    Context(String),

    /// Off-screen render target could not be completed
    #[error("Off-screen target incomplete: {0}")]
    RenderTarget(String),

    /// Shader could not be built
    #[error(transparent)]
    Shader(#[from] ShaderError),

    /// Request on the windowing connection failed
    #[error("Protocol request failed: {0}")]
    Protocol(String),

    /// Presenting the frame failed
    #[error("Present failed: {0}")]
    Present(String),
}

/// Result type for compositor operations
pub type Result<T> = std::result::Result<T, CompositorError>;

/// Why a window's contents could not be bound as a texture
///
/// These are expected under ordinary map/unmap churn and never fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BindError {
    #[error("window {0} is not mapped")]
    NotMapped(WindowId),

    #[error("window {0} has an empty size")]
    EmptySize(WindowId),

    #[error("window {0} is not viewable")]
    NotViewable(WindowId),

    #[error("window {window} has depth {depth} with no bindable configuration")]
    UnsupportedDepth { window: WindowId, depth: u8 },

    #[error("naming pixmap for window {window} failed: {reason}")]
    NamePixmap { window: WindowId, reason: String },

    #[error("creating GPU pixmap for window {window} failed: {reason}")]
    GpuPixmap { window: WindowId, reason: String },

    #[error("creating texture for window {window} failed: {reason}")]
    Texture { window: WindowId, reason: String },
}

/// Shader build failures
#[derive(Error, Debug)]
pub enum ShaderError {
    #[error("failed to read shader {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("shader compile error ({label}):\n{log}")]
    Compile { label: String, log: String },

    #[error("shader link error:\n{log}")]
    Link { log: String },
}
