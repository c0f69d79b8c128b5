use std::path::PathBuf;

use thiserror::Error;

use crate::renderer::UniformKind;

/// Errors surfaced by resource creation and uniform plumbing.
///
/// Nothing in the frame loop aborts on these. Callers log them and carry on
/// with a degraded resource, or drop the offending uniform write.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to parse shader `{label}`:\n{message}")]
    ShaderParse { label: String, message: String },

    #[error("shader `{label}` failed validation:\n{message}")]
    ShaderValidation { label: String, message: String },

    #[error("program `{program}` has no uniform named `{name}`")]
    UnknownUniform { program: String, name: String },

    #[error("uniform `{name}` is declared as {expected:?}, got {actual:?}")]
    UniformTypeMismatch {
        name: String,
        expected: UniformKind,
        actual: UniformKind,
    },

    #[error("light slot {slot} is out of range for `{array}` (capacity {capacity})")]
    LightSlotOutOfRange {
        array: &'static str,
        slot: usize,
        capacity: usize,
    },

    #[error("failed to load texture {path:?}: {message}")]
    TextureLoad { path: PathBuf, message: String },

    #[error("failed to import model {path:?}: {message}")]
    ModelImport { path: PathBuf, message: String },

    #[error("framebuffer `{label}` is incomplete: {reason}")]
    IncompleteFramebuffer { label: &'static str, reason: String },

    #[error(transparent)]
    CreateSurface(#[from] wgpu::CreateSurfaceError),

    #[error(transparent)]
    RequestAdapter(#[from] wgpu::RequestAdapterError),

    #[error(transparent)]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    #[error(transparent)]
    Surface(#[from] wgpu::SurfaceError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
