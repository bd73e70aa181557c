//! Shader program handles.
//!
//! Shaders are compiled and linked outside this crate. The streaming layer
//! receives an already linked program through an opaque [`ShaderHandle`],
//! compares handles to decide whether attribute wiring can be reused, and
//! queries attribute locations through the backend.

use crate::backend::GpuProgram;

/// Opaque, equality-comparable handle to a linked shader program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderHandle {
    program: GpuProgram,
}

impl ShaderHandle {
    /// Wrap a linked program.
    pub fn new(program: GpuProgram) -> Self {
        Self { program }
    }

    /// Get the backend program.
    pub fn program(&self) -> &GpuProgram {
        &self.program
    }
}

impl From<GpuProgram> for ShaderHandle {
    fn from(program: GpuProgram) -> Self {
        Self::new(program)
    }
}
