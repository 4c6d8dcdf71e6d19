use std::fmt;

use crate::context::GlContext;
use crate::driver::GlDriver;
use crate::error::ShaderError;
use crate::program::BuildPhase;
use crate::types::{StageKind, StageSource};

/// One successfully compiled shader stage.
///
/// Owns the driver's shader object and deletes it when dropped. Linking
/// consumes the stage, so the object never outlives the build attempt.
pub struct CompiledStage<D: GlDriver> {
    ctx: GlContext<D>,
    raw: D::Shader,
    kind: StageKind,
}

impl<D: GlDriver> CompiledStage<D> {
    pub fn kind(&self) -> StageKind {
        self.kind
    }

    pub fn raw(&self) -> D::Shader {
        self.raw
    }

    pub(crate) fn context(&self) -> &GlContext<D> {
        &self.ctx
    }
}

impl<D: GlDriver> Drop for CompiledStage<D> {
    fn drop(&mut self) {
        self.ctx.driver().delete_shader(self.raw);
    }
}

impl<D: GlDriver> fmt::Debug for CompiledStage<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledStage")
            .field("kind", &self.kind)
            .field("raw", &self.raw)
            .finish()
    }
}

impl<D: GlDriver> GlContext<D> {
    /// Compiles `source` as a `kind` stage.
    ///
    /// Blank source is rejected before the driver sees it. On a failed
    /// compile the shader object is released and the driver log is returned
    /// untouched in [`ShaderError::Compile`]. Compilation is deterministic, so
    /// there is no retry.
    pub fn compile(&self, kind: StageKind, source: &str) -> Result<CompiledStage<D>, ShaderError> {
        if source.trim().is_empty() {
            return Err(ShaderError::EmptySource { stage: kind });
        }

        let driver = self.driver();
        let raw = driver
            .create_shader(kind)
            .map_err(|message| ShaderError::Driver {
                phase: BuildPhase::StageFailed,
                message,
            })?;
        let stage = CompiledStage {
            ctx: self.clone(),
            raw,
            kind,
        };

        driver.shader_source(raw, source);
        driver.compile_shader(raw);

        if !driver.shader_compile_status(raw) {
            let log = driver.shader_info_log(raw);
            tracing::debug!(stage = %kind, "shader compilation failed");
            return Err(ShaderError::Compile { stage: kind, log });
        }

        tracing::debug!(stage = %kind, bytes = source.len(), "compiled shader stage");
        Ok(stage)
    }

    pub fn compile_source(&self, source: &StageSource) -> Result<CompiledStage<D>, ShaderError> {
        self.compile(source.kind(), source.text())
    }
}
