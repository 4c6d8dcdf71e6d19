use std::path::PathBuf;

use thiserror::Error;

use crate::program::BuildPhase;
use crate::types::StageKind;

/// Everything that can end a program build attempt, plus the strict uniform
/// lookup failure.
///
/// Driver logs are carried verbatim; they hold the driver's own line numbers
/// and are the main debugging surface.
#[derive(Debug, Error)]
pub enum ShaderError {
    #[error("failed to read shader source at {}: {source}", path.display())]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{stage} shader source is empty")]
    EmptySource { stage: StageKind },

    #[error("{stage} shader compilation failed: {log}")]
    Compile { stage: StageKind, log: String },

    #[error("program linking failed: {log}")]
    Link { log: String },

    #[error("graphics driver error: {message}")]
    Driver { phase: BuildPhase, message: String },

    #[error("uniform '{name}' is not active in the program")]
    UniformNotFound { name: String },
}

impl ShaderError {
    /// Terminal state of the build attempt this error ended.
    pub fn phase(&self) -> BuildPhase {
        match self {
            ShaderError::SourceUnavailable { .. } => BuildPhase::Start,
            ShaderError::EmptySource { .. } | ShaderError::Compile { .. } => {
                BuildPhase::StageFailed
            }
            ShaderError::Link { .. } => BuildPhase::LinkFailed,
            ShaderError::Driver { phase, .. } => *phase,
            ShaderError::UniformNotFound { .. } => BuildPhase::Linked,
        }
    }

    /// Driver diagnostic log, if the error came with one.
    pub fn log(&self) -> Option<&str> {
        match self {
            ShaderError::Compile { log, .. } | ShaderError::Link { log } => Some(log),
            _ => None,
        }
    }

    pub fn stage(&self) -> Option<StageKind> {
        match self {
            ShaderError::Compile { stage, .. } | ShaderError::EmptySource { stage } => Some(*stage),
            _ => None,
        }
    }
}
