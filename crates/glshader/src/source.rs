//! Where stage source text comes from.
//!
//! Sources are either compiled into the binary or read from disk when a build
//! attempt starts. Nothing is cached and the text is not inspected here; the
//! driver's compiler is the only validator.
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ShaderError;
use crate::types::{StageKind, StageSource};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShaderSource {
    /// Text baked into the binary, usually via `include_str!`.
    Embedded(&'static str),
    /// Text assembled at runtime.
    Owned(String),
    /// A text file read on every [`load`](ShaderSource::load).
    File(PathBuf),
}

impl ShaderSource {
    pub fn file(path: impl AsRef<Path>) -> Self {
        Self::File(path.as_ref().to_path_buf())
    }

    /// Produces the full text for `kind`.
    ///
    /// Open/read failures and non UTF-8 content surface as
    /// [`ShaderError::SourceUnavailable`].
    pub fn load(&self, kind: StageKind) -> Result<StageSource, ShaderError> {
        match self {
            ShaderSource::Embedded(text) => Ok(StageSource::new(kind, *text)),
            ShaderSource::Owned(text) => Ok(StageSource::new(kind, text.clone())),
            ShaderSource::File(path) => {
                let text =
                    fs::read_to_string(path).map_err(|source| ShaderError::SourceUnavailable {
                        path: path.clone(),
                        source,
                    })?;
                tracing::debug!(stage = %kind, path = %path.display(), bytes = text.len(), "loaded shader source");
                Ok(StageSource::new(kind, text))
            }
        }
    }

    /// Short human label for logs.
    pub fn describe(&self) -> String {
        match self {
            ShaderSource::Embedded(_) => "<embedded>".to_string(),
            ShaderSource::Owned(_) => "<inline>".to_string(),
            ShaderSource::File(path) => path.display().to_string(),
        }
    }
}

impl From<&'static str> for ShaderSource {
    fn from(text: &'static str) -> Self {
        Self::Embedded(text)
    }
}

impl From<String> for ShaderSource {
    fn from(text: String) -> Self {
        Self::Owned(text)
    }
}

impl From<PathBuf> for ShaderSource {
    fn from(path: PathBuf) -> Self {
        Self::File(path)
    }
}
