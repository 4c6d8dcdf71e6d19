use std::fmt;

use serde::{Deserialize, Serialize};

/// Pipeline stage a piece of shader source targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageKind {
    Vertex,
    Fragment,
}

impl StageKind {
    /// GL enum passed to `glCreateShader`.
    pub const fn gl_enum(self) -> u32 {
        match self {
            // GL_VERTEX_SHADER / GL_FRAGMENT_SHADER
            StageKind::Vertex => 0x8B31,
            StageKind::Fragment => 0x8B30,
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageKind::Vertex => f.write_str("vertex"),
            StageKind::Fragment => f.write_str("fragment"),
        }
    }
}

impl std::str::FromStr for StageKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "vertex" | "vert" | "vs" => Ok(StageKind::Vertex),
            "fragment" | "frag" | "fs" => Ok(StageKind::Fragment),
            other => Err(format!(
                "unknown shader stage '{other}'; expected vertex or fragment"
            )),
        }
    }
}

/// Source text for a single stage, ready to hand to the compiler.
///
/// Immutable once obtained; `compile` borrows the text and the value is
/// dropped once the stage object exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageSource {
    kind: StageKind,
    text: String,
}

impl StageSource {
    pub fn new(kind: StageKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    pub fn kind(&self) -> StageKind {
        self.kind
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// What to do when a uniform name does not resolve against a program.
///
/// Drivers routinely strip uniforms the shader never reads, so a miss is not
/// an error by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MissingUniformPolicy {
    /// Drop the write silently.
    #[default]
    Ignore,
    /// Drop the write and emit one warning per program and name.
    WarnOnce,
}

/// Knobs shared by every program built through a [`GlContext`](crate::GlContext).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineOptions {
    pub missing_uniform: MissingUniformPolicy,
    /// Memoise name→location lookups per program after the first resolution.
    pub cache_uniform_locations: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            missing_uniform: MissingUniformPolicy::Ignore,
            cache_uniform_locations: true,
        }
    }
}
