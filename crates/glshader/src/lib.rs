//! Builds OpenGL shader programs and feeds them scalar uniforms.
//!
//! The flow for one program:
//! - `source` fetches stage text, embedded or from disk.
//! - `compile` turns one stage's text into a [`CompiledStage`].
//! - `program` links a vertex and a fragment stage into a [`ShaderProgram`]
//!   and drives whole build attempts through [`BuildPhase`]s.
//! - `uniform` resolves names against a linked program and writes bools,
//!   ints and floats into the active program.
//!
//! All driver calls go through [`GlDriver`]; with the default `glow` feature
//! [`GlowDriver`] implements it over a `glow::Context`. [`GlContext`] owns the
//! driver and the context-wide active-program slot.

mod compile;
mod context;
mod driver;
mod error;
mod program;
mod source;
mod types;
mod uniform;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

#[cfg(all(feature = "glow", any(test, feature = "testing")))]
pub mod fake_gl;

pub use compile::CompiledStage;
pub use context::GlContext;
#[cfg(feature = "glow")]
pub use driver::GlowDriver;
pub use driver::GlDriver;
pub use error::ShaderError;
pub use program::{BuildPhase, ShaderProgram};
pub use source::ShaderSource;
pub use types::{MissingUniformPolicy, PipelineOptions, StageKind, StageSource};
pub use uniform::UniformValue;
