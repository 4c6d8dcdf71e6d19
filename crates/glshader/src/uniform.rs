//! Scalar uniform writes by name.
//!
//! Every write goes through [`ShaderProgram::resolve`], the single place that
//! turns a name into a location and decides what a miss means. Names are
//! resolved against the program the method is called on, but GL applies the
//! write to the context's *active* program. Calling a setter on a program
//! that is not active is the caller's mistake and is not detected here: the
//! value lands in whatever program is bound, at that location, or the driver
//! rejects it. Activate the program first.
use crate::driver::GlDriver;
use crate::error::ShaderError;
use crate::program::ShaderProgram;
use crate::types::MissingUniformPolicy;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Bool(bool),
    Int(i32),
    Float(f32),
}

impl From<bool> for UniformValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for UniformValue {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

impl From<f32> for UniformValue {
    fn from(value: f32) -> Self {
        Self::Float(value)
    }
}

impl<D: GlDriver> ShaderProgram<D> {
    pub fn set_bool(&self, name: &str, value: bool) {
        self.set(name, value);
    }

    pub fn set_int(&self, name: &str, value: i32) {
        self.set(name, value);
    }

    pub fn set_float(&self, name: &str, value: f32) {
        self.set(name, value);
    }

    /// Writes `value` to `name` in the active program.
    ///
    /// A name that is not active in this program (misspelt, or optimised
    /// out by the driver) makes this a no-op.
    pub fn set(&self, name: &str, value: impl Into<UniformValue>) {
        if let Some(location) = self.resolve(name) {
            self.write(&location, value.into());
        }
    }

    /// Like [`set`](Self::set) but reports a miss instead of absorbing it.
    pub fn try_set(&self, name: &str, value: impl Into<UniformValue>) -> Result<(), ShaderError> {
        let location = self
            .uniform_location(name)
            .ok_or_else(|| ShaderError::UniformNotFound {
                name: name.to_string(),
            })?;
        self.write(&location, value.into());
        Ok(())
    }

    pub fn get_int(&self, name: &str) -> Option<i32> {
        let location = self.uniform_location(name)?;
        Some(self.ctx.driver().get_uniform_i32(self.raw, &location))
    }

    pub fn get_float(&self, name: &str) -> Option<f32> {
        let location = self.uniform_location(name)?;
        Some(self.ctx.driver().get_uniform_f32(self.raw, &location))
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get_int(name).map(|value| value != 0)
    }

    /// Location of `name` in this program's linked interface.
    ///
    /// With location caching on, the first answer (hit or miss) is kept for
    /// the life of the program; a linked program's interface never changes.
    pub fn uniform_location(&self, name: &str) -> Option<D::UniformLocation> {
        if !self.ctx.options().cache_uniform_locations {
            return self.ctx.driver().uniform_location(self.raw, name);
        }

        if let Some(cached) = self.locations.borrow().get(name) {
            return cached.clone();
        }
        let location = self.ctx.driver().uniform_location(self.raw, name);
        self.locations
            .borrow_mut()
            .insert(name.to_string(), location.clone());
        location
    }

    fn resolve(&self, name: &str) -> Option<D::UniformLocation> {
        let location = self.uniform_location(name);
        if location.is_none() {
            match self.ctx.options().missing_uniform {
                MissingUniformPolicy::Ignore => {}
                MissingUniformPolicy::WarnOnce => {
                    if self.reported_misses.borrow_mut().insert(name.to_string()) {
                        tracing::warn!(
                            uniform = name,
                            program = ?self.raw,
                            "uniform is not active in program; writes are ignored"
                        );
                    }
                }
            }
        }
        location
    }

    fn write(&self, location: &D::UniformLocation, value: UniformValue) {
        let driver = self.ctx.driver();
        match value {
            UniformValue::Bool(value) => driver.uniform_1_i32(location, i32::from(value)),
            UniformValue::Int(value) => driver.uniform_1_i32(location, value),
            UniformValue::Float(value) => driver.uniform_1_f32(location, value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::GlContext;
    use crate::source::ShaderSource;
    use crate::testing::{Call, RecordingDriver};
    use crate::types::PipelineOptions;

    const VERTEX: &str = r"#version 330 core
layout (location = 0) in vec3 aPos;
uniform float hOffset;
void main()
{
  gl_Position = vec4(aPos.x + hOffset, aPos.y, aPos.z, 1.0);
}
";

    const FRAGMENT: &str = r"#version 330 core
out vec4 FragColor;
uniform int mode;
uniform bool flip;
uniform float unusedGain;
void main()
{
  FragColor = flip ? vec4(float(mode)) : vec4(1.0);
}
";

    const SCALED_VERTEX: &str = r"#version 330 core
layout (location = 0) in vec3 aPos;
uniform float scale;
void main()
{
  gl_Position = vec4(aPos * scale, 1.0);
}
";

    fn build(
        ctx: &GlContext<RecordingDriver>,
        vertex: &'static str,
    ) -> ShaderProgram<RecordingDriver> {
        ctx.build_program(
            &ShaderSource::Embedded(vertex),
            &ShaderSource::Embedded(FRAGMENT),
        )
        .unwrap()
    }

    fn uniform_lookups(ctx: &GlContext<RecordingDriver>) -> usize {
        ctx.driver()
            .count_calls(|call| matches!(call, Call::UniformLocation(..)))
    }

    #[test]
    fn written_values_read_back() {
        let ctx = GlContext::new(RecordingDriver::new());
        let program = build(&ctx, VERTEX);
        program.activate();

        program.set_float("hOffset", 0.5);
        program.set_int("mode", 3);
        program.set_bool("flip", true);

        assert_eq!(program.get_float("hOffset"), Some(0.5));
        assert_eq!(program.get_int("mode"), Some(3));
        assert_eq!(program.get_bool("flip"), Some(true));
        assert!(ctx.driver().gl_errors().is_empty());
    }

    #[test]
    fn bool_is_written_as_integer() {
        let ctx = GlContext::new(RecordingDriver::new());
        let program = build(&ctx, VERTEX);
        program.activate();

        program.set_bool("flip", true);
        assert!(matches!(
            ctx.driver().calls().last(),
            Some(Call::Uniform1i(_, 1))
        ));
    }

    #[test]
    fn unknown_or_optimised_out_names_are_no_ops() {
        let ctx = GlContext::new(RecordingDriver::new());
        let program = build(&ctx, VERTEX);
        program.activate();

        program.set_float("unusedGain", 2.0);
        program.set_float("hOfset", 1.0);
        program.set_int("doesNotExist", 7);

        assert_eq!(
            ctx.driver()
                .count_calls(|call| matches!(call, Call::Uniform1f(..) | Call::Uniform1i(..))),
            0
        );
        assert!(ctx.driver().gl_errors().is_empty());
        assert_eq!(program.get_float("unusedGain"), None);
    }

    #[test]
    fn names_with_nul_are_misses() {
        let ctx = GlContext::new(RecordingDriver::new());
        let program = build(&ctx, VERTEX);
        program.activate();

        program.set_float("hOffset\0", 1.0);
        assert!(program.try_set("hOffset\0", 1.0f32).is_err());
        assert_eq!(program.get_float("hOffset\0"), None);
        assert_eq!(program.get_float("hOffset"), Some(0.0));
        assert!(ctx.driver().gl_errors().is_empty());
    }

    #[test]
    fn try_set_reports_missing_uniform() {
        let ctx = GlContext::new(RecordingDriver::new());
        let program = build(&ctx, VERTEX);
        program.activate();

        let err = program.try_set("unusedGain", 1.0f32).unwrap_err();
        assert!(matches!(err, ShaderError::UniformNotFound { ref name } if name == "unusedGain"));
        program.try_set("hOffset", 0.25f32).unwrap();
        assert_eq!(program.get_float("hOffset"), Some(0.25));
    }

    #[test]
    fn locations_are_cached_per_program() {
        let ctx = GlContext::new(RecordingDriver::new());
        let program = build(&ctx, VERTEX);
        program.activate();

        for frame in 0..10 {
            program.set_float("hOffset", frame as f32);
            program.set_float("missing", 1.0);
        }

        assert_eq!(uniform_lookups(&ctx), 2);
        assert_eq!(program.get_float("hOffset"), Some(9.0));
    }

    #[test]
    fn uncached_lookups_hit_the_driver_every_write() {
        let options = PipelineOptions {
            cache_uniform_locations: false,
            ..PipelineOptions::default()
        };
        let ctx = GlContext::with_options(RecordingDriver::new(), options);
        let program = build(&ctx, VERTEX);
        program.activate();

        for _ in 0..3 {
            program.set_float("hOffset", 0.5);
        }
        assert_eq!(uniform_lookups(&ctx), 3);
    }

    #[test]
    fn warn_once_tracks_each_missing_name_once() {
        let options = PipelineOptions {
            missing_uniform: MissingUniformPolicy::WarnOnce,
            ..PipelineOptions::default()
        };
        let ctx = GlContext::with_options(RecordingDriver::new(), options);
        let program = build(&ctx, VERTEX);
        program.activate();

        program.set_float("missing", 1.0);
        program.set_float("missing", 2.0);
        program.set_int("alsoMissing", 1);

        let reported = program.reported_misses.borrow();
        assert_eq!(reported.len(), 2);
        assert!(reported.contains("missing"));
    }

    #[test]
    fn writes_to_an_inactive_program_land_on_the_active_one() {
        let ctx = GlContext::new(RecordingDriver::new());
        let offset = build(&ctx, VERTEX);
        let scaled = build(&ctx, SCALED_VERTEX);

        scaled.activate();
        // `hOffset` resolves against `offset`, but `scaled` is the one bound.
        offset.set_float("hOffset", 0.5);

        assert_eq!(offset.get_float("hOffset"), Some(0.0));
        assert_eq!(scaled.get_float("scale"), Some(0.5));
        assert!(ctx.driver().gl_errors().is_empty());
    }

    #[test]
    fn writes_with_nothing_bound_are_rejected_by_the_driver() {
        let ctx = GlContext::new(RecordingDriver::new());
        let program = build(&ctx, VERTEX);

        program.set_float("hOffset", 0.5);

        assert_eq!(program.get_float("hOffset"), Some(0.0));
        assert_eq!(ctx.driver().gl_errors().len(), 1);
    }
}
