use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::compile::CompiledStage;
use crate::context::GlContext;
use crate::driver::GlDriver;
use crate::error::ShaderError;
use crate::source::ShaderSource;
use crate::types::StageKind;

/// States of one program build attempt.
///
/// `Start → StagesCompiling → {StageFailed | StagesReady} → Linking →
/// {LinkFailed | Linked}`. There is no way back; a retry is a new attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuildPhase {
    Start,
    StagesCompiling,
    StageFailed,
    StagesReady,
    Linking,
    LinkFailed,
    Linked,
}

impl BuildPhase {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            BuildPhase::StageFailed | BuildPhase::LinkFailed | BuildPhase::Linked
        )
    }

    pub fn can_advance_to(self, next: BuildPhase) -> bool {
        use BuildPhase::*;
        matches!(
            (self, next),
            (Start, StagesCompiling)
                | (StagesCompiling, StageFailed)
                | (StagesCompiling, StagesReady)
                | (StagesReady, Linking)
                | (Linking, LinkFailed)
                | (Linking, Linked)
        )
    }
}

impl fmt::Display for BuildPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BuildPhase::Start => "start",
            BuildPhase::StagesCompiling => "stages-compiling",
            BuildPhase::StageFailed => "stage-failed",
            BuildPhase::StagesReady => "stages-ready",
            BuildPhase::Linking => "linking",
            BuildPhase::LinkFailed => "link-failed",
            BuildPhase::Linked => "linked",
        };
        f.write_str(label)
    }
}

struct BuildAttempt {
    phase: BuildPhase,
}

impl BuildAttempt {
    fn new() -> Self {
        Self {
            phase: BuildPhase::Start,
        }
    }

    fn advance(&mut self, next: BuildPhase) {
        debug_assert!(
            self.phase.can_advance_to(next),
            "illegal build transition {} -> {}",
            self.phase,
            next
        );
        tracing::trace!(from = %self.phase, to = %next, "program build transition");
        self.phase = next;
    }

    fn fail(&mut self, err: ShaderError) -> ShaderError {
        self.advance(err.phase());
        err
    }
}

/// A linked, executable program.
///
/// Only ever exists fully linked. Owns the driver's program object and
/// deletes it on drop or [`destroy`](ShaderProgram::destroy).
pub struct ShaderProgram<D: GlDriver> {
    pub(crate) ctx: GlContext<D>,
    pub(crate) raw: D::Program,
    pub(crate) locations: RefCell<HashMap<String, Option<D::UniformLocation>>>,
    pub(crate) reported_misses: RefCell<HashSet<String>>,
}

impl<D: GlDriver> ShaderProgram<D> {
    fn new(ctx: GlContext<D>, raw: D::Program) -> Self {
        Self {
            ctx,
            raw,
            locations: RefCell::new(HashMap::new()),
            reported_misses: RefCell::new(HashSet::new()),
        }
    }

    pub fn raw(&self) -> D::Program {
        self.raw
    }

    /// Makes this the context's active program.
    ///
    /// This is a context-wide side effect: whichever program was active
    /// before stops being active, for every holder of the context.
    pub fn activate(&self) {
        self.ctx.bind(self.raw);
    }

    pub fn is_active(&self) -> bool {
        self.ctx.active_program() == Some(self.raw)
    }

    pub fn context(&self) -> &GlContext<D> {
        &self.ctx
    }

    /// Releases the program now instead of at end of scope.
    pub fn destroy(self) {}
}

impl<D: GlDriver> Drop for ShaderProgram<D> {
    fn drop(&mut self) {
        // GL keeps a deleted program bound until something else is used.
        if self.is_active() {
            self.ctx.deactivate();
        }
        self.ctx.driver().delete_program(self.raw);
    }
}

impl<D: GlDriver> fmt::Debug for ShaderProgram<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShaderProgram")
            .field("raw", &self.raw)
            .field("active", &self.is_active())
            .finish()
    }
}

impl<D: GlDriver> GlContext<D> {
    /// Links a vertex and a fragment stage into a program.
    ///
    /// Both stages are consumed and released whatever the outcome. Interface
    /// matching between the stages is entirely the driver's job. On failure
    /// the program object is deleted too and the driver's log is returned in
    /// [`ShaderError::Link`].
    ///
    /// # Panics
    ///
    /// If `vertex` is not a vertex stage, `fragment` is not a fragment stage,
    /// or either stage was compiled on a different context.
    pub fn link(
        &self,
        vertex: CompiledStage<D>,
        fragment: CompiledStage<D>,
    ) -> Result<ShaderProgram<D>, ShaderError> {
        assert_eq!(
            vertex.kind(),
            StageKind::Vertex,
            "first stage passed to link must be a vertex stage"
        );
        assert_eq!(
            fragment.kind(),
            StageKind::Fragment,
            "second stage passed to link must be a fragment stage"
        );
        assert!(
            vertex.context().same_context(self) && fragment.context().same_context(self),
            "stages must be compiled on the context that links them"
        );

        let driver = self.driver();
        let raw = driver
            .create_program()
            .map_err(|message| ShaderError::Driver {
                phase: BuildPhase::LinkFailed,
                message,
            })?;
        let program = ShaderProgram::new(self.clone(), raw);

        driver.attach_shader(raw, vertex.raw());
        driver.attach_shader(raw, fragment.raw());
        driver.link_program(raw);

        if !driver.program_link_status(raw) {
            let log = driver.program_info_log(raw);
            tracing::debug!("program link failed");
            return Err(ShaderError::Link { log });
        }

        driver.detach_shader(raw, vertex.raw());
        driver.detach_shader(raw, fragment.raw());
        tracing::debug!(program = ?raw, "linked shader program");
        Ok(program)
    }

    /// Runs one complete build attempt: load both sources, compile the
    /// vertex stage, then the fragment stage, then link.
    ///
    /// A vertex failure ends the attempt before the fragment stage is
    /// compiled.
    pub fn build_program(
        &self,
        vertex: &ShaderSource,
        fragment: &ShaderSource,
    ) -> Result<ShaderProgram<D>, ShaderError> {
        let mut attempt = BuildAttempt::new();

        let vertex_source = vertex.load(StageKind::Vertex)?;
        let fragment_source = fragment.load(StageKind::Fragment)?;

        attempt.advance(BuildPhase::StagesCompiling);
        let vertex_stage = self
            .compile_source(&vertex_source)
            .map_err(|err| attempt.fail(err))?;
        let fragment_stage = self
            .compile_source(&fragment_source)
            .map_err(|err| attempt.fail(err))?;
        attempt.advance(BuildPhase::StagesReady);

        attempt.advance(BuildPhase::Linking);
        let program = self
            .link(vertex_stage, fragment_stage)
            .map_err(|err| attempt.fail(err))?;
        attempt.advance(BuildPhase::Linked);

        tracing::info!(
            vertex = %vertex.describe(),
            fragment = %fragment.describe(),
            "shader program ready"
        );
        Ok(program)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Call, RecordingDriver};

    const VERTEX: &str = r"#version 330 core
layout (location = 0) in vec3 aPos;
layout (location = 1) in vec3 aColor;
out vec3 ourColor;
void main()
{
  gl_Position = vec4(aPos, 1.0);
  ourColor = aColor;
}
";

    const FRAGMENT: &str = r"#version 330 core
out vec4 FragColor;
in vec3 ourColor;
void main()
{
  FragColor = vec4(ourColor, 1.0);
}
";

    const CONSTANT_FRAGMENT: &str = r"#version 330 core
out vec4 FragColor;
void main()
{
  FragColor = vec4(1.0f, 0.5f, 0.2f, 1.0f);
}
";

    fn context() -> GlContext<RecordingDriver> {
        GlContext::new(RecordingDriver::new())
    }

    #[test]
    fn links_matching_stages_and_releases_them() {
        let ctx = context();
        let vs = ctx.compile(StageKind::Vertex, VERTEX).unwrap();
        let fs = ctx.compile(StageKind::Fragment, FRAGMENT).unwrap();
        let (vs_raw, fs_raw) = (vs.raw(), fs.raw());

        let program = ctx.link(vs, fs).unwrap();

        assert_eq!(ctx.driver().live_shaders(), 0);
        assert_eq!(ctx.driver().live_programs(), 1);
        let calls = ctx.driver().calls();
        assert!(calls.contains(&Call::DetachShader(program.raw(), vs_raw)));
        assert!(calls.contains(&Call::DeleteShader(vs_raw)));
        assert!(calls.contains(&Call::DeleteShader(fs_raw)));
        assert!(ctx.driver().gl_errors().is_empty());
    }

    #[test]
    fn unmatched_fragment_input_fails_to_link() {
        let ctx = context();
        let vertex_without_color = VERTEX.replace("out vec3 ourColor;\n", "").replace("  ourColor = aColor;\n", "");
        let vs = ctx.compile(StageKind::Vertex, &vertex_without_color).unwrap();
        let fs = ctx.compile(StageKind::Fragment, FRAGMENT).unwrap();

        let err = ctx.link(vs, fs).unwrap_err();
        match &err {
            ShaderError::Link { log } => assert!(log.contains("ourColor")),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(err.phase(), BuildPhase::LinkFailed);
        assert_eq!(ctx.driver().live_programs(), 0);
        assert_eq!(ctx.driver().live_shaders(), 0);
    }

    #[test]
    fn link_log_is_verbatim() {
        let driver = RecordingDriver::new();
        let log = "error: vertex shader output `v_uv' type mismatch\n\twith fragment input\n";
        driver.fail_links_with(log);
        let ctx = GlContext::new(driver);

        let vs = ctx.compile(StageKind::Vertex, VERTEX).unwrap();
        let fs = ctx.compile(StageKind::Fragment, FRAGMENT).unwrap();
        let err = ctx.link(vs, fs).unwrap_err();
        assert_eq!(err.log(), Some(log));
    }

    #[test]
    #[should_panic(expected = "vertex stage")]
    fn swapped_stages_are_a_caller_error() {
        let ctx = context();
        let vs = ctx.compile(StageKind::Vertex, VERTEX).unwrap();
        let fs = ctx.compile(StageKind::Fragment, FRAGMENT).unwrap();
        let _ = ctx.link(fs, vs);
    }

    #[test]
    fn build_program_constant_color_triangle() {
        let ctx = context();
        let vertex = ShaderSource::Embedded(
            "#version 330 core\nlayout(location=0) in vec3 aPos;\nvoid main()\n{\n  gl_Position = vec4(aPos,1.0);\n}\n",
        );
        let program = ctx
            .build_program(&vertex, &ShaderSource::Embedded(CONSTANT_FRAGMENT))
            .unwrap();

        program.activate();
        assert!(program.is_active());
        assert_eq!(ctx.driver().bound_program(), Some(program.raw()));
        assert!(ctx.driver().gl_errors().is_empty());
    }

    #[test]
    fn vertex_failure_never_compiles_fragment() {
        let ctx = context();
        let broken = ShaderSource::Embedded("#version 330 core\nvoid main()\n{\n  gl_Position = vec4(0.0);\n");

        let err = ctx
            .build_program(&broken, &ShaderSource::Embedded(FRAGMENT))
            .unwrap_err();

        assert_eq!(err.stage(), Some(StageKind::Vertex));
        assert!(!err.log().unwrap_or_default().is_empty());
        assert_eq!(
            ctx.driver()
                .count_calls(|call| matches!(call, Call::CreateShader(StageKind::Fragment, _))),
            0
        );
        assert_eq!(ctx.driver().count_calls(|call| matches!(call, Call::CreateProgram(_))), 0);
    }

    #[test]
    fn fragment_typo_log_reaches_caller_without_program() {
        // The fake driver is told which source to reject; this checks how its
        // diagnostic propagates, not how the typo is detected.
        let driver = RecordingDriver::new();
        driver.reject_source_containing(
            "ourColour",
            "0:6(24): error: `ourColour' undeclared\n",
        );
        let ctx = GlContext::new(driver);
        let typo = FRAGMENT.replace("vec4(ourColor", "vec4(ourColour");

        let err = ctx
            .build_program(&ShaderSource::Embedded(VERTEX), &ShaderSource::Owned(typo))
            .unwrap_err();

        assert_eq!(err.stage(), Some(StageKind::Fragment));
        assert!(err.log().unwrap_or_default().contains("ourColour"));
        assert_eq!(ctx.driver().live_programs(), 0);
        assert_eq!(ctx.driver().live_shaders(), 0);
    }

    #[test]
    fn repeated_builds_yield_independent_programs() {
        let ctx = context();
        let vertex = ShaderSource::Embedded(VERTEX);
        let fragment = ShaderSource::Embedded(FRAGMENT);

        let first = ctx.build_program(&vertex, &fragment).unwrap();
        let second = ctx.build_program(&vertex, &fragment).unwrap();

        assert_ne!(first.raw(), second.raw());
        assert_eq!(ctx.driver().live_programs(), 2);
        assert_eq!(
            ctx.driver().active_uniforms(first.raw()),
            ctx.driver().active_uniforms(second.raw())
        );

        first.destroy();
        assert_eq!(ctx.driver().live_programs(), 1);
        second.activate();
        assert!(ctx.driver().gl_errors().is_empty());
    }

    #[test]
    fn activation_is_context_wide() {
        let ctx = context();
        let vertex = ShaderSource::Embedded(VERTEX);
        let fragment = ShaderSource::Embedded(FRAGMENT);
        let a = ctx.build_program(&vertex, &fragment).unwrap();
        let b = ctx.build_program(&vertex, &fragment).unwrap();

        a.activate();
        b.activate();
        assert!(!a.is_active());
        assert!(b.is_active());
        assert_eq!(ctx.active_program(), Some(b.raw()));

        drop(b);
        assert_eq!(ctx.active_program(), None);
        assert_eq!(ctx.driver().bound_program(), None);
    }

    #[test]
    fn dropping_the_active_program_unbinds_it() {
        let ctx = context();
        let program = ctx
            .build_program(&ShaderSource::Embedded(VERTEX), &ShaderSource::Embedded(FRAGMENT))
            .unwrap();
        program.activate();
        drop(program);

        assert_eq!(ctx.active_program(), None);
        assert_eq!(ctx.driver().bound_program(), None);
        assert_eq!(ctx.driver().live_programs(), 0);
        let calls = ctx.driver().calls();
        let unbind = calls
            .iter()
            .rposition(|call| *call == Call::UseProgram(None))
            .unwrap();
        let delete = calls
            .iter()
            .rposition(|call| matches!(call, Call::DeleteProgram(_)))
            .unwrap();
        assert!(unbind < delete);
    }

    #[test]
    fn dropping_an_inactive_program_leaves_binding_alone() {
        let ctx = context();
        let vertex = ShaderSource::Embedded(VERTEX);
        let fragment = ShaderSource::Embedded(FRAGMENT);
        let a = ctx.build_program(&vertex, &fragment).unwrap();
        let b = ctx.build_program(&vertex, &fragment).unwrap();
        a.activate();
        drop(b);

        assert!(a.is_active());
        assert_eq!(ctx.driver().bound_program(), Some(a.raw()));
        assert_eq!(ctx.driver().count_calls(|call| *call == Call::UseProgram(None)), 0);
    }

    #[test]
    fn missing_source_file_ends_attempt_before_compiling() {
        let ctx = context();
        let err = ctx
            .build_program(
                &ShaderSource::file("/nonexistent/vertexShader.vs"),
                &ShaderSource::Embedded(FRAGMENT),
            )
            .unwrap_err();

        assert!(matches!(err, ShaderError::SourceUnavailable { .. }));
        assert!(ctx.driver().calls().is_empty());
    }

    #[test]
    fn phase_transitions_only_move_forward() {
        use BuildPhase::*;
        assert!(Start.can_advance_to(StagesCompiling));
        assert!(StagesCompiling.can_advance_to(StageFailed));
        assert!(Linking.can_advance_to(Linked));
        assert!(!Linked.can_advance_to(Start));
        assert!(!StageFailed.can_advance_to(Linking));
        assert!(LinkFailed.is_terminal());
        assert!(!StagesReady.is_terminal());
    }
}
