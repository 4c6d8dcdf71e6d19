//! The slice of the GL API the pipeline needs.
//!
//! Every call is synchronous from the caller's point of view. Status queries
//! are separate from submission, matching the driver: submit, then ask whether
//! it worked, then fetch the log. Logs are opaque printable text.
use std::fmt;
use std::hash::Hash;

use crate::types::StageKind;

pub trait GlDriver {
    type Shader: Copy + Eq + fmt::Debug;
    type Program: Copy + Eq + Hash + fmt::Debug;
    type UniformLocation: Clone + fmt::Debug;

    fn create_shader(&self, kind: StageKind) -> Result<Self::Shader, String>;
    fn shader_source(&self, shader: Self::Shader, source: &str);
    fn compile_shader(&self, shader: Self::Shader);
    fn shader_compile_status(&self, shader: Self::Shader) -> bool;
    fn shader_info_log(&self, shader: Self::Shader) -> String;
    fn delete_shader(&self, shader: Self::Shader);

    fn create_program(&self) -> Result<Self::Program, String>;
    fn attach_shader(&self, program: Self::Program, shader: Self::Shader);
    fn detach_shader(&self, program: Self::Program, shader: Self::Shader);
    fn link_program(&self, program: Self::Program);
    fn program_link_status(&self, program: Self::Program) -> bool;
    fn program_info_log(&self, program: Self::Program) -> String;
    fn delete_program(&self, program: Self::Program);
    fn use_program(&self, program: Option<Self::Program>);

    /// `None` for any name that is not an active uniform, including names
    /// GL could never report, such as ones containing NUL.
    fn uniform_location(&self, program: Self::Program, name: &str)
        -> Option<Self::UniformLocation>;
    /// Writes into the currently bound program, whatever it is.
    fn uniform_1_i32(&self, location: &Self::UniformLocation, value: i32);
    /// Writes into the currently bound program, whatever it is.
    fn uniform_1_f32(&self, location: &Self::UniformLocation, value: f32);
    fn get_uniform_i32(&self, program: Self::Program, location: &Self::UniformLocation) -> i32;
    fn get_uniform_f32(&self, program: Self::Program, location: &Self::UniformLocation) -> f32;
}

#[cfg(feature = "glow")]
pub use self::glow_driver::GlowDriver;

#[cfg(feature = "glow")]
mod glow_driver {
    use glow::HasContext;

    use super::GlDriver;
    use crate::types::StageKind;

    type Gl = glow::Context;

    /// [`GlDriver`] over a loaded `glow` context.
    pub struct GlowDriver {
        gl: Gl,
    }

    impl GlowDriver {
        /// # Safety
        ///
        /// `gl` must have been loaded from a context that is current on the
        /// calling thread, and must stay current for as long as this driver
        /// (or anything built from it) is used.
        pub unsafe fn new(gl: Gl) -> Self {
            Self { gl }
        }

        /// Raw context for calls outside the shader pipeline (buffers, draws).
        pub fn gl(&self) -> &Gl {
            &self.gl
        }
    }

    // SAFETY for every block below: `GlowDriver::new` requires the context to
    // be current on this thread for the driver's lifetime, and all handles
    // passed in were produced by this same context.
    impl GlDriver for GlowDriver {
        type Shader = <Gl as HasContext>::Shader;
        type Program = <Gl as HasContext>::Program;
        type UniformLocation = <Gl as HasContext>::UniformLocation;

        fn create_shader(&self, kind: StageKind) -> Result<Self::Shader, String> {
            unsafe { self.gl.create_shader(kind.gl_enum()) }
        }

        fn shader_source(&self, shader: Self::Shader, source: &str) {
            unsafe { self.gl.shader_source(shader, source) }
        }

        fn compile_shader(&self, shader: Self::Shader) {
            unsafe { self.gl.compile_shader(shader) }
        }

        fn shader_compile_status(&self, shader: Self::Shader) -> bool {
            unsafe { self.gl.get_shader_compile_status(shader) }
        }

        fn shader_info_log(&self, shader: Self::Shader) -> String {
            unsafe { self.gl.get_shader_info_log(shader) }
        }

        fn delete_shader(&self, shader: Self::Shader) {
            unsafe { self.gl.delete_shader(shader) }
        }

        fn create_program(&self) -> Result<Self::Program, String> {
            unsafe { self.gl.create_program() }
        }

        fn attach_shader(&self, program: Self::Program, shader: Self::Shader) {
            unsafe { self.gl.attach_shader(program, shader) }
        }

        fn detach_shader(&self, program: Self::Program, shader: Self::Shader) {
            unsafe { self.gl.detach_shader(program, shader) }
        }

        fn link_program(&self, program: Self::Program) {
            unsafe { self.gl.link_program(program) }
        }

        fn program_link_status(&self, program: Self::Program) -> bool {
            unsafe { self.gl.get_program_link_status(program) }
        }

        fn program_info_log(&self, program: Self::Program) -> String {
            unsafe { self.gl.get_program_info_log(program) }
        }

        fn delete_program(&self, program: Self::Program) {
            unsafe { self.gl.delete_program(program) }
        }

        fn use_program(&self, program: Option<Self::Program>) {
            unsafe { self.gl.use_program(program) }
        }

        fn uniform_location(
            &self,
            program: Self::Program,
            name: &str,
        ) -> Option<Self::UniformLocation> {
            // glow turns the name into a C string and panics on interior NUL.
            if name.contains('\0') {
                return None;
            }
            unsafe { self.gl.get_uniform_location(program, name) }
        }

        fn uniform_1_i32(&self, location: &Self::UniformLocation, value: i32) {
            unsafe { self.gl.uniform_1_i32(Some(location), value) }
        }

        fn uniform_1_f32(&self, location: &Self::UniformLocation, value: f32) {
            unsafe { self.gl.uniform_1_f32(Some(location), value) }
        }

        fn get_uniform_i32(&self, program: Self::Program, location: &Self::UniformLocation) -> i32 {
            let mut value = [0i32; 1];
            unsafe { self.gl.get_uniform_i32(program, location, &mut value) };
            value[0]
        }

        fn get_uniform_f32(&self, program: Self::Program, location: &Self::UniformLocation) -> f32 {
            let mut value = [0f32; 1];
            unsafe { self.gl.get_uniform_f32(program, location, &mut value) };
            value[0]
        }
    }
}

#[cfg(all(test, feature = "glow"))]
mod tests {
    use super::*;
    use crate::context::GlContext;
    use crate::error::ShaderError;
    use crate::fake_gl;
    use crate::program::ShaderProgram;
    use crate::source::ShaderSource;

    const VERTEX: &str = "void main() { gl_Position = vec4(hOffset); }\n";
    const FRAGMENT: &str = "void main() { FragColor = vec4(flip); }\n";

    fn glow_context() -> GlContext<GlowDriver> {
        let gl = fake_gl::context();
        fake_gl::set_active_uniforms(&["hOffset", "flip"]);
        GlContext::new(unsafe { GlowDriver::new(gl) })
    }

    fn build(ctx: &GlContext<GlowDriver>) -> ShaderProgram<GlowDriver> {
        ctx.build_program(
            &ShaderSource::Embedded(VERTEX),
            &ShaderSource::Embedded(FRAGMENT),
        )
        .unwrap()
    }

    #[test]
    fn inactive_names_map_to_none() {
        let ctx = glow_context();
        let program = build(&ctx);
        let driver = ctx.driver();

        assert!(driver.uniform_location(program.raw(), "hOffset").is_some());
        assert!(driver.uniform_location(program.raw(), "missing").is_none());
        assert_eq!(fake_gl::state().uniform_lookups, vec!["hOffset", "missing"]);
    }

    #[test]
    fn names_with_nul_never_reach_the_driver() {
        let ctx = glow_context();
        let program = build(&ctx);
        program.activate();

        program.set_float("hOffset\0", 0.5);
        program.set_bool("flip\0junk", true);
        assert!(matches!(
            program.try_set("hOffset\0", 1.0f32),
            Err(ShaderError::UniformNotFound { .. })
        ));
        assert_eq!(program.get_float("hOffset\0"), None);

        let state = fake_gl::state();
        assert!(state.uniform_lookups.is_empty());
        assert!(state.float_writes.is_empty());
        assert!(state.int_writes.is_empty());
    }

    #[test]
    fn writes_read_back_through_glow() {
        let ctx = glow_context();
        let program = build(&ctx);
        program.activate();

        program.set_bool("flip", true);
        program.set_float("hOffset", 0.5);

        let state = fake_gl::state();
        assert_eq!(state.bound_program, program.raw().0.get());
        assert_eq!(state.int_writes, vec![(1, 1)]);
        assert_eq!(state.float_writes, vec![(0, 0.5)]);
        assert_eq!(program.get_bool("flip"), Some(true));
        assert_eq!(program.get_float("hOffset"), Some(0.5));
        assert_eq!(program.get_int("flip"), Some(1));
    }

    #[test]
    fn dropping_the_active_program_unbinds_before_delete() {
        let ctx = glow_context();
        let program = build(&ctx);
        let raw = program.raw().0.get();
        program.activate();
        drop(program);

        let state = fake_gl::state();
        assert_eq!(state.bound_program, 0);
        assert_eq!(state.deleted_programs, vec![raw]);
        assert_eq!(state.deleted_shaders.len(), 2);
        assert_eq!(ctx.active_program(), None);
    }
}
