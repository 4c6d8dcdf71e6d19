//! Fake GL entry points behind a real `glow::Context`.
//!
//! [`context`] loads glow against plain `extern "system"` functions, so code
//! written against glow runs without a display or GPU. Every shader compiles,
//! every program links, and the uniforms named by [`set_active_uniforms`]
//! resolve to locations in declaration order. Writes land in the bound
//! program; a deleted program stays bound until the next `glUseProgram`.
//!
//! State lives in a thread local. Each test thread starts from a clean fake,
//! and [`context`] resets it.
use std::cell::RefCell;
use std::collections::HashMap;
use std::ffi::{c_char, c_void, CStr};
use std::ptr;

/// Snapshot of what the fake has been asked to do.
#[derive(Debug, Default, Clone)]
pub struct FakeGlState {
    next_name: u32,
    active_uniforms: Vec<String>,
    ints: HashMap<(u32, i32), i32>,
    floats: HashMap<(u32, i32), f32>,
    pub bound_program: u32,
    pub deleted_programs: Vec<u32>,
    pub deleted_shaders: Vec<u32>,
    pub deleted_vertex_arrays: Vec<u32>,
    pub deleted_buffers: Vec<u32>,
    pub uniform_lookups: Vec<String>,
    pub int_writes: Vec<(i32, i32)>,
    pub float_writes: Vec<(i32, f32)>,
    /// `(target, byte length)` per `glBufferData`.
    pub buffer_uploads: Vec<(u32, usize)>,
    /// `(index, components, stride, byte offset)` per `glVertexAttribPointer`.
    pub attribute_pointers: Vec<(u32, i32, i32, usize)>,
    pub enabled_attributes: Vec<u32>,
    /// `(vertex count, indexed)` per draw call.
    pub draws: Vec<(i32, bool)>,
}

thread_local! {
    static STATE: RefCell<FakeGlState> = RefCell::new(FakeGlState::default());
}

fn with_state<R>(f: impl FnOnce(&mut FakeGlState) -> R) -> R {
    STATE.with(|state| f(&mut state.borrow_mut()))
}

fn allocate(state: &mut FakeGlState) -> u32 {
    state.next_name += 1;
    state.next_name
}

/// Resets the fake and returns a glow context bound to it.
pub fn context() -> glow::Context {
    with_state(|state| *state = FakeGlState::default());
    // SAFETY: every pointer handed out below is a function with the
    // signature glow expects for that name; all other names resolve to null.
    unsafe { glow::Context::from_loader_function_cstr(lookup) }
}

/// Uniform names every linked program reports as active.
pub fn set_active_uniforms(names: &[&str]) {
    with_state(|state| {
        state.active_uniforms = names.iter().map(|name| name.to_string()).collect();
    });
}

pub fn state() -> FakeGlState {
    with_state(|state| state.clone())
}

fn lookup(name: &CStr) -> *const c_void {
    match name.to_bytes() {
        b"glGetString" => get_string as *const c_void,
        b"glCreateShader" => create_shader as *const c_void,
        b"glShaderSource" => shader_source as *const c_void,
        b"glCompileShader" => compile_shader as *const c_void,
        b"glGetShaderiv" => get_shader_iv as *const c_void,
        b"glDeleteShader" => delete_shader as *const c_void,
        b"glCreateProgram" => create_program as *const c_void,
        b"glAttachShader" => attach_shader as *const c_void,
        b"glDetachShader" => attach_shader as *const c_void,
        b"glLinkProgram" => link_program as *const c_void,
        b"glGetProgramiv" => get_program_iv as *const c_void,
        b"glDeleteProgram" => delete_program as *const c_void,
        b"glUseProgram" => use_program as *const c_void,
        b"glGetUniformLocation" => get_uniform_location as *const c_void,
        b"glUniform1i" => uniform_1i as *const c_void,
        b"glUniform1f" => uniform_1f as *const c_void,
        b"glGetUniformiv" => get_uniform_iv as *const c_void,
        b"glGetUniformfv" => get_uniform_fv as *const c_void,
        b"glGenVertexArrays" => gen_names as *const c_void,
        b"glGenBuffers" => gen_names as *const c_void,
        b"glBindVertexArray" => bind_name as *const c_void,
        b"glBindBuffer" => bind_target as *const c_void,
        b"glBufferData" => buffer_data as *const c_void,
        b"glVertexAttribPointer" => vertex_attrib_pointer as *const c_void,
        b"glEnableVertexAttribArray" => enable_vertex_attrib_array as *const c_void,
        b"glDrawArrays" => draw_arrays as *const c_void,
        b"glDrawElements" => draw_elements as *const c_void,
        b"glDeleteVertexArrays" => delete_vertex_arrays as *const c_void,
        b"glDeleteBuffers" => delete_buffers as *const c_void,
        _ => ptr::null(),
    }
}

extern "system" fn get_string(name: u32) -> *const u8 {
    match name {
        glow::VERSION => b"2.1\0".as_ptr(),
        glow::EXTENSIONS => b"\0".as_ptr(),
        _ => ptr::null(),
    }
}

extern "system" fn create_shader(_kind: u32) -> u32 {
    with_state(allocate)
}

extern "system" fn shader_source(
    _shader: u32,
    _count: i32,
    _strings: *const *const c_char,
    _lengths: *const i32,
) {
}

extern "system" fn compile_shader(_shader: u32) {}

extern "system" fn get_shader_iv(_shader: u32, pname: u32, params: *mut i32) {
    let value = i32::from(pname == glow::COMPILE_STATUS);
    unsafe { *params = value };
}

extern "system" fn delete_shader(shader: u32) {
    with_state(|state| state.deleted_shaders.push(shader));
}

extern "system" fn create_program() -> u32 {
    with_state(allocate)
}

extern "system" fn attach_shader(_program: u32, _shader: u32) {}

extern "system" fn link_program(_program: u32) {}

extern "system" fn get_program_iv(_program: u32, pname: u32, params: *mut i32) {
    let value = i32::from(pname == glow::LINK_STATUS);
    unsafe { *params = value };
}

extern "system" fn delete_program(program: u32) {
    with_state(|state| state.deleted_programs.push(program));
}

extern "system" fn use_program(program: u32) {
    with_state(|state| state.bound_program = program);
}

extern "system" fn get_uniform_location(_program: u32, name: *const c_char) -> i32 {
    let name = unsafe { CStr::from_ptr(name) }.to_string_lossy().into_owned();
    with_state(|state| {
        let location = state
            .active_uniforms
            .iter()
            .position(|active| *active == name)
            .map_or(-1, |index| index as i32);
        state.uniform_lookups.push(name);
        location
    })
}

extern "system" fn uniform_1i(location: i32, value: i32) {
    with_state(|state| {
        state.int_writes.push((location, value));
        let program = state.bound_program;
        state.ints.insert((program, location), value);
    });
}

extern "system" fn uniform_1f(location: i32, value: f32) {
    with_state(|state| {
        state.float_writes.push((location, value));
        let program = state.bound_program;
        state.floats.insert((program, location), value);
    });
}

extern "system" fn get_uniform_iv(program: u32, location: i32, params: *mut i32) {
    let value = with_state(|state| state.ints.get(&(program, location)).copied().unwrap_or(0));
    unsafe { *params = value };
}

extern "system" fn get_uniform_fv(program: u32, location: i32, params: *mut f32) {
    let value = with_state(|state| {
        state
            .floats
            .get(&(program, location))
            .copied()
            .unwrap_or(0.0)
    });
    unsafe { *params = value };
}

extern "system" fn gen_names(count: i32, names: *mut u32) {
    for index in 0..count.max(0) as usize {
        let name = with_state(allocate);
        unsafe { *names.add(index) = name };
    }
}

extern "system" fn bind_name(_name: u32) {}

extern "system" fn bind_target(_target: u32, _name: u32) {}

extern "system" fn buffer_data(target: u32, size: isize, _data: *const c_void, _usage: u32) {
    with_state(|state| state.buffer_uploads.push((target, size as usize)));
}

extern "system" fn vertex_attrib_pointer(
    index: u32,
    size: i32,
    _kind: u32,
    _normalized: u8,
    stride: i32,
    offset: *const c_void,
) {
    with_state(|state| {
        state
            .attribute_pointers
            .push((index, size, stride, offset as usize));
    });
}

extern "system" fn enable_vertex_attrib_array(index: u32) {
    with_state(|state| state.enabled_attributes.push(index));
}

extern "system" fn draw_arrays(_mode: u32, _first: i32, count: i32) {
    with_state(|state| state.draws.push((count, false)));
}

extern "system" fn draw_elements(_mode: u32, count: i32, _kind: u32, _offset: *const c_void) {
    with_state(|state| state.draws.push((count, true)));
}

extern "system" fn delete_vertex_arrays(count: i32, names: *const u32) {
    let names = unsafe { std::slice::from_raw_parts(names, count.max(0) as usize) };
    with_state(|state| state.deleted_vertex_arrays.extend_from_slice(names));
}

extern "system" fn delete_buffers(count: i32, names: *const u32) {
    let names = unsafe { std::slice::from_raw_parts(names, count.max(0) as usize) };
    with_state(|state| state.deleted_buffers.extend_from_slice(names));
}
