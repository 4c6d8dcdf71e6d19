//! In-memory [`GlDriver`] that behaves like a strict GL implementation.
//!
//! It compiles nothing, but it keeps the bookkeeping a real driver does:
//! object lifetimes, the bound program, per-program uniform storage keyed by
//! location, and writes landing on whichever program is bound. A small
//! declaration scanner stands in for the GLSL front end:
//!
//! - a stage fails to compile when its braces do not balance or it has no
//!   `main`, or when it contains a needle registered with
//!   [`RecordingDriver::reject_source_containing`];
//! - linking fails when a fragment `in` has no vertex `out` of the same name;
//! - a `uniform` that is declared but never referenced is optimised away.
//!
//! Deleting the bound program only flags it, as GL does: it stays bound and
//! writable until another `use_program` call, then it is gone.
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::driver::GlDriver;
use crate::types::StageKind;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CreateShader(StageKind, u32),
    ShaderSource(u32),
    CompileShader(u32),
    DeleteShader(u32),
    CreateProgram(u32),
    AttachShader(u32, u32),
    DetachShader(u32, u32),
    LinkProgram(u32),
    DeleteProgram(u32),
    UseProgram(Option<u32>),
    UniformLocation(u32, String),
    Uniform1i(i32, i32),
    Uniform1f(i32, f32),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Stored {
    Int(i32),
    Float(f32),
}

#[derive(Debug)]
struct ShaderObject {
    kind: StageKind,
    source: String,
    compiled: Option<bool>,
    log: String,
}

#[derive(Debug, Default)]
struct ProgramObject {
    attached: Vec<u32>,
    linked: bool,
    log: String,
    locations: BTreeMap<String, i32>,
    values: HashMap<i32, Stored>,
    delete_pending: bool,
}

#[derive(Debug, Default)]
struct DriverState {
    next_id: u32,
    shaders: HashMap<u32, ShaderObject>,
    programs: HashMap<u32, ProgramObject>,
    bound: Option<u32>,
    calls: Vec<Call>,
    gl_errors: Vec<String>,
    rejections: Vec<(String, String)>,
    link_failure: Option<String>,
    refuse_objects: bool,
}

impl DriverState {
    fn allocate(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Debug, Default)]
pub struct RecordingDriver {
    state: RefCell<DriverState>,
}

impl RecordingDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Any stage whose source contains `needle` fails to compile with `log`.
    pub fn reject_source_containing(&self, needle: &str, log: &str) {
        self.state
            .borrow_mut()
            .rejections
            .push((needle.to_string(), log.to_string()));
    }

    /// Every subsequent link fails with `log`.
    pub fn fail_links_with(&self, log: &str) {
        self.state.borrow_mut().link_failure = Some(log.to_string());
    }

    /// Object creation fails from now on, as when the context is lost.
    pub fn refuse_object_creation(&self) {
        self.state.borrow_mut().refuse_objects = true;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.borrow().calls.clone()
    }

    pub fn count_calls(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.state.borrow().calls.iter().filter(|call| predicate(call)).count()
    }

    pub fn live_shaders(&self) -> usize {
        self.state.borrow().shaders.len()
    }

    /// Program objects that still exist, including one flagged for deletion
    /// while bound.
    pub fn live_programs(&self) -> usize {
        self.state.borrow().programs.len()
    }

    pub fn bound_program(&self) -> Option<u32> {
        self.state.borrow().bound
    }

    /// GL errors raised so far, in order (`GL_INVALID_OPERATION` and friends).
    pub fn gl_errors(&self) -> Vec<String> {
        self.state.borrow().gl_errors.clone()
    }

    /// Names the linker kept active for `program`, sorted.
    pub fn active_uniforms(&self, program: u32) -> Vec<String> {
        self.state
            .borrow()
            .programs
            .get(&program)
            .map(|object| object.locations.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn write(&self, location: i32, value: Stored) {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        let Some(bound) = state.bound else {
            state
                .gl_errors
                .push("GL_INVALID_OPERATION: no program bound".to_string());
            return;
        };
        let Some(program) = state.programs.get_mut(&bound) else {
            state
                .gl_errors
                .push(format!("GL_INVALID_OPERATION: program {bound} deleted"));
            return;
        };
        if program.locations.values().any(|loc| *loc == location) {
            program.values.insert(location, value);
        } else {
            state.gl_errors.push(format!(
                "GL_INVALID_OPERATION: location {location} not in program {bound}"
            ));
        }
    }

    fn read(&self, program: u32, location: i32) -> Option<Stored> {
        let state = self.state.borrow();
        let object = state.programs.get(&program)?;
        if !object.locations.values().any(|loc| *loc == location) {
            return None;
        }
        Some(
            object
                .values
                .get(&location)
                .copied()
                .unwrap_or(Stored::Int(0)),
        )
    }
}

impl GlDriver for RecordingDriver {
    type Shader = u32;
    type Program = u32;
    type UniformLocation = i32;

    fn create_shader(&self, kind: StageKind) -> Result<u32, String> {
        let mut state = self.state.borrow_mut();
        if state.refuse_objects {
            return Err("GL_OUT_OF_MEMORY: cannot create shader object".to_string());
        }
        let id = state.allocate();
        state.shaders.insert(
            id,
            ShaderObject {
                kind,
                source: String::new(),
                compiled: None,
                log: String::new(),
            },
        );
        state.calls.push(Call::CreateShader(kind, id));
        Ok(id)
    }

    fn shader_source(&self, shader: u32, source: &str) {
        let mut state = self.state.borrow_mut();
        state.calls.push(Call::ShaderSource(shader));
        if let Some(object) = state.shaders.get_mut(&shader) {
            object.source = source.to_string();
        }
    }

    fn compile_shader(&self, shader: u32) {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        state.calls.push(Call::CompileShader(shader));
        let rejections = state.rejections.clone();
        let Some(object) = state.shaders.get_mut(&shader) else {
            return;
        };
        let verdict = rejections
            .iter()
            .find(|(needle, _)| object.source.contains(needle.as_str()))
            .map(|(_, log)| log.clone())
            .or_else(|| check_syntax(&object.source));
        match verdict {
            Some(log) => {
                object.compiled = Some(false);
                object.log = log;
            }
            None => {
                object.compiled = Some(true);
                object.log.clear();
            }
        }
    }

    fn shader_compile_status(&self, shader: u32) -> bool {
        self.state
            .borrow()
            .shaders
            .get(&shader)
            .and_then(|object| object.compiled)
            .unwrap_or(false)
    }

    fn shader_info_log(&self, shader: u32) -> String {
        self.state
            .borrow()
            .shaders
            .get(&shader)
            .map(|object| object.log.clone())
            .unwrap_or_default()
    }

    fn delete_shader(&self, shader: u32) {
        let mut state = self.state.borrow_mut();
        state.calls.push(Call::DeleteShader(shader));
        if state.shaders.remove(&shader).is_none() {
            state
                .gl_errors
                .push(format!("GL_INVALID_VALUE: shader {shader} deleted twice"));
        }
    }

    fn create_program(&self) -> Result<u32, String> {
        let mut state = self.state.borrow_mut();
        if state.refuse_objects {
            return Err("GL_OUT_OF_MEMORY: cannot create program object".to_string());
        }
        let id = state.allocate();
        state.programs.insert(id, ProgramObject::default());
        state.calls.push(Call::CreateProgram(id));
        Ok(id)
    }

    fn attach_shader(&self, program: u32, shader: u32) {
        let mut state = self.state.borrow_mut();
        state.calls.push(Call::AttachShader(program, shader));
        if let Some(object) = state.programs.get_mut(&program) {
            object.attached.push(shader);
        }
    }

    fn detach_shader(&self, program: u32, shader: u32) {
        let mut state = self.state.borrow_mut();
        state.calls.push(Call::DetachShader(program, shader));
        if let Some(object) = state.programs.get_mut(&program) {
            object.attached.retain(|attached| *attached != shader);
        }
    }

    fn link_program(&self, program: u32) {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        state.calls.push(Call::LinkProgram(program));
        let scripted = state.link_failure.clone();

        let attached = match state.programs.get(&program) {
            Some(object) => object.attached.clone(),
            None => return,
        };
        let stage = |kind: StageKind| {
            attached
                .iter()
                .filter_map(|id| state.shaders.get(id))
                .find(|object| object.kind == kind && object.compiled == Some(true))
                .map(|object| object.source.clone())
        };
        let vertex = stage(StageKind::Vertex);
        let fragment = stage(StageKind::Fragment);

        let outcome = match (scripted, vertex, fragment) {
            (Some(log), _, _) => Err(log),
            (None, None, _) => Err("error: no compiled vertex shader attached".to_string()),
            (None, _, None) => Err("error: no compiled fragment shader attached".to_string()),
            (None, Some(vertex), Some(fragment)) => link_interfaces(&vertex, &fragment),
        };

        let Some(object) = state.programs.get_mut(&program) else {
            return;
        };
        object.values.clear();
        match outcome {
            Ok(locations) => {
                object.linked = true;
                object.log.clear();
                object.locations = locations;
            }
            Err(log) => {
                object.linked = false;
                object.log = log;
                object.locations.clear();
            }
        }
    }

    fn program_link_status(&self, program: u32) -> bool {
        self.state
            .borrow()
            .programs
            .get(&program)
            .map(|object| object.linked)
            .unwrap_or(false)
    }

    fn program_info_log(&self, program: u32) -> String {
        self.state
            .borrow()
            .programs
            .get(&program)
            .map(|object| object.log.clone())
            .unwrap_or_default()
    }

    fn delete_program(&self, program: u32) {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        state.calls.push(Call::DeleteProgram(program));
        match state.programs.get_mut(&program) {
            Some(object) if !object.delete_pending => {
                if state.bound == Some(program) {
                    object.delete_pending = true;
                } else {
                    state.programs.remove(&program);
                }
            }
            _ => state
                .gl_errors
                .push(format!("GL_INVALID_VALUE: program {program} deleted twice")),
        }
    }

    fn use_program(&self, program: Option<u32>) {
        let mut state = self.state.borrow_mut();
        state.calls.push(Call::UseProgram(program));
        match program {
            Some(id) if !state.programs.get(&id).is_some_and(|object| object.linked) => {
                state
                    .gl_errors
                    .push(format!("GL_INVALID_OPERATION: program {id} is not linked"));
            }
            _ => {
                let previous = std::mem::replace(&mut state.bound, program);
                if let Some(previous) = previous.filter(|previous| Some(*previous) != program) {
                    if state
                        .programs
                        .get(&previous)
                        .is_some_and(|object| object.delete_pending)
                    {
                        state.programs.remove(&previous);
                    }
                }
            }
        }
    }

    fn uniform_location(&self, program: u32, name: &str) -> Option<i32> {
        let mut state = self.state.borrow_mut();
        state
            .calls
            .push(Call::UniformLocation(program, name.to_string()));
        state
            .programs
            .get(&program)
            .filter(|object| object.linked)
            .and_then(|object| object.locations.get(name).copied())
    }

    fn uniform_1_i32(&self, location: &i32, value: i32) {
        self.state
            .borrow_mut()
            .calls
            .push(Call::Uniform1i(*location, value));
        self.write(*location, Stored::Int(value));
    }

    fn uniform_1_f32(&self, location: &i32, value: f32) {
        self.state
            .borrow_mut()
            .calls
            .push(Call::Uniform1f(*location, value));
        self.write(*location, Stored::Float(value));
    }

    fn get_uniform_i32(&self, program: u32, location: &i32) -> i32 {
        match self.read(program, *location) {
            Some(Stored::Int(value)) => value,
            Some(Stored::Float(value)) => value as i32,
            None => 0,
        }
    }

    fn get_uniform_f32(&self, program: u32, location: &i32) -> f32 {
        match self.read(program, *location) {
            Some(Stored::Int(value)) => value as f32,
            Some(Stored::Float(value)) => value,
            None => 0.0,
        }
    }
}

fn check_syntax(source: &str) -> Option<String> {
    let mut depth = 0i64;
    for (index, line) in source.lines().enumerate() {
        for ch in strip_comment(line).chars() {
            match ch {
                '{' => depth += 1,
                '}' => depth -= 1,
                _ => {}
            }
            if depth < 0 {
                return Some(format!(
                    "0:{}(1): error: syntax error, unexpected '}}'\n",
                    index + 1
                ));
            }
        }
    }
    if depth != 0 {
        let last = source.lines().count().max(1);
        return Some(format!(
            "0:{last}(1): error: syntax error, unexpected end of file\n"
        ));
    }
    if count_identifier(source, "main") == 0 {
        return Some("0:1(1): error: no function `main' defined\n".to_string());
    }
    None
}

fn link_interfaces(vertex: &str, fragment: &str) -> Result<BTreeMap<String, i32>, String> {
    let outputs: HashSet<&str> = declared(vertex, "out").into_iter().collect();
    let missing: Vec<&str> = declared(fragment, "in")
        .into_iter()
        .filter(|name| !outputs.contains(name))
        .collect();
    if !missing.is_empty() {
        let log: String = missing
            .iter()
            .map(|name| {
                format!("error: fragment shader input `{name}' has no matching vertex shader output\n")
            })
            .collect();
        return Err(log);
    }

    let mut locations = BTreeMap::new();
    for source in [vertex, fragment] {
        for name in declared(source, "uniform") {
            let declarations =
                declared(vertex, "uniform").iter().filter(|n| **n == name).count()
                    + declared(fragment, "uniform")
                        .iter()
                        .filter(|n| **n == name)
                        .count();
            let references = count_identifier(vertex, name) + count_identifier(fragment, name);
            if references > declarations && !locations.contains_key(name) {
                let next = locations.len() as i32;
                locations.insert(name.to_string(), next);
            }
        }
    }
    Ok(locations)
}

/// Names declared with `qualifier` at global scope, ignoring `layout(..)`.
fn declared<'a>(source: &'a str, qualifier: &str) -> Vec<&'a str> {
    source
        .lines()
        .filter_map(|line| {
            let mut line = strip_comment(line).trim();
            if let Some(rest) = line.strip_prefix("layout") {
                let close = rest.find(')')?;
                line = rest[close + 1..].trim_start();
            }
            let rest = line.strip_prefix(qualifier)?;
            if !rest.starts_with(char::is_whitespace) {
                return None;
            }
            let declaration = rest.split(';').next()?.trim();
            declaration.split_whitespace().last()
        })
        .collect()
}

fn strip_comment(line: &str) -> &str {
    line.split("//").next().unwrap_or(line)
}

fn count_identifier(source: &str, name: &str) -> usize {
    let is_ident = |ch: char| ch.is_ascii_alphanumeric() || ch == '_';
    source
        .lines()
        .map(strip_comment)
        .map(|line| {
            line.match_indices(name)
                .filter(|(start, _)| {
                    let before = line[..*start].chars().next_back();
                    let after = line[start + name.len()..].chars().next();
                    !before.is_some_and(is_ident) && !after.is_some_and(is_ident)
                })
                .count()
        })
        .sum()
}
