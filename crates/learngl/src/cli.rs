use std::path::PathBuf;

use clap::{Parser, Subcommand};
use glshader::StageKind;

use crate::lessons::Lesson;

#[derive(Parser, Debug)]
#[command(
    name = "learngl",
    author,
    version,
    about = "Getting-started OpenGL lessons",
    arg_required_else_help = true
)]
pub struct Cli {
    /// TOML configuration file (defaults to ./learngl.toml when present).
    #[arg(long, global = true, value_name = "FILE", env = "LEARNGL_CONFIG")]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Open a window and render a lesson.
    Run(RunArgs),
    /// List available lessons.
    Lessons,
    /// Print a lesson's embedded shader source.
    Show(ShowArgs),
}

#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Lesson to render (see `learngl lessons`).
    #[arg(value_name = "LESSON", value_parser = parse_lesson)]
    pub lesson: Lesson,

    /// Replace the lesson's vertex shader with this file.
    #[arg(long, value_name = "FILE")]
    pub vertex: Option<PathBuf>,

    /// Replace the lesson's fragment shader with this file.
    #[arg(long, value_name = "FILE")]
    pub fragment: Option<PathBuf>,

    /// Window size override (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_size)]
    pub size: Option<(u32, u32)>,

    /// Draw polygons as outlines.
    #[arg(long)]
    pub wireframe: bool,

    /// Log a warning the first time a uniform name fails to resolve.
    #[arg(long)]
    pub warn_missing_uniforms: bool,
}

#[derive(Parser, Debug)]
pub struct ShowArgs {
    #[arg(value_name = "LESSON", value_parser = parse_lesson)]
    pub lesson: Lesson,

    /// Only print one stage (`vertex` or `fragment`).
    #[arg(long, value_name = "STAGE", value_parser = parse_stage)]
    pub stage: Option<StageKind>,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_lesson(value: &str) -> Result<Lesson, String> {
    if value.trim().is_empty() {
        return Err("lesson name must not be empty".to_string());
    }
    value.parse()
}

pub fn parse_stage(value: &str) -> Result<StageKind, String> {
    value.parse()
}

pub fn parse_size(value: &str) -> Result<(u32, u32), String> {
    let (w, h) = value
        .trim()
        .split_once(['x', 'X'])
        .ok_or_else(|| "expected WIDTHxHEIGHT".to_string())?;
    let width = w
        .trim()
        .parse::<u32>()
        .map_err(|_| "invalid width in window size".to_string())?;
    let height = h
        .trim()
        .parse::<u32>()
        .map_err(|_| "invalid height in window size".to_string())?;
    if width == 0 || height == 0 {
        return Err("window size must be greater than zero".into());
    }
    Ok((width, height))
}
