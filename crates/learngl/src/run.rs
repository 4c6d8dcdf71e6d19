use anyhow::{Context, Result};
use glshader::{MissingUniformPolicy, PipelineOptions, ShaderSource};
use tracing_subscriber::EnvFilter;
use winit::event_loop::EventLoop;

use crate::cli::RunArgs;
use crate::config::AppConfig;
use crate::lessons::Lesson;
use crate::window::LessonApp;

/// Everything the window needs, with CLI overrides applied over the config file.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub lesson: Lesson,
    pub vertex: ShaderSource,
    pub fragment: ShaderSource,
    pub width: u32,
    pub height: u32,
    pub title: String,
    pub vsync: bool,
    pub clear_color: [f32; 4],
    pub wireframe: bool,
    pub pipeline: PipelineOptions,
}

impl RunSettings {
    pub fn resolve(args: RunArgs, config: AppConfig) -> Self {
        let (width, height) = args
            .size
            .unwrap_or((config.window.width, config.window.height));
        let mut pipeline = config.pipeline;
        if args.warn_missing_uniforms {
            pipeline.missing_uniform = MissingUniformPolicy::WarnOnce;
        }
        let vertex = match args.vertex {
            Some(path) => ShaderSource::File(path),
            None => ShaderSource::Embedded(args.lesson.vertex_source()),
        };
        let fragment = match args.fragment {
            Some(path) => ShaderSource::File(path),
            None => ShaderSource::Embedded(args.lesson.fragment_source()),
        };
        Self {
            lesson: args.lesson,
            vertex,
            fragment,
            width,
            height,
            title: format!("{} - {}", config.window.title, args.lesson),
            vsync: config.window.vsync,
            clear_color: config.clear.color,
            wireframe: args.wireframe,
            pipeline,
        }
    }
}

pub fn run(args: RunArgs, config: AppConfig) -> Result<()> {
    let settings = RunSettings::resolve(args, config);
    tracing::info!(
        lesson = %settings.lesson,
        vertex = %settings.vertex.describe(),
        fragment = %settings.fragment.describe(),
        width = settings.width,
        height = settings.height,
        "starting lesson"
    );

    let event_loop = EventLoop::new().context("failed to create event loop")?;
    let mut app = LessonApp::new(settings);
    event_loop
        .run_app(&mut app)
        .context("event loop terminated abnormally")?;
    app.finish()
}

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
