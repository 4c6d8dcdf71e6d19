use std::num::NonZeroU32;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use glow::HasContext;
use glshader::{GlContext, GlowDriver, ShaderProgram};
use glutin::config::ConfigTemplateBuilder;
use glutin::context::{ContextApi, ContextAttributesBuilder, GlProfile, PossiblyCurrentContext, Version};
use glutin::display::GetGlDisplay;
use glutin::prelude::*;
use glutin::surface::{Surface, SwapInterval, WindowSurface};
use glutin_winit::{DisplayBuilder, GlWindow};
use raw_window_handle::HasWindowHandle;
use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::ActiveEventLoop;
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowId};

use crate::mesh::GpuMesh;
use crate::run::RunSettings;

/// Window lifecycle for a single lesson.
pub struct LessonApp {
    settings: RunSettings,
    state: Option<RenderState>,
    started: Instant,
    error: Option<anyhow::Error>,
}

impl LessonApp {
    pub fn new(settings: RunSettings) -> Self {
        Self {
            settings,
            state: None,
            started: Instant::now(),
            error: None,
        }
    }

    /// Surfaces the error that stopped the event loop, if any.
    pub fn finish(mut self) -> Result<()> {
        self.state = None;
        match self.error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        tracing::error!(error = %format!("{err:#}"), "stopping lesson");
        self.error = Some(err);
        self.state = None;
        event_loop.exit();
    }
}

impl ApplicationHandler for LessonApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }
        match RenderState::new(event_loop, &self.settings) {
            Ok(state) => {
                tracing::info!(lesson = %self.settings.lesson, "lesson window ready");
                self.started = Instant::now();
                self.state = Some(state);
            }
            Err(err) => self.fail(event_loop, err),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let Some(state) = self.state.as_mut() else {
            return;
        };
        match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => event_loop.exit(),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        logical_key: Key::Named(NamedKey::Escape),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => event_loop.exit(),
            WindowEvent::Resized(size) => state.resize(size),
            WindowEvent::RedrawRequested => {
                let elapsed = self.started.elapsed();
                if let Err(err) = state.render(&self.settings, elapsed) {
                    self.fail(event_loop, err);
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = &self.state {
            state.window.request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        // GL objects go while the context is still current.
        self.state = None;
    }
}

/// GL objects for the open window. Field order is drop order: the program
/// and meshes are released before the context that owns them.
struct RenderState {
    program: ShaderProgram<GlowDriver>,
    meshes: Vec<GpuMesh>,
    ctx: GlContext<GlowDriver>,
    surface: Surface<WindowSurface>,
    gl_context: PossiblyCurrentContext,
    window: Window,
}

impl RenderState {
    fn new(event_loop: &ActiveEventLoop, settings: &RunSettings) -> Result<Self> {
        let attributes = Window::default_attributes()
            .with_title(settings.title.as_str())
            .with_inner_size(LogicalSize::new(settings.width, settings.height));

        // The picker must return a config; an empty list means no usable GL display.
        let (window, gl_config) = DisplayBuilder::new()
            .with_window_attributes(Some(attributes))
            .build(event_loop, ConfigTemplateBuilder::new(), |configs| {
                configs
                    .max_by_key(|config| config.num_samples())
                    .expect("display offered at least one config")
            })
            .map_err(|err| anyhow!("failed to create window: {err}"))?;
        let window = window.context("display builder did not create a window")?;

        let raw_window_handle = window
            .window_handle()
            .ok()
            .map(|handle| handle.as_raw());
        let gl_display = gl_config.display();
        let context_attributes = ContextAttributesBuilder::new()
            .with_profile(GlProfile::Core)
            .with_context_api(ContextApi::OpenGl(Some(Version::new(3, 3))))
            .build(raw_window_handle);
        let not_current = unsafe { gl_display.create_context(&gl_config, &context_attributes) }
            .context("failed to create an OpenGL 3.3 core context")?;

        let surface_attributes = window
            .build_surface_attributes(Default::default())
            .map_err(|err| anyhow!("failed to describe window surface: {err}"))?;
        let surface = unsafe { gl_display.create_window_surface(&gl_config, &surface_attributes) }
            .context("failed to create window surface")?;
        let gl_context = not_current
            .make_current(&surface)
            .context("failed to make the GL context current")?;

        if settings.vsync {
            if let Err(err) =
                surface.set_swap_interval(&gl_context, SwapInterval::Wait(NonZeroU32::MIN))
            {
                tracing::warn!(error = %err, "vsync unavailable");
            }
        }

        let gl = unsafe {
            glow::Context::from_loader_function_cstr(|symbol| gl_display.get_proc_address(symbol))
        };
        // SAFETY: `gl_context` was made current on this thread above and is
        // owned by this state, which drops the driver before the context.
        let driver = unsafe { GlowDriver::new(gl) };
        let ctx = GlContext::with_options(driver, settings.pipeline);

        let program = ctx
            .build_program(&settings.vertex, &settings.fragment)
            .with_context(|| format!("failed to build shaders for lesson {}", settings.lesson))?;

        let gl = ctx.driver().gl();
        let mut meshes = Vec::new();
        for mesh in settings.lesson.meshes() {
            match unsafe { GpuMesh::upload(gl, &mesh) } {
                Ok(uploaded) => meshes.push(uploaded),
                Err(err) => {
                    for uploaded in meshes {
                        unsafe { uploaded.destroy(gl) };
                    }
                    return Err(err);
                }
            }
        }

        let size = window.inner_size();
        unsafe {
            gl.viewport(0, 0, size.width as i32, size.height as i32);
            if settings.wireframe {
                gl.polygon_mode(glow::FRONT_AND_BACK, glow::LINE);
            }
        }

        Ok(Self {
            program,
            meshes,
            ctx,
            surface,
            gl_context,
            window,
        })
    }

    fn resize(&self, size: PhysicalSize<u32>) {
        let (Some(width), Some(height)) = (NonZeroU32::new(size.width), NonZeroU32::new(size.height))
        else {
            return;
        };
        self.surface.resize(&self.gl_context, width, height);
        unsafe {
            self.ctx
                .driver()
                .gl()
                .viewport(0, 0, size.width as i32, size.height as i32);
        }
    }

    fn render(&self, settings: &RunSettings, elapsed: Duration) -> Result<()> {
        let gl = self.ctx.driver().gl();
        let [r, g, b, a] = settings.clear_color;
        unsafe {
            gl.clear_color(r, g, b, a);
            gl.clear(glow::COLOR_BUFFER_BIT);
        }

        self.program.activate();
        settings
            .lesson
            .update_uniforms(&self.program, elapsed.as_secs_f32());
        for mesh in &self.meshes {
            unsafe { mesh.draw(gl) };
        }

        self.surface
            .swap_buffers(&self.gl_context)
            .context("failed to swap buffers")
    }
}

impl Drop for RenderState {
    fn drop(&mut self) {
        let gl = self.ctx.driver().gl();
        for mesh in self.meshes.drain(..) {
            unsafe { mesh.destroy(gl) };
        }
    }
}
