//! Winit Application Framework
//!
//! Drives one window, one [`Context`] and (with the `gui` feature) one
//! [`GuiOverlay`](crate::gui::GuiOverlay) from a winit event loop.
//!
//! # Overview
//!
//! - [`App`]: builder holding the [`ContextSettings`]
//! - [`AppHandler`]: the trait a demo implements
//! - `AppRunner`: internal `ApplicationHandler`
//!
//! Window events go to the GUI first; events it does not consume are passed
//! to the handler. Close requests exit the loop, resizes reconfigure the
//! surface, and redraws run one frame:
//!
//! ```text
//! gui.begin_frame → handler.ui → gui.end_frame
//! ctx.surface_texture_view → handler.render → gui.render
//! ctx.submit(scene, gui) → ctx.present
//! ```
//!
//! The first error returned by `init` or `render` stops the loop and is
//! returned from [`App::run`].
//!
//! # Example
//!
//! ```rust,ignore
//! struct Demo { /* pipelines, buffers */ }
//!
//! impl AppHandler for Demo {
//!     fn init(ctx: &Context) -> Result<Self> { /* ... */ }
//!
//!     fn render(&mut self, ctx: &Context, view: &wgpu::TextureView) -> Result<wgpu::CommandBuffer> {
//!         /* ... */
//!     }
//! }
//!
//! fn main() -> ember::errors::Result<()> {
//!     ember::logging::init();
//!     App::new().with_title("Demo").run::<Demo>()
//! }
//! ```

use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::WindowId;

use crate::context::Context;
use crate::errors::{EmberError, Result};
use crate::settings::ContextSettings;

#[cfg(feature = "gui")]
use crate::gui::GuiOverlay;

/// Application behavior.
pub trait AppHandler: Sized + 'static {
    /// Called once after the context is created.
    fn init(ctx: &Context) -> Result<Self>;

    /// Handles a window event the GUI did not consume. Return `true` to
    /// consume it: a consumed close request does not exit and a consumed
    /// redraw renders nothing. The surface is resized either way.
    #[allow(unused_variables)]
    fn on_event(&mut self, ctx: &Context, event: &WindowEvent) -> bool {
        false
    }

    /// Builds this frame's GUI.
    #[cfg(feature = "gui")]
    #[allow(unused_variables)]
    fn ui(&mut self, ctx: &Context, gui: &egui::Context) {}

    /// Records the scene into `view`.
    fn render(&mut self, ctx: &Context, view: &wgpu::TextureView) -> Result<wgpu::CommandBuffer>;
}

/// Application builder.
pub struct App {
    settings: ContextSettings,
}

impl App {
    #[must_use]
    pub fn new() -> Self {
        Self {
            settings: ContextSettings::default(),
        }
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.settings.title = title.into();
        self
    }

    #[must_use]
    pub fn with_settings(mut self, settings: ContextSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Runs the event loop until the window closes or a frame fails.
    ///
    /// # Errors
    ///
    /// Event loop creation failures (including a second event loop in the
    /// same process), and the first error from `init` or `render`.
    pub fn run<H: AppHandler>(self) -> Result<()> {
        let event_loop = EventLoop::new()?;
        event_loop.set_control_flow(ControlFlow::Poll);

        let mut runner = AppRunner::<H>::new(self.settings);
        event_loop.run_app(&mut runner)?;

        match runner.error.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

struct AppRunner<H: AppHandler> {
    settings: ContextSettings,
    // Dropped in this order: handler resources, GUI, then the context.
    handler: Option<H>,
    #[cfg(feature = "gui")]
    gui: Option<GuiOverlay>,
    ctx: Option<Context>,
    error: Option<EmberError>,
}

impl<H: AppHandler> AppRunner<H> {
    fn new(settings: ContextSettings) -> Self {
        Self {
            settings,
            handler: None,
            #[cfg(feature = "gui")]
            gui: None,
            ctx: None,
            error: None,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: EmberError) {
        log::error!("Fatal error: {error}");
        if self.error.is_none() {
            self.error = Some(error);
        }
        event_loop.exit();
    }

    fn initialize(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let ctx = Context::new(event_loop, &self.settings)?;
        #[cfg(feature = "gui")]
        {
            self.gui = Some(GuiOverlay::new(&ctx));
        }
        self.handler = Some(H::init(&ctx)?);
        self.ctx = Some(ctx);
        Ok(())
    }

    fn render_frame(&mut self) -> Result<()> {
        let (Some(ctx), Some(handler)) = (&mut self.ctx, &mut self.handler) else {
            return Ok(());
        };

        let size = ctx.window().inner_size();
        if size.width == 0 || size.height == 0 {
            return Ok(());
        }
        let Some(view) = ctx.try_surface_texture_view()? else {
            return Ok(());
        };

        #[cfg(feature = "gui")]
        if let Some(gui) = &mut self.gui {
            let window = ctx.window().clone();
            gui.begin_frame(&window);
            handler.ui(ctx, gui.context());
            gui.end_frame(&window);
        }

        let mut commands = vec![handler.render(ctx, &view)?];

        #[cfg(feature = "gui")]
        if let Some(gui) = &mut self.gui {
            commands.extend(gui.render(ctx, &view)?);
        }

        ctx.submit(commands);
        drop(view);
        ctx.present()
    }
}

impl<H: AppHandler> ApplicationHandler for AppRunner<H> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.ctx.is_some() || self.error.is_some() {
            return;
        }
        if let Err(e) = self.initialize(event_loop) {
            self.fail(event_loop, e);
            return;
        }
        log::info!("Initialization complete");
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        let (Some(ctx), Some(handler)) = (&mut self.ctx, &mut self.handler) else {
            return;
        };

        #[cfg(feature = "gui")]
        if let Some(gui) = &mut self.gui
            && gui.handle_event(ctx.window(), &event)
        {
            return;
        }

        if let WindowEvent::Resized(size) = event {
            ctx.resize(size.width, size.height);
        }

        if handler.on_event(ctx, &event) {
            return;
        }

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::RedrawRequested => {
                if let Err(e) = self.render_frame() {
                    self.fail(event_loop, e);
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(ctx) = &self.ctx {
            ctx.window().request_redraw();
        }
    }
}
