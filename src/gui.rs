//! GUI Overlay
//!
//! [`GuiOverlay`] runs an [egui](https://github.com/emilk/egui) frame on top of
//! the scene. It shares the context's device and queue and records its draws
//! as a load-op render pass into the same frame's command stream, through the
//! crate's own [`CommandEncoder`](crate::CommandEncoder) and
//! [`RenderPass`](crate::RenderPass).
//!
//! # Per-Frame Usage
//!
//! ```text
//! handle_event(window, event)   // forward winit events, true = consumed
//! begin_frame(window)
//! … build UI via context() …
//! end_frame(window)             // tessellate, capture texture delta
//! render(ctx, view)             // upload + record, returns command buffers
//! ```

use winit::event::WindowEvent;
use winit::window::Window;

use crate::context::Context;
use crate::encoder::{ColorAttachment, RenderPassDescriptor};
use crate::errors::Result;

pub struct GuiOverlay {
    egui_ctx: egui::Context,
    state: egui_winit::State,
    renderer: egui_wgpu::Renderer,

    primitives: Vec<egui::ClippedPrimitive>,
    textures_delta: egui::TexturesDelta,
    screen: egui_wgpu::ScreenDescriptor,
}

impl GuiOverlay {
    /// Dark style, renderer targeting the surface format.
    pub fn new(ctx: &Context) -> Self {
        let window: &Window = ctx.window();
        let egui_ctx = egui::Context::default();
        egui_ctx.set_visuals(egui::Visuals::dark());

        let viewport = egui_ctx.viewport_id();
        let state = egui_winit::State::new(egui_ctx.clone(), viewport, window, None, None, None);
        let renderer = egui_wgpu::Renderer::new(
            ctx.device(),
            ctx.surface_format(),
            egui_wgpu::RendererOptions::default(),
        );

        let (width, height) = ctx.size();
        Self {
            egui_ctx,
            state,
            renderer,
            primitives: Vec::new(),
            textures_delta: egui::TexturesDelta::default(),
            screen: egui_wgpu::ScreenDescriptor {
                size_in_pixels: [width, height],
                pixels_per_point: window.scale_factor() as f32,
            },
        }
    }

    /// Forwards a window event. Returns `true` if egui consumed it.
    ///
    /// Mouse-button releases and resizes are never reported as consumed, so
    /// drags that started in the scene always see their end and the surface
    /// always follows the window.
    pub fn handle_event(&mut self, window: &Window, event: &WindowEvent) -> bool {
        let response = self.state.on_window_event(window, event);
        match event {
            WindowEvent::MouseInput {
                state: winit::event::ElementState::Released,
                ..
            } => false,
            WindowEvent::Resized(size) => {
                self.resize(size.width, size.height, window.scale_factor() as f32);
                false
            }
            _ => response.consumed,
        }
    }

    pub fn begin_frame(&mut self, window: &Window) {
        let raw_input = self.state.take_egui_input(window);
        self.egui_ctx.begin_pass(raw_input);
    }

    pub fn end_frame(&mut self, window: &Window) {
        let egui::FullOutput {
            shapes,
            textures_delta,
            platform_output,
            ..
        } = self.egui_ctx.end_pass();

        self.state.handle_platform_output(window, platform_output);
        self.textures_delta.append(textures_delta);
        self.primitives = self
            .egui_ctx
            .tessellate(shapes, self.egui_ctx.pixels_per_point());
    }

    #[inline]
    pub fn context(&self) -> &egui::Context {
        &self.egui_ctx
    }

    pub fn resize(&mut self, width: u32, height: u32, scale_factor: f32) {
        self.screen.size_in_pixels = [width, height];
        self.screen.pixels_per_point = scale_factor;
    }

    /// Uploads this frame's textures and geometry and records the overlay
    /// pass over `view`. Submit the returned buffers after the scene's.
    pub fn render(&mut self, ctx: &Context, view: &wgpu::TextureView) -> Result<Vec<wgpu::CommandBuffer>> {
        let device = ctx.device();
        let queue = ctx.queue();

        for (id, delta) in &self.textures_delta.set {
            self.renderer.update_texture(device, queue, *id, delta);
        }

        let mut encoder = ctx.create_command_encoder(Some("GUI Encoder"))?;
        let mut commands = self.renderer.update_buffers(
            device,
            queue,
            encoder.raw_mut(),
            &self.primitives,
            &self.screen,
        );

        let mut pass = encoder.render_pass(&RenderPassDescriptor::new(
            Some("GUI Pass"),
            vec![ColorAttachment::load(view)],
        ));
        self.renderer
            .render(pass.raw_mut(), &self.primitives, &self.screen);
        pass.end();
        commands.push(encoder.finish());

        for id in &self.textures_delta.free {
            self.renderer.free_texture(id);
        }
        self.textures_delta.set.clear();
        self.textures_delta.free.clear();

        Ok(commands)
    }
}
