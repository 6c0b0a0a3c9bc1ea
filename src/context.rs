//! GPU Context
//!
//! [`Context`] is the process-wide GPU root: it owns one [`Backend`], which
//! for the production [`WgpuBackend`] means the window, surface, device and
//! queue. Every resource wrapper in the crate is created against a context
//! and every per-frame call (acquire, submit, present) goes through it.
//!
//! # Frame sequence
//!
//! ```rust,ignore
//! let view = ctx.surface_texture_view()?;
//! let mut encoder = ctx.create_command_encoder(Some("Frame"))?;
//! {
//!     let mut pass = encoder.render_pass(&RenderPassDescriptor::new(
//!         Some("Main"),
//!         vec![ColorAttachment::clear(&view, wgpu::Color::BLACK)],
//!     ));
//!     pass.set_pipeline(&pipeline);
//!     pass.draw(&geometry);
//!     pass.end();
//! }
//! ctx.submit([encoder.finish()]);
//! ctx.present()?;
//! ```

use std::sync::Arc;

use winit::event_loop::ActiveEventLoop;
use winit::window::Window;

use crate::backend::{Backend, RawBindGroupEntry, RawRenderPipelineDescriptor, WgpuBackend};
use crate::encoder::CommandEncoder;
use crate::errors::{EmberError, Result};
use crate::settings::ContextSettings;

/// Owner of the device/surface/queue triple.
pub struct Context<B: Backend = WgpuBackend> {
    backend: B,
}

impl Context<WgpuBackend> {
    /// Creates the window and negotiates the GPU stack for it.
    ///
    /// # Errors
    ///
    /// Window creation, adapter negotiation and device negotiation failures
    /// are fatal and returned as-is.
    pub fn new(event_loop: &ActiveEventLoop, settings: &ContextSettings) -> Result<Self> {
        log::info!("Initializing GPU context...");
        Ok(Self::from_backend(WgpuBackend::new(event_loop, settings)?))
    }

    #[inline]
    #[must_use]
    pub fn device(&self) -> &wgpu::Device {
        self.backend.device()
    }

    #[inline]
    #[must_use]
    pub fn queue(&self) -> &wgpu::Queue {
        self.backend.queue()
    }

    #[inline]
    #[must_use]
    pub fn window(&self) -> &Arc<Window> {
        self.backend.window()
    }
}

impl<B: Backend> Context<B> {
    /// Wraps an already constructed backend.
    pub fn from_backend(backend: B) -> Self {
        Self { backend }
    }

    #[inline]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    // ========================================================================
    // Creation pass-throughs
    // ========================================================================

    /// Creates a raw buffer. Prefer [`Buffer::new`](crate::Buffer::new).
    pub fn create_buffer(&self, desc: &wgpu::BufferDescriptor<'_>) -> Result<B::Buffer> {
        if desc.usage.is_empty() {
            return Err(EmberError::EmptyBufferUsage {
                label: desc.label.map(str::to_owned),
            });
        }
        self.backend.create_buffer(desc, None)
    }

    /// Creates a raw buffer filled with `contents` at creation.
    pub(crate) fn create_buffer_init(
        &self,
        desc: &wgpu::BufferDescriptor<'_>,
        contents: &[u8],
    ) -> Result<B::Buffer> {
        if desc.usage.is_empty() {
            return Err(EmberError::EmptyBufferUsage {
                label: desc.label.map(str::to_owned),
            });
        }
        self.backend.create_buffer(desc, Some(contents))
    }

    pub fn create_shader_module(&self, label: Option<&str>, source: &str) -> Result<B::ShaderModule> {
        self.backend.create_shader_module(label, source)
    }

    pub fn create_render_pipeline(
        &self,
        desc: &RawRenderPipelineDescriptor<'_, B>,
    ) -> Result<B::RenderPipeline> {
        self.backend.create_render_pipeline(desc)
    }

    pub fn create_pipeline_layout(
        &self,
        label: Option<&str>,
        bind_group_layouts: &[&B::BindGroupLayout],
    ) -> Result<B::PipelineLayout> {
        self.backend.create_pipeline_layout(label, bind_group_layouts)
    }

    pub fn create_bind_group(
        &self,
        label: Option<&str>,
        layout: &B::BindGroupLayout,
        entries: &[RawBindGroupEntry<'_, B>],
    ) -> Result<B::BindGroup> {
        self.backend.create_bind_group(label, layout, entries)
    }

    pub fn create_bind_group_layout(
        &self,
        label: Option<&str>,
        entries: &[wgpu::BindGroupLayoutEntry],
    ) -> Result<B::BindGroupLayout> {
        self.backend.create_bind_group_layout(label, entries)
    }

    /// Opens a new command recording session.
    pub fn create_command_encoder(&self, label: Option<&str>) -> Result<CommandEncoder<'_, B>> {
        CommandEncoder::new(self, label)
    }

    pub fn create_sampler(&self, desc: &wgpu::SamplerDescriptor<'_>) -> Result<B::Sampler> {
        self.backend.create_sampler(desc)
    }

    /// Creates a render-attachment texture of the given format and returns its view.
    pub fn create_depth_view(
        &self,
        label: Option<&str>,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
    ) -> Result<B::TextureView> {
        self.backend
            .create_depth_view(label, width.max(1), height.max(1), format)
    }

    // ========================================================================
    // Queue
    // ========================================================================

    /// Enqueues a host→device copy. Visible to every later submission on
    /// this context; never blocks.
    pub fn write_buffer(&self, buffer: &B::Buffer, offset: u64, data: &[u8]) {
        self.backend.write_buffer(buffer, offset, data);
    }

    /// Submits command buffers in order.
    pub fn submit(&self, commands: impl IntoIterator<Item = B::CommandBuffer>) {
        self.backend.submit(commands.into_iter().collect());
    }

    // ========================================================================
    // Surface
    // ========================================================================

    /// Acquires this frame's surface texture and returns a full-extent 2D view.
    ///
    /// # Errors
    ///
    /// [`EmberError::SurfaceTextureInUse`] if a texture is already held, i.e.
    /// the previous frame was never presented.
    pub fn surface_texture_view(&mut self) -> Result<B::TextureView> {
        if self.backend.has_surface_texture() {
            return Err(EmberError::SurfaceTextureInUse);
        }
        self.backend.acquire_surface_view()
    }

    /// Like [`surface_texture_view`](Self::surface_texture_view), but a
    /// transient surface error yields `Ok(None)` so the caller can skip the
    /// frame.
    pub fn try_surface_texture_view(&mut self) -> Result<Option<B::TextureView>> {
        match self.surface_texture_view() {
            Ok(view) => Ok(Some(view)),
            Err(e) if e.is_transient_surface_error() => {
                log::warn!("Skipping frame: {e}");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Presents and releases the held surface texture.
    ///
    /// # Errors
    ///
    /// [`EmberError::NoSurfaceTexture`] if nothing was acquired.
    pub fn present(&mut self) -> Result<()> {
        if !self.backend.has_surface_texture() {
            return Err(EmberError::NoSurfaceTexture);
        }
        self.backend.present()
    }

    /// Reconfigures the surface for a new backing size. Zero sizes
    /// (minimized windows) are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 || (width, height) == self.size() {
            return;
        }
        log::debug!("Resizing surface to {width}x{height}");
        self.backend.configure_surface(width, height);
    }

    /// Surface size in physical pixels.
    #[inline]
    pub fn size(&self) -> (u32, u32) {
        self.backend.surface_size()
    }

    /// Width over height of the surface.
    #[inline]
    pub fn aspect(&self) -> f32 {
        let (w, h) = self.size();
        w as f32 / h.max(1) as f32
    }

    #[inline]
    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.backend.surface_format()
    }
}
