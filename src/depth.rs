//! Depth attachment sized to the surface.

use crate::backend::{Backend, WgpuBackend};
use crate::context::Context;
use crate::errors::Result;

/// Owns a depth view matching the context's surface size.
pub struct DepthTexture<B: Backend = WgpuBackend> {
    view: B::TextureView,
    format: wgpu::TextureFormat,
    size: (u32, u32),
}

impl<B: Backend> DepthTexture<B> {
    pub fn new(ctx: &Context<B>, format: wgpu::TextureFormat) -> Result<Self> {
        let size = ctx.size();
        let view = ctx.create_depth_view(Some("Depth Texture"), size.0, size.1, format)?;
        Ok(Self { view, format, size })
    }

    /// Recreates the view if the surface size changed.
    pub fn resize(&mut self, ctx: &Context<B>) -> Result<()> {
        let size = ctx.size();
        if size != self.size {
            self.view = ctx.create_depth_view(Some("Depth Texture"), size.0, size.1, self.format)?;
            self.size = size;
        }
        Ok(())
    }

    #[inline]
    pub fn view(&self) -> &B::TextureView {
        &self.view
    }

    #[inline]
    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }
}
