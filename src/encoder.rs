//! Command Recording
//!
//! [`CommandEncoder`] and [`RenderPass`] encode their state machines in the
//! type system:
//!
//! ```text
//! CommandEncoder: Created ──render_pass()*──▶ finish(self) ──▶ CommandBuffer
//! RenderPass:     begin ──[set_pipeline | draw]*──▶ end(self)
//! ```
//!
//! - `finish` consumes the encoder, so finishing twice or beginning a pass on
//!   a finished encoder does not compile.
//! - A pass mutably borrows its encoder, so passes are sequential and never
//!   nested.
//! - `end` consumes the pass. A pass dropped without `end` is not ended
//!   implicitly: its handle is discarded and a warning is logged.
//!
//! Drawing before `set_pipeline`, or with a vertex-buffer count different
//! from the bound pipeline's, trips a `debug_assert!`.

use std::marker::PhantomData;
use std::ops::Range;

use crate::backend::{Backend, WgpuBackend};
use crate::context::Context;
use crate::errors::Result;
use crate::geometry::{Geometry, INDEX_FORMAT, IndexedGeometry, VertexBuffer};
use crate::pipeline::RenderPipeline;

// ============================================================================
// Attachments
// ============================================================================

/// A color target of a render pass. Always stored.
pub struct ColorAttachment<'a, B: Backend = WgpuBackend> {
    pub view: &'a B::TextureView,
    pub load: wgpu::LoadOp<wgpu::Color>,
}

impl<'a, B: Backend> ColorAttachment<'a, B> {
    pub fn clear(view: &'a B::TextureView, color: wgpu::Color) -> Self {
        Self {
            view,
            load: wgpu::LoadOp::Clear(color),
        }
    }

    /// Keeps the existing contents (overlay passes).
    pub fn load(view: &'a B::TextureView) -> Self {
        Self {
            view,
            load: wgpu::LoadOp::Load,
        }
    }
}

/// A depth target of a render pass. Always stored; stencil is unused.
pub struct DepthAttachment<'a, B: Backend = WgpuBackend> {
    pub view: &'a B::TextureView,
    pub load: wgpu::LoadOp<f32>,
}

impl<'a, B: Backend> DepthAttachment<'a, B> {
    pub fn clear(view: &'a B::TextureView, depth: f32) -> Self {
        Self {
            view,
            load: wgpu::LoadOp::Clear(depth),
        }
    }

    pub fn load(view: &'a B::TextureView) -> Self {
        Self {
            view,
            load: wgpu::LoadOp::Load,
        }
    }
}

pub struct RenderPassDescriptor<'a, B: Backend = WgpuBackend> {
    pub label: Option<&'a str>,
    pub color_attachments: Vec<ColorAttachment<'a, B>>,
    pub depth_stencil_attachment: Option<DepthAttachment<'a, B>>,
}

impl<'a, B: Backend> RenderPassDescriptor<'a, B> {
    pub fn new(label: Option<&'a str>, color_attachments: Vec<ColorAttachment<'a, B>>) -> Self {
        Self {
            label,
            color_attachments,
            depth_stencil_attachment: None,
        }
    }

    #[must_use]
    pub fn with_depth(mut self, depth: DepthAttachment<'a, B>) -> Self {
        self.depth_stencil_attachment = Some(depth);
        self
    }
}

// ============================================================================
// Command Encoder
// ============================================================================

/// One command recording session.
pub struct CommandEncoder<'c, B: Backend = WgpuBackend> {
    ctx: &'c Context<B>,
    raw: B::CommandEncoder,
}

impl<'c, B: Backend> CommandEncoder<'c, B> {
    pub fn new(ctx: &'c Context<B>, label: Option<&str>) -> Result<Self> {
        let raw = ctx.backend().create_command_encoder(label)?;
        Ok(Self { ctx, raw })
    }

    /// Begins a render pass. The encoder is borrowed until the pass is ended
    /// or dropped.
    pub fn render_pass(&mut self, desc: &RenderPassDescriptor<'_, B>) -> RenderPass<'_, B> {
        let backend = self.ctx.backend();
        let raw = backend.begin_render_pass(&mut self.raw, desc);
        RenderPass {
            backend,
            raw: Some(raw),
            label: desc.label.map(str::to_owned),
            bound_vertex_buffers: None,
            _encoder: PhantomData,
        }
    }

    /// Native encoder, for collaborators that record their own commands.
    #[inline]
    pub fn raw_mut(&mut self) -> &mut B::CommandEncoder {
        &mut self.raw
    }

    /// Finishes recording. The encoder cannot be used afterwards.
    #[must_use]
    pub fn finish(self) -> B::CommandBuffer {
        self.ctx.backend().finish(self.raw)
    }
}

// ============================================================================
// Render Pass
// ============================================================================

/// A render pass being recorded into a [`CommandEncoder`].
pub struct RenderPass<'e, B: Backend = WgpuBackend> {
    backend: &'e B,
    raw: Option<B::RenderPass>,
    label: Option<String>,
    /// Vertex-buffer count of the bound pipeline, once one is bound.
    bound_vertex_buffers: Option<usize>,
    _encoder: PhantomData<&'e mut B::CommandEncoder>,
}

impl<B: Backend> RenderPass<'_, B> {
    fn raw(&mut self) -> &mut B::RenderPass {
        match self.raw.as_mut() {
            Some(raw) => raw,
            None => unreachable!("render pass used after end"),
        }
    }

    /// Binds `pipeline`, then each of its bind groups at indices `0..n`.
    pub fn set_pipeline(&mut self, pipeline: &RenderPipeline<B>) {
        let backend = self.backend;
        let raw = self.raw();
        backend.set_pipeline(raw, pipeline.raw());
        for (index, group) in (0u32..).zip(pipeline.bind_groups()) {
            backend.set_bind_group(raw, index, group.raw());
        }
        self.bound_vertex_buffers = Some(pipeline.vertex_buffer_count());
    }

    fn bind_vertex_buffers(&mut self, buffers: &[VertexBuffer<'_, B>]) {
        debug_assert!(
            self.bound_vertex_buffers.is_some(),
            "draw on render pass {:?} before set_pipeline",
            self.label
        );
        debug_assert_eq!(
            self.bound_vertex_buffers,
            Some(buffers.len()),
            "vertex buffer count does not match the bound pipeline"
        );
        let backend = self.backend;
        let raw = self.raw();
        for (slot, vb) in (0u32..).zip(buffers) {
            backend.set_vertex_buffer(raw, slot, vb.buffer.raw());
        }
    }

    /// Draws `geometry.count` vertices, one instance.
    pub fn draw(&mut self, geometry: &Geometry<'_, B>) {
        self.draw_instanced(geometry, 0, 0..1);
    }

    /// Draws `geometry.count` vertices starting at `first_vertex`.
    pub fn draw_instanced(&mut self, geometry: &Geometry<'_, B>, first_vertex: u32, instances: Range<u32>) {
        self.bind_vertex_buffers(&geometry.vertex_buffers);
        let backend = self.backend;
        backend.draw(
            self.raw(),
            draw_range(first_vertex, geometry.count, "vertex"),
            instances,
        );
    }

    /// Draws `geometry.count` 16-bit indices, one instance.
    pub fn draw_indexed(&mut self, geometry: &IndexedGeometry<'_, B>) {
        self.draw_indexed_instanced(geometry, 0, 0, 0..1);
    }

    pub fn draw_indexed_instanced(
        &mut self,
        geometry: &IndexedGeometry<'_, B>,
        first_index: u32,
        base_vertex: i32,
        instances: Range<u32>,
    ) {
        self.bind_vertex_buffers(&geometry.vertex_buffers);
        let backend = self.backend;
        let raw = self.raw();
        backend.set_index_buffer(raw, geometry.index_buffer.raw(), INDEX_FORMAT);
        backend.draw_indexed(
            raw,
            draw_range(first_index, geometry.count, "index"),
            base_vertex,
            instances,
        );
    }

    /// Native pass, for collaborators that record their own draws.
    #[inline]
    pub fn raw_mut(&mut self) -> &mut B::RenderPass {
        self.raw()
    }

    /// Ends the pass.
    pub fn end(mut self) {
        if let Some(raw) = self.raw.take() {
            self.backend.end_render_pass(raw);
        }
    }
}

/// `first..first + count`, clamped at `u32::MAX` when the end overflows.
fn draw_range(first: u32, count: u32, what: &str) -> Range<u32> {
    let end = first.checked_add(count);
    debug_assert!(end.is_some(), "first {what} {first} + count {count} overflows u32");
    first..end.unwrap_or(u32::MAX)
}

impl<B: Backend> Drop for RenderPass<'_, B> {
    fn drop(&mut self) {
        if let Some(raw) = self.raw.take() {
            log::warn!(
                "Render pass {:?} dropped without end(); discarding",
                self.label
            );
            self.backend.discard_render_pass(raw);
        }
    }
}
