//! Native API seam
//!
//! The wrappers in this crate never talk to `wgpu` directly. Every device,
//! queue, surface and pass call goes through the [`Backend`] trait, whose
//! associated types are the owned native handles. Releasing a handle is
//! dropping it.
//!
//! - [`WgpuBackend`]: the production backend (window + surface + device + queue).
//! - [`RecordingBackend`]: a GPU-less double that counts handle creation and
//!   release and records every queue/pass call, used by the test-suite.
//!
//! Descriptor value types (`wgpu::PrimitiveState`, `wgpu::VertexFormat`,
//! `wgpu::ShaderStages`, ...) are shared by both backends; only handles differ.

pub mod recording;
pub mod wgpu;

use std::ops::Range;

use crate::encoder::RenderPassDescriptor;
use crate::errors::Result;

pub use self::recording::RecordingBackend;
pub use self::wgpu::WgpuBackend;

/// One resolved resource of a bind group, as handed to the backend.
pub enum RawBindingResource<'a, B: Backend> {
    /// A buffer range. `size` is always explicit.
    Buffer {
        buffer: &'a B::Buffer,
        offset: u64,
        size: u64,
    },
    TextureView(&'a B::TextureView),
    Sampler(&'a B::Sampler),
}

/// One resolved bind group entry.
pub struct RawBindGroupEntry<'a, B: Backend> {
    pub binding: u32,
    pub resource: RawBindingResource<'a, B>,
}

/// Fully assembled pipeline description, valid only for the duration of the
/// creation call.
pub struct RawRenderPipelineDescriptor<'a, B: Backend> {
    pub label: Option<&'a str>,
    pub layout: &'a B::PipelineLayout,
    /// Single-source convention: one module for both stages.
    pub module: &'a B::ShaderModule,
    pub vertex_entry_point: &'a str,
    pub vertex_buffers: &'a [::wgpu::VertexBufferLayout<'a>],
    pub primitive: ::wgpu::PrimitiveState,
    pub fragment_entry_point: &'a str,
    pub targets: &'a [Option<::wgpu::ColorTargetState>],
    pub multisample: ::wgpu::MultisampleState,
    pub depth_stencil: Option<::wgpu::DepthStencilState>,
}

/// The native graphics API as consumed by the wrappers.
///
/// All methods are called from the render thread only. Creation calls return
/// owned handles; a failed creation returns an error and leaves nothing behind.
pub trait Backend: Sized + 'static {
    type Buffer;
    type Sampler;
    type TextureView;
    type ShaderModule;
    type BindGroupLayout;
    type BindGroup;
    type PipelineLayout;
    type RenderPipeline;
    type CommandEncoder;
    type RenderPass;
    type CommandBuffer;

    // ---- surface -----------------------------------------------------------

    /// Negotiated surface format.
    fn surface_format(&self) -> ::wgpu::TextureFormat;

    /// Current surface size in physical pixels.
    fn surface_size(&self) -> (u32, u32);

    /// Reconfigures the surface for a new backing size.
    fn configure_surface(&mut self, width: u32, height: u32);

    /// Acquires the next presentable texture and returns a full-extent 2D view
    /// of it. The texture itself stays held by the backend until [`present`](Self::present).
    fn acquire_surface_view(&mut self) -> Result<Self::TextureView>;

    /// Whether a surface texture is currently held.
    fn has_surface_texture(&self) -> bool;

    /// Presents and releases the held surface texture.
    fn present(&mut self) -> Result<()>;

    // ---- resources ---------------------------------------------------------

    /// Creates a buffer. When `contents` is given the buffer is filled at
    /// creation; `contents.len()` must equal `desc.size`.
    fn create_buffer(
        &self,
        desc: &::wgpu::BufferDescriptor<'_>,
        contents: Option<&[u8]>,
    ) -> Result<Self::Buffer>;

    /// Realized allocation size of `buffer`.
    fn buffer_size(&self, buffer: &Self::Buffer) -> u64;

    /// Enqueues a host→device copy on the queue.
    fn write_buffer(&self, buffer: &Self::Buffer, offset: u64, data: &[u8]);

    fn create_sampler(&self, desc: &::wgpu::SamplerDescriptor<'_>) -> Result<Self::Sampler>;

    /// Creates a single-sample 2D render-attachment texture and returns its view.
    fn create_depth_view(
        &self,
        label: Option<&str>,
        width: u32,
        height: u32,
        format: ::wgpu::TextureFormat,
    ) -> Result<Self::TextureView>;

    /// Compiles WGSL source.
    fn create_shader_module(&self, label: Option<&str>, source: &str)
    -> Result<Self::ShaderModule>;

    fn create_bind_group_layout(
        &self,
        label: Option<&str>,
        entries: &[::wgpu::BindGroupLayoutEntry],
    ) -> Result<Self::BindGroupLayout>;

    fn create_bind_group(
        &self,
        label: Option<&str>,
        layout: &Self::BindGroupLayout,
        entries: &[RawBindGroupEntry<'_, Self>],
    ) -> Result<Self::BindGroup>;

    fn create_pipeline_layout(
        &self,
        label: Option<&str>,
        bind_group_layouts: &[&Self::BindGroupLayout],
    ) -> Result<Self::PipelineLayout>;

    fn create_render_pipeline(
        &self,
        desc: &RawRenderPipelineDescriptor<'_, Self>,
    ) -> Result<Self::RenderPipeline>;

    // ---- commands ----------------------------------------------------------

    fn create_command_encoder(&self, label: Option<&str>) -> Result<Self::CommandEncoder>;

    fn begin_render_pass(
        &self,
        encoder: &mut Self::CommandEncoder,
        desc: &RenderPassDescriptor<'_, Self>,
    ) -> Self::RenderPass;

    fn set_pipeline(&self, pass: &mut Self::RenderPass, pipeline: &Self::RenderPipeline);

    fn set_bind_group(&self, pass: &mut Self::RenderPass, index: u32, group: &Self::BindGroup);

    /// Binds the full range of `buffer` at `slot`.
    fn set_vertex_buffer(&self, pass: &mut Self::RenderPass, slot: u32, buffer: &Self::Buffer);

    /// Binds the full range of `buffer` as the index buffer.
    fn set_index_buffer(
        &self,
        pass: &mut Self::RenderPass,
        buffer: &Self::Buffer,
        format: ::wgpu::IndexFormat,
    );

    fn draw(&self, pass: &mut Self::RenderPass, vertices: Range<u32>, instances: Range<u32>);

    fn draw_indexed(
        &self,
        pass: &mut Self::RenderPass,
        indices: Range<u32>,
        base_vertex: i32,
        instances: Range<u32>,
    );

    /// Ends the pass and releases its handle.
    fn end_render_pass(&self, pass: Self::RenderPass);

    /// Releases a pass handle that was never ended.
    fn discard_render_pass(&self, pass: Self::RenderPass);

    fn finish(&self, encoder: Self::CommandEncoder) -> Self::CommandBuffer;

    /// Submits command buffers in order and releases them.
    fn submit(&self, commands: Vec<Self::CommandBuffer>);
}
