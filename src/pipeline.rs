//! Render Pipelines
//!
//! [`RenderPipeline`] turns a declarative [`RenderPipelineDescriptor`] into
//! one native pipeline and keeps the bind groups it was built with alive for
//! its own lifetime.
//!
//! # Construction
//!
//! 1. The WGSL source is compiled once; the same module feeds both stages.
//! 2. Each [`BindGroupDescriptor`] becomes one owned [`BindGroup`], in order.
//!    That order is the group index used by
//!    [`RenderPass::set_pipeline`](crate::RenderPass::set_pipeline).
//! 3. The pipeline layout is the ordered list of those bind-group layouts.
//! 4. Vertex buffer layouts, color targets and the optional depth-stencil
//!    state are assembled into scope-local descriptors.
//! 5. The pipeline is created; the shader module and pipeline layout are
//!    released when construction returns.
//!
//! Any failure releases everything created so far, most recent first.
//!
//! # Teardown
//!
//! The pipeline handle is released first, then the owned bind groups in
//! reverse construction order.

use crate::backend::{Backend, RawRenderPipelineDescriptor, WgpuBackend};
use crate::bind_group::{BindGroup, BindGroupDescriptor};
use crate::context::Context;
use crate::errors::Result;

/// Depth format used by the demos.
pub const DEFAULT_DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24Plus;

/// Depth test with writes, `Less` comparison, stencil disabled.
#[must_use]
pub fn default_depth_stencil(format: wgpu::TextureFormat) -> wgpu::DepthStencilState {
    wgpu::DepthStencilState {
        format,
        depth_write_enabled: Some(true),
        depth_compare: Some(wgpu::CompareFunction::Less),
        stencil: wgpu::StencilState {
            front: wgpu::StencilFaceState::IGNORE,
            back: wgpu::StencilFaceState::IGNORE,
            read_mask: 0,
            write_mask: 0,
        },
        bias: wgpu::DepthBiasState::default(),
    }
}

/// Owned description of one vertex buffer slot.
#[derive(Debug, Clone, PartialEq)]
pub struct VertexBufferLayout {
    pub array_stride: u64,
    pub step_mode: wgpu::VertexStepMode,
    pub attributes: Vec<wgpu::VertexAttribute>,
}

impl VertexBufferLayout {
    /// Per-vertex layout with tightly packed attributes in declaration order,
    /// at consecutive shader locations starting from `first_location`.
    #[must_use]
    pub fn packed(first_location: u32, formats: &[wgpu::VertexFormat]) -> Self {
        let mut offset = 0;
        let attributes = formats
            .iter()
            .zip(first_location..)
            .map(|(&format, shader_location)| {
                let attribute = wgpu::VertexAttribute {
                    format,
                    offset,
                    shader_location,
                };
                offset += format.size();
                attribute
            })
            .collect();
        Self {
            array_stride: offset,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes,
        }
    }

    /// Bytes one element actually reads: the end of the furthest attribute.
    #[must_use]
    pub fn element_span(&self) -> u64 {
        self.attributes
            .iter()
            .map(|a| a.offset + a.format.size())
            .max()
            .unwrap_or(0)
    }

    pub(crate) fn to_wgpu(&self) -> wgpu::VertexBufferLayout<'_> {
        wgpu::VertexBufferLayout {
            array_stride: self.array_stride,
            step_mode: self.step_mode,
            attributes: &self.attributes,
        }
    }
}

#[derive(Debug, Clone)]
pub struct VertexState<'a> {
    pub entry_point: &'a str,
    pub buffers: Vec<VertexBufferLayout>,
}

#[derive(Debug, Clone)]
pub struct FragmentState<'a> {
    pub entry_point: &'a str,
    pub targets: Vec<Option<wgpu::ColorTargetState>>,
}

impl FragmentState<'_> {
    /// One replace-blended target of `format`.
    #[must_use]
    pub fn single(entry_point: &str, format: wgpu::TextureFormat) -> FragmentState<'_> {
        FragmentState {
            entry_point,
            targets: vec![Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }
    }
}

/// Parameters for [`RenderPipeline::new`].
pub struct RenderPipelineDescriptor<'a, B: Backend = WgpuBackend> {
    pub label: Option<&'a str>,
    /// WGSL source holding both entry points.
    pub source: &'a str,
    /// One entry per bind group, in group-index order.
    pub bind_groups: Vec<BindGroupDescriptor<'a, B>>,
    pub vertex: VertexState<'a>,
    pub primitive: wgpu::PrimitiveState,
    pub fragment: FragmentState<'a>,
    pub multisample: wgpu::MultisampleState,
    /// Attached only when present; draws then need a depth attachment.
    pub depth_stencil: Option<wgpu::DepthStencilState>,
}

/// Bind groups owned by a pipeline, released last-created first.
struct BindGroupStack<B: Backend>(Vec<BindGroup<B>>);

impl<B: Backend> Drop for BindGroupStack<B> {
    fn drop(&mut self) {
        while let Some(group) = self.0.pop() {
            drop(group);
        }
    }
}

/// A pipeline plus the bind groups it binds on `set_pipeline`.
pub struct RenderPipeline<B: Backend = WgpuBackend> {
    raw: B::RenderPipeline,
    bind_groups: BindGroupStack<B>,
    vertex_buffer_count: usize,
    has_depth_stencil: bool,
    label: Option<String>,
}

impl<B: Backend> RenderPipeline<B> {
    pub fn new(ctx: &Context<B>, desc: &RenderPipelineDescriptor<'_, B>) -> Result<Self> {
        let label = desc.label;
        let module = ctx.create_shader_module(label, desc.source)?;

        let mut bind_groups = BindGroupStack(Vec::with_capacity(desc.bind_groups.len()));
        for group in &desc.bind_groups {
            bind_groups.0.push(BindGroup::new(ctx, group)?);
        }

        let layouts: Vec<&B::BindGroupLayout> = bind_groups.0.iter().map(BindGroup::layout).collect();
        let layout = ctx.create_pipeline_layout(label, &layouts)?;

        let vertex_buffers: Vec<wgpu::VertexBufferLayout<'_>> = desc
            .vertex
            .buffers
            .iter()
            .map(VertexBufferLayout::to_wgpu)
            .collect();

        let raw = ctx.create_render_pipeline(&RawRenderPipelineDescriptor {
            label,
            layout: &layout,
            module: &module,
            vertex_entry_point: desc.vertex.entry_point,
            vertex_buffers: &vertex_buffers,
            primitive: desc.primitive,
            fragment_entry_point: desc.fragment.entry_point,
            targets: &desc.fragment.targets,
            multisample: desc.multisample,
            depth_stencil: desc.depth_stencil.clone(),
        })?;

        log::debug!(
            "Created render pipeline {label:?}: {} bind groups, {} vertex buffers, depth {}",
            bind_groups.0.len(),
            vertex_buffers.len(),
            desc.depth_stencil.is_some()
        );

        drop(layouts);
        Ok(Self {
            raw,
            bind_groups,
            vertex_buffer_count: desc.vertex.buffers.len(),
            has_depth_stencil: desc.depth_stencil.is_some(),
            label: label.map(str::to_owned),
        })
    }

    #[inline]
    pub fn raw(&self) -> &B::RenderPipeline {
        &self.raw
    }

    /// Owned bind groups in group-index order.
    #[inline]
    pub fn bind_groups(&self) -> &[BindGroup<B>] {
        &self.bind_groups.0
    }

    /// Number of vertex buffer layouts the pipeline was built with.
    #[inline]
    pub fn vertex_buffer_count(&self) -> usize {
        self.vertex_buffer_count
    }

    #[inline]
    pub fn has_depth_stencil(&self) -> bool {
        self.has_depth_stencil
    }

    #[inline]
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
}
