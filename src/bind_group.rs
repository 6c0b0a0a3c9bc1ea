//! Bind Groups
//!
//! A [`BindGroup`] is built from a declarative list of [`BindGroupEntry`]s.
//! Each entry names a slot, a visibility mask, the resource to bind and the
//! binding type; from that one list the wrapper derives both the layout and
//! the resource set, so the two can never disagree on entry count or slots.
//!
//! The size of a buffer binding is never taken from the caller: it is always
//! the referenced buffer's realized size minus the binding offset.
//!
//! A bind group borrows its buffers only for construction. The native bind
//! group keeps the allocation referenced, but callers must still keep each
//! [`Buffer`] alive while they intend to write to it.

use crate::backend::{Backend, RawBindGroupEntry, RawBindingResource, WgpuBackend};
use crate::buffer::Buffer;
use crate::context::Context;
use crate::errors::{EmberError, Result};

/// The resource bound at one slot.
pub enum BindingResource<'a, B: Backend = WgpuBackend> {
    /// A buffer from `offset` to its end.
    Buffer { buffer: &'a Buffer<B>, offset: u64 },
    TextureView(&'a B::TextureView),
    Sampler(&'a B::Sampler),
}

/// The layout half of one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingLayout {
    Buffer {
        ty: wgpu::BufferBindingType,
        has_dynamic_offset: bool,
        min_binding_size: Option<wgpu::BufferSize>,
    },
    Sampler(wgpu::SamplerBindingType),
    Texture {
        sample_type: wgpu::TextureSampleType,
        view_dimension: wgpu::TextureViewDimension,
        multisampled: bool,
    },
}

impl BindingLayout {
    /// A uniform buffer without dynamic offset or size constraint.
    pub const UNIFORM: Self = Self::Buffer {
        ty: wgpu::BufferBindingType::Uniform,
        has_dynamic_offset: false,
        min_binding_size: None,
    };

    fn to_wgpu(self) -> wgpu::BindingType {
        match self {
            Self::Buffer {
                ty,
                has_dynamic_offset,
                min_binding_size,
            } => wgpu::BindingType::Buffer {
                ty,
                has_dynamic_offset,
                min_binding_size,
            },
            Self::Sampler(ty) => wgpu::BindingType::Sampler(ty),
            Self::Texture {
                sample_type,
                view_dimension,
                multisampled,
            } => wgpu::BindingType::Texture {
                sample_type,
                view_dimension,
                multisampled,
            },
        }
    }

    fn kind(self) -> &'static str {
        match self {
            Self::Buffer { .. } => "buffer",
            Self::Sampler(_) => "sampler",
            Self::Texture { .. } => "texture",
        }
    }
}

/// One logical binding declaration.
pub struct BindGroupEntry<'a, B: Backend = WgpuBackend> {
    pub binding: u32,
    pub visibility: wgpu::ShaderStages,
    pub resource: BindingResource<'a, B>,
    pub layout: BindingLayout,
}

impl<'a, B: Backend> BindGroupEntry<'a, B> {
    /// Uniform buffer at `binding`, bound from offset 0, whose minimum
    /// binding size is the buffer's size.
    pub fn uniform(binding: u32, buffer: &'a Buffer<B>, visibility: wgpu::ShaderStages) -> Self {
        Self {
            binding,
            visibility,
            resource: BindingResource::Buffer { buffer, offset: 0 },
            layout: BindingLayout::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: wgpu::BufferSize::new(buffer.size()),
            },
        }
    }

    fn resource_kind(&self) -> &'static str {
        match self.resource {
            BindingResource::Buffer { .. } => "buffer",
            BindingResource::TextureView(_) => "texture",
            BindingResource::Sampler(_) => "sampler",
        }
    }
}

/// Parameters for [`BindGroup::new`].
pub struct BindGroupDescriptor<'a, B: Backend = WgpuBackend> {
    pub label: Option<&'a str>,
    pub entries: Vec<BindGroupEntry<'a, B>>,
}

/// Owned layout + resource set pair.
pub struct BindGroup<B: Backend = WgpuBackend> {
    // Released before the layout it was created from.
    raw: B::BindGroup,
    layout: B::BindGroupLayout,
    label: Option<String>,
}

impl<B: Backend> BindGroup<B> {
    /// Validates the declaration, then creates the layout and the resource set.
    ///
    /// # Errors
    ///
    /// [`EmberError::InvalidBinding`] for an empty visibility mask, a
    /// duplicate slot, a layout kind that does not match the resource, a
    /// buffer offset outside the buffer, or a minimum binding size larger than
    /// the bound range. Backend creation failures are passed through; a
    /// layout created before a failing resource set is released.
    pub fn new(ctx: &Context<B>, desc: &BindGroupDescriptor<'_, B>) -> Result<Self> {
        let label = desc.label;
        let mut seen = Vec::with_capacity(desc.entries.len());
        let mut layout_entries = Vec::with_capacity(desc.entries.len());
        let mut raw_entries = Vec::with_capacity(desc.entries.len());

        for entry in &desc.entries {
            if entry.visibility.is_empty() {
                return Err(EmberError::invalid_binding(label, entry.binding, "visibility is empty"));
            }
            if seen.contains(&entry.binding) {
                return Err(EmberError::invalid_binding(label, entry.binding, "slot declared twice"));
            }
            seen.push(entry.binding);

            if entry.layout.kind() != entry.resource_kind() {
                return Err(EmberError::invalid_binding(
                    label,
                    entry.binding,
                    format!(
                        "{} layout for a {} resource",
                        entry.layout.kind(),
                        entry.resource_kind()
                    ),
                ));
            }

            let resource = match entry.resource {
                BindingResource::Buffer { buffer, offset } => {
                    if offset >= buffer.size() {
                        return Err(EmberError::invalid_binding(
                            label,
                            entry.binding,
                            format!("offset {offset} outside a {}-byte buffer", buffer.size()),
                        ));
                    }
                    let size = buffer.size() - offset;
                    if let BindingLayout::Buffer {
                        min_binding_size: Some(min),
                        ..
                    } = entry.layout
                    {
                        if min.get() > size {
                            return Err(EmberError::invalid_binding(
                                label,
                                entry.binding,
                                format!("min binding size {} exceeds bound {size} bytes", min.get()),
                            ));
                        }
                    }
                    RawBindingResource::Buffer {
                        buffer: buffer.raw(),
                        offset,
                        size,
                    }
                }
                BindingResource::TextureView(view) => RawBindingResource::TextureView(view),
                BindingResource::Sampler(sampler) => RawBindingResource::Sampler(sampler),
            };

            layout_entries.push(wgpu::BindGroupLayoutEntry {
                binding: entry.binding,
                visibility: entry.visibility,
                ty: entry.layout.to_wgpu(),
                count: None,
            });
            raw_entries.push(RawBindGroupEntry {
                binding: entry.binding,
                resource,
            });
        }

        let layout = ctx.create_bind_group_layout(label, &layout_entries)?;
        let raw = ctx.create_bind_group(label, &layout, &raw_entries)?;

        log::debug!("Created bind group {label:?} with {} entries", raw_entries.len());

        Ok(Self {
            raw,
            layout,
            label: label.map(str::to_owned),
        })
    }

    #[inline]
    pub fn raw(&self) -> &B::BindGroup {
        &self.raw
    }

    #[inline]
    pub fn layout(&self) -> &B::BindGroupLayout {
        &self.layout
    }

    #[inline]
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
}
