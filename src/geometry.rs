//! Draw Geometry
//!
//! [`Geometry`] and [`IndexedGeometry`] are non-owning bundles of buffer
//! references plus the count used verbatim by the draw call. Both validate
//! the count against the referenced buffers at construction.
//!
//! Index data is always 16-bit. [`indices_u16`] converts wider index lists
//! and rejects values that do not fit instead of truncating them.

use crate::backend::{Backend, WgpuBackend};
use crate::buffer::Buffer;
use crate::errors::{EmberError, Result};
use crate::pipeline::VertexBufferLayout;

/// Index format used by every indexed draw.
pub const INDEX_FORMAT: wgpu::IndexFormat = wgpu::IndexFormat::Uint16;

/// A vertex buffer reference and the layout it is read with.
pub struct VertexBuffer<'a, B: Backend = WgpuBackend> {
    pub buffer: &'a Buffer<B>,
    pub layout: VertexBufferLayout,
}

impl<'a, B: Backend> VertexBuffer<'a, B> {
    pub fn new(buffer: &'a Buffer<B>, layout: VertexBufferLayout) -> Self {
        Self { buffer, layout }
    }

    /// Elements covered by the bytes written to the buffer. The zero padding
    /// past the requested size does not count.
    fn capacity(&self) -> u64 {
        let written = self.buffer.requested_size();
        let span = self.layout.element_span();
        if written < span {
            0
        } else if self.layout.array_stride == 0 {
            u64::MAX
        } else {
            (written - span) / self.layout.array_stride + 1
        }
    }
}

fn check_vertex_buffers<B: Backend>(buffers: &[VertexBuffer<'_, B>], count: u32) -> Result<()> {
    for (slot, vb) in buffers.iter().enumerate() {
        if vb.layout.step_mode == wgpu::VertexStepMode::Vertex && u64::from(count) > vb.capacity() {
            return Err(EmberError::InvalidGeometry(format!(
                "vertex buffer {slot} ({:?}) holds {} vertices, {count} requested",
                vb.buffer.label(),
                vb.capacity()
            )));
        }
    }
    Ok(())
}

/// Non-indexed draw input.
pub struct Geometry<'a, B: Backend = WgpuBackend> {
    pub primitive: wgpu::PrimitiveState,
    pub vertex_buffers: Vec<VertexBuffer<'a, B>>,
    /// Vertices per instance.
    pub count: u32,
}

impl<'a, B: Backend> Geometry<'a, B> {
    /// # Errors
    ///
    /// [`EmberError::InvalidGeometry`] if a per-vertex buffer is too small
    /// for `count` vertices.
    pub fn new(
        primitive: wgpu::PrimitiveState,
        vertex_buffers: Vec<VertexBuffer<'a, B>>,
        count: u32,
    ) -> Result<Self> {
        check_vertex_buffers(&vertex_buffers, count)?;
        Ok(Self {
            primitive,
            vertex_buffers,
            count,
        })
    }
}

/// Indexed draw input.
pub struct IndexedGeometry<'a, B: Backend = WgpuBackend> {
    pub primitive: wgpu::PrimitiveState,
    pub vertex_buffers: Vec<VertexBuffer<'a, B>>,
    pub index_buffer: &'a Buffer<B>,
    /// Indices per instance.
    pub count: u32,
}

impl<'a, B: Backend> IndexedGeometry<'a, B> {
    /// # Errors
    ///
    /// [`EmberError::InvalidGeometry`] if fewer than `count` 16-bit indices
    /// were written to the index buffer.
    pub fn new(
        primitive: wgpu::PrimitiveState,
        vertex_buffers: Vec<VertexBuffer<'a, B>>,
        index_buffer: &'a Buffer<B>,
        count: u32,
    ) -> Result<Self> {
        let needed = u64::from(count) * std::mem::size_of::<u16>() as u64;
        if needed > index_buffer.requested_size() {
            return Err(EmberError::InvalidGeometry(format!(
                "{count} indices need {needed} bytes, index buffer {:?} holds {}",
                index_buffer.label(),
                index_buffer.requested_size()
            )));
        }
        Ok(Self {
            primitive,
            vertex_buffers,
            index_buffer,
            count,
        })
    }
}

/// Narrows indices to 16 bits.
///
/// # Errors
///
/// [`EmberError::IndexOutOfRange`] for the first index ≥ 65536.
pub fn indices_u16(indices: &[u32]) -> Result<Vec<u16>> {
    indices
        .iter()
        .enumerate()
        .map(|(position, &index)| {
            u16::try_from(index).map_err(|_| EmberError::IndexOutOfRange { index, position })
        })
        .collect()
}
