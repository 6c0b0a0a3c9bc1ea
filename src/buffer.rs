//! GPU Buffers
//!
//! [`Buffer`] owns one device allocation. The realized size is the requested
//! size rounded up to [`wgpu::COPY_BUFFER_ALIGNMENT`]; it is the size used by
//! every write and by every bind group that references the buffer.
//!
//! Writes are checked before they reach the queue:
//!
//! - `offset` must be 4-byte aligned and inside the allocation,
//! - the source must cover at least `requested - offset` bytes and at most
//!   `size - offset` bytes.
//!
//! The queue always receives exactly `size - offset` bytes; an unaligned
//! source is zero-padded up to the realized size.
//!
//! ```rust,ignore
//! let vertices = Buffer::new(&ctx, &BufferDescriptor {
//!     label: Some("Triangle"),
//!     size: 12,
//!     usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
//! })?;
//! vertices.write(&ctx, &[0.0f32, 0.5, -0.5])?;
//! ```

use std::borrow::Cow;

use crate::backend::{Backend, WgpuBackend};
use crate::context::Context;
use crate::errors::{EmberError, Result};

/// Parameters for [`Buffer::new`].
#[derive(Debug, Clone, Copy)]
pub struct BufferDescriptor<'a> {
    pub label: Option<&'a str>,
    /// Requested size in bytes.
    pub size: u64,
    pub usage: wgpu::BufferUsages,
}

/// An owned GPU allocation.
pub struct Buffer<B: Backend = WgpuBackend> {
    raw: B::Buffer,
    label: Option<String>,
    requested: u64,
    size: u64,
    usage: wgpu::BufferUsages,
}

#[inline]
fn align_size(size: u64) -> u64 {
    wgpu::util::align_to(size, wgpu::COPY_BUFFER_ALIGNMENT)
}

impl<B: Backend> Buffer<B> {
    /// Allocates an uninitialized (zeroed) buffer.
    pub fn new(ctx: &Context<B>, desc: &BufferDescriptor<'_>) -> Result<Self> {
        let size = align_size(desc.size);
        let raw = ctx.create_buffer(&wgpu::BufferDescriptor {
            label: desc.label,
            size,
            usage: desc.usage,
            mapped_at_creation: false,
        })?;
        let size = ctx.backend().buffer_size(&raw).max(size);

        log::debug!(
            "Created buffer {:?}: {} bytes (requested {})",
            desc.label,
            size,
            desc.size
        );

        Ok(Self {
            raw,
            label: desc.label.map(str::to_owned),
            requested: desc.size,
            size,
            usage: desc.usage,
        })
    }

    /// Allocates a buffer mapped at creation and filled with `data`.
    pub fn new_init<T: bytemuck::Pod>(
        ctx: &Context<B>,
        label: Option<&str>,
        usage: wgpu::BufferUsages,
        data: &[T],
    ) -> Result<Self> {
        let bytes: &[u8] = bytemuck::cast_slice(data);
        let requested = bytes.len() as u64;
        let size = align_size(requested);
        let contents = pad_to(bytes, size);

        let raw = ctx.create_buffer_init(
            &wgpu::BufferDescriptor {
                label,
                size,
                usage,
                mapped_at_creation: true,
            },
            &contents,
        )?;

        log::debug!("Created buffer {label:?}: {size} bytes, initialized");

        Ok(Self {
            raw,
            label: label.map(str::to_owned),
            requested,
            size,
            usage,
        })
    }

    /// Vertex buffer filled with `data`, writable afterwards.
    pub fn vertex<T: bytemuck::Pod>(ctx: &Context<B>, label: Option<&str>, data: &[T]) -> Result<Self> {
        Self::new_init(
            ctx,
            label,
            wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            data,
        )
    }

    /// 16-bit index buffer filled with `indices`.
    pub fn index(ctx: &Context<B>, label: Option<&str>, indices: &[u16]) -> Result<Self> {
        Self::new_init(
            ctx,
            label,
            wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
            indices,
        )
    }

    /// Uniform buffer holding one `T`.
    pub fn uniform<T: bytemuck::Pod>(ctx: &Context<B>, label: Option<&str>, value: &T) -> Result<Self> {
        Self::new_init(
            ctx,
            label,
            wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            std::slice::from_ref(value),
        )
    }

    /// Writes `data` at offset 0. See [`write_at`](Self::write_at).
    pub fn write<T: bytemuck::Pod>(&self, ctx: &Context<B>, data: &[T]) -> Result<()> {
        self.write_at(ctx, 0, data)
    }

    /// Enqueues a copy of `size - offset` bytes into the buffer.
    ///
    /// # Errors
    ///
    /// [`EmberError::BufferWrite`] when `offset` is unaligned or outside the
    /// buffer, or when `data` is shorter than `requested - offset` or longer
    /// than `size - offset` bytes. Nothing is enqueued on error.
    pub fn write_at<T: bytemuck::Pod>(&self, ctx: &Context<B>, offset: u64, data: &[T]) -> Result<()> {
        let bytes: &[u8] = bytemuck::cast_slice(data);
        let len = bytes.len() as u64;
        let label = self.label.as_deref();

        if offset % wgpu::COPY_BUFFER_ALIGNMENT != 0 {
            return Err(EmberError::buffer_write(
                label,
                format!("offset {offset} is not 4-byte aligned"),
            ));
        }
        if offset >= self.size {
            return Err(EmberError::buffer_write(
                label,
                format!("offset {offset} is outside a {}-byte buffer", self.size),
            ));
        }

        let span = self.size - offset;
        let required = self.requested.saturating_sub(offset);
        if len < required {
            return Err(EmberError::buffer_write(
                label,
                format!("{len} source bytes, at least {required} required"),
            ));
        }
        if len > span {
            return Err(EmberError::buffer_write(
                label,
                format!("{len} source bytes overrun the {span} bytes past offset {offset}"),
            ));
        }

        ctx.write_buffer(&self.raw, offset, &pad_to(bytes, span));
        Ok(())
    }

    #[inline]
    pub fn raw(&self) -> &B::Buffer {
        &self.raw
    }

    /// Realized allocation size in bytes.
    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Size originally asked for.
    #[inline]
    pub fn requested_size(&self) -> u64 {
        self.requested
    }

    #[inline]
    pub fn usage(&self) -> wgpu::BufferUsages {
        self.usage
    }

    #[inline]
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
}

impl<B: Backend> std::fmt::Debug for Buffer<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Buffer")
            .field("label", &self.label)
            .field("size", &self.size)
            .field("requested", &self.requested)
            .field("usage", &self.usage)
            .finish_non_exhaustive()
    }
}

/// Borrows `bytes` when already `len` long, otherwise copies and zero-pads.
fn pad_to(bytes: &[u8], len: u64) -> Cow<'_, [u8]> {
    if bytes.len() as u64 == len {
        Cow::Borrowed(bytes)
    } else {
        let mut padded = bytes.to_vec();
        padded.resize(len as usize, 0);
        Cow::Owned(padded)
    }
}
