//! Buffer Tests
//!
//! Tests for:
//! - Round-tripping vertex data through a 1280×720 context
//! - Queue writes always covering the realized (aligned) size
//! - Rejection of short, overlong and misaligned writes
//! - Initialized buffers padded to the copy alignment

use ember::backend::recording::{Command, ResourceKind};
use ember::{Buffer, BufferDescriptor, Context, EmberError, RecordingBackend};

fn context() -> Context<RecordingBackend> {
    Context::from_backend(RecordingBackend::new(
        1280,
        720,
        wgpu::TextureFormat::Bgra8UnormSrgb,
    ))
}

fn buffer(ctx: &Context<RecordingBackend>, size: u64) -> Buffer<RecordingBackend> {
    Buffer::new(
        ctx,
        &BufferDescriptor {
            label: Some("test"),
            size,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        },
    )
    .unwrap()
}

fn write_lengths(ctx: &Context<RecordingBackend>) -> Vec<u64> {
    ctx.backend()
        .take_commands()
        .into_iter()
        .filter_map(|c| match c {
            Command::WriteBuffer { len, .. } => Some(len),
            _ => None,
        })
        .collect()
}

// ============================================================================
// Round trip
// ============================================================================

#[test]
fn three_floats_read_back_byte_for_byte() {
    let ctx = context();
    assert_eq!(ctx.size(), (1280, 720));

    let vertices = buffer(&ctx, 12);
    let data = [0.0f32, 0.5, -0.5];
    vertices.write(&ctx, &data).unwrap();

    assert_eq!(vertices.size(), 12);
    assert_eq!(
        ctx.backend().buffer_contents(vertices.raw()),
        bytemuck::cast_slice::<f32, u8>(&data)
    );
}

#[test]
fn write_at_offset_keeps_the_prefix() {
    let ctx = context();
    let b = buffer(&ctx, 16);
    b.write(&ctx, &[1u32, 2, 3, 4]).unwrap();
    b.write_at(&ctx, 8, &[7u32, 8]).unwrap();
    assert_eq!(
        ctx.backend().buffer_contents(b.raw()),
        bytemuck::cast_slice::<u32, u8>(&[1, 2, 7, 8])
    );
}

// ============================================================================
// Realized size is authoritative
// ============================================================================

#[test]
fn every_write_covers_the_realized_size() {
    let ctx = context();
    for requested in 1..=33u64 {
        let b = buffer(&ctx, requested);
        assert_eq!(b.requested_size(), requested);
        assert_eq!(b.size() % wgpu::COPY_BUFFER_ALIGNMENT, 0);
        assert!(b.size() >= requested && b.size() < requested + 4);

        // Exactly the requested bytes, and the full realized span.
        let exact = vec![0xABu8; requested as usize];
        b.write(&ctx, &exact).unwrap();
        let full = vec![0xCDu8; b.size() as usize];
        b.write(&ctx, &full).unwrap();

        assert_eq!(write_lengths(&ctx), vec![b.size(), b.size()], "requested {requested}");
    }
}

#[test]
fn unaligned_source_is_zero_padded() {
    let ctx = context();
    let b = buffer(&ctx, 6);
    b.write(&ctx, &[1u8, 2, 3, 4, 5, 6]).unwrap();
    assert_eq!(ctx.backend().buffer_contents(b.raw()), vec![1, 2, 3, 4, 5, 6, 0, 0]);
}

// ============================================================================
// Checked writes
// ============================================================================

#[test]
fn short_source_is_rejected() {
    let ctx = context();
    let b = buffer(&ctx, 12);
    let err = b.write(&ctx, &[0.0f32, 1.0]).unwrap_err();
    assert!(matches!(err, EmberError::BufferWrite { .. }));
    assert!(write_lengths(&ctx).is_empty());
}

#[test]
fn overlong_source_is_rejected() {
    let ctx = context();
    let b = buffer(&ctx, 12);
    assert!(b.write(&ctx, &[0.0f32; 4]).is_err());
    assert!(b.write_at(&ctx, 8, &[0.0f32; 2]).is_err());
    assert!(write_lengths(&ctx).is_empty());
}

#[test]
fn offset_must_be_aligned_and_inside() {
    let ctx = context();
    let b = buffer(&ctx, 12);
    assert!(b.write_at(&ctx, 2, &[0u8; 8]).is_err());
    assert!(b.write_at(&ctx, 12, &[0u8; 0]).is_err());
    assert!(b.write_at(&ctx, 4, &[0u8; 8]).is_ok());
}

// ============================================================================
// Initialized buffers
// ============================================================================

#[test]
fn index_buffer_is_padded_to_alignment() {
    let ctx = context();
    let indices = Buffer::index(&ctx, Some("indices"), &[0u16, 1, 2]).unwrap();
    assert_eq!(indices.requested_size(), 6);
    assert_eq!(indices.size(), 8);
    assert!(indices.usage().contains(wgpu::BufferUsages::INDEX));
    assert_eq!(
        ctx.backend().buffer_contents(indices.raw()),
        vec![0, 0, 1, 0, 2, 0, 0, 0]
    );
}

#[test]
fn uniform_holds_one_value() {
    let ctx = context();
    let value = [1.0f32, 2.0, 3.0, 4.0];
    let uniform = Buffer::uniform(&ctx, Some("u"), &value).unwrap();
    assert_eq!(uniform.size(), 16);
    assert!(uniform.usage().contains(wgpu::BufferUsages::UNIFORM));
    assert_eq!(ctx.backend().created(ResourceKind::Buffer), 1);
}

#[test]
fn failed_allocation_leaves_nothing_behind() {
    let ctx = context();
    ctx.backend().fail_next(ResourceKind::Buffer);
    let result = Buffer::vertex(&ctx, Some("doomed"), &[0.0f32; 3]);
    assert!(matches!(result, Err(EmberError::Backend(_))));
    assert_eq!(ctx.backend().live_total(), 0);
}
