//! Frame Tests
//!
//! Tests for:
//! - The empty clear-only frame (acquire, pass, finish, submit, present)
//! - Indexed draws with the fixed 16-bit index format
//! - Depth attachments and surface-sized depth textures
//! - Misuse caught in debug builds

use ember::backend::recording::{Command, ResourceKind};
use ember::geometry::INDEX_FORMAT;
use ember::pipeline::{DEFAULT_DEPTH_FORMAT, default_depth_stencil};
use ember::primitives::{self, POSITION_COLOR};
use ember::{
    BindGroupDescriptor, BindGroupEntry, Buffer, ColorAttachment, Context, DepthAttachment, DepthTexture,
    EmberError, FragmentState, IndexedGeometry, RecordingBackend, RenderPassDescriptor, RenderPipeline,
    RenderPipelineDescriptor, VertexBuffer, VertexBufferLayout, VertexState, indices_u16,
};

type RB = RecordingBackend;

fn context() -> Context<RB> {
    Context::from_backend(RecordingBackend::new(
        1280,
        720,
        wgpu::TextureFormat::Bgra8UnormSrgb,
    ))
}

fn mesh_pipeline(ctx: &Context<RB>, camera: &Buffer<RB>) -> RenderPipeline<RB> {
    RenderPipeline::new(
        ctx,
        &RenderPipelineDescriptor {
            label: Some("Mesh"),
            source: "@vertex fn vs() {} @fragment fn fs() {}",
            bind_groups: vec![BindGroupDescriptor {
                label: Some("Camera"),
                entries: vec![BindGroupEntry::uniform(0, camera, wgpu::ShaderStages::VERTEX)],
            }],
            vertex: VertexState {
                entry_point: "vs",
                buffers: vec![VertexBufferLayout::packed(0, &POSITION_COLOR)],
            },
            primitive: wgpu::PrimitiveState::default(),
            fragment: FragmentState::single("fs", ctx.surface_format()),
            multisample: wgpu::MultisampleState::default(),
            depth_stencil: Some(default_depth_stencil(DEFAULT_DEPTH_FORMAT)),
        },
    )
    .unwrap()
}

// ============================================================================
// Empty frame
// ============================================================================

#[test]
fn clear_only_frame_presents_cleanly() {
    let mut ctx = context();
    let probe = ctx.backend().probe();

    let view = ctx.surface_texture_view().unwrap();
    let mut encoder = ctx.create_command_encoder(Some("Frame")).unwrap();
    let pass = encoder.render_pass(&RenderPassDescriptor::new(
        Some("Clear"),
        vec![ColorAttachment::clear(&view, wgpu::Color::BLACK)],
    ));
    pass.end();
    let commands = encoder.finish();
    ctx.submit([commands]);
    drop(view);
    ctx.present().unwrap();

    let log = probe.commands();
    assert!(matches!(log[0], Command::AcquireSurfaceTexture { .. }));
    assert_eq!(
        log[1],
        Command::BeginRenderPass {
            encoder: match log[3] {
                Command::Finish { encoder } => encoder,
                ref other => panic!("expected finish, got {other:?}"),
            },
            label: Some("Clear".into()),
            color_loads: vec![wgpu::LoadOp::Clear(wgpu::Color::BLACK)],
            depth: false,
        }
    );
    assert_eq!(log[2], Command::EndRenderPass);
    assert!(matches!(log[4], Command::Submit { ref command_buffers } if command_buffers.len() == 1));
    assert!(matches!(log[5], Command::Present { .. }));
    assert_eq!(log.len(), 6);

    assert_eq!(probe.live(ResourceKind::SurfaceTexture), 0);
    assert_eq!(probe.live(ResourceKind::CommandBuffer), 0);
    assert_eq!(probe.live(ResourceKind::RenderPass), 0);
    assert_eq!(probe.live_total(), 0);
}

#[test]
fn consecutive_frames_reuse_nothing() {
    let mut ctx = context();
    for _ in 0..3 {
        let view = ctx.surface_texture_view().unwrap();
        let mut encoder = ctx.create_command_encoder(None).unwrap();
        encoder
            .render_pass(&RenderPassDescriptor::new(None, vec![ColorAttachment::clear(&view, wgpu::Color::BLACK)]))
            .end();
        ctx.submit([encoder.finish()]);
        drop(view);
        ctx.present().unwrap();
    }
    assert_eq!(ctx.backend().created(ResourceKind::SurfaceTexture), 3);
    assert_eq!(ctx.backend().live_total(), 0);
}

#[test]
fn skipped_present_blocks_the_next_acquire() {
    let mut ctx = context();
    let _view = ctx.surface_texture_view().unwrap();
    assert!(matches!(ctx.surface_texture_view(), Err(EmberError::SurfaceTextureInUse)));
}

// ============================================================================
// Indexed draws
// ============================================================================

#[test]
fn indexed_draw_submits_count_indices_as_uint16() {
    let ctx = context();
    let camera = Buffer::uniform(&ctx, Some("camera"), &[0.0f32; 32]).unwrap();
    let pipeline = mesh_pipeline(&ctx, &camera);
    let (vertices, indices) = primitives::cube(0.5);
    let vertex_buffer = Buffer::vertex(&ctx, Some("cube"), &vertices).unwrap();
    let index_buffer = Buffer::index(&ctx, Some("cube"), &indices).unwrap();
    let target = ctx
        .create_depth_view(None, 4, 4, wgpu::TextureFormat::Bgra8UnormSrgb)
        .unwrap();

    for count in [0u32, 3, 35, 36] {
        let geometry = IndexedGeometry::new(
            wgpu::PrimitiveState::default(),
            vec![VertexBuffer::new(&vertex_buffer, VertexBufferLayout::packed(0, &POSITION_COLOR))],
            &index_buffer,
            count,
        )
        .unwrap();

        let mut encoder = ctx.create_command_encoder(None).unwrap();
        let mut pass = encoder.render_pass(&RenderPassDescriptor::new(None, vec![ColorAttachment::load(&target)]));
        pass.set_pipeline(&pipeline);
        ctx.backend().take_commands();
        pass.draw_indexed(&geometry);
        pass.end();

        let commands = ctx.backend().take_commands();
        assert_eq!(
            commands[1],
            Command::SetIndexBuffer {
                buffer: index_buffer.raw().id(),
                format: wgpu::IndexFormat::Uint16,
            }
        );
        assert_eq!(
            commands[2],
            Command::DrawIndexed {
                indices: 0..count,
                base_vertex: 0,
                instances: 0..1,
            }
        );
    }
    assert_eq!(INDEX_FORMAT, wgpu::IndexFormat::Uint16);
}

#[test]
fn instanced_indexed_draw_offsets_the_range() {
    let ctx = context();
    let camera = Buffer::uniform(&ctx, None, &[0.0f32; 32]).unwrap();
    let pipeline = mesh_pipeline(&ctx, &camera);
    let (vertices, indices) = primitives::cube(1.0);
    let vertex_buffer = Buffer::vertex(&ctx, None, &vertices).unwrap();
    let index_buffer = Buffer::index(&ctx, None, &indices).unwrap();
    let geometry = IndexedGeometry::new(
        wgpu::PrimitiveState::default(),
        vec![VertexBuffer::new(&vertex_buffer, VertexBufferLayout::packed(0, &POSITION_COLOR))],
        &index_buffer,
        6,
    )
    .unwrap();
    let target = ctx.create_depth_view(None, 4, 4, ctx.surface_format()).unwrap();

    let mut encoder = ctx.create_command_encoder(None).unwrap();
    let mut pass = encoder.render_pass(&RenderPassDescriptor::new(None, vec![ColorAttachment::load(&target)]));
    pass.set_pipeline(&pipeline);
    pass.draw_indexed_instanced(&geometry, 12, 4, 2..5);
    pass.end();

    assert!(ctx.backend().commands().contains(&Command::DrawIndexed {
        indices: 12..18,
        base_vertex: 4,
        instances: 2..5,
    }));
}

#[test]
fn index_count_beyond_the_buffer_is_rejected() {
    let ctx = context();
    let (vertices, indices) = primitives::cube(1.0);
    let vertex_buffer = Buffer::vertex(&ctx, None, &vertices).unwrap();
    let index_buffer = Buffer::index(&ctx, None, &indices).unwrap();
    let result = IndexedGeometry::new(
        wgpu::PrimitiveState::default(),
        vec![VertexBuffer::new(&vertex_buffer, VertexBufferLayout::packed(0, &POSITION_COLOR))],
        &index_buffer,
        37,
    );
    assert!(matches!(result, Err(EmberError::InvalidGeometry(_))));
}

#[test]
fn wide_indices_are_rejected_not_truncated() {
    assert_eq!(indices_u16(&[0, 1, 65_535]).unwrap(), vec![0, 1, 65_535]);
    let err = indices_u16(&[0, 65_536, 2]).unwrap_err();
    assert!(matches!(
        err,
        EmberError::IndexOutOfRange {
            index: 65_536,
            position: 1
        }
    ));
}

// ============================================================================
// Depth
// ============================================================================

#[test]
fn depth_attachment_is_recorded() {
    let mut ctx = context();
    let depth = DepthTexture::new(&ctx, DEFAULT_DEPTH_FORMAT).unwrap();
    let view = ctx.surface_texture_view().unwrap();
    let mut encoder = ctx.create_command_encoder(None).unwrap();
    encoder
        .render_pass(
            &RenderPassDescriptor::new(None, vec![ColorAttachment::clear(&view, wgpu::Color::BLACK)])
                .with_depth(DepthAttachment::clear(depth.view(), 1.0)),
        )
        .end();
    drop(encoder);

    assert!(ctx.backend().commands().iter().any(|c| matches!(
        c,
        Command::BeginRenderPass { depth: true, .. }
    )));
}

#[test]
fn depth_texture_follows_surface_resizes() {
    let mut ctx = context();
    let mut depth = DepthTexture::new(&ctx, DEFAULT_DEPTH_FORMAT).unwrap();
    let first = depth.view().id();

    ctx.resize(800, 600);
    depth.resize(&ctx).unwrap();
    let second = depth.view().id();
    assert_ne!(first, second);

    depth.resize(&ctx).unwrap();
    assert_eq!(depth.view().id(), second);
    assert_eq!(ctx.backend().live(ResourceKind::TextureView), 1);
}

// ============================================================================
// Debug-only misuse checks
// ============================================================================

#[cfg(debug_assertions)]
#[test]
#[should_panic(expected = "before set_pipeline")]
fn draw_without_pipeline_panics_in_debug() {
    let ctx = context();
    let (vertices, indices) = primitives::cube(1.0);
    let vertex_buffer = Buffer::vertex(&ctx, None, &vertices).unwrap();
    let index_buffer = Buffer::index(&ctx, None, &indices).unwrap();
    let geometry = IndexedGeometry::new(
        wgpu::PrimitiveState::default(),
        vec![VertexBuffer::new(&vertex_buffer, VertexBufferLayout::packed(0, &POSITION_COLOR))],
        &index_buffer,
        36,
    )
    .unwrap();
    let target = ctx.create_depth_view(None, 4, 4, ctx.surface_format()).unwrap();

    let mut encoder = ctx.create_command_encoder(None).unwrap();
    let mut pass = encoder.render_pass(&RenderPassDescriptor::new(None, vec![ColorAttachment::load(&target)]));
    pass.draw_indexed(&geometry);
}

#[cfg(debug_assertions)]
#[test]
#[should_panic(expected = "vertex buffer count")]
fn vertex_buffer_count_mismatch_panics_in_debug() {
    let ctx = context();
    let camera = Buffer::uniform(&ctx, None, &[0.0f32; 32]).unwrap();
    let pipeline = mesh_pipeline(&ctx, &camera);
    let (_, indices) = primitives::cube(1.0);
    let index_buffer = Buffer::index(&ctx, None, &indices).unwrap();
    let geometry = IndexedGeometry::new(wgpu::PrimitiveState::default(), vec![], &index_buffer, 36).unwrap();
    let target = ctx.create_depth_view(None, 4, 4, ctx.surface_format()).unwrap();

    let mut encoder = ctx.create_command_encoder(None).unwrap();
    let mut pass = encoder.render_pass(&RenderPassDescriptor::new(None, vec![ColorAttachment::load(&target)]));
    pass.set_pipeline(&pipeline);
    pass.draw_indexed(&geometry);
}
