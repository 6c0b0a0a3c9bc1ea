//! Render Pipeline Tests
//!
//! Tests for:
//! - Ownership of one bind group per declared group
//! - `set_pipeline` binding groups at `0..n` before any draw
//! - Release order at teardown
//! - Cleanup when a creation step fails

use ember::backend::recording::{Command, Lifecycle, ResourceKind};
use ember::primitives::POSITION_COLOR;
use ember::{
    BindGroupDescriptor, BindGroupEntry, Buffer, ColorAttachment, Context, FragmentState, Geometry,
    RecordingBackend, RenderPassDescriptor, RenderPipeline, RenderPipelineDescriptor, VertexBuffer,
    VertexBufferLayout, VertexState,
};

type RB = RecordingBackend;

const SHADER: &str = r"
@group(0) @binding(0) var<uniform> camera: mat4x4f;
@group(1) @binding(0) var<uniform> model: mat4x4f;

@vertex fn vs(@location(0) position: vec3f, @location(1) color: vec3f) -> @builtin(position) vec4f {
    return camera * model * vec4f(position, 1.0);
}

@fragment fn fs() -> @location(0) vec4f {
    return vec4f(1.0);
}
";

fn context() -> Context<RB> {
    Context::from_backend(RecordingBackend::new(
        1280,
        720,
        wgpu::TextureFormat::Bgra8UnormSrgb,
    ))
}

fn mat4(ctx: &Context<RB>, label: &str) -> Buffer<RB> {
    Buffer::uniform(ctx, Some(label), &glam::Mat4::IDENTITY.to_cols_array()).unwrap()
}

fn descriptor<'a>(
    camera: &'a Buffer<RB>,
    model: &'a Buffer<RB>,
    format: wgpu::TextureFormat,
) -> RenderPipelineDescriptor<'a, RB> {
    RenderPipelineDescriptor {
        label: Some("Scene"),
        source: SHADER,
        bind_groups: vec![
            BindGroupDescriptor {
                label: Some("Camera"),
                entries: vec![BindGroupEntry::uniform(0, camera, wgpu::ShaderStages::VERTEX)],
            },
            BindGroupDescriptor {
                label: Some("Model"),
                entries: vec![BindGroupEntry::uniform(0, model, wgpu::ShaderStages::VERTEX)],
            },
        ],
        vertex: VertexState {
            entry_point: "vs",
            buffers: vec![VertexBufferLayout::packed(0, &POSITION_COLOR)],
        },
        primitive: wgpu::PrimitiveState::default(),
        fragment: FragmentState::single("fs", format),
        multisample: wgpu::MultisampleState::default(),
        depth_stencil: None,
    }
}

// ============================================================================
// Ownership
// ============================================================================

#[test]
fn pipeline_owns_one_bind_group_per_declaration() {
    let ctx = context();
    let (camera, model) = (mat4(&ctx, "camera"), mat4(&ctx, "model"));
    let pipeline = RenderPipeline::new(&ctx, &descriptor(&camera, &model, ctx.surface_format())).unwrap();

    assert_eq!(pipeline.bind_groups().len(), 2);
    assert_eq!(pipeline.bind_groups()[0].label(), Some("Camera"));
    assert_eq!(pipeline.bind_groups()[1].label(), Some("Model"));
    assert_eq!(pipeline.vertex_buffer_count(), 1);
    assert!(!pipeline.has_depth_stencil());
    assert_eq!(pipeline.raw().vertex_strides(), &[24]);

    // Shader module and pipeline layout do not outlive construction.
    assert_eq!(ctx.backend().live(ResourceKind::ShaderModule), 0);
    assert_eq!(ctx.backend().live(ResourceKind::PipelineLayout), 0);
    assert_eq!(ctx.backend().live(ResourceKind::BindGroup), 2);
}

#[test]
fn pipeline_layout_follows_group_order() {
    let ctx = context();
    let probe = ctx.backend().probe();
    let (camera, model) = (mat4(&ctx, "camera"), mat4(&ctx, "model"));
    let pipeline = RenderPipeline::new(&ctx, &descriptor(&camera, &model, ctx.surface_format())).unwrap();

    let expected: Vec<u64> = pipeline.bind_groups().iter().map(|g| g.layout().id()).collect();
    let created_layouts: Vec<u64> = probe
        .lifecycle()
        .into_iter()
        .filter_map(|event| match event {
            Lifecycle::Created(ResourceKind::BindGroupLayout, id) => Some(id),
            _ => None,
        })
        .collect();
    assert_eq!(created_layouts, expected);
}

// ============================================================================
// Binding on set_pipeline
// ============================================================================

#[test]
fn groups_are_bound_in_order_before_the_draw() {
    let mut ctx = context();
    let view = ctx.surface_texture_view().unwrap();
    let (camera, model) = (mat4(&ctx, "camera"), mat4(&ctx, "model"));
    let pipeline = RenderPipeline::new(&ctx, &descriptor(&camera, &model, ctx.surface_format())).unwrap();
    let vertices = Buffer::vertex(&ctx, Some("gnomon"), &ember::primitives::gnomon(1.0)).unwrap();
    let geometry = Geometry::new(
        wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::LineList,
            ..Default::default()
        },
        vec![VertexBuffer::new(&vertices, VertexBufferLayout::packed(0, &POSITION_COLOR))],
        6,
    )
    .unwrap();

    let group_ids: Vec<u64> = pipeline.bind_groups().iter().map(|g| g.raw().id()).collect();
    ctx.backend().take_commands();

    let mut encoder = ctx.create_command_encoder(Some("Frame")).unwrap();
    let mut pass = encoder.render_pass(&RenderPassDescriptor::new(
        Some("Main"),
        vec![ColorAttachment::clear(&view, wgpu::Color::BLACK)],
    ));
    pass.set_pipeline(&pipeline);
    pass.draw(&geometry);
    pass.end();

    let commands = ctx.backend().take_commands();
    let tail: Vec<Command> = commands.into_iter().skip(1).collect();
    assert_eq!(
        tail,
        vec![
            Command::SetPipeline {
                pipeline: pipeline.raw().id()
            },
            Command::SetBindGroup {
                index: 0,
                group: group_ids[0]
            },
            Command::SetBindGroup {
                index: 1,
                group: group_ids[1]
            },
            Command::SetVertexBuffer {
                slot: 0,
                buffer: vertices.raw().id()
            },
            Command::Draw {
                vertices: 0..6,
                instances: 0..1
            },
            Command::EndRenderPass,
        ]
    );
}

#[test]
fn set_pipeline_twice_rebinds_the_same_state() {
    let ctx = context();
    let target = ctx
        .create_depth_view(None, 16, 16, wgpu::TextureFormat::Bgra8UnormSrgb)
        .unwrap();
    let (camera, model) = (mat4(&ctx, "camera"), mat4(&ctx, "model"));
    let pipeline = RenderPipeline::new(&ctx, &descriptor(&camera, &model, ctx.surface_format())).unwrap();

    let mut encoder = ctx.create_command_encoder(None).unwrap();
    let mut pass = encoder.render_pass(&RenderPassDescriptor::new(None, vec![ColorAttachment::load(&target)]));
    ctx.backend().take_commands();
    pass.set_pipeline(&pipeline);
    let first = ctx.backend().take_commands();
    pass.set_pipeline(&pipeline);
    let second = ctx.backend().take_commands();
    pass.end();

    assert_eq!(first.len(), 3);
    assert_eq!(first, second);
}

// ============================================================================
// Teardown
// ============================================================================

#[test]
fn pipeline_then_groups_in_reverse_are_released() {
    let ctx = context();
    let probe = ctx.backend().probe();
    let (camera, model) = (mat4(&ctx, "camera"), mat4(&ctx, "model"));
    let pipeline = RenderPipeline::new(&ctx, &descriptor(&camera, &model, ctx.surface_format())).unwrap();

    let pipeline_id = pipeline.raw().id();
    let group_ids: Vec<u64> = pipeline.bind_groups().iter().map(|g| g.raw().id()).collect();
    let layout_ids: Vec<u64> = pipeline.bind_groups().iter().map(|g| g.layout().id()).collect();
    let before = probe.lifecycle().len();
    drop(pipeline);

    let released: Vec<u64> = probe.lifecycle()[before..]
        .iter()
        .filter_map(|event| match *event {
            Lifecycle::Released(_, id) => Some(id),
            Lifecycle::Created(..) => None,
        })
        .collect();
    assert_eq!(
        released,
        vec![pipeline_id, group_ids[1], layout_ids[1], group_ids[0], layout_ids[0]]
    );
    assert_eq!(probe.release_order(ResourceKind::BindGroup).len(), 2);

    // Buffers are not owned by the pipeline.
    assert_eq!(probe.live(ResourceKind::Buffer), 2);
}

// ============================================================================
// Failure cleanup
// ============================================================================

#[test]
fn failed_pipeline_releases_everything_it_created() {
    for kind in [
        ResourceKind::ShaderModule,
        ResourceKind::BindGroupLayout,
        ResourceKind::BindGroup,
        ResourceKind::PipelineLayout,
        ResourceKind::RenderPipeline,
    ] {
        let ctx = context();
        let (camera, model) = (mat4(&ctx, "camera"), mat4(&ctx, "model"));
        ctx.backend().fail_next(kind);

        let result = RenderPipeline::new(&ctx, &descriptor(&camera, &model, ctx.surface_format()));
        assert!(result.is_err(), "{kind:?} failure was not reported");
        drop(result);
        assert_eq!(ctx.backend().live_total(), 2, "{kind:?} failure leaked handles");
    }
}

#[test]
fn empty_shader_is_rejected() {
    let ctx = context();
    let (camera, model) = (mat4(&ctx, "camera"), mat4(&ctx, "model"));
    let mut desc = descriptor(&camera, &model, ctx.surface_format());
    desc.source = "  ";
    assert!(RenderPipeline::new(&ctx, &desc).is_err());
    assert_eq!(ctx.backend().created(ResourceKind::BindGroup), 0);
}

#[test]
fn depth_state_is_carried_through() {
    let ctx = context();
    let (camera, model) = (mat4(&ctx, "camera"), mat4(&ctx, "model"));
    let mut desc = descriptor(&camera, &model, ctx.surface_format());
    desc.depth_stencil = Some(ember::pipeline::default_depth_stencil(
        ember::pipeline::DEFAULT_DEPTH_FORMAT,
    ));
    let pipeline = RenderPipeline::new(&ctx, &desc).unwrap();
    assert!(pipeline.has_depth_stencil());
    assert!(pipeline.raw().has_depth_stencil());
}
