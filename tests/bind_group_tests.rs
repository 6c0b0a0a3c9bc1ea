//! Bind Group Tests
//!
//! Tests for:
//! - Resource-set sizes derived from realized buffer sizes
//! - Layout and resource set agreeing on slots
//! - Offsets shrinking the bound range
//! - Release of the layout with its group

use ember::backend::recording::{RecordedResource, ResourceKind};
use ember::{
    BindGroup, BindGroupDescriptor, BindGroupEntry, BindingLayout, BindingResource, Buffer,
    BufferDescriptor, Context, RecordingBackend,
};

type Ctx = Context<RecordingBackend>;

fn context() -> Ctx {
    Context::from_backend(RecordingBackend::new(
        1280,
        720,
        wgpu::TextureFormat::Bgra8UnormSrgb,
    ))
}

fn uniform(ctx: &Ctx, size: u64) -> Buffer<RecordingBackend> {
    Buffer::new(
        ctx,
        &BufferDescriptor {
            label: Some("uniform"),
            size,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        },
    )
    .unwrap()
}

fn bound_size(resource: RecordedResource) -> u64 {
    match resource {
        RecordedResource::Buffer { size, .. } => size,
        other => panic!("expected a buffer binding, got {other:?}"),
    }
}

#[test]
fn each_binding_size_is_its_buffers_realized_size() {
    let ctx = context();
    let buffers: Vec<_> = [1u64, 10, 16, 62, 128, 130]
        .into_iter()
        .map(|size| uniform(&ctx, size))
        .collect();

    let entries = (0u32..)
        .zip(&buffers)
        .map(|(slot, buffer)| BindGroupEntry::uniform(slot, buffer, wgpu::ShaderStages::VERTEX_FRAGMENT))
        .collect();
    let group = BindGroup::new(
        &ctx,
        &BindGroupDescriptor {
            label: Some("many"),
            entries,
        },
    )
    .unwrap();

    let bindings = group.raw().bindings();
    assert_eq!(bindings.len(), buffers.len());
    for ((slot, resource), buffer) in bindings.iter().zip(&buffers) {
        assert_eq!(bound_size(*resource), buffer.size(), "slot {slot}");
    }
}

#[test]
fn layout_slots_match_resource_slots() {
    let ctx = context();
    let camera = uniform(&ctx, 128);
    let model = uniform(&ctx, 64);
    let group = BindGroup::new(
        &ctx,
        &BindGroupDescriptor {
            label: Some("scene"),
            entries: vec![
                BindGroupEntry::uniform(0, &camera, wgpu::ShaderStages::VERTEX),
                BindGroupEntry::uniform(3, &model, wgpu::ShaderStages::VERTEX),
            ],
        },
    )
    .unwrap();

    let layout_slots: Vec<u32> = group.layout().entries().iter().map(|e| e.binding).collect();
    let group_slots: Vec<u32> = group.raw().bindings().iter().map(|(slot, _)| *slot).collect();
    assert_eq!(layout_slots, vec![0, 3]);
    assert_eq!(group_slots, layout_slots);
    assert_eq!(group.raw().layout_id(), group.layout().id());
    assert_eq!(group.label(), Some("scene"));

    // The layout carries the buffer's size as its minimum.
    let wgpu::BindingType::Buffer { min_binding_size, .. } = group.layout().entries()[0].ty else {
        panic!("camera binding is not a buffer");
    };
    assert_eq!(min_binding_size.map(|s| s.get()), Some(128));
}

#[test]
fn offset_binds_the_remainder() {
    let ctx = context();
    let buffer = uniform(&ctx, 512);
    let group = BindGroup::new(
        &ctx,
        &BindGroupDescriptor {
            label: None,
            entries: vec![BindGroupEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                resource: BindingResource::Buffer {
                    buffer: &buffer,
                    offset: 256,
                },
                layout: BindingLayout::UNIFORM,
            }],
        },
    )
    .unwrap();

    assert_eq!(
        group.raw().bindings()[0].1,
        RecordedResource::Buffer {
            buffer: buffer.raw().id(),
            offset: 256,
            size: 256,
        }
    );
}

#[test]
fn offset_past_the_end_is_rejected() {
    let ctx = context();
    let buffer = uniform(&ctx, 16);
    let result = BindGroup::new(
        &ctx,
        &BindGroupDescriptor {
            label: None,
            entries: vec![BindGroupEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                resource: BindingResource::Buffer {
                    buffer: &buffer,
                    offset: 16,
                },
                layout: BindingLayout::UNIFORM,
            }],
        },
    );
    assert!(result.is_err());
    assert_eq!(ctx.backend().created(ResourceKind::BindGroupLayout), 0);
}

#[test]
fn group_is_released_before_its_layout() {
    let ctx = context();
    let probe = ctx.backend().probe();
    let buffer = uniform(&ctx, 16);
    let group = BindGroup::new(
        &ctx,
        &BindGroupDescriptor {
            label: None,
            entries: vec![BindGroupEntry::uniform(0, &buffer, wgpu::ShaderStages::VERTEX)],
        },
    )
    .unwrap();
    let (group_id, layout_id) = (group.raw().id(), group.layout().id());
    drop(group);

    let released: Vec<u64> = probe
        .lifecycle()
        .into_iter()
        .filter_map(|event| match event {
            ember::backend::recording::Lifecycle::Released(_, id) => Some(id),
            ember::backend::recording::Lifecycle::Created(..) => None,
        })
        .collect();
    assert_eq!(released, vec![group_id, layout_id]);
    assert_eq!(probe.live(ResourceKind::Buffer), 1);
}
