//! Recording backend
//!
//! A [`Backend`] that never touches a GPU. It exists so the ownership and
//! command-sequencing rules of the wrappers can be checked on any machine:
//!
//! - every handle carries an id and a [`ResourceKind`]; creation and release
//!   are counted per kind and appended to a lifecycle log,
//! - every queue and pass call is appended to a [`Command`] log,
//! - buffer contents live in host memory and can be read back,
//! - [`RecordingBackend::fail_next`] makes the next creation of a kind fail,
//!   and [`RecordingBackend::fail_acquire`] queues surface acquisition errors.
//!
//! Bind groups are checked against their layout the way a real device would
//! (entry count, slot indices, minimum binding size), so mismatches surface as
//! creation errors here too.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::ops::Range;
use std::rc::Rc;

use super::{Backend, RawBindGroupEntry, RawBindingResource, RawRenderPipelineDescriptor};
use crate::encoder::RenderPassDescriptor;
use crate::errors::{EmberError, Result};

/// Kinds of native handle tracked by the recorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Buffer,
    Sampler,
    TextureView,
    SurfaceTexture,
    ShaderModule,
    BindGroupLayout,
    BindGroup,
    PipelineLayout,
    RenderPipeline,
    CommandEncoder,
    RenderPass,
    CommandBuffer,
}

/// Handle creation or release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Created(ResourceKind, u64),
    Released(ResourceKind, u64),
}

/// A recorded queue, surface or pass call.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    ConfigureSurface {
        width: u32,
        height: u32,
    },
    AcquireSurfaceTexture {
        texture: u64,
    },
    Present {
        texture: u64,
    },
    WriteBuffer {
        buffer: u64,
        offset: u64,
        len: u64,
    },
    BeginRenderPass {
        encoder: u64,
        label: Option<String>,
        color_loads: Vec<wgpu::LoadOp<wgpu::Color>>,
        depth: bool,
    },
    SetPipeline {
        pipeline: u64,
    },
    SetBindGroup {
        index: u32,
        group: u64,
    },
    SetVertexBuffer {
        slot: u32,
        buffer: u64,
    },
    SetIndexBuffer {
        buffer: u64,
        format: wgpu::IndexFormat,
    },
    Draw {
        vertices: Range<u32>,
        instances: Range<u32>,
    },
    DrawIndexed {
        indices: Range<u32>,
        base_vertex: i32,
        instances: Range<u32>,
    },
    EndRenderPass,
    Finish {
        encoder: u64,
    },
    Submit {
        command_buffers: Vec<u64>,
    },
}

#[derive(Default)]
struct State {
    next_id: u64,
    created: HashMap<ResourceKind, usize>,
    released: HashMap<ResourceKind, usize>,
    lifecycle: Vec<Lifecycle>,
    commands: Vec<Command>,
    buffers: HashMap<u64, Vec<u8>>,
    fail_next: HashSet<ResourceKind>,
    acquire_errors: VecDeque<wgpu::SurfaceError>,
}

type Shared = Rc<RefCell<State>>;

/// An owned recorded handle. Dropping it records the release.
pub struct Handle {
    id: u64,
    kind: ResourceKind,
    state: Shared,
}

impl Handle {
    #[inline]
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        let mut state = self.state.borrow_mut();
        *state.released.entry(self.kind).or_default() += 1;
        state.lifecycle.push(Lifecycle::Released(self.kind, self.id));
        if self.kind == ResourceKind::Buffer {
            state.buffers.remove(&self.id);
        }
    }
}

impl std::fmt::Debug for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}#{}", self.kind, self.id)
    }
}

#[derive(Debug)]
pub struct RecordedBuffer {
    handle: Handle,
    size: u64,
}

impl RecordedBuffer {
    #[must_use]
    pub fn id(&self) -> u64 {
        self.handle.id
    }
}

#[derive(Debug)]
pub struct RecordedLayout {
    handle: Handle,
    entries: Vec<wgpu::BindGroupLayoutEntry>,
}

impl RecordedLayout {
    #[must_use]
    pub fn id(&self) -> u64 {
        self.handle.id
    }

    #[must_use]
    pub fn entries(&self) -> &[wgpu::BindGroupLayoutEntry] {
        &self.entries
    }
}

/// A resource bound in a recorded bind group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordedResource {
    Buffer { buffer: u64, offset: u64, size: u64 },
    TextureView(u64),
    Sampler(u64),
}

#[derive(Debug)]
pub struct RecordedBindGroup {
    handle: Handle,
    layout: u64,
    bindings: Vec<(u32, RecordedResource)>,
}

impl RecordedBindGroup {
    #[must_use]
    pub fn id(&self) -> u64 {
        self.handle.id
    }

    #[must_use]
    pub fn layout_id(&self) -> u64 {
        self.layout
    }

    /// `(slot, resource)` pairs in declaration order.
    #[must_use]
    pub fn bindings(&self) -> &[(u32, RecordedResource)] {
        &self.bindings
    }
}

#[derive(Debug)]
pub struct RecordedPipelineLayout {
    handle: Handle,
    bind_group_layouts: Vec<u64>,
}

impl RecordedPipelineLayout {
    #[must_use]
    pub fn id(&self) -> u64 {
        self.handle.id
    }

    #[must_use]
    pub fn bind_group_layouts(&self) -> &[u64] {
        &self.bind_group_layouts
    }
}

#[derive(Debug)]
pub struct RecordedPipeline {
    handle: Handle,
    layout: u64,
    vertex_buffers: Vec<u64>,
    has_depth: bool,
}

impl RecordedPipeline {
    #[must_use]
    pub fn id(&self) -> u64 {
        self.handle.id
    }

    #[must_use]
    pub fn layout_id(&self) -> u64 {
        self.layout
    }

    /// Array stride of each declared vertex buffer layout.
    #[must_use]
    pub fn vertex_strides(&self) -> &[u64] {
        &self.vertex_buffers
    }

    #[must_use]
    pub fn has_depth_stencil(&self) -> bool {
        self.has_depth
    }
}

#[derive(Debug)]
pub struct RecordedPass {
    handle: Handle,
}

impl RecordedPass {
    #[must_use]
    pub fn id(&self) -> u64 {
        self.handle.id
    }
}

/// Read access to a [`RecordingBackend`]'s counters and logs.
///
/// Shares state with the backend, so it can still be queried after the
/// backend (and every handle it created) has been dropped.
#[derive(Clone)]
pub struct Probe(Shared);

impl Probe {
    /// Number of handles of `kind` created so far.
    #[must_use]
    pub fn created(&self, kind: ResourceKind) -> usize {
        self.0.borrow().created.get(&kind).copied().unwrap_or(0)
    }

    /// Number of handles of `kind` released so far.
    #[must_use]
    pub fn released(&self, kind: ResourceKind) -> usize {
        self.0.borrow().released.get(&kind).copied().unwrap_or(0)
    }

    /// Handles of `kind` currently alive.
    #[must_use]
    pub fn live(&self, kind: ResourceKind) -> usize {
        self.created(kind) - self.released(kind)
    }

    /// Handles of any kind currently alive.
    #[must_use]
    pub fn live_total(&self) -> usize {
        let state = self.0.borrow();
        let created: usize = state.created.values().sum();
        let released: usize = state.released.values().sum();
        created - released
    }

    #[must_use]
    pub fn lifecycle(&self) -> Vec<Lifecycle> {
        self.0.borrow().lifecycle.clone()
    }

    /// Ids released for `kind`, in release order.
    #[must_use]
    pub fn release_order(&self, kind: ResourceKind) -> Vec<u64> {
        self.0
            .borrow()
            .lifecycle
            .iter()
            .filter_map(|event| match *event {
                Lifecycle::Released(k, id) if k == kind => Some(id),
                _ => None,
            })
            .collect()
    }

    #[must_use]
    pub fn commands(&self) -> Vec<Command> {
        self.0.borrow().commands.clone()
    }

    /// Drains the command log.
    pub fn take_commands(&self) -> Vec<Command> {
        std::mem::take(&mut self.0.borrow_mut().commands)
    }
}

/// GPU-less [`Backend`] that records everything it is asked to do.
pub struct RecordingBackend {
    format: wgpu::TextureFormat,
    size: (u32, u32),
    surface_texture: Option<Handle>,
    state: Shared,
}

impl RecordingBackend {
    #[must_use]
    pub fn new(width: u32, height: u32, format: wgpu::TextureFormat) -> Self {
        Self {
            format,
            size: (width, height),
            surface_texture: None,
            state: Shared::default(),
        }
    }

    /// A shared view of the counters and logs that outlives the backend.
    #[must_use]
    pub fn probe(&self) -> Probe {
        Probe(Rc::clone(&self.state))
    }

    #[must_use]
    pub fn created(&self, kind: ResourceKind) -> usize {
        self.probe().created(kind)
    }

    #[must_use]
    pub fn released(&self, kind: ResourceKind) -> usize {
        self.probe().released(kind)
    }

    #[must_use]
    pub fn live(&self, kind: ResourceKind) -> usize {
        self.probe().live(kind)
    }

    #[must_use]
    pub fn live_total(&self) -> usize {
        self.probe().live_total()
    }

    #[must_use]
    pub fn lifecycle(&self) -> Vec<Lifecycle> {
        self.probe().lifecycle()
    }

    #[must_use]
    pub fn commands(&self) -> Vec<Command> {
        self.probe().commands()
    }

    /// Drains the command log.
    pub fn take_commands(&self) -> Vec<Command> {
        self.probe().take_commands()
    }

    /// Host copy of a live buffer's contents.
    #[must_use]
    pub fn buffer_contents(&self, buffer: &RecordedBuffer) -> Vec<u8> {
        self.state
            .borrow()
            .buffers
            .get(&buffer.handle.id)
            .cloned()
            .unwrap_or_default()
    }

    /// Makes the next creation of `kind` fail with [`EmberError::Backend`].
    pub fn fail_next(&self, kind: ResourceKind) {
        self.state.borrow_mut().fail_next.insert(kind);
    }

    /// Makes the next surface acquisition fail with `error`. Calls queue up.
    pub fn fail_acquire(&self, error: wgpu::SurfaceError) {
        self.state.borrow_mut().acquire_errors.push_back(error);
    }

    fn alloc(&self, kind: ResourceKind) -> Result<Handle> {
        let mut state = self.state.borrow_mut();
        if state.fail_next.remove(&kind) {
            return Err(EmberError::Backend(format!("injected {kind:?} creation failure")));
        }
        state.next_id += 1;
        let id = state.next_id;
        *state.created.entry(kind).or_default() += 1;
        state.lifecycle.push(Lifecycle::Created(kind, id));
        Ok(Handle {
            id,
            kind,
            state: Rc::clone(&self.state),
        })
    }

    fn record(&self, command: Command) {
        self.state.borrow_mut().commands.push(command);
    }
}

impl Backend for RecordingBackend {
    type Buffer = RecordedBuffer;
    type Sampler = Handle;
    type TextureView = Handle;
    type ShaderModule = Handle;
    type BindGroupLayout = RecordedLayout;
    type BindGroup = RecordedBindGroup;
    type PipelineLayout = RecordedPipelineLayout;
    type RenderPipeline = RecordedPipeline;
    type CommandEncoder = Handle;
    type RenderPass = RecordedPass;
    type CommandBuffer = Handle;

    fn surface_format(&self) -> wgpu::TextureFormat {
        self.format
    }

    fn surface_size(&self) -> (u32, u32) {
        self.size
    }

    fn configure_surface(&mut self, width: u32, height: u32) {
        self.size = (width, height);
        self.record(Command::ConfigureSurface { width, height });
    }

    fn acquire_surface_view(&mut self) -> Result<Handle> {
        if let Some(error) = self.state.borrow_mut().acquire_errors.pop_front() {
            return Err(error.into());
        }
        let texture = self.alloc(ResourceKind::SurfaceTexture)?;
        let view = self.alloc(ResourceKind::TextureView)?;
        self.record(Command::AcquireSurfaceTexture { texture: texture.id });
        self.surface_texture = Some(texture);
        Ok(view)
    }

    fn has_surface_texture(&self) -> bool {
        self.surface_texture.is_some()
    }

    fn present(&mut self) -> Result<()> {
        let texture = self.surface_texture.take().ok_or(EmberError::NoSurfaceTexture)?;
        self.record(Command::Present { texture: texture.id });
        drop(texture);
        Ok(())
    }

    fn create_buffer(
        &self,
        desc: &wgpu::BufferDescriptor<'_>,
        contents: Option<&[u8]>,
    ) -> Result<RecordedBuffer> {
        if desc.mapped_at_creation && desc.size % wgpu::COPY_BUFFER_ALIGNMENT != 0 {
            return Err(EmberError::Backend(format!(
                "buffer {:?} mapped at creation with unaligned size {}",
                desc.label, desc.size
            )));
        }
        let data = match contents {
            Some(bytes) if bytes.len() as u64 != desc.size => {
                return Err(EmberError::Backend(format!(
                    "initial contents of {:?} are {} bytes, buffer is {}",
                    desc.label,
                    bytes.len(),
                    desc.size
                )));
            }
            Some(bytes) => bytes.to_vec(),
            None => vec![0; desc.size as usize],
        };
        let handle = self.alloc(ResourceKind::Buffer)?;
        self.state.borrow_mut().buffers.insert(handle.id, data);
        Ok(RecordedBuffer {
            handle,
            size: desc.size,
        })
    }

    fn buffer_size(&self, buffer: &RecordedBuffer) -> u64 {
        buffer.size
    }

    fn write_buffer(&self, buffer: &RecordedBuffer, offset: u64, data: &[u8]) {
        let end = offset + data.len() as u64;
        assert!(
            end <= buffer.size,
            "write of {} bytes at offset {offset} overruns buffer of {} bytes",
            data.len(),
            buffer.size
        );
        let mut state = self.state.borrow_mut();
        if let Some(contents) = state.buffers.get_mut(&buffer.handle.id) {
            contents[offset as usize..end as usize].copy_from_slice(data);
        }
        state.commands.push(Command::WriteBuffer {
            buffer: buffer.handle.id,
            offset,
            len: data.len() as u64,
        });
    }

    fn create_sampler(&self, _desc: &wgpu::SamplerDescriptor<'_>) -> Result<Handle> {
        self.alloc(ResourceKind::Sampler)
    }

    fn create_depth_view(
        &self,
        _label: Option<&str>,
        _width: u32,
        _height: u32,
        _format: wgpu::TextureFormat,
    ) -> Result<Handle> {
        self.alloc(ResourceKind::TextureView)
    }

    fn create_shader_module(&self, _label: Option<&str>, source: &str) -> Result<Handle> {
        if source.trim().is_empty() {
            return Err(EmberError::Backend("empty shader source".into()));
        }
        self.alloc(ResourceKind::ShaderModule)
    }

    fn create_bind_group_layout(
        &self,
        label: Option<&str>,
        entries: &[wgpu::BindGroupLayoutEntry],
    ) -> Result<RecordedLayout> {
        if let Some(entry) = entries.iter().find(|e| e.visibility.is_empty()) {
            return Err(EmberError::Backend(format!(
                "layout {label:?}: binding {} has no visibility",
                entry.binding
            )));
        }
        Ok(RecordedLayout {
            handle: self.alloc(ResourceKind::BindGroupLayout)?,
            entries: entries.to_vec(),
        })
    }

    fn create_bind_group(
        &self,
        label: Option<&str>,
        layout: &RecordedLayout,
        entries: &[RawBindGroupEntry<'_, Self>],
    ) -> Result<RecordedBindGroup> {
        if entries.len() != layout.entries.len() {
            return Err(EmberError::Backend(format!(
                "bind group {label:?} has {} entries, layout expects {}",
                entries.len(),
                layout.entries.len()
            )));
        }

        let mut bindings = Vec::with_capacity(entries.len());
        for (entry, layout_entry) in entries.iter().zip(&layout.entries) {
            if entry.binding != layout_entry.binding {
                return Err(EmberError::Backend(format!(
                    "bind group {label:?}: slot {} does not match layout slot {}",
                    entry.binding, layout_entry.binding
                )));
            }
            let resource = match &entry.resource {
                RawBindingResource::Buffer {
                    buffer,
                    offset,
                    size,
                } => {
                    if let wgpu::BindingType::Buffer {
                        min_binding_size: Some(min),
                        ..
                    } = layout_entry.ty
                    {
                        if *size < min.get() {
                            return Err(EmberError::Backend(format!(
                                "bind group {label:?}: binding {} is {size} bytes, layout requires {}",
                                entry.binding,
                                min.get()
                            )));
                        }
                    }
                    if offset + size > buffer.size {
                        return Err(EmberError::Backend(format!(
                            "bind group {label:?}: binding {} overruns its buffer",
                            entry.binding
                        )));
                    }
                    RecordedResource::Buffer {
                        buffer: buffer.handle.id,
                        offset: *offset,
                        size: *size,
                    }
                }
                RawBindingResource::TextureView(view) => RecordedResource::TextureView(view.id),
                RawBindingResource::Sampler(sampler) => RecordedResource::Sampler(sampler.id),
            };
            bindings.push((entry.binding, resource));
        }

        Ok(RecordedBindGroup {
            handle: self.alloc(ResourceKind::BindGroup)?,
            layout: layout.handle.id,
            bindings,
        })
    }

    fn create_pipeline_layout(
        &self,
        _label: Option<&str>,
        bind_group_layouts: &[&RecordedLayout],
    ) -> Result<RecordedPipelineLayout> {
        Ok(RecordedPipelineLayout {
            handle: self.alloc(ResourceKind::PipelineLayout)?,
            bind_group_layouts: bind_group_layouts.iter().map(|l| l.handle.id).collect(),
        })
    }

    fn create_render_pipeline(
        &self,
        desc: &RawRenderPipelineDescriptor<'_, Self>,
    ) -> Result<RecordedPipeline> {
        if desc.targets.is_empty() {
            return Err(EmberError::Backend(format!(
                "pipeline {:?} has no color targets",
                desc.label
            )));
        }
        Ok(RecordedPipeline {
            handle: self.alloc(ResourceKind::RenderPipeline)?,
            layout: desc.layout.handle.id,
            vertex_buffers: desc.vertex_buffers.iter().map(|b| b.array_stride).collect(),
            has_depth: desc.depth_stencil.is_some(),
        })
    }

    fn create_command_encoder(&self, _label: Option<&str>) -> Result<Handle> {
        self.alloc(ResourceKind::CommandEncoder)
    }

    fn begin_render_pass(
        &self,
        encoder: &mut Handle,
        desc: &RenderPassDescriptor<'_, Self>,
    ) -> RecordedPass {
        self.record(Command::BeginRenderPass {
            encoder: encoder.id,
            label: desc.label.map(str::to_owned),
            color_loads: desc.color_attachments.iter().map(|a| a.load).collect(),
            depth: desc.depth_stencil_attachment.is_some(),
        });
        // Pass handles are infallible in the native API as well.
        let handle = match self.alloc(ResourceKind::RenderPass) {
            Ok(handle) => handle,
            Err(e) => panic!("render pass creation cannot fail: {e}"),
        };
        RecordedPass { handle }
    }

    fn set_pipeline(&self, _pass: &mut RecordedPass, pipeline: &RecordedPipeline) {
        self.record(Command::SetPipeline {
            pipeline: pipeline.handle.id,
        });
    }

    fn set_bind_group(&self, _pass: &mut RecordedPass, index: u32, group: &RecordedBindGroup) {
        self.record(Command::SetBindGroup {
            index,
            group: group.handle.id,
        });
    }

    fn set_vertex_buffer(&self, _pass: &mut RecordedPass, slot: u32, buffer: &RecordedBuffer) {
        self.record(Command::SetVertexBuffer {
            slot,
            buffer: buffer.handle.id,
        });
    }

    fn set_index_buffer(
        &self,
        _pass: &mut RecordedPass,
        buffer: &RecordedBuffer,
        format: wgpu::IndexFormat,
    ) {
        self.record(Command::SetIndexBuffer {
            buffer: buffer.handle.id,
            format,
        });
    }

    fn draw(&self, _pass: &mut RecordedPass, vertices: Range<u32>, instances: Range<u32>) {
        self.record(Command::Draw {
            vertices,
            instances,
        });
    }

    fn draw_indexed(
        &self,
        _pass: &mut RecordedPass,
        indices: Range<u32>,
        base_vertex: i32,
        instances: Range<u32>,
    ) {
        self.record(Command::DrawIndexed {
            indices,
            base_vertex,
            instances,
        });
    }

    fn end_render_pass(&self, pass: RecordedPass) {
        self.record(Command::EndRenderPass);
        drop(pass);
    }

    fn discard_render_pass(&self, pass: RecordedPass) {
        drop(pass);
    }

    fn finish(&self, encoder: Handle) -> Handle {
        self.record(Command::Finish { encoder: encoder.id });
        drop(encoder);
        match self.alloc(ResourceKind::CommandBuffer) {
            Ok(handle) => handle,
            Err(e) => panic!("command buffer creation cannot fail: {e}"),
        }
    }

    fn submit(&self, commands: Vec<Handle>) {
        self.record(Command::Submit {
            command_buffers: commands.iter().map(|c| c.id).collect(),
        });
        drop(commands);
    }
}
