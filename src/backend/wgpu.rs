//! wgpu Backend
//!
//! [`WgpuBackend`] owns the window and the device/surface/queue triple. Its
//! fields are declared in release order: the queue goes first and the window
//! last, so dropping the backend tears the stack down in reverse of
//! construction.

use std::ops::Range;
use std::sync::Arc;

use raw_window_handle::HasWindowHandle;
use wgpu::util::DeviceExt;
use winit::event_loop::ActiveEventLoop;
use winit::window::Window;

use super::{Backend, RawBindGroupEntry, RawBindingResource, RawRenderPipelineDescriptor};
use crate::encoder::RenderPassDescriptor;
use crate::errors::{EmberError, Result};
use crate::settings::ContextSettings;

/// Production backend on top of `wgpu` and `winit`.
pub struct WgpuBackend {
    queue: wgpu::Queue,
    device: wgpu::Device,
    /// Surface texture acquired for the current frame, if any.
    current: Option<wgpu::SurfaceTexture>,
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
    window: Arc<Window>,
}

impl WgpuBackend {
    /// Creates the window and negotiates an adapter and device for it.
    ///
    /// Adapter and device requests are asynchronous in `wgpu`; they are
    /// resolved here with `pollster::block_on`, so this call blocks until the
    /// platform answers.
    pub fn new(event_loop: &ActiveEventLoop, settings: &ContextSettings) -> Result<Self> {
        let attributes = Window::default_attributes()
            .with_title(settings.title.clone())
            .with_inner_size(winit::dpi::LogicalSize::new(settings.width, settings.height));
        let window = Arc::new(event_loop.create_window(attributes)?);
        log::debug!("Window handle: {:?}", window.window_handle()?.as_raw());

        let instance = wgpu::Instance::default();
        let surface = instance.create_surface(window.clone())?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: settings.power_preference,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .map_err(|e| EmberError::AdapterRequestFailed(e.to_string()))?;

        let info = adapter.get_info();
        log::info!("Adapter: {} ({:?})", info.name, info.backend);

        let required_limits = if settings.use_adapter_limits {
            adapter.limits()
        } else {
            wgpu::Limits::default()
        };

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("Ember Device"),
            required_features: settings.required_features,
            required_limits,
            memory_hints: wgpu::MemoryHints::Performance,
            ..Default::default()
        }))?;

        let size = window.inner_size();
        let (width, height) = (size.width.max(1), size.height.max(1));
        let mut config = surface
            .get_default_config(&adapter, width, height)
            .ok_or_else(|| EmberError::SurfaceUnsupported(info.name.clone()))?;

        let capabilities = surface.get_capabilities(&adapter);
        config.format = pick_format(&capabilities.formats, settings.surface_format)
            .ok_or_else(|| EmberError::SurfaceUnsupported("no surface formats".into()))?;
        config.usage = wgpu::TextureUsages::RENDER_ATTACHMENT;
        config.present_mode = settings.present_mode();
        config.alpha_mode = wgpu::CompositeAlphaMode::Auto;
        surface.configure(&device, &config);

        log::info!(
            "Surface configured: {}x{} {:?} {:?}",
            config.width,
            config.height,
            config.format,
            config.present_mode
        );

        Ok(Self {
            queue,
            device,
            current: None,
            surface,
            config,
            window,
        })
    }

    #[inline]
    #[must_use]
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    #[inline]
    #[must_use]
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    #[inline]
    #[must_use]
    pub fn window(&self) -> &Arc<Window> {
        &self.window
    }
}

/// Chooses `desired` if supported, else the first sRGB format, else the first.
fn pick_format(
    supported: &[wgpu::TextureFormat],
    desired: wgpu::TextureFormat,
) -> Option<wgpu::TextureFormat> {
    if supported.contains(&desired) {
        return Some(desired);
    }
    let fallback = supported
        .iter()
        .copied()
        .find(wgpu::TextureFormat::is_srgb)
        .or_else(|| supported.first().copied())?;
    log::warn!("Surface format {desired:?} unsupported, using {fallback:?}");
    Some(fallback)
}

impl Backend for WgpuBackend {
    type Buffer = wgpu::Buffer;
    type Sampler = wgpu::Sampler;
    type TextureView = wgpu::TextureView;
    type ShaderModule = wgpu::ShaderModule;
    type BindGroupLayout = wgpu::BindGroupLayout;
    type BindGroup = wgpu::BindGroup;
    type PipelineLayout = wgpu::PipelineLayout;
    type RenderPipeline = wgpu::RenderPipeline;
    type CommandEncoder = wgpu::CommandEncoder;
    type RenderPass = wgpu::RenderPass<'static>;
    type CommandBuffer = wgpu::CommandBuffer;

    fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    fn surface_size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    fn configure_surface(&mut self, width: u32, height: u32) {
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
    }

    fn acquire_surface_view(&mut self) -> Result<wgpu::TextureView> {
        let texture = match self.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::warn!("Surface lost or outdated, reconfiguring");
                self.surface.configure(&self.device, &self.config);
                self.surface.get_current_texture()?
            }
            Err(e) => return Err(e.into()),
        };
        let view = texture.texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("Surface View"),
            dimension: Some(wgpu::TextureViewDimension::D2),
            mip_level_count: Some(1),
            array_layer_count: Some(1),
            ..Default::default()
        });
        self.current = Some(texture);
        Ok(view)
    }

    fn has_surface_texture(&self) -> bool {
        self.current.is_some()
    }

    fn present(&mut self) -> Result<()> {
        let texture = self.current.take().ok_or(EmberError::NoSurfaceTexture)?;
        self.window.pre_present_notify();
        texture.present();
        Ok(())
    }

    fn create_buffer(
        &self,
        desc: &wgpu::BufferDescriptor<'_>,
        contents: Option<&[u8]>,
    ) -> Result<wgpu::Buffer> {
        Ok(match contents {
            Some(contents) => self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: desc.label,
                contents,
                usage: desc.usage,
            }),
            None => self.device.create_buffer(desc),
        })
    }

    fn buffer_size(&self, buffer: &wgpu::Buffer) -> u64 {
        buffer.size()
    }

    fn write_buffer(&self, buffer: &wgpu::Buffer, offset: u64, data: &[u8]) {
        self.queue.write_buffer(buffer, offset, data);
    }

    fn create_sampler(&self, desc: &wgpu::SamplerDescriptor<'_>) -> Result<wgpu::Sampler> {
        Ok(self.device.create_sampler(desc))
    }

    fn create_depth_view(
        &self,
        label: Option<&str>,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
    ) -> Result<wgpu::TextureView> {
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label,
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        Ok(texture.create_view(&wgpu::TextureViewDescriptor::default()))
    }

    fn create_shader_module(&self, label: Option<&str>, source: &str) -> Result<wgpu::ShaderModule> {
        Ok(self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label,
            source: wgpu::ShaderSource::Wgsl(source.into()),
        }))
    }

    fn create_bind_group_layout(
        &self,
        label: Option<&str>,
        entries: &[wgpu::BindGroupLayoutEntry],
    ) -> Result<wgpu::BindGroupLayout> {
        Ok(self
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor { label, entries }))
    }

    fn create_bind_group(
        &self,
        label: Option<&str>,
        layout: &wgpu::BindGroupLayout,
        entries: &[RawBindGroupEntry<'_, Self>],
    ) -> Result<wgpu::BindGroup> {
        let entries: Vec<wgpu::BindGroupEntry<'_>> = entries
            .iter()
            .map(|entry| wgpu::BindGroupEntry {
                binding: entry.binding,
                resource: match entry.resource {
                    RawBindingResource::Buffer {
                        buffer,
                        offset,
                        size,
                    } => wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                        buffer,
                        offset,
                        size: wgpu::BufferSize::new(size),
                    }),
                    RawBindingResource::TextureView(view) => wgpu::BindingResource::TextureView(view),
                    RawBindingResource::Sampler(sampler) => wgpu::BindingResource::Sampler(sampler),
                },
            })
            .collect();

        Ok(self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label,
            layout,
            entries: &entries,
        }))
    }

    fn create_pipeline_layout(
        &self,
        label: Option<&str>,
        bind_group_layouts: &[&wgpu::BindGroupLayout],
    ) -> Result<wgpu::PipelineLayout> {
        let bind_group_layouts: Vec<Option<&wgpu::BindGroupLayout>> =
            bind_group_layouts.iter().copied().map(Some).collect();
        Ok(self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label,
                bind_group_layouts: &bind_group_layouts,
                immediate_size: 0,
            }))
    }

    fn create_render_pipeline(
        &self,
        desc: &RawRenderPipelineDescriptor<'_, Self>,
    ) -> Result<wgpu::RenderPipeline> {
        Ok(self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: desc.label,
                layout: Some(desc.layout),
                vertex: wgpu::VertexState {
                    module: desc.module,
                    entry_point: Some(desc.vertex_entry_point),
                    buffers: desc.vertex_buffers,
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: desc.module,
                    entry_point: Some(desc.fragment_entry_point),
                    targets: desc.targets,
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                primitive: desc.primitive,
                depth_stencil: desc.depth_stencil.clone(),
                multisample: desc.multisample,
                multiview_mask: None,
                cache: None,
            }))
    }

    fn create_command_encoder(&self, label: Option<&str>) -> Result<wgpu::CommandEncoder> {
        Ok(self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label }))
    }

    fn begin_render_pass(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        desc: &RenderPassDescriptor<'_, Self>,
    ) -> wgpu::RenderPass<'static> {
        let color_attachments: Vec<Option<wgpu::RenderPassColorAttachment<'_>>> = desc
            .color_attachments
            .iter()
            .map(|attachment| {
                Some(wgpu::RenderPassColorAttachment {
                    view: attachment.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: attachment.load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })
            })
            .collect();

        let depth_stencil_attachment =
            desc.depth_stencil_attachment
                .as_ref()
                .map(|depth| wgpu::RenderPassDepthStencilAttachment {
                    view: depth.view,
                    depth_ops: Some(wgpu::Operations {
                        load: depth.load,
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                });

        encoder
            .begin_render_pass(&wgpu::RenderPassDescriptor {
                label: desc.label,
                color_attachments: &color_attachments,
                depth_stencil_attachment,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            })
            .forget_lifetime()
    }

    fn set_pipeline(&self, pass: &mut wgpu::RenderPass<'static>, pipeline: &wgpu::RenderPipeline) {
        pass.set_pipeline(pipeline);
    }

    fn set_bind_group(&self, pass: &mut wgpu::RenderPass<'static>, index: u32, group: &wgpu::BindGroup) {
        pass.set_bind_group(index, group, &[]);
    }

    fn set_vertex_buffer(&self, pass: &mut wgpu::RenderPass<'static>, slot: u32, buffer: &wgpu::Buffer) {
        pass.set_vertex_buffer(slot, buffer.slice(..));
    }

    fn set_index_buffer(
        &self,
        pass: &mut wgpu::RenderPass<'static>,
        buffer: &wgpu::Buffer,
        format: wgpu::IndexFormat,
    ) {
        pass.set_index_buffer(buffer.slice(..), format);
    }

    fn draw(&self, pass: &mut wgpu::RenderPass<'static>, vertices: Range<u32>, instances: Range<u32>) {
        pass.draw(vertices, instances);
    }

    fn draw_indexed(
        &self,
        pass: &mut wgpu::RenderPass<'static>,
        indices: Range<u32>,
        base_vertex: i32,
        instances: Range<u32>,
    ) {
        pass.draw_indexed(indices, base_vertex, instances);
    }

    fn end_render_pass(&self, pass: wgpu::RenderPass<'static>) {
        drop(pass);
    }

    fn discard_render_pass(&self, pass: wgpu::RenderPass<'static>) {
        // wgpu has no separate discard; dropping the pass closes it.
        drop(pass);
    }

    fn finish(&self, encoder: wgpu::CommandEncoder) -> wgpu::CommandBuffer {
        encoder.finish()
    }

    fn submit(&self, commands: Vec<wgpu::CommandBuffer>) {
        self.queue.submit(commands);
    }
}
