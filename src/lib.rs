#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::must_use_candidate)]

pub mod app;
pub mod assets;
pub mod backend;
pub mod bind_group;
pub mod buffer;
pub mod camera;
pub mod context;
pub mod depth;
pub mod encoder;
pub mod errors;
pub mod geometry;
#[cfg(feature = "gui")]
pub mod gui;
pub mod logging;
pub mod pipeline;
pub mod primitives;
pub mod settings;

pub use app::{App, AppHandler};
pub use assets::OffMesh;
pub use backend::{Backend, RecordingBackend, WgpuBackend};
pub use bind_group::{BindGroup, BindGroupDescriptor, BindGroupEntry, BindingLayout, BindingResource};
pub use buffer::{Buffer, BufferDescriptor};
pub use context::Context;
pub use depth::DepthTexture;
pub use encoder::{ColorAttachment, CommandEncoder, DepthAttachment, RenderPass, RenderPassDescriptor};
pub use errors::{EmberError, Result};
pub use geometry::{Geometry, IndexedGeometry, VertexBuffer, indices_u16};
#[cfg(feature = "gui")]
pub use gui::GuiOverlay;
pub use pipeline::{FragmentState, RenderPipeline, RenderPipelineDescriptor, VertexBufferLayout, VertexState};
pub use settings::ContextSettings;

pub use glam;
pub use wgpu;
pub use winit;
#[cfg(feature = "gui")]
pub use egui;
