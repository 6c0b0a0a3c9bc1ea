//! Triangle
//!
//! One vertex buffer, one pipeline without bind groups, and a GUI window
//! that edits the clear color.

use std::process::ExitCode;

use ember::primitives::POSITION_COLOR;
use ember::{
    App, AppHandler, Buffer, ColorAttachment, Context, FragmentState, Geometry, RenderPassDescriptor,
    RenderPipeline, RenderPipelineDescriptor, Result, VertexBuffer, VertexBufferLayout, VertexState, egui,
    wgpu,
};

const SHADER: &str = r"
struct VertexOut {
    @builtin(position) position: vec4f,
    @location(0) color: vec3f,
}

@vertex
fn vs(@location(0) position: vec3f, @location(1) color: vec3f) -> VertexOut {
    var out: VertexOut;
    out.position = vec4f(position, 1.0);
    out.color = color;
    return out;
}

@fragment
fn fs(in: VertexOut) -> @location(0) vec4f {
    return vec4f(in.color, 1.0);
}
";

#[rustfmt::skip]
const VERTICES: [f32; 18] = [
     0.0,  0.5, 0.0,   1.0, 0.0, 0.0,
    -0.5, -0.5, 0.0,   0.0, 1.0, 0.0,
     0.5, -0.5, 0.0,   0.0, 0.0, 1.0,
];

struct Triangle {
    vertices: Buffer,
    pipeline: RenderPipeline,
    clear: [f32; 3],
}

impl AppHandler for Triangle {
    fn init(ctx: &Context) -> Result<Self> {
        let vertices = Buffer::vertex(ctx, Some("Triangle Vertices"), &VERTICES)?;
        let pipeline = RenderPipeline::new(
            ctx,
            &RenderPipelineDescriptor {
                label: Some("Triangle"),
                source: SHADER,
                bind_groups: Vec::new(),
                vertex: VertexState {
                    entry_point: "vs",
                    buffers: vec![VertexBufferLayout::packed(0, &POSITION_COLOR)],
                },
                primitive: wgpu::PrimitiveState::default(),
                fragment: FragmentState::single("fs", ctx.surface_format()),
                multisample: wgpu::MultisampleState::default(),
                depth_stencil: None,
            },
        )?;

        Ok(Self {
            vertices,
            pipeline,
            clear: [0.05, 0.05, 0.08],
        })
    }

    fn ui(&mut self, _ctx: &Context, gui: &egui::Context) {
        egui::Window::new("Triangle").show(gui, |ui| {
            ui.horizontal(|ui| {
                ui.label("Clear color");
                ui.color_edit_button_rgb(&mut self.clear);
            });
        });
    }

    fn render(&mut self, ctx: &Context, view: &wgpu::TextureView) -> Result<wgpu::CommandBuffer> {
        let geometry = Geometry::new(
            wgpu::PrimitiveState::default(),
            vec![VertexBuffer::new(
                &self.vertices,
                VertexBufferLayout::packed(0, &POSITION_COLOR),
            )],
            3,
        )?;
        let [r, g, b] = self.clear.map(f64::from);

        let mut encoder = ctx.create_command_encoder(Some("Triangle Encoder"))?;
        let mut pass = encoder.render_pass(&RenderPassDescriptor::new(
            Some("Triangle Pass"),
            vec![ColorAttachment::clear(view, wgpu::Color { r, g, b, a: 1.0 })],
        ));
        pass.set_pipeline(&self.pipeline);
        pass.draw(&geometry);
        pass.end();
        Ok(encoder.finish())
    }
}

fn main() -> ExitCode {
    ember::logging::init();
    match App::new().with_title("Triangle").run::<Triangle>() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("Triangle exited with error: {e}");
            ExitCode::FAILURE
        }
    }
}
