//! Mesh Viewer
//!
//! Usage: `mesh_viewer [path/to/mesh.off]`
//!
//! Draws an OFF mesh (or the built-in cube) and an axis gnomon with depth
//! testing. The model orbits with left-drag or the GUI sliders; `phi` is the
//! azimuth and `theta` the elevation of the direction +Z is rotated onto.

use std::f32::consts::{FRAC_PI_2, TAU};
use std::process::ExitCode;

use ember::camera::{CameraUniform, orbit_rotation};
use ember::glam::Vec3;
use ember::pipeline::{DEFAULT_DEPTH_FORMAT, default_depth_stencil};
use ember::primitives::{self, POSITION_COLOR};
use ember::winit::event::{ElementState, MouseButton, WindowEvent};
use ember::{
    App, AppHandler, BindGroupDescriptor, BindGroupEntry, Buffer, ColorAttachment, Context, DepthAttachment,
    DepthTexture, FragmentState, Geometry, IndexedGeometry, OffMesh, RenderPassDescriptor, RenderPipeline,
    RenderPipelineDescriptor, Result, VertexBuffer, VertexBufferLayout, VertexState, egui, indices_u16, wgpu,
};

const GNOMON_SHADER: &str = r"
struct Camera {
    view: mat4x4f,
    proj: mat4x4f,
}

@group(0) @binding(0) var<uniform> camera: Camera;
@group(0) @binding(1) var<uniform> model: mat4x4f;

struct VertexOut {
    @builtin(position) position: vec4f,
    @location(0) color: vec3f,
}

@vertex
fn vs(@location(0) position: vec3f, @location(1) color: vec3f) -> VertexOut {
    var out: VertexOut;
    out.position = camera.proj * camera.view * model * vec4f(position, 1.0);
    out.color = color;
    return out;
}

@fragment
fn fs(in: VertexOut) -> @location(0) vec4f {
    return vec4f(pow(in.color, vec3f(2.2)), 1.0);
}
";

const MESH_SHADER: &str = r"
struct Camera {
    view: mat4x4f,
    proj: mat4x4f,
}

@group(0) @binding(0) var<uniform> camera: Camera;
@group(0) @binding(1) var<uniform> model: mat4x4f;

struct VertexOut {
    @builtin(position) position: vec4f,
    @location(0) normal: vec3f,
}

@vertex
fn vs(@location(0) position: vec3f, @location(1) normal: vec3f) -> VertexOut {
    var out: VertexOut;
    out.position = camera.proj * camera.view * model * vec4f(position, 1.0);
    out.normal = (model * vec4f(normal, 0.0)).xyz;
    return out;
}

@fragment
fn fs(in: VertexOut) -> @location(0) vec4f {
    let light = normalize(vec3f(0.3, 0.5, 1.0));
    let diffuse = abs(dot(normalize(in.normal), light));
    return vec4f(vec3f(0.15 + 0.85 * diffuse), 1.0);
}
";

/// Radians of orbit per pixel of drag.
const DRAG_SPEED: f32 = 0.01;

/// Interleaved position + smooth normal vertices and 16-bit indices.
fn load_mesh() -> Result<(Vec<f32>, Vec<u16>)> {
    let Some(path) = std::env::args().nth(1) else {
        log::info!("No OFF file given, showing the cube");
        return Ok(primitives::cube(0.5));
    };

    let mut mesh = OffMesh::read(&path)?;
    mesh.normalize();

    let mut normals = vec![Vec3::ZERO; mesh.positions.len()];
    for &[a, b, c] in &mesh.triangles {
        let (pa, pb, pc) = (
            mesh.positions[a as usize],
            mesh.positions[b as usize],
            mesh.positions[c as usize],
        );
        // Area-weighted face normal.
        let n = (pb - pa).cross(pc - pa);
        for i in [a, b, c] {
            normals[i as usize] += n;
        }
    }

    let vertices = mesh
        .positions
        .iter()
        .zip(&normals)
        .flat_map(|(p, n)| {
            let n = n.normalize_or(Vec3::Z);
            [p.x, p.y, p.z, n.x, n.y, n.z]
        })
        .collect();
    Ok((vertices, indices_u16(&mesh.indices())?))
}

fn pipeline(
    ctx: &Context,
    label: &str,
    source: &str,
    topology: wgpu::PrimitiveTopology,
    camera: &Buffer,
    model: &Buffer,
) -> Result<RenderPipeline> {
    RenderPipeline::new(
        ctx,
        &RenderPipelineDescriptor {
            label: Some(label),
            source,
            bind_groups: vec![BindGroupDescriptor {
                label: Some(label),
                entries: vec![
                    BindGroupEntry::uniform(0, camera, wgpu::ShaderStages::VERTEX),
                    BindGroupEntry::uniform(1, model, wgpu::ShaderStages::VERTEX),
                ],
            }],
            vertex: VertexState {
                entry_point: "vs",
                buffers: vec![VertexBufferLayout::packed(0, &POSITION_COLOR)],
            },
            primitive: wgpu::PrimitiveState {
                topology,
                ..Default::default()
            },
            fragment: FragmentState::single("fs", ctx.surface_format()),
            multisample: wgpu::MultisampleState::default(),
            depth_stencil: Some(default_depth_stencil(DEFAULT_DEPTH_FORMAT)),
        },
    )
}

struct MeshViewer {
    camera: Buffer,
    model: Buffer,
    gnomon: Buffer,
    mesh_vertices: Buffer,
    mesh_indices: Buffer,
    index_count: u32,
    gnomon_pipeline: RenderPipeline,
    mesh_pipeline: RenderPipeline,
    depth: DepthTexture,

    phi: f32,
    theta: f32,
    dragging: bool,
    cursor: Option<(f64, f64)>,
}

impl MeshViewer {
    fn orbit_by(&mut self, dx: f32, dy: f32) {
        self.phi = (self.phi + dx * DRAG_SPEED).rem_euclid(TAU);
        self.theta = (self.theta - dy * DRAG_SPEED).clamp(-FRAC_PI_2, FRAC_PI_2);
    }
}

impl AppHandler for MeshViewer {
    fn init(ctx: &Context) -> Result<Self> {
        let (phi, theta) = (0.0, FRAC_PI_2);
        let camera = Buffer::uniform(ctx, Some("Camera"), &CameraUniform::demo(ctx.aspect()))?;
        let model = Buffer::uniform(ctx, Some("Model"), &orbit_rotation(phi, theta).to_cols_array())?;

        let (vertices, indices) = load_mesh()?;
        let mesh_vertices = Buffer::vertex(ctx, Some("Mesh Vertices"), &vertices)?;
        let mesh_indices = Buffer::index(ctx, Some("Mesh Indices"), &indices)?;
        let gnomon = Buffer::vertex(ctx, Some("Gnomon"), &primitives::gnomon(1.5))?;

        let gnomon_pipeline = pipeline(
            ctx,
            "Gnomon",
            GNOMON_SHADER,
            wgpu::PrimitiveTopology::LineList,
            &camera,
            &model,
        )?;
        let mesh_pipeline = pipeline(
            ctx,
            "Mesh",
            MESH_SHADER,
            wgpu::PrimitiveTopology::TriangleList,
            &camera,
            &model,
        )?;

        Ok(Self {
            camera,
            model,
            gnomon,
            mesh_vertices,
            mesh_indices,
            index_count: indices.len() as u32,
            gnomon_pipeline,
            mesh_pipeline,
            depth: DepthTexture::new(ctx, DEFAULT_DEPTH_FORMAT)?,
            phi,
            theta,
            dragging: false,
            cursor: None,
        })
    }

    fn on_event(&mut self, _ctx: &Context, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => {
                self.dragging = *state == ElementState::Pressed;
            }
            WindowEvent::CursorMoved { position, .. } => {
                let current = (position.x, position.y);
                if self.dragging
                    && let Some((x, y)) = self.cursor
                {
                    self.orbit_by((current.0 - x) as f32, (current.1 - y) as f32);
                }
                self.cursor = Some(current);
            }
            WindowEvent::CursorLeft { .. } => self.cursor = None,
            _ => {}
        }
        false
    }

    fn ui(&mut self, _ctx: &Context, gui: &egui::Context) {
        egui::Window::new("Orbit").show(gui, |ui| {
            ui.add(egui::Slider::new(&mut self.phi, 0.0..=TAU).text("phi"));
            ui.add(egui::Slider::new(&mut self.theta, -FRAC_PI_2..=FRAC_PI_2).text("theta"));
            ui.label(format!("{} triangles", self.index_count / 3));
        });
    }

    fn render(&mut self, ctx: &Context, view: &wgpu::TextureView) -> Result<wgpu::CommandBuffer> {
        self.depth.resize(ctx)?;
        self.camera
            .write(ctx, std::slice::from_ref(&CameraUniform::demo(ctx.aspect())))?;
        self.model
            .write(ctx, &orbit_rotation(self.phi, self.theta).to_cols_array())?;

        let layout = VertexBufferLayout::packed(0, &POSITION_COLOR);
        let gnomon = Geometry::new(
            wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::LineList,
                ..Default::default()
            },
            vec![VertexBuffer::new(&self.gnomon, layout.clone())],
            6,
        )?;
        let mesh = IndexedGeometry::new(
            wgpu::PrimitiveState::default(),
            vec![VertexBuffer::new(&self.mesh_vertices, layout)],
            &self.mesh_indices,
            self.index_count,
        )?;

        let mut encoder = ctx.create_command_encoder(Some("Mesh Viewer Encoder"))?;
        let mut pass = encoder.render_pass(
            &RenderPassDescriptor::new(
                Some("Scene Pass"),
                vec![ColorAttachment::clear(view, wgpu::Color::BLACK)],
            )
            .with_depth(DepthAttachment::clear(self.depth.view(), 1.0)),
        );
        pass.set_pipeline(&self.gnomon_pipeline);
        pass.draw(&gnomon);
        pass.set_pipeline(&self.mesh_pipeline);
        pass.draw_indexed(&mesh);
        pass.end();
        Ok(encoder.finish())
    }
}

fn main() -> ExitCode {
    ember::logging::init();
    match App::new().with_title("Mesh Viewer").run::<MeshViewer>() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("Mesh viewer exited with error: {e}");
            ExitCode::FAILURE
        }
    }
}
