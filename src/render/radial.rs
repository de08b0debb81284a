//! Radial spokes drawn through a small immediate-mode canvas.

use glam::Vec2;
use wgpu::util::DeviceExt;

use super::gpu::GpuContext;
use super::{program, RenderError, Visualization, CANVAS_HEIGHT, CANVAS_WIDTH};
use crate::analyzer::SpectrumSnapshot;

// ---- Tuning knobs ----------------------------------------------------------

/// Radius at which every spoke starts, in pixels.
pub const INNER_RADIUS: f32 = 80.0;
/// Extra length of a spoke at magnitude 255, in pixels.
pub const EXTENT: f32 = 100.0;
/// Dash pattern: pixels on, pixels off.
pub const DASH_PATTERN: [f32; 2] = [5.0; 2];

const BACKGROUND: wgpu::Color = wgpu::Color {
    r: 0.0,
    g: 0.0,
    b: 0.0,
    a: 1.0,
};

// ----------------------------------------------------------------------------

pub const SHADER_SOURCE: &str = include_str!("shaders/line.wgsl");

/// Immediate-mode 2D drawing surface, in pixel coordinates with y down.
pub trait Canvas {
    fn size(&self) -> Vec2;

    /// Erase everything drawn since the last clear.
    fn clear(&mut self);

    fn dashed_line(&mut self, from: Vec2, to: Vec2);
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadialRenderer {
    pub inner_radius: f32,
    pub extent: f32,
}

impl Default for RadialRenderer {
    fn default() -> Self {
        Self {
            inner_radius: INNER_RADIUS,
            extent: EXTENT,
        }
    }
}

impl RadialRenderer {
    /// Endpoints of spoke `index` out of `slices`, around `centre`.
    pub fn spoke(&self, centre: Vec2, index: usize, slices: usize, magnitude: u8) -> (Vec2, Vec2) {
        let theta = std::f32::consts::TAU * index as f32 / slices as f32;
        let dir = Vec2::new(theta.cos(), theta.sin());
        let length = self.extent * (magnitude as f32 / 255.0);
        (
            centre + dir * self.inner_radius,
            centre + dir * (self.inner_radius + length),
        )
    }

    /// Clear the canvas once, then draw one spoke per magnitude.
    pub fn draw<C: Canvas + ?Sized>(&self, canvas: &mut C, magnitudes: &[u8]) {
        canvas.clear();
        let centre = canvas.size() / 2.0;
        let slices = magnitudes.len();
        for (i, &m) in magnitudes.iter().enumerate() {
            let (from, to) = self.spoke(centre, i, slices, m);
            canvas.dashed_line(from, to);
        }
    }
}

/// Split the segment `from → to` into its visible dashes.
pub fn dash_segments(from: Vec2, to: Vec2, pattern: [f32; 2]) -> Vec<(Vec2, Vec2)> {
    let length = from.distance(to);
    let period = pattern[0] + pattern[1];
    if length <= f32::EPSILON || pattern[0] <= 0.0 {
        return Vec::new();
    }
    if pattern[1] <= 0.0 {
        return vec![(from, to)];
    }

    let dir = (to - from) / length;
    let mut dashes = Vec::with_capacity((length / period) as usize + 1);
    let mut start = 0.0;
    while start < length {
        let end = (start + pattern[0]).min(length);
        dashes.push((from + dir * start, from + dir * end));
        start += period;
    }
    dashes
}

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct LineVertex {
    position: [f32; 2],
}

const INITIAL_VERTEX_CAPACITY: usize = 4096;

/// `Canvas` backed by a wgpu line-list pipeline.
///
/// Lines accumulate on the CPU and are uploaded in one go by `present`.
pub struct LineCanvas {
    gpu: GpuContext,
    pipeline: wgpu::RenderPipeline,
    vertex_buffer: wgpu::Buffer,
    capacity: usize,
    vertices: Vec<LineVertex>,
    size: Vec2,
}

impl LineCanvas {
    pub fn new(gpu: GpuContext) -> Result<Self, RenderError> {
        let program = program::compile_logged("Line Shader", SHADER_SOURCE)?;
        let shader = program.create_module(&gpu.device);

        let pipeline_layout = gpu
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Line Pipeline Layout"),
                bind_group_layouts: &[],
                immediate_size: 0,
            });

        let pipeline = gpu
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Line Pipeline"),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some(program::VERTEX_ENTRY),
                    buffers: &[wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<LineVertex>() as wgpu::BufferAddress,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &wgpu::vertex_attr_array![0 => Float32x2],
                    }],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some(program::FRAGMENT_ENTRY),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: gpu.format(),
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::LineList,
                    ..Default::default()
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview_mask: None,
                cache: None,
            });

        let vertex_buffer = create_vertex_buffer(&gpu.device, INITIAL_VERTEX_CAPACITY);

        Ok(Self {
            gpu,
            pipeline,
            vertex_buffer,
            capacity: INITIAL_VERTEX_CAPACITY,
            vertices: Vec::with_capacity(INITIAL_VERTEX_CAPACITY),
            size: Vec2::new(CANVAS_WIDTH as f32, CANVAS_HEIGHT as f32),
        })
    }

    fn to_clip(&self, p: Vec2) -> [f32; 2] {
        [p.x / self.size.x * 2.0 - 1.0, 1.0 - p.y / self.size.y * 2.0]
    }

    /// Upload the accumulated lines and show them.
    pub fn present(&mut self) {
        if self.vertices.len() > self.capacity {
            self.capacity = self.vertices.len().next_power_of_two();
            self.vertex_buffer = create_vertex_buffer(&self.gpu.device, self.capacity);
        }
        if !self.vertices.is_empty() {
            self.gpu
                .queue
                .write_buffer(&self.vertex_buffer, 0, bytemuck::cast_slice(&self.vertices));
        }

        let Some(output) = self.gpu.acquire() else {
            return;
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let count = self.vertices.len() as u32;
        self.gpu.clear_and_draw(&view, BACKGROUND, |pass| {
            if count > 0 {
                pass.set_pipeline(&self.pipeline);
                pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
                pass.draw(0..count, 0..1);
            }
        });
        output.present();
    }
}

fn create_vertex_buffer(device: &wgpu::Device, capacity: usize) -> wgpu::Buffer {
    let zeroed = vec![LineVertex { position: [0.0; 2] }; capacity];
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Line Vertices"),
        contents: bytemuck::cast_slice(&zeroed),
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
    })
}

impl Canvas for LineCanvas {
    fn size(&self) -> Vec2 {
        self.size
    }

    fn clear(&mut self) {
        self.vertices.clear();
    }

    fn dashed_line(&mut self, from: Vec2, to: Vec2) {
        for (a, b) in dash_segments(from, to, DASH_PATTERN) {
            let a = self.to_clip(a);
            let b = self.to_clip(b);
            self.vertices.push(LineVertex { position: a });
            self.vertices.push(LineVertex { position: b });
        }
    }
}

/// Radial spokes on a `LineCanvas`.
pub struct RadialVisualization {
    canvas: LineCanvas,
    radial: RadialRenderer,
}

impl RadialVisualization {
    pub fn new(gpu: GpuContext) -> Result<Self, RenderError> {
        Ok(Self {
            canvas: LineCanvas::new(gpu)?,
            radial: RadialRenderer::default(),
        })
    }
}

impl Visualization for RadialVisualization {
    fn draw(&mut self, snapshot: &SpectrumSnapshot) {
        self.radial.draw(&mut self.canvas, snapshot.bins());
        self.canvas.present();
    }

    fn resize(&mut self, size: winit::dpi::PhysicalSize<u32>) {
        self.canvas.gpu.resize(size);
    }
}
