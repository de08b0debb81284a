use wgpu::util::DeviceExt;

use super::gpu::GpuContext;
use super::{program, RenderError, Visualization};
use crate::analyzer::SpectrumSnapshot;

pub const SHADER_SOURCE: &str = include_str!("shaders/field.wgsl");

/// Full-screen quad as a triangle strip.
const QUAD: [[f32; 2]; 4] = [[-1.0, -1.0], [-1.0, 1.0], [1.0, -1.0], [1.0, 1.0]];

/// Uniform parameters sent to the shader.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
struct Params {
    resolution: [f32; 2],
    bins: u32,
    // Pad to 16 bytes (minimum uniform buffer alignment)
    _pad: u32,
}

/// Shader-driven amplitude bars fed by a 1-D spectrum texture.
pub struct AmplitudeField {
    gpu: GpuContext,
    pipeline: wgpu::RenderPipeline,
    vertex_buffer: wgpu::Buffer,
    spectrum_texture: wgpu::Texture,
    params_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    bins: u32,
}

impl AmplitudeField {
    pub fn new(gpu: GpuContext, bins: u32) -> Result<Self, RenderError> {
        let program = program::compile_logged("Field Shader", SHADER_SOURCE)?;
        let shader = program.create_module(&gpu.device);
        let device = &gpu.device;

        // ---------------------------------------------------------------
        // --- GPU resources ---
        // ---------------------------------------------------------------
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Quad"),
            contents: bytemuck::cast_slice(&QUAD),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let spectrum_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Spectrum"),
            size: wgpu::Extent3d {
                width: bins.max(1),
                height: 1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D1,
            format: wgpu::TextureFormat::R8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let spectrum_view = spectrum_texture.create_view(&wgpu::TextureViewDescriptor::default());

        // Resolution is constant between resizes, so it is written here and
        // in `resize` rather than before every draw.
        let params_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Params"),
            contents: bytemuck::bytes_of(&params_for(gpu.size(), bins)),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        // --- Bind group ---
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: false },
                        view_dimension: wgpu::TextureViewDimension::D1,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Bind Group"),
            layout: &bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&spectrum_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: params_buffer.as_entire_binding(),
                },
            ],
        });

        // --- Pipeline ---
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Render Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some(program::VERTEX_ENTRY),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<[f32; 2]>() as wgpu::BufferAddress,
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
                topology: wgpu::PrimitiveTopology::TriangleStrip,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        Ok(Self {
            gpu,
            pipeline,
            vertex_buffer,
            spectrum_texture,
            params_buffer,
            bind_group,
            bins,
        })
    }

    fn upload_spectrum(&self, bins: &[u8]) {
        let width = (bins.len() as u32).min(self.bins);
        if width == 0 {
            return;
        }
        self.gpu.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.spectrum_texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &bins[..width as usize],
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width),
                rows_per_image: None,
            },
            wgpu::Extent3d {
                width,
                height: 1,
                depth_or_array_layers: 1,
            },
        );
    }
}

fn params_for((width, height): (u32, u32), bins: u32) -> Params {
    Params {
        resolution: [width as f32, height as f32],
        bins,
        _pad: 0,
    }
}

impl Visualization for AmplitudeField {
    fn draw(&mut self, snapshot: &SpectrumSnapshot) {
        self.upload_spectrum(snapshot.bins());

        let Some(output) = self.gpu.acquire() else {
            return;
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.gpu.clear_and_draw(&view, wgpu::Color::BLACK, |pass| {
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &self.bind_group, &[]);
            pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
            pass.draw(0..QUAD.len() as u32, 0..1);
        });
        output.present();
    }

    fn resize(&mut self, size: winit::dpi::PhysicalSize<u32>) {
        if self.gpu.resize(size) {
            self.gpu.queue.write_buffer(
                &self.params_buffer,
                0,
                bytemuck::bytes_of(&params_for(self.gpu.size(), self.bins)),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_fill_one_uniform_slot() {
        assert_eq!(std::mem::size_of::<Params>(), 16);
        let params = params_for((640, 360), 256);
        assert_eq!(params.resolution, [640.0, 360.0]);
        assert_eq!(params.bins, 256);
    }

    #[test]
    fn quad_covers_clip_space() {
        let xs: Vec<f32> = QUAD.iter().map(|p| p[0]).collect();
        let ys: Vec<f32> = QUAD.iter().map(|p| p[1]).collect();
        assert!(xs.contains(&-1.0) && xs.contains(&1.0));
        assert!(ys.contains(&-1.0) && ys.contains(&1.0));
    }
}
