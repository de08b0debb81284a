//! Spectrum renderers: radial spokes and the shader-driven amplitude field.

pub mod field;
pub mod gpu;
pub mod program;
pub mod radial;

pub use field::AmplitudeField;
pub use gpu::GpuContext;
pub use program::{ShaderError, ShaderProgram};
pub use radial::{Canvas, LineCanvas, RadialRenderer, RadialVisualization};

use crate::analyzer::SpectrumSnapshot;
use crate::cli::RendererKind;

/// Drawing surface dimensions, in pixels.
pub const CANVAS_WIDTH: u32 = 640;
pub const CANVAS_HEIGHT: u32 = 360;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Failed to create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),

    #[error("No suitable GPU adapter found: {0}")]
    RequestAdapter(#[from] wgpu::RequestAdapterError),

    #[error("Failed to create device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    #[error("Surface supports no usable format")]
    SurfaceUnsupported,

    #[error(transparent)]
    Shader(#[from] ShaderError),
}

impl RenderError {
    /// Whether the drawing surface itself could not be set up.
    pub fn is_graphics_init_failure(&self) -> bool {
        !matches!(self, RenderError::Shader(_))
    }
}

/// Something that turns one spectrum snapshot into one visual frame.
pub trait Visualization {
    fn draw(&mut self, snapshot: &SpectrumSnapshot);

    fn resize(&mut self, _size: winit::dpi::PhysicalSize<u32>) {}
}

/// Build the renderer variant selected on the command line.
pub fn build(kind: RendererKind, gpu: GpuContext, bins: usize) -> Result<Box<dyn Visualization>, RenderError> {
    Ok(match kind {
        RendererKind::Radial => Box::new(RadialVisualization::new(gpu)?),
        RendererKind::Field => Box::new(AmplitudeField::new(gpu, bins as u32)?),
    })
}
