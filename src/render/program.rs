//! WGSL compilation with errors reported as values.
//!
//! wgpu reports shader errors through its uncaptured error handler, which
//! panics by default. Running naga up front turns a bad shader into a
//! `ShaderError` carrying the diagnostic text instead.

use std::borrow::Cow;

use naga::front::wgsl;
use naga::valid::{Capabilities, ValidationFlags, Validator};

pub const VERTEX_ENTRY: &str = "vs_main";
pub const FRAGMENT_ENTRY: &str = "fs_main";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ShaderError {
    #[error("{label}: failed to compile\n{diagnostic}")]
    Compile { label: String, diagnostic: String },

    #[error("{label}: failed to link\n{diagnostic}")]
    Link { label: String, diagnostic: String },
}

impl ShaderError {
    pub fn diagnostic(&self) -> &str {
        match self {
            ShaderError::Compile { diagnostic, .. } | ShaderError::Link { diagnostic, .. } => {
                diagnostic
            }
        }
    }
}

/// A validated vertex + fragment program.
#[derive(Debug)]
pub struct ShaderProgram {
    label: String,
    source: Cow<'static, str>,
}

impl ShaderProgram {
    #[cfg(test)]
    fn label(&self) -> &str {
        &self.label
    }

    pub fn create_module(&self, device: &wgpu::Device) -> wgpu::ShaderModule {
        device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&self.label),
            source: wgpu::ShaderSource::Wgsl(self.source.clone()),
        })
    }
}

/// Parse and validate `source`, and check it has both pipeline entry points.
pub fn compile(
    label: &str,
    source: impl Into<Cow<'static, str>>,
) -> Result<ShaderProgram, ShaderError> {
    let source = source.into();

    let module = wgsl::parse_str(&source).map_err(|e| ShaderError::Compile {
        label: label.to_owned(),
        diagnostic: e.emit_to_string(&source),
    })?;

    Validator::new(ValidationFlags::all(), Capabilities::all())
        .validate(&module)
        .map_err(|e| ShaderError::Link {
            label: label.to_owned(),
            diagnostic: e.emit_to_string(&source),
        })?;

    for (name, stage) in [
        (VERTEX_ENTRY, naga::ShaderStage::Vertex),
        (FRAGMENT_ENTRY, naga::ShaderStage::Fragment),
    ] {
        if !module
            .entry_points
            .iter()
            .any(|ep| ep.name == name && ep.stage == stage)
        {
            return Err(ShaderError::Link {
                label: label.to_owned(),
                diagnostic: format!("missing {stage:?} entry point `{name}`"),
            });
        }
    }

    log::debug!("Compiled shader program {label}");
    Ok(ShaderProgram {
        label: label.to_owned(),
        source,
    })
}

/// Like [`compile`], but logs the diagnostic on failure.
pub fn compile_logged(
    label: &str,
    source: impl Into<Cow<'static, str>>,
) -> Result<ShaderProgram, ShaderError> {
    compile(label, source).inspect_err(|e| log::error!("{e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        @vertex
        fn vs_main(@location(0) p: vec2<f32>) -> @builtin(position) vec4<f32> {
            return vec4<f32>(p, 0.0, 1.0);
        }

        @fragment
        fn fs_main() -> @location(0) vec4<f32> {
            return vec4<f32>(1.0, 0.5, 0.0, 1.0);
        }
    "#;

    #[test]
    fn valid_program_compiles() {
        let program = compile("minimal", MINIMAL).unwrap();
        assert_eq!(program.label(), "minimal");
    }

    #[test]
    fn syntax_error_is_a_compile_error_with_diagnostic() {
        let err = compile("broken", "fn vs_main( -> {").unwrap_err();
        assert!(matches!(err, ShaderError::Compile { .. }));
        assert!(!err.diagnostic().is_empty());
    }

    #[test]
    fn type_error_is_rejected() {
        let source = r#"
            @vertex
            fn vs_main() -> @builtin(position) vec4<f32> {
                return vec4<f32>(0.0, 0.0, 0.0, 1.0);
            }

            @fragment
            fn fs_main() -> @location(0) vec4<f32> {
                let y: u32 = 1.0f;
                return vec4<f32>(f32(y), 0.0, 0.0, 1.0);
            }
        "#;
        let err = compile("mistyped", source).unwrap_err();
        assert!(matches!(err, ShaderError::Compile { .. }));
        assert!(!err.diagnostic().is_empty());
    }

    #[test]
    fn missing_fragment_stage_fails_to_link() {
        let source = r#"
            @vertex
            fn vs_main() -> @builtin(position) vec4<f32> {
                return vec4<f32>(0.0, 0.0, 0.0, 1.0);
            }
        "#;
        let err = compile("vertex-only", source).unwrap_err();
        assert!(matches!(err, ShaderError::Link { .. }));
        assert!(err.diagnostic().contains("fs_main"));
    }

    #[test]
    fn bundled_shaders_compile() {
        compile("field", super::super::field::SHADER_SOURCE).unwrap();
        compile("radial", super::super::radial::SHADER_SOURCE).unwrap();
    }
}
