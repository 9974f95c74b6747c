use std::path::{Path, PathBuf};

use tileworld_render::RenderError;

/// Textured geometry with a per-draw model matrix.
pub const STATIC_SHADER: &str = r#"
struct Camera {
    view: mat4x4<f32>,
    projection: mat4x4<f32>,
};

@group(0) @binding(0)
var<uniform> camera: Camera;

@group(1) @binding(0)
var material_texture: texture_2d<f32>;
@group(1) @binding(1)
var material_sampler: sampler;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) uv: vec2<f32>,
};

struct InstanceInput {
    @location(2) model_0: vec4<f32>,
    @location(3) model_1: vec4<f32>,
    @location(4) model_2: vec4<f32>,
    @location(5) model_3: vec4<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_main(vertex: VertexInput, instance: InstanceInput) -> VertexOutput {
    let model = mat4x4<f32>(
        instance.model_0,
        instance.model_1,
        instance.model_2,
        instance.model_3,
    );
    var out: VertexOutput;
    out.clip_position = camera.projection * camera.view * model * vec4<f32>(vertex.position, 1.0);
    out.uv = vertex.uv;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let color = textureSample(material_texture, material_sampler, in.uv);
    if color.a < 0.5 {
        discard;
    }
    return color;
}
"#;

/// A WGSL program the renderer can build a pipeline from.
///
/// The bind group layout is fixed: the camera uniform at group 0 and the
/// material texture and sampler at group 1. `uniforms` names the globals a
/// program must declare for that layout to match.
pub trait ShaderProgram {
    fn label(&self) -> &str;

    fn source(&self) -> &str;

    fn vertex_entry(&self) -> &str {
        "vs_main"
    }

    fn fragment_entry(&self) -> &str {
        "fs_main"
    }

    fn uniforms(&self) -> &[&'static str] {
        &["camera", "material_texture", "material_sampler"]
    }
}

/// The built-in textured program, or a replacement loaded from disk.
#[derive(Debug, Clone)]
pub struct StaticShader {
    source: String,
    origin: Option<PathBuf>,
}

impl Default for StaticShader {
    fn default() -> Self {
        Self {
            source: STATIC_SHADER.to_owned(),
            origin: None,
        }
    }
}

impl StaticShader {
    pub fn from_file(path: &Path) -> Result<Self, RenderError> {
        let source = std::fs::read_to_string(path).map_err(|e| {
            RenderError::ShaderCompile(format!("cannot read {}: {e}", path.display()))
        })?;
        Ok(Self {
            source,
            origin: Some(path.to_path_buf()),
        })
    }

    pub fn origin(&self) -> Option<&Path> {
        self.origin.as_deref()
    }
}

impl ShaderProgram for StaticShader {
    fn label(&self) -> &str {
        "static_shader"
    }

    fn source(&self) -> &str {
        &self.source
    }
}

/// Declared uniforms and entry points the source never mentions.
pub fn missing_symbols(program: &dyn ShaderProgram) -> Vec<String> {
    let src = program.source();
    let declares = |name: &str| {
        src.lines().any(|line| {
            let line = line.trim_start();
            (line.starts_with("var") || line.starts_with("fn "))
                && line
                    .split(|c: char| !(c.is_alphanumeric() || c == '_'))
                    .any(|tok| tok == name)
        })
    };
    let mut missing: Vec<String> = program
        .uniforms()
        .iter()
        .filter(|name| !declares(name))
        .map(|name| name.to_string())
        .collect();
    for entry in [program.vertex_entry(), program.fragment_entry()] {
        if !declares(entry) {
            missing.push(entry.to_owned());
        }
    }
    missing
}

/// Compile a program, turning WGSL validation failures into errors instead
/// of a device panic.
pub fn compile_program(
    device: &wgpu::Device,
    program: &dyn ShaderProgram,
) -> Result<wgpu::ShaderModule, RenderError> {
    let missing = missing_symbols(program);
    if !missing.is_empty() {
        return Err(RenderError::ShaderCompile(format!(
            "{}: missing {}",
            program.label(),
            missing.join(", ")
        )));
    }

    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(program.label()),
        source: wgpu::ShaderSource::Wgsl(program.source().into()),
    });
    if let Some(err) = pollster::block_on(device.pop_error_scope()) {
        return Err(RenderError::ShaderCompile(format!("{}: {err}", program.label())));
    }
    tracing::debug!(label = program.label(), "shader compiled");
    Ok(module)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Inline(&'static str);

    impl ShaderProgram for Inline {
        fn label(&self) -> &str {
            "inline"
        }
        fn source(&self) -> &str {
            self.0
        }
    }

    #[test]
    fn builtin_program_declares_everything() {
        assert!(missing_symbols(&StaticShader::default()).is_empty());
    }

    #[test]
    fn missing_sampler_is_reported() {
        let src = "var<uniform> camera: Camera;\nvar material_texture: texture_2d<f32>;\nfn vs_main() {}\nfn fs_main() {}";
        assert_eq!(missing_symbols(&Inline(src)), vec!["material_sampler".to_string()]);
    }

    #[test]
    fn missing_entry_point_is_reported() {
        let src = STATIC_SHADER.replace("fn fs_main", "fn fragment");
        let leaked: &'static str = Box::leak(src.into_boxed_str());
        assert_eq!(missing_symbols(&Inline(leaked)), vec!["fs_main".to_string()]);
    }

    #[test]
    fn shader_loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.wgsl");
        std::fs::write(&path, STATIC_SHADER).unwrap();
        let shader = StaticShader::from_file(&path).unwrap();
        assert_eq!(shader.source(), STATIC_SHADER);
        assert_eq!(shader.origin(), Some(path.as_path()));
    }

    #[test]
    fn unreadable_shader_file_is_a_compile_error() {
        let err = StaticShader::from_file(Path::new("/nonexistent/shader.wgsl")).unwrap_err();
        assert!(matches!(err, RenderError::ShaderCompile(_)));
    }
}
