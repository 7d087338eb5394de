use std::borrow::Cow;

use anyhow::{anyhow, Result};
use wgpu::naga::front::glsl;
use wgpu::naga::valid::{Capabilities, ValidationFlags, Validator};
use wgpu::naga::ShaderStage;

/// Uniform names whose presence suppresses the header injection.
const RESOLUTION_TOKEN: &str = "iResolution";
const TIME_TOKEN: &str = "iTime";

/// Substring marking a user-supplied entry point.
const ENTRY_POINT_TOKEN: &str = "void main(";

/// Compiles the static full-screen triangle vertex shader.
pub(crate) fn compile_vertex_shader(device: &wgpu::Device) -> Result<wgpu::ShaderModule> {
    Ok(device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("fullscreen triangle vertex"),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Borrowed(VERTEX_SHADER_GLSL),
            stage: ShaderStage::Vertex,
            defines: &[],
        },
    }))
}

/// Wraps the user fragment source and compiles it as GLSL.
///
/// The wrapped text is parsed and validated through the `naga` front end
/// before any device object is created, so a broken edit comes back as an
/// `Err` carrying the compiler's diagnostic instead of a device error.
pub(crate) fn compile_fragment_shader(
    device: &wgpu::Device,
    source: &str,
) -> Result<wgpu::ShaderModule> {
    let wrapped = wrap_fragment_source(source);
    validate_glsl(&wrapped, ShaderStage::Fragment)?;

    Ok(device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("deck fragment"),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Owned(wrapped),
            stage: ShaderStage::Fragment,
            defines: &[],
        },
    }))
}

/// Produces compilable fragment source from raw user text.
///
/// Two independent injections:
///
/// 1. If the text references neither `iResolution` nor `iTime` in full,
///    prepend [`UNIFORM_HEADER`], which declares the built-in uniform block
///    and aliases the conventional names onto it.
/// 2. If the text does not define `void main(`, append [`ENTRY_FOOTER`],
///    a minimal entry point that remaps `gl_FragCoord` to a bottom-left
///    origin and delegates to `mainImage`.
///
/// A shader that declares one recognized uniform name itself while lacking
/// the other still receives the header; the resulting duplicate-declaration
/// diagnostic is surfaced by the compiler rather than silently suppressed.
pub(crate) fn wrap_fragment_source(source: &str) -> String {
    let needs_header = !(source.contains(RESOLUTION_TOKEN) && source.contains(TIME_TOKEN));
    let needs_entry = !source.contains(ENTRY_POINT_TOKEN);

    let mut wrapped = String::with_capacity(
        source.len() + UNIFORM_HEADER.len() + ENTRY_FOOTER.len(),
    );
    if needs_header {
        wrapped.push_str(UNIFORM_HEADER);
    }
    wrapped.push_str(source);
    if needs_entry {
        wrapped.push_str(ENTRY_FOOTER);
    }
    wrapped
}

fn validate_glsl(source: &str, stage: ShaderStage) -> Result<()> {
    let mut frontend = glsl::Frontend::default();
    let module = frontend
        .parse(&glsl::Options::from(stage), source)
        .map_err(|errors| {
            anyhow!(
                "shader compile failed:\n{}",
                errors.emit_to_string(source)
            )
        })?;

    Validator::new(ValidationFlags::all(), Capabilities::all())
        .validate(&module)
        .map_err(|err| {
            anyhow!(
                "shader validation failed:\n{}",
                err.emit_to_string(source)
            )
        })?;

    Ok(())
}

/// GLSL prologue declaring the built-in uniforms.
///
/// The block layout must match `DeckUniforms` in `gpu/uniforms.rs`: the
/// scalar time packs into the tail of the resolution vec3 under std140.
/// The `#define` aliases keep the conventional names working without loose
/// uniforms, which would not survive the explicit pipeline layout.
const UNIFORM_HEADER: &str = r"#version 450
layout(location = 0) in vec2 v_uv;

layout(std140, set = 0, binding = 0) uniform DeckParams {
    vec3 _iResolution;
    float _iTime;
    vec4 _iMouse;
    int _iFrame;
    float _pad0;
    vec2 _pad1;
} ubo;

#define iResolution ubo._iResolution
#define iTime ubo._iTime
#define iFrame ubo._iFrame
#define iMouse ubo._iMouse

";

/// GLSL epilogue supplying the entry point for `mainImage`-convention
/// shaders. `gl_FragCoord` is top-left in wgpu, so the Y remap keeps the
/// conventional bottom-left coordinate space.
const ENTRY_FOOTER: &str = r"
layout(location = 0) out vec4 fragColor;
void main() {
    vec2 fragCoord = vec2(gl_FragCoord.x, iResolution.y - gl_FragCoord.y);
    vec4 color = vec4(0.0);
    mainImage(color, fragCoord);
    fragColor = color;
}
";

/// Minimal full-screen triangle vertex shader; positions come straight from
/// the vertex index, so no vertex buffer exists anywhere in the program.
const VERTEX_SHADER_GLSL: &str = r"#version 450
layout(location = 0) out vec2 v_uv;

const vec2 positions[3] = vec2[3](
    vec2(-1.0, -1.0),
    vec2(3.0, -1.0),
    vec2(-1.0, 3.0)
);

void main() {
    uint vertex_index = uint(gl_VertexIndex);
    vec2 pos = positions[vertex_index];
    v_uv = pos * 0.5 + vec2(0.5, 0.5);
    gl_Position = vec4(pos, 0.0, 1.0);
}
";

#[cfg(test)]
mod tests {
    use super::*;

    // References both recognized names without declaring them; the injection
    // heuristic reads that as "author declares their own".
    const BOTH_TOKENS_BODY: &str = r"void mainImage(out vec4 fragColor, in vec2 fragCoord) {
    vec2 uv = fragCoord / iResolution.xy;
    fragColor = vec4(uv, 0.5 + 0.5 * sin(iTime), 1.0);
}
";

    // References only the time uniform, so the header is injected.
    const TIME_ONLY_BODY: &str = r"void mainImage(out vec4 fragColor, in vec2 fragCoord) {
    vec2 p = fragCoord * 0.005;
    fragColor = vec4(0.5 + 0.5 * sin(p.x + iTime), 0.5 + 0.5 * cos(p.y), 0.6, 1.0);
}
";

    #[test]
    fn injects_header_when_both_tokens_are_missing() {
        let wrapped = wrap_fragment_source("void mainImage(out vec4 c, in vec2 p) { c = vec4(1.0); }");
        assert!(wrapped.contains("uniform DeckParams"));
    }

    #[test]
    fn injects_header_when_only_one_token_is_present() {
        // The other recognized name is absent, so the injection still fires;
        // a clashing user declaration surfaces as a compile diagnostic.
        let wrapped = wrap_fragment_source(
            "uniform float iTime;\nvoid mainImage(out vec4 c, in vec2 p) { c = vec4(sin(iTime)); }",
        );
        assert!(wrapped.contains("uniform DeckParams"));
    }

    #[test]
    fn skips_header_when_both_tokens_are_present() {
        let wrapped = wrap_fragment_source(BOTH_TOKENS_BODY);
        assert!(!wrapped.contains("uniform DeckParams"));
    }

    #[test]
    fn self_contained_source_passes_through_unchanged() {
        let source = "\
#version 450
layout(std140, set = 0, binding = 0) uniform DeckParams {
    vec3 _iResolution;
    float _iTime;
    vec4 _iMouse;
    int _iFrame;
    float _pad0;
    vec2 _pad1;
} ubo;
#define iResolution ubo._iResolution
#define iTime ubo._iTime
layout(location = 0) out vec4 outColor;
void main() {
    outColor = vec4(fract(iTime), iResolution.x, 0.0, 1.0);
}
";
        assert_eq!(wrap_fragment_source(source), source);
    }

    #[test]
    fn appends_exactly_one_entry_point() {
        let wrapped = wrap_fragment_source(TIME_ONLY_BODY);
        assert_eq!(wrapped.matches("void main(").count(), 1);
        assert!(wrapped.ends_with(ENTRY_FOOTER));
    }

    #[test]
    fn user_entry_point_is_not_wrapped() {
        let source = "layout(location = 0) out vec4 c;\nvoid main() { c = vec4(iTime, iResolution.xy, 1.0); }\n";
        let wrapped = wrap_fragment_source(source);
        assert_eq!(wrapped.matches("void main(").count(), 1);
        assert!(!wrapped.contains("mainImage"));
    }

    #[test]
    fn wrapped_main_image_shader_validates() {
        let wrapped = wrap_fragment_source(TIME_ONLY_BODY);
        validate_glsl(&wrapped, ShaderStage::Fragment).unwrap();
    }

    #[test]
    fn vertex_stage_validates() {
        validate_glsl(VERTEX_SHADER_GLSL, ShaderStage::Vertex).unwrap();
    }

    #[test]
    fn broken_source_yields_a_diagnostic() {
        let wrapped = wrap_fragment_source(
            "void mainImage(out vec4 c, in vec2 p) { c = vec4(1.0) }", // missing semicolon
        );
        let err = validate_glsl(&wrapped, ShaderStage::Fragment).unwrap_err();
        assert!(!err.to_string().trim().is_empty());
    }

    #[test]
    fn undefined_symbol_yields_a_diagnostic() {
        let wrapped = wrap_fragment_source(
            "void mainImage(out vec4 c, in vec2 p) { c = texelFetchNope(p); }",
        );
        assert!(validate_glsl(&wrapped, ShaderStage::Fragment).is_err());
    }
}
