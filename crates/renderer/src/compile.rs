//! GLSL payload shaders and their compilation.
//!
//! Shaders go through naga's GLSL frontend. `create_shader_module` reports
//! validation problems through the device error scope rather than a return
//! value, so compilation is bracketed with a scope and the captured error is
//! surfaced as a plain `Err`; a broken payload must stop the render worker,
//! not the process.

use std::borrow::Cow;

use anyhow::{anyhow, Result};
use wgpu::naga::ShaderStage;

/// Uniform block shared by every payload. The layout must match
/// [`crate::pipeline::PayloadUniforms`].
const PARAMS_BLOCK_GLSL: &str = r"layout(std140, set = 0, binding = 0) uniform FrameParams {
    mat4 mvp;
    vec4 clock;       // x: seconds, y: delta, z: frame index, w: aspect
    vec4 resolution;  // x: width, y: height (physical pixels)
} params;
";

/// Compiles a GLSL stage, turning device-side validation errors into `Err`.
pub(crate) fn compile_shader(
    device: &wgpu::Device,
    label: &str,
    source: String,
    stage: ShaderStage,
) -> Result<wgpu::ShaderModule> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Owned(source),
            stage,
            defines: &[],
        },
    });
    if let Some(err) = pollster::block_on(device.pop_error_scope()) {
        return Err(anyhow!("shader '{label}' failed to compile: {err}"));
    }
    Ok(module)
}

pub(crate) fn triangle_vertex_source() -> String {
    format!(
        r"#version 450
layout(location = 0) in vec2 a_pos;
layout(location = 1) in vec3 a_color;
layout(location = 0) out vec3 v_color;

{PARAMS_BLOCK_GLSL}
void main() {{
    v_color = a_color;
    gl_Position = params.mvp * vec4(a_pos, 0.0, 1.0);
}}
"
    )
}

pub(crate) fn triangle_fragment_source() -> String {
    r"#version 450
layout(location = 0) in vec3 v_color;
layout(location = 0) out vec4 outColor;

void main() {
    outColor = vec4(v_color, 1.0);
}
"
    .to_string()
}

/// Full-screen triangle used by fragment payloads; `v_uv` spans 0..1 with the
/// origin at the top-left, matching the top-to-bottom capture convention.
pub(crate) fn fullscreen_vertex_source() -> String {
    r"#version 450
layout(location = 0) out vec2 v_uv;

const vec2 positions[3] = vec2[3](
    vec2(-1.0, -3.0),
    vec2(3.0, 1.0),
    vec2(-1.0, 1.0)
);

void main() {
    uint vertex_index = uint(gl_VertexIndex);
    vec2 pos = positions[vertex_index];
    v_uv = vec2(pos.x, -pos.y) * 0.5 + vec2(0.5, 0.5);
    gl_Position = vec4(pos, 0.0, 1.0);
}
"
    .to_string()
}

/// Produces a self-contained fragment shader from a caller payload.
///
/// Strips any `#version` directive from the user source, prepends the uniform
/// block plus the `uTime`/`uFrame`/`uResolution` macro aliases, and appends a
/// `main` that delegates to the payload's `mainImage`.
pub(crate) fn wrap_fragment_payload(source: &str) -> String {
    let mut sanitized = String::new();
    let mut skipped_version = false;
    for line in source.lines() {
        if !skipped_version && line.trim_start().starts_with("#version") {
            skipped_version = true;
            continue;
        }
        sanitized.push_str(line);
        sanitized.push('\n');
    }

    format!(
        r"#version 450
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 outColor;

{PARAMS_BLOCK_GLSL}
#define uTime params.clock.x
#define uTimeDelta params.clock.y
#define uFrame int(params.clock.z)
#define uAspect params.clock.w
#define uResolution params.resolution.xy

#line 1
{sanitized}
void main() {{
    vec4 color = vec4(0.0);
    mainImage(color, v_uv * uResolution);
    outColor = color;
}}
"
    )
}
