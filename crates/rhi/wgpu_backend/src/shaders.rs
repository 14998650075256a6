//! Shader source catalog and the textual preprocessor applied before compile.
//!
//! Shader sources are WGSL templates carrying `#ifdef NAME` / `#else` /
//! `#endif` blocks for optional vertex attributes, uniforms, and samplers.
//! Pipeline creation derives the define list from the pipeline descriptor
//! (see [`rhi::validate_pipeline_interface`]) and filters the template with it
//! before handing the result to `create_shader_module`. The catalog ships
//! embedded defaults for every program; the platform layer may replace any
//! entry at backend construction time.

use rhi::PipelineProgram;
use std::borrow::Cow;
use std::collections::HashMap;

/// Maps programs to their WGSL template text.
pub struct ShaderCatalog {
    sources: HashMap<PipelineProgram, Cow<'static, str>>,
}

impl Default for ShaderCatalog {
    fn default() -> Self {
        let mut sources = HashMap::new();
        sources.insert(PipelineProgram::Unshaded, Cow::Borrowed(UNSHADED_WGSL));
        sources.insert(
            PipelineProgram::UnshadedPaletted,
            Cow::Borrowed(UNSHADED_PALETTED_WGSL),
        );
        sources.insert(
            PipelineProgram::PostprocessWipe,
            Cow::Borrowed(POSTPROCESS_WIPE_WGSL),
        );
        sources.insert(PipelineProgram::Postimg, Cow::Borrowed(POSTIMG_WGSL));
        Self { sources }
    }
}

impl ShaderCatalog {
    /// Template text for `program`.
    pub fn source(&self, program: PipelineProgram) -> &str {
        // Default covers every program variant; replaced entries shadow it.
        self.sources
            .get(&program)
            .map_or("", |source| source.as_ref())
    }

    /// Replace the template for `program` (platform-supplied source lookup).
    pub fn set_source(&mut self, program: PipelineProgram, source: String) {
        self.sources.insert(program, Cow::Owned(source));
    }
}

/// Filter a shader template against a define list.
///
/// `#ifdef NAME` keeps the following lines when `NAME` is in `defines`,
/// `#else` inverts, `#endif` pops. Blocks nest. Directive lines themselves are
/// dropped from the output. Unbalanced directives are a programming error in
/// the template and panic via assertion.
pub fn preprocess_shader(source: &str, defines: &[String]) -> String {
    let mut out = String::with_capacity(source.len());
    // Each frame: (this branch taken, parent active).
    let mut stack: Vec<(bool, bool)> = Vec::new();

    for line in source.lines() {
        let trimmed = line.trim_start();
        if let Some(name) = trimmed.strip_prefix("#ifdef ") {
            let parent_active = stack.last().is_none_or(|&(taken, parent)| taken && parent);
            let taken = defines.iter().any(|define| define == name.trim());
            stack.push((taken, parent_active));
        } else if trimmed.starts_with("#else") {
            let frame = stack.last_mut();
            assert!(frame.is_some(), "#else without matching #ifdef");
            if let Some((taken, _)) = frame {
                *taken = !*taken;
            }
        } else if trimmed.starts_with("#endif") {
            assert!(stack.pop().is_some(), "#endif without matching #ifdef");
        } else {
            let active = stack.iter().all(|&(taken, parent)| taken && parent);
            if active {
                out.push_str(line);
                out.push('\n');
            }
        }
    }
    assert!(stack.is_empty(), "unterminated #ifdef in shader template");
    out
}

const UNSHADED_WGSL: &str = r#"
// Vertex-colored, optionally textured geometry.

struct FrameUniforms {
    projection: mat4x4<f32>,
    modelview: mat4x4<f32>,
};

@group(0) @binding(0) var<uniform> u_frame: FrameUniforms;

#ifdef ENABLE_U_TEXCOORD0TRANSFORM
struct DrawUniforms {
    texcoord0_transform: mat4x4<f32>,
};

@group(1) @binding(0) var<uniform> u_draw: DrawUniforms;
#endif

#ifdef ENABLE_S_SAMPLER0
@group(2) @binding(0) var t_sampler0: texture_2d<f32>;
@group(2) @binding(1) var s_sampler0: sampler;
#endif

struct VsOut {
    @builtin(position) pos: vec4<f32>,
    @location(0) color: vec4<f32>,
#ifdef ENABLE_VA_TEXCOORD0
    @location(1) uv: vec2<f32>,
#endif
};

@vertex
fn vs_main(
    @location(0) position: vec3<f32>,
#ifdef ENABLE_VA_TEXCOORD0
    @location(1) texcoord0: vec2<f32>,
#endif
#ifdef ENABLE_VA_COLORS
    @location(2) colors: vec4<f32>,
#endif
) -> VsOut {
    var out: VsOut;
    out.pos = u_frame.projection * u_frame.modelview * vec4<f32>(position, 1.0);
#ifdef ENABLE_VA_COLORS
    out.color = colors;
#else
    out.color = vec4<f32>(1.0, 1.0, 1.0, 1.0);
#endif
#ifdef ENABLE_VA_TEXCOORD0
#ifdef ENABLE_U_TEXCOORD0TRANSFORM
    let uv = u_draw.texcoord0_transform * vec4<f32>(texcoord0, 0.0, 1.0);
    out.uv = uv.xy;
#else
    out.uv = texcoord0;
#endif
#endif
    return out;
}

@fragment
fn fs_main(in: VsOut) -> @location(0) vec4<f32> {
    var color = in.color;
#ifdef ENABLE_S_SAMPLER0
#ifdef ENABLE_VA_TEXCOORD0
    color = color * textureSample(t_sampler0, s_sampler0, in.uv);
#endif
#endif
    return color;
}
"#;

const UNSHADED_PALETTED_WGSL: &str = r#"
// Index+alpha textures resolved through palette and colormap lookup tables.

struct FrameUniforms {
    projection: mat4x4<f32>,
    modelview: mat4x4<f32>,
    texcoord0_transform: mat4x4<f32>,
};

struct DrawUniforms {
    // x: 1.0 when sampler0 is an index+alpha texture, 0.0 for plain RGBA.
    sampler0_is_indexed_alpha: vec4<f32>,
};

@group(0) @binding(0) var<uniform> u_frame: FrameUniforms;
@group(1) @binding(0) var<uniform> u_draw: DrawUniforms;

@group(2) @binding(0) var t_source: texture_2d<f32>;
@group(2) @binding(1) var s_source: sampler;
@group(2) @binding(2) var t_palette: texture_2d<f32>;
@group(2) @binding(3) var s_palette: sampler;
@group(2) @binding(4) var t_colormap: texture_2d<f32>;
@group(2) @binding(5) var s_colormap: sampler;

struct VsOut {
    @builtin(position) pos: vec4<f32>,
    @location(0) color: vec4<f32>,
    @location(1) uv: vec2<f32>,
};

@vertex
fn vs_main(
    @location(0) position: vec3<f32>,
    @location(1) texcoord0: vec2<f32>,
    @location(2) colors: vec4<f32>,
) -> VsOut {
    var out: VsOut;
    out.pos = u_frame.projection * u_frame.modelview * vec4<f32>(position, 1.0);
    let uv = u_frame.texcoord0_transform * vec4<f32>(texcoord0, 0.0, 1.0);
    out.uv = uv.xy;
    out.color = colors;
    return out;
}

@fragment
fn fs_main(in: VsOut) -> @location(0) vec4<f32> {
    let sampled = textureSample(t_source, s_source, in.uv);
    let index = i32(round(sampled.r * 255.0));
    let remapped = i32(round(textureLoad(t_colormap, vec2<i32>(index, 0), 0).r * 255.0));
    let palette_rgb = textureLoad(t_palette, vec2<i32>(remapped, 0), 0);
    let paletted = vec4<f32>(palette_rgb.rgb, sampled.g);
    let indexed = u_draw.sampler0_is_indexed_alpha.x > 0.5;
    let texel = select(sampled, paletted, indexed);
    return texel * in.color;
}
"#;

const POSTPROCESS_WIPE_WGSL: &str = r#"
// Per-pixel crossfade between two captured screens through a wipe mask.

struct FrameUniforms {
    projection: mat4x4<f32>,
    modelview: mat4x4<f32>,
};

struct DrawUniforms {
    // x: colorize mode (0 = plain crossfade, 1 = darken toward black first).
    wipe_colorize: vec4<f32>,
};

@group(0) @binding(0) var<uniform> u_frame: FrameUniforms;
@group(1) @binding(0) var<uniform> u_draw: DrawUniforms;

@group(2) @binding(0) var t_end: texture_2d<f32>;
@group(2) @binding(1) var s_end: sampler;
@group(2) @binding(2) var t_start: texture_2d<f32>;
@group(2) @binding(3) var s_start: sampler;
@group(2) @binding(4) var t_mask: texture_2d<f32>;
@group(2) @binding(5) var s_mask: sampler;

struct VsOut {
    @builtin(position) pos: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_main(
    @location(0) position: vec3<f32>,
    @location(1) texcoord0: vec2<f32>,
) -> VsOut {
    var out: VsOut;
    out.pos = u_frame.projection * u_frame.modelview * vec4<f32>(position, 1.0);
    out.uv = texcoord0;
    return out;
}

@fragment
fn fs_main(in: VsOut) -> @location(0) vec4<f32> {
    let start = textureSample(t_start, s_start, in.uv);
    let end = textureSample(t_end, s_end, in.uv);
    let mask = textureSample(t_mask, s_mask, in.uv).r;
    let colorized = mix(start, vec4<f32>(0.0, 0.0, 0.0, 1.0), mask * u_draw.wipe_colorize.x);
    return mix(colorized, end, mask);
}
"#;

const POSTIMG_WGSL: &str = r#"
// Full-screen blit with per-screen post effects.
// Effect ids: 0 none, 1 water, 2 heat, 3 flip, 4 mirror.

struct FrameUniforms {
    projection: mat4x4<f32>,
    modelview: mat4x4<f32>,
};

struct DrawUniforms {
    // x: effect id, y: animation phase in turns.
    postimg: vec4<f32>,
};

@group(0) @binding(0) var<uniform> u_frame: FrameUniforms;
@group(1) @binding(0) var<uniform> u_draw: DrawUniforms;

@group(2) @binding(0) var t_screen: texture_2d<f32>;
@group(2) @binding(1) var s_screen: sampler;

struct VsOut {
    @builtin(position) pos: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

const TAU: f32 = 6.2831853;

@vertex
fn vs_main(
    @location(0) position: vec3<f32>,
    @location(1) texcoord0: vec2<f32>,
) -> VsOut {
    var out: VsOut;
    out.pos = u_frame.projection * u_frame.modelview * vec4<f32>(position, 1.0);
    out.uv = texcoord0;
    return out;
}

@fragment
fn fs_main(in: VsOut) -> @location(0) vec4<f32> {
    let effect = i32(round(u_draw.postimg.x));
    let phase = u_draw.postimg.y * TAU;
    var uv = in.uv;
    if effect == 1 {
        uv.x = uv.x + sin(phase + uv.y * 8.0) * 0.0125;
    } else if effect == 2 {
        uv.x = uv.x + sin(phase + uv.y * 32.0) * 0.025;
    } else if effect == 3 {
        uv.y = 1.0 - uv.y;
    } else if effect == 4 {
        uv.x = 1.0 - uv.x;
    }
    uv = clamp(uv, vec2<f32>(0.0), vec2<f32>(1.0));
    return textureSample(t_screen, s_screen, uv);
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    fn defines(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| (*name).to_string()).collect()
    }

    #[test]
    fn undefined_blocks_are_dropped() {
        let source = "a\n#ifdef FOO\nb\n#endif\nc\n";
        assert_eq!(preprocess_shader(source, &[]), "a\nc\n");
    }

    #[test]
    fn defined_blocks_are_kept() {
        let source = "a\n#ifdef FOO\nb\n#endif\nc\n";
        assert_eq!(preprocess_shader(source, &defines(&["FOO"])), "a\nb\nc\n");
    }

    #[test]
    fn else_branches() {
        let source = "#ifdef FOO\nyes\n#else\nno\n#endif\n";
        assert_eq!(preprocess_shader(source, &defines(&["FOO"])), "yes\n");
        assert_eq!(preprocess_shader(source, &[]), "no\n");
    }

    #[test]
    fn nested_blocks_require_both_defines() {
        let source = "#ifdef A\n#ifdef B\nboth\n#endif\nouter\n#endif\n";
        assert_eq!(
            preprocess_shader(source, &defines(&["A", "B"])),
            "both\nouter\n"
        );
        assert_eq!(preprocess_shader(source, &defines(&["A"])), "outer\n");
        assert_eq!(preprocess_shader(source, &defines(&["B"])), "");
    }

    #[test]
    fn fully_enabled_unshaded_has_no_directives_left() {
        let filtered = preprocess_shader(
            UNSHADED_WGSL,
            &defines(&[
                "ENABLE_VA_TEXCOORD0",
                "ENABLE_VA_COLORS",
                "ENABLE_U_TEXCOORD0TRANSFORM",
                "ENABLE_S_SAMPLER0",
            ]),
        );
        assert!(!filtered.contains('#'));
        assert!(filtered.contains("textureSample"));
    }

    #[test]
    fn catalog_overrides_replace_defaults() {
        let mut catalog = ShaderCatalog::default();
        assert!(catalog.source(PipelineProgram::Unshaded).contains("vs_main"));
        catalog.set_source(PipelineProgram::Unshaded, "custom".to_string());
        assert_eq!(catalog.source(PipelineProgram::Unshaded), "custom");
    }
}
