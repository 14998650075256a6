//! Pipeline programs and their interface requirement tables.
//!
//! A [`PipelineProgram`] names a shader pair; the requirement table records
//! which vertex attributes, uniforms, and samplers each program needs and
//! which ones are optional (toggled per pipeline via injected defines). The
//! backend validates a [`crate::types::PipelineDesc`] against this table at
//! pipeline creation time: a descriptor that omits a required input, or names
//! one the program does not know, is rejected outright since draws through
//! such a pipeline would read undefined data.

use crate::types::{SamplerName, UniformName, VertexAttributeName};

/// Shader programs known to every backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineProgram {
    /// Plain vertex-colored, optionally textured geometry.
    Unshaded,
    /// Index+alpha textures resolved through palette and colormap LUTs.
    /// This is the program behind all batched 2D drawing.
    UnshadedPaletted,
    /// Crossfade/wipe between two captured screens through a mask texture.
    PostprocessWipe,
    /// Full-screen blit with per-screen post effects (water, heat, flip, mirror).
    Postimg,
}

impl PipelineProgram {
    /// Stable name used for shader source lookup and labels.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Unshaded => "unshaded",
            Self::UnshadedPaletted => "unshaded_paletted",
            Self::PostprocessWipe => "postprocess_wipe",
            Self::Postimg => "postimg",
        }
    }
}

/// Interface contract of one program.
#[derive(Debug, Clone, Default)]
pub struct ProgramRequirements {
    pub required_attributes: &'static [VertexAttributeName],
    pub optional_attributes: &'static [VertexAttributeName],
    pub required_uniforms: &'static [UniformName],
    pub optional_uniforms: &'static [UniformName],
    pub required_samplers: &'static [SamplerName],
    pub optional_samplers: &'static [SamplerName],
}

/// Look up the interface contract for `program`.
pub const fn program_requirements(program: PipelineProgram) -> ProgramRequirements {
    use SamplerName::*;
    use UniformName::*;
    use VertexAttributeName::*;

    match program {
        PipelineProgram::Unshaded => ProgramRequirements {
            required_attributes: &[Position],
            optional_attributes: &[TexCoord0, Colors],
            required_uniforms: &[Projection, ModelView],
            optional_uniforms: &[TexCoord0Transform],
            required_samplers: &[],
            optional_samplers: &[Sampler0],
        },
        PipelineProgram::UnshadedPaletted => ProgramRequirements {
            required_attributes: &[Position, TexCoord0, Colors],
            optional_attributes: &[],
            required_uniforms: &[
                Projection,
                ModelView,
                TexCoord0Transform,
                Sampler0IsIndexedAlpha,
            ],
            optional_uniforms: &[],
            // sampler0 = source image, sampler1 = palette, sampler2 = colormap
            required_samplers: &[Sampler0, Sampler1, Sampler2],
            optional_samplers: &[],
        },
        PipelineProgram::PostprocessWipe => ProgramRequirements {
            required_attributes: &[Position, TexCoord0],
            optional_attributes: &[],
            required_uniforms: &[Projection, ModelView, WipeColorizeMode],
            optional_uniforms: &[],
            // sampler0 = end screen, sampler1 = start screen, sampler2 = mask
            required_samplers: &[Sampler0, Sampler1, Sampler2],
            optional_samplers: &[],
        },
        PipelineProgram::Postimg => ProgramRequirements {
            required_attributes: &[Position, TexCoord0],
            optional_attributes: &[],
            required_uniforms: &[Projection, ModelView, PostimgEffect],
            optional_uniforms: &[],
            required_samplers: &[Sampler0],
            optional_samplers: &[],
        },
    }
}

/// Validate a pipeline's declared inputs against the program contract.
///
/// Returns, on success, the list of `ENABLE_*` defines to inject into the
/// shader source for the optional inputs the descriptor actually enables.
///
/// # Errors
/// Fails when a required input is missing or an unknown input is declared.
pub fn validate_pipeline_interface(
    program: PipelineProgram,
    attributes: &[VertexAttributeName],
    uniforms: &[UniformName],
    samplers: &[SamplerName],
) -> anyhow::Result<Vec<String>> {
    let reqs = program_requirements(program);
    let mut defines = Vec::new();

    check_set(
        "vertex attribute",
        program,
        attributes,
        reqs.required_attributes,
        reqs.optional_attributes,
        &mut defines,
        |name| format!("ENABLE_VA_{name:?}").to_uppercase(),
    )?;
    check_set(
        "uniform",
        program,
        uniforms,
        reqs.required_uniforms,
        reqs.optional_uniforms,
        &mut defines,
        |name| format!("ENABLE_U_{name:?}").to_uppercase(),
    )?;
    check_set(
        "sampler",
        program,
        samplers,
        reqs.required_samplers,
        reqs.optional_samplers,
        &mut defines,
        |name| format!("ENABLE_S_{name:?}").to_uppercase(),
    )?;

    Ok(defines)
}

fn check_set<T: PartialEq + Copy + core::fmt::Debug>(
    kind: &str,
    program: PipelineProgram,
    declared: &[T],
    required: &[T],
    optional: &[T],
    defines: &mut Vec<String>,
    define_name: impl Fn(T) -> String,
) -> anyhow::Result<()> {
    for item in required {
        anyhow::ensure!(
            declared.contains(item),
            "pipeline for program '{}' is missing required {kind} {item:?}",
            program.name()
        );
    }
    for item in declared {
        anyhow::ensure!(
            required.contains(item) || optional.contains(item),
            "pipeline for program '{}' declares {kind} {item:?} the program does not use",
            program.name()
        );
        if optional.contains(item) {
            defines.push(define_name(*item));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SamplerName, UniformName, VertexAttributeName};

    #[test]
    fn paletted_program_accepts_exact_interface() {
        let defines = validate_pipeline_interface(
            PipelineProgram::UnshadedPaletted,
            &[
                VertexAttributeName::Position,
                VertexAttributeName::TexCoord0,
                VertexAttributeName::Colors,
            ],
            &[
                UniformName::Projection,
                UniformName::ModelView,
                UniformName::TexCoord0Transform,
                UniformName::Sampler0IsIndexedAlpha,
            ],
            &[
                SamplerName::Sampler0,
                SamplerName::Sampler1,
                SamplerName::Sampler2,
            ],
        )
        .expect("exact interface must validate");
        // No optional inputs on this program, so no defines either.
        assert!(defines.is_empty());
    }

    #[test]
    fn missing_required_uniform_is_rejected() {
        let result = validate_pipeline_interface(
            PipelineProgram::UnshadedPaletted,
            &[
                VertexAttributeName::Position,
                VertexAttributeName::TexCoord0,
                VertexAttributeName::Colors,
            ],
            &[UniformName::Projection],
            &[
                SamplerName::Sampler0,
                SamplerName::Sampler1,
                SamplerName::Sampler2,
            ],
        );
        assert!(result.is_err());
    }

    #[test]
    fn unknown_sampler_is_rejected() {
        let result = validate_pipeline_interface(
            PipelineProgram::Postimg,
            &[
                VertexAttributeName::Position,
                VertexAttributeName::TexCoord0,
            ],
            &[
                UniformName::Projection,
                UniformName::ModelView,
                UniformName::PostimgEffect,
            ],
            &[SamplerName::Sampler0, SamplerName::Sampler3],
        );
        assert!(result.is_err());
    }

    #[test]
    fn optional_inputs_produce_defines() {
        let defines = validate_pipeline_interface(
            PipelineProgram::Unshaded,
            &[
                VertexAttributeName::Position,
                VertexAttributeName::TexCoord0,
            ],
            &[
                UniformName::Projection,
                UniformName::ModelView,
                UniformName::TexCoord0Transform,
            ],
            &[SamplerName::Sampler0],
        )
        .expect("optional interface must validate");
        assert!(defines.contains(&"ENABLE_VA_TEXCOORD0".to_string()));
        assert!(defines.contains(&"ENABLE_U_TEXCOORD0TRANSFORM".to_string()));
        assert!(defines.contains(&"ENABLE_S_SAMPLER0".to_string()));
    }
}
