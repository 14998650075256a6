//! Pipeline construction: descriptor translation, interface validation, and
//! shader compilation.
//!
//! Every rhi pipeline compiles to two wgpu pipelines, one per color target
//! format the backend renders to (offscreen RGBA targets and the presentation
//! surface). The replay step picks the right one from the pass it is in.

use crate::error::with_validation_scope;
use crate::shaders::{ShaderCatalog, preprocess_shader};
use anyhow::Result as AnyResult;
use rhi::{
    BlendMode, PipelineDesc, PrimitiveType, UniformData, VertexAttributeFormat,
    VertexAttributeName, validate_pipeline_interface,
};
use std::borrow::Cow;
use wgpu::*;

/// Offscreen color target format used by every renderable rhi texture.
pub(crate) const OFFSCREEN_FORMAT: TextureFormat = TextureFormat::Rgba8Unorm;

/// Depth/stencil format behind every rhi renderbuffer.
pub(crate) const DEPTH_FORMAT: TextureFormat = TextureFormat::Depth24PlusStencil8;

/// Compiled state for one rhi pipeline.
pub(crate) struct PipelineData {
    /// Variant targeting the presentation surface format.
    pub(crate) presentation: RenderPipeline,
    /// Variant targeting offscreen RGBA textures.
    pub(crate) offscreen: RenderPipeline,
    /// Sampler bind group layout, shared with binding set creation.
    pub(crate) sampler_layout: BindGroupLayout,
    pub(crate) sampler_count: usize,
}

pub(crate) fn map_texture_format(format: rhi::TextureFormat) -> TextureFormat {
    match format {
        rhi::TextureFormat::Rgba8 => TextureFormat::Rgba8Unorm,
        rhi::TextureFormat::IndexAlpha8 => TextureFormat::Rg8Unorm,
        rhi::TextureFormat::R8 => TextureFormat::R8Unorm,
    }
}

fn map_attribute_format(format: VertexAttributeFormat) -> VertexFormat {
    match format {
        VertexAttributeFormat::Float2 => VertexFormat::Float32x2,
        VertexAttributeFormat::Float3 => VertexFormat::Float32x3,
        VertexAttributeFormat::Float4 => VertexFormat::Float32x4,
    }
}

/// Fixed shader locations per attribute name; templates declare the same ones.
const fn attribute_location(name: VertexAttributeName) -> u32 {
    match name {
        VertexAttributeName::Position => 0,
        VertexAttributeName::TexCoord0 => 1,
        VertexAttributeName::Colors => 2,
    }
}

fn map_blend(blend: BlendMode) -> Option<BlendState> {
    let component = |src, dst, op| BlendComponent {
        src_factor: src,
        dst_factor: dst,
        operation: op,
    };
    match blend {
        BlendMode::Opaque => None,
        BlendMode::Alpha => Some(BlendState {
            color: component(
                BlendFactor::SrcAlpha,
                BlendFactor::OneMinusSrcAlpha,
                BlendOperation::Add,
            ),
            alpha: component(
                BlendFactor::One,
                BlendFactor::OneMinusSrcAlpha,
                BlendOperation::Add,
            ),
        }),
        BlendMode::Additive => Some(BlendState {
            color: component(BlendFactor::SrcAlpha, BlendFactor::One, BlendOperation::Add),
            alpha: component(BlendFactor::One, BlendFactor::One, BlendOperation::Add),
        }),
        BlendMode::Subtractive => Some(BlendState {
            color: component(
                BlendFactor::SrcAlpha,
                BlendFactor::One,
                BlendOperation::ReverseSubtract,
            ),
            alpha: component(BlendFactor::One, BlendFactor::One, BlendOperation::Add),
        }),
        BlendMode::ReverseSubtractive => Some(BlendState {
            color: component(
                BlendFactor::SrcAlpha,
                BlendFactor::One,
                BlendOperation::Subtract,
            ),
            alpha: component(BlendFactor::One, BlendFactor::One, BlendOperation::Add),
        }),
        BlendMode::Modulate => Some(BlendState {
            color: component(BlendFactor::Dst, BlendFactor::Zero, BlendOperation::Add),
            alpha: component(BlendFactor::DstAlpha, BlendFactor::Zero, BlendOperation::Add),
        }),
    }
}

/// Bind group layout for one uniform set: a single uniform buffer.
pub(crate) fn build_uniform_layout(device: &Device) -> BindGroupLayout {
    device.create_bind_group_layout(&BindGroupLayoutDescriptor {
        label: Some("rhi-uniform-set-layout"),
        entries: &[BindGroupLayoutEntry {
            binding: 0,
            visibility: ShaderStages::VERTEX_FRAGMENT,
            ty: BindingType::Buffer {
                ty: BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
    })
}

/// Bind group layout for `count` sampler slots: (texture, sampler) pairs.
fn build_sampler_layout(device: &Device, count: usize) -> BindGroupLayout {
    let mut entries = Vec::with_capacity(count * 2);
    for slot in 0..count as u32 {
        entries.push(BindGroupLayoutEntry {
            binding: slot * 2,
            visibility: ShaderStages::FRAGMENT,
            ty: BindingType::Texture {
                sample_type: TextureSampleType::Float { filterable: true },
                view_dimension: TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        });
        entries.push(BindGroupLayoutEntry {
            binding: slot * 2 + 1,
            visibility: ShaderStages::FRAGMENT,
            ty: BindingType::Sampler(SamplerBindingType::Filtering),
            count: None,
        });
    }
    device.create_bind_group_layout(&BindGroupLayoutDescriptor {
        label: Some("rhi-sampler-set-layout"),
        entries: &entries,
    })
}

/// Compile both color-format variants of a pipeline.
///
/// # Errors
/// Fails when the descriptor's declared interface does not match the program
/// requirements, or when shader compilation / pipeline creation fails
/// validation (the error carries the driver log).
pub(crate) fn build_pipeline(
    device: &Device,
    catalog: &ShaderCatalog,
    uniform_layout: &BindGroupLayout,
    presentation_format: TextureFormat,
    desc: &PipelineDesc,
) -> AnyResult<PipelineData> {
    let attribute_names: Vec<_> = desc.vertex_input.attributes.iter().map(|a| a.name).collect();
    let defines = validate_pipeline_interface(
        desc.program,
        &attribute_names,
        &desc.uniform_input,
        &desc.sampler_input,
    )?;

    let source = preprocess_shader(catalog.source(desc.program), &defines);
    let label = desc.program.name();
    let shader = with_validation_scope(device, label, || {
        device.create_shader_module(ShaderModuleDescriptor {
            label: Some(label),
            source: ShaderSource::Wgsl(Cow::Owned(source)),
        })
    })?;

    // One wgpu vertex buffer layout per declared rhi layout; attributes are
    // grouped by the buffer they fetch from.
    let mut per_buffer_attributes: Vec<Vec<VertexAttribute>> =
        vec![Vec::new(); desc.vertex_input.buffer_layouts.len()];
    for attribute in &desc.vertex_input.attributes {
        per_buffer_attributes[attribute.buffer_index as usize].push(VertexAttribute {
            format: map_attribute_format(attribute.format),
            offset: attribute.offset as BufferAddress,
            shader_location: attribute_location(attribute.name),
        });
    }
    let vertex_buffers: Vec<VertexBufferLayout> = desc
        .vertex_input
        .buffer_layouts
        .iter()
        .zip(&per_buffer_attributes)
        .map(|(layout, attributes)| VertexBufferLayout {
            array_stride: layout.stride as BufferAddress,
            step_mode: VertexStepMode::Vertex,
            attributes,
        })
        .collect();

    let sampler_count = desc.sampler_input.len();
    let sampler_layout = build_sampler_layout(device, sampler_count);
    let pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts: &[uniform_layout, uniform_layout, &sampler_layout],
        push_constant_ranges: &[],
    });

    let topology = match desc.primitive {
        PrimitiveType::Triangles => PrimitiveTopology::TriangleList,
        PrimitiveType::Lines => PrimitiveTopology::LineList,
    };
    let cull_mode = match desc.cull {
        rhi::CullMode::None => None,
        rhi::CullMode::Back => Some(Face::Back),
    };
    let blend = map_blend(desc.blend);
    let depth_stencil = desc.depth_test.then(|| DepthStencilState {
        format: DEPTH_FORMAT,
        depth_write_enabled: true,
        depth_compare: CompareFunction::LessEqual,
        stencil: StencilState::default(),
        bias: DepthBiasState::default(),
    });

    let build_variant = |format: TextureFormat| -> AnyResult<RenderPipeline> {
        with_validation_scope(device, label, || {
            device.create_render_pipeline(&RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&pipeline_layout),
                vertex: VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    buffers: &vertex_buffers,
                    compilation_options: Default::default(),
                },
                primitive: PrimitiveState {
                    topology,
                    cull_mode,
                    ..Default::default()
                },
                depth_stencil: depth_stencil.clone(),
                multisample: MultisampleState::default(),
                fragment: Some(FragmentState {
                    module: &shader,
                    entry_point: Some("fs_main"),
                    targets: &[Some(ColorTargetState {
                        format,
                        blend,
                        write_mask: ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                multiview: None,
                cache: None,
            })
        })
    };

    let presentation = build_variant(presentation_format)?;
    let offscreen = build_variant(OFFSCREEN_FORMAT)?;
    Ok(PipelineData {
        presentation,
        offscreen,
        sampler_layout,
        sampler_count,
    })
}

/// Pack uniform values into uniform-buffer bytes.
///
/// Every non-matrix value occupies one 16-byte slot (scalars in `.x`), and
/// matrices occupy four; the WGSL uniform structs declare `vec4`/`mat4x4`
/// fields to match.
pub(crate) fn pack_uniforms(uniforms: &[UniformData]) -> Vec<u8> {
    let mut out: Vec<u8> = Vec::with_capacity(uniforms.len() * 16);
    let mut push_vec4 = |values: [f32; 4]| {
        out.extend_from_slice(bytemuck::cast_slice(&values));
    };
    for uniform in uniforms {
        match *uniform {
            UniformData::Float(v) => push_vec4([v, 0.0, 0.0, 0.0]),
            UniformData::Int(v) => push_vec4([v as f32, 0.0, 0.0, 0.0]),
            UniformData::Vec2([x, y]) => push_vec4([x, y, 0.0, 0.0]),
            UniformData::Vec3([x, y, z]) => push_vec4([x, y, z, 0.0]),
            UniformData::Vec4(v) => push_vec4(v),
            UniformData::Mat4(columns) => {
                for column in columns {
                    push_vec4(column);
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniforms_pack_to_sixteen_byte_slots() {
        let packed = pack_uniforms(&[
            UniformData::Float(1.0),
            UniformData::Vec2([2.0, 3.0]),
            UniformData::Mat4(rhi::identity_matrix()),
        ]);
        assert_eq!(packed.len(), 16 + 16 + 64);
        // Scalar lands in .x of its slot.
        assert_eq!(&packed[0..4], &1.0f32.to_le_bytes());
        assert_eq!(&packed[4..8], &0.0f32.to_le_bytes());
    }

    #[test]
    fn attribute_locations_are_stable() {
        assert_eq!(attribute_location(VertexAttributeName::Position), 0);
        assert_eq!(attribute_location(VertexAttributeName::TexCoord0), 1);
        assert_eq!(attribute_location(VertexAttributeName::Colors), 2);
    }

    #[test]
    fn opaque_has_no_blend_state() {
        assert!(map_blend(BlendMode::Opaque).is_none());
        assert!(map_blend(BlendMode::Alpha).is_some());
    }

    #[test]
    fn subtractive_modes_use_opposite_operand_orders() {
        // Subtractive is destination minus source; ReverseSubtractive is
        // source minus destination. wgpu names the operations the other
        // way around.
        let sub = map_blend(BlendMode::Subtractive).unwrap();
        assert_eq!(sub.color.operation, BlendOperation::ReverseSubtract);
        let rsub = map_blend(BlendMode::ReverseSubtractive).unwrap();
        assert_eq!(rsub.color.operation, BlendOperation::Subtract);
    }
}
