//! Final composite blit into the default framebuffer.

use crate::framebuffers::FramebufferManager;
use crate::pass::Pass;
use crate::twodee::Draw2dVertex;
use anyhow::Result as AnyResult;
use rhi::{
    BindingSetInfo, BlendMode, Buffer, BufferDesc, BufferUsage, CullMode, GraphicsContext, Handle,
    Pipeline, PipelineDesc, PipelineProgram, PrimitiveType, Rect, Rhi, SamplerName, TextureBinding,
    TransferContext, UniformData, UniformName, VertexAttribute, VertexAttributeFormat,
    VertexAttributeName, VertexBufferBinding, VertexBufferLayout, VertexInputDesc,
    identity_matrix, ortho_projection,
};
use std::cell::RefCell;
use std::rc::Rc;

/// Which offscreen target the blit samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlitSource {
    /// The main color target Twodee rendered into.
    #[default]
    MainColor,
    /// The post-process target written by the postimg pass.
    CurrentPost,
}

/// Stretches an offscreen color target over the default framebuffer.
pub struct BlitRectPass {
    framebuffers: Rc<RefCell<FramebufferManager>>,
    source: BlitSource,
    pipeline: Option<Handle<Pipeline>>,
    vertex_buffer: Option<Handle<Buffer>>,
    /// Target size the staged vertices were built for.
    staged_size: (u32, u32),
    vertices_dirty: bool,
    uniform_set: Option<Handle<rhi::UniformSet>>,
    binding_set: Option<Handle<rhi::BindingSet>>,
}

pub(crate) fn blit_vertex_input() -> VertexInputDesc {
    VertexInputDesc {
        buffer_layouts: vec![VertexBufferLayout { stride: 36 }],
        attributes: vec![
            VertexAttribute {
                name: VertexAttributeName::Position,
                format: VertexAttributeFormat::Float3,
                buffer_index: 0,
                offset: 0,
            },
            VertexAttribute {
                name: VertexAttributeName::TexCoord0,
                format: VertexAttributeFormat::Float2,
                buffer_index: 0,
                offset: 12,
            },
        ],
    }
}

/// Six vertices covering `w` x `h` in pixel space with UVs spanning `[0, 1]`.
pub(crate) fn fullscreen_vertices(w: f32, h: f32) -> [Draw2dVertex; 6] {
    let white = [1.0, 1.0, 1.0, 1.0];
    let corner = |x: f32, y: f32, u: f32, v: f32| Draw2dVertex {
        position: [x, y, 0.0],
        uv: [u, v],
        color: white,
    };
    [
        corner(0.0, 0.0, 0.0, 0.0),
        corner(w, 0.0, 1.0, 0.0),
        corner(w, h, 1.0, 1.0),
        corner(0.0, 0.0, 0.0, 0.0),
        corner(w, h, 1.0, 1.0),
        corner(0.0, h, 0.0, 1.0),
    ]
}

impl BlitRectPass {
    pub fn new(framebuffers: Rc<RefCell<FramebufferManager>>) -> Self {
        Self {
            framebuffers,
            source: BlitSource::default(),
            pipeline: None,
            vertex_buffer: None,
            staged_size: (0, 0),
            vertices_dirty: true,
            uniform_set: None,
            binding_set: None,
        }
    }

    /// Choose what the next frame's blit samples.
    pub fn set_source(&mut self, source: BlitSource) {
        self.source = source;
    }
}

impl Pass for BlitRectPass {
    fn prepass(&mut self, rhi: &mut dyn Rhi) -> AnyResult<()> {
        if self.pipeline.is_none() {
            self.pipeline = Some(rhi.create_pipeline(PipelineDesc {
                program: PipelineProgram::Unshaded,
                vertex_input: blit_vertex_input(),
                uniform_input: vec![UniformName::Projection, UniformName::ModelView],
                sampler_input: vec![SamplerName::Sampler0],
                primitive: PrimitiveType::Triangles,
                cull: CullMode::None,
                blend: BlendMode::Opaque,
                depth_test: false,
            })?);
        }
        if self.vertex_buffer.is_none() {
            self.vertex_buffer = Some(rhi.create_buffer(BufferDesc {
                size: std::mem::size_of::<[Draw2dVertex; 6]>(),
                usage: BufferUsage::Vertex,
            }));
        }
        let size = rhi.default_framebuffer_dimensions();
        if size != self.staged_size {
            self.staged_size = size;
            self.vertices_dirty = true;
        }
        Ok(())
    }

    fn transfer(&mut self, rhi: &mut dyn Rhi, ctx: TransferContext) -> AnyResult<()> {
        let pipeline = self.pipeline.expect("pipeline created in prepass");
        let vertex_buffer = self.vertex_buffer.expect("buffer created in prepass");
        if self.vertices_dirty {
            let (w, h) = self.staged_size;
            let vertices = fullscreen_vertices(w as f32, h as f32);
            rhi.update_buffer(ctx, vertex_buffer, 0, bytemuck::cast_slice(&vertices));
            self.vertices_dirty = false;
        }
        let (w, h) = self.staged_size;
        self.uniform_set = Some(rhi.create_uniform_set(
            ctx,
            &[
                UniformData::Mat4(ortho_projection(w as f32, h as f32)),
                UniformData::Mat4(identity_matrix()),
            ],
        ));
        let source = {
            let fb = self.framebuffers.borrow();
            match self.source {
                BlitSource::MainColor => fb.main_color(),
                BlitSource::CurrentPost => fb.current_post_color(),
            }
        };
        self.binding_set = Some(rhi.create_binding_set(
            ctx,
            pipeline,
            &BindingSetInfo {
                vertex_buffers: vec![VertexBufferBinding {
                    buffer: vertex_buffer,
                    offset: 0,
                }],
                samplers: vec![TextureBinding { texture: source }],
            },
        ));
        Ok(())
    }

    fn graphics(&mut self, rhi: &mut dyn Rhi, ctx: GraphicsContext) -> AnyResult<()> {
        let (w, h) = self.staged_size;
        rhi.begin_default_render_pass(ctx, false);
        rhi.set_viewport(ctx, Rect { x: 0, y: 0, w, h });
        rhi.bind_pipeline(ctx, self.pipeline.expect("pipeline created in prepass"));
        rhi.bind_uniform_set(ctx, 0, self.uniform_set.expect("uniform set built in transfer"));
        rhi.bind_binding_set(ctx, self.binding_set.expect("binding set built in transfer"));
        rhi.draw(ctx, 0, 6);
        rhi.end_render_pass(ctx);
        Ok(())
    }

    fn postpass(&mut self, _rhi: &mut dyn Rhi) -> AnyResult<()> {
        self.uniform_set = None;
        self.binding_set = None;
        Ok(())
    }
}
