//! Full-screen post effects (water, heat, flip, mirror).

use crate::framebuffers::FramebufferManager;
use crate::pass::Pass;
use crate::twodee::Draw2dVertex;
use crate::blit::{blit_vertex_input, fullscreen_vertices};
use anyhow::Result as AnyResult;
use rhi::{
    AttachmentLoadOp, BindingSetInfo, BlendMode, Buffer, BufferDesc, BufferUsage, Color, CullMode,
    GraphicsContext, Handle, Pipeline, PipelineDesc, PipelineProgram, PrimitiveType, Rect,
    RenderPass, RenderPassBeginInfo, RenderPassDesc, Rhi, SamplerName, TextureBinding,
    TransferContext, UniformData, UniformName, VertexBufferBinding, identity_matrix,
    ortho_projection,
};
use std::cell::RefCell;
use std::rc::Rc;

/// Screen-warp effect applied between the main render and the final blit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PostimgEffect {
    #[default]
    None,
    Water,
    Heat,
    Flip,
    Mirror,
}

impl PostimgEffect {
    /// Selector value the shader switches on.
    const fn shader_id(self) -> i32 {
        match self {
            Self::None => 0,
            Self::Water => 1,
            Self::Heat => 2,
            Self::Flip => 3,
            Self::Mirror => 4,
        }
    }
}

/// Samples the main color target and writes the warped image into the
/// current post-process target. Inactive (all phases no-ops) while the
/// effect is [`PostimgEffect::None`].
pub struct BlitPostimgScreens {
    framebuffers: Rc<RefCell<FramebufferManager>>,
    effect: PostimgEffect,
    /// Animation phase in frames, advanced by the caller for water/heat.
    phase: f32,
    pipeline: Option<Handle<Pipeline>>,
    render_pass: Option<Handle<RenderPass>>,
    vertex_buffer: Option<Handle<Buffer>>,
    staged_size: (u32, u32),
    vertices_dirty: bool,
    uniform_set: Option<Handle<rhi::UniformSet>>,
    draw_set: Option<Handle<rhi::UniformSet>>,
    binding_set: Option<Handle<rhi::BindingSet>>,
}

impl BlitPostimgScreens {
    pub fn new(framebuffers: Rc<RefCell<FramebufferManager>>) -> Self {
        Self {
            framebuffers,
            effect: PostimgEffect::None,
            phase: 0.0,
            pipeline: None,
            render_pass: None,
            vertex_buffer: None,
            staged_size: (0, 0),
            vertices_dirty: true,
            uniform_set: None,
            draw_set: None,
            binding_set: None,
        }
    }

    pub fn set_effect(&mut self, effect: PostimgEffect) {
        self.effect = effect;
    }

    pub fn effect(&self) -> PostimgEffect {
        self.effect
    }

    /// Advance the warp animation. Call once per frame while active.
    pub fn advance_phase(&mut self, delta: f32) {
        self.phase += delta;
    }
}

impl Pass for BlitPostimgScreens {
    fn prepass(&mut self, rhi: &mut dyn Rhi) -> AnyResult<()> {
        if self.effect == PostimgEffect::None {
            return Ok(());
        }
        if self.pipeline.is_none() {
            self.pipeline = Some(rhi.create_pipeline(PipelineDesc {
                program: PipelineProgram::Postimg,
                vertex_input: blit_vertex_input(),
                uniform_input: vec![
                    UniformName::Projection,
                    UniformName::ModelView,
                    UniformName::PostimgEffect,
                ],
                sampler_input: vec![SamplerName::Sampler0],
                primitive: PrimitiveType::Triangles,
                cull: CullMode::None,
                blend: BlendMode::Opaque,
                depth_test: false,
            })?);
        }
        if self.render_pass.is_none() {
            self.render_pass = Some(rhi.create_render_pass(RenderPassDesc {
                use_depth_stencil: false,
                color_load_op: AttachmentLoadOp::Clear,
            }));
        }
        if self.vertex_buffer.is_none() {
            self.vertex_buffer = Some(rhi.create_buffer(BufferDesc {
                size: std::mem::size_of::<[Draw2dVertex; 6]>(),
                usage: BufferUsage::Vertex,
            }));
        }
        let size = {
            let fb = self.framebuffers.borrow();
            (fb.width(), fb.height())
        };
        if size != self.staged_size {
            self.staged_size = size;
            self.vertices_dirty = true;
        }
        Ok(())
    }

    fn transfer(&mut self, rhi: &mut dyn Rhi, ctx: TransferContext) -> AnyResult<()> {
        if self.effect == PostimgEffect::None {
            return Ok(());
        }
        let pipeline = self.pipeline.expect("pipeline created in prepass");
        let vertex_buffer = self.vertex_buffer.expect("buffer created in prepass");
        let (w, h) = self.staged_size;
        if self.vertices_dirty {
            let vertices = fullscreen_vertices(w as f32, h as f32);
            rhi.update_buffer(ctx, vertex_buffer, 0, bytemuck::cast_slice(&vertices));
            self.vertices_dirty = false;
        }
        self.uniform_set = Some(rhi.create_uniform_set(
            ctx,
            &[
                UniformData::Mat4(ortho_projection(w as f32, h as f32)),
                UniformData::Mat4(identity_matrix()),
            ],
        ));
        self.draw_set = Some(rhi.create_uniform_set(
            ctx,
            &[UniformData::Vec2([
                self.effect.shader_id() as f32,
                self.phase,
            ])],
        ));
        let main_color = self.framebuffers.borrow().main_color();
        self.binding_set = Some(rhi.create_binding_set(
            ctx,
            pipeline,
            &BindingSetInfo {
                vertex_buffers: vec![VertexBufferBinding {
                    buffer: vertex_buffer,
                    offset: 0,
                }],
                samplers: vec![TextureBinding { texture: main_color }],
            },
        ));
        Ok(())
    }

    fn graphics(&mut self, rhi: &mut dyn Rhi, ctx: GraphicsContext) -> AnyResult<()> {
        if self.effect == PostimgEffect::None {
            return Ok(());
        }
        let (target, w, h) = {
            let fb = self.framebuffers.borrow();
            (fb.current_post_color(), fb.width(), fb.height())
        };
        rhi.begin_render_pass(
            ctx,
            RenderPassBeginInfo {
                render_pass: self.render_pass.expect("render pass created in prepass"),
                color_attachment: target,
                depth_stencil_attachment: None,
                clear_color: Color::BLACK,
            },
        );
        rhi.set_viewport(ctx, Rect { x: 0, y: 0, w, h });
        rhi.bind_pipeline(ctx, self.pipeline.expect("pipeline created in prepass"));
        rhi.bind_uniform_set(ctx, 0, self.uniform_set.expect("uniform set built in transfer"));
        rhi.bind_uniform_set(ctx, 1, self.draw_set.expect("draw set built in transfer"));
        rhi.bind_binding_set(ctx, self.binding_set.expect("binding set built in transfer"));
        rhi.draw(ctx, 0, 6);
        rhi.end_render_pass(ctx);
        Ok(())
    }

    fn postpass(&mut self, _rhi: &mut dyn Rhi) -> AnyResult<()> {
        self.uniform_set = None;
        self.draw_set = None;
        self.binding_set = None;
        Ok(())
    }
}
