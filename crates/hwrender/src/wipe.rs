//! Screen wipe: masked crossfade between two captured screens.

use crate::pass::Pass;
use crate::twodee::Draw2dVertex;
use crate::blit::{blit_vertex_input, fullscreen_vertices};
use anyhow::Result as AnyResult;
use rhi::{
    BindingSetInfo, BlendMode, Buffer, BufferDesc, BufferUsage, CullMode, GraphicsContext, Handle,
    Pipeline, PipelineDesc, PipelineProgram, PrimitiveType, Rect, Rhi, SamplerName, Texture,
    TextureBinding, TransferContext, UniformData, UniformName, VertexBufferBinding,
    identity_matrix, ortho_projection,
};

/// Captured screens and the mask driving one wipe step.
#[derive(Debug, Clone, Copy)]
pub struct WipeConfig {
    /// Screen being wiped away.
    pub start: Handle<Texture>,
    /// Screen being revealed.
    pub end: Handle<Texture>,
    /// Single-channel mask; texel value is the per-pixel blend factor.
    pub mask: Handle<Texture>,
    /// Darken the start screen toward black as the mask advances.
    pub colorize: bool,
}

/// Draws the masked crossfade over the default framebuffer. Idle (all
/// phases no-ops) until a [`WipeConfig`] is set; the frame driver clears the
/// config when the wipe ends.
#[derive(Default)]
pub struct PostprocessWipePass {
    config: Option<WipeConfig>,
    pipeline: Option<Handle<Pipeline>>,
    vertex_buffer: Option<Handle<Buffer>>,
    staged_size: (u32, u32),
    vertices_dirty: bool,
    uniform_set: Option<Handle<rhi::UniformSet>>,
    draw_set: Option<Handle<rhi::UniformSet>>,
    binding_set: Option<Handle<rhi::BindingSet>>,
}

impl PostprocessWipePass {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_config(&mut self, config: Option<WipeConfig>) {
        self.config = config;
    }

    pub fn config(&self) -> Option<WipeConfig> {
        self.config
    }
}

impl Pass for PostprocessWipePass {
    fn prepass(&mut self, rhi: &mut dyn Rhi) -> AnyResult<()> {
        if self.config.is_none() {
            return Ok(());
        }
        if self.pipeline.is_none() {
            self.pipeline = Some(rhi.create_pipeline(PipelineDesc {
                program: PipelineProgram::PostprocessWipe,
                vertex_input: blit_vertex_input(),
                uniform_input: vec![
                    UniformName::Projection,
                    UniformName::ModelView,
                    UniformName::WipeColorizeMode,
                ],
                sampler_input: vec![
                    SamplerName::Sampler0,
                    SamplerName::Sampler1,
                    SamplerName::Sampler2,
                ],
                primitive: PrimitiveType::Triangles,
                cull: CullMode::None,
                blend: BlendMode::Alpha,
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
        let Some(config) = self.config else {
            return Ok(());
        };
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
            &[UniformData::Int(i32::from(config.colorize))],
        ));
        // Sampler order matches the program: end, start, mask.
        self.binding_set = Some(rhi.create_binding_set(
            ctx,
            pipeline,
            &BindingSetInfo {
                vertex_buffers: vec![VertexBufferBinding {
                    buffer: vertex_buffer,
                    offset: 0,
                }],
                samplers: vec![
                    TextureBinding { texture: config.end },
                    TextureBinding { texture: config.start },
                    TextureBinding { texture: config.mask },
                ],
            },
        ));
        Ok(())
    }

    fn graphics(&mut self, rhi: &mut dyn Rhi, ctx: GraphicsContext) -> AnyResult<()> {
        if self.config.is_none() {
            return Ok(());
        }
        let (w, h) = self.staged_size;
        rhi.begin_default_render_pass(ctx, false);
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
