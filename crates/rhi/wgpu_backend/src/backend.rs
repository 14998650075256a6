//! The `Rhi` implementation over wgpu.
//!
//! Native objects live in generational slabs keyed by the public handles.
//! `destroy_*` invalidates the handle immediately but parks the native object
//! in a deferred queue that is only dropped at `finish()`, after everything
//! referencing it this frame has been submitted.

use crate::commands::{DEFAULT_CLEAR, GfxCmd};
use crate::error::submit_with_validation;
use crate::gpu::{GpuContext, SurfaceTarget};
use crate::pipelines::{
    DEPTH_FORMAT, PipelineData, build_pipeline, build_uniform_layout, map_texture_format,
    pack_uniforms,
};
use crate::shaders::ShaderCatalog;
use anyhow::{Result as AnyResult, anyhow};
use rhi::{
    AttachmentLoadOp, BindingSetInfo, BufferDesc, BufferUsage, GraphicsContext, Handle,
    PipelineDesc, Rect, RenderPassBeginInfo, RenderPassDesc, RenderbufferDesc, Rhi, Slab,
    TextureDesc, TransferContext, UniformData,
};
use std::sync::mpsc::channel;
use wgpu::util::DeviceExt;

struct TextureData {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    desc: TextureDesc,
}

struct BufferData {
    buffer: wgpu::Buffer,
    desc: BufferDesc,
}

struct RenderbufferData {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

struct UniformSetData {
    _buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

struct BindingSetData {
    vertex_buffers: Vec<(Handle<rhi::Buffer>, usize)>,
    sampler_group: wgpu::BindGroup,
}

/// Native objects waiting for `finish()` before they can be dropped.
#[derive(Default)]
struct DeferredDestruction {
    textures: Vec<wgpu::Texture>,
    buffers: Vec<wgpu::Buffer>,
    renderbuffers: Vec<wgpu::Texture>,
    pipelines: Vec<PipelineData>,
}

impl DeferredDestruction {
    fn is_empty(&self) -> bool {
        self.textures.is_empty()
            && self.buffers.is_empty()
            && self.renderbuffers.is_empty()
            && self.pipelines.is_empty()
    }

    fn clear(&mut self) {
        self.textures.clear();
        self.buffers.clear();
        self.renderbuffers.clear();
        self.pipelines.clear();
    }
}

/// wgpu-backed implementation of the backend contract.
pub struct WgpuRhi {
    gpu: GpuContext,
    catalog: ShaderCatalog,
    nearest_sampler: wgpu::Sampler,
    uniform_layout: wgpu::BindGroupLayout,
    /// Bound to uniform slots a pipeline never reads, so every slot in the
    /// pipeline layout is populated.
    dummy_uniform_group: wgpu::BindGroup,
    _dummy_uniform_buffer: wgpu::Buffer,

    textures: Slab<rhi::Texture, TextureData>,
    buffers: Slab<rhi::Buffer, BufferData>,
    renderbuffers: Slab<rhi::Renderbuffer, RenderbufferData>,
    render_passes: Slab<rhi::RenderPass, RenderPassDesc>,
    pipelines: Slab<rhi::Pipeline, PipelineData>,
    uniform_sets: Slab<rhi::UniformSet, UniformSetData>,
    binding_sets: Slab<rhi::BindingSet, BindingSetData>,
    deferred: DeferredDestruction,

    /// Monotonic stamp for transfer/graphics context tokens.
    context_generation: u64,
    active_transfer: Option<u64>,
    active_graphics: Option<u64>,
    pass_open: bool,
    graphics_commands: Vec<GfxCmd>,
    /// Swap chain image acquired for this frame, if any pass targeted it.
    current_frame: Option<wgpu::SurfaceTexture>,
    /// Texture behind the most recently begun non-default pass, for readback.
    last_color_target: Option<wgpu::Texture>,
    /// Submission failure held until `finish()`, which can report it.
    pending_error: Option<anyhow::Error>,
}

impl WgpuRhi {
    /// Create a backend presenting to `target` with the default shader catalog.
    ///
    /// # Errors
    /// Fails when adapter or device initialization fails.
    pub fn new(target: SurfaceTarget) -> AnyResult<Self> {
        Self::with_catalog(target, ShaderCatalog::default())
    }

    /// Create a backend with platform-supplied shader sources.
    ///
    /// # Errors
    /// Fails when adapter or device initialization fails.
    pub fn with_catalog(target: SurfaceTarget, catalog: ShaderCatalog) -> AnyResult<Self> {
        let gpu = GpuContext::new(target)?;
        let nearest_sampler = gpu.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("rhi-nearest"),
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });
        let uniform_layout = build_uniform_layout(&gpu.device);
        let dummy_uniform_buffer =
            gpu.device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("rhi-dummy-uniforms"),
                    contents: &[0u8; 16],
                    usage: wgpu::BufferUsages::UNIFORM,
                });
        let dummy_uniform_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("rhi-dummy-uniforms"),
            layout: &uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: dummy_uniform_buffer.as_entire_binding(),
            }],
        });

        Ok(Self {
            gpu,
            catalog,
            nearest_sampler,
            uniform_layout,
            dummy_uniform_group,
            _dummy_uniform_buffer: dummy_uniform_buffer,
            textures: Slab::new(),
            buffers: Slab::new(),
            renderbuffers: Slab::new(),
            render_passes: Slab::new(),
            pipelines: Slab::new(),
            uniform_sets: Slab::new(),
            binding_sets: Slab::new(),
            deferred: DeferredDestruction::default(),
            context_generation: 0,
            active_transfer: None,
            active_graphics: None,
            pass_open: false,
            graphics_commands: Vec::new(),
            current_frame: None,
            last_color_target: None,
            pending_error: None,
        })
    }

    /// Reconfigure the default framebuffer after a window resize.
    pub fn resize(&mut self, width: u32, height: u32) {
        assert!(
            self.active_graphics.is_none() && self.active_transfer.is_none(),
            "resize must happen outside transfer/graphics scopes"
        );
        self.gpu.configure(width, height);
    }

    fn assert_no_scope(&self, what: &str) {
        assert!(
            self.active_graphics.is_none(),
            "{what} is not allowed inside a graphics scope"
        );
    }

    fn check_transfer(&self, ctx: TransferContext) {
        assert_eq!(
            Some(ctx.generation()),
            self.active_transfer,
            "transfer context used outside its own scope"
        );
    }

    fn check_graphics(&self, ctx: GraphicsContext) {
        assert_eq!(
            Some(ctx.generation()),
            self.active_graphics,
            "graphics context used outside its own scope"
        );
    }

    fn default_target_view(&mut self) -> AnyResult<(wgpu::TextureView, bool)> {
        if let Some(headless) = &self.gpu.headless_target {
            return Ok((headless.create_view(&Default::default()), false));
        }
        if self.current_frame.is_none() {
            let surface = self
                .gpu
                .surface
                .as_ref()
                .ok_or_else(|| anyhow!("no presentation surface"))?;
            self.current_frame = Some(surface.get_current_texture()?);
        }
        let frame = self
            .current_frame
            .as_ref()
            .ok_or_else(|| anyhow!("swap chain image unavailable"))?;
        Ok((frame.texture.create_view(&Default::default()), true))
    }

    /// Replay and submit every recorded graphics command.
    fn flush_graphics_commands(&mut self) -> AnyResult<()> {
        if self.graphics_commands.is_empty() {
            return Ok(());
        }
        let commands = std::mem::take(&mut self.graphics_commands);
        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("rhi-graphics"),
            });

        let mut pass: Option<wgpu::RenderPass<'static>> = None;
        // Whether the open pass targets the presentation surface format.
        let mut pass_presents = false;
        let mut target_size = (self.gpu.width, self.gpu.height);

        for cmd in commands {
            match cmd {
                GfxCmd::BeginDefaultPass { clear } => {
                    assert!(pass.is_none(), "render pass already open");
                    let (view, presents) = self.default_target_view()?;
                    pass_presents = presents;
                    if let Some(headless) = &self.gpu.headless_target {
                        self.last_color_target = Some(headless.clone());
                    }
                    target_size = (self.gpu.width, self.gpu.height);
                    let load = if clear {
                        wgpu::LoadOp::Clear(wgpu::Color {
                            r: f64::from(DEFAULT_CLEAR.r),
                            g: f64::from(DEFAULT_CLEAR.g),
                            b: f64::from(DEFAULT_CLEAR.b),
                            a: f64::from(DEFAULT_CLEAR.a),
                        })
                    } else {
                        wgpu::LoadOp::Load
                    };
                    let new_pass = encoder
                        .begin_render_pass(&wgpu::RenderPassDescriptor {
                            label: Some("default-pass"),
                            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                                view: &view,
                                depth_slice: None,
                                resolve_target: None,
                                ops: wgpu::Operations {
                                    load,
                                    store: wgpu::StoreOp::Store,
                                },
                            })],
                            depth_stencil_attachment: None,
                            timestamp_writes: None,
                            occlusion_query_set: None,
                        })
                        .forget_lifetime();
                    pass = Some(new_pass);
                }
                GfxCmd::BeginPass(info) => {
                    assert!(pass.is_none(), "render pass already open");
                    let pass_desc = *self
                        .render_passes
                        .get(info.render_pass)
                        .unwrap_or_else(|| panic!("stale render pass handle"));
                    let color = self
                        .textures
                        .get(info.color_attachment)
                        .unwrap_or_else(|| panic!("stale texture handle"));
                    assert!(
                        color.desc.renderable,
                        "render pass color attachment must be renderable"
                    );
                    self.last_color_target = Some(color.texture.clone());
                    target_size = (color.desc.width, color.desc.height);
                    pass_presents = false;
                    let load = match pass_desc.color_load_op {
                        AttachmentLoadOp::Clear => wgpu::LoadOp::Clear(wgpu::Color {
                            r: f64::from(info.clear_color.r),
                            g: f64::from(info.clear_color.g),
                            b: f64::from(info.clear_color.b),
                            a: f64::from(info.clear_color.a),
                        }),
                        AttachmentLoadOp::Load => wgpu::LoadOp::Load,
                    };
                    let depth_view = info.depth_stencil_attachment.map(|handle| {
                        self.renderbuffers
                            .get(handle)
                            .unwrap_or_else(|| panic!("stale renderbuffer handle"))
                            .view
                            .clone()
                    });
                    let depth_attachment =
                        depth_view
                            .as_ref()
                            .map(|view| wgpu::RenderPassDepthStencilAttachment {
                                view,
                                depth_ops: Some(wgpu::Operations {
                                    load: wgpu::LoadOp::Clear(1.0),
                                    store: wgpu::StoreOp::Store,
                                }),
                                stencil_ops: Some(wgpu::Operations {
                                    load: wgpu::LoadOp::Clear(0),
                                    store: wgpu::StoreOp::Store,
                                }),
                            });
                    let view = color.view.clone();
                    let new_pass = encoder
                        .begin_render_pass(&wgpu::RenderPassDescriptor {
                            label: Some("rhi-pass"),
                            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                                view: &view,
                                depth_slice: None,
                                resolve_target: None,
                                ops: wgpu::Operations {
                                    load,
                                    store: wgpu::StoreOp::Store,
                                },
                            })],
                            depth_stencil_attachment: depth_attachment,
                            timestamp_writes: None,
                            occlusion_query_set: None,
                        })
                        .forget_lifetime();
                    pass = Some(new_pass);
                }
                GfxCmd::EndPass => {
                    assert!(pass.is_some(), "no render pass open");
                    pass = None;
                }
                GfxCmd::BindPipeline(handle) => {
                    let pipeline = self
                        .pipelines
                        .get(handle)
                        .unwrap_or_else(|| panic!("stale pipeline handle"));
                    let pass = pass.as_mut().unwrap_or_else(|| panic!("no pass open"));
                    pass.set_pipeline(if pass_presents {
                        &pipeline.presentation
                    } else {
                        &pipeline.offscreen
                    });
                    // Populate every uniform slot; real sets overwrite these.
                    pass.set_bind_group(0, Some(&self.dummy_uniform_group), &[]);
                    pass.set_bind_group(1, Some(&self.dummy_uniform_group), &[]);
                }
                GfxCmd::BindUniformSet { slot, set } => {
                    let data = self
                        .uniform_sets
                        .get(set)
                        .unwrap_or_else(|| panic!("stale uniform set handle"));
                    let pass = pass.as_mut().unwrap_or_else(|| panic!("no pass open"));
                    pass.set_bind_group(slot, Some(&data.bind_group), &[]);
                }
                GfxCmd::BindBindingSet(set) => {
                    let data = self
                        .binding_sets
                        .get(set)
                        .unwrap_or_else(|| panic!("stale binding set handle"));
                    let pass = pass.as_mut().unwrap_or_else(|| panic!("no pass open"));
                    for (slot, (buffer, offset)) in data.vertex_buffers.iter().enumerate() {
                        let buffer = self
                            .buffers
                            .get(*buffer)
                            .unwrap_or_else(|| panic!("stale vertex buffer handle"));
                        pass.set_vertex_buffer(slot as u32, buffer.buffer.slice(*offset as u64..));
                    }
                    pass.set_bind_group(2, Some(&data.sampler_group), &[]);
                }
                GfxCmd::BindIndexBuffer(handle) => {
                    let buffer = self
                        .buffers
                        .get(handle)
                        .unwrap_or_else(|| panic!("stale index buffer handle"));
                    assert!(matches!(buffer.desc.usage, BufferUsage::Index));
                    let pass = pass.as_mut().unwrap_or_else(|| panic!("no pass open"));
                    pass.set_index_buffer(buffer.buffer.slice(..), wgpu::IndexFormat::Uint16);
                }
                GfxCmd::SetViewport(rect) => {
                    let pass = pass.as_mut().unwrap_or_else(|| panic!("no pass open"));
                    pass.set_viewport(
                        rect.x as f32,
                        rect.y as f32,
                        rect.w as f32,
                        rect.h as f32,
                        0.0,
                        1.0,
                    );
                }
                GfxCmd::SetScissor(rect) => {
                    let pass = pass.as_mut().unwrap_or_else(|| panic!("no pass open"));
                    let x = rect.x.max(0) as u32;
                    let y = rect.y.max(0) as u32;
                    let w = rect.w.min(target_size.0.saturating_sub(x));
                    let h = rect.h.min(target_size.1.saturating_sub(y));
                    pass.set_scissor_rect(x, y, w, h);
                }
                GfxCmd::ClearScissor => {
                    let pass = pass.as_mut().unwrap_or_else(|| panic!("no pass open"));
                    pass.set_scissor_rect(0, 0, target_size.0, target_size.1);
                }
                GfxCmd::Draw { first, count } => {
                    let pass = pass.as_mut().unwrap_or_else(|| panic!("no pass open"));
                    pass.draw(first..first + count, 0..1);
                }
                GfxCmd::DrawIndexed { first, count } => {
                    let pass = pass.as_mut().unwrap_or_else(|| panic!("no pass open"));
                    pass.draw_indexed(first..first + count, 0, 0..1);
                }
            }
        }
        assert!(pass.is_none(), "graphics scope ended with a pass still open");
        submit_with_validation(&self.gpu.device, &self.gpu.queue, [encoder.finish()])
    }
}

impl Rhi for WgpuRhi {
    fn create_texture(&mut self, desc: TextureDesc) -> Handle<rhi::Texture> {
        self.assert_no_scope("create_texture");
        let format = map_texture_format(desc.format);
        let mut usage = wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST;
        if desc.renderable {
            usage |= wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC;
        }
        let texture = self.gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("rhi-texture"),
            size: wgpu::Extent3d {
                width: desc.width.max(1),
                height: desc.height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage,
            view_formats: &[],
        });
        let view = texture.create_view(&Default::default());
        self.textures.insert(TextureData {
            texture,
            view,
            desc,
        })
    }

    fn create_buffer(&mut self, desc: BufferDesc) -> Handle<rhi::Buffer> {
        self.assert_no_scope("create_buffer");
        let usage = match desc.usage {
            BufferUsage::Vertex => wgpu::BufferUsages::VERTEX,
            BufferUsage::Index => wgpu::BufferUsages::INDEX,
        } | wgpu::BufferUsages::COPY_DST;
        let buffer = self.gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("rhi-buffer"),
            size: desc.size as u64,
            usage,
            mapped_at_creation: false,
        });
        self.buffers.insert(BufferData { buffer, desc })
    }

    fn create_renderbuffer(&mut self, desc: RenderbufferDesc) -> Handle<rhi::Renderbuffer> {
        self.assert_no_scope("create_renderbuffer");
        let texture = self.gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("rhi-renderbuffer"),
            size: wgpu::Extent3d {
                width: desc.width.max(1),
                height: desc.height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&Default::default());
        self.renderbuffers.insert(RenderbufferData {
            _texture: texture,
            view,
        })
    }

    fn create_render_pass(&mut self, desc: RenderPassDesc) -> Handle<rhi::RenderPass> {
        self.assert_no_scope("create_render_pass");
        self.render_passes.insert(desc)
    }

    fn create_pipeline(&mut self, desc: PipelineDesc) -> AnyResult<Handle<rhi::Pipeline>> {
        self.assert_no_scope("create_pipeline");
        let data = build_pipeline(
            &self.gpu.device,
            &self.catalog,
            &self.uniform_layout,
            self.gpu.surface_format,
            &desc,
        )?;
        Ok(self.pipelines.insert(data))
    }

    fn destroy_texture(&mut self, handle: Handle<rhi::Texture>) {
        self.assert_no_scope("destroy_texture");
        if let Some(data) = self.textures.remove(handle) {
            self.deferred.textures.push(data.texture);
        }
    }

    fn destroy_buffer(&mut self, handle: Handle<rhi::Buffer>) {
        self.assert_no_scope("destroy_buffer");
        if let Some(data) = self.buffers.remove(handle) {
            self.deferred.buffers.push(data.buffer);
        }
    }

    fn destroy_renderbuffer(&mut self, handle: Handle<rhi::Renderbuffer>) {
        self.assert_no_scope("destroy_renderbuffer");
        if let Some(data) = self.renderbuffers.remove(handle) {
            self.deferred.renderbuffers.push(data._texture);
        }
    }

    fn destroy_render_pass(&mut self, handle: Handle<rhi::RenderPass>) {
        self.assert_no_scope("destroy_render_pass");
        self.render_passes.remove(handle);
    }

    fn destroy_pipeline(&mut self, handle: Handle<rhi::Pipeline>) {
        self.assert_no_scope("destroy_pipeline");
        if let Some(data) = self.pipelines.remove(handle) {
            self.deferred.pipelines.push(data);
        }
    }

    fn is_texture_valid(&self, handle: Handle<rhi::Texture>) -> bool {
        self.textures.is_valid(handle)
    }

    fn is_buffer_valid(&self, handle: Handle<rhi::Buffer>) -> bool {
        self.buffers.is_valid(handle)
    }

    fn is_pipeline_valid(&self, handle: Handle<rhi::Pipeline>) -> bool {
        self.pipelines.is_valid(handle)
    }

    fn begin_transfer(&mut self) -> TransferContext {
        assert!(
            self.active_transfer.is_none() && self.active_graphics.is_none(),
            "transfer scope opened while another scope is active"
        );
        self.context_generation += 1;
        self.active_transfer = Some(self.context_generation);
        TransferContext::new(self.context_generation)
    }

    fn end_transfer(&mut self, ctx: TransferContext) {
        self.check_transfer(ctx);
        self.active_transfer = None;
    }

    fn update_buffer(
        &mut self,
        ctx: TransferContext,
        buffer: Handle<rhi::Buffer>,
        offset: usize,
        data: &[u8],
    ) {
        self.check_transfer(ctx);
        let target = self
            .buffers
            .get(buffer)
            .unwrap_or_else(|| panic!("stale buffer handle"));
        assert!(
            offset + data.len() <= target.desc.size,
            "buffer update out of bounds"
        );
        self.gpu
            .queue
            .write_buffer(&target.buffer, offset as u64, data);
    }

    fn update_texture(
        &mut self,
        ctx: TransferContext,
        texture: Handle<rhi::Texture>,
        region: Rect,
        data: &[u8],
    ) {
        self.check_transfer(ctx);
        let target = self
            .textures
            .get(texture)
            .unwrap_or_else(|| panic!("stale texture handle"));
        let bytes_per_texel = target.desc.format.bytes_per_texel();
        assert_eq!(
            data.len(),
            region.w as usize * region.h as usize * bytes_per_texel,
            "texture update data does not match region size"
        );
        self.gpu.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &target.texture,
                mip_level: 0,
                origin: wgpu::Origin3d {
                    x: region.x.max(0) as u32,
                    y: region.y.max(0) as u32,
                    z: 0,
                },
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(region.w * bytes_per_texel as u32),
                rows_per_image: Some(region.h),
            },
            wgpu::Extent3d {
                width: region.w,
                height: region.h,
                depth_or_array_layers: 1,
            },
        );
    }

    fn create_uniform_set(
        &mut self,
        ctx: TransferContext,
        uniforms: &[UniformData],
    ) -> Handle<rhi::UniformSet> {
        self.check_transfer(ctx);
        let contents = pack_uniforms(uniforms);
        let buffer = self
            .gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("rhi-uniform-set"),
                contents: &contents,
                usage: wgpu::BufferUsages::UNIFORM,
            });
        let bind_group = self
            .gpu
            .device
            .create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("rhi-uniform-set"),
                layout: &self.uniform_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffer.as_entire_binding(),
                }],
            });
        self.uniform_sets.insert(UniformSetData {
            _buffer: buffer,
            bind_group,
        })
    }

    fn create_binding_set(
        &mut self,
        ctx: TransferContext,
        pipeline: Handle<rhi::Pipeline>,
        info: &BindingSetInfo,
    ) -> Handle<rhi::BindingSet> {
        self.check_transfer(ctx);
        let pipeline_data = self
            .pipelines
            .get(pipeline)
            .unwrap_or_else(|| panic!("stale pipeline handle"));
        assert_eq!(
            info.samplers.len(),
            pipeline_data.sampler_count,
            "binding set sampler count does not match the pipeline"
        );
        let views: Vec<wgpu::TextureView> = info
            .samplers
            .iter()
            .map(|binding| {
                self.textures
                    .get(binding.texture)
                    .unwrap_or_else(|| panic!("stale texture handle in binding set"))
                    .view
                    .clone()
            })
            .collect();
        let mut entries = Vec::with_capacity(views.len() * 2);
        for (slot, view) in views.iter().enumerate() {
            entries.push(wgpu::BindGroupEntry {
                binding: slot as u32 * 2,
                resource: wgpu::BindingResource::TextureView(view),
            });
            entries.push(wgpu::BindGroupEntry {
                binding: slot as u32 * 2 + 1,
                resource: wgpu::BindingResource::Sampler(&self.nearest_sampler),
            });
        }
        let sampler_group = self
            .gpu
            .device
            .create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("rhi-binding-set"),
                layout: &pipeline_data.sampler_layout,
                entries: &entries,
            });
        self.binding_sets.insert(BindingSetData {
            vertex_buffers: info
                .vertex_buffers
                .iter()
                .map(|binding| (binding.buffer, binding.offset))
                .collect(),
            sampler_group,
        })
    }

    fn begin_graphics(&mut self) -> GraphicsContext {
        assert!(
            self.active_transfer.is_none() && self.active_graphics.is_none(),
            "graphics scope opened while another scope is active"
        );
        self.context_generation += 1;
        self.active_graphics = Some(self.context_generation);
        GraphicsContext::new(self.context_generation)
    }

    fn end_graphics(&mut self, ctx: GraphicsContext) {
        self.check_graphics(ctx);
        assert!(!self.pass_open, "graphics scope ended inside a render pass");
        if let Err(err) = self.flush_graphics_commands() {
            log::error!(target: "wgpu_rhi", "graphics submission failed: {err:?}");
            self.pending_error = Some(err);
        }
        self.active_graphics = None;
    }

    fn begin_default_render_pass(&mut self, ctx: GraphicsContext, clear: bool) {
        self.check_graphics(ctx);
        assert!(!self.pass_open, "render pass already open");
        self.pass_open = true;
        self.graphics_commands.push(GfxCmd::BeginDefaultPass { clear });
    }

    fn begin_render_pass(&mut self, ctx: GraphicsContext, info: RenderPassBeginInfo) {
        self.check_graphics(ctx);
        assert!(!self.pass_open, "render pass already open");
        self.pass_open = true;
        self.graphics_commands.push(GfxCmd::BeginPass(info));
    }

    fn end_render_pass(&mut self, ctx: GraphicsContext) {
        self.check_graphics(ctx);
        assert!(self.pass_open, "no render pass open");
        self.pass_open = false;
        self.graphics_commands.push(GfxCmd::EndPass);
    }

    fn bind_pipeline(&mut self, ctx: GraphicsContext, pipeline: Handle<rhi::Pipeline>) {
        self.check_graphics(ctx);
        self.graphics_commands.push(GfxCmd::BindPipeline(pipeline));
    }

    fn bind_uniform_set(&mut self, ctx: GraphicsContext, slot: u32, set: Handle<rhi::UniformSet>) {
        self.check_graphics(ctx);
        assert!(slot < 2, "uniform set slot out of range");
        self.graphics_commands
            .push(GfxCmd::BindUniformSet { slot, set });
    }

    fn bind_binding_set(&mut self, ctx: GraphicsContext, set: Handle<rhi::BindingSet>) {
        self.check_graphics(ctx);
        self.graphics_commands.push(GfxCmd::BindBindingSet(set));
    }

    fn bind_index_buffer(&mut self, ctx: GraphicsContext, buffer: Handle<rhi::Buffer>) {
        self.check_graphics(ctx);
        self.graphics_commands.push(GfxCmd::BindIndexBuffer(buffer));
    }

    fn set_viewport(&mut self, ctx: GraphicsContext, rect: Rect) {
        self.check_graphics(ctx);
        self.graphics_commands.push(GfxCmd::SetViewport(rect));
    }

    fn set_scissor(&mut self, ctx: GraphicsContext, rect: Rect) {
        self.check_graphics(ctx);
        self.graphics_commands.push(GfxCmd::SetScissor(rect));
    }

    fn clear_scissor(&mut self, ctx: GraphicsContext) {
        self.check_graphics(ctx);
        self.graphics_commands.push(GfxCmd::ClearScissor);
    }

    fn draw(&mut self, ctx: GraphicsContext, first: u32, count: u32) {
        self.check_graphics(ctx);
        assert!(self.pass_open, "draw outside a render pass");
        self.graphics_commands.push(GfxCmd::Draw { first, count });
    }

    fn draw_indexed(&mut self, ctx: GraphicsContext, first: u32, count: u32) {
        self.check_graphics(ctx);
        assert!(self.pass_open, "draw outside a render pass");
        self.graphics_commands
            .push(GfxCmd::DrawIndexed { first, count });
    }

    fn read_pixels(
        &mut self,
        ctx: GraphicsContext,
        rect: Rect,
        format: rhi::TextureFormat,
    ) -> AnyResult<Vec<u8>> {
        self.check_graphics(ctx);
        assert!(!self.pass_open, "read_pixels inside a render pass");
        assert!(
            matches!(format, rhi::TextureFormat::Rgba8),
            "only RGBA readback is supported"
        );
        self.flush_graphics_commands()?;
        let source = self
            .last_color_target
            .clone()
            .ok_or_else(|| anyhow!("no readable color target; presentation surfaces cannot be read back"))?;

        let bytes_per_pixel: u32 = 4;
        let row_bytes = rect.w * bytes_per_pixel;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded_bpr = row_bytes.div_ceil(align) * align;
        let buffer_size = u64::from(padded_bpr) * u64::from(rect.h);
        let readback = self.gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("rhi-readback"),
            size: buffer_size,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });
        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("rhi-readback"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &source,
                mip_level: 0,
                origin: wgpu::Origin3d {
                    x: rect.x.max(0) as u32,
                    y: rect.y.max(0) as u32,
                    z: 0,
                },
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &readback,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bpr),
                    rows_per_image: Some(rect.h),
                },
            },
            wgpu::Extent3d {
                width: rect.w,
                height: rect.h,
                depth_or_array_layers: 1,
            },
        );
        self.gpu.queue.submit([encoder.finish()]);

        let slice = readback.slice(..);
        let (sender, receiver) = channel();
        slice.map_async(wgpu::MapMode::Read, move |res| {
            drop(sender.send(res));
        });
        loop {
            drop(self.gpu.device.poll(wgpu::PollType::Wait));
            if let Ok(res) = receiver.try_recv() {
                res?;
                break;
            }
        }
        let mapped = slice.get_mapped_range();
        let mut data = vec![0u8; row_bytes as usize * rect.h as usize];
        for row in 0..rect.h as usize {
            let src = row * padded_bpr as usize;
            let dst = row * row_bytes as usize;
            data[dst..dst + row_bytes as usize]
                .copy_from_slice(&mapped[src..src + row_bytes as usize]);
        }
        drop(mapped);
        readback.unmap();
        Ok(data)
    }

    fn present(&mut self) -> AnyResult<()> {
        assert!(
            self.active_transfer.is_none() && self.active_graphics.is_none(),
            "present must happen outside transfer/graphics scopes"
        );
        if let Some(frame) = self.current_frame.take() {
            frame.present();
        }
        // Track the window's drawable size between frames.
        let (width, height) = self.gpu.drawable_size();
        if (width, height) != (self.gpu.width, self.gpu.height) {
            self.gpu.configure(width, height);
        }
        Ok(())
    }

    fn finish(&mut self) -> AnyResult<()> {
        assert!(
            self.active_transfer.is_none() && self.active_graphics.is_none(),
            "finish must happen outside transfer/graphics scopes"
        );
        let transients = self.uniform_sets.len() + self.binding_sets.len();
        if transients > 0 || !self.deferred.is_empty() {
            log::trace!(
                target: "wgpu_rhi",
                "finish: releasing {transients} transient sets, {} deferred textures, {} deferred buffers",
                self.deferred.textures.len(),
                self.deferred.buffers.len()
            );
        }
        drop(self.uniform_sets.drain_all());
        drop(self.binding_sets.drain_all());
        self.deferred.clear();
        self.last_color_target = None;
        // Per-frame cleanup above runs either way; the frame's submission
        // failure, if any, is reported exactly once.
        match self.pending_error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn default_framebuffer_dimensions(&self) -> (u32, u32) {
        (self.gpu.width, self.gpu.height)
    }
}
