//! In-memory backend for exercising passes without a GPU.

// Each test binary uses a different slice of the mock's surface.
#![allow(dead_code)]

use anyhow::Result as AnyResult;
use rhi::{
    BindingSet, BindingSetInfo, Buffer, BufferDesc, GraphicsContext, Handle, Pipeline,
    PipelineDesc, Rect, RenderPass, RenderPassBeginInfo, RenderPassDesc, Renderbuffer,
    RenderbufferDesc, Rhi, Slab, Texture, TextureDesc, TextureFormat, TransferContext,
    UniformData, UniformSet,
};
use std::cell::RefCell;
use std::rc::Rc;

pub type EventLog = Rc<RefCell<Vec<String>>>;

struct MockBuffer {
    data: Vec<u8>,
}

/// Records the call sequence and keeps buffer contents addressable, so tests
/// can assert on ordering and on what was uploaded.
pub struct MockRhi {
    pub log: EventLog,
    textures: Slab<Texture, TextureDesc>,
    buffers: Slab<Buffer, MockBuffer>,
    renderbuffers: Slab<Renderbuffer, RenderbufferDesc>,
    render_passes: Slab<RenderPass, RenderPassDesc>,
    pipelines: Slab<Pipeline, PipelineDesc>,
    uniform_sets: Slab<UniformSet, usize>,
    binding_sets: Slab<BindingSet, usize>,
    generation: u64,
    active_transfer: Option<u64>,
    active_graphics: Option<u64>,
    pub draw_calls: usize,
    pub finish_calls: usize,
    pub dimensions: (u32, u32),
}

impl MockRhi {
    pub fn new() -> Self {
        Self::with_log(Rc::new(RefCell::new(Vec::new())))
    }

    pub fn with_log(log: EventLog) -> Self {
        Self {
            log,
            textures: Slab::new(),
            buffers: Slab::new(),
            renderbuffers: Slab::new(),
            render_passes: Slab::new(),
            pipelines: Slab::new(),
            uniform_sets: Slab::new(),
            binding_sets: Slab::new(),
            generation: 0,
            active_transfer: None,
            active_graphics: None,
            draw_calls: 0,
            finish_calls: 0,
            dimensions: (640, 400),
        }
    }

    pub fn buffer_data(&self, handle: Handle<Buffer>) -> &[u8] {
        &self.buffers.get(handle).unwrap().data
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    fn record(&self, event: &str) {
        self.log.borrow_mut().push(event.to_string());
    }

    fn check_transfer(&self, ctx: TransferContext) {
        assert_eq!(self.active_transfer, Some(ctx.generation()), "stale transfer token");
    }

    fn check_graphics(&self, ctx: GraphicsContext) {
        assert_eq!(self.active_graphics, Some(ctx.generation()), "stale graphics token");
    }
}

impl Rhi for MockRhi {
    fn create_texture(&mut self, desc: TextureDesc) -> Handle<Texture> {
        self.record("create_texture");
        self.textures.insert(desc)
    }

    fn create_buffer(&mut self, desc: BufferDesc) -> Handle<Buffer> {
        self.record("create_buffer");
        self.buffers.insert(MockBuffer {
            data: vec![0; desc.size],
        })
    }

    fn create_renderbuffer(&mut self, desc: RenderbufferDesc) -> Handle<Renderbuffer> {
        self.record("create_renderbuffer");
        self.renderbuffers.insert(desc)
    }

    fn create_render_pass(&mut self, desc: RenderPassDesc) -> Handle<RenderPass> {
        self.record("create_render_pass");
        self.render_passes.insert(desc)
    }

    fn create_pipeline(&mut self, desc: PipelineDesc) -> AnyResult<Handle<Pipeline>> {
        self.record("create_pipeline");
        Ok(self.pipelines.insert(desc))
    }

    fn destroy_texture(&mut self, handle: Handle<Texture>) {
        self.record("destroy_texture");
        self.textures.remove(handle);
    }

    fn destroy_buffer(&mut self, handle: Handle<Buffer>) {
        self.record("destroy_buffer");
        self.buffers.remove(handle);
    }

    fn destroy_renderbuffer(&mut self, handle: Handle<Renderbuffer>) {
        self.renderbuffers.remove(handle);
    }

    fn destroy_render_pass(&mut self, handle: Handle<RenderPass>) {
        self.render_passes.remove(handle);
    }

    fn destroy_pipeline(&mut self, handle: Handle<Pipeline>) {
        self.pipelines.remove(handle);
    }

    fn is_texture_valid(&self, handle: Handle<Texture>) -> bool {
        self.textures.is_valid(handle)
    }

    fn is_buffer_valid(&self, handle: Handle<Buffer>) -> bool {
        self.buffers.is_valid(handle)
    }

    fn is_pipeline_valid(&self, handle: Handle<Pipeline>) -> bool {
        self.pipelines.is_valid(handle)
    }

    fn begin_transfer(&mut self) -> TransferContext {
        assert!(self.active_transfer.is_none() && self.active_graphics.is_none());
        self.record("begin_transfer");
        self.generation += 1;
        self.active_transfer = Some(self.generation);
        TransferContext::new(self.generation)
    }

    fn end_transfer(&mut self, ctx: TransferContext) {
        self.check_transfer(ctx);
        self.record("end_transfer");
        self.active_transfer = None;
    }

    fn update_buffer(&mut self, ctx: TransferContext, buffer: Handle<Buffer>, offset: usize, data: &[u8]) {
        self.check_transfer(ctx);
        self.record("update_buffer");
        let target = self.buffers.get_mut(buffer).unwrap();
        target.data[offset..offset + data.len()].copy_from_slice(data);
    }

    fn update_texture(&mut self, ctx: TransferContext, texture: Handle<Texture>, region: Rect, data: &[u8]) {
        self.check_transfer(ctx);
        self.record("update_texture");
        let desc = self.textures.get(texture).unwrap();
        let expected = region.w as usize * region.h as usize * desc.format.bytes_per_texel();
        assert_eq!(data.len(), expected, "texel payload does not match region");
        assert!(region.x >= 0 && region.y >= 0);
        assert!(region.x as u32 + region.w <= desc.width);
        assert!(region.y as u32 + region.h <= desc.height);
    }

    fn create_uniform_set(&mut self, ctx: TransferContext, uniforms: &[UniformData]) -> Handle<UniformSet> {
        self.check_transfer(ctx);
        self.record("create_uniform_set");
        self.uniform_sets.insert(uniforms.len())
    }

    fn create_binding_set(
        &mut self,
        ctx: TransferContext,
        pipeline: Handle<Pipeline>,
        info: &BindingSetInfo,
    ) -> Handle<BindingSet> {
        self.check_transfer(ctx);
        self.record("create_binding_set");
        assert!(self.pipelines.is_valid(pipeline));
        for binding in &info.vertex_buffers {
            assert!(self.buffers.is_valid(binding.buffer));
        }
        for binding in &info.samplers {
            assert!(self.textures.is_valid(binding.texture));
        }
        self.binding_sets.insert(info.samplers.len())
    }

    fn begin_graphics(&mut self) -> GraphicsContext {
        assert!(self.active_transfer.is_none() && self.active_graphics.is_none());
        self.record("begin_graphics");
        self.generation += 1;
        self.active_graphics = Some(self.generation);
        GraphicsContext::new(self.generation)
    }

    fn end_graphics(&mut self, ctx: GraphicsContext) {
        self.check_graphics(ctx);
        self.record("end_graphics");
        self.active_graphics = None;
    }

    fn begin_default_render_pass(&mut self, ctx: GraphicsContext, _clear: bool) {
        self.check_graphics(ctx);
        self.record("begin_default_render_pass");
    }

    fn begin_render_pass(&mut self, ctx: GraphicsContext, info: RenderPassBeginInfo) {
        self.check_graphics(ctx);
        self.record("begin_render_pass");
        assert!(self.render_passes.is_valid(info.render_pass));
        assert!(self.textures.is_valid(info.color_attachment));
    }

    fn end_render_pass(&mut self, ctx: GraphicsContext) {
        self.check_graphics(ctx);
        self.record("end_render_pass");
    }

    fn bind_pipeline(&mut self, ctx: GraphicsContext, pipeline: Handle<Pipeline>) {
        self.check_graphics(ctx);
        self.record("bind_pipeline");
        assert!(self.pipelines.is_valid(pipeline));
    }

    fn bind_uniform_set(&mut self, ctx: GraphicsContext, slot: u32, set: Handle<UniformSet>) {
        self.check_graphics(ctx);
        self.record("bind_uniform_set");
        assert!(slot < 2);
        assert!(self.uniform_sets.is_valid(set));
    }

    fn bind_binding_set(&mut self, ctx: GraphicsContext, set: Handle<BindingSet>) {
        self.check_graphics(ctx);
        self.record("bind_binding_set");
        assert!(self.binding_sets.is_valid(set));
    }

    fn bind_index_buffer(&mut self, ctx: GraphicsContext, buffer: Handle<Buffer>) {
        self.check_graphics(ctx);
        self.record("bind_index_buffer");
        assert!(self.buffers.is_valid(buffer));
    }

    fn set_viewport(&mut self, ctx: GraphicsContext, _rect: Rect) {
        self.check_graphics(ctx);
    }

    fn set_scissor(&mut self, ctx: GraphicsContext, _rect: Rect) {
        self.check_graphics(ctx);
    }

    fn clear_scissor(&mut self, ctx: GraphicsContext) {
        self.check_graphics(ctx);
    }

    fn draw(&mut self, ctx: GraphicsContext, _first: u32, _count: u32) {
        self.check_graphics(ctx);
        self.record("draw");
        self.draw_calls += 1;
    }

    fn draw_indexed(&mut self, ctx: GraphicsContext, _first: u32, _count: u32) {
        self.check_graphics(ctx);
        self.record("draw_indexed");
        self.draw_calls += 1;
    }

    fn read_pixels(&mut self, ctx: GraphicsContext, rect: Rect, format: TextureFormat) -> AnyResult<Vec<u8>> {
        self.check_graphics(ctx);
        self.record("read_pixels");
        Ok(vec![0; rect.w as usize * rect.h as usize * format.bytes_per_texel()])
    }

    fn present(&mut self) -> AnyResult<()> {
        self.record("present");
        Ok(())
    }

    fn finish(&mut self) -> AnyResult<()> {
        self.record("finish");
        self.finish_calls += 1;
        self.uniform_sets.drain_all();
        self.binding_sets.drain_all();
        Ok(())
    }

    fn default_framebuffer_dimensions(&self) -> (u32, u32) {
        self.dimensions
    }
}
