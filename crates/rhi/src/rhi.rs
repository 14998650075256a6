//! The backend contract.
//!
//! One frame through a backend looks like:
//!
//! 1. resource creation/destruction (no scope open),
//! 2. `begin_transfer` .. uploads and transient set building .. `end_transfer`,
//! 3. `begin_graphics` .. passes, binds, draws .. `end_graphics`,
//! 4. `present`, then `finish`.
//!
//! Destruction requested via `destroy_*` is deferred until `finish()` so a
//! resource referenced by just-submitted commands is never freed mid-frame.
//! Contract violations (wrong scope, stale token, stale handle) are assertion
//! failures in the backend, fatal by design; driver-dependent failures
//! (pipeline compilation, device loss, readback) surface as errors.

use crate::context::{GraphicsContext, TransferContext};
use crate::handle::Handle;
use crate::types::{
    BindingSet, Buffer, BufferDesc, Color, Pipeline, PipelineDesc, Rect, RenderPass,
    RenderPassDesc, Renderbuffer, RenderbufferDesc, Texture, TextureDesc, TextureFormat,
    UniformData, UniformSet,
};
use anyhow::Result as AnyResult;

/// One vertex buffer bound into a binding set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexBufferBinding {
    pub buffer: Handle<Buffer>,
    pub offset: usize,
}

/// One texture bound to a sampler slot inside a binding set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureBinding {
    pub texture: Handle<Texture>,
}

/// Everything a draw needs bound besides pipeline and uniforms.
///
/// Samplers are assigned to the pipeline's declared sampler slots in order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BindingSetInfo {
    pub vertex_buffers: Vec<VertexBufferBinding>,
    pub samplers: Vec<TextureBinding>,
}

/// Attachments and clear state for entering a render pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderPassBeginInfo {
    pub render_pass: Handle<RenderPass>,
    pub color_attachment: Handle<Texture>,
    pub depth_stencil_attachment: Option<Handle<Renderbuffer>>,
    pub clear_color: Color,
}

/// Backend-agnostic GPU resource and command interface.
///
/// Object safe: passes hold `&mut dyn Rhi` and never know which backend is
/// underneath. Handles are only meaningful for the backend instance that
/// created them; swapping backends means tearing down and rebuilding every
/// pass, never migrating handles.
pub trait Rhi {
    // -- resource creation/destruction (outside any graphics scope) --

    /// Create a texture. The descriptor is immutable for the texture's lifetime.
    fn create_texture(&mut self, desc: TextureDesc) -> Handle<Texture>;

    /// Create a vertex or index buffer of fixed size.
    fn create_buffer(&mut self, desc: BufferDesc) -> Handle<Buffer>;

    /// Create a depth/stencil renderbuffer.
    fn create_renderbuffer(&mut self, desc: RenderbufferDesc) -> Handle<Renderbuffer>;

    /// Create a render pass configuration.
    fn create_render_pass(&mut self, desc: RenderPassDesc) -> Handle<RenderPass>;

    /// Compile and link a pipeline.
    ///
    /// # Errors
    /// Fails when shader compilation fails or when the descriptor's declared
    /// attribute/uniform/sampler sets do not exactly match the program's
    /// requirements; the error carries the compiler or validation log.
    fn create_pipeline(&mut self, desc: PipelineDesc) -> AnyResult<Handle<Pipeline>>;

    /// Queue a texture for destruction at the next `finish()`.
    fn destroy_texture(&mut self, handle: Handle<Texture>);
    /// Queue a buffer for destruction at the next `finish()`.
    fn destroy_buffer(&mut self, handle: Handle<Buffer>);
    /// Queue a renderbuffer for destruction at the next `finish()`.
    fn destroy_renderbuffer(&mut self, handle: Handle<Renderbuffer>);
    /// Queue a render pass for destruction at the next `finish()`.
    fn destroy_render_pass(&mut self, handle: Handle<RenderPass>);
    /// Queue a pipeline for destruction at the next `finish()`.
    fn destroy_pipeline(&mut self, handle: Handle<Pipeline>);

    /// True while `handle` refers to a live, not-yet-destroyed texture.
    fn is_texture_valid(&self, handle: Handle<Texture>) -> bool;
    /// True while `handle` refers to a live, not-yet-destroyed buffer.
    fn is_buffer_valid(&self, handle: Handle<Buffer>) -> bool;
    /// True while `handle` refers to a live, not-yet-destroyed pipeline.
    fn is_pipeline_valid(&self, handle: Handle<Pipeline>) -> bool;

    // -- transfer scope --

    /// Open the frame's transfer scope.
    fn begin_transfer(&mut self) -> TransferContext;

    /// Close the transfer scope opened with `ctx`.
    fn end_transfer(&mut self, ctx: TransferContext);

    /// Replace `data.len()` bytes of `buffer` starting at `offset`.
    fn update_buffer(&mut self, ctx: TransferContext, buffer: Handle<Buffer>, offset: usize, data: &[u8]);

    /// Replace a region of `texture`. `data` is tightly packed rows of
    /// `region.w` texels in the texture's own format.
    fn update_texture(&mut self, ctx: TransferContext, texture: Handle<Texture>, region: Rect, data: &[u8]);

    /// Build a transient uniform set; freed automatically at `finish()`.
    fn create_uniform_set(&mut self, ctx: TransferContext, uniforms: &[UniformData]) -> Handle<UniformSet>;

    /// Build a transient binding set from currently valid handles; freed
    /// automatically at `finish()`.
    fn create_binding_set(
        &mut self,
        ctx: TransferContext,
        pipeline: Handle<Pipeline>,
        info: &BindingSetInfo,
    ) -> Handle<BindingSet>;

    // -- graphics scope --

    /// Open the frame's graphics scope.
    fn begin_graphics(&mut self) -> GraphicsContext;

    /// Close the graphics scope opened with `ctx`.
    fn end_graphics(&mut self, ctx: GraphicsContext);

    /// Enter a pass targeting the default framebuffer (the swap chain image
    /// or the headless target).
    fn begin_default_render_pass(&mut self, ctx: GraphicsContext, clear: bool);

    /// Enter a pass targeting the given attachments.
    fn begin_render_pass(&mut self, ctx: GraphicsContext, info: RenderPassBeginInfo);

    /// Leave the current pass.
    fn end_render_pass(&mut self, ctx: GraphicsContext);

    /// Bind a pipeline for subsequent draws.
    fn bind_pipeline(&mut self, ctx: GraphicsContext, pipeline: Handle<Pipeline>);

    /// Bind a uniform set to a numbered slot (0 = per-frame, 1 = per-draw).
    fn bind_uniform_set(&mut self, ctx: GraphicsContext, slot: u32, set: Handle<UniformSet>);

    /// Bind a binding set (vertex buffers + samplers).
    fn bind_binding_set(&mut self, ctx: GraphicsContext, set: Handle<BindingSet>);

    /// Bind the index buffer for `draw_indexed`.
    fn bind_index_buffer(&mut self, ctx: GraphicsContext, buffer: Handle<Buffer>);

    /// Set the viewport in pixels.
    fn set_viewport(&mut self, ctx: GraphicsContext, rect: Rect);

    /// Restrict rasterization to `rect`.
    fn set_scissor(&mut self, ctx: GraphicsContext, rect: Rect);

    /// Remove any scissor restriction.
    fn clear_scissor(&mut self, ctx: GraphicsContext);

    /// Draw `count` unindexed vertices starting at `first`.
    fn draw(&mut self, ctx: GraphicsContext, first: u32, count: u32);

    /// Draw `count` indices starting at index `first` of the bound index buffer.
    fn draw_indexed(&mut self, ctx: GraphicsContext, first: u32, count: u32);

    /// Read back a rectangle of the most recently targeted color attachment
    /// as tightly packed rows in `format`.
    ///
    /// # Errors
    /// Fails if the GPU readback itself fails.
    fn read_pixels(&mut self, ctx: GraphicsContext, rect: Rect, format: TextureFormat) -> AnyResult<Vec<u8>>;

    // -- frame end --

    /// Flip the swap chain. No-op for headless backends.
    ///
    /// # Errors
    /// Fails if the surface was lost.
    fn present(&mut self) -> AnyResult<()>;

    /// Free per-frame transients (uniform sets, binding sets) and run the
    /// deferred destruction queue. Idempotent when no new work was recorded.
    ///
    /// # Errors
    /// Fails if pending GPU work could not be flushed.
    fn finish(&mut self) -> AnyResult<()>;

    /// Current drawable size of the default framebuffer in pixels.
    fn default_framebuffer_dimensions(&self) -> (u32, u32);
}
