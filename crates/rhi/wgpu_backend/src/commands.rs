//! Logical graphics commands recorded during the graphics scope.
//!
//! wgpu render passes borrow the command encoder, so the graphics scope does
//! not issue native commands directly. It records this logical stream and
//! `end_graphics` replays it into real passes in one go.

use rhi::{BindingSet, Buffer, Color, Handle, Pipeline, Rect, RenderPassBeginInfo, UniformSet};

#[derive(Debug, Clone, Copy)]
pub(crate) enum GfxCmd {
    BeginDefaultPass { clear: bool },
    BeginPass(RenderPassBeginInfo),
    EndPass,
    BindPipeline(Handle<Pipeline>),
    BindUniformSet { slot: u32, set: Handle<UniformSet> },
    BindBindingSet(Handle<BindingSet>),
    BindIndexBuffer(Handle<Buffer>),
    SetViewport(Rect),
    SetScissor(Rect),
    ClearScissor,
    Draw { first: u32, count: u32 },
    DrawIndexed { first: u32, count: u32 },
}

/// Clear color used for the default framebuffer.
pub(crate) const DEFAULT_CLEAR: Color = Color::BLACK;
