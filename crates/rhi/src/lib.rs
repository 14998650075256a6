//! Backend-agnostic render hardware interface (RHI).
//!
//! This crate defines the resource and command contract every GPU backend
//! implements: generation-tagged handles into generational arenas, immutable
//! resource descriptors, pipeline program requirement tables, and the [`Rhi`]
//! trait with its transfer/graphics context tokens. Backends live in their own
//! crates and own the native GPU objects; everything above the backend speaks
//! exclusively in [`Handle`]s.

pub mod context;
pub mod handle;
pub mod program;
pub mod rhi;
pub mod types;

pub use context::{GraphicsContext, TransferContext};
pub use handle::{Handle, Slab};
pub use program::{
    PipelineProgram, ProgramRequirements, program_requirements, validate_pipeline_interface,
};
pub use rhi::{
    BindingSetInfo, RenderPassBeginInfo, Rhi, TextureBinding, VertexBufferBinding,
};
pub use types::{
    AttachmentLoadOp, BindingSet, BlendMode, Buffer, BufferDesc, BufferUsage, Color, CullMode,
    Pipeline, PipelineDesc, PrimitiveType, Rect, RenderPass, RenderPassDesc, Renderbuffer,
    RenderbufferDesc, SamplerName, Texture, TextureDesc, TextureFormat, UniformData, UniformName,
    UniformSet, VertexAttribute, VertexAttributeFormat, VertexAttributeName, VertexBufferLayout,
    VertexInputDesc, identity_matrix, ortho_projection,
};
