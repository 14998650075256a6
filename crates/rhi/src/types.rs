//! Resource kinds, descriptors, and value types shared by every backend.
//!
//! Descriptors are immutable creation-time configuration: a resource's desc
//! never changes after creation. Changing any parameter means destroying the
//! resource and creating a new one.

use crate::program::PipelineProgram;

/// Handle kind marker for 2D textures.
#[derive(Debug)]
pub enum Texture {}

/// Handle kind marker for vertex/index buffers.
#[derive(Debug)]
pub enum Buffer {}

/// Handle kind marker for depth/stencil renderbuffers.
#[derive(Debug)]
pub enum Renderbuffer {}

/// Handle kind marker for render pass configurations.
#[derive(Debug)]
pub enum RenderPass {}

/// Handle kind marker for compiled pipelines.
#[derive(Debug)]
pub enum Pipeline {}

/// Handle kind marker for transient uniform sets.
#[derive(Debug)]
pub enum UniformSet {}

/// Handle kind marker for transient binding sets.
#[derive(Debug)]
pub enum BindingSet {}

/// Texel layout of a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    /// 8-bit RGBA color.
    Rgba8,
    /// Two 8-bit channels: palette index in R, coverage alpha in G.
    ///
    /// This is the format of every paletted image in the pipeline (patches,
    /// flats, atlas pages).
    IndexAlpha8,
    /// Single 8-bit channel; used for colormap/lighttable rows and wipe masks.
    R8,
}

impl TextureFormat {
    /// Bytes per texel for CPU-side staging buffers.
    pub const fn bytes_per_texel(self) -> usize {
        match self {
            Self::Rgba8 => 4,
            Self::IndexAlpha8 => 2,
            Self::R8 => 1,
        }
    }
}

/// Creation-time texture configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureDesc {
    pub format: TextureFormat,
    pub width: u32,
    pub height: u32,
    /// Texture will be attached as a render target color attachment.
    pub renderable: bool,
}

/// What a buffer will be bound as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferUsage {
    Vertex,
    Index,
}

/// Creation-time buffer configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferDesc {
    pub size: usize,
    pub usage: BufferUsage,
}

/// Creation-time renderbuffer (depth/stencil) configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderbufferDesc {
    pub width: u32,
    pub height: u32,
}

/// What happens to an attachment's contents when a render pass begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentLoadOp {
    /// Clear to the color given at `begin_render_pass` time.
    Clear,
    /// Keep whatever was rendered previously.
    Load,
}

/// Creation-time render pass configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderPassDesc {
    pub use_depth_stencil: bool,
    pub color_load_op: AttachmentLoadOp,
}

/// Alpha blending equation for a pipeline's color target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendMode {
    /// No blending; source replaces destination.
    Opaque,
    /// Classic `src_alpha / one_minus_src_alpha` transparency.
    Alpha,
    /// Source added onto destination.
    Additive,
    /// Source subtracted from destination.
    Subtractive,
    /// Source minus destination.
    ReverseSubtractive,
    /// Destination multiplied by source color.
    Modulate,
}

/// Primitive assembly for a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Triangles,
    Lines,
}

/// Face culling for a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CullMode {
    None,
    Back,
}

/// Vertex attributes a program can consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexAttributeName {
    Position,
    TexCoord0,
    Colors,
}

/// Component layout of one vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexAttributeFormat {
    Float2,
    Float3,
    Float4,
}

impl VertexAttributeFormat {
    /// Size of one attribute value in bytes.
    pub const fn byte_size(self) -> usize {
        match self {
            Self::Float2 => 8,
            Self::Float3 => 12,
            Self::Float4 => 16,
        }
    }
}

/// One attribute sourced from a vertex buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    pub name: VertexAttributeName,
    pub format: VertexAttributeFormat,
    /// Index into [`VertexInputDesc::buffer_layouts`].
    pub buffer_index: u32,
    /// Byte offset inside the vertex.
    pub offset: usize,
}

/// Stride of one bound vertex buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexBufferLayout {
    pub stride: usize,
}

/// Full vertex fetch configuration of a pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VertexInputDesc {
    pub buffer_layouts: Vec<VertexBufferLayout>,
    pub attributes: Vec<VertexAttribute>,
}

/// Uniforms a program can consume, grouped into numbered sets by convention:
/// set 0 carries per-frame data, set 1 per-draw data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformName {
    Projection,
    ModelView,
    TexCoord0Transform,
    /// 1 when sampler 0 is an index+alpha paletted texture, 0 for plain RGBA.
    Sampler0IsIndexedAlpha,
    /// Wipe colorize style for the postprocess wipe program.
    WipeColorizeMode,
    /// Postimg effect selector and animation phase.
    PostimgEffect,
}

/// Samplers a program can consume, by binding slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SamplerName {
    Sampler0,
    Sampler1,
    Sampler2,
    Sampler3,
}

/// Creation-time pipeline configuration.
///
/// The enabled uniform and sampler lists must exactly match what the program
/// requires for this configuration; `create_pipeline` fails otherwise, because
/// a mismatch means future draws would read undefined data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineDesc {
    pub program: PipelineProgram,
    pub vertex_input: VertexInputDesc,
    pub uniform_input: Vec<UniformName>,
    pub sampler_input: Vec<SamplerName>,
    pub primitive: PrimitiveType,
    pub cull: CullMode,
    pub blend: BlendMode,
    pub depth_test: bool,
}

/// One uniform value inside a uniform set, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformData {
    Float(f32),
    Int(i32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    /// Column-major 4x4 matrix.
    Mat4([[f32; 4]; 4]),
}

/// RGBA color with components in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const TRANSPARENT: Self = Self::new(0.0, 0.0, 0.0, 0.0);
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }
}

/// Integer pixel rectangle (viewport, scissor, texture region).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: u32,
    pub h: u32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    /// True if the two rectangles share any area.
    pub fn intersects(&self, other: &Self) -> bool {
        let a_right = self.x + self.w as i32;
        let a_bottom = self.y + self.h as i32;
        let b_right = other.x + other.w as i32;
        let b_bottom = other.y + other.h as i32;
        self.x < b_right && other.x < a_right && self.y < b_bottom && other.y < a_bottom
    }
}

/// Column-major orthographic projection mapping pixel space to clip space.
///
/// Top-left origin, y down, matching the 2D pipeline's coordinate convention.
pub fn ortho_projection(width: f32, height: f32) -> [[f32; 4]; 4] {
    let sx = 2.0 / width;
    let sy = -2.0 / height;
    [
        [sx, 0.0, 0.0, 0.0],
        [0.0, sy, 0.0, 0.0],
        [0.0, 0.0, 1.0, 0.0],
        [-1.0, 1.0, 0.0, 1.0],
    ]
}

/// Column-major identity matrix.
pub const fn identity_matrix() -> [[f32; 4]; 4] {
    [
        [1.0, 0.0, 0.0, 0.0],
        [0.0, 1.0, 0.0, 0.0],
        [0.0, 0.0, 1.0, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_intersection() {
        let a = Rect::new(0, 0, 10, 10);
        assert!(a.intersects(&Rect::new(5, 5, 10, 10)));
        assert!(!a.intersects(&Rect::new(10, 0, 5, 5)));
        assert!(!a.intersects(&Rect::new(0, 10, 5, 5)));
    }

    #[test]
    fn ortho_maps_corners() {
        let m = ortho_projection(320.0, 200.0);
        // Origin maps to the top-left of clip space.
        assert!((m[3][0] - (-1.0)).abs() < f32::EPSILON);
        assert!((m[3][1] - 1.0).abs() < f32::EPSILON);
        // x scale reaches +1 at the right edge: 320 * sx - 1 == 1.
        assert!((320.0 * m[0][0] - 2.0).abs() < 1e-6);
    }
}
