//! Batched rendering of recorded 2D command lists.
//!
//! Prepass resolves every patch through the atlas and every flat through the
//! flat manager, rewrites patch-quad vertices into atlas UV space, and
//! greedily merges adjacent commands that share GPU state. Transfer uploads
//! the staging buffers and builds the frame's uniform/binding sets, and
//! graphics issues one indexed draw per merged command into the main
//! framebuffer.

use crate::atlas::PatchAtlasCache;
use crate::flats::FlatTextureManager;
use crate::framebuffers::FramebufferManager;
use crate::image_source::{Colormap, FlatId, ImageSource, PatchId};
use crate::palette::PaletteManager;
use crate::pass::Pass;
use crate::twodee::{Draw2dCmd, Draw2dList, Twodee};
use anyhow::Result as AnyResult;
use rhi::{
    BindingSetInfo, BlendMode, Buffer, BufferDesc, BufferUsage, Color, CullMode, GraphicsContext,
    Handle, Pipeline, PipelineDesc, PipelineProgram, PrimitiveType, Rect, RenderPass,
    RenderPassBeginInfo, RenderPassDesc, Rhi, SamplerName, TextureBinding, TransferContext,
    UniformData, UniformName, VertexAttribute, VertexAttributeFormat, VertexAttributeName,
    VertexBufferBinding, VertexBufferLayout, VertexInputDesc, AttachmentLoadOp,
    ortho_projection, identity_matrix,
};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Texture identity a merged command draws with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedTexture {
    Untextured,
    /// Index of an atlas page.
    AtlasPage(usize),
    Flat(FlatId),
}

/// A run of adjacent commands sharing blend, topology, texture, and colormap,
/// drawn with a single indexed draw over `[index_offset, index_offset + elements)`.
#[derive(Debug, Clone)]
pub struct MergedCommand {
    pub blend: BlendMode,
    pub lines: bool,
    pub texture: ResolvedTexture,
    pub colormap: Option<Colormap>,
    pub index_offset: u32,
    pub elements: u32,
}

fn colormap_matches(a: Option<&Colormap>, b: Option<&Colormap>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => Rc::ptr_eq(a, b),
        (None, None) => true,
        _ => false,
    }
}

/// Greedy order-preserving merge of one list's commands.
///
/// A new merged command starts exactly when the pipeline key
/// (blend x topology), the resolved texture, or the colormap pointer changes
/// from the previous command; adjacent commands with identical state
/// coalesce. Commands are never reordered, so layering is preserved, and the
/// produced ranges tile `[0, total_elements)` exactly.
pub fn merge_list<F>(list: &Draw2dList, resolve_patch: F) -> Vec<MergedCommand>
where
    F: Fn(PatchId) -> ResolvedTexture,
{
    let mut merged: Vec<MergedCommand> = Vec::new();
    let mut next_index = 0u32;

    for cmd in &list.commands {
        let (blend, lines, texture, colormap) = match cmd {
            Draw2dCmd::Quad(quad) => {
                let texture = match quad.source {
                    crate::twodee::QuadSource::None => ResolvedTexture::Untextured,
                    crate::twodee::QuadSource::Patch(id) => resolve_patch(id),
                    crate::twodee::QuadSource::Flat(id) => ResolvedTexture::Flat(id),
                };
                (quad.blend, false, texture, quad.colormap.as_ref())
            }
            Draw2dCmd::Verts(verts) => (
                verts.blend,
                verts.lines,
                ResolvedTexture::Untextured,
                verts.colormap.as_ref(),
            ),
        };
        let elements = cmd.elements();

        let extend = merged.last().is_some_and(|last| {
            last.blend == blend
                && last.lines == lines
                && last.texture == texture
                && colormap_matches(last.colormap.as_ref(), colormap)
        });
        if extend {
            merged.last_mut().unwrap().elements += elements;
        } else {
            merged.push(MergedCommand {
                blend,
                lines,
                texture,
                colormap: colormap.cloned(),
                index_offset: next_index,
                elements,
            });
        }
        next_index += elements;
    }
    merged
}

/// Rewrite each patch/flat quad's four vertices: map positions to the packed
/// sub-rectangle, derive UVs from the atlas rect (or the whole texture),
/// honor flips, and clamp to the optional clip rect with UVs re-derived from
/// the clamped positions so clipped edges sample the right partial range.
fn rewrite_quads(list: &mut Draw2dList, atlas: &PatchAtlasCache, page_size: f32) {
    let mut vertex = 0usize;
    for cmd in &list.commands {
        match cmd {
            Draw2dCmd::Verts(verts) => vertex += verts.elements as usize,
            Draw2dCmd::Quad(quad) => {
                let base = vertex;
                vertex += 4;

                // Screen rect and UV range of what the quad actually samples.
                let (mut rect, mut u, mut v) = match quad.source {
                    crate::twodee::QuadSource::Patch(id) => {
                        let Some(entry) = atlas.entry(id) else {
                            continue;
                        };
                        // Scale from whole-sprite space to screen space, then
                        // take just the trimmed region.
                        let sx = (quad.xmax - quad.xmin) / entry.orig_width as f32;
                        let sy = (quad.ymax - quad.ymin) / entry.orig_height as f32;
                        let (tx, tw) = (entry.trim_x as f32, entry.width as f32);
                        let (ty, th) = (entry.trim_y as f32, entry.height as f32);
                        let rect = if quad.flip {
                            let x1 = quad.xmax - tx * sx;
                            [x1 - tw * sx, 0.0, x1, 0.0]
                        } else {
                            let x0 = quad.xmin + tx * sx;
                            [x0, 0.0, x0 + tw * sx, 0.0]
                        };
                        let rect = if quad.vflip {
                            let y1 = quad.ymax - ty * sy;
                            [rect[0], y1 - th * sy, rect[2], y1]
                        } else {
                            let y0 = quad.ymin + ty * sy;
                            [rect[0], y0, rect[2], y0 + th * sy]
                        };
                        let u0 = entry.x as f32 / page_size;
                        let u1 = (entry.x + entry.width) as f32 / page_size;
                        let v0 = entry.y as f32 / page_size;
                        let v1 = (entry.y + entry.height) as f32 / page_size;
                        (rect, [u0, u1], [v0, v1])
                    }
                    _ => (
                        [quad.xmin, quad.ymin, quad.xmax, quad.ymax],
                        [0.0, 1.0],
                        [0.0, 1.0],
                    ),
                };
                if quad.flip {
                    u.swap(0, 1);
                }
                if quad.vflip {
                    v.swap(0, 1);
                }

                let unclipped = rect;
                if let Some(clip) = quad.clip {
                    rect[0] = rect[0].max(clip[0]);
                    rect[1] = rect[1].max(clip[1]);
                    rect[2] = rect[2].min(clip[2]);
                    rect[3] = rect[3].min(clip[3]);
                    if rect[2] < rect[0] {
                        rect[2] = rect[0];
                    }
                    if rect[3] < rect[1] {
                        rect[3] = rect[1];
                    }
                }

                let span_x = (unclipped[2] - unclipped[0]).max(f32::EPSILON);
                let span_y = (unclipped[3] - unclipped[1]).max(f32::EPSILON);
                let uv_at = |x: f32, y: f32| {
                    let tx = (x - unclipped[0]) / span_x;
                    let ty = (y - unclipped[1]) / span_y;
                    [u[0] + tx * (u[1] - u[0]), v[0] + ty * (v[1] - v[0])]
                };

                let corners = [
                    (rect[0], rect[1]),
                    (rect[2], rect[1]),
                    (rect[2], rect[3]),
                    (rect[0], rect[3]),
                ];
                for (i, (x, y)) in corners.into_iter().enumerate() {
                    let vtx = &mut list.vertices[base + i];
                    vtx.position[0] = x;
                    vtx.position[1] = y;
                    vtx.uv = uv_at(x, y);
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct PipelineKey {
    blend: BlendMode,
    lines: bool,
    textured: bool,
}

/// One ready-to-issue draw built during the transfer phase.
struct DrawCall {
    pipeline: Handle<Pipeline>,
    binding_set: Handle<rhi::BindingSet>,
    textured: bool,
    index_offset: u32,
    elements: u32,
}

struct ListFrame {
    vertex_buffer: Handle<Buffer>,
    index_buffer: Handle<Buffer>,
    merged: Vec<MergedCommand>,
    draws: Vec<DrawCall>,
}

/// Transient uniform sets shared by this frame's draws.
struct FrameSets {
    paletted: Handle<rhi::UniformSet>,
    unshaded: Handle<rhi::UniformSet>,
    indexed_draw: Handle<rhi::UniformSet>,
}

/// The pass that consumes the frame's [`Twodee`] recording.
pub struct TwodeeRenderer {
    source: Rc<dyn ImageSource>,
    palette: Rc<RefCell<PaletteManager>>,
    flats: Rc<RefCell<FlatTextureManager>>,
    framebuffers: Rc<RefCell<FramebufferManager>>,
    atlas: PatchAtlasCache,
    pipelines: HashMap<PipelineKey, Handle<Pipeline>>,
    render_pass: Option<Handle<RenderPass>>,
    current: Option<Twodee>,
    frame_lists: Vec<ListFrame>,
    frame_sets: Option<FrameSets>,
}

fn vertex_input(textured: bool) -> VertexInputDesc {
    let mut attributes = vec![VertexAttribute {
        name: VertexAttributeName::Position,
        format: VertexAttributeFormat::Float3,
        buffer_index: 0,
        offset: 0,
    }];
    if textured {
        attributes.push(VertexAttribute {
            name: VertexAttributeName::TexCoord0,
            format: VertexAttributeFormat::Float2,
            buffer_index: 0,
            offset: 12,
        });
    }
    attributes.push(VertexAttribute {
        name: VertexAttributeName::Colors,
        format: VertexAttributeFormat::Float4,
        buffer_index: 0,
        offset: 20,
    });
    VertexInputDesc {
        buffer_layouts: vec![VertexBufferLayout { stride: 36 }],
        attributes,
    }
}

impl TwodeeRenderer {
    pub fn new(
        source: Rc<dyn ImageSource>,
        palette: Rc<RefCell<PaletteManager>>,
        flats: Rc<RefCell<FlatTextureManager>>,
        framebuffers: Rc<RefCell<FramebufferManager>>,
    ) -> Self {
        Self {
            source,
            palette,
            flats,
            framebuffers,
            atlas: PatchAtlasCache::new(),
            pipelines: HashMap::new(),
            render_pass: None,
            current: None,
            frame_lists: Vec::new(),
            frame_sets: None,
        }
    }

    /// Hand over the frame's finished recording. Call before `run_frame`.
    pub fn set_frame(&mut self, twodee: Twodee) {
        self.current = Some(twodee);
    }

    pub fn atlas(&self) -> &PatchAtlasCache {
        &self.atlas
    }

    fn pipeline_for(&mut self, rhi: &mut dyn Rhi, key: PipelineKey) -> AnyResult<Handle<Pipeline>> {
        if let Some(&pipeline) = self.pipelines.get(&key) {
            return Ok(pipeline);
        }
        let desc = if key.textured {
            PipelineDesc {
                program: PipelineProgram::UnshadedPaletted,
                vertex_input: vertex_input(true),
                uniform_input: vec![
                    UniformName::Projection,
                    UniformName::ModelView,
                    UniformName::TexCoord0Transform,
                    UniformName::Sampler0IsIndexedAlpha,
                ],
                sampler_input: vec![
                    SamplerName::Sampler0,
                    SamplerName::Sampler1,
                    SamplerName::Sampler2,
                ],
                primitive: if key.lines {
                    PrimitiveType::Lines
                } else {
                    PrimitiveType::Triangles
                },
                cull: CullMode::None,
                blend: key.blend,
                depth_test: false,
            }
        } else {
            PipelineDesc {
                program: PipelineProgram::Unshaded,
                vertex_input: vertex_input(false),
                uniform_input: vec![UniformName::Projection, UniformName::ModelView],
                sampler_input: Vec::new(),
                primitive: if key.lines {
                    PrimitiveType::Lines
                } else {
                    PrimitiveType::Triangles
                },
                cull: CullMode::None,
                blend: key.blend,
                depth_test: false,
            }
        };
        let pipeline = rhi.create_pipeline(desc)?;
        self.pipelines.insert(key, pipeline);
        Ok(pipeline)
    }

    /// Texture handle behind a merged command's resolved identity.
    fn resolve_texture_handle(&self, texture: ResolvedTexture) -> Option<Handle<rhi::Texture>> {
        match texture {
            ResolvedTexture::Untextured => None,
            ResolvedTexture::AtlasPage(page) => Some(self.atlas.page_texture(page)),
            ResolvedTexture::Flat(id) => self.flats.borrow().lookup(id),
        }
    }
}

impl Pass for TwodeeRenderer {
    fn prepass(&mut self, rhi: &mut dyn Rhi) -> AnyResult<()> {
        if self.render_pass.is_none() {
            self.render_pass = Some(rhi.create_render_pass(RenderPassDesc {
                use_depth_stencil: false,
                color_load_op: AttachmentLoadOp::Clear,
            }));
        }

        let Some(mut twodee) = self.current.take() else {
            return Ok(());
        };

        // Resolve every referenced image and colormap before packing, so the
        // earlier managers' transfer phases upload everything this frame.
        for list in twodee.lists() {
            for cmd in &list.commands {
                let colormap = match cmd {
                    Draw2dCmd::Quad(quad) => {
                        match quad.source {
                            crate::twodee::QuadSource::Patch(id) => {
                                if self.atlas.entry(id).is_none()
                                    && let Some(data) = self.source.patch(id)
                                {
                                    self.atlas.queue_patch(id, data);
                                }
                            }
                            crate::twodee::QuadSource::Flat(id) => {
                                if let Some(data) = self.source.flat(id) {
                                    drop(self.flats.borrow_mut().find_or_create_indexed(
                                        rhi, id, &data,
                                    ));
                                }
                            }
                            crate::twodee::QuadSource::None => {}
                        }
                        quad.colormap.as_ref()
                    }
                    Draw2dCmd::Verts(verts) => verts.colormap.as_ref(),
                };
                if let Some(colormap) = colormap {
                    drop(self.palette.borrow_mut().find_or_create_colormap(rhi, colormap));
                }
            }
        }

        self.atlas.pack_patches(rhi);

        let page_size = self.atlas.page_size() as f32;
        for list in twodee.lists_mut() {
            rewrite_quads(list, &self.atlas, page_size);
        }

        self.frame_lists.clear();
        let atlas = &self.atlas;
        for list in twodee.lists() {
            if list.commands.is_empty() {
                continue;
            }
            let merged = merge_list(list, |id| {
                atlas
                    .entry(id)
                    .map_or(ResolvedTexture::Untextured, |entry| {
                        ResolvedTexture::AtlasPage(entry.page)
                    })
            });
            let vertex_buffer = rhi.create_buffer(BufferDesc {
                size: std::mem::size_of_val(list.vertices.as_slice()),
                usage: BufferUsage::Vertex,
            });
            let index_buffer = rhi.create_buffer(BufferDesc {
                size: std::mem::size_of_val(list.indices.as_slice()),
                usage: BufferUsage::Index,
            });
            self.frame_lists.push(ListFrame {
                vertex_buffer,
                index_buffer,
                merged,
                draws: Vec::new(),
            });
        }

        // Pipelines for this frame's keys; creation failures are fatal.
        let keys: Vec<PipelineKey> = self
            .frame_lists
            .iter()
            .flat_map(|frame| frame.merged.iter())
            .map(|cmd| PipelineKey {
                blend: cmd.blend,
                lines: cmd.lines,
                textured: !matches!(cmd.texture, ResolvedTexture::Untextured),
            })
            .collect();
        for key in keys {
            drop(self.pipeline_for(rhi, key)?);
        }

        self.current = Some(twodee);
        Ok(())
    }

    fn transfer(&mut self, rhi: &mut dyn Rhi, ctx: TransferContext) -> AnyResult<()> {
        self.atlas.upload_pending(rhi, ctx);

        let Some(twodee) = self.current.take() else {
            return Ok(());
        };
        let (width, height) = {
            let fb = self.framebuffers.borrow();
            (fb.width(), fb.height())
        };
        let projection = ortho_projection(width as f32, height as f32);
        let paletted_frame_set = rhi.create_uniform_set(
            ctx,
            &[
                UniformData::Mat4(projection),
                UniformData::Mat4(identity_matrix()),
                UniformData::Mat4(identity_matrix()),
            ],
        );
        let unshaded_frame_set = rhi.create_uniform_set(
            ctx,
            &[
                UniformData::Mat4(projection),
                UniformData::Mat4(identity_matrix()),
            ],
        );
        let indexed_draw_set = rhi.create_uniform_set(ctx, &[UniformData::Int(1)]);
        let palette_texture = self.palette.borrow().palette_texture();
        let default_colormap = self.palette.borrow().default_colormap();

        let lists_with_commands: Vec<&Draw2dList> = twodee
            .lists()
            .iter()
            .filter(|list| !list.commands.is_empty())
            .collect();
        for (frame_index, list) in lists_with_commands.into_iter().enumerate() {
            let vertex_buffer = self.frame_lists[frame_index].vertex_buffer;
            let index_buffer = self.frame_lists[frame_index].index_buffer;
            rhi.update_buffer(ctx, vertex_buffer, 0, bytemuck::cast_slice(&list.vertices));
            rhi.update_buffer(ctx, index_buffer, 0, bytemuck::cast_slice(&list.indices));

            let merged = self.frame_lists[frame_index].merged.clone();
            let mut draws = Vec::with_capacity(merged.len());
            for cmd in &merged {
                let textured = !matches!(cmd.texture, ResolvedTexture::Untextured);
                let key = PipelineKey {
                    blend: cmd.blend,
                    lines: cmd.lines,
                    textured,
                };
                let pipeline = self.pipeline_for(rhi, key)?;
                let mut samplers = Vec::new();
                if textured {
                    let source_texture = self
                        .resolve_texture_handle(cmd.texture)
                        .unwrap_or(default_colormap);
                    let colormap_texture = cmd.colormap.as_ref().map_or(default_colormap, |map| {
                        self.palette.borrow_mut().find_or_create_colormap(rhi, map)
                    });
                    samplers = vec![
                        TextureBinding { texture: source_texture },
                        TextureBinding { texture: palette_texture },
                        TextureBinding { texture: colormap_texture },
                    ];
                }
                let binding_set = rhi.create_binding_set(
                    ctx,
                    pipeline,
                    &BindingSetInfo {
                        vertex_buffers: vec![VertexBufferBinding {
                            buffer: vertex_buffer,
                            offset: 0,
                        }],
                        samplers,
                    },
                );
                draws.push(DrawCall {
                    pipeline,
                    binding_set,
                    textured,
                    index_offset: cmd.index_offset,
                    elements: cmd.elements,
                });
            }
            self.frame_lists[frame_index].draws = draws;
        }

        self.frame_sets = Some(FrameSets {
            paletted: paletted_frame_set,
            unshaded: unshaded_frame_set,
            indexed_draw: indexed_draw_set,
        });
        self.current = Some(twodee);
        Ok(())
    }

    fn graphics(&mut self, rhi: &mut dyn Rhi, ctx: GraphicsContext) -> AnyResult<()> {
        let (main_color, width, height) = {
            let fb = self.framebuffers.borrow();
            (fb.main_color(), fb.width(), fb.height())
        };
        let render_pass = self.render_pass.expect("render pass created in prepass");
        rhi.begin_render_pass(
            ctx,
            RenderPassBeginInfo {
                render_pass,
                color_attachment: main_color,
                depth_stencil_attachment: None,
                clear_color: Color::BLACK,
            },
        );
        rhi.set_viewport(ctx, Rect { x: 0, y: 0, w: width, h: height });

        if let Some(sets) = &self.frame_sets {
            for frame in &self.frame_lists {
                rhi.bind_index_buffer(ctx, frame.index_buffer);
                for draw in &frame.draws {
                    rhi.bind_pipeline(ctx, draw.pipeline);
                    if draw.textured {
                        rhi.bind_uniform_set(ctx, 0, sets.paletted);
                        rhi.bind_uniform_set(ctx, 1, sets.indexed_draw);
                    } else {
                        rhi.bind_uniform_set(ctx, 0, sets.unshaded);
                    }
                    rhi.bind_binding_set(ctx, draw.binding_set);
                    rhi.draw_indexed(ctx, draw.index_offset, draw.elements);
                }
            }
        }
        rhi.end_render_pass(ctx);
        Ok(())
    }

    fn postpass(&mut self, rhi: &mut dyn Rhi) -> AnyResult<()> {
        for frame in self.frame_lists.drain(..) {
            rhi.destroy_buffer(frame.vertex_buffer);
            rhi.destroy_buffer(frame.index_buffer);
        }
        self.frame_sets = None;
        self.current = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::twodee::Twodee;

    fn same_page(_: PatchId) -> ResolvedTexture {
        ResolvedTexture::AtlasPage(0)
    }

    #[test]
    fn adjacent_identical_quads_coalesce() {
        let mut twodee = Twodee::new();
        twodee
            .begin_quad()
            .rect(0.0, 0.0, 8.0, 8.0)
            .patch(PatchId(1))
            .blend(BlendMode::Alpha)
            .done();
        twodee
            .begin_quad()
            .rect(8.0, 0.0, 8.0, 8.0)
            .patch(PatchId(1))
            .blend(BlendMode::Alpha)
            .done();
        twodee
            .begin_quad()
            .rect(16.0, 0.0, 8.0, 8.0)
            .patch(PatchId(2))
            .blend(BlendMode::Additive)
            .done();

        let merged = merge_list(&twodee.lists()[0], same_page);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].index_offset, 0);
        assert_eq!(merged[0].elements, 12);
        assert_eq!(merged[0].blend, BlendMode::Alpha);
        assert_eq!(merged[1].index_offset, 12);
        assert_eq!(merged[1].elements, 6);
        assert_eq!(merged[1].blend, BlendMode::Additive);
    }

    #[test]
    fn merged_ranges_cover_all_elements_without_gaps() {
        let mut twodee = Twodee::new();
        twodee.begin_quad().rect(0.0, 0.0, 1.0, 1.0).done();
        twodee
            .begin_verts()
            .lines(true)
            .vertex(0.0, 0.0, Color::WHITE)
            .vertex(1.0, 1.0, Color::WHITE)
            .done();
        twodee
            .begin_quad()
            .rect(0.0, 0.0, 1.0, 1.0)
            .flat(FlatId(3))
            .done();
        twodee.begin_quad().rect(1.0, 0.0, 1.0, 1.0).flat(FlatId(3)).done();

        let list = &twodee.lists()[0];
        let merged = merge_list(list, same_page);
        let mut next = 0u32;
        for cmd in &merged {
            assert_eq!(cmd.index_offset, next);
            next += cmd.elements;
        }
        assert_eq!(next, list.total_elements());
        // Untextured quad, lines, then the two flat quads coalesced.
        assert_eq!(merged.len(), 3);
        assert_eq!(merged[2].elements, 12);
        assert_eq!(merged[2].texture, ResolvedTexture::Flat(FlatId(3)));
    }

    #[test]
    fn colormap_pointer_change_splits_the_merge() {
        let map_a: Colormap = Rc::new([0u8; 256]);
        let map_b: Colormap = Rc::new([0u8; 256]);
        let mut twodee = Twodee::new();
        twodee
            .begin_quad()
            .rect(0.0, 0.0, 1.0, 1.0)
            .patch(PatchId(1))
            .colormap(Rc::clone(&map_a))
            .done();
        twodee
            .begin_quad()
            .rect(1.0, 0.0, 1.0, 1.0)
            .patch(PatchId(1))
            .colormap(Rc::clone(&map_a))
            .done();
        // Identical bytes, different table identity: must split.
        twodee
            .begin_quad()
            .rect(2.0, 0.0, 1.0, 1.0)
            .patch(PatchId(1))
            .colormap(Rc::clone(&map_b))
            .done();

        let merged = merge_list(&twodee.lists()[0], same_page);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].elements, 12);
        assert_eq!(merged[1].elements, 6);
    }

    #[test]
    fn different_atlas_pages_do_not_merge() {
        let mut twodee = Twodee::new();
        twodee.begin_quad().rect(0.0, 0.0, 1.0, 1.0).patch(PatchId(1)).done();
        twodee.begin_quad().rect(1.0, 0.0, 1.0, 1.0).patch(PatchId(2)).done();

        let merged = merge_list(&twodee.lists()[0], |id| {
            ResolvedTexture::AtlasPage(id.0 as usize)
        });
        assert_eq!(merged.len(), 2);
    }
}

