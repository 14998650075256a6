//! Buffered 2D draw-command recorder.
//!
//! Callers append quad or raw-vertex commands through the builder methods;
//! each list shares one vertex/index staging pair and is split when the
//! vertex cap would be exceeded, so a single GPU buffer never backs more
//! vertices than a 16-bit index can address.

use crate::image_source::{Colormap, FlatId, PatchId};
use bytemuck::{Pod, Zeroable};
use rhi::{BlendMode, Color};

/// Hard cap on vertices per list; indices are `u16`.
pub const LIST_VERTEX_CAP: usize = 65536;

/// One staged 2D vertex.
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Draw2dVertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
    pub color: [f32; 4],
}

/// What a quad samples from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuadSource {
    /// Flat color, no texture.
    None,
    /// A sprite patch resolved through the atlas.
    Patch(PatchId),
    /// A flat texture used directly.
    Flat(FlatId),
}

/// A recorded axis-aligned quad. Patch quads get their positions and UVs
/// rewritten into atlas space during merging.
#[derive(Debug, Clone)]
pub struct Draw2dQuad {
    pub xmin: f32,
    pub ymin: f32,
    pub xmax: f32,
    pub ymax: f32,
    pub color: Color,
    pub blend: BlendMode,
    pub source: QuadSource,
    pub colormap: Option<Colormap>,
    pub flip: bool,
    pub vflip: bool,
    /// Clip rectangle in screen space, as (xmin, ymin, xmax, ymax).
    pub clip: Option<[f32; 4]>,
}

/// A recorded run of raw untextured vertices.
#[derive(Debug, Clone)]
pub struct Draw2dVerts {
    pub blend: BlendMode,
    /// Line list instead of triangle list.
    pub lines: bool,
    pub colormap: Option<Colormap>,
    /// Index count covered by this command.
    pub elements: u32,
}

/// One recorded command; element counts drive merge bookkeeping.
#[derive(Debug, Clone)]
pub enum Draw2dCmd {
    Quad(Draw2dQuad),
    Verts(Draw2dVerts),
}

impl Draw2dCmd {
    /// Indices this command covers in its list's index buffer.
    pub fn elements(&self) -> u32 {
        match self {
            Self::Quad(_) => 6,
            Self::Verts(verts) => verts.elements,
        }
    }
}

/// One vertex/index staging pair plus the ordered commands drawn from it.
#[derive(Debug, Default)]
pub struct Draw2dList {
    pub vertices: Vec<Draw2dVertex>,
    pub indices: Vec<u16>,
    pub commands: Vec<Draw2dCmd>,
}

impl Draw2dList {
    pub fn total_elements(&self) -> u32 {
        self.indices.len() as u32
    }
}

/// The frame's 2D command recorder.
#[derive(Debug, Default)]
pub struct Twodee {
    lists: Vec<Draw2dList>,
}

impl Twodee {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lists(&self) -> &[Draw2dList] {
        &self.lists
    }

    pub fn lists_mut(&mut self) -> &mut [Draw2dList] {
        &mut self.lists
    }

    pub fn is_empty(&self) -> bool {
        self.lists.iter().all(|list| list.commands.is_empty())
    }

    /// The list new commands append to, splitting when `incoming` more
    /// vertices would cross the cap.
    fn current_list(&mut self, incoming: usize) -> &mut Draw2dList {
        debug_assert!(incoming <= LIST_VERTEX_CAP);
        let needs_new = match self.lists.last() {
            None => true,
            Some(list) => list.vertices.len() + incoming > LIST_VERTEX_CAP,
        };
        if needs_new {
            self.lists.push(Draw2dList::default());
        }
        self.lists.last_mut().unwrap()
    }

    /// Start recording a quad.
    pub fn begin_quad(&mut self) -> QuadBuilder<'_> {
        QuadBuilder {
            twodee: self,
            quad: Draw2dQuad {
                xmin: 0.0,
                ymin: 0.0,
                xmax: 0.0,
                ymax: 0.0,
                color: Color::WHITE,
                blend: BlendMode::Alpha,
                source: QuadSource::None,
                colormap: None,
                flip: false,
                vflip: false,
                clip: None,
            },
        }
    }

    /// Start recording a raw triangle or line list.
    pub fn begin_verts(&mut self) -> VertsBuilder<'_> {
        VertsBuilder {
            twodee: self,
            blend: BlendMode::Alpha,
            lines: false,
            colormap: None,
            vertices: Vec::new(),
        }
    }
}

/// Builder for one quad command.
pub struct QuadBuilder<'a> {
    twodee: &'a mut Twodee,
    quad: Draw2dQuad,
}

impl QuadBuilder<'_> {
    #[must_use]
    pub fn rect(mut self, x: f32, y: f32, w: f32, h: f32) -> Self {
        self.quad.xmin = x;
        self.quad.ymin = y;
        self.quad.xmax = x + w;
        self.quad.ymax = y + h;
        self
    }

    #[must_use]
    pub fn color(mut self, color: Color) -> Self {
        self.quad.color = color;
        self
    }

    #[must_use]
    pub fn blend(mut self, blend: BlendMode) -> Self {
        self.quad.blend = blend;
        self
    }

    #[must_use]
    pub fn patch(mut self, id: PatchId) -> Self {
        self.quad.source = QuadSource::Patch(id);
        self
    }

    #[must_use]
    pub fn flat(mut self, id: FlatId) -> Self {
        self.quad.source = QuadSource::Flat(id);
        self
    }

    #[must_use]
    pub fn colormap(mut self, colormap: Colormap) -> Self {
        self.quad.colormap = Some(colormap);
        self
    }

    #[must_use]
    pub fn flip(mut self, flip: bool) -> Self {
        self.quad.flip = flip;
        self
    }

    #[must_use]
    pub fn vflip(mut self, vflip: bool) -> Self {
        self.quad.vflip = vflip;
        self
    }

    #[must_use]
    pub fn clip(mut self, xmin: f32, ymin: f32, xmax: f32, ymax: f32) -> Self {
        self.quad.clip = Some([xmin, ymin, xmax, ymax]);
        self
    }

    /// Append the quad: four vertices in whole-sprite UV space and six
    /// indices. Merging rewrites them for atlas-sourced quads.
    pub fn done(self) {
        let quad = self.quad;
        let list = self.twodee.current_list(4);
        let base = list.vertices.len() as u16;
        let color = [quad.color.r, quad.color.g, quad.color.b, quad.color.a];
        let corners = [
            (quad.xmin, quad.ymin, 0.0, 0.0),
            (quad.xmax, quad.ymin, 1.0, 0.0),
            (quad.xmax, quad.ymax, 1.0, 1.0),
            (quad.xmin, quad.ymax, 0.0, 1.0),
        ];
        for (x, y, u, v) in corners {
            list.vertices.push(Draw2dVertex {
                position: [x, y, 0.0],
                uv: [u, v],
                color,
            });
        }
        list.indices
            .extend([base, base + 1, base + 2, base, base + 2, base + 3]);
        list.commands.push(Draw2dCmd::Quad(quad));
    }
}

/// Builder for one raw-vertex command.
pub struct VertsBuilder<'a> {
    twodee: &'a mut Twodee,
    blend: BlendMode,
    lines: bool,
    colormap: Option<Colormap>,
    vertices: Vec<Draw2dVertex>,
}

impl VertsBuilder<'_> {
    #[must_use]
    pub fn blend(mut self, blend: BlendMode) -> Self {
        self.blend = blend;
        self
    }

    #[must_use]
    pub fn lines(mut self, lines: bool) -> Self {
        self.lines = lines;
        self
    }

    #[must_use]
    pub fn colormap(mut self, colormap: Colormap) -> Self {
        self.colormap = Some(colormap);
        self
    }

    #[must_use]
    pub fn vertex(mut self, x: f32, y: f32, color: Color) -> Self {
        self.vertices.push(Draw2dVertex {
            position: [x, y, 0.0],
            uv: [0.0, 0.0],
            color: [color.r, color.g, color.b, color.a],
        });
        self
    }

    /// Append the vertices with sequential indices. An empty builder
    /// records nothing.
    pub fn done(self) {
        if self.vertices.is_empty() {
            return;
        }
        assert!(self.vertices.len() <= LIST_VERTEX_CAP, "vertex run exceeds a whole list");
        let list = self.twodee.current_list(self.vertices.len());
        let base = list.vertices.len() as u16;
        let count = self.vertices.len() as u32;
        list.vertices.extend(self.vertices);
        // Cast per element: a run of exactly the cap would truncate the
        // range bound to zero as u16.
        list.indices
            .extend((0..count).map(|offset| base + offset as u16));
        list.commands.push(Draw2dCmd::Verts(Draw2dVerts {
            blend: self.blend,
            lines: self.lines,
            colormap: self.colormap,
            elements: count,
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quads_share_one_list() {
        let mut twodee = Twodee::new();
        twodee.begin_quad().rect(0.0, 0.0, 8.0, 8.0).done();
        twodee.begin_quad().rect(8.0, 0.0, 8.0, 8.0).done();
        assert_eq!(twodee.lists().len(), 1);
        let list = &twodee.lists()[0];
        assert_eq!(list.vertices.len(), 8);
        assert_eq!(list.indices.len(), 12);
        assert_eq!(list.commands.len(), 2);
    }

    #[test]
    fn vertex_cap_splits_to_a_new_list() {
        let mut twodee = Twodee::new();
        for _ in 0..LIST_VERTEX_CAP / 4 {
            twodee.begin_quad().rect(0.0, 0.0, 1.0, 1.0).done();
        }
        assert_eq!(twodee.lists().len(), 1);
        assert_eq!(twodee.lists()[0].vertices.len(), LIST_VERTEX_CAP);
        twodee.begin_quad().rect(0.0, 0.0, 1.0, 1.0).done();
        assert_eq!(twodee.lists().len(), 2);
        assert_eq!(twodee.lists()[1].vertices.len(), 4);
    }

    #[test]
    fn a_full_cap_verts_run_indexes_every_vertex() {
        let mut twodee = Twodee::new();
        let mut builder = twodee.begin_verts();
        for _ in 0..LIST_VERTEX_CAP {
            builder = builder.vertex(0.0, 0.0, Color::WHITE);
        }
        builder.done();

        let list = &twodee.lists()[0];
        assert_eq!(list.vertices.len(), LIST_VERTEX_CAP);
        assert_eq!(list.total_elements(), LIST_VERTEX_CAP as u32);
        assert_eq!(list.indices[0], 0);
        assert_eq!(list.indices[LIST_VERTEX_CAP - 1], u16::MAX);
        match &list.commands[0] {
            Draw2dCmd::Verts(verts) => assert_eq!(verts.elements, list.total_elements()),
            Draw2dCmd::Quad(_) => panic!("expected a verts command"),
        }
    }

    #[test]
    fn verts_builder_records_sequential_indices() {
        let mut twodee = Twodee::new();
        twodee.begin_quad().rect(0.0, 0.0, 1.0, 1.0).done();
        twodee
            .begin_verts()
            .lines(true)
            .vertex(0.0, 0.0, Color::WHITE)
            .vertex(4.0, 4.0, Color::WHITE)
            .done();
        let list = &twodee.lists()[0];
        assert_eq!(list.indices[6..], [4, 5]);
        match &list.commands[1] {
            Draw2dCmd::Verts(verts) => {
                assert!(verts.lines);
                assert_eq!(verts.elements, 2);
            }
            Draw2dCmd::Quad(_) => panic!("expected a verts command"),
        }
    }
}
