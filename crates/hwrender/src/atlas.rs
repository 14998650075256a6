//! Dynamic shelf-packed atlas pages for sprite patches.
//!
//! Pages are append-only within a generation: misses are trimmed, packed
//! into the most recent page, and spill into fresh pages when they do not
//! fit. Crossing the page ceiling schedules a wholesale rebuild at the start
//! of the next frame (all pages destroyed, lookup cleared, every known patch
//! repacked from scratch) instead of evicting incrementally, because sprite
//! churn is rare next to per-frame draw volume.

use crate::image_source::{PatchData, PatchId};
use crate::patch::{rasterize_patch, trim_patch};
use rhi::{Handle, Rect, Rhi, Texture, TextureDesc, TextureFormat, TransferContext};
use std::collections::HashMap;
use std::rc::Rc;

/// Width and height of every atlas page in texels.
pub const ATLAS_PAGE_SIZE: u32 = 2048;

/// Page count above which the whole atlas is rebuilt next frame.
const MAX_PAGES: usize = 2;

/// Where a packed patch landed, plus enough trim bookkeeping to map whole
/// sprite coordinates into the packed sub-rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AtlasEntry {
    /// Index into the cache's page list.
    pub page: usize,
    pub x: u32,
    pub y: u32,
    /// Packed width; may exceed the visible width by the alignment pad.
    pub width: u32,
    pub height: u32,
    /// Offset of the packed rect inside the original patch.
    pub trim_x: u32,
    pub trim_y: u32,
    pub orig_width: u32,
    pub orig_height: u32,
}

/// Left-to-right, top-to-bottom shelf packer state for one page.
#[derive(Debug, Default, Clone, Copy)]
struct Shelf {
    next_x: u32,
    next_y: u32,
    row_height: u32,
}

impl Shelf {
    /// Claim a `w` x `h` rect, or `None` when the page is out of room.
    fn pack(&mut self, page_size: u32, w: u32, h: u32) -> Option<(u32, u32)> {
        if w > page_size || h > page_size {
            return None;
        }
        if self.next_x + w > page_size {
            self.next_x = 0;
            self.next_y += self.row_height;
            self.row_height = 0;
        }
        if self.next_y + h > page_size {
            return None;
        }
        let position = (self.next_x, self.next_y);
        self.next_x += w;
        self.row_height = self.row_height.max(h);
        Some(position)
    }
}

struct AtlasPage {
    texture: Handle<Texture>,
    shelf: Shelf,
}

/// Atlas pages plus the patch lookup and pending work queues.
pub struct PatchAtlasCache {
    page_size: u32,
    pages: Vec<AtlasPage>,
    entries: HashMap<PatchId, AtlasEntry>,
    /// Source data for every known patch, kept for wholesale rebuilds.
    sources: HashMap<PatchId, Rc<PatchData>>,
    pending: Vec<PatchId>,
    /// Rasterized texels waiting for the transfer phase.
    uploads: Vec<(usize, Rect, Vec<u8>)>,
    needs_rebuild: bool,
}

impl Default for PatchAtlasCache {
    fn default() -> Self {
        Self::new()
    }
}

impl PatchAtlasCache {
    pub fn new() -> Self {
        Self::with_page_size(ATLAS_PAGE_SIZE)
    }

    /// Smaller pages make overflow reachable in tests.
    pub fn with_page_size(page_size: u32) -> Self {
        Self {
            page_size,
            pages: Vec::new(),
            entries: HashMap::new(),
            sources: HashMap::new(),
            pending: Vec::new(),
            uploads: Vec::new(),
            needs_rebuild: false,
        }
    }

    /// Lookup for an already-packed patch.
    pub fn entry(&self, id: PatchId) -> Option<&AtlasEntry> {
        self.entries.get(&id)
    }

    /// Texture behind a page index returned in an [`AtlasEntry`].
    pub fn page_texture(&self, page: usize) -> Handle<Texture> {
        self.pages[page].texture
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// True when the next `pack_patches` will repack everything from scratch.
    pub fn needs_rebuild(&self) -> bool {
        self.needs_rebuild
    }

    /// Queue a patch for packing. No-op when the patch is already packed or
    /// already queued this frame.
    pub fn queue_patch(&mut self, id: PatchId, data: Rc<PatchData>) {
        if self.entries.contains_key(&id) || self.pending.contains(&id) {
            return;
        }
        self.sources.insert(id, data);
        self.pending.push(id);
    }

    /// Pack every pending patch, spilling into new pages as needed. Runs the
    /// scheduled rebuild first when the last frame overflowed the page
    /// ceiling. Prepass work: creates page textures, stages texel uploads.
    pub fn pack_patches(&mut self, rhi: &mut dyn Rhi) {
        if self.needs_rebuild {
            log::debug!(
                target: "hwrender::atlas",
                "rebuilding atlas: {} pages, {} patches",
                self.pages.len(),
                self.sources.len()
            );
            for page in self.pages.drain(..) {
                rhi.destroy_texture(page.texture);
            }
            self.entries.clear();
            self.uploads.clear();
            self.pending = self.sources.keys().copied().collect();
            self.pending.sort_unstable();
            self.needs_rebuild = false;
        }

        for id in std::mem::take(&mut self.pending) {
            let data = Rc::clone(&self.sources[&id]);
            let rect = trim_patch(&data);
            assert!(
                rect.width <= self.page_size && rect.height <= self.page_size,
                "patch larger than an atlas page"
            );

            let (page, x, y) = loop {
                if let Some(current) = self.pages.last_mut()
                    && let Some((x, y)) = current.shelf.pack(self.page_size, rect.width, rect.height)
                {
                    break (self.pages.len() - 1, x, y);
                }
                let texture = rhi.create_texture(TextureDesc {
                    format: TextureFormat::IndexAlpha8,
                    width: self.page_size,
                    height: self.page_size,
                    renderable: false,
                });
                self.pages.push(AtlasPage {
                    texture,
                    shelf: Shelf::default(),
                });
            };

            self.uploads.push((
                page,
                Rect {
                    x: x as i32,
                    y: y as i32,
                    w: rect.width,
                    h: rect.height,
                },
                rasterize_patch(&data, rect),
            ));
            self.entries.insert(
                id,
                AtlasEntry {
                    page,
                    x,
                    y,
                    width: rect.width,
                    height: rect.height,
                    trim_x: rect.min_x,
                    trim_y: rect.min_y,
                    orig_width: u32::from(data.width),
                    orig_height: u32::from(data.height),
                },
            );
        }

        if self.pages.len() > MAX_PAGES {
            log::debug!(
                target: "hwrender::atlas",
                "atlas overflowed to {} pages, scheduling rebuild",
                self.pages.len()
            );
            self.needs_rebuild = true;
        }
    }

    /// Transfer-phase work: push staged texels into the page textures.
    pub fn upload_pending(&mut self, rhi: &mut dyn Rhi, ctx: TransferContext) {
        for (page, region, pixels) in self.uploads.drain(..) {
            rhi.update_texture(ctx, self.pages[page].texture, region, &pixels);
        }
    }

    /// Destroy every page texture and forget all packed state.
    pub fn destroy(&mut self, rhi: &mut dyn Rhi) {
        for page in self.pages.drain(..) {
            rhi.destroy_texture(page.texture);
        }
        self.entries.clear();
        self.uploads.clear();
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shelf_rows_wrap_and_fill() {
        let mut shelf = Shelf::default();
        assert_eq!(shelf.pack(64, 32, 16), Some((0, 0)));
        assert_eq!(shelf.pack(64, 32, 8), Some((32, 0)));
        // Row full: wraps below the tallest rect of the first row.
        assert_eq!(shelf.pack(64, 16, 16), Some((0, 16)));
    }

    #[test]
    fn shelf_rejects_oversized_rects() {
        let mut shelf = Shelf::default();
        assert_eq!(shelf.pack(64, 128, 8), None);
        assert_eq!(shelf.pack(64, 8, 128), None);
    }

    #[test]
    fn shelf_runs_out_of_rows() {
        let mut shelf = Shelf::default();
        assert_eq!(shelf.pack(32, 32, 32), Some((0, 0)));
        assert_eq!(shelf.pack(32, 2, 2), None);
    }
}
