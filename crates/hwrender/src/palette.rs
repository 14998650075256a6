//! Palette and colormap lookup textures.
//!
//! The engine palette becomes a 256x1 RGBA texture, re-uploaded when marked
//! dirty. Per-draw colormaps become 256x1 single-channel textures cached by
//! source pointer for one frame; every colormap texture created this frame
//! must be destroyed in `postpass` or it leaks. The identity colormap gets a
//! persistent texture so untinted draws never churn the cache.

use crate::image_source::{Colormap, PaletteData};
use crate::pass::Pass;
use anyhow::Result as AnyResult;
use rhi::{GraphicsContext, Handle, Rect, Rhi, Texture, TextureDesc, TextureFormat, TransferContext};
use std::collections::HashMap;
use std::rc::Rc;

const LUT_ROW: Rect = Rect { x: 0, y: 0, w: 256, h: 1 };

fn lut_texture(rhi: &mut dyn Rhi, format: TextureFormat) -> Handle<Texture> {
    rhi.create_texture(TextureDesc {
        format,
        width: 256,
        height: 1,
        renderable: false,
    })
}

/// Owns the palette texture and the per-frame colormap texture cache.
#[derive(Default)]
pub struct PaletteManager {
    palette: PaletteData,
    palette_dirty: bool,
    palette_texture: Option<Handle<Texture>>,
    default_colormap: Option<Handle<Texture>>,
    default_uploaded: bool,
    /// Keyed by `Rc::as_ptr` of the source table; cleared every frame.
    colormaps: HashMap<*const [u8; 256], Handle<Texture>>,
    /// Uploads staged between creation and the transfer phase.
    pending_uploads: Vec<(Handle<Texture>, [u8; 256])>,
}

impl PaletteManager {
    pub fn new() -> Self {
        Self {
            palette_dirty: true,
            ..Self::default()
        }
    }

    /// Replace the engine palette; the texture re-uploads next frame.
    pub fn set_palette(&mut self, palette: PaletteData) {
        self.palette = palette;
        self.palette_dirty = true;
    }

    pub fn palette_texture(&self) -> Handle<Texture> {
        self.palette_texture.expect("palette texture not yet created")
    }

    /// The persistent identity colormap texture.
    pub fn default_colormap(&self) -> Handle<Texture> {
        self.default_colormap.expect("default colormap not yet created")
    }

    /// Texture for a per-draw colormap, creating and staging an upload on
    /// the first sighting of this table this frame. Call during prepass:
    /// this manager's transfer phase runs before consumers draw, so the
    /// table bytes are on the GPU in time, and `postpass` reclaims the
    /// texture at end of frame.
    pub fn find_or_create_colormap(&mut self, rhi: &mut dyn Rhi, colormap: &Colormap) -> Handle<Texture> {
        let key = Rc::as_ptr(colormap);
        if let Some(&texture) = self.colormaps.get(&key) {
            return texture;
        }
        let texture = lut_texture(rhi, TextureFormat::R8);
        self.colormaps.insert(key, texture);
        self.pending_uploads.push((texture, **colormap));
        texture
    }

    /// Drop every per-frame colormap texture. The default texture survives.
    fn destroy_per_frame_resources(&mut self, rhi: &mut dyn Rhi) {
        for (_, texture) in self.colormaps.drain() {
            rhi.destroy_texture(texture);
        }
        self.pending_uploads.clear();
    }
}

impl Pass for PaletteManager {
    fn prepass(&mut self, rhi: &mut dyn Rhi) -> AnyResult<()> {
        if self.palette_texture.is_none() {
            self.palette_texture = Some(lut_texture(rhi, TextureFormat::Rgba8));
        }
        if self.default_colormap.is_none() {
            self.default_colormap = Some(lut_texture(rhi, TextureFormat::R8));
        }
        Ok(())
    }

    fn transfer(&mut self, rhi: &mut dyn Rhi, ctx: TransferContext) -> AnyResult<()> {
        if self.palette_dirty {
            let mut bytes = [0u8; 1024];
            for (entry, chunk) in self.palette.0.iter().zip(bytes.chunks_exact_mut(4)) {
                chunk.copy_from_slice(entry);
            }
            rhi.update_texture(ctx, self.palette_texture(), LUT_ROW, &bytes);
            self.palette_dirty = false;
        }
        if !self.default_uploaded {
            let mut identity = [0u8; 256];
            for (i, entry) in identity.iter_mut().enumerate() {
                *entry = i as u8;
            }
            rhi.update_texture(ctx, self.default_colormap(), LUT_ROW, &identity);
            self.default_uploaded = true;
        }
        for (texture, table) in self.pending_uploads.drain(..) {
            rhi.update_texture(ctx, texture, LUT_ROW, &table);
        }
        Ok(())
    }

    fn graphics(&mut self, _rhi: &mut dyn Rhi, _ctx: GraphicsContext) -> AnyResult<()> {
        Ok(())
    }

    fn postpass(&mut self, rhi: &mut dyn Rhi) -> AnyResult<()> {
        self.destroy_per_frame_resources(rhi);
        Ok(())
    }
}
