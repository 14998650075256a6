//! Indexed flat textures cached by lump id.

use crate::image_source::{FlatData, FlatId};
use crate::pass::Pass;
use anyhow::Result as AnyResult;
use rhi::{GraphicsContext, Handle, Rect, Rhi, Texture, TextureDesc, TextureFormat, TransferContext};
use std::collections::HashMap;
use std::rc::Rc;

/// Palette index flats treat as fully transparent, whatever color the
/// palette maps it to.
pub const TRANSPARENT_INDEX: u8 = 247;

/// Index+alpha textures for flats, cached by lump id for the life of the
/// pipeline.
#[derive(Default)]
pub struct FlatTextureManager {
    cache: HashMap<FlatId, Handle<Texture>>,
    pending_uploads: Vec<(Handle<Texture>, u32, u32, Vec<u8>)>,
}

/// Expand indexed flat pixels into index+alpha texels, mapping the
/// transparent index to alpha 0. A 1-wide flat pads each row to 2 texels so
/// the upload stays 4-byte aligned.
fn expand_flat(flat: &FlatData) -> (u32, Vec<u8>) {
    let padded_width = flat.width.max(2);
    let mut texels = vec![0u8; padded_width as usize * flat.height as usize * 2];
    for y in 0..flat.height as usize {
        for x in 0..flat.width as usize {
            let index = flat.pixels[y * flat.width as usize + x];
            let offset = (y * padded_width as usize + x) * 2;
            texels[offset] = index;
            texels[offset + 1] = if index == TRANSPARENT_INDEX { 0 } else { 255 };
        }
    }
    (padded_width, texels)
}

impl FlatTextureManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for a flat's texture, creating it and staging the texel
    /// upload on first sight. Call during prepass; the upload lands in this
    /// manager's transfer phase before any consumer draws.
    pub fn find_or_create_indexed(&mut self, rhi: &mut dyn Rhi, id: FlatId, data: &Rc<FlatData>) -> Handle<Texture> {
        if let Some(&texture) = self.cache.get(&id) {
            return texture;
        }
        let (padded_width, texels) = expand_flat(data);
        let texture = rhi.create_texture(TextureDesc {
            format: TextureFormat::IndexAlpha8,
            width: padded_width,
            height: data.height,
            renderable: false,
        });
        self.cache.insert(id, texture);
        self.pending_uploads
            .push((texture, padded_width, data.height, texels));
        texture
    }

    /// Cached handle without creating, for merge-time texture resolution.
    pub fn lookup(&self, id: FlatId) -> Option<Handle<Texture>> {
        self.cache.get(&id).copied()
    }
}

impl Pass for FlatTextureManager {
    fn prepass(&mut self, _rhi: &mut dyn Rhi) -> AnyResult<()> {
        Ok(())
    }

    fn transfer(&mut self, rhi: &mut dyn Rhi, ctx: TransferContext) -> AnyResult<()> {
        for (texture, width, height, texels) in self.pending_uploads.drain(..) {
            rhi.update_texture(
                ctx,
                texture,
                Rect { x: 0, y: 0, w: width, h: height },
                &texels,
            );
        }
        Ok(())
    }

    fn graphics(&mut self, _rhi: &mut dyn Rhi, _ctx: GraphicsContext) -> AnyResult<()> {
        Ok(())
    }

    fn postpass(&mut self, _rhi: &mut dyn Rhi) -> AnyResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_by_one_flat_pads_to_four_bytes() {
        let flat = FlatData {
            width: 1,
            height: 1,
            pixels: vec![12],
        };
        let (padded_width, texels) = expand_flat(&flat);
        assert_eq!(padded_width, 2);
        assert_eq!(texels.len(), 4);
        assert_eq!(&texels, &[12, 255, 0, 0]);
    }

    #[test]
    fn transparent_index_gets_zero_alpha() {
        let flat = FlatData {
            width: 2,
            height: 1,
            pixels: vec![TRANSPARENT_INDEX, 3],
        };
        let (_, texels) = expand_flat(&flat);
        assert_eq!(&texels, &[TRANSPARENT_INDEX, 0, 3, 255]);
    }
}
