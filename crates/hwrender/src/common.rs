//! Persistent solid-color textures shared by many passes.

use crate::pass::Pass;
use anyhow::Result as AnyResult;
use rhi::{GraphicsContext, Handle, Rect, Rhi, Texture, TextureDesc, TextureFormat, TransferContext};

/// Owns 1x1 white, black, and transparent RGBA textures, created once and
/// kept alive for the life of the pipeline.
#[derive(Default)]
pub struct CommonResourcesManager {
    white: Option<Handle<Texture>>,
    black: Option<Handle<Texture>>,
    transparent: Option<Handle<Texture>>,
    uploaded: bool,
}

impl CommonResourcesManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn white(&self) -> Handle<Texture> {
        self.white.expect("common resources not yet created")
    }

    pub fn black(&self) -> Handle<Texture> {
        self.black.expect("common resources not yet created")
    }

    pub fn transparent(&self) -> Handle<Texture> {
        self.transparent.expect("common resources not yet created")
    }
}

fn solid_texture(rhi: &mut dyn Rhi) -> Handle<Texture> {
    rhi.create_texture(TextureDesc {
        format: TextureFormat::Rgba8,
        width: 1,
        height: 1,
        renderable: false,
    })
}

impl Pass for CommonResourcesManager {
    fn prepass(&mut self, rhi: &mut dyn Rhi) -> AnyResult<()> {
        if self.white.is_none() {
            self.white = Some(solid_texture(rhi));
            self.black = Some(solid_texture(rhi));
            self.transparent = Some(solid_texture(rhi));
        }
        Ok(())
    }

    fn transfer(&mut self, rhi: &mut dyn Rhi, ctx: TransferContext) -> AnyResult<()> {
        if !self.uploaded {
            let texel = Rect { x: 0, y: 0, w: 1, h: 1 };
            rhi.update_texture(ctx, self.white(), texel, &[255, 255, 255, 255]);
            rhi.update_texture(ctx, self.black(), texel, &[0, 0, 0, 255]);
            rhi.update_texture(ctx, self.transparent(), texel, &[0, 0, 0, 0]);
            self.uploaded = true;
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
