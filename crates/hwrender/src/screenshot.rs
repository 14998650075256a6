//! One-shot screenshot capture.

use crate::framebuffers::FramebufferManager;
use crate::pass::Pass;
use anyhow::Result as AnyResult;
use rhi::{GraphicsContext, Rect, Rhi, TextureFormat, TransferContext};
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

/// Reads back the composited offscreen image and writes it as a PNG.
///
/// Register this pass after every pass that renders offscreen and before the
/// final blit: the readback captures the most recent offscreen color target.
/// Idle until [`ScreenshotPass::request`] arms it for one frame.
#[derive(Default)]
pub struct ScreenshotPass {
    framebuffers: Option<Rc<RefCell<FramebufferManager>>>,
    requested: Option<PathBuf>,
    captured: Option<(PathBuf, u32, u32, Vec<u8>)>,
}

impl ScreenshotPass {
    pub fn new(framebuffers: Rc<RefCell<FramebufferManager>>) -> Self {
        Self {
            framebuffers: Some(framebuffers),
            requested: None,
            captured: None,
        }
    }

    /// Capture this frame and write the PNG to `path`.
    pub fn request(&mut self, path: impl Into<PathBuf>) {
        self.requested = Some(path.into());
    }
}

impl Pass for ScreenshotPass {
    fn prepass(&mut self, _rhi: &mut dyn Rhi) -> AnyResult<()> {
        Ok(())
    }

    fn transfer(&mut self, _rhi: &mut dyn Rhi, _ctx: TransferContext) -> AnyResult<()> {
        Ok(())
    }

    fn graphics(&mut self, rhi: &mut dyn Rhi, ctx: GraphicsContext) -> AnyResult<()> {
        let Some(path) = self.requested.take() else {
            return Ok(());
        };
        let (width, height) = self.framebuffers.as_ref().map_or_else(
            || rhi.default_framebuffer_dimensions(),
            |fb| {
                let fb = fb.borrow();
                (fb.width(), fb.height())
            },
        );
        let data = rhi.read_pixels(
            ctx,
            Rect { x: 0, y: 0, w: width, h: height },
            TextureFormat::Rgba8,
        )?;
        self.captured = Some((path, width, height, data));
        Ok(())
    }

    fn postpass(&mut self, _rhi: &mut dyn Rhi) -> AnyResult<()> {
        if let Some((path, width, height, data)) = self.captured.take() {
            match image::save_buffer(&path, &data, width, height, image::ExtendedColorType::Rgba8) {
                Ok(()) => {
                    log::info!(target: "hwrender::screenshot", "wrote {}", path.display());
                }
                Err(err) => {
                    // A failed screenshot never aborts the frame.
                    log::error!(
                        target: "hwrender::screenshot",
                        "failed to write {}: {err}",
                        path.display()
                    );
                }
            }
        }
        Ok(())
    }
}
