//! Top-level render state and frame driver.

use crate::blit::{BlitRectPass, BlitSource};
use crate::common::CommonResourcesManager;
use crate::flats::FlatTextureManager;
use crate::framebuffers::FramebufferManager;
use crate::image_source::{ImageSource, PaletteData};
use crate::manager::PassManager;
use crate::palette::PaletteManager;
use crate::pass::Pass;
use crate::postimg::{BlitPostimgScreens, PostimgEffect};
use crate::screenshot::ScreenshotPass;
use crate::twodee::Twodee;
use crate::twodee_renderer::TwodeeRenderer;
use crate::wipe::{PostprocessWipePass, WipeConfig};
use anyhow::Result as AnyResult;
use rhi::Rhi;
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

/// Everything one backend's rendering pipeline owns, built once at startup
/// and threaded through the frame driver.
///
/// Handles are only meaningful for the backend that created them, so there
/// is no backend hot-swap: switching backends means dropping this state and
/// constructing a fresh one, which rebuilds every pass.
pub struct RenderState {
    rhi: Box<dyn Rhi>,
    passes: PassManager,
    framebuffers: Rc<RefCell<FramebufferManager>>,
    palette: Rc<RefCell<PaletteManager>>,
    twodee_renderer: Rc<RefCell<TwodeeRenderer>>,
    postimg: Rc<RefCell<BlitPostimgScreens>>,
    wipe: Rc<RefCell<PostprocessWipePass>>,
    blit: Rc<RefCell<BlitRectPass>>,
    screenshot: Rc<RefCell<ScreenshotPass>>,
    /// The recorder the caller fills between frames.
    twodee: Twodee,
}

impl RenderState {
    /// Build the pipeline over `rhi`, registering the standard pass order.
    pub fn new(rhi: Box<dyn Rhi>, source: Rc<dyn ImageSource>) -> Self {
        let framebuffers = Rc::new(RefCell::new(FramebufferManager::new()));
        let palette = Rc::new(RefCell::new(PaletteManager::new()));
        let flats = Rc::new(RefCell::new(FlatTextureManager::new()));
        let common = Rc::new(RefCell::new(CommonResourcesManager::new()));
        let twodee_renderer = Rc::new(RefCell::new(TwodeeRenderer::new(
            source,
            Rc::clone(&palette),
            Rc::clone(&flats),
            Rc::clone(&framebuffers),
        )));
        let postimg = Rc::new(RefCell::new(BlitPostimgScreens::new(Rc::clone(
            &framebuffers,
        ))));
        let wipe = Rc::new(RefCell::new(PostprocessWipePass::new()));
        let blit = Rc::new(RefCell::new(BlitRectPass::new(Rc::clone(&framebuffers))));
        let screenshot = Rc::new(RefCell::new(ScreenshotPass::new(Rc::clone(&framebuffers))));

        // The casts unsize each clone to the registry's pass type; the
        // clone itself must resolve on the concrete `Rc` first.
        let mut passes = PassManager::new();
        passes.insert("framebuffers", Rc::clone(&framebuffers) as Rc<RefCell<dyn Pass>>);
        passes.insert("palette", Rc::clone(&palette) as Rc<RefCell<dyn Pass>>);
        passes.insert("flats", Rc::clone(&flats) as Rc<RefCell<dyn Pass>>);
        passes.insert("common", common);
        passes.insert("twodee", Rc::clone(&twodee_renderer) as Rc<RefCell<dyn Pass>>);
        passes.insert("postimg", Rc::clone(&postimg) as Rc<RefCell<dyn Pass>>);
        passes.insert("screenshot", Rc::clone(&screenshot) as Rc<RefCell<dyn Pass>>);
        passes.insert("blit", Rc::clone(&blit) as Rc<RefCell<dyn Pass>>);
        passes.insert("wipe", Rc::clone(&wipe) as Rc<RefCell<dyn Pass>>);

        Self {
            rhi,
            passes,
            framebuffers,
            palette,
            twodee_renderer,
            postimg,
            wipe,
            blit,
            screenshot,
            twodee: Twodee::new(),
        }
    }

    /// The recorder for this frame's 2D drawing.
    pub fn twodee(&mut self) -> &mut Twodee {
        &mut self.twodee
    }

    /// Direct backend access for resources owned outside any pass, such as
    /// wipe masks.
    pub fn rhi(&mut self) -> &mut dyn Rhi {
        self.rhi.as_mut()
    }

    pub fn pass_manager(&mut self) -> &mut PassManager {
        &mut self.passes
    }

    pub fn framebuffers(&self) -> Rc<RefCell<FramebufferManager>> {
        Rc::clone(&self.framebuffers)
    }

    pub fn set_palette(&mut self, palette: PaletteData) {
        self.palette.borrow_mut().set_palette(palette);
    }

    /// Select the post effect for upcoming frames; the final blit follows
    /// the effect's output automatically.
    pub fn set_postimg_effect(&mut self, effect: PostimgEffect) {
        self.postimg.borrow_mut().set_effect(effect);
        self.blit.borrow_mut().set_source(if effect == PostimgEffect::None {
            BlitSource::MainColor
        } else {
            BlitSource::CurrentPost
        });
    }

    /// Start or stop a wipe; `None` returns to normal presentation.
    pub fn set_wipe(&mut self, config: Option<WipeConfig>) {
        self.wipe.borrow_mut().set_config(config);
    }

    /// Write the next frame's composited image to `path` as a PNG.
    pub fn request_screenshot(&mut self, path: impl Into<PathBuf>) {
        self.screenshot.borrow_mut().request(path);
    }

    /// Run one frame: the four phases over every enabled pass, then present
    /// and release per-frame resources. The recorder is consumed and reset.
    ///
    /// # Errors
    /// The first phase error aborts the frame; the caller decides whether
    /// to continue with the next frame.
    pub fn render_frame(&mut self) -> AnyResult<()> {
        let twodee = std::mem::take(&mut self.twodee);
        self.twodee_renderer.borrow_mut().set_frame(twodee);
        if self.postimg.borrow().effect() != PostimgEffect::None {
            self.framebuffers.borrow_mut().swap_post();
        }
        self.passes.run_frame(self.rhi.as_mut())?;
        self.rhi.present()?;
        self.rhi.finish()
    }
}
