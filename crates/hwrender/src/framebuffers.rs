//! Main framebuffer pair and the double-buffered post-process targets.

use crate::pass::Pass;
use anyhow::Result as AnyResult;
use rhi::{
    GraphicsContext, Handle, Renderbuffer, RenderbufferDesc, Rhi, Texture, TextureDesc,
    TextureFormat, TransferContext,
};

/// Owns the main color/depth pair and two ping-pong post-process color
/// targets, recreated whenever the drawable size changes. Old objects are
/// destroyed before new ones are created so both sizes are never alive at
/// once.
#[derive(Default)]
pub struct FramebufferManager {
    width: u32,
    height: u32,
    main_color: Option<Handle<Texture>>,
    main_depth: Option<Handle<Renderbuffer>>,
    post_colors: [Option<Handle<Texture>>; 2],
    /// Which of the two post targets is "current".
    current_post: usize,
}

impl FramebufferManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn main_color(&self) -> Handle<Texture> {
        self.main_color.expect("framebuffers not yet created")
    }

    pub fn main_depth(&self) -> Handle<Renderbuffer> {
        self.main_depth.expect("framebuffers not yet created")
    }

    /// The post target being written this post-processing step.
    pub fn current_post_color(&self) -> Handle<Texture> {
        self.post_colors[self.current_post].expect("framebuffers not yet created")
    }

    /// The post target written by the previous step, read-only now.
    pub fn previous_post_color(&self) -> Handle<Texture> {
        self.post_colors[1 - self.current_post].expect("framebuffers not yet created")
    }

    /// Flip which post target is current. Call exactly once per logical
    /// post-processing step; a missed or doubled swap makes a step read the
    /// target it is writing.
    pub fn swap_post(&mut self) {
        self.current_post = 1 - self.current_post;
    }

    fn destroy_targets(&mut self, rhi: &mut dyn Rhi) {
        if let Some(color) = self.main_color.take() {
            rhi.destroy_texture(color);
        }
        if let Some(depth) = self.main_depth.take() {
            rhi.destroy_renderbuffer(depth);
        }
        for target in &mut self.post_colors {
            if let Some(color) = target.take() {
                rhi.destroy_texture(color);
            }
        }
    }
}

impl Pass for FramebufferManager {
    fn prepass(&mut self, rhi: &mut dyn Rhi) -> AnyResult<()> {
        let (width, height) = rhi.default_framebuffer_dimensions();
        if (width, height) == (self.width, self.height) && self.main_color.is_some() {
            return Ok(());
        }
        log::debug!(
            target: "hwrender::framebuffers",
            "recreating framebuffers at {width}x{height}"
        );
        self.destroy_targets(rhi);
        self.width = width;
        self.height = height;
        let color_desc = TextureDesc {
            format: TextureFormat::Rgba8,
            width,
            height,
            renderable: true,
        };
        self.main_color = Some(rhi.create_texture(color_desc));
        self.main_depth = Some(rhi.create_renderbuffer(RenderbufferDesc { width, height }));
        self.post_colors = [
            Some(rhi.create_texture(color_desc)),
            Some(rhi.create_texture(color_desc)),
        ];
        self.current_post = 0;
        Ok(())
    }

    fn transfer(&mut self, _rhi: &mut dyn Rhi, _ctx: TransferContext) -> AnyResult<()> {
        Ok(())
    }

    fn graphics(&mut self, _rhi: &mut dyn Rhi, _ctx: GraphicsContext) -> AnyResult<()> {
        Ok(())
    }

    fn postpass(&mut self, _rhi: &mut dyn Rhi) -> AnyResult<()> {
        Ok(())
    }
}
