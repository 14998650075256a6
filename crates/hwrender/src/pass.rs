//! The four-phase pass contract.

use anyhow::Result as AnyResult;
use rhi::{GraphicsContext, Rhi, TransferContext};

/// One named unit of per-frame rendering work.
///
/// The manager calls the four methods in order across the whole registry:
/// every enabled pass finishes `prepass` before any pass starts `transfer`,
/// and so on. Resource creation and sizing belong in `prepass`, uploads and
/// transient set building in `transfer`, draws in `graphics`, and transient
/// teardown in `postpass`.
pub trait Pass {
    /// Create or resize GPU resources and decide this frame's logical work.
    ///
    /// # Errors
    /// A pipeline or resource creation failure is fatal to the frame.
    fn prepass(&mut self, rhi: &mut dyn Rhi) -> AnyResult<()>;

    /// Upload data and build per-frame uniform/binding sets.
    ///
    /// # Errors
    /// An upload failure is fatal to the frame.
    fn transfer(&mut self, rhi: &mut dyn Rhi, ctx: TransferContext) -> AnyResult<()>;

    /// Issue draw calls.
    ///
    /// # Errors
    /// A submission failure is fatal to the frame.
    fn graphics(&mut self, rhi: &mut dyn Rhi, ctx: GraphicsContext) -> AnyResult<()>;

    /// Destroy transient resources and reset per-frame bookkeeping.
    ///
    /// # Errors
    /// A teardown failure is fatal to the frame.
    fn postpass(&mut self, rhi: &mut dyn Rhi) -> AnyResult<()>;
}

type PhaseFn = Box<dyn FnMut(&mut dyn Rhi) -> AnyResult<()>>;

/// Bookkeeping-only pass wrapping prepass and postpass closures with no-op
/// transfer and graphics phases, e.g. flipping double-buffered targets at a
/// fixed point in the frame order.
#[derive(Default)]
pub struct ClosurePass {
    prepass: Option<PhaseFn>,
    postpass: Option<PhaseFn>,
}

impl ClosurePass {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_prepass(
        mut self,
        f: impl FnMut(&mut dyn Rhi) -> AnyResult<()> + 'static,
    ) -> Self {
        self.prepass = Some(Box::new(f));
        self
    }

    #[must_use]
    pub fn with_postpass(
        mut self,
        f: impl FnMut(&mut dyn Rhi) -> AnyResult<()> + 'static,
    ) -> Self {
        self.postpass = Some(Box::new(f));
        self
    }
}

impl Pass for ClosurePass {
    fn prepass(&mut self, rhi: &mut dyn Rhi) -> AnyResult<()> {
        match &mut self.prepass {
            Some(f) => f(rhi),
            None => Ok(()),
        }
    }

    fn transfer(&mut self, _rhi: &mut dyn Rhi, _ctx: TransferContext) -> AnyResult<()> {
        Ok(())
    }

    fn graphics(&mut self, _rhi: &mut dyn Rhi, _ctx: GraphicsContext) -> AnyResult<()> {
        Ok(())
    }

    fn postpass(&mut self, rhi: &mut dyn Rhi) -> AnyResult<()> {
        match &mut self.postpass {
            Some(f) => f(rhi),
            None => Ok(()),
        }
    }
}
