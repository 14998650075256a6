//! Ordered pass registry and the per-frame phase driver.

use crate::pass::Pass;
use anyhow::{Context, Result as AnyResult};
use rhi::Rhi;
use std::cell::RefCell;
use std::rc::Rc;

struct RegisteredPass {
    name: String,
    pass: Rc<RefCell<dyn Pass>>,
    enabled: bool,
}

/// Ordered, named registry of passes.
///
/// Registration order is execution order within every phase, and each phase
/// is a barrier across the whole registry: the manager iterates the registry
/// once per phase rather than running one pass through all four phases at a
/// time. That ordering is what lets a later pass consume resources an
/// earlier pass produced in the same frame.
#[derive(Default)]
pub struct PassManager {
    passes: Vec<RegisteredPass>,
}

impl PassManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a pass under `name`, enabled. Names must be unique.
    pub fn insert(&mut self, name: impl Into<String>, pass: Rc<RefCell<dyn Pass>>) {
        let name = name.into();
        assert!(
            self.passes.iter().all(|entry| entry.name != name),
            "duplicate pass name {name:?}"
        );
        self.passes.push(RegisteredPass {
            name,
            pass,
            enabled: true,
        });
    }

    /// Look up a registered pass by name.
    pub fn for_name(&self, name: &str) -> Option<Rc<RefCell<dyn Pass>>> {
        self.passes
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| Rc::clone(&entry.pass))
    }

    /// Enable or disable a pass. A disabled pass receives none of its four
    /// callbacks until re-enabled.
    pub fn set_enabled(&mut self, name: &str, enabled: bool) {
        let entry = self
            .passes
            .iter_mut()
            .find(|entry| entry.name == name)
            .unwrap_or_else(|| panic!("no pass named {name:?}"));
        entry.enabled = enabled;
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.passes
            .iter()
            .find(|entry| entry.name == name)
            .is_some_and(|entry| entry.enabled)
    }

    /// Run one frame's four phases across every enabled pass.
    ///
    /// Presentation and `finish()` are the caller's responsibility so a
    /// frame driver can interleave other work before the flip.
    ///
    /// # Errors
    /// The first phase error aborts the frame and propagates; the frame is
    /// left partially executed and the caller decides whether to continue.
    pub fn run_frame(&mut self, rhi: &mut dyn Rhi) -> AnyResult<()> {
        for entry in &self.passes {
            if entry.enabled {
                entry
                    .pass
                    .borrow_mut()
                    .prepass(rhi)
                    .with_context(|| format!("prepass failed in {:?}", entry.name))?;
            }
        }

        let transfer = rhi.begin_transfer();
        for entry in &self.passes {
            if entry.enabled {
                entry
                    .pass
                    .borrow_mut()
                    .transfer(rhi, transfer)
                    .with_context(|| format!("transfer failed in {:?}", entry.name))?;
            }
        }
        rhi.end_transfer(transfer);

        let graphics = rhi.begin_graphics();
        for entry in &self.passes {
            if entry.enabled {
                entry
                    .pass
                    .borrow_mut()
                    .graphics(rhi, graphics)
                    .with_context(|| format!("graphics failed in {:?}", entry.name))?;
            }
        }
        rhi.end_graphics(graphics);

        for entry in &self.passes {
            if entry.enabled {
                entry
                    .pass
                    .borrow_mut()
                    .postpass(rhi)
                    .with_context(|| format!("postpass failed in {:?}", entry.name))?;
            }
        }
        Ok(())
    }
}
