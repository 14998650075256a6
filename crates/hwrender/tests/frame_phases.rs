mod mock;

use anyhow::Result as AnyResult;
use hwrender::{Pass, PassManager};
use mock::{EventLog, MockRhi};
use rhi::{GraphicsContext, Rhi, TransferContext};
use std::cell::RefCell;
use std::rc::Rc;

struct RecordingPass {
    name: &'static str,
    log: EventLog,
}

impl RecordingPass {
    fn new(name: &'static str, log: &EventLog) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self {
            name,
            log: Rc::clone(log),
        }))
    }

    fn push(&self, phase: &str) {
        self.log.borrow_mut().push(format!("{}.{phase}", self.name));
    }
}

impl Pass for RecordingPass {
    fn prepass(&mut self, _rhi: &mut dyn Rhi) -> AnyResult<()> {
        self.push("prepass");
        Ok(())
    }

    fn transfer(&mut self, _rhi: &mut dyn Rhi, _ctx: TransferContext) -> AnyResult<()> {
        self.push("transfer");
        Ok(())
    }

    fn graphics(&mut self, _rhi: &mut dyn Rhi, _ctx: GraphicsContext) -> AnyResult<()> {
        self.push("graphics");
        Ok(())
    }

    fn postpass(&mut self, _rhi: &mut dyn Rhi) -> AnyResult<()> {
        self.push("postpass");
        Ok(())
    }
}

#[test]
fn phases_run_as_barriers_across_all_passes() {
    let log: EventLog = Rc::new(RefCell::new(Vec::new()));
    let mut rhi = MockRhi::with_log(Rc::clone(&log));
    let mut manager = PassManager::new();
    manager.insert("first", RecordingPass::new("first", &log));
    manager.insert("second", RecordingPass::new("second", &log));

    manager.run_frame(&mut rhi).unwrap();

    let events = log.borrow();
    assert_eq!(
        *events,
        vec![
            "first.prepass",
            "second.prepass",
            "begin_transfer",
            "first.transfer",
            "second.transfer",
            "end_transfer",
            "begin_graphics",
            "first.graphics",
            "second.graphics",
            "end_graphics",
            "first.postpass",
            "second.postpass",
        ]
    );
}

#[test]
fn disabled_pass_runs_no_phase() {
    let log: EventLog = Rc::new(RefCell::new(Vec::new()));
    let mut rhi = MockRhi::with_log(Rc::clone(&log));
    let mut manager = PassManager::new();
    manager.insert("first", RecordingPass::new("first", &log));
    manager.insert("second", RecordingPass::new("second", &log));

    manager.set_enabled("second", false);
    manager.run_frame(&mut rhi).unwrap();

    assert!(log.borrow().iter().all(|e| !e.starts_with("second.")));
    assert!(log.borrow().iter().any(|e| e == "first.graphics"));

    manager.set_enabled("second", true);
    log.borrow_mut().clear();
    manager.run_frame(&mut rhi).unwrap();
    assert!(log.borrow().iter().any(|e| e == "second.graphics"));
}

#[test]
fn phase_error_names_the_failing_pass() {
    struct FailingPass;
    impl Pass for FailingPass {
        fn prepass(&mut self, _rhi: &mut dyn Rhi) -> AnyResult<()> {
            Ok(())
        }
        fn transfer(&mut self, _rhi: &mut dyn Rhi, _ctx: TransferContext) -> AnyResult<()> {
            anyhow::bail!("upload went sideways")
        }
        fn graphics(&mut self, _rhi: &mut dyn Rhi, _ctx: GraphicsContext) -> AnyResult<()> {
            Ok(())
        }
        fn postpass(&mut self, _rhi: &mut dyn Rhi) -> AnyResult<()> {
            Ok(())
        }
    }

    let mut rhi = MockRhi::new();
    let mut manager = PassManager::new();
    manager.insert("broken", Rc::new(RefCell::new(FailingPass)));

    let err = manager.run_frame(&mut rhi).unwrap_err();
    assert!(format!("{err:#}").contains("broken"));
}
