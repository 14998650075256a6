mod mock;

use hwrender::{
    FlatData, FlatId, ImageSource, PatchData, PatchId, PatchPost, PostimgEffect, RenderState,
};
use mock::{EventLog, MockRhi};
use rhi::{BlendMode, Color};
use std::cell::RefCell;
use std::rc::Rc;

struct FixtureSource {
    patch: Rc<PatchData>,
    flat: Rc<FlatData>,
}

impl FixtureSource {
    fn new() -> Self {
        let columns = (0..8)
            .map(|_| {
                vec![PatchPost {
                    row: 0,
                    pixels: vec![40; 8],
                }]
            })
            .collect();
        Self {
            patch: Rc::new(PatchData {
                width: 8,
                height: 8,
                left_offset: 0,
                top_offset: 0,
                columns,
            }),
            flat: Rc::new(FlatData {
                width: 4,
                height: 4,
                pixels: vec![90; 16],
            }),
        }
    }
}

impl ImageSource for FixtureSource {
    fn patch(&self, id: PatchId) -> Option<Rc<PatchData>> {
        (id == PatchId(0)).then(|| Rc::clone(&self.patch))
    }

    fn flat(&self, id: FlatId) -> Option<Rc<FlatData>> {
        (id == FlatId(0)).then(|| Rc::clone(&self.flat))
    }
}

fn fixture_state() -> (RenderState, EventLog) {
    let log: EventLog = Rc::new(RefCell::new(Vec::new()));
    let rhi = MockRhi::with_log(Rc::clone(&log));
    let state = RenderState::new(Box::new(rhi), Rc::new(FixtureSource::new()));
    (state, log)
}

fn count(log: &EventLog, event: &str) -> usize {
    log.borrow().iter().filter(|e| *e == event).count()
}

fn position(log: &EventLog, event: &str) -> usize {
    log.borrow().iter().position(|e| e == event).unwrap()
}

#[test]
fn standard_passes_are_all_registered_by_name() {
    let (mut state, _log) = fixture_state();
    for name in [
        "framebuffers",
        "palette",
        "flats",
        "common",
        "twodee",
        "postimg",
        "screenshot",
        "blit",
        "wipe",
    ] {
        assert!(state.pass_manager().is_enabled(name), "missing pass {name:?}");
    }
}

#[test]
fn a_frame_uploads_then_draws_then_presents() {
    let (mut state, log) = fixture_state();

    state
        .twodee()
        .begin_quad()
        .rect(10.0, 10.0, 64.0, 64.0)
        .patch(PatchId(0))
        .done();
    state
        .twodee()
        .begin_quad()
        .rect(0.0, 0.0, 320.0, 8.0)
        .color(Color::new(1.0, 0.0, 0.0, 0.5))
        .blend(BlendMode::Additive)
        .done();
    state
        .twodee()
        .begin_quad()
        .rect(0.0, 100.0, 64.0, 64.0)
        .flat(FlatId(0))
        .done();

    state.render_frame().unwrap();

    // Atlas page and flat texture land during transfer, before any draw.
    assert!(count(&log, "update_texture") >= 2);
    assert!(position(&log, "end_transfer") < position(&log, "begin_graphics"));
    assert!(position(&log, "update_texture") < position(&log, "draw_indexed"));

    // Three quads with three distinct merge keys stay three draws, plus the
    // final stretch of the offscreen target onto the default framebuffer.
    assert_eq!(count(&log, "draw_indexed"), 3);
    assert_eq!(count(&log, "draw"), 1);
    assert_eq!(count(&log, "begin_default_render_pass"), 1);
    assert!(position(&log, "end_graphics") < position(&log, "present"));
    assert!(position(&log, "present") < position(&log, "finish"));

    // The recorder was consumed.
    assert!(state.twodee().is_empty());
}

#[test]
fn empty_frames_still_present_and_finish() {
    let (mut state, log) = fixture_state();

    state.render_frame().unwrap();
    state.render_frame().unwrap();

    assert_eq!(count(&log, "draw_indexed"), 0);
    assert_eq!(count(&log, "present"), 2);
    assert_eq!(count(&log, "finish"), 2);
}

#[test]
fn post_effect_adds_a_warp_pass_before_the_blit() {
    let (mut state, log) = fixture_state();

    state.render_frame().unwrap();
    let passes_without_effect = count(&log, "begin_render_pass");

    state.set_postimg_effect(PostimgEffect::Water);
    log.borrow_mut().clear();
    state.render_frame().unwrap();

    assert_eq!(count(&log, "begin_render_pass"), passes_without_effect + 1);

    state.set_postimg_effect(PostimgEffect::None);
    log.borrow_mut().clear();
    state.render_frame().unwrap();
    assert_eq!(count(&log, "begin_render_pass"), passes_without_effect);
}

#[test]
fn screenshot_request_writes_a_png_once() {
    let (mut state, log) = fixture_state();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shot.png");

    state.request_screenshot(&path);
    state.render_frame().unwrap();

    assert!(path.exists());
    assert_eq!(count(&log, "read_pixels"), 1);

    // One-shot: the next frame reads nothing.
    log.borrow_mut().clear();
    state.render_frame().unwrap();
    assert_eq!(count(&log, "read_pixels"), 0);
}
