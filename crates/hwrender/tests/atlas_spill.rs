mod mock;

use hwrender::{PatchAtlasCache, PatchData, PatchId, PatchPost};
use mock::MockRhi;
use rhi::Rhi;
use std::rc::Rc;

fn opaque_patch(width: u16, height: u16) -> Rc<PatchData> {
    let columns = (0..width)
        .map(|_| {
            vec![PatchPost {
                row: 0,
                pixels: vec![7; height as usize],
            }]
        })
        .collect();
    Rc::new(PatchData {
        width,
        height,
        left_offset: 0,
        top_offset: 0,
        columns,
    })
}

fn overlaps(a: &hwrender::AtlasEntry, b: &hwrender::AtlasEntry) -> bool {
    a.page == b.page
        && a.x < b.x + b.width
        && b.x < a.x + a.width
        && a.y < b.y + b.height
        && b.y < a.y + a.height
}

#[test]
fn patches_spill_to_a_fresh_page_without_overlap() {
    let mut rhi = MockRhi::new();
    let mut cache = PatchAtlasCache::with_page_size(32);

    cache.queue_patch(PatchId(0), opaque_patch(24, 24));
    cache.queue_patch(PatchId(1), opaque_patch(24, 24));
    cache.pack_patches(&mut rhi);

    assert_eq!(cache.page_count(), 2);
    assert!(!cache.needs_rebuild());
    let a = *cache.entry(PatchId(0)).unwrap();
    let b = *cache.entry(PatchId(1)).unwrap();
    assert_ne!(a.page, b.page);
    assert!(!overlaps(&a, &b));

    // Staged texels are index/alpha pairs covering exactly the packed rects.
    let ctx = rhi.begin_transfer();
    cache.upload_pending(&mut rhi, ctx);
    rhi.end_transfer(ctx);
    let uploads = rhi
        .log
        .borrow()
        .iter()
        .filter(|e| *e == "update_texture")
        .count();
    assert_eq!(uploads, 2);
}

#[test]
fn requeueing_a_packed_patch_is_a_no_op() {
    let mut rhi = MockRhi::new();
    let mut cache = PatchAtlasCache::with_page_size(64);

    cache.queue_patch(PatchId(3), opaque_patch(8, 8));
    cache.pack_patches(&mut rhi);
    let first = *cache.entry(PatchId(3)).unwrap();

    cache.queue_patch(PatchId(3), opaque_patch(8, 8));
    cache.pack_patches(&mut rhi);

    assert_eq!(*cache.entry(PatchId(3)).unwrap(), first);
    assert_eq!(cache.page_count(), 1);
}

#[test]
fn overflow_schedules_a_rebuild_that_repacks_tighter() {
    let mut rhi = MockRhi::new();
    let mut cache = PatchAtlasCache::with_page_size(32);

    // This arrival order fragments the pages: the full-page patch lands
    // second and the last small patch has nowhere left to go.
    cache.queue_patch(PatchId(1), opaque_patch(16, 16));
    cache.queue_patch(PatchId(2), opaque_patch(32, 32));
    cache.queue_patch(PatchId(0), opaque_patch(16, 16));
    cache.pack_patches(&mut rhi);

    assert_eq!(cache.page_count(), 3);
    assert!(cache.needs_rebuild());

    // Next frame: every page is torn down and all known patches repack in
    // id order, which fits the two small ones side by side.
    cache.pack_patches(&mut rhi);

    assert_eq!(cache.page_count(), 2);
    assert!(!cache.needs_rebuild());
    assert_eq!(rhi.texture_count(), 2);
    let entries: Vec<_> = [PatchId(0), PatchId(1), PatchId(2)]
        .iter()
        .map(|id| *cache.entry(*id).unwrap())
        .collect();
    for (i, a) in entries.iter().enumerate() {
        for b in &entries[i + 1..] {
            assert!(!overlaps(a, b));
        }
    }
    let destroys = rhi
        .log
        .borrow()
        .iter()
        .filter(|e| *e == "destroy_texture")
        .count();
    assert_eq!(destroys, 3);
}
