mod mock;

use mock::MockRhi;
use rhi::{BufferDesc, BufferUsage, Rhi, TextureDesc, TextureFormat};

#[test]
fn buffer_upload_reads_back_identical_bytes() {
    let mut rhi = MockRhi::new();
    let buffer = rhi.create_buffer(BufferDesc {
        size: 64,
        usage: BufferUsage::Vertex,
    });

    let payload: Vec<u8> = (0..32).collect();
    let ctx = rhi.begin_transfer();
    rhi.update_buffer(ctx, buffer, 16, &payload);
    rhi.end_transfer(ctx);

    assert_eq!(&rhi.buffer_data(buffer)[16..48], payload.as_slice());
    assert_eq!(&rhi.buffer_data(buffer)[0..16], &[0u8; 16]);
}

#[test]
fn finish_is_idempotent_without_new_work() {
    let mut rhi = MockRhi::new();
    let texture = rhi.create_texture(TextureDesc {
        format: TextureFormat::Rgba8,
        width: 4,
        height: 4,
        renderable: false,
    });
    rhi.destroy_texture(texture);
    rhi.finish().unwrap();
    assert!(!rhi.is_texture_valid(texture));
    assert_eq!(rhi.texture_count(), 0);

    // No intervening frame work: the second finish destroys nothing more.
    rhi.finish().unwrap();
    assert_eq!(rhi.finish_calls, 2);
    assert_eq!(rhi.texture_count(), 0);
}

#[test]
fn reused_texture_slot_yields_a_fresh_generation() {
    let mut rhi = MockRhi::new();
    let desc = TextureDesc {
        format: TextureFormat::R8,
        width: 256,
        height: 1,
        renderable: false,
    };

    let first = rhi.create_texture(desc);
    rhi.destroy_texture(first);
    let second = rhi.create_texture(desc);

    assert_eq!(first.index(), second.index());
    assert!(second.generation() > first.generation());
    assert!(!rhi.is_texture_valid(first));
    assert!(rhi.is_texture_valid(second));
}
