//! Patch trimming and rasterization for atlas packing.

use crate::image_source::PatchData;

/// The smallest sub-rectangle of a patch containing visible pixels, with
/// the trimmed width padded for upload alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrimmedRect {
    /// Column of the first visible pixel in the original patch.
    pub min_x: u32,
    /// Row of the first visible pixel in the original patch.
    pub min_y: u32,
    /// Packed width. Never 1: a 1-wide trim pads to 2 so every row upload
    /// stays 4-byte aligned at 2 bytes per texel.
    pub width: u32,
    pub height: u32,
}

/// Compute the trimmed bounding box of a patch.
///
/// Leading all-empty columns advance `min_x`; every later column extends
/// `max_x`, and its posts extend `min_y`/`max_y`. A patch with no visible
/// pixels yields a 1x1 rect clamped to at least the original min corner.
pub fn trim_patch(patch: &PatchData) -> TrimmedRect {
    let mut min_x: Option<u32> = None;
    let mut max_x = 0u32;
    let mut min_y = u32::MAX;
    let mut max_y = 0u32;

    for (x, column) in patch.columns.iter().enumerate() {
        if column.is_empty() {
            continue;
        }
        let x = x as u32;
        if min_x.is_none() {
            min_x = Some(x);
        }
        max_x = x;
        for post in column {
            let top = u32::from(post.row);
            let bottom = top + post.pixels.len() as u32;
            min_y = min_y.min(top);
            max_y = max_y.max(bottom.saturating_sub(1));
        }
    }

    let Some(min_x) = min_x else {
        // Fully transparent: a degenerate 1x1 rect at the clamped min corner.
        let x = u32::from(patch.width.saturating_sub(1));
        return TrimmedRect {
            min_x: x,
            min_y: 0,
            width: 2,
            height: 1,
        };
    };

    let width = (max_x - min_x + 1).max(2);
    TrimmedRect {
        min_x,
        min_y,
        width,
        height: max_y - min_y + 1,
    }
}

/// Rasterize the trimmed region of a patch into tightly packed two-channel
/// texels: palette index in the first byte, alpha (0 or 255) in the second.
pub fn rasterize_patch(patch: &PatchData, rect: TrimmedRect) -> Vec<u8> {
    let mut pixels = vec![0u8; rect.width as usize * rect.height as usize * 2];
    for dx in 0..rect.width {
        let x = (rect.min_x + dx) as usize;
        let Some(column) = patch.columns.get(x) else {
            continue;
        };
        for post in column {
            for (dy, &index) in post.pixels.iter().enumerate() {
                let y = u32::from(post.row) + dy as u32;
                if y < rect.min_y || y >= rect.min_y + rect.height {
                    continue;
                }
                let offset = ((y - rect.min_y) * rect.width + dx) as usize * 2;
                pixels[offset] = index;
                pixels[offset + 1] = 255;
            }
        }
    }
    pixels
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_source::PatchPost;

    fn patch(width: u16, height: u16, columns: Vec<Vec<PatchPost>>) -> PatchData {
        PatchData {
            width,
            height,
            left_offset: 0,
            top_offset: 0,
            columns,
        }
    }

    #[test]
    fn leading_empty_columns_advance_min_x() {
        let data = patch(
            4,
            4,
            vec![
                vec![],
                vec![],
                vec![PatchPost {
                    row: 1,
                    pixels: vec![5, 6],
                }],
                vec![PatchPost {
                    row: 0,
                    pixels: vec![7],
                }],
            ],
        );
        let rect = trim_patch(&data);
        assert_eq!(rect.min_x, 2);
        assert_eq!(rect.min_y, 0);
        assert_eq!(rect.width, 2);
        assert_eq!(rect.height, 3);
    }

    #[test]
    fn single_visible_column_pads_width_to_two() {
        let data = patch(
            3,
            3,
            vec![
                vec![],
                vec![PatchPost {
                    row: 1,
                    pixels: vec![9],
                }],
                vec![],
            ],
        );
        let rect = trim_patch(&data);
        assert_eq!(rect.width, 2);
        assert_eq!(rect.height, 1);
        assert_eq!(rect.min_x, 1);
        assert_eq!(rect.min_y, 1);
    }

    #[test]
    fn fully_transparent_patch_yields_clamped_min_rect() {
        let data = patch(8, 8, vec![vec![]; 8]);
        let rect = trim_patch(&data);
        assert_eq!(rect.min_x, 7);
        assert_eq!(rect.min_y, 0);
        assert_eq!(rect.height, 1);
    }

    #[test]
    fn rasterize_writes_index_and_alpha_pairs() {
        let data = patch(
            2,
            2,
            vec![
                vec![PatchPost {
                    row: 0,
                    pixels: vec![10, 20],
                }],
                vec![PatchPost {
                    row: 1,
                    pixels: vec![30],
                }],
            ],
        );
        let rect = trim_patch(&data);
        assert_eq!((rect.width, rect.height), (2, 2));
        let pixels = rasterize_patch(&data, rect);
        // Row 0: (10, opaque), (transparent).
        assert_eq!(&pixels[0..4], &[10, 255, 0, 0]);
        // Row 1: (20, opaque), (30, opaque).
        assert_eq!(&pixels[4..8], &[20, 255, 30, 255]);
    }
}
