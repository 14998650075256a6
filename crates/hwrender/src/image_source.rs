//! Read-only image inputs from the engine boundary.
//!
//! Patches are run-length column sprites, flats are power-of-two indexed
//! tile images, and both are fetched by opaque lump identifier. The pipeline
//! never mutates image data; shared `Rc`s let the atlas keep sources around
//! for wholesale rebuilds without copying pixels.

use std::rc::Rc;

/// Opaque identifier of a sprite patch lump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PatchId(pub u32);

/// Opaque identifier of a flat lump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FlatId(pub u32);

/// One vertical run of opaque pixels inside a patch column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchPost {
    /// Row of the first pixel, from the top of the patch.
    pub row: u16,
    /// Palette indices, one per row downward.
    pub pixels: Vec<u8>,
}

/// A sprite patch in run-length column form.
///
/// `columns` always has `width` entries; a column with no posts is fully
/// transparent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchData {
    pub width: u16,
    pub height: u16,
    /// Drawing origin offsets, carried through to atlas entries.
    pub left_offset: i16,
    pub top_offset: i16,
    pub columns: Vec<Vec<PatchPost>>,
}

/// A flat: `width * height` palette indices, both dimensions powers of two.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatData {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// The engine palette: 256 RGBA entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaletteData(pub [[u8; 4]; 256]);

impl Default for PaletteData {
    fn default() -> Self {
        Self([[0, 0, 0, 255]; 256])
    }
}

/// A 256-byte palette-index remapping table, shared by pointer identity.
///
/// Colormap textures are cached per frame keyed on `Rc::as_ptr`, so callers
/// must reuse the same `Rc` for draws meant to share one lookup texture.
pub type Colormap = Rc<[u8; 256]>;

/// Boundary trait the simulation side implements to serve image lumps.
pub trait ImageSource {
    /// Fetch a patch by id, or `None` when the lump does not exist.
    fn patch(&self, id: PatchId) -> Option<Rc<PatchData>>;

    /// Fetch a flat by id, or `None` when the lump does not exist.
    fn flat(&self, id: FlatId) -> Option<Rc<FlatData>>;
}
