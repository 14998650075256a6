//! Frame-phased hardware rendering pipeline.
//!
//! A frame is one sequential sweep of four phases (prepass, transfer,
//! graphics, postpass) across an ordered registry of [`Pass`] objects, with
//! each phase acting as a barrier: no pass starts transfer before every pass
//! has finished prepass, and so on. Resource-manager passes own long-lived
//! GPU resources (framebuffers, palette lookups, flat textures), the patch
//! atlas packs sprite images into shared pages, and the Twodee recorder plus
//! its renderer turn heterogeneous 2D draw commands into a minimal stream of
//! batched GPU draws.

#![allow(
    clippy::min_ident_chars,
    clippy::missing_docs_in_private_items,
    clippy::missing_inline_in_public_items,
    clippy::indexing_slicing,
    clippy::panic,
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::missing_panics_doc,
    clippy::too_many_lines,
    clippy::redundant_pub_crate,
    clippy::option_if_let_else,
    clippy::similar_names,
    clippy::struct_excessive_bools,
    reason = "render pipeline code uses short coordinate names, numeric casts, and asserts for phase/handle contract violations"
)]

mod atlas;
mod blit;
mod common;
mod flats;
mod framebuffers;
mod image_source;
mod logging;
mod manager;
mod palette;
mod pass;
mod patch;
mod postimg;
mod screenshot;
mod state;
mod twodee;
mod twodee_renderer;
mod wipe;

pub use atlas::{AtlasEntry, PatchAtlasCache, ATLAS_PAGE_SIZE};
pub use blit::{BlitRectPass, BlitSource};
pub use common::CommonResourcesManager;
pub use flats::FlatTextureManager;
pub use framebuffers::FramebufferManager;
pub use image_source::{Colormap, FlatData, FlatId, ImageSource, PaletteData, PatchData, PatchId, PatchPost};
pub use logging::init_logging;
pub use manager::PassManager;
pub use palette::PaletteManager;
pub use pass::{ClosurePass, Pass};
pub use patch::{rasterize_patch, trim_patch, TrimmedRect};
pub use postimg::{BlitPostimgScreens, PostimgEffect};
pub use screenshot::ScreenshotPass;
pub use state::RenderState;
pub use twodee::{Draw2dCmd, Draw2dList, Draw2dQuad, Draw2dVertex, Draw2dVerts, QuadSource, Twodee, LIST_VERTEX_CAP};
pub use twodee_renderer::{merge_list, MergedCommand, ResolvedTexture, TwodeeRenderer};
pub use wipe::{PostprocessWipePass, WipeConfig};
