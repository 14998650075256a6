//! WGPU implementation of the backend-agnostic `rhi` contract.
//!
//! This crate owns every native GPU object behind the handles it mints. The
//! transfer scope maps to queue writes, the graphics scope records logical
//! commands that are replayed into real render passes at `end_graphics`, and
//! `finish()` drains the deferred destruction queues.
#![allow(
    clippy::min_ident_chars,
    clippy::missing_docs_in_private_items,
    clippy::missing_inline_in_public_items,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss,
    clippy::cast_lossless,
    clippy::too_many_lines,
    clippy::missing_const_for_fn,
    clippy::redundant_pub_crate,
    clippy::option_if_let_else,
    clippy::default_trait_access,
    clippy::doc_markdown,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::unnecessary_wraps,
    clippy::similar_names,
    clippy::too_many_arguments,
    clippy::struct_excessive_bools,
    clippy::match_same_arms,
    clippy::items_after_statements,
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::unwrap_in_result,
    clippy::panic,
    reason = "GPU backend code uses short names for coordinates, numeric casts for graphics operations, and asserts for internal invariants"
)]

mod backend;
mod commands;
mod error;
mod gpu;
mod pipelines;
mod shaders;

pub use backend::WgpuRhi;
pub use error::{submit_with_validation, with_validation_scope};
pub use gpu::{GpuContext, SurfaceTarget};
pub use shaders::{ShaderCatalog, preprocess_shader};
