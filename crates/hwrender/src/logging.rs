//! Logger initialization.

use std::sync::Once;

static INIT: Once = Once::new();

/// Initialize `env_logger` once; later calls are no-ops. Filtering follows
/// `RUST_LOG`, defaulting to `info`.
pub fn init_logging() {
    INIT.call_once(|| {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    });
}
