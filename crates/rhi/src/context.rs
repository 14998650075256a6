//! Generation-stamped context tokens.
//!
//! `begin_transfer`/`begin_graphics` hand the caller a token stamped with the
//! backend's monotonically increasing context generation. Every context-scoped
//! operation takes the token back and asserts the stamp matches the currently
//! open scope, so a token held across `end_*` (or forged for a scope that was
//! never opened) is a programming error caught immediately rather than a
//! silently misattributed command.

/// Token for an open transfer scope.
///
/// While a transfer scope is open, buffer and texture contents may be
/// uploaded and transient uniform/binding sets built. Transfer and graphics
/// scopes are mutually exclusive and non-reentrant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferContext {
    generation: u64,
}

impl TransferContext {
    /// Mint a token for generation `generation`. Backends only.
    pub const fn new(generation: u64) -> Self {
        Self { generation }
    }

    /// The backend generation this token belongs to.
    pub const fn generation(self) -> u64 {
        self.generation
    }
}

/// Token for an open graphics scope.
///
/// While a graphics scope is open, render passes are entered and exited,
/// pipelines and sets bound, and draws issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphicsContext {
    generation: u64,
}

impl GraphicsContext {
    /// Mint a token for generation `generation`. Backends only.
    pub const fn new(generation: u64) -> Self {
        Self { generation }
    }

    /// The backend generation this token belongs to.
    pub const fn generation(self) -> u64 {
        self.generation
    }
}
