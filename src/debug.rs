//! Debug-level plumbing.
//!
//! The original compiler threads a `debug_level` integer through every
//! component and gates `print`/`breakpoint()` calls on it. This crate keeps
//! that convention rather than reaching for a structured-logging crate: a
//! `DebugLevel` is a thin newtype over `u8` that call sites compare against
//! directly.

/// Verbosity level, `0` (silent) through `4` (per-edit tracing).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct DebugLevel(pub u8);

impl DebugLevel {
    /// Silent: no debug output.
    pub const SILENT: DebugLevel = DebugLevel(0);

    /// True if this level is at least as verbose as `level`.
    pub fn at_least(self, level: u8) -> bool {
        self.0 >= level
    }
}

impl From<u8> for DebugLevel {
    fn from(level: u8) -> Self {
        DebugLevel(level)
    }
}
