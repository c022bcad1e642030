//! Mosaic Core
//!
//! Contains the fundamental simulation pieces:
//! - Growable bitmasks and the set algebra queries are built on
//! - Entity Component System (ECS) with bitmask-indexed queries
//! - Deterministic time and pluggable tick sources

pub mod bitmask;
pub mod ecs;
pub mod time;

pub use mosaic_metrics as metrics;

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
