//! Plate tectonics simulation engine on a toroidal height-field grid.
//!
//! Plates drift with fractional-step velocities, collide, subduct, rift and
//! erupt; every tick resolves per-cell multi-occupancy into a final crust
//! stack. CPU only, one mutator per world, deterministic for a given seed.
#![deny(missing_docs)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::dbg_macro, clippy::large_enum_variant)]

pub mod advect;
pub mod config;
pub mod field;
pub mod grid;
pub mod partition;
pub mod plate;
pub mod pool;
pub mod resolve;
pub mod snapshot;
pub mod terrain;
pub mod volcanism;
pub mod world;

/// Returns the engine version string from Cargo metadata.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_semver_like() {
        assert!(version().split('.').count() >= 3);
    }
}
