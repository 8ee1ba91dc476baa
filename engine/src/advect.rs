//! Advection: copy every committed node toward its plate's gated offset.
//!
//! Sources are left untouched; destinations receive independent copies in
//! the staging buffers, which conflict resolution consumes later the same
//! tick. Unowned nodes do not move.

use crate::field::GridField;
use crate::grid::Grid;
use crate::plate::{Plate, INVALID_PLATE_ID};
use crate::pool::PoolError;

/// Counters reported by one advection pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdvectStats {
    /// Node copies staged this tick.
    pub staged: u32,
    /// Copies that actually changed cell.
    pub displaced: u32,
}

/// Stage a moved copy of every node in every stack.
pub fn advect(grid: &Grid, field: &mut GridField, plates: &[Plate]) -> Result<AdvectStats, PoolError> {
    let mut stats = AdvectStats::default();
    for cell in 0..field.stacks.len() {
        for i in 0..field.stacks[cell].len() {
            let id = field.stacks[cell][i];
            let node = *field.nodes.get(id);
            let (dx, dz) = match node.plate {
                INVALID_PLATE_ID => (0, 0),
                p => plates[p as usize].step(),
            };
            let (nx, nz) = grid.wrap(node.x as i32 + dx, node.z as i32 + dz);
            let copy_id = field.nodes.acquire()?;
            let copy = field.nodes.get_mut(copy_id);
            *copy = node;
            copy.x = nx;
            copy.z = nz;
            field.staged[grid.idx(nx, nz)].push(copy_id);
            stats.staged += 1;
            if (nx, nz) != (node.x, node.z) {
                stats.displaced += 1;
            }
        }
    }
    Ok(stats)
}
