//! Crust storage: pooled nodes addressed by id, per-cell occupancy stacks,
//! and the staging buffers collision resolution works through.

use smallvec::SmallVec;

use crate::grid::Grid;
use crate::plate::INVALID_PLATE_ID;
use crate::pool::{Pool, PoolError, Poolable};

/// Crust composition. Oceanic crust is denser and subducts under
/// continental crust at convergent boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Material {
    /// Dense basaltic crust; loses oceanic-oceanic collisions by density.
    Oceanic,
    /// Buoyant crust; continental-continental collisions build mountains.
    Continental,
}

/// One crust parcel. Nodes live in a pool and are referenced by id from
/// the per-cell stacks.
#[derive(Debug, Clone, Copy)]
pub struct CrustNode {
    /// Owning plate, or [`INVALID_PLATE_ID`] when unowned.
    pub plate: u16,
    /// Surface height in world units.
    pub height: f32,
    /// Crust density inherited from the plate at creation.
    pub density: f32,
    /// Composition class.
    pub material: Material,
    /// Subducted remnant: still advects but no longer renders or wins cells.
    pub is_virtual: bool,
    /// Cell x, kept in sync with the stack the node sits in.
    pub x: u32,
    /// Cell z.
    pub z: u32,
}

impl Default for CrustNode {
    fn default() -> Self {
        Self {
            plate: INVALID_PLATE_ID,
            height: 0.0,
            density: 0.0,
            material: Material::Oceanic,
            is_virtual: false,
            x: 0,
            z: 0,
        }
    }
}

impl Poolable for CrustNode {
    fn reset(&mut self) {
        *self = Self::default();
    }
}

/// The full crust field: node pool plus per-cell id stacks.
///
/// `stacks[cell]` holds the committed occupants of a cell; index 0 is the
/// surface node. `staged[cell]` accumulates incoming nodes during advection
/// and is drained back to empty by the end of each tick.
#[derive(Debug)]
pub struct GridField {
    /// Node storage.
    pub nodes: Pool<CrustNode>,
    /// Committed occupants per cell; `stacks[i][0]` is the surface.
    pub stacks: Vec<SmallVec<[u32; 4]>>,
    /// In-flight occupants per cell during a resolution pass.
    pub staged: Vec<SmallVec<[u32; 8]>>,
}

impl GridField {
    /// Allocate a field with one unowned node per cell at the given height.
    pub fn new(grid: &Grid, base_height: f32) -> Result<Self, PoolError> {
        let cells = grid.cells();
        let mut nodes: Pool<CrustNode> = Pool::with_capacity(cells * 12);
        let mut stacks = Vec::with_capacity(cells);
        for z in 0..grid.height {
            for x in 0..grid.width {
                let id = nodes.acquire()?;
                let node = nodes.get_mut(id);
                node.height = base_height;
                node.density = 0.1;
                node.x = x;
                node.z = z;
                let mut stack = SmallVec::new();
                stack.push(id);
                stacks.push(stack);
            }
        }
        Ok(Self {
            nodes,
            stacks,
            staged: vec![SmallVec::new(); cells],
        })
    }

    /// Surface node id of a cell, if the cell is occupied.
    #[inline]
    pub fn surface(&self, cell: usize) -> Option<u32> {
        self.stacks[cell].first().copied()
    }

    /// Surface height of a cell, or 0.0 for an empty cell.
    pub fn surface_height(&self, cell: usize) -> f32 {
        match self.surface(cell) {
            Some(id) => self.nodes.get(id).height,
            None => 0.0,
        }
    }

    /// Release every staged id back to the pool and clear the buffers.
    /// Called after a resolution pass has copied the survivors out.
    pub fn drain_staging(&mut self) {
        for cell in 0..self.staged.len() {
            while let Some(id) = self.staged[cell].pop() {
                self.nodes.release(id);
            }
        }
    }

    /// Count committed nodes per plate. The caller sizes `counts` to the
    /// plate count; unowned nodes are skipped.
    pub fn count_plate_nodes(&self, counts: &mut [u32]) {
        for c in counts.iter_mut() {
            *c = 0;
        }
        for stack in &self.stacks {
            for &id in stack {
                let plate = self.nodes.get(id).plate;
                if (plate as usize) < counts.len() {
                    counts[plate as usize] += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_field_has_one_node_per_cell() {
        let grid = Grid::new(8, 4, 1.0);
        let field = GridField::new(&grid, 2.0).unwrap();
        assert_eq!(field.stacks.len(), 32);
        assert_eq!(field.nodes.live(), 32);
        for cell in 0..32 {
            assert_eq!(field.stacks[cell].len(), 1);
            assert_eq!(field.surface_height(cell), 2.0);
        }
        let id = field.surface(17).unwrap();
        let node = field.nodes.get(id);
        assert_eq!((node.x, node.z), (1, 2));
        assert_eq!(node.plate, INVALID_PLATE_ID);
    }

    #[test]
    fn drain_staging_returns_ids_to_pool() {
        let grid = Grid::new(4, 4, 1.0);
        let mut field = GridField::new(&grid, 2.0).unwrap();
        let id = field.nodes.acquire().unwrap();
        field.staged[0].push(id);
        field.drain_staging();
        assert_eq!(field.nodes.live(), 16);
        assert!(field.staged[0].is_empty());
    }
}
