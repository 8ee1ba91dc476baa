//! Setup terrain: fractal base heights and the initial sea-level pass.
//!
//! Runs once against a freshly built field, before partitioning. The fractal
//! is a diamond-square pass over the torus (both axes wrap, so no special
//! edge handling is needed) with a low-amplitude noise layer underneath to
//! keep the sea floor from being perfectly flat.

use rand::rngs::StdRng;
use rand::Rng;

use crate::config::SimParams;
use crate::field::{GridField, Material};
use crate::grid::Grid;

/// Parameters for the one-time fractal pass.
#[derive(Debug, Clone, Copy)]
pub struct TerrainParams {
    /// Initial lattice spacing in cells; halves each octave.
    pub feature_size: u32,
    /// Displacement amplitude at the first octave, in world units.
    pub amplitude: f32,
    /// Amplitude of the per-cell seabed noise layer.
    pub seabed_noise: f32,
}

impl Default for TerrainParams {
    fn default() -> Self {
        Self {
            feature_size: 32,
            amplitude: 4.0,
            seabed_noise: 0.05,
        }
    }
}

/// Summary of the setup pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerrainStats {
    /// Cells ending below sea level (Oceanic).
    pub ocean_cells: u32,
    /// Cells ending above sea level (Continental).
    pub land_cells: u32,
    /// Minimum height after the pass.
    pub min_height: f32,
    /// Maximum height after the pass.
    pub max_height: f32,
}

/// Generate fractal heights into `heights` (length W*H, row-major).
///
/// Classic diamond-square on the wrapped lattice: seed every cell on the
/// coarse lattice, then alternate square (cell centers) and diamond (edge
/// midpoints) averaging with halving step and amplitude.
pub fn fractal_heights(
    grid: &Grid,
    params: &TerrainParams,
    base_height: f32,
    rng: &mut StdRng,
    heights: &mut [f32],
) {
    let (w, h) = (grid.width as i32, grid.height as i32);
    for v in heights.iter_mut() {
        *v = base_height;
    }

    let mut step = params.feature_size.max(2) as i32;
    let mut amp = params.amplitude;

    // Seed the coarse lattice.
    let mut z = 0;
    while z < h {
        let mut x = 0;
        while x < w {
            heights[grid.idx(x as u32, z as u32)] = base_height + rng.gen_range(-amp..amp);
            x += step;
        }
        z += step;
    }

    while step > 1 {
        let half = step / 2;

        // Square step: centers from the four lattice corners.
        let mut z = half;
        while z < h + half {
            let mut x = half;
            while x < w + half {
                let sum = heights[grid.idx(grid.wrap_x(x - half), grid.wrap_z(z - half))]
                    + heights[grid.idx(grid.wrap_x(x + half), grid.wrap_z(z - half))]
                    + heights[grid.idx(grid.wrap_x(x - half), grid.wrap_z(z + half))]
                    + heights[grid.idx(grid.wrap_x(x + half), grid.wrap_z(z + half))];
                let idx = grid.idx(grid.wrap_x(x), grid.wrap_z(z));
                heights[idx] = sum / 4.0 + rng.gen_range(-amp..amp);
                x += step;
            }
            z += step;
        }

        // Diamond step: edge midpoints from the four axis neighbors.
        let mut z = 0;
        while z < h {
            let x0 = if (z / half) % 2 == 0 { half } else { 0 };
            let mut x = x0;
            while x < w {
                let sum = heights[grid.idx(grid.wrap_x(x - half), grid.wrap_z(z))]
                    + heights[grid.idx(grid.wrap_x(x + half), grid.wrap_z(z))]
                    + heights[grid.idx(grid.wrap_x(x), grid.wrap_z(z - half))]
                    + heights[grid.idx(grid.wrap_x(x), grid.wrap_z(z + half))];
                let idx = grid.idx(grid.wrap_x(x), grid.wrap_z(z));
                heights[idx] = sum / 4.0 + rng.gen_range(-amp..amp);
                x += step;
            }
            z += half;
        }

        step = half;
        amp *= 0.5;
    }
}

/// Run the full setup pass: fractal heights, seabed noise, then the
/// sea-level classification (below sea level pinned to a shallow shelf and
/// marked Oceanic; above sea level the excess is halved and marked
/// Continental).
pub fn setup_terrain(
    grid: &Grid,
    field: &mut GridField,
    sim: &SimParams,
    params: &TerrainParams,
    rng: &mut StdRng,
) -> TerrainStats {
    let mut heights = vec![0.0f32; grid.cells()];
    fractal_heights(grid, params, sim.base_height, rng, &mut heights);

    let sea = sim.sea_height();
    let shelf = sea - 0.025 * sim.max_height;
    let mut stats = TerrainStats {
        min_height: f32::INFINITY,
        max_height: f32::NEG_INFINITY,
        ..TerrainStats::default()
    };

    for (cell, &raw) in heights.iter().enumerate() {
        let y = raw + rng.gen_range(-params.seabed_noise..params.seabed_noise);
        let Some(id) = field.surface(cell) else {
            continue;
        };
        let node = field.nodes.get_mut(id);
        if y < sea {
            node.height = shelf;
            node.material = Material::Oceanic;
            stats.ocean_cells += 1;
        } else {
            node.height = sea + (y - sea) * 0.5;
            node.material = Material::Continental;
            stats.land_cells += 1;
        }
        stats.min_height = stats.min_height.min(node.height);
        stats.max_height = stats.max_height.max(node.height);
    }
    stats
}
