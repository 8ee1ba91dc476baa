//! Toroidal grid topology and brick-offset hexagonal rings.
//!
//! Cells are integer (x, z) columns; advection wraps both axes (torus).
//! Odd rows are treated as shifted half a cell to the right, which makes the
//! six nearest columns of a cell form a hexagon; ring searches walk that
//! hexagon outline. Plate partitioning wraps x only (cylinder) — see
//! `partition` for why the mismatch is preserved.

/// Dimensions and cell scale of the simulated crust.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grid {
    /// Number of columns.
    pub width: u32,
    /// Number of rows.
    pub height: u32,
    /// World-space edge length of one cell.
    pub cell_size: f32,
}

impl Grid {
    /// Build a grid; both dimensions must be non-zero.
    pub fn new(width: u32, height: u32, cell_size: f32) -> Self {
        assert!(width > 0 && height > 0, "grid dimensions must be non-zero");
        Self { width, height, cell_size }
    }

    /// Total cell count.
    #[inline]
    pub fn cells(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Row-major index of an in-range cell.
    #[inline]
    pub fn idx(&self, x: u32, z: u32) -> usize {
        debug_assert!(x < self.width && z < self.height);
        x as usize + z as usize * self.width as usize
    }

    /// Wrap a signed x coordinate onto the torus.
    #[inline]
    pub fn wrap_x(&self, x: i32) -> u32 {
        x.rem_euclid(self.width as i32) as u32
    }

    /// Wrap a signed z coordinate onto the torus.
    #[inline]
    pub fn wrap_z(&self, z: i32) -> u32 {
        z.rem_euclid(self.height as i32) as u32
    }

    /// Wrap a signed coordinate pair onto the torus.
    #[inline]
    pub fn wrap(&self, x: i32, z: i32) -> (u32, u32) {
        (self.wrap_x(x), self.wrap_z(z))
    }
}

/// Whether the hexagon walk starts with a diagonal move on this row.
/// Odd (shifted) rows start diagonally.
#[inline]
pub fn ring_parity(z: u32) -> bool {
    z % 2 != 0
}

/// Entry offset and diagonal state for one side of the hexagonal half-ring.
///
/// The half-ring covers dz >= 0; callers mirror -dz themselves. Side 0 climbs
/// from the left corner, side 1 runs across the top, side 2 descends toward
/// the right corner; together with the mirror these probe all six hexagon
/// sides. Each side's entry is exactly the walk state the previous side
/// finishes in, so a walk can be entered at any side and still trace the
/// same ring. `diag` is [`ring_parity`] of the center row; side 0's walk
/// toggles it once per step, which leaves it flipped at sides 1 and 2 when
/// `radius` is odd.
pub fn ring_side_start(radius: i32, diag: bool, side: u8) -> (i32, i32, bool) {
    match side {
        0 => (-radius, 0, diag),
        1 => {
            let x = if diag { ((radius - 1) / 2 + 1) - radius } else { radius / 2 - radius };
            (x, radius, diag != (radius % 2 != 0))
        }
        _ => {
            let x = if diag { radius - radius / 2 } else { radius / 2 };
            (x, radius, diag != (radius % 2 != 0))
        }
    }
}

/// Advance the half-ring walk one cell along `side`.
pub fn ring_side_step(side: u8, x: &mut i32, z: &mut i32, diag: &mut bool) {
    match side {
        0 => {
            if *diag {
                *x += 1;
            }
            *z += 1;
            *diag = !*diag;
        }
        1 => {
            *x += 1;
        }
        _ => {
            if *diag {
                *x += 1;
            }
            *z -= 1;
            *diag = !*diag;
        }
    }
}

/// Visit every (dx, dz >= 0) offset of the hexagonal half-ring at `radius`,
/// in side order from the left corner. `parity` is [`ring_parity`] of the
/// center row.
pub fn for_half_ring<F: FnMut(i32, i32)>(parity: bool, radius: i32, f: F) {
    for_half_ring_from(parity, radius, 0, f);
}

/// [`for_half_ring`] entering the walk at `start_side` instead of the left
/// corner; the remaining sides continue the walk, a wrap past side 2
/// re-enters at the left corner. Used where side-entry order must be
/// randomized to avoid directional bias.
pub fn for_half_ring_from<F: FnMut(i32, i32)>(parity: bool, radius: i32, start_side: u8, mut f: F) {
    let mut side = start_side.min(2);
    let (mut x, mut z, mut diag) = ring_side_start(radius, parity, side);
    for _ in 0..3 {
        for _ in 0..radius {
            f(x, z);
            ring_side_step(side, &mut x, &mut z, &mut diag);
        }
        side += 1;
        if side > 2 {
            side = 0;
            let (nx, nz, nd) = ring_side_start(radius, parity, 0);
            x = nx;
            z = nz;
            diag = nd;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_is_toroidal() {
        let g = Grid::new(8, 8, 1.0);
        assert_eq!(g.wrap_x(8), 0);
        assert_eq!(g.wrap_x(-1), 7);
        assert_eq!(g.wrap_z(-9), 7);
        assert_eq!(g.wrap(7 + 1, 0), (0, 0));
    }

    #[test]
    fn half_ring_has_three_sides() {
        let mut seen = Vec::new();
        for_half_ring(false, 2, |dx, dz| seen.push((dx, dz)));
        assert_eq!(seen.len(), 6);
        // starts at the left corner
        assert_eq!(seen[0], (-2, 0));
        // top side stays at dz == radius
        assert!(seen[2..4].iter().all(|&(_, dz)| dz == 2));
    }

    #[test]
    fn ring_sides_connect() {
        // Walking a side for `radius` steps must land on the next side's
        // entry, diagonal phase included.
        for radius in 1..6 {
            for parity in [false, true] {
                for side in 0..2u8 {
                    let (mut x, mut z, mut d) = ring_side_start(radius, parity, side);
                    for _ in 0..radius {
                        ring_side_step(side, &mut x, &mut z, &mut d);
                    }
                    let entry = ring_side_start(radius, parity, side + 1);
                    assert_eq!((x, z, d), entry, "radius={radius} parity={parity} side={side}");
                }
            }
        }
    }

    #[test]
    fn ring_cell_set_is_independent_of_entry_side() {
        for radius in 1..6 {
            for parity in [false, true] {
                let mut reference = Vec::new();
                for_half_ring_from(parity, radius, 0, |dx, dz| reference.push((dx, dz)));
                reference.sort_unstable();
                for side in 1..3u8 {
                    let mut seen = Vec::new();
                    for_half_ring_from(parity, radius, side, |dx, dz| seen.push((dx, dz)));
                    seen.sort_unstable();
                    assert_eq!(seen, reference, "radius={radius} parity={parity} side={side}");
                }
            }
        }
    }
}
