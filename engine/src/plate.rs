//! Rigid plate records: continuous velocity with fractional-step gating,
//! mass bookkeeping, and the cross-plate momentum ledger.
//!
//! Velocities can be below one cell per tick. Each axis keeps a move counter
//! that increments every tick and fires a discrete +/-1 cell offset only once
//! it reaches 1/|v| on that axis, so plates of different speeds share one
//! integer grid without fractional coordinates.

/// Plate id marking an unowned crust node.
pub const INVALID_PLATE_ID: u16 = u16::MAX;

/// Velocity-exchange coefficient for collision momentum feedback.
pub const MOMENTUM_COEF: f32 = 0.01;

/// One rigid plate. Created at partition time, lives for the whole run.
#[derive(Debug, Clone)]
pub struct Plate {
    vx: f32,
    vz: f32,
    inv_vx: f32,
    inv_vz: f32,
    x_counter: f32,
    z_counter: f32,
    step_x: i32,
    step_z: i32,
    /// Crust density; higher-density oceanic crust resists subduction.
    pub density: f32,
    /// Default surface height for cells seeded on this plate.
    pub default_height: f32,
    /// Nodes referencing this plate, recomputed each tick from the grid.
    pub node_count: u32,
    /// node_count * density; the momentum feedback divisor.
    pub mass: f32,
    /// Interaction counts with other plates recorded during collision
    /// resolution; drained (and cleared) by [`apply_momentum`] next tick.
    /// Insertion-ordered so tie-breaks are explicit.
    pub affectors: Vec<(u16, u32)>,
    /// Pending external energy boost, expressed as a node count.
    pub boost_nodes: u32,
}

impl Plate {
    /// New stationary plate.
    pub fn new(default_height: f32, density: f32) -> Self {
        Self {
            vx: 0.0,
            vz: 0.0,
            inv_vx: f32::INFINITY,
            inv_vz: f32::INFINITY,
            x_counter: 0.0,
            z_counter: 0.0,
            step_x: 0,
            step_z: 0,
            density,
            default_height,
            node_count: 0,
            mass: 0.0,
            affectors: Vec::new(),
            boost_nodes: 0,
        }
    }

    /// Set continuous velocity and refresh the per-axis firing thresholds.
    /// A zero component never fires its axis.
    pub fn set_velocity(&mut self, vx: f32, vz: f32) {
        self.vx = vx;
        self.vz = vz;
        self.inv_vx = if vx == 0.0 { f32::INFINITY } else { (1.0 / vx).abs() };
        self.inv_vz = if vz == 0.0 { f32::INFINITY } else { (1.0 / vz).abs() };
    }

    /// Continuous x velocity (cells per tick).
    #[inline]
    pub fn vx(&self) -> f32 {
        self.vx
    }

    /// Continuous z velocity (cells per tick).
    #[inline]
    pub fn vz(&self) -> f32 {
        self.vz
    }

    /// |vx| + |vz|, the aggregate speed used to rank colliding plates.
    #[inline]
    pub fn speed(&self) -> f32 {
        self.vx.abs() + self.vz.abs()
    }

    /// Advance both move counters one tick; an axis fires a +/-1 step when
    /// its counter reaches 1/|v|, then resets.
    pub fn register_movement(&mut self) {
        self.x_counter += 1.0;
        self.z_counter += 1.0;
        if self.x_counter >= self.inv_vx {
            self.step_x = if self.vx < 0.0 { -1 } else { 1 };
            self.x_counter = 0.0;
        } else {
            self.step_x = 0;
        }
        if self.z_counter >= self.inv_vz {
            self.step_z = if self.vz < 0.0 { -1 } else { 1 };
            self.z_counter = 0.0;
        } else {
            self.step_z = 0;
        }
    }

    /// Gated integer offset for the current tick.
    #[inline]
    pub fn step(&self) -> (i32, i32) {
        (self.step_x, self.step_z)
    }

    /// Record one collision interaction with `other` into the ledger.
    pub fn record_affector(&mut self, other: u16) {
        if let Some(entry) = self.affectors.iter_mut().find(|(id, _)| *id == other) {
            entry.1 += 1;
        } else {
            self.affectors.push((other, 1));
        }
    }

    /// Refresh mass from the current node count.
    pub fn refresh_mass(&mut self) {
        self.mass = self.node_count as f32 * self.density;
    }
}

/// Apply last tick's recorded momentum feedback, then pending energy boosts.
///
/// Interacting pairs exchange velocity equal-and-opposite, scaled by the
/// interaction count and each side's mass fraction, so total momentum is
/// conserved. Zero-mass plates short-circuit instead of dividing. The boost
/// term is `v += v * 8 * (boost_nodes / node_count)`. All ledgers and boost
/// charges are cleared.
pub fn apply_momentum(plates: &mut [Plate]) {
    // Fold the symmetric per-plate ledgers into unordered pairs.
    let mut pairs: Vec<(usize, usize, u32)> = Vec::new();
    for (i, p) in plates.iter().enumerate() {
        for &(other, count) in &p.affectors {
            let j = other as usize;
            if j >= plates.len() || j == i {
                continue;
            }
            let (a, b) = if i < j { (i, j) } else { (j, i) };
            if let Some(entry) = pairs.iter_mut().find(|(pa, pb, _)| *pa == a && *pb == b) {
                entry.2 += count;
            } else {
                pairs.push((a, b, count));
            }
        }
    }

    for (a, b, count) in pairs {
        let (ma, mb) = (plates[a].mass, plates[b].mass);
        if ma <= 0.0 || mb <= 0.0 {
            continue;
        }
        let dvx = plates[a].vx - plates[b].vx;
        let dvz = plates[a].vz - plates[b].vz;
        let k = MOMENTUM_COEF * count as f32;
        let toward_b = k * ma / (ma + mb);
        let toward_a = k * mb / (ma + mb);
        let (bvx, bvz) = (plates[b].vx + dvx * toward_b, plates[b].vz + dvz * toward_b);
        let (avx, avz) = (plates[a].vx - dvx * toward_a, plates[a].vz - dvz * toward_a);
        plates[a].set_velocity(avx, avz);
        plates[b].set_velocity(bvx, bvz);
    }

    for p in plates.iter_mut() {
        p.affectors.clear();
        if p.boost_nodes > 0 && p.node_count > 0 {
            let frac = p.boost_nodes as f32 / p.node_count as f32;
            let (vx, vz) = (p.vx * (1.0 + 8.0 * frac), p.vz * (1.0 + 8.0 * frac));
            p.set_velocity(vx, vz);
        }
        p.boost_nodes = 0;
    }
}
