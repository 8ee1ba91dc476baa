//! Particle-deposition volcanism.
//!
//! Two populations, shield and strato, run the same eruption algorithm with
//! different profiles: per live volcano and tick, `material_rate` rock
//! particles are dropped near the vent and rolled downhill through an
//! expanding hexagonal ring search until they find nowhere lower to go,
//! then deposited as continental material.

use rand::rngs::StdRng;
use rand::Rng;

use crate::field::{GridField, Material};
use crate::grid::{self, Grid};
use crate::plate::{Plate, INVALID_PLATE_ID};
use crate::pool::{Pool, PoolError, Poolable};

/// Length of a volcano's precomputed noise sequence. Lookups index by
/// `age * material_rate + particle`, wrapping modulo this length.
pub const NOISE_LEN: usize = 5000;

/// Largest material rate a spawn may carry; bounds the per-tick particle
/// work of a single volcano.
pub const MAX_MATERIAL_RATE: u32 = 1000;

/// An active volcano. Lives in a pool; the world keeps per-population id
/// lists.
#[derive(Debug, Clone)]
pub struct Volcano {
    /// Vent cell x.
    pub x: u32,
    /// Vent cell z.
    pub z: u32,
    /// Ticks since spawn; incremented before each eruption.
    pub age: u32,
    /// Particles erupted per tick.
    pub material_rate: u32,
    /// Owning plate, or [`INVALID_PLATE_ID`]. Owned volcanoes drift with
    /// their plate's gated step and stamp ownership on deposits.
    pub plate: u16,
    /// Deterministic per-volcano randomness for search decisions,
    /// regenerated at spawn.
    pub noise: Vec<f32>,
}

impl Default for Volcano {
    fn default() -> Self {
        Self {
            x: 0,
            z: 0,
            age: 0,
            material_rate: 0,
            plate: INVALID_PLATE_ID,
            noise: Vec::new(),
        }
    }
}

impl Poolable for Volcano {
    fn reset(&mut self) {
        let noise = std::mem::take(&mut self.noise);
        *self = Self::default();
        // keep the allocation for the next occupant
        self.noise = noise;
        self.noise.clear();
    }
}

/// Eruption parameters for one population.
#[derive(Debug, Clone, Copy)]
pub struct VolcanoProfile {
    /// Age at which a volcano retires.
    pub max_age: u32,
    /// Upper bound on the per-particle ring search radius.
    pub max_search_range: u32,
    /// Upper bound on the noise-derived height-difference threshold.
    pub max_elevation_threshold: u32,
    /// Radius of the disk particles are dropped into.
    pub drop_zone_radius: f32,
}

impl VolcanoProfile {
    /// Broad, shallow cones: long life, wide search, tight drop zone.
    pub fn shield() -> Self {
        Self {
            max_age: 10,
            max_search_range: 4,
            max_elevation_threshold: 1,
            drop_zone_radius: 2.0,
        }
    }

    /// Narrow, steep cones: short life, small search, wide drop zone.
    pub fn strato() -> Self {
        Self {
            max_age: 5,
            max_search_range: 3,
            max_elevation_threshold: 1,
            drop_zone_radius: 5.0,
        }
    }
}

/// Volcano storage plus the two active-population lists.
#[derive(Debug)]
pub struct VolcanoBank {
    /// Backing pool for both populations.
    pub pool: Pool<Volcano>,
    /// Active shield volcano ids.
    pub shields: Vec<u32>,
    /// Active strato volcano ids.
    pub stratos: Vec<u32>,
}

impl VolcanoBank {
    /// Bank with room for `capacity` simultaneous volcanoes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            pool: Pool::with_capacity(capacity),
            shields: Vec::new(),
            stratos: Vec::new(),
        }
    }

    fn spawn(
        &mut self,
        x: u32,
        z: u32,
        material_rate: u32,
        plate: u16,
        rng: &mut StdRng,
    ) -> Result<u32, PoolError> {
        let id = self.pool.acquire()?;
        let v = self.pool.get_mut(id);
        v.x = x;
        v.z = z;
        v.age = 0;
        v.material_rate = material_rate.min(MAX_MATERIAL_RATE);
        v.plate = plate;
        v.noise.clear();
        v.noise.reserve(NOISE_LEN);
        for _ in 0..NOISE_LEN {
            v.noise.push(rng.gen::<f32>());
        }
        Ok(id)
    }

    /// Spawn an unowned shield volcano.
    pub fn spawn_shield(
        &mut self,
        x: u32,
        z: u32,
        material_rate: u32,
        rng: &mut StdRng,
    ) -> Result<(), PoolError> {
        let id = self.spawn(x, z, material_rate, INVALID_PLATE_ID, rng)?;
        self.shields.push(id);
        Ok(())
    }

    /// Spawn a strato volcano, optionally owned by a plate.
    pub fn spawn_strato(
        &mut self,
        x: u32,
        z: u32,
        material_rate: u32,
        plate: u16,
        rng: &mut StdRng,
    ) -> Result<(), PoolError> {
        let id = self.spawn(x, z, material_rate, plate, rng)?;
        self.stratos.push(id);
        Ok(())
    }

    /// Total active volcanoes across both populations.
    pub fn active(&self) -> usize {
        self.shields.len() + self.stratos.len()
    }
}

/// Counters reported by one population's eruption pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct EruptionStats {
    /// Volcanoes retired this tick.
    pub retired: u32,
    /// Particles deposited this tick.
    pub particles: u32,
}

/// Roll one particle downhill from `(x, z)` and return its settling cell.
///
/// Expanding hexagonal ring scan out to `search_range`: probe each ring
/// offset on both the +z and -z half in randomized order, move to the first
/// neighbor lower than the current cell by more than `difference`, then
/// restart the scan from radius 1. Terminates when no radius offers a
/// qualifying neighbor; on a field with finitely many descents that is
/// guaranteed, because every move strictly lowers the current height by
/// more than `difference`.
pub fn roll_particle(
    grid: &Grid,
    field: &GridField,
    x: u32,
    z: u32,
    search_range: u32,
    difference: f32,
    rng: &mut StdRng,
) -> (u32, u32) {
    let (mut cx, mut cz) = (x, z);
    'restart: loop {
        for radius in 1..=search_range as i32 {
            let parity = grid::ring_parity(cz);
            let here = field.surface_height(grid.idx(cx, cz));
            let start_side = rng.gen_range(0..3u8);
            let mut moved: Option<(u32, u32)> = None;
            grid::for_half_ring_from(parity, radius, start_side, |ox, oz| {
                if moved.is_some() {
                    return;
                }
                let top = grid.wrap(cx as i32 + ox, cz as i32 + oz);
                let bot = grid.wrap(cx as i32 + ox, cz as i32 - oz);
                let order = if rng.gen::<f32>() > 0.5 { [top, bot] } else { [bot, top] };
                for probe in order {
                    if here - field.surface_height(grid.idx(probe.0, probe.1)) > difference {
                        moved = Some(probe);
                        return;
                    }
                }
            });
            if let Some((nx, nz)) = moved {
                cx = nx;
                cz = nz;
                continue 'restart;
            }
        }
        return (cx, cz);
    }
}

/// Run one population for a tick: age, retire, erupt, drift.
pub fn erupt_population(
    grid: &Grid,
    field: &mut GridField,
    bank_pool: &mut Pool<Volcano>,
    active: &mut Vec<u32>,
    plates: &[Plate],
    profile: &VolcanoProfile,
    rock_size: f32,
    rng: &mut StdRng,
) -> EruptionStats {
    let eps = rock_size * 0.2;
    let mut stats = EruptionStats::default();
    let mut i = 0;
    while i < active.len() {
        let vid = active[i];
        bank_pool.get_mut(vid).age += 1;
        if bank_pool.get(vid).age >= profile.max_age {
            bank_pool.release(vid);
            active.swap_remove(i);
            stats.retired += 1;
            continue;
        }

        let (vx, vz, rate, age, plate) = {
            let v = bank_pool.get(vid);
            (v.x, v.z, v.material_rate, v.age, v.plate)
        };
        let thrown = (age * rate) as usize;
        for particle in 0..rate {
            // polar drop sampling; biased toward the vent, kept that way
            let angle = 2.0 * std::f32::consts::PI * rng.gen::<f32>();
            let dist = profile.drop_zone_radius * rng.gen::<f32>();
            let dx = (angle.cos() * dist).round() as i32;
            let dz = (angle.sin() * dist).round() as i32;
            let (drop_x, drop_z) = grid.wrap(vx as i32 + dx, vz as i32 + dz);

            let idx = (thrown + particle as usize) % NOISE_LEN;
            let noise = bank_pool.get(vid).noise[idx];
            let search_range = (profile.max_search_range as f32 * noise) as u32 + 1;
            let difference = if profile.max_elevation_threshold == 0 {
                eps
            } else {
                let mirror = bank_pool.get(vid).noise[(NOISE_LEN - 1 - idx) % NOISE_LEN];
                (profile.max_elevation_threshold as f32 * mirror) as i32 as f32 + eps
            };

            let (sx, sz) = roll_particle(grid, field, drop_x, drop_z, search_range, difference, rng);
            let cell = grid.idx(sx, sz);
            if let Some(id) = field.surface(cell) {
                let node = field.nodes.get_mut(id);
                node.height += rock_size;
                node.material = Material::Continental;
                if plate != INVALID_PLATE_ID {
                    node.plate = plate;
                }
            }
            stats.particles += 1;
        }

        // owned volcanoes ride their plate
        if plate != INVALID_PLATE_ID {
            let (dx, dz) = plates[plate as usize].step();
            let (nx, nz) = grid.wrap(vx as i32 + dx, vz as i32 + dz);
            let v = bank_pool.get_mut(vid);
            v.x = nx;
            v.z = nz;
        }
        i += 1;
    }
    stats
}
