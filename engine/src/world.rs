//! The simulation instance: owns every mutable piece of state and drives
//! the fixed per-tick stage order.
//!
//! Stage order per tick: pending commands, plate momentum and fractional
//! stepping, advection, per-cell conflict resolution, staging release,
//! volcanism (shield then strato), plate mass recount, invariant repair.
//! Traversal and stage order are part of the model: all randomness is
//! consumed from one seeded generator in this fixed order, so a seed fully
//! reproduces a run.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::advect::{advect, AdvectStats};
use crate::config::SimParams;
use crate::field::GridField;
use crate::grid::Grid;
use crate::partition::{heal_plate_owners, partition_plates, PartitionStats};
use crate::plate::{apply_momentum, Plate, INVALID_PLATE_ID};
use crate::pool::PoolError;
use crate::resolve::{resolve_cells, ResolveParams, ResolveStats};
use crate::terrain::{setup_terrain, TerrainParams};
use crate::volcanism::{erupt_population, EruptionStats, VolcanoBank, VolcanoProfile};

/// Fatal simulation errors.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// A pool ran out of slots mid-tick.
    #[error(transparent)]
    Pool(#[from] PoolError),
    /// A cell ended the tick without a repairable surface owner.
    #[error("corrupted state: cell {cell} has no assignable surface owner")]
    Corrupted {
        /// Flat index of the offending cell.
        cell: usize,
    },
}

/// Host-controller commands, applied at the start of the next tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Charge every plate with a full velocity boost.
    ReEnergise,
    /// Reassign every plate a fresh non-trivial random velocity.
    RandomiseDirections,
    /// Move the sea level (fraction of max height).
    SetSeaLevel(f32),
    /// Scale all volcano spawn probabilities.
    SetVolcanoFrequency(f32),
}

/// Per-step switches.
#[derive(Debug, Clone, Copy, Default)]
pub struct StepParams {
    /// Emit one-line stage summaries.
    pub log_stats: bool,
}

/// Everything a completed tick reports.
#[derive(Debug, Clone, Copy, Default)]
pub struct StepStats {
    /// Index of the completed tick, starting at 1.
    pub step: u64,
    /// Advection counters.
    pub advect: AdvectStats,
    /// Conflict-resolution counters.
    pub resolve: ResolveStats,
    /// Shield-population eruption counters.
    pub shield: EruptionStats,
    /// Strato-population eruption counters.
    pub strato: EruptionStats,
    /// Surface nodes repaired by the post-tick invariant pass.
    pub repairs: u32,
}

/// A full simulation instance.
pub struct World {
    /// Setup parameters the instance was built with.
    pub params: SimParams,
    /// Grid topology.
    pub grid: Grid,
    /// Crust field.
    pub field: GridField,
    /// All plates, indexed by plate id.
    pub plates: Vec<Plate>,
    /// Volcano storage and populations.
    pub bank: VolcanoBank,
    /// Resolution constants; `volcano_frequency` tracks the host command.
    pub resolve: ResolveParams,
    /// Partition summary from setup.
    pub partition: PartitionStats,
    rng: StdRng,
    commands: Vec<Command>,
    clock: u64,
}

/// Draw a non-trivial random velocity: re-rolled until at least one axis
/// exceeds 0.3 in magnitude, so no plate sits still.
fn randomise_velocity(plate: &mut Plate, rng: &mut StdRng) {
    loop {
        let vx = rng.gen_range(-2.0..2.0f32);
        let vz = rng.gen_range(-2.0..2.0f32);
        if vx.abs() >= 0.3 || vz.abs() >= 0.3 {
            plate.set_velocity(vx, vz);
            return;
        }
    }
}

impl World {
    /// Build and fully initialize an instance: field, fractal terrain,
    /// plate partition, starting velocities.
    pub fn new(params: SimParams) -> Result<Self, PoolError> {
        let grid = Grid::new(params.width, params.height, params.cell_size);
        let mut rng = StdRng::seed_from_u64(params.seed);
        let mut field = GridField::new(&grid, params.base_height)?;
        setup_terrain(&grid, &mut field, &params, &TerrainParams::default(), &mut rng);
        let (mut plates, partition) = partition_plates(&grid, &mut field, &params, &mut rng);
        for plate in plates.iter_mut() {
            randomise_velocity(plate, &mut rng);
        }
        let resolve = ResolveParams::for_sim(&params);
        let mut world = Self {
            grid,
            field,
            plates,
            bank: VolcanoBank::with_capacity(256),
            resolve,
            partition,
            rng,
            commands: Vec::new(),
            clock: 0,
            params,
        };
        world.recount_nodes();
        Ok(world)
    }

    /// Queue a host command for the next tick.
    pub fn enqueue(&mut self, command: Command) {
        self.commands.push(command);
    }

    /// Ticks completed so far.
    pub fn clock(&self) -> u64 {
        self.clock
    }

    /// Current absolute sea height.
    pub fn sea_height(&self) -> f32 {
        self.params.sea_height()
    }

    fn apply_commands(&mut self) {
        let commands = std::mem::take(&mut self.commands);
        for command in commands {
            match command {
                Command::ReEnergise => {
                    for plate in self.plates.iter_mut() {
                        plate.boost_nodes = plate.node_count;
                    }
                }
                Command::RandomiseDirections => {
                    for plate in self.plates.iter_mut() {
                        randomise_velocity(plate, &mut self.rng);
                    }
                }
                Command::SetSeaLevel(level) => {
                    self.params.sea_level = level;
                }
                Command::SetVolcanoFrequency(frequency) => {
                    self.params.volcano_frequency = frequency;
                    self.resolve.volcano_frequency = frequency;
                }
            }
        }
    }

    /// Recompute every plate's node count and mass from the grid. The one
    /// place these fields change.
    fn recount_nodes(&mut self) {
        let mut counts = vec![0u32; self.plates.len()];
        self.field.count_plate_nodes(&mut counts);
        for (plate, count) in self.plates.iter_mut().zip(counts) {
            plate.node_count = count;
            plate.refresh_mass();
        }
    }

    /// Repair the post-tick surface invariant: every cell's surface node
    /// must be non-virtual with a valid owner. Returns the repair count.
    fn repair_invariant(&mut self) -> Result<u32, StateError> {
        let mut repairs = 0;
        for cell in 0..self.field.stacks.len() {
            let Some(id) = self.field.surface(cell) else {
                return Err(StateError::Corrupted { cell });
            };
            if self.field.nodes.get(id).is_virtual {
                self.field.nodes.get_mut(id).is_virtual = false;
                repairs += 1;
            }
        }
        repairs += heal_plate_owners(&self.grid, &mut self.field);
        for cell in 0..self.field.stacks.len() {
            let Some(id) = self.field.surface(cell) else {
                return Err(StateError::Corrupted { cell });
            };
            if self.field.nodes.get(id).plate == INVALID_PLATE_ID {
                return Err(StateError::Corrupted { cell });
            }
        }
        Ok(repairs)
    }

    /// Advance the simulation one tick.
    pub fn step_once(&mut self, step: &StepParams) -> Result<StepStats, StateError> {
        self.clock += 1;
        let mut stats = StepStats {
            step: self.clock,
            ..StepStats::default()
        };

        self.apply_commands();

        apply_momentum(&mut self.plates);
        for plate in self.plates.iter_mut() {
            plate.register_movement();
        }

        stats.advect = advect(&self.grid, &mut self.field, &self.plates)?;
        stats.resolve = resolve_cells(
            &self.grid,
            &mut self.field,
            &mut self.plates,
            &mut self.bank,
            &self.resolve,
            &mut self.rng,
        )?;
        self.field.drain_staging();

        let rock = self.params.rock_size();
        stats.shield = erupt_population(
            &self.grid,
            &mut self.field,
            &mut self.bank.pool,
            &mut self.bank.shields,
            &self.plates,
            &VolcanoProfile::shield(),
            rock,
            &mut self.rng,
        );
        stats.strato = erupt_population(
            &self.grid,
            &mut self.field,
            &mut self.bank.pool,
            &mut self.bank.stratos,
            &self.plates,
            &VolcanoProfile::strato(),
            rock,
            &mut self.rng,
        );

        self.recount_nodes();
        stats.repairs = self.repair_invariant()?;

        if step.log_stats {
            println!(
                "[step {}] advect staged={} displaced={}",
                stats.step, stats.advect.staged, stats.advect.displaced
            );
            println!(
                "[resolve] rifts={} adopt={} oo={} cc={} oc={} mixed={} subduct={} dropped={}",
                stats.resolve.rifts,
                stats.resolve.adoptions,
                stats.resolve.collisions_oo,
                stats.resolve.collisions_cc,
                stats.resolve.collisions_oc,
                stats.resolve.collisions_mixed,
                stats.resolve.subductions,
                stats.resolve.dropped,
            );
            println!(
                "[volcano] active={} spawned_shield={} spawned_strato={} retired={} particles={}",
                self.bank.active(),
                stats.resolve.shields_spawned,
                stats.resolve.stratos_spawned,
                stats.shield.retired + stats.strato.retired,
                stats.shield.particles + stats.strato.particles,
            );
            if stats.repairs > 0 {
                println!("[surface] repairs={}", stats.repairs);
            }
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_trivial_velocity_has_a_moving_axis() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut plate = Plate::new(3.0, 0.5);
        for _ in 0..32 {
            randomise_velocity(&mut plate, &mut rng);
            assert!(plate.vx().abs() >= 0.3 || plate.vz().abs() >= 0.3);
        }
    }
}
