//! Per-cell conflict resolution: the tick's densest stage.
//!
//! After advection every cell's staging buffer holds zero or more incoming
//! copies. Cells are resolved in row-major order (z outer, x inner); later
//! cells' collision searches read earlier cells' already-reduced staging, so
//! traversal order is part of the model. Each cell branches on its staged
//! occupant count: zero rifts, one adopts, many collides by material mix.
//!
//! Modeling conventions kept from the reference behavior: in an
//! oceanic-oceanic collision the highest-density node stays on the surface
//! (denser crust resists subduction here); a continental-continental winner
//! is the contributing plate that already owns the most single-occupant
//! neighbor cells, found by an expanding hexagonal ring search.

use rand::rngs::StdRng;
use rand::Rng;
use smallvec::SmallVec;

use crate::config::SimParams;
use crate::field::{GridField, Material};
use crate::grid::{self, Grid};
use crate::plate::{Plate, INVALID_PLATE_ID};
use crate::pool::PoolError;
use crate::volcanism::VolcanoBank;

/// Tunables for one resolution pass. Derived from [`SimParams`] once at
/// setup; `volcano_frequency` is updated by host commands.
#[derive(Debug, Clone, Copy)]
pub struct ResolveParams {
    /// Height multiplier applied to a rifting cell's surface node.
    pub rift_shrink: f32,
    /// Below this height a rifted cell turns oceanic and may spawn a
    /// volcano.
    pub rift_depth_threshold: f32,
    /// Height lost by the losers of an oceanic-oceanic collision.
    pub oo_subduction: f32,
    /// Height lost by a node subducting under a plate of the other kind.
    pub oc_subduction: f32,
    /// Multiplier applied to the winner of a continental-continental
    /// collision.
    pub collision_uplift: f32,
    /// A subducted node this far below the surface may spawn a strato
    /// volcano.
    pub subduction_volcano_depth: f32,
    /// Virtual nodes below this height are deleted at commit.
    pub deletion_floor: f32,
    /// Rate multiplier for all volcano spawn rolls.
    pub volcano_frequency: f32,
    /// Ring-search radius cap for continental collisions; past it the
    /// fastest contributor wins outright.
    pub search_ring_cap: u32,
}

impl ResolveParams {
    /// Derive the pass constants from the simulation parameters.
    pub fn for_sim(sim: &SimParams) -> Self {
        Self {
            rift_shrink: 0.6,
            rift_depth_threshold: sim.base_height * 0.2,
            oo_subduction: sim.max_height * 0.05,
            oc_subduction: sim.max_height * 0.1,
            collision_uplift: 1.02,
            subduction_volcano_depth: sim.max_height * 0.3,
            deletion_floor: 0.0,
            volcano_frequency: sim.volcano_frequency,
            search_ring_cap: sim.width.max(sim.height),
        }
    }
}

/// Counters reported by one resolution pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolveStats {
    /// Cells with no staged occupant (thinned).
    pub rifts: u32,
    /// Cells adopting a single staged occupant.
    pub adoptions: u32,
    /// Multi-occupant cells with exactly one non-virtual node.
    pub slides: u32,
    /// Oceanic-oceanic collisions.
    pub collisions_oo: u32,
    /// Continental-continental collisions.
    pub collisions_cc: u32,
    /// One-oceanic-one-continental collisions.
    pub collisions_oc: u32,
    /// Mixed multi-material cells passed through unresolved.
    pub collisions_mixed: u32,
    /// Nodes pushed downward this pass.
    pub subductions: u32,
    /// Shield volcanoes spawned.
    pub shields_spawned: u32,
    /// Strato volcanoes spawned.
    pub stratos_spawned: u32,
    /// Virtual nodes deleted at commit.
    pub dropped: u32,
    /// Cells reseeded with fresh crust after every occupant was dropped.
    pub reseeded: u32,
    /// Continental searches that hit the ring cap and fell back to the
    /// fastest contributor.
    pub search_fallbacks: u32,
}

/// Resolve every cell and commit the new stacks. Staging is left holding
/// the surviving copies; the caller drains it after the pass.
pub fn resolve_cells(
    grid: &Grid,
    field: &mut GridField,
    plates: &mut [Plate],
    bank: &mut VolcanoBank,
    params: &ResolveParams,
    rng: &mut StdRng,
) -> Result<ResolveStats, PoolError> {
    let mut stats = ResolveStats::default();
    for z in 0..grid.height {
        for x in 0..grid.width {
            let cell = grid.idx(x, z);
            let staged_len = field.staged[cell].len();
            if staged_len == 0 {
                rift(field, bank, params, rng, cell, x, z, &mut stats)?;
            } else if staged_len == 1 {
                stats.adoptions += 1;
            } else {
                let non_virtual = field.staged[cell]
                    .iter()
                    .filter(|&&id| !field.nodes.get(id).is_virtual)
                    .count();
                if non_virtual <= 1 {
                    slide(field, bank, params, rng, cell, x, z, &mut stats)?;
                } else {
                    collide(grid, field, plates, bank, params, rng, cell, x, z, &mut stats)?;
                }
            }
            commit(field, plates, params, cell, x, z, &mut stats)?;
        }
    }
    Ok(stats)
}

/// Zero staged occupants: thin the surviving surface, maybe turn it
/// oceanic, maybe open a volcano, and re-stage it so the cell stays
/// occupied.
#[allow(clippy::too_many_arguments)]
fn rift(
    field: &mut GridField,
    bank: &mut VolcanoBank,
    params: &ResolveParams,
    rng: &mut StdRng,
    cell: usize,
    x: u32,
    z: u32,
    stats: &mut ResolveStats,
) -> Result<(), PoolError> {
    let Some(surface) = field.surface(cell) else {
        return Ok(());
    };
    let node = field.nodes.get_mut(surface);
    node.height *= params.rift_shrink;
    if node.height < params.rift_depth_threshold {
        node.material = Material::Oceanic;
        let chance = rng.gen::<f32>();
        if chance > 1.0 - 0.005 * params.volcano_frequency {
            if chance > 1.0 - 0.000_1 * params.volcano_frequency {
                bank.spawn_strato(x, z, 1000, INVALID_PLATE_ID, rng)?;
                stats.stratos_spawned += 1;
            } else {
                let rate = rng.gen_range(50..80);
                bank.spawn_shield(x, z, rate, rng)?;
                stats.shields_spawned += 1;
            }
        }
    }
    let copy = *field.nodes.get(surface);
    let copy_id = field.nodes.acquire()?;
    *field.nodes.get_mut(copy_id) = copy;
    field.staged[cell].push(copy_id);
    stats.rifts += 1;
    Ok(())
}

/// Multiple occupants but at most one on the surface: the virtual remnants
/// keep sliding down; deep ones may open a strato volcano above.
fn slide(
    field: &mut GridField,
    bank: &mut VolcanoBank,
    params: &ResolveParams,
    rng: &mut StdRng,
    cell: usize,
    x: u32,
    z: u32,
    stats: &mut ResolveStats,
) -> Result<(), PoolError> {
    let surface_height = field.staged[cell]
        .iter()
        .find(|&&id| !field.nodes.get(id).is_virtual)
        .map(|&id| field.nodes.get(id).height)
        .unwrap_or(0.0);
    for i in 0..field.staged[cell].len() {
        let id = field.staged[cell][i];
        if !field.nodes.get(id).is_virtual {
            continue;
        }
        let node = field.nodes.get_mut(id);
        node.height -= params.oc_subduction;
        let depth = node.height;
        stats.subductions += 1;
        if depth < surface_height - params.subduction_volcano_depth
            && rng.gen::<f32>() < 0.000_1 * params.volcano_frequency
        {
            let rate = rng.gen_range(30..60);
            bank.spawn_strato(x, z, rate, INVALID_PLATE_ID, rng)?;
            stats.stratos_spawned += 1;
        }
    }
    stats.slides += 1;
    Ok(())
}

/// Multiple surfaced occupants: dispatch on the staged material mix.
#[allow(clippy::too_many_arguments)]
fn collide(
    grid: &Grid,
    field: &mut GridField,
    plates: &mut [Plate],
    bank: &mut VolcanoBank,
    params: &ResolveParams,
    rng: &mut StdRng,
    cell: usize,
    x: u32,
    z: u32,
    stats: &mut ResolveStats,
) -> Result<(), PoolError> {
    // non-virtual occupants shove every co-occupant's plate
    for i in 0..field.staged[cell].len() {
        let pusher = field.nodes.get(field.staged[cell][i]).plate;
        if field.nodes.get(field.staged[cell][i]).is_virtual || pusher == INVALID_PLATE_ID {
            continue;
        }
        for j in 0..field.staged[cell].len() {
            if i == j {
                continue;
            }
            let affected = field.nodes.get(field.staged[cell][j]).plate;
            if affected != INVALID_PLATE_ID && affected != pusher {
                plates[affected as usize].record_affector(pusher);
            }
        }
    }

    let mut oceanic = 0usize;
    let mut continental = 0usize;
    for &id in &field.staged[cell] {
        match field.nodes.get(id).material {
            Material::Oceanic => oceanic += 1,
            Material::Continental => continental += 1,
        }
    }

    if continental == 0 {
        collide_oceanic(field, params, cell, stats);
    } else if oceanic == 0 {
        collide_continental(grid, field, plates, bank, params, rng, cell, x, z, stats)?;
    } else if oceanic == 1 && continental == 1 {
        collide_oceanic_continental(field, bank, params, rng, cell, x, z, stats)?;
    } else {
        // several of both kinds together is not modeled; pass through
        stats.collisions_mixed += 1;
    }
    Ok(())
}

/// Oceanic-oceanic: the densest occupant surfaces, the rest subduct.
fn collide_oceanic(field: &mut GridField, params: &ResolveParams, cell: usize, stats: &mut ResolveStats) {
    let mut densest = 0usize;
    let mut highest = 0.0f32;
    for (i, &id) in field.staged[cell].iter().enumerate() {
        let d = field.nodes.get(id).density;
        if d > highest {
            densest = i;
            highest = d;
        }
    }
    for i in 0..field.staged[cell].len() {
        let id = field.staged[cell][i];
        let node = field.nodes.get_mut(id);
        if i == densest {
            node.is_virtual = false;
        } else {
            node.is_virtual = true;
            node.height -= params.oo_subduction;
            stats.subductions += 1;
        }
    }
    let winner = field.staged[cell].remove(densest);
    field.staged[cell].insert(0, winner);
    stats.collisions_oo += 1;
}

/// Continental-continental: collision pulse spawns, then ownership by
/// neighbor census, then uplift.
#[allow(clippy::too_many_arguments)]
fn collide_continental(
    grid: &Grid,
    field: &mut GridField,
    plates: &mut [Plate],
    bank: &mut VolcanoBank,
    params: &ResolveParams,
    rng: &mut StdRng,
    cell: usize,
    x: u32,
    z: u32,
    stats: &mut ResolveStats,
) -> Result<(), PoolError> {
    // fastest contributing plate by aggregate speed
    let mut fastest = INVALID_PLATE_ID;
    let mut top_speed = 0.0f32;
    let mut contributors: Vec<(u16, u32)> = Vec::new();
    for &id in &field.staged[cell] {
        let plate = field.nodes.get(id).plate;
        if plate == INVALID_PLATE_ID {
            continue;
        }
        let speed = plates[plate as usize].speed();
        if speed > top_speed || fastest == INVALID_PLATE_ID {
            fastest = plate;
            top_speed = speed;
        }
        if !contributors.iter().any(|(p, _)| *p == plate) {
            contributors.push((plate, 0));
        }
    }
    if fastest == INVALID_PLATE_ID {
        stats.collisions_mixed += 1;
        return Ok(());
    }

    // collision pulse: slower contributors occasionally open a strato
    // volcano sized by their closing speed against the fastest plate
    for i in 0..field.staged[cell].len() {
        let plate = field.nodes.get(field.staged[cell][i]).plate;
        if plate == fastest || plate == INVALID_PLATE_ID {
            continue;
        }
        if rng.gen::<f32>() > 0.99 {
            let dvx = plates[fastest as usize].vx() - plates[plate as usize].vx();
            let dvz = plates[fastest as usize].vz() - plates[plate as usize].vz();
            let magnitude = (dvx * dvx + dvz * dvz).sqrt();
            let rate = ((magnitude * rng.gen_range(100.0..201.0)).round() as u32).clamp(10, 300);
            bank.spawn_strato(x, z, rate, plate, rng)?;
            stats.stratos_spawned += 1;
        }
    }

    // expanding ring census of single-occupant contributor neighbors
    let mut found = false;
    for radius in 1..=params.search_ring_cap as i32 {
        let parity = grid::ring_parity(z);
        grid::for_half_ring(parity, radius, |ox, oz| {
            for (nx, nz) in [
                grid.wrap(x as i32 + ox, z as i32 + oz),
                grid.wrap(x as i32 + ox, z as i32 - oz),
            ] {
                let neighbor = &field.staged[grid.idx(nx, nz)];
                if neighbor.len() != 1 {
                    continue;
                }
                let plate = field.nodes.get(neighbor[0]).plate;
                if let Some(entry) = contributors.iter_mut().find(|(p, _)| *p == plate) {
                    entry.1 += 1;
                    found = true;
                }
            }
        });
        if found {
            break;
        }
    }
    let winner = if found {
        let mut best = contributors[0];
        for &entry in &contributors[1..] {
            if entry.1 > best.1 || (entry.1 == best.1 && entry.0 < best.0) {
                best = entry;
            }
        }
        best.0
    } else {
        stats.search_fallbacks += 1;
        fastest
    };

    // winner's nodes to the front, everyone else released outright
    let old_surface = field.surface_height(cell);
    let staged = std::mem::take(&mut field.staged[cell]);
    let mut kept: SmallVec<[u32; 8]> = SmallVec::new();
    for id in staged {
        if field.nodes.get(id).plate == winner {
            kept.push(id);
        } else {
            field.nodes.release(id);
        }
    }
    if let Some(&first) = kept.first() {
        let node = field.nodes.get_mut(first);
        node.is_virtual = false;
        node.height = node.height.max(old_surface) * params.collision_uplift;
    }
    field.staged[cell] = kept;
    stats.collisions_cc += 1;
    Ok(())
}

/// Exactly one oceanic and one continental occupant: the oceanic node
/// subducts, the continental one surfaces; deep subduction may open a
/// strato volcano.
#[allow(clippy::too_many_arguments)]
fn collide_oceanic_continental(
    field: &mut GridField,
    bank: &mut VolcanoBank,
    params: &ResolveParams,
    rng: &mut StdRng,
    cell: usize,
    x: u32,
    z: u32,
    stats: &mut ResolveStats,
) -> Result<(), PoolError> {
    let oceanic_pos = field.staged[cell]
        .iter()
        .position(|&id| field.nodes.get(id).material == Material::Oceanic);
    let Some(oceanic_pos) = oceanic_pos else {
        return Ok(());
    };
    let oceanic_id = field.staged[cell][oceanic_pos];
    let continental_id = field.staged[cell][1 - oceanic_pos];

    let subducted = {
        let node = field.nodes.get_mut(oceanic_id);
        node.is_virtual = true;
        node.height -= params.oc_subduction;
        node.height
    };
    field.nodes.get_mut(continental_id).is_virtual = false;
    let surface = field.nodes.get(continental_id).height;
    field.staged[cell].clear();
    field.staged[cell].push(continental_id);
    field.staged[cell].push(oceanic_id);
    stats.subductions += 1;

    if subducted < surface - params.subduction_volcano_depth
        && rng.gen::<f32>() < 0.000_1 * params.volcano_frequency
    {
        let rate = rng.gen_range(30..60);
        bank.spawn_strato(x, z, rate, INVALID_PLATE_ID, rng)?;
        stats.stratos_spawned += 1;
    }
    stats.collisions_oc += 1;
    Ok(())
}

/// Replace the committed stack with copies of the staged survivors,
/// surface first, deleting virtual nodes below the deletion floor. A cell
/// whose survivors were all deleted is reseeded with fresh crust on its
/// previous owner.
#[allow(clippy::too_many_arguments)]
fn commit(
    field: &mut GridField,
    plates: &[Plate],
    params: &ResolveParams,
    cell: usize,
    x: u32,
    z: u32,
    stats: &mut ResolveStats,
) -> Result<(), PoolError> {
    let prev_owner = field.surface(cell).map(|id| field.nodes.get(id).plate);
    while let Some(id) = field.stacks[cell].pop() {
        field.nodes.release(id);
    }
    for i in 0..field.staged[cell].len() {
        let id = field.staged[cell][i];
        let node = *field.nodes.get(id);
        if node.is_virtual && node.height < params.deletion_floor {
            stats.dropped += 1;
            continue;
        }
        let copy_id = field.nodes.acquire()?;
        *field.nodes.get_mut(copy_id) = node;
        field.stacks[cell].push(copy_id);
    }
    if field.stacks[cell].is_empty() {
        let plate = prev_owner.unwrap_or(INVALID_PLATE_ID);
        let id = field.nodes.acquire()?;
        let node = field.nodes.get_mut(id);
        node.plate = plate;
        node.height = match plate {
            INVALID_PLATE_ID => 1.0,
            p => plates[p as usize].default_height,
        };
        node.material = Material::Oceanic;
        node.x = x;
        node.z = z;
        field.stacks[cell].push(id);
        stats.reseeded += 1;
    }
    Ok(())
}
