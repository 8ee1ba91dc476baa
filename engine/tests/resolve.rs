use engine::config::SimParams;
use engine::field::{GridField, Material};
use engine::grid::Grid;
use engine::plate::Plate;
use engine::resolve::{resolve_cells, ResolveParams};
use engine::volcanism::VolcanoBank;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn quiet_params(sim: &SimParams) -> ResolveParams {
    let mut params = ResolveParams::for_sim(sim);
    // no spawn rolls, so scenarios stay fully deterministic
    params.volcano_frequency = 0.0;
    params
}

/// Stage a copy of every committed surface node in place, so cells without
/// a crafted scenario take the adopt branch.
fn stage_in_place(field: &mut GridField) {
    for cell in 0..field.stacks.len() {
        let id = field.stacks[cell][0];
        let node = *field.nodes.get(id);
        let copy = field.nodes.acquire().unwrap();
        *field.nodes.get_mut(copy) = node;
        field.staged[cell].push(copy);
    }
}

fn stage_node(
    field: &mut GridField,
    cell: usize,
    plate: u16,
    height: f32,
    density: f32,
    material: Material,
    x: u32,
    z: u32,
) -> u32 {
    let id = field.nodes.acquire().unwrap();
    let node = field.nodes.get_mut(id);
    node.plate = plate;
    node.height = height;
    node.density = density;
    node.material = material;
    node.x = x;
    node.z = z;
    field.staged[cell].push(id);
    id
}

#[test]
fn rifting_thins_and_eventually_turns_oceanic() {
    let sim = SimParams {
        width: 4,
        height: 4,
        base_height: 2.0,
        ..SimParams::default()
    };
    let grid = Grid::new(4, 4, 1.0);
    let mut field = GridField::new(&grid, 2.0).unwrap();
    for cell in 0..16 {
        let id = field.stacks[cell][0];
        let node = field.nodes.get_mut(id);
        node.plate = 0;
        node.material = Material::Continental;
    }
    let mut plates = vec![Plate::new(3.0, 0.5)];
    let mut bank = VolcanoBank::with_capacity(8);
    let params = quiet_params(&sim);
    let mut rng = StdRng::seed_from_u64(2);

    // nothing staged anywhere: every cell rifts
    let stats = resolve_cells(&grid, &mut field, &mut plates, &mut bank, &params, &mut rng).unwrap();
    assert_eq!(stats.rifts, 16);
    for cell in 0..16 {
        assert!((field.surface_height(cell) - 1.2).abs() < 1e-5);
    }
    field.drain_staging();

    // keep rifting until the threshold flips the material
    for _ in 0..4 {
        resolve_cells(&grid, &mut field, &mut plates, &mut bank, &params, &mut rng).unwrap();
        field.drain_staging();
    }
    // 2.0 * 0.6^5 = 0.156 < 0.4
    let id = field.stacks[0][0];
    assert_eq!(field.nodes.get(id).material, Material::Oceanic);
    assert!(field.surface_height(0) < sim.base_height * 0.2);
}

#[test]
fn oceanic_collision_keeps_the_densest_and_subducts_the_rest() {
    let sim = SimParams {
        width: 4,
        height: 4,
        max_height: 10.0,
        ..SimParams::default()
    };
    let grid = Grid::new(4, 4, 1.0);
    let mut field = GridField::new(&grid, 2.0).unwrap();
    stage_in_place(&mut field);
    let cell = grid.idx(1, 1);

    // replace the in-place copy with a three-way oceanic pile-up
    while let Some(id) = field.staged[cell].pop() {
        field.nodes.release(id);
    }
    stage_node(&mut field, cell, 0, 5.0, 0.5, Material::Oceanic, 1, 1);
    stage_node(&mut field, cell, 1, 6.0, 0.9, Material::Oceanic, 1, 1);
    stage_node(&mut field, cell, 2, 4.0, 0.7, Material::Oceanic, 1, 1);

    let mut plates = vec![Plate::new(3.0, 0.5), Plate::new(3.0, 0.9), Plate::new(3.0, 0.7)];
    let mut bank = VolcanoBank::with_capacity(8);
    let params = quiet_params(&sim);
    let mut rng = StdRng::seed_from_u64(3);
    let stats = resolve_cells(&grid, &mut field, &mut plates, &mut bank, &params, &mut rng).unwrap();
    field.drain_staging();

    assert_eq!(stats.collisions_oo, 1);
    let surface = field.nodes.get(field.stacks[cell][0]);
    assert_eq!(surface.plate, 1);
    assert!(!surface.is_virtual);
    assert_eq!(surface.height, 6.0); // winner's height untouched
    assert_eq!(field.stacks[cell].len(), 3);
    for &id in &field.stacks[cell][1..] {
        let loser = field.nodes.get(id);
        assert!(loser.is_virtual);
        // exactly one subduction increment
        let original = if loser.plate == 0 { 5.0 } else { 4.0 };
        assert!((loser.height - (original - sim.max_height * 0.05)).abs() < 1e-5);
    }
    // losers' plates both felt the winner push back
    assert!(plates[0].affectors.iter().any(|&(p, _)| p == 1));
    assert!(plates[2].affectors.iter().any(|&(p, _)| p == 1));
}

#[test]
fn subducting_oceanic_node_slides_under_continental_crust() {
    let sim = SimParams {
        width: 4,
        height: 4,
        max_height: 10.0,
        ..SimParams::default()
    };
    let grid = Grid::new(4, 4, 1.0);
    let mut field = GridField::new(&grid, 2.0).unwrap();
    stage_in_place(&mut field);
    let cell = grid.idx(2, 2);
    while let Some(id) = field.staged[cell].pop() {
        field.nodes.release(id);
    }
    stage_node(&mut field, cell, 0, 3.0, 0.8, Material::Oceanic, 2, 2);
    stage_node(&mut field, cell, 1, 4.0, 0.4, Material::Continental, 2, 2);

    let mut plates = vec![Plate::new(3.0, 0.8), Plate::new(3.0, 0.4)];
    let mut bank = VolcanoBank::with_capacity(8);
    let params = quiet_params(&sim);
    let mut rng = StdRng::seed_from_u64(4);
    let stats = resolve_cells(&grid, &mut field, &mut plates, &mut bank, &params, &mut rng).unwrap();
    field.drain_staging();

    assert_eq!(stats.collisions_oc, 1);
    let surface = field.nodes.get(field.stacks[cell][0]);
    assert_eq!(surface.material, Material::Continental);
    assert!(!surface.is_virtual);
    let under = field.nodes.get(field.stacks[cell][1]);
    assert_eq!(under.material, Material::Oceanic);
    assert!(under.is_virtual);
    assert!((under.height - (3.0 - sim.max_height * 0.1)).abs() < 1e-5);
}

#[test]
fn deep_virtual_remnants_are_deleted_at_commit() {
    let sim = SimParams {
        width: 4,
        height: 4,
        max_height: 10.0,
        ..SimParams::default()
    };
    let grid = Grid::new(4, 4, 1.0);
    let mut field = GridField::new(&grid, 2.0).unwrap();
    stage_in_place(&mut field);
    let cell = grid.idx(0, 0);
    // stage a virtual remnant so low the next subduction drops it
    let id = stage_node(&mut field, cell, 0, 0.5, 0.8, Material::Oceanic, 0, 0);
    field.nodes.get_mut(id).is_virtual = true;

    let mut plates = vec![Plate::new(3.0, 0.8)];
    let mut bank = VolcanoBank::with_capacity(8);
    let params = quiet_params(&sim);
    let mut rng = StdRng::seed_from_u64(5);
    let stats = resolve_cells(&grid, &mut field, &mut plates, &mut bank, &params, &mut rng).unwrap();
    field.drain_staging();

    // slide pushed it to 0.5 - 1.0 < 0, so commit dropped it
    assert_eq!(stats.slides, 1);
    assert_eq!(stats.dropped, 1);
    assert_eq!(field.stacks[cell].len(), 1);
    assert!(!field.nodes.get(field.stacks[cell][0]).is_virtual);
}

#[test]
fn continental_head_on_collision_builds_a_mountain_ridge() {
    // two continental plates on an 8x8 torus closing at one cell per tick
    let sim = SimParams {
        width: 8,
        height: 8,
        base_height: 2.0,
        max_height: 10.0,
        ..SimParams::default()
    };
    let grid = Grid::new(8, 8, 1.0);
    let mut field = GridField::new(&grid, 3.0).unwrap();
    for z in 0..8 {
        for x in 0..8 {
            let id = field.stacks[grid.idx(x, z)][0];
            let node = field.nodes.get_mut(id);
            node.plate = if x < 4 { 0 } else { 1 };
            node.material = Material::Continental;
            node.density = 0.5;
        }
    }
    let mut plates = vec![Plate::new(3.0, 0.5), Plate::new(3.0, 0.5)];
    plates[0].set_velocity(1.0, 0.0);
    plates[1].set_velocity(-1.0, 0.0);
    for p in plates.iter_mut() {
        p.register_movement();
    }

    let mut bank = VolcanoBank::with_capacity(16);
    let params = quiet_params(&sim);
    let mut rng = StdRng::seed_from_u64(6);
    engine::advect::advect(&grid, &mut field, &plates).unwrap();
    let stats = resolve_cells(&grid, &mut field, &mut plates, &mut bank, &params, &mut rng).unwrap();
    field.drain_staging();

    // columns 3 and 4 receive one node from each plate in every row
    assert_eq!(stats.collisions_cc, 16);
    for z in 0..8 {
        for x in [3u32, 4u32] {
            let stack = &field.stacks[grid.idx(x, z)];
            assert_eq!(stack.len(), 1, "collision cell keeps only the winner");
            let node = field.nodes.get(stack[0]);
            assert!(!node.is_virtual);
            assert!(node.plate == 0 || node.plate == 1);
            assert!(node.height > 3.0, "mountain building must raise the surface");
        }
    }
    // the vacated rim columns rifted instead
    assert_eq!(stats.rifts, 16);
    for z in 0..8 {
        for x in [0u32, 7u32] {
            assert!((field.surface_height(grid.idx(x, z)) - 1.8).abs() < 1e-5);
        }
    }
    // both plates logged the interaction for next tick's momentum exchange
    assert!(plates[0].affectors.iter().any(|&(p, _)| p == 1));
    assert!(plates[1].affectors.iter().any(|&(p, _)| p == 0));
}
