use engine::config::SimParams;
use engine::plate::INVALID_PLATE_ID;
use engine::world::{Command, StepParams, World};

fn small_sim(seed: u64) -> SimParams {
    SimParams {
        width: 32,
        height: 32,
        plate_count: 4,
        seed,
        ..SimParams::default()
    }
}

#[test]
fn surface_invariant_holds_after_every_tick() {
    let mut world = World::new(small_sim(7)).unwrap();
    let step = StepParams::default();
    for _ in 0..10 {
        world.step_once(&step).unwrap();
        for cell in 0..world.grid.cells() {
            let stack = &world.field.stacks[cell];
            assert!(!stack.is_empty(), "cell {cell} lost its crust");
            let surface = world.field.nodes.get(stack[0]);
            assert!(!surface.is_virtual, "cell {cell} surfaced a virtual node");
            assert_ne!(surface.plate, INVALID_PLATE_ID, "cell {cell} is unowned");
        }
    }
}

#[test]
fn identical_seeds_replay_identically() {
    let mut a = World::new(small_sim(41)).unwrap();
    let mut b = World::new(small_sim(41)).unwrap();
    let step = StepParams::default();
    for _ in 0..5 {
        a.step_once(&step).unwrap();
        b.step_once(&step).unwrap();
    }
    for cell in 0..a.grid.cells() {
        assert_eq!(a.field.surface_height(cell), b.field.surface_height(cell));
        let pa = a.field.nodes.get(a.field.stacks[cell][0]).plate;
        let pb = b.field.nodes.get(b.field.stacks[cell][0]).plate;
        assert_eq!(pa, pb);
    }
    assert_eq!(a.bank.active(), b.bank.active());
}

#[test]
fn node_counts_cover_the_grid_after_recount() {
    let mut world = World::new(small_sim(13)).unwrap();
    world.step_once(&StepParams::default()).unwrap();
    let total: u32 = world.plates.iter().map(|p| p.node_count).sum();
    // every cell contributes at least its surface node
    assert!(total >= world.grid.cells() as u32);
    for plate in &world.plates {
        assert!((plate.mass - plate.node_count as f32 * plate.density).abs() < 1e-4);
    }
}

#[test]
fn re_energise_multiplies_plate_speed() {
    let mut world = World::new(small_sim(3)).unwrap();
    let before: Vec<f32> = world.plates.iter().map(|p| p.speed()).collect();
    world.enqueue(Command::ReEnergise);
    world.step_once(&StepParams::default()).unwrap();
    // a full boost charge scales velocity nine-fold before any collision
    // feedback is recorded
    for (plate, speed) in world.plates.iter().zip(before) {
        if plate.node_count > 0 {
            assert!((plate.speed() - speed * 9.0).abs() < 1e-3 * speed.max(1.0));
        }
    }
}

#[test]
fn frequency_and_sea_level_commands_take_effect() {
    let mut world = World::new(small_sim(9)).unwrap();
    world.enqueue(Command::SetVolcanoFrequency(0.0));
    world.enqueue(Command::SetSeaLevel(0.4));
    world.step_once(&StepParams::default()).unwrap();
    assert_eq!(world.resolve.volcano_frequency, 0.0);
    assert!((world.sea_height() - (2.0 + 0.4 * 10.0)).abs() < 1e-5);
}

#[test]
fn randomise_directions_changes_velocities() {
    let mut world = World::new(small_sim(21)).unwrap();
    let before: Vec<(f32, f32)> = world.plates.iter().map(|p| (p.vx(), p.vz())).collect();
    world.enqueue(Command::RandomiseDirections);
    world.step_once(&StepParams::default()).unwrap();
    let changed = world
        .plates
        .iter()
        .zip(&before)
        .filter(|(p, (vx, _))| p.vx() != *vx)
        .count();
    assert!(changed > 0);
    for plate in &world.plates {
        assert!(plate.vx().abs() >= 0.3 || plate.vz().abs() >= 0.3 || plate.node_count == 0);
    }
}
