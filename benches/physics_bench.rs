//! Benchmarks for rigidsim
//!
//! Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use glam::Vec3;
use rigidsim::broad_phase::{BroadPhase, AABB_MARGIN};
use rigidsim::contact::ManifoldArena;
use rigidsim::math::Pose;
use rigidsim::{sat, Collidable, ConvexMesh, PhysicsWorld, RigidBodyAttributes, RigidState};

fn unit_cube() -> Collidable {
    Collidable::from_mesh(ConvexMesh::cuboid(Vec3::splat(0.5))).unwrap()
}

fn dynamic_attrs() -> RigidBodyAttributes {
    RigidBodyAttributes::from_box(1.0, Vec3::splat(0.5), 0.0, 0.5)
}

/// World with a floor and an n×n grid of cubes resting just above it
fn grid_world(n: usize) -> PhysicsWorld {
    let mut world = PhysicsWorld::new();
    let floor = Collidable::from_mesh(ConvexMesh::cuboid(Vec3::new(50.0, 0.5, 50.0))).unwrap();
    world
        .add_body(
            RigidState::new_static(Vec3::ZERO),
            RigidBodyAttributes::new_static(0.0, 0.6),
            floor,
        )
        .unwrap();
    for i in 0..n {
        for j in 0..n {
            world
                .add_body(
                    RigidState::new_active(Vec3::new(
                        1.05 * i as f32,
                        1.0,
                        1.05 * j as f32,
                    )),
                    dynamic_attrs(),
                    unit_cube(),
                )
                .unwrap();
        }
    }
    world
}

// ============================================================================
// Full step benchmarks
// ============================================================================

fn bench_world_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("world_step");

    group.bench_function("single_body_60_steps", |b| {
        b.iter(|| {
            let mut world = PhysicsWorld::new();
            world
                .add_body(
                    RigidState::new_active(Vec3::new(0.0, 100.0, 0.0)),
                    dynamic_attrs(),
                    unit_cube(),
                )
                .unwrap();
            for _ in 0..60 {
                world.step();
            }
            black_box(world.state(0).unwrap().position)
        });
    });

    group.bench_function("grid_5x5_resting", |b| {
        let mut world = grid_world(5);
        // Settle first so the benchmark measures the steady state
        for _ in 0..120 {
            world.step();
        }
        b.iter(|| {
            world.step();
            black_box(world.stats().contacts)
        });
    });

    group.bench_function("grid_10x10_resting", |b| {
        let mut world = grid_world(10);
        for _ in 0..120 {
            world.step();
        }
        b.iter(|| {
            world.step();
            black_box(world.stats().contacts)
        });
    });

    group.finish();
}

// ============================================================================
// Stage benchmarks
// ============================================================================

fn bench_broad_phase(c: &mut Criterion) {
    let mut group = c.benchmark_group("broad_phase");

    for n in [50usize, 200] {
        let states: Vec<RigidState> = (0..n)
            .map(|i| RigidState::new_active(Vec3::new(1.2 * (i % 20) as f32, 1.2 * (i / 20) as f32, 0.0)))
            .collect();
        let bodies = vec![dynamic_attrs(); n];
        let collidables: Vec<Collidable> = (0..n).map(|_| unit_cube()).collect();

        group.bench_function(format!("sweep_{n}_bodies"), |b| {
            let mut broad = BroadPhase::new();
            let mut arena = ManifoldArena::new();
            let mut prev = Vec::new();
            let mut out = Vec::new();
            b.iter(|| {
                broad.update(
                    &states,
                    &bodies,
                    &collidables,
                    &prev,
                    &mut out,
                    &mut arena,
                    AABB_MARGIN,
                );
                std::mem::swap(&mut prev, &mut out);
                black_box(prev.len())
            });
        });
    }

    group.finish();
}

fn bench_sat(c: &mut Criterion) {
    let mut group = c.benchmark_group("sat");

    let cube = ConvexMesh::cuboid(Vec3::splat(0.5));
    let pose_a = Pose::IDENTITY;

    group.bench_function("cube_cube_overlap", |b| {
        let pose_b = Pose::from_position(Vec3::new(0.5, 0.25, 0.0));
        b.iter(|| black_box(sat::collide(&cube, &pose_a, &cube, &pose_b)));
    });

    group.bench_function("cube_cube_separated", |b| {
        let pose_b = Pose::from_position(Vec3::new(3.0, 0.0, 0.0));
        b.iter(|| black_box(sat::collide(&cube, &pose_a, &cube, &pose_b)));
    });

    group.finish();
}

criterion_group!(benches, bench_world_step, bench_broad_phase, bench_sat);
criterion_main!(benches);
