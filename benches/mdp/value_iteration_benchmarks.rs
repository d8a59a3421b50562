use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use gridmdp::mdp::{sweep, value_iteration, Coord, GridWorld, SweepMode, ValueIterationConfig};

/// Square grid with a +1 corner, a -1 cell beside it and a diagonal of walls.
fn square_grid(size: usize) -> GridWorld {
    let walls: Vec<Coord> = (1..size.saturating_sub(1))
        .step_by(3)
        .map(|i| Coord::new(i, i))
        .collect();
    let terminals = [
        (Coord::new(size - 1, size - 1), 1.0),
        (Coord::new(size - 1, size - 2), -1.0),
    ];
    GridWorld::new(size, size, &walls, &terminals, 0.04).unwrap()
}

fn bench_sweep(c: &mut Criterion) {
    let mut group = c.benchmark_group("sweep");
    for size in [8, 32, 128] {
        let grid = square_grid(size);
        for mode in [SweepMode::InPlace, SweepMode::Synchronous] {
            group.bench_with_input(
                BenchmarkId::new(format!("{:?}", mode), size),
                &grid,
                |b, grid| {
                    let mut snapshot = grid.initial_snapshot();
                    b.iter(|| black_box(sweep(grid, &mut snapshot, mode)))
                },
            );
        }
    }
    group.finish();
}

fn bench_value_iteration(c: &mut Criterion) {
    let mut group = c.benchmark_group("value_iteration");
    for size in [8, 32] {
        let grid = square_grid(size);
        let config = ValueIterationConfig::new().with_history_limit(1);
        group.bench_with_input(BenchmarkId::from_parameter(size), &grid, |b, grid| {
            b.iter(|| black_box(value_iteration(grid, &config)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_sweep, bench_value_iteration);
criterion_main!(benches);
