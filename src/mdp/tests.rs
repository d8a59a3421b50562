use approx::assert_abs_diff_eq;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::mdp::{
    bellman_update, neighbor_value, sweep, value_iteration, CellKind, Coord, GridWorld,
    MdpConfig, StoppingRule, SweepMode, ValueIterationConfig, ValueSnapshot,
};

/// The 4x3 world from Russell & Norvig: wall at (1,1), +1 at (3,2), -1 at (3,1).
fn classic_grid() -> GridWorld {
    GridWorld::new(
        4,
        3,
        &[Coord::new(1, 1)],
        &[(Coord::new(3, 2), 1.0), (Coord::new(3, 1), -1.0)],
        0.04,
    )
    .unwrap()
}

fn all_configs() -> Vec<ValueIterationConfig> {
    let mut configs = Vec::new();
    for stopping in [StoppingRule::Threshold(1e-9), StoppingRule::ExactDelta] {
        for mode in [SweepMode::InPlace, SweepMode::Synchronous] {
            configs.push(
                ValueIterationConfig::new()
                    .with_stopping(stopping)
                    .with_sweep_mode(mode),
            );
        }
    }
    configs
}

fn random_grid(rng: &mut ChaCha8Rng) -> GridWorld {
    let width = rng.gen_range(1..=6);
    let height = rng.gen_range(1..=6);
    let mut walls = Vec::new();
    let mut terminals = Vec::new();
    for y in 0..height {
        for x in 0..width {
            let roll: f64 = rng.gen();
            if roll < 0.15 {
                walls.push(Coord::new(x, y));
            } else if roll < 0.3 {
                terminals.push((Coord::new(x, y), rng.gen_range(-1.0..1.0)));
            }
        }
    }
    let living_cost = rng.gen_range(0.0..0.1);
    GridWorld::new(width, height, &walls, &terminals, living_cost).unwrap()
}

#[test]
fn test_single_terminal_cell_never_sweeps() {
    let grid = GridWorld::new(1, 1, &[], &[(Coord::new(0, 0), 10.0)], 0.0).unwrap();
    for config in all_configs() {
        let result = value_iteration(&grid, &config);
        assert!(result.converged);
        assert_eq!(result.history.len(), 1);
        assert_eq!(result.sweeps, 1);
        assert_eq!(result.final_delta, 0.0);
        assert_eq!(result.final_snapshot().to_nested(), vec![vec![10.0]]);
    }
}

#[test]
fn test_wall_blocks_only_route_to_reward() {
    // [free][wall][+1] with no living cost: the free cell can only stay put.
    let grid = GridWorld::new(3, 1, &[Coord::new(1, 0)], &[(Coord::new(2, 0), 1.0)], 0.0)
        .unwrap();
    for config in all_configs() {
        let result = value_iteration(&grid, &config);
        assert!(result.converged);
        let values = result.final_snapshot();
        assert_eq!(values.get(Coord::new(0, 0)), 0.0);
        assert_eq!(values.get(Coord::new(1, 0)), 0.0);
        assert_eq!(values.get(Coord::new(2, 0)), 1.0);
    }
}

#[test]
fn test_far_corner_worth_less_than_adjacent_cells() {
    let grid = GridWorld::new(2, 2, &[], &[(Coord::new(1, 1), 1.0)], 0.04).unwrap();
    for config in all_configs() {
        let result = value_iteration(&grid, &config);
        assert!(result.converged);
        let values = result.final_snapshot();
        let far = values.get(Coord::new(0, 0));
        assert!(far < values.get(Coord::new(1, 0)));
        assert!(far < values.get(Coord::new(0, 1)));
        assert_abs_diff_eq!(
            values.get(Coord::new(1, 0)),
            values.get(Coord::new(0, 1)),
            epsilon = 1e-6
        );
    }
}

#[test]
fn test_classic_grid_converged_values() {
    let grid = classic_grid();
    let config = ValueIterationConfig::new().with_stopping(StoppingRule::ExactDelta);
    let result = value_iteration(&grid, &config);
    assert!(result.converged);
    assert_eq!(result.final_delta, 0.0);

    let values = result.final_snapshot();
    let expected = [
        (Coord::new(0, 2), 0.4814744801512288),
        (Coord::new(1, 2), 0.6086956521739131),
        (Coord::new(2, 2), 0.8108695652173913),
        (Coord::new(0, 1), 0.3451795841209831),
        (Coord::new(2, 1), 0.5086956521739131),
        (Coord::new(0, 0), 0.2653776217481322),
        (Coord::new(1, 0), 0.2923395445134576),
        (Coord::new(2, 0), 0.4154244306418220),
        (Coord::new(3, 0), 0.1923395445134576),
    ];
    for (cell, value) in expected {
        assert_abs_diff_eq!(values.get(cell), value, epsilon = 1e-9);
    }
}

#[test]
fn test_sweep_modes_agree_at_convergence() {
    let grid = classic_grid();
    let in_place = value_iteration(&grid, &ValueIterationConfig::new().with_epsilon(1e-12));
    let synchronous = value_iteration(
        &grid,
        &ValueIterationConfig::new()
            .with_epsilon(1e-12)
            .with_sweep_mode(SweepMode::Synchronous),
    );
    assert!(
        in_place
            .final_snapshot()
            .max_abs_diff(synchronous.final_snapshot())
            < 1e-9
    );
    // Reading fresh values inside a sweep propagates reward faster.
    assert!(in_place.sweeps < synchronous.sweeps);
}

#[test]
fn test_converged_grid_is_a_fixed_point() {
    let grid = classic_grid();
    let result = value_iteration(&grid, &ValueIterationConfig::new().with_epsilon(0.0));
    assert!(result.converged);

    let mut again = result.final_snapshot().clone();
    let delta = sweep(&grid, &mut again, SweepMode::InPlace);
    assert_eq!(delta, 0.0);
    assert!(again.max_abs_diff(result.final_snapshot()) < 1e-12);
}

#[test]
fn test_delta_sequence_non_increasing() {
    let grid = classic_grid();
    for mode in [SweepMode::InPlace, SweepMode::Synchronous] {
        let mut snapshot = grid.initial_snapshot();
        let deltas: Vec<f64> = (0..40).map(|_| sweep(&grid, &mut snapshot, mode)).collect();
        for pair in deltas.windows(2) {
            assert!(pair[1] <= pair[0], "{:?} increased under {:?}", pair, mode);
        }
    }
}

#[test]
fn test_history_entries_are_distinct_copies() {
    let grid = classic_grid();
    let result = value_iteration(&grid, &ValueIterationConfig::new());
    let history: Vec<&ValueSnapshot> = result.history.iter().collect();
    assert!(history.len() > 2);
    assert_eq!(*history[0], grid.initial_snapshot());
    // Each appended entry came from a sweep that changed something.
    for pair in history.windows(2) {
        assert!(pair[1].max_abs_diff(pair[0]) > 0.0);
    }
}

#[test]
fn test_degenerate_grids_converge_immediately() {
    let empty = GridWorld::new(0, 0, &[], &[], 0.04).unwrap();
    let no_width = GridWorld::new(0, 5, &[], &[], 0.04).unwrap();
    let all_walls = GridWorld::new(
        2,
        2,
        &[
            Coord::new(0, 0),
            Coord::new(1, 0),
            Coord::new(0, 1),
            Coord::new(1, 1),
        ],
        &[],
        0.04,
    )
    .unwrap();

    for grid in [empty, no_width, all_walls] {
        for config in all_configs() {
            let result = value_iteration(&grid, &config);
            assert!(result.converged);
            assert_eq!(result.sweeps, 1);
            assert_eq!(result.history.len(), 1);
            assert_eq!(result.final_delta, 0.0);
        }
    }
}

#[test]
fn test_config_file_end_to_end() {
    let json = r#"{
        "size": { "x": 4, "y": 3 },
        "walls": [{ "x": 2, "y": 2 }],
        "terminal_cords": [
            { "x": 4, "y": 3, "value": 1 },
            { "x": 4, "y": 2, "value": -1 }
        ],
        "reward": 0.04,
        "discount_rate": 1.0,
        "epsilon": 0.0,
        "stopping": "exact_delta"
    }"#;
    let config = MdpConfig::from_json_str(json).unwrap();
    let grid = config.to_grid_world().unwrap();
    let result = value_iteration(&grid, &config.solver_config().unwrap());

    let expected = value_iteration(
        &classic_grid(),
        &ValueIterationConfig::new().with_stopping(StoppingRule::ExactDelta),
    );
    assert_eq!(result.final_snapshot(), expected.final_snapshot());
    assert_eq!(result.history.len(), expected.history.len());
}

#[test]
fn test_random_grids_keep_walls_and_terminals_fixed() {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    for _ in 0..50 {
        let grid = random_grid(&mut rng);
        let config = ValueIterationConfig::new().with_max_sweeps(2_000);
        let result = value_iteration(&grid, &config);
        assert!(result.sweeps <= 2_000);
        assert!(result.final_delta >= 0.0);

        for snapshot in result.history.iter() {
            for cell in grid.cells() {
                match grid.kind(cell) {
                    CellKind::Wall => assert_eq!(snapshot.get(cell), 0.0),
                    CellKind::Terminal(reward) => assert_eq!(snapshot.get(cell), reward),
                    CellKind::Free => assert!(snapshot.get(cell).is_finite()),
                }
            }
        }
    }
}

#[test]
fn test_random_grids_walls_are_opaque() {
    let mut rng = ChaCha8Rng::seed_from_u64(11);
    for _ in 0..50 {
        let grid = random_grid(&mut rng);
        let mut snapshot = grid.initial_snapshot();
        sweep(&grid, &mut snapshot, SweepMode::InPlace);

        // Poison every wall slot; no free cell's update may notice.
        let mut poisoned = snapshot.clone();
        for cell in grid.cells().filter(|&c| grid.is_wall(c)) {
            poisoned.set(cell, 1.0e6);
        }
        for cell in grid.free_cells() {
            assert_eq!(
                bellman_update(&grid, &snapshot, cell),
                bellman_update(&grid, &poisoned, cell)
            );
        }
    }
}

#[test]
fn test_random_grids_off_grid_contributes_zero() {
    let mut rng = ChaCha8Rng::seed_from_u64(13);
    for _ in 0..50 {
        let grid = random_grid(&mut rng);
        let mut snapshot = ValueSnapshot::zeros(grid.width(), grid.height());
        for cell in grid.cells() {
            snapshot.set(cell, 100.0);
        }
        let (w, h) = (grid.width(), grid.height());
        for y in 0..h {
            assert_eq!(neighbor_value(&grid, &snapshot, Coord::new(0, y), -1, 0), 0.0);
            assert_eq!(neighbor_value(&grid, &snapshot, Coord::new(w - 1, y), 1, 0), 0.0);
        }
        for x in 0..w {
            assert_eq!(neighbor_value(&grid, &snapshot, Coord::new(x, 0), 0, -1), 0.0);
            assert_eq!(neighbor_value(&grid, &snapshot, Coord::new(x, h - 1), 0, 1), 0.0);
        }
    }
}

#[test]
fn test_random_grids_synchronous_sweep_reads_only_old_values() {
    let mut rng = ChaCha8Rng::seed_from_u64(17);
    for _ in 0..50 {
        let grid = random_grid(&mut rng);
        let mut before = grid.initial_snapshot();
        sweep(&grid, &mut before, SweepMode::InPlace);

        let mut after = before.clone();
        let delta = sweep(&grid, &mut after, SweepMode::Synchronous);

        let mut expected_delta = 0.0_f64;
        for cell in grid.free_cells() {
            let expected = bellman_update(&grid, &before, cell);
            assert_eq!(after.get(cell), expected);
            expected_delta = expected_delta.max(expected - before.get(cell));
        }
        assert_eq!(delta, expected_delta);
    }
}
