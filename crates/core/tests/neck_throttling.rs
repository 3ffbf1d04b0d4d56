//! Neck behavior: the only path between chambers is the diagonal step
//! between (-1, -1) and (0, 0), gated by the neck probability.

use hourglass_core::{ChamberGrid, HourglassConfig, HourglassSimulation};
use rand::rngs::StdRng;
use rand::SeedableRng;

#[ctor::ctor]
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn filled_simulation(size: usize, neck_probability: f64, seed: u64) -> HourglassSimulation {
    let config = HourglassConfig {
        size,
        neck_probability,
        ..Default::default()
    };
    HourglassSimulation::with_config(config, StdRng::seed_from_u64(seed)).unwrap()
}

#[test]
fn test_sealed_neck_never_lets_grains_through() {
    let mut sim = filled_simulation(5, 1.0, 21);
    sim.set_gravity(1.0, 1.0);

    for _ in 0..300 {
        sim.step();
        let (_, top) = sim.grid().chamber_counts();
        assert_eq!(top, 0);
    }

    let stats = sim.stats();
    assert!(stats.changed_steps > 0, "grains should still settle inside the bottom chamber");
    assert!(stats.neck_rejections > 0);
    assert_eq!(stats.neck_crossings, 0);
    assert!(sim.top().iter().all(|&b| !b));
}

#[test]
fn test_open_neck_crosses_when_it_is_the_best_move() {
    let mut grid = ChamberGrid::empty(4).unwrap();
    grid.set(-1, -1, true);
    let config = HourglassConfig {
        size: 4,
        neck_probability: 0.0,
        ..Default::default()
    };
    let mut sim = HourglassSimulation::from_grid(grid, &config, StdRng::seed_from_u64(0)).unwrap();
    sim.set_gravity(1.0, 1.0);

    assert!(sim.step());
    assert_eq!(sim.grid().get(0, 0), Some(true));
    assert_eq!(sim.grid().get(-1, -1), Some(false));
    assert_eq!(sim.stats().neck_crossings, 1);
    assert_eq!(sim.grid().chamber_counts(), (0, 1));
}

#[test]
fn test_open_neck_drains_bottom_chamber() {
    let mut sim = filled_simulation(4, 0.0, 4);
    let grains = sim.grid().occupied_count();
    sim.set_gravity(1.0, 1.0);

    for _ in 0..500 {
        sim.step();
    }

    assert_eq!(sim.grid().chamber_counts(), (0, grains));
    assert_eq!(sim.stats().neck_crossings, grains as u64);
    assert_eq!(sim.stats().neck_rejections, 0);
}

#[test]
fn test_partial_neck_throttles_flow() {
    let run = |p: f64| {
        let mut sim = filled_simulation(6, p, 77);
        sim.set_gravity(1.0, 1.0);
        for _ in 0..60 {
            sim.step();
        }
        sim.grid().chamber_counts().1
    };

    let open = run(0.0);
    let throttled = run(0.9);
    assert!(open > 0);
    assert!(
        throttled < open,
        "throttled neck passed {throttled} grains, open neck passed {open}"
    );
}

#[test]
fn test_grains_cannot_cross_off_diagonal() {
    // Gravity pointing straight along an axis never selects the diagonal neck move.
    let mut sim = filled_simulation(4, 0.0, 9);
    for (gx, gy) in [(0.0, 1.0), (1.0, 0.0)] {
        sim.set_gravity(gx, gy);
        for _ in 0..100 {
            sim.step();
        }
        assert_eq!(sim.grid().chamber_counts().1, 0);
    }
    assert_eq!(sim.stats().neck_crossings, 0);
}
