//! Store, neighbourhood and solver properties observed through the public API.

use approx::assert_relative_eq;
use cbrl::{is_within_neighbourhood, ExitKind, Ingest, Model, ModelConfig, ModelError};

fn model(capacity: usize) -> Model {
    Model::new(ModelConfig::new(2, 3, capacity, vec![0.9, 0.9], 1.0, 1.0, 1.0)).unwrap()
}

#[test]
fn repeated_transition_is_idempotent() {
    let mut m = model(10);

    let first = m.update(&[1.0, 2.0], 1, &[1.3, 2.0], -1.0, ExitKind::Internal).unwrap();
    let before = m.cases().to_vec();
    let second = m.update(&[1.0, 2.0], 1, &[1.3, 2.0], -1.0, ExitKind::Internal).unwrap();

    assert!(first.is_added());
    assert_eq!(second, Ingest::Duplicate(first.id()));
    assert_eq!(m.len(), 1);
    assert_eq!(m.cases(), &before[..]);
}

#[test]
fn internal_deltas_never_drop_below_resolution() {
    let mut m = model(200);

    for i in 0..10 {
        for j in 0..10 {
            let s = [i as f64 * 1.7 - 8.0, j as f64 * 1.3 - 6.0];
            let ns = [s[0] + 0.1 * j as f64, s[1] - 0.05 * i as f64];
            m.update(&s, (i + j) % 3, &ns, -1.0, ExitKind::Internal).unwrap();
        }
    }

    assert!(m.len() > 10);
    for case in m.cases().iter().filter(|c| !c.exit().is_exit()) {
        for (delta, floor) in case.delta().iter().zip(m.config().resolution.iter()) {
            assert!(delta >= floor, "case {} has delta {:?}", case.id(), case.delta());
        }
    }
}

#[test]
fn capacity_boundary_is_observable() {
    let capacity = 5;
    let mut m = model(capacity);

    for i in 0..capacity {
        let s = [i as f64 * 10.0, 0.0];
        m.update(&s, 0, &s, -1.0, ExitKind::Internal).unwrap();
    }

    let overflow = m.update(&[100.0, 0.0], 0, &[100.0, 0.0], -1.0, ExitKind::Internal);

    assert_eq!(overflow, Err(ModelError::CapacityExceeded { capacity }));
    assert_eq!(m.len(), capacity);
    assert!(m.store().is_full());
}

#[test]
fn neighbourhood_is_not_symmetric() {
    let mut m = model(4);

    m.update(&[0.0, 0.0], 0, &[5.0, 0.0], -1.0, ExitKind::Internal).unwrap();
    m.update(&[4.0, 0.0], 1, &[4.0, 0.0], -1.0, ExitKind::Internal).unwrap();

    let a = &m.cases()[0];
    let b = &m.cases()[1];

    assert!(is_within_neighbourhood(b.state(), a, 1.0));
    assert!(!is_within_neighbourhood(a.state(), b, 1.0));
}

#[test]
fn chain_draining_into_goal_matches_back_substitution() {
    let config = ModelConfig {
        solve_influence: 0.5,
        ..ModelConfig::new(1, 1, 8, vec![0.4], 1.0, 0.9, 1.0)
    };
    let mut m = Model::new(config).unwrap();

    // 0 -> 3 -> 6 -> goal; spacing keeps every successor neighbourhood to one case
    m.update(&[6.0], 0, &[9.0], 0.0, ExitKind::Goal).unwrap();
    m.update(&[3.0], 0, &[6.0], -1.0, ExitKind::Internal).unwrap();
    m.update(&[0.0], 0, &[3.0], -2.0, ExitKind::Internal).unwrap();

    let report = m.solve_q();

    assert!(report.converged);
    let q_goal = 0.0;
    let q_mid = -1.0 + 0.9 * q_goal;
    let q_start = -2.0 + 0.9 * q_mid;
    assert_relative_eq!(m.cases()[0].q(), q_goal);
    assert_relative_eq!(m.cases()[1].q(), q_mid);
    assert_relative_eq!(m.cases()[2].q(), q_start);
    assert_relative_eq!(m.value(&[0.0], 0.5).unwrap().value, q_start);
}

#[test]
fn discounted_cycle_settles_at_fixed_point() {
    let config = ModelConfig {
        solve_influence: 0.5,
        ..ModelConfig::new(1, 1, 8, vec![0.4], 1.0, 0.5, 1.0)
    };
    let mut m = Model::new(config).unwrap();

    // 0 <-> 3 loop forever; the goal case at 10 is unreachable from it
    m.update(&[0.0], 0, &[3.0], -1.0, ExitKind::Internal).unwrap();
    m.update(&[3.0], 0, &[0.0], -1.0, ExitKind::Internal).unwrap();
    m.update(&[10.0], 0, &[11.0], 0.0, ExitKind::Goal).unwrap();

    let report = m.solve_q();

    assert!(report.converged);
    assert!(report.sweeps > 1);
    // q = -1 + 0.5 q
    assert_relative_eq!(m.cases()[0].q(), -2.0, epsilon = 1e-6);
    assert_relative_eq!(m.cases()[1].q(), -2.0, epsilon = 1e-6);
    assert_relative_eq!(m.cases()[2].q(), 0.0);
}

#[test]
fn cycle_with_single_goal_exit_prefers_the_exit() {
    let config = ModelConfig {
        solve_influence: 0.5,
        ..ModelConfig::new(1, 2, 8, vec![0.4], 1.0, 0.9, 1.0)
    };
    let mut m = Model::new(config).unwrap();

    // both actions lead 0 -> 3; at 3 action 0 loops back to 0 and action 1 reaches the goal
    m.update(&[0.0], 0, &[3.0], -1.0, ExitKind::Internal).unwrap();
    m.update(&[0.0], 1, &[3.0], -2.0, ExitKind::Internal).unwrap();
    m.update(&[3.0], 0, &[0.0], -1.0, ExitKind::Internal).unwrap();
    m.update(&[3.0], 1, &[6.0], 0.0, ExitKind::Goal).unwrap();

    let report = m.solve_q();

    assert!(report.converged);
    assert_eq!(m.index().to_neighbours(0), &[2, 3]);
    assert_eq!(m.index().to_neighbours(2), &[0, 1]);
    let q_exit: f64 = 0.0;
    let q_push = -1.0 + 0.9 * q_exit;
    let q_shove = -2.0 + 0.9 * q_exit;
    let q_back = -1.0 + 0.9 * q_push.max(q_shove);
    assert!(q_back < q_exit);
    assert_relative_eq!(m.cases()[0].q(), q_push);
    assert_relative_eq!(m.cases()[1].q(), q_shove);
    assert_relative_eq!(m.cases()[2].q(), q_back);
    assert_relative_eq!(m.cases()[3].q(), q_exit);

    let at_start = m.value(&[0.0], 0.5).unwrap();
    assert_eq!(at_start.action, 0);
    assert_relative_eq!(at_start.value, q_push);
    let at_fork = m.value(&[3.0], 0.5).unwrap();
    assert_eq!(at_fork.action, 1);
    assert_relative_eq!(at_fork.value, q_exit);
}

#[test]
fn out_of_bounds_scale_is_configurable() {
    let config = ModelConfig {
        bad_terminal_value: -7.5,
        ..ModelConfig::new(1, 2, 8, vec![0.5], 1.0, 1.0, 1.0)
    };
    let mut m = Model::new(config).unwrap();

    m.update(&[0.0], 1, &[3.0], 0.0, ExitKind::OutOfBounds).unwrap();
    m.solve_q();

    assert_eq!(m.neighbour_value(0), Some(-7.5));
    assert_relative_eq!(m.cases()[0].q(), -7.5);
}
