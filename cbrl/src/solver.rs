//! The case-based model: ingestion, value iteration and point queries.
use crate::{
    case::{distance, kernel, Action, Case, CaseId, ExitKind},
    config::ModelConfig,
    error::ModelError,
    logging,
    neighbours::{self, NeighbourIndex},
    store::{CaseStore, DeltaSource, Ingest},
};
use slog::Logger;

/// Best action at a queried state and its estimated value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Valuation {
    pub value: f64,
    pub action: Action,
}

/// Kernel-weighted value estimate for every action.
///
/// Actions with no supporting case estimate to zero.
#[derive(Clone, Debug, PartialEq)]
pub struct ActionValues(Vec<f64>);

impl ActionValues {
    pub fn values(&self) -> &[f64] { &self.0 }

    pub fn get(&self, action: Action) -> Option<f64> { self.0.get(action).cloned() }

    /// Greatest estimate; the lowest action index wins ties.
    pub fn best(&self) -> Valuation {
        let mut best = Valuation {
            value: std::f64::NEG_INFINITY,
            action: 0,
        };

        for (action, &value) in self.0.iter().enumerate() {
            if value > best.value {
                best = Valuation { value, action };
            }
        }

        best
    }
}

struct Accumulator {
    sums: Vec<f64>,
    weights: Vec<f64>,
}

impl Accumulator {
    fn new(num_actions: usize) -> Accumulator {
        Accumulator {
            sums: vec![0.0; num_actions],
            weights: vec![0.0; num_actions],
        }
    }

    fn add(&mut self, case: &Case, weight: f64) {
        if let Some(a) = case.action {
            self.sums[a] += weight * case.q;
            self.weights[a] += weight;
        }
    }

    fn finish(self) -> ActionValues {
        let values = self
            .sums
            .into_iter()
            .zip(self.weights.into_iter())
            .map(|(sum, weight)| if weight > 0.0 { sum / weight } else { 0.0 })
            .collect();

        ActionValues(values)
    }
}

/// Summary of one [`Model::solve_q`] run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SolveReport {
    pub cases: usize,
    pub sweeps: usize,
    /// Summed absolute change of the last sweep.
    pub residual: f64,
    /// False when the sweep cap was hit before the residual reached tolerance.
    pub converged: bool,
}

pub struct Model {
    config: ModelConfig,
    store: CaseStore,
    index: NeighbourIndex,
    logger: Logger,
}

impl Model {
    pub fn new(config: ModelConfig) -> Result<Model, ModelError> {
        config.validate()?;

        let store = CaseStore::new(
            config.capacity,
            config.num_actions,
            config.resolution.clone(),
            config.duplicate_spread,
        );

        Ok(Model {
            config,
            store,
            index: NeighbourIndex::new(),
            logger: logging::discard(),
        })
    }

    pub fn with_logger(mut self, logger: Logger) -> Model {
        self.logger = logger;
        self
    }

    pub fn config(&self) -> &ModelConfig { &self.config }

    pub fn store(&self) -> &CaseStore { &self.store }

    pub fn index(&self) -> &NeighbourIndex { &self.index }

    pub fn cases(&self) -> &[Case] { self.store.cases() }

    pub fn len(&self) -> usize { self.store.len() }

    pub fn is_empty(&self) -> bool { self.store.is_empty() }

    /// Ingests one observed transition.
    pub fn update(
        &mut self,
        state: &[f64],
        action: Action,
        next_state: &[f64],
        reward: f64,
        exit: ExitKind,
    ) -> Result<Ingest, ModelError>
    {
        let result = self.store.ingest(state, action, next_state, reward, exit);

        match result {
            Ok(Ingest::Added {
                id,
                delta: DeltaSource::Fallback,
            }) => {
                warn!(self.logger, "no case to inherit exit delta from, using resolution";
                    "case" => id, "exit" => ?exit);
            },
            Err(ModelError::CapacityExceeded { capacity }) => {
                warn!(self.logger, "case store full, transition dropped"; "capacity" => capacity);
            },
            _ => {},
        }

        result
    }

    /// Runs asynchronous value iteration over all populated cases.
    ///
    /// The neighbour graph is rebuilt first. Sweeps update cases in id order,
    /// each seeing the values already updated earlier in the same sweep, and
    /// stop once a sweep's summed absolute change is within
    /// `convergence_tolerance` or `max_sweeps` is reached.
    pub fn solve_q(&mut self) -> SolveReport {
        let influence = self.config.solve_influence;
        let alpha = self.config.learning_rate;
        let gamma = self.config.discount;

        self.index.rebuild_all(&self.store, influence);
        debug!(self.logger, "rebuilt neighbour index"; "cases" => self.store.len(), "influence" => influence);

        let mut report = SolveReport {
            cases: self.store.len(),
            sweeps: 0,
            residual: 0.0,
            converged: false,
        };

        while report.sweeps < self.config.max_sweeps {
            let mut total = 0.0;

            for id in 0..self.store.len() {
                let target = self.backup_target(&self.store.cases()[id]);
                let case = &mut self.store.cases_mut()[id];
                let change = case.reward + gamma * target - case.q;

                case.q += alpha * change;
                total += change.abs();
            }

            report.sweeps += 1;
            report.residual = total;

            if !(total > self.config.convergence_tolerance) {
                report.converged = total <= self.config.convergence_tolerance;
                break;
            }
        }

        if report.converged {
            info!(self.logger, "value iteration converged";
                "cases" => report.cases, "sweeps" => report.sweeps, "residual" => report.residual);
        } else {
            warn!(self.logger, "value iteration stopped before converging";
                "cases" => report.cases, "sweeps" => report.sweeps, "residual" => report.residual);
        }

        report
    }

    /// Bellman backup target of case `id` from its successor neighbours.
    ///
    /// Uses the neighbour lists of the last solve.
    pub fn neighbour_value(&self, id: CaseId) -> Option<f64> {
        self.store.get(id).map(|case| self.backup_target(case))
    }

    fn backup_target(&self, case: &Case) -> f64 {
        match case.exit {
            ExitKind::OutOfBounds => return self.config.bad_terminal_value,
            ExitKind::Goal => return 0.0,
            ExitKind::Internal | ExitKind::Unspecified => {},
        }

        let cases = self.store.cases();
        let mut acc = Accumulator::new(self.config.num_actions);

        for &n in self.index.to_neighbours(case.id) {
            let neighbour = &cases[n];
            let weight = kernel(self.config.sharpness, distance(&neighbour.state, &case.next_state));

            acc.add(neighbour, weight);
        }

        acc.finish().best().value
    }

    /// Per-action value estimates at `state` from every case whose
    /// neighbourhood, scaled by `influence`, contains it.
    pub fn action_values(&self, state: &[f64], influence: f64) -> Result<ActionValues, ModelError> {
        let expected = self.store.state_dim();
        if state.len() != expected {
            return Err(ModelError::DimensionMismatch {
                expected,
                found: state.len(),
            });
        }

        let mut acc = Accumulator::new(self.config.num_actions);
        let mut found = 0;

        for neighbour in neighbours::query(&self.store, state, influence) {
            let weight = kernel(self.config.sharpness, distance(&neighbour.state, state));

            acc.add(neighbour, weight);
            found += 1;
        }

        if found == 0 {
            return Err(ModelError::NoNeighboursFound);
        }

        Ok(acc.finish())
    }

    /// Best action at `state` and its value.
    ///
    /// A state outside every case's influence is unknown and reported as
    /// [`ModelError::NoNeighboursFound`] rather than valued at zero.
    pub fn value(&self, state: &[f64], influence: f64) -> Result<Valuation, ModelError> {
        self.action_values(state, influence).map(|values| values.best())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn chain_model(num_actions: usize) -> Model {
        let config = ModelConfig::new(1, num_actions, 16, vec![0.4], 1.0, 1.0, 1.0);

        Model::new(config).unwrap()
    }

    #[test]
    fn absorbing_cases_ignore_neighbours() {
        let mut model = chain_model(1);
        model.config.bad_terminal_value = -250.0;

        model.update(&[0.0], 0, &[0.0], -1.0, ExitKind::Internal).unwrap();
        model.update(&[0.1], 0, &[0.0], 0.0, ExitKind::Goal).unwrap();
        model.update(&[0.2], 0, &[5.0], 0.0, ExitKind::OutOfBounds).unwrap();
        model.store.cases_mut()[0].q = -42.0;
        model.index.rebuild_all(&model.store, 2.0);

        assert_eq!(model.neighbour_value(1), Some(0.0));
        assert_eq!(model.neighbour_value(2), Some(-250.0));
        assert_eq!(model.neighbour_value(9), None);
    }

    #[test]
    fn neighbour_value_is_kernel_weighted_per_action() {
        let mut model = chain_model(2);

        // action 0 cases around the successor state 1.0
        model.update(&[1.0], 0, &[1.0], -1.0, ExitKind::Internal).unwrap();
        model.update(&[1.5], 0, &[1.5], -1.0, ExitKind::Internal).unwrap();
        // action 1 case far from every successor
        model.update(&[9.0], 1, &[9.0], -1.0, ExitKind::Internal).unwrap();
        // the case being backed up; delta 2.0 makes it its own neighbour
        model.update(&[3.0], 1, &[1.0], -1.0, ExitKind::Internal).unwrap();

        model.store.cases_mut()[0].q = -2.0;
        model.store.cases_mut()[1].q = -4.0;
        model.store.cases_mut()[2].q = -100.0;
        model.store.cases_mut()[3].q = -10.0;
        model.index.rebuild_all(&model.store, 2.0);

        assert_eq!(model.index.to_neighbours(3), &[0, 1, 3]);

        let w1 = (-0.25f64).exp();
        let action0 = (-2.0 + w1 * -4.0) / (1.0 + w1);
        assert_relative_eq!(model.neighbour_value(3).unwrap(), action0);

        let values = model.action_values(&[1.0], 1.0).unwrap();
        assert_relative_eq!(values.values()[0], -2.0);
        assert_relative_eq!(values.values()[1], -10.0);
        assert_eq!(values.best().action, 0);
    }

    #[test]
    fn chain_converges_to_bellman_values() {
        let mut model = chain_model(1);

        // 2 -> 1 -> 0 -> goal, one unit per step, resolution 0.4 keeps them apart
        model.update(&[0.0], 0, &[-1.0], 0.0, ExitKind::Goal).unwrap();
        model.update(&[1.0], 0, &[0.0], -1.0, ExitKind::Internal).unwrap();
        model.update(&[2.0], 0, &[1.0], -1.0, ExitKind::Internal).unwrap();
        model.config.solve_influence = 0.5;

        let report = model.solve_q();

        assert!(report.converged);
        assert_eq!(report.cases, 3);
        assert_relative_eq!(model.cases()[0].q(), 0.0);
        assert_relative_eq!(model.cases()[1].q(), -1.0);
        assert_relative_eq!(model.cases()[2].q(), -2.0);
    }

    #[test]
    fn self_loop_hits_sweep_cap() {
        let config = ModelConfig {
            max_sweeps: 25,
            convergence_tolerance: 0.0,
            ..ModelConfig::new(1, 1, 4, vec![0.5], 1.0, 1.0, 1.0)
        };
        let mut model = Model::new(config).unwrap();

        // a state that only ever leads back to itself never settles with gamma = 1
        model.update(&[0.0], 0, &[0.0], -1.0, ExitKind::Internal).unwrap();

        let report = model.solve_q();

        assert!(!report.converged);
        assert_eq!(report.sweeps, 25);
        assert_relative_eq!(model.cases()[0].q(), -25.0);
    }

    #[test]
    fn discounting_bounds_a_self_loop() {
        let config = ModelConfig {
            convergence_tolerance: 1e-12,
            ..ModelConfig::new(1, 1, 4, vec![0.5], 0.5, 0.5, 1.0)
        };
        let mut model = Model::new(config).unwrap();

        model.update(&[0.0], 0, &[0.0], -1.0, ExitKind::Internal).unwrap();

        let report = model.solve_q();

        assert!(report.converged);
        assert_relative_eq!(model.cases()[0].q(), -2.0, epsilon = 1e-9);
    }

    #[test]
    fn value_without_neighbours_is_unknown() {
        let mut model = chain_model(2);
        model.update(&[0.0], 0, &[0.0], -1.0, ExitKind::Internal).unwrap();

        assert_eq!(model.value(&[10.0], 2.0), Err(ModelError::NoNeighboursFound));
        assert_eq!(
            model.value(&[0.0, 0.0], 2.0),
            Err(ModelError::DimensionMismatch {
                expected: 1,
                found: 2
            })
        );
    }

    #[test]
    fn value_ties_go_to_lowest_action() {
        let mut model = chain_model(3);
        model.update(&[0.0], 1, &[0.0], 0.0, ExitKind::Goal).unwrap();
        model.update(&[0.0], 2, &[0.0], 0.0, ExitKind::Goal).unwrap();
        model.solve_q();

        // action 0 has no support and ties with the goal cases at zero
        assert_eq!(model.value(&[0.0], 2.0), Ok(Valuation {
            value: 0.0,
            action: 0
        }));
    }

    #[test]
    fn value_prefers_better_action() {
        let mut model = chain_model(2);
        model.update(&[0.0], 0, &[0.0], -1.0, ExitKind::Goal).unwrap();
        model.update(&[0.0], 1, &[0.0], -3.0, ExitKind::Goal).unwrap();
        model.solve_q();

        let best = model.value(&[0.1], 1.0).unwrap();

        assert_eq!(best.action, 0);
        assert_relative_eq!(best.value, -1.0);
    }
}
