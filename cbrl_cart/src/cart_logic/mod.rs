pub mod cart;
pub mod cart_engine;
use self::cart_engine::CartCon;
pub use self::cart_engine::CartEngine;
use cbrl::{Action, ExitKind, Model, ModelConfig, ModelError};
use cbrl_codec::*;
use slog::Logger;

pub const DT: f64 = 1.0 / 6.0;
pub const ACCEL: f64 = 9.6;
pub const BOUND: f64 = 20.0;
pub const GOAL_RADIUS: f64 = 2.0;

pub const REWARD_STEP: f64 = -1.0;
pub const REWARD_EXIT: f64 = 0.0;

pub const NUM_ACTIONS: usize = 3;

/// Model parameters plus everything the cart host needs to build and drive it.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct CartConfig {
    pub model: ModelConfig,
    pub goal: [f64; 2],
    pub grid_min: f64,
    pub grid_max: f64,
    pub grid_step: f64,
    pub query_influence: f64,
    pub max_steps: u64,
    pub starts: Vec<[f64; 2]>,
}
impl Default for CartConfig {
    fn default() -> CartConfig {
        CartConfig {
            model: ModelConfig::default(),
            goal: [0.0, 0.0],
            grid_min: -20.5,
            grid_max: 20.5,
            grid_step: 0.1,
            query_influence: 2.0,
            max_steps: 1000,
            starts: vec![[15.0, 0.0], [-10.0, 5.0], [18.0, -4.0]],
        }
    }
}

impl CartConfig {
    /// Checks the model parameters and the cart's grid and query settings.
    pub fn validate(&self) -> Result<(), ModelError> {
        let invalid = |msg: String| Err(ModelError::InvalidConfig(msg));

        self.model.validate()?;
        if self.model.state_dim != 2 || self.model.num_actions != NUM_ACTIONS {
            return invalid(format!(
                "cart model needs state_dim 2 and {} actions, got {} and {}",
                NUM_ACTIONS, self.model.state_dim, self.model.num_actions
            ));
        }
        if !(self.grid_step.is_finite() && self.grid_step > 0.0) {
            return invalid(format!("grid_step {} must be finite and positive", self.grid_step));
        }
        if !(self.grid_min.is_finite() && self.grid_max.is_finite() && self.grid_min < self.grid_max) {
            return invalid(format!("grid [{}, {}] is empty or not finite", self.grid_min, self.grid_max));
        }
        if !(self.query_influence.is_finite() && self.query_influence > 0.0) {
            return invalid(format!("query_influence {} must be finite and positive", self.query_influence));
        }
        if self.goal.iter().any(|g| !g.is_finite()) {
            return invalid("goal must be finite".to_owned());
        }
        Ok(())
    }
}

/// Successor of `s` after one time step under `action`.
///
/// Action 0 pushes left, 1 coasts, 2 pushes right.
pub fn step(s: [f64; 2], action: Action) -> [f64; 2] {
    let acc = ACCEL * (action as f64 - 1.0);

    [s[0] + s[1] * DT + 0.5 * acc * DT * DT, s[1] + acc * DT]
}

pub fn goal_reached(goal: [f64; 2], s: [f64; 2], radius: f64) -> bool {
    (goal[0] - s[0]).abs() < radius && (goal[1] - s[1]).abs() < radius
}

pub fn out_of_bounds(s: [f64; 2]) -> bool { s[0].abs() > BOUND || s[1].abs() > BOUND }

/// Exit kind and reward of arriving at `s`. Leaving the track overrides the goal.
pub fn classify(goal: [f64; 2], s: [f64; 2]) -> (ExitKind, f64) {
    if out_of_bounds(s) {
        (ExitKind::OutOfBounds, REWARD_EXIT)
    } else if goal_reached(goal, s, GOAL_RADIUS) {
        (ExitKind::Goal, REWARD_EXIT)
    } else {
        (ExitKind::Internal, REWARD_STEP)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct BuildReport {
    pub added: usize,
    pub duplicates: usize,
    /// Set when the store filled up before the grid was exhausted.
    pub truncated: bool,
}

/// Seeds `model` with physics-generated transitions over a state grid.
pub fn build_model(model: &mut Model, config: &CartConfig, logger: &Logger) -> Result<BuildReport, ModelError> {
    config.validate()?;
    let mut report = BuildReport::default();
    let cells = ((config.grid_max - config.grid_min) / config.grid_step).ceil() as usize;

    'grid: for i in 0..cells {
        let x = config.grid_min + i as f64 * config.grid_step;
        for j in 0..cells {
            let s = [x, config.grid_min + j as f64 * config.grid_step];
            if out_of_bounds(s) {
                continue;
            }
            for a in 0..NUM_ACTIONS {
                let ns = step(s, a);
                let (exit, reward) = classify(config.goal, ns);
                match model.update(&s, a, &ns, reward, exit) {
                    Ok(ingest) if ingest.is_added() => report.added += 1,
                    Ok(_) => report.duplicates += 1,
                    Err(ModelError::CapacityExceeded { capacity }) => {
                        warn!(logger, "stopped building model early"; "capacity" => capacity, "x" => x);
                        report.truncated = true;
                        break 'grid;
                    },
                    Err(e) => return Err(e),
                }
            }
        }
    }

    info!(logger, "built cart model";
        "cases" => model.len(), "added" => report.added, "duplicates" => report.duplicates);
    Ok(report)
}

/// Action for the controller at `s`, or `None` once the cart has stopped.
pub fn choose_action(model: &Model, config: &CartConfig, s: [f64; 2]) -> Result<Option<Action>, ModelError> {
    if goal_reached(config.goal, s, GOAL_RADIUS) || out_of_bounds(s) {
        return Ok(None);
    }
    let best = model.value(&s, config.query_influence)?;
    Ok(Some(best.action))
}

/// Outcome for a state `choose_action` refused to act in.
pub fn terminal_outcome(config: &CartConfig, s: [f64; 2]) -> Outcome {
    if out_of_bounds(s) {
        Outcome::OutOfBounds
    } else {
        debug_assert!(goal_reached(config.goal, s, GOAL_RADIUS));
        Outcome::Goal
    }
}

pub fn update_cartstate<T: CartCon>(
    a: Action,
    cartstate: &mut CartState,
    goal: [f64; 2],
    con: &T,
    log: &mut Vec<ClientReceivedMsg>,
) -> bool
{
    if let CartState::Running(x, v, step_count) = *cartstate {
        let ns = step([x, v], a);
        let count = step_count + 1;
        *cartstate = match classify(goal, ns) {
            (ExitKind::OutOfBounds, _) => CartState::Finished(Outcome::OutOfBounds, count),
            (ExitKind::Goal, _) => CartState::Finished(Outcome::Goal, count),
            _ => CartState::Running(ns[0], ns[1], count),
        };
    }
    let mut h = ClientReceivedMsg::default();
    h.set_cartstate(cartstate.clone());
    h.set_type_name(CARTSTATE_FRAME.to_owned());
    con.tx_send(h, log)
}
