//! Case-based model reinforcement learning.
//!
//! A [`Model`] stores observed transitions ("cases") in a fixed-capacity
//! arena. Each case carries a per-dimension local resolution (its "delta")
//! that decides when two states are treated as the same and how far a case's
//! value spreads when interpolating. Once enough transitions are ingested,
//! [`Model::solve_q`] runs local, kernel-weighted asynchronous value iteration
//! over the case set, and [`Model::value`] answers the best action and its
//! value at an arbitrary state.
//!
//! ```
//! use cbrl::{ExitKind, Model, ModelConfig};
//!
//! let mut model = Model::new(ModelConfig::new(1, 1, 16, vec![0.5], 1.0, 1.0, 1.0)).unwrap();
//! model.update(&[1.0], 0, &[0.0], -1.0, ExitKind::Goal).unwrap();
//! model.update(&[2.0], 0, &[1.0], -1.0, ExitKind::Internal).unwrap();
//! model.solve_q();
//!
//! let best = model.value(&[2.0], 2.0).unwrap();
//! assert_eq!(best.action, 0);
//! ```
#[macro_use]
extern crate slog;
#[cfg(feature = "serialize")]
#[macro_use]
extern crate serde_derive;

pub mod case;
pub mod config;
pub mod error;
pub mod logging;
pub mod neighbours;
pub mod solver;
pub mod store;

pub use self::case::{Action, Case, CaseId, ExitKind};
pub use self::config::ModelConfig;
pub use self::error::ModelError;
pub use self::neighbours::{is_within_neighbourhood, NeighbourIndex};
pub use self::solver::{ActionValues, Model, SolveReport, Valuation};
pub use self::store::{CaseStore, DeltaSource, Ingest};
