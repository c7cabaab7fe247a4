//! Fixed-capacity arena of transition cases.
//!
//! Every slot is allocated when the store is built. Ingestion fills the next
//! empty slot and bumps the populated count, so a case id is its slot index and
//! never changes. Populated cases are never removed.

use crate::{
    case::{distance, Action, Case, CaseId, ExitKind},
    error::ModelError,
    neighbours::is_within_neighbourhood,
};

/// Where a freshly populated case took its delta from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DeltaSource {
    /// Internal case: displacement between state and successor, floored at the resolution.
    Displacement,
    /// Exit case: copied from the nearest populated case.
    Inherited(CaseId),
    /// Exit case with no other case to inherit from; delta left at the resolution.
    Fallback,
}

/// Outcome of a successful [`CaseStore::ingest`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Ingest {
    Added { id: CaseId, delta: DeltaSource },
    /// The transition matched this existing case and the store was not changed.
    Duplicate(CaseId),
}

impl Ingest {
    pub fn id(&self) -> CaseId {
        match *self {
            Ingest::Added { id, .. } => id,
            Ingest::Duplicate(id) => id,
        }
    }

    pub fn is_added(&self) -> bool {
        match self {
            Ingest::Added { .. } => true,
            Ingest::Duplicate(_) => false,
        }
    }
}

#[derive(Clone, Debug)]
pub struct CaseStore {
    cases: Vec<Case>,
    len: usize,
    num_actions: usize,
    resolution: Vec<f64>,
    duplicate_spread: f64,
}

impl CaseStore {
    pub fn new(
        capacity: usize,
        num_actions: usize,
        resolution: Vec<f64>,
        duplicate_spread: f64,
    ) -> CaseStore
    {
        let cases = (0..capacity).map(|id| Case::empty(id, &resolution)).collect();

        CaseStore {
            cases,
            len: 0,
            num_actions,
            resolution,
            duplicate_spread,
        }
    }

    /// Number of populated cases.
    pub fn len(&self) -> usize { self.len }

    pub fn is_empty(&self) -> bool { self.len == 0 }

    pub fn capacity(&self) -> usize { self.cases.len() }

    pub fn is_full(&self) -> bool { self.len == self.cases.len() }

    pub fn state_dim(&self) -> usize { self.resolution.len() }

    pub fn num_actions(&self) -> usize { self.num_actions }

    pub fn resolution(&self) -> &[f64] { &self.resolution }

    /// The populated cases, in id order.
    pub fn cases(&self) -> &[Case] { &self.cases[..self.len] }

    pub(crate) fn cases_mut(&mut self) -> &mut [Case] { &mut self.cases[..self.len] }

    pub fn get(&self, id: CaseId) -> Option<&Case> { self.cases().get(id) }

    /// First populated case the transition would duplicate, if any.
    pub fn find_duplicate(&self, state: &[f64], action: Action, exit: ExitKind) -> Option<CaseId> {
        self.cases()
            .iter()
            .find(|c| {
                c.action == Some(action)
                    && c.exit == exit
                    && is_within_neighbourhood(state, c, self.duplicate_spread)
            })
            .map(|c| c.id)
    }

    pub fn ingest(
        &mut self,
        state: &[f64],
        action: Action,
        next_state: &[f64],
        reward: f64,
        exit: ExitKind,
    ) -> Result<Ingest, ModelError>
    {
        self.check_transition(state, action, next_state, reward, exit)?;

        if let Some(id) = self.find_duplicate(state, action, exit) {
            return Ok(Ingest::Duplicate(id));
        }
        if self.is_full() {
            return Err(ModelError::CapacityExceeded {
                capacity: self.capacity(),
            });
        }

        let id = self.len;
        self.cases[id].populate(state, action, next_state, reward, exit);
        let delta = self.compute_delta(id);
        self.len += 1;

        Ok(Ingest::Added { id, delta })
    }

    fn check_transition(
        &self,
        state: &[f64],
        action: Action,
        next_state: &[f64],
        reward: f64,
        exit: ExitKind,
    ) -> Result<(), ModelError>
    {
        let expected = self.state_dim();

        for s in &[state, next_state] {
            if s.len() != expected {
                return Err(ModelError::DimensionMismatch {
                    expected,
                    found: s.len(),
                });
            }
        }
        if action >= self.num_actions {
            return Err(ModelError::ActionOutOfRange {
                action,
                num_actions: self.num_actions,
            });
        }
        if exit == ExitKind::Unspecified {
            return Err(ModelError::UnspecifiedExit);
        }
        if !state.iter().all(|v| v.is_finite()) {
            return Err(ModelError::NonFiniteValue("state"));
        }
        if !next_state.iter().all(|v| v.is_finite()) {
            return Err(ModelError::NonFiniteValue("next state"));
        }
        if !reward.is_finite() {
            return Err(ModelError::NonFiniteValue("reward"));
        }

        Ok(())
    }

    /// Revises the local coarsity of case `id`, which must already hold its transition.
    ///
    /// Only cases before `id` are considered as inheritance sources, so this is
    /// meant to run once, right after population.
    fn compute_delta(&mut self, id: CaseId) -> DeltaSource {
        if !self.cases[id].exit.is_exit() {
            let case = &mut self.cases[id];

            for (d, floor) in self.resolution.iter().enumerate() {
                let displacement = (case.state[d] - case.next_state[d]).abs();
                case.delta[d] = displacement.max(*floor);
            }

            return DeltaSource::Displacement;
        }

        match self.nearest(&self.cases[id].state, id) {
            Some(n) => {
                let inherited = self.cases[n].delta.clone();
                self.cases[id].delta = inherited;

                DeltaSource::Inherited(n)
            },
            None => {
                let fallback = self.resolution.clone();
                self.cases[id].delta = fallback;

                DeltaSource::Fallback
            },
        }
    }

    /// Closest of the first `upto` cases to `point`; the earliest wins ties.
    fn nearest(&self, point: &[f64], upto: usize) -> Option<CaseId> {
        let mut best: Option<(CaseId, f64)> = None;

        for case in &self.cases[..upto] {
            let dist = distance(point, &case.state);

            match best {
                Some((_, d)) if dist >= d => {},
                _ => best = Some((case.id, dist)),
            }
        }

        best.map(|(id, _)| id)
    }
}
