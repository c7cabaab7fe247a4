//! Neighbourhood geometry and the per-case neighbour graph.
//!
//! A point is inside a case's neighbourhood when it lies within
//! `factor * delta[d]` of the case's state on every dimension `d`. The radius
//! belongs to the candidate case, so the relation is not symmetric.

use crate::{
    case::{Case, CaseId},
    store::CaseStore,
};

/// `point` must have the case's dimension; callers check it at the model boundary.
pub fn is_within_neighbourhood(point: &[f64], case: &Case, factor: f64) -> bool {
    debug_assert_eq!(point.len(), case.state.len(), "query point dimension");
    point
        .iter()
        .zip(case.state.iter().zip(case.delta.iter()))
        .all(|(p, (s, delta))| (p - s).abs() <= factor * delta)
}

/// Populated cases whose neighbourhood, scaled by `factor`, contains `point`.
pub fn query<'a>(
    store: &'a CaseStore,
    point: &'a [f64],
    factor: f64,
) -> impl Iterator<Item = &'a Case> + 'a
{
    store
        .cases()
        .iter()
        .filter(move |c| is_within_neighbourhood(point, c, factor))
}

/// Index-based adjacency between cases.
///
/// `to(i)` holds the cases around the successor state of case `i`, `from(i)`
/// the cases around its own state. Lists are rebuilt wholesale and go stale as
/// soon as another case is ingested.
#[derive(Clone, Debug, Default)]
pub struct NeighbourIndex {
    to: Vec<Vec<CaseId>>,
    from: Vec<Vec<CaseId>>,
    influence: f64,
}

impl NeighbourIndex {
    pub fn new() -> NeighbourIndex { NeighbourIndex::default() }

    /// Recomputes both lists for every populated case. Quadratic in the case count.
    pub fn rebuild_all(&mut self, store: &CaseStore, influence: f64) {
        let cases = store.cases();

        self.to.resize_with(cases.len(), Vec::new);
        self.from.resize_with(cases.len(), Vec::new);
        self.influence = influence;

        for (i, ci) in cases.iter().enumerate() {
            let to = &mut self.to[i];
            let from = &mut self.from[i];
            to.clear();
            from.clear();

            for cn in cases {
                if is_within_neighbourhood(&ci.next_state, cn, influence) {
                    to.push(cn.id);
                }
                if is_within_neighbourhood(&ci.state, cn, influence) {
                    from.push(cn.id);
                }
            }
        }
    }

    pub fn to_neighbours(&self, id: CaseId) -> &[CaseId] {
        self.to.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn from_neighbours(&self, id: CaseId) -> &[CaseId] {
        self.from.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of cases covered by the last rebuild.
    pub fn len(&self) -> usize { self.to.len() }

    pub fn is_empty(&self) -> bool { self.to.is_empty() }

    /// Whether the last rebuild covered exactly the store's populated cases.
    pub fn is_current(&self, store: &CaseStore) -> bool { self.to.len() == store.len() }

    pub fn influence(&self) -> f64 { self.influence }
}
