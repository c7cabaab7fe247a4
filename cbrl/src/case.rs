/// Index of a discrete action, `0..num_actions`.
pub type Action = usize;

/// Stable identity of a case: its slot in the store's arena.
pub type CaseId = usize;

/// How a transition ends.
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExitKind {
    /// Only carried by empty arena slots.
    Unspecified,
    /// The successor state is an ordinary, non-terminal state.
    Internal,
    /// Absorbing success.
    Goal,
    /// Absorbing failure.
    OutOfBounds,
}

impl ExitKind {
    pub fn is_exit(self) -> bool {
        match self {
            ExitKind::Goal | ExitKind::OutOfBounds => true,
            ExitKind::Unspecified | ExitKind::Internal => false,
        }
    }
}

impl Default for ExitKind {
    fn default() -> ExitKind { ExitKind::Unspecified }
}

/// One stored transition sample.
///
/// Slots are created empty when the store is built and populated exactly once
/// by ingestion. Only `q` changes afterwards, and only through the solver.
#[derive(Clone, Debug, PartialEq)]
pub struct Case {
    pub(crate) id: CaseId,
    pub(crate) state: Vec<f64>,
    pub(crate) action: Option<Action>,
    pub(crate) next_state: Vec<f64>,
    pub(crate) reward: f64,
    pub(crate) exit: ExitKind,
    pub(crate) delta: Vec<f64>,
    pub(crate) q: f64,
}

impl Case {
    pub(crate) fn empty(id: CaseId, resolution: &[f64]) -> Case {
        let dim = resolution.len();

        Case {
            id,
            state: vec![0.0; dim],
            action: None,
            next_state: vec![0.0; dim],
            reward: 0.0,
            exit: ExitKind::Unspecified,
            delta: resolution.to_vec(),
            q: 0.0,
        }
    }

    pub(crate) fn populate(
        &mut self,
        state: &[f64],
        action: Action,
        next_state: &[f64],
        reward: f64,
        exit: ExitKind,
    )
    {
        self.state.copy_from_slice(state);
        self.action = Some(action);
        self.next_state.copy_from_slice(next_state);
        self.reward = reward;
        self.exit = exit;
    }

    pub fn is_populated(&self) -> bool { self.action.is_some() }

    pub fn id(&self) -> CaseId { self.id }

    pub fn state(&self) -> &[f64] { &self.state }

    pub fn action(&self) -> Option<Action> { self.action }

    pub fn next_state(&self) -> &[f64] { &self.next_state }

    pub fn reward(&self) -> f64 { self.reward }

    pub fn exit(&self) -> ExitKind { self.exit }

    /// Local resolution per state dimension.
    pub fn delta(&self) -> &[f64] { &self.delta }

    pub fn q(&self) -> f64 { self.q }
}

/// Euclidean distance over the full state vector.
pub fn distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

/// Gaussian kernel used to weight neighbouring cases.
pub fn kernel(sharpness: f64, dist: f64) -> f64 {
    let d = sharpness * dist;

    (-d * d).exp()
}
