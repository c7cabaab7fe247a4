use crate::error::ModelError;

/// Parameters fixed for the lifetime of a [`Model`](crate::Model).
///
/// The defaults describe a two-dimensional cart with three actions.
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serialize", serde(default))]
#[derive(Clone, Debug, PartialEq)]
pub struct ModelConfig {
    /// Dimensionality of the continuous state.
    pub state_dim: usize,
    pub num_actions: usize,
    /// Number of arena slots; ingestion fails once all are populated.
    pub capacity: usize,
    /// Minimum local resolution per state dimension.
    pub resolution: Vec<f64>,
    pub learning_rate: f64,
    pub discount: f64,
    /// Peakiness of the Gaussian interpolation kernel.
    pub sharpness: f64,
    /// Value of an out-of-bounds exit; sets the cost scale of failure.
    pub bad_terminal_value: f64,
    /// Fraction of a stored delta within which new samples are duplicates.
    pub duplicate_spread: f64,
    /// Neighbourhood factor used when the neighbour graph is rebuilt by a solve.
    pub solve_influence: f64,
    /// A sweep whose summed absolute change is at or below this ends the solve.
    pub convergence_tolerance: f64,
    pub max_sweeps: usize,
}

impl ModelConfig {
    pub fn new(
        state_dim: usize,
        num_actions: usize,
        capacity: usize,
        resolution: Vec<f64>,
        learning_rate: f64,
        discount: f64,
        sharpness: f64,
    ) -> ModelConfig
    {
        ModelConfig {
            state_dim,
            num_actions,
            capacity,
            resolution,
            learning_rate,
            discount,
            sharpness,
            ..ModelConfig::default()
        }
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        let invalid = |msg: String| Err(ModelError::InvalidConfig(msg));

        if self.state_dim == 0 {
            return invalid("state_dim must be positive".to_owned());
        }
        if self.num_actions == 0 {
            return invalid("num_actions must be positive".to_owned());
        }
        if self.resolution.len() != self.state_dim {
            return invalid(format!(
                "resolution has {} entries for {} state dimensions",
                self.resolution.len(),
                self.state_dim
            ));
        }
        if self.resolution.iter().any(|r| !r.is_finite() || *r <= 0.0) {
            return invalid("resolution entries must be finite and positive".to_owned());
        }
        if !(self.learning_rate > 0.0 && self.learning_rate <= 1.0) {
            return invalid(format!("learning_rate {} not in (0, 1]", self.learning_rate));
        }
        if !(self.discount >= 0.0 && self.discount <= 1.0) {
            return invalid(format!("discount {} not in [0, 1]", self.discount));
        }
        if !self.sharpness.is_finite() || self.sharpness < 0.0 {
            return invalid(format!("sharpness {} must be finite and non-negative", self.sharpness));
        }
        if !self.bad_terminal_value.is_finite() {
            return invalid("bad_terminal_value must be finite".to_owned());
        }
        if !self.duplicate_spread.is_finite() || self.duplicate_spread < 0.0 {
            return invalid(format!("duplicate_spread {} must be non-negative", self.duplicate_spread));
        }
        if !self.solve_influence.is_finite() || self.solve_influence <= 0.0 {
            return invalid(format!("solve_influence {} must be positive", self.solve_influence));
        }
        if !(self.convergence_tolerance >= 0.0) {
            return invalid("convergence_tolerance must be non-negative".to_owned());
        }
        if self.max_sweeps == 0 {
            return invalid("max_sweeps must be positive".to_owned());
        }

        Ok(())
    }
}

impl Default for ModelConfig {
    fn default() -> ModelConfig {
        ModelConfig {
            state_dim: 2,
            num_actions: 3,
            capacity: 5000,
            resolution: vec![0.9, 0.9],
            learning_rate: 1.0,
            discount: 1.0,
            sharpness: 1.0,
            bad_terminal_value: -100.0,
            duplicate_spread: 0.9,
            solve_influence: 2.0,
            convergence_tolerance: 1e-9,
            max_sweeps: 10_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(ModelConfig::default().validate(), Ok(()));
    }

    #[test]
    fn resolution_must_match_state_dim() {
        let config = ModelConfig::new(3, 3, 10, vec![0.9, 0.9], 1.0, 1.0, 1.0);

        match config.validate() {
            Err(ModelError::InvalidConfig(msg)) => assert!(msg.contains("resolution")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn rejects_out_of_range_rates() {
        let mut config = ModelConfig::default();
        config.learning_rate = 0.0;
        assert!(config.validate().is_err());

        let mut config = ModelConfig::default();
        config.discount = 1.5;
        assert!(config.validate().is_err());

        let mut config = ModelConfig::default();
        config.convergence_tolerance = std::f64::NAN;
        assert!(config.validate().is_err());
    }
}
