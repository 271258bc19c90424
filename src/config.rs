//! Search configuration.

use std::time::Duration;

use crate::{Error, Result};

/// Parameters controlling one search.
///
/// # Example
///
/// ```
/// use selfzero::SearchConfig;
/// use std::time::Duration;
///
/// let config = SearchConfig::default()
///     .with_power(400)
///     .with_exploration(1.5)
///     .with_dilution(0.25)
///     .with_temperature(0.0)
///     .with_max_time(Duration::from_millis(50));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Total number of simulations from the root.
    pub power: usize,

    /// Weight of the exploration term in PUCT selection.
    pub exploration: f32,

    /// Mixing weight in `[0, 1]` between the root prior and uniform noise:
    /// `P_root = (1 - d) * P + d * U_legal`. Applied at the root only.
    pub dilution: f32,

    /// Softens (`> 1`) or sharpens (`< 1`) the visit-count distribution
    /// when extracting the improved policy; `0` collapses to the argmax.
    pub temperature: f32,

    /// Optional deadline. Whichever of `power` and `max_time` hits first
    /// ends the search; in-flight simulations finish their backup.
    pub max_time: Option<Duration>,

    /// Value penalty per in-flight traversal on an edge. One visit and
    /// `-virtual_loss` value, reverted on backup.
    pub virtual_loss: f32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            power: 100,
            exploration: 1.41,
            dilution: 0.0,
            temperature: 1.0,
            max_time: None,
            virtual_loss: 1.0,
        }
    }
}

impl SearchConfig {
    pub fn with_power(mut self, power: usize) -> Self {
        self.power = power;
        self
    }

    pub fn with_exploration(mut self, exploration: f32) -> Self {
        self.exploration = exploration;
        self
    }

    pub fn with_dilution(mut self, dilution: f32) -> Self {
        self.dilution = dilution;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_time(mut self, max_time: Duration) -> Self {
        self.max_time = Some(max_time);
        self
    }

    pub fn with_virtual_loss(mut self, virtual_loss: f32) -> Self {
        self.virtual_loss = virtual_loss;
        self
    }

    /// Rejects parameter combinations the search cannot honor.
    pub fn validate(&self) -> Result<()> {
        if self.power == 0 {
            return Err(Error::InvalidConfiguration(
                "power must be at least 1".into(),
            ));
        }
        if !self.exploration.is_finite() || self.exploration < 0.0 {
            return Err(Error::InvalidConfiguration(
                "exploration must be finite and non-negative".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.dilution) {
            return Err(Error::InvalidConfiguration(
                "dilution must lie in [0, 1]".into(),
            ));
        }
        if !self.temperature.is_finite() || self.temperature < 0.0 {
            return Err(Error::InvalidConfiguration(
                "temperature must be finite and non-negative".into(),
            ));
        }
        if !self.virtual_loss.is_finite() || self.virtual_loss < 0.0 {
            return Err(Error::InvalidConfiguration(
                "virtual_loss must be finite and non-negative".into(),
            ));
        }
        Ok(())
    }
}
