//! Configuration shared by both skip list variants

use crate::{Error, Result};

/// Tunables for a skip list's probabilistic level generation
///
/// # Example
///
/// ```
/// use lockstep_core::SkipListConfig;
///
/// let config = SkipListConfig {
///     max_level: 20,
///     probability: 0.25,
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkipListConfig {
    /// Upper bound on a node's height (0-indexed), and on `cur_level`/`current_height`
    pub max_level: usize,
    /// Per-level probability of promoting a node to the next level
    pub probability: f64,
}

impl Default for SkipListConfig {
    fn default() -> Self {
        Self {
            max_level: 16,
            probability: 0.5,
        }
    }
}

impl SkipListConfig {
    /// Checks that `max_level` and `probability` are usable by the level generator
    pub fn validate(&self) -> Result<()> {
        if self.max_level == 0 {
            return Err(Error::InvalidConfig(
                "max_level must be at least 1".to_string(),
            ));
        }
        if !(self.probability > 0.0 && self.probability < 1.0) {
            return Err(Error::InvalidConfig(format!(
                "probability must lie in (0.0, 1.0), got {}",
                self.probability
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(SkipListConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_max_level_is_invalid() {
        let config = SkipListConfig {
            max_level: 0,
            probability: 0.5,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn out_of_range_probability_is_invalid() {
        for p in [0.0, 1.0, -0.1, 1.1] {
            let config = SkipListConfig {
                max_level: 16,
                probability: p,
            };
            assert!(config.validate().is_err(), "probability {p} should be invalid");
        }
    }
}
