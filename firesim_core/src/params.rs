//! Simulation parameters, immutable for a session's lifetime.

use crate::error::FireError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Parameters of one simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameters {
    /// Per-candidate ignition probability [0, 1]
    pub p_burn: f64,

    /// Ticks a cell may burn before extinguishing (≥ 1)
    pub burn_time: u32,

    /// Grid side length
    pub interaction_area: u32,

    /// Seconds between generations
    pub update_interval: f64,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            p_burn: 0.3,
            burn_time: 3,
            interaction_area: 20,
            update_interval: 0.1,
        }
    }
}

impl Parameters {
    /// Sets the ignition probability.
    pub fn with_p_burn(mut self, p_burn: f64) -> Self {
        self.p_burn = p_burn;
        self
    }

    /// Sets the burn threshold.
    pub fn with_burn_time(mut self, burn_time: u32) -> Self {
        self.burn_time = burn_time;
        self
    }

    /// Sets the grid side length.
    pub fn with_interaction_area(mut self, side: u32) -> Self {
        self.interaction_area = side;
        self
    }

    /// Sets the generation interval in seconds.
    pub fn with_update_interval(mut self, secs: f64) -> Self {
        self.update_interval = secs;
        self
    }

    /// Checks that every field is structurally usable.
    pub fn validate(&self) -> Result<(), FireError> {
        if !(0.0..=1.0).contains(&self.p_burn) {
            return Err(FireError::invalid(format!(
                "pBurn must be within [0, 1], got {}",
                self.p_burn
            )));
        }
        if self.burn_time == 0 {
            return Err(FireError::invalid("burnTime must be at least 1"));
        }
        if self.interaction_area == 0 {
            return Err(FireError::invalid("interactionArea must be at least 1"));
        }
        if Duration::try_from_secs_f64(self.update_interval).is_err() {
            return Err(FireError::invalid(format!(
                "updateInterval must be a finite, non-negative number of seconds, got {}",
                self.update_interval
            )));
        }
        Ok(())
    }

    /// The wait between generations.
    pub fn update_interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.update_interval).unwrap_or(Duration::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let params = Parameters::default();
        assert!(params.validate().is_ok());
        assert_eq!(params.update_interval(), Duration::from_millis(100));
    }

    #[test]
    fn test_rejects_out_of_range_probability() {
        assert!(Parameters::default().with_p_burn(1.5).validate().is_err());
        assert!(Parameters::default().with_p_burn(-0.1).validate().is_err());
        assert!(Parameters::default().with_p_burn(f64::NAN).validate().is_err());
        assert!(Parameters::default().with_p_burn(1.0).validate().is_ok());
        assert!(Parameters::default().with_p_burn(0.0).validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_burn_time() {
        assert!(Parameters::default().with_burn_time(0).validate().is_err());
    }

    #[test]
    fn test_rejects_bad_intervals() {
        assert!(Parameters::default().with_update_interval(-1.0).validate().is_err());
        assert!(Parameters::default().with_update_interval(f64::INFINITY).validate().is_err());
        assert!(Parameters::default().with_update_interval(0.0).validate().is_ok());
    }

    #[test]
    fn test_wire_names() {
        let params: Parameters = serde_json::from_str(
            r#"{"pBurn":1.0,"burnTime":1,"interactionArea":3,"updateInterval":0.05}"#,
        )
        .unwrap();
        assert_eq!(params.burn_time, 1);
        assert_eq!(params.interaction_area, 3);
        assert_eq!(params.update_interval(), Duration::from_millis(50));
    }
}
