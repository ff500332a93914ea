//! House configuration.
//!
//! Limits applied to every auction window the house opens.

use serde::{Deserialize, Serialize};

/// Limits for new auction windows.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HouseConfig {
    /// Minimum window length (ms)
    pub min_duration_ms: u64,
    /// Maximum window length (ms)
    pub max_duration_ms: u64,
    /// Bids accepted per window before it reports full
    pub max_bids_per_window: usize,
    /// Lowest base price a window may be opened with
    pub min_base_price: u128,
}

impl Default for HouseConfig {
    fn default() -> Self {
        Self {
            min_duration_ms: 60_000,                // 1 minute
            max_duration_ms: 7 * 24 * 60 * 60_000,  // 7 days
            max_bids_per_window: 10_000,
            min_base_price: 0,
        }
    }
}

impl HouseConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), HouseConfigError> {
        if self.min_duration_ms == 0 {
            return Err(HouseConfigError::InvalidDuration(
                "Minimum duration cannot be zero".into(),
            ));
        }
        if self.min_duration_ms > self.max_duration_ms {
            return Err(HouseConfigError::InvalidDuration(
                "Minimum duration cannot exceed maximum".into(),
            ));
        }

        if self.max_bids_per_window == 0 {
            return Err(HouseConfigError::InvalidCapacity);
        }

        Ok(())
    }
}

/// Errors that can occur during house config validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HouseConfigError {
    #[error("Invalid duration limits: {0}")]
    InvalidDuration(String),

    #[error("Window capacity cannot be zero")]
    InvalidCapacity,
}
