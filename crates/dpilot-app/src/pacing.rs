//! Human-like pacing between journey steps

use dpilot_core::prelude::*;
use rand::Rng;
use std::time::Duration;

/// Inclusive range a random pause is drawn from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PauseRange {
    min_secs: f64,
    max_secs: f64,
}

impl PauseRange {
    pub fn new(min_secs: f64, max_secs: f64) -> Result<Self> {
        if !min_secs.is_finite() || !max_secs.is_finite() || min_secs < 0.0 {
            return Err(Error::config_invalid(format!(
                "pause range {}..{} must be finite and non-negative",
                min_secs, max_secs
            )));
        }
        if min_secs > max_secs {
            return Err(Error::config_invalid(format!(
                "pause minimum {} exceeds maximum {}",
                min_secs, max_secs
            )));
        }
        Ok(Self { min_secs, max_secs })
    }

    /// Always pauses exactly `duration`
    pub fn fixed(duration: Duration) -> Self {
        let secs = duration.as_secs_f64();
        Self {
            min_secs: secs,
            max_secs: secs,
        }
    }

    pub fn min(&self) -> Duration {
        Duration::from_secs_f64(self.min_secs)
    }

    pub fn max(&self) -> Duration {
        Duration::from_secs_f64(self.max_secs)
    }

    /// Uniformly random duration within the range
    pub fn sample(&self) -> Duration {
        if self.min_secs == self.max_secs {
            return self.min();
        }
        let secs = rand::thread_rng().gen_range(self.min_secs..=self.max_secs);
        Duration::from_secs_f64(secs)
    }

    pub async fn pause(&self) {
        let duration = self.sample();
        trace!("Pausing for {:.2}s", duration.as_secs_f64());
        tokio::time::sleep(duration).await;
    }
}
