//! Default substitution for failed analyses.
//!
//! An analysis never surfaces a gateway or repository error to its caller.
//! It logs the failure, counts it, and returns the documented default for
//! its result shape.

use std::fmt::Display;

use super::UsageTracker;

/// Where a degraded result came from, for logging and accounting.
#[derive(Debug, Clone, Copy)]
pub struct Fallback<'a> {
    pub analysis: &'static str,
    pub location_id: &'a str,
    pub usage: &'a UsageTracker,
}

impl<'a> Fallback<'a> {
    pub fn new(analysis: &'static str, location_id: &'a str, usage: &'a UsageTracker) -> Self {
        Self {
            analysis,
            location_id,
            usage,
        }
    }

    /// The value on success, else `default()` after logging and counting.
    pub fn apply<T, E: Display>(&self, result: Result<T, E>, default: impl FnOnce() -> T) -> T {
        match result {
            Ok(value) => value,
            Err(error) => {
                tracing::warn!(
                    analysis = self.analysis,
                    location_id = self.location_id,
                    error = %error,
                    "Analysis degraded to default result"
                );
                self.usage.record_degraded();
                default()
            }
        }
    }
}
