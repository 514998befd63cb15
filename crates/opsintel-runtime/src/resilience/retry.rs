//! Exponential backoff policy shared by text and structured calls.

use backon::ExponentialBuilder;
use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;

use crate::config::duration_str;

/// Attempt budget and backoff curve for one kind of gateway call.
///
/// The delay before retry `n` (1-based) is `base_delay * factor^(n-1)`,
/// capped at `max_delay`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: usize,

    #[serde(with = "duration_str")]
    pub base_delay: Duration,

    pub factor: f32,

    #[serde(with = "duration_str")]
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Budget for schema-constrained calls.
    pub fn structured() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            factor: 2.0,
            max_delay: Duration::from_secs(30),
        }
    }

    /// Budget for free-text calls.
    pub fn text() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            factor: 2.0,
            max_delay: Duration::from_secs(8),
        }
    }

    /// Retries after the first attempt.
    pub fn retries(&self) -> usize {
        self.max_attempts.saturating_sub(1)
    }

    pub fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.base_delay)
            .with_max_delay(self.max_delay)
            .with_factor(self.factor)
            .with_max_times(self.retries())
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 {
            return Err("max_attempts must be at least 1".to_string());
        }
        if !self.factor.is_finite() || self.factor < 1.0 {
            return Err(format!("factor must be >= 1.0, got {}", self.factor));
        }
        if self.max_delay < self.base_delay {
            return Err("max_delay must not be shorter than base_delay".to_string());
        }
        Ok(())
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::structured()
    }
}

/// A config section that may name only some fields of a policy.
#[derive(Debug, Default, Deserialize)]
struct RetryOverrides {
    max_attempts: Option<usize>,
    #[serde(default, deserialize_with = "duration_str::deserialize_option")]
    base_delay: Option<Duration>,
    factor: Option<f32>,
    #[serde(default, deserialize_with = "duration_str::deserialize_option")]
    max_delay: Option<Duration>,
}

impl RetryOverrides {
    fn onto(self, base: RetryPolicy) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.unwrap_or(base.max_attempts),
            base_delay: self.base_delay.unwrap_or(base.base_delay),
            factor: self.factor.unwrap_or(base.factor),
            max_delay: self.max_delay.unwrap_or(base.max_delay),
        }
    }
}

/// `deserialize_with` for a section whose missing fields come from
/// [`RetryPolicy::structured`].
pub(crate) fn structured_section<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<RetryPolicy, D::Error> {
    Ok(RetryOverrides::deserialize(deserializer)?.onto(RetryPolicy::structured()))
}

/// `deserialize_with` for a section whose missing fields come from
/// [`RetryPolicy::text`].
pub(crate) fn text_section<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<RetryPolicy, D::Error> {
    Ok(RetryOverrides::deserialize(deserializer)?.onto(RetryPolicy::text()))
}
