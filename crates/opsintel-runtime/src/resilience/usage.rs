//! Gateway usage accounting.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::providers::TokenUsage;

/// Snapshot of gateway activity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayUsage {
    /// Gateway calls started (cache hits included).
    pub calls: u64,

    /// Provider attempts beyond the first of each call.
    pub retries: u64,

    /// Calls that returned an error to the caller.
    pub failures: u64,

    /// Analyses that substituted their default result.
    pub degraded: u64,

    pub cache_hits: u64,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

impl GatewayUsage {
    pub fn total_tokens(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }
}

/// Shared, thread-safe counters behind [`GatewayUsage`].
#[derive(Debug, Default)]
pub struct UsageTracker {
    usage: RwLock<GatewayUsage>,
}

impl UsageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_call(&self) {
        self.usage.write().calls += 1;
    }

    pub fn record_retry(&self) {
        self.usage.write().retries += 1;
    }

    pub fn record_failure(&self) {
        self.usage.write().failures += 1;
    }

    pub fn record_degraded(&self) {
        self.usage.write().degraded += 1;
    }

    pub fn record_cache_hit(&self) {
        self.usage.write().cache_hits += 1;
    }

    pub fn record_tokens(&self, tokens: &TokenUsage) {
        let mut usage = self.usage.write();
        usage.prompt_tokens += u64::from(tokens.prompt_tokens);
        usage.completion_tokens += u64::from(tokens.completion_tokens);
    }

    pub fn snapshot(&self) -> GatewayUsage {
        self.usage.read().clone()
    }

    pub fn reset(&self) {
        *self.usage.write() = GatewayUsage::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let tracker = UsageTracker::new();
        tracker.record_call();
        tracker.record_call();
        tracker.record_retry();
        tracker.record_degraded();
        tracker.record_tokens(&TokenUsage {
            prompt_tokens: 120,
            completion_tokens: 30,
        });

        let usage = tracker.snapshot();
        assert_eq!(usage.calls, 2);
        assert_eq!(usage.retries, 1);
        assert_eq!(usage.degraded, 1);
        assert_eq!(usage.total_tokens(), 150);
    }

    #[test]
    fn test_reset() {
        let tracker = UsageTracker::new();
        tracker.record_failure();
        tracker.reset();
        assert_eq!(tracker.snapshot(), GatewayUsage::default());
    }
}
