//! Resilience patterns for gateway calls.
//!
//! - Exponential retry for rate-limit and quota failures
//! - Usage accounting
//! - Default substitution when an analysis cannot be completed

mod fallback;
mod retry;
mod usage;

pub use fallback::Fallback;
pub use retry::RetryPolicy;
pub(crate) use retry::{structured_section, text_section};
pub use usage::{GatewayUsage, UsageTracker};
