//! # opsintel-runtime
//!
//! Generative analyses for retail operations.
//!
//! This crate layers model-backed judgements on top of the deterministic
//! rules in `opsintel-core`. Every model call goes through the
//! [`GenerationGateway`], which:
//! - bounds in-flight calls with a semaphore (retries included)
//! - retries rate-limit and quota failures with exponential backoff
//! - validates structured replies against a JSON schema
//!
//! The [`AnalysisOrchestrator`] never fails: when data or generation is
//! unavailable each analysis returns a documented default and the gateway's
//! usage counters record the degradation.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use opsintel_runtime::{
//!     AnalysisOrchestrator, GenerationGateway, InMemoryRepository, ProviderRegistry, RuntimeConfig,
//! };
//!
//! let config = RuntimeConfig::from_yaml_file("opsintel.yaml")?;
//! let gateway = GenerationGateway::from_config(&config, &ProviderRegistry::with_defaults())?;
//! let orchestrator = AnalysisOrchestrator::new(
//!     Arc::new(gateway),
//!     Arc::new(InMemoryRepository::default()),
//!     config.analysis.clone(),
//! );
//!
//! let summary = orchestrator.generate_daily_summary("loc-1").await;
//! println!("{} (risk {:.2})", summary.narrative, summary.risk_score);
//! ```

pub mod analysis;
pub mod broadcast;
pub mod cache;
pub mod config;
pub mod gateway;
pub mod prompts;
pub mod providers;
pub mod repository;
pub mod resilience;
pub mod structured;

#[cfg(test)]
mod testing;

pub use analysis::{
    AnalysisOrchestrator, AutonomousTask, CleaningAnalysis, DailySummary, FoodSafetyAnalysis,
    FoodSafetyIssue, HealthScore, InventoryForecast, IssueSeverity, PhotoVerification,
    ReorderSuggestion, TaskDecision, TaskPriority, TheftRiskAnalysis, WasteAnalysis,
};
pub use broadcast::EventBroadcaster;
pub use cache::ResponseCache;
pub use config::{AnalysisConfig, CacheConfig, ConfigError, ProviderSettings, RuntimeConfig};
pub use gateway::{GenerationError, GenerationGateway};
pub use providers::{
    ApiCredential, ChatMessage, CompletionConfig, CompletionResponse, GenerationProvider,
    ProviderError, ProviderFactory, ProviderRegistry, TokenUsage,
};
pub use repository::{
    Alert, Employee, InMemoryRepository, InventoryItem, OperationsData, OperationsRepository,
    PosTransaction, RepositoryError, TemperatureReading, WasteReport,
};
pub use resilience::{GatewayUsage, RetryPolicy};
