//! Analysis Orchestrator.
//!
//! Reads bounded data slices from an [`OperationsRepository`], asks the
//! gateway for schema-checked judgements, and substitutes a documented
//! default whenever data or generation fails. Analyses return plain values;
//! failures show up in logs and in the gateway's `degraded` counter.

mod location;
mod summary;
mod tasks;
pub mod types;

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

use crate::config::AnalysisConfig;
use crate::gateway::{GenerationError, GenerationGateway};
use crate::repository::{OperationsRepository, RepositoryError};
use crate::resilience::{Fallback, GatewayUsage};

pub use types::*;

/// Why an analysis fell back to its default.
#[derive(Error, Debug)]
enum AnalysisError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("Failed to encode data slice: {0}")]
    Encode(#[from] serde_json::Error),
}

pub struct AnalysisOrchestrator {
    gateway: Arc<GenerationGateway>,
    repository: Arc<dyn OperationsRepository>,
    settings: AnalysisConfig,
}

impl AnalysisOrchestrator {
    pub fn new(
        gateway: Arc<GenerationGateway>,
        repository: Arc<dyn OperationsRepository>,
        settings: AnalysisConfig,
    ) -> Self {
        Self {
            gateway,
            repository,
            settings,
        }
    }

    pub fn gateway(&self) -> &Arc<GenerationGateway> {
        &self.gateway
    }

    pub fn usage(&self) -> GatewayUsage {
        self.gateway.usage().snapshot()
    }

    fn degrade<T: Default>(
        &self,
        analysis: &'static str,
        location_id: &str,
        result: Result<T, AnalysisError>,
    ) -> T {
        Fallback::new(analysis, location_id, self.gateway.usage()).apply(result, T::default)
    }
}

fn to_json<T: Serialize + ?Sized>(rows: &T) -> Result<String, AnalysisError> {
    Ok(serde_json::to_string_pretty(rows)?)
}

/// Newest `limit` rows by `at`.
fn latest<T>(mut rows: Vec<T>, limit: usize, at: impl Fn(&T) -> DateTime<Utc>) -> Vec<T> {
    rows.sort_by(|a, b| at(b).cmp(&at(a)));
    rows.truncate(limit);
    rows
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::config::RuntimeConfig;
    use crate::repository::{InMemoryRepository, OperationsData};
    use crate::testing::ScriptedProvider;
    use opsintel_core::Location;

    pub fn location(id: &str) -> Location {
        Location {
            id: id.to_string(),
            name: format!("Store {}", id),
            region: None,
            address: None,
        }
    }

    pub fn orchestrator(
        provider: Arc<ScriptedProvider>,
        data: OperationsData,
    ) -> AnalysisOrchestrator {
        let config = RuntimeConfig::default();
        let gateway = Arc::new(GenerationGateway::new(provider, &config));
        AnalysisOrchestrator::new(
            gateway,
            Arc::new(InMemoryRepository::new(data)),
            config.analysis,
        )
    }

    /// Which analysis a structured request belongs to, by its schema.
    pub fn schema_kind(schema: Option<&serde_json::Value>) -> &'static str {
        let Some(schema) = schema else {
            return "text";
        };
        let required = schema["required"].to_string();
        if required.contains("risk_score") {
            "theft"
        } else if required.contains("total_value") {
            "waste"
        } else if required.contains("reorders") {
            "inventory"
        } else if required.contains("proposed_action") {
            "task"
        } else if required.contains("checks") {
            "photo"
        } else if schema["properties"]["issues"]["items"]["type"] == "object" {
            "food_safety"
        } else {
            "cleaning"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_latest_keeps_newest() {
        let now = Utc::now();
        let rows = vec![
            now - Duration::hours(3),
            now,
            now - Duration::hours(1),
            now - Duration::hours(2),
        ];

        let kept = latest(rows, 2, |t| *t);
        assert_eq!(kept, vec![now, now - Duration::hours(1)]);
    }
}
