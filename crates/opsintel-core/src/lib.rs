//! # opsintel-core
//!
//! Deterministic compliance engine for retail operations.
//!
//! This crate answers, for every store location:
//! - May this shift open or close?
//! - What happens when an emergency is declared?
//! - Is this supplier, this staff member, this location in compliance?
//!
//! ## Key Guarantees
//!
//! 1. **Deterministic**: gating predicates and thresholds are fixed rules
//! 2. **No model calls**: generative analyses live in `opsintel-runtime`
//! 3. **Traceable**: every notable decision is appended to the [`EventLog`]
//! 4. **Injected state**: the [`DomainStore`] is constructed by the caller
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use opsintel_core::{ComplianceEngine, DomainStore, EventLog};
//!
//! let engine = ComplianceEngine::new(Arc::new(DomainStore::new()), Arc::new(EventLog::new()));
//! let decision = engine.can_open_shift("shift-1");
//! if !decision.allowed {
//!     println!("blocked: {}", decision.reason.unwrap_or_default());
//! }
//! ```

pub mod events;
pub mod kpi;
pub mod rules;
pub mod seed;
pub mod store;
pub mod thresholds;
pub mod types;

// Re-export main types at crate root
pub use events::{Event, EventId, EventKind, EventLog, EventSubscriber, EventType, SupplierViolation};
pub use kpi::{GlobalKpiDashboard, KpiAggregator, LocationKpi};
pub use rules::ComplianceEngine;
pub use seed::{Seed, SeedError, SeedSummary};
pub use store::{DomainStore, Entity, Table};
pub use types::{
    EmergencyDispatch, EmergencyPlan, EmergencyType, FoodSafetyKind, FoodSafetyRecord,
    FraudAnalysis, FraudRiskLevel, FraudSignal, GatingDecision, Incident, IncidentCategory,
    Location, QaInspection, Role, Severity, Shift, ShiftStatus, ShiftTransition, StaffMember,
    Supplier, SupplierCompliance, TrainingModule, TrainingValidation, UpcomingExpiry,
};

use thiserror::Error;

/// A record rejected at the ingestion boundary.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("{field} out of range: {value} (expected {min}..={max})")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Unknown {field}: {value}")]
    UnknownValue { field: &'static str, value: String },

    #[error("Invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Errors from rule-engine mutations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),
}

impl EngineError {
    pub(crate) fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }
}
