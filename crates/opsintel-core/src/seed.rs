//! Seed data loading from YAML/JSON.
//!
//! A seed file lists the records an operator wants loaded into a fresh
//! store. Records are applied through the engine's ingest path, so seeding
//! performs the same validation and appends the same write-time events as
//! live ingestion.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::rules::{ComplianceEngine, Validate};
use crate::types::{
    EmergencyPlan, FoodSafetyRecord, FraudSignal, Incident, Location, QaInspection, Shift,
    StaffMember, Supplier, TrainingModule,
};
use crate::ValidationError;

/// Errors that can occur when loading seed data.
#[derive(Error, Debug)]
pub enum SeedError {
    #[error("Failed to read seed file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Seed validation failed: {0}")]
    Validation(#[from] ValidationError),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Seed {
    #[serde(default)]
    pub locations: Vec<Location>,

    #[serde(default)]
    pub staff: Vec<StaffMember>,

    #[serde(default)]
    pub training_modules: Vec<TrainingModule>,

    #[serde(default)]
    pub shifts: Vec<Shift>,

    #[serde(default)]
    pub emergency_plans: Vec<EmergencyPlan>,

    #[serde(default)]
    pub suppliers: Vec<Supplier>,

    #[serde(default)]
    pub food_safety: Vec<FoodSafetyRecord>,

    #[serde(default)]
    pub incidents: Vec<Incident>,

    #[serde(default)]
    pub inspections: Vec<QaInspection>,

    #[serde(default)]
    pub fraud_signals: Vec<FraudSignal>,
}

/// Record and event counts from [`Seed::apply`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeedSummary {
    pub records: usize,
    pub events: usize,
}

impl Seed {
    pub fn from_yaml(yaml: &str) -> Result<Self, SeedError> {
        let seed: Seed = serde_yaml::from_str(yaml)?;
        seed.validate()?;
        Ok(seed)
    }

    pub fn from_json(json: &str) -> Result<Self, SeedError> {
        let seed: Seed = serde_json::from_str(json)?;
        seed.validate()?;
        Ok(seed)
    }

    /// Load a seed file, choosing the format by extension (`.json` is JSON,
    /// anything else is YAML).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SeedError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::from_json(&contents),
            _ => Self::from_yaml(&contents),
        }
    }

    pub fn record_count(&self) -> usize {
        self.locations.len()
            + self.staff.len()
            + self.training_modules.len()
            + self.shifts.len()
            + self.emergency_plans.len()
            + self.suppliers.len()
            + self.food_safety.len()
            + self.incidents.len()
            + self.inspections.len()
            + self.fraud_signals.len()
    }

    /// Ingest every record. Reference data goes first so that records
    /// pointing at locations or staff land after them.
    ///
    /// All records are checked before the first write, so a seed that fails
    /// validation leaves the store and the log untouched.
    pub fn apply(&self, engine: &ComplianceEngine) -> Result<SeedSummary, SeedError> {
        self.validate_records()?;
        let mut events = 0;

        for location in &self.locations {
            engine.ingest_location(location.clone())?;
        }
        for member in &self.staff {
            engine.ingest_staff(member.clone())?;
        }
        for module in &self.training_modules {
            engine.ingest_training_module(module.clone())?;
        }
        for shift in &self.shifts {
            engine.ingest_shift(shift.clone())?;
        }
        for plan in &self.emergency_plans {
            engine.ingest_emergency_plan(plan.clone())?;
        }
        for supplier in &self.suppliers {
            engine.ingest_supplier(supplier.clone())?;
        }
        for record in &self.food_safety {
            events += engine.ingest_food_safety(record.clone())?.len();
        }
        for incident in &self.incidents {
            events += engine.ingest_incident(incident.clone())?.len();
        }
        for inspection in &self.inspections {
            engine.ingest_inspection(inspection.clone())?;
            events += 1;
        }
        for signal in &self.fraud_signals {
            events += engine.ingest_fraud_signal(signal.clone())?.len();
        }

        let summary = SeedSummary {
            records: self.record_count(),
            events,
        };
        tracing::info!(
            records = summary.records,
            events = summary.events,
            "Seed applied"
        );
        Ok(summary)
    }

    fn validate_records(&self) -> Result<(), ValidationError> {
        fn each<T: Validate>(records: &[T]) -> Result<(), ValidationError> {
            records.iter().try_for_each(Validate::validate)
        }

        each(&self.locations)?;
        each(&self.staff)?;
        each(&self.training_modules)?;
        each(&self.shifts)?;
        each(&self.emergency_plans)?;
        each(&self.suppliers)?;
        each(&self.food_safety)?;
        each(&self.incidents)?;
        each(&self.inspections)?;
        each(&self.fraud_signals)
    }

    /// Ids must be unique within each record kind.
    fn validate(&self) -> Result<(), SeedError> {
        check_unique("locations", self.locations.iter().map(|r| r.id.as_str()))?;
        check_unique("staff", self.staff.iter().map(|r| r.id.as_str()))?;
        check_unique("training_modules", self.training_modules.iter().map(|r| r.id.as_str()))?;
        check_unique("shifts", self.shifts.iter().map(|r| r.id.as_str()))?;
        check_unique("emergency_plans", self.emergency_plans.iter().map(|r| r.id.as_str()))?;
        check_unique("suppliers", self.suppliers.iter().map(|r| r.id.as_str()))?;
        check_unique("food_safety", self.food_safety.iter().map(|r| r.id.as_str()))?;
        check_unique("incidents", self.incidents.iter().map(|r| r.id.as_str()))?;
        check_unique("inspections", self.inspections.iter().map(|r| r.id.as_str()))?;
        check_unique("fraud_signals", self.fraud_signals.iter().map(|r| r.id.as_str()))?;
        Ok(())
    }
}

fn check_unique<'a>(
    field: &'static str,
    ids: impl Iterator<Item = &'a str>,
) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(ValidationError::Invalid {
                field,
                reason: format!("duplicate id '{}'", id),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EventLog, EventType};
    use crate::store::DomainStore;
    use std::sync::Arc;

    const SEED: &str = r#"
locations:
  - id: loc-1
    name: Downtown
staff:
  - id: c1
    name: Ana
    location_id: loc-1
    role: crew
  - id: m1
    name: Ben
    location_id: loc-1
    role: shift_manager
shifts:
  - id: s1
    location_id: loc-1
    assigned_staff: [c1, m1]
    required_crew: 1
    required_managers: 1
    opening_checklist_completed: true
emergency_plans:
  - id: p1
    location_id: loc-1
    emergency_type: FIRE
    steps: [Evacuate, Call fire service]
    responsible_roles: [store_manager]
food_safety:
  - id: t1
    location_id: loc-1
    kind:
      type: temperature_log
      equipment: walk-in chiller
      value_celsius: 7.5
      max_celsius: 5.0
inspections:
  - id: q1
    location_id: loc-1
    score: 91
fraud_signals:
  - id: f1
    location_id: loc-1
    kind: excessive_voids
    severity: 8
"#;

    fn engine() -> ComplianceEngine {
        ComplianceEngine::new(Arc::new(DomainStore::new()), Arc::new(EventLog::new()))
    }

    #[test]
    fn test_apply_yaml_seed() {
        let seed = Seed::from_yaml(SEED).unwrap();
        let engine = engine();
        let summary = seed.apply(&engine).unwrap();

        assert_eq!(summary.records, 8);
        assert_eq!(summary.events, 3);
        assert_eq!(engine.events().count(EventType::TemperatureBreach), 1);
        assert_eq!(engine.events().count(EventType::AuditPassed), 1);
        assert_eq!(engine.events().count(EventType::FraudAlert), 1);
        assert!(engine.can_open_shift("s1").allowed);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let yaml = r#"
locations:
  - { id: loc-1, name: A }
  - { id: loc-1, name: B }
"#;
        assert!(matches!(Seed::from_yaml(yaml), Err(SeedError::Validation(_))));
    }

    #[test]
    fn test_invalid_record_surfaces_validation_error() {
        let seed = Seed::from_json(
            r#"{"suppliers": [{"id": "s1", "name": "X", "halal_certified": true, "audit_score": 140}]}"#,
        )
        .unwrap();
        let result = seed.apply(&engine());
        assert!(matches!(result, Err(SeedError::Validation(ValidationError::OutOfRange { .. }))));
    }

    #[test]
    fn test_failed_apply_writes_nothing() {
        let seed = Seed::from_json(
            r#"{
                "locations": [{"id": "loc-1", "name": "Downtown"}],
                "fraud_signals": [{"id": "f1", "location_id": "loc-1", "kind": "excessive_voids", "severity": 9}],
                "suppliers": [{"id": "s1", "name": "X", "halal_certified": true, "audit_score": 140}]
            }"#,
        )
        .unwrap();
        let engine = engine();

        assert!(seed.apply(&engine).is_err());
        assert!(engine.store().locations.is_empty());
        assert!(engine.store().fraud_signals.is_empty());
        assert!(engine.events().is_empty());
    }

    #[test]
    fn test_empty_seed() {
        let seed = Seed::from_yaml("{}").unwrap();
        assert_eq!(seed.record_count(), 0);
    }
}
