//! Validated writes.
//!
//! Each `ingest_*` call validates its record, stores it, and synchronously
//! appends the write-time events its entity kind defines. A record that
//! fails validation leaves both the store and the log untouched.

use crate::events::{Event, EventKind};
use crate::thresholds::{FRAUD_ALERT_SEVERITY, FRAUD_MAX_SEVERITY, QA_PASS_SCORE};
use crate::types::{
    EmergencyPlan, FoodSafetyKind, FoodSafetyRecord, FraudSignal, Incident, IncidentCategory,
    Location, QaInspection, Shift, StaffMember, Supplier, TrainingModule,
};
use crate::ValidationError;

use super::ComplianceEngine;

fn require(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    Ok(())
}

fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), ValidationError> {
    if !value.is_finite() || value < min || value > max {
        return Err(ValidationError::OutOfRange {
            field,
            value,
            min,
            max,
        });
    }
    Ok(())
}

fn check_finite(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::Invalid {
            field,
            reason: format!("{} is not a finite number", value),
        });
    }
    Ok(())
}

/// Record-level checks that need no store access.
pub(crate) trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

impl Validate for Location {
    fn validate(&self) -> Result<(), ValidationError> {
        require("location.id", &self.id)
    }
}

impl Validate for StaffMember {
    fn validate(&self) -> Result<(), ValidationError> {
        require("staff.id", &self.id)?;
        self.certifications
            .keys()
            .try_for_each(|module_id| require("staff.certifications.module_id", module_id))
    }
}

impl Validate for TrainingModule {
    fn validate(&self) -> Result<(), ValidationError> {
        require("training_module.id", &self.id)
    }
}

impl Validate for Shift {
    fn validate(&self) -> Result<(), ValidationError> {
        require("shift.id", &self.id)?;
        require("shift.location_id", &self.location_id)
    }
}

impl Validate for EmergencyPlan {
    fn validate(&self) -> Result<(), ValidationError> {
        require("emergency_plan.id", &self.id)?;
        require("emergency_plan.location_id", &self.location_id)?;
        if self.steps.is_empty() {
            return Err(ValidationError::Invalid {
                field: "emergency_plan.steps",
                reason: "a plan needs at least one response step".to_string(),
            });
        }
        Ok(())
    }
}

impl Validate for Supplier {
    fn validate(&self) -> Result<(), ValidationError> {
        require("supplier.id", &self.id)?;
        check_range("supplier.audit_score", self.audit_score, 0.0, 100.0)
    }
}

impl Validate for FoodSafetyRecord {
    fn validate(&self) -> Result<(), ValidationError> {
        require("food_safety.id", &self.id)?;
        require("food_safety.location_id", &self.location_id)?;
        match &self.kind {
            FoodSafetyKind::TemperatureLog {
                value_celsius,
                max_celsius,
                ..
            } => {
                check_finite("food_safety.value_celsius", *value_celsius)?;
                check_finite("food_safety.max_celsius", *max_celsius)
            }
            FoodSafetyKind::Recall { product, .. } => require("food_safety.product", product),
            FoodSafetyKind::HygieneCheck { .. } => Ok(()),
        }
    }
}

impl Validate for Incident {
    fn validate(&self) -> Result<(), ValidationError> {
        require("incident.id", &self.id)?;
        require("incident.location_id", &self.location_id)
    }
}

impl Validate for QaInspection {
    fn validate(&self) -> Result<(), ValidationError> {
        require("inspection.id", &self.id)?;
        require("inspection.location_id", &self.location_id)?;
        check_range("inspection.score", self.score, 0.0, 100.0)
    }
}

impl Validate for FraudSignal {
    fn validate(&self) -> Result<(), ValidationError> {
        require("fraud_signal.id", &self.id)?;
        require("fraud_signal.location_id", &self.location_id)?;
        require("fraud_signal.kind", &self.kind)?;
        check_range(
            "fraud_signal.severity",
            f64::from(self.severity),
            0.0,
            f64::from(FRAUD_MAX_SEVERITY),
        )
    }
}

impl ComplianceEngine {
    pub fn ingest_location(&self, location: Location) -> Result<(), ValidationError> {
        location.validate()?;
        self.store.locations.put(location);
        Ok(())
    }

    pub fn ingest_staff(&self, member: StaffMember) -> Result<(), ValidationError> {
        member.validate()?;
        self.store.staff.put(member);
        Ok(())
    }

    pub fn ingest_training_module(&self, module: TrainingModule) -> Result<(), ValidationError> {
        module.validate()?;
        self.store.training_modules.put(module);
        Ok(())
    }

    pub fn ingest_shift(&self, shift: Shift) -> Result<(), ValidationError> {
        shift.validate()?;
        self.store.shifts.put(shift);
        Ok(())
    }

    pub fn ingest_emergency_plan(&self, plan: EmergencyPlan) -> Result<(), ValidationError> {
        plan.validate()?;

        // Plans are unique per (location, type); a new plan supersedes the old one.
        if let Some(existing) = self
            .store
            .emergency_plan_for(&plan.location_id, plan.emergency_type)
        {
            if existing.id != plan.id {
                self.store.emergency_plans.remove(&existing.id);
            }
        }

        self.store.emergency_plans.put(plan);
        Ok(())
    }

    pub fn ingest_supplier(&self, supplier: Supplier) -> Result<(), ValidationError> {
        supplier.validate()?;
        self.store.suppliers.put(supplier);
        Ok(())
    }

    /// Store a food-safety record. A temperature log above its maximum
    /// emits a breach; a recall emits a recall event.
    pub fn ingest_food_safety(
        &self,
        record: FoodSafetyRecord,
    ) -> Result<Vec<Event>, ValidationError> {
        record.validate()?;

        let kind = match &record.kind {
            FoodSafetyKind::TemperatureLog {
                equipment,
                value_celsius,
                max_celsius,
            } => record.is_temperature_breach().then(|| EventKind::TemperatureBreach {
                record_id: record.id.clone(),
                location_id: record.location_id.clone(),
                equipment: equipment.clone(),
                value_celsius: *value_celsius,
                max_celsius: *max_celsius,
            }),
            FoodSafetyKind::Recall {
                product,
                batch,
                reason,
            } => Some(EventKind::FoodRecall {
                record_id: record.id.clone(),
                location_id: record.location_id.clone(),
                product: product.clone(),
                batch: batch.clone(),
                reason: reason.clone(),
            }),
            FoodSafetyKind::HygieneCheck { .. } => None,
        };

        self.store.food_safety.put(record);

        Ok(kind.into_iter().map(|k| self.emit(k)).collect())
    }

    /// Store an incident. High/critical severity raises a security alert;
    /// allergy incidents always raise an allergy event.
    pub fn ingest_incident(&self, incident: Incident) -> Result<Vec<Event>, ValidationError> {
        incident.validate()?;

        let mut emitted = Vec::new();
        if incident.severity.is_high_risk() {
            emitted.push(EventKind::SecurityAlert {
                incident_id: incident.id.clone(),
                location_id: incident.location_id.clone(),
                category: incident.category,
                severity: incident.severity,
            });
        }
        if incident.category == IncidentCategory::Allergy {
            emitted.push(EventKind::AllergyIncident {
                incident_id: incident.id.clone(),
                location_id: incident.location_id.clone(),
                severity: incident.severity,
                description: incident.description.clone(),
            });
        }

        self.store.incidents.put(incident);

        Ok(emitted.into_iter().map(|k| self.emit(k)).collect())
    }

    /// Store an inspection and emit its pass/fail event.
    pub fn ingest_inspection(&self, inspection: QaInspection) -> Result<Event, ValidationError> {
        inspection.validate()?;

        let kind = if inspection.score < QA_PASS_SCORE {
            EventKind::AuditFailed {
                inspection_id: inspection.id.clone(),
                location_id: inspection.location_id.clone(),
                score: inspection.score,
                failed_items: inspection.failed_items.clone(),
            }
        } else {
            EventKind::AuditPassed {
                inspection_id: inspection.id.clone(),
                location_id: inspection.location_id.clone(),
                score: inspection.score,
            }
        };

        self.store.inspections.put(inspection);

        Ok(self.emit(kind))
    }

    /// Store a fraud signal. Severity at or above the alert threshold emits an alert.
    pub fn ingest_fraud_signal(&self, signal: FraudSignal) -> Result<Vec<Event>, ValidationError> {
        signal.validate()?;

        let alert = (signal.severity >= FRAUD_ALERT_SEVERITY).then(|| EventKind::FraudAlert {
            signal_id: signal.id.clone(),
            location_id: signal.location_id.clone(),
            kind: signal.kind.clone(),
            severity: signal.severity,
        });

        self.store.fraud_signals.put(signal);

        Ok(alert.into_iter().map(|k| self.emit(k)).collect())
    }
}
