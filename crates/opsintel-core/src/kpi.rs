//! KPI rollups over the Domain State Store.
//!
//! Location KPIs are computed on demand from the stored inspections,
//! incidents and fraud signals. The global dashboard is a pure reduction
//! over the location KPIs plus supplier compliance.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::events::{EventKind, EventLog};
use crate::store::DomainStore;
use crate::thresholds::{
    DEFAULT_QA_SCORE, DEFAULT_SUPPLIER_COMPLIANCE_PCT, FRAUD_ALERT_SEVERITY, QA_PASS_SCORE,
    SUPPLIER_MIN_AUDIT_SCORE,
};

/// Per-location indicators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationKpi {
    pub location_id: String,

    /// Mean inspection score; optimistic 100 with no inspections.
    pub avg_qa_score: f64,
    pub inspections: usize,
    pub total_incidents: usize,

    /// Incidents of High or Critical severity.
    pub high_risk_incidents: usize,

    /// Fraud signals at or above the alert severity.
    pub fraud_alerts: usize,
}

impl LocationKpi {
    pub fn is_below_qa_threshold(&self) -> bool {
        self.avg_qa_score < QA_PASS_SCORE
    }
}

/// Fleet-wide rollup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalKpiDashboard {
    pub locations: Vec<LocationKpi>,
    pub avg_qa_score: f64,
    pub total_incidents: usize,
    pub high_risk_incidents: usize,
    pub supplier_compliance_pct: f64,
    pub generated_at: DateTime<Utc>,
}

pub struct KpiAggregator {
    store: Arc<DomainStore>,
    events: Arc<EventLog>,
}

impl KpiAggregator {
    pub fn new(store: Arc<DomainStore>, events: Arc<EventLog>) -> Self {
        Self { store, events }
    }

    /// Compute the KPI for one location, appending a `KpiAlert` when the
    /// QA average is below the pass score.
    pub fn generate_location_kpi(&self, location_id: &str) -> LocationKpi {
        let kpi = self.compute_location_kpi(location_id);

        if kpi.is_below_qa_threshold() {
            tracing::warn!(
                location_id,
                avg_qa_score = kpi.avg_qa_score,
                "QA average below threshold"
            );
            self.events.append(EventKind::KpiAlert {
                kpi: kpi.clone(),
                reason: "Average QA score below threshold".to_string(),
            });
        }

        kpi
    }

    /// Roll up every stored location.
    pub fn generate_global_kpi_dashboard(&self) -> GlobalKpiDashboard {
        let locations: Vec<LocationKpi> = self
            .store
            .locations
            .all()
            .iter()
            .map(|l| self.generate_location_kpi(&l.id))
            .collect();

        let avg_qa_score = if locations.is_empty() {
            DEFAULT_QA_SCORE
        } else {
            locations.iter().map(|k| k.avg_qa_score).sum::<f64>() / locations.len() as f64
        };

        let suppliers = self.store.suppliers.all();
        let supplier_compliance_pct = if suppliers.is_empty() {
            DEFAULT_SUPPLIER_COMPLIANCE_PCT
        } else {
            let compliant = suppliers
                .iter()
                .filter(|s| s.halal_certified && s.audit_score >= SUPPLIER_MIN_AUDIT_SCORE)
                .count();
            compliant as f64 / suppliers.len() as f64 * 100.0
        };

        GlobalKpiDashboard {
            total_incidents: locations.iter().map(|k| k.total_incidents).sum(),
            high_risk_incidents: locations.iter().map(|k| k.high_risk_incidents).sum(),
            locations,
            avg_qa_score,
            supplier_compliance_pct,
            generated_at: Utc::now(),
        }
    }

    fn compute_location_kpi(&self, location_id: &str) -> LocationKpi {
        let inspections = self.store.inspections.for_location(location_id);
        let incidents = self.store.incidents.for_location(location_id);

        let avg_qa_score = if inspections.is_empty() {
            DEFAULT_QA_SCORE
        } else {
            inspections.iter().map(|i| i.score).sum::<f64>() / inspections.len() as f64
        };

        let fraud_alerts = self
            .store
            .fraud_signals
            .for_location(location_id)
            .iter()
            .filter(|s| s.severity >= FRAUD_ALERT_SEVERITY)
            .count();

        LocationKpi {
            location_id: location_id.to_string(),
            avg_qa_score,
            inspections: inspections.len(),
            total_incidents: incidents.len(),
            high_risk_incidents: incidents.iter().filter(|i| i.severity.is_high_risk()).count(),
            fraud_alerts,
        }
    }
}
