//! Read-only operational data source for analyses.
//!
//! Analyses read through [`OperationsRepository`]; persistence lives outside
//! this crate. [`InMemoryRepository`] backs tests and the CLI.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use opsintel_core::{Location, Role, Severity};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum RepositoryError {
    #[error("Repository unavailable: {0}")]
    Unavailable(String),

    #[error("Query failed: {0}")]
    Query(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WasteReport {
    pub id: String,
    pub location_id: String,
    pub category: String,
    pub item: String,
    pub quantity: f64,
    #[serde(default)]
    pub unit: String,
    /// Cost of the wasted stock
    #[serde(default)]
    pub value: f64,
    #[serde(default)]
    pub reason: Option<String>,
    pub reported_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: String,
    pub location_id: String,
    pub name: String,
    pub quantity: f64,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub par_level: f64,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemperatureReading {
    pub id: String,
    pub location_id: String,
    pub equipment: String,
    pub value_celsius: f64,
    pub max_celsius: f64,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub location_id: String,
    /// e.g. "fraud", "theft", "temperature", "equipment"
    pub kind: String,
    pub severity: Severity,
    pub message: String,
    pub raised_at: DateTime<Utc>,
}

impl Alert {
    pub fn is_loss_related(&self) -> bool {
        let kind = self.kind.to_ascii_lowercase();
        kind.contains("fraud") || kind.contains("theft")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    pub id: String,
    pub location_id: String,
    pub name: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PosTransaction {
    pub id: String,
    pub location_id: String,
    pub employee_id: String,
    /// "sale", "void", "refund", "discount", "no_sale"
    pub kind: String,
    pub amount: f64,
    pub occurred_at: DateTime<Utc>,
}

/// Read-only queries the analyses need. Time-bounded queries return
/// records at or after `since`, in no particular order.
#[async_trait]
pub trait OperationsRepository: Send + Sync {
    async fn locations(&self) -> Result<Vec<Location>, RepositoryError>;

    async fn waste_reports(
        &self,
        location_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<WasteReport>, RepositoryError>;

    async fn inventory_items(&self, location_id: &str) -> Result<Vec<InventoryItem>, RepositoryError>;

    async fn temperature_readings(
        &self,
        location_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<TemperatureReading>, RepositoryError>;

    async fn alerts(
        &self,
        location_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Alert>, RepositoryError>;

    async fn employees(&self, location_id: &str) -> Result<Vec<Employee>, RepositoryError>;

    async fn pos_transactions(
        &self,
        location_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<PosTransaction>, RepositoryError>;
}

/// Snapshot contents of an [`InMemoryRepository`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OperationsData {
    pub locations: Vec<Location>,
    pub waste_reports: Vec<WasteReport>,
    pub inventory: Vec<InventoryItem>,
    pub temperature_readings: Vec<TemperatureReading>,
    pub alerts: Vec<Alert>,
    pub employees: Vec<Employee>,
    pub pos_transactions: Vec<PosTransaction>,
}

#[derive(Debug, Default)]
pub struct InMemoryRepository {
    data: RwLock<OperationsData>,
}

impl InMemoryRepository {
    pub fn new(data: OperationsData) -> Self {
        Self {
            data: RwLock::new(data),
        }
    }

    /// Apply an in-place edit to the backing data.
    pub fn update(&self, f: impl FnOnce(&mut OperationsData)) {
        f(&mut self.data.write());
    }
}

fn scoped<T: Clone>(
    rows: &[T],
    location_id: &str,
    location_of: impl Fn(&T) -> &str,
    keep: impl Fn(&T) -> bool,
) -> Vec<T> {
    rows.iter()
        .filter(|r| location_of(r) == location_id && keep(r))
        .cloned()
        .collect()
}

#[async_trait]
impl OperationsRepository for InMemoryRepository {
    async fn locations(&self) -> Result<Vec<Location>, RepositoryError> {
        Ok(self.data.read().locations.clone())
    }

    async fn waste_reports(
        &self,
        location_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<WasteReport>, RepositoryError> {
        let data = self.data.read();
        Ok(scoped(&data.waste_reports, location_id, |r| r.location_id.as_str(), |r| {
            r.reported_at >= since
        }))
    }

    async fn inventory_items(&self, location_id: &str) -> Result<Vec<InventoryItem>, RepositoryError> {
        let data = self.data.read();
        Ok(scoped(&data.inventory, location_id, |r| r.location_id.as_str(), |_| true))
    }

    async fn temperature_readings(
        &self,
        location_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<TemperatureReading>, RepositoryError> {
        let data = self.data.read();
        Ok(scoped(&data.temperature_readings, location_id, |r| r.location_id.as_str(), |r| {
            r.recorded_at >= since
        }))
    }

    async fn alerts(
        &self,
        location_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Alert>, RepositoryError> {
        let data = self.data.read();
        Ok(scoped(&data.alerts, location_id, |r| r.location_id.as_str(), |r| r.raised_at >= since))
    }

    async fn employees(&self, location_id: &str) -> Result<Vec<Employee>, RepositoryError> {
        let data = self.data.read();
        Ok(scoped(&data.employees, location_id, |r| r.location_id.as_str(), |_| true))
    }

    async fn pos_transactions(
        &self,
        location_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<PosTransaction>, RepositoryError> {
        let data = self.data.read();
        Ok(scoped(&data.pos_transactions, location_id, |r| r.location_id.as_str(), |r| {
            r.occurred_at >= since
        }))
    }
}
