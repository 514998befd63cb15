//! Domain records shared by the store, the rule engine and the KPI aggregator.
//!
//! Every entity is a plain serde record. Closed sets (roles, severities,
//! emergency types) are enums so invalid values are rejected at the
//! ingestion boundary instead of deep inside business logic.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::ValidationError;

/// Staff role. Everything except `Crew` counts as a manager for gating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Crew,
    ShiftManager,
    LocationManager,
    StoreManager,
}

impl Role {
    /// Whether this role satisfies a shift's manager requirement.
    pub fn is_manager(&self) -> bool {
        !matches!(self, Role::Crew)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Crew => "crew",
            Role::ShiftManager => "shift_manager",
            Role::LocationManager => "location_manager",
            Role::StoreManager => "store_manager",
        };
        f.write_str(name)
    }
}

/// A member of staff and their certification state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StaffMember {
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub location_id: Option<String>,

    pub role: Role,

    /// Training module id -> certification expiry
    #[serde(default)]
    pub certifications: BTreeMap<String, DateTime<Utc>>,

    /// Training modules the member is enrolled in
    #[serde(default)]
    pub assigned_modules: Vec<String>,
}

/// Lifecycle state of a shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShiftStatus {
    #[default]
    Scheduled,
    Open,
    Closed,
}

/// A staffed shift at a location.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Shift {
    pub id: String,
    pub location_id: String,

    #[serde(default)]
    pub assigned_staff: Vec<String>,

    #[serde(default)]
    pub required_crew: u32,

    #[serde(default)]
    pub required_managers: u32,

    #[serde(default)]
    pub opening_checklist_completed: bool,

    #[serde(default)]
    pub closing_checklist_completed: bool,

    #[serde(default)]
    pub cleaning_completed: bool,

    #[serde(default)]
    pub status: ShiftStatus,
}

/// A store location; the root for per-location aggregation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Location {
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub region: Option<String>,

    #[serde(default)]
    pub address: Option<String>,
}

/// Kinds of emergency a location keeps a response plan for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EmergencyType {
    Fire,
    Flood,
    PowerOutage,
    GasLeak,
    MedicalEmergency,
    SecurityThreat,
    FoodContamination,
    SevereWeather,
}

impl EmergencyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmergencyType::Fire => "FIRE",
            EmergencyType::Flood => "FLOOD",
            EmergencyType::PowerOutage => "POWER_OUTAGE",
            EmergencyType::GasLeak => "GAS_LEAK",
            EmergencyType::MedicalEmergency => "MEDICAL_EMERGENCY",
            EmergencyType::SecurityThreat => "SECURITY_THREAT",
            EmergencyType::FoodContamination => "FOOD_CONTAMINATION",
            EmergencyType::SevereWeather => "SEVERE_WEATHER",
        }
    }
}

impl fmt::Display for EmergencyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmergencyType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "FIRE" => Ok(EmergencyType::Fire),
            "FLOOD" => Ok(EmergencyType::Flood),
            "POWER_OUTAGE" => Ok(EmergencyType::PowerOutage),
            "GAS_LEAK" => Ok(EmergencyType::GasLeak),
            "MEDICAL_EMERGENCY" | "MEDICAL" => Ok(EmergencyType::MedicalEmergency),
            "SECURITY_THREAT" | "SECURITY" => Ok(EmergencyType::SecurityThreat),
            "FOOD_CONTAMINATION" => Ok(EmergencyType::FoodContamination),
            "SEVERE_WEATHER" => Ok(EmergencyType::SevereWeather),
            _ => Err(ValidationError::UnknownValue {
                field: "emergency_type",
                value: s.to_string(),
            }),
        }
    }
}

/// Static response plan for one emergency type at one location.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmergencyPlan {
    pub id: String,
    pub location_id: String,
    pub emergency_type: EmergencyType,

    /// Ordered response steps
    pub steps: Vec<String>,

    /// Roles to notify when the plan is triggered
    #[serde(default)]
    pub responsible_roles: Vec<Role>,
}

/// Typed payload of a food-safety record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FoodSafetyKind {
    TemperatureLog {
        equipment: String,
        value_celsius: f64,
        max_celsius: f64,
    },
    Recall {
        product: String,
        #[serde(default)]
        batch: Option<String>,
        reason: String,
    },
    HygieneCheck {
        item: String,
        passed: bool,
        #[serde(default)]
        notes: Option<String>,
    },
}

/// A food-safety observation recorded at a location.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FoodSafetyRecord {
    pub id: String,
    pub location_id: String,
    pub kind: FoodSafetyKind,

    #[serde(default = "Utc::now")]
    pub recorded_at: DateTime<Utc>,
}

impl FoodSafetyRecord {
    /// True for a temperature log whose reading exceeds its maximum.
    pub fn is_temperature_breach(&self) -> bool {
        match &self.kind {
            FoodSafetyKind::TemperatureLog {
                value_celsius,
                max_celsius,
                ..
            } => value_celsius > max_celsius,
            _ => false,
        }
    }
}

/// Ordered incident severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// High and critical incidents raise a security alert.
    pub fn is_high_risk(&self) -> bool {
        *self >= Severity::High
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentCategory {
    Allergy,
    Injury,
    Theft,
    Security,
    FoodSafety,
    CustomerComplaint,
    Equipment,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Incident {
    pub id: String,
    pub location_id: String,
    pub category: IncidentCategory,
    pub severity: Severity,

    #[serde(default)]
    pub description: String,

    #[serde(default = "Utc::now")]
    pub reported_at: DateTime<Utc>,
}

/// A quality-assurance inspection with a 0-100 score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QaInspection {
    pub id: String,
    pub location_id: String,
    pub score: f64,

    #[serde(default)]
    pub failed_items: Vec<String>,

    #[serde(default = "Utc::now")]
    pub inspected_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Supplier {
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub halal_certified: bool,

    /// 0-100
    pub audit_score: f64,

    #[serde(default)]
    pub certification_documents: Vec<String>,
}

/// A discrete observation suggesting theft or abuse. Severity is 0-10.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FraudSignal {
    pub id: String,
    pub location_id: String,

    /// Pattern name, e.g. "excessive_voids"
    pub kind: String,

    pub severity: u8,

    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrainingModule {
    pub id: String,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub description: Option<String>,

    /// How long a certification for this module stays valid
    #[serde(default)]
    pub validity_days: Option<u32>,
}

// ============================================================================
// Rule engine outcomes
// ============================================================================

/// Outcome of a gating check. A block is an expected result, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatingDecision {
    pub allowed: bool,
    pub reason: Option<String>,
}

impl GatingDecision {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    pub fn block(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }
}

/// Result of an open/close attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftTransition {
    pub success: bool,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergencyDispatch {
    pub triggered: bool,
    pub steps: Vec<String>,
    pub notify_roles: Vec<Role>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FraudRiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl FraudRiskLevel {
    /// Classify a mean signal severity.
    pub fn from_average(average: f64) -> Self {
        if average >= 8.0 {
            FraudRiskLevel::Critical
        } else if average >= 6.0 {
            FraudRiskLevel::High
        } else if average >= 4.0 {
            FraudRiskLevel::Medium
        } else {
            FraudRiskLevel::Low
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FraudAnalysis {
    pub location_id: String,
    pub risk_level: FraudRiskLevel,
    pub average_severity: f64,
    pub signal_count: usize,
    pub patterns: Vec<String>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierCompliance {
    pub supplier_id: String,
    pub compliant: bool,
    pub issues: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpcomingExpiry {
    pub module_id: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingValidation {
    pub staff_id: String,
    pub valid: bool,
    pub expired: Vec<String>,
    pub upcoming: Vec<UpcomingExpiry>,
    pub reason: Option<String>,
}
