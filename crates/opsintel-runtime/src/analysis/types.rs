//! Analysis result shapes.
//!
//! Each `Default` impl is the documented degraded result: what an analysis
//! returns when its data or its generation call cannot be obtained.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

pub const DEFAULT_CLEANING_SCORE: f64 = 85.0;
pub const DEFAULT_FOOD_SAFETY_SCORE: f64 = 90.0;
pub const DEFAULT_THEFT_RISK: f64 = 10.0;
pub const DEFAULT_WASTE_SCORE: f64 = 80.0;
pub const DEFAULT_TASK_ACTION: &str = "Escalate to location manager for manual review";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleaningAnalysis {
    pub score: f64,
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
}

impl Default for CleaningAnalysis {
    fn default() -> Self {
        Self {
            score: DEFAULT_CLEANING_SCORE,
            issues: vec![],
            recommendations: vec![],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueSeverity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodSafetyIssue {
    pub description: String,
    pub severity: IssueSeverity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodSafetyAnalysis {
    pub score: f64,
    pub issues: Vec<FoodSafetyIssue>,
    pub recommendations: Vec<String>,
}

impl FoodSafetyAnalysis {
    pub fn has_critical_issue(&self) -> bool {
        self.issues
            .iter()
            .any(|i| i.severity == IssueSeverity::Critical)
    }
}

impl Default for FoodSafetyAnalysis {
    fn default() -> Self {
        Self {
            score: DEFAULT_FOOD_SAFETY_SCORE,
            issues: vec![],
            recommendations: vec![],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TheftRiskAnalysis {
    /// 0-100, higher is riskier
    pub risk_score: f64,
    pub patterns: Vec<String>,
    pub recommendations: Vec<String>,
}

impl Default for TheftRiskAnalysis {
    fn default() -> Self {
        Self {
            risk_score: DEFAULT_THEFT_RISK,
            patterns: vec![],
            recommendations: vec![],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WasteAnalysis {
    pub score: f64,
    pub total_value: f64,
    pub top_categories: Vec<String>,
    pub recommendations: Vec<String>,
}

impl Default for WasteAnalysis {
    fn default() -> Self {
        Self {
            score: DEFAULT_WASTE_SCORE,
            total_value: 0.0,
            top_categories: vec![],
            recommendations: vec![],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReorderSuggestion {
    pub item: String,
    pub quantity: f64,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InventoryForecast {
    pub reorders: Vec<ReorderSuggestion>,
    pub stockout_risks: Vec<String>,
    pub recommendations: Vec<String>,
}

/// Combined per-location report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySummary {
    pub location_id: String,
    pub cleaning: CleaningAnalysis,
    pub food_safety: FoodSafetyAnalysis,
    pub theft: TheftRiskAnalysis,
    pub waste: WasteAnalysis,
    pub inventory: InventoryForecast,

    /// Merged in analysis order, capped.
    pub recommendations: Vec<String>,

    /// 0.0-1.0
    pub risk_score: f64,
    pub narrative: String,
    pub generated_at: DateTime<Utc>,
}

/// Fleet health from a sample of locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthScore {
    pub overall: f64,
    pub cleaning: f64,
    pub food_safety: f64,
    pub theft_risk: f64,
    pub waste: f64,
    pub locations_sampled: usize,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    Normal,
    High,
    Critical,
    Emergency,
}

impl TaskPriority {
    /// Priorities whose actions always need a human sign-off.
    pub fn forces_approval(&self) -> bool {
        matches!(self, TaskPriority::Critical | TaskPriority::Emergency)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutonomousTask {
    pub id: String,
    pub location_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub priority: TaskPriority,
    /// Task-specific data, passed to the model as-is.
    #[serde(default, skip_serializing_if = "JsonValue::is_null")]
    pub payload: JsonValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDecision {
    pub proposed_action: String,
    /// 0.0-1.0
    pub confidence: f64,
    pub requires_approval: bool,
    pub reasoning: String,
}

impl Default for TaskDecision {
    fn default() -> Self {
        Self {
            proposed_action: DEFAULT_TASK_ACTION.to_string(),
            confidence: 0.0,
            requires_approval: true,
            reasoning: "Automated triage unavailable".to_string(),
        }
    }
}

/// Result of a photo check. The image itself is never inspected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoVerification {
    pub subject: String,
    pub photo_ref: String,
    /// Always false.
    pub inspected: bool,
    pub requires_manual_review: bool,
    /// What a manager should look for in the photo.
    pub checks: Vec<String>,
}
