//! Per-location analyses.

use chrono::{Duration, Utc};

use super::{latest, to_json, AnalysisError, AnalysisOrchestrator};
use super::types::*;
use crate::prompts::{self, build_prompt};
use crate::repository::WasteReport;

const WASTE_WINDOW_DAYS: i64 = 7;
const WASTE_LIMIT: usize = 50;
const EXPIRY_HORIZON_DAYS: i64 = 3;
const EXPIRING_LIMIT: usize = 50;
const RECENT_ALERT_LIMIT: usize = 20;
const TEMPERATURE_LIMIT: usize = 50;
const LOSS_ALERT_WINDOW_DAYS: i64 = 7;
const LOSS_ALERT_LIMIT: usize = 20;
const POS_LIMIT: usize = 50;
const INVENTORY_LIMIT: usize = 50;

impl AnalysisOrchestrator {
    /// Cleaning compliance judged from the last week of waste reports.
    pub async fn analyze_cleaning_compliance(&self, location_id: &str) -> CleaningAnalysis {
        let result = self.cleaning(location_id).await;
        self.degrade("cleaning", location_id, result)
    }

    pub async fn analyze_food_safety(&self, location_id: &str) -> FoodSafetyAnalysis {
        let result = self.food_safety(location_id).await;
        self.degrade("food_safety", location_id, result)
    }

    pub async fn analyze_theft_risk(&self, location_id: &str) -> TheftRiskAnalysis {
        let result = self.theft(location_id).await;
        self.degrade("theft", location_id, result)
    }

    pub async fn analyze_waste_patterns(&self, location_id: &str) -> WasteAnalysis {
        let result = self.waste(location_id).await;
        self.degrade("waste", location_id, result)
    }

    pub async fn predict_inventory(&self, location_id: &str) -> InventoryForecast {
        let result = self.inventory(location_id).await;
        self.degrade("inventory", location_id, result)
    }

    async fn recent_waste(&self, location_id: &str) -> Result<Vec<WasteReport>, AnalysisError> {
        let since = Utc::now() - Duration::days(WASTE_WINDOW_DAYS);
        let reports = self.repository.waste_reports(location_id, since).await?;
        Ok(latest(reports, WASTE_LIMIT, |r| r.reported_at))
    }

    async fn cleaning(&self, location_id: &str) -> Result<CleaningAnalysis, AnalysisError> {
        let reports = self.recent_waste(location_id).await?;
        let prompt = build_prompt(
            prompts::CLEANING_PROMPT,
            location_id,
            &[("Waste reports (last 7 days)", to_json(&reports)?)],
        );
        Ok(self
            .gateway
            .generate_structured(&prompt, &prompts::cleaning_schema())
            .await?)
    }

    async fn food_safety(&self, location_id: &str) -> Result<FoodSafetyAnalysis, AnalysisError> {
        let now = Utc::now();
        let day_ago = now - Duration::hours(24);
        let horizon = now + Duration::days(EXPIRY_HORIZON_DAYS);

        let mut expiring: Vec<_> = self
            .repository
            .inventory_items(location_id)
            .await?
            .into_iter()
            .filter(|item| item.expires_at.is_some_and(|at| at <= horizon))
            .collect();
        expiring.sort_by_key(|item| item.expires_at);
        expiring.truncate(EXPIRING_LIMIT);

        let alerts = latest(
            self.repository.alerts(location_id, day_ago).await?,
            RECENT_ALERT_LIMIT,
            |a| a.raised_at,
        );
        let readings = latest(
            self.repository.temperature_readings(location_id, day_ago).await?,
            TEMPERATURE_LIMIT,
            |r| r.recorded_at,
        );

        let prompt = build_prompt(
            prompts::FOOD_SAFETY_PROMPT,
            location_id,
            &[
                ("Items expiring within 3 days", to_json(&expiring)?),
                ("Alerts (last 24 hours)", to_json(&alerts)?),
                ("Temperature readings (last 24 hours)", to_json(&readings)?),
            ],
        );
        Ok(self
            .gateway
            .generate_structured(&prompt, &prompts::food_safety_schema())
            .await?)
    }

    async fn theft(&self, location_id: &str) -> Result<TheftRiskAnalysis, AnalysisError> {
        let now = Utc::now();

        let alerts: Vec<_> = self
            .repository
            .alerts(location_id, now - Duration::days(LOSS_ALERT_WINDOW_DAYS))
            .await?
            .into_iter()
            .filter(|a| a.is_loss_related())
            .collect();
        let alerts = latest(alerts, LOSS_ALERT_LIMIT, |a| a.raised_at);

        let transactions = latest(
            self.repository
                .pos_transactions(location_id, now - Duration::hours(24))
                .await?,
            POS_LIMIT,
            |t| t.occurred_at,
        );

        let prompt = build_prompt(
            prompts::THEFT_PROMPT,
            location_id,
            &[
                ("Fraud and theft alerts (last 7 days)", to_json(&alerts)?),
                ("POS transactions (last 24 hours)", to_json(&transactions)?),
            ],
        );
        Ok(self
            .gateway
            .generate_structured(&prompt, &prompts::theft_schema())
            .await?)
    }

    async fn waste(&self, location_id: &str) -> Result<WasteAnalysis, AnalysisError> {
        let reports = self.recent_waste(location_id).await?;
        let prompt = build_prompt(
            prompts::WASTE_PROMPT,
            location_id,
            &[("Waste reports (last 7 days)", to_json(&reports)?)],
        );
        Ok(self
            .gateway
            .generate_structured(&prompt, &prompts::waste_schema())
            .await?)
    }

    async fn inventory(&self, location_id: &str) -> Result<InventoryForecast, AnalysisError> {
        let mut items = self.repository.inventory_items(location_id).await?;
        items.truncate(INVENTORY_LIMIT);

        let prompt = build_prompt(
            prompts::INVENTORY_PROMPT,
            location_id,
            &[("Current inventory", to_json(&items)?)],
        );
        Ok(self
            .gateway
            .generate_structured(&prompt, &prompts::inventory_schema())
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::providers::ProviderError;
    use crate::repository::{Alert, InventoryItem, OperationsData, PosTransaction};
    use crate::testing::ScriptedProvider;
    use opsintel_core::Severity;
    use std::sync::Arc;

    fn waste_report(id: usize, hours_ago: i64) -> WasteReport {
        WasteReport {
            id: format!("w{}", id),
            location_id: "loc-1".to_string(),
            category: "produce".to_string(),
            item: "lettuce".to_string(),
            quantity: 1.0,
            unit: "kg".to_string(),
            value: 3.0,
            reason: Some("spoiled".to_string()),
            reported_at: Utc::now() - Duration::hours(hours_ago),
        }
    }

    fn item(id: &str, expires_in_days: Option<i64>) -> InventoryItem {
        InventoryItem {
            id: id.to_string(),
            location_id: "loc-1".to_string(),
            name: format!("item {}", id),
            quantity: 4.0,
            unit: "case".to_string(),
            par_level: 10.0,
            expires_at: expires_in_days.map(|d| Utc::now() + Duration::days(d)),
        }
    }

    fn alert(id: &str, kind: &str, hours_ago: i64) -> Alert {
        Alert {
            id: id.to_string(),
            location_id: "loc-1".to_string(),
            kind: kind.to_string(),
            severity: Severity::High,
            message: format!("{} alert", kind),
            raised_at: Utc::now() - Duration::hours(hours_ago),
        }
    }

    #[tokio::test]
    async fn test_cleaning_parses_structured_reply() {
        let provider = Arc::new(ScriptedProvider::always(
            r#"{"score": 62, "issues": ["Spoiled produce logged daily"], "recommendations": ["Deep clean walk-in"]}"#,
        ));
        let orchestrator = orchestrator(provider.clone(), OperationsData::default());

        let analysis = orchestrator.analyze_cleaning_compliance("loc-1").await;
        assert_eq!(analysis.score, 62.0);
        assert_eq!(analysis.issues, vec!["Spoiled produce logged daily"]);
        assert_eq!(provider.calls(), 1);
        assert_eq!(orchestrator.usage().degraded, 0);
    }

    #[tokio::test]
    async fn test_cleaning_prompt_bounded_to_fifty_recent_reports() {
        let provider = Arc::new(ScriptedProvider::responding(|prompt, _| {
            let count = prompt.matches("\"id\": \"w").count();
            assert_eq!(count, 50);
            assert!(!prompt.contains("\"w59\""));
            Ok(r#"{"score": 90, "issues": [], "recommendations": []}"#.to_string())
        }));
        let mut data = OperationsData::default();
        data.waste_reports = (0..60).map(|i| waste_report(i, i as i64)).collect();
        data.waste_reports.push(waste_report(999, 24 * 8));
        let orchestrator = orchestrator(provider, data);

        let analysis = orchestrator.analyze_cleaning_compliance("loc-1").await;
        assert_eq!(analysis.score, 90.0);
    }

    #[tokio::test]
    async fn test_cleaning_degrades_on_invalid_reply() {
        let provider = Arc::new(ScriptedProvider::always(r#"{"score": 250}"#));
        let orchestrator = orchestrator(provider.clone(), OperationsData::default());

        let analysis = orchestrator.analyze_cleaning_compliance("loc-1").await;
        assert_eq!(analysis, CleaningAnalysis::default());
        assert_eq!(analysis.score, DEFAULT_CLEANING_SCORE);
        assert_eq!(provider.calls(), 1);
        assert_eq!(orchestrator.usage().degraded, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_defaults_when_quota_exhausted() {
        let provider = Arc::new(ScriptedProvider::failing(ProviderError::RateLimited {
            retry_after: None,
        }));
        let orchestrator = orchestrator(provider, OperationsData::default());

        assert_eq!(
            orchestrator.analyze_food_safety("loc-1").await.score,
            DEFAULT_FOOD_SAFETY_SCORE
        );
        assert_eq!(
            orchestrator.analyze_theft_risk("loc-1").await.risk_score,
            DEFAULT_THEFT_RISK
        );
        let waste = orchestrator.analyze_waste_patterns("loc-1").await;
        assert_eq!(waste.score, DEFAULT_WASTE_SCORE);
        assert_eq!(waste.total_value, 0.0);
        assert!(waste.top_categories.is_empty());
        assert_eq!(
            orchestrator.predict_inventory("loc-1").await,
            InventoryForecast::default()
        );
        assert_eq!(orchestrator.usage().degraded, 4);
    }

    #[tokio::test]
    async fn test_food_safety_slices_expiring_items_and_recent_alerts() {
        let provider = Arc::new(ScriptedProvider::responding(|prompt, _| {
            assert!(prompt.contains("\"soon\""));
            assert!(prompt.contains("\"expired\""));
            assert!(!prompt.contains("\"later\""));
            assert!(!prompt.contains("\"no-date\""));
            assert!(prompt.contains("\"a-new\""));
            assert!(!prompt.contains("\"a-old\""));
            Ok(r#"{"score": 40, "issues": [{"description": "Walk-in cooler at 9C", "severity": "critical"}], "recommendations": ["Move stock"]}"#.to_string())
        }));
        let data = OperationsData {
            inventory: vec![
                item("soon", Some(2)),
                item("expired", Some(-1)),
                item("later", Some(10)),
                item("no-date", None),
            ],
            alerts: vec![alert("a-new", "temperature", 2), alert("a-old", "temperature", 30)],
            ..Default::default()
        };
        let orchestrator = orchestrator(provider, data);

        let analysis = orchestrator.analyze_food_safety("loc-1").await;
        assert_eq!(analysis.score, 40.0);
        assert!(analysis.has_critical_issue());
    }

    #[tokio::test]
    async fn test_theft_uses_only_loss_alerts() {
        let provider = Arc::new(ScriptedProvider::responding(|prompt, _| {
            assert!(prompt.contains("\"f1\""));
            assert!(!prompt.contains("\"t1\""));
            assert!(prompt.contains("\"p1\""));
            Ok(r#"{"risk_score": 72, "patterns": ["Voids clustered at close"], "recommendations": []}"#.to_string())
        }));
        let data = OperationsData {
            alerts: vec![alert("f1", "fraud", 48), alert("t1", "temperature", 1)],
            pos_transactions: vec![PosTransaction {
                id: "p1".to_string(),
                location_id: "loc-1".to_string(),
                employee_id: "emp-1".to_string(),
                kind: "void".to_string(),
                amount: 18.5,
                occurred_at: Utc::now() - Duration::hours(1),
            }],
            ..Default::default()
        };
        let orchestrator = orchestrator(provider, data);

        let analysis = orchestrator.analyze_theft_risk("loc-1").await;
        assert_eq!(analysis.risk_score, 72.0);
        assert_eq!(analysis.patterns, vec!["Voids clustered at close"]);
    }

    #[tokio::test]
    async fn test_inventory_forecast() {
        let provider = Arc::new(ScriptedProvider::always(
            r#"{"reorders": [{"item": "buns", "quantity": 12}], "stockout_risks": ["buns"], "recommendations": ["Raise bun par"]}"#,
        ));
        let orchestrator = orchestrator(
            provider,
            OperationsData {
                inventory: vec![item("buns", None)],
                ..Default::default()
            },
        );

        let forecast = orchestrator.predict_inventory("loc-1").await;
        assert_eq!(forecast.reorders.len(), 1);
        assert_eq!(forecast.reorders[0].item, "buns");
        assert_eq!(forecast.reorders[0].reason, None);
        assert_eq!(forecast.stockout_risks, vec!["buns"]);
    }
}
