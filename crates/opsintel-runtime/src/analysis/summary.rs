//! Daily summary and fleet health score.

use chrono::Utc;
use futures::future::join_all;
use serde_json::json;

use super::types::*;
use super::{to_json, AnalysisError, AnalysisOrchestrator};
use crate::prompts::{self, build_prompt};

/// Risk floor applied when food safety reports a critical issue.
const CRITICAL_FOOD_RISK: f64 = 0.8;

impl AnalysisOrchestrator {
    /// Runs the five analyses concurrently and narrates the result.
    pub async fn generate_daily_summary(&self, location_id: &str) -> DailySummary {
        let (cleaning, food_safety, theft, waste, inventory) = tokio::join!(
            self.analyze_cleaning_compliance(location_id),
            self.analyze_food_safety(location_id),
            self.analyze_theft_risk(location_id),
            self.analyze_waste_patterns(location_id),
            self.predict_inventory(location_id),
        );

        let recommendations = merge_recommendations(
            [
                &cleaning.recommendations,
                &food_safety.recommendations,
                &theft.recommendations,
                &waste.recommendations,
                &inventory.recommendations,
            ],
            self.settings.max_recommendations,
        );
        let risk_score = combined_risk(&cleaning, &food_safety, &theft);

        let mut summary = DailySummary {
            location_id: location_id.to_string(),
            cleaning,
            food_safety,
            theft,
            waste,
            inventory,
            recommendations,
            risk_score,
            narrative: String::new(),
            generated_at: Utc::now(),
        };

        let narrative = self.narrate(&summary).await;
        summary.narrative = self.degrade("narrative", location_id, narrative);
        if summary.narrative.is_empty() {
            summary.narrative = default_narrative(&summary);
        }

        tracing::info!(
            location_id,
            risk_score = summary.risk_score,
            recommendations = summary.recommendations.len(),
            "Daily summary generated"
        );
        summary
    }

    async fn narrate(&self, summary: &DailySummary) -> Result<String, AnalysisError> {
        let results = json!({
            "cleaning_score": summary.cleaning.score,
            "cleaning_issues": summary.cleaning.issues,
            "food_safety_score": summary.food_safety.score,
            "food_safety_issues": summary.food_safety.issues,
            "theft_risk": summary.theft.risk_score,
            "theft_patterns": summary.theft.patterns,
            "waste_score": summary.waste.score,
            "waste_value": summary.waste.total_value,
            "stockout_risks": summary.inventory.stockout_risks,
            "risk_score": summary.risk_score,
            "recommendations": summary.recommendations,
        });
        let prompt = build_prompt(
            prompts::NARRATIVE_PROMPT,
            &summary.location_id,
            &[("Analysis results", to_json(&results)?)],
        );
        let text = self.gateway.generate(&prompt).await?;
        Ok(text.trim().to_string())
    }

    /// Samples the first `health_sample_size` locations and averages their
    /// cleaning, food safety, theft and waste results.
    pub async fn global_health_score(&self) -> HealthScore {
        let locations = self.repository.locations().await.map_err(AnalysisError::from);
        let mut locations = self.degrade("health_score", "*", locations);
        locations.truncate(self.settings.health_sample_size);

        let samples = join_all(locations.iter().map(|location| async move {
            let id = location.id.as_str();
            let (cleaning, food_safety, theft, waste) = tokio::join!(
                self.analyze_cleaning_compliance(id),
                self.analyze_food_safety(id),
                self.analyze_theft_risk(id),
                self.analyze_waste_patterns(id),
            );
            [cleaning.score, food_safety.score, theft.risk_score, waste.score]
        }))
        .await;

        let health = health_from_samples(&samples);
        tracing::info!(
            overall = health.overall,
            locations_sampled = health.locations_sampled,
            "Global health score computed"
        );
        health
    }
}

/// Concatenate in order, dropping repeats, up to `cap` entries.
pub(crate) fn merge_recommendations<'a>(
    lists: impl IntoIterator<Item = &'a Vec<String>>,
    cap: usize,
) -> Vec<String> {
    let mut merged: Vec<String> = Vec::new();
    for recommendation in lists.into_iter().flatten() {
        if merged.len() == cap {
            break;
        }
        if !merged.contains(recommendation) {
            merged.push(recommendation.clone());
        }
    }
    merged
}

/// Highest of theft risk, a critical food safety floor, and the cleaning
/// shortfall, as a fraction in [0, 1].
pub(crate) fn combined_risk(
    cleaning: &CleaningAnalysis,
    food_safety: &FoodSafetyAnalysis,
    theft: &TheftRiskAnalysis,
) -> f64 {
    let food = if food_safety.has_critical_issue() {
        CRITICAL_FOOD_RISK
    } else {
        0.0
    };
    let risk = (theft.risk_score / 100.0)
        .max(food)
        .max((100.0 - cleaning.score) / 100.0);
    risk.clamp(0.0, 1.0)
}

fn default_narrative(summary: &DailySummary) -> String {
    format!(
        "Daily summary for {}: cleaning {:.0}/100, food safety {:.0}/100, theft risk {:.0}/100, \
         waste control {:.0}/100. Overall risk {:.2}. Automated narrative unavailable.",
        summary.location_id,
        summary.cleaning.score,
        summary.food_safety.score,
        summary.theft.risk_score,
        summary.waste.score,
        summary.risk_score,
    )
}

/// Each sample is `[cleaning, food_safety, theft_risk, waste]`.
fn health_from_samples(samples: &[[f64; 4]]) -> HealthScore {
    let mean = |index: usize, empty: f64| {
        if samples.is_empty() {
            empty
        } else {
            samples.iter().map(|s| s[index]).sum::<f64>() / samples.len() as f64
        }
    };

    let cleaning = mean(0, 100.0);
    let food_safety = mean(1, 100.0);
    let theft_risk = mean(2, 0.0);
    let waste = mean(3, 100.0);

    HealthScore {
        overall: (cleaning + food_safety + (100.0 - theft_risk) + waste) / 4.0,
        cleaning,
        food_safety,
        theft_risk,
        waste,
        locations_sampled: samples.len(),
        generated_at: Utc::now(),
    }
}
