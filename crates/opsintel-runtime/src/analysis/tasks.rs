//! Task triage and photo checks.

use serde::Deserialize;

use super::types::*;
use super::{to_json, AnalysisError, AnalysisOrchestrator};
use crate::prompts::{self, build_prompt};

#[derive(Debug, Default, Deserialize)]
struct PhotoGuidance {
    checks: Vec<String>,
}

const CLEANING_PHOTO_CHECKS: &[&str] = &[
    "Surfaces free of visible residue and debris",
    "Floors and drains clear",
    "Photo shows the named area and is recent",
];

const WASTE_PHOTO_CHECKS: &[&str] = &[
    "Item and quantity match the waste report",
    "Waste is in the correct disposal container",
    "Photo shows the named category and is recent",
];

impl AnalysisOrchestrator {
    /// Proposes an action for an operations task. Critical and emergency
    /// tasks always require approval, whatever the model says.
    pub async fn process_autonomous_task(&self, task: &AutonomousTask) -> TaskDecision {
        let result = self.triage(task).await;
        let mut decision = self.degrade("task", &task.location_id, result);

        decision.confidence = decision.confidence.clamp(0.0, 1.0);
        if task.priority.forces_approval() {
            decision.requires_approval = true;
        }

        tracing::debug!(
            task_id = %task.id,
            requires_approval = decision.requires_approval,
            confidence = decision.confidence,
            "Task decision made"
        );
        decision
    }

    async fn triage(&self, task: &AutonomousTask) -> Result<TaskDecision, AnalysisError> {
        let prompt = build_prompt(
            prompts::TASK_PROMPT,
            &task.location_id,
            &[("Task", to_json(task)?)],
        );
        Ok(self
            .gateway
            .generate_structured(&prompt, &prompts::task_decision_schema())
            .await?)
    }

    /// Text-only: the photo is never inspected. Returns what a manager
    /// should check when reviewing it.
    pub async fn verify_cleaning_photo(&self, task_name: &str, photo_ref: &str) -> PhotoVerification {
        let subject = format!("Cleaning task: {}", task_name);
        self.photo_check("cleaning_photo", &subject, photo_ref, CLEANING_PHOTO_CHECKS)
            .await
    }

    /// Text-only: the photo is never inspected.
    pub async fn analyze_waste_photo(&self, category: &str, photo_ref: &str) -> PhotoVerification {
        let subject = format!("Waste category: {}", category);
        self.photo_check("waste_photo", &subject, photo_ref, WASTE_PHOTO_CHECKS)
            .await
    }

    async fn photo_check(
        &self,
        analysis: &'static str,
        subject: &str,
        photo_ref: &str,
        fallback_checks: &[&str],
    ) -> PhotoVerification {
        let result = self.photo_guidance(subject).await;
        let mut checks = self.degrade(analysis, "*", result).checks;
        if checks.is_empty() {
            checks = fallback_checks.iter().map(|c| c.to_string()).collect();
        }

        PhotoVerification {
            subject: subject.to_string(),
            photo_ref: photo_ref.to_string(),
            inspected: false,
            requires_manual_review: true,
            checks,
        }
    }

    async fn photo_guidance(&self, subject: &str) -> Result<PhotoGuidance, AnalysisError> {
        let prompt = format!("{}\n\n{}", prompts::PHOTO_GUIDANCE_PROMPT.trim(), subject);
        Ok(self
            .gateway
            .generate_structured(&prompt, &prompts::photo_guidance_schema())
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::providers::ProviderError;
    use crate::repository::OperationsData;
    use crate::testing::ScriptedProvider;
    use std::sync::Arc;

    fn task(priority: TaskPriority) -> AutonomousTask {
        AutonomousTask {
            id: "task-1".to_string(),
            location_id: "loc-1".to_string(),
            title: "Replace fryer oil".to_string(),
            description: "Oil quality test failed".to_string(),
            priority,
            payload: serde_json::Value::Null,
        }
    }

    const CONFIDENT: &str = r#"{"proposed_action": "Schedule oil change before lunch", "confidence": 0.9, "requires_approval": false, "reasoning": "Routine maintenance"}"#;

    #[tokio::test]
    async fn test_normal_task_keeps_model_decision() {
        let provider = Arc::new(ScriptedProvider::always(CONFIDENT));
        let orchestrator = orchestrator(provider, OperationsData::default());

        let decision = orchestrator
            .process_autonomous_task(&task(TaskPriority::Normal))
            .await;
        assert_eq!(decision.proposed_action, "Schedule oil change before lunch");
        assert!(!decision.requires_approval);
        assert_eq!(decision.confidence, 0.9);
    }

    #[tokio::test]
    async fn test_task_payload_reaches_prompt() {
        let seen = Arc::new(parking_lot::Mutex::new(String::new()));
        let captured = seen.clone();
        let provider = Arc::new(ScriptedProvider::responding(move |prompt, _| {
            *captured.lock() = prompt.to_string();
            Ok(CONFIDENT.to_string())
        }));
        let orchestrator = orchestrator(provider, OperationsData::default());

        let task: AutonomousTask = serde_json::from_value(serde_json::json!({
            "id": "t1",
            "location_id": "loc-1",
            "title": "Fryer oil",
            "priority": "high",
            "payload": {"equipment": "fryer-3", "oil_tpm": 31}
        }))
        .unwrap();
        orchestrator.process_autonomous_task(&task).await;

        let prompt = seen.lock().clone();
        assert!(prompt.contains("fryer-3"));
        assert!(prompt.contains("oil_tpm"));
    }

    #[tokio::test]
    async fn test_critical_and_emergency_force_approval() {
        let provider = Arc::new(ScriptedProvider::always(CONFIDENT));
        let orchestrator = orchestrator(provider, OperationsData::default());

        for priority in [TaskPriority::Critical, TaskPriority::Emergency] {
            let decision = orchestrator.process_autonomous_task(&task(priority)).await;
            assert!(decision.requires_approval);
            assert_eq!(decision.confidence, 0.9);
        }
    }

    #[tokio::test]
    async fn test_task_default_escalates() {
        let provider = Arc::new(ScriptedProvider::failing(ProviderError::Unauthorized));
        let orchestrator = orchestrator(provider, OperationsData::default());

        let decision = orchestrator
            .process_autonomous_task(&task(TaskPriority::Low))
            .await;
        assert_eq!(decision.proposed_action, DEFAULT_TASK_ACTION);
        assert_eq!(decision.confidence, 0.0);
        assert!(decision.requires_approval);
    }

    #[tokio::test]
    async fn test_photo_stubs_never_inspect() {
        let provider = Arc::new(ScriptedProvider::always(
            r#"{"checks": ["Grease trap lid visible"]}"#,
        ));
        let orchestrator = orchestrator(provider, OperationsData::default());

        let cleaning = orchestrator
            .verify_cleaning_photo("Clean grease trap", "photos/123.jpg")
            .await;
        assert!(!cleaning.inspected);
        assert!(cleaning.requires_manual_review);
        assert_eq!(cleaning.checks, vec!["Grease trap lid visible"]);
        assert_eq!(cleaning.photo_ref, "photos/123.jpg");

        let waste = orchestrator.analyze_waste_photo("produce", "photos/456.jpg").await;
        assert!(!waste.inspected);
        assert_eq!(waste.subject, "Waste category: produce");
    }

    #[tokio::test]
    async fn test_photo_stub_falls_back_to_fixed_checks() {
        let provider = Arc::new(ScriptedProvider::always("not json"));
        let orchestrator = orchestrator(provider, OperationsData::default());

        let waste = orchestrator.analyze_waste_photo("dairy", "photos/9.jpg").await;
        assert!(!waste.inspected);
        assert_eq!(waste.checks.len(), WASTE_PHOTO_CHECKS.len());
        assert_eq!(orchestrator.usage().degraded, 1);
    }
}
