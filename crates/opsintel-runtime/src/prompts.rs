//! Prompts and response schemas for the analyses.
//!
//! Each analysis sends one user prompt: a fixed instruction block followed
//! by the data slice as JSON. The schema for the reply travels separately
//! through the gateway, which rejects anything that does not match it.

use serde_json::{json, Value as JsonValue};

pub const CLEANING_PROMPT: &str = r#"
## Task: Cleaning Compliance Review

Review the recent waste reports for this store location and judge how well
cleaning and hygiene standards are being kept. Waste logged as spoiled,
contaminated, or dropped often points at cleaning gaps.

Score 0-100 (100 = fully compliant). List concrete issues you can tie to
the data and practical recommendations for the shift team. Do not invent
issues the data does not support.
"#;

pub const FOOD_SAFETY_PROMPT: &str = r#"
## Task: Food Safety Review

Review the items close to expiry, the alerts raised in the last 24 hours,
and the equipment temperature readings from the last 24 hours.

Score 0-100 (100 = no food safety concerns). Report each issue with a
severity of low, medium, high, or critical. Use critical only for risks to
customer health that need action before the next service.
"#;

pub const THEFT_PROMPT: &str = r#"
## Task: Theft and Fraud Risk Review

Review the fraud and theft alerts from the last 7 days and the POS
transactions from the last 24 hours. Look for void, refund, discount and
no-sale patterns concentrated on particular staff or time windows.

Give a risk score 0-100 (100 = theft almost certainly occurring), the
patterns you see, and recommendations for the location manager.
"#;

pub const WASTE_PROMPT: &str = r#"
## Task: Waste Pattern Review

Review the waste reports from the last 7 days. Score waste control 0-100
(100 = minimal avoidable waste), total the reported value, name the
categories that dominate, and recommend how to reduce avoidable waste.
"#;

pub const INVENTORY_PROMPT: &str = r#"
## Task: Inventory Forecast

Review current inventory against par levels and expiry dates. Suggest
reorders with quantities, list items at risk of running out before the next
delivery, and give short recommendations.
"#;

pub const NARRATIVE_PROMPT: &str = r#"
## Task: Daily Operations Summary

Write a short plain-text briefing (at most 5 sentences) for the location
manager from the analysis results below. Lead with the most urgent risk.
Do not use markdown.
"#;

pub const TASK_PROMPT: &str = r#"
## Task: Autonomous Task Triage

Propose the next action for the operations task below. Give a confidence
between 0 and 1, say whether a manager must approve the action before it is
carried out, and explain your reasoning in one or two sentences.
"#;

pub const PHOTO_GUIDANCE_PROMPT: &str = r#"
## Task: Photo Verification Checklist

A staff member submitted a photo as evidence for the item below. You cannot
see the photo. List what a manager should check in the photo to verify it.
"#;

/// Instruction block followed by labelled JSON data sections.
pub fn build_prompt(instructions: &str, location_id: &str, sections: &[(&str, String)]) -> String {
    let mut prompt = String::with_capacity(instructions.len() + 256);
    prompt.push_str(instructions.trim());
    prompt.push_str("\n\nLocation: ");
    prompt.push_str(location_id);
    for (label, body) in sections {
        prompt.push_str("\n\n### ");
        prompt.push_str(label);
        prompt.push('\n');
        prompt.push_str(body);
    }
    prompt
}

fn string_list() -> JsonValue {
    json!({"type": "array", "items": {"type": "string"}})
}

fn score() -> JsonValue {
    json!({"type": "number", "minimum": 0, "maximum": 100})
}

pub fn cleaning_schema() -> JsonValue {
    json!({
        "type": "object",
        "required": ["score", "issues", "recommendations"],
        "properties": {
            "score": score(),
            "issues": string_list(),
            "recommendations": string_list()
        }
    })
}

pub fn food_safety_schema() -> JsonValue {
    json!({
        "type": "object",
        "required": ["score", "issues", "recommendations"],
        "properties": {
            "score": score(),
            "issues": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["description", "severity"],
                    "properties": {
                        "description": {"type": "string"},
                        "severity": {"enum": ["low", "medium", "high", "critical"]}
                    }
                }
            },
            "recommendations": string_list()
        }
    })
}

pub fn theft_schema() -> JsonValue {
    json!({
        "type": "object",
        "required": ["risk_score", "patterns", "recommendations"],
        "properties": {
            "risk_score": score(),
            "patterns": string_list(),
            "recommendations": string_list()
        }
    })
}

pub fn waste_schema() -> JsonValue {
    json!({
        "type": "object",
        "required": ["score", "total_value", "top_categories", "recommendations"],
        "properties": {
            "score": score(),
            "total_value": {"type": "number", "minimum": 0},
            "top_categories": string_list(),
            "recommendations": string_list()
        }
    })
}

pub fn inventory_schema() -> JsonValue {
    json!({
        "type": "object",
        "required": ["reorders", "stockout_risks", "recommendations"],
        "properties": {
            "reorders": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["item", "quantity"],
                    "properties": {
                        "item": {"type": "string"},
                        "quantity": {"type": "number", "minimum": 0},
                        "reason": {"type": "string"}
                    }
                }
            },
            "stockout_risks": string_list(),
            "recommendations": string_list()
        }
    })
}

pub fn task_decision_schema() -> JsonValue {
    json!({
        "type": "object",
        "required": ["proposed_action", "confidence", "requires_approval", "reasoning"],
        "properties": {
            "proposed_action": {"type": "string", "minLength": 1},
            "confidence": {"type": "number", "minimum": 0, "maximum": 1},
            "requires_approval": {"type": "boolean"},
            "reasoning": {"type": "string"}
        }
    })
}

pub fn photo_guidance_schema() -> JsonValue {
    json!({
        "type": "object",
        "required": ["checks"],
        "properties": {
            "checks": string_list()
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_prompt_layout() {
        let prompt = build_prompt(
            CLEANING_PROMPT,
            "loc-7",
            &[("Waste reports", "[]".to_string())],
        );
        assert!(prompt.starts_with("## Task: Cleaning Compliance Review"));
        assert!(prompt.contains("Location: loc-7"));
        assert!(prompt.ends_with("### Waste reports\n[]"));
    }

    #[test]
    fn test_schemas_compile() {
        for schema in [
            cleaning_schema(),
            food_safety_schema(),
            theft_schema(),
            waste_schema(),
            inventory_schema(),
            task_decision_schema(),
            photo_guidance_schema(),
        ] {
            assert!(jsonschema::validator_for(&schema).is_ok());
        }
    }
}
