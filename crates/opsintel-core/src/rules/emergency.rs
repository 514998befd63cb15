use crate::events::{Event, EventKind};
use crate::types::{EmergencyDispatch, EmergencyType};

use super::ComplianceEngine;

impl ComplianceEngine {
    /// Dispatch the location's plan for `emergency_type`.
    ///
    /// Without a plan nothing is dispatched and no event is appended.
    pub fn trigger_emergency(
        &self,
        location_id: &str,
        emergency_type: EmergencyType,
        actor_id: &str,
    ) -> EmergencyDispatch {
        let Some(plan) = self.store.emergency_plan_for(location_id, emergency_type) else {
            tracing::warn!(
                location_id,
                emergency_type = %emergency_type,
                "No emergency plan on file"
            );
            return EmergencyDispatch {
                triggered: false,
                steps: vec![],
                notify_roles: vec![],
            };
        };

        self.emit(EventKind::EmergencyTriggered {
            location_id: location_id.to_string(),
            emergency_type,
            plan_id: plan.id.clone(),
            steps: plan.steps.clone(),
            notify_roles: plan.responsible_roles.clone(),
            actor_id: actor_id.to_string(),
        });

        EmergencyDispatch {
            triggered: true,
            steps: plan.steps,
            notify_roles: plan.responsible_roles,
        }
    }

    /// Record that an emergency is over. Always appends.
    pub fn resolve_emergency(
        &self,
        location_id: &str,
        emergency_type: EmergencyType,
        actor_id: &str,
    ) -> Event {
        self.emit(EventKind::EmergencyResolved {
            location_id: location_id.to_string(),
            emergency_type,
            actor_id: actor_id.to_string(),
        })
    }
}
