//! Shift open/close gating.
//!
//! Opening requires the assigned staff to meet both role minimums and the
//! opening checklist to be complete. Closing requires the closing checklist
//! and cleaning; staffing is not re-checked on close.

use crate::events::EventKind;
use crate::types::{GatingDecision, Shift, ShiftStatus, ShiftTransition};
use crate::EngineError;

use super::ComplianceEngine;

/// Crew and manager head-counts for an assignment list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct RoleCounts {
    pub crew: u32,
    pub managers: u32,
}

impl ComplianceEngine {
    fn role_counts(&self, shift: &Shift) -> RoleCounts {
        // Assignments that do not resolve to a staff member are not counted.
        shift
            .assigned_staff
            .iter()
            .filter_map(|id| self.store.staff.get(id))
            .fold(RoleCounts::default(), |mut counts, member| {
                if member.role.is_manager() {
                    counts.managers += 1;
                } else {
                    counts.crew += 1;
                }
                counts
            })
    }

    /// Check whether a shift may open.
    pub fn can_open_shift(&self, shift_id: &str) -> GatingDecision {
        let Some(shift) = self.store.shifts.get(shift_id) else {
            return GatingDecision::block("Shift not found");
        };

        let counts = self.role_counts(&shift);

        if counts.crew < shift.required_crew {
            return GatingDecision::block(format!(
                "Insufficient crew: {}/{}",
                counts.crew, shift.required_crew
            ));
        }

        if counts.managers < shift.required_managers {
            return GatingDecision::block(format!(
                "Insufficient managers: {}/{}",
                counts.managers, shift.required_managers
            ));
        }

        if !shift.opening_checklist_completed {
            return GatingDecision::block("Opening checklist not completed");
        }

        GatingDecision::allow()
    }

    /// Check whether a shift may close.
    pub fn can_close_shift(&self, shift_id: &str) -> GatingDecision {
        let Some(shift) = self.store.shifts.get(shift_id) else {
            return GatingDecision::block("Shift not found");
        };

        if !shift.closing_checklist_completed {
            return GatingDecision::block("Closing checklist not completed");
        }

        if !shift.cleaning_completed {
            return GatingDecision::block("Cleaning not completed");
        }

        GatingDecision::allow()
    }

    /// Open a shift, re-validating the gate. Blocks are logged as events.
    pub fn open_shift(&self, shift_id: &str, actor_id: &str) -> ShiftTransition {
        let decision = self.can_open_shift(shift_id);
        let location_id = self.store.shifts.get(shift_id).map(|s| s.location_id);

        if let Some(reason) = decision.reason.filter(|_| !decision.allowed) {
            tracing::warn!(shift_id, actor_id, reason = %reason, "Shift opening blocked");
            self.emit(EventKind::ShiftOpeningBlocked {
                shift_id: shift_id.to_string(),
                location_id,
                actor_id: actor_id.to_string(),
                reason: reason.clone(),
            });
            return ShiftTransition {
                success: false,
                reason: Some(reason),
            };
        }

        self.store
            .shifts
            .update(shift_id, |s| s.status = ShiftStatus::Open);
        self.emit(EventKind::ShiftOpened {
            shift_id: shift_id.to_string(),
            location_id: location_id.unwrap_or_default(),
            actor_id: actor_id.to_string(),
        });

        ShiftTransition {
            success: true,
            reason: None,
        }
    }

    /// Close a shift, re-validating the gate. Blocks are logged as events.
    pub fn close_shift(&self, shift_id: &str, actor_id: &str) -> ShiftTransition {
        let decision = self.can_close_shift(shift_id);
        let location_id = self.store.shifts.get(shift_id).map(|s| s.location_id);

        if let Some(reason) = decision.reason.filter(|_| !decision.allowed) {
            tracing::warn!(shift_id, actor_id, reason = %reason, "Shift closing blocked");
            self.emit(EventKind::ShiftClosingBlocked {
                shift_id: shift_id.to_string(),
                location_id,
                actor_id: actor_id.to_string(),
                reason: reason.clone(),
            });
            return ShiftTransition {
                success: false,
                reason: Some(reason),
            };
        }

        self.store
            .shifts
            .update(shift_id, |s| s.status = ShiftStatus::Closed);
        self.emit(EventKind::ShiftClosed {
            shift_id: shift_id.to_string(),
            location_id: location_id.unwrap_or_default(),
            actor_id: actor_id.to_string(),
        });

        ShiftTransition {
            success: true,
            reason: None,
        }
    }

    /// Add a staff member to a shift's assignment list (idempotent).
    pub fn assign_staff(&self, shift_id: &str, staff_id: &str) -> Result<Shift, EngineError> {
        if !self.store.staff.contains(staff_id) {
            return Err(EngineError::not_found("staff member", staff_id));
        }
        self.store
            .shifts
            .update(shift_id, |s| {
                if !s.assigned_staff.iter().any(|id| id == staff_id) {
                    s.assigned_staff.push(staff_id.to_string());
                }
            })
            .ok_or_else(|| EngineError::not_found("shift", shift_id))
    }

    pub fn complete_opening_checklist(&self, shift_id: &str) -> Result<Shift, EngineError> {
        self.store
            .shifts
            .update(shift_id, |s| s.opening_checklist_completed = true)
            .ok_or_else(|| EngineError::not_found("shift", shift_id))
    }

    pub fn complete_closing_checklist(&self, shift_id: &str) -> Result<Shift, EngineError> {
        self.store
            .shifts
            .update(shift_id, |s| s.closing_checklist_completed = true)
            .ok_or_else(|| EngineError::not_found("shift", shift_id))
    }

    pub fn mark_cleaning_completed(&self, shift_id: &str) -> Result<Shift, EngineError> {
        self.store
            .shifts
            .update(shift_id, |s| s.cleaning_completed = true)
            .ok_or_else(|| EngineError::not_found("shift", shift_id))
    }
}
