//! Compliance Rule Engine.
//!
//! Deterministic predicates and state transitions over the [`DomainStore`].
//! Each rule family lives in its own module:
//!
//! - `ingest`: validated writes and their write-time events
//! - `shifts`: open/close gating
//! - `emergency`: plan lookup and dispatch
//! - `fraud`: trailing-window risk classification
//! - `supplier`: supplier compliance checks
//! - `training`: certification expiry checks
//!
//! Gating and compliance outcomes are returned as values. Only lookups of
//! missing records during mutations produce an [`EngineError`](crate::EngineError).

mod emergency;
mod fraud;
mod ingest;
mod shifts;
mod supplier;
mod training;

pub(crate) use ingest::Validate;

use std::sync::Arc;

use crate::events::{Event, EventId, EventKind, EventLog};
use crate::store::DomainStore;

/// The rule engine. Cheap to clone; clones share the store and the log.
#[derive(Clone)]
pub struct ComplianceEngine {
    store: Arc<DomainStore>,
    events: Arc<EventLog>,
}

impl ComplianceEngine {
    pub fn new(store: Arc<DomainStore>, events: Arc<EventLog>) -> Self {
        Self { store, events }
    }

    pub fn store(&self) -> &Arc<DomainStore> {
        &self.store
    }

    pub fn events(&self) -> &Arc<EventLog> {
        &self.events
    }

    /// Mark an event resolved by appending a resolution entry.
    ///
    /// The original entry is left untouched. Resolving an unknown or
    /// already-resolved event still appends.
    pub fn resolve_event(&self, event_id: EventId, actor_id: &str) -> Event {
        self.emit(EventKind::EventResolved {
            event_id,
            actor_id: actor_id.to_string(),
        })
    }

    fn emit(&self, kind: EventKind) -> Event {
        self.events.append(kind)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::types::{Location, Role, Shift, ShiftStatus, StaffMember};

    pub fn engine() -> ComplianceEngine {
        ComplianceEngine::new(Arc::new(DomainStore::new()), Arc::new(EventLog::new()))
    }

    pub fn location(id: &str) -> Location {
        Location {
            id: id.to_string(),
            name: format!("Store {}", id),
            region: None,
            address: None,
        }
    }

    pub fn staff(id: &str, role: Role) -> StaffMember {
        StaffMember {
            id: id.to_string(),
            name: id.to_uppercase(),
            location_id: Some("loc-1".to_string()),
            role,
            certifications: Default::default(),
            assigned_modules: vec![],
        }
    }

    pub fn shift(id: &str, staff: &[&str], required_crew: u32, required_managers: u32) -> Shift {
        Shift {
            id: id.to_string(),
            location_id: "loc-1".to_string(),
            assigned_staff: staff.iter().map(|s| s.to_string()).collect(),
            required_crew,
            required_managers,
            opening_checklist_completed: true,
            closing_checklist_completed: false,
            cleaning_completed: false,
            status: ShiftStatus::Scheduled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::engine;
    use super::*;
    use crate::events::EventType;

    #[test]
    fn test_resolve_event_appends() {
        let engine = engine();
        let original = engine.emit(EventKind::FraudAlert {
            signal_id: "f1".to_string(),
            location_id: "loc-1".to_string(),
            kind: "sweethearting".to_string(),
            severity: 9,
        });

        engine.resolve_event(original.id, "mgr-1");
        engine.resolve_event(original.id, "mgr-1");

        assert_eq!(engine.events().len(), 3);
        assert_eq!(engine.events().count(EventType::EventResolved), 2);
        assert!(engine.events().is_resolved(original.id));
    }
}
