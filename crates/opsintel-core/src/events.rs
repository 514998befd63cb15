//! Append-only event log.
//!
//! Every notable decision of the rule engine and the KPI aggregator lands
//! here as a typed [`EventKind`]. Entries are never edited: resolving an
//! event appends an [`EventKind::EventResolved`] entry, and the `resolved`
//! flag is derived from those entries when the log is read.
//!
//! Subscribers registered with [`EventLog::subscribe`] are called after each
//! append, outside the log's lock.

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::kpi::LocationKpi;
use crate::types::{EmergencyType, IncidentCategory, Role, Severity};

/// Monotonic identifier assigned at append time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub u64);

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "evt-{:06}", self.0)
    }
}

/// The closed set of event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    TemperatureBreach,
    FoodRecall,
    SecurityAlert,
    AllergyIncident,
    AuditPassed,
    AuditFailed,
    FraudAlert,
    SupplierViolation,
    KpiAlert,
    ShiftOpened,
    ShiftClosed,
    ShiftOpeningBlocked,
    ShiftClosingBlocked,
    EmergencyTriggered,
    EmergencyResolved,
    TrainingExpired,
    EventResolved,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::TemperatureBreach => "temperature_breach",
            EventType::FoodRecall => "food_recall",
            EventType::SecurityAlert => "security_alert",
            EventType::AllergyIncident => "allergy_incident",
            EventType::AuditPassed => "audit_passed",
            EventType::AuditFailed => "audit_failed",
            EventType::FraudAlert => "fraud_alert",
            EventType::SupplierViolation => "supplier_violation",
            EventType::KpiAlert => "kpi_alert",
            EventType::ShiftOpened => "shift_opened",
            EventType::ShiftClosed => "shift_closed",
            EventType::ShiftOpeningBlocked => "shift_opening_blocked",
            EventType::ShiftClosingBlocked => "shift_closing_blocked",
            EventType::EmergencyTriggered => "emergency_triggered",
            EventType::EmergencyResolved => "emergency_resolved",
            EventType::TrainingExpired => "training_expired",
            EventType::EventResolved => "event_resolved",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EventType {
    type Err = crate::ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_value(serde_json::Value::String(s.to_string())).map_err(|_| {
            crate::ValidationError::UnknownValue {
                field: "event_type",
                value: s.to_string(),
            }
        })
    }
}

/// Which supplier rule was violated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SupplierViolation {
    MissingHalalCertification,
    LowAuditScore { score: f64, minimum: f64 },
}

/// Event payloads, one variant per [`EventType`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum EventKind {
    TemperatureBreach {
        record_id: String,
        location_id: String,
        equipment: String,
        value_celsius: f64,
        max_celsius: f64,
    },
    FoodRecall {
        record_id: String,
        location_id: String,
        product: String,
        batch: Option<String>,
        reason: String,
    },
    SecurityAlert {
        incident_id: String,
        location_id: String,
        category: IncidentCategory,
        severity: Severity,
    },
    AllergyIncident {
        incident_id: String,
        location_id: String,
        severity: Severity,
        description: String,
    },
    AuditPassed {
        inspection_id: String,
        location_id: String,
        score: f64,
    },
    AuditFailed {
        inspection_id: String,
        location_id: String,
        score: f64,
        failed_items: Vec<String>,
    },
    FraudAlert {
        signal_id: String,
        location_id: String,
        kind: String,
        severity: u8,
    },
    SupplierViolation {
        supplier_id: String,
        violation: SupplierViolation,
    },
    KpiAlert {
        kpi: LocationKpi,
        reason: String,
    },
    ShiftOpened {
        shift_id: String,
        location_id: String,
        actor_id: String,
    },
    ShiftClosed {
        shift_id: String,
        location_id: String,
        actor_id: String,
    },
    ShiftOpeningBlocked {
        shift_id: String,
        location_id: Option<String>,
        actor_id: String,
        reason: String,
    },
    ShiftClosingBlocked {
        shift_id: String,
        location_id: Option<String>,
        actor_id: String,
        reason: String,
    },
    EmergencyTriggered {
        location_id: String,
        emergency_type: EmergencyType,
        plan_id: String,
        steps: Vec<String>,
        notify_roles: Vec<Role>,
        actor_id: String,
    },
    EmergencyResolved {
        location_id: String,
        emergency_type: EmergencyType,
        actor_id: String,
    },
    TrainingExpired {
        staff_id: String,
        module_id: String,
        expired_at: DateTime<Utc>,
    },
    EventResolved {
        event_id: EventId,
        actor_id: String,
    },
}

impl EventKind {
    pub fn event_type(&self) -> EventType {
        match self {
            EventKind::TemperatureBreach { .. } => EventType::TemperatureBreach,
            EventKind::FoodRecall { .. } => EventType::FoodRecall,
            EventKind::SecurityAlert { .. } => EventType::SecurityAlert,
            EventKind::AllergyIncident { .. } => EventType::AllergyIncident,
            EventKind::AuditPassed { .. } => EventType::AuditPassed,
            EventKind::AuditFailed { .. } => EventType::AuditFailed,
            EventKind::FraudAlert { .. } => EventType::FraudAlert,
            EventKind::SupplierViolation { .. } => EventType::SupplierViolation,
            EventKind::KpiAlert { .. } => EventType::KpiAlert,
            EventKind::ShiftOpened { .. } => EventType::ShiftOpened,
            EventKind::ShiftClosed { .. } => EventType::ShiftClosed,
            EventKind::ShiftOpeningBlocked { .. } => EventType::ShiftOpeningBlocked,
            EventKind::ShiftClosingBlocked { .. } => EventType::ShiftClosingBlocked,
            EventKind::EmergencyTriggered { .. } => EventType::EmergencyTriggered,
            EventKind::EmergencyResolved { .. } => EventType::EmergencyResolved,
            EventKind::TrainingExpired { .. } => EventType::TrainingExpired,
            EventKind::EventResolved { .. } => EventType::EventResolved,
        }
    }

    /// Location the event concerns, when it has one.
    pub fn location_id(&self) -> Option<&str> {
        match self {
            EventKind::TemperatureBreach { location_id, .. }
            | EventKind::FoodRecall { location_id, .. }
            | EventKind::SecurityAlert { location_id, .. }
            | EventKind::AllergyIncident { location_id, .. }
            | EventKind::AuditPassed { location_id, .. }
            | EventKind::AuditFailed { location_id, .. }
            | EventKind::FraudAlert { location_id, .. }
            | EventKind::ShiftOpened { location_id, .. }
            | EventKind::ShiftClosed { location_id, .. }
            | EventKind::EmergencyTriggered { location_id, .. }
            | EventKind::EmergencyResolved { location_id, .. } => Some(location_id),
            EventKind::ShiftOpeningBlocked { location_id, .. }
            | EventKind::ShiftClosingBlocked { location_id, .. } => location_id.as_deref(),
            EventKind::KpiAlert { kpi, .. } => Some(&kpi.location_id),
            EventKind::SupplierViolation { .. }
            | EventKind::TrainingExpired { .. }
            | EventKind::EventResolved { .. } => None,
        }
    }
}

/// A single log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,

    #[serde(flatten)]
    pub kind: EventKind,

    pub timestamp: DateTime<Utc>,

    /// Derived on read from `EventResolved` entries; false as appended.
    #[serde(default)]
    pub resolved: bool,
}

impl Event {
    pub fn event_type(&self) -> EventType {
        self.kind.event_type()
    }
}

/// Receives every event after it is appended.
pub trait EventSubscriber: Send + Sync {
    fn on_event(&self, event: &Event);
}

/// Append-only, timestamped record of notable occurrences.
pub struct EventLog {
    entries: RwLock<Vec<Event>>,
    next_id: Mutex<u64>,
    subscribers: RwLock<Vec<Arc<dyn EventSubscriber>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            next_id: Mutex::new(1),
            subscribers: RwLock::new(Vec::new()),
        }
    }

    /// Append an event. Identical payloads always produce distinct entries.
    pub fn append(&self, kind: EventKind) -> Event {
        let event = {
            let mut entries = self.entries.write();
            let mut next_id = self.next_id.lock();
            let event = Event {
                id: EventId(*next_id),
                kind,
                timestamp: Utc::now(),
                resolved: false,
            };
            *next_id += 1;
            entries.push(event.clone());
            event
        };

        tracing::info!(
            event_id = %event.id,
            event_type = %event.event_type(),
            location_id = event.kind.location_id().unwrap_or("-"),
            "Event appended"
        );

        let subscribers = self.subscribers.read().clone();
        for subscriber in subscribers {
            subscriber.on_event(&event);
        }

        event
    }

    /// Register a subscriber for future appends.
    pub fn subscribe(&self, subscriber: Arc<dyn EventSubscriber>) {
        self.subscribers.write().push(subscriber);
    }

    /// All entries in append order, with `resolved` derived.
    pub fn events(&self) -> Vec<Event> {
        let entries = self.entries.read();
        let resolved = resolved_ids(&entries);
        entries
            .iter()
            .map(|e| {
                let mut event = e.clone();
                event.resolved = resolved.contains(&e.id);
                event
            })
            .collect()
    }

    pub fn by_type(&self, event_type: EventType) -> Vec<Event> {
        self.events()
            .into_iter()
            .filter(|e| e.event_type() == event_type)
            .collect()
    }

    pub fn for_location(&self, location_id: &str) -> Vec<Event> {
        self.events()
            .into_iter()
            .filter(|e| e.kind.location_id() == Some(location_id))
            .collect()
    }

    /// Entries that have not been resolved, excluding resolution entries.
    pub fn unresolved(&self) -> Vec<Event> {
        self.events()
            .into_iter()
            .filter(|e| !e.resolved && e.event_type() != EventType::EventResolved)
            .collect()
    }

    pub fn get(&self, id: EventId) -> Option<Event> {
        self.events().into_iter().find(|e| e.id == id)
    }

    pub fn is_resolved(&self, id: EventId) -> bool {
        resolved_ids(&self.entries.read()).contains(&id)
    }

    /// Number of entries of one type.
    pub fn count(&self, event_type: EventType) -> usize {
        self.entries
            .read()
            .iter()
            .filter(|e| e.event_type() == event_type)
            .count()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drop all entries and restart ids. Subscribers are kept.
    pub fn clear(&self) {
        self.entries.write().clear();
        *self.next_id.lock() = 1;
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

fn resolved_ids(entries: &[Event]) -> HashSet<EventId> {
    entries
        .iter()
        .filter_map(|e| match &e.kind {
            EventKind::EventResolved { event_id, .. } => Some(*event_id),
            _ => None,
        })
        .collect()
}
