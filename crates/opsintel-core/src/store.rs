//! Domain State Store.
//!
//! One keyed [`Table`] per entity kind with last-write-wins semantics.
//! The store is constructed by the caller and injected into the engine;
//! [`DomainStore::reset`] returns it to the empty state between tests.
//!
//! Tables are keyed by id in a `BTreeMap`, so listings are ordered by id
//! and identical inputs always produce identical outputs.

use parking_lot::RwLock;
use std::collections::BTreeMap;

use crate::types::{
    EmergencyPlan, EmergencyType, FoodSafetyRecord, FraudSignal, Incident, Location,
    QaInspection, Shift, StaffMember, Supplier, TrainingModule,
};

/// A record that can live in a [`Table`].
pub trait Entity: Clone + Send + Sync + 'static {
    /// Human-readable kind, used in errors and logs.
    const KIND: &'static str;

    fn id(&self) -> &str;

    /// Owning location, for entities scoped to one.
    fn location_id(&self) -> Option<&str> {
        None
    }
}

/// Keyed, last-write-wins collection of one entity kind.
pub struct Table<E: Entity> {
    rows: RwLock<BTreeMap<String, E>>,
}

impl<E: Entity> Table<E> {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(BTreeMap::new()),
        }
    }

    /// Insert or replace a record. Returns the replaced record, if any.
    pub fn put(&self, entity: E) -> Option<E> {
        let id = entity.id().to_string();
        let previous = self.rows.write().insert(id, entity);
        if previous.is_some() {
            tracing::debug!(kind = E::KIND, "Replaced existing record");
        }
        previous
    }

    pub fn get(&self, id: &str) -> Option<E> {
        self.rows.read().get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.rows.read().contains_key(id)
    }

    /// Apply an in-place update. Returns the updated record, or `None` if absent.
    pub fn update<F>(&self, id: &str, f: F) -> Option<E>
    where
        F: FnOnce(&mut E),
    {
        let mut rows = self.rows.write();
        let entity = rows.get_mut(id)?;
        f(entity);
        Some(entity.clone())
    }

    pub fn remove(&self, id: &str) -> Option<E> {
        self.rows.write().remove(id)
    }

    /// All records, ordered by id.
    pub fn all(&self) -> Vec<E> {
        self.rows.read().values().cloned().collect()
    }

    pub fn filter<P>(&self, predicate: P) -> Vec<E>
    where
        P: Fn(&E) -> bool,
    {
        self.rows
            .read()
            .values()
            .filter(|e| predicate(e))
            .cloned()
            .collect()
    }

    pub fn for_location(&self, location_id: &str) -> Vec<E> {
        self.filter(|e| e.location_id() == Some(location_id))
    }

    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }

    pub fn clear(&self) {
        self.rows.write().clear();
    }
}

impl<E: Entity> Default for Table<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// In-process repository for every entity kind.
#[derive(Default)]
pub struct DomainStore {
    pub staff: Table<StaffMember>,
    pub shifts: Table<Shift>,
    pub locations: Table<Location>,
    pub emergency_plans: Table<EmergencyPlan>,
    pub food_safety: Table<FoodSafetyRecord>,
    pub incidents: Table<Incident>,
    pub inspections: Table<QaInspection>,
    pub suppliers: Table<Supplier>,
    pub fraud_signals: Table<FraudSignal>,
    pub training_modules: Table<TrainingModule>,
}

impl DomainStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the plan for `(location_id, emergency_type)`.
    pub fn emergency_plan_for(
        &self,
        location_id: &str,
        emergency_type: EmergencyType,
    ) -> Option<EmergencyPlan> {
        self.emergency_plans
            .filter(|p| p.location_id == location_id && p.emergency_type == emergency_type)
            .into_iter()
            .next()
    }

    /// Drop every record in every table.
    pub fn reset(&self) {
        self.staff.clear();
        self.shifts.clear();
        self.locations.clear();
        self.emergency_plans.clear();
        self.food_safety.clear();
        self.incidents.clear();
        self.inspections.clear();
        self.suppliers.clear();
        self.fraud_signals.clear();
        self.training_modules.clear();
    }
}

macro_rules! impl_entity {
    ($ty:ty, $kind:literal) => {
        impl Entity for $ty {
            const KIND: &'static str = $kind;

            fn id(&self) -> &str {
                &self.id
            }
        }
    };
    ($ty:ty, $kind:literal, located) => {
        impl Entity for $ty {
            const KIND: &'static str = $kind;

            fn id(&self) -> &str {
                &self.id
            }

            fn location_id(&self) -> Option<&str> {
                Some(&self.location_id)
            }
        }
    };
}

impl_entity!(Location, "location");
impl_entity!(Supplier, "supplier");
impl_entity!(TrainingModule, "training module");
impl_entity!(Shift, "shift", located);
impl_entity!(EmergencyPlan, "emergency plan", located);
impl_entity!(FoodSafetyRecord, "food safety record", located);
impl_entity!(Incident, "incident", located);
impl_entity!(QaInspection, "QA inspection", located);
impl_entity!(FraudSignal, "fraud signal", located);

impl Entity for StaffMember {
    const KIND: &'static str = "staff member";

    fn id(&self) -> &str {
        &self.id
    }

    fn location_id(&self) -> Option<&str> {
        self.location_id.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;

    fn location(id: &str, name: &str) -> Location {
        Location {
            id: id.to_string(),
            name: name.to_string(),
            region: None,
            address: None,
        }
    }

    #[test]
    fn test_last_write_wins() {
        let table = Table::new();
        assert!(table.put(location("loc-1", "Old")).is_none());
        let replaced = table.put(location("loc-1", "New"));

        assert_eq!(replaced.unwrap().name, "Old");
        assert_eq!(table.get("loc-1").unwrap().name, "New");
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_update_missing_returns_none() {
        let table: Table<Location> = Table::new();
        assert!(table.update("nope", |l| l.name.clear()).is_none());
    }

    #[test]
    fn test_for_location_filters() {
        let store = DomainStore::new();
        store.staff.put(StaffMember {
            id: "s1".to_string(),
            name: "A".to_string(),
            location_id: Some("loc-1".to_string()),
            role: Role::Crew,
            certifications: Default::default(),
            assigned_modules: vec![],
        });
        store.staff.put(StaffMember {
            id: "s2".to_string(),
            name: "B".to_string(),
            location_id: None,
            role: Role::Crew,
            certifications: Default::default(),
            assigned_modules: vec![],
        });

        let at_loc = store.staff.for_location("loc-1");
        assert_eq!(at_loc.len(), 1);
        assert_eq!(at_loc[0].id, "s1");
    }

    #[test]
    fn test_reset_clears_all_tables() {
        let store = DomainStore::new();
        store.locations.put(location("loc-1", "Main"));
        store.reset();
        assert!(store.locations.is_empty());
    }

    #[test]
    fn test_emergency_plan_lookup() {
        let store = DomainStore::new();
        store.emergency_plans.put(EmergencyPlan {
            id: "p1".to_string(),
            location_id: "loc-1".to_string(),
            emergency_type: EmergencyType::Fire,
            steps: vec!["Evacuate".to_string()],
            responsible_roles: vec![Role::StoreManager],
        });

        assert!(store.emergency_plan_for("loc-1", EmergencyType::Fire).is_some());
        assert!(store.emergency_plan_for("loc-1", EmergencyType::Flood).is_none());
        assert!(store.emergency_plan_for("loc-2", EmergencyType::Fire).is_none());
    }
}
