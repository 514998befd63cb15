use chrono::{DateTime, Duration, Utc};

use crate::events::EventKind;
use crate::thresholds::CERTIFICATION_WARNING_DAYS;
use crate::types::{TrainingValidation, UpcomingExpiry};

use super::ComplianceEngine;

impl ComplianceEngine {
    /// Evaluate a staff member's certifications against the current time.
    pub fn validate_training_certifications(&self, staff_id: &str) -> TrainingValidation {
        self.validate_training_certifications_at(staff_id, Utc::now())
    }

    /// Same as [`validate_training_certifications`](Self::validate_training_certifications)
    /// with an explicit clock.
    ///
    /// Expired certifications each append a `TrainingExpired` event. Expiry
    /// is evaluated on read; the certification stays on the staff record.
    pub fn validate_training_certifications_at(
        &self,
        staff_id: &str,
        now: DateTime<Utc>,
    ) -> TrainingValidation {
        let Some(member) = self.store.staff.get(staff_id) else {
            return TrainingValidation {
                staff_id: staff_id.to_string(),
                valid: false,
                expired: vec![],
                upcoming: vec![],
                reason: Some("Staff member not found".to_string()),
            };
        };

        let horizon = now + Duration::days(CERTIFICATION_WARNING_DAYS);
        let mut expired = Vec::new();
        let mut upcoming = Vec::new();

        for (module_id, expires_at) in &member.certifications {
            if *expires_at < now {
                expired.push(module_id.clone());
                self.emit(EventKind::TrainingExpired {
                    staff_id: member.id.clone(),
                    module_id: module_id.clone(),
                    expired_at: *expires_at,
                });
            } else if *expires_at <= horizon {
                upcoming.push(UpcomingExpiry {
                    module_id: module_id.clone(),
                    expires_at: *expires_at,
                });
            }
        }

        let reason = (!expired.is_empty())
            .then(|| format!("Expired certifications: {}", expired.join(", ")));

        TrainingValidation {
            staff_id: member.id,
            valid: expired.is_empty(),
            expired,
            upcoming,
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{engine, staff};
    use super::*;
    use crate::events::EventType;
    use crate::types::Role;

    #[test]
    fn test_expired_and_upcoming_split() {
        let engine = engine();
        let now = Utc::now();
        let mut member = staff("c1", Role::Crew);
        member
            .certifications
            .insert("food-hygiene".to_string(), now - Duration::days(1));
        member
            .certifications
            .insert("fire-safety".to_string(), now + Duration::days(10));
        member
            .certifications
            .insert("first-aid".to_string(), now + Duration::days(90));
        engine.ingest_staff(member).unwrap();

        let result = engine.validate_training_certifications_at("c1", now);
        assert!(!result.valid);
        assert_eq!(result.expired, vec!["food-hygiene".to_string()]);
        assert_eq!(result.upcoming.len(), 1);
        assert_eq!(result.upcoming[0].module_id, "fire-safety");
        assert_eq!(
            result.reason.as_deref(),
            Some("Expired certifications: food-hygiene")
        );
        assert_eq!(engine.events().count(EventType::TrainingExpired), 1);

        // Nothing is removed from the record.
        assert_eq!(engine.store().staff.get("c1").unwrap().certifications.len(), 3);
    }

    #[test]
    fn test_window_edges() {
        let engine = engine();
        let now = Utc::now();
        let mut member = staff("c1", Role::Crew);
        member.certifications.insert("now".to_string(), now);
        member
            .certifications
            .insert("edge".to_string(), now + Duration::days(CERTIFICATION_WARNING_DAYS));
        engine.ingest_staff(member).unwrap();

        let result = engine.validate_training_certifications_at("c1", now);
        assert!(result.valid);
        assert!(result.expired.is_empty());
        assert_eq!(result.upcoming.len(), 2);
    }

    #[test]
    fn test_unknown_staff() {
        let result = engine().validate_training_certifications("ghost");
        assert!(!result.valid);
        assert_eq!(result.reason.as_deref(), Some("Staff member not found"));
    }
}
