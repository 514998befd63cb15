use chrono::{DateTime, Duration, Utc};

use crate::thresholds::FRAUD_WINDOW_DAYS;
use crate::types::{FraudAnalysis, FraudRiskLevel};

use super::ComplianceEngine;

const FRAUD_RECOMMENDATIONS: &[&str] = &[
    "Review POS audit trail for flagged transactions",
    "Increase manager oversight on voids and refunds",
    "Verify cash drawer counts at every shift change",
    "Review CCTV footage for flagged time windows",
];

const ROUTINE_MONITORING: &str = "Continue routine monitoring";

impl ComplianceEngine {
    /// Classify fraud risk from the signals of the trailing seven days.
    pub fn analyze_fraud_patterns(&self, location_id: &str) -> FraudAnalysis {
        self.analyze_fraud_patterns_at(location_id, Utc::now())
    }

    /// Same as [`analyze_fraud_patterns`](Self::analyze_fraud_patterns) with an explicit clock.
    pub fn analyze_fraud_patterns_at(&self, location_id: &str, now: DateTime<Utc>) -> FraudAnalysis {
        let window_start = now - Duration::days(FRAUD_WINDOW_DAYS);

        let mut signals: Vec<_> = self
            .store
            .fraud_signals
            .for_location(location_id)
            .into_iter()
            .filter(|s| s.timestamp > window_start)
            .collect();
        signals.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));

        let average_severity = if signals.is_empty() {
            0.0
        } else {
            signals.iter().map(|s| f64::from(s.severity)).sum::<f64>() / signals.len() as f64
        };

        let mut patterns: Vec<String> = Vec::new();
        for signal in &signals {
            if !patterns.contains(&signal.kind) {
                patterns.push(signal.kind.clone());
            }
        }

        let recommendations = if patterns.is_empty() {
            vec![ROUTINE_MONITORING.to_string()]
        } else {
            FRAUD_RECOMMENDATIONS.iter().map(|r| r.to_string()).collect()
        };

        let risk_level = FraudRiskLevel::from_average(average_severity);
        tracing::debug!(
            location_id,
            signal_count = signals.len(),
            average_severity,
            ?risk_level,
            "Fraud patterns analyzed"
        );

        FraudAnalysis {
            location_id: location_id.to_string(),
            risk_level,
            average_severity,
            signal_count: signals.len(),
            patterns,
            recommendations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::engine;
    use super::*;
    use crate::types::FraudSignal;
    use proptest::prelude::*;

    fn signal(id: &str, kind: &str, severity: u8, at: DateTime<Utc>) -> FraudSignal {
        FraudSignal {
            id: id.to_string(),
            location_id: "loc-1".to_string(),
            kind: kind.to_string(),
            severity,
            timestamp: at,
        }
    }

    #[test]
    fn test_high_severities_are_critical() {
        let engine = engine();
        let now = Utc::now();
        for (i, sev) in [9u8, 8, 9].iter().enumerate() {
            let at = now - Duration::hours(i as i64 + 1);
            engine
                .ingest_fraud_signal(signal(&format!("f{}", i), "excessive_voids", *sev, at))
                .unwrap();
        }

        let analysis = engine.analyze_fraud_patterns_at("loc-1", now);
        assert_eq!(analysis.risk_level, FraudRiskLevel::Critical);
        assert_eq!(analysis.signal_count, 3);
        assert_eq!(analysis.patterns, vec!["excessive_voids".to_string()]);
        assert_eq!(analysis.recommendations.len(), FRAUD_RECOMMENDATIONS.len());
    }

    #[test]
    fn test_moderate_severities_are_medium() {
        let engine = engine();
        let now = Utc::now();
        engine
            .ingest_fraud_signal(signal("f1", "refund_abuse", 5, now - Duration::hours(2)))
            .unwrap();
        engine
            .ingest_fraud_signal(signal("f2", "sweethearting", 5, now - Duration::hours(1)))
            .unwrap();

        let analysis = engine.analyze_fraud_patterns_at("loc-1", now);
        assert_eq!(analysis.risk_level, FraudRiskLevel::Medium);
        assert_eq!(analysis.average_severity, 5.0);
        assert_eq!(
            analysis.patterns,
            vec!["refund_abuse".to_string(), "sweethearting".to_string()]
        );
    }

    #[test]
    fn test_no_signals_is_routine() {
        let analysis = engine().analyze_fraud_patterns("loc-1");
        assert_eq!(analysis.risk_level, FraudRiskLevel::Low);
        assert_eq!(analysis.average_severity, 0.0);
        assert!(analysis.patterns.is_empty());
        assert_eq!(analysis.recommendations, vec![ROUTINE_MONITORING.to_string()]);
    }

    #[test]
    fn test_window_excludes_old_and_boundary_signals() {
        let engine = engine();
        let now = Utc::now();
        engine
            .ingest_fraud_signal(signal("old", "till_shortage", 10, now - Duration::days(8)))
            .unwrap();
        engine
            .ingest_fraud_signal(signal("edge", "till_shortage", 10, now - Duration::days(7)))
            .unwrap();
        engine
            .ingest_fraud_signal(signal("new", "refund_abuse", 2, now - Duration::days(1)))
            .unwrap();

        let analysis = engine.analyze_fraud_patterns_at("loc-1", now);
        assert_eq!(analysis.signal_count, 1);
        assert_eq!(analysis.risk_level, FraudRiskLevel::Low);
    }

    #[test]
    fn test_other_locations_ignored() {
        let engine = engine();
        let mut other = signal("f1", "excessive_voids", 10, Utc::now() - Duration::hours(1));
        other.location_id = "loc-2".to_string();
        engine.ingest_fraud_signal(other).unwrap();

        assert_eq!(engine.analyze_fraud_patterns("loc-1").signal_count, 0);
    }

    proptest! {
        #[test]
        fn prop_level_follows_mean(severities in proptest::collection::vec(0u8..=10, 1..12)) {
            let engine = engine();
            let now = Utc::now();
            for (i, sev) in severities.iter().enumerate() {
                let at = now - Duration::minutes(i as i64 + 1);
                engine.ingest_fraud_signal(signal(&format!("f{}", i), "k", *sev, at)).unwrap();
            }

            let mean = severities.iter().map(|s| f64::from(*s)).sum::<f64>() / severities.len() as f64;
            let analysis = engine.analyze_fraud_patterns_at("loc-1", now);
            prop_assert_eq!(analysis.risk_level, FraudRiskLevel::from_average(mean));
            prop_assert_eq!(analysis.signal_count, severities.len());
        }
    }
}
