//! Fixed rule thresholds.
//!
//! These values are policy. Comparisons against them are exact: a QA score
//! of exactly 80 passes, a fraud signal of exactly 7 alerts.

/// QA inspections and location averages below this score fail.
pub const QA_PASS_SCORE: f64 = 80.0;

/// Suppliers audited below this score are non-compliant.
pub const SUPPLIER_MIN_AUDIT_SCORE: f64 = 70.0;

/// Fraud signals at or above this severity raise an alert.
pub const FRAUD_ALERT_SEVERITY: u8 = 7;

/// Highest valid fraud signal severity.
pub const FRAUD_MAX_SEVERITY: u8 = 10;

/// Trailing window for fraud pattern analysis.
pub const FRAUD_WINDOW_DAYS: i64 = 7;

/// Certifications expiring within this many days are reported as upcoming.
pub const CERTIFICATION_WARNING_DAYS: i64 = 30;

/// Optimistic QA average reported when nothing has been inspected.
pub const DEFAULT_QA_SCORE: f64 = 100.0;

/// Optimistic supplier compliance reported when no suppliers are known.
pub const DEFAULT_SUPPLIER_COMPLIANCE_PCT: f64 = 100.0;
