use crate::events::{EventKind, SupplierViolation};
use crate::thresholds::SUPPLIER_MIN_AUDIT_SCORE;
use crate::types::SupplierCompliance;

use super::ComplianceEngine;

impl ComplianceEngine {
    /// Check halal certification, audit score and documentation.
    ///
    /// Each failing check adds an issue. Certification and audit failures
    /// also append a `SupplierViolation` event; missing documents do not.
    pub fn verify_supplier_compliance(&self, supplier_id: &str) -> SupplierCompliance {
        let Some(supplier) = self.store.suppliers.get(supplier_id) else {
            return SupplierCompliance {
                supplier_id: supplier_id.to_string(),
                compliant: false,
                issues: vec!["Supplier not found".to_string()],
            };
        };

        let mut issues = Vec::new();

        if !supplier.halal_certified {
            issues.push("Missing halal certification".to_string());
            self.emit(EventKind::SupplierViolation {
                supplier_id: supplier.id.clone(),
                violation: SupplierViolation::MissingHalalCertification,
            });
        }

        if supplier.audit_score < SUPPLIER_MIN_AUDIT_SCORE {
            issues.push(format!(
                "Audit score below threshold: {}/{}",
                supplier.audit_score, SUPPLIER_MIN_AUDIT_SCORE
            ));
            self.emit(EventKind::SupplierViolation {
                supplier_id: supplier.id.clone(),
                violation: SupplierViolation::LowAuditScore {
                    score: supplier.audit_score,
                    minimum: SUPPLIER_MIN_AUDIT_SCORE,
                },
            });
        }

        if supplier.certification_documents.is_empty() {
            issues.push("No certification documents on file".to_string());
        }

        SupplierCompliance {
            supplier_id: supplier.id,
            compliant: issues.is_empty(),
            issues,
        }
    }
}
