//! Medication data-quality audit
//!
//! Classifies each medication record against independent completeness
//! rules, aggregates issues and statistics, and groups records by category
//! for a cross-reference against the curated criticality table.
//!
//! ## Rules
//! - **Half-life**: absent is missing; `0` or above the threshold (1000 h)
//!   is invalid
//! - **CYP**: missing unless the text names a known isoenzyme or carries an
//!   explicit non-CYP marker
//! - **Withdrawal**: absent is missing; a zero score on a high-dependency
//!   generic name is suspicious
//! - **Category**: absent or the `0` sentinel is missing
//! - **Therapeutic range**: counted when either bound is populated
//!
//! # Example
//!
//! ```
//! use medaudit::{audit::{Auditor, IssueKind}, MedicationRecord};
//!
//! let records = vec![
//!     MedicationRecord::new(1, "Tavor")
//!         .with_generic_name("Lorazepam")
//!         .with_half_life(14.0)
//!         .with_cyp("Glucuronidation")
//!         .with_withdrawal_score(0.0)
//!         .with_category(17),
//! ];
//!
//! let report = Auditor::new().audit(&records);
//! assert_eq!(report.bucket(IssueKind::ZeroWithdrawalHighDependency).ids(), vec![1]);
//! ```

// Percentages over record counts
#![allow(clippy::cast_precision_loss)]

mod checks;
mod criticality;
mod matchers;


pub use checks::{
    AuditReport, AuditStats, AuditThresholds, Auditor, CategoryMember, CriticalCategory,
    FlaggedMedication, IssueBucket, IssueBuckets, IssueKind, OffendingValue, Priority,
    RecordAudit,
};
pub use criticality::{CategoryCriticalityRule, CriticalField, CriticalityTable};
pub use matchers::{CypAnalysis, MatchClass, MatchRule, MatcherRules};
