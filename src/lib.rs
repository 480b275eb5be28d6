//! medaudit - Medication Data-Quality Auditor
//!
//! Audits the medication reference table behind the reduction planner.
//! Each record is classified against independent completeness rules
//! (half-life, CYP-450 data, withdrawal-risk score, category, therapeutic
//! range), issues are bucketed in export order, and the result is rendered
//! as a maintainer-facing report ending in copy-paste id lists.
//!
//! # Design Principles
//!
//! 1. **Read-only** - Records are never mutated; one audit run owns all
//!    derived state
//! 2. **Explicit reference data** - Criticality table and matcher rules are
//!    values passed in, not globals
//! 3. **Deterministic** - Same export, same report, byte for byte
//!
//! # Quick Start
//!
//! ```no_run
//! use medaudit::{load_medications, render_text, Auditor, CriticalityTable, ReportOptions};
//!
//! let records = load_medications("medications_export.json").unwrap();
//! let report = Auditor::new().audit(&records);
//!
//! let table = CriticalityTable::builtin();
//! let text = render_text(&report, &table, &ReportOptions::default()).unwrap();
//! print!("{text}");
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
// Allow common test patterns
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::too_many_lines
    )
)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::uninlined_format_args)]

pub mod audit;
/// CLI module for command-line interface
#[cfg(feature = "cli")]
pub mod cli;
pub mod error;
pub mod record;
pub mod report;

pub use audit::{
    AuditReport, AuditStats, Auditor, CriticalityTable, IssueKind, MatcherRules,
};
pub use error::{Error, Result};
pub use record::{load_medications, parse_export, MedicationRecord};
pub use report::{render_json, render_text, ReportOptions, ReportSummary};
