//! Issue Buckets and Auditor
//!
//! Types for the per-record findings, the aggregated audit report, and the
//! auditor that produces them in a single pass over the export.

use std::{collections::BTreeMap, fmt};

use serde::Serialize;

use super::{
    criticality::{CategoryCriticalityRule, CriticalityTable},
    matchers::MatcherRules,
};
use crate::record::MedicationRecord;

// ═══════════════════════════════════════════════════════════════════════════════
// Issue kinds
// ═══════════════════════════════════════════════════════════════════════════════

/// Remediation priority of an issue kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Affects the reduction calculation directly
    Critical,
    /// Improves safety
    High,
    /// Future features
    Medium,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Critical => write!(f, "CRITICAL"),
            Self::High => write!(f, "HIGH"),
            Self::Medium => write!(f, "MEDIUM"),
        }
    }
}

/// Defect classes, in report order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// `half_life_hours` is absent
    MissingHalfLife,
    /// `half_life_hours` is zero or implausibly large
    InvalidHalfLife,
    /// No enzyme and no non-CYP marker in `cyp450_enzyme`
    MissingCyp,
    /// `withdrawal_risk_score` is absent
    MissingWithdrawal,
    /// `category_id` is absent or the zero sentinel
    MissingCategory,
    /// Zero withdrawal score on a high-dependency drug
    ZeroWithdrawalHighDependency,
}

impl IssueKind {
    /// All kinds in report order
    pub const ALL: [Self; 6] = [
        Self::MissingHalfLife,
        Self::InvalidHalfLife,
        Self::MissingCyp,
        Self::MissingWithdrawal,
        Self::MissingCategory,
        Self::ZeroWithdrawalHighDependency,
    ];

    fn index(self) -> usize {
        match self {
            Self::MissingHalfLife => 0,
            Self::InvalidHalfLife => 1,
            Self::MissingCyp => 2,
            Self::MissingWithdrawal => 3,
            Self::MissingCategory => 4,
            Self::ZeroWithdrawalHighDependency => 5,
        }
    }

    /// Remediation priority
    pub fn priority(self) -> Priority {
        match self {
            Self::MissingHalfLife | Self::MissingCyp | Self::MissingWithdrawal => {
                Priority::Critical
            }
            Self::InvalidHalfLife | Self::ZeroWithdrawalHighDependency => Priority::High,
            Self::MissingCategory => Priority::Medium,
        }
    }

    /// Stable snake_case key
    pub fn key(self) -> &'static str {
        match self {
            Self::MissingHalfLife => "missing_half_life",
            Self::InvalidHalfLife => "invalid_half_life",
            Self::MissingCyp => "missing_cyp",
            Self::MissingWithdrawal => "missing_withdrawal",
            Self::MissingCategory => "missing_category",
            Self::ZeroWithdrawalHighDependency => "zero_withdrawal_high_dependency",
        }
    }
}

/// The value that made a record land in a bucket
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OffendingValue {
    /// Out-of-range half-life in hours
    HalfLife(f64),
    /// Unrecognized CYP text (absent when the field was null)
    CypText(Option<String>),
    /// Withdrawal score
    WithdrawalScore(f64),
}

/// Identifying projection of a flagged record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlaggedMedication {
    /// Record identifier
    pub id: i64,
    /// Display name
    pub name: String,
    /// Generic name (empty when absent)
    pub generic: String,
    /// Category identifier
    pub category: Option<i64>,
    /// Offending value, where relevant
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<OffendingValue>,
}

impl FlaggedMedication {
    fn from_record(record: &MedicationRecord) -> Self {
        Self {
            id: record.id,
            name: record.name.clone(),
            generic: record.generic().to_string(),
            category: record.category_id,
            value: None,
        }
    }

    fn with_value(mut self, value: OffendingValue) -> Self {
        self.value = Some(value);
        self
    }
}

/// All flagged records of one kind, in export order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IssueBucket {
    /// Issue kind
    pub kind: IssueKind,
    /// Flagged records
    pub entries: Vec<FlaggedMedication>,
}

impl IssueBucket {
    /// Number of flagged records
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no record was flagged
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Identifiers in export order
    pub fn ids(&self) -> Vec<i64> {
        self.entries.iter().map(|m| m.id).collect()
    }

    /// Comma-joined identifiers, for remediation tickets
    pub fn export_line(&self) -> String {
        self.entries
            .iter()
            .map(|m| m.id.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// The six issue buckets, in report order
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct IssueBuckets {
    buckets: Vec<IssueBucket>,
}

impl Default for IssueBuckets {
    fn default() -> Self {
        Self {
            buckets: IssueKind::ALL
                .iter()
                .map(|&kind| IssueBucket {
                    kind,
                    entries: Vec::new(),
                })
                .collect(),
        }
    }
}

impl IssueBuckets {
    /// Bucket for a kind
    pub fn get(&self, kind: IssueKind) -> &IssueBucket {
        &self.buckets[kind.index()]
    }

    fn push(&mut self, kind: IssueKind, entry: FlaggedMedication) {
        self.buckets[kind.index()].entries.push(entry);
    }

    /// Buckets in report order
    pub fn iter(&self) -> impl Iterator<Item = &IssueBucket> {
        self.buckets.iter()
    }

    /// Total flagged entries across all buckets
    pub fn total(&self) -> usize {
        self.buckets.iter().map(IssueBucket::len).sum()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Statistics and category membership
// ═══════════════════════════════════════════════════════════════════════════════

/// Completeness counters over the whole export
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AuditStats {
    /// Records audited
    pub total: usize,
    /// Records with a plausible half-life
    pub has_half_life: usize,
    /// Records with an enzyme or an explicit non-CYP marker
    pub has_cyp_data: usize,
    /// Records with a withdrawal score
    pub has_withdrawal_score: usize,
    /// Records with a non-zero category
    pub has_category: usize,
    /// Records with at least one therapeutic range bound
    pub has_therapeutic_range: usize,
}

impl AuditStats {
    /// `count` as a percentage of `total` (0 for an empty audit)
    pub fn percent(&self, count: usize) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            count as f64 / self.total as f64 * 100.0
        }
    }
}

/// Identifying projection of a category member
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryMember {
    /// Record identifier
    pub id: i64,
    /// Display name
    pub name: String,
    /// Generic name (empty when absent)
    pub generic: String,
}

/// A curated category present in the export
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CriticalCategory<'a> {
    /// Criticality rule
    pub rule: &'a CategoryCriticalityRule,
    /// Number of audited records in the category
    pub member_count: usize,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Report
// ═══════════════════════════════════════════════════════════════════════════════

/// Findings for a single record
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordAudit {
    /// Buckets this record lands in, with its projection
    pub issues: Vec<(IssueKind, FlaggedMedication)>,
    /// Half-life present and plausible
    pub valid_half_life: bool,
    /// CYP enzyme or non-CYP marker found
    pub has_cyp_data: bool,
    /// Withdrawal score present
    pub has_withdrawal_score: bool,
    /// Non-zero category present
    pub has_category: bool,
    /// At least one therapeutic bound present
    pub has_therapeutic_range: bool,
}

impl RecordAudit {
    /// Whether the record landed in `kind`
    pub fn has_issue(&self, kind: IssueKind) -> bool {
        self.issues.iter().any(|(k, _)| *k == kind)
    }
}

/// Aggregated result of one audit run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AuditReport {
    /// Completeness counters
    pub stats: AuditStats,
    /// Issue buckets
    pub issues: IssueBuckets,
    /// Members per encountered category id
    pub categories: BTreeMap<i64, Vec<CategoryMember>>,
    /// Thresholds the records were classified with
    pub thresholds: AuditThresholds,
}

impl AuditReport {
    /// Check if any record was flagged
    pub fn has_issues(&self) -> bool {
        self.issues.total() > 0
    }

    /// Bucket for a kind
    pub fn bucket(&self, kind: IssueKind) -> &IssueBucket {
        self.issues.get(kind)
    }

    /// Number of audited records in a category
    pub fn category_count(&self, category_id: i64) -> usize {
        self.categories.get(&category_id).map_or(0, Vec::len)
    }

    /// Curated categories present in the export, in table order
    pub fn critical_categories<'a>(
        &self,
        table: &'a CriticalityTable,
    ) -> Vec<CriticalCategory<'a>> {
        table
            .iter()
            .filter_map(|rule| {
                let member_count = self.category_count(rule.id);
                (member_count > 0).then_some(CriticalCategory { rule, member_count })
            })
            .collect()
    }

    /// Export lines: missing half-life, missing withdrawal, missing CYP
    pub fn export_lines(&self) -> [String; 3] {
        [
            self.bucket(IssueKind::MissingHalfLife).export_line(),
            self.bucket(IssueKind::MissingWithdrawal).export_line(),
            self.bucket(IssueKind::MissingCyp).export_line(),
        ]
    }

    fn absorb(&mut self, record: &MedicationRecord, audit: RecordAudit) {
        self.stats.total += 1;
        self.stats.has_half_life += usize::from(audit.valid_half_life);
        self.stats.has_cyp_data += usize::from(audit.has_cyp_data);
        self.stats.has_withdrawal_score += usize::from(audit.has_withdrawal_score);
        self.stats.has_category += usize::from(audit.has_category);
        self.stats.has_therapeutic_range += usize::from(audit.has_therapeutic_range);

        for (kind, entry) in audit.issues {
            self.issues.push(kind, entry);
        }

        if let Some(category_id) = record.category_id {
            self.categories
                .entry(category_id)
                .or_default()
                .push(CategoryMember {
                    id: record.id,
                    name: record.name.clone(),
                    generic: record.generic().to_string(),
                });
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Auditor
// ═══════════════════════════════════════════════════════════════════════════════

/// Configuration thresholds for auditing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditThresholds {
    /// Half-lives above this many hours are invalid (default: 1000)
    pub max_half_life_hours: f64,
}

impl Default for AuditThresholds {
    fn default() -> Self {
        Self {
            max_half_life_hours: 1000.0,
        }
    }
}

/// Medication data-quality auditor
#[derive(Debug, Clone, Default)]
pub struct Auditor {
    pub(crate) thresholds: AuditThresholds,
    pub(crate) matchers: MatcherRules,
}

impl Auditor {
    /// Create an auditor with default thresholds and matcher rules
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the implausible half-life threshold in hours
    #[must_use]
    pub fn max_half_life_hours(mut self, hours: f64) -> Self {
        self.thresholds.max_half_life_hours = hours;
        self
    }

    /// Replace the matcher rules
    #[must_use]
    pub fn with_matchers(mut self, matchers: MatcherRules) -> Self {
        self.matchers = matchers;
        self
    }

    /// Active matcher rules
    pub fn matchers(&self) -> &MatcherRules {
        &self.matchers
    }

    /// Active thresholds
    pub fn thresholds(&self) -> &AuditThresholds {
        &self.thresholds
    }

    /// Audit every record in export order.
    pub fn audit(&self, records: &[MedicationRecord]) -> AuditReport {
        let mut report = AuditReport {
            thresholds: self.thresholds.clone(),
            ..AuditReport::default()
        };

        for record in records {
            let audit = self.check_record(record);
            if !audit.issues.is_empty() {
                tracing::debug!(
                    id = record.id,
                    issues = ?audit.issues.iter().map(|(k, _)| k.key()).collect::<Vec<_>>(),
                    "Record flagged"
                );
            }
            report.absorb(record, audit);
        }

        tracing::info!(
            total = report.stats.total,
            flagged = report.issues.total(),
            categories = report.categories.len(),
            "Audit complete"
        );
        report
    }

    /// Check one record against every rule; rules are independent.
    #[allow(clippy::float_cmp)]
    pub fn check_record(&self, record: &MedicationRecord) -> RecordAudit {
        let mut audit = RecordAudit::default();
        let project = || FlaggedMedication::from_record(record);

        match record.half_life_hours {
            None => audit.issues.push((IssueKind::MissingHalfLife, project())),
            Some(h) if h == 0.0 || h > self.thresholds.max_half_life_hours => {
                let entry = project().with_value(OffendingValue::HalfLife(h));
                audit.issues.push((IssueKind::InvalidHalfLife, entry));
            }
            Some(_) => audit.valid_half_life = true,
        }

        let cyp = self.matchers.analyze_cyp(record.cyp450_enzyme.as_deref());
        if cyp.is_missing() {
            audit.issues.push((
                IssueKind::MissingCyp,
                project().with_value(OffendingValue::CypText(record.cyp450_enzyme.clone())),
            ));
        } else {
            audit.has_cyp_data = true;
        }

        match record.withdrawal_risk_score {
            None => audit.issues.push((IssueKind::MissingWithdrawal, project())),
            Some(score) => {
                audit.has_withdrawal_score = true;
                if score == 0.0 && self.matchers.is_high_dependency(record.generic()) {
                    audit.issues.push((
                        IssueKind::ZeroWithdrawalHighDependency,
                        project().with_value(OffendingValue::WithdrawalScore(score)),
                    ));
                }
            }
        }

        match record.category_id {
            None | Some(0) => audit.issues.push((IssueKind::MissingCategory, project())),
            Some(_) => audit.has_category = true,
        }

        audit.has_therapeutic_range = record.has_therapeutic_range();

        // Keep bucket order stable regardless of rule evaluation order.
        audit.issues.sort_by_key(|(kind, _)| kind.index());
        audit
    }
}
