//! Audit report rendering.
//!
//! The text report is meant for a maintainer reading a terminal; its last
//! block holds comma-joined id lists that are pasted straight into a
//! remediation query. The JSON summary carries the same content for CI.

use std::fmt::Write;

use serde::Serialize;

use crate::{
    audit::{
        AuditReport, AuditStats, AuditThresholds, CriticalCategory, CriticalityTable,
        FlaggedMedication, IssueBucket, IssueKind, MatchClass, MatcherRules, OffendingValue,
        Priority,
    },
    error::Result,
};

const RULE_WIDTH: usize = 80;
const LABEL_WIDTH: usize = 34;

/// Rendering options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportOptions {
    /// Entries shown for the sampled findings (default: 10)
    pub preview_limit: usize,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self { preview_limit: 10 }
    }
}

impl ReportOptions {
    /// Set the preview length
    #[must_use]
    pub fn preview_limit(mut self, limit: usize) -> Self {
        self.preview_limit = limit;
        self
    }
}

fn banner(out: &mut String, title: &str) -> std::fmt::Result {
    writeln!(out, "{}", "=".repeat(RULE_WIDTH))?;
    writeln!(out, "{title}")?;
    writeln!(out, "{}", "=".repeat(RULE_WIDTH))?;
    writeln!(out)
}

fn category_label(category: Option<i64>) -> String {
    category.map_or_else(|| "-".to_string(), |c| c.to_string())
}

fn stat_line(
    out: &mut String,
    label: &str,
    count: usize,
    stats: &AuditStats,
) -> std::fmt::Result {
    writeln!(
        out,
        "{:<width$}{} ({:.1}%)",
        label,
        count,
        stats.percent(count),
        width = LABEL_WIDTH
    )
}

fn entry_line(kind: IssueKind, m: &FlaggedMedication) -> String {
    match (kind, &m.value) {
        (IssueKind::MissingHalfLife, _) => format!(
            "   - ID {:3}: {:<30} ({:<30}) [Cat {}]",
            m.id,
            m.name,
            m.generic,
            category_label(m.category)
        ),
        (_, Some(OffendingValue::HalfLife(h))) => {
            format!("   - ID {:3}: {:<30} half_life={}h", m.id, m.name, h)
        }
        (_, Some(OffendingValue::CypText(text))) => format!(
            "   - ID {:3}: {:<30} cyp='{}'",
            m.id,
            m.name,
            text.as_deref().unwrap_or("")
        ),
        (_, Some(OffendingValue::WithdrawalScore(score))) => format!(
            "   - ID {:3}: {:<30} ({:<30}) score={}",
            m.id, m.name, m.generic, score
        ),
        (_, None) => format!("   - ID {:3}: {:<30} ({:<30})", m.id, m.name, m.generic),
    }
}

fn finding_header(number: usize, bucket: &IssueBucket, max_half_life: f64) -> String {
    let count = bucket.len();
    match bucket.kind {
        IssueKind::MissingHalfLife => {
            format!("{number}. MISSING half_life_hours: {count} medications")
        }
        IssueKind::InvalidHalfLife => {
            format!(
                "{number}. INVALID half_life_hours: {count} medications (0 or >{max_half_life}h)"
            )
        }
        IssueKind::MissingCyp => format!("{number}. MISSING/UNCLEAR CYP data: {count} medications"),
        IssueKind::MissingWithdrawal => {
            format!("{number}. MISSING withdrawal_risk_score: {count} medications")
        }
        IssueKind::MissingCategory => format!("{number}. MISSING category_id: {count} medications"),
        IssueKind::ZeroWithdrawalHighDependency => format!(
            "{number}. SUSPICIOUS: High-dependency meds with withdrawal_score=0: {count}"
        ),
    }
}

/// Findings listed as a bounded sample rather than in full
fn is_sampled(kind: IssueKind) -> bool {
    matches!(
        kind,
        IssueKind::MissingHalfLife | IssueKind::MissingCyp | IssueKind::MissingWithdrawal
    )
}

fn write_finding(
    out: &mut String,
    number: usize,
    bucket: &IssueBucket,
    max_half_life: f64,
    options: &ReportOptions,
) -> std::fmt::Result {
    writeln!(out, "{}", finding_header(number, bucket, max_half_life))?;

    if !bucket.is_empty() {
        let shown = if is_sampled(bucket.kind) {
            writeln!(out, "   Sample (first {}):", options.preview_limit)?;
            options.preview_limit.min(bucket.len())
        } else {
            bucket.len()
        };

        for m in &bucket.entries[..shown] {
            writeln!(out, "{}", entry_line(bucket.kind, m))?;
        }
        if shown < bucket.len() {
            writeln!(out, "   ... and {} more", bucket.len() - shown)?;
        }
    }
    writeln!(out)
}

fn recommendations(max_half_life: f64) -> [(Priority, &'static str, Vec<String>); 3] {
    [
        (
            Priority::Critical,
            "Affects calculation",
            vec![
                "Fix missing half_life_hours (used in Phase 3 reduction calculation)".into(),
                "Complete withdrawal_risk_score (used in Phase 6 reduction calculation)".into(),
                "Review CYP enzyme data (used in Phase 4 CYP adjustment)".into(),
            ],
        ),
        (
            Priority::High,
            "Improves safety",
            vec![
                "Review zero withdrawal scores for high-dependency meds".into(),
                format!("Verify invalid half-life values (0h or >{max_half_life}h)"),
            ],
        ),
        (
            Priority::Medium,
            "Future features",
            vec![
                "Add therapeutic_min/max ranges for narrow-window drugs".into(),
                "Complete category_id for any uncategorized medications".into(),
            ],
        ),
    ]
}

/// Render the full text report.
///
/// # Errors
///
/// Returns [`crate::Error::Format`] if writing to the buffer fails.
pub fn render_text(
    report: &AuditReport,
    table: &CriticalityTable,
    options: &ReportOptions,
) -> Result<String> {
    let mut out = String::new();
    let stats = &report.stats;
    let max_half_life = report.thresholds.max_half_life_hours;

    banner(&mut out, "MEDICATION DATA QUALITY AUDIT")?;

    writeln!(out, "\u{1f4ca} OVERALL STATISTICS")?;
    writeln!(out, "{}", "-".repeat(RULE_WIDTH))?;
    writeln!(
        out,
        "{:<width$}{}",
        "Total Medications:",
        stats.total,
        width = LABEL_WIDTH
    )?;
    stat_line(&mut out, "With half_life_hours:", stats.has_half_life, stats)?;
    stat_line(&mut out, "With CYP data:", stats.has_cyp_data, stats)?;
    stat_line(
        &mut out,
        "With withdrawal_risk_score:",
        stats.has_withdrawal_score,
        stats,
    )?;
    stat_line(&mut out, "With category_id:", stats.has_category, stats)?;
    stat_line(
        &mut out,
        "With therapeutic_range:",
        stats.has_therapeutic_range,
        stats,
    )?;
    writeln!(out)?;

    writeln!(out, "\u{1f6a8} DATA QUALITY ISSUES")?;
    writeln!(out, "{}", "-".repeat(RULE_WIDTH))?;
    writeln!(out)?;
    for (i, bucket) in report.issues.iter().enumerate() {
        write_finding(&mut out, i + 1, bucket, max_half_life, options)?;
    }

    banner(&mut out, "\u{1f4cb} CATEGORY-SPECIFIC CRITICAL FIELDS ANALYSIS")?;
    for CriticalCategory { rule, member_count } in report.critical_categories(table) {
        writeln!(out, "Category {}: {}", rule.id, rule.name)?;
        writeln!(out, "  Total medications: {member_count}")?;
        writeln!(out, "  Critical fields: {}", rule.critical_list())?;
        writeln!(out)?;
    }

    banner(&mut out, "\u{1f4a1} RECOMMENDATIONS")?;
    for (tier, (priority, focus, items)) in recommendations(max_half_life).iter().enumerate() {
        writeln!(out, "PRIORITY {} ({priority} - {focus}):", tier + 1)?;
        for item in items {
            writeln!(out, "  - {item}")?;
        }
        writeln!(out)?;
    }

    banner(&mut out, "\u{2705} EXPORT LISTS FOR MANUAL REVIEW")?;
    let [half_life, withdrawal, cyp] = report.export_lines();
    for (label, line) in [
        ("Medications needing half_life_hours:", half_life),
        ("Medications needing withdrawal_risk_score:", withdrawal),
        ("Medications needing CYP clarification:", cyp),
    ] {
        writeln!(out, "{label}")?;
        writeln!(out, "{line}")?;
        writeln!(out)?;
    }

    Ok(out)
}

/// Per-kind entry of the JSON summary
#[derive(Debug, Clone, Serialize)]
pub struct IssueSummary {
    /// Issue kind
    pub kind: IssueKind,
    /// Remediation priority
    pub priority: Priority,
    /// Number of flagged records
    pub count: usize,
    /// Flagged identifiers in export order
    pub ids: Vec<i64>,
}

/// Remediation export lists
#[derive(Debug, Clone, Serialize)]
pub struct ExportLists {
    /// Records needing `half_life_hours`
    pub half_life: String,
    /// Records needing `withdrawal_risk_score`
    pub withdrawal: String,
    /// Records needing CYP clarification
    pub cyp: String,
}

/// Machine-readable audit summary
#[derive(Debug, Clone, Serialize)]
pub struct ReportSummary<'a> {
    /// Completeness counters
    pub stats: AuditStats,
    /// Thresholds the records were classified with
    pub thresholds: AuditThresholds,
    /// Issue buckets in report order
    pub issues: Vec<IssueSummary>,
    /// Curated categories present in the export
    pub critical_categories: Vec<CriticalCategory<'a>>,
    /// Remediation export lists
    pub export: ExportLists,
}

impl<'a> ReportSummary<'a> {
    /// Build a summary of `report` against `table`.
    pub fn new(report: &AuditReport, table: &'a CriticalityTable) -> Self {
        let issues = report
            .issues
            .iter()
            .map(|bucket| IssueSummary {
                kind: bucket.kind,
                priority: bucket.kind.priority(),
                count: bucket.len(),
                ids: bucket.ids(),
            })
            .collect();
        let [half_life, withdrawal, cyp] = report.export_lines();

        Self {
            stats: report.stats,
            thresholds: report.thresholds.clone(),
            issues,
            critical_categories: report.critical_categories(table),
            export: ExportLists {
                half_life,
                withdrawal,
                cyp,
            },
        }
    }
}

/// Render the JSON summary.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn render_json(report: &AuditReport, table: &CriticalityTable) -> Result<String> {
    let summary = ReportSummary::new(report, table);
    Ok(serde_json::to_string_pretty(&summary)?)
}

/// Render the active criticality table and matcher rules.
///
/// # Errors
///
/// Returns [`crate::Error::Format`] if writing to the buffer fails.
pub fn render_rules(table: &CriticalityTable, matchers: &MatcherRules) -> Result<String> {
    let mut out = String::new();

    writeln!(out, "Category Criticality")?;
    writeln!(out, "====================")?;
    writeln!(out, "{:<6} {:<32} {}", "ID", "CATEGORY", "CRITICAL FIELDS")?;
    writeln!(out, "{}", "-".repeat(70))?;
    for rule in table.iter() {
        writeln!(out, "{:<6} {:<32} {}", rule.id, rule.name, rule.critical_list())?;
    }
    writeln!(out)?;

    writeln!(out, "Matcher Rules")?;
    writeln!(out, "=============")?;
    for class in [
        MatchClass::NonCyp,
        MatchClass::CypEnzyme,
        MatchClass::HighDependency,
    ] {
        let phrases: Vec<&str> = matchers
            .of_class(class)
            .map(|r| r.phrase.as_str())
            .collect();
        writeln!(out, "{:<26}{}", format!("{class}:"), phrases.join(", "))?;
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{audit::Auditor, record::MedicationRecord};

    fn scenario_report() -> AuditReport {
        let records = vec![
            MedicationRecord::new(1, "Alpha")
                .with_generic_name("Alphamid")
                .with_cyp("CYP3A4 minor")
                .with_withdrawal_score(5.0)
                .with_category(2),
            MedicationRecord::new(2, "Beta")
                .with_generic_name("Betamid")
                .with_half_life(0.0),
            MedicationRecord::new(3, "Tavor")
                .with_generic_name("Lorazepam")
                .with_half_life(24.0)
                .with_cyp("renal clearance")
                .with_withdrawal_score(0.0)
                .with_category(17),
        ];
        Auditor::new().audit(&records)
    }

    fn export_block(text: &str) -> Vec<&str> {
        let start = text
            .find("Medications needing half_life_hours:")
            .unwrap();
        text[start..].lines().filter(|l| !l.is_empty()).collect()
    }

    #[test]
    fn test_scenario_text() {
        let text = render_text(
            &scenario_report(),
            &CriticalityTable::builtin(),
            &ReportOptions::default(),
        )
        .unwrap();

        assert!(text.contains("1. MISSING half_life_hours: 1 medications"));
        assert!(text.contains("2. INVALID half_life_hours: 1 medications (0 or >1000h)"));
        assert!(text.contains("half_life=0h"));
        assert!(text.contains("3. MISSING/UNCLEAR CYP data: 1 medications"));
        assert!(text.contains("4. MISSING withdrawal_risk_score: 1 medications"));
        assert!(text.contains("5. MISSING category_id: 1 medications"));
        assert!(text.contains("6. SUSPICIOUS: High-dependency meds with withdrawal_score=0: 1"));
        assert!(text.contains("score=0"));

        assert_eq!(
            export_block(&text),
            vec![
                "Medications needing half_life_hours:",
                "1",
                "Medications needing withdrawal_risk_score:",
                "2",
                "Medications needing CYP clarification:",
                "2",
            ]
        );
    }

    #[test]
    fn test_stats_block() {
        let text = render_text(
            &scenario_report(),
            &CriticalityTable::builtin(),
            &ReportOptions::default(),
        )
        .unwrap();
        assert!(text.contains("Total Medications:                3\n"));
        assert!(text.contains("With half_life_hours:             1 (33.3%)"));
        assert!(text.contains("With CYP data:                    2 (66.7%)"));
        assert!(text.contains("With therapeutic_range:           0 (0.0%)"));
    }

    #[test]
    fn test_category_section() {
        let text = render_text(
            &scenario_report(),
            &CriticalityTable::builtin(),
            &ReportOptions::default(),
        )
        .unwrap();
        let tca = text.find("Category 2: Antidepressiva (trizyklisch)").unwrap();
        let benzo = text.find("Category 17: Anxiolytika (Benzodiazepine)").unwrap();
        assert!(tca < benzo);
        assert!(text.contains("  Critical fields: withdrawal, half_life\n"));
        assert!(!text.contains("Category 18:"));
    }

    #[test]
    fn test_preview_truncation() {
        let records: Vec<MedicationRecord> = (1..=13)
            .map(|id| MedicationRecord::new(id, format!("Med {id}")))
            .collect();
        let report = Auditor::new().audit(&records);
        let text = render_text(
            &report,
            &CriticalityTable::builtin(),
            &ReportOptions::default(),
        )
        .unwrap();

        assert!(text.contains("   Sample (first 10):"));
        assert!(text.contains("   ... and 3 more"));
        // Sampled findings stop at 10; only the full category list shows id 11.
        assert_eq!(text.matches("ID  10: Med 10").count(), 4);
        assert_eq!(text.matches("ID  11: Med 11").count(), 1);
        // Export lines are never truncated.
        assert!(text.contains("1,2,3,4,5,6,7,8,9,10,11,12,13"));
    }

    #[test]
    fn test_full_list_for_missing_category() {
        let records: Vec<MedicationRecord> = (1..=12)
            .map(|id| {
                MedicationRecord::new(id, format!("Med {id}"))
                    .with_half_life(4.0)
                    .with_cyp("CYP2D6")
                    .with_withdrawal_score(1.0)
            })
            .collect();
        let report = Auditor::new().audit(&records);
        let text = render_text(
            &report,
            &CriticalityTable::builtin(),
            &ReportOptions::default().preview_limit(2),
        )
        .unwrap();
        assert!(text.contains("5. MISSING category_id: 12 medications"));
        assert!(text.contains("ID  12: Med 12"));
        assert!(!text.contains("... and"));
    }

    #[test]
    fn test_recommendations_fixed() {
        let text = render_text(
            &AuditReport::default(),
            &CriticalityTable::builtin(),
            &ReportOptions::default(),
        )
        .unwrap();
        assert!(text.contains("PRIORITY 1 (CRITICAL - Affects calculation):"));
        assert!(text.contains("PRIORITY 2 (HIGH - Improves safety):"));
        assert!(text.contains("PRIORITY 3 (MEDIUM - Future features):"));
    }

    #[test]
    fn test_half_life_threshold_printed() {
        let records = vec![MedicationRecord::new(1, "Depot").with_half_life(600.0)];
        let table = CriticalityTable::builtin();

        let report = Auditor::new().max_half_life_hours(500.0).audit(&records);
        let text = render_text(&report, &table, &ReportOptions::default()).unwrap();
        assert!(text.contains("2. INVALID half_life_hours: 1 medications (0 or >500h)"));
        assert!(text.contains("  - Verify invalid half-life values (0h or >500h)"));
        assert!(!text.contains(">1000h"));

        let report = Auditor::new().audit(&records);
        let text = render_text(&report, &table, &ReportOptions::default()).unwrap();
        assert!(text.contains("2. INVALID half_life_hours: 0 medications (0 or >1000h)"));
        assert!(text.contains("  - Verify invalid half-life values (0h or >1000h)"));

        let json = render_json(&report, &table).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["thresholds"]["max_half_life_hours"], 1000.0);
    }

    #[test]
    fn test_json_matches_export_lines() {
        let report = scenario_report();
        let table = CriticalityTable::builtin();
        let json = render_json(&report, &table).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["stats"]["total"], 3);
        assert_eq!(value["export"]["half_life"], "1");
        assert_eq!(value["export"]["withdrawal"], "2");
        assert_eq!(value["export"]["cyp"], "2");
        assert_eq!(value["issues"][5]["kind"], "zero_withdrawal_high_dependency");
        assert_eq!(value["issues"][5]["ids"][0], 3);
        assert_eq!(value["critical_categories"][1]["rule"]["id"], 17);
    }

    #[test]
    fn test_render_rules() {
        let text = render_rules(&CriticalityTable::builtin(), &MatcherRules::default()).unwrap();
        assert!(text.contains("Opioide"));
        assert!(text.contains("CYP enzyme:"));
        assert!(text.contains("cyp2j2"));
        assert!(text.contains("fentanyl"));
    }
}
