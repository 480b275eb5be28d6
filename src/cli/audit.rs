//! Audit CLI commands.

use std::path::{Path, PathBuf};

use clap::Args;

use crate::{
    audit::{Auditor, CriticalityTable},
    record::{load_medications, DEFAULT_EXPORT_PATH},
    report::{render_json, render_rules, render_text, ReportOptions},
};

/// Options shared by the auditing commands.
#[derive(Args, Debug, Clone)]
pub struct AuditArgs {
    /// Path to the medication export (JSON)
    #[arg(default_value = DEFAULT_EXPORT_PATH)]
    pub path: PathBuf,
    /// Criticality table to use instead of the built-in one (JSON)
    #[arg(long)]
    pub criticality: Option<PathBuf>,
    /// Half-lives above this many hours are reported as invalid
    #[arg(long, default_value = "1000")]
    pub max_half_life: f64,
}

impl Default for AuditArgs {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_EXPORT_PATH),
            criticality: None,
            max_half_life: 1000.0,
        }
    }
}

/// Resolve the criticality table: a file when given, otherwise built-in.
pub(crate) fn load_table(path: Option<&Path>) -> crate::Result<CriticalityTable> {
    match path {
        Some(p) => CriticalityTable::from_json_file(p),
        None => Ok(CriticalityTable::builtin()),
    }
}

fn validate_max_half_life(hours: f64) -> crate::Result<()> {
    if hours.is_finite() && hours > 0.0 {
        Ok(())
    } else {
        Err(crate::Error::invalid_config(format!(
            "max half-life must be a positive number of hours, got {hours}"
        )))
    }
}

/// Audit an export and print the report.
///
/// Returns whether the run should fail because issues were found.
pub(crate) fn cmd_audit_check(
    args: &AuditArgs,
    preview: usize,
    format: &str,
    fail_on_issues: bool,
) -> crate::Result<bool> {
    validate_max_half_life(args.max_half_life)?;
    let table = load_table(args.criticality.as_deref())?;
    let records = load_medications(&args.path)?;

    let report = Auditor::new()
        .max_half_life_hours(args.max_half_life)
        .audit(&records);

    match format {
        "text" => {
            let options = ReportOptions::default().preview_limit(preview);
            print!("{}", render_text(&report, &table, &options)?);
        }
        "json" => println!("{}", render_json(&report, &table)?),
        other => {
            return Err(crate::Error::invalid_config(format!(
                "unknown output format '{other}' (expected text or json)"
            )))
        }
    }

    if fail_on_issues && report.has_issues() {
        tracing::warn!(
            flagged = report.issues.total(),
            "Failing run: data quality issues found"
        );
        return Ok(true);
    }
    Ok(false)
}

/// Write the JSON summary to a file, or stdout when no output is given.
pub(crate) fn cmd_audit_report(args: &AuditArgs, output: Option<&Path>) -> crate::Result<()> {
    validate_max_half_life(args.max_half_life)?;
    let table = load_table(args.criticality.as_deref())?;
    let records = load_medications(&args.path)?;

    let report = Auditor::new()
        .max_half_life_hours(args.max_half_life)
        .audit(&records);
    let json = render_json(&report, &table)?;

    if let Some(output_path) = output {
        std::fs::write(output_path, &json).map_err(|e| crate::Error::io(e, output_path))?;
        println!("Audit summary written to: {}", output_path.display());
    } else {
        println!("{}", json);
    }

    Ok(())
}

/// Print the active criticality table and matcher rules.
pub(crate) fn cmd_rules(criticality: Option<&Path>) -> crate::Result<()> {
    let table = load_table(criticality)?;
    print!("{}", render_rules(&table, Auditor::new().matchers())?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_table_builtin() {
        let table = load_table(None).unwrap();
        assert_eq!(table, CriticalityTable::builtin());
    }

    #[test]
    fn test_load_table_missing_file() {
        let err = load_table(Some(Path::new("/nonexistent/criticality.json"))).unwrap_err();
        assert!(matches!(err, crate::Error::Io { .. }));
    }

    #[test]
    fn test_validate_max_half_life() {
        assert!(validate_max_half_life(1000.0).is_ok());
        assert!(validate_max_half_life(0.0).is_err());
        assert!(validate_max_half_life(-5.0).is_err());
        assert!(validate_max_half_life(f64::NAN).is_err());
    }

    #[test]
    fn test_unknown_format_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.json");
        std::fs::write(&path, r#"[{"results": [{"id": 1, "name": "A"}]}]"#).unwrap();
        let args = AuditArgs {
            path,
            ..Default::default()
        };
        let err = cmd_audit_check(&args, 10, "xml", false).unwrap_err();
        assert!(err.to_string().contains("unknown output format 'xml'"));
    }

    #[test]
    fn test_report_written_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.json");
        let output = dir.path().join("summary.json");
        std::fs::write(&path, r#"[{"results": [{"id": 4, "name": "A"}]}]"#).unwrap();
        let args = AuditArgs {
            path,
            ..Default::default()
        };

        cmd_audit_report(&args, Some(&output)).unwrap();

        let summary: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(summary["export"]["half_life"], "4");
    }
}
