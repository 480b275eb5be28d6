//! Medication records and export loading.
//!
//! The auditor reads the JSON document produced by the database export
//! tool: a sequence whose first element carries a `results` array with one
//! object per medication.
//!
//! ```json
//! [{ "results": [{ "id": 1, "name": "Tavor", "generic_name": "Lorazepam", ... }] }]
//! ```

use std::{collections::HashSet, path::Path};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default export path audited when no path is given.
pub const DEFAULT_EXPORT_PATH: &str = "medications_export.json";

/// Strength of a medication's interaction with CBD.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CbdInteractionStrength {
    /// Low interaction potential
    Low,
    /// Medium interaction potential
    Medium,
    /// High interaction potential
    High,
    /// Critical interaction potential
    Critical,
    /// Any other spelling; the field is carried through, never audited
    #[serde(other)]
    Unknown,
}

/// One row of the medication reference table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicationRecord {
    /// Stable identifier, the sole cross-reference key of an audit
    pub id: i64,
    /// Display (brand) name
    pub name: String,
    /// Generic (INN) name
    #[serde(default)]
    pub generic_name: Option<String>,
    /// Category identifier; `0` is a sentinel for "uncategorized"
    #[serde(default)]
    pub category_id: Option<i64>,
    /// Elimination half-life in hours
    #[serde(default)]
    pub half_life_hours: Option<f64>,
    /// Free-text CYP-450 enzyme description
    #[serde(default)]
    pub cyp450_enzyme: Option<String>,
    /// Withdrawal-risk score
    #[serde(default)]
    pub withdrawal_risk_score: Option<f64>,
    /// CBD interaction strength
    #[serde(default)]
    pub cbd_interaction_strength: Option<CbdInteractionStrength>,
    /// Lower bound of the therapeutic range (ng/mL)
    #[serde(default)]
    pub therapeutic_min_ng_ml: Option<f64>,
    /// Upper bound of the therapeutic range (ng/mL)
    #[serde(default)]
    pub therapeutic_max_ng_ml: Option<f64>,
}

impl MedicationRecord {
    /// Create a record with only the required fields set.
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            generic_name: None,
            category_id: None,
            half_life_hours: None,
            cyp450_enzyme: None,
            withdrawal_risk_score: None,
            cbd_interaction_strength: None,
            therapeutic_min_ng_ml: None,
            therapeutic_max_ng_ml: None,
        }
    }

    /// Set the generic name
    #[must_use]
    pub fn with_generic_name(mut self, generic: impl Into<String>) -> Self {
        self.generic_name = Some(generic.into());
        self
    }

    /// Set the category identifier
    #[must_use]
    pub fn with_category(mut self, category_id: i64) -> Self {
        self.category_id = Some(category_id);
        self
    }

    /// Set the half-life in hours
    #[must_use]
    pub fn with_half_life(mut self, hours: f64) -> Self {
        self.half_life_hours = Some(hours);
        self
    }

    /// Set the CYP-450 enzyme text
    #[must_use]
    pub fn with_cyp(mut self, text: impl Into<String>) -> Self {
        self.cyp450_enzyme = Some(text.into());
        self
    }

    /// Set the withdrawal-risk score
    #[must_use]
    pub fn with_withdrawal_score(mut self, score: f64) -> Self {
        self.withdrawal_risk_score = Some(score);
        self
    }

    /// Set the therapeutic range bounds
    #[must_use]
    pub fn with_therapeutic_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.therapeutic_min_ng_ml = min;
        self.therapeutic_max_ng_ml = max;
        self
    }

    /// Generic name, or the empty string when absent
    pub fn generic(&self) -> &str {
        self.generic_name.as_deref().unwrap_or("")
    }

    /// Whether at least one therapeutic range bound is populated
    pub fn has_therapeutic_range(&self) -> bool {
        self.therapeutic_min_ng_ml.is_some() || self.therapeutic_max_ng_ml.is_some()
    }
}

#[derive(Debug, Deserialize)]
struct ExportChunk {
    results: Vec<MedicationRecord>,
}

/// Load medication records from an export file.
///
/// # Errors
///
/// Returns an error if the file cannot be read, is not valid JSON, does not
/// have the export shape, or holds no records.
pub fn load_medications(path: impl AsRef<Path>) -> Result<Vec<MedicationRecord>> {
    let path = path.as_ref();
    let data = std::fs::read_to_string(path).map_err(|e| Error::io(e, path))?;
    let records = parse_export(&data)?;
    tracing::info!(
        path = %path.display(),
        records = records.len(),
        "Loaded medication export"
    );
    Ok(records)
}

/// Parse an export document held in memory.
///
/// # Errors
///
/// Returns an error if the JSON is malformed, the outer sequence is empty,
/// a record lacks a required key, or there are no records.
pub fn parse_export(data: &str) -> Result<Vec<MedicationRecord>> {
    let chunks: Vec<ExportChunk> = serde_json::from_str(data)?;
    let first = chunks
        .into_iter()
        .next()
        .ok_or_else(|| Error::parse("export is an empty sequence"))?;

    if first.results.is_empty() {
        return Err(Error::EmptyExport);
    }

    warn_duplicate_ids(&first.results);
    Ok(first.results)
}

fn warn_duplicate_ids(records: &[MedicationRecord]) {
    let mut seen = HashSet::with_capacity(records.len());
    for record in records {
        if !seen.insert(record.id) {
            tracing::warn!(
                id = record.id,
                name = %record.name,
                "Duplicate medication id in export"
            );
        }
    }
}
