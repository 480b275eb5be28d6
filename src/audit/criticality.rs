//! Category Criticality Table
//!
//! Curated mapping from medication category to the fields that are
//! safety-critical for that category. The table is reference data, not
//! derived from the export, and is passed explicitly into the auditor so a
//! deployment can swap in its own.
//!
//! # Example
//!
//! ```
//! use medaudit::audit::{CriticalField, CriticalityTable};
//!
//! let table = CriticalityTable::builtin();
//! let opioids = table.get(18).unwrap();
//! assert!(opioids.is_critical(CriticalField::Cyp));
//! ```

use std::{collections::HashSet, fmt, path::Path};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A record field whose completeness can be safety-critical
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriticalField {
    /// `withdrawal_risk_score`
    Withdrawal,
    /// `cyp450_enzyme`
    Cyp,
    /// `half_life_hours`
    HalfLife,
}

impl CriticalField {
    /// Short name used in reports and configuration files
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Withdrawal => "withdrawal",
            Self::Cyp => "cyp",
            Self::HalfLife => "half_life",
        }
    }
}

impl fmt::Display for CriticalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Critical fields for one category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CategoryCriticalityRule {
    /// Category identifier
    pub id: i64,
    /// Human-readable category name
    pub name: String,
    /// Safety-critical fields, in declared order
    pub critical: Vec<CriticalField>,
}

impl CategoryCriticalityRule {
    /// Create a rule
    pub fn new(id: i64, name: impl Into<String>, critical: &[CriticalField]) -> Self {
        Self {
            id,
            name: name.into(),
            critical: critical.to_vec(),
        }
    }

    /// Whether `field` is critical for this category
    pub fn is_critical(&self, field: CriticalField) -> bool {
        self.critical.contains(&field)
    }

    /// Comma-joined critical field names
    pub fn critical_list(&self) -> String {
        self.critical
            .iter()
            .map(CriticalField::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Ordered, immutable category criticality table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CriticalityTable {
    rules: Vec<CategoryCriticalityRule>,
}

impl Default for CriticalityTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl CriticalityTable {
    /// Build a table, rejecting duplicate category ids.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if a category id appears twice or a
    /// rule lists no critical fields.
    pub fn new(rules: Vec<CategoryCriticalityRule>) -> Result<Self> {
        let mut seen = HashSet::new();
        for rule in &rules {
            if !seen.insert(rule.id) {
                return Err(Error::invalid_config(format!(
                    "duplicate category id {} in criticality table",
                    rule.id
                )));
            }
            if rule.critical.is_empty() {
                return Err(Error::invalid_config(format!(
                    "category {} lists no critical fields",
                    rule.id
                )));
            }
        }
        Ok(Self { rules })
    }

    /// The curated table used by the production audit.
    #[must_use]
    pub fn builtin() -> Self {
        use CriticalField::{Cyp, HalfLife, Withdrawal};

        let rule = CategoryCriticalityRule::new;

        let rules = vec![
            // Psychopharmaka
            rule(2, "Antidepressiva (trizyklisch)", &[Withdrawal, Cyp, HalfLife]),
            rule(3, "Antikonvulsiva", &[Withdrawal, HalfLife]),
            rule(5, "Antipsychotika", &[Withdrawal, Cyp, HalfLife]),
            rule(15, "ADHS-Medikamente", &[Withdrawal]),
            rule(16, "Hypnotika (Schlafmittel)", &[Withdrawal, HalfLife]),
            rule(17, "Anxiolytika (Benzodiazepine)", &[Withdrawal, HalfLife]),
            rule(18, "Opioide", &[Withdrawal, Cyp, HalfLife]),
            rule(25, "Antidepressiva (SSRI/SNRI)", &[Withdrawal, Cyp, HalfLife]),
            // Cardiovascular
            rule(6, "Statine", &[Cyp]),
            rule(19, "Antihypertensiva", &[HalfLife]),
            rule(24, "Antikoagulantien", &[Cyp, HalfLife]),
            rule(8, "Immunsuppressiva", &[Cyp, HalfLife, Withdrawal]),
            // Sonstige
            rule(21, "Corticosteroide", &[Withdrawal, HalfLife]),
            rule(26, "Hormonpräparate", &[Cyp, HalfLife]),
        ];

        Self { rules }
    }

    /// Parse a table from a JSON array of `{id, name, critical}` objects.
    ///
    /// # Errors
    ///
    /// Returns an error on malformed JSON, unknown field names, or an
    /// invalid table.
    pub fn from_json_str(data: &str) -> Result<Self> {
        let rules: Vec<CategoryCriticalityRule> = serde_json::from_str(data)?;
        Self::new(rules)
    }

    /// Load a table from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(|e| Error::io(e, path))?;
        let table = Self::from_json_str(&data)?;
        tracing::info!(
            path = %path.display(),
            categories = table.len(),
            "Loaded criticality table"
        );
        Ok(table)
    }

    /// Rule for a category id
    pub fn get(&self, category_id: i64) -> Option<&CategoryCriticalityRule> {
        self.rules.iter().find(|r| r.id == category_id)
    }

    /// Rules in declared order
    pub fn iter(&self) -> impl Iterator<Item = &CategoryCriticalityRule> {
        self.rules.iter()
    }

    /// Number of categories
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the table has no categories
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
