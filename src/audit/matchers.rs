//! Text Matcher Rules
//!
//! Substring heuristics over free-form clinical text. Each rule maps a
//! lowercase phrase to a classification; scans are case-insensitive and
//! independent, so one text may match several rules of several classes.

use std::fmt;

use serde::Serialize;

/// What a matched phrase says about a medication
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchClass {
    /// Names a specific CYP-450 isoenzyme
    CypEnzyme,
    /// Marks the drug as not (or barely) CYP-metabolized
    NonCyp,
    /// Generic-name fragment of a high-dependency drug class
    HighDependency,
}

impl fmt::Display for MatchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CypEnzyme => write!(f, "CYP enzyme"),
            Self::NonCyp => write!(f, "non-CYP marker"),
            Self::HighDependency => write!(f, "high-dependency fragment"),
        }
    }
}

/// A single phrase-to-classification rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchRule {
    /// Lowercase phrase searched for as a substring
    pub phrase: String,
    /// Classification assigned on a match
    pub class: MatchClass,
}

impl MatchRule {
    /// Create a rule; the phrase is lowercased.
    pub fn new(phrase: impl AsRef<str>, class: MatchClass) -> Self {
        Self {
            phrase: phrase.as_ref().to_lowercase(),
            class,
        }
    }
}

const NON_CYP_MARKERS: [&str; 7] = [
    "kein cyp",
    "no cyp",
    "minimal cyp",
    "non-cyp",
    "renal",
    "glukuronidierung",
    "glucuronidation",
];

const CYP_ENZYMES: [&str; 9] = [
    "cyp3a4", "cyp2d6", "cyp2c9", "cyp2c19", "cyp1a2", "cyp2c8", "cyp2b6", "cyp2e1", "cyp2j2",
];

const HIGH_DEPENDENCY_FRAGMENTS: [&str; 7] = [
    "benzo", "opioid", "opiate", "zepam", "odon", "morphin", "fentanyl",
];

/// Ordered set of matcher rules
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatcherRules {
    rules: Vec<MatchRule>,
}

impl Default for MatcherRules {
    fn default() -> Self {
        let rules = NON_CYP_MARKERS
            .iter()
            .map(|p| MatchRule::new(p, MatchClass::NonCyp))
            .chain(
                CYP_ENZYMES
                    .iter()
                    .map(|p| MatchRule::new(p, MatchClass::CypEnzyme)),
            )
            .chain(
                HIGH_DEPENDENCY_FRAGMENTS
                    .iter()
                    .map(|p| MatchRule::new(p, MatchClass::HighDependency)),
            )
            .collect();
        Self { rules }
    }
}

impl MatcherRules {
    /// Empty rule set
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Append a rule at the end of the list
    #[must_use]
    pub fn with_rule(mut self, phrase: impl AsRef<str>, class: MatchClass) -> Self {
        self.rules.push(MatchRule::new(phrase, class));
        self
    }

    /// All rules in declared order
    pub fn rules(&self) -> &[MatchRule] {
        &self.rules
    }

    /// Rules of one class, in declared order
    pub fn of_class(&self, class: MatchClass) -> impl Iterator<Item = &MatchRule> {
        self.rules.iter().filter(move |r| r.class == class)
    }

    /// Phrases of `class` contained in `text`, in rule order
    pub fn matches<'a>(&'a self, text: &str, class: MatchClass) -> Vec<&'a str> {
        let lower = text.to_lowercase();
        self.of_class(class)
            .filter(|r| lower.contains(r.phrase.as_str()))
            .map(|r| r.phrase.as_str())
            .collect()
    }

    /// Whether any phrase of `class` is contained in `text`
    pub fn any_match(&self, text: &str, class: MatchClass) -> bool {
        let lower = text.to_lowercase();
        self.of_class(class).any(|r| lower.contains(r.phrase.as_str()))
    }

    /// Classify a CYP-450 text field.
    pub fn analyze_cyp(&self, text: Option<&str>) -> CypAnalysis {
        let text = match text {
            Some(t) if !t.is_empty() => t,
            _ => return CypAnalysis::default(),
        };

        let enzymes: Vec<String> = self
            .matches(text, MatchClass::CypEnzyme)
            .into_iter()
            .map(str::to_string)
            .collect();

        CypAnalysis {
            has_cyp: !enzymes.is_empty(),
            enzymes,
            is_non_cyp: self.any_match(text, MatchClass::NonCyp),
        }
    }

    /// Whether a generic name looks like a high-dependency drug
    pub fn is_high_dependency(&self, generic_name: &str) -> bool {
        self.any_match(generic_name, MatchClass::HighDependency)
    }
}

/// Result of classifying a CYP-450 text field
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CypAnalysis {
    /// At least one known isoenzyme was named
    pub has_cyp: bool,
    /// Recognized isoenzymes, in rule order
    pub enzymes: Vec<String>,
    /// Text explicitly states a non-CYP elimination route
    pub is_non_cyp: bool,
}

impl CypAnalysis {
    /// Neither an enzyme nor a non-CYP marker was found.
    ///
    /// Absent text counts as missing: lack of data is not a confirmed
    /// absence of CYP involvement.
    pub fn is_missing(&self) -> bool {
        !self.has_cyp && !self.is_non_cyp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rule_counts() {
        let rules = MatcherRules::default();
        assert_eq!(rules.of_class(MatchClass::NonCyp).count(), 7);
        assert_eq!(rules.of_class(MatchClass::CypEnzyme).count(), 9);
        assert_eq!(rules.of_class(MatchClass::HighDependency).count(), 7);
    }

    #[test]
    fn test_case_insensitive_enzyme() {
        let rules = MatcherRules::default();
        for text in ["CYP3A4", "cyp3a4", "Cyp3A4"] {
            let analysis = rules.analyze_cyp(Some(text));
            assert!(analysis.has_cyp, "{text}");
            assert_eq!(analysis.enzymes, vec!["cyp3a4".to_string()]);
        }
    }

    #[test]
    fn test_multiple_enzymes_in_rule_order() {
        let rules = MatcherRules::default();
        let analysis = rules.analyze_cyp(Some("CYP2C19 (major), CYP3A4 (minor), CYP2D6"));
        assert_eq!(analysis.enzymes, vec!["cyp3a4", "cyp2d6", "cyp2c19"]);
    }

    #[test]
    fn test_non_cyp_marker_exempts() {
        let rules = MatcherRules::default();
        let analysis = rules.analyze_cyp(Some("renal elimination, no CYP involvement"));
        assert!(!analysis.has_cyp);
        assert!(analysis.is_non_cyp);
        assert!(!analysis.is_missing());
    }

    #[test]
    fn test_german_marker() {
        let rules = MatcherRules::default();
        let analysis = rules.analyze_cyp(Some("Glukuronidierung (UGT2B7)"));
        assert!(analysis.is_non_cyp);
    }

    #[test]
    fn test_absent_and_empty_are_missing() {
        let rules = MatcherRules::default();
        for text in [None, Some("")] {
            let analysis = rules.analyze_cyp(text);
            assert!(!analysis.has_cyp);
            assert!(!analysis.is_non_cyp);
            assert!(analysis.is_missing());
        }
    }

    #[test]
    fn test_unrecognized_text_is_missing() {
        let rules = MatcherRules::default();
        assert!(rules.analyze_cyp(Some("hepatisch")).is_missing());
    }

    #[test]
    fn test_enzyme_and_marker_together() {
        let rules = MatcherRules::default();
        let analysis = rules.analyze_cyp(Some("CYP2C9, partly renal"));
        assert!(analysis.has_cyp);
        assert!(analysis.is_non_cyp);
    }

    #[test]
    fn test_high_dependency_fragments() {
        let rules = MatcherRules::default();
        assert!(rules.is_high_dependency("Lorazepam"));
        assert!(rules.is_high_dependency("Oxycodon"));
        assert!(rules.is_high_dependency("Morphin"));
        assert!(rules.is_high_dependency("FENTANYL"));
        assert!(!rules.is_high_dependency("Ibuprofen"));
    }

    #[test]
    fn test_custom_rule() {
        let rules = MatcherRules::default().with_rule("Tramadol", MatchClass::HighDependency);
        assert!(rules.is_high_dependency("tramadol"));
        assert_eq!(
            rules.rules().last().map(|r| r.phrase.as_str()),
            Some("tramadol")
        );
    }

    #[test]
    fn test_empty_rules_never_match() {
        let rules = MatcherRules::empty();
        assert!(rules.analyze_cyp(Some("CYP3A4")).is_missing());
        assert!(!rules.is_high_dependency("Lorazepam"));
    }
}
