//! # Geometry Selector
//!
//! Decides whether a sensor identifier belongs to a configured region.
//!
//! ## Rule grammar
//!
//! ```text
//! category='calorimeter_block' module={0} side={1} column={2} row={*} part={*}
//! category='drift_cell_core' module={0} side={1} layer={*} row={11;12}
//! ```
//!
//! Each address field takes a wildcard `{*}`, a literal `{3}` or a literal
//! set `{3; 4; 5}`. Fields left out of the rule accept any value. The
//! category must be one of the known categories.
//!
//! A selector with no rule loaded never matches.

use super::{Category, SensorId};
use crate::error::{HcError, Result};
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use tracing::{debug, warn};

/// Predicate applied to one address field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldPredicate {
    Any,
    Equals(u32),
    OneOf(BTreeSet<u32>),
}

impl FieldPredicate {
    pub fn accepts(&self, value: u32) -> bool {
        match self {
            FieldPredicate::Any => true,
            FieldPredicate::Equals(v) => *v == value,
            FieldPredicate::OneOf(set) => set.contains(&value),
        }
    }

    fn parse(field: &str, text: &str) -> Result<Self> {
        let inner = text
            .strip_prefix('{')
            .and_then(|t| t.strip_suffix('}'))
            .ok_or_else(|| {
                HcError::configuration(format!(
                    "field '{}': value '{}' must be enclosed in braces",
                    field, text
                ))
            })?
            .trim();

        if inner == "*" {
            return Ok(FieldPredicate::Any);
        }
        if inner.is_empty() {
            return Err(HcError::configuration(format!(
                "field '{}': empty value list",
                field
            )));
        }

        let mut values = BTreeSet::new();
        for item in inner.split(';') {
            let item = item.trim();
            let value = item.parse::<u32>().map_err(|_| {
                HcError::configuration(format!(
                    "field '{}': '{}' is not a non-negative integer",
                    field, item
                ))
            })?;
            values.insert(value);
        }

        match (values.len(), values.first()) {
            (1, Some(&value)) => Ok(FieldPredicate::Equals(value)),
            _ => Ok(FieldPredicate::OneOf(values)),
        }
    }
}

impl fmt::Display for FieldPredicate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FieldPredicate::Any => write!(f, "{{*}}"),
            FieldPredicate::Equals(v) => write!(f, "{{{}}}", v),
            FieldPredicate::OneOf(set) => {
                let items: Vec<String> = set.iter().map(|v| v.to_string()).collect();
                write!(f, "{{{}}}", items.join(";"))
            }
        }
    }
}

/// Split rule text into `key=value` pairs.
///
/// Whitespace is allowed around `=` and inside a braced or quoted value.
fn split_assignments(text: &str) -> Result<Vec<(&str, &str)>> {
    let malformed =
        |token: &str| HcError::configuration(format!("malformed rule token '{}'", token.trim()));

    let mut pairs = Vec::new();
    let mut rest = text.trim_start();
    while !rest.is_empty() {
        let eq = rest.find('=').ok_or_else(|| malformed(rest))?;
        let key = rest[..eq].trim();
        if key.is_empty() || key.contains(char::is_whitespace) {
            return Err(malformed(&rest[..eq]));
        }
        let value = rest[eq + 1..].trim_start();
        let end = match value.chars().next() {
            Some('{') => value.find('}').map(|i| i + 1),
            Some(quote @ ('\'' | '"')) => value[1..].find(quote).map(|i| i + 2),
            Some(_) => Some(value.find(char::is_whitespace).unwrap_or(value.len())),
            None => None,
        }
        .ok_or_else(|| malformed(rest))?;
        pairs.push((key, &value[..end]));
        rest = value[end..].trim_start();
    }
    Ok(pairs)
}

/// Conjunction of per-field predicates for one category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorRule {
    pub category: Category,
    /// One predicate per address field of `category`, in address order.
    pub predicates: Vec<FieldPredicate>,
}

impl SelectorRule {
    /// Parse a rule from its textual form.
    pub fn parse(text: &str) -> Result<Self> {
        let mut category: Option<Category> = None;
        let mut assignments: Vec<(String, String)> = Vec::new();

        for (key, value) in split_assignments(text)? {
            if key == "category" {
                if category.is_some() {
                    return Err(HcError::configuration("category given twice"));
                }
                let name = value.trim().trim_matches(|c| c == '\'' || c == '"');
                category = Some(Category::from_name(name)?);
            } else {
                assignments.push((key.to_string(), value.to_string()));
            }
        }

        let category =
            category.ok_or_else(|| HcError::configuration("rule has no category"))?;

        let mut predicates = vec![FieldPredicate::Any; category.fields().len()];
        let mut seen = BTreeSet::new();
        for (field, value) in assignments {
            let index = category.field_index(&field).ok_or_else(|| {
                HcError::configuration(format!(
                    "category '{}' has no field '{}'",
                    category, field
                ))
            })?;
            if !seen.insert(index) {
                return Err(HcError::configuration(format!(
                    "field '{}' given twice",
                    field
                )));
            }
            predicates[index] = FieldPredicate::parse(&field, &value)?;
        }

        Ok(Self {
            category,
            predicates,
        })
    }

    pub fn matches(&self, id: &SensorId) -> bool {
        if id.category != self.category || id.address.len() != self.predicates.len() {
            return false;
        }
        self.predicates
            .iter()
            .zip(id.address.iter())
            .all(|(predicate, value)| predicate.accepts(*value))
    }
}

impl fmt::Display for SelectorRule {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "category='{}'", self.category)?;
        for (name, predicate) in self.category.fields().iter().zip(&self.predicates) {
            write!(f, " {}={}", name, predicate)?;
        }
        Ok(())
    }
}

/// Region selector; holds at most one rule.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selector {
    rule: Option<SelectorRule>,
}

impl Selector {
    /// A selector with no rule. It never matches.
    pub fn unconfigured() -> Self {
        Self { rule: None }
    }

    /// Build a selector from rule text. Malformed text is a configuration error.
    pub fn initialize(rule_text: &str) -> Result<Self> {
        let rule = SelectorRule::parse(rule_text)?;
        debug!(rule = %rule, "selector initialized");
        Ok(Self { rule: Some(rule) })
    }

    /// Build a selector from a rule file.
    ///
    /// Lines starting with `#` are ignored and the remaining lines are joined.
    /// A file with no rule text leaves the selector unconfigured.
    pub fn from_rules_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            HcError::configuration(format!(
                "cannot read selector rules {}: {}",
                path.display(),
                e
            ))
        })?;
        let text: Vec<&str> = content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .collect();
        if text.is_empty() {
            warn!(path = %path.display(), "empty selector rules, selector left unconfigured");
            return Ok(Self::unconfigured());
        }
        Self::initialize(&text.join(" "))
    }

    pub fn is_configured(&self) -> bool {
        self.rule.is_some()
    }

    pub fn rule(&self) -> Option<&SelectorRule> {
        self.rule.as_ref()
    }

    /// `true` iff a rule is loaded and every field predicate accepts `id`.
    pub fn matches(&self, id: &SensorId) -> bool {
        self.rule.as_ref().map_or(false, |rule| rule.matches(id))
    }

    /// Text rendering of the loaded rule, for debug dumps.
    pub fn dump(&self, title: &str) -> String {
        match &self.rule {
            Some(rule) => format!("{} {}", title, rule),
            None => format!("{} <unconfigured>", title),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const CALO_RULE: &str =
        "category='calorimeter_block' module={0} side={1} column={2} row={*} part={*}";
    const GEIGER_RULE: &str = "category='drift_cell_core' module={0} side={1} layer={*} row={11;12}";

    #[test]
    fn test_parse_calo_rule() {
        let rule = SelectorRule::parse(CALO_RULE).unwrap();
        assert_eq!(rule.category, Category::CalorimeterBlock);
        assert_eq!(rule.predicates[2], FieldPredicate::Equals(2));
        assert_eq!(rule.predicates[3], FieldPredicate::Any);
    }

    #[test]
    fn test_match_literal_and_wildcard() {
        let selector = Selector::initialize(CALO_RULE).unwrap();
        assert!(selector.matches(&SensorId::calo(0, 1, 2, 0, 0)));
        assert!(selector.matches(&SensorId::calo(0, 1, 2, 12, 1)));
        assert!(!selector.matches(&SensorId::calo(0, 0, 2, 5, 0)));
        assert!(!selector.matches(&SensorId::calo(0, 1, 3, 5, 0)));
    }

    #[test]
    fn test_match_literal_set() {
        let selector = Selector::initialize(GEIGER_RULE).unwrap();
        assert!(selector.matches(&SensorId::geiger(0, 1, 0, 11)));
        assert!(selector.matches(&SensorId::geiger(0, 1, 8, 12)));
        assert!(!selector.matches(&SensorId::geiger(0, 1, 8, 13)));
    }

    #[test]
    fn test_category_mismatch_never_matches() {
        let selector = Selector::initialize(GEIGER_RULE).unwrap();
        // Same address values, other category
        let mut id = SensorId::geiger(0, 1, 0, 11);
        id.category = Category::CalorimeterBlock;
        assert!(!selector.matches(&id));
    }

    #[test]
    fn test_omitted_fields_are_wildcards() {
        let selector = Selector::initialize("category='drift_cell_core' row={4}").unwrap();
        assert!(selector.matches(&SensorId::geiger(0, 0, 3, 4)));
        assert!(selector.matches(&SensorId::geiger(0, 1, 8, 4)));
        assert!(!selector.matches(&SensorId::geiger(0, 1, 8, 5)));
    }

    #[test]
    fn test_malformed_rules_are_configuration_errors() {
        let bad = [
            "",
            "module={0}",
            "category='scintillator' module={0}",
            "category='drift_cell_core' part={0}",
            "category='drift_cell_core' row=4",
            "category='drift_cell_core' row={a}",
            "category='drift_cell_core' row={}",
            "category='drift_cell_core' row={1} row={2}",
            "category='drift_cell_core' garbage",
        ];
        for text in bad {
            let err = Selector::initialize(text).unwrap_err();
            assert!(
                matches!(err, HcError::Configuration(_)),
                "expected configuration error for {:?}",
                text
            );
        }
    }

    #[test]
    fn test_whitespace_inside_values() {
        let rule = SelectorRule::parse(
            "category = 'drift_cell_core'  module={0} side= {1} row={11; 12} layer={ * }",
        )
        .unwrap();
        assert_eq!(rule, SelectorRule::parse(GEIGER_RULE).unwrap());

        assert!(Selector::initialize("category='drift_cell_core' row={11; 12").is_err());
        assert!(Selector::initialize("category='drift_cell_core' row=").is_err());
    }

    #[test]
    fn test_unconfigured_never_matches() {
        let selector = Selector::unconfigured();
        assert!(!selector.is_configured());
        assert!(!selector.matches(&SensorId::calo(0, 1, 2, 0, 0)));
        assert!(!selector.matches(&SensorId::geiger(0, 1, 0, 11)));
    }

    #[test]
    fn test_dump_renders_rule() {
        let selector = Selector::initialize(GEIGER_RULE).unwrap();
        assert_eq!(
            selector.dump("Geiger selector:"),
            "Geiger selector: category='drift_cell_core' module={0} side={1} layer={*} row={11;12}"
        );
        // Rendered text parses back to the same rule
        let reparsed = SelectorRule::parse(&selector.rule().unwrap().to_string()).unwrap();
        assert_eq!(&reparsed, selector.rule().unwrap());
    }

    #[test]
    fn test_empty_rules_file_leaves_selector_unconfigured() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# no rules for this run").unwrap();
        let selector = Selector::from_rules_file(file.path()).unwrap();
        assert!(!selector.is_configured());
    }

    #[test]
    fn test_rules_file_multiline() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "category='calorimeter_block'").unwrap();
        writeln!(file, "module={{0}} side={{1}}").unwrap();
        writeln!(file, "column={{1}}").unwrap();
        let selector = Selector::from_rules_file(file.path()).unwrap();
        assert!(selector.matches(&SensorId::calo(0, 1, 1, 6, 0)));
        assert!(!selector.matches(&SensorId::calo(0, 1, 2, 6, 0)));
    }
}
