use std::collections::BTreeMap;
use tracing::debug;

use crate::table::CanonicalField;

/// Keyword rule over a lower-cased column name.
type Rule = (fn(&str) -> bool, CanonicalField);

/// Evaluated top to bottom; the first hit decides a column's target.
const RULES: &[Rule] = &[
    (is_date, CanonicalField::Date),
    (is_startup, CanonicalField::StartupName),
    (is_industry, CanonicalField::Industry),
    (is_city, CanonicalField::City),
    (is_investor, CanonicalField::Investor),
    (is_amount, CanonicalField::Amount),
    (is_investment_type, CanonicalField::InvestmentType),
];

fn is_date(c: &str) -> bool {
    c.contains("date")
}

fn is_startup(c: &str) -> bool {
    c.contains("startup") || (c.contains("company") && !c.contains("investor"))
}

fn is_industry(c: &str) -> bool {
    c.contains("industry") || c.contains("vertical")
}

fn is_city(c: &str) -> bool {
    c.contains("city") || c.contains("location")
}

fn is_investor(c: &str) -> bool {
    c.contains("investor")
}

fn is_amount(c: &str) -> bool {
    c.contains("amount") || c.contains("funding")
}

fn is_investment_type(c: &str) -> bool {
    c.contains("type") && c.contains("investment")
}

/// The semantic target a single column name would map to.
pub fn classify(column: &str) -> Option<CanonicalField> {
    let lower = column.to_lowercase();
    RULES
        .iter()
        .find(|(rule, _)| rule(lower.as_str()))
        .map(|(_, target)| *target)
}

/// Canonical field -> index of the raw column feeding it.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ColumnMapping {
    assigned: BTreeMap<CanonicalField, usize>,
}

impl ColumnMapping {
    pub fn index_of(&self, field: CanonicalField) -> Option<usize> {
        self.assigned.get(&field).copied()
    }

    pub fn contains(&self, field: CanonicalField) -> bool {
        self.assigned.contains_key(&field)
    }

    pub fn len(&self) -> usize {
        self.assigned.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assigned.is_empty()
    }
}

/// Map cleaned headers onto canonical fields.
///
/// A target keeps the first column assigned to it; later columns hitting
/// the same target are ignored, as are columns hitting no rule.
pub fn infer_columns(headers: &[String]) -> ColumnMapping {
    let mut mapping = ColumnMapping::default();
    for (idx, name) in headers.iter().enumerate() {
        match classify(name) {
            Some(target) if !mapping.contains(target) => {
                debug!(column = %name, target = %target, "mapped column");
                mapping.assigned.insert(target, idx);
            }
            Some(target) => {
                debug!(column = %name, target = %target, "target already mapped, ignoring column");
            }
            None => {
                debug!(column = %name, "no semantic match");
            }
        }
    }
    mapping
}
