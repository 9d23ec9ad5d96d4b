use serde::{Deserialize, Serialize};

use crate::table::{CanonicalField, CanonicalRecord, CanonicalTable};

/// How many industries / cities the dashboard pre-selects.
const DEFAULT_SELECTION: usize = 6;

/// Membership filter over Year, Industry and City.
///
/// An empty list places no constraint on that column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableFilter {
    pub years: Vec<i32>,
    pub industries: Vec<String>,
    pub cities: Vec<String>,
}

impl TableFilter {
    /// All years, plus the first few industries and cities in sorted order.
    pub fn dashboard_default(table: &CanonicalTable) -> Self {
        let first = |field| -> Vec<String> {
            table
                .distinct(field)
                .into_iter()
                .take(DEFAULT_SELECTION)
                .collect()
        };
        Self {
            years: table.years(),
            industries: first(CanonicalField::Industry),
            cities: first(CanonicalField::City),
        }
    }

    pub fn matches(&self, record: &CanonicalRecord) -> bool {
        (self.years.is_empty() || self.years.contains(&record.year))
            && (self.industries.is_empty() || self.industries.contains(&record.industry))
            && (self.cities.is_empty() || self.cities.contains(&record.city))
    }

    pub fn apply(&self, table: &CanonicalTable) -> CanonicalTable {
        table.retain_matching(|r| self.matches(r))
    }
}
