// src/analytics/mod.rs
pub mod filter;

pub use filter::TableFilter;

use serde::Serialize;
use std::{
    cmp::Ordering,
    collections::{BTreeMap, HashMap, HashSet},
};

use crate::table::{CanonicalField, CanonicalRecord, CanonicalTable, Origin};

/// Groups shown in ranked charts and tables.
const TOP_N: usize = 10;
/// Groups kept on each axis of the heatmap and the stacked type chart.
const TOP_AXIS: usize = 6;

/// Headline numbers for a (filtered) table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyMetrics {
    pub total_funding: f64,
    pub startups: usize,
    pub deals: usize,
    /// `None` on an empty table.
    pub average_deal: Option<f64>,
    pub investors: usize,
}

impl KeyMetrics {
    pub fn compute(table: &CanonicalTable) -> Self {
        let total_funding: f64 = table.iter().map(|r| r.amount).sum();
        let deals = table.len();
        Self {
            total_funding,
            startups: count_distinct(table.records(), CanonicalField::StartupName),
            deals,
            average_deal: (deals > 0).then(|| total_funding / deals as f64),
            investors: count_distinct(table.records(), CanonicalField::Investor),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupTotal {
    pub key: String,
    pub total: f64,
    pub deals: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupCount {
    pub key: String,
    pub count: usize,
}

/// Per-group aggregate row of the performance tables.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    pub key: String,
    pub total: f64,
    pub mean: f64,
    pub deals: usize,
    pub startups: usize,
    pub investors: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum DealSize {
    UnderOneMillion,
    OneToFive,
    FiveToTen,
    TenToFifty,
    OverFifty,
}

impl DealSize {
    pub const ALL: [DealSize; 5] = [
        DealSize::UnderOneMillion,
        DealSize::OneToFive,
        DealSize::FiveToTen,
        DealSize::TenToFifty,
        DealSize::OverFifty,
    ];

    /// Right-closed buckets: (0, 1M], (1M, 5M], (5M, 10M], (10M, 50M], (50M, inf).
    pub fn of(amount: f64) -> Self {
        if amount <= 1e6 {
            DealSize::UnderOneMillion
        } else if amount <= 5e6 {
            DealSize::OneToFive
        } else if amount <= 10e6 {
            DealSize::FiveToTen
        } else if amount <= 50e6 {
            DealSize::TenToFifty
        } else {
            DealSize::OverFifty
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DealSize::UnderOneMillion => "<$1M",
            DealSize::OneToFive => "$1M-$5M",
            DealSize::FiveToTen => "$5M-$10M",
            DealSize::TenToFifty => "$10M-$50M",
            DealSize::OverFifty => ">$50M",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DealSizeCount {
    pub bucket: &'static str,
    pub count: usize,
}

/// Funding totals on a rows x columns grid, zero where no deal exists.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FundingMatrix {
    pub rows: Vec<String>,
    pub columns: Vec<String>,
    pub cells: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeCount {
    pub industry: String,
    pub investment_type: String,
    pub count: usize,
}

fn key_of(record: &CanonicalRecord, field: CanonicalField) -> String {
    record.get(field).to_string()
}

fn count_distinct(records: &[CanonicalRecord], field: CanonicalField) -> usize {
    records
        .iter()
        .map(|r| key_of(r, field))
        .collect::<HashSet<_>>()
        .len()
}

/// Largest first, ties broken by key so output is stable.
fn by_total_desc(a: &GroupTotal, b: &GroupTotal) -> Ordering {
    b.total.total_cmp(&a.total).then_with(|| a.key.cmp(&b.key))
}

/// Top `n` groups of `field` by summed amount.
pub fn top_by_funding(table: &CanonicalTable, field: CanonicalField, n: usize) -> Vec<GroupTotal> {
    let mut groups: HashMap<String, GroupTotal> = HashMap::new();
    for r in table {
        let key = key_of(r, field);
        let g = groups.entry(key.clone()).or_insert(GroupTotal {
            key,
            total: 0.0,
            deals: 0,
        });
        g.total += r.amount;
        g.deals += 1;
    }
    let mut out: Vec<GroupTotal> = groups.into_values().collect();
    out.sort_by(by_total_desc);
    out.truncate(n);
    out
}

/// Deal count per value of `field`, most frequent first.
pub fn deal_counts(table: &CanonicalTable, field: CanonicalField) -> Vec<GroupCount> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for r in table {
        *counts.entry(key_of(r, field)).or_default() += 1;
    }
    let mut out: Vec<GroupCount> = counts
        .into_iter()
        .map(|(key, count)| GroupCount { key, count })
        .collect();
    out.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.key.cmp(&b.key)));
    out
}

/// Counts in bucket order; empty buckets are reported as zero.
pub fn deal_size_distribution(table: &CanonicalTable) -> Vec<DealSizeCount> {
    let mut counts: BTreeMap<DealSize, usize> = DealSize::ALL.iter().map(|b| (*b, 0)).collect();
    for r in table {
        *counts.entry(DealSize::of(r.amount)).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(bucket, count)| DealSizeCount {
            bucket: bucket.label(),
            count,
        })
        .collect()
}

/// Aggregates per value of `field`, in key order.
pub fn summarize_by(table: &CanonicalTable, field: CanonicalField) -> Vec<GroupSummary> {
    let mut groups: BTreeMap<String, Vec<&CanonicalRecord>> = BTreeMap::new();
    for r in table {
        groups.entry(key_of(r, field)).or_default().push(r);
    }
    groups
        .into_iter()
        .map(|(key, rows)| {
            let total: f64 = rows.iter().map(|r| r.amount).sum();
            let startups: HashSet<&str> = rows.iter().map(|r| r.startup_name.as_str()).collect();
            let investors: HashSet<&str> = rows.iter().map(|r| r.investor.as_str()).collect();
            GroupSummary {
                key,
                total,
                mean: total / rows.len() as f64,
                deals: rows.len(),
                startups: startups.len(),
                investors: investors.len(),
            }
        })
        .collect()
}

/// Industry performance table: busiest industries first.
pub fn industry_performance(table: &CanonicalTable) -> Vec<GroupSummary> {
    let mut rows = summarize_by(table, CanonicalField::Industry);
    rows.sort_by(|a, b| b.deals.cmp(&a.deals).then_with(|| a.key.cmp(&b.key)));
    rows.truncate(TOP_N);
    rows
}

/// City ranking: cities with the most distinct startups first.
pub fn city_ranking(table: &CanonicalTable) -> Vec<GroupSummary> {
    let mut rows = summarize_by(table, CanonicalField::City);
    rows.sort_by(|a, b| b.startups.cmp(&a.startups).then_with(|| a.key.cmp(&b.key)));
    rows.truncate(TOP_N);
    rows
}

fn most_frequent(table: &CanonicalTable, field: CanonicalField, n: usize) -> Vec<String> {
    deal_counts(table, field)
        .into_iter()
        .take(n)
        .map(|g| g.key)
        .collect()
}

/// Funding of `row_field` x `col_field`, limited to the `top` most active
/// values on each axis.
pub fn funding_matrix(
    table: &CanonicalTable,
    row_field: CanonicalField,
    col_field: CanonicalField,
    top: usize,
) -> FundingMatrix {
    let rows = most_frequent(table, row_field, top);
    let columns = most_frequent(table, col_field, top);
    let mut cells = vec![vec![0.0; columns.len()]; rows.len()];
    for r in table {
        let ri = rows.iter().position(|k| *k == key_of(r, row_field));
        let ci = columns.iter().position(|k| *k == key_of(r, col_field));
        if let (Some(ri), Some(ci)) = (ri, ci) {
            cells[ri][ci] += r.amount;
        }
    }
    FundingMatrix {
        rows,
        columns,
        cells,
    }
}

/// Investment type counts within the `top` most active industries.
pub fn types_by_industry(table: &CanonicalTable, top: usize) -> Vec<TypeCount> {
    let industries = most_frequent(table, CanonicalField::Industry, top);
    let mut counts: BTreeMap<(String, String), usize> = BTreeMap::new();
    for r in table.iter().filter(|r| industries.contains(&r.industry)) {
        *counts
            .entry((r.industry.clone(), r.investment_type.clone()))
            .or_default() += 1;
    }
    counts
        .into_iter()
        .map(|((industry, investment_type), count)| TypeCount {
            industry,
            investment_type,
            count,
        })
        .collect()
}

/// `$12.3M`
pub fn format_millions(amount: f64) -> String {
    format!("${:.1}M", amount / 1e6)
}

/// Everything the dashboard shows, in one serializable value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardReport {
    pub origin: Origin,
    pub filter: TableFilter,
    pub metrics: KeyMetrics,
    pub top_industries: Vec<GroupTotal>,
    pub industry_deals: Vec<GroupCount>,
    pub types_by_industry: Vec<TypeCount>,
    pub industry_performance: Vec<GroupSummary>,
    pub top_investors: Vec<GroupTotal>,
    pub top_startups: Vec<GroupTotal>,
    pub investment_rounds: Vec<GroupCount>,
    pub deal_sizes: Vec<DealSizeCount>,
    pub city_funding: Vec<GroupTotal>,
    pub city_ranking: Vec<GroupSummary>,
    pub city_industry_heatmap: FundingMatrix,
}

impl DashboardReport {
    /// Apply `filter` to `table` and aggregate the result.
    pub fn build(table: &CanonicalTable, filter: &TableFilter) -> Self {
        let t = filter.apply(table);
        Self {
            origin: t.origin().clone(),
            filter: filter.clone(),
            metrics: KeyMetrics::compute(&t),
            top_industries: top_by_funding(&t, CanonicalField::Industry, TOP_N),
            industry_deals: deal_counts(&t, CanonicalField::Industry)
                .into_iter()
                .take(8)
                .collect(),
            types_by_industry: types_by_industry(&t, TOP_AXIS),
            industry_performance: industry_performance(&t),
            top_investors: top_by_funding(&t, CanonicalField::Investor, TOP_N),
            top_startups: top_by_funding(&t, CanonicalField::StartupName, TOP_N),
            investment_rounds: deal_counts(&t, CanonicalField::InvestmentType),
            deal_sizes: deal_size_distribution(&t),
            city_funding: top_by_funding(&t, CanonicalField::City, 8),
            city_ranking: city_ranking(&t),
            city_industry_heatmap: funding_matrix(
                &t,
                CanonicalField::City,
                CanonicalField::Industry,
                TOP_AXIS,
            ),
        }
    }
}
