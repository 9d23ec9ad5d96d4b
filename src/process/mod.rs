// src/process/mod.rs
pub mod amount;
pub mod columns;
pub mod date_parser;
pub mod dedup;
pub mod text;
pub mod utils;

use chrono::{Datelike, NaiveDate};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    load::{load_snapshot, load_source, LoadedSource, RawTable, Source, SourceSnapshot},
    synthetic::{self, SyntheticConfig},
    table::{CanonicalField, CanonicalRecord, CanonicalTable, FallbackReason, Origin},
};
use columns::{infer_columns, ColumnMapping};

/// Year assigned to every row when the input has no date column.
pub const NO_DATE_YEAR: i32 = 2023;

/// Placeholder amounts are drawn from this half-open range.
pub const PLACEHOLDER_AMOUNT_MIN: i64 = 100_000;
pub const PLACEHOLDER_AMOUNT_MAX: i64 = 10_000_000;

/// Knobs for one normalization run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NormalizeOptions {
    /// Seed for column backfill randomness; fresh entropy when unset.
    pub seed: Option<u64>,
    pub synthetic: SyntheticConfig,
}

/// Normalize `source` into a canonical table. Never fails: an unusable
/// source yields the synthetic table instead.
pub fn normalize(source: &Source, options: &NormalizeOptions) -> CanonicalTable {
    normalize_snapshot(&SourceSnapshot::take(source), options)
}

/// As [`normalize`], over input that has already been read.
pub fn normalize_snapshot(
    snapshot: &SourceSnapshot<'_>,
    options: &NormalizeOptions,
) -> CanonicalTable {
    let mut rng = match options.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    build_table(load_snapshot(snapshot), &options.synthetic, &mut rng)
}

/// As [`normalize`], with the backfill randomness supplied by the caller.
pub fn normalize_with_rng<R: Rng + ?Sized>(
    source: &Source,
    synthetic: &SyntheticConfig,
    rng: &mut R,
) -> CanonicalTable {
    build_table(load_source(source), synthetic, rng)
}

#[tracing::instrument(level = "info", skip_all)]
fn build_table<R: Rng + ?Sized>(
    loaded: Result<LoadedSource, FallbackReason>,
    synthetic: &SyntheticConfig,
    rng: &mut R,
) -> CanonicalTable {
    match loaded {
        Ok(loaded) => {
            let records = normalize_raw(&loaded.table, rng);
            info!(
                label = %loaded.label,
                raw_rows = loaded.table.rows.len(),
                rows = records.len(),
                "normalized input"
            );
            CanonicalTable::new(
                records,
                Origin::Source {
                    label: loaded.label,
                },
            )
        }
        Err(reason) => {
            warn!(%reason, "falling back to synthetic dataset");
            synthetic::synthetic_table(synthetic, reason)
        }
    }
}

/// A row that survived date and amount coercion.
struct Priced<'a> {
    row: &'a [String],
    date: Option<NaiveDate>,
    year: i32,
    amount: f64,
}

/// The pure cleaning pipeline over an already-read table.
pub fn normalize_raw<R: Rng + ?Sized>(raw: &RawTable, rng: &mut R) -> Vec<CanonicalRecord> {
    let headers = utils::clean_headers(&raw.headers);
    let mapping = infer_columns(&headers);
    info!(
        columns = headers.len(),
        mapped = mapping.len(),
        "inferred column mapping"
    );

    let dated = apply_dates(raw, &mapping);
    let priced = apply_amounts(dated, &mapping, rng);

    let records: Vec<CanonicalRecord> = priced
        .into_iter()
        .enumerate()
        .map(|(idx, p)| {
            let mut field_text = |field: CanonicalField| match mapping.index_of(field) {
                Some(col) => text::clean_text(p.row.get(col).map(String::as_str)),
                None => text::backfill_text(field, idx, rng),
            };
            CanonicalRecord {
                startup_name: field_text(CanonicalField::StartupName),
                industry: field_text(CanonicalField::Industry),
                city: field_text(CanonicalField::City),
                investor: field_text(CanonicalField::Investor),
                investment_type: field_text(CanonicalField::InvestmentType),
                amount: p.amount,
                date: p.date,
                year: p.year,
            }
        })
        .collect();

    let before = records.len();
    let records = dedup::dedup_records(records);
    if records.len() < before {
        info!(dropped = before - records.len(), "removed duplicate deals");
    }
    records
}

/// Date column present: parse, derive Year, drop undated rows.
/// Absent: every row gets [`NO_DATE_YEAR`].
fn apply_dates<'a>(
    raw: &'a RawTable,
    mapping: &ColumnMapping,
) -> Vec<(&'a [String], Option<NaiveDate>, i32)> {
    match mapping.index_of(CanonicalField::Date) {
        Some(col) => {
            let dated: Vec<_> = raw
                .rows
                .iter()
                .filter_map(|row| {
                    let date = row.get(col).and_then(|v| date_parser::parse_calendar_date(v))?;
                    Some((row.as_slice(), Some(date), date.year()))
                })
                .collect();
            if dated.len() < raw.rows.len() {
                info!(
                    dropped = raw.rows.len() - dated.len(),
                    "dropped rows with unparseable dates"
                );
            }
            dated
        }
        None => raw
            .rows
            .iter()
            .map(|row| (row.as_slice(), None, NO_DATE_YEAR))
            .collect(),
    }
}

/// Amount column present: strip currency, parse, keep strictly positive.
/// Absent: a placeholder per row so downstream totals are not empty.
fn apply_amounts<'a, R: Rng + ?Sized>(
    dated: Vec<(&'a [String], Option<NaiveDate>, i32)>,
    mapping: &ColumnMapping,
    rng: &mut R,
) -> Vec<Priced<'a>> {
    match mapping.index_of(CanonicalField::Amount) {
        Some(col) => {
            let total = dated.len();
            let priced: Vec<Priced<'a>> = dated
                .into_iter()
                .filter_map(|(row, date, year)| {
                    let amount = row
                        .get(col)
                        .and_then(|v| amount::parse_positive_amount(v))?;
                    Some(Priced {
                        row,
                        date,
                        year,
                        amount,
                    })
                })
                .collect();
            if priced.len() < total {
                info!(
                    dropped = total - priced.len(),
                    "dropped rows without a positive amount"
                );
            }
            priced
        }
        None => dated
            .into_iter()
            .map(|(row, date, year)| Priced {
                row,
                date,
                year,
                amount: rng.gen_range(PLACEHOLDER_AMOUNT_MIN..PLACEHOLDER_AMOUNT_MAX) as f64,
            })
            .collect(),
    }
}
