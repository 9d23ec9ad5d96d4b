// src/table.rs

use anyhow::{anyhow, bail, Context, Result};
use arrow::{
    array::{Array, ArrayRef, Date32Array, Float64Array, Int32Array, StringArray},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::{collections::BTreeSet, fmt, str::FromStr, sync::Arc};

/// Days between 0001-01-01 (CE day 1) and 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// The fixed set of columns every downstream consumer relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum CanonicalField {
    StartupName,
    Industry,
    City,
    Investor,
    InvestmentType,
    Amount,
    Date,
    Year,
}

impl CanonicalField {
    /// Export / column order.
    pub const ALL: [CanonicalField; 8] = [
        CanonicalField::StartupName,
        CanonicalField::Industry,
        CanonicalField::City,
        CanonicalField::Investor,
        CanonicalField::InvestmentType,
        CanonicalField::Amount,
        CanonicalField::Date,
        CanonicalField::Year,
    ];

    pub const TEXT: [CanonicalField; 5] = [
        CanonicalField::StartupName,
        CanonicalField::Industry,
        CanonicalField::City,
        CanonicalField::Investor,
        CanonicalField::InvestmentType,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CanonicalField::StartupName => "Startup_Name",
            CanonicalField::Industry => "Industry",
            CanonicalField::City => "City",
            CanonicalField::Investor => "Investor",
            CanonicalField::InvestmentType => "Investment_Type",
            CanonicalField::Amount => "Amount",
            CanonicalField::Date => "Date",
            CanonicalField::Year => "Year",
        }
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CanonicalField {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        CanonicalField::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| anyhow!("unknown canonical column `{}`", s))
    }
}

/// One cleaned funding deal.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalRecord {
    pub startup_name: String,
    pub industry: String,
    pub city: String,
    pub investor: String,
    pub investment_type: String,
    pub amount: f64,
    pub date: Option<NaiveDate>,
    pub year: i32,
}

/// A borrowed cell, as handed out by column access.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value<'a> {
    Text(&'a str),
    Amount(f64),
    Date(Option<NaiveDate>),
    Year(i32),
}

impl fmt::Display for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => f.write_str(s),
            Value::Amount(a) => write!(f, "{}", a),
            Value::Date(Some(d)) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::Date(None) => Ok(()),
            Value::Year(y) => write!(f, "{}", y),
        }
    }
}

impl CanonicalRecord {
    pub fn get(&self, field: CanonicalField) -> Value<'_> {
        match field {
            CanonicalField::StartupName => Value::Text(&self.startup_name),
            CanonicalField::Industry => Value::Text(&self.industry),
            CanonicalField::City => Value::Text(&self.city),
            CanonicalField::Investor => Value::Text(&self.investor),
            CanonicalField::InvestmentType => Value::Text(&self.investment_type),
            CanonicalField::Amount => Value::Amount(self.amount),
            CanonicalField::Date => Value::Date(self.date),
            CanonicalField::Year => Value::Year(self.year),
        }
    }

    /// Identity used for deduplication: (Startup_Name, Year, Amount).
    pub fn dedup_key(&self) -> (&str, i32, u64) {
        (&self.startup_name, self.year, self.amount.to_bits())
    }
}

/// Why the table had to be synthesized instead of read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum FallbackReason {
    /// No candidate input exists.
    NotFound,
    /// Candidates exist but none could be decoded or parsed.
    Unreadable(String),
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackReason::NotFound => f.write_str("no input found"),
            FallbackReason::Unreadable(e) => write!(f, "input unreadable: {}", e),
        }
    }
}

/// Where every row of a table came from. Never mixed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Origin {
    Source { label: String },
    Synthetic { reason: FallbackReason },
}

/// The analysis-ready dataset. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalTable {
    records: Vec<CanonicalRecord>,
    origin: Origin,
}

impl CanonicalTable {
    pub fn new(records: Vec<CanonicalRecord>, origin: Origin) -> Self {
        Self { records, origin }
    }

    pub fn records(&self) -> &[CanonicalRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CanonicalRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    pub fn is_synthetic(&self) -> bool {
        matches!(self.origin, Origin::Synthetic { .. })
    }

    /// Column access by canonical name, e.g. `"Amount"`.
    pub fn column(&self, name: &str) -> Result<Vec<Value<'_>>> {
        let field: CanonicalField = name.parse()?;
        Ok(self.records.iter().map(|r| r.get(field)).collect())
    }

    /// A new table holding the rows for which `keep` is true, same origin.
    pub fn retain_matching<F>(&self, keep: F) -> CanonicalTable
    where
        F: Fn(&CanonicalRecord) -> bool,
    {
        CanonicalTable {
            records: self.records.iter().filter(|r| keep(r)).cloned().collect(),
            origin: self.origin.clone(),
        }
    }

    /// Sorted distinct years.
    pub fn years(&self) -> Vec<i32> {
        let set: BTreeSet<i32> = self.records.iter().map(|r| r.year).collect();
        set.into_iter().collect()
    }

    /// Sorted distinct rendered values of `field`.
    pub fn distinct(&self, field: CanonicalField) -> Vec<String> {
        let set: BTreeSet<String> = self
            .records
            .iter()
            .map(|r| r.get(field).to_string())
            .collect();
        set.into_iter().collect()
    }

    pub fn arrow_schema() -> Schema {
        Schema::new(vec![
            Field::new(CanonicalField::StartupName.as_str(), DataType::Utf8, false),
            Field::new(CanonicalField::Industry.as_str(), DataType::Utf8, false),
            Field::new(CanonicalField::City.as_str(), DataType::Utf8, false),
            Field::new(CanonicalField::Investor.as_str(), DataType::Utf8, false),
            Field::new(CanonicalField::InvestmentType.as_str(), DataType::Utf8, false),
            Field::new(CanonicalField::Amount.as_str(), DataType::Float64, false),
            Field::new(CanonicalField::Date.as_str(), DataType::Date32, true),
            Field::new(CanonicalField::Year.as_str(), DataType::Int32, false),
        ])
    }

    /// Columnar view for Arrow/Parquet consumers.
    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        let text = |f: fn(&CanonicalRecord) -> &str| -> ArrayRef {
            Arc::new(StringArray::from_iter_values(self.records.iter().map(f)))
        };
        let cols: Vec<ArrayRef> = vec![
            text(|r| r.startup_name.as_str()),
            text(|r| r.industry.as_str()),
            text(|r| r.city.as_str()),
            text(|r| r.investor.as_str()),
            text(|r| r.investment_type.as_str()),
            Arc::new(Float64Array::from_iter_values(
                self.records.iter().map(|r| r.amount),
            )),
            Arc::new(Date32Array::from_iter(self.records.iter().map(|r| {
                r.date
                    .map(|d| d.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE)
            }))),
            Arc::new(Int32Array::from_iter_values(
                self.records.iter().map(|r| r.year),
            )),
        ];

        RecordBatch::try_new(Arc::new(Self::arrow_schema()), cols)
            .context("building canonical record batch")
    }

    /// Rebuild a table from batches shaped like [`CanonicalTable::arrow_schema`].
    pub fn from_record_batches(batches: &[RecordBatch], origin: Origin) -> Result<Self> {
        let mut records = Vec::new();
        for batch in batches {
            let text = |f: CanonicalField| -> Result<&StringArray> {
                batch
                    .column_by_name(f.as_str())
                    .and_then(|a| a.as_any().downcast_ref::<StringArray>())
                    .ok_or_else(|| anyhow!("column `{}` missing or not utf8", f))
            };
            let names = text(CanonicalField::StartupName)?;
            let industries = text(CanonicalField::Industry)?;
            let cities = text(CanonicalField::City)?;
            let investors = text(CanonicalField::Investor)?;
            let types = text(CanonicalField::InvestmentType)?;
            let amounts = batch
                .column_by_name(CanonicalField::Amount.as_str())
                .and_then(|a| a.as_any().downcast_ref::<Float64Array>())
                .ok_or_else(|| anyhow!("column `Amount` missing or not float64"))?;
            let dates = batch
                .column_by_name(CanonicalField::Date.as_str())
                .and_then(|a| a.as_any().downcast_ref::<Date32Array>())
                .ok_or_else(|| anyhow!("column `Date` missing or not date32"))?;
            let years = batch
                .column_by_name(CanonicalField::Year.as_str())
                .and_then(|a| a.as_any().downcast_ref::<Int32Array>())
                .ok_or_else(|| anyhow!("column `Year` missing or not int32"))?;

            for i in 0..batch.num_rows() {
                let date = if dates.is_null(i) {
                    None
                } else {
                    let days = dates.value(i) + UNIX_EPOCH_DAYS_FROM_CE;
                    match NaiveDate::from_num_days_from_ce_opt(days) {
                        Some(d) => Some(d),
                        None => bail!("row {}: date32 value {} out of range", i, dates.value(i)),
                    }
                };
                records.push(CanonicalRecord {
                    startup_name: names.value(i).to_string(),
                    industry: industries.value(i).to_string(),
                    city: cities.value(i).to_string(),
                    investor: investors.value(i).to_string(),
                    investment_type: types.value(i).to_string(),
                    amount: amounts.value(i),
                    date,
                    year: years.value(i),
                });
            }
        }
        Ok(Self::new(records, origin))
    }
}

impl<'a> IntoIterator for &'a CanonicalTable {
    type Item = &'a CanonicalRecord;
    type IntoIter = std::slice::Iter<'a, CanonicalRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
