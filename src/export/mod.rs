// src/export/mod.rs

use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone};
use parquet::{
    arrow::{arrow_reader::ParquetRecordBatchReaderBuilder, ArrowWriter},
    basic::Compression,
    file::properties::WriterProperties,
};
use std::{
    fs::{self, File},
    io::Write,
    path::Path,
    sync::Arc,
};
use tracing::{info, instrument};

use crate::table::{CanonicalField, CanonicalTable, Origin};

/// `startup_funding_export_YYYYMMDD_HHMM.csv`
pub fn export_file_name<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("startup_funding_export_{}.csv", now.format("%Y%m%d_%H%M"))
}

/// Columns written for `table`: all canonical fields, except `Date` when no
/// record carries one, so an undated table reads back without a date column.
pub fn csv_columns(table: &CanonicalTable) -> Vec<CanonicalField> {
    let dated = table.iter().any(|r| r.date.is_some());
    CanonicalField::ALL
        .iter()
        .copied()
        .filter(|f| dated || *f != CanonicalField::Date)
        .collect()
}

/// Canonical header, then one line per record; absent dates are empty cells.
pub fn write_csv<W: Write>(table: &CanonicalTable, writer: W) -> Result<()> {
    let columns = csv_columns(table);
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(columns.iter().map(|f| f.as_str()))
        .context("writing CSV header")?;
    for (idx, record) in table.iter().enumerate() {
        let cells: Vec<String> = columns
            .iter()
            .map(|f| record.get(*f).to_string())
            .collect();
        wtr.write_record(&cells)
            .with_context(|| format!("writing CSV record {}", idx))?;
    }
    wtr.flush().context("flushing CSV writer")?;
    Ok(())
}

#[instrument(level = "info", skip(table), fields(path = %path.display(), rows = table.len()))]
pub fn write_csv_file(table: &CanonicalTable, path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    write_csv(table, file)?;
    info!("wrote CSV export");
    Ok(())
}

/// Write the table as a single-batch Parquet file; returns bytes on disk.
#[instrument(level = "info", skip(table), fields(path = %path.display(), rows = table.len()))]
pub fn write_parquet(table: &CanonicalTable, path: &Path) -> Result<u64> {
    let batch = table.to_record_batch()?;
    let file =
        File::create(path).with_context(|| format!("creating file {}", path.display()))?;

    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();

    let schema = Arc::new(CanonicalTable::arrow_schema());
    let mut writer =
        ArrowWriter::try_new(file, schema, Some(props)).context("creating parquet writer")?;
    writer.write(&batch).context("writing batch to parquet")?;
    writer.close().context("closing parquet writer")?;

    let size = fs::metadata(path).context("getting file metadata")?.len();
    info!(bytes = size, "wrote parquet export");
    Ok(size)
}

/// Load a file produced by [`write_parquet`].
pub fn read_parquet(path: &Path) -> Result<CanonicalTable> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?
        .build()
        .context("building parquet reader")?;
    let batches = reader
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("reading parquet batches")?;
    CanonicalTable::from_record_batches(
        &batches,
        Origin::Source {
            label: path.display().to_string(),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::CanonicalRecord;
    use chrono::{NaiveDate, Utc};
    use tempfile::tempdir;

    fn table() -> CanonicalTable {
        CanonicalTable::new(
            vec![
                CanonicalRecord {
                    startup_name: "Pine Labs".into(),
                    industry: "FinTech".into(),
                    city: "Noida".into(),
                    investor: "Temasek, Actis".into(),
                    investment_type: "Series E".into(),
                    amount: 1_250_000.0,
                    date: NaiveDate::from_ymd_opt(2020, 1, 31),
                    year: 2020,
                },
                CanonicalRecord {
                    startup_name: "Startup_1".into(),
                    industry: "Unknown".into(),
                    city: "Delhi".into(),
                    investor: "Matrix".into(),
                    investment_type: "Unknown".into(),
                    amount: 2500.5,
                    date: None,
                    year: 2023,
                },
            ],
            Origin::Source {
                label: "t".into(),
            },
        )
    }

    #[test]
    fn csv_has_canonical_header_and_plain_numbers() -> Result<()> {
        let mut out = Vec::new();
        write_csv(&table(), &mut out)?;
        let text = String::from_utf8(out)?;
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "Startup_Name,Industry,City,Investor,Investment_Type,Amount,Date,Year"
        );
        assert_eq!(
            lines[1],
            "Pine Labs,FinTech,Noida,\"Temasek, Actis\",Series E,1250000,2020-01-31,2020"
        );
        assert_eq!(lines[2], "Startup_1,Unknown,Delhi,Matrix,Unknown,2500.5,,2023");
        Ok(())
    }

    #[test]
    fn undated_table_omits_date_column() -> Result<()> {
        let t = table();
        let undated = t.retain_matching(|r| r.date.is_none());
        let mut out = Vec::new();
        write_csv(&undated, &mut out)?;
        let text = String::from_utf8(out)?;
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Startup_Name,Industry,City,Investor,Investment_Type,Amount,Year",
                "Startup_1,Unknown,Delhi,Matrix,Unknown,2500.5,2023",
            ]
        );
        Ok(())
    }

    #[test]
    fn parquet_roundtrip() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("export.parquet");
        let t = table();
        let bytes = write_parquet(&t, &path)?;
        assert!(bytes > 0);

        let back = read_parquet(&path)?;
        assert_eq!(back.records(), t.records());
        Ok(())
    }

    #[test]
    fn file_name_uses_timestamp() {
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 0).unwrap();
        assert_eq!(
            export_file_name(&now),
            "startup_funding_export_20240309_1405.csv"
        );
    }
}
