// src/load/mod.rs

use anyhow::{anyhow, bail, Context, Result};
use csv::ReaderBuilder;
use encoding_rs::{UTF_8, WINDOWS_1252};
use std::{
    borrow::Cow,
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, info, warn};

use crate::table::FallbackReason;

/// The untyped table as read from a delimited file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTable {
    /// Column names exactly as the file spells them.
    pub headers: Vec<String>,
    /// One entry per data record. A short record simply ends early;
    /// the missing trailing cells are absent values.
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Cell `col` of row `row`, `None` when the record is too short.
    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row)?.get(col).map(String::as_str)
    }
}

/// Input artifact handed to the normalizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// Filesystem locations probed in order; the first one that reads wins.
    Paths(Vec<PathBuf>),
    /// Already-fetched bytes, e.g. an upload.
    Bytes { label: String, data: Vec<u8> },
}

/// A successfully read source.
#[derive(Debug)]
pub struct LoadedSource {
    pub label: String,
    pub table: RawTable,
}

/// One candidate path as seen by a single read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Candidate {
    Missing,
    /// Present but could not be read; the rendered error chain.
    Unreadable(String),
    Read(Vec<u8>),
}

impl Candidate {
    fn read(path: &Path) -> Self {
        if !path.is_file() {
            return Candidate::Missing;
        }
        match fs::read(path).with_context(|| format!("reading {}", path.display())) {
            Ok(bytes) => Candidate::Read(bytes),
            Err(e) => Candidate::Unreadable(format!("{:#}", e)),
        }
    }
}

/// The bytes behind a [`Source`], captured once so that hashing and parsing
/// see the same input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSnapshot<'a> {
    Paths(Vec<(&'a Path, Candidate)>),
    Bytes { label: &'a str, data: &'a [u8] },
}

impl<'a> SourceSnapshot<'a> {
    pub fn take(source: &'a Source) -> Self {
        match source {
            Source::Paths(candidates) => SourceSnapshot::Paths(
                candidates
                    .iter()
                    .map(|path| (path.as_path(), Candidate::read(path)))
                    .collect(),
            ),
            Source::Bytes { label, data } => SourceSnapshot::Bytes { label, data },
        }
    }
}

/// Read `source` into a [`RawTable`].
pub fn load_source(source: &Source) -> std::result::Result<LoadedSource, FallbackReason> {
    load_snapshot(&SourceSnapshot::take(source))
}

/// Parse an already-captured source.
///
/// Every failure is folded into a [`FallbackReason`]: the caller's only
/// recovery is synthesizing a table, so the error chain is kept as text.
#[tracing::instrument(level = "info", skip(snapshot))]
pub fn load_snapshot(
    snapshot: &SourceSnapshot<'_>,
) -> std::result::Result<LoadedSource, FallbackReason> {
    match snapshot {
        SourceSnapshot::Bytes { label, data } => match parse_bytes(data) {
            Ok(table) => Ok(LoadedSource {
                label: label.to_string(),
                table,
            }),
            Err(e) => {
                warn!(label = %label, error = %format!("{:#}", e), "in-memory source unreadable");
                Err(FallbackReason::Unreadable(format!("{:#}", e)))
            }
        },
        SourceSnapshot::Paths(candidates) => {
            let mut last_err: Option<String> = None;
            for (path, candidate) in candidates {
                let parsed = match candidate {
                    Candidate::Missing => {
                        debug!(path = %path.display(), "candidate not present");
                        continue;
                    }
                    Candidate::Unreadable(e) => Err(e.clone()),
                    Candidate::Read(bytes) => parse_bytes(bytes)
                        .with_context(|| format!("parsing {}", path.display()))
                        .map_err(|e| format!("{:#}", e)),
                };
                match parsed {
                    Ok(table) => {
                        info!(
                            path = %path.display(),
                            columns = table.headers.len(),
                            rows = table.rows.len(),
                            "loaded input"
                        );
                        return Ok(LoadedSource {
                            label: path.display().to_string(),
                            table,
                        });
                    }
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "skipping candidate");
                        last_err = Some(e);
                    }
                }
            }
            match last_err {
                None => Err(FallbackReason::NotFound),
                Some(e) => Err(FallbackReason::Unreadable(e)),
            }
        }
    }
}

/// Decode as UTF-8 and parse; on any failure retry the whole read as Latin-1.
pub fn parse_bytes(bytes: &[u8]) -> Result<RawTable> {
    let primary = decode_utf8(bytes).and_then(|text| parse_csv(&text));
    match primary {
        Ok(table) => Ok(table),
        Err(utf8_err) => {
            debug!(error = %format!("{:#}", utf8_err), "UTF-8 read failed, retrying as Latin-1");
            let text = decode_latin1(bytes);
            parse_csv(&text).with_context(|| format!("Latin-1 retry after: {:#}", utf8_err))
        }
    }
}

/// Strict UTF-8; a leading BOM is dropped.
fn decode_utf8(bytes: &[u8]) -> Result<Cow<'_, str>> {
    let (text, had_errors) = UTF_8.decode_with_bom_removal(bytes);
    if had_errors {
        bail!("input is not valid UTF-8");
    }
    Ok(text)
}

/// Latin-1 never fails; windows-1252 is the superset browsers use for that label.
fn decode_latin1(bytes: &[u8]) -> Cow<'_, str> {
    WINDOWS_1252.decode_without_bom_handling(bytes).0
}

/// Parse comma-delimited text with a header row.
///
/// Records with fewer fields than the header are accepted; records with more
/// are a hard error, as is input without any header.
pub fn parse_csv(text: &str) -> Result<RawTable> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = rdr
        .headers()
        .context("reading CSV header")?
        .iter()
        .map(str::to_string)
        .collect();
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(anyhow!("no columns to parse from input"));
    }

    let mut rows = Vec::new();
    for (idx, result) in rdr.records().enumerate() {
        let record = result.with_context(|| format!("CSV parse error at record {}", idx))?;
        if record.len() > headers.len() {
            bail!(
                "record {} has {} fields, header has {}",
                idx,
                record.len(),
                headers.len()
            );
        }
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(RawTable { headers, rows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{tempdir, NamedTempFile};

    #[test]
    fn parses_header_and_short_rows() -> Result<()> {
        let table = parse_csv("a,b,c\n1,2,3\n4,5\n")?;
        assert_eq!(table.headers, vec!["a", "b", "c"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.cell(1, 1), Some("5"));
        assert_eq!(table.cell(1, 2), None);
        Ok(())
    }

    #[test]
    fn rejects_overlong_rows_and_empty_input() {
        assert!(parse_csv("a,b\n1,2,3\n").is_err());
        assert!(parse_csv("").is_err());
    }

    #[test]
    fn latin1_bytes_fall_back() -> Result<()> {
        // "Café" in Latin-1 is not valid UTF-8.
        let bytes = b"Startup,City\nCaf\xe9 Coffee Day,Bangalore\n";
        let table = parse_bytes(bytes)?;
        assert_eq!(table.cell(0, 0), Some("Café Coffee Day"));
        Ok(())
    }

    #[test]
    fn utf8_bom_is_removed() -> Result<()> {
        let bytes = "\u{feff}Date,Amount\n2020-01-01,5\n".as_bytes();
        let table = parse_bytes(bytes)?;
        assert_eq!(table.headers[0], "Date");
        Ok(())
    }

    #[test]
    fn probes_candidates_in_order() -> Result<()> {
        let dir = tempdir()?;
        let missing = dir.path().join("nope.csv");
        let mut present = NamedTempFile::new_in(dir.path())?;
        write!(present, "Startup,Amount\nCRED,100\n")?;

        let loaded = load_source(&Source::Paths(vec![missing, present.path().to_path_buf()]))
            .map_err(|r| anyhow!("unexpected fallback: {}", r))?;
        assert_eq!(loaded.table.rows.len(), 1);
        assert_eq!(loaded.label, present.path().display().to_string());
        Ok(())
    }

    #[test]
    fn snapshot_is_unaffected_by_later_edits() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        write!(file, "Startup,Amount\nA,1\n")?;
        file.flush()?;
        let source = Source::Paths(vec![file.path().to_path_buf()]);
        let snapshot = SourceSnapshot::take(&source);

        fs::write(file.path(), "Startup,Amount\nA,1\nB,2\nC,3\n")?;
        let loaded = load_snapshot(&snapshot).unwrap();
        assert_eq!(loaded.table.rows.len(), 1);
        assert_eq!(load_source(&source).unwrap().table.rows.len(), 3);
        Ok(())
    }

    #[test]
    fn missing_and_unreadable_are_distinguished() -> Result<()> {
        let dir = tempdir()?;
        let missing = Source::Paths(vec![dir.path().join("a.csv"), dir.path().join("b.csv")]);
        assert_eq!(load_source(&missing).unwrap_err(), FallbackReason::NotFound);

        let empty = NamedTempFile::new_in(dir.path())?;
        let unreadable = Source::Paths(vec![empty.path().to_path_buf()]);
        assert!(matches!(
            load_source(&unreadable).unwrap_err(),
            FallbackReason::Unreadable(_)
        ));
        Ok(())
    }
}
