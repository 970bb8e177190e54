// result_sink.rs - Append-only CSV output
//
// Every window is appended to the same file. The header is written only when
// the file does not exist yet, so re-running on the remaining part of a
// wordlist continues the same table.

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::HashSet;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::classifier::ClassificationResult;
use crate::domain_utils;

/// Column order of the output file
pub const CSV_HEADER: [&str; 4] = ["subdomain", "cname", "cname_registered", "hijackable"];

#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    subdomain: &'a str,
    cname: String,
    cname_registered: &'static str,
    hijackable: &'static str,
}

impl<'a> From<&'a ClassificationResult> for CsvRow<'a> {
    fn from(result: &'a ClassificationResult) -> Self {
        Self {
            subdomain: &result.subdomain,
            cname: result.cname.to_string(),
            cname_registered: result.verdict.registration_label(),
            hijackable: result.verdict.hijackable_label(),
        }
    }
}

/// Filtered, append-only CSV writer
#[derive(Debug, Clone)]
pub struct ResultSink {
    path: PathBuf,
    verbose: bool,
}

impl ResultSink {
    /// With `verbose` every result is written, otherwise only hijackable ones.
    pub fn new(path: impl Into<PathBuf>, verbose: bool) -> Self {
        Self {
            path: path.into(),
            verbose,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one window of results. Returns the number of rows written;
    /// the file is not touched when nothing passes the filter.
    pub fn write(&self, results: &[ClassificationResult]) -> Result<usize> {
        write_results(results, &self.path, self.verbose)
    }
}

/// Append `results` to `outfile` as CSV, keeping only hijackable rows unless `verbose`.
pub fn write_results(results: &[ClassificationResult], outfile: &Path, verbose: bool) -> Result<usize> {
    let rows: Vec<CsvRow> = results
        .iter()
        .filter(|r| verbose || r.is_hijackable())
        .map(CsvRow::from)
        .collect();

    if rows.is_empty() {
        debug!("No rows to write to {}", outfile.display());
        return Ok(0);
    }

    let file_exists = outfile.exists();

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(outfile)
        .with_context(|| format!("Failed to open output file: {}", outfile.display()))?;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);

    if !file_exists {
        writer
            .write_record(CSV_HEADER)
            .with_context(|| format!("Failed to write header to {}", outfile.display()))?;
    }

    for row in &rows {
        writer
            .serialize(row)
            .with_context(|| format!("Failed to write row for {} to {}", row.subdomain, outfile.display()))?;
    }

    writer
        .flush()
        .with_context(|| format!("Failed to flush output file: {}", outfile.display()))?;

    debug!("Appended {} rows to {}", rows.len(), outfile.display());
    Ok(rows.len())
}

/// Subdomains (normalised) already present in an output file from an
/// earlier run. Returns an empty set when the file does not exist.
pub fn recorded_subdomains(outfile: &Path) -> Result<HashSet<String>> {
    if !outfile.exists() {
        return Ok(HashSet::new());
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(outfile)
        .with_context(|| format!("Failed to open previous results: {}", outfile.display()))?;

    let mut seen = HashSet::new();
    for record in reader.records() {
        let record = record.with_context(|| format!("Failed to parse previous results: {}", outfile.display()))?;
        if let Some(subdomain) = record.get(0) {
            let subdomain = domain_utils::normalize_hostname(subdomain);
            if !subdomain.is_empty() {
                seen.insert(subdomain);
            }
        }
    }

    Ok(seen)
}
