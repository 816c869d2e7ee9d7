// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

/// Report artifact writers.
///
/// Every writer takes an output prefix (a path without extension) and appends
/// `.json`, `.csv` or `.html`. Missing parent directories are created.
use std::{
    ffi::OsString,
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::{Error, report_io_error},
    html::render_report,
    report::{CSV_COLUMNS, RunRecord, csv_records, queued_preview, summarize},
};

/// Locations of the artifacts produced for one output prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportPaths {
    /// `<prefix>.json`
    pub json: PathBuf,
    /// `<prefix>.csv`
    pub csv:  PathBuf,
    /// `<prefix>.html`
    pub html: PathBuf
}

impl std::fmt::Display for ReportPaths {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.json.display(),
            self.csv.display(),
            self.html.display()
        )
    }
}

/// Current UTC time as ISO-8601 with microseconds and a `Z` suffix.
pub fn generated_at() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Appends `extension` to `prefix` without touching dots already present.
pub fn with_extension(prefix: &Path, extension: &str) -> PathBuf {
    let mut raw = OsString::from(prefix.as_os_str());
    raw.push(".");
    raw.push(extension);
    PathBuf::from(raw)
}

/// Writes the JSON, CSV and HTML reports for `records`.
///
/// # Errors
///
/// Returns [`Error::ReportIo`] when a file cannot be created or written,
/// [`Error::Serialize`] or [`Error::Csv`] when encoding fails.
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
///
/// use gha_report::write_reports;
///
/// # fn example() -> Result<(), gha_report::Error> {
/// let paths = write_reports(Path::new("reports/octo/hello",), &[], 200,)?;
/// println!("Wrote: {paths}");
/// # Ok(())
/// # }
/// ```
pub fn write_reports(
    prefix: &Path,
    records: &[RunRecord],
    queued_preview_limit: usize
) -> Result<ReportPaths, Error> {
    let paths = ReportPaths {
        json: with_extension(prefix, "json"),
        csv:  with_extension(prefix, "csv"),
        html: with_extension(prefix, "html")
    };

    write_json(&paths.json, records)?;
    write_csv(&paths.csv, records)?;
    write_html(&paths.html, records, queued_preview_limit)?;

    debug!("Wrote {} records to {}", records.len(), paths);
    Ok(paths)
}

/// Writes records as a pretty-printed JSON array.
///
/// # Errors
///
/// See [`write_reports`].
pub fn write_json(path: &Path, records: &[RunRecord]) -> Result<(), Error> {
    let mut writer = create(path)?;
    serde_json::to_writer_pretty(&mut writer, records)?;
    writer.flush().map_err(|source| report_io_error(path, source))
}

/// Writes the CSV projection of records. The header row is written even
/// when there are no records.
///
/// # Errors
///
/// See [`write_reports`].
pub fn write_csv(path: &Path, records: &[RunRecord]) -> Result<(), Error> {
    let file = create(path)?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);

    writer.write_record(CSV_COLUMNS)?;
    for row in csv_records(records) {
        writer.serialize(row)?;
    }
    writer.flush().map_err(|source| report_io_error(path, source))
}

/// Writes the HTML summary page.
///
/// # Errors
///
/// See [`write_reports`].
pub fn write_html(
    path: &Path,
    records: &[RunRecord],
    queued_preview_limit: usize
) -> Result<(), Error> {
    let rows = csv_records(records);
    let summary = summarize(records);
    let queued = queued_preview(&rows, queued_preview_limit);
    let page = render_report(&generated_at(), &summary, &queued, queued_preview_limit);

    let mut writer = create(path)?;
    writer
        .write_all(page.as_bytes())
        .and_then(|()| writer.flush())
        .map_err(|source| report_io_error(path, source))
}

fn create(path: &Path) -> Result<BufWriter<File>, Error> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        fs::create_dir_all(parent).map_err(|source| report_io_error(parent, source))?;
    }

    File::create(path)
        .map(BufWriter::new)
        .map_err(|source| report_io_error(path, source))
}
