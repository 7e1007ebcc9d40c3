use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::error::Result;
use crate::helpers::date_stamp;
use crate::records::PropertyRecord;

/// What a write produced. An empty record set is not an error, just no file.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome {
    Written { path: PathBuf, rows: usize },
    NoData,
}

/// `{prefix}_{YYMMDD}.csv`
pub fn snapshot_name(prefix: &str, date: NaiveDate) -> String {
    format!("{}_{}.csv", prefix, date_stamp(date))
}

/// Writes records as CSV, header taken from the first record's field order.
///
/// Nothing is created for an empty slice. Every later record must use only the
/// first record's fields; a missing field is written as an empty cell. Rows go
/// to a `.part` sibling that is renamed onto `path` once complete, so `path`
/// never holds a half-written snapshot.
pub fn write_records(records: &[PropertyRecord], path: &Path) -> Result<WriteOutcome> {
    let Some(first) = records.first() else {
        return Ok(WriteOutcome::NoData);
    };
    let header: Vec<String> = first.field_names().map(str::to_string).collect();

    // Build all rows before touching the file so a bad record leaves nothing behind
    let rows = records
        .iter()
        .enumerate()
        .map(|(i, record)| record.cells(&header, i))
        .collect::<Result<Vec<_>>>()?;

    let partial = partial_path(path);
    let mut writer = csv::Writer::from_path(&partial)?;
    writer.write_record(&header)?;
    for row in &rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    drop(writer);
    std::fs::rename(&partial, path)?;

    Ok(WriteOutcome::Written {
        path: path.to_path_buf(),
        rows: rows.len(),
    })
}

/// `forsale_240115.csv` -> `forsale_240115.csv.part`
fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    path.with_file_name(name)
}
