//! Per-zipcode statistics over for-sale snapshots.
//!
//! Each `forsale_YYMMDD.csv` becomes one block of rows:
//! `zipcode, median_price, count, onMarketDays, collectedDate`, sorted by zipcode
//! and closed by an `All` row over the whole file. Blocks from several files are
//! stacked as-is, nothing is re-aggregated across days.

use std::{
    fs::File,
    path::{Path, PathBuf},
    sync::LazyLock,
};

use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::*;
use regex::Regex;
use tracing::warn;

use crate::error::{CollectorError, Result};
use crate::helpers::{parse_currency, parse_listing_date, whole_days_between};
use crate::report::{Event, Reporter};

static SNAPSHOT_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"forsale_(\d{2})(\d{2})(\d{2})\.csv$").expect("valid snapshot pattern")
});

/// Collection date encoded in a snapshot filename, `forsale_240115.csv` -> 2024-01-15.
pub fn collected_date(path: &Path) -> Result<NaiveDate> {
    let format_error = || CollectorError::Format {
        path: path.to_path_buf(),
    };
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(format_error)?;
    let caps = SNAPSHOT_DATE.captures(name).ok_or_else(format_error)?;

    let part = |i: usize| caps[i].parse::<u32>().map_err(|_| format_error());
    let year = 2000 + part(1)? as i32;
    NaiveDate::from_ymd_opt(year, part(2)?, part(3)?).ok_or_else(format_error)
}

/// `forsale_*.csv` files directly under `dir`, in name order
pub fn snapshot_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.starts_with("forsale_") && n.ends_with(".csv"))
                    .unwrap_or(false)
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Median price, non-null price count and median days on market
fn summary_exprs() -> [Expr; 3] {
    [
        col("price").median().alias("median_price"),
        col("price")
            .is_not_null()
            .sum()
            .cast(DataType::UInt32)
            .alias("count"),
        col("onMarketDays").median().alias("onMarketDays"),
    ]
}

/// Summarizes one snapshot. `now` anchors days-on-market so reruns agree.
pub fn summarize_snapshot(path: &Path, now: NaiveDateTime) -> Result<DataFrame> {
    let collected = collected_date(path)?;

    // All columns as text keeps zipcode leading zeros and "$1,234" prices intact
    let raw = CsvReader::from_path(path)?
        .has_header(true)
        .infer_schema(Some(0))
        .finish()?;

    let zipcodes: Vec<String> = raw
        .column("zipcode")?
        .utf8()?
        .into_iter()
        .map(|zip| zip.unwrap_or_default().trim().to_string())
        .collect();

    let prices: Vec<Option<f64>> = raw
        .column("price")?
        .utf8()?
        .into_iter()
        .map(|price| {
            let raw_price = price.unwrap_or_default();
            let parsed = parse_currency(raw_price);
            if parsed.is_none() && !raw_price.is_empty() {
                warn!("Unparseable price {:?} in {:?}", raw_price, path);
            }
            parsed
        })
        .collect();

    let on_market: Vec<Option<i64>> = raw
        .column("datePosted")?
        .utf8()?
        .into_iter()
        .map(|posted| {
            posted
                .and_then(parse_listing_date)
                .map(|posted| whole_days_between(posted, now))
        })
        .collect();

    let frame = DataFrame::new(vec![
        Series::new("zipcode", zipcodes),
        Series::new("price", prices),
        Series::new("onMarketDays", on_market),
    ])?;

    let by_zipcode = frame
        .clone()
        .lazy()
        .group_by([col("zipcode")])
        .agg(summary_exprs())
        .sort("zipcode", SortOptions::default())
        .collect()?;

    let [median_price, count, on_market_days] = summary_exprs();
    let overall = frame
        .lazy()
        .select([lit("All").alias("zipcode"), median_price, count, on_market_days])
        .collect()?;

    let mut summary = by_zipcode.vstack(&overall)?;
    let stamp = collected.format("%Y-%m-%d").to_string();
    let dates = Series::new("collectedDate", vec![stamp; summary.height()]);
    summary.with_column(dates)?;

    Ok(summary)
}

/// Summarizes every snapshot in `dir` and stacks the results in file order.
///
/// A file whose name or content can't be summarized is reported and skipped.
/// `None` when no snapshot produced rows.
pub fn summarize_dir<R: Reporter>(
    dir: &Path,
    now: NaiveDateTime,
    reporter: &R,
) -> Result<Option<DataFrame>> {
    let mut combined: Option<DataFrame> = None;

    for path in snapshot_files(dir)? {
        let summary = match summarize_snapshot(&path, now) {
            Ok(summary) => summary,
            Err(e) => {
                reporter.report(Event::SnapshotSkipped {
                    path,
                    reason: e.to_string(),
                });
                continue;
            }
        };
        reporter.report(Event::SnapshotSummarized {
            path,
            rows: summary.height(),
        });

        combined = match combined {
            None => Some(summary),
            Some(mut acc) => {
                acc.vstack_mut(&summary)?;
                Some(acc)
            }
        };
    }

    Ok(combined)
}

pub fn write_summary(summary: &mut DataFrame, path: &Path) -> Result<()> {
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file).finish(summary)?;
    Ok(())
}
