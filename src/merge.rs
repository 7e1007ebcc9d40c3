//! Same-day "skip unchanged" merge.
//!
//! A collection run that is restarted on the same day finds its own earlier
//! snapshot on disk. Rows for zpids already in that file are copied verbatim
//! instead of calling the detail endpoint again. This assumes a listing doesn't
//! change within a day: it trades freshness for fewer API calls.

use std::{
    collections::{HashMap, HashSet},
    path::{Path, PathBuf},
};

use crate::error::Result;
use crate::records::PropertyRecord;
use crate::report::{Event, Reporter};
use crate::zillow::DetailSource;

/// Rows of a previously written snapshot, keyed by zpid.
#[derive(Debug, Clone)]
pub struct SnapshotCache {
    path: PathBuf,
    header: Vec<String>,
    rows: HashMap<String, PropertyRecord>,
}

impl SnapshotCache {
    /// Reads the snapshot at `path`; `None` when there is no such file.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }

        let mut reader = csv::Reader::from_path(path)?;
        let headers = reader.headers()?.clone();
        let zpid_column = headers.iter().position(|h| h == "zpid");

        let mut rows = HashMap::new();
        if let Some(column) = zpid_column {
            for row in reader.records() {
                let row = row?;
                let Some(zpid) = row.get(column) else { continue };
                rows.entry(zpid.to_string())
                    .or_insert_with(|| PropertyRecord::from_csv_row(&headers, &row));
            }
        }

        Ok(Some(SnapshotCache {
            path: path.to_path_buf(),
            header: headers.iter().map(str::to_string).collect(),
            rows,
        }))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Same columns in the same order as the layout about to be written
    pub fn has_layout(&self, fields: &[&str]) -> bool {
        self.header.len() == fields.len()
            && self.header.iter().zip(fields).all(|(h, f)| h.as_str() == *f)
    }

    pub fn get(&self, zpid: &str) -> Option<&PropertyRecord> {
        self.rows.get(zpid)
    }
}

/// Drops repeated zpids, keeping the first occurrence and discovery order.
pub fn unique_zpids<R: Reporter>(zpids: &[String], reporter: &R) -> Vec<String> {
    let mut seen = HashSet::new();
    zpids
        .iter()
        .filter(|zpid| {
            let first = seen.insert(zpid.as_str());
            if !first {
                reporter.report(Event::DuplicateSkipped {
                    zpid: zpid.to_string(),
                });
            }
            first
        })
        .cloned()
        .collect()
}

/// Produces one record per unique zpid: the cached row when the prior snapshot
/// has it, otherwise exactly one detail fetch.
pub struct RecordMerger<'a, D, R> {
    source: &'a D,
    site_url: &'a str,
    reporter: &'a R,
}

impl<'a, D, R> RecordMerger<'a, D, R>
where
    D: DetailSource,
    R: Reporter,
{
    pub fn new(source: &'a D, site_url: &'a str, reporter: &'a R) -> Self {
        RecordMerger {
            source,
            site_url,
            reporter,
        }
    }

    /// `layout` is the column set fresh records will have; a prior snapshot
    /// with any other header is not reused.
    pub async fn merge(
        &self,
        zpids: &[String],
        prior: Option<&SnapshotCache>,
        layout: &[&str],
    ) -> Result<Vec<PropertyRecord>> {
        let prior = prior.filter(|cache| {
            let usable = cache.has_layout(layout);
            if !usable {
                self.reporter.report(Event::PriorSnapshotIgnored {
                    path: cache.path().to_path_buf(),
                    reason: "header differs from the current record layout".to_string(),
                });
            }
            usable
        });

        let zpids = unique_zpids(zpids, self.reporter);
        let mut records = Vec::with_capacity(zpids.len());

        for zpid in zpids {
            if let Some(cached) = prior.and_then(|cache| cache.get(&zpid)) {
                self.reporter.report(Event::Reused { zpid });
                records.push(cached.clone());
                continue;
            }

            let detail = self.source.fetch_detail(&zpid).await?;
            records.push(PropertyRecord::from_detail(&zpid, &detail, self.site_url)?);
            self.reporter.report(Event::Fetched { zpid });
        }

        Ok(records)
    }
}
