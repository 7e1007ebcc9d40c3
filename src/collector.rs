use std::path::Path;

use chrono::NaiveDate;
use serde_json::Value;
use tracing::info;

use crate::config::Settings;
use crate::error::Result;
use crate::merge::{unique_zpids, RecordMerger, SnapshotCache};
use crate::records::{PropertyRecord, DETAIL_FIELDS};
use crate::report::{Event, Reporter};
use crate::writer::{snapshot_name, write_records, WriteOutcome};
use crate::zillow::{
    collect_listings, listing_zpids, CollectionMode, DetailSource, ListingSearch, SearchQuery,
    StatusType,
};

/// One collector invocation, as given on the command line.
#[derive(Debug, Clone)]
pub struct CollectRequest {
    pub cities: Vec<String>,
    pub status: StatusType,
    pub mode: CollectionMode,
    pub sold_in_last: u32,
    pub today: NaiveDate,
}

impl CollectRequest {
    /// `forsale_240115.csv`, `sold_240115.csv`, `basic_forsale_240115.csv`, ...
    pub fn file_name(&self) -> String {
        let prefix = match self.mode {
            CollectionMode::Advanced => self.status.file_prefix().to_string(),
            CollectionMode::Basic => format!("basic_{}", self.status.file_prefix()),
        };
        snapshot_name(&prefix, self.today)
    }

    /// Only advanced for-sale snapshots are uploaded
    pub fn uploads(&self) -> bool {
        self.status == StatusType::ForSale && self.mode == CollectionMode::Advanced
    }
}

/// Search every city, build records, write the day's snapshot.
///
/// Advanced for-sale runs reuse rows from a same-day snapshot already on disk.
pub async fn collect<C, R>(
    client: &C,
    settings: &Settings,
    request: &CollectRequest,
    reporter: &R,
) -> Result<WriteOutcome>
where
    C: ListingSearch + DetailSource,
    R: Reporter,
{
    let mut listings = vec![];
    for city in &request.cities {
        let query = SearchQuery {
            city,
            state: &settings.state,
            status: request.status,
            sold_in_last: request.sold_in_last,
        };
        listings.extend(collect_listings(client, &query, reporter).await?);
    }
    info!("Total listings found: {}", listings.len());

    let path = settings.output_dir.join(request.file_name());

    let records = match request.mode {
        CollectionMode::Basic => basic_records(&listings, &settings.site_url, reporter)?,
        CollectionMode::Advanced => {
            let zpids = listing_zpids(&listings)?;
            let prior = match request.status {
                StatusType::ForSale => load_prior(&path, reporter),
                StatusType::RecentlySold => None,
            };
            if let Some(cache) = &prior {
                reporter.report(Event::PriorSnapshotLoaded {
                    path: cache.path().to_path_buf(),
                    rows: cache.len(),
                });
            }
            RecordMerger::new(client, &settings.site_url, reporter)
                .merge(&zpids, prior.as_ref(), &DETAIL_FIELDS)
                .await?
        }
    };

    let outcome = write_records(&records, &path)?;
    match &outcome {
        WriteOutcome::Written { path, rows } => reporter.report(Event::Written {
            path: path.clone(),
            rows: *rows,
        }),
        WriteOutcome::NoData => reporter.report(Event::NoData { path }),
    }
    Ok(outcome)
}

/// Same-day snapshot to reuse rows from. One that can't be read is treated like
/// one with a foreign header: reported, then everything is fetched again.
fn load_prior<R: Reporter>(path: &Path, reporter: &R) -> Option<SnapshotCache> {
    match SnapshotCache::load(path) {
        Ok(prior) => prior,
        Err(e) => {
            reporter.report(Event::PriorSnapshotIgnored {
                path: path.to_path_buf(),
                reason: e.to_string(),
            });
            None
        }
    }
}

/// Reduced records straight from search results, one per zpid
fn basic_records<R: Reporter>(
    listings: &[Value],
    site_url: &str,
    reporter: &R,
) -> Result<Vec<PropertyRecord>> {
    let zpids = listing_zpids(listings)?;
    let keep = unique_zpids(&zpids, reporter);

    let mut records = Vec::with_capacity(keep.len());
    let mut next = keep.iter().peekable();
    for (zpid, prop) in zpids.iter().zip(listings) {
        // first occurrence of each zpid, same order unique_zpids kept
        if next.peek() == Some(&zpid) {
            records.push(PropertyRecord::from_search_result(prop, site_url)?);
            next.next();
        }
    }
    Ok(records)
}
