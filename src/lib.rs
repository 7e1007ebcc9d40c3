//! Zillow listing collection over the RapidAPI proxy: daily per-city snapshots,
//! a per-zipcode summary of the for-sale history, and a list of marked houses.

pub mod collector;
pub mod config;
pub mod error;
pub mod helpers;
pub mod marked;
pub mod merge;
pub mod records;
pub mod report;
pub mod storage;
pub mod summary;
pub mod writer;
pub mod zillow;

#[cfg(test)]
mod testing;

pub use collector::{collect, CollectRequest};
pub use config::Settings;
pub use error::{CollectorError, Result};
pub use records::PropertyRecord;
pub use report::{Event, Reporter, TracingReporter};
pub use writer::WriteOutcome;
pub use zillow::{CollectionMode, StatusType, ZillowClient};
