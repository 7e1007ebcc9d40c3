use std::{path::PathBuf, sync::Mutex};

use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Something worth telling the operator about, emitted by the pipeline stages.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    PageFetched {
        city: String,
        page: u32,
        total_pages: u32,
        listings: usize,
    },
    DuplicateSkipped { zpid: String },
    Reused { zpid: String },
    Fetched { zpid: String },
    PriorSnapshotLoaded { path: PathBuf, rows: usize },
    PriorSnapshotIgnored { path: PathBuf, reason: String },
    Written { path: PathBuf, rows: usize },
    NoData { path: PathBuf },
    Uploaded { path: PathBuf, destination: String },
    SnapshotSummarized { path: PathBuf, rows: usize },
    SnapshotSkipped { path: PathBuf, reason: String },
    Marked { zpid: String, pictures: usize },
    AlreadyMarked { zpid: String },
}

/// Observer the pipeline reports to instead of logging directly.
pub trait Reporter {
    fn report(&self, event: Event);
}

/// Production reporter, turns events into `tracing` records.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&self, event: Event) {
        match event {
            Event::PageFetched { city, page, total_pages, listings } => {
                info!("{}: page {}/{} with {} listings", city, page, total_pages, listings)
            }
            Event::DuplicateSkipped { zpid } => warn!("Duplicate zpid {} skipped", zpid),
            Event::Reused { zpid } => debug!("Reusing cached row for zpid {}", zpid),
            Event::Fetched { zpid } => debug!("Fetched detail for zpid {}", zpid),
            Event::PriorSnapshotLoaded { path, rows } => {
                info!("Loaded {} cached rows from {:?}", rows, path)
            }
            Event::PriorSnapshotIgnored { path, reason } => {
                warn!("Ignoring prior snapshot {:?}: {}", path, reason)
            }
            Event::Written { path, rows } => info!("{:?} is created with {} rows", path, rows),
            Event::NoData { path } => warn!("No data to write, {:?} not created", path),
            Event::Uploaded { path, destination } => {
                info!("File {:?} uploaded to {}", path, destination)
            }
            Event::SnapshotSummarized { path, rows } => {
                info!("Summarized {:?} into {} rows", path, rows)
            }
            Event::SnapshotSkipped { path, reason } => warn!("Skipping {:?}: {}", path, reason),
            Event::Marked { zpid, pictures } => {
                info!("Marked zpid {} with {} pictures", zpid, pictures)
            }
            Event::AlreadyMarked { zpid } => info!("zpid {} already marked", zpid),
        }
    }
}

/// Keeps every event in memory, used by tests to assert on what was reported.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<Event>>,
}

impl RecordingReporter {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl Reporter for RecordingReporter {
    fn report(&self, event: Event) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

const DEFAULT_FILTER: &str = "zillow_data=info,forsale_summary=info,mark_houses=info";

/// Installs the global fmt subscriber; `RUST_LOG` overrides the default level.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into()))
        .with(fmt::layer().with_target(false))
        .init();
}
