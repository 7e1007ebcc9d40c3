use anyhow::Context;
use chrono::Local;
use clap::Parser;
use tracing::{info, warn};

use zillow_data::helpers::split_list;
use zillow_data::report::init_tracing;
use zillow_data::storage::{upload_file, GcsUploader, FORSALE_BLOB_NAME};
use zillow_data::{
    collect, CollectRequest, CollectionMode, Settings, StatusType, TracingReporter, WriteOutcome,
    ZillowClient,
};

/// Collects Zillow listings for the given cities into a dated CSV snapshot.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Comma-separated city names, e.g. "San Jose,Sunnyvale"
    #[arg(long, required = true)]
    cities: String,

    #[arg(long, value_enum, default_value = "ForSale")]
    status: StatusType,

    #[arg(long, value_enum, default_value = "advanced")]
    mode: CollectionMode,

    /// Sold-in-last window in days, RecentlySold only
    #[arg(long, default_value_t = 7)]
    days: u32,

    /// Upload the snapshot as forsale_latest.csv (advanced ForSale runs only)
    #[arg(long)]
    upload: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();

    let settings = Settings::new().context("loading settings")?;
    let client = ZillowClient::new(&settings)?;
    let reporter = TracingReporter;

    let request = CollectRequest {
        cities: split_list(&args.cities),
        status: args.status,
        mode: args.mode,
        sold_in_last: args.days,
        today: Local::now().date_naive(),
    };
    if request.cities.is_empty() {
        anyhow::bail!("--cities needs at least one city");
    }
    info!("Collecting {:?} listings for {:?}", request.status, request.cities);

    let outcome = collect(&client, &settings, &request, &reporter)
        .await
        .context("collecting listings")?;

    if args.upload && !request.uploads() {
        warn!("--upload only applies to advanced ForSale runs, skipping upload");
        return Ok(());
    }

    if let (true, WriteOutcome::Written { path, .. }) = (args.upload, &outcome) {
        let uploader = GcsUploader::new(&settings)?;
        upload_file(&uploader, path, FORSALE_BLOB_NAME, &reporter)
            .await
            .with_context(|| format!("uploading {:?}", path))?;
    }

    Ok(())
}
