use std::path::PathBuf;

use anyhow::Context;
use chrono::Local;
use clap::Parser;
use tracing::{info, warn};

use zillow_data::report::init_tracing;
use zillow_data::storage::{upload_file, GcsUploader, SUMMARY_BLOB_NAME};
use zillow_data::summary::{summarize_dir, write_summary};
use zillow_data::{Settings, TracingReporter};

/// Per-zipcode summary of every `forsale_YYMMDD.csv` snapshot in a directory.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Directory holding the for-sale snapshots
    #[arg(long, default_value = ".")]
    dir: PathBuf,

    /// Write the summary locally without uploading it
    #[arg(long)]
    no_upload: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();

    let settings = Settings::new().context("loading settings")?;
    let reporter = TracingReporter;

    let Some(mut summary) = summarize_dir(&args.dir, Local::now().naive_local(), &reporter)
        .with_context(|| format!("summarizing snapshots in {:?}", args.dir))?
    else {
        warn!("No for-sale snapshots with data in {:?}", args.dir);
        return Ok(());
    };

    let path = settings.output_dir.join(SUMMARY_BLOB_NAME);
    write_summary(&mut summary, &path).with_context(|| format!("writing {:?}", path))?;
    info!("Wrote {} summary rows to {:?}", summary.height(), path);

    if args.no_upload {
        return Ok(());
    }
    let uploader = GcsUploader::new(&settings)?;
    upload_file(&uploader, &path, SUMMARY_BLOB_NAME, &reporter)
        .await
        .with_context(|| format!("uploading {:?}", path))?;

    Ok(())
}
