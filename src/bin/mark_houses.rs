use anyhow::Context;
use chrono::Local;
use clap::{ArgGroup, Parser};
use tracing::info;

use zillow_data::helpers::split_list;
use zillow_data::marked::{mark_houses, marked_report};
use zillow_data::report::init_tracing;
use zillow_data::{Settings, TracingReporter, ZillowClient};

/// Keeps pictures and details of houses worth a second look.
#[derive(Parser, Debug)]
#[command(version, about)]
#[command(group(ArgGroup::new("action").required(true).multiple(true).args(["zpids", "report"])))]
struct Args {
    /// Comma-separated zpids to mark
    #[arg(long)]
    zpids: Option<String>,

    /// Write marked_detail_YYMMDD.csv for every marked house
    #[arg(long)]
    report: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();

    let settings = Settings::new().context("loading settings")?;
    let client = ZillowClient::new(&settings)?;
    let reporter = TracingReporter;
    let today = Local::now().date_naive();

    if let Some(raw) = &args.zpids {
        let zpids = split_list(raw);
        let count = mark_houses(&client, &settings, &zpids, today, &reporter)
            .await
            .context("marking houses")?;
        info!("Marked {} new houses", count);
    }

    if args.report {
        marked_report(&client, &settings, today, &reporter)
            .await
            .context("building marked report")?;
    }

    Ok(())
}
