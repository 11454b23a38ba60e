use std::path::Path;

use anyhow::Result;
use chrono::{Local, NaiveDate};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use agol_client::AgolClient;
use jsa_common::{Credentials, FilterSpec, RetryPolicy, RunContext, Settings};
use jsa_export::pipeline;

/// Pull Job Safety Analysis survey layers from the portal, merge them into
/// one table and filter it by date range and field criteria.
#[derive(Parser, Debug)]
#[command(name = "jsa-export")]
struct Args {
    /// Exact item title to search the catalog for.
    #[arg(long, default_value = "JSA")]
    title: String,

    /// Catalog item type filter.
    #[arg(long, default_value = "Feature Layer")]
    item_type: String,

    /// Filter window start (YYYY-MM-DD).
    #[arg(long)]
    start_date: NaiveDate,

    /// Filter window end (YYYY-MM-DD).
    #[arg(long)]
    end_date: NaiveDate,

    /// Column to filter on. "tech" selects the multi-column technician mode.
    #[arg(long, default_value = "tech")]
    field: String,

    /// Criterion value; repeat for multiple values.
    #[arg(long = "criteria", required = true)]
    criteria: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("jsa_export=info".parse()?))
        .init();

    let args = Args::parse();
    let settings = Settings::from_env();

    info!(title = %args.title, "JSA export starting");

    // Credentials before anything else; a bad secrets file must fail the run
    // before the first network call.
    let creds = Credentials::load(Path::new(&settings.secrets_path))?;

    let ctx = RunContext::new(
        &args.title,
        Local::now().date_naive(),
        Path::new(&settings.download_root),
        args.start_date,
        args.end_date,
        FilterSpec::from_field(&args.field, args.criteria),
    );
    ctx.prepare()?;

    let catalog = AgolClient::connect(&settings.portal_url, &creds.user, &creds.password).await?;

    let retry = RetryPolicy::new(settings.retry_max_attempts, settings.retry_delay);
    let stats = pipeline::run(&catalog, &ctx, &args.item_type, retry).await?;
    info!("{stats}");

    Ok(())
}
