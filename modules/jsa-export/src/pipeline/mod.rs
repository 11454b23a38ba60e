// The four-stage export pipeline: search, fetch & cache, merge, filter.
// Strictly sequential; each stage consumes the previous stage's output.

pub mod fetch;
pub mod filter;
pub mod merge;

use anyhow::Result;
use tracing::info;

use jsa_common::{RetryPolicy, RunContext};

use crate::traits::Catalog;

/// Search cap, large enough to mean "all matching items."
pub const MAX_SEARCH_ITEMS: usize = 10_000;

/// Stats from one export run.
#[derive(Debug, Default)]
pub struct RunStats {
    pub items_found: usize,
    pub downloaded: usize,
    pub skipped: usize,
    pub fetch_aborted: bool,
    pub merged_rows: usize,
    pub filtered_rows: usize,
}

impl std::fmt::Display for RunStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\n=== Export Run Complete ===")?;
        writeln!(f, "Items found:    {}", self.items_found)?;
        writeln!(f, "Downloaded:     {}", self.downloaded)?;
        writeln!(f, "Already cached: {}", self.skipped)?;
        if self.fetch_aborted {
            writeln!(f, "Fetch loop stopped early; merged what was cached")?;
        }
        writeln!(f, "Merged rows:    {}", self.merged_rows)?;
        write!(f, "Filtered rows:  {}", self.filtered_rows)
    }
}

/// Run the whole pipeline against a catalog. A search failure is fatal;
/// fetch failures are retried per `retry` and can stop the fetch loop early,
/// in which case merge and filter still run over whatever was cached.
pub async fn run(
    catalog: &dyn Catalog,
    ctx: &RunContext,
    item_type: &str,
    retry: RetryPolicy,
) -> Result<RunStats> {
    let items = catalog
        .search_items(&ctx.search_title, item_type, MAX_SEARCH_ITEMS)
        .await?;
    info!(
        title = %ctx.search_title,
        item_type,
        count = items.len(),
        "Catalog search returned items"
    );

    let manifest = fetch::fetch_stage(catalog, ctx, &items, retry).await?;
    let (merged, _) = merge::merge_stage(ctx, &manifest)?;
    let (filtered, _) = filter::filter_stage(ctx, &merged)?;

    Ok(RunStats {
        items_found: items.len(),
        downloaded: manifest.downloaded,
        skipped: manifest.skipped,
        fetch_aborted: manifest.aborted,
        merged_rows: merged.len(),
        filtered_rows: filtered.len(),
    })
}
