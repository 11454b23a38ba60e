use std::path::PathBuf;

use anyhow::Result;
use tracing::{info, warn};

use agol_client::ContentItem;
use jsa_common::{RetryPolicy, RunContext, Table};

use crate::traits::Catalog;

/// What Fetch & Cache actually produced: the ordered list of cache files
/// present for this run (freshly written or found on disk), so Merge works
/// from explicit provenance instead of a raw directory listing.
#[derive(Debug, Default)]
pub struct FetchManifest {
    pub files: Vec<PathBuf>,
    pub downloaded: usize,
    pub skipped: usize,
    /// True when a retry-exhausted failure stopped the loop before the end
    /// of the item list.
    pub aborted: bool,
}

/// Download each item's first layer to its cache file, in search-result
/// order. An item whose cache file already exists for this run date is never
/// re-queried. A failure is retried per `retry`; exhausting the attempts
/// stops the whole loop (remaining items are left unfetched) and the run
/// continues with whatever is in the manifest.
pub async fn fetch_stage(
    catalog: &dyn Catalog,
    ctx: &RunContext,
    items: &[ContentItem],
    retry: RetryPolicy,
) -> Result<FetchManifest> {
    let mut manifest = FetchManifest::default();

    'items: for item in items {
        let path = ctx.cache_file(&item.title);
        if path.exists() {
            info!(file = %path.display(), "already exists");
            manifest.skipped += 1;
            manifest.files.push(path);
            continue;
        }

        let mut attempt = 1u32;
        loop {
            match fetch_one(catalog, item, &path).await {
                Ok(rows) => {
                    info!(file = %path.display(), rows, "Downloaded");
                    manifest.downloaded += 1;
                    manifest.files.push(path);
                    break;
                }
                Err(e) => {
                    warn!(
                        item = %item.title,
                        attempt,
                        max_attempts = retry.max_attempts,
                        error = %e,
                        "Download failed"
                    );
                    if attempt >= retry.max_attempts {
                        warn!(
                            item = %item.title,
                            "Retries exhausted, skipping item and stopping fetch loop"
                        );
                        manifest.aborted = true;
                        break 'items;
                    }
                    info!(delay_secs = retry.delay.as_secs(), "Retrying after delay");
                    tokio::time::sleep(retry.delay).await;
                    attempt += 1;
                }
            }
        }
    }

    info!(
        downloaded = manifest.downloaded,
        total = items.len(),
        "Downloaded {} of {} successfully",
        manifest.downloaded,
        items.len()
    );
    Ok(manifest)
}

async fn fetch_one(
    catalog: &dyn Catalog,
    item: &ContentItem,
    path: &std::path::Path,
) -> Result<usize> {
    let feature_set = catalog.query_layer(item, 0).await?;
    let (columns, rows) = feature_set.into_rows();
    let table = Table::new(columns, rows);
    table.write_csv(path)?;
    Ok(table.len())
}
