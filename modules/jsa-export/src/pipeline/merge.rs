use std::path::PathBuf;

use tracing::info;

use jsa_common::{JsaError, RunContext, Table};

use super::fetch::FetchManifest;

/// Concatenate every cache file in manifest order into one table, aligning
/// columns by name, and write it under the `0`-prefixed merged name. An
/// empty manifest is fatal: there is no base table to seed the merge.
pub fn merge_stage(
    ctx: &RunContext,
    manifest: &FetchManifest,
) -> Result<(Table, PathBuf), JsaError> {
    info!(dir = %ctx.output_dir.display(), files = manifest.files.len(), "Merging cached files");

    let mut files = manifest.files.iter();
    let base = files.next().ok_or(JsaError::NothingToMerge)?;
    let mut master = Table::read_csv(base)?;
    for file in files {
        master.append(Table::read_csv(file)?);
    }

    let path = ctx.merged_file();
    master.write_csv(&path)?;
    info!(rows = master.len(), file = %path.display(), "Merge complete");
    Ok((master, path))
}
