//! Source extractor
//!
//! Reads projects and tokens from the relational source and hands them to
//! the transformer. The result is written to a snapshot file so loading can
//! be retried without querying the source again.

use std::path::Path;

use crate::db::SourceStore;
use crate::error::MigrateError;
use crate::schemas::ProjectSnapshot;
use crate::services::transformer::build_snapshot;

/// Query the source and build the migration snapshot
pub async fn extract_snapshot<S>(source: &S) -> Result<ProjectSnapshot, MigrateError>
where
    S: SourceStore + ?Sized,
{
    tracing::info!("Fetching projects data");
    let projects = source.fetch_projects().await?;

    tracing::info!("Fetching tokens data");
    let tokens = source.fetch_tokens().await?;

    tracing::info!(
        projects = projects.len(),
        tokens = tokens.len(),
        "Building snapshot"
    );
    Ok(build_snapshot(projects, tokens))
}

/// Extract the snapshot and write it to `output`
pub async fn dump_source_to_file<S>(
    source: &S,
    output: &Path,
) -> Result<ProjectSnapshot, MigrateError>
where
    S: SourceStore + ?Sized,
{
    let snapshot = extract_snapshot(source).await?;

    tracing::info!(path = %output.display(), "Writing snapshot");
    snapshot.write_to_path(output)?;

    Ok(snapshot)
}
