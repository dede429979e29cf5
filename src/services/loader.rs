//! Target loader
//!
//! Flattens each project of a migration snapshot into a metadata item plus
//! one item per token and writes them with insert-if-absent semantics.
//! Items that already exist are counted as skipped, so re-running a load
//! against the same snapshot only produces skips.

use serde_json::Value;
use std::collections::HashSet;

use crate::db::{ItemKey, ItemStore, MigrationItem, StoreError};
use crate::error::MigrateError;
use crate::schemas::RawSnapshot;

const REQUIRED_TOKEN_FIELDS: [&str; 3] = ["token_id", "created_at", "expires_at"];

/// Loader behaviour switches
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadOptions {
    /// Check existence of every item instead of writing it
    pub dry_run: bool,
}

/// Item counts for one project
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProjectTally {
    /// Items inserted (or that would be inserted in a dry run)
    pub processed: usize,
    /// Items that already existed
    pub skipped: usize,
}

/// Counters for a whole load run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub total_projects: usize,
    pub projects_processed: usize,
    pub projects_failed: usize,
    pub items_processed: usize,
    pub items_skipped: usize,
}

impl LoadSummary {
    fn record_project(&mut self, tally: ProjectTally) {
        self.projects_processed += 1;
        self.items_processed += tally.processed;
        self.items_skipped += tally.skipped;
    }

    /// Items inserted plus items skipped
    pub fn items_handled(&self) -> usize {
        self.items_processed + self.items_skipped
    }

    /// Whether any project failed to migrate
    pub fn failed(&self) -> bool {
        self.projects_failed > 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteOutcome {
    Inserted,
    AlreadyExists,
}

/// Loads migration snapshots into an item store
pub struct Loader<'a, S: ?Sized> {
    store: &'a S,
    options: LoadOptions,
}

impl<'a, S> Loader<'a, S>
where
    S: ItemStore + ?Sized,
{
    pub fn new(store: &'a S, options: LoadOptions) -> Self {
        Self { store, options }
    }

    /// Migrate every project in the snapshot.
    ///
    /// A failing project is counted and the run moves on; only fatal store
    /// errors (connection, credentials, missing table) abort the run.
    pub async fn load(&self, snapshot: &RawSnapshot) -> Result<LoadSummary, MigrateError> {
        let mut summary = LoadSummary {
            total_projects: snapshot.projects.len(),
            ..LoadSummary::default()
        };

        for (index, (name, data)) in snapshot.projects.iter().enumerate() {
            tracing::info!(
                project = %name,
                "Processing project {}/{}: {}",
                index + 1,
                summary.total_projects,
                name
            );

            match self.migrate_project(name, data).await {
                Ok(tally) => summary.record_project(tally),
                Err(e) if e.is_fatal() => {
                    tracing::error!(project = %name, error = %e, "Aborting migration");
                    return Err(e);
                }
                Err(e) => {
                    tracing::error!(project = %name, error = %e, "Error migrating project");
                    summary.projects_failed += 1;
                }
            }
        }

        Ok(summary)
    }

    /// Migrate a single project and its tokens
    pub async fn migrate_project(
        &self,
        name: &str,
        data: &Value,
    ) -> Result<ProjectTally, MigrateError> {
        let (repository, tokens) = validate_project(name, data)?;
        let mut tally = ProjectTally::default();
        // Keys a dry run would already have inserted; all keys share this project's pk
        let mut planned = HashSet::new();

        let project_item = MigrationItem::project(name, repository);
        match self.write_item(&project_item, &mut planned).await? {
            WriteOutcome::Inserted => tally.processed += 1,
            WriteOutcome::AlreadyExists => {
                tracing::info!(project = %name, "Project already exists, skipping");
                tally.skipped += 1;
            }
        }

        for (index, token) in tokens.iter().enumerate() {
            let Some(item) = token_item(name, index, token) else {
                continue;
            };

            match self.write_item(&item, &mut planned).await? {
                WriteOutcome::Inserted => tally.processed += 1,
                WriteOutcome::AlreadyExists => {
                    tracing::info!(
                        project = %name,
                        sk = %item.key.sk,
                        "Token already exists, skipping"
                    );
                    tally.skipped += 1;
                }
            }
        }

        tracing::info!(
            project = %name,
            processed = tally.processed,
            skipped = tally.skipped,
            dry_run = self.options.dry_run,
            "✓ Project {}: {} items loaded, {} skipped",
            name,
            tally.processed,
            tally.skipped
        );

        Ok(tally)
    }

    async fn write_item(
        &self,
        item: &MigrationItem,
        planned: &mut HashSet<ItemKey>,
    ) -> Result<WriteOutcome, StoreError> {
        if self.options.dry_run {
            let exists =
                planned.contains(&item.key) || self.store.item_exists(&item.key).await?;
            if !exists {
                planned.insert(item.key.clone());
            }
            tracing::debug!(key = %item.key, exists, "DRY RUN - checked item");
            return Ok(if exists {
                WriteOutcome::AlreadyExists
            } else {
                WriteOutcome::Inserted
            });
        }

        match self.store.put_if_absent(item).await {
            Ok(()) => Ok(WriteOutcome::Inserted),
            Err(e) if e.is_condition_failed() => Ok(WriteOutcome::AlreadyExists),
            Err(e) => Err(e),
        }
    }
}

/// Check a project has a string `repository` and a `tokens` list
fn validate_project<'v>(
    name: &str,
    data: &'v Value,
) -> Result<(&'v str, &'v Vec<Value>), MigrateError> {
    let Some(project) = data.as_object() else {
        return Err(MigrateError::validation(format!(
            "Project {name} is not an object"
        )));
    };

    let repository = match project.get("repository") {
        None => {
            return Err(MigrateError::validation(format!(
                "Project {name} missing 'repository' field"
            )))
        }
        Some(value) => value.as_str().ok_or_else(|| {
            MigrateError::validation(format!("Project {name} 'repository' field is not a string"))
        })?,
    };

    let tokens = match project.get("tokens") {
        None => {
            return Err(MigrateError::validation(format!(
                "Project {name} missing 'tokens' field"
            )))
        }
        Some(value) => value.as_array().ok_or_else(|| {
            MigrateError::validation(format!("Project {name} 'tokens' field is not a list"))
        })?,
    };

    Ok((repository, tokens))
}

/// Build the token item, or warn and return `None` for a malformed token
fn token_item(project: &str, index: usize, token: &Value) -> Option<MigrationItem> {
    let Some(fields) = token.as_object() else {
        tracing::warn!(project, index, "Project {project} token {index} is not an object, skipping");
        return None;
    };

    let mut values = [""; 3];
    for (slot, field) in values.iter_mut().zip(REQUIRED_TOKEN_FIELDS) {
        match fields.get(field) {
            None => {
                tracing::warn!(
                    project,
                    index,
                    "Project {project} token {index} missing '{field}' field, skipping"
                );
                return None;
            }
            Some(value) => match value.as_str() {
                Some(s) => *slot = s,
                None => {
                    tracing::warn!(
                        project,
                        index,
                        "Project {project} token {index} '{field}' field is not a string, skipping"
                    );
                    return None;
                }
            },
        }
    }

    let [token_id, created_at, expires_at] = values;
    Some(MigrationItem::token(project, token_id, created_at, expires_at))
}
