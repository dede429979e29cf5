//! Record transformer
//!
//! Folds flat project and token rows into the hierarchical migration snapshot.

use crate::db::{ProjectRow, TokenRow};
use crate::schemas::{ProjectRecord, ProjectSnapshot, TokenRecord};

/// Build the snapshot from rows sorted by project.
///
/// Tokens naming a project that has no project row are dropped.
pub fn build_snapshot(projects: Vec<ProjectRow>, tokens: Vec<TokenRow>) -> ProjectSnapshot {
    let mut snapshot = ProjectSnapshot::default();

    for row in projects {
        snapshot.projects.insert(
            row.project,
            ProjectRecord {
                repository: row.repository,
                tokens: Vec::new(),
            },
        );
    }

    for row in tokens {
        let Some(project) = snapshot.projects.get_mut(&row.project) else {
            tracing::debug!(
                project = %row.project,
                token_id = %row.token_id,
                "Dropping token for unknown project"
            );
            continue;
        };

        project.tokens.push(TokenRecord {
            token_id: row.token_id,
            created_at: row.created_at,
            expires_at: row.expires_at,
        });
    }

    snapshot
}
