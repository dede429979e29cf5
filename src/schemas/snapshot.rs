//! Snapshot file formats
//!
//! Two JSON documents decouple the pipeline stages:
//!
//! - the **migration snapshot**, written by the extractor and read by the
//!   loader: `{"<project>": {"repository": "...", "tokens": [...]}}`
//! - the **table dump**, written by the dump tool and read by the repair
//!   tool: `[{"pk": "...", "sk": "...", ...}, ...]`

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::db::PlainItem;

/// A token as stored in the migration snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub token_id: String,
    pub created_at: String,
    pub expires_at: String,
}

/// A project and its tokens, in source order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub repository: String,
    pub tokens: Vec<TokenRecord>,
}

/// Hierarchical migration snapshot keyed by project name.
///
/// Project order is the order the source returned them in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectSnapshot {
    pub projects: IndexMap<String, ProjectRecord>,
}

impl ProjectSnapshot {
    pub fn project_count(&self) -> usize {
        self.projects.len()
    }

    pub fn token_count(&self) -> usize {
        self.projects.values().map(|p| p.tokens.len()).sum()
    }

    /// Write as pretty-printed JSON
    pub fn to_writer<W: Write>(&self, writer: W) -> Result<(), SnapshotError> {
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Write to `path`, creating parent directories as needed
    pub fn write_to_path(&self, path: &Path) -> Result<(), SnapshotError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| SnapshotError::io(parent, e))?;
        }

        let file = File::create(path).map_err(|e| SnapshotError::io(path, e))?;
        let mut writer = BufWriter::new(file);
        self.to_writer(&mut writer)?;
        writer
            .write_all(b"\n")
            .and_then(|_| writer.flush())
            .map_err(|e| SnapshotError::io(path, e))
    }
}

/// Migration snapshot as read by the loader.
///
/// Project bodies stay untyped so a malformed project fails on its own
/// instead of rejecting the whole file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawSnapshot {
    pub projects: IndexMap<String, Value>,
}

impl RawSnapshot {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn from_path(path: &Path) -> Result<Self, SnapshotError> {
        let file = File::open(path).map_err(|e| SnapshotError::io(path, e))?;
        Self::from_reader(BufReader::new(file))
    }
}

impl From<&ProjectSnapshot> for RawSnapshot {
    fn from(snapshot: &ProjectSnapshot) -> Self {
        let projects = snapshot
            .projects
            .iter()
            .map(|(name, project)| {
                let value = serde_json::to_value(project).unwrap_or(Value::Null);
                (name.clone(), value)
            })
            .collect();
        Self { projects }
    }
}

/// Read a table dump (JSON array of plain items)
pub fn read_table_dump<R: Read>(reader: R) -> Result<Vec<PlainItem>, SnapshotError> {
    Ok(serde_json::from_reader(reader)?)
}

/// Read a table dump from `path`
pub fn read_table_dump_path(path: &Path) -> Result<Vec<PlainItem>, SnapshotError> {
    let file = File::open(path).map_err(|e| SnapshotError::io(path, e))?;
    read_table_dump(BufReader::new(file))
}

/// Errors reading or writing snapshot files
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl SnapshotError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        SnapshotError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
