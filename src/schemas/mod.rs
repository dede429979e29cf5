//! Snapshot schemas
//!
//! File formats exchanged between the pipeline stages.

pub mod snapshot;

pub use snapshot::{
    read_table_dump, read_table_dump_path, ProjectRecord, ProjectSnapshot, RawSnapshot,
    SnapshotError, TokenRecord,
};
