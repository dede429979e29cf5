//! Database module
//!
//! Contains the PostgreSQL source, the DynamoDB target and the single-table
//! item model shared between them.

pub mod attributes;
pub mod dynamodb;
#[cfg(test)]
pub mod memory;
pub mod models;
pub mod postgres;
pub mod store;

pub use dynamodb::DynamoDbStore;
#[cfg(test)]
pub use memory::MemoryStore;
pub use models::{ItemKey, MigrationItem, PlainItem, METADATA_SORT_KEY};
pub use postgres::{ExtractError, PostgresSource, ProjectRow, SourceStore, TokenRow};
pub use store::{ItemStore, ScanPage, StoreError};
