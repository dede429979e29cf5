//! Target store abstraction
//!
//! The migration pipeline only needs a handful of primitives from the
//! key-value store. Each write is conditional, so the store itself provides
//! per-item atomicity against concurrent writers.

use async_trait::async_trait;
use std::collections::BTreeMap;

use super::models::{ItemKey, MigrationItem, PlainItem};

/// One page of a full-table scan
#[derive(Debug, Clone, Default)]
pub struct ScanPage {
    /// Items on this page, already converted to plain attributes
    pub items: Vec<PlainItem>,

    /// Where the next page starts, `None` once the scan is exhausted
    pub last_evaluated_key: Option<ItemKey>,
}

/// Key-value store operations consumed by the loader, repair and dump tools.
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Verify the table is reachable with the configured credentials
    async fn check_connection(&self) -> Result<(), StoreError>;

    /// Whether the table exists. Other connection failures are still errors.
    async fn table_exists(&self) -> Result<bool, StoreError> {
        match self.check_connection().await {
            Ok(()) => Ok(true),
            Err(StoreError::TableNotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Insert `item` only if no item with the same pk+sk exists.
    ///
    /// Returns `StoreError::ConditionFailed` when the item is already present.
    async fn put_if_absent(&self, item: &MigrationItem) -> Result<(), StoreError>;

    /// Set `attributes` on an existing item.
    ///
    /// Returns `StoreError::ConditionFailed` when the item does not exist.
    async fn update_if_exists(
        &self,
        key: &ItemKey,
        attributes: &BTreeMap<String, String>,
    ) -> Result<(), StoreError>;

    /// Check whether an item with this key exists
    async fn item_exists(&self, key: &ItemKey) -> Result<bool, StoreError>;

    /// Fetch one scan page starting after `start` (or at the beginning)
    async fn scan_page(&self, start: Option<ItemKey>) -> Result<ScanPage, StoreError>;
}

/// Errors returned by the target store
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("ConditionalCheckFailedException: {0}")]
    ConditionFailed(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Access denied: {0}")]
    Auth(String),

    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("{code}: {message}")]
    Service { code: String, message: String },

    #[error("Malformed item: {0}")]
    Malformed(String),
}

impl StoreError {
    /// Errors after which no further store call can succeed
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            StoreError::Connection(_) | StoreError::Auth(_) | StoreError::TableNotFound(_)
        )
    }

    pub fn is_condition_failed(&self) -> bool {
        matches!(self, StoreError::ConditionFailed(_))
    }
}
