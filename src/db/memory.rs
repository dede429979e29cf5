//! In-memory item store for tests
//!
//! Mirrors the conditional semantics of the DynamoDB store and lets tests
//! inject store failures for individual keys.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::Mutex;

use super::models::{ItemKey, MigrationItem, PlainItem};
use super::store::{ItemStore, ScanPage, StoreError};

#[derive(Debug)]
pub struct MemoryStore {
    items: Mutex<BTreeMap<ItemKey, PlainItem>>,
    failures: Mutex<HashMap<ItemKey, StoreError>>,
    connection_error: Option<StoreError>,
    page_size: usize,
    writes: Mutex<usize>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(BTreeMap::new()),
            failures: Mutex::new(HashMap::new()),
            connection_error: None,
            page_size: 100,
            writes: Mutex::new(0),
        }
    }

    /// Scan page size, to exercise pagination
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Make every operation fail with `err`
    pub fn unreachable(mut self, err: StoreError) -> Self {
        self.connection_error = Some(err);
        self
    }

    /// Make every operation touching `key` fail with `err`
    pub async fn fail_on(&self, key: ItemKey, err: StoreError) {
        self.failures.lock().await.insert(key, err);
    }

    /// Seed an item directly, bypassing conditions
    pub async fn insert_plain(&self, item: PlainItem) {
        let key = ItemKey::from_plain(&item).expect("seeded item needs string pk/sk");
        self.items.lock().await.insert(key, item);
    }

    pub async fn get(&self, key: &ItemKey) -> Option<PlainItem> {
        self.items.lock().await.get(key).cloned()
    }

    pub async fn len(&self) -> usize {
        self.items.lock().await.len()
    }

    pub async fn snapshot(&self) -> BTreeMap<ItemKey, PlainItem> {
        self.items.lock().await.clone()
    }

    /// Number of successful writes (puts and updates)
    pub async fn write_count(&self) -> usize {
        *self.writes.lock().await
    }

    async fn check(&self, key: Option<&ItemKey>) -> Result<(), StoreError> {
        if let Some(err) = &self.connection_error {
            return Err(err.clone());
        }
        if let Some(key) = key {
            if let Some(err) = self.failures.lock().await.get(key) {
                return Err(err.clone());
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ItemStore for MemoryStore {
    async fn check_connection(&self) -> Result<(), StoreError> {
        self.check(None).await
    }

    async fn put_if_absent(&self, item: &MigrationItem) -> Result<(), StoreError> {
        self.check(Some(&item.key)).await?;

        let mut items = self.items.lock().await;
        if items.contains_key(&item.key) {
            return Err(StoreError::ConditionFailed(
                "The conditional request failed".to_string(),
            ));
        }
        items.insert(item.key.clone(), item.to_plain());
        *self.writes.lock().await += 1;
        Ok(())
    }

    async fn update_if_exists(
        &self,
        key: &ItemKey,
        attributes: &BTreeMap<String, String>,
    ) -> Result<(), StoreError> {
        self.check(Some(key)).await?;

        let mut items = self.items.lock().await;
        let Some(item) = items.get_mut(key) else {
            return Err(StoreError::ConditionFailed(
                "The conditional request failed".to_string(),
            ));
        };
        for (name, value) in attributes {
            item.insert(name.clone(), Value::String(value.clone()));
        }
        *self.writes.lock().await += 1;
        Ok(())
    }

    async fn item_exists(&self, key: &ItemKey) -> Result<bool, StoreError> {
        self.check(Some(key)).await?;
        Ok(self.items.lock().await.contains_key(key))
    }

    async fn scan_page(&self, start: Option<ItemKey>) -> Result<ScanPage, StoreError> {
        self.check(None).await?;

        let items = self.items.lock().await;
        let page: Vec<(&ItemKey, &PlainItem)> = match &start {
            Some(start) => items
                .range(start.clone()..)
                .filter(|(k, _)| *k != start)
                .take(self.page_size)
                .collect(),
            None => items.iter().take(self.page_size).collect(),
        };

        let last_evaluated_key = match page.last() {
            Some((last, _)) if page.len() == self.page_size => Some((*last).clone()),
            _ => None,
        };

        Ok(ScanPage {
            items: page.into_iter().map(|(_, item)| item.clone()).collect(),
            last_evaluated_key,
        })
    }
}
