//! Single-table item models
//!
//! Every project and token lives in one table keyed by `pk` + `sk`:
//!
//! | item           | pk                 | sk                  |
//! |----------------|--------------------|---------------------|
//! | project        | `PROJECT#<name>`   | `METADATA`          |
//! | project token  | `PROJECT#<name>`   | `TOKEN#<token_id>`  |

use aws_sdk_dynamodb::types::AttributeValue;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

/// Partition key attribute name
pub const PARTITION_KEY: &str = "pk";

/// Sort key attribute name
pub const SORT_KEY: &str = "sk";

/// Sort key of the project metadata item
pub const METADATA_SORT_KEY: &str = "METADATA";

const PROJECT_PREFIX: &str = "PROJECT#";
const TOKEN_PREFIX: &str = "TOKEN#";

/// A plain (untyped) item as it appears in table dumps.
pub type PlainItem = serde_json::Map<String, Value>;

/// Composite primary key of an item.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ItemKey {
    pub pk: String,
    pub sk: String,
}

impl ItemKey {
    pub fn new(pk: impl Into<String>, sk: impl Into<String>) -> Self {
        Self {
            pk: pk.into(),
            sk: sk.into(),
        }
    }

    /// Key of a project's metadata item
    pub fn project_metadata(project: &str) -> Self {
        Self::new(project_partition(project), METADATA_SORT_KEY)
    }

    /// Key of a token item owned by `project`
    pub fn project_token(project: &str, token_id: &str) -> Self {
        Self::new(project_partition(project), format!("{TOKEN_PREFIX}{token_id}"))
    }

    /// Convert to a DynamoDB key map
    pub fn to_dynamodb(&self) -> HashMap<String, AttributeValue> {
        HashMap::from([
            (PARTITION_KEY.to_string(), AttributeValue::S(self.pk.clone())),
            (SORT_KEY.to_string(), AttributeValue::S(self.sk.clone())),
        ])
    }

    /// Parse from a DynamoDB key map (e.g. `LastEvaluatedKey`)
    pub fn from_dynamodb(key: &HashMap<String, AttributeValue>) -> Option<Self> {
        Some(Self {
            pk: get_string(key, PARTITION_KEY)?,
            sk: get_string(key, SORT_KEY)?,
        })
    }

    /// Read the key out of a plain item. Both components must be strings.
    pub fn from_plain(item: &PlainItem) -> Option<Self> {
        Some(Self {
            pk: item.get(PARTITION_KEY)?.as_str()?.to_string(),
            sk: item.get(SORT_KEY)?.as_str()?.to_string(),
        })
    }
}

impl std::fmt::Display for ItemKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}][{}]", self.pk, self.sk)
    }
}

fn project_partition(project: &str) -> String {
    format!("{PROJECT_PREFIX}{project}")
}

/// A flattened item written by the loader.
///
/// Attributes other than the key are always strings in this table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationItem {
    pub key: ItemKey,
    pub attributes: BTreeMap<String, String>,
}

impl MigrationItem {
    /// Project metadata item carrying the repository URL
    pub fn project(project: &str, repository: &str) -> Self {
        Self {
            key: ItemKey::project_metadata(project),
            attributes: BTreeMap::from([("repository".to_string(), repository.to_string())]),
        }
    }

    /// Token item carrying its creation and expiry timestamps
    pub fn token(project: &str, token_id: &str, created_at: &str, expires_at: &str) -> Self {
        Self {
            key: ItemKey::project_token(project, token_id),
            attributes: BTreeMap::from([
                ("created_at".to_string(), created_at.to_string()),
                ("expires_at".to_string(), expires_at.to_string()),
            ]),
        }
    }

    /// Convert to DynamoDB item
    pub fn to_dynamodb(&self) -> HashMap<String, AttributeValue> {
        let mut item = self.key.to_dynamodb();
        for (name, value) in &self.attributes {
            item.insert(name.clone(), AttributeValue::S(value.clone()));
        }
        item
    }

    /// Convert to the plain representation used by dumps
    pub fn to_plain(&self) -> PlainItem {
        let mut item = PlainItem::new();
        item.insert(PARTITION_KEY.to_string(), Value::String(self.key.pk.clone()));
        item.insert(SORT_KEY.to_string(), Value::String(self.key.sk.clone()));
        for (name, value) in &self.attributes {
            item.insert(name.clone(), Value::String(value.clone()));
        }
        item
    }
}

fn get_string(item: &HashMap<String, AttributeValue>, key: &str) -> Option<String> {
    item.get(key).and_then(|v| v.as_s().ok()).map(|s| s.to_string())
}
