//! Timestamp repair
//!
//! Walks a table dump and rewrites token timestamps from the legacy
//! PostgreSQL rendering to the canonical RFC 3339 form. Each record gets
//! exactly one outcome: skipped for a stated reason, updated, or failed.

use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use crate::db::{ItemKey, ItemStore, PlainItem, METADATA_SORT_KEY};
use crate::error::MigrateError;
use crate::utils::timestamp::{is_canonical, is_legacy, legacy_to_canonical};

const CREATED_AT: &str = "created_at";
const EXPIRES_AT: &str = "expires_at";

/// Why a record was left alone
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SkipReason {
    Metadata,
    MissingFields,
    AlreadyCanonical,
    UnrecognizedFormat,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            SkipReason::Metadata => "METADATA record",
            SkipReason::MissingFields => "Missing timestamp fields",
            SkipReason::AlreadyCanonical => "Already in ISO format (ends with Z)",
            SkipReason::UnrecognizedFormat => "Timestamps don't end with +00",
        };
        f.write_str(reason)
    }
}

/// Result of the per-record decision procedure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordDecision<'a> {
    Skip(SkipReason),
    Convert {
        key: ItemKey,
        created_at: &'a str,
        expires_at: &'a str,
    },
}

/// Decide what to do with one dumped record. The first matching rule wins.
pub fn classify_record(record: &PlainItem) -> RecordDecision<'_> {
    if record.get("sk").and_then(Value::as_str) == Some(METADATA_SORT_KEY) {
        return RecordDecision::Skip(SkipReason::Metadata);
    }

    let (Some(created_at), Some(expires_at)) = (record.get(CREATED_AT), record.get(EXPIRES_AT))
    else {
        return RecordDecision::Skip(SkipReason::MissingFields);
    };
    let Some(key) = ItemKey::from_plain(record) else {
        return RecordDecision::Skip(SkipReason::MissingFields);
    };

    let (created_at, expires_at) = (created_at.as_str(), expires_at.as_str());

    if created_at.is_some_and(is_canonical) || expires_at.is_some_and(is_canonical) {
        return RecordDecision::Skip(SkipReason::AlreadyCanonical);
    }

    match (created_at, expires_at) {
        (Some(created_at), Some(expires_at)) if is_legacy(created_at) && is_legacy(expires_at) => {
            RecordDecision::Convert {
                key,
                created_at,
                expires_at,
            }
        }
        _ => RecordDecision::Skip(SkipReason::UnrecognizedFormat),
    }
}

/// Old and new value of one timestamp field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldChange {
    pub from: String,
    pub to: String,
}

/// Both converted timestamps of a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversion {
    pub created_at: FieldChange,
    pub expires_at: FieldChange,
}

impl Conversion {
    fn new(created_at: &str, expires_at: &str) -> Result<Self, MigrateError> {
        Ok(Self {
            created_at: FieldChange {
                from: created_at.to_string(),
                to: legacy_to_canonical(created_at)?,
            },
            expires_at: FieldChange {
                from: expires_at.to_string(),
                to: legacy_to_canonical(expires_at)?,
            },
        })
    }

    fn attributes(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            (CREATED_AT.to_string(), self.created_at.to.clone()),
            (EXPIRES_AT.to_string(), self.expires_at.to.clone()),
        ])
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordStatus {
    Skipped(SkipReason),
    Updated,
    WouldUpdate,
    Failed(String),
}

/// What happened to one input record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordOutcome {
    pub key: Option<ItemKey>,
    pub conversion: Option<Conversion>,
    pub status: RecordStatus,
}

/// Counters for a repair run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepairSummary {
    pub total: usize,
    pub skipped: usize,
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped_by_reason: BTreeMap<SkipReason, usize>,
}

impl RepairSummary {
    fn record(&mut self, status: &RecordStatus) {
        match status {
            RecordStatus::Skipped(reason) => {
                self.skipped += 1;
                *self.skipped_by_reason.entry(*reason).or_default() += 1;
            }
            RecordStatus::Updated | RecordStatus::WouldUpdate => {
                self.processed += 1;
                self.succeeded += 1;
            }
            RecordStatus::Failed(_) => {
                self.processed += 1;
                self.failed += 1;
            }
        }
    }

    /// Whether any processed record failed to apply
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

#[derive(Debug, Clone, Default)]
pub struct RepairReport {
    pub summary: RepairSummary,
    pub outcomes: Vec<RecordOutcome>,
}

/// Applies timestamp conversions to an item store
pub struct TimestampRepair<'a, S: ?Sized> {
    store: &'a S,
    dry_run: bool,
}

impl<'a, S> TimestampRepair<'a, S>
where
    S: ItemStore + ?Sized,
{
    pub fn new(store: &'a S, dry_run: bool) -> Self {
        Self { store, dry_run }
    }

    /// Repair every record of a dump.
    ///
    /// Only fatal store errors abort the run; other failures are recorded
    /// on the record and counted.
    pub async fn run(&self, records: &[PlainItem]) -> Result<RepairReport, MigrateError> {
        let mut report = RepairReport {
            summary: RepairSummary {
                total: records.len(),
                ..RepairSummary::default()
            },
            outcomes: Vec::with_capacity(records.len()),
        };

        for record in records {
            let outcome = self.repair_record(record).await?;
            report.summary.record(&outcome.status);
            report.outcomes.push(outcome);
        }

        Ok(report)
    }

    async fn repair_record(&self, record: &PlainItem) -> Result<RecordOutcome, MigrateError> {
        let (key, created_at, expires_at) = match classify_record(record) {
            RecordDecision::Skip(reason) => {
                tracing::debug!(
                    pk = ?record.get("pk"),
                    sk = ?record.get("sk"),
                    reason = %reason,
                    "Skipping record"
                );
                return Ok(RecordOutcome {
                    key: ItemKey::from_plain(record),
                    conversion: None,
                    status: RecordStatus::Skipped(reason),
                });
            }
            RecordDecision::Convert {
                key,
                created_at,
                expires_at,
            } => (key, created_at, expires_at),
        };

        tracing::info!(pk = %key.pk, sk = %key.sk, "{}:", key);

        let conversion = match Conversion::new(created_at, expires_at) {
            Ok(conversion) => conversion,
            Err(e) => {
                tracing::error!(pk = %key.pk, sk = %key.sk, error = %e, "  ✗ Failed: {}", e);
                return Ok(RecordOutcome {
                    key: Some(key),
                    conversion: None,
                    status: RecordStatus::Failed(e.to_string()),
                });
            }
        };

        for (field, change) in [
            (CREATED_AT, &conversion.created_at),
            (EXPIRES_AT, &conversion.expires_at),
        ] {
            tracing::info!(
                pk = %key.pk,
                sk = %key.sk,
                field,
                from = %change.from,
                to = %change.to,
                "  {}: {} → {}",
                field,
                change.from,
                change.to
            );
        }

        let status = if self.dry_run {
            tracing::info!(pk = %key.pk, sk = %key.sk, "  DRY RUN - Would update");
            RecordStatus::WouldUpdate
        } else {
            match self
                .store
                .update_if_exists(&key, &conversion.attributes())
                .await
            {
                Ok(()) => {
                    tracing::info!(pk = %key.pk, sk = %key.sk, "  ✓ Updated");
                    RecordStatus::Updated
                }
                Err(e) if e.is_fatal() => return Err(e.into()),
                Err(e) => {
                    tracing::error!(pk = %key.pk, sk = %key.sk, error = %e, "  ✗ Failed: {}", e);
                    RecordStatus::Failed(e.to_string())
                }
            }
        };

        Ok(RecordOutcome {
            key: Some(key),
            conversion: Some(conversion),
            status,
        })
    }
}
