//! Services module
//!
//! The pipeline stages: extraction, transformation, loading, timestamp
//! repair and full-table dumps.

pub mod extractor;
pub mod loader;
pub mod table_dump;
pub mod timestamp_repair;
pub mod transformer;

pub use extractor::{dump_source_to_file, extract_snapshot};
pub use loader::{LoadOptions, LoadSummary, Loader, ProjectTally};
pub use table_dump::{dump_table, scan_items};
pub use timestamp_repair::{
    classify_record, Conversion, FieldChange, RecordDecision, RecordOutcome, RecordStatus,
    RepairReport, RepairSummary, SkipReason, TimestampRepair,
};
pub use transformer::build_snapshot;
