//! Utility modules

pub mod timestamp;

pub use timestamp::{is_canonical, is_legacy, legacy_to_canonical, TimestampError};
