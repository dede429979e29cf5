//! Cello migration library
//!
//! Moves project/token records from PostgreSQL into a single-table DynamoDB
//! design and repairs legacy timestamps in records already migrated.

// Public modules
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod schemas;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use config::Settings;
pub use error::MigrateError;
