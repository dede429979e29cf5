//! Configuration management module
//!
//! Loads settings from environment variables and .env files and builds the
//! AWS clients they describe.

pub mod aws;
pub mod settings;

pub use aws::{create_dynamodb_client, AwsConfigBuilder};
pub use settings::{parse_host_port, PostgresConfig, Settings};
