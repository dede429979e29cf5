//! Pipeline error types

use thiserror::Error;

use crate::db::{ExtractError, StoreError};
use crate::schemas::SnapshotError;
use crate::utils::timestamp::TimestampError;

#[derive(Error, Debug)]
pub enum MigrateError {
    /// A project or record does not have the expected shape
    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error(transparent)]
    Timestamp(#[from] TimestampError),

    #[error("Failed to write output: {0}")]
    Output(#[from] std::io::Error),
}

impl MigrateError {
    pub fn validation(msg: impl Into<String>) -> Self {
        MigrateError::Validation(msg.into())
    }

    /// Errors that must abort the whole run rather than one unit of work
    pub fn is_fatal(&self) -> bool {
        match self {
            MigrateError::Store(e) => e.is_fatal(),
            MigrateError::Extract(_) | MigrateError::Snapshot(_) | MigrateError::Output(_) => true,
            MigrateError::Validation(_) | MigrateError::Timestamp(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatality() {
        assert!(!MigrateError::validation("missing 'tokens'").is_fatal());
        assert!(MigrateError::from(StoreError::Auth("denied".into())).is_fatal());
        assert!(!MigrateError::from(StoreError::Service {
            code: "ThrottlingException".into(),
            message: "slow".into(),
        })
        .is_fatal());
        assert!(MigrateError::from(ExtractError::Connection("refused".into())).is_fatal());
    }
}
