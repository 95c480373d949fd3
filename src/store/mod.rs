//! Persistence helpers over the sea-orm entities. Handlers call these with a
//! `DatabaseConnection`; multi-statement writes open their own transaction.

use sea_orm::DbErr;
use thiserror::Error;

pub mod activity;
pub mod airdrops;
pub mod backup;
pub mod categories;
pub mod ratings;
pub mod settings;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} {key} not found")]
    NotFound { entity: &'static str, key: String },
    #[error("{field} already exists: {value}")]
    Conflict { field: &'static str, value: String },
    #[error("{0}")]
    Rejected(String),
    #[error("failed to encode column: {0}")]
    Encode(#[from] serde_json::Error),
    #[error(transparent)]
    Database(#[from] DbErr),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }
}
