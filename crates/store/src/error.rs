use thiserror::Error;
use uuid::Uuid;

use common::OrderId;

/// Errors that can occur when interacting with the market store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A guarded write found the row at a different version than the one
    /// the caller read. The caller lost a race and must re-read.
    #[error("Version conflict on {entity} {id}")]
    VersionConflict { entity: &'static str, id: Uuid },

    /// A review already exists for this order.
    #[error("Order {order_id} already has a review")]
    DuplicateReview { order_id: OrderId },

    /// A guarded write targeted a row that no longer exists.
    #[error("{entity} {id} not found")]
    MissingRow { entity: &'static str, id: Uuid },

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
