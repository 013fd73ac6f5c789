//! Domain error types.

use store::StoreError;
use thiserror::Error;

use crate::address::AddressError;
use crate::catalog::CatalogError;
use crate::order::OrderError;
use crate::review::ReviewError;
use crate::user::UserError;

/// Errors raised by the marketplace engines.
///
/// Rule violations keep their own enums per engine; this wrapper is what
/// crosses the crate boundary so callers can translate uniformly.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An error surfaced by the store.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Referenced entity does not exist or is not visible to the caller.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// An order rule was violated.
    #[error("{0}")]
    Order(#[from] OrderError),

    /// A catalog rule was violated.
    #[error("{0}")]
    Catalog(#[from] CatalogError),

    /// A review rule was violated.
    #[error("{0}")]
    Review(#[from] ReviewError),

    /// An account rule was violated.
    #[error("{0}")]
    User(#[from] UserError),

    /// An address-book rule was violated.
    #[error("{0}")]
    Address(#[from] AddressError),
}

impl DomainError {
    /// Not-found error for an entity named by its id.
    pub fn not_found(entity: &'static str, id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}
