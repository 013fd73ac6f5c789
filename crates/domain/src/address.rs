//! Address book.

use store::{Address, AddressId, MarketStore, UserId};
use thiserror::Error;

use crate::error::DomainError;

/// Input for [`AddressService::add_address`].
#[derive(Debug, Clone)]
pub struct NewAddress {
    pub street: String,
    pub city: String,
    pub postal_code: String,
    pub province: String,
    pub country: String,
}

/// Address-book rule violations.
#[derive(Debug, Error)]
pub enum AddressError {
    /// Address belongs to another user.
    #[error("Address belongs to another user")]
    NotOwner,

    /// Orders still in progress ship to the address.
    #[error("Address is referenced by {count} order(s) still in progress")]
    InUse { count: u64 },
}

/// Service for a user's shipping addresses.
pub struct AddressService<S: MarketStore> {
    store: S,
}

impl<S: MarketStore> AddressService<S> {
    /// Creates a new address service over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Adds an address to the caller's book.
    #[tracing::instrument(skip(self, new))]
    pub async fn add_address(
        &self,
        owner: UserId,
        new: NewAddress,
    ) -> Result<Address, DomainError> {
        let address = Address {
            id: AddressId::new(),
            street: new.street,
            city: new.city,
            postal_code: new.postal_code,
            province: new.province,
            country: new.country,
            user_id: owner,
        };
        self.store.insert_address(address.clone()).await?;
        Ok(address)
    }

    /// The caller's addresses.
    pub async fn addresses(&self, owner: UserId) -> Result<Vec<Address>, DomainError> {
        Ok(self.store.addresses_for_user(owner).await?)
    }

    /// Deletes an address the caller owns, unless an order still in
    /// progress ships to it. Terminal orders keep their row and lose the
    /// reference.
    #[tracing::instrument(skip(self))]
    pub async fn delete_address(&self, caller: UserId, id: AddressId) -> Result<(), DomainError> {
        let address = self
            .store
            .address(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Address", id))?;
        if address.user_id != caller {
            return Err(AddressError::NotOwner.into());
        }
        let blocking = self.store.count_blocking_orders_for_address(id).await?;
        if blocking > 0 {
            return Err(AddressError::InUse { count: blocking }.into());
        }
        self.store.delete_address(id).await?;
        Ok(())
    }
}
