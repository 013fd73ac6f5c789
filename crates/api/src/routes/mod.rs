//! Route handlers, one module per entity.

pub mod addresses;
pub mod health;
pub mod metrics;
pub mod orders;
pub mod products;
pub mod reviews;
pub mod users;

use common::PageRequest;
use serde::Deserialize;

use crate::error::ApiError;

/// Query parameters of paged listings.
#[derive(Debug, Deserialize)]
pub struct PageParams {
    pub page: Option<u32>,
    pub size: Option<u32>,
}

impl PageParams {
    /// Resolves missing parameters against the default page shape.
    pub fn to_request(&self) -> PageRequest {
        let default = PageRequest::default();
        PageRequest::new(
            self.page.unwrap_or(default.page),
            self.size.unwrap_or(default.size),
        )
    }
}

pub(crate) fn parse_id<T: From<uuid::Uuid>>(raw: &str) -> Result<T, ApiError> {
    let uuid = uuid::Uuid::parse_str(raw)
        .map_err(|e| ApiError::BadRequest(format!("Invalid ID format: {e}")))?;
    Ok(T::from(uuid))
}
