//! Shared types for the marketplace backend.
//!
//! Every crate in the workspace speaks in terms of the typed identifiers,
//! `Money`, `Version`, and pagination types defined here.

pub mod money;
pub mod page;
pub mod types;

pub use money::Money;
pub use page::{Page, PageRequest};
pub use types::{AddressId, ImageId, OrderId, ProductId, ReviewId, UserId, Version};
