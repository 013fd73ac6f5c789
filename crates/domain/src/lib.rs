//! Marketplace engines.
//!
//! The business rules of the marketplace sit here, between the HTTP
//! surface and the store:
//! - catalog listings and their lifecycle
//! - order placement and status transitions with compensating release
//! - buyer reviews of completed orders
//! - account registration, profiles, and soft deactivation
//! - the address book and its deletion guard
//!
//! Every service is generic over [`store::MarketStore`], so the same
//! rules run against PostgreSQL and the in-memory store.

pub mod access;
pub mod address;
pub mod catalog;
pub mod error;
pub mod order;
pub mod review;
pub mod user;

pub use access::{Permission, has_permission, permissions};
pub use address::{AddressError, AddressService, NewAddress};
pub use catalog::{CatalogError, CatalogService, NewProduct, ProductChanges};
pub use error::DomainError;
pub use order::{CallerRelation, OrderError, OrderService, TransitionEffect, plan_transition};
pub use review::{ReviewError, ReviewService};
pub use user::{NewUser, ProfileChanges, UserError, UserService};
