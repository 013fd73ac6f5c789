pub mod error;
pub mod filter;
pub mod memory;
pub mod model;
pub mod postgres;
pub mod store;

pub use common::{
    AddressId, ImageId, Money, OrderId, Page, PageRequest, ProductId, ReviewId, UserId, Version,
};
pub use error::{Result, StoreError};
pub use filter::{ProductFilter, SortOrder};
pub use memory::InMemoryStore;
pub use model::{
    Address, Condition, Order, OrderStatus, Product, ProductImage, ProductState, Review, Role,
    User,
};
pub use postgres::PostgresStore;
pub use store::MarketStore;
