use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use common::{AddressId, ImageId, Money, OrderId, ProductId, ReviewId, UserId, Version};

/// Role assigned to a user account.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, Default,
)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

/// Lifecycle state of a product listing.
///
/// Only the order engine moves a product between `Available` and `Sold`;
/// `Archived` is terminal and entered by the seller or an admin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "product_state", rename_all = "lowercase")]
pub enum ProductState {
    Available,
    Sold,
    Archived,
}

/// Declared physical condition of a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "product_condition", rename_all = "snake_case")]
pub enum Condition {
    New,
    LikeNew,
    Good,
    Used,
    Damaged,
}

/// Status of an order.
///
/// `Confirmed` is the entry status. `Pending` is a legacy entry status that
/// remains a valid cancellation source for rows that still hold it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "order_status", rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Shipped,
    Completed,
    Cancelled,
}

impl OrderStatus {
    /// Terminal statuses admit no further transition and do not block
    /// address deletion.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Confirmed => "Confirmed",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Completed => "Completed",
            OrderStatus::Cancelled => "Cancelled",
        };
        write!(f, "{s}")
    }
}

impl std::fmt::Display for ProductState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ProductState::Available => "Available",
            ProductState::Sold => "Sold",
            ProductState::Archived => "Archived",
        };
        write!(f, "{s}")
    }
}

/// A user account row. Accounts are soft-deactivated, never deleted.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub active: bool,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A shipping address owned by exactly one user.
#[derive(Debug, Clone, PartialEq)]
pub struct Address {
    pub id: AddressId,
    pub street: String,
    pub city: String,
    pub postal_code: String,
    pub province: String,
    pub country: String,
    pub user_id: UserId,
}

/// A product listing row.
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub description: String,
    pub price: Money,
    pub category: String,
    pub condition: Condition,
    pub state: ProductState,
    pub seller_id: UserId,
    /// Row version for optimistic concurrency. Every guarded write names
    /// the version it read; the store bumps it on success.
    pub version: Version,
    pub created_at: DateTime<Utc>,
}

/// One image attached to a product, ordered by `position`.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductImage {
    pub id: ImageId,
    pub product_id: ProductId,
    pub url: String,
    pub position: i32,
}

/// An order row.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: OrderId,
    pub buyer_id: UserId,
    /// Copied from the product at placement so seller queries do not join.
    pub seller_id: UserId,
    pub product_id: ProductId,
    /// Cleared when the address is deleted after the order reaches a
    /// terminal status.
    pub address_id: Option<AddressId>,
    pub status: OrderStatus,
    pub placed_at: DateTime<Utc>,
    /// Row version for optimistic concurrency on status transitions.
    pub version: Version,
}

impl Order {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// A review left by the buyer of a completed order. Immutable once written;
/// at most one per order.
#[derive(Debug, Clone, PartialEq)]
pub struct Review {
    pub id: ReviewId,
    pub order_id: OrderId,
    pub rating: i32,
    pub comment: Option<String>,
    pub reviewer_id: UserId,
    pub reviewee_id: UserId,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses() {
        assert!(OrderStatus::Completed.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(!OrderStatus::Pending.is_terminal());
        assert!(!OrderStatus::Confirmed.is_terminal());
        assert!(!OrderStatus::Shipped.is_terminal());
    }

    #[test]
    fn status_display() {
        assert_eq!(OrderStatus::Confirmed.to_string(), "Confirmed");
        assert_eq!(ProductState::Sold.to_string(), "Sold");
    }

    #[test]
    fn statuses_serialize_as_variant_names() {
        assert_eq!(
            serde_json::to_string(&OrderStatus::Shipped).unwrap(),
            "\"Shipped\""
        );
        assert_eq!(
            serde_json::to_string(&Condition::LikeNew).unwrap(),
            "\"LikeNew\""
        );
        let state: ProductState = serde_json::from_str("\"Available\"").unwrap();
        assert_eq!(state, ProductState::Available);
    }
}
