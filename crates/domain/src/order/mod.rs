//! Order engine: placement, status transitions, and order queries.

mod service;
mod transition;

pub use service::OrderService;
pub use transition::{CallerRelation, TransitionEffect, plan_transition};

use store::OrderStatus;
use thiserror::Error;

/// Rule violations raised by the order engine.
#[derive(Debug, Error)]
pub enum OrderError {
    /// Product is not available for purchase.
    #[error("Product is not available for purchase")]
    ProductUnavailable,

    /// Buyer and seller are the same account.
    #[error("You cannot buy your own product")]
    OwnProduct,

    /// Shipping address belongs to someone else.
    #[error("Address does not belong to the buyer")]
    AddressNotOwned,

    /// Caller is neither the buyer nor the seller of the order.
    #[error("You are not a participant in this order")]
    NotParticipant,

    /// Requested transition is not in the table.
    #[error("An order cannot move from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// Seller-only action attempted by the buyer.
    #[error("Only the seller can {action} an order")]
    SellerOnly { action: &'static str },

    /// Buyer-only action attempted by the seller.
    #[error("Only the buyer can {action} an order")]
    BuyerOnly { action: &'static str },
}
