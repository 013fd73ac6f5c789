//! Order status transition rules.

use store::OrderStatus;

use super::OrderError;

/// How the caller relates to an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallerRelation {
    Buyer,
    Seller,
}

/// What a permitted transition does beyond the status write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionEffect {
    /// Only the order row changes.
    StatusOnly,
    /// The product returns to `Available` in the same commit.
    ReleaseProduct,
}

/// Decides whether `caller` may move an order from `current` to
/// `requested`, and what the move entails.
///
/// ```text
/// Confirmed ──(seller)──► Shipped ──(buyer)──► Completed
///     │
///     └──(either)──► Cancelled        (also reachable from Pending)
/// ```
///
/// Requesting the status the order already holds is rejected like any
/// other off-table transition; a no-op success would hide a stale view
/// in the caller.
pub fn plan_transition(
    current: OrderStatus,
    requested: OrderStatus,
    caller: CallerRelation,
) -> Result<TransitionEffect, OrderError> {
    use CallerRelation::{Buyer, Seller};
    use OrderStatus::{Cancelled, Completed, Confirmed, Pending, Shipped};

    match (current, requested, caller) {
        (Confirmed, Shipped, Seller) => Ok(TransitionEffect::StatusOnly),
        (Confirmed, Shipped, Buyer) => Err(OrderError::SellerOnly { action: "ship" }),
        (Shipped, Completed, Buyer) => Ok(TransitionEffect::StatusOnly),
        (Shipped, Completed, Seller) => Err(OrderError::BuyerOnly { action: "complete" }),
        (Confirmed | Pending, Cancelled, _) => Ok(TransitionEffect::ReleaseProduct),
        (from, to, _) => Err(OrderError::InvalidTransition { from, to }),
    }
}
