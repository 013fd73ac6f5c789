//! Seller reviews left by buyers of completed orders.

use chrono::Utc;
use store::{
    MarketStore, OrderId, OrderStatus, Page, PageRequest, Review, ReviewId, StoreError, UserId,
};
use thiserror::Error;

use crate::error::DomainError;

/// Review rule violations.
#[derive(Debug, Error)]
pub enum ReviewError {
    /// Rating outside 1..=5.
    #[error("Rating must be between 1 and 5, got {rating}")]
    InvalidRating { rating: i32 },

    /// Reviewer is not the buyer of the order.
    #[error("Only the buyer of the order can review it")]
    NotBuyer,

    /// Order has not completed yet.
    #[error("Only completed orders can be reviewed")]
    NotCompleted,

    /// The order already has a review.
    #[error("Order has already been reviewed")]
    AlreadyReviewed,
}

/// Service for writing and reading seller reviews.
pub struct ReviewService<S: MarketStore> {
    store: S,
}

impl<S: MarketStore> ReviewService<S> {
    /// Creates a new review service over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Leaves a review on a completed order. At most one per order; the
    /// reviewee is always the seller.
    #[tracing::instrument(skip(self, comment))]
    pub async fn leave_review(
        &self,
        reviewer: UserId,
        order_id: OrderId,
        rating: i32,
        comment: Option<String>,
    ) -> Result<Review, DomainError> {
        if !(1..=5).contains(&rating) {
            return Err(ReviewError::InvalidRating { rating }.into());
        }
        let order = self
            .store
            .order(order_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Order", order_id))?;
        if order.buyer_id != reviewer {
            return Err(ReviewError::NotBuyer.into());
        }
        if order.status != OrderStatus::Completed {
            return Err(ReviewError::NotCompleted.into());
        }
        if self.store.review_exists_for_order(order_id).await? {
            return Err(ReviewError::AlreadyReviewed.into());
        }

        let review = Review {
            id: ReviewId::new(),
            order_id,
            rating,
            comment,
            reviewer_id: reviewer,
            reviewee_id: order.seller_id,
            created_at: Utc::now(),
        };
        match self.store.insert_review(review.clone()).await {
            // The unique constraint backstops the pre-check under races.
            Err(StoreError::DuplicateReview { .. }) => Err(ReviewError::AlreadyReviewed.into()),
            Err(e) => Err(e.into()),
            Ok(()) => {
                metrics::counter!("reviews_created_total").increment(1);
                tracing::info!(review_id = %review.id, order_id = %order_id, "review created");
                Ok(review)
            }
        }
    }

    /// Average rating received by a user; 0.0 before any review.
    pub async fn average_rating(&self, target: UserId) -> Result<f64, DomainError> {
        self.resolve_target(target).await?;
        Ok(self.store.average_rating(target).await?.unwrap_or(0.0))
    }

    /// Number of reviews received by a user.
    pub async fn review_count(&self, target: UserId) -> Result<u64, DomainError> {
        self.resolve_target(target).await?;
        Ok(self.store.review_count(target).await?)
    }

    /// Reviews received by a user, newest first.
    pub async fn reviews_received(
        &self,
        target: UserId,
        page: PageRequest,
    ) -> Result<Page<Review>, DomainError> {
        self.resolve_target(target).await?;
        Ok(self.store.reviews_received(target, page).await?)
    }

    /// Read queries name a target user; a missing or inactive target is
    /// not found rather than an empty result.
    async fn resolve_target(&self, user: UserId) -> Result<(), DomainError> {
        self.store
            .user(user)
            .await?
            .filter(|u| u.active)
            .map(|_| ())
            .ok_or_else(|| DomainError::not_found("User", user))
    }
}
