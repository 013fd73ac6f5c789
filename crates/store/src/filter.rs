use common::UserId;

use crate::model::{Product, ProductState};

/// Sort direction for `placed_at` order listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Builder for filtering product listings.
///
/// Text filters are case-insensitive substring matches; `text` is applied
/// over both title and description.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    /// Filter by product state.
    pub state: Option<ProductState>,

    /// Filter by seller id.
    pub seller_id: Option<UserId>,

    /// Free-text filter over title and description.
    pub text: Option<String>,

    /// Filter by category.
    pub category: Option<String>,

    /// Filter by the seller's username.
    pub seller_username: Option<String>,
}

impl ProductFilter {
    /// Creates a new empty filter (matches everything).
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a filter matching only available products.
    pub fn available() -> Self {
        Self {
            state: Some(ProductState::Available),
            ..Default::default()
        }
    }

    /// Creates a filter for everything a seller has listed, any state.
    pub fn for_seller(seller_id: UserId) -> Self {
        Self {
            seller_id: Some(seller_id),
            ..Default::default()
        }
    }

    /// Filters by product state.
    pub fn state(mut self, state: ProductState) -> Self {
        self.state = Some(state);
        self
    }

    /// Filters by seller id.
    pub fn seller(mut self, seller_id: UserId) -> Self {
        self.seller_id = Some(seller_id);
        self
    }

    /// Filters by free text over title and description.
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Filters by category.
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Filters by seller username.
    pub fn seller_username(mut self, username: impl Into<String>) -> Self {
        self.seller_username = Some(username.into());
        self
    }

    /// Applies the filter to one product. `seller_username` is the username
    /// of the product's seller, resolved by the caller.
    pub fn matches(&self, product: &Product, seller_username: &str) -> bool {
        if let Some(state) = self.state
            && product.state != state
        {
            return false;
        }
        if let Some(seller_id) = self.seller_id
            && product.seller_id != seller_id
        {
            return false;
        }
        if let Some(ref text) = self.text {
            let needle = text.to_lowercase();
            if !product.title.to_lowercase().contains(&needle)
                && !product.description.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        if let Some(ref category) = self.category
            && !product
                .category
                .to_lowercase()
                .contains(&category.to_lowercase())
        {
            return false;
        }
        if let Some(ref username) = self.seller_username
            && !seller_username
                .to_lowercase()
                .contains(&username.to_lowercase())
        {
            return false;
        }
        true
    }
}
