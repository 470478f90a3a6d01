//! Persistence port for accounts, listings and exchanges.
//!
//! Services talk to storage only through [`Store`]. Multi-record operations
//! (accepting an exchange, redeeming with points) are single calls so each
//! adapter can run them as one atomic unit.

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{
    Item, ItemCondition, ItemStatus, ListingView, Swap, SwapStatus, SwapType, SwapView, User,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Persistence errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("Duplicate {0}")]
    Duplicate(&'static str),
}

/// Sort direction on creation time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    OldestFirst,
    NewestFirst,
}

/// Fields supplied when inserting a listing
#[derive(Debug, Clone)]
pub struct NewItem {
    pub owner_id: Uuid,
    pub title: String,
    pub description: String,
    pub category: String,
    pub size: String,
    pub condition: ItemCondition,
    pub points_value: i64,
    pub tags: Vec<String>,
    pub images: Vec<String>,
}

/// Fields supplied when inserting an exchange
#[derive(Debug, Clone)]
pub struct NewSwap {
    pub requester_id: Uuid,
    pub responder_id: Uuid,
    pub requested_item_id: Uuid,
    pub offered_item_id: Option<Uuid>,
    pub status: SwapStatus,
    pub swap_type: SwapType,
    pub points_value: i64,
}

/// Result of an atomic accept attempt
#[derive(Debug)]
pub enum AcceptOutcome {
    Accepted(Swap),
    /// Exchange missing or no longer `pending`.
    NotPending,
    /// One of the listings involved is no longer `available`.
    ListingUnavailable,
    /// Requester cannot cover a points proposal.
    InsufficientPoints,
}

/// Result of an atomic points redemption
#[derive(Debug)]
pub enum RedeemOutcome {
    Redeemed(Swap),
    ListingNotFound,
    ListingUnavailable,
    OwnListing,
    InsufficientPoints,
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Insert an account. The first account ever stored becomes an admin.
    async fn create_user(&self, email: &str, password_hash: &str) -> Result<User, StoreError>;
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn insert_item(&self, item: NewItem) -> Result<Item, StoreError>;
    async fn find_item(&self, id: Uuid) -> Result<Option<Item>, StoreError>;
    async fn find_listing(&self, id: Uuid) -> Result<Option<ListingView>, StoreError>;
    async fn list_listings(
        &self,
        status: ItemStatus,
        order: SortOrder,
    ) -> Result<Vec<ListingView>, StoreError>;
    /// Listings owned by `owner_id`, newest first.
    async fn list_items_by_owner(&self, owner_id: Uuid) -> Result<Vec<Item>, StoreError>;
    /// Move a listing from `from` to `to`. Returns `None` when the listing is
    /// missing or its status is no longer `from`.
    async fn transition_item(
        &self,
        id: Uuid,
        from: ItemStatus,
        to: ItemStatus,
    ) -> Result<Option<Item>, StoreError>;
    /// Remove a listing and every exchange referencing it.
    async fn delete_item(&self, id: Uuid) -> Result<bool, StoreError>;

    async fn find_swap(&self, id: Uuid) -> Result<Option<Swap>, StoreError>;
    async fn has_pending_swap(
        &self,
        requester_id: Uuid,
        requested_item_id: Uuid,
    ) -> Result<bool, StoreError>;
    /// Fails with [`StoreError::Duplicate`] when a pending exchange already
    /// exists for the same requester and listing.
    async fn insert_swap(&self, swap: NewSwap) -> Result<Swap, StoreError>;
    /// Exchanges where the user is requester or responder, newest first.
    async fn list_swaps_for_user(&self, user_id: Uuid) -> Result<Vec<SwapView>, StoreError>;
    /// `pending` -> `rejected`; `None` when missing or not pending.
    async fn reject_swap(&self, id: Uuid) -> Result<Option<Swap>, StoreError>;
    /// `pending` -> `accepted`, marking every involved listing `swapped`
    /// (and moving points for a points proposal) in one unit.
    async fn accept_swap(&self, id: Uuid) -> Result<AcceptOutcome, StoreError>;
    /// Debit redeemer, credit owner, mark the listing `swapped` and record a
    /// completed points exchange in one unit.
    async fn redeem_item(&self, item_id: Uuid, redeemer_id: Uuid)
        -> Result<RedeemOutcome, StoreError>;
}
