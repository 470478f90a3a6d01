//! In-memory [`Store`] backing the unit and router tests.
//!
//! All tables sit behind a single mutex, so every trait call observes and
//! mutates a consistent snapshot.

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{AcceptOutcome, NewItem, NewSwap, RedeemOutcome, SortOrder, Store, StoreError};
use crate::models::{
    AccountRef, Item, ItemRef, ItemStatus, ListingView, Swap, SwapStatus, SwapType, SwapView,
    User, UserRole, STARTING_POINTS,
};

#[derive(Default)]
struct Tables {
    // Insertion order doubles as creation order.
    users: Vec<User>,
    items: Vec<Item>,
    swaps: Vec<Swap>,
}

impl Tables {
    fn user(&self, id: Uuid) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    fn user_mut(&mut self, id: Uuid) -> Option<&mut User> {
        self.users.iter_mut().find(|u| u.id == id)
    }

    fn item(&self, id: Uuid) -> Option<&Item> {
        self.items.iter().find(|i| i.id == id)
    }

    fn item_mut(&mut self, id: Uuid) -> Option<&mut Item> {
        self.items.iter_mut().find(|i| i.id == id)
    }

    fn swap_mut(&mut self, id: Uuid) -> Option<&mut Swap> {
        self.swaps.iter_mut().find(|s| s.id == id)
    }

    fn account_ref(&self, id: Uuid) -> AccountRef {
        AccountRef {
            id,
            email: self.user(id).map(|u| u.email.clone()).unwrap_or_default(),
        }
    }

    fn item_ref(&self, id: Uuid) -> Option<ItemRef> {
        self.item(id).map(|item| ItemRef {
            id,
            title: item.title.clone(),
            images: item.images.clone(),
        })
    }

    fn listing_view(&self, item: &Item) -> ListingView {
        ListingView {
            item: item.clone(),
            owner: self.account_ref(item.owner_id),
        }
    }

    fn swap_view(&self, swap: &Swap) -> Option<SwapView> {
        Some(SwapView {
            swap: swap.clone(),
            requester: self.account_ref(swap.requester_id),
            responder: self.account_ref(swap.responder_id),
            requested_item: self.item_ref(swap.requested_item_id)?,
            offered_item: swap.offered_item_id.and_then(|id| self.item_ref(id)),
        })
    }

    fn has_pending(&self, requester_id: Uuid, requested_item_id: Uuid) -> bool {
        self.swaps.iter().any(|s| {
            s.requester_id == requester_id
                && s.requested_item_id == requested_item_id
                && s.status == SwapStatus::Pending
        })
    }

    fn can_afford(&self, user_id: Uuid, amount: i64) -> bool {
        self.user(user_id).is_some_and(|u| u.points >= amount)
    }

    /// Caller must have checked [`Tables::can_afford`] first.
    fn transfer_points(&mut self, from: Uuid, to: Uuid, amount: i64) {
        let now = Utc::now();
        if let Some(payer) = self.user_mut(from) {
            payer.points -= amount;
            payer.updated_at = now;
        }
        if let Some(payee) = self.user_mut(to) {
            payee.points += amount;
            payee.updated_at = now;
        }
    }

    fn push_swap(&mut self, swap: NewSwap) -> Swap {
        let now = Utc::now();
        let swap = Swap {
            id: Uuid::new_v4(),
            requester_id: swap.requester_id,
            responder_id: swap.responder_id,
            requested_item_id: swap.requested_item_id,
            offered_item_id: swap.offered_item_id,
            status: swap.status,
            swap_type: swap.swap_type,
            points_value: swap.points_value,
            created_at: now,
            updated_at: now,
        };
        self.swaps.push(swap.clone());
        swap
    }
}

/// Store keeping every table in process memory
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite an account's balance.
    pub async fn set_points(&self, user_id: Uuid, points: i64) {
        let mut tables = self.tables.lock().await;
        if let Some(user) = tables.user_mut(user_id) {
            user.points = points;
        }
    }

    /// Every stored exchange, oldest first.
    pub async fn swaps(&self) -> Vec<Swap> {
        self.tables.lock().await.swaps.clone()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, email: &str, password_hash: &str) -> Result<User, StoreError> {
        let mut tables = self.tables.lock().await;
        if tables
            .users
            .iter()
            .any(|u| u.email.eq_ignore_ascii_case(email))
        {
            return Err(StoreError::Duplicate("email"));
        }

        let role = if tables.users.is_empty() {
            UserRole::Admin
        } else {
            UserRole::User
        };
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_owned(),
            password_hash: password_hash.to_owned(),
            points: STARTING_POINTS,
            role,
            created_at: now,
            updated_at: now,
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.tables.lock().await.user(id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn insert_item(&self, item: NewItem) -> Result<Item, StoreError> {
        let now = Utc::now();
        let item = Item {
            id: Uuid::new_v4(),
            title: item.title,
            description: item.description,
            category: item.category,
            size: item.size,
            condition: item.condition,
            points_value: item.points_value,
            tags: item.tags,
            images: item.images,
            owner_id: item.owner_id,
            status: ItemStatus::PendingApproval,
            created_at: now,
            updated_at: now,
        };
        self.tables.lock().await.items.push(item.clone());
        Ok(item)
    }

    async fn find_item(&self, id: Uuid) -> Result<Option<Item>, StoreError> {
        Ok(self.tables.lock().await.item(id).cloned())
    }

    async fn find_listing(&self, id: Uuid) -> Result<Option<ListingView>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.item(id).map(|item| tables.listing_view(item)))
    }

    async fn list_listings(
        &self,
        status: ItemStatus,
        order: SortOrder,
    ) -> Result<Vec<ListingView>, StoreError> {
        let tables = self.tables.lock().await;
        let mut listings: Vec<ListingView> = tables
            .items
            .iter()
            .filter(|item| item.status == status)
            .map(|item| tables.listing_view(item))
            .collect();
        if order == SortOrder::NewestFirst {
            listings.reverse();
        }
        Ok(listings)
    }

    async fn list_items_by_owner(&self, owner_id: Uuid) -> Result<Vec<Item>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .items
            .iter()
            .rev()
            .filter(|item| item.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn transition_item(
        &self,
        id: Uuid,
        from: ItemStatus,
        to: ItemStatus,
    ) -> Result<Option<Item>, StoreError> {
        let mut tables = self.tables.lock().await;
        let Some(item) = tables.item_mut(id).filter(|item| item.status == from) else {
            return Ok(None);
        };
        item.status = to;
        item.updated_at = Utc::now();
        Ok(Some(item.clone()))
    }

    async fn delete_item(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut tables = self.tables.lock().await;
        let before = tables.items.len();
        tables.items.retain(|item| item.id != id);
        if tables.items.len() == before {
            return Ok(false);
        }
        tables
            .swaps
            .retain(|s| s.requested_item_id != id && s.offered_item_id != Some(id));
        Ok(true)
    }

    async fn find_swap(&self, id: Uuid) -> Result<Option<Swap>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.swaps.iter().find(|s| s.id == id).cloned())
    }

    async fn has_pending_swap(
        &self,
        requester_id: Uuid,
        requested_item_id: Uuid,
    ) -> Result<bool, StoreError> {
        Ok(self
            .tables
            .lock()
            .await
            .has_pending(requester_id, requested_item_id))
    }

    async fn insert_swap(&self, swap: NewSwap) -> Result<Swap, StoreError> {
        let mut tables = self.tables.lock().await;
        if swap.status == SwapStatus::Pending
            && tables.has_pending(swap.requester_id, swap.requested_item_id)
        {
            return Err(StoreError::Duplicate("pending swap"));
        }
        Ok(tables.push_swap(swap))
    }

    async fn list_swaps_for_user(&self, user_id: Uuid) -> Result<Vec<SwapView>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .swaps
            .iter()
            .rev()
            .filter(|s| s.requester_id == user_id || s.responder_id == user_id)
            .filter_map(|s| tables.swap_view(s))
            .collect())
    }

    async fn reject_swap(&self, id: Uuid) -> Result<Option<Swap>, StoreError> {
        let mut tables = self.tables.lock().await;
        let Some(swap) = tables
            .swap_mut(id)
            .filter(|s| s.status == SwapStatus::Pending)
        else {
            return Ok(None);
        };
        swap.status = SwapStatus::Rejected;
        swap.updated_at = Utc::now();
        Ok(Some(swap.clone()))
    }

    async fn accept_swap(&self, id: Uuid) -> Result<AcceptOutcome, StoreError> {
        let mut tables = self.tables.lock().await;
        let Some(swap) = tables
            .swaps
            .iter()
            .find(|s| s.id == id && s.status == SwapStatus::Pending)
            .cloned()
        else {
            return Ok(AcceptOutcome::NotPending);
        };

        let listing_ids: Vec<Uuid> = std::iter::once(swap.requested_item_id)
            .chain(swap.offered_item_id)
            .collect();
        let all_available = listing_ids.iter().all(|id| {
            tables
                .item(*id)
                .is_some_and(|item| item.status == ItemStatus::Available)
        });
        if !all_available {
            return Ok(AcceptOutcome::ListingUnavailable);
        }

        let charges_points = swap.swap_type == SwapType::Points && swap.points_value > 0;
        if charges_points && !tables.can_afford(swap.requester_id, swap.points_value) {
            return Ok(AcceptOutcome::InsufficientPoints);
        }

        // Every check passed; apply all writes together.
        let now = Utc::now();
        for listing_id in listing_ids {
            if let Some(item) = tables.item_mut(listing_id) {
                item.status = ItemStatus::Swapped;
                item.updated_at = now;
            }
        }
        if charges_points {
            tables.transfer_points(swap.requester_id, swap.responder_id, swap.points_value);
        }
        let Some(stored) = tables.swap_mut(id) else {
            return Ok(AcceptOutcome::NotPending);
        };
        stored.status = SwapStatus::Accepted;
        stored.updated_at = now;
        Ok(AcceptOutcome::Accepted(stored.clone()))
    }

    async fn redeem_item(
        &self,
        item_id: Uuid,
        redeemer_id: Uuid,
    ) -> Result<RedeemOutcome, StoreError> {
        let mut tables = self.tables.lock().await;
        let Some(item) = tables.item(item_id).cloned() else {
            return Ok(RedeemOutcome::ListingNotFound);
        };
        if item.status != ItemStatus::Available {
            return Ok(RedeemOutcome::ListingUnavailable);
        }
        if item.owner_id == redeemer_id {
            return Ok(RedeemOutcome::OwnListing);
        }
        if !tables.can_afford(redeemer_id, item.points_value) {
            return Ok(RedeemOutcome::InsufficientPoints);
        }

        tables.transfer_points(redeemer_id, item.owner_id, item.points_value);
        if let Some(stored) = tables.item_mut(item_id) {
            stored.status = ItemStatus::Swapped;
            stored.updated_at = Utc::now();
        }
        let swap = tables.push_swap(NewSwap {
            requester_id: redeemer_id,
            responder_id: item.owner_id,
            requested_item_id: item.id,
            offered_item_id: None,
            status: SwapStatus::Completed,
            swap_type: SwapType::Points,
            points_value: item.points_value,
        });
        Ok(RedeemOutcome::Redeemed(swap))
    }
}
