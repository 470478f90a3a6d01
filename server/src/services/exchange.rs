//! Exchange workflow: swap proposals, responses and points redemption.
//!
//! Precondition checks here produce the client-facing errors. The store
//! re-checks the same conditions inside its atomic write, so a request that
//! loses a race still fails cleanly instead of double-applying.

use std::sync::Arc;

use uuid::Uuid;

use crate::error::AppError;
use crate::models::{CreateSwapRequest, ItemStatus, Swap, SwapStatus, SwapType};
use crate::policy::{self, Action, Actor, Resource};
use crate::store::{AcceptOutcome, NewSwap, RedeemOutcome, Store, StoreError};

const SWAP_NOT_FOUND: &str = "Swap request not found.";
const DUPLICATE_REQUEST: &str = "You already have a pending swap request for this item.";
const NOT_ENOUGH_POINTS: &str = "You do not have enough points to redeem this item.";
const ITEM_UNAVAILABLE: &str = "This item is no longer available.";

pub struct ExchangeService {
    store: Arc<dyn Store>,
}

impl ExchangeService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Propose an exchange for someone else's listing
    pub async fn create_swap(
        &self,
        actor: &Actor,
        request: CreateSwapRequest,
    ) -> Result<Swap, AppError> {
        let requested = self
            .store
            .find_item(request.requested_item_id)
            .await?
            .ok_or_else(|| AppError::not_found("Requested item not found."))?;

        if !policy::can(actor, Action::RequestSwap, Resource::Listing(&requested)) {
            return Err(AppError::invalid_request("You cannot swap for your own item."));
        }

        if self.store.has_pending_swap(actor.id, requested.id).await? {
            return Err(AppError::invalid_request(DUPLICATE_REQUEST));
        }

        if requested.status != ItemStatus::Available {
            return Err(AppError::invalid_state(format!(
                "Cannot request an item that is {}.",
                requested.status
            )));
        }

        let (offered_item_id, points_value) = match request.swap_type {
            SwapType::Direct => {
                let offered_id = request.offered_item_id.ok_or_else(|| {
                    AppError::invalid_request("A direct swap must offer one of your items.")
                })?;
                let offered = self
                    .store
                    .find_item(offered_id)
                    .await?
                    .ok_or_else(|| AppError::not_found("Offered item not found."))?;
                if !policy::can(actor, Action::OfferListing, Resource::Listing(&offered)) {
                    return Err(AppError::invalid_request("You can only offer your own items."));
                }
                if offered.status != ItemStatus::Available {
                    return Err(AppError::invalid_state(format!(
                        "Cannot offer an item that is {}.",
                        offered.status
                    )));
                }
                (Some(offered.id), 0)
            }
            SwapType::Points => {
                if request.offered_item_id.is_some() {
                    return Err(AppError::invalid_request(
                        "A points swap cannot include an offered item.",
                    ));
                }
                let points = request.points_value.unwrap_or(requested.points_value);
                if points < 0 {
                    return Err(AppError::invalid_request("Points cannot be negative."));
                }
                (None, points)
            }
        };

        let swap = self
            .store
            .insert_swap(NewSwap {
                requester_id: actor.id,
                responder_id: requested.owner_id,
                requested_item_id: requested.id,
                offered_item_id,
                status: SwapStatus::Pending,
                swap_type: request.swap_type,
                points_value,
            })
            .await
            .map_err(|e| match e {
                StoreError::Duplicate(_) => AppError::invalid_request(DUPLICATE_REQUEST),
                other => other.into(),
            })?;

        tracing::info!(
            swap_id = %swap.id,
            requester_id = %swap.requester_id,
            item_id = %swap.requested_item_id,
            swap_type = ?swap.swap_type,
            "swap requested"
        );
        Ok(swap)
    }

    /// Accept a pending exchange; both listings become `swapped`
    pub async fn accept_swap(&self, actor: &Actor, swap_id: Uuid) -> Result<Swap, AppError> {
        self.load_pending_for_response(actor, swap_id, "accept").await?;

        match self.store.accept_swap(swap_id).await? {
            AcceptOutcome::Accepted(swap) => {
                tracing::info!(swap_id = %swap.id, responder_id = %actor.id, "swap accepted");
                Ok(swap)
            }
            AcceptOutcome::NotPending => Err(self.lost_race(swap_id, "accept").await),
            AcceptOutcome::ListingUnavailable => Err(AppError::invalid_state(
                "One of the items in this swap is no longer available.",
            )),
            AcceptOutcome::InsufficientPoints => Err(AppError::invalid_request(
                "The requester no longer has enough points for this swap.",
            )),
        }
    }

    /// Decline a pending exchange; listings are untouched
    pub async fn reject_swap(&self, actor: &Actor, swap_id: Uuid) -> Result<Swap, AppError> {
        self.load_pending_for_response(actor, swap_id, "reject").await?;

        match self.store.reject_swap(swap_id).await? {
            Some(swap) => {
                tracing::info!(swap_id = %swap.id, responder_id = %actor.id, "swap rejected");
                Ok(swap)
            }
            None => Err(self.lost_race(swap_id, "reject").await),
        }
    }

    /// Buy an available listing outright with points
    pub async fn redeem(&self, actor: &Actor, item_id: Uuid) -> Result<Swap, AppError> {
        let item = self
            .store
            .find_item(item_id)
            .await?
            .ok_or_else(|| AppError::not_found("Item not found."))?;

        if item.status != ItemStatus::Available {
            return Err(AppError::invalid_state(ITEM_UNAVAILABLE));
        }
        if !policy::can(actor, Action::Redeem, Resource::Listing(&item)) {
            return Err(AppError::invalid_request(
                "You cannot redeem your own item with points.",
            ));
        }

        let redeemer = self
            .store
            .find_user(actor.id)
            .await?
            .ok_or_else(|| AppError::not_found("User not found."))?;
        if redeemer.points < item.points_value {
            return Err(AppError::invalid_request(NOT_ENOUGH_POINTS));
        }

        match self.store.redeem_item(item.id, actor.id).await? {
            RedeemOutcome::Redeemed(swap) => {
                tracing::info!(
                    swap_id = %swap.id,
                    item_id = %item.id,
                    redeemer_id = %actor.id,
                    points = swap.points_value,
                    "item redeemed with points"
                );
                Ok(swap)
            }
            RedeemOutcome::ListingNotFound => Err(AppError::not_found("Item not found.")),
            RedeemOutcome::ListingUnavailable => Err(AppError::invalid_state(ITEM_UNAVAILABLE)),
            RedeemOutcome::OwnListing => Err(AppError::invalid_request(
                "You cannot redeem your own item with points.",
            )),
            RedeemOutcome::InsufficientPoints => Err(AppError::invalid_request(NOT_ENOUGH_POINTS)),
        }
    }

    async fn load_pending_for_response(
        &self,
        actor: &Actor,
        swap_id: Uuid,
        verb: &str,
    ) -> Result<Swap, AppError> {
        let swap = self
            .store
            .find_swap(swap_id)
            .await?
            .ok_or_else(|| AppError::not_found(SWAP_NOT_FOUND))?;

        if !policy::can(actor, Action::RespondToSwap, Resource::Swap(&swap)) {
            return Err(AppError::forbidden(format!(
                "Not authorized to {verb} this swap."
            )));
        }
        if swap.status != SwapStatus::Pending {
            return Err(already(verb, swap.status));
        }
        Ok(swap)
    }

    /// Build the error for a transition that found the swap no longer pending.
    async fn lost_race(&self, swap_id: Uuid, verb: &str) -> AppError {
        match self.store.find_swap(swap_id).await {
            Ok(Some(swap)) => already(verb, swap.status),
            Ok(None) => AppError::not_found(SWAP_NOT_FOUND),
            Err(e) => e.into(),
        }
    }
}

fn already(verb: &str, status: SwapStatus) -> AppError {
    AppError::invalid_state(format!("Cannot {verb} a swap that is already {status}."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Item, ItemCondition, UserRole};
    use crate::store::{MemoryStore, NewItem};

    struct World {
        exchange: ExchangeService,
        store: Arc<MemoryStore>,
        a: Actor,
        b: Actor,
        c: Actor,
    }

    async fn world() -> World {
        let store = Arc::new(MemoryStore::new());
        // The first account is the admin; keep it out of the trades.
        store.create_user("admin@example.com", "hash").await.unwrap();
        let mut actors = Vec::new();
        for email in ["a@example.com", "b@example.com", "c@example.com"] {
            let user = store.create_user(email, "hash").await.unwrap();
            actors.push(Actor {
                id: user.id,
                role: user.role,
            });
        }
        World {
            exchange: ExchangeService::new(store.clone()),
            store,
            a: actors[0],
            b: actors[1],
            c: actors[2],
        }
    }

    async fn available_item(store: &MemoryStore, owner: &Actor, points: i64) -> Item {
        let item = store
            .insert_item(NewItem {
                owner_id: owner.id,
                title: "Linen shirt".into(),
                description: "Summer weight".into(),
                category: "Tops".into(),
                size: "S".into(),
                condition: ItemCondition::UsedLikeNew,
                points_value: points,
                tags: vec![],
                images: vec![],
            })
            .await
            .unwrap();
        store
            .transition_item(item.id, ItemStatus::PendingApproval, ItemStatus::Available)
            .await
            .unwrap()
            .unwrap()
    }

    fn direct(requested: &Item, offered: &Item) -> CreateSwapRequest {
        CreateSwapRequest {
            requested_item_id: requested.id,
            offered_item_id: Some(offered.id),
            swap_type: SwapType::Direct,
            points_value: None,
        }
    }

    async fn status_of(store: &MemoryStore, id: Uuid) -> ItemStatus {
        store.find_item(id).await.unwrap().unwrap().status
    }

    async fn points_of(store: &MemoryStore, id: Uuid) -> i64 {
        store.find_user(id).await.unwrap().unwrap().points
    }

    #[tokio::test]
    async fn direct_swap_accepted_marks_both_items_swapped() {
        let w = world().await;
        let l = available_item(&w.store, &w.b, 40).await;
        let m = available_item(&w.store, &w.a, 25).await;

        let swap = w.exchange.create_swap(&w.a, direct(&l, &m)).await.unwrap();
        assert_eq!(swap.status, SwapStatus::Pending);
        assert_eq!(swap.responder_id, w.b.id);
        assert_eq!(status_of(&w.store, l.id).await, ItemStatus::Available);

        let accepted = w.exchange.accept_swap(&w.b, swap.id).await.unwrap();
        assert_eq!(accepted.status, SwapStatus::Accepted);
        assert_eq!(status_of(&w.store, l.id).await, ItemStatus::Swapped);
        assert_eq!(status_of(&w.store, m.id).await, ItemStatus::Swapped);
    }

    #[tokio::test]
    async fn requesting_own_item_creates_nothing() {
        let w = world().await;
        let own = available_item(&w.store, &w.a, 10).await;
        let other = available_item(&w.store, &w.a, 10).await;

        let err = w.exchange.create_swap(&w.a, direct(&own, &other)).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(_)));
        assert!(w.store.swaps().await.is_empty());
    }

    #[tokio::test]
    async fn missing_requested_item_is_not_found() {
        let w = world().await;
        let m = available_item(&w.store, &w.a, 10).await;
        let request = CreateSwapRequest {
            requested_item_id: Uuid::new_v4(),
            offered_item_id: Some(m.id),
            swap_type: SwapType::Direct,
            points_value: None,
        };
        let err = w.exchange.create_swap(&w.a, request).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn second_pending_request_for_same_item_is_refused() {
        let w = world().await;
        let l = available_item(&w.store, &w.b, 40).await;
        let m = available_item(&w.store, &w.a, 25).await;

        w.exchange.create_swap(&w.a, direct(&l, &m)).await.unwrap();
        let err = w.exchange.create_swap(&w.a, direct(&l, &m)).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(ref msg) if msg == DUPLICATE_REQUEST));
        assert_eq!(w.store.swaps().await.len(), 1);
    }

    #[tokio::test]
    async fn offering_someone_elses_item_is_refused() {
        let w = world().await;
        let l = available_item(&w.store, &w.b, 40).await;
        let not_mine = available_item(&w.store, &w.c, 25).await;

        let err = w.exchange.create_swap(&w.a, direct(&l, &not_mine)).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn only_the_responder_may_answer() {
        let w = world().await;
        let l = available_item(&w.store, &w.b, 40).await;
        let m = available_item(&w.store, &w.a, 25).await;
        let swap = w.exchange.create_swap(&w.a, direct(&l, &m)).await.unwrap();

        for outsider in [&w.a, &w.c] {
            assert!(matches!(
                w.exchange.accept_swap(outsider, swap.id).await,
                Err(AppError::Forbidden(_))
            ));
            assert!(matches!(
                w.exchange.reject_swap(outsider, swap.id).await,
                Err(AppError::Forbidden(_))
            ));
        }
        assert_eq!(
            w.store.find_swap(swap.id).await.unwrap().unwrap().status,
            SwapStatus::Pending
        );
    }

    #[tokio::test]
    async fn accepting_twice_or_rejecting_after_accept_is_invalid_state() {
        let w = world().await;
        let l = available_item(&w.store, &w.b, 40).await;
        let m = available_item(&w.store, &w.a, 25).await;
        let swap = w.exchange.create_swap(&w.a, direct(&l, &m)).await.unwrap();

        w.exchange.accept_swap(&w.b, swap.id).await.unwrap();

        let again = w.exchange.accept_swap(&w.b, swap.id).await.unwrap_err();
        assert!(
            matches!(again, AppError::InvalidState(ref msg) if msg == "Cannot accept a swap that is already accepted.")
        );
        let reject = w.exchange.reject_swap(&w.b, swap.id).await.unwrap_err();
        assert!(matches!(reject, AppError::InvalidState(_)));
    }

    #[tokio::test]
    async fn rejecting_leaves_listings_alone() {
        let w = world().await;
        let l = available_item(&w.store, &w.b, 40).await;
        let m = available_item(&w.store, &w.a, 25).await;
        let swap = w.exchange.create_swap(&w.a, direct(&l, &m)).await.unwrap();

        let rejected = w.exchange.reject_swap(&w.b, swap.id).await.unwrap();
        assert_eq!(rejected.status, SwapStatus::Rejected);
        assert_eq!(status_of(&w.store, l.id).await, ItemStatus::Available);
        assert_eq!(status_of(&w.store, m.id).await, ItemStatus::Available);

        // A fresh request is allowed once the old one is closed.
        assert!(w.exchange.create_swap(&w.a, direct(&l, &m)).await.is_ok());
    }

    #[tokio::test]
    async fn accept_fails_without_side_effects_when_an_item_is_gone() {
        let w = world().await;
        let l = available_item(&w.store, &w.b, 40).await;
        let m = available_item(&w.store, &w.a, 25).await;
        let swap = w.exchange.create_swap(&w.a, direct(&l, &m)).await.unwrap();

        // C buys L with points before B answers.
        w.exchange.redeem(&w.c, l.id).await.unwrap();

        let err = w.exchange.accept_swap(&w.b, swap.id).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
        assert_eq!(
            w.store.find_swap(swap.id).await.unwrap().unwrap().status,
            SwapStatus::Pending
        );
        assert_eq!(status_of(&w.store, m.id).await, ItemStatus::Available);
    }

    #[tokio::test]
    async fn redeeming_moves_points_and_records_a_completed_swap() {
        let w = world().await;
        let l = available_item(&w.store, &w.b, 40).await;

        let swap = w.exchange.redeem(&w.a, l.id).await.unwrap();

        assert_eq!(points_of(&w.store, w.a.id).await, 60);
        assert_eq!(points_of(&w.store, w.b.id).await, 140);
        assert_eq!(status_of(&w.store, l.id).await, ItemStatus::Swapped);
        assert_eq!(swap.status, SwapStatus::Completed);
        assert_eq!(swap.swap_type, SwapType::Points);
        assert_eq!(swap.points_value, 40);
        assert_eq!(swap.requester_id, w.a.id);
        assert_eq!(swap.responder_id, w.b.id);
        assert_eq!(swap.requested_item_id, l.id);
        assert_eq!(swap.offered_item_id, None);
    }

    #[tokio::test]
    async fn redeeming_with_too_few_points_changes_nothing() {
        let w = world().await;
        let l = available_item(&w.store, &w.b, 40).await;
        w.store.set_points(w.a.id, 39).await;

        let err = w.exchange.redeem(&w.a, l.id).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(ref msg) if msg == NOT_ENOUGH_POINTS));
        assert_eq!(points_of(&w.store, w.a.id).await, 39);
        assert_eq!(points_of(&w.store, w.b.id).await, 100);
        assert_eq!(status_of(&w.store, l.id).await, ItemStatus::Available);
        assert!(w.store.swaps().await.is_empty());
    }

    #[tokio::test]
    async fn redeeming_exact_balance_leaves_zero() {
        let w = world().await;
        let l = available_item(&w.store, &w.b, 100).await;

        w.exchange.redeem(&w.a, l.id).await.unwrap();
        assert_eq!(points_of(&w.store, w.a.id).await, 0);
    }

    #[tokio::test]
    async fn redeem_refuses_own_and_unavailable_items() {
        let w = world().await;
        let own = available_item(&w.store, &w.a, 10).await;
        assert!(matches!(
            w.exchange.redeem(&w.a, own.id).await,
            Err(AppError::InvalidRequest(_))
        ));

        let l = available_item(&w.store, &w.b, 10).await;
        w.exchange.redeem(&w.a, l.id).await.unwrap();
        assert!(matches!(
            w.exchange.redeem(&w.c, l.id).await,
            Err(AppError::InvalidState(_))
        ));
        assert!(matches!(
            w.exchange.redeem(&w.c, Uuid::new_v4()).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn accepted_points_proposal_transfers_its_value() {
        let w = world().await;
        let l = available_item(&w.store, &w.b, 40).await;
        let request = CreateSwapRequest {
            requested_item_id: l.id,
            offered_item_id: None,
            swap_type: SwapType::Points,
            points_value: None,
        };
        let swap = w.exchange.create_swap(&w.a, request).await.unwrap();
        assert_eq!(swap.points_value, 40);

        w.exchange.accept_swap(&w.b, swap.id).await.unwrap();
        assert_eq!(points_of(&w.store, w.a.id).await, 60);
        assert_eq!(points_of(&w.store, w.b.id).await, 140);
        assert_eq!(status_of(&w.store, l.id).await, ItemStatus::Swapped);
    }

    #[tokio::test]
    async fn points_proposal_the_requester_cannot_cover_stays_pending() {
        let w = world().await;
        let l = available_item(&w.store, &w.b, 40).await;
        let request = CreateSwapRequest {
            requested_item_id: l.id,
            offered_item_id: None,
            swap_type: SwapType::Points,
            points_value: Some(80),
        };
        let swap = w.exchange.create_swap(&w.a, request).await.unwrap();
        w.store.set_points(w.a.id, 50).await;

        let err = w.exchange.accept_swap(&w.b, swap.id).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(_)));
        assert_eq!(points_of(&w.store, w.a.id).await, 50);
        assert_eq!(status_of(&w.store, l.id).await, ItemStatus::Available);
        assert_eq!(
            w.store.find_swap(swap.id).await.unwrap().unwrap().status,
            SwapStatus::Pending
        );
    }

    #[tokio::test]
    async fn admin_role_grants_no_say_over_other_peoples_swaps() {
        let w = world().await;
        let admin = Actor {
            id: Uuid::new_v4(),
            role: UserRole::Admin,
        };
        let l = available_item(&w.store, &w.b, 40).await;
        let m = available_item(&w.store, &w.a, 25).await;
        let swap = w.exchange.create_swap(&w.a, direct(&l, &m)).await.unwrap();

        assert!(matches!(
            w.exchange.accept_swap(&admin, swap.id).await,
            Err(AppError::Forbidden(_))
        ));
    }
}
