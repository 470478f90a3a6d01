//! Admin moderation of submitted listings

use std::sync::Arc;

use uuid::Uuid;

use crate::error::AppError;
use crate::models::{Item, ItemStatus, ListingView};
use crate::policy::{self, Action, Actor, Resource};
use crate::store::{SortOrder, Store};

const ADMIN_ONLY: &str = "Access denied. Admin privileges required.";
const ITEM_NOT_FOUND: &str = "Item not found";

pub struct ModerationService {
    store: Arc<dyn Store>,
}

impl ModerationService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Listings waiting for review, oldest first
    pub async fn list_pending(&self, actor: &Actor) -> Result<Vec<ListingView>, AppError> {
        ensure_moderator(actor)?;
        Ok(self
            .store
            .list_listings(ItemStatus::PendingApproval, SortOrder::OldestFirst)
            .await?)
    }

    pub async fn approve(&self, actor: &Actor, item_id: Uuid) -> Result<Item, AppError> {
        ensure_moderator(actor)?;

        let current = self.find(item_id).await?;
        if current.status != ItemStatus::PendingApproval {
            return Err(AppError::invalid_state(format!(
                "Cannot approve an item that is {}.",
                current.status
            )));
        }

        let item = self
            .store
            .transition_item(item_id, ItemStatus::PendingApproval, ItemStatus::Available)
            .await?
            .ok_or_else(|| AppError::invalid_state("Item was modified concurrently."))?;

        tracing::info!(item_id = %item.id, admin_id = %actor.id, "listing approved");
        Ok(item)
    }

    /// Withdraw a listing from the catalogue, whatever its current status.
    /// Rejecting twice is a no-op.
    pub async fn reject(&self, actor: &Actor, item_id: Uuid) -> Result<Item, AppError> {
        ensure_moderator(actor)?;

        let current = self.find(item_id).await?;
        let from = current.status;
        if from == ItemStatus::Rejected {
            return Ok(current);
        }

        let item = self
            .store
            .transition_item(item_id, from, ItemStatus::Rejected)
            .await?
            .ok_or_else(|| AppError::invalid_state("Item was modified concurrently."))?;

        tracing::info!(item_id = %item.id, admin_id = %actor.id, previous = %from, "listing rejected");
        Ok(item)
    }

    /// Remove a listing together with every exchange that references it
    pub async fn delete(&self, actor: &Actor, item_id: Uuid) -> Result<(), AppError> {
        ensure_moderator(actor)?;

        if !self.store.delete_item(item_id).await? {
            return Err(AppError::not_found(ITEM_NOT_FOUND));
        }
        tracing::info!(%item_id, admin_id = %actor.id, "listing deleted");
        Ok(())
    }

    async fn find(&self, item_id: Uuid) -> Result<Item, AppError> {
        self.store
            .find_item(item_id)
            .await?
            .ok_or_else(|| AppError::not_found(ITEM_NOT_FOUND))
    }
}

fn ensure_moderator(actor: &Actor) -> Result<(), AppError> {
    if policy::can(actor, Action::Moderate, Resource::Catalogue) {
        Ok(())
    } else {
        Err(AppError::forbidden(ADMIN_ONLY))
    }
}
