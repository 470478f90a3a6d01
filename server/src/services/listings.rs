//! Listing creation and public browsing

use std::sync::Arc;

use validator::Validate;

use crate::error::AppError;
use crate::models::{CreateItemRequest, Item, ItemStatus, ListingView};
use crate::policy::{self, Action, Actor, Resource};
use crate::store::{NewItem, SortOrder, Store};

const ITEM_NOT_FOUND: &str = "Item not found";

pub struct ListingService {
    store: Arc<dyn Store>,
}

impl ListingService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Create a listing owned by `actor`; it waits for moderation before
    /// anyone else can browse it.
    pub async fn create_listing(
        &self,
        actor: &Actor,
        request: CreateItemRequest,
    ) -> Result<Item, AppError> {
        let request = request.normalized();
        request.validate()?;

        let item = self
            .store
            .insert_item(NewItem {
                owner_id: actor.id,
                title: request.title,
                description: request.description,
                category: request.category,
                size: request.size,
                condition: request.condition,
                points_value: request.points_value,
                tags: request.tags,
                images: request.images,
            })
            .await?;

        tracing::info!(item_id = %item.id, owner_id = %actor.id, "listing submitted for approval");
        Ok(item)
    }

    /// Publicly browsable listings, newest first
    pub async fn browse(&self) -> Result<Vec<ListingView>, AppError> {
        Ok(self
            .store
            .list_listings(ItemStatus::Available, SortOrder::NewestFirst)
            .await?)
    }

    /// Fetch one listing. Listings that are not yet (or no longer) public are
    /// only shown to their owner and to admins.
    pub async fn get_listing(
        &self,
        id: uuid::Uuid,
        viewer: Option<&Actor>,
    ) -> Result<ListingView, AppError> {
        let listing = self
            .store
            .find_listing(id)
            .await?
            .ok_or_else(|| AppError::not_found(ITEM_NOT_FOUND))?;

        let visible = match viewer {
            Some(actor) => policy::can(actor, Action::ViewListing, Resource::Listing(&listing.item)),
            None => policy::is_public(&listing.item),
        };
        if !visible {
            return Err(AppError::not_found(ITEM_NOT_FOUND));
        }
        Ok(listing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ItemCondition, UserRole};
    use crate::store::MemoryStore;
    use uuid::Uuid;

    fn request(title: &str) -> CreateItemRequest {
        CreateItemRequest {
            title: title.to_owned(),
            description: "Soft wool, no pilling".into(),
            category: "Knitwear".into(),
            size: "L".into(),
            condition: ItemCondition::UsedGood,
            points_value: 30,
            tags: vec![" winter ".into(), "".into(), "wool".into()],
            images: vec!["/uploads/1-a.jpg".into()],
        }
    }

    async fn setup() -> (ListingService, Arc<MemoryStore>, Actor) {
        let store = Arc::new(MemoryStore::new());
        let owner = store.create_user("owner@example.com", "hash").await.unwrap();
        let actor = Actor {
            id: owner.id,
            role: owner.role,
        };
        (ListingService::new(store.clone()), store, actor)
    }

    #[tokio::test]
    async fn new_listings_wait_for_approval() {
        let (listings, _, owner) = setup().await;
        let item = listings
            .create_listing(&owner, request("  Wool sweater "))
            .await
            .unwrap();

        assert_eq!(item.status, ItemStatus::PendingApproval);
        assert_eq!(item.owner_id, owner.id);
        assert_eq!(item.title, "Wool sweater");
        assert_eq!(item.tags, vec!["winter".to_owned(), "wool".to_owned()]);
        assert!(listings.browse().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn blank_title_and_negative_points_are_rejected() {
        let (listings, _, owner) = setup().await;

        let err = listings.create_listing(&owner, request("   ")).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(_)));

        let mut negative = request("Scarf");
        negative.points_value = -1;
        let err = listings.create_listing(&owner, negative).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(ref m) if m == "Points cannot be negative."));
    }

    #[tokio::test]
    async fn browse_only_returns_available_listings_newest_first() {
        let (listings, store, owner) = setup().await;
        let older = listings.create_listing(&owner, request("Older")).await.unwrap();
        let newer = listings.create_listing(&owner, request("Newer")).await.unwrap();
        listings.create_listing(&owner, request("Still pending")).await.unwrap();

        for id in [older.id, newer.id] {
            store
                .transition_item(id, ItemStatus::PendingApproval, ItemStatus::Available)
                .await
                .unwrap();
        }

        let browsed = listings.browse().await.unwrap();
        let titles: Vec<_> = browsed.iter().map(|l| l.item.title.as_str()).collect();
        assert_eq!(titles, ["Newer", "Older"]);
        assert!(browsed.iter().all(|l| l.item.status == ItemStatus::Available));
        assert_eq!(browsed[0].owner.email, "owner@example.com");
    }

    #[tokio::test]
    async fn unapproved_listing_is_hidden_from_strangers() {
        let (listings, _, owner) = setup().await;
        let item = listings.create_listing(&owner, request("Boots")).await.unwrap();
        let stranger = Actor {
            id: Uuid::new_v4(),
            role: UserRole::User,
        };

        assert!(matches!(
            listings.get_listing(item.id, None).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            listings.get_listing(item.id, Some(&stranger)).await,
            Err(AppError::NotFound(_))
        ));
        assert!(listings.get_listing(item.id, Some(&owner)).await.is_ok());
    }
}
