//! Capability checks shared by every service.
//!
//! Handlers never compare roles or owner ids themselves; they ask
//! [`can`] whether an actor may perform an action on a resource.

use uuid::Uuid;

use crate::models::{Item, ItemStatus, Swap, UserRole};

/// The authenticated caller of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub role: UserRole,
}

impl Actor {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Approve, reject, delete or list pending listings.
    Moderate,
    /// See a listing that is not publicly browsable.
    ViewListing,
    /// Ask for someone else's listing in an exchange.
    RequestSwap,
    /// Put a listing up as the offered side of an exchange.
    OfferListing,
    /// Accept or reject an exchange.
    RespondToSwap,
    /// Buy a listing with points.
    Redeem,
}

#[derive(Debug, Clone, Copy)]
pub enum Resource<'a> {
    Catalogue,
    Listing(&'a Item),
    Swap(&'a Swap),
}

pub fn can(actor: &Actor, action: Action, resource: Resource<'_>) -> bool {
    match (action, resource) {
        (Action::Moderate, _) => actor.is_admin(),
        (Action::ViewListing, Resource::Listing(item)) => {
            item.status == ItemStatus::Available || item.owner_id == actor.id || actor.is_admin()
        }
        (Action::RequestSwap | Action::Redeem, Resource::Listing(item)) => {
            item.owner_id != actor.id
        }
        (Action::OfferListing, Resource::Listing(item)) => item.owner_id == actor.id,
        (Action::RespondToSwap, Resource::Swap(swap)) => swap.responder_id == actor.id,
        _ => false,
    }
}

/// Whether an anonymous visitor may see a listing.
pub fn is_public(item: &Item) -> bool {
    item.status == ItemStatus::Available
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ItemCondition, SwapStatus, SwapType};
    use chrono::Utc;
    use rstest::rstest;

    fn actor(role: UserRole) -> Actor {
        Actor {
            id: Uuid::new_v4(),
            role,
        }
    }

    fn item_owned_by(owner_id: Uuid, status: ItemStatus) -> Item {
        Item {
            id: Uuid::new_v4(),
            title: "Denim jacket".into(),
            description: "Barely worn".into(),
            category: "Outerwear".into(),
            size: "M".into(),
            condition: ItemCondition::UsedLikeNew,
            points_value: 40,
            tags: vec![],
            images: vec![],
            owner_id,
            status,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn swap_answered_by(responder_id: Uuid) -> Swap {
        Swap {
            id: Uuid::new_v4(),
            requester_id: Uuid::new_v4(),
            responder_id,
            requested_item_id: Uuid::new_v4(),
            offered_item_id: None,
            status: SwapStatus::Pending,
            swap_type: SwapType::Direct,
            points_value: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[rstest]
    #[case(UserRole::Admin, true)]
    #[case(UserRole::User, false)]
    fn only_admins_moderate(#[case] role: UserRole, #[case] allowed: bool) {
        assert_eq!(can(&actor(role), Action::Moderate, Resource::Catalogue), allowed);
    }

    #[rstest]
    #[case(ItemStatus::Available, true)]
    #[case(ItemStatus::PendingApproval, false)]
    #[case(ItemStatus::Rejected, false)]
    #[case(ItemStatus::Swapped, false)]
    fn strangers_only_see_available_listings(#[case] status: ItemStatus, #[case] visible: bool) {
        let item = item_owned_by(Uuid::new_v4(), status);
        let stranger = actor(UserRole::User);
        assert_eq!(can(&stranger, Action::ViewListing, Resource::Listing(&item)), visible);
        assert_eq!(is_public(&item), visible);
    }

    #[test]
    fn owners_and_admins_see_unapproved_listings() {
        let owner = actor(UserRole::User);
        let item = item_owned_by(owner.id, ItemStatus::PendingApproval);
        assert!(can(&owner, Action::ViewListing, Resource::Listing(&item)));
        assert!(can(&actor(UserRole::Admin), Action::ViewListing, Resource::Listing(&item)));
    }

    #[test]
    fn owners_cannot_request_or_redeem_their_own_listing() {
        let owner = actor(UserRole::User);
        let item = item_owned_by(owner.id, ItemStatus::Available);
        assert!(!can(&owner, Action::RequestSwap, Resource::Listing(&item)));
        assert!(!can(&owner, Action::Redeem, Resource::Listing(&item)));
        assert!(can(&owner, Action::OfferListing, Resource::Listing(&item)));

        let other = actor(UserRole::User);
        assert!(can(&other, Action::RequestSwap, Resource::Listing(&item)));
        assert!(!can(&other, Action::OfferListing, Resource::Listing(&item)));
    }

    #[test]
    fn only_the_responder_answers_a_swap() {
        let responder = actor(UserRole::User);
        let swap = swap_answered_by(responder.id);
        assert!(can(&responder, Action::RespondToSwap, Resource::Swap(&swap)));
        assert!(!can(&actor(UserRole::Admin), Action::RespondToSwap, Resource::Swap(&swap)));
    }

    #[test]
    fn mismatched_resources_are_denied() {
        let admin = actor(UserRole::Admin);
        assert!(!can(&admin, Action::Redeem, Resource::Catalogue));
        assert!(!can(&admin, Action::RespondToSwap, Resource::Catalogue));
    }
}
