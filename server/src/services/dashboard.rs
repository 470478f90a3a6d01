use std::sync::Arc;

use crate::error::AppError;
use crate::models::Dashboard;
use crate::policy::Actor;
use crate::store::Store;

pub struct DashboardService {
    store: Arc<dyn Store>,
}

impl DashboardService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// The caller's account, listings and exchanges
    pub async fn dashboard(&self, actor: &Actor) -> Result<Dashboard, AppError> {
        let user = self
            .store
            .find_user(actor.id)
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))?;
        let user_items = self.store.list_items_by_owner(actor.id).await?;
        let user_swaps = self.store.list_swaps_for_user(actor.id).await?;

        Ok(Dashboard {
            user: user.into(),
            user_items,
            user_swaps,
        })
    }
}
