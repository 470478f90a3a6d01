//! Postgres adapter for [`Store`] built on sqlx

use async_trait::async_trait;
use sqlx::postgres::{PgConnection, PgPoolOptions};
use sqlx::PgPool;
use uuid::Uuid;

use super::{AcceptOutcome, NewItem, NewSwap, RedeemOutcome, SortOrder, Store, StoreError};
use crate::config::DatabaseConfig;
use crate::models::{
    AccountRef, Item, ItemRef, ItemStatus, ListingView, Swap, SwapStatus, SwapType, SwapView,
    User, UserRole,
};

const USER_COLUMNS: &str = "id, email, password_hash, points, role, created_at, updated_at";

const ITEM_COLUMNS: &str = "id, title, description, category, size, condition, points_value, \
                            tags, images, owner_id, status, created_at, updated_at";

const SWAP_COLUMNS: &str = "id, requester_id, responder_id, requested_item_id, offered_item_id, \
                            status, swap_type, points_value, created_at, updated_at";

const PENDING_SWAP_INDEX: &str = "swaps_one_pending_per_requester";

#[derive(sqlx::FromRow)]
struct ListingRow {
    #[sqlx(flatten)]
    item: Item,
    owner_email: String,
}

impl From<ListingRow> for ListingView {
    fn from(row: ListingRow) -> Self {
        let owner = AccountRef {
            id: row.item.owner_id,
            email: row.owner_email,
        };
        Self {
            item: row.item,
            owner,
        }
    }
}

#[derive(sqlx::FromRow)]
struct SwapRow {
    #[sqlx(flatten)]
    swap: Swap,
    requester_email: String,
    responder_email: String,
    requested_title: String,
    requested_images: Vec<String>,
    offered_title: Option<String>,
    offered_images: Option<Vec<String>>,
}

impl From<SwapRow> for SwapView {
    fn from(row: SwapRow) -> Self {
        let offered_item = match (row.swap.offered_item_id, row.offered_title) {
            (Some(id), Some(title)) => Some(ItemRef {
                id,
                title,
                images: row.offered_images.unwrap_or_default(),
            }),
            _ => None,
        };
        Self {
            requester: AccountRef {
                id: row.swap.requester_id,
                email: row.requester_email,
            },
            responder: AccountRef {
                id: row.swap.responder_id,
                email: row.responder_email,
            },
            requested_item: ItemRef {
                id: row.swap.requested_item_id,
                title: row.requested_title,
                images: row.requested_images,
            },
            offered_item,
            swap: row.swap,
        }
    }
}

/// Postgres-backed store
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a connection pool for the configured database
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Apply the embedded schema migrations
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    fn listing_query(filter: &str, order: &str) -> String {
        format!(
            r#"
            SELECT i.id, i.title, i.description, i.category, i.size, i.condition,
                   i.points_value, i.tags, i.images, i.owner_id, i.status,
                   i.created_at, i.updated_at, u.email AS owner_email
            FROM items i
            JOIN users u ON u.id = i.owner_id
            WHERE {filter}
            {order}
            "#
        )
    }
}

/// Move `amount` points between accounts inside the caller's transaction.
/// Returns `false` without writing anything when `from` cannot cover it.
///
/// Both account rows are locked in id order first, so two transfers running
/// in opposite directions queue instead of deadlocking.
async fn transfer_points(
    conn: &mut PgConnection,
    from: Uuid,
    to: Uuid,
    amount: i64,
) -> Result<bool, sqlx::Error> {
    sqlx::query("SELECT id FROM users WHERE id = ANY($1) ORDER BY id FOR UPDATE")
        .bind(vec![from, to])
        .fetch_all(&mut *conn)
        .await?;

    let debited = sqlx::query(
        "UPDATE users SET points = points - $1, updated_at = NOW() WHERE id = $2 AND points >= $1",
    )
    .bind(amount)
    .bind(from)
    .execute(&mut *conn)
    .await?
    .rows_affected();

    if debited == 0 {
        return Ok(false);
    }

    sqlx::query("UPDATE users SET points = points + $1, updated_at = NOW() WHERE id = $2")
        .bind(amount)
        .bind(to)
        .execute(&mut *conn)
        .await?;

    Ok(true)
}

fn map_unique_violation(err: sqlx::Error, what: &'static str) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Duplicate(what),
        _ => StoreError::Database(err),
    }
}

#[async_trait]
impl Store for PgStore {
    async fn create_user(&self, email: &str, password_hash: &str) -> Result<User, StoreError> {
        let mut tx = self.pool.begin().await?;

        // Serialise signups so only one of two racing "first" accounts sees an empty table.
        sqlx::query("LOCK TABLE users IN SHARE ROW EXCLUSIVE MODE")
            .execute(&mut *tx)
            .await?;

        let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&mut *tx)
            .await?;
        let role = if existing == 0 {
            UserRole::Admin
        } else {
            UserRole::User
        };

        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, email, password_hash, role)
            VALUES ($1, $2, $3, $4)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(password_hash)
        .bind(role)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_unique_violation(e, "email"))?;

        tx.commit().await?;
        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn insert_item(&self, item: NewItem) -> Result<Item, StoreError> {
        let item = sqlx::query_as::<_, Item>(&format!(
            r#"
            INSERT INTO items (
                id, title, description, category, size, condition,
                points_value, tags, images, owner_id, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {ITEM_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&item.title)
        .bind(&item.description)
        .bind(&item.category)
        .bind(&item.size)
        .bind(item.condition)
        .bind(item.points_value)
        .bind(&item.tags)
        .bind(&item.images)
        .bind(item.owner_id)
        .bind(ItemStatus::PendingApproval)
        .fetch_one(&self.pool)
        .await?;
        Ok(item)
    }

    async fn find_item(&self, id: Uuid) -> Result<Option<Item>, StoreError> {
        let item = sqlx::query_as::<_, Item>(&format!(
            "SELECT {ITEM_COLUMNS} FROM items WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(item)
    }

    async fn find_listing(&self, id: Uuid) -> Result<Option<ListingView>, StoreError> {
        let row = sqlx::query_as::<_, ListingRow>(&Self::listing_query("i.id = $1", ""))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(ListingView::from))
    }

    async fn list_listings(
        &self,
        status: ItemStatus,
        order: SortOrder,
    ) -> Result<Vec<ListingView>, StoreError> {
        let order = match order {
            SortOrder::OldestFirst => "ORDER BY i.created_at ASC",
            SortOrder::NewestFirst => "ORDER BY i.created_at DESC",
        };
        let rows = sqlx::query_as::<_, ListingRow>(&Self::listing_query("i.status = $1", order))
            .bind(status)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(ListingView::from).collect())
    }

    async fn list_items_by_owner(&self, owner_id: Uuid) -> Result<Vec<Item>, StoreError> {
        let items = sqlx::query_as::<_, Item>(&format!(
            "SELECT {ITEM_COLUMNS} FROM items WHERE owner_id = $1 ORDER BY created_at DESC"
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    async fn transition_item(
        &self,
        id: Uuid,
        from: ItemStatus,
        to: ItemStatus,
    ) -> Result<Option<Item>, StoreError> {
        let item = sqlx::query_as::<_, Item>(&format!(
            r#"
            UPDATE items
            SET status = $1, updated_at = NOW()
            WHERE id = $2 AND status = $3
            RETURNING {ITEM_COLUMNS}
            "#
        ))
        .bind(to)
        .bind(id)
        .bind(from)
        .fetch_optional(&self.pool)
        .await?;
        Ok(item)
    }

    async fn delete_item(&self, id: Uuid) -> Result<bool, StoreError> {
        // Exchanges referencing the listing go with it (ON DELETE CASCADE).
        let deleted = sqlx::query("DELETE FROM items WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(deleted > 0)
    }

    async fn find_swap(&self, id: Uuid) -> Result<Option<Swap>, StoreError> {
        let swap = sqlx::query_as::<_, Swap>(&format!(
            "SELECT {SWAP_COLUMNS} FROM swaps WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(swap)
    }

    async fn has_pending_swap(
        &self,
        requester_id: Uuid,
        requested_item_id: Uuid,
    ) -> Result<bool, StoreError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM swaps
            WHERE requester_id = $1 AND requested_item_id = $2 AND status = 'pending'
            "#,
        )
        .bind(requester_id)
        .bind(requested_item_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    async fn insert_swap(&self, swap: NewSwap) -> Result<Swap, StoreError> {
        let swap = sqlx::query_as::<_, Swap>(&format!(
            r#"
            INSERT INTO swaps (
                id, requester_id, responder_id, requested_item_id,
                offered_item_id, status, swap_type, points_value
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {SWAP_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(swap.requester_id)
        .bind(swap.responder_id)
        .bind(swap.requested_item_id)
        .bind(swap.offered_item_id)
        .bind(swap.status)
        .bind(swap.swap_type)
        .bind(swap.points_value)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, PENDING_SWAP_INDEX))?;
        Ok(swap)
    }

    async fn list_swaps_for_user(&self, user_id: Uuid) -> Result<Vec<SwapView>, StoreError> {
        let rows = sqlx::query_as::<_, SwapRow>(
            r#"
            SELECT s.id, s.requester_id, s.responder_id, s.requested_item_id,
                   s.offered_item_id, s.status, s.swap_type, s.points_value,
                   s.created_at, s.updated_at,
                   rq.email AS requester_email,
                   rs.email AS responder_email,
                   ri.title AS requested_title,
                   ri.images AS requested_images,
                   oi.title AS offered_title,
                   oi.images AS offered_images
            FROM swaps s
            JOIN users rq ON rq.id = s.requester_id
            JOIN users rs ON rs.id = s.responder_id
            JOIN items ri ON ri.id = s.requested_item_id
            LEFT JOIN items oi ON oi.id = s.offered_item_id
            WHERE s.requester_id = $1 OR s.responder_id = $1
            ORDER BY s.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(SwapView::from).collect())
    }

    async fn reject_swap(&self, id: Uuid) -> Result<Option<Swap>, StoreError> {
        let swap = sqlx::query_as::<_, Swap>(&format!(
            r#"
            UPDATE swaps
            SET status = $1, updated_at = NOW()
            WHERE id = $2 AND status = $3
            RETURNING {SWAP_COLUMNS}
            "#
        ))
        .bind(SwapStatus::Rejected)
        .bind(id)
        .bind(SwapStatus::Pending)
        .fetch_optional(&self.pool)
        .await?;
        Ok(swap)
    }

    async fn accept_swap(&self, id: Uuid) -> Result<AcceptOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;

        let swap = sqlx::query_as::<_, Swap>(&format!(
            r#"
            UPDATE swaps
            SET status = $1, updated_at = NOW()
            WHERE id = $2 AND status = $3
            RETURNING {SWAP_COLUMNS}
            "#
        ))
        .bind(SwapStatus::Accepted)
        .bind(id)
        .bind(SwapStatus::Pending)
        .fetch_optional(&mut *tx)
        .await?;

        // Early returns drop `tx`, which rolls the transaction back.
        let Some(swap) = swap else {
            return Ok(AcceptOutcome::NotPending);
        };

        let listing_ids: Vec<Uuid> = std::iter::once(swap.requested_item_id)
            .chain(swap.offered_item_id)
            .collect();

        // Same ordering rule as `transfer_points`, for the listing rows.
        sqlx::query("SELECT id FROM items WHERE id = ANY($1) ORDER BY id FOR UPDATE")
            .bind(&listing_ids)
            .fetch_all(&mut *tx)
            .await?;

        let swapped = sqlx::query(
            r#"
            UPDATE items
            SET status = $1, updated_at = NOW()
            WHERE id = ANY($2) AND status = $3
            "#,
        )
        .bind(ItemStatus::Swapped)
        .bind(&listing_ids)
        .bind(ItemStatus::Available)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if swapped != listing_ids.len() as u64 {
            return Ok(AcceptOutcome::ListingUnavailable);
        }

        if swap.swap_type == SwapType::Points
            && swap.points_value > 0
            && !transfer_points(&mut *tx, swap.requester_id, swap.responder_id, swap.points_value)
                .await?
        {
            return Ok(AcceptOutcome::InsufficientPoints);
        }

        tx.commit().await?;
        Ok(AcceptOutcome::Accepted(swap))
    }

    async fn redeem_item(
        &self,
        item_id: Uuid,
        redeemer_id: Uuid,
    ) -> Result<RedeemOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;

        let item = sqlx::query_as::<_, Item>(&format!(
            "SELECT {ITEM_COLUMNS} FROM items WHERE id = $1 FOR UPDATE"
        ))
        .bind(item_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(item) = item else {
            return Ok(RedeemOutcome::ListingNotFound);
        };
        if item.status != ItemStatus::Available {
            return Ok(RedeemOutcome::ListingUnavailable);
        }
        if item.owner_id == redeemer_id {
            return Ok(RedeemOutcome::OwnListing);
        }

        if !transfer_points(&mut *tx, redeemer_id, item.owner_id, item.points_value).await? {
            return Ok(RedeemOutcome::InsufficientPoints);
        }

        sqlx::query("UPDATE items SET status = $1, updated_at = NOW() WHERE id = $2")
            .bind(ItemStatus::Swapped)
            .bind(item.id)
            .execute(&mut *tx)
            .await?;

        let swap = sqlx::query_as::<_, Swap>(&format!(
            r#"
            INSERT INTO swaps (
                id, requester_id, responder_id, requested_item_id,
                offered_item_id, status, swap_type, points_value
            )
            VALUES ($1, $2, $3, $4, NULL, $5, $6, $7)
            RETURNING {SWAP_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(redeemer_id)
        .bind(item.owner_id)
        .bind(item.id)
        .bind(SwapStatus::Completed)
        .bind(SwapType::Points)
        .bind(item.points_value)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(RedeemOutcome::Redeemed(swap))
    }
}
