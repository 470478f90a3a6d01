//! Data models for the ReWear backend

use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

pub mod auth;
pub use auth::*;

/// Points granted to every new account.
pub const STARTING_POINTS: i64 = 100;

/// Account model
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub points: i64,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Account as exposed to clients (no credential hash)
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub points: i64,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            points: user.points,
            role: user.role,
            created_at: user.created_at,
        }
    }
}

/// User roles
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    User,
    Admin,
}

/// Physical condition of a listed garment
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "item_condition")]
pub enum ItemCondition {
    #[serde(rename = "New with tags")]
    #[sqlx(rename = "New with tags")]
    NewWithTags,
    #[serde(rename = "Used - Like New")]
    #[sqlx(rename = "Used - Like New")]
    UsedLikeNew,
    #[serde(rename = "Used - Good")]
    #[sqlx(rename = "Used - Good")]
    UsedGood,
    #[serde(rename = "Used - Fair")]
    #[sqlx(rename = "Used - Fair")]
    UsedFair,
}

/// Listing lifecycle status
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "item_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    PendingApproval,
    Available,
    Swapped,
    Rejected,
}

impl ItemStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ItemStatus::PendingApproval => "pending_approval",
            ItemStatus::Available => "available",
            ItemStatus::Swapped => "swapped",
            ItemStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Listing model
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: String,
    pub size: String,
    pub condition: ItemCondition,
    pub points_value: i64,
    pub tags: Vec<String>,
    pub images: Vec<String>,
    pub owner_id: Uuid,
    pub status: ItemStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Exchange status
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "swap_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SwapStatus {
    Pending,
    Accepted,
    Rejected,
    Completed,
    Cancelled,
}

impl SwapStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SwapStatus::Pending => "pending",
            SwapStatus::Accepted => "accepted",
            SwapStatus::Rejected => "rejected",
            SwapStatus::Completed => "completed",
            SwapStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for SwapStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exchange kind: item-for-item or item-for-points
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "swap_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SwapType {
    Direct,
    Points,
}

/// Exchange model
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Swap {
    pub id: Uuid,
    pub requester_id: Uuid,
    pub responder_id: Uuid,
    pub requested_item_id: Uuid,
    pub offered_item_id: Option<Uuid>,
    pub status: SwapStatus,
    pub swap_type: SwapType,
    pub points_value: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Minimal account reference embedded in other payloads
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct AccountRef {
    pub id: Uuid,
    pub email: String,
}

/// Minimal listing reference embedded in exchange payloads
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ItemRef {
    pub id: Uuid,
    pub title: String,
    pub images: Vec<String>,
}

/// Listing together with its owner's email
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ListingView {
    #[serde(flatten)]
    pub item: Item,
    pub owner: AccountRef,
}

/// Exchange with both parties and listings resolved
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SwapView {
    #[serde(flatten)]
    pub swap: Swap,
    pub requester: AccountRef,
    pub responder: AccountRef,
    pub requested_item: ItemRef,
    pub offered_item: Option<ItemRef>,
}

/// Create listing request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateItemRequest {
    #[validate(length(min = 1, message = "Title is required."))]
    pub title: String,
    #[validate(length(min = 1, message = "Description is required."))]
    pub description: String,
    #[validate(length(min = 1, message = "Category is required."))]
    pub category: String,
    #[validate(length(min = 1, message = "Size is required."))]
    pub size: String,
    pub condition: ItemCondition,
    #[validate(range(min = 0, message = "Points cannot be negative."))]
    pub points_value: i64,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
}

impl CreateItemRequest {
    /// Trim text fields and drop blank tags before validation.
    pub fn normalized(self) -> Self {
        Self {
            title: self.title.trim().to_owned(),
            description: self.description.trim().to_owned(),
            category: self.category.trim().to_owned(),
            size: self.size.trim().to_owned(),
            tags: self
                .tags
                .into_iter()
                .map(|tag| tag.trim().to_owned())
                .filter(|tag| !tag.is_empty())
                .collect(),
            ..self
        }
    }
}

/// Create exchange proposal request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSwapRequest {
    pub requested_item_id: Uuid,
    pub offered_item_id: Option<Uuid>,
    pub swap_type: SwapType,
    pub points_value: Option<i64>,
}

/// Points redemption request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedeemRequest {
    pub item_id: Uuid,
}

/// Points redemption response
#[derive(Debug, Serialize, Deserialize)]
pub struct RedeemResponse {
    pub message: String,
    pub swap: Swap,
}

/// Everything the signed-in user sees on their dashboard
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub user: UserResponse,
    pub user_items: Vec<Item>,
    pub user_swaps: Vec<SwapView>,
}

/// Uploaded image references
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub image_urls: Vec<String>,
}

/// Plain message body, used for errors and simple acknowledgements
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
