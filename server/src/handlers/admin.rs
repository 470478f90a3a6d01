//! Moderation endpoints. Role checks happen in the service.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use axum_extra::extract::WithRejection;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::AuthenticatedUser;
use crate::models::{Item, ListingView, MessageResponse};
use crate::services::ModerationService;

pub async fn list_pending_items(
    State(moderation): State<Arc<ModerationService>>,
    AuthenticatedUser(actor): AuthenticatedUser,
) -> Result<Json<Vec<ListingView>>, AppError> {
    Ok(Json(moderation.list_pending(&actor).await?))
}

pub async fn approve_item(
    State(moderation): State<Arc<ModerationService>>,
    AuthenticatedUser(actor): AuthenticatedUser,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<Json<Item>, AppError> {
    Ok(Json(moderation.approve(&actor, id).await?))
}

pub async fn reject_item(
    State(moderation): State<Arc<ModerationService>>,
    AuthenticatedUser(actor): AuthenticatedUser,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<Json<Item>, AppError> {
    Ok(Json(moderation.reject(&actor, id).await?))
}

pub async fn delete_item(
    State(moderation): State<Arc<ModerationService>>,
    AuthenticatedUser(actor): AuthenticatedUser,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<Json<MessageResponse>, AppError> {
    moderation.delete(&actor, id).await?;
    Ok(Json(MessageResponse::new("Item removed successfully")))
}
