use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use axum_extra::extract::WithRejection;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::{AuthenticatedUser, OptionalUser};
use crate::models::{CreateItemRequest, Item, ListingView};
use crate::services::ListingService;

/// Browse available listings
pub async fn list_items(
    State(listings): State<Arc<ListingService>>,
) -> Result<Json<Vec<ListingView>>, AppError> {
    Ok(Json(listings.browse().await?))
}

pub async fn get_item(
    State(listings): State<Arc<ListingService>>,
    OptionalUser(viewer): OptionalUser,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<Json<ListingView>, AppError> {
    Ok(Json(listings.get_listing(id, viewer.as_ref()).await?))
}

/// Submit a listing for moderation
pub async fn create_item(
    State(listings): State<Arc<ListingService>>,
    AuthenticatedUser(actor): AuthenticatedUser,
    WithRejection(Json(request), _): WithRejection<Json<CreateItemRequest>, AppError>,
) -> Result<(StatusCode, Json<Item>), AppError> {
    let item = listings.create_listing(&actor, request).await?;
    Ok((StatusCode::CREATED, Json(item)))
}
