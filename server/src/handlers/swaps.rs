use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use axum_extra::extract::WithRejection;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::AuthenticatedUser;
use crate::models::{CreateSwapRequest, RedeemRequest, RedeemResponse, Swap};
use crate::services::ExchangeService;

/// Propose an exchange
pub async fn create_swap(
    State(exchange): State<Arc<ExchangeService>>,
    AuthenticatedUser(actor): AuthenticatedUser,
    WithRejection(Json(request), _): WithRejection<Json<CreateSwapRequest>, AppError>,
) -> Result<(StatusCode, Json<Swap>), AppError> {
    let swap = exchange.create_swap(&actor, request).await?;
    Ok((StatusCode::CREATED, Json(swap)))
}

pub async fn accept_swap(
    State(exchange): State<Arc<ExchangeService>>,
    AuthenticatedUser(actor): AuthenticatedUser,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<Json<Swap>, AppError> {
    Ok(Json(exchange.accept_swap(&actor, id).await?))
}

pub async fn reject_swap(
    State(exchange): State<Arc<ExchangeService>>,
    AuthenticatedUser(actor): AuthenticatedUser,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<Json<Swap>, AppError> {
    Ok(Json(exchange.reject_swap(&actor, id).await?))
}

/// Buy a listing outright with points
pub async fn redeem_item(
    State(exchange): State<Arc<ExchangeService>>,
    AuthenticatedUser(actor): AuthenticatedUser,
    WithRejection(Json(request), _): WithRejection<Json<RedeemRequest>, AppError>,
) -> Result<Json<RedeemResponse>, AppError> {
    let swap = exchange.redeem(&actor, request.item_id).await?;
    Ok(Json(RedeemResponse {
        message: "Item redeemed successfully!".to_owned(),
        swap,
    }))
}
