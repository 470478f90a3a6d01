use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use axum_extra::extract::WithRejection;

use crate::error::AppError;
use crate::models::{LoginRequest, LoginResponse, MessageResponse, SignupRequest};
use crate::services::AuthService;

/// Register a new account
pub async fn signup(
    State(auth): State<Arc<AuthService>>,
    WithRejection(Json(request), _): WithRejection<Json<SignupRequest>, AppError>,
) -> Result<(StatusCode, Json<MessageResponse>), AppError> {
    auth.signup(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("User created successfully")),
    ))
}

/// Exchange credentials for a token
pub async fn login(
    State(auth): State<Arc<AuthService>>,
    WithRejection(Json(request), _): WithRejection<Json<LoginRequest>, AppError>,
) -> Result<Json<LoginResponse>, AppError> {
    Ok(Json(auth.login(request).await?))
}
