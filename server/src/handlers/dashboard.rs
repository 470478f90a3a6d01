use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use crate::error::AppError;
use crate::middleware::AuthenticatedUser;
use crate::models::Dashboard;
use crate::services::DashboardService;

pub async fn get_dashboard(
    State(dashboard): State<Arc<DashboardService>>,
    AuthenticatedUser(actor): AuthenticatedUser,
) -> Result<Json<Dashboard>, AppError> {
    Ok(Json(dashboard.dashboard(&actor).await?))
}
