//! Token authentication extractors.
//!
//! A token may be presented either as `Authorization: Bearer <jwt>` or in
//! the `x-auth-token` header.

use std::sync::Arc;

use axum::async_trait;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use axum::RequestPartsExt;
use axum_extra::TypedHeader;
use headers::authorization::Bearer;
use headers::Authorization;

use crate::error::AppError;
use crate::policy::Actor;
use crate::services::AuthService;

pub const TOKEN_HEADER: &str = "x-auth-token";

/// Caller identified by a valid token; rejects the request otherwise
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser(pub Actor);

/// Caller identity when a valid token was presented
#[derive(Debug, Clone, Copy)]
pub struct OptionalUser(pub Option<Actor>);

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    Arc<AuthService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = presented_token(parts)
            .await
            .ok_or_else(|| AppError::Unauthorized("No token, authorization denied".to_owned()))?;

        let auth = Arc::<AuthService>::from_ref(state);
        auth.verify_token(&token).map(AuthenticatedUser)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for OptionalUser
where
    Arc<AuthService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Some(token) = presented_token(parts).await else {
            return Ok(OptionalUser(None));
        };

        let auth = Arc::<AuthService>::from_ref(state);
        match auth.verify_token(&token) {
            Ok(actor) => Ok(OptionalUser(Some(actor))),
            Err(_) => {
                // Public routes treat a bad token like no token.
                tracing::debug!("ignoring invalid token on public route");
                Ok(OptionalUser(None))
            }
        }
    }
}

async fn presented_token(parts: &mut Parts) -> Option<String> {
    let bearer = parts
        .extract::<Option<TypedHeader<Authorization<Bearer>>>>()
        .await
        .ok()
        .flatten()
        .map(|TypedHeader(authorization)| authorization.token().to_owned());

    bearer
        .or_else(|| {
            parts
                .headers
                .get(TOKEN_HEADER)
                .and_then(|value| value.to_str().ok())
                .map(|value| value.trim().to_owned())
        })
        .filter(|token| !token.is_empty())
}
