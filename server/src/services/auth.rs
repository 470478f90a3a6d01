//! Account signup, login and token verification

use std::sync::Arc;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use validator::Validate;

use crate::config::AuthConfig;
use crate::error::AppError;
use crate::models::{Claims, LoginRequest, LoginResponse, SignupRequest, User};
use crate::policy::Actor;
use crate::store::{Store, StoreError};

const USER_EXISTS: &str = "User already exists";
const INVALID_CREDENTIALS: &str = "Invalid credentials";
const INVALID_TOKEN: &str = "Token is not valid";

/// Authentication service
pub struct AuthService {
    store: Arc<dyn Store>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    token_ttl: Duration,
    bcrypt_cost: u32,
}

impl AuthService {
    pub fn new(store: Arc<dyn Store>, config: &AuthConfig) -> Self {
        let mut validation = Validation::default();
        validation.leeway = 0;

        Self {
            store,
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
            token_ttl: config.token_ttl,
            bcrypt_cost: config.bcrypt_cost,
        }
    }

    /// Register a new account. The very first account becomes an admin.
    pub async fn signup(&self, request: SignupRequest) -> Result<User, AppError> {
        let request = SignupRequest {
            email: normalize_email(&request.email),
            password: request.password,
        };
        request.validate()?;

        if self.store.find_user_by_email(&request.email).await?.is_some() {
            return Err(AppError::invalid_request(USER_EXISTS));
        }

        let cost = self.bcrypt_cost;
        let password = request.password;
        let password_hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| AppError::Internal(format!("hashing task failed: {e}")))?
            .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))?;

        let user = self
            .store
            .create_user(&request.email, &password_hash)
            .await
            .map_err(|e| match e {
                StoreError::Duplicate(_) => AppError::invalid_request(USER_EXISTS),
                other => other.into(),
            })?;

        tracing::info!(user_id = %user.id, role = ?user.role, "account created");
        Ok(user)
    }

    /// Check credentials and issue a signed token
    pub async fn login(&self, request: LoginRequest) -> Result<LoginResponse, AppError> {
        let email = normalize_email(&request.email);
        let user = self
            .store
            .find_user_by_email(&email)
            .await?
            .ok_or_else(|| AppError::invalid_request(INVALID_CREDENTIALS))?;

        let hash = user.password_hash.clone();
        let password = request.password;
        let matches = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .map_err(|e| AppError::Internal(format!("verification task failed: {e}")))?
            .map_err(|e| AppError::Internal(format!("password verification failed: {e}")))?;

        if !matches {
            tracing::debug!(user_id = %user.id, "password mismatch");
            return Err(AppError::invalid_request(INVALID_CREDENTIALS));
        }

        let token = self.issue_token(&user)?;
        Ok(LoginResponse {
            token,
            user_id: user.id,
            role: user.role,
        })
    }

    pub fn issue_token(&self, user: &User) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id,
            role: user.role,
            iat: now.timestamp(),
            exp: (now + self.token_ttl).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("token signing failed: {e}")))
    }

    /// Decode a presented token into the acting identity
    pub fn verify_token(&self, token: &str) -> Result<Actor, AppError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|_| AppError::Unauthorized(INVALID_TOKEN.to_owned()))?;
        Ok(Actor {
            id: data.claims.sub,
            role: data.claims.role,
        })
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserRole;
    use crate::store::MemoryStore;
    use crate::test_support::test_auth_config;

    fn service() -> AuthService {
        AuthService::new(Arc::new(MemoryStore::new()), &test_auth_config())
    }

    fn signup(email: &str) -> SignupRequest {
        SignupRequest {
            email: email.to_owned(),
            password: "hunter22".to_owned(),
        }
    }

    #[tokio::test]
    async fn first_account_is_admin_and_later_ones_are_users() {
        let auth = service();
        let first = auth.signup(signup("first@example.com")).await.unwrap();
        let second = auth.signup(signup("second@example.com")).await.unwrap();
        let third = auth.signup(signup("third@example.com")).await.unwrap();

        assert_eq!(first.role, UserRole::Admin);
        assert_eq!(second.role, UserRole::User);
        assert_eq!(third.role, UserRole::User);
        assert_eq!(first.points, 100);
    }

    #[tokio::test]
    async fn emails_are_unique_regardless_of_case() {
        let auth = service();
        auth.signup(signup("Ada@Example.com")).await.unwrap();

        let err = auth.signup(signup("  ada@example.COM ")).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(ref m) if m == USER_EXISTS));
    }

    #[tokio::test]
    async fn malformed_email_is_rejected() {
        let err = service().signup(signup("not-an-email")).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn login_issues_a_token_naming_the_account() {
        let auth = service();
        let user = auth.signup(signup("ada@example.com")).await.unwrap();

        let response = auth
            .login(LoginRequest {
                email: "ADA@example.com".into(),
                password: "hunter22".into(),
            })
            .await
            .unwrap();

        assert_eq!(response.user_id, user.id);
        assert_eq!(response.role, UserRole::Admin);
        let actor = auth.verify_token(&response.token).unwrap();
        assert_eq!(actor.id, user.id);
        assert!(actor.is_admin());
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_look_the_same() {
        let auth = service();
        auth.signup(signup("ada@example.com")).await.unwrap();

        for (email, password) in [("ada@example.com", "wrong-pass"), ("bob@example.com", "hunter22")] {
            let err = auth
                .login(LoginRequest {
                    email: email.into(),
                    password: password.into(),
                })
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::InvalidRequest(ref m) if m == INVALID_CREDENTIALS));
        }
    }

    #[tokio::test]
    async fn expired_tokens_are_rejected() {
        let auth = service();
        let user = auth.signup(signup("ada@example.com")).await.unwrap();

        let issued = Utc::now() - Duration::hours(6);
        let claims = Claims {
            sub: user.id,
            role: user.role,
            iat: issued.timestamp(),
            exp: (issued + Duration::hours(5)).timestamp(),
        };
        let token = encode(&Header::default(), &claims, &auth.encoding_key).unwrap();

        assert!(matches!(auth.verify_token(&token), Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn tokens_signed_with_another_secret_are_rejected() {
        let auth = service();
        let user = auth.signup(signup("ada@example.com")).await.unwrap();

        let mut other_config = test_auth_config();
        other_config.jwt_secret = "someone-else".into();
        let forged = AuthService::new(Arc::new(MemoryStore::new()), &other_config)
            .issue_token(&user)
            .unwrap();

        assert!(auth.verify_token(&forged).is_err());
    }
}
