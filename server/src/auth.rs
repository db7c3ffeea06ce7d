//! Bearer-token auth gate.
//!
//! Tokens are HS256 JWTs carrying the user's storage id and phone, valid
//! for 30 days by default. Passwords are bcrypt-hashed; the phone number
//! is the unique identity key.

use std::sync::Arc;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::User,
    state::AppState,
    store::{DocumentStore, USERS},
};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User storage id.
    pub sub: String,
    pub phone: String,
    pub iat: i64,
    pub exp: i64,
}

pub fn issue_token(
    user_id: &str,
    phone: &str,
    secret: &str,
    ttl_days: i64,
) -> Result<String, AppError> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id.to_string(),
        phone: phone.to_string(),
        iat: now.timestamp(),
        exp: (now + Duration::days(ttl_days)).timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(Box::new(e)))
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::unauthorized("Invalid token"))
}

pub fn hash_password(password: &str) -> Result<String, AppError> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST).map_err(|e| AppError::Internal(Box::new(e)))
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    bcrypt::verify(password, hash).map_err(|e| AppError::Internal(Box::new(e)))
}

pub struct UserRepo {
    store: Arc<dyn DocumentStore>,
}

impl UserRepo {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn get(&self, id: &str) -> Result<Option<User>, AppError> {
        match self.store.get(USERS, id).await? {
            Some(body) => Ok(Some(serde_json::from_slice(&body)?)),
            None => Ok(None),
        }
    }

    /// Phone is the unique identity key; the scan is fine at storefront
    /// scale.
    pub async fn find_by_phone(&self, phone: &str) -> Result<Option<User>, AppError> {
        for body in self.store.scan(USERS).await? {
            let user: User = serde_json::from_slice(&body)?;
            if user.phone == phone {
                return Ok(Some(user));
            }
        }
        Ok(None)
    }

    pub async fn create(
        &self,
        name: &str,
        phone: &str,
        email: &str,
        password: &str,
        address: &str,
    ) -> Result<User, AppError> {
        let user = User {
            id: Uuid::new_v4().simple().to_string(),
            name: name.trim().to_string(),
            phone: phone.trim().to_string(),
            email: email.trim().to_string(),
            password_hash: hash_password(password)?,
            address: address.to_string(),
            created_at: Utc::now(),
        };

        self.store
            .put(USERS, &user.id, serde_json::to_vec(&user)?)
            .await?;
        Ok(user)
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Authenticated principal for user-scoped endpoints.
pub struct AuthUser {
    pub user_id: String,
    pub phone: String,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token =
            bearer_token(parts).ok_or_else(|| AppError::unauthorized("Authentication required"))?;
        let claims = verify_token(token, &state.config.jwt_secret)?;

        Ok(AuthUser {
            user_id: claims.sub,
            phone: claims.phone,
        })
    }
}

/// Guard for admin-console endpoints: the `x-admin-key` header must match
/// the configured key.
pub struct AdminKey;

#[async_trait]
impl FromRequestParts<AppState> for AdminKey {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let supplied = parts
            .headers
            .get("x-admin-key")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();

        if supplied.is_empty() || supplied != state.config.admin_key {
            return Err(AppError::unauthorized("Admin key required"));
        }

        Ok(AdminKey)
    }
}
