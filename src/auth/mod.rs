//! Access-token authentication.
//!
//! Tokens are HS256 JWTs issued by the identity service and presented as `Authorization: Bearer`.
//! The extractors resolve the token to a [`User`] projection, creating it on first sight.

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::cache::USER_TTL;
use crate::db::Repository;
use crate::errors::AppError;
use crate::models::{Role, User};
use crate::AppState;

/// Access-token payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub name: String,
    pub email: String,
    #[serde(default = "default_role")]
    pub role: String,
    /// Expiry, seconds since the epoch
    pub exp: usize,
}

fn default_role() -> String {
    Role::User.as_str().to_string()
}

/// Verify signature and expiry.
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, AppError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )?;
    Ok(data.claims)
}

/// Sign claims with the shared secret, as the identity service does.
#[cfg(test)]
pub fn issue_token(claims: &Claims, secret: &str) -> String {
    jsonwebtoken::encode(
        &jsonwebtoken::Header::new(Algorithm::HS256),
        claims,
        &jsonwebtoken::EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// The authenticated requester.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let token = bearer_token(parts).ok_or_else(|| {
            AppError::Unauthorized("Please login to access this resource".to_string())
        })?;

        let claims = verify_token(token, &state.config.access_token_secret)?;

        let repo = state.repo.clone();
        let fetched = state
            .cache
            .fetch(&claims.sub, USER_TTL, || async {
                let user = match repo.get_user(&claims.sub).await? {
                    Some(user) => user,
                    None => {
                        repo.ensure_user(
                            &claims.sub,
                            &claims.name,
                            &claims.email,
                            Role::parse(&claims.role),
                        )
                        .await?
                    }
                };
                Ok::<_, AppError>(Some(user))
            })
            .await?
            .ok_or_else(|| AppError::Internal("User projection unavailable".to_string()))?;

        let mut user = fetched.value;
        // The identity service owns roles.
        user.role = Role::parse(&claims.role);

        Ok(CurrentUser(user))
    }
}

/// An authenticated requester holding the admin role.
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err(AppError::Forbidden(format!(
                "Role: {} is not allowed to access this resource",
                user.role.as_str()
            )));
        }
        Ok(AdminUser(user))
    }
}

/// Only purchasers may read a course's content or review it. Ownership is read from the store so
/// a stale cached projection cannot grant or deny access.
pub async fn ensure_course_access(
    repo: &Repository,
    user: &User,
    course_id: &str,
) -> Result<(), AppError> {
    if repo.user_owns_course(&user.id, course_id).await? {
        return Ok(());
    }
    Err(not_eligible())
}

/// Review replies are open to purchasers and admins.
pub async fn ensure_can_reply(
    repo: &Repository,
    user: &User,
    course_id: &str,
) -> Result<(), AppError> {
    if user.is_admin() {
        return Ok(());
    }
    ensure_course_access(repo, user, course_id).await
}

fn not_eligible() -> AppError {
    AppError::NotFound("You are not eligible to access this course".to_string())
}
