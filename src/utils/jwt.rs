// src/utils/jwt.rs

use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::AppError, models::user::Role, state::AppState};

/// JWT Claims structure. Injected into request extensions by
/// [`auth_middleware`]; handlers read the caller's identity from here rather
/// than from any process-wide state.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Claims {
    /// Subject - Stores the User ID (as string).
    pub sub: String,
    /// 'student' or 'admin'.
    pub role: String,
    /// Token id, used to revoke the token on logout.
    pub jti: String,
    /// Expiration time as Unix timestamp.
    pub exp: usize,
}

impl Claims {
    pub fn user_id(&self) -> Result<i64, AppError> {
        self.sub
            .parse::<i64>()
            .map_err(|_| AppError::AuthError("Invalid token subject".to_string()))
    }

    pub fn role(&self) -> Option<Role> {
        Role::parse(&self.role)
    }
}

fn unix_now() -> Result<u64, AppError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|e| AppError::InternalServerError(e.to_string()))
}

/// Signs a new JWT for the user with a fresh token id.
pub fn sign_jwt(
    id: i64,
    role: Role,
    secret: &str,
    expiration_seconds: u64,
) -> Result<String, AppError> {
    let claims = Claims {
        sub: id.to_string(),
        role: role.as_str().to_owned(),
        jti: Uuid::new_v4().to_string(),
        exp: (unix_now()? + expiration_seconds) as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(e.to_string()))
}

/// Verifies and decodes a JWT string.
pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims, AppError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::AuthError("Invalid token".to_string()))?;

    Ok(token_data.claims)
}

/// Records `claims.jti` as revoked until the token would have expired anyway.
pub async fn revoke(pool: &sqlx::SqlitePool, claims: &Claims) -> Result<(), AppError> {
    let now = unix_now()? as i64;

    sqlx::query("DELETE FROM revoked_tokens WHERE expires_at < $1")
        .bind(now)
        .execute(pool)
        .await?;

    sqlx::query("INSERT OR IGNORE INTO revoked_tokens (jti, expires_at) VALUES ($1, $2)")
        .bind(&claims.jti)
        .bind(claims.exp as i64)
        .execute(pool)
        .await?;

    Ok(())
}

async fn is_revoked(pool: &sqlx::SqlitePool, jti: &str) -> Result<bool, AppError> {
    let hit: Option<i64> = sqlx::query_scalar("SELECT 1 FROM revoked_tokens WHERE jti = $1")
        .bind(jti)
        .fetch_optional(pool)
        .await?;
    Ok(hit.is_some())
}

/// Axum Middleware: Authentication.
///
/// Validates the 'Authorization: Bearer <token>' header, rejects revoked
/// tokens, and injects `Claims` into the request extensions.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(AppError::AuthError("Please log in to continue".to_string()))?;

    let claims = verify_jwt(token, &state.config.jwt_secret)?;

    if is_revoked(&state.pool, &claims.jti).await? {
        return Err(AppError::AuthError("Token has been logged out".to_string()));
    }

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

fn require_role(req: &Request<Body>, role: Role) -> Result<(), AppError> {
    let claims = req
        .extensions()
        .get::<Claims>()
        .ok_or(AppError::AuthError("Please log in to continue".to_string()))?;

    if claims.role() != Some(role) {
        return Err(AppError::Forbidden(format!(
            "This area is restricted to {} accounts",
            role.as_str()
        )));
    }

    Ok(())
}

/// Axum Middleware: Admin Authorization. Must run after `auth_middleware`.
pub async fn admin_middleware(req: Request<Body>, next: Next) -> Result<Response, AppError> {
    require_role(&req, Role::Admin)?;
    Ok(next.run(req).await)
}

/// Axum Middleware: Student Authorization. Must run after `auth_middleware`.
pub async fn student_middleware(req: Request<Body>, next: Next) -> Result<Response, AppError> {
    require_role(&req, Role::Student)?;
    Ok(next.run(req).await)
}
