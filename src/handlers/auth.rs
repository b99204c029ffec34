// src/handlers/auth.rs

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use serde_json::json;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    config::Config,
    error::{AppError, is_unique_violation},
    models::user::{LoginRequest, LoginResponse, RegisterRequest, Role, User},
    services::audit,
    utils::{
        hash::{hash_password, verify_password},
        jwt::{Claims, revoke, sign_jwt},
    },
};

/// Registers a new student.
///
/// Hashes the password using Argon2 before storing it.
/// Returns 201 Created and the user object (excluding password).
pub async fn register(
    State(pool): State<SqlitePool>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let hashed_password = hash_password(&payload.password)?;

    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (fullname, username, password, role, class_level, gender, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id, fullname, username, password, role, class_level, gender, created_at
        "#,
    )
    .bind(payload.fullname.trim())
    .bind(&payload.username)
    .bind(hashed_password)
    .bind(Role::Student.as_str())
    .bind(&payload.class_level)
    .bind(&payload.gender)
    .bind(Utc::now())
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict(format!("Username '{}' already exists", payload.username))
        } else {
            tracing::error!("Failed to register user: {:?}", e);
            AppError::from(e)
        }
    })?;

    tracing::info!("Registered student {} ({})", user.username, user.id);

    Ok((StatusCode::CREATED, Json(user)))
}

/// Authenticates a student or admin and returns a JWT token carrying the role.
pub async fn login(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, fullname, username, password, role, class_level, gender, created_at
        FROM users
        WHERE username = $1
        "#,
    )
    .bind(&payload.username)
    .fetch_optional(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Login DB error: {:?}", e);
        AppError::from(e)
    })?;

    // Same message for unknown user and wrong password.
    let invalid = || AppError::AuthError("Invalid credentials".to_string());

    let user = user.ok_or_else(invalid)?;

    if !verify_password(&payload.password, &user.password)? {
        return Err(invalid());
    }

    let role = Role::parse(&user.role).ok_or_else(|| {
        AppError::InternalServerError(format!("User {} has unknown role {}", user.id, user.role))
    })?;

    let token = sign_jwt(user.id, role, &config.jwt_secret, config.jwt_expiration)?;

    audit::record(&pool, Some(user.id), "Logged in", Utc::now()).await?;

    Ok(Json(LoginResponse {
        token,
        token_type: "Bearer",
        role: user.role,
        fullname: user.fullname,
        expires_in: config.jwt_expiration,
    }))
}

/// Revokes the presented token. Later requests with it get 401.
pub async fn logout(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    revoke(&pool, &claims).await?;

    let user_id = claims.user_id()?;
    audit::record(&pool, Some(user_id), "Logged out", Utc::now()).await?;

    Ok(Json(json!({ "message": "Logged out" })))
}
