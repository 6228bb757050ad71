use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Duration;
use serde::Serialize;

use super::DataResponse;
use crate::auth;
use crate::db::{queries, StoreError};
use crate::errors::AppError;
use crate::models::{LoginRequest, NewUserRecord, Principal, RegisterRequest, Role, User};
use crate::state::AppState;

const TOKEN_TTL_HOURS: i64 = 24;
const MIN_PASSWORD_LEN: usize = 8;

fn validate(input: &RegisterRequest) -> Result<(), AppError> {
    if input.name.trim().is_empty() {
        return Err(AppError::BadRequest("name must not be empty".to_string()));
    }
    if !input.email.contains('@') {
        return Err(AppError::BadRequest("email is not valid".to_string()));
    }
    if input.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

// POST /api/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<DataResponse<User>>), AppError> {
    validate(&body)?;

    let email = normalize_email(&body.email);
    let role = if state.config.is_admin_email(&email) {
        Role::Admin
    } else {
        Role::User
    };
    let record = NewUserRecord {
        name: body.name.trim().to_string(),
        email,
        password_hash: auth::hash_password(&body.password)?,
        role,
    };

    let user = {
        let db = state.conn()?;
        queries::create_user(&db, &record).map_err(|e| match e {
            StoreError::Duplicate => AppError::Conflict("email already registered".to_string()),
            other => AppError::Store(other),
        })?
    };
    tracing::info!(user_id = user.id, role = user.role.as_str(), "user registered");

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            message: "User created successfully",
            data: user,
        }),
    ))
}

#[derive(Serialize)]
pub struct TokenResponse {
    pub token: String,
}

// POST /api/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let invalid = || AppError::Unauthorized("invalid email or password".to_string());

    let credentials = {
        let db = state.conn()?;
        queries::find_user_by_email(&db, &normalize_email(&body.email))?
    };
    let credentials = credentials.ok_or_else(invalid)?;
    if !auth::verify_password(&body.password, &credentials.password_hash) {
        return Err(invalid());
    }

    let principal = Principal {
        user_id: credentials.user.id,
        role: credentials.user.role,
    };
    let token = auth::issue_token(
        &state.config.jwt_secret,
        &principal,
        Duration::hours(TOKEN_TTL_HOURS),
    )?;

    tracing::info!(user_id = principal.user_id, "user logged in");
    Ok(Json(TokenResponse { token }))
}
