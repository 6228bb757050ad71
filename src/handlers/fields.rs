use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use super::{DataResponse, MessageResponse};
use crate::auth::RequireAdmin;
use crate::db::{queries, StoreError};
use crate::errors::AppError;
use crate::models::{Field, FieldInput, Principal};
use crate::state::AppState;

fn validate(input: &FieldInput) -> Result<(), AppError> {
    if input.name.trim().is_empty() {
        return Err(AppError::BadRequest("name must not be empty".to_string()));
    }
    if input.price_per_hour < 0 {
        return Err(AppError::BadRequest(
            "price_per_hour must not be negative".to_string(),
        ));
    }
    Ok(())
}

// POST /api/fields
pub async fn create_field(
    State(state): State<Arc<AppState>>,
    RequireAdmin(admin): RequireAdmin,
    Json(body): Json<FieldInput>,
) -> Result<(StatusCode, Json<DataResponse<Field>>), AppError> {
    validate(&body)?;

    let field = {
        let db = state.conn()?;
        queries::create_field(&db, &body)?
    };
    tracing::info!(field_id = field.id, admin_id = admin.user_id, "field created");

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            message: "Field created successfully",
            data: field,
        }),
    ))
}

// GET /api/fields
pub async fn list_fields(
    State(state): State<Arc<AppState>>,
    _principal: Principal,
) -> Result<Json<DataResponse<Vec<Field>>>, AppError> {
    let fields = {
        let db = state.conn()?;
        queries::list_fields(&db)?
    };

    Ok(Json(DataResponse {
        message: "Success retrieving fields",
        data: fields,
    }))
}

// GET /api/fields/:id
pub async fn get_field(
    State(state): State<Arc<AppState>>,
    _principal: Principal,
    Path(id): Path<i64>,
) -> Result<Json<DataResponse<Field>>, AppError> {
    let field = {
        let db = state.conn()?;
        queries::get_field(&db, id)?
    };

    let field = field.ok_or_else(|| AppError::NotFound(format!("field {id}")))?;
    Ok(Json(DataResponse {
        message: "Success retrieving field",
        data: field,
    }))
}

// PUT /api/fields/:id
pub async fn update_field(
    State(state): State<Arc<AppState>>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<i64>,
    Json(body): Json<FieldInput>,
) -> Result<Json<DataResponse<Field>>, AppError> {
    validate(&body)?;

    let field = {
        let db = state.conn()?;
        queries::update_field(&db, id, &body)?
    };

    let field = field.ok_or_else(|| AppError::NotFound(format!("field {id}")))?;
    tracing::info!(field_id = id, admin_id = admin.user_id, "field updated");
    Ok(Json(DataResponse {
        message: "Field updated successfully",
        data: field,
    }))
}

// DELETE /api/fields/:id
pub async fn delete_field(
    State(state): State<Arc<AppState>>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, AppError> {
    let deleted = {
        let db = state.conn()?;
        queries::delete_field(&db, id).map_err(|e| match e {
            StoreError::ForeignKey => {
                AppError::Conflict(format!("field {id} still has bookings"))
            }
            other => AppError::Store(other),
        })?
    };

    if !deleted {
        return Err(AppError::NotFound(format!("field {id}")));
    }
    tracing::info!(field_id = id, admin_id = admin.user_id, "field deleted");
    Ok(Json(MessageResponse {
        message: "Field deleted successfully",
    }))
}
