use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use super::DataResponse;
use crate::errors::AppError;
use crate::models::{Booking, BookingDetails, NewBooking, Principal};
use crate::state::AppState;

// POST /api/bookings
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Json(body): Json<NewBooking>,
) -> Result<(StatusCode, Json<DataResponse<Booking>>), AppError> {
    let booking = state.bookings.create_booking(&principal, &body)?;

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            message: "Booking created successfully",
            data: booking,
        }),
    ))
}

// GET /api/bookings
pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    principal: Principal,
) -> Result<Json<DataResponse<Vec<BookingDetails>>>, AppError> {
    let bookings = state.bookings.get_all_bookings(&principal)?;

    Ok(Json(DataResponse {
        message: "Success retrieving bookings",
        data: bookings,
    }))
}

// GET /api/bookings/:id
pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<i64>,
) -> Result<Json<DataResponse<BookingDetails>>, AppError> {
    let booking = state.bookings.get_booking_by_id(&principal, id)?;

    Ok(Json(DataResponse {
        message: "Success retrieving booking detail",
        data: booking,
    }))
}

// POST /api/payments
#[derive(Deserialize)]
pub struct PaymentRequest {
    pub booking_id: i64,
}

pub async fn pay_booking(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Json(body): Json<PaymentRequest>,
) -> Result<Json<DataResponse<Booking>>, AppError> {
    let booking = state.bookings.pay_booking(&principal, body.booking_id)?;

    Ok(Json(DataResponse {
        message: "Payment successful, booking status updated to paid",
        data: booking,
    }))
}
