pub mod bookings;
pub mod fields;
pub mod health;
pub mod users;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

#[derive(Serialize)]
pub struct DataResponse<T> {
    pub message: &'static str,
    pub data: T,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

pub fn router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/register", post(users::register))
        .route("/login", post(users::login))
        .route(
            "/bookings",
            get(bookings::list_bookings).post(bookings::create_booking),
        )
        .route("/bookings/:id", get(bookings::get_booking))
        .route("/payments", post(bookings::pay_booking))
        .route(
            "/fields",
            get(fields::list_fields).post(fields::create_field),
        )
        .route(
            "/fields/:id",
            get(fields::get_field)
                .put(fields::update_field)
                .delete(fields::delete_field),
        );

    Router::new()
        .route("/health", get(health::health))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
