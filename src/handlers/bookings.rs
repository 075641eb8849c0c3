use std::sync::Arc;

use axum::extract::rejection::PathRejection;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::Response;

use super::{flash_redirect, path_id, render, require_login};
use crate::db::Store;
use crate::errors::AppError;
use crate::services::booking;
use crate::state::AppState;
use crate::views;

// GET /dashboard
pub async fn dashboard(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let user = match require_login(&state, &headers) {
        Ok(u) => u,
        Err(res) => return res,
    };
    render(&headers, Some(&user), "Dashboard", &views::dashboard(&user))
}

// GET /chargers
pub async fn chargers(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let user = match require_login(&state, &headers) {
        Ok(u) => u,
        Err(res) => return res,
    };

    match state.store.list_chargers() {
        Ok(list) => render(&headers, Some(&user), "Chargers", &views::chargers(&list)),
        Err(e) => AppError::from(e).redirect_to("/dashboard"),
    }
}

// POST /book/:charger_id
pub async fn book_charger(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    charger_id: Result<Path<i64>, PathRejection>,
) -> Response {
    let user = match require_login(&state, &headers) {
        Ok(u) => u,
        Err(res) => return res,
    };
    let charger_id = match path_id(charger_id) {
        Ok(id) => id,
        Err(res) => return res,
    };

    match booking::create_booking(&state.store, user.id, charger_id) {
        Ok(_) => flash_redirect("/chargers", "Booking successful ⚡"),
        Err(e) => {
            tracing::warn!(user_id = user.id, charger_id, error = %e, "booking rejected");
            AppError::from(e).redirect_to("/chargers")
        }
    }
}

// POST /cancel-booking/:booking_id
pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    booking_id: Result<Path<i64>, PathRejection>,
) -> Response {
    let user = match require_login(&state, &headers) {
        Ok(u) => u,
        Err(res) => return res,
    };
    let booking_id = match path_id(booking_id) {
        Ok(id) => id,
        Err(res) => return res,
    };

    match booking::cancel_booking(&state.store, booking_id, user.id) {
        Ok(_) => flash_redirect("/my-bookings", "Booking cancelled, slot released"),
        Err(e) => {
            tracing::warn!(user_id = user.id, booking_id, error = %e, "cancellation rejected");
            AppError::from(e).redirect_to("/my-bookings")
        }
    }
}

// GET /my-bookings
pub async fn my_bookings(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let user = match require_login(&state, &headers) {
        Ok(u) => u,
        Err(res) => return res,
    };

    match state.store.bookings_with_charger(user.id) {
        Ok(list) => render(
            &headers,
            Some(&user),
            "My bookings",
            &views::my_bookings(&list),
        ),
        Err(e) => AppError::from(e).redirect_to("/dashboard"),
    }
}

// POST /pay/:booking_id
pub async fn pay_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    booking_id: Result<Path<i64>, PathRejection>,
) -> Response {
    let user = match require_login(&state, &headers) {
        Ok(u) => u,
        Err(res) => return res,
    };
    let booking_id = match path_id(booking_id) {
        Ok(id) => id,
        Err(res) => return res,
    };

    match booking::pay_booking(&state.store, booking_id, user.id, state.config.flat_rate) {
        Ok(_) => flash_redirect("/my-bookings", "Payment successful 💳"),
        Err(e) => {
            tracing::warn!(user_id = user.id, booking_id, error = %e, "payment rejected");
            AppError::from(e).redirect_to("/my-bookings")
        }
    }
}
