use std::sync::Arc;

use axum::extract::rejection::FormRejection;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::Response;
use axum::Form;
use serde::Deserialize;

use super::{flash_redirect, form_body, render, require_role};
use crate::db::Store;
use crate::errors::AppError;
use crate::models::Role;
use crate::services::booking;
use crate::state::AppState;
use crate::views;

// GET /admin/dashboard
pub async fn admin_dashboard(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let user = match require_role(&state, &headers, Role::Admin) {
        Ok(u) => u,
        Err(res) => return res,
    };

    match state.store.dashboard_stats() {
        Ok(stats) => render(
            &headers,
            Some(&user),
            "Admin dashboard",
            &views::admin_dashboard(&stats),
        ),
        Err(e) => AppError::from(e).redirect_to("/dashboard"),
    }
}

// GET /admin/add-charger
pub async fn add_charger_page(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let user = match require_role(&state, &headers, Role::Admin) {
        Ok(u) => u,
        Err(res) => return res,
    };
    render(&headers, Some(&user), "Add charger", &views::add_charger_form())
}

// POST /admin/add-charger
#[derive(Deserialize)]
pub struct AddChargerForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub total_slots: String,
}

pub async fn add_charger(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    form: Result<Form<AddChargerForm>, FormRejection>,
) -> Response {
    let user = match require_role(&state, &headers, Role::Admin) {
        Ok(u) => u,
        Err(res) => return res,
    };
    let form = match form_body(form, "/admin/add-charger") {
        Ok(f) => f,
        Err(res) => return res,
    };

    let result = booking::parse_total_slots(&form.total_slots)
        .and_then(|slots| booking::add_charger(&state.store, &form.name, &form.location, slots));

    match result {
        Ok(_) => flash_redirect("/chargers", "Charger added"),
        Err(e) => {
            tracing::warn!(user_id = user.id, error = %e, "charger rejected");
            AppError::from(e).redirect_to("/admin/add-charger")
        }
    }
}
