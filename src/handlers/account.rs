use std::sync::Arc;

use axum::extract::rejection::FormRejection;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Form;
use serde::Deserialize;

use super::{
    expired_session_cookie, flash_cookie, flash_redirect, form_body, redirect_with_cookies,
    render, run_blocking, session_cookie, session_user,
};
use crate::services::auth::{self, Signup, SESSION_COOKIE};
use crate::state::AppState;
use crate::views;

#[derive(Deserialize)]
pub struct SignupForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

// GET /signup
pub async fn signup_page(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    if session_user(&state, &headers).is_some() {
        return Redirect::to("/dashboard").into_response();
    }
    render(&headers, None, "Sign up", &views::signup_form())
}

// POST /signup
pub async fn signup(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    form: Result<Form<SignupForm>, FormRejection>,
) -> Response {
    if session_user(&state, &headers).is_some() {
        return Redirect::to("/dashboard").into_response();
    }
    let form = match form_body(form, "/signup") {
        Ok(f) => f,
        Err(res) => return res,
    };

    let result = run_blocking(move || {
        auth::signup(
            &state.store,
            Signup {
                name: &form.name,
                email: &form.email,
                password: &form.password,
            },
            state.config.admin_email.as_deref(),
        )
    })
    .await;

    match result {
        Ok(_) => flash_redirect("/login", "Account created successfully!"),
        Err(e) => {
            tracing::warn!(error = %e, "signup rejected");
            e.redirect_to("/signup")
        }
    }
}

// GET /login
pub async fn login_page(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    if session_user(&state, &headers).is_some() {
        return Redirect::to("/dashboard").into_response();
    }
    render(&headers, None, "Log in", &views::login_form())
}

// POST /login
pub async fn login(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    form: Result<Form<LoginForm>, FormRejection>,
) -> Response {
    if session_user(&state, &headers).is_some() {
        return Redirect::to("/dashboard").into_response();
    }
    let form = match form_body(form, "/login") {
        Ok(f) => f,
        Err(res) => return res,
    };

    let result = run_blocking(move || {
        auth::login(
            &state.store,
            &state.config.secret_key,
            &form.email,
            &form.password,
        )
    })
    .await;

    match result {
        Ok(session) => redirect_with_cookies(
            "/dashboard",
            vec![
                session_cookie(&session.token),
                flash_cookie("Logged in successfully!"),
            ],
        ),
        Err(e) => e.redirect_to("/login"),
    }
}

// GET /logout
pub async fn logout(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    if let Some(token) = auth::cookie_value(&headers, SESSION_COOKIE) {
        if let Err(e) = auth::logout(&state.store, &state.config.secret_key, token) {
            tracing::error!(error = %e, "failed to end session");
        }
    }

    redirect_with_cookies(
        "/login",
        vec![
            expired_session_cookie(),
            flash_cookie("Logged out successfully"),
        ],
    )
}
