pub mod account;
pub mod admin;
pub mod bookings;
pub mod home;

use std::sync::Arc;

use axum::extract::rejection::{FormRejection, PathRejection};
use axum::extract::Path;
use axum::http::{header, HeaderMap, HeaderValue};
use axum::response::{AppendHeaders, Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

use crate::errors::AppError;
use crate::models::{Role, User};
use crate::services::auth::{self, SESSION_COOKIE, SESSION_TTL_SECS};
use crate::state::AppState;
use crate::views;

pub const FLASH_COOKIE: &str = "flash";

const CLEAR_FLASH: &str = "flash=; Path=/; Max-Age=0";

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(home::home))
        .route("/signup", get(account::signup_page).post(account::signup))
        .route("/login", get(account::login_page).post(account::login))
        .route("/logout", get(account::logout))
        .route("/dashboard", get(bookings::dashboard))
        .route("/chargers", get(bookings::chargers))
        .route("/book/:charger_id", post(bookings::book_charger))
        .route("/cancel-booking/:booking_id", post(bookings::cancel_booking))
        .route("/my-bookings", get(bookings::my_bookings))
        .route("/pay/:booking_id", post(bookings::pay_booking))
        .route("/admin/dashboard", get(admin::admin_dashboard))
        .route(
            "/admin/add-charger",
            get(admin::add_charger_page).post(admin::add_charger),
        )
        .with_state(state)
}

// ── Session guards ──

pub fn session_user(state: &AppState, headers: &HeaderMap) -> Option<User> {
    auth::current_user(
        &state.store,
        &state.config.secret_key,
        auth::cookie_value(headers, SESSION_COOKIE),
    )
}

#[allow(clippy::result_large_err)]
pub fn require_login(state: &AppState, headers: &HeaderMap) -> Result<User, Response> {
    session_user(state, headers).ok_or_else(|| flash_redirect("/login", "Login required"))
}

/// Users without `role` are sent to their own dashboard instead of failing.
#[allow(clippy::result_large_err)]
pub fn require_role(state: &AppState, headers: &HeaderMap, role: Role) -> Result<User, Response> {
    let user = require_login(state, headers)?;
    if user.role != role {
        tracing::warn!(user_id = user.id, required = role.as_str(), "role check failed");
        return Err(flash_redirect("/dashboard", "Admin access required"));
    }
    Ok(user)
}

// ── Extractors ──

/// An id segment that is not a valid `i64` addresses nothing.
#[allow(clippy::result_large_err)]
pub fn path_id(path: Result<Path<i64>, PathRejection>) -> Result<i64, Response> {
    path.map(|Path(id)| id).map_err(|rejection| {
        tracing::debug!(error = %rejection, "unparseable id in path");
        AppError::NotFound("Not found".to_string()).into_response()
    })
}

/// Unreadable form bodies go back to the form with a flash message.
#[allow(clippy::result_large_err)]
pub fn form_body<T>(form: Result<Form<T>, FormRejection>, back_to: &str) -> Result<T, Response> {
    form.map(|Form(body)| body).map_err(|rejection| {
        tracing::warn!(error = %rejection, "malformed form submission");
        AppError::Validation("Invalid form submission".to_string()).redirect_to(back_to)
    })
}

/// Runs blocking work, such as password hashing, off the async workers.
pub async fn run_blocking<T, E, F>(work: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: Into<AppError> + Send + 'static,
{
    match tokio::task::spawn_blocking(work).await {
        Ok(result) => result.map_err(Into::into),
        Err(e) => Err(AppError::Internal(format!("blocking task failed: {e}"))),
    }
}

// ── Responses ──

pub fn session_cookie(token: &str) -> String {
    format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={SESSION_TTL_SECS}")
}

pub fn expired_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

pub(crate) fn flash_cookie(message: &str) -> String {
    let encoded = URL_SAFE_NO_PAD.encode(message.as_bytes());
    format!("{FLASH_COOKIE}={encoded}; Path=/; HttpOnly; SameSite=Lax")
}

fn take_flash(headers: &HeaderMap) -> Option<String> {
    let raw = auth::cookie_value(headers, FLASH_COOKIE)?;
    let bytes = URL_SAFE_NO_PAD.decode(raw).ok()?;
    String::from_utf8(bytes).ok().filter(|m| !m.is_empty())
}

pub fn redirect_with_cookies(to: &str, cookies: Vec<String>) -> Response {
    let headers: Vec<_> = cookies
        .into_iter()
        .map(|cookie| (header::SET_COOKIE, cookie))
        .collect();
    (AppendHeaders(headers), Redirect::to(to)).into_response()
}

pub fn flash_redirect(to: &str, message: &str) -> Response {
    redirect_with_cookies(to, vec![flash_cookie(message)])
}

/// Renders a page in the shared layout, consuming any pending flash message.
pub fn render(headers: &HeaderMap, user: Option<&User>, title: &str, body: &str) -> Response {
    let flash = take_flash(headers);
    let page = views::layout(title, user, flash.as_deref(), body);

    let mut res = Html(page).into_response();
    if auth::cookie_value(headers, FLASH_COOKIE).is_some() {
        res.headers_mut()
            .append(header::SET_COOKIE, HeaderValue::from_static(CLEAR_FLASH));
    }
    res
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_flash_cookie_roundtrip() {
        let cookie = flash_cookie("Booking successful ⚡");
        let value = cookie.split(';').next().unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(value).unwrap());
        assert_eq!(take_flash(&headers).as_deref(), Some("Booking successful ⚡"));
    }

    #[test]
    fn test_flash_redirect_sets_cookie() {
        let res = flash_redirect("/chargers", "No slots available");
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(res.headers()[header::LOCATION], "/chargers");
        let cookie = res.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(cookie.starts_with("flash="));
    }

    #[test]
    fn test_session_cookie_expires_with_session() {
        let cookie = session_cookie("abc.def");
        assert!(cookie.starts_with("session=abc.def;"));
        assert!(cookie.contains(&format!("Max-Age={SESSION_TTL_SECS}")));
    }

    #[test]
    fn test_render_clears_flash() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("flash={}", URL_SAFE_NO_PAD.encode("Hi"))).unwrap(),
        );
        let res = render(&headers, None, "Log in", "");
        assert_eq!(res.headers()[header::SET_COOKIE], CLEAR_FLASH);
    }
}
