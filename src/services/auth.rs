use axum::http::{header, HeaderMap};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{Duration, NaiveDateTime, Utc};
use hmac::{Hmac, Mac};
use sha1::Sha1;
use uuid::Uuid;

use crate::db::{Store, StoreError};
use crate::models::{NewUser, Role, User};
use crate::services::credentials::{self, CredentialError};

pub const SESSION_COOKIE: &str = "session";

/// Lifetime of a session, server-side and in the cookie's `Max-Age`.
pub const SESSION_TTL_SECS: i64 = 7 * 24 * 60 * 60;

type HmacSha1 = Hmac<Sha1>;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Email already registered")]
    EmailTaken,

    #[error("{0}")]
    Validation(String),

    #[error("credential error: {0}")]
    Credential(#[from] CredentialError),

    #[error("session signing failed")]
    Signing,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A freshly established session.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub user: User,
}

pub struct Signup<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

/// Creates a `user` account, or an `admin` one when the email matches
/// `admin_email`.
pub fn signup<S: Store>(
    store: &S,
    form: Signup<'_>,
    admin_email: Option<&str>,
) -> Result<User, AuthError> {
    let name = form.name.trim();
    let email = form.email.trim();

    if name.is_empty() || email.is_empty() || form.password.is_empty() {
        return Err(AuthError::Validation(
            "Name, email and password are required".to_string(),
        ));
    }

    if store.user_by_email(email)?.is_some() {
        return Err(AuthError::EmailTaken);
    }

    let password_hash = credentials::hash_password(form.password)?;
    let mut user = store
        .create_user(&NewUser {
            name: name.to_string(),
            email: email.to_string(),
            password_hash,
        })
        .map_err(|e| match e {
            StoreError::DuplicateEmail => AuthError::EmailTaken,
            other => AuthError::Store(other),
        })?;

    if admin_email.is_some_and(|admin| admin.trim().eq_ignore_ascii_case(email))
        && store.set_user_role(email, Role::Admin)?
    {
        user.role = Role::Admin;
        tracing::info!(user_id = user.id, "admin account created");
    }

    tracing::info!(user_id = user.id, role = user.role.as_str(), "user signed up");
    Ok(user)
}

pub fn login<S: Store>(
    store: &S,
    secret: &str,
    email: &str,
    password: &str,
) -> Result<Session, AuthError> {
    let user = store
        .user_by_email(email.trim())?
        .ok_or(AuthError::InvalidCredentials)?;

    if !credentials::verify_password(password, &user.password_hash) {
        tracing::warn!(user_id = user.id, "login rejected: bad password");
        return Err(AuthError::InvalidCredentials);
    }

    let now = Utc::now().naive_utc();
    let pruned = store.prune_sessions(now)?;
    if pruned > 0 {
        tracing::debug!(pruned, "expired sessions removed");
    }

    let session_id = Uuid::new_v4().simple().to_string();
    let token = sign_token(secret, &session_id)?;
    store.create_session(&session_id, user.id, now + Duration::seconds(SESSION_TTL_SECS))?;

    tracing::info!(user_id = user.id, "user logged in");
    Ok(Session { token, user })
}

/// Drops the session behind `token`. Unknown or forged tokens are ignored.
pub fn logout<S: Store>(store: &S, secret: &str, token: &str) -> Result<(), StoreError> {
    if let Some(session_id) = verify_token(secret, token) {
        if store.delete_session(session_id)? {
            tracing::info!("session ended");
        }
    }
    Ok(())
}

/// Resolves the signed-in user. Any failure along the way reads as signed out.
pub fn current_user<S: Store>(store: &S, secret: &str, token: Option<&str>) -> Option<User> {
    current_user_at(store, secret, token, Utc::now().naive_utc())
}

fn current_user_at<S: Store>(
    store: &S,
    secret: &str,
    token: Option<&str>,
    now: NaiveDateTime,
) -> Option<User> {
    let session_id = verify_token(secret, token?)?;

    let user_id = match store.session_user(session_id, now) {
        Ok(id) => id?,
        Err(e) => {
            tracing::error!(error = %e, "failed to load session");
            return None;
        }
    };

    match store.user_by_id(user_id) {
        Ok(user) => user,
        Err(e) => {
            tracing::error!(error = %e, user_id, "failed to load session user");
            None
        }
    }
}

pub fn sign_token(secret: &str, session_id: &str) -> Result<String, AuthError> {
    let mut mac = HmacSha1::new_from_slice(secret.as_bytes()).map_err(|_| AuthError::Signing)?;
    mac.update(session_id.as_bytes());
    let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
    Ok(format!("{session_id}.{signature}"))
}

/// Returns the session id when the signature checks out.
pub fn verify_token<'a>(secret: &str, token: &'a str) -> Option<&'a str> {
    let (session_id, signature) = token.split_once('.')?;
    let signature = URL_SAFE_NO_PAD.decode(signature).ok()?;

    let mut mac = HmacSha1::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(session_id.as_bytes());
    mac.verify_slice(&signature).ok()?;

    Some(session_id)
}

/// Reads one cookie from the request's `Cookie` headers.
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}
