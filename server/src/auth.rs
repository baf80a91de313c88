//! Admin session and flash-message cookies.
//!
//! The session cookie carries a token signed with the configured secret (see
//! [`security::sign_session`]); nothing is stored server side. Admin-only
//! handlers take an [`AdminSession`] argument, whose extraction fails with
//! [`AppError::Unauthorized`] when the cookie is missing, forged or expired.

use crate::config::AppConfig;
use crate::error::AppError;
use crate::security;
use crate::state::AppState;
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::COOKIE;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use tracing::debug;

pub const SESSION_COOKIE: &str = "admin_session";
pub const FLASH_COOKIE: &str = "flash";
pub const LOGIN_PATH: &str = "/admin-login";

/// Proof that the request carries a valid admin session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminSession {
    pub username: String,
}

#[async_trait]
impl FromRequestParts<AppState> for AdminSession {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let now = chrono::Utc::now().timestamp();
        authenticate(&parts.headers, &state.config, now).ok_or_else(|| {
            debug!(path = %parts.uri.path(), "admin session missing or invalid");
            AppError::Unauthorized
        })
    }
}

pub fn authenticate(headers: &HeaderMap, config: &AppConfig, now: i64) -> Option<AdminSession> {
    let token = cookie_value(headers, SESSION_COOKIE)?;
    security::verify_session(
        &config.session_secret,
        &config.admin_username,
        token,
        now,
        config.session_max_age,
    )
    .then(|| AdminSession {
        username: config.admin_username.clone(),
    })
}

/// Checks submitted credentials against the configured admin account.
pub fn check_credentials(config: &AppConfig, username: &str, password: &str) -> Result<bool, security::SecurityError> {
    if username.trim() != config.admin_username {
        return Ok(false);
    }
    security::verify_password(&config.admin_password_hash, password)
}

/// Value of cookie `name`, looking through every `Cookie` header.
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}

pub fn session_cookie(token: &str, max_age: i64) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE, token, max_age
    )
}

pub fn clear_cookie(name: &str) -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", name)
}

/// Flash messages are hex encoded so any text survives the cookie syntax.
pub fn flash_cookie(message: &str) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax",
        FLASH_COOKIE,
        hex::encode(message)
    )
}

pub fn read_flash(headers: &HeaderMap) -> Option<String> {
    let raw = cookie_value(headers, FLASH_COOKIE)?;
    let bytes = hex::decode(raw).ok()?;
    String::from_utf8(bytes).ok().filter(|m| !m.is_empty())
}
