//! Basic authentication extractor.
//!
//! Every lifecycle handler takes [`Authenticated`]; extraction fails with
//! 401 unless the request carries `Authorization: Basic <base64(user:pass)>`
//! matching the configured API credentials.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::http::error::ApiError;
use crate::state::AppState;

/// Authenticated request marker. Extracting this validates the credentials.
pub struct Authenticated;

impl FromRequestParts<AppState> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let (username, password) = extract_basic(parts).ok_or(ApiError::Unauthorized)?;

        if state.auth.verify(&username, &password) {
            Ok(Authenticated)
        } else {
            tracing::warn!(username = %username, "Rejected API credentials");
            Err(ApiError::Unauthorized)
        }
    }
}

/// Decode `Authorization: Basic ...` into a username/password pair.
fn extract_basic(parts: &Parts) -> Option<(String, String)> {
    let header = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, encoded) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }

    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    // The password may itself contain ':'
    let (username, password) = decoded.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}
