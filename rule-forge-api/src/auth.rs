//! Authentication boundary
//!
//! The rule pipeline only ever consumes the resolved numeric user id;
//! everything in this module exists to produce it. Callers present
//! either an opaque API key (`Authorization: Bearer ...`) or the
//! `session` JWT cookie issued by login/register.

use std::sync::Arc;

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
    Extension, Form, Json,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};

use rule_forge_core::{AccessToken, Credentials};

use crate::{ApiError, AppState};

const SESSION_COOKIE: &str = "session";
const SESSION_TTL_HOURS: i64 = 24;

/// The caller's resolved tenant id, injected by [`require_auth`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser(pub i64);

/// JWT claims for the session cookie
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    iat: i64,
    exp: i64,
}

pub struct AuthService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl AuthService {
    pub fn new(jwt_secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(jwt_secret.as_bytes()),
        }
    }

    pub fn generate_token(&self, user_id: i64) -> Result<String, ApiError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::hours(SESSION_TTL_HOURS)).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| ApiError::Internal(format!("failed to sign token: {e}")))
    }

    pub fn validate_token(&self, token: &str) -> Option<i64> {
        let validation = Validation::new(Algorithm::HS256);
        let data = decode::<Claims>(token, &self.decoding_key, &validation).ok()?;
        data.claims.sub.parse().ok()
    }

    /// Opaque API key: 16 random bytes, hex encoded.
    pub fn generate_api_key() -> String {
        let mut bytes = [0u8; 16];
        OsRng.fill_bytes(&mut bytes);
        hex::encode(bytes)
    }

    pub fn hash_password(password: &str) -> Result<String, ApiError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| ApiError::Internal(format!("failed to hash password: {e}")))
    }

    pub fn verify_password(password: &str, stored_hash: &str) -> bool {
        PasswordHash::new(stored_hash)
            .map(|parsed| {
                Argon2::default()
                    .verify_password(password.as_bytes(), &parsed)
                    .is_ok()
            })
            .unwrap_or(false)
    }
}

/// Resolve the caller to a user id or reject with 401. API keys win
/// over the session cookie, matching the order credentials are
/// documented.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Some(api_key) = bearer_token(request.headers()) {
        if let Ok(Some(user_id)) = state.storage.user_id_for_api_key(&api_key).await {
            request.extensions_mut().insert(AuthUser(user_id));
            return Ok(next.run(request).await);
        }
    }

    if let Some(token) = session_cookie(request.headers()) {
        if let Some(user_id) = state.auth.validate_token(&token) {
            request.extensions_mut().insert(AuthUser(user_id));
            return Ok(next.run(request).await);
        }
    }

    Err(ApiError::Unauthorized)
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::to_string)
}

fn session_cookie(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(header::COOKIE)?.to_str().ok()?;
    raw.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE).then(|| value.to_string())
    })
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Form(creds): Form<Credentials>,
) -> Result<Response, ApiError> {
    if creds.username.is_empty() || creds.password.is_empty() {
        return Err(ApiError::BadRequest(
            "username and password required".to_string(),
        ));
    }

    let user = state
        .storage
        .get_user_by_username(&creds.username)
        .await?
        .ok_or(ApiError::Unauthorized)?;

    if !AuthService::verify_password(&creds.password, &user.password_hash) {
        return Err(ApiError::Unauthorized);
    }

    issue_session(&state, user.id)
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Form(creds): Form<Credentials>,
) -> Result<Response, ApiError> {
    let email = match creds.email.as_deref() {
        Some(email) if !email.is_empty() => email,
        _ => {
            return Err(ApiError::BadRequest(
                "username, email and password required".to_string(),
            ))
        }
    };
    if creds.username.is_empty() || creds.password.is_empty() {
        return Err(ApiError::BadRequest(
            "username, email and password required".to_string(),
        ));
    }

    let password_hash = AuthService::hash_password(&creds.password)?;
    let user = state
        .storage
        .create_user(&creds.username, Some(email), &password_hash)
        .await?;

    tracing::info!(user_id = user.id, username = %user.username, "registered user");
    issue_session(&state, user.id)
}

pub async fn me(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user = state
        .storage
        .get_user_by_id(user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("user {user_id} not found")))?;

    Ok(Json(serde_json::json!({
        "id": user.id,
        "username": user.username,
        "email": user.email,
    })))
}

fn issue_session(state: &AppState, user_id: i64) -> Result<Response, ApiError> {
    let token = state.auth.generate_token(user_id)?;

    let cookie = format!(
        "{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age=86400"
    );
    let cookie = HeaderValue::from_str(&cookie)
        .map_err(|e| ApiError::Internal(format!("invalid cookie value: {e}")))?;

    let mut response = Json(AccessToken {
        access_token: token,
    })
    .into_response();
    response.headers_mut().insert(header::SET_COOKIE, cookie);
    Ok(response)
}
