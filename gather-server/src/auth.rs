use crate::config;
use crate::error::{ApiError, Result};
use crate::helpers::{hash_password, now_iso, verify_password};
use crate::state::State;
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::{Extension, Json};
use chrono::{DateTime, Utc};
use gather_common::non_api_structs::TokenData;
use gather_common::{
    LoginRequest, LoginResponse, PasswordResetCode, PasswordResetConfirm, PasswordResetRequest,
    Role, UserId,
};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use uuid::Uuid;

pub struct Principal {
    pub user_id: UserId,
    pub role: Role,
}

pub fn resolve_identity(state: &State, headers: &HeaderMap) -> Result<Principal> {
    let header = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let token = header
        .strip_prefix("Bearer ")
        .ok_or(ApiError::Unauthenticated)?;
    let data = state.token(token)?.ok_or(ApiError::Unauthenticated)?;
    if token_expired(&data) {
        return Err(ApiError::Unauthenticated);
    }
    // A token whose user has since been deleted no longer resolves.
    let user = state
        .try_user(&data.user_id)?
        .ok_or(ApiError::Unauthenticated)?;
    Ok(Principal {
        user_id: user.id,
        role: user.role,
    })
}

pub fn token_expired(data: &TokenData) -> bool {
    match DateTime::parse_from_rfc3339(&data.created_at) {
        Ok(created) => {
            let age_hours = (Utc::now() - created.with_timezone(&Utc)).num_hours();
            age_hours > config::token_expiration_hours()
        }
        Err(_) => true,
    }
}

pub fn issue_token(state: &State, user_id: &UserId) -> Result<String> {
    let token = Uuid::new_v4().to_string();
    let data = TokenData {
        user_id: user_id.clone(),
        created_at: now_iso(),
    };
    state.put_token(&token, &data)?;
    Ok(token)
}

pub fn purge_tokens(state: &State, user_id: &UserId) -> Result<()> {
    let mut stale = Vec::new();
    for entry in state.tokens.iter() {
        let (key, raw) = entry?;
        let data: TokenData = serde_json::from_slice(&raw)?;
        if &data.user_id == user_id {
            stale.push(key);
        }
    }
    for key in stale {
        state.remove_token(&key)?;
    }
    Ok(())
}

/// Process-wide expiring store for one-time codes. No core invariant depends
/// on it; entries are purged on every touch.
pub struct CodeCache {
    ttl: Duration,
    codes: Mutex<HashMap<String, (UserId, Instant)>>,
}

impl CodeCache {
    pub fn new() -> Self {
        Self::with_ttl(Duration::from_secs(config::code_ttl_secs()))
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            codes: Mutex::new(HashMap::new()),
        }
    }

    pub fn issue(&self, user_id: UserId) -> String {
        let code = Uuid::new_v4().to_string();
        let mut codes = self.codes.lock().unwrap();
        let ttl = self.ttl;
        codes.retain(|_, (_, issued)| issued.elapsed() < ttl);
        codes.insert(code.clone(), (user_id, Instant::now()));
        code
    }

    pub fn redeem(&self, code: &str) -> Option<UserId> {
        let mut codes = self.codes.lock().unwrap();
        let (user_id, issued) = codes.remove(code)?;
        if issued.elapsed() < self.ttl {
            Some(user_id)
        } else {
            None
        }
    }
}

pub async fn login(
    Extension(state): Extension<State>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let user = state
        .try_user(&UserId(body.username))?
        .ok_or(ApiError::Unauthenticated)?;
    if !verify_password(&body.password, &user.password) {
        return Err(ApiError::Unauthenticated);
    }
    let token = issue_token(&state, &user.id)?;
    tracing::info!("user {} logged in", user.id.0);
    Ok(Json(LoginResponse {
        token,
        user_id: user.id,
    }))
}

// Delivery transport is out of scope, so the code goes back to the caller.
pub async fn request_password_reset(
    Extension(state): Extension<State>,
    Json(body): Json<PasswordResetRequest>,
) -> Result<Json<PasswordResetCode>> {
    let user = state.user(&UserId(body.username))?;
    let code = state.codes.issue(user.id);
    Ok(Json(PasswordResetCode { code }))
}

pub async fn confirm_password_reset(
    Extension(state): Extension<State>,
    Json(body): Json<PasswordResetConfirm>,
) -> Result<()> {
    if body.new_password.len() < config::MIN_PASSWORD_LENGTH {
        return Err(ApiError::BadRequest(String::from("password too short")));
    }
    let user_id = state
        .codes
        .redeem(&body.code)
        .ok_or(ApiError::Unauthenticated)?;
    let hash = hash_password(&body.new_password)?;
    if !state.try_user_mut(&user_id, |user| user.password = hash)? {
        return Err(ApiError::NotFound(String::from("user ") + &user_id.0));
    }
    // Old sessions stop resolving once the password changes.
    purge_tokens(&state, &user_id)?;
    Ok(())
}
