use crate::auth::resolve_identity;
use crate::config;
use crate::error::{ApiError, Result};
use crate::helpers::hash_password;
use crate::reconcile;
use crate::state::State;
use axum::extract::Path;
use axum::http::HeaderMap;
use axum::{Extension, Json};
use gather_common::non_api_structs::User;
use gather_common::{CreateUser, PublicProfile, Role, UserId};
use tracing::info;

fn profile(user: User) -> PublicProfile {
    PublicProfile {
        id: user.id,
        role: user.role,
        bio: user.bio,
        friends: user.friends,
        requested_posts: user.requested_posts,
        reminder_posts: user.reminder_posts,
    }
}

fn valid_username(username: &str) -> bool {
    (config::MIN_USERNAME_LENGTH..=config::MAX_USERNAME_LENGTH).contains(&username.len())
        && username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

pub fn create_user_record(state: &State, body: CreateUser) -> Result<User> {
    if !valid_username(&body.username) {
        return Err(ApiError::BadRequest(String::from("invalid username")));
    }
    if body.password.len() < config::MIN_PASSWORD_LENGTH {
        return Err(ApiError::BadRequest(String::from("password too short")));
    }
    if body.bio.as_deref().map(str::len).unwrap_or(0) > config::MAX_BIO_LENGTH {
        return Err(ApiError::BadRequest(String::from("bio too long")));
    }
    let id = UserId(body.username);
    if state.try_user(&id)?.is_some() {
        return Err(ApiError::Conflict(String::from("username exists")));
    }
    let user = User {
        id,
        password: hash_password(&body.password)?,
        role: Role::User,
        bio: body.bio,
        ..Default::default()
    };
    state.put_user(&user)?;
    Ok(user)
}

// === Handlers ===

pub async fn create(
    Extension(state): Extension<State>,
    Json(body): Json<CreateUser>,
) -> Result<Json<PublicProfile>> {
    let user = create_user_record(&state, body)?;
    info!("created user {}", user.id.0);
    Ok(Json(profile(user)))
}

pub async fn get(
    Extension(state): Extension<State>,
    Path(user_id): Path<String>,
) -> Result<Json<PublicProfile>> {
    Ok(Json(profile(state.user(&UserId(user_id))?)))
}

pub async fn delete(
    Extension(state): Extension<State>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
) -> Result<()> {
    let principal = resolve_identity(&state, &headers)?;
    let user_id = UserId(user_id);
    if principal.role != Role::Admin && principal.user_id != user_id {
        return Err(ApiError::Unauthorized);
    }
    let user = state.user(&user_id)?;
    // Walk the denormalized back-references before the record disappears.
    reconcile::on_user_deleted(&state, &user)?;
    state.remove_user(&user_id)?;
    info!("deleted user {}", user_id.0);
    Ok(())
}
