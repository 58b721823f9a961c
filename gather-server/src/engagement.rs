use crate::auth::{resolve_identity, Principal};
use crate::error::{ApiError, Result};
use crate::state::State;
use axum::extract::Path;
use axum::http::HeaderMap;
use axum::{Extension, Json};
use gather_common::non_api_structs::Post;
use gather_common::{PostId, RemoveConfirmedOutcome, Role, UserId};
use tracing::warn;

// Per (post, user) the pipeline is NONE -> INTERESTED -> {CONFIRMED | NONE},
// CONFIRMED -> NONE. Interested and confirmed are disjoint sets, each
// mirrored on the user record (requested_posts / reminder_posts).

fn authorize(post: &Post, actor: &Principal) -> Result<()> {
    if actor.role != Role::Admin && post.owner != actor.user_id {
        return Err(ApiError::Unauthorized);
    }
    Ok(())
}

pub fn request_interest(state: &State, post_id: &PostId, user_id: &UserId) -> Result<()> {
    let post = state.post(post_id)?;
    if post.owner == *user_id {
        return Err(ApiError::Unauthorized);
    }
    state.user(user_id)?;
    if post.interested_users.contains(user_id) {
        return Err(ApiError::Conflict(String::from("already interested")));
    }
    if post.confirmed_users.contains(user_id) {
        return Err(ApiError::Conflict(String::from("already confirmed")));
    }
    state.post_mut(post_id, |post| post.interested_users.push(user_id.clone()))?;
    if let Err(err) = state.user_mut(user_id, |user| user.requested_posts.push(post_id.clone())) {
        warn!(
            "mirror write failed for interest {} -> {}: {}",
            user_id.0, post_id.0, err
        );
        return Err(err);
    }
    Ok(())
}

pub fn accept_interest(
    state: &State,
    post_id: &PostId,
    user_id: &UserId,
    actor: &Principal,
) -> Result<()> {
    let post = state.post(post_id)?;
    authorize(&post, actor)?;
    if !post.interested_users.contains(user_id) {
        return Err(ApiError::Conflict(String::from("no pending interest")));
    }
    let already_confirmed = post.confirmed_users.contains(user_id);
    state.post_mut(post_id, |post| {
        post.interested_users.retain(|id| id != user_id);
        // Re-entrant accept: confirmation is idempotent, the interest
        // clearing above is not skippable.
        if !already_confirmed {
            post.confirmed_users.push(user_id.clone());
        }
    })?;
    let mirrored = state.try_user_mut(user_id, |user| {
        user.requested_posts.retain(|id| id != post_id);
        if !user.reminder_posts.contains(post_id) {
            user.reminder_posts.push(post_id.clone());
        }
    })?;
    if !mirrored {
        warn!(
            "confirmed user {} on post {} no longer exists",
            user_id.0, post_id.0
        );
    }
    Ok(())
}

pub fn reject_interest(
    state: &State,
    post_id: &PostId,
    user_id: &UserId,
    actor: &Principal,
) -> Result<()> {
    let post = state.post(post_id)?;
    authorize(&post, actor)?;
    if !post.interested_users.contains(user_id) {
        return Err(ApiError::Conflict(String::from("no pending interest")));
    }
    state.post_mut(post_id, |post| {
        post.interested_users.retain(|id| id != user_id)
    })?;
    state.try_user_mut(user_id, |user| {
        user.requested_posts.retain(|id| id != post_id)
    })?;
    Ok(())
}

pub fn remove_confirmed_user(
    state: &State,
    post_id: &PostId,
    user_id: &UserId,
    actor: &Principal,
) -> Result<RemoveConfirmedOutcome> {
    let post = state.post(post_id)?;
    authorize(&post, actor)?;
    if !post.confirmed_users.contains(user_id) {
        return Ok(RemoveConfirmedOutcome::NotConfirmed);
    }
    state.post_mut(post_id, |post| {
        post.confirmed_users.retain(|id| id != user_id)
    })?;
    state.try_user_mut(user_id, |user| {
        user.reminder_posts.retain(|id| id != post_id)
    })?;
    Ok(RemoveConfirmedOutcome::Removed)
}

// === Handlers ===

pub async fn request(
    Extension(state): Extension<State>,
    headers: HeaderMap,
    Path(post_id): Path<String>,
) -> Result<()> {
    let principal = resolve_identity(&state, &headers)?;
    request_interest(&state, &PostId(post_id), &principal.user_id)
}

pub async fn accept(
    Extension(state): Extension<State>,
    headers: HeaderMap,
    Path((post_id, user_id)): Path<(String, String)>,
) -> Result<()> {
    let principal = resolve_identity(&state, &headers)?;
    accept_interest(&state, &PostId(post_id), &UserId(user_id), &principal)
}

pub async fn reject(
    Extension(state): Extension<State>,
    headers: HeaderMap,
    Path((post_id, user_id)): Path<(String, String)>,
) -> Result<()> {
    let principal = resolve_identity(&state, &headers)?;
    reject_interest(&state, &PostId(post_id), &UserId(user_id), &principal)
}

pub async fn remove_confirmed(
    Extension(state): Extension<State>,
    headers: HeaderMap,
    Path((post_id, user_id)): Path<(String, String)>,
) -> Result<Json<RemoveConfirmedOutcome>> {
    let principal = resolve_identity(&state, &headers)?;
    Ok(Json(remove_confirmed_user(
        &state,
        &PostId(post_id),
        &UserId(user_id),
        &principal,
    )?))
}
