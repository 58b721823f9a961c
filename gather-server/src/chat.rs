use crate::auth::resolve_identity;
use crate::config;
use crate::error::{ApiError, Result};
use crate::helpers::now_iso;
use crate::state::State;
use axum::extract::Path;
use axum::http::HeaderMap;
use axum::{Extension, Json};
use gather_common::non_api_structs::{ChatMessage, ChatRoom};
use gather_common::{RoomId, SendMessageBody, UserId};
use uuid::Uuid;

pub fn pair_key(a: &UserId, b: &UserId) -> RoomId {
    RoomId(String::from(&a.0) + "_" + &b.0)
}

// Two independent call paths (a message from either side) have to converge on
// one room, so the reversed key is checked before anything is created and an
// existing room wins regardless of argument order. Two rooms can still appear
// under concurrent first use of the same pair; that race is accepted and no
// lock guards it.
pub fn resolve_or_create(
    state: &State,
    a: &UserId,
    b: &UserId,
    create_if_missing: bool,
) -> Result<ChatRoom> {
    let forward = pair_key(a, b);
    if let Some(room) = state.try_room(&forward)? {
        return Ok(room);
    }
    if let Some(room) = state.try_room(&pair_key(b, a))? {
        return Ok(room);
    }
    if !create_if_missing {
        return Err(ApiError::NotFound(
            String::from("no chat room for ") + &a.0 + " and " + &b.0,
        ));
    }
    let room = ChatRoom {
        key: forward,
        participants: [a.clone(), b.clone()],
        created_at: now_iso(),
    };
    state.put_room(&room)?;
    Ok(room)
}

// === Handlers ===

pub async fn send_message(
    Extension(state): Extension<State>,
    headers: HeaderMap,
    Path(peer): Path<String>,
    Json(body): Json<SendMessageBody>,
) -> Result<Json<ChatMessage>> {
    let principal = resolve_identity(&state, &headers)?;
    let peer = UserId(peer);
    state.user(&peer)?;
    if body.body.is_empty() || body.body.len() > config::MAX_MESSAGE_LENGTH {
        return Err(ApiError::BadRequest(String::from("invalid message body")));
    }
    let room = resolve_or_create(&state, &principal.user_id, &peer, true)?;
    let message = ChatMessage {
        id: Uuid::new_v4().to_string(),
        room: room.key,
        from: principal.user_id,
        body: body.body,
        sent_at: now_iso(),
    };
    state.push_message(&message)?;
    Ok(Json(message))
}

pub async fn list_messages(
    Extension(state): Extension<State>,
    headers: HeaderMap,
    Path(peer): Path<String>,
) -> Result<Json<Vec<ChatMessage>>> {
    let principal = resolve_identity(&state, &headers)?;
    let room = resolve_or_create(&state, &principal.user_id, &UserId(peer), false)?;
    Ok(Json(state.room_messages(&room.key)?))
}
