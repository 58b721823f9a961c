use crate::auth::resolve_identity;
use crate::error::{ApiError, Result};
use crate::state::State;
use axum::extract::Path;
use axum::http::HeaderMap;
use axum::{Extension, Json};
use gather_common::{
    AcceptFriendBody, CancelFriendBody, FriendAcceptOutcome, FriendRequestBody, RejectFriendBody,
    RemoveFriendBody, RemoveFriendOutcome, UserId,
};
use tracing::warn;

// The two sides of every pending request mirror each other:
// B in friends_requested(A) iff A in friend_requests(B). Each side is its own
// persist, so every check below reads both records and tolerates a mismatch.

pub fn send_friend_request(state: &State, from: &UserId, to: &UserId) -> Result<()> {
    if from == to {
        return Err(ApiError::BadRequest(String::from(
            "cannot send a friend request to yourself",
        )));
    }
    let from_user = state.user(from)?;
    let to_user = state.user(to)?;
    if to_user.friends.contains(from) || from_user.friends.contains(to) {
        return Err(ApiError::Conflict(String::from("already friends")));
    }
    // A mutual simultaneous request collapses to a single pending relationship,
    // so a request already open in either direction short-circuits here.
    let pending = from_user.friends_requested.contains(to)
        || from_user.friend_requests.contains(to)
        || to_user.friend_requests.contains(from)
        || to_user.friends_requested.contains(from);
    if pending {
        return Err(ApiError::Conflict(String::from("request already pending")));
    }
    state.user_mut(from, |user| user.friends_requested.push(to.clone()))?;
    // Second side is an independent persist; on failure the one-sided entry
    // stands and is repaired by later idempotent checks.
    if let Err(err) = state.user_mut(to, |user| user.friend_requests.push(from.clone())) {
        warn!(
            "mirror write failed for friend request {} -> {}: {}",
            from.0, to.0, err
        );
        return Err(err);
    }
    Ok(())
}

pub fn accept_friend_request(
    state: &State,
    requester: &UserId,
    acceptor: &UserId,
) -> Result<FriendAcceptOutcome> {
    let acceptor_user = state.user(acceptor)?;
    if acceptor_user.friends.contains(requester) {
        return Err(ApiError::Conflict(String::from("already friends")));
    }
    if !acceptor_user.friend_requests.contains(requester) {
        return Err(ApiError::Conflict(String::from("no pending request")));
    }
    if state.try_user(requester)?.is_none() {
        // Pending entries self-heal when their target has vanished.
        state.user_mut(acceptor, |user| {
            user.friend_requests.retain(|id| id != requester)
        })?;
        return Ok(FriendAcceptOutcome::StalePeerRemoved);
    }
    state.user_mut(acceptor, |user| {
        user.friend_requests.retain(|id| id != requester);
        user.friends_requested.retain(|id| id != requester);
        if !user.friends.contains(requester) {
            user.friends.push(requester.clone());
        }
    })?;
    let mirrored = state.try_user_mut(requester, |user| {
        user.friends_requested.retain(|id| id != acceptor);
        user.friend_requests.retain(|id| id != acceptor);
        if !user.friends.contains(acceptor) {
            user.friends.push(acceptor.clone());
        }
    })?;
    if !mirrored {
        // Requester was deleted between the check and the mirror write.
        state.user_mut(acceptor, |user| user.friends.retain(|id| id != requester))?;
        return Ok(FriendAcceptOutcome::StalePeerRemoved);
    }
    Ok(FriendAcceptOutcome::Accepted)
}

pub fn delete_friend_request(state: &State, from: &UserId, to: &UserId) -> Result<()> {
    let from_user = state.try_user(from)?;
    let to_user = state.try_user(to)?;
    let mut pending = false;
    if let Some(user) = &from_user {
        pending |= user.friends_requested.contains(to);
    }
    if let Some(user) = &to_user {
        pending |= user.friend_requests.contains(from);
    }
    if !pending {
        return Err(ApiError::Conflict(String::from("no pending request")));
    }
    // Either endpoint may be gone already; purge whatever side still exists.
    state.try_user_mut(from, |user| user.friends_requested.retain(|id| id != to))?;
    state.try_user_mut(to, |user| user.friend_requests.retain(|id| id != from))?;
    Ok(())
}

pub fn remove_friend(state: &State, this: &UserId, other: &UserId) -> Result<RemoveFriendOutcome> {
    let this_user = state.user(this)?;
    if !this_user.friends.contains(other) {
        return Ok(RemoveFriendOutcome::NotFriends);
    }
    state.user_mut(this, |user| user.friends.retain(|id| id != other))?;
    state.try_user_mut(other, |user| user.friends.retain(|id| id != this))?;
    Ok(RemoveFriendOutcome::Removed)
}

// === Handlers ===

pub async fn get_friends(
    Extension(state): Extension<State>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<UserId>>> {
    Ok(Json(state.user(&UserId(user_id))?.friends))
}

pub async fn incoming_requests(
    Extension(state): Extension<State>,
    headers: HeaderMap,
) -> Result<Json<Vec<UserId>>> {
    let principal = resolve_identity(&state, &headers)?;
    Ok(Json(state.user(&principal.user_id)?.friend_requests))
}

pub async fn outgoing_requests(
    Extension(state): Extension<State>,
    headers: HeaderMap,
) -> Result<Json<Vec<UserId>>> {
    let principal = resolve_identity(&state, &headers)?;
    Ok(Json(state.user(&principal.user_id)?.friends_requested))
}

pub async fn send(
    Extension(state): Extension<State>,
    headers: HeaderMap,
    Json(body): Json<FriendRequestBody>,
) -> Result<()> {
    let principal = resolve_identity(&state, &headers)?;
    send_friend_request(&state, &principal.user_id, &body.to)
}

pub async fn accept(
    Extension(state): Extension<State>,
    headers: HeaderMap,
    Json(body): Json<AcceptFriendBody>,
) -> Result<Json<FriendAcceptOutcome>> {
    let principal = resolve_identity(&state, &headers)?;
    Ok(Json(accept_friend_request(
        &state,
        &body.requester,
        &principal.user_id,
    )?))
}

pub async fn reject(
    Extension(state): Extension<State>,
    headers: HeaderMap,
    Json(body): Json<RejectFriendBody>,
) -> Result<()> {
    let principal = resolve_identity(&state, &headers)?;
    delete_friend_request(&state, &body.requester, &principal.user_id)
}

pub async fn cancel(
    Extension(state): Extension<State>,
    headers: HeaderMap,
    Json(body): Json<CancelFriendBody>,
) -> Result<()> {
    let principal = resolve_identity(&state, &headers)?;
    delete_friend_request(&state, &principal.user_id, &body.to)
}

pub async fn remove(
    Extension(state): Extension<State>,
    headers: HeaderMap,
    Json(body): Json<RemoveFriendBody>,
) -> Result<Json<RemoveFriendOutcome>> {
    let principal = resolve_identity(&state, &headers)?;
    Ok(Json(remove_friend(&state, &principal.user_id, &body.other)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gather_common::non_api_structs::User;

    fn state_with_users(names: &[&str]) -> State {
        let state = State::temporary();
        for name in names {
            let user = User {
                id: UserId::new(name),
                ..Default::default()
            };
            state.put_user(&user).unwrap();
        }
        state
    }

    #[test]
    fn send_then_accept_makes_friendship_symmetric() {
        let state = state_with_users(&["alice", "bob"]);
        let alice = UserId::new("alice");
        let bob = UserId::new("bob");

        send_friend_request(&state, &alice, &bob).unwrap();
        assert_eq!(state.user(&alice).unwrap().friends_requested, vec![bob.clone()]);
        assert_eq!(state.user(&bob).unwrap().friend_requests, vec![alice.clone()]);

        let outcome = accept_friend_request(&state, &alice, &bob).unwrap();
        assert_eq!(outcome, FriendAcceptOutcome::Accepted);

        let alice_user = state.user(&alice).unwrap();
        let bob_user = state.user(&bob).unwrap();
        assert_eq!(alice_user.friends, vec![bob.clone()]);
        assert_eq!(bob_user.friends, vec![alice.clone()]);
        assert!(alice_user.friends_requested.is_empty());
        assert!(alice_user.friend_requests.is_empty());
        assert!(bob_user.friend_requests.is_empty());
        assert!(bob_user.friends_requested.is_empty());
    }

    #[test]
    fn mutual_requests_collapse_to_one_pending_pair() {
        let state = state_with_users(&["alice", "bob"]);
        let alice = UserId::new("alice");
        let bob = UserId::new("bob");

        send_friend_request(&state, &alice, &bob).unwrap();
        let err = send_friend_request(&state, &bob, &alice).unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
        assert_eq!(state.user(&bob).unwrap().friends_requested.len(), 0);
        assert_eq!(state.user(&alice).unwrap().friend_requests.len(), 0);
    }

    #[test]
    fn duplicate_request_conflicts() {
        let state = state_with_users(&["alice", "bob"]);
        let alice = UserId::new("alice");
        let bob = UserId::new("bob");

        send_friend_request(&state, &alice, &bob).unwrap();
        let err = send_friend_request(&state, &alice, &bob).unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[test]
    fn request_to_missing_user_is_not_found() {
        let state = state_with_users(&["alice"]);
        let err =
            send_friend_request(&state, &UserId::new("alice"), &UserId::new("ghost")).unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[test]
    fn accept_without_request_conflicts() {
        let state = state_with_users(&["alice", "bob"]);
        let err =
            accept_friend_request(&state, &UserId::new("alice"), &UserId::new("bob")).unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[test]
    fn accept_self_heals_when_requester_vanished() {
        let state = state_with_users(&["alice", "bob"]);
        let alice = UserId::new("alice");
        let bob = UserId::new("bob");

        send_friend_request(&state, &alice, &bob).unwrap();
        state.remove_user(&alice).unwrap();

        let outcome = accept_friend_request(&state, &alice, &bob).unwrap();
        assert_eq!(outcome, FriendAcceptOutcome::StalePeerRemoved);
        let bob_user = state.user(&bob).unwrap();
        assert!(bob_user.friend_requests.is_empty());
        assert!(bob_user.friends.is_empty());
    }

    #[test]
    fn reject_clears_both_sides() {
        let state = state_with_users(&["alice", "bob"]);
        let alice = UserId::new("alice");
        let bob = UserId::new("bob");

        send_friend_request(&state, &alice, &bob).unwrap();
        delete_friend_request(&state, &alice, &bob).unwrap();
        assert!(state.user(&alice).unwrap().friends_requested.is_empty());
        assert!(state.user(&bob).unwrap().friend_requests.is_empty());

        let err = delete_friend_request(&state, &alice, &bob).unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[test]
    fn reject_tolerates_missing_sender() {
        let state = state_with_users(&["alice", "bob"]);
        let alice = UserId::new("alice");
        let bob = UserId::new("bob");

        send_friend_request(&state, &alice, &bob).unwrap();
        state.remove_user(&alice).unwrap();
        delete_friend_request(&state, &alice, &bob).unwrap();
        assert!(state.user(&bob).unwrap().friend_requests.is_empty());
    }

    #[test]
    fn remove_friend_clears_both_sides_and_is_idempotent() {
        let state = state_with_users(&["alice", "bob"]);
        let alice = UserId::new("alice");
        let bob = UserId::new("bob");

        send_friend_request(&state, &alice, &bob).unwrap();
        accept_friend_request(&state, &alice, &bob).unwrap();

        assert_eq!(
            remove_friend(&state, &alice, &bob).unwrap(),
            RemoveFriendOutcome::Removed
        );
        assert!(state.user(&alice).unwrap().friends.is_empty());
        assert!(state.user(&bob).unwrap().friends.is_empty());

        assert_eq!(
            remove_friend(&state, &alice, &bob).unwrap(),
            RemoveFriendOutcome::NotFriends
        );
    }

    #[test]
    fn remove_friend_tolerates_missing_peer() {
        let state = state_with_users(&["alice", "bob"]);
        let alice = UserId::new("alice");
        let bob = UserId::new("bob");

        send_friend_request(&state, &alice, &bob).unwrap();
        accept_friend_request(&state, &alice, &bob).unwrap();
        state.remove_user(&bob).unwrap();

        assert_eq!(
            remove_friend(&state, &alice, &bob).unwrap(),
            RemoveFriendOutcome::Removed
        );
        assert!(state.user(&alice).unwrap().friends.is_empty());
    }
}
