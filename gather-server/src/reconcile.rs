use crate::auth::purge_tokens;
use crate::error::Result;
use crate::state::State;
use gather_common::non_api_structs::{Post, User};
use tracing::warn;

// Nothing cascades these removals for us: when a root record goes away, every
// denormalized back-reference to it has to be walked and repaired here, before
// the delete completes. Peers that are already gone are expected under
// concurrent deletes and skipped; a failed peer write is logged and the walk
// continues.

pub fn on_user_deleted(state: &State, user: &User) -> Result<()> {
    for friend in &user.friends {
        let result = state.try_user_mut(friend, |peer| peer.friends.retain(|id| id != &user.id));
        if let Err(err) = result {
            warn!("failed to unlink friend {} of {}: {}", friend.0, user.id.0, err);
        }
    }
    for peer_id in &user.friend_requests {
        let result = state.try_user_mut(peer_id, |peer| {
            peer.friends_requested.retain(|id| id != &user.id)
        });
        if let Err(err) = result {
            warn!(
                "failed to drop outgoing request of {} to {}: {}",
                peer_id.0, user.id.0, err
            );
        }
    }
    for peer_id in &user.friends_requested {
        let result = state.try_user_mut(peer_id, |peer| {
            peer.friend_requests.retain(|id| id != &user.id)
        });
        if let Err(err) = result {
            warn!(
                "failed to drop incoming request of {} from {}: {}",
                peer_id.0, user.id.0, err
            );
        }
    }
    for post_id in &user.reminder_posts {
        let result = state.try_post_mut(post_id, |post| {
            post.confirmed_users.retain(|id| id != &user.id)
        });
        if let Err(err) = result {
            warn!(
                "failed to unconfirm {} on post {}: {}",
                user.id.0, post_id.0, err
            );
        }
    }
    for post_id in &user.requested_posts {
        let result = state.try_post_mut(post_id, |post| {
            post.interested_users.retain(|id| id != &user.id)
        });
        if let Err(err) = result {
            warn!(
                "failed to drop interest of {} on post {}: {}",
                user.id.0, post_id.0, err
            );
        }
    }
    purge_tokens(state, &user.id)?;
    Ok(())
}

pub fn on_post_deleted(state: &State, post: &Post) -> Result<()> {
    for user_id in &post.confirmed_users {
        let result = state.try_user_mut(user_id, |user| {
            user.reminder_posts.retain(|id| id != &post.id)
        });
        if let Err(err) = result {
            warn!(
                "failed to drop reminder of {} for post {}: {}",
                user_id.0, post.id.0, err
            );
        }
    }
    for user_id in &post.interested_users {
        let result = state.try_user_mut(user_id, |user| {
            user.requested_posts.retain(|id| id != &post.id)
        });
        if let Err(err) = result {
            warn!(
                "failed to drop request of {} for post {}: {}",
                user_id.0, post.id.0, err
            );
        }
    }
    Ok(())
}
