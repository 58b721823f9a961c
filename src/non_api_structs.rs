use crate::{PostId, Role, RoomId, UserId};
use serde::{Deserialize, Serialize};

// Storage records. Every cross-record reference below is a plain identifier
// list with no referential integrity behind it; the server's relationship,
// engagement and reconcile modules are the only writers.

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct User {
    pub id: UserId,
    pub password: String,
    pub role: Role,
    pub bio: Option<String>,
    pub friends: Vec<UserId>,
    pub friend_requests: Vec<UserId>,
    pub friends_requested: Vec<UserId>,
    pub requested_posts: Vec<PostId>,
    pub reminder_posts: Vec<PostId>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Post {
    pub id: PostId,
    pub owner: UserId,
    pub title: String,
    pub body: String,
    pub tags: Vec<String>,
    pub comments: Vec<Comment>,
    pub created_at: String,
    pub interested_users: Vec<UserId>,
    pub confirmed_users: Vec<UserId>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Comment {
    pub id: String,
    pub author: UserId,
    pub body: String,
    pub created_at: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct TokenData {
    pub user_id: UserId,
    pub created_at: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct ChatRoom {
    pub key: RoomId,
    pub participants: [UserId; 2],
    pub created_at: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct ChatMessage {
    pub id: String,
    pub room: RoomId,
    pub from: UserId,
    pub body: String,
    pub sent_at: String,
}
