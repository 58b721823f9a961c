pub mod non_api_structs;

use serde::{Deserialize, Serialize};

#[derive(Eq, PartialEq, Ord, PartialOrd, Hash, Clone, Debug, Serialize, Deserialize, Default)]
pub struct UserId(pub String);
impl UserId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(id.as_ref().to_string())
    }
}
impl AsRef<UserId> for UserId {
    fn as_ref(&self) -> &UserId {
        self
    }
}

#[derive(Eq, PartialEq, Ord, PartialOrd, Hash, Clone, Debug, Serialize, Deserialize, Default)]
pub struct PostId(pub String);
impl PostId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(id.as_ref().to_string())
    }
}

#[derive(Eq, PartialEq, Ord, PartialOrd, Hash, Clone, Debug, Serialize, Deserialize, Default)]
pub struct RoomId(pub String);

#[derive(Eq, PartialEq, Clone, Copy, Debug, Serialize, Deserialize, Default)]
pub enum Role {
    #[default]
    User,
    Admin,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CreateUser {
    pub username: String,
    pub password: String,
    pub bio: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user_id: UserId,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PasswordResetRequest {
    pub username: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PasswordResetCode {
    pub code: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PasswordResetConfirm {
    pub code: String,
    pub new_password: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PublicProfile {
    pub id: UserId,
    pub role: Role,
    pub bio: Option<String>,
    pub friends: Vec<UserId>,
    pub requested_posts: Vec<PostId>,
    pub reminder_posts: Vec<PostId>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FriendRequestBody {
    pub to: UserId,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AcceptFriendBody {
    pub requester: UserId,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RejectFriendBody {
    pub requester: UserId,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CancelFriendBody {
    pub to: UserId,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RemoveFriendBody {
    pub other: UserId,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CreatePost {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CreateComment {
    pub body: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SendMessageBody {
    pub body: String,
}

#[derive(Eq, PartialEq, Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FriendAcceptOutcome {
    Accepted,
    StalePeerRemoved,
}

#[derive(Eq, PartialEq, Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoveFriendOutcome {
    Removed,
    NotFriends,
}

#[derive(Eq, PartialEq, Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoveConfirmedOutcome {
    Removed,
    NotConfirmed,
}
