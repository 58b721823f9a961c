use crate::auth::CodeCache;
use crate::error::{ApiError, Result};
use gather_common::non_api_structs::{ChatMessage, ChatRoom, Post, TokenData, User};
use gather_common::{PostId, RoomId, UserId};
use sled::Tree;
use std::fs::remove_dir_all;
use std::sync::Arc;

#[derive(Clone)]
pub struct State {
    pub db: sled::Db,
    pub users: Tree,
    pub posts: Tree,
    pub tokens: Tree,
    pub rooms: Tree,
    pub messages: Tree,
    pub codes: Arc<CodeCache>,
}

impl State {
    pub fn new(port: u16) -> Self {
        let sled_path = crate::config::db_path(port);
        let _ = remove_dir_all(&sled_path);
        Self::with_db(sled::open(sled_path).unwrap())
    }

    /// In-memory state for tests.
    pub fn temporary() -> Self {
        Self::with_db(sled::Config::new().temporary(true).open().unwrap())
    }

    fn with_db(db: sled::Db) -> Self {
        Self {
            users: db.open_tree("users").unwrap(),
            posts: db.open_tree("posts").unwrap(),
            tokens: db.open_tree("tokens").unwrap(),
            rooms: db.open_tree("rooms").unwrap(),
            messages: db.open_tree("messages").unwrap(),
            codes: Arc::new(CodeCache::new()),
            db,
        }
    }

    pub fn user(&self, id: &UserId) -> Result<User> {
        self.try_user(id)?
            .ok_or_else(|| ApiError::NotFound(String::from("user ") + &id.0))
    }

    pub fn try_user(&self, id: &UserId) -> Result<Option<User>> {
        Ok(match self.users.get(id.0.as_bytes())? {
            Some(raw) => Some(serde_json::from_slice(&raw)?),
            None => None,
        })
    }

    pub fn put_user(&self, user: &User) -> Result<()> {
        self.users
            .insert(user.id.0.as_bytes(), serde_json::to_vec(user)?)?;
        Ok(())
    }

    pub fn user_mut(&self, id: &UserId, func: impl FnOnce(&mut User)) -> Result<()> {
        let mut user = self.user(id)?;
        func(&mut user);
        self.put_user(&user)
    }

    /// Returns false when the record no longer exists; the mutation is skipped.
    pub fn try_user_mut(&self, id: &UserId, func: impl FnOnce(&mut User)) -> Result<bool> {
        match self.try_user(id)? {
            Some(mut user) => {
                func(&mut user);
                self.put_user(&user)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn remove_user(&self, id: &UserId) -> Result<()> {
        self.users.remove(id.0.as_bytes())?;
        Ok(())
    }

    pub fn post(&self, id: &PostId) -> Result<Post> {
        self.try_post(id)?
            .ok_or_else(|| ApiError::NotFound(String::from("post ") + &id.0))
    }

    pub fn try_post(&self, id: &PostId) -> Result<Option<Post>> {
        Ok(match self.posts.get(id.0.as_bytes())? {
            Some(raw) => Some(serde_json::from_slice(&raw)?),
            None => None,
        })
    }

    pub fn put_post(&self, post: &Post) -> Result<()> {
        self.posts
            .insert(post.id.0.as_bytes(), serde_json::to_vec(post)?)?;
        Ok(())
    }

    pub fn post_mut(&self, id: &PostId, func: impl FnOnce(&mut Post)) -> Result<()> {
        let mut post = self.post(id)?;
        func(&mut post);
        self.put_post(&post)
    }

    /// Returns false when the record no longer exists; the mutation is skipped.
    pub fn try_post_mut(&self, id: &PostId, func: impl FnOnce(&mut Post)) -> Result<bool> {
        match self.try_post(id)? {
            Some(mut post) => {
                func(&mut post);
                self.put_post(&post)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn remove_post(&self, id: &PostId) -> Result<()> {
        self.posts.remove(id.0.as_bytes())?;
        Ok(())
    }

    pub fn all_posts(&self) -> Result<Vec<Post>> {
        let mut posts = Vec::new();
        for entry in self.posts.iter() {
            let (_, raw) = entry?;
            posts.push(serde_json::from_slice(&raw)?);
        }
        Ok(posts)
    }

    pub fn token(&self, token: &str) -> Result<Option<TokenData>> {
        Ok(match self.tokens.get(token.as_bytes())? {
            Some(raw) => Some(serde_json::from_slice(&raw)?),
            None => None,
        })
    }

    pub fn put_token(&self, token: &str, data: &TokenData) -> Result<()> {
        self.tokens
            .insert(token.as_bytes(), serde_json::to_vec(data)?)?;
        Ok(())
    }

    pub fn remove_token(&self, token: &[u8]) -> Result<()> {
        self.tokens.remove(token)?;
        Ok(())
    }

    pub fn try_room(&self, key: &RoomId) -> Result<Option<ChatRoom>> {
        Ok(match self.rooms.get(key.0.as_bytes())? {
            Some(raw) => Some(serde_json::from_slice(&raw)?),
            None => None,
        })
    }

    pub fn put_room(&self, room: &ChatRoom) -> Result<()> {
        self.rooms
            .insert(room.key.0.as_bytes(), serde_json::to_vec(room)?)?;
        Ok(())
    }

    pub fn push_message(&self, message: &ChatMessage) -> Result<()> {
        // Fixed-width millisecond stamp keeps the tree's key order chronological.
        let key = format!(
            "{}|{:013}|{}",
            message.room.0,
            chrono::Utc::now().timestamp_millis(),
            message.id
        );
        self.messages
            .insert(key.as_bytes(), serde_json::to_vec(message)?)?;
        Ok(())
    }

    pub fn room_messages(&self, key: &RoomId) -> Result<Vec<ChatMessage>> {
        let prefix = String::from(&key.0) + "|";
        let mut messages = Vec::new();
        for entry in self.messages.scan_prefix(prefix.as_bytes()) {
            let (_, raw) = entry?;
            messages.push(serde_json::from_slice(&raw)?);
        }
        Ok(messages)
    }
}
