use crate::auth::resolve_identity;
use crate::config;
use crate::error::{ApiError, Result};
use crate::helpers::now_iso;
use crate::reconcile;
use crate::state::State;
use axum::extract::{Path, Query};
use axum::http::HeaderMap;
use axum::{Extension, Json};
use gather_common::non_api_structs::{Comment, Post};
use gather_common::{CreateComment, CreatePost, PostId, Role};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

#[derive(Deserialize)]
pub struct FeedParams {
    pub tag: Option<String>,
}

pub async fn create(
    Extension(state): Extension<State>,
    headers: HeaderMap,
    Json(body): Json<CreatePost>,
) -> Result<Json<Post>> {
    let principal = resolve_identity(&state, &headers)?;
    if body.title.is_empty() || body.title.len() > config::MAX_TITLE_LENGTH {
        return Err(ApiError::BadRequest(String::from("invalid title")));
    }
    if body.body.len() > config::MAX_POST_LENGTH {
        return Err(ApiError::BadRequest(String::from("post body too long")));
    }
    let post = Post {
        id: PostId(Uuid::new_v4().to_string()),
        owner: principal.user_id,
        title: body.title,
        body: body.body,
        tags: body.tags,
        created_at: now_iso(),
        ..Default::default()
    };
    state.put_post(&post)?;
    info!("created post {} by {}", post.id.0, post.owner.0);
    Ok(Json(post))
}

pub async fn get(
    Extension(state): Extension<State>,
    Path(post_id): Path<String>,
) -> Result<Json<Post>> {
    Ok(Json(state.post(&PostId(post_id))?))
}

pub fn feed(state: &State, tag: Option<&str>) -> Result<Vec<Post>> {
    let mut posts = state.all_posts()?;
    if let Some(tag) = tag {
        posts.retain(|post| post.tags.iter().any(|t| t == tag));
    }
    // RFC3339 strings sort chronologically; newest first.
    posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(posts)
}

pub async fn list(
    Extension(state): Extension<State>,
    Query(params): Query<FeedParams>,
) -> Result<Json<Vec<Post>>> {
    Ok(Json(feed(&state, params.tag.as_deref())?))
}

pub async fn delete(
    Extension(state): Extension<State>,
    headers: HeaderMap,
    Path(post_id): Path<String>,
) -> Result<()> {
    let principal = resolve_identity(&state, &headers)?;
    let post_id = PostId(post_id);
    let post = state.post(&post_id)?;
    if principal.role != Role::Admin && post.owner != principal.user_id {
        return Err(ApiError::Unauthorized);
    }
    // Walk the denormalized back-references before the record disappears.
    reconcile::on_post_deleted(&state, &post)?;
    state.remove_post(&post_id)?;
    info!("deleted post {}", post_id.0);
    Ok(())
}

pub async fn add_comment(
    Extension(state): Extension<State>,
    headers: HeaderMap,
    Path(post_id): Path<String>,
    Json(body): Json<CreateComment>,
) -> Result<Json<Comment>> {
    let principal = resolve_identity(&state, &headers)?;
    if body.body.is_empty() || body.body.len() > config::MAX_COMMENT_LENGTH {
        return Err(ApiError::BadRequest(String::from("invalid comment")));
    }
    let comment = Comment {
        id: Uuid::new_v4().to_string(),
        author: principal.user_id,
        body: body.body,
        created_at: now_iso(),
    };
    let pushed = comment.clone();
    state.post_mut(&PostId(post_id), move |post| post.comments.push(pushed))?;
    Ok(Json(comment))
}

pub async fn list_comments(
    Extension(state): Extension<State>,
    Path(post_id): Path<String>,
) -> Result<Json<Vec<Comment>>> {
    Ok(Json(state.post(&PostId(post_id))?.comments))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gather_common::UserId;

    #[test]
    fn feed_filters_by_tag() {
        let state = State::temporary();
        for (id, tags) in [("p1", vec!["food"]), ("p2", vec!["music"]), ("p3", vec![])] {
            state
                .put_post(&Post {
                    id: PostId::new(id),
                    owner: UserId::new("carol"),
                    title: String::from(id),
                    tags: tags.into_iter().map(String::from).collect(),
                    created_at: now_iso(),
                    ..Default::default()
                })
                .unwrap();
        }
        assert_eq!(feed(&state, None).unwrap().len(), 3);
        let tagged = feed(&state, Some("food")).unwrap();
        assert_eq!(tagged.len(), 1);
        assert_eq!(tagged[0].id, PostId::new("p1"));
    }
}
