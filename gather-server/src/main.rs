use axum::routing::{delete, get, post};
use axum::Extension;
use std::env;
use std::net::SocketAddr;

mod auth;
mod chat;
mod config;
mod engagement;
mod error;
mod friends;
mod helpers;
mod posts;
mod reconcile;
mod state;
mod users;

use state::State;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().init();
    let mut port = 8000;
    if let Some(p) = env::args().collect::<Vec<_>>().get(1) {
        port = p.parse()?;
    }
    let state = State::new(port);
    let app = axum::Router::new()
        .route("/", get(root))
        .route("/users", post(users::create))
        .route("/users/:id", get(users::get).delete(users::delete))
        .route("/users/:id/friends", get(friends::get_friends))
        .route("/login", post(auth::login))
        .route("/password-reset/request", post(auth::request_password_reset))
        .route("/password-reset/confirm", post(auth::confirm_password_reset))
        .route("/friends/requests", get(friends::incoming_requests))
        .route("/friends/requested", get(friends::outgoing_requests))
        .route("/friends/request", post(friends::send))
        .route("/friends/accept", post(friends::accept))
        .route("/friends/reject", post(friends::reject))
        .route("/friends/cancel", post(friends::cancel))
        .route("/friends/remove", post(friends::remove))
        .route("/posts", post(posts::create).get(posts::list))
        .route("/posts/:id", get(posts::get).delete(posts::delete))
        .route("/posts/:id/comments", post(posts::add_comment).get(posts::list_comments))
        .route("/posts/:id/interest", post(engagement::request))
        .route("/posts/:id/interested/:user/accept", post(engagement::accept))
        .route("/posts/:id/interested/:user/reject", post(engagement::reject))
        .route("/posts/:id/confirmed/:user", delete(engagement::remove_confirmed))
        .route("/chat/:peer/messages", post(chat::send_message).get(chat::list_messages))
        .layer(Extension(state));
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    tracing::info!("listening on {}", addr);
    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await?;
    Ok(())
}

async fn root() -> &'static str {
    "gather-server"
}
