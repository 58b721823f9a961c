use std::process::Child;

pub mod client {
    use anyhow::Result;
    use gather_common::non_api_structs::{ChatMessage, Comment, Post};
    use gather_common::{
        AcceptFriendBody, CancelFriendBody, CreateComment, CreatePost, CreateUser,
        FriendAcceptOutcome, FriendRequestBody, LoginRequest, LoginResponse, PasswordResetCode,
        PasswordResetConfirm, PasswordResetRequest, PublicProfile, RejectFriendBody,
        RemoveConfirmedOutcome, RemoveFriendBody, RemoveFriendOutcome, SendMessageBody, UserId,
    };
    use reqwest::Client;

    pub async fn create_user(client: &Client, base: &str, body: &CreateUser) -> Result<PublicProfile> {
        Ok(client
            .post(String::from(base) + "/users")
            .json(body)
            .send()
            .await?
            .error_for_status()?
            .json::<_>()
            .await?)
    }
    pub async fn login(client: &Client, base: &str, username: &str, password: &str) -> Result<LoginResponse> {
        Ok(client
            .post(String::from(base) + "/login")
            .json(&LoginRequest {
                username: String::from(username),
                password: String::from(password),
            })
            .send()
            .await?
            .error_for_status()?
            .json::<_>()
            .await?)
    }
    pub async fn get_user(client: &Client, base: &str, user: &UserId) -> Result<PublicProfile> {
        Ok(client
            .get(String::from(base) + "/users/" + &user.0)
            .send()
            .await?
            .error_for_status()?
            .json::<_>()
            .await?)
    }
    pub async fn delete_user(client: &Client, base: &str, token: &str, user: &UserId) -> Result<()> {
        client
            .delete(String::from(base) + "/users/" + &user.0)
            .bearer_auth(token)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
    pub async fn get_friends(client: &Client, base: &str, user: &UserId) -> Result<Vec<UserId>> {
        Ok(client
            .get(String::from(base) + "/users/" + &user.0 + "/friends")
            .send()
            .await?
            .error_for_status()?
            .json::<_>()
            .await?)
    }
    pub async fn incoming_requests(client: &Client, base: &str, token: &str) -> Result<Vec<UserId>> {
        Ok(client
            .get(String::from(base) + "/friends/requests")
            .bearer_auth(token)
            .send()
            .await?
            .error_for_status()?
            .json::<_>()
            .await?)
    }
    pub async fn outgoing_requests(client: &Client, base: &str, token: &str) -> Result<Vec<UserId>> {
        Ok(client
            .get(String::from(base) + "/friends/requested")
            .bearer_auth(token)
            .send()
            .await?
            .error_for_status()?
            .json::<_>()
            .await?)
    }
    pub async fn send_friend_request(client: &Client, base: &str, token: &str, to: &UserId) -> Result<()> {
        client
            .post(String::from(base) + "/friends/request")
            .bearer_auth(token)
            .json(&FriendRequestBody { to: to.clone() })
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
    pub async fn accept_friend_request(
        client: &Client,
        base: &str,
        token: &str,
        requester: &UserId,
    ) -> Result<FriendAcceptOutcome> {
        Ok(client
            .post(String::from(base) + "/friends/accept")
            .bearer_auth(token)
            .json(&AcceptFriendBody {
                requester: requester.clone(),
            })
            .send()
            .await?
            .error_for_status()?
            .json::<_>()
            .await?)
    }
    pub async fn reject_friend_request(client: &Client, base: &str, token: &str, requester: &UserId) -> Result<()> {
        client
            .post(String::from(base) + "/friends/reject")
            .bearer_auth(token)
            .json(&RejectFriendBody {
                requester: requester.clone(),
            })
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
    pub async fn cancel_friend_request(client: &Client, base: &str, token: &str, to: &UserId) -> Result<()> {
        client
            .post(String::from(base) + "/friends/cancel")
            .bearer_auth(token)
            .json(&CancelFriendBody { to: to.clone() })
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
    pub async fn remove_friend(
        client: &Client,
        base: &str,
        token: &str,
        other: &UserId,
    ) -> Result<RemoveFriendOutcome> {
        Ok(client
            .post(String::from(base) + "/friends/remove")
            .bearer_auth(token)
            .json(&RemoveFriendBody {
                other: other.clone(),
            })
            .send()
            .await?
            .error_for_status()?
            .json::<_>()
            .await?)
    }
    pub async fn create_post(client: &Client, base: &str, token: &str, body: &CreatePost) -> Result<Post> {
        Ok(client
            .post(String::from(base) + "/posts")
            .bearer_auth(token)
            .json(body)
            .send()
            .await?
            .error_for_status()?
            .json::<_>()
            .await?)
    }
    pub async fn get_post(client: &Client, base: &str, post: &str) -> Result<Post> {
        Ok(client
            .get(String::from(base) + "/posts/" + post)
            .send()
            .await?
            .error_for_status()?
            .json::<_>()
            .await?)
    }
    pub async fn list_posts(client: &Client, base: &str, tag: Option<&str>) -> Result<Vec<Post>> {
        let mut url = String::from(base) + "/posts";
        if let Some(tag) = tag {
            url += "?tag=";
            url += tag;
        }
        Ok(client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json::<_>()
            .await?)
    }
    pub async fn delete_post(client: &Client, base: &str, token: &str, post: &str) -> Result<()> {
        client
            .delete(String::from(base) + "/posts/" + post)
            .bearer_auth(token)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
    pub async fn add_comment(
        client: &Client,
        base: &str,
        token: &str,
        post: &str,
        body: &str,
    ) -> Result<Comment> {
        Ok(client
            .post(String::from(base) + "/posts/" + post + "/comments")
            .bearer_auth(token)
            .json(&CreateComment {
                body: String::from(body),
            })
            .send()
            .await?
            .error_for_status()?
            .json::<_>()
            .await?)
    }
    pub async fn list_comments(client: &Client, base: &str, post: &str) -> Result<Vec<Comment>> {
        Ok(client
            .get(String::from(base) + "/posts/" + post + "/comments")
            .send()
            .await?
            .error_for_status()?
            .json::<_>()
            .await?)
    }
    pub async fn request_interest(client: &Client, base: &str, token: &str, post: &str) -> Result<()> {
        client
            .post(String::from(base) + "/posts/" + post + "/interest")
            .bearer_auth(token)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
    pub async fn accept_interest(
        client: &Client,
        base: &str,
        token: &str,
        post: &str,
        user: &UserId,
    ) -> Result<()> {
        client
            .post(String::from(base) + "/posts/" + post + "/interested/" + &user.0 + "/accept")
            .bearer_auth(token)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
    pub async fn reject_interest(
        client: &Client,
        base: &str,
        token: &str,
        post: &str,
        user: &UserId,
    ) -> Result<()> {
        client
            .post(String::from(base) + "/posts/" + post + "/interested/" + &user.0 + "/reject")
            .bearer_auth(token)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
    pub async fn remove_confirmed(
        client: &Client,
        base: &str,
        token: &str,
        post: &str,
        user: &UserId,
    ) -> Result<RemoveConfirmedOutcome> {
        Ok(client
            .delete(String::from(base) + "/posts/" + post + "/confirmed/" + &user.0)
            .bearer_auth(token)
            .send()
            .await?
            .error_for_status()?
            .json::<_>()
            .await?)
    }
    pub async fn send_message(
        client: &Client,
        base: &str,
        token: &str,
        peer: &UserId,
        body: &str,
    ) -> Result<ChatMessage> {
        Ok(client
            .post(String::from(base) + "/chat/" + &peer.0 + "/messages")
            .bearer_auth(token)
            .json(&SendMessageBody {
                body: String::from(body),
            })
            .send()
            .await?
            .error_for_status()?
            .json::<_>()
            .await?)
    }
    pub async fn list_messages(
        client: &Client,
        base: &str,
        token: &str,
        peer: &UserId,
    ) -> Result<Vec<ChatMessage>> {
        Ok(client
            .get(String::from(base) + "/chat/" + &peer.0 + "/messages")
            .bearer_auth(token)
            .send()
            .await?
            .error_for_status()?
            .json::<_>()
            .await?)
    }
    pub async fn request_password_reset(client: &Client, base: &str, username: &str) -> Result<PasswordResetCode> {
        Ok(client
            .post(String::from(base) + "/password-reset/request")
            .json(&PasswordResetRequest {
                username: String::from(username),
            })
            .send()
            .await?
            .error_for_status()?
            .json::<_>()
            .await?)
    }
    pub async fn confirm_password_reset(client: &Client, base: &str, code: &str, new_password: &str) -> Result<()> {
        client
            .post(String::from(base) + "/password-reset/confirm")
            .json(&PasswordResetConfirm {
                code: String::from(code),
                new_password: String::from(new_password),
            })
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

pub struct ServerRunner(Vec<Child>);
impl ServerRunner {
    pub fn new(servers: Vec<Child>) -> Self {
        Self(servers)
    }
}
impl Drop for ServerRunner {
    fn drop(&mut self) {
        for server in &mut self.0 {
            server.kill().unwrap()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::client::*;
    use super::ServerRunner;
    use gather_common::{
        CreatePost, CreateUser, FriendAcceptOutcome, FriendRequestBody, RemoveConfirmedOutcome,
        RemoveFriendOutcome, UserId,
    };
    use reqwest::{Client, StatusCode};
    use std::process::Command;
    use std::time::Duration;

    const BASE: &str = "http://127.0.0.1:8461";

    #[test]
    fn full_flow() {
        let server = Command::new("cargo")
            .arg("run")
            .arg("-p")
            .arg("gather-server")
            .arg("--")
            .arg("8461")
            .spawn()
            .unwrap();
        tokio::runtime::Runtime::new()
            .unwrap()
            .block_on(wrapper(ServerRunner::new(vec![server])));
    }

    async fn wrapper(server_runner: ServerRunner) {
        actual_test().await.unwrap();
        drop(server_runner);
    }

    async fn wait_for_server(client: &Client) {
        // The spawned `cargo run` may have to build first.
        for _ in 0..600 {
            if let Ok(resp) = client.get(BASE).send().await {
                if resp.status().is_success() {
                    return;
                }
            }
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
        panic!("server did not come up on {}", BASE);
    }

    async fn actual_test() -> anyhow::Result<()> {
        let client = Client::new();
        wait_for_server(&client).await;

        for name in ["alice", "bob", "carol", "dave", "eve"] {
            create_user(
                &client,
                BASE,
                &CreateUser {
                    username: String::from(name),
                    password: String::from(name),
                    bio: None,
                },
            )
            .await?;
        }
        let alice = UserId::new("alice");
        let bob = UserId::new("bob");
        let dave = UserId::new("dave");
        let eve = UserId::new("eve");
        let alice_token = login(&client, BASE, "alice", "alice").await?.token;
        let bob_token = login(&client, BASE, "bob", "bob").await?.token;
        let carol_token = login(&client, BASE, "carol", "carol").await?.token;
        let dave_token = login(&client, BASE, "dave", "dave").await?.token;
        let eve_token = login(&client, BASE, "eve", "eve").await?.token;

        // Friend lifecycle.
        send_friend_request(&client, BASE, &alice_token, &bob).await?;
        assert_eq!(outgoing_requests(&client, BASE, &alice_token).await?, vec![bob.clone()]);
        assert_eq!(incoming_requests(&client, BASE, &bob_token).await?, vec![alice.clone()]);

        // A mutual request collapses to the one already pending.
        let resp = client
            .post(String::from(BASE) + "/friends/request")
            .bearer_auth(&bob_token)
            .json(&FriendRequestBody { to: alice.clone() })
            .send()
            .await?;
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let outcome = accept_friend_request(&client, BASE, &bob_token, &alice).await?;
        assert_eq!(outcome, FriendAcceptOutcome::Accepted);
        assert_eq!(get_friends(&client, BASE, &alice).await?, vec![bob.clone()]);
        assert_eq!(get_friends(&client, BASE, &bob).await?, vec![alice.clone()]);
        assert!(incoming_requests(&client, BASE, &bob_token).await?.is_empty());
        assert!(outgoing_requests(&client, BASE, &alice_token).await?.is_empty());

        assert_eq!(
            remove_friend(&client, BASE, &alice_token, &bob).await?,
            RemoveFriendOutcome::Removed
        );
        assert!(get_friends(&client, BASE, &alice).await?.is_empty());
        assert!(get_friends(&client, BASE, &bob).await?.is_empty());
        assert_eq!(
            remove_friend(&client, BASE, &alice_token, &bob).await?,
            RemoveFriendOutcome::NotFriends
        );

        send_friend_request(&client, BASE, &alice_token, &bob).await?;
        reject_friend_request(&client, BASE, &bob_token, &alice).await?;
        assert!(outgoing_requests(&client, BASE, &alice_token).await?.is_empty());
        assert!(incoming_requests(&client, BASE, &bob_token).await?.is_empty());

        send_friend_request(&client, BASE, &alice_token, &bob).await?;
        cancel_friend_request(&client, BASE, &alice_token, &bob).await?;
        assert!(incoming_requests(&client, BASE, &bob_token).await?.is_empty());

        // Engagement pipeline on carol's post.
        let post = create_post(
            &client,
            BASE,
            &carol_token,
            &CreatePost {
                title: String::from("picnic at the lake"),
                body: String::from("bring snacks"),
                tags: vec![String::from("food")],
            },
        )
        .await?;
        let post_id = post.id.0.clone();

        request_interest(&client, BASE, &dave_token, &post_id).await?;

        // The owner cannot request the own post.
        let resp = client
            .post(String::from(BASE) + "/posts/" + &post_id + "/interest")
            .bearer_auth(&carol_token)
            .send()
            .await?;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        // Only the owner (or an admin) accepts.
        let resp = client
            .post(String::from(BASE) + "/posts/" + &post_id + "/interested/dave/accept")
            .bearer_auth(&eve_token)
            .send()
            .await?;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        accept_interest(&client, BASE, &carol_token, &post_id, &dave).await?;
        let fetched = get_post(&client, BASE, &post_id).await?;
        assert_eq!(fetched.confirmed_users, vec![dave.clone()]);
        assert!(fetched.interested_users.is_empty());
        let profile = get_user(&client, BASE, &dave).await?;
        assert_eq!(profile.reminder_posts, vec![post.id.clone()]);
        assert!(profile.requested_posts.is_empty());

        request_interest(&client, BASE, &eve_token, &post_id).await?;
        reject_interest(&client, BASE, &carol_token, &post_id, &eve).await?;
        let fetched = get_post(&client, BASE, &post_id).await?;
        assert!(fetched.interested_users.is_empty());
        assert_eq!(fetched.confirmed_users, vec![dave.clone()]);
        assert!(get_user(&client, BASE, &eve).await?.requested_posts.is_empty());

        assert_eq!(
            remove_confirmed(&client, BASE, &carol_token, &post_id, &dave).await?,
            RemoveConfirmedOutcome::Removed
        );
        assert_eq!(
            remove_confirmed(&client, BASE, &carol_token, &post_id, &dave).await?,
            RemoveConfirmedOutcome::NotConfirmed
        );
        assert!(get_user(&client, BASE, &dave).await?.reminder_posts.is_empty());

        // Deleting a confirmed user repairs the post and nothing else.
        request_interest(&client, BASE, &dave_token, &post_id).await?;
        accept_interest(&client, BASE, &carol_token, &post_id, &dave).await?;
        delete_user(&client, BASE, &dave_token, &dave).await?;
        let fetched = get_post(&client, BASE, &post_id).await?;
        assert!(fetched.confirmed_users.is_empty());

        // Deleting a post clears every attendee's reminder list.
        let second = create_post(
            &client,
            BASE,
            &carol_token,
            &CreatePost {
                title: String::from("billiards night"),
                body: String::from("first table is on me"),
                tags: vec![],
            },
        )
        .await?;
        request_interest(&client, BASE, &eve_token, &second.id.0).await?;
        accept_interest(&client, BASE, &carol_token, &second.id.0, &eve).await?;
        delete_post(&client, BASE, &carol_token, &second.id.0).await?;
        assert!(get_user(&client, BASE, &eve).await?.reminder_posts.is_empty());

        // Comments and the tag filter.
        add_comment(&client, BASE, &alice_token, &post_id, "looks fun").await?;
        let comments = list_comments(&client, BASE, &post_id).await?;
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].author, alice);
        let tagged = list_posts(&client, BASE, Some("food")).await?;
        assert_eq!(tagged.len(), 1);
        assert_eq!(tagged[0].id, post.id);

        // Private chat converges on one room from both directions.
        let resp = client
            .get(String::from(BASE) + "/chat/eve/messages")
            .bearer_auth(&alice_token)
            .send()
            .await?;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let first = send_message(&client, BASE, &alice_token, &bob, "hi bob").await?;
        let second = send_message(&client, BASE, &bob_token, &alice, "hi alice").await?;
        assert_eq!(first.room, second.room);
        let history = list_messages(&client, BASE, &bob_token, &alice).await?;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].body, "hi bob");
        assert_eq!(history[1].body, "hi alice");

        // Password reset: one-time code, old sessions stop resolving.
        let code = request_password_reset(&client, BASE, "bob").await?.code;
        confirm_password_reset(&client, BASE, &code, "swordfish").await?;
        login(&client, BASE, "bob", "swordfish").await?;
        let resp = client
            .get(String::from(BASE) + "/friends/requests")
            .bearer_auth(&bob_token)
            .send()
            .await?;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        Ok(())
    }
}
