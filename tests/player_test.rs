mod common;

use axum::http::StatusCode;
use reqwest::Method;
use vinylshelf::{Error, spotify::Player};

use common::{MockProvider, fresh_credential};

#[tokio::test]
async fn play_context_puts_context_uri() {
    let provider = MockProvider::start().await;
    provider.script_api(StatusCode::NO_CONTENT, "").await;
    let (_, _, gateway) = provider.client(Some(fresh_credential())).await;

    Player::new(gateway).play_context("spotify:album:abc").await.unwrap();

    let requests = provider.requests().await;
    assert_eq!(requests[0].method, Method::PUT);
    assert_eq!(requests[0].path, "/v1/me/player/play");
    assert!(requests[0].body.contains("spotify:album:abc"));
}

#[tokio::test]
async fn transport_controls_hit_their_endpoints() {
    let provider = MockProvider::start().await;
    for _ in 0..4 {
        provider.script_api(StatusCode::NO_CONTENT, "").await;
    }
    let (_, _, gateway) = provider.client(Some(fresh_credential())).await;
    let player = Player::new(gateway);

    player.resume().await.unwrap();
    player.pause().await.unwrap();
    player.next().await.unwrap();
    player.previous().await.unwrap();

    let calls: Vec<(Method, String)> = provider
        .requests()
        .await
        .into_iter()
        .map(|r| (r.method, r.path))
        .collect();
    assert_eq!(
        calls,
        vec![
            (Method::PUT, "/v1/me/player/play".to_string()),
            (Method::PUT, "/v1/me/player/pause".to_string()),
            (Method::POST, "/v1/me/player/next".to_string()),
            (Method::POST, "/v1/me/player/previous".to_string()),
        ]
    );
}

#[tokio::test]
async fn resume_sends_no_body() {
    let provider = MockProvider::start().await;
    provider.script_api(StatusCode::NO_CONTENT, "").await;
    let (_, _, gateway) = provider.client(Some(fresh_credential())).await;

    Player::new(gateway).resume().await.unwrap();

    let requests = provider.requests().await;
    assert_eq!(requests[0].path, "/v1/me/player/play");
    assert!(requests[0].body.is_empty());
}

#[tokio::test]
async fn nothing_playing_is_none() {
    let provider = MockProvider::start().await;
    provider.script_api(StatusCode::NO_CONTENT, "").await;
    let (_, _, gateway) = provider.client(Some(fresh_credential())).await;

    assert!(Player::new(gateway).currently_playing().await.unwrap().is_none());
}

#[tokio::test]
async fn currently_playing_decodes_item() {
    let provider = MockProvider::start().await;
    provider
        .script_api(
            StatusCode::OK,
            r#"{"is_playing":true,"progress_ms":1000,"item":{"name":"Song","uri":"spotify:track:1","duration_ms":180000,"artists":[{"name":"Band"}]}}"#,
        )
        .await;
    let (_, _, gateway) = provider.client(Some(fresh_credential())).await;

    let playing = Player::new(gateway).currently_playing().await.unwrap().unwrap();

    assert!(playing.is_playing);
    assert_eq!(playing.item.unwrap().artists[0].name, "Band");
}

#[tokio::test]
async fn no_active_device_is_an_api_error() {
    let provider = MockProvider::start().await;
    provider
        .script_api(
            StatusCode::NOT_FOUND,
            r#"{"error":{"status":404,"message":"Player command failed: No active device found","reason":"NO_ACTIVE_DEVICE"}}"#,
        )
        .await;
    let (_, _, gateway) = provider.client(Some(fresh_credential())).await;

    let result = Player::new(gateway).pause().await;

    assert!(matches!(result, Err(Error::Api { status: 404, .. })));
}
