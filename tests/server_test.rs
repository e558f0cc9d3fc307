mod common;

use std::sync::Arc;

use tokio::net::TcpListener;
use vinylshelf::{
    api::CallbackState, management::CredentialStore, server, spotify::AuthState,
};

use common::MockProvider;

async fn serve(state: CallbackState) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, server::router(state)).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn callback_completes_login() {
    let provider = MockProvider::start().await;
    let (store, auth, _) = provider.client(None).await;
    let state = CallbackState::new(Arc::clone(&auth));
    let base = serve(state.clone()).await;

    auth.begin_login().await.unwrap();
    let page = reqwest::get(format!("{base}/callback?code=abc"))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    assert!(page.contains("Authentication successful"));
    assert_eq!(state.outcome().await, Some(Ok(())));
    assert_eq!(auth.state().await, AuthState::Authorized);
    assert_eq!(store.read().await.unwrap().unwrap().access_token, "access-1");
    assert_eq!(provider.token_forms().await[0]["code"], "abc");
}

#[tokio::test]
async fn callback_without_pending_login_fails() {
    let provider = MockProvider::start().await;
    let (_, auth, _) = provider.client(None).await;
    let state = CallbackState::new(auth);
    let base = serve(state.clone()).await;

    reqwest::get(format!("{base}/callback?code=abc")).await.unwrap();

    let outcome = state.outcome().await.unwrap();
    assert!(outcome.unwrap_err().contains("retry login"));
    assert_eq!(provider.token_calls(), 0);
}

#[tokio::test]
async fn denied_authorization_is_reported() {
    let provider = MockProvider::start().await;
    let (_, auth, _) = provider.client(None).await;
    let state = CallbackState::new(auth);
    let base = serve(state.clone()).await;

    reqwest::get(format!("{base}/callback?error=access_denied"))
        .await
        .unwrap();

    let outcome = state.outcome().await.unwrap();
    assert!(outcome.unwrap_err().contains("access_denied"));
}

#[tokio::test]
async fn health_reports_version() {
    let provider = MockProvider::start().await;
    let (_, auth, _) = provider.client(None).await;
    let base = serve(CallbackState::new(auth)).await;

    let body: serde_json::Value = reqwest::get(format!("{base}/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "vinylshelf");
}
