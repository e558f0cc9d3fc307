//! In-process stand-in for the Spotify accounts service and Web API.

#![allow(dead_code)]

use std::{
    collections::{HashMap, VecDeque},
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use axum::{
    Form, Router,
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, Method, StatusCode, Uri, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{Duration, Utc};
use serde_json::{Value, json};
use tokio::{net::TcpListener, sync::Mutex};

use vinylshelf::{
    config::Settings,
    management::MemoryCredentialStore,
    spotify::{Authorizer, Gateway},
    types::Credential,
};

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub body: String,
}

#[derive(Default)]
pub struct MockState {
    pub api_calls: AtomicUsize,
    pub token_calls: AtomicUsize,
    pub page_requests: AtomicUsize,
    pub requests: Mutex<Vec<RecordedRequest>>,
    pub token_forms: Mutex<Vec<HashMap<String, String>>>,
    /// Consumed front to back by every non-library API call; empty means 200 `{}`.
    pub api_script: Mutex<VecDeque<(StatusCode, String)>>,
    /// Consumed by the token endpoint; empty means a fresh token.
    pub token_script: Mutex<VecDeque<(StatusCode, String)>>,
    pub library: Vec<Value>,
    /// API calls carrying this bearer get a 401 before the script is consulted.
    pub rejected_bearer: Mutex<Option<String>>,
    pub tracks_no_content: AtomicBool,
}

pub struct MockProvider {
    pub state: Arc<MockState>,
    pub base: String,
}

impl MockProvider {
    pub async fn start() -> Self {
        Self::with_library(Vec::new()).await
    }

    pub async fn with_library(library: Vec<Value>) -> Self {
        let state = Arc::new(MockState {
            library,
            ..Default::default()
        });

        let app = Router::new()
            .route("/api/token", post(token))
            .route("/v1/me/tracks", get(saved_tracks))
            .fallback(scripted)
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            state,
            base: format!("http://{addr}"),
        }
    }

    pub fn settings(&self) -> Settings {
        Settings {
            auth_url: format!("{}/authorize", self.base),
            token_url: format!("{}/api/token", self.base),
            api_url: format!("{}/v1", self.base),
            redirect_uri: "http://127.0.0.1:8888/callback".to_string(),
            ..Settings::with_client_id("test-client")
        }
    }

    pub async fn script_api(&self, status: StatusCode, body: &str) {
        self.state
            .api_script
            .lock()
            .await
            .push_back((status, body.to_string()));
    }

    pub async fn script_token(&self, status: StatusCode, body: Value) {
        self.state
            .token_script
            .lock()
            .await
            .push_back((status, body.to_string()));
    }

    /// Answers every API call made with `token` with a 401.
    pub async fn reject_bearer(&self, token: &str) {
        *self.state.rejected_bearer.lock().await = Some(format!("Bearer {token}"));
    }

    /// Makes `/me/tracks` answer 204 with no body.
    pub fn empty_saved_tracks(&self) {
        self.state.tracks_no_content.store(true, Ordering::SeqCst);
    }

    pub fn api_calls(&self) -> usize {
        self.state.api_calls.load(Ordering::SeqCst)
    }

    pub fn token_calls(&self) -> usize {
        self.state.token_calls.load(Ordering::SeqCst)
    }

    pub fn page_requests(&self) -> usize {
        self.state.page_requests.load(Ordering::SeqCst)
    }

    pub async fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().await.clone()
    }

    pub async fn token_forms(&self) -> Vec<HashMap<String, String>> {
        self.state.token_forms.lock().await.clone()
    }

    /// Authorizer and gateway over a memory store holding `credential`.
    pub async fn client(
        &self,
        credential: Option<Credential>,
    ) -> (Arc<MemoryCredentialStore>, Arc<Authorizer>, Arc<Gateway>) {
        let store = Arc::new(match credential {
            Some(c) => MemoryCredentialStore::with_credential(c),
            None => MemoryCredentialStore::new(),
        });
        let settings = self.settings();
        let authorizer = Arc::new(
            Authorizer::new(settings.clone(), store.clone())
                .await
                .unwrap(),
        );
        let gateway = Arc::new(Gateway::new(&settings, Arc::clone(&authorizer)).unwrap());
        (store, authorizer, gateway)
    }
}

/// A credential valid for the next hour.
pub fn fresh_credential() -> Credential {
    credential_expiring_in(3600)
}

pub fn credential_expiring_in(secs: i64) -> Credential {
    let expires_at = Utc::now() + Duration::seconds(secs);
    // The stores keep millisecond precision.
    let expires_at =
        chrono::DateTime::from_timestamp_millis(expires_at.timestamp_millis()).unwrap();
    Credential {
        access_token: "stored-access".to_string(),
        refresh_token: Some("stored-refresh".to_string()),
        expires_at,
    }
}

/// One `/me/tracks` item.
pub fn saved_item(track_id: &str, album_id: &str, release_date: &str, added_at: &str) -> Value {
    json!({
        "added_at": added_at,
        "track": {
            "id": track_id,
            "name": format!("Track {track_id}"),
            "duration_ms": 200_000,
            "album": {
                "id": album_id,
                "name": format!("Album {album_id}"),
                "artists": [{ "name": "First Artist" }, { "name": "Second Artist" }],
                "images": [
                    { "url": format!("https://img/{album_id}/640") },
                    { "url": format!("https://img/{album_id}/64") }
                ],
                "release_date": release_date,
                "total_tracks": 10,
                "uri": format!("spotify:album:{album_id}")
            }
        }
    })
}

/// `n` items, newest saved first, two tracks per album.
pub fn library_of(n: usize) -> Vec<Value> {
    (0..n)
        .map(|i| {
            let added = Utc::now() - Duration::days(i as i64);
            saved_item(
                &format!("t{i}"),
                &format!("a{}", i / 2),
                "2015-06-01",
                &added.to_rfc3339(),
            )
        })
        .collect()
}

async fn token(
    State(state): State<Arc<MockState>>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let n = state.token_calls.fetch_add(1, Ordering::SeqCst) + 1;
    state.token_forms.lock().await.push(form);

    match state.token_script.lock().await.pop_front() {
        Some((status, body)) => json_response(status, body),
        None => json_response(
            StatusCode::OK,
            json!({
                "access_token": format!("access-{n}"),
                "token_type": "Bearer",
                "scope": "user-library-read",
                "expires_in": 3600
            })
            .to_string(),
        ),
    }
}

async fn saved_tracks(
    State(state): State<Arc<MockState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    state.page_requests.fetch_add(1, Ordering::SeqCst);
    if state.tracks_no_content.load(Ordering::SeqCst) {
        return StatusCode::NO_CONTENT.into_response();
    }

    let limit: usize = params.get("limit").and_then(|v| v.parse().ok()).unwrap_or(20);
    let offset: usize = params.get("offset").and_then(|v| v.parse().ok()).unwrap_or(0);
    let total = state.library.len();
    let end = (offset + limit).min(total);
    let items: Vec<Value> = if offset < total {
        state.library[offset..end].to_vec()
    } else {
        Vec::new()
    };

    json_response(
        StatusCode::OK,
        json!({
            "items": items,
            "total": total,
            "limit": limit,
            "offset": offset,
            "next": null
        })
        .to_string(),
    )
}

async fn scripted(
    State(state): State<Arc<MockState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    state.api_calls.fetch_add(1, Ordering::SeqCst);
    let authorization = header_value(&headers, header::AUTHORIZATION);
    state.requests.lock().await.push(RecordedRequest {
        method,
        path: uri.path().to_string(),
        authorization: authorization.clone(),
        content_type: header_value(&headers, header::CONTENT_TYPE),
        body: String::from_utf8_lossy(&body).to_string(),
    });

    if authorization.is_some() && *state.rejected_bearer.lock().await == authorization {
        return json_response(
            StatusCode::UNAUTHORIZED,
            json!({ "error": { "status": 401, "message": "The access token expired" } })
                .to_string(),
        );
    }

    match state.api_script.lock().await.pop_front() {
        Some((StatusCode::NO_CONTENT, _)) => StatusCode::NO_CONTENT.into_response(),
        Some((status, body)) => json_response(status, body),
        None => json_response(StatusCode::OK, "{}".to_string()),
    }
}

fn header_value(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn json_response(status: StatusCode, body: String) -> Response {
    (status, [(header::CONTENT_TYPE, "application/json")], body).into_response()
}
