use std::{collections::HashMap, sync::Arc};

use axum::{Extension, extract::Query, response::Html};
use tokio::sync::Mutex;

use crate::spotify::Authorizer;

/// How the redirect ended: `Ok` once tokens are stored, otherwise the reason.
pub type LoginOutcome = Result<(), String>;

/// Shared between the callback handler and whoever waits for the login.
#[derive(Clone)]
pub struct CallbackState {
    pub authorizer: Arc<Authorizer>,
    pub outcome: Arc<Mutex<Option<LoginOutcome>>>,
}

impl CallbackState {
    pub fn new(authorizer: Arc<Authorizer>) -> Self {
        Self {
            authorizer,
            outcome: Arc::new(Mutex::new(None)),
        }
    }

    pub async fn outcome(&self) -> Option<LoginOutcome> {
        self.outcome.lock().await.clone()
    }
}

/// `GET /callback?code=...` (or `?error=...` when the user declined).
pub async fn callback(
    Query(params): Query<HashMap<String, String>>,
    Extension(state): Extension<CallbackState>,
) -> Html<&'static str> {
    let (outcome, page) = if let Some(code) = params.get("code") {
        match state.authorizer.complete_login(code).await {
            Ok(_) => (
                Ok(()),
                Html("<h2>Authentication successful.</h2><p>Close this browser window.</p>"),
            ),
            Err(e) => {
                log::warn!("token exchange failed: {e}");
                (Err(e.to_string()), Html("<h4>Login failed.</h4>"))
            }
        }
    } else if let Some(error) = params.get("error") {
        (
            Err(format!("authorization denied: {error}")),
            Html("<h4>Authorization was denied.</h4>"),
        )
    } else {
        (
            Err("callback without code".to_string()),
            Html("<h4>Missing authorization code.</h4>"),
        )
    };

    *state.outcome.lock().await = Some(outcome);
    page
}
