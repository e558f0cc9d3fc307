use std::time::{Duration, Instant};

use crate::{
    api::{CallbackState, LoginOutcome},
    cli::{Session, fail},
    error, info,
    server::start_api_server,
    success, warning,
};

const LOGIN_TIMEOUT: Duration = Duration::from_secs(120);

/// Runs the browser login and waits for the redirect to land on the local
/// callback server.
pub async fn auth(session: &Session) {
    let state = CallbackState::new(session.authorizer.clone());

    let server_state = state.clone();
    let address = session.settings.server_address.clone();
    let server = tokio::spawn(async move {
        if let Err(e) = start_api_server(&address, server_state).await {
            warning!("Callback server stopped: {}", e);
        }
    });

    let auth_url = match session.authorizer.begin_login().await {
        Ok(url) => url,
        Err(e) => fail(e),
    };

    if webbrowser::open(&auth_url).is_err() {
        warning!(
            "Failed to open browser. Please navigate to the following URL manually:\n{}",
            auth_url
        )
    }
    info!("Waiting for Spotify to redirect back...");

    let outcome = wait_for_login(&state).await;
    server.abort();

    match outcome {
        Some(Ok(())) => success!("Authentication successful!"),
        Some(Err(e)) => error!("Authentication failed: {}", e),
        None => error!("Authentication timed out."),
    }
}

pub async fn logout(session: &Session) {
    match session.authorizer.logout().await {
        Ok(()) => success!("Logged out, stored tokens removed."),
        Err(e) => fail(e),
    }
}

async fn wait_for_login(state: &CallbackState) -> Option<LoginOutcome> {
    let start = Instant::now();

    while start.elapsed() < LOGIN_TIMEOUT {
        if let Some(outcome) = state.outcome().await {
            return Some(outcome);
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
    }

    None
}
