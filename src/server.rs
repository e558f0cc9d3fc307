use std::{net::SocketAddr, str::FromStr};

use axum::{Extension, Router, routing::get};

use crate::{Error, Res, api, api::CallbackState};

pub fn router(state: CallbackState) -> Router {
    Router::new()
        .route("/health", get(api::health))
        .route("/callback", get(api::callback).layer(Extension(state)))
}

/// Serves the callback router on the configured address until the task is
/// dropped.
pub async fn start_api_server(address: &str, state: CallbackState) -> Res<()> {
    let addr = SocketAddr::from_str(address)
        .map_err(|e| Error::Config(format!("invalid server address {address}: {e}")))?;

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    log::debug!("callback server listening on {addr}");
    axum::serve(listener, router(state)).await?;
    Ok(())
}
