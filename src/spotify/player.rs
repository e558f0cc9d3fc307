use std::sync::Arc;

use reqwest::Method;
use serde_json::json;

use crate::{
    Res,
    spotify::{Gateway, RequestOptions},
    types::CurrentlyPlaying,
};

/// Playback control on the user's active device.
///
/// All calls go through the [`Gateway`]; the player endpoints answer with
/// `204` on success, so most of these return `()`.
#[derive(Clone)]
pub struct Player {
    gateway: Arc<Gateway>,
}

impl Player {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }

    /// Starts playing an album (or playlist) by its `spotify:` URI.
    pub async fn play_context(&self, context_uri: &str) -> Res<()> {
        let options =
            RequestOptions::method(Method::PUT).json(json!({ "context_uri": context_uri }));
        self.gateway.request("/me/player/play", options).await?;
        Ok(())
    }

    /// Resumes whatever was playing.
    pub async fn resume(&self) -> Res<()> {
        self.gateway
            .request("/me/player/play", RequestOptions::method(Method::PUT))
            .await?;
        Ok(())
    }

    /// Pauses playback. The provider answers `403` if nothing is playing.
    pub async fn pause(&self) -> Res<()> {
        self.gateway
            .request("/me/player/pause", RequestOptions::method(Method::PUT))
            .await?;
        Ok(())
    }

    /// Skips to the next track in the queue.
    pub async fn next(&self) -> Res<()> {
        self.gateway
            .request("/me/player/next", RequestOptions::method(Method::POST))
            .await?;
        Ok(())
    }

    /// Goes back to the previous track.
    pub async fn previous(&self) -> Res<()> {
        self.gateway
            .request("/me/player/previous", RequestOptions::method(Method::POST))
            .await?;
        Ok(())
    }

    /// `None` when nothing is playing.
    pub async fn currently_playing(&self) -> Res<Option<CurrentlyPlaying>> {
        self.gateway
            .fetch("/me/player/currently-playing", RequestOptions::get())
            .await
    }
}
