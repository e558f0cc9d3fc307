//! # CLI Module
//!
//! Thin terminal front end over the library. Each command builds a
//! [`Session`] from the environment, calls into [`crate::spotify`], and maps
//! failures to a message for the user.
//!
//! ## Commands
//!
//! - [`auth`] / [`logout`] - PKCE login through the browser, forget tokens
//! - [`library`] - Full saved-track scan with progress, albums per decade
//! - [`play`], [`resume`], [`pause`], [`next`], [`previous`], [`now_playing`] - Playback
//!
//! ## Usage
//!
//! ```bash
//! vinylshelf auth
//! vinylshelf library --decade 1990s
//! vinylshelf play spotify:album:6dVIqQ8qmQ5GBnJ9shOYGE
//! ```

mod auth;
mod library;
mod player;

use std::sync::Arc;

use crate::{
    Error,
    config::Settings,
    error,
    management::FileCredentialStore,
    spotify::{Authorizer, Gateway},
};

pub use auth::auth;
pub use auth::logout;
pub use library::library;
pub use player::next;
pub use player::now_playing;
pub use player::pause;
pub use player::play;
pub use player::previous;
pub use player::resume;

/// Settings plus the wired-up authorizer and gateway.
pub struct Session {
    pub settings: Settings,
    pub authorizer: Arc<Authorizer>,
    pub gateway: Arc<Gateway>,
}

impl Session {
    /// Builds a session backed by the on-disk credential store. Exits the
    /// program on configuration or store errors.
    pub async fn open() -> Self {
        let settings = match Settings::from_env() {
            Ok(s) => s,
            Err(e) => error!("{}", e),
        };

        let store = match FileCredentialStore::open_default().await {
            Ok(s) => Arc::new(s),
            Err(e) => error!("Cannot open credential store: {}", e),
        };

        let authorizer = match Authorizer::new(settings.clone(), store).await {
            Ok(a) => Arc::new(a),
            Err(e) => error!("Cannot initialize authorization: {}", e),
        };

        let gateway = match Gateway::new(&settings, Arc::clone(&authorizer)) {
            Ok(g) => Arc::new(g),
            Err(e) => error!("Cannot initialize API client: {}", e),
        };

        Self {
            settings,
            authorizer,
            gateway,
        }
    }
}

/// Prints a user-facing message for `err` and exits.
pub(crate) fn fail(err: Error) -> ! {
    match err {
        e if e.requires_login() => error!("{}. Run vinylshelf auth.", e),
        Error::AccessDenied(message) => error!(
            "Spotify refused the request: {}. Check that the app was granted the required scopes.",
            message
        ),
        e => error!("{}", e),
    }
}
