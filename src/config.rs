//! Configuration management for Vinylshelf.
//!
//! Values come from environment variables, optionally seeded from a `.env`
//! file in the local data directory. Priority is:
//! 1. Environment variables
//! 2. `.env` file in the local data directory
//! 3. Defaults pointing at the public Spotify endpoints

use std::{env, path::PathBuf, time::Duration};

use crate::{Error, Res};

pub const DEFAULT_AUTH_URL: &str = "https://accounts.spotify.com/authorize";
pub const DEFAULT_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
pub const DEFAULT_API_URL: &str = "https://api.spotify.com/v1";
pub const DEFAULT_SERVER_ADDRESS: &str = "127.0.0.1:8888";
pub const DEFAULT_REDIRECT_URI: &str = "http://127.0.0.1:8888/callback";
pub const DEFAULT_SCOPE: &str =
    "user-library-read user-read-playback-state user-modify-playback-state";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Loads environment variables from `vinylshelf/.env` in the local data
/// directory.
///
/// The directory is created if needed. A missing `.env` file is not an error,
/// the process environment alone is then used.
///
/// # Directory Structure
///
/// - Linux: `~/.local/share/vinylshelf/.env`
/// - macOS: `~/Library/Application Support/vinylshelf/.env`
/// - Windows: `%LOCALAPPDATA%/vinylshelf/.env`
pub async fn load_env() -> Res<()> {
    let path = data_dir().join(".env");
    if let Some(parent) = path.parent() {
        async_fs::create_dir_all(parent)
            .await
            .map_err(|e| Error::Config(e.to_string()))?;
    }

    match dotenv::from_path(&path) {
        Ok(()) => Ok(()),
        Err(dotenv::Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::Config(format!(
            "cannot read {}: {}",
            path.display(),
            e
        ))),
    }
}

/// Root of everything Vinylshelf keeps on disk.
pub fn data_dir() -> PathBuf {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("vinylshelf");
    path
}

/// Typed view of the environment.
#[derive(Debug, Clone)]
pub struct Settings {
    pub client_id: String,
    pub redirect_uri: String,
    pub scope: String,
    pub auth_url: String,
    pub token_url: String,
    pub api_url: String,
    pub server_address: String,
    pub http_timeout: Duration,
}

impl Settings {
    /// Reads settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `VINYLSHELF_CLIENT_ID` is missing or the
    /// timeout is not a whole number of seconds.
    pub fn from_env() -> Res<Self> {
        let client_id = env::var("VINYLSHELF_CLIENT_ID")
            .map_err(|_| Error::Config("VINYLSHELF_CLIENT_ID must be set".to_string()))?;

        let http_timeout = match env::var("VINYLSHELF_HTTP_TIMEOUT_SECS") {
            Ok(raw) => raw.trim().parse::<u64>().map_err(|_| {
                Error::Config(format!("VINYLSHELF_HTTP_TIMEOUT_SECS is not a number: {raw}"))
            })?,
            Err(_) => DEFAULT_HTTP_TIMEOUT_SECS,
        };

        Ok(Self {
            client_id,
            redirect_uri: var_or("VINYLSHELF_REDIRECT_URI", DEFAULT_REDIRECT_URI),
            scope: var_or("VINYLSHELF_SCOPE", DEFAULT_SCOPE),
            auth_url: var_or("VINYLSHELF_AUTH_URL", DEFAULT_AUTH_URL),
            token_url: var_or("VINYLSHELF_TOKEN_URL", DEFAULT_TOKEN_URL),
            api_url: var_or("VINYLSHELF_API_URL", DEFAULT_API_URL),
            server_address: var_or("VINYLSHELF_SERVER_ADDRESS", DEFAULT_SERVER_ADDRESS),
            http_timeout: Duration::from_secs(http_timeout),
        })
    }

    /// Settings with Spotify defaults for everything except the client id.
    pub fn with_client_id(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
            scope: DEFAULT_SCOPE.to_string(),
            auth_url: DEFAULT_AUTH_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            server_address: DEFAULT_SERVER_ADDRESS.to_string(),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        }
    }

    /// Builds the HTTP client shared by the authorizer and the gateway.
    pub fn http_client(&self) -> Res<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.http_timeout)
            .build()
            .map_err(Error::from)
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_client_id_uses_spotify_defaults() {
        let settings = Settings::with_client_id("abc");
        assert_eq!(settings.client_id, "abc");
        assert_eq!(settings.api_url, DEFAULT_API_URL);
        assert_eq!(settings.token_url, DEFAULT_TOKEN_URL);
        assert_eq!(settings.http_timeout, Duration::from_secs(30));
    }

    #[test]
    fn data_dir_ends_with_crate_name() {
        assert!(data_dir().ends_with("vinylshelf"));
    }
}
