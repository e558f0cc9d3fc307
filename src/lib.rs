//! Vinylshelf Library
//!
//! Core of a music browser for a Spotify saved-track library. It signs the
//! user in with the OAuth 2.0 PKCE flow, routes every Web API call through a
//! single authenticated gateway, and walks the saved-track collection page by
//! page while grouping albums into release decades.
//!
//! # Modules
//!
//! - `api` - HTTP endpoints for the local OAuth callback server
//! - `cli` - Command-line front end implementations
//! - `config` - Environment loading and typed settings
//! - `error` - Crate-wide error taxonomy
//! - `management` - Credential persistence
//! - `server` - Local HTTP server for OAuth callbacks
//! - `spotify` - Authorization, request gateway, library sync and playback
//! - `types` - Data structures and wire types
//! - `utils` - PKCE generation and small helpers
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use vinylshelf::{config::Settings, management::FileCredentialStore, spotify};
//!
//! #[tokio::main]
//! async fn main() -> vinylshelf::Res<()> {
//!     let settings = Settings::from_env()?;
//!     let store = Arc::new(FileCredentialStore::open_default().await?);
//!     let auth = Arc::new(spotify::Authorizer::new(settings.clone(), store).await?);
//!     let gateway = Arc::new(spotify::Gateway::new(&settings, auth)?);
//!     let snapshot = spotify::LibrarySync::new(gateway).collect().await?;
//!     println!("{} albums", snapshot.albums.len());
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod management;
pub mod server;
pub mod spotify;
pub mod types;
pub mod utils;

pub use error::Error;

/// Result alias used throughout the crate.
pub type Res<T> = std::result::Result<T, Error>;

/// Prints an informational message with a blue bullet point.
///
/// Accepts the same arguments as `println!`.
///
/// # Example
///
/// ```
/// info!("Opening browser for login...");
/// ```
#[macro_export]
macro_rules! info {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "o".blue().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a success message with a green checkmark.
#[macro_export]
macro_rules! success {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "✓".green().bold(), std::format_args!($($arg)*));
  })
}

/// Prints an error message with a red exclamation mark and exits the program.
///
/// Only meant for the binary front end, where a failure is terminal. Library
/// code returns [`Error`] instead.
#[macro_export]
macro_rules! error {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".red().bold(), std::format_args!($($arg)*));
    std::process::exit(1);
  })
}

/// Prints a warning message with a yellow exclamation mark.
#[macro_export]
macro_rules! warning {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".yellow().bold(), std::format_args!($($arg)*));
  })
}
