//! # Spotify Integration Module
//!
//! Everything that talks to the Spotify accounts service and Web API.
//!
//! ```text
//! Front end (CLI, callback server)
//!          ↓
//! Library sync / Player
//!          ↓
//! Gateway (bearer token, refresh-and-retry once)
//!          ↓
//! Authorizer (PKCE login, refresh) ── CredentialStore
//! ```
//!
//! ## Modules
//!
//! - [`auth`] - OAuth 2.0 PKCE grant: login, code exchange, proactive and
//!   reactive refresh. Refreshes are serialized behind one gate.
//! - [`gateway`] - Single choke point for API calls. `401` and `403` get one
//!   refresh and one retry; `204` is `None`, not an error.
//! - [`library`] - Paginated saved-track scan with album deduplication and
//!   release-decade buckets that are declared ready as soon as the saved
//!   dates prove them complete.
//! - [`player`] - Playback control for the active device.
//!
//! ## API Coverage
//!
//! - `POST /api/token` - Code exchange and refresh
//! - `GET /me/tracks` - Saved tracks, 50 per page
//! - `PUT /me/player/play`, `PUT /me/player/pause`
//! - `POST /me/player/next`, `POST /me/player/previous`
//! - `GET /me/player/currently-playing`

pub mod auth;
pub mod gateway;
pub mod library;
pub mod player;

pub use auth::{AuthState, Authorizer};
pub use gateway::{Gateway, RequestOptions};
pub use library::{LibraryScan, LibrarySnapshot, LibrarySync, SyncEvent};
pub use player::Player;
