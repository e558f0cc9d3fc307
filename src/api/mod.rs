//! # API Module
//!
//! HTTP endpoints of the local server that receives the OAuth redirect.
//!
//! - [`callback`] - Completes the PKCE login with the returned code
//! - [`health`] - Status and version for a quick liveness check
//!
//! ```rust,ignore
//! use axum::{Router, routing::get};
//! use vinylshelf::api::{callback, health};
//!
//! let app = Router::new()
//!     .route("/callback", get(callback))
//!     .route("/health", get(health));
//! ```

mod callback;
mod health;

pub use callback::{CallbackState, LoginOutcome, callback};
pub use health::health;
