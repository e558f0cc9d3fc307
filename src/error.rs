use thiserror::Error;

/// Failures surfaced by the authorization flow, the request gateway and the
/// library sync.
///
/// The front end is expected to map [`Error::SessionExpired`] and
/// [`Error::NotAuthenticated`] to a fresh login, and [`Error::AccessDenied`]
/// to a permissions message.
#[derive(Debug, Error)]
pub enum Error {
    /// `complete_login` was called without a preceding `begin_login`.
    #[error("missing PKCE code verifier, please retry login")]
    MissingVerifier,

    /// The token endpoint rejected the authorization code.
    #[error("token exchange failed: {0}")]
    TokenExchangeFailed(String),

    #[error("no refresh token stored")]
    NoRefreshToken,

    /// The stored grant is no longer usable. Credentials have been cleared.
    #[error("session expired, please log in again")]
    SessionExpired,

    /// No access token is available, no request was sent.
    #[error("not authenticated, please log in")]
    NotAuthenticated,

    #[error("access denied: {0}")]
    AccessDenied(String),

    #[error("api error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("credential store error: {0}")]
    Store(String),

    #[error("configuration error: {0}")]
    Config(String),

    /// The consumer of a library sync stopped listening.
    #[error("library sync cancelled")]
    Cancelled,
}

impl Error {
    /// True for failures that can only be resolved by logging in again.
    pub fn requires_login(&self) -> bool {
        matches!(
            self,
            Error::SessionExpired | Error::NotAuthenticated | Error::MissingVerifier
        )
    }
}
