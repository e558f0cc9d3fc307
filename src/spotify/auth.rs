use std::sync::Arc;

use chrono::{Duration, Utc};
use reqwest::{Client, Response, Url};
use tokio::sync::Mutex;

use crate::{
    Error, Res,
    config::Settings,
    management::CredentialStore,
    types::{Credential, TokenErrorResponse, TokenResponse},
    utils,
};

/// Tokens expiring within this window are refreshed before use.
pub const REFRESH_LOOKAHEAD_SECS: i64 = 5 * 60;

/// Used when the token endpoint omits `expires_in`.
const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

/// Where the authorization grant currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Idle,
    AwaitingRedirect,
    Exchanging,
    Authorized,
    Refreshing,
}

/// Drives the OAuth 2.0 PKCE grant against the provider's accounts service.
///
/// The controller owns no tokens itself. Everything it obtains lands in the
/// injected [`CredentialStore`], which the [`Gateway`](super::Gateway) reads
/// back before every request.
///
/// # Flow
///
/// 1. [`begin_login`](Self::begin_login) stores a fresh verifier and returns
///    the authorization URL to navigate to
/// 2. The provider redirects to `/callback?code=...`
/// 3. [`complete_login`](Self::complete_login) exchanges code and verifier
///    for a token pair
/// 4. [`valid_access_token`](Self::valid_access_token) hands out tokens,
///    refreshing them shortly before they expire
///
/// Refreshes are serialized: concurrent callers queue on one gate instead of
/// racing each other to the token endpoint.
pub struct Authorizer {
    settings: Settings,
    http: Client,
    store: Arc<dyn CredentialStore>,
    state: Mutex<AuthState>,
    refresh_gate: Mutex<()>,
}

impl Authorizer {
    /// Creates a controller with an HTTP client built from `settings`.
    ///
    /// Starts out `Authorized` when the store already holds a credential.
    ///
    /// # Arguments
    ///
    /// * `settings` - Client id, redirect URI, scopes and endpoint URLs
    /// * `store` - Where the grant and the pending PKCE verifier live
    ///
    /// # Example
    ///
    /// ```
    /// let store = Arc::new(FileCredentialStore::open_default().await?);
    /// let auth = Authorizer::new(Settings::from_env()?, store).await?;
    /// println!("{}", auth.begin_login().await?);
    /// ```
    pub async fn new(settings: Settings, store: Arc<dyn CredentialStore>) -> Res<Self> {
        let http = settings.http_client()?;
        Self::with_client(settings, http, store).await
    }

    /// Same as [`new`](Self::new), reusing an existing HTTP client.
    pub async fn with_client(
        settings: Settings,
        http: Client,
        store: Arc<dyn CredentialStore>,
    ) -> Res<Self> {
        let state = if store.read().await?.is_some() {
            AuthState::Authorized
        } else {
            AuthState::Idle
        };

        Ok(Self {
            settings,
            http,
            store,
            state: Mutex::new(state),
            refresh_gate: Mutex::new(()),
        })
    }

    pub async fn state(&self) -> AuthState {
        *self.state.lock().await
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn http(&self) -> &Client {
        &self.http
    }

    /// Starts a login attempt and returns the URL the user must visit.
    ///
    /// Any verifier left over from an abandoned attempt is overwritten.
    pub async fn begin_login(&self) -> Res<String> {
        let pkce = utils::generate_challenge();
        self.store.store_verifier(pkce.verifier).await?;

        let url = Url::parse_with_params(
            &self.settings.auth_url,
            &[
                ("client_id", self.settings.client_id.as_str()),
                ("response_type", "code"),
                ("redirect_uri", self.settings.redirect_uri.as_str()),
                ("code_challenge_method", "S256"),
                ("code_challenge", pkce.challenge.as_str()),
                ("scope", self.settings.scope.as_str()),
            ],
        )
        .map_err(|e| Error::Config(format!("invalid auth url: {e}")))?;

        self.set_state(AuthState::AwaitingRedirect).await;
        Ok(url.to_string())
    }

    /// Exchanges the authorization `code` for a token pair.
    ///
    /// # Errors
    ///
    /// - [`Error::MissingVerifier`] if no login is in flight, including a
    ///   second call with the same code
    /// - [`Error::TokenExchangeFailed`] with the provider's description on a
    ///   non-2xx answer
    pub async fn complete_login(&self, code: &str) -> Res<Credential> {
        let verifier = self
            .store
            .read_verifier()
            .await?
            .ok_or(Error::MissingVerifier)?;

        self.set_state(AuthState::Exchanging).await;
        let response = self
            .post_token(&[
                ("grant_type", "authorization_code"),
                ("client_id", self.settings.client_id.as_str()),
                ("code", code),
                ("redirect_uri", self.settings.redirect_uri.as_str()),
                ("code_verifier", verifier.as_str()),
            ])
            .await;

        let response = match response {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                let message = token_error_message(r).await;
                self.set_state(AuthState::AwaitingRedirect).await;
                return Err(Error::TokenExchangeFailed(message));
            }
            Err(e) => {
                self.set_state(AuthState::AwaitingRedirect).await;
                return Err(e);
            }
        };

        let token: TokenResponse = match decode_token(response).await {
            Ok(token) => token,
            Err(e) => {
                self.set_state(AuthState::AwaitingRedirect).await;
                return Err(Error::TokenExchangeFailed(e.to_string()));
            }
        };

        let credential = Credential {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_at: expiry_from(token.expires_in),
        };
        self.store.store_grant(credential.clone()).await?;
        self.set_state(AuthState::Authorized).await;

        log::debug!(
            "authorization code exchanged, token valid until {}",
            credential.expires_at
        );
        Ok(credential)
    }

    /// Renews the access token with the stored refresh token.
    ///
    /// A rejection from the token endpoint is final: the state drops to
    /// `Idle`, the store is cleared (a failed clear is only logged) and
    /// [`Error::SessionExpired`] returned. The refresh token is kept unless
    /// the provider rotates it.
    pub async fn refresh(&self) -> Res<Credential> {
        let _gate = self.refresh_gate.lock().await;
        self.refresh_locked().await
    }

    /// Refresh on behalf of a request whose bearer `rejected` was refused.
    ///
    /// When another caller already replaced that token while this one waited
    /// at the gate, the newer token is returned without a second exchange.
    pub(crate) async fn refresh_after(&self, rejected: &str) -> Res<String> {
        let _gate = self.refresh_gate.lock().await;
        if let Some(current) = self.store.read().await? {
            if current.access_token != rejected {
                log::debug!("token already refreshed by a concurrent request");
                return Ok(current.access_token);
            }
        }
        self.refresh_locked().await.map(|c| c.access_token)
    }

    /// Returns a usable access token, or `None` if there is none.
    ///
    /// Tokens expiring within [`REFRESH_LOOKAHEAD_SECS`] are refreshed first.
    /// A failed refresh yields `None`, never an error.
    ///
    /// # Returns
    ///
    /// - `Some(token)` with a token valid for at least the look-ahead window
    /// - `None` when nothing is stored or the refresh did not succeed
    pub async fn valid_access_token(&self) -> Option<String> {
        let credential = self.store.read().await.ok().flatten()?;
        if !needs_refresh(&credential) {
            return Some(credential.access_token);
        }

        let _gate = self.refresh_gate.lock().await;
        // Someone may have refreshed while we waited.
        let credential = self.store.read().await.ok().flatten()?;
        if !needs_refresh(&credential) {
            return Some(credential.access_token);
        }

        match self.refresh_locked().await {
            Ok(fresh) => Some(fresh.access_token),
            Err(e) => {
                log::warn!("proactive token refresh failed: {e}");
                None
            }
        }
    }

    /// Forgets the grant and any pending login.
    pub async fn logout(&self) -> Res<()> {
        self.store.clear().await?;
        self.set_state(AuthState::Idle).await;
        Ok(())
    }

    /// Clears credentials after the provider refused a freshly refreshed
    /// token.
    pub(crate) async fn expire_session(&self) -> Res<()> {
        self.logout().await
    }

    async fn refresh_locked(&self) -> Res<Credential> {
        let current = self.store.read().await?;
        let refresh_token = current
            .and_then(|c| c.refresh_token)
            .ok_or(Error::NoRefreshToken)?;

        self.set_state(AuthState::Refreshing).await;
        let response = self
            .post_token(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token.as_str()),
                ("client_id", self.settings.client_id.as_str()),
            ])
            .await;

        let response = match response {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                let message = token_error_message(r).await;
                log::warn!("refresh token rejected: {message}");
                self.set_state(AuthState::Idle).await;
                if let Err(e) = self.store.clear().await {
                    log::warn!("could not clear credentials after rejected refresh: {e}");
                }
                return Err(Error::SessionExpired);
            }
            Err(e) => {
                self.set_state(AuthState::Authorized).await;
                return Err(e);
            }
        };

        let token = match decode_token(response).await {
            Ok(token) => token,
            Err(e) => {
                self.set_state(AuthState::Authorized).await;
                return Err(e);
            }
        };

        let credential = Credential {
            access_token: token.access_token,
            refresh_token: token.refresh_token.or(Some(refresh_token)),
            expires_at: expiry_from(token.expires_in),
        };
        self.store.replace(credential.clone()).await?;
        self.set_state(AuthState::Authorized).await;

        log::debug!("access token refreshed, valid until {}", credential.expires_at);
        Ok(credential)
    }

    async fn post_token(&self, form: &[(&str, &str)]) -> Res<Response> {
        self.http
            .post(&self.settings.token_url)
            .form(form)
            .send()
            .await
            .map_err(Error::from)
    }

    async fn set_state(&self, state: AuthState) {
        *self.state.lock().await = state;
    }
}

/// True when the credential expires within the look-ahead window.
pub fn needs_refresh(credential: &Credential) -> bool {
    credential.expires_at - Utc::now() <= Duration::seconds(REFRESH_LOOKAHEAD_SECS)
}

fn expiry_from(expires_in: Option<i64>) -> chrono::DateTime<Utc> {
    let secs = expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS).max(0);
    Utc::now() + Duration::seconds(secs)
}

async fn decode_token(response: Response) -> Res<TokenResponse> {
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(Error::from)
}

/// Best effort: `error_description`, then `error`, then the raw body.
async fn token_error_message(response: Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let parsed: TokenErrorResponse = serde_json::from_str(&body).unwrap_or_default();

    parsed
        .error_description
        .or(parsed.error)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                status.to_string()
            } else {
                body.trim().to_string()
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credential_expiring_in(secs: i64) -> Credential {
        Credential {
            access_token: "a".to_string(),
            refresh_token: None,
            expires_at: Utc::now() + Duration::seconds(secs),
        }
    }

    #[test]
    fn lookahead_window_is_five_minutes() {
        assert!(needs_refresh(&credential_expiring_in(60)));
        assert!(needs_refresh(&credential_expiring_in(-10)));
        assert!(!needs_refresh(&credential_expiring_in(3600)));
    }

    #[test]
    fn expiry_never_lands_in_the_past() {
        let now = Utc::now();
        assert!(expiry_from(Some(-30)) >= now);
        assert!(expiry_from(None) > now + Duration::seconds(3000));
    }
}
