use std::sync::Arc;

use reqwest::{
    Client, Method, Response, StatusCode,
    header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue},
};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{Error, Res, config::Settings, spotify::Authorizer};

/// Original call plus at most one retry after a refresh.
pub const MAX_ATTEMPTS: u32 = 2;

/// Per-call knobs for [`Gateway::request`].
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    /// Merged over the defaults; a header given here wins.
    pub headers: HeaderMap,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            query: Vec::new(),
            body: None,
            headers: HeaderMap::new(),
        }
    }
}

impl RequestOptions {
    /// A bare `GET` with no query, body or extra headers.
    pub fn get() -> Self {
        Self::default()
    }

    /// Options for any other HTTP method, e.g. `PUT` for player commands.
    pub fn method(method: Method) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    /// Appends a query parameter. Repeated keys are sent repeatedly.
    ///
    /// # Example
    ///
    /// ```
    /// let options = RequestOptions::get().query("limit", 50).query("offset", 100);
    /// ```
    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    /// Sets the JSON request body.
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Sets a header, replacing the gateway default of the same name.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

/// The one place outbound Web API calls leave the process.
///
/// Every call gets a bearer token from the [`Authorizer`]. A `401` or `403`
/// earns exactly one refresh and one retry, tracked by an explicit attempt
/// counter; nothing is retried twice.
pub struct Gateway {
    http: Client,
    base_url: String,
    auth: Arc<Authorizer>,
}

impl Gateway {
    /// Creates a gateway for the API base configured in `settings`.
    ///
    /// The HTTP client is shared with the authorizer so both use the same
    /// connection pool and timeout.
    ///
    /// # Arguments
    ///
    /// * `settings` - Source of the API base URL (`VINYLSHELF_API_URL`)
    /// * `auth` - Supplies bearer tokens and performs refreshes
    ///
    /// # Returns
    ///
    /// The gateway, ready to send requests.
    ///
    /// # Example
    ///
    /// ```
    /// let auth = Arc::new(Authorizer::new(settings.clone(), store).await?);
    /// let gateway = Gateway::new(&settings, auth)?;
    /// let me = gateway.request("/me", RequestOptions::get()).await?;
    /// ```
    pub fn new(settings: &Settings, auth: Arc<Authorizer>) -> Res<Self> {
        Ok(Self::with_client(
            auth.http().clone(),
            settings.api_url.clone(),
            auth,
        ))
    }

    /// Creates a gateway with an explicit client and API base.
    ///
    /// # Arguments
    ///
    /// * `http` - Client used for every API call
    /// * `base_url` - Prefix for relative endpoints; a trailing `/` is dropped
    /// * `auth` - Supplies bearer tokens and performs refreshes
    pub fn with_client(http: Client, base_url: impl Into<String>, auth: Arc<Authorizer>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth,
        }
    }

    pub fn authorizer(&self) -> &Arc<Authorizer> {
        &self.auth
    }

    /// Sends `options.method` to `endpoint` and returns the JSON body.
    ///
    /// `endpoint` is relative to the API base (`/me/tracks`) or an absolute
    /// URL. A `204` or an empty body yields `Ok(None)`.
    ///
    /// # Errors
    ///
    /// - [`Error::NotAuthenticated`] before any network call if there is no
    ///   token
    /// - [`Error::SessionExpired`] if a `401` survives the refresh
    /// - [`Error::AccessDenied`] if a `403` survives the refresh
    /// - [`Error::Api`] for any other non-2xx status
    pub async fn request(&self, endpoint: &str, options: RequestOptions) -> Res<Option<Value>> {
        let mut token = self
            .auth
            .valid_access_token()
            .await
            .ok_or(Error::NotAuthenticated)?;

        let mut attempt = 1;
        loop {
            let response = self.send(endpoint, &options, &token).await?;
            let status = response.status();

            match status {
                StatusCode::NO_CONTENT => return Ok(None),
                s if s.is_success() => return read_body(response).await,
                StatusCode::UNAUTHORIZED => {
                    if attempt >= MAX_ATTEMPTS {
                        log::warn!(
                            "{} {} still unauthorized after refresh",
                            options.method,
                            endpoint
                        );
                        self.auth.expire_session().await?;
                        return Err(Error::SessionExpired);
                    }
                    log::debug!(
                        "{} {} unauthorized, refreshing token",
                        options.method,
                        endpoint
                    );
                    token = match self.auth.refresh_after(&token).await {
                        Ok(t) => t,
                        Err(Error::NoRefreshToken) => {
                            self.auth.expire_session().await?;
                            return Err(Error::SessionExpired);
                        }
                        Err(e) => return Err(e),
                    };
                }
                StatusCode::FORBIDDEN => {
                    let message = error_message(response).await;
                    if attempt >= MAX_ATTEMPTS {
                        return Err(Error::AccessDenied(message));
                    }
                    log::debug!("{} {} forbidden, refreshing token once", options.method, endpoint);
                    token = match self.auth.refresh_after(&token).await {
                        Ok(t) => t,
                        Err(Error::NoRefreshToken) => return Err(Error::AccessDenied(message)),
                        Err(e) => return Err(e),
                    };
                }
                _ => {
                    let message = error_message(response).await;
                    return Err(Error::Api {
                        status: status.as_u16(),
                        message,
                    });
                }
            }

            attempt += 1;
        }
    }

    /// [`request`](Self::request) with the body decoded into `T`.
    pub async fn fetch<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> Res<Option<T>> {
        match self.request(endpoint, options).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    async fn send(&self, endpoint: &str, options: &RequestOptions, token: &str) -> Res<Response> {
        let url = if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            endpoint.to_string()
        } else {
            format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
        };

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        for (name, value) in options.headers.iter() {
            headers.insert(name.clone(), value.clone());
        }

        let mut builder = self
            .http
            .request(options.method.clone(), &url)
            .headers(headers)
            .bearer_auth(token);
        if !options.query.is_empty() {
            builder = builder.query(&options.query);
        }
        if let Some(body) = &options.body {
            builder = builder.body(serde_json::to_vec(body)?);
        }

        builder.send().await.map_err(Error::from)
    }
}

async fn read_body(response: Response) -> Res<Option<Value>> {
    let body = response.text().await?;
    if body.trim().is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_json::from_str(&body)?))
}

/// Pulls a message out of an error body, tolerating non-JSON.
async fn error_message(response: Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    let from_json = serde_json::from_str::<Value>(&body).ok().and_then(|v| {
        v["error"]["message"]
            .as_str()
            .or_else(|| v["error_description"].as_str())
            .or_else(|| v["error"].as_str())
            .or_else(|| v["message"].as_str())
            .map(str::to_string)
    });

    from_json.unwrap_or_else(|| {
        let body = body.trim();
        if body.is_empty() {
            status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string()
        } else {
            body.to_string()
        }
    })
}
