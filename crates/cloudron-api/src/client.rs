//! Authenticated request client.
//!
//! Every call goes through [`ApiClient::send`], which takes a closure producing a
//! fresh [`reqwest::RequestBuilder`]. When the server rejects the token the
//! client prompts for credentials, stores the new token and calls the closure a
//! second time, so a retried request never reuses a consumed body.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use cloudron_api::{ApiClient, HttpTransport, TerminalPrompt};
//! use cloudron_config::Config;
//! use parking_lot::Mutex;
//!
//! # async fn example() -> cloudron_api::Result<()> {
//! let config = Arc::new(Mutex::new(Config::load(Config::default_path()?)?));
//! let client = ApiClient::new(HttpTransport::new()?, config, Box::new(TerminalPrompt::new()));
//! for app in client.list_apps().await? {
//!     println!("{} {}", app.id, app.location);
//! }
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use cloudron_config::Config;
use parking_lot::Mutex;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::error::{ApiError, Result};
use crate::prompt::{CredentialPrompt, Credentials};
use crate::transport::{HttpTransport, Transport};
use crate::types::{App, AppList, ErrorBody, IdResponse, LoginResponse};

/// Path of the developer login endpoint.
const LOGIN_PATH: &str = "/api/v1/developer/login";

/// What a request builder closure gets to work with.
#[derive(Debug)]
pub struct RequestContext<'a> {
    http: &'a reqwest::Client,
    endpoint: &'a str,
    token: &'a str,
}

impl RequestContext<'_> {
    /// Absolute URL of an API path.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.endpoint)
    }

    /// Current access token, empty when not logged in.
    #[must_use]
    pub fn token(&self) -> &str {
        self.token
    }

    /// Authenticated GET request.
    #[must_use]
    pub fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.http.get(self.url(path)).bearer_auth(self.token)
    }

    /// Authenticated POST request.
    #[must_use]
    pub fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.http.post(self.url(path)).bearer_auth(self.token)
    }
}

/// REST client bound to the session stored in a [`Config`].
pub struct ApiClient<T = HttpTransport> {
    transport: T,
    config: Arc<Mutex<Config>>,
    prompt: Box<dyn CredentialPrompt>,
}

impl<T> std::fmt::Debug for ApiClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("host", &self.config.lock().session().host)
            .finish_non_exhaustive()
    }
}

impl<T: Transport> ApiClient<T> {
    /// Create a client.
    ///
    /// `config` supplies host and token and receives the token obtained by
    /// re-authentication; `prompt` is asked for credentials when that happens.
    pub fn new(transport: T, config: Arc<Mutex<Config>>, prompt: Box<dyn CredentialPrompt>) -> Self {
        Self {
            transport,
            config,
            prompt,
        }
    }

    /// Shared configuration.
    #[must_use]
    pub fn config(&self) -> &Arc<Mutex<Config>> {
        &self.config
    }

    /// Send a request, re-authenticating once if the token is rejected.
    ///
    /// `build` is invoked once per attempt. Statuses other than 401 are returned
    /// untouched; the caller decides which ones are acceptable.
    ///
    /// # Errors
    ///
    /// Returns an error if no host is configured, the request cannot be sent,
    /// re-authentication fails, or the retried request is rejected again.
    pub async fn send<F>(&self, build: F) -> Result<reqwest::Response>
    where
        F: Fn(&RequestContext<'_>) -> reqwest::RequestBuilder,
    {
        let response = self.execute_once(&build).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        warn!("access token rejected, re-authenticating");
        self.reauthenticate().await?;

        let response = self.execute_once(&build).await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthorized {
                reason: "token rejected after re-authentication".into(),
            });
        }
        Ok(response)
    }

    async fn execute_once<F>(&self, build: &F) -> Result<reqwest::Response>
    where
        F: Fn(&RequestContext<'_>) -> reqwest::RequestBuilder,
    {
        let session = self.config.lock().session();
        let endpoint = session.api_endpoint().ok_or(ApiError::NotConfigured)?;
        let token = session.token.unwrap_or_default();
        let ctx = RequestContext {
            http: self.transport.client(),
            endpoint: &endpoint,
            token: &token,
        };
        let request = build(&ctx).build()?;
        debug!(method = %request.method(), path = %request.url().path(), "request");
        self.transport.execute(request).await
    }

    /// Prompt for credentials, log in and persist the new token.
    ///
    /// # Errors
    ///
    /// Returns an error if prompting, login or saving the config fails.
    pub async fn reauthenticate(&self) -> Result<()> {
        let host = self.config.lock().session().host.unwrap_or_default();
        let credentials = self.prompt.credentials(&host)?;
        self.authenticate(&credentials).await
    }

    /// Log in with `credentials` and persist the new token.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` if the credentials are rejected.
    pub async fn authenticate(&self, credentials: &Credentials) -> Result<()> {
        let token = self.login(credentials).await?;
        self.config.lock().set_token(token)?;
        info!(username = %credentials.username, "logged in");
        Ok(())
    }

    async fn login(&self, credentials: &Credentials) -> Result<String> {
        let body = json!({
            "username": credentials.username,
            "password": credentials.password,
        });
        let response = self
            .execute_once(&|ctx: &RequestContext<'_>| {
                ctx.http.post(ctx.url(LOGIN_PATH)).json(&body)
            })
            .await?;

        match response.status() {
            StatusCode::OK => Ok(response.json::<LoginResponse>().await?.token),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(ApiError::Unauthorized {
                reason: "invalid username or password".into(),
            }),
            _ => Err(status_error(response).await),
        }
    }

    /// GET `path` and decode a JSON body from a 200 response.
    ///
    /// # Errors
    ///
    /// Returns a `Status` error for any other status.
    pub async fn get_json<D: DeserializeOwned>(&self, path: &str) -> Result<D> {
        let response = self.send(|ctx| ctx.get(path)).await?;
        let response = expect_status(response, StatusCode::OK).await?;
        Ok(response.json().await?)
    }

    /// POST a JSON body to an asynchronous endpoint and expect `202 Accepted`.
    ///
    /// # Errors
    ///
    /// Returns a `Status` error for any other status.
    pub async fn post_accepted(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<reqwest::Response> {
        let response = self.send(|ctx| ctx.post(path).json(body)).await?;
        expect_status(response, StatusCode::ACCEPTED).await
    }

    /// List all apps.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn list_apps(&self) -> Result<Vec<App>> {
        let list: AppList = self.get_json("/api/v1/apps").await?;
        Ok(list.apps)
    }

    /// Fetch one app.
    ///
    /// # Errors
    ///
    /// Returns an error if the app does not exist or the request fails.
    pub async fn app(&self, app_id: &str) -> Result<App> {
        self.get_json(&format!("/api/v1/apps/{app_id}")).await
    }

    /// Start installing an app and return its id.
    ///
    /// # Errors
    ///
    /// Returns an error if the server does not accept the installation.
    pub async fn install(&self, request: &serde_json::Value) -> Result<String> {
        let response = self.post_accepted("/api/v1/apps/install", request).await?;
        Ok(response.json::<IdResponse>().await?.id)
    }

    /// Start uninstalling an app.
    ///
    /// # Errors
    ///
    /// Returns an error if the server does not accept the request.
    pub async fn uninstall(&self, app_id: &str) -> Result<()> {
        self.post_accepted(&format!("/api/v1/apps/{app_id}/uninstall"), &json!({}))
            .await?;
        Ok(())
    }

    /// Move an app to another location.
    ///
    /// # Errors
    ///
    /// Returns an error if the server does not accept the request.
    pub async fn configure(&self, app_id: &str, location: &str) -> Result<()> {
        self.post_accepted(
            &format!("/api/v1/apps/{app_id}/configure"),
            &json!({ "location": location }),
        )
        .await?;
        Ok(())
    }

    /// Start, stop or restart an app.
    ///
    /// # Errors
    ///
    /// Returns an error if the server does not accept the request.
    pub async fn run_action(&self, app_id: &str, action: RunAction) -> Result<()> {
        self.post_accepted(
            &format!("/api/v1/apps/{app_id}/{}", action.as_str()),
            &json!({}),
        )
        .await?;
        Ok(())
    }
}

/// Run state changes of an app.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunAction {
    /// Start a stopped app.
    Start,
    /// Stop a running app.
    Stop,
    /// Restart an app.
    Restart,
}

impl RunAction {
    /// Endpoint suffix of the action.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Restart => "restart",
        }
    }
}

/// Pass `response` through if it has the `expected` status.
///
/// # Errors
///
/// Returns a `Status` error carrying the server's message otherwise.
pub async fn expect_status(
    response: reqwest::Response,
    expected: StatusCode,
) -> Result<reqwest::Response> {
    if response.status() == expected {
        Ok(response)
    } else {
        Err(status_error(response).await)
    }
}

/// Convert a response into a `Status` error, preferring the `message` field of a
/// JSON body over the raw body text.
pub async fn status_error(response: reqwest::Response) -> ApiError {
    let code = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .map(|b| b.message)
        .unwrap_or(body);
    ApiError::status(code, message.trim())
}
