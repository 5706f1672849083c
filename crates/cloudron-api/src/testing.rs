//! Scripted transport and prompt shared by the unit tests.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use cloudron_config::Config;
use parking_lot::Mutex;

use crate::client::ApiClient;
use crate::error::{ApiError, Result};
use crate::prompt::{CredentialPrompt, Credentials};
use crate::transport::Transport;

/// A request as seen by [`ScriptedTransport`].
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub query: String,
    pub authorization: Option<String>,
}

/// Answers requests from a queue of canned responses.
pub struct ScriptedTransport {
    client: reqwest::Client,
    responses: Mutex<VecDeque<(u16, String)>>,
    pub requests: Arc<Mutex<Vec<Recorded>>>,
}

impl ScriptedTransport {
    pub fn new(responses: impl IntoIterator<Item = (u16, String)>) -> Self {
        Self {
            client: reqwest::Client::new(),
            responses: Mutex::new(responses.into_iter().collect()),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl Transport for ScriptedTransport {
    fn client(&self) -> &reqwest::Client {
        &self.client
    }

    fn execute(
        &self,
        request: reqwest::Request,
    ) -> Pin<Box<dyn Future<Output = Result<reqwest::Response>> + Send + '_>> {
        self.requests.lock().push(Recorded {
            method: request.method().to_string(),
            path: request.url().path().to_string(),
            query: request.url().query().unwrap_or_default().to_string(),
            authorization: request
                .headers()
                .get(reqwest::header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
        });
        let next = self.responses.lock().pop_front();
        Box::pin(async move {
            let (status, body) =
                next.ok_or_else(|| ApiError::transport("no scripted response left"))?;
            let response = http::Response::builder()
                .status(status)
                .body(body)
                .map_err(|e| ApiError::transport(e.to_string()))?;
            Ok(reqwest::Response::from(response))
        })
    }
}

/// Returns fixed credentials and counts how often it was asked.
#[derive(Default)]
pub struct CountingPrompt {
    pub calls: Arc<AtomicUsize>,
}

impl CredentialPrompt for CountingPrompt {
    fn credentials(&self, _host: &str) -> Result<Credentials> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Credentials {
            username: "admin".into(),
            password: "secret".into(),
        })
    }
}

/// A client logged into `my.example.com` with token `old-token`.
pub fn client_with(
    transport: ScriptedTransport,
    dir: &tempfile::TempDir,
) -> (ApiClient<ScriptedTransport>, Arc<AtomicUsize>) {
    let mut config = Config::load(dir.path().join("cloudron.json")).expect("config");
    config.set_host("my.example.com").expect("host");
    config.set_token("old-token").expect("token");
    let prompt = CountingPrompt::default();
    let calls = Arc::clone(&prompt.calls);
    let client = ApiClient::new(transport, Arc::new(Mutex::new(config)), Box::new(prompt));
    (client, calls)
}

pub fn ok(body: &str) -> (u16, String) {
    (200, body.to_string())
}
