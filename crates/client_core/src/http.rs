//! Shared HTTP wrapper: bearer injection, status mapping and the 401 session policy.

use std::{sync::Arc, time::Duration};

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use shared::error::ApiErrorBody;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::{
    error::{ClientError, ClientResult},
    session::SessionAccessor,
};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub base_url: String,
    pub request_timeout: Duration,
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The backend answered 401; the session has already been cleared.
    Expired { path: String },
}

pub struct ApiClient {
    http: Client,
    base_url: String,
    session: Arc<dyn SessionAccessor>,
    events: broadcast::Sender<SessionEvent>,
}

impl ApiClient {
    pub fn new(config: ApiConfig, session: Arc<dyn SessionAccessor>) -> ClientResult<Arc<Self>> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        let (events, _) = broadcast::channel(16);
        Ok(Arc::new(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            session,
            events,
        }))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &Arc<dyn SessionAccessor> {
        &self.session
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.get().is_some()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Starts a request carrying the session bearer token. Fails without I/O when signed out.
    pub(crate) fn authorized(&self, method: Method, path: &str) -> ClientResult<RequestBuilder> {
        let session = self.session.get().ok_or(ClientError::Unauthenticated)?;
        Ok(self
            .http
            .request(method, self.url(path))
            .bearer_auth(session.token))
    }

    pub(crate) async fn send(&self, path: &str, request: RequestBuilder) -> ClientResult<Response> {
        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            warn!(path, "backend rejected session credential; clearing session");
            self.session.clear();
            let _ = self.events.send(SessionEvent::Expired {
                path: path.to_string(),
            });
            return Err(ClientError::SessionExpired {
                path: path.to_string(),
            });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                path: path.to_string(),
                status,
                message: error_message(status, &body),
            });
        }

        debug!(path, %status, "request completed");
        Ok(response)
    }

    pub(crate) async fn send_json<T: DeserializeOwned>(
        &self,
        path: &str,
        request: RequestBuilder,
    ) -> ClientResult<T> {
        let response = self.send(path, request).await?;
        Ok(response.json::<T>().await?)
    }

    pub(crate) async fn send_empty(&self, path: &str, request: RequestBuilder) -> ClientResult<()> {
        self.send(path, request).await?;
        Ok(())
    }
}

fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ApiErrorBody>(body) {
        if !parsed.message.is_empty() {
            return parsed.message;
        }
    }
    let body = body.trim();
    if body.is_empty() {
        status.canonical_reason().unwrap_or("unknown error").to_string()
    } else {
        body.to_string()
    }
}

#[cfg(test)]
#[path = "tests/http_tests.rs"]
mod tests;
