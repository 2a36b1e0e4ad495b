use std::sync::Arc;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{ClientConfig, PollPolicy};
use crate::error::{PaperspaceError, Result};
use crate::lease::ResourceLocks;
use crate::transport::{ApiRequest, HttpTransport, ReqwestTransport};
use crate::types::AuthSession;

/// Paperspace API client.
///
/// Cheap to clone; clones share the transport and the per-resource leases.
#[derive(Clone)]
pub struct PaperspaceClient {
    transport: Arc<dyn HttpTransport>,
    poll: PollPolicy,
    locks: ResourceLocks,
}

impl PaperspaceClient {
    /// Create a client over any transport.
    pub fn new(transport: impl HttpTransport + 'static) -> Self {
        Self::with_transport(Arc::new(transport))
    }

    pub fn with_transport(transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            poll: PollPolicy::default(),
            locks: ResourceLocks::new(),
        }
    }

    /// Build a `reqwest`-backed client without contacting the API.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let transport =
            ReqwestTransport::new(&config.api_key, &config.base_url, config.http_timeout)?;
        Ok(Self::new(transport).with_poll_policy(config.poll))
    }

    /// Build a client and validate the token against `GET /auth/session`.
    pub async fn connect(config: &ClientConfig) -> Result<(Self, AuthSession)> {
        let client = Self::from_config(config)?;
        let session = client.auth_session().await?;
        info!(
            user_id = %session.user.id,
            team = %session.team.namespace,
            "Authenticated with Paperspace"
        );
        Ok((client, session))
    }

    pub fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    pub fn poll_policy(&self) -> &PollPolicy {
        &self.poll
    }

    /// Leases serializing lifecycle calls per resource ID.
    pub fn locks(&self) -> &ResourceLocks {
        &self.locks
    }

    /// Fetch the session for the configured token.
    pub async fn auth_session(&self) -> Result<AuthSession> {
        let session: AuthSession = self.get_json("auth/session").await?;
        if session.user.id.is_empty() {
            return Err(PaperspaceError::Auth);
        }
        Ok(session)
    }

    /// Execute a request and return the raw body of a 2xx response.
    pub(crate) async fn send(&self, request: ApiRequest) -> Result<String> {
        let method = request.method.clone();
        let path = request.path.clone();

        let response = self.transport.execute(request).await?;
        if !response.is_success() {
            warn!(
                method = %method,
                path = %path,
                status = response.status,
                body = %response.body,
                "Paperspace API error"
            );
            return Err(PaperspaceError::Status {
                status: response.status,
                body: response.body,
            });
        }

        debug!(method = %method, path = %path, status = response.status, "Paperspace API call");
        Ok(response.body)
    }

    pub(crate) async fn send_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        let path = request.path.clone();
        let body = self.send(request).await?;
        decode(&path, &body)
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send_json(ApiRequest::get(path)).await
    }

    pub(crate) fn request_with_body<B: Serialize>(
        method: Method,
        path: impl Into<String>,
        body: &B,
    ) -> Result<ApiRequest> {
        let body = serde_json::to_value(body).map_err(PaperspaceError::Serialize)?;
        Ok(ApiRequest::new(method, path).json(body))
    }
}

pub(crate) fn decode<T: DeserializeOwned>(path: &str, body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|source| PaperspaceError::Decode {
        path: path.to_string(),
        source,
    })
}
