//! Testing utilities including a scripted transport.
//!
//! [`MockTransport`] answers requests from canned replies keyed by method and
//! path, and records every request it sees so tests can assert on call
//! counts and query parameters without touching the network.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use reqwest::Method;

use crate::error::{PaperspaceError, Result};
use crate::transport::{ApiRequest, HttpTransport, RawResponse};

#[derive(Debug, Clone)]
enum MockReply {
    Response(RawResponse),
    TransportError(String),
}

type RouteKey = (Method, String);

/// A scripted [`HttpTransport`].
///
/// Replies registered for the same route are served in order; the last one
/// repeats forever. Unrouted requests get a 500.
#[derive(Clone, Default)]
pub struct MockTransport {
    /// Queued replies by (method, path)
    routes: Arc<RwLock<HashMap<RouteKey, VecDeque<MockReply>>>>,

    /// Call tracking for assertions
    calls: Arc<RwLock<Vec<ApiRequest>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a raw reply for `method path`.
    pub fn on(self, method: Method, path: &str, status: u16, body: impl Into<String>) -> Self {
        self.push(method, path, MockReply::Response(RawResponse::new(status, body)))
    }

    /// Queue a JSON reply for `method path`.
    pub fn on_json(self, method: Method, path: &str, status: u16, body: serde_json::Value) -> Self {
        self.on(method, path, status, body.to_string())
    }

    /// Queue a connection-level failure for `method path`.
    pub fn on_transport_error(self, method: Method, path: &str, message: impl Into<String>) -> Self {
        self.push(method, path, MockReply::TransportError(message.into()))
    }

    fn push(self, method: Method, path: &str, reply: MockReply) -> Self {
        self.routes
            .write()
            .unwrap()
            .entry((method, normalize(path)))
            .or_default()
            .push_back(reply);
        self
    }

    /// Every request received, in order.
    pub fn calls(&self) -> Vec<ApiRequest> {
        self.calls.read().unwrap().clone()
    }

    /// Requests received for one route.
    pub fn calls_to(&self, method: &Method, path: &str) -> Vec<ApiRequest> {
        let path = normalize(path);
        self.calls
            .read()
            .unwrap()
            .iter()
            .filter(|call| &call.method == method && normalize(&call.path) == path)
            .cloned()
            .collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.read().unwrap().len()
    }

    fn next_reply(&self, key: &RouteKey) -> Option<MockReply> {
        let mut routes = self.routes.write().unwrap();
        let queue = routes.get_mut(key)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

fn normalize(path: &str) -> String {
    path.trim_start_matches('/').to_string()
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn execute(&self, request: ApiRequest) -> Result<RawResponse> {
        let key = (request.method.clone(), normalize(&request.path));
        self.calls.write().unwrap().push(request);

        match self.next_reply(&key) {
            Some(MockReply::Response(response)) => Ok(response),
            Some(MockReply::TransportError(message)) => Err(PaperspaceError::Transport(message)),
            None => Ok(RawResponse::new(
                500,
                format!("no mock response for {} {}", key.0, key.1),
            )),
        }
    }
}
