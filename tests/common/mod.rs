//! Shared test fixtures

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use kickoff_cache::{Network, Request, Response, WorkerError, WorkerResult};

/// Scripted behavior for one URL
#[derive(Clone)]
pub enum Behavior {
    /// Reply with this response
    Respond(Response),
    /// Fail with a transport error
    Fail,
    /// Sleep, then reply
    Delay(Duration, Response),
}

/// Scripted network double
///
/// URLs without a scripted behavior fail with a transport error, which
/// doubles as "offline". Every fetch is recorded for call-count assertions.
#[derive(Default)]
pub struct MockNetwork {
    routes: Mutex<HashMap<String, Behavior>>,
    calls: Mutex<Vec<String>>,
}

impl MockNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a 200 response with a body for a URL
    pub fn respond(&self, url: &str, body: &str) {
        self.script(url, Behavior::Respond(Response::ok_with_body(body)));
    }

    /// Script an arbitrary response for a URL
    pub fn respond_with(&self, url: &str, response: Response) {
        self.script(url, Behavior::Respond(response));
    }

    /// Script a transport failure for a URL
    pub fn fail(&self, url: &str) {
        self.script(url, Behavior::Fail);
    }

    /// Script a delayed 200 response for a URL
    pub fn delay(&self, url: &str, delay: Duration, body: &str) {
        self.script(url, Behavior::Delay(delay, Response::ok_with_body(body)));
    }

    fn script(&self, url: &str, behavior: Behavior) {
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), behavior);
    }

    /// How many times a URL was fetched
    pub fn fetch_count(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|u| *u == url).count()
    }

    /// Total fetches across all URLs
    pub fn total_fetches(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Network for MockNetwork {
    async fn fetch(&self, request: &Request) -> WorkerResult<Response> {
        self.calls.lock().unwrap().push(request.url.clone());

        let behavior = self.routes.lock().unwrap().get(&request.url).cloned();
        match behavior {
            Some(Behavior::Respond(response)) => Ok(response),
            Some(Behavior::Delay(delay, response)) => {
                tokio::time::sleep(delay).await;
                Ok(response)
            }
            Some(Behavior::Fail) | None => {
                Err(WorkerError::Network(format!("connection refused: {}", request.url)))
            }
        }
    }
}

/// A cacheable response stamped as written `age_ms` ago
pub fn cached_response(body: &str, strategy: &str, max_age_ms: i64, age_ms: i64) -> Response {
    let cached_at = Utc::now().timestamp_millis() - age_ms;
    Response::ok_with_body(body).with_cache_metadata(strategy, max_age_ms, cached_at)
}
