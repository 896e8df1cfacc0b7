use crate::api::base::{
    error::ApiError,
    transport::{HttpRequest, HttpResponse, HttpTransport},
};
use async_trait::async_trait;
use serde_json::Value;
use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};
use tokio::time::Instant;

type Matcher = Box<dyn Fn(&HttpRequest) -> bool + Send + Sync>;

enum Reply {
    Response(HttpResponse),
    Error(String),
}

/// Replays canned responses. Routed replies (matched on the request) take
/// precedence over the FIFO queue; routes are reusable, queued replies are
/// consumed once.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    inner: Arc<Mutex<Script>>,
}

#[derive(Default)]
struct Script {
    routes: Vec<(Matcher, HttpResponse)>,
    queue: VecDeque<Reply>,
    requests: Vec<HttpRequest>,
    sent_at: Vec<Instant>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_json(&self, status: u16, body: Value) {
        self.push(Reply::Response(HttpResponse {
            status,
            body: body.to_string().into_bytes(),
        }));
    }

    pub fn push_status(&self, status: u16, body: &str) {
        self.push_bytes(status, body.as_bytes().to_vec());
    }

    pub fn push_bytes(&self, status: u16, body: Vec<u8>) {
        self.push(Reply::Response(HttpResponse { status, body }));
    }

    pub fn push_error(&self, message: &str) {
        self.push(Reply::Error(message.to_string()));
    }

    /// Answers every request whose full URL contains `needle`.
    pub fn route_json(&self, needle: &str, status: u16, body: Value) {
        let needle = needle.to_string();
        let response = HttpResponse {
            status,
            body: body.to_string().into_bytes(),
        };
        self.lock()
            .routes
            .push((Box::new(move |req| req.full_url().contains(&needle)), response));
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.lock().requests.clone()
    }

    /// When each request arrived, on the tokio clock.
    pub fn request_times(&self) -> Vec<Instant> {
        self.lock().sent_at.clone()
    }

    fn push(&self, reply: Reply) {
        self.lock().queue.push_back(reply);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let mut script = self.lock();
        script.requests.push(request.clone());
        script.sent_at.push(Instant::now());

        if let Some((_, response)) = script.routes.iter().find(|(matches, _)| matches(&request)) {
            return Ok(response.clone());
        }

        match script.queue.pop_front() {
            Some(Reply::Response(response)) => Ok(response),
            Some(Reply::Error(message)) => Err(ApiError::Transport(message)),
            None => Err(ApiError::Transport(format!(
                "no scripted response for {}",
                request.full_url()
            ))),
        }
    }
}
