//! In-memory fetcher with scripted replies
//!
//! Each URL gets a delay and a reply. Unscripted URLs answer 404. Every
//! call is recorded so tests can count network activity.

use async_trait::async_trait;
use recplay_loader::fetcher::{FetchError, FetchResponse, ProbeResponse, ResourceFetcher};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// Scripted reply for one URL
#[derive(Debug, Clone)]
pub enum Reply {
    /// Respond with a status and body
    Status { status: u16, body: String },
    /// Fail at the transport level
    Fail,
}

impl Reply {
    pub fn ok(body: impl Into<String>) -> Self {
        Reply::Status {
            status: 200,
            body: body.into(),
        }
    }

    pub fn status(status: u16) -> Self {
        Reply::Status {
            status,
            body: String::new(),
        }
    }
}

#[derive(Default)]
pub struct ScriptedFetcher {
    routes: HashMap<String, (Duration, Reply)>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a reply delivered after `delay_ms`
    pub fn route(mut self, url: impl Into<String>, delay_ms: u64, reply: Reply) -> Self {
        self.routes
            .insert(url.into(), (Duration::from_millis(delay_ms), reply));
        self
    }

    /// Number of requests issued (GET and HEAD)
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// URLs requested, in request order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    async fn reply(&self, url: &str) -> Result<(u16, String), FetchError> {
        self.calls.lock().unwrap().push(url.to_string());

        let (delay, reply) = self
            .routes
            .get(url)
            .cloned()
            .unwrap_or((Duration::ZERO, Reply::status(404)));

        tokio::time::sleep(delay).await;

        match reply {
            Reply::Status { status, body } => Ok((status, body)),
            Reply::Fail => Err(FetchError::Network(format!("connection refused: {}", url))),
        }
    }
}

#[async_trait]
impl ResourceFetcher for ScriptedFetcher {
    async fn get(&self, url: &str) -> Result<FetchResponse, FetchError> {
        let (status, body) = self.reply(url).await?;
        let success = (200..300).contains(&status);
        Ok(FetchResponse {
            status,
            url: url.to_string(),
            body: if success { body } else { String::new() },
        })
    }

    async fn head(&self, url: &str) -> Result<ProbeResponse, FetchError> {
        let (status, _) = self.reply(url).await?;
        Ok(ProbeResponse {
            status,
            url: url.to_string(),
        })
    }
}
