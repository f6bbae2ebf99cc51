#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Mutex;

use payretailers::{
    ApiRequest, ApiResponse, ClientConfig, Credentials, Environment, PayRetailersClient,
    RetryPolicy, Transport, TransportError,
};

pub type Outcome = Result<ApiResponse, TransportError>;

/// Replays canned outcomes in order and records every request.
pub struct ScriptedTransport {
    outcomes: Mutex<VecDeque<Outcome>>,
    seen: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub fn new(outcomes: Vec<Outcome>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.seen.lock().unwrap().clone()
    }

    pub fn urls(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.url).collect()
    }
}

impl Transport for ScriptedTransport {
    async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        self.seen.lock().unwrap().push(request.clone());
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Connect("script exhausted".into())))
    }
}

pub fn json(status: u16, body: serde_json::Value) -> Outcome {
    Ok(ApiResponse::new(status, body.to_string()))
}

pub fn text(status: u16, body: &str) -> Outcome {
    Ok(ApiResponse::new(status, body))
}

pub fn refused() -> Outcome {
    Err(TransportError::Connect("connection refused".into()))
}

/// Config with zero back-off and the blacklist file at `cache`.
pub fn config(environment: Environment, cache: &Path) -> ClientConfig {
    ClientConfig::new(Credentials::new("shop-1", "secret-1", "sub-1"), environment)
        .with_retry(RetryPolicy::immediate(3))
        .with_h2h_cache_path(cache)
}

pub fn client(
    environment: Environment,
    cache: &Path,
    outcomes: Vec<Outcome>,
) -> PayRetailersClient<ScriptedTransport> {
    PayRetailersClient::with_transport(ScriptedTransport::new(outcomes), config(environment, cache))
}
