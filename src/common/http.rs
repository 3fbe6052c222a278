use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use reqwest::redirect::Policy;
use thiserror::Error;
use tracing::debug;

use crate::config::NetworkConfig;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HttpError {
    #[error("failed to build HTTP client: {0}")]
    Client(String),
    #[error("request failed: {0}")]
    Request(String),
}

/// Status and raw body of a GET.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// HTTP client trait: a single GET, no redirects, cookies or auth.
pub trait HttpClient: Clone + Send + Sync + 'static {
    fn get(&self, url: &str) -> impl Future<Output = Result<HttpResponse, HttpError>> + Send;
}

/// reqwest-backed client.
#[derive(Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    pub fn new(network: &NetworkConfig) -> Result<Self, HttpError> {
        let mut builder = reqwest::Client::builder()
            .redirect(Policy::none())
            .user_agent(network.user_agent.clone());
        if let Some(timeout) = network.http_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| HttpError::Client(e.to_string()))?;
        Ok(Self { client })
    }
}

impl HttpClient for ReqwestClient {
    async fn get(&self, url: &str) -> Result<HttpResponse, HttpError> {
        debug!(url, "GET");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| HttpError::Request(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| HttpError::Request(e.to_string()))?;
        Ok(HttpResponse {
            status,
            body: body.to_vec(),
        })
    }
}

/// Mock HTTP client for testing. Unknown URLs answer 404.
#[derive(Clone, Default)]
pub struct MockHttpClient {
    responses: Arc<Mutex<HashMap<String, Result<HttpResponse, HttpError>>>>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl MockHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_response(&self, url: &str, status: u16, body: &str) {
        self.responses.lock().unwrap().insert(
            url.to_string(),
            Ok(HttpResponse {
                status,
                body: body.as_bytes().to_vec(),
            }),
        );
    }

    pub fn add_error(&self, url: &str, error: HttpError) {
        self.responses.lock().unwrap().insert(url.to_string(), Err(error));
    }

    /// URLs requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl HttpClient for MockHttpClient {
    async fn get(&self, url: &str) -> Result<HttpResponse, HttpError> {
        self.requests.lock().unwrap().push(url.to_string());
        self.responses
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or(Ok(HttpResponse {
                status: 404,
                body: Vec::new(),
            }))
    }
}
