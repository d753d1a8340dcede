//! Remote API Client
//!
//! Thin wrapper over `reqwest` for the storefront's JSON REST API. Every
//! response passes through the registered observers before the caller sees it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::Form;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde_json::Value;
use tracing::debug;

use crate::error::{AppError, Result};

// == Remote Source ==
/// Read seam used by the fetch services.
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Issues a GET for `path` and returns the decoded JSON body.
    async fn get_json(&self, path: &str) -> Result<Value>;
}

// == Response Observer ==
/// Hook run on every response, before the awaiting caller resumes.
#[async_trait]
pub trait ResponseObserver: Send + Sync {
    async fn on_response(&self, method: &Method, status: StatusCode);
}

// == Api Client ==
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    observers: Vec<Arc<dyn ResponseObserver>>,
}

impl ApiClient {
    /// Creates a client for `base_url` with a per-request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("http client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            observers: Vec::new(),
        })
    }

    /// Attaches an observer to the response pipeline.
    pub fn with_observer(mut self, observer: Arc<dyn ResponseObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    // == Send JSON ==
    /// Sends a request with an optional JSON body.
    pub async fn send_json(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value> {
        let mut request = self.http.request(method.clone(), self.url(path));
        if let Some(body) = body {
            request = request.json(body);
        }
        self.dispatch(method, path, request).await
    }

    // == Send Multipart ==
    /// Sends a multipart form, used for uploads with images.
    pub async fn send_multipart(&self, method: Method, path: &str, form: Form) -> Result<Value> {
        let request = self.http.request(method.clone(), self.url(path)).multipart(form);
        self.dispatch(method, path, request).await
    }

    async fn dispatch(&self, method: Method, path: &str, request: RequestBuilder) -> Result<Value> {
        let response = request.send().await?;
        let status = response.status();
        debug!(%method, path, status = status.as_u16(), "remote response");

        for observer in &self.observers {
            observer.on_response(&method, status).await;
        }

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AppError::RemoteStatus {
                status: status.as_u16(),
                message,
            });
        }

        let bytes = response.bytes().await?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).map_err(|e| AppError::MalformedPayload(e.to_string()))?
        };

        check_envelope(&body)?;
        Ok(body)
    }
}

#[async_trait]
impl RemoteSource for ApiClient {
    async fn get_json(&self, path: &str) -> Result<Value> {
        let request = self.http.get(self.url(path));
        self.dispatch(Method::GET, path, request).await
    }
}

// == Envelope ==
/// Rejects bodies of the form `{ "success": false, ... }`.
fn check_envelope(body: &Value) -> Result<()> {
    if body.get("success") == Some(&Value::Bool(false)) {
        let message = body
            .get("message")
            .or_else(|| body.get("error"))
            .and_then(Value::as_str)
            .unwrap_or("operation reported failure")
            .to_string();
        return Err(AppError::Rejected(message));
    }
    Ok(())
}
