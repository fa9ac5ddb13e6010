//! HTTP client with bearer-token injection and response normalization.
//!
//! Every request goes through the same two stages:
//! - before sending, the current session token (if any) is attached as
//!   `Authorization: Bearer <token>`;
//! - after the response, a 2xx body is decoded and handed back as the bare
//!   payload, while any failure is classified, reported once through the
//!   notifier, and returned to the caller unchanged.
//!
//! There are no retries and no response cache.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use super::auth::CredentialStore;
use super::error::ApiError;
use crate::config::ApiConfig;
use crate::notify::{Notifier, Severity};

/// Upper bound for establishing a connection.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// One outbound call, relative to the API base URL.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: &str) -> Self {
        Self {
            method,
            path: path.to_string(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: &str) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: &str) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: &str) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: &str) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Append a query parameter.
    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    /// Attach a JSON body.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        self.body = Some(serde_json::to_value(body).map_err(ApiError::Encode)?);
        Ok(self)
    }
}

/// The shared API client. Create one per process and hand out `Arc`s.
pub struct ApiClient {
    client: Client,
    base_url: String,
    credentials: Arc<dyn CredentialStore>,
    notifier: Arc<dyn Notifier>,
}

impl ApiClient {
    /// Build the client for `config`.
    ///
    /// Fails only if the underlying reqwest client cannot be constructed
    /// (e.g. the TLS backend fails to initialise).
    pub fn new(
        config: &ApiConfig,
        credentials: Arc<dyn CredentialStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(CONNECT_TIMEOUT.min(config.timeout))
            .user_agent(concat!("mailer-console/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ApiError::Client)?;
        Ok(Self {
            client,
            base_url: config.base_url(),
            credentials,
            notifier,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for an API-relative path.
    pub fn url(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        if path.is_empty() {
            self.base_url.clone()
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Send a GET and decode the payload.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send(ApiRequest::get(path)).await
    }

    /// Send a GET with query parameters.
    pub async fn get_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        let request = query
            .iter()
            .fold(ApiRequest::get(path), |req, (k, v)| req.query(k, v));
        self.send(request).await
    }

    /// Send a POST with a JSON body.
    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(ApiRequest::post(path).json(body)?).await
    }

    /// Send a PUT with a JSON body.
    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(ApiRequest::put(path).json(body)?).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send(ApiRequest::delete(path)).await
    }

    /// Run a request through the pipeline.
    pub async fn send<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let outcome = self.execute(&request).await;
        self.finish(&request, outcome)
    }

    /// Like [`send`](Self::send), but abandons the transport call as soon as
    /// `cancel` fires.
    ///
    /// A cancelled call returns [`ApiError::Cancelled`] without decoding
    /// anything and without notifying the user.
    pub async fn send_cancellable<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
        cancel: &CancellationToken,
    ) -> Result<T, ApiError> {
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                log::debug!("{} {} cancelled", request.method, request.path);
                return Err(ApiError::Cancelled);
            }
            outcome = self.execute(&request) => outcome,
        };
        self.finish(&request, outcome)
    }

    /// Attach the session token, when one is stored.
    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.credentials.read().filter(|t| !t.is_empty()) {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn build(&self, request: &ApiRequest) -> RequestBuilder {
        let mut builder = self
            .client
            .request(request.method.clone(), self.url(&request.path));
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }
        self.authorize(builder)
    }

    /// Transport stage: returns the raw 2xx body or the classified failure.
    async fn execute(&self, request: &ApiRequest) -> Result<Vec<u8>, ApiError> {
        log::debug!("{} {}", request.method, request.path);

        let resp = self
            .build(request)
            .send()
            .await
            .map_err(ApiError::from_transport)?;

        let status = resp.status();
        let body = resp.bytes().await.map_err(ApiError::from_transport)?;

        if !status.is_success() {
            return Err(ApiError::from_status(status.as_u16(), &body));
        }
        Ok(body.to_vec())
    }

    /// Response stage: decode on success, report once on failure.
    fn finish<T: DeserializeOwned>(
        &self,
        request: &ApiRequest,
        outcome: Result<Vec<u8>, ApiError>,
    ) -> Result<T, ApiError> {
        let result = outcome.and_then(|body| decode_payload(&body));
        if let Err(ref e) = result {
            log::warn!("{} {} failed: {}", request.method, request.path, e);
            if let Some(message) = e.notice() {
                self.notifier.notify(Severity::Error, message);
            }
        }
        result
    }
}

/// Decode a success body. An empty body decodes as JSON `null`, so `()` and
/// `Option<T>` payloads work for 204-style responses.
pub fn decode_payload<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    let decoded = if body.iter().all(u8::is_ascii_whitespace) {
        serde_json::from_value(Value::Null)
    } else {
        serde_json::from_slice(body)
    };
    decoded.map_err(|e| ApiError::from_decode(e, body))
}
