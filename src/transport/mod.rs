//! Generic JSON-over-HTTP transport.
//!
//! `HttpClient::send` is the single path every call takes:
//! URL + headers -> request interceptors -> backend -> response interceptors
//! -> status check -> JSON parse -> envelope normalization.

mod backend;
mod envelope;
mod error;
mod interceptors;
mod request;

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

pub use backend::{HttpBackend, ReqwestBackend};
pub use envelope::{normalize, Envelope, ListPayload, PageMeta};
pub use error::{DataError, DataErrorKind, FieldErrors};
pub use interceptors::{InterceptorChain, RequestInterceptor, ResponseInterceptor};
pub use request::{Headers, HttpRequest, HttpResponse, Method, RequestOptions};

use crate::session::Session;

/// What a call resolved to: normalized JSON, or the untouched response when
/// `raw` was requested.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Data(Value),
    Raw(HttpResponse),
}

pub struct HttpClient {
    base_url: String,
    backend: Arc<dyn HttpBackend>,
    session: Session,
    request_interceptors: InterceptorChain<dyn RequestInterceptor>,
    response_interceptors: InterceptorChain<dyn ResponseInterceptor>,
}

/// Validate the base URL. Only http and https are accepted.
fn validate_base_url(base_url: &str) -> Result<(), String> {
    let parsed = reqwest::Url::parse(base_url)
        .map_err(|e| format!("Invalid base_url '{}': {}", base_url, e))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(format!(
            "Unsupported URL scheme '{}' in base_url '{}'. Only http and https are allowed.",
            other, base_url
        )),
    }
}

fn is_absolute(endpoint: &str) -> bool {
    let lower = endpoint.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

impl HttpClient {
    pub fn new(
        base_url: &str,
        backend: Arc<dyn HttpBackend>,
        session: Session,
    ) -> Result<Self, String> {
        validate_base_url(base_url)?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            backend,
            session,
            request_interceptors: InterceptorChain::new(),
            response_interceptors: InterceptorChain::new(),
        })
    }

    /// Client backed by `reqwest` with the given request timeout.
    pub fn with_reqwest(base_url: &str, timeout: Duration, session: Session) -> Result<Self, String> {
        let backend = ReqwestBackend::new(timeout)?;
        Self::new(base_url, Arc::new(backend), session)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn add_request_interceptor(
        &self,
        interceptor: Arc<dyn RequestInterceptor>,
    ) -> Arc<dyn RequestInterceptor> {
        self.request_interceptors.add(interceptor)
    }

    pub fn remove_request_interceptor(&self, interceptor: &Arc<dyn RequestInterceptor>) -> bool {
        self.request_interceptors.remove(interceptor)
    }

    pub fn add_response_interceptor(
        &self,
        interceptor: Arc<dyn ResponseInterceptor>,
    ) -> Arc<dyn ResponseInterceptor> {
        self.response_interceptors.add(interceptor)
    }

    pub fn remove_response_interceptor(&self, interceptor: &Arc<dyn ResponseInterceptor>) -> bool {
        self.response_interceptors.remove(interceptor)
    }

    /// Resolve the endpoint against the base URL and append the defined
    /// query parameters.
    pub fn build_url(
        &self,
        endpoint: &str,
        params: &[(String, Option<String>)],
        external: bool,
    ) -> Result<String, DataError> {
        let joined = if external || is_absolute(endpoint) {
            endpoint.to_string()
        } else if endpoint.is_empty() {
            self.base_url.clone()
        } else if endpoint.starts_with('/') {
            format!("{}{}", self.base_url, endpoint)
        } else {
            format!("{}/{}", self.base_url, endpoint)
        };

        let mut url = reqwest::Url::parse(&joined)
            .map_err(|e| DataError::network(format!("Invalid URL '{}': {}", joined, e)))?;

        let defined: Vec<(&str, &str)> = params
            .iter()
            .filter_map(|(k, v)| v.as_deref().map(|v| (k.as_str(), v)))
            .collect();
        if !defined.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in defined {
                pairs.append_pair(k, v);
            }
        }

        Ok(url.into())
    }

    fn build_headers(&self, overrides: &Headers) -> Headers {
        let mut headers = Headers::new();
        headers.set("Content-Type", "application/json");
        headers.set("Accept", "application/json");
        if let Some(token) = self.session.bearer_token() {
            headers.set("Authorization", format!("Bearer {}", token));
        }
        headers.merge(overrides);
        headers
    }

    /// Run one request through the full pipeline.
    pub async fn send(&self, endpoint: &str, options: RequestOptions) -> Result<Reply, DataError> {
        let url = self.build_url(endpoint, &options.params, options.external)?;
        let request = HttpRequest {
            method: options.method,
            url,
            headers: self.build_headers(&options.headers),
            body: options.body,
        };
        let request = self.request_interceptors.apply(request);
        let method = request.method;
        let url = request.url.clone();
        debug!(%method, url = %url, "Sending request");

        let response = match self.backend.send(request).await {
            Ok(resp) => resp,
            Err(e) => {
                warn!(%method, url = %url, error = %e, "Request failed before a response arrived");
                return Err(e);
            }
        };
        let response = self.response_interceptors.apply(response);

        if !response.is_success() {
            let err = DataError::from_status(response.status, &response.body);
            warn!(%method, url = %url, status = response.status, "Server returned error: {}", err.message());
            return Err(err);
        }

        if options.raw {
            return Ok(Reply::Raw(response));
        }

        let body: Value = if response.body.iter().all(u8::is_ascii_whitespace) {
            Value::Null
        } else {
            serde_json::from_slice(&response.body).map_err(|e| {
                warn!(%method, url = %url, "Response is not valid JSON: {}", e);
                DataError::parse(format!("Invalid JSON from {} {}: {}", method, url, e))
            })?
        };

        envelope::normalize(body).map(Reply::Data)
    }

    /// Normalized JSON for the endpoint, decoded into `T`.
    pub async fn request<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        mut options: RequestOptions,
    ) -> Result<T, DataError> {
        options.raw = false;
        let value = match self.send(endpoint, options).await? {
            Reply::Data(value) => value,
            Reply::Raw(resp) => return Err(DataError::parse(format!("Unexpected raw response ({})", resp.status))),
        };
        serde_json::from_value(value)
            .map_err(|e| DataError::parse(format!("Unexpected response shape from {}: {}", endpoint, e)))
    }

    /// The response as received, for binary or streamed payloads.
    pub async fn request_raw(
        &self,
        endpoint: &str,
        mut options: RequestOptions,
    ) -> Result<HttpResponse, DataError> {
        options.raw = true;
        match self.send(endpoint, options).await? {
            Reply::Raw(resp) => Ok(resp),
            Reply::Data(_) => Err(DataError::parse("Expected a raw response")),
        }
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: Vec<(String, Option<String>)>,
    ) -> Result<T, DataError> {
        let mut options = RequestOptions::new(Method::Get);
        options.params = params;
        self.request(endpoint, options).await
    }

    pub async fn post<T: DeserializeOwned>(&self, endpoint: &str, body: Value) -> Result<T, DataError> {
        self.request(endpoint, RequestOptions::new(Method::Post).body(body))
            .await
    }

    pub async fn put<T: DeserializeOwned>(&self, endpoint: &str, body: Value) -> Result<T, DataError> {
        self.request(endpoint, RequestOptions::new(Method::Put).body(body))
            .await
    }

    pub async fn patch<T: DeserializeOwned>(&self, endpoint: &str, body: Value) -> Result<T, DataError> {
        self.request(endpoint, RequestOptions::new(Method::Patch).body(body))
            .await
    }

    pub async fn delete<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, DataError> {
        self.request(endpoint, RequestOptions::new(Method::Delete))
            .await
    }
}
