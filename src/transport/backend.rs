use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::warn;

use super::error::DataError;
use super::request::{Headers, HttpRequest, HttpResponse, Method};

/// Performs the actual network call. Errors returned here are always
/// `DataError::Network`: a backend either produced a response or it didn't.
#[async_trait]
pub trait HttpBackend: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, DataError>;
}

/// Set to `1`/`true` to skip the OS proxy lookup for the tracker API client.
pub const DISABLE_SYSTEM_PROXY_ENV: &str = "TASKDECK_DISABLE_SYSTEM_PROXY";

fn system_proxy_disabled() -> bool {
    matches!(
        std::env::var(DISABLE_SYSTEM_PROXY_ENV).as_deref(),
        Ok("1") | Ok("true") | Ok("TRUE")
    )
}

fn direct_client(timeout: Duration) -> Result<Client, String> {
    Client::builder()
        .timeout(timeout)
        .no_proxy()
        .build()
        .map_err(|e| format!("Failed to build HTTP client: {}", e))
}

/// Client for the tracker API. Proxy discovery goes through the OS and can
/// panic in sandboxed or headless runtimes, so tests skip it and any failure
/// there falls back to a direct client.
pub(crate) fn build_http_client(timeout: Duration) -> Result<Client, String> {
    if cfg!(test) || system_proxy_disabled() {
        return direct_client(timeout);
    }

    let discovered = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        Client::builder().timeout(timeout).build()
    }));
    match discovered {
        Ok(Ok(client)) => Ok(client),
        Ok(Err(e)) => {
            warn!(error = %e, "Proxy-aware API client failed to build; connecting directly");
            direct_client(timeout)
        }
        Err(_) => {
            warn!("Proxy discovery panicked; connecting to the API directly");
            direct_client(timeout)
        }
    }
}

pub struct ReqwestBackend {
    client: Client,
}

impl ReqwestBackend {
    pub fn new(timeout: Duration) -> Result<Self, String> {
        Ok(Self {
            client: build_http_client(timeout)?,
        })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

fn to_reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}

fn network_error(err: &reqwest::Error) -> DataError {
    if err.is_timeout() {
        DataError::timeout(err.to_string())
    } else {
        DataError::network(err.to_string())
    }
}

#[async_trait]
impl HttpBackend for ReqwestBackend {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, DataError> {
        let url = reqwest::Url::parse(&request.url)
            .map_err(|e| DataError::network(format!("Invalid URL '{}': {}", request.url, e)))?;

        let mut builder = self
            .client
            .request(to_reqwest_method(request.method), url);
        for (name, value) in request.headers.iter() {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let resp = builder.send().await.map_err(|e| network_error(&e))?;

        let status = resp.status().as_u16();
        let mut headers = Headers::new();
        for (name, value) in resp.headers() {
            if let Ok(value) = value.to_str() {
                headers.set(name.as_str(), value);
            }
        }
        // A body cut off mid-stream means no complete response was received.
        let body = resp.bytes().await.map_err(|e| network_error(&e))?;

        Ok(HttpResponse {
            status,
            headers,
            body: body.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_http_client_in_tests_skips_discovery() {
        assert!(build_http_client(Duration::from_secs(1)).is_ok());
    }

    #[tokio::test]
    async fn test_unparseable_url_is_network_error() {
        let backend = ReqwestBackend::new(Duration::from_secs(1)).unwrap();
        let err = backend
            .send(HttpRequest {
                method: Method::Get,
                url: "not a url".into(),
                headers: Headers::new(),
                body: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DataError::Network { timed_out: false, .. }));
    }
}
