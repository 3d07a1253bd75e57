//! reqwest-backed [`HttpClient`]

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    http::{HttpClient, HttpMethod, HttpRequest, HttpResponse},
};
use futures_util::TryStreamExt;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Pooled client shared by every component of one worker process
pub struct ReqwestHttpClient {
    client: Client,
}

impl ReqwestHttpClient {
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(30))
    }

    /// `timeout` bounds each whole request, body included
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        Client::builder()
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT)
            .pool_max_idle_per_host(10)
            .user_agent(concat!("repo-indexer/", env!("CARGO_PKG_VERSION")))
            .build()
            .map(|client| Self { client })
            .map_err(|e| BridgeError::NotAvailable(format!("Cannot build HTTP client: {}", e)))
    }

    fn method(method: HttpMethod) -> reqwest::Method {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
        }
    }

    fn prepare(&self, request: HttpRequest) -> reqwest::RequestBuilder {
        let mut builder = self.client.request(Self::method(request.method), &request.url);
        for (name, value) in request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }
        match request.timeout {
            Some(timeout) => builder.timeout(timeout),
            None => builder,
        }
    }

    fn transport_error(url: &str, e: reqwest::Error) -> BridgeError {
        warn!(url = %url, error = %e, "HTTP transport failure");
        let message = if e.is_timeout() {
            format!("{} timed out", url)
        } else if e.is_connect() {
            format!("cannot connect to {}: {}", url, e)
        } else {
            format!("{}: {}", url, e)
        };
        BridgeError::OperationFailed(message)
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let url = request.url.clone();
        debug!(url = %url, method = ?request.method, "HTTP request");

        let response = self
            .prepare(request)
            .send()
            .await
            .map_err(|e| Self::transport_error(&url, e))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| Self::transport_error(&url, e))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }

    async fn download_stream(
        &self,
        url: String,
    ) -> Result<Box<dyn tokio::io::AsyncRead + Send + Unpin>> {
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Self::transport_error(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BridgeError::HttpStatus {
                url,
                status: status.as_u16(),
            });
        }

        let chunks = response.bytes_stream().map_err(std::io::Error::other);
        Ok(Box::new(tokio_util::io::StreamReader::new(chunks)))
    }
}
