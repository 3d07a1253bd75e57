//! HTTP bridge
//!
//! The storage service, the collection service and the search engine are all
//! reached through [`HttpClient`]. A request is sent once; status handling is
//! left to the caller, and failed jobs are resubmitted by an operator rather
//! than retried here.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::error::{BridgeError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// Outgoing request
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Option<Bytes>,
    /// Overrides the client-wide timeout for this request only
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    fn with_method(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HashMap::new(),
            body: None,
            timeout: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::with_method(HttpMethod::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::with_method(HttpMethod::Post, url)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Serialize `payload` as the body and mark it `application/json`
    pub fn json<T: Serialize>(self, payload: &T) -> Result<Self> {
        let encoded = serde_json::to_vec(payload)
            .map_err(|e| BridgeError::OperationFailed(format!("Cannot encode JSON body: {}", e)))?;
        let mut request = self.header("Content-Type", "application/json");
        request.body = Some(Bytes::from(encoded));
        Ok(request)
    }

    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }
}

/// Fully buffered response
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|e| {
            BridgeError::OperationFailed(format!("Cannot decode JSON response: {}", e))
        })
    }

    pub fn text(&self) -> Result<String> {
        std::str::from_utf8(&self.body)
            .map(str::to_owned)
            .map_err(|e| BridgeError::OperationFailed(format!("Response is not UTF-8: {}", e)))
    }

    /// Header value, matched without regard to case
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find_map(|(key, value)| key.eq_ignore_ascii_case(name).then_some(value.as_str()))
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }
}

/// Async HTTP transport
///
/// ```ignore
/// let listing = client.execute(HttpRequest::get(url)).await?.text()?;
/// ```
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Send a request and buffer the response.
    ///
    /// Any status, including 404 and 410, comes back as `Ok`; only transport
    /// failures are errors.
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;

    /// GET `url` as a byte stream for bodies too large to buffer.
    ///
    /// A non-2xx status yields [`BridgeError::HttpStatus`].
    async fn download_stream(
        &self,
        url: String,
    ) -> Result<Box<dyn tokio::io::AsyncRead + Send + Unpin>>;
}
