//! Collection hierarchy lookup
//!
//! Resolves a collection id to the names of its ancestors followed by its
//! own name. Answers are cached in the shared store for a day; a cache
//! problem falls through to the live service, but a failing live call is an
//! error.
//!
//! ## API Endpoint
//!
//! - `GET {collection_root}{id}/?{param}` → `{"ancestors": [names], "name": name}`

use async_trait::async_trait;
use bridge_traits::{CacheStore, HttpClient, HttpRequest};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{MetadataError, Result};

pub const COLLECTION_TTL: Duration = Duration::from_secs(60 * 60 * 24);

pub fn collection_key(id: &str) -> String {
    format!("collection:{}:ancestors", id)
}

#[async_trait]
pub trait CollectionLookup: Send + Sync {
    /// Ancestor names, outermost first, ending with the collection's own name
    async fn ancestors(&self, id: &str) -> Result<Vec<String>>;

    /// Names for several collections, in order
    async fn names_for(&self, ids: &[String]) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for id in ids {
            names.extend(self.ancestors(id).await?);
        }
        Ok(names)
    }
}

#[derive(Debug, Deserialize)]
struct CollectionResponse {
    #[serde(default)]
    ancestors: Vec<String>,
    name: String,
}

/// Collection service client with shared caching
pub struct HttpCollectionLookup {
    http_client: Arc<dyn HttpClient>,
    cache: Arc<dyn CacheStore>,
    root: String,
    param: String,
}

impl HttpCollectionLookup {
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        cache: Arc<dyn CacheStore>,
        root: impl Into<String>,
        param: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            cache,
            root: root.into(),
            param: param.into(),
        }
    }

    pub fn url(&self, id: &str) -> String {
        format!("{}{}/?{}", self.root, urlencoding::encode(id), self.param)
    }

    async fn cached(&self, key: &str) -> Option<Vec<String>> {
        match self.cache.get(key).await {
            Ok(Some(bytes)) => match serde_json::from_slice::<Vec<String>>(&bytes) {
                Ok(names) if !names.is_empty() => Some(names),
                Ok(_) => None,
                Err(e) => {
                    warn!(key, error = %e, "Discarding undecodable collection cache entry");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(key, error = %e, "Collection cache read failed");
                None
            }
        }
    }

    async fn fetch(&self, id: &str) -> Result<Vec<String>> {
        let url = self.url(id);
        let response = self.http_client.execute(HttpRequest::get(&url)).await?;
        if !response.is_success() {
            return Err(MetadataError::CollectionLookup {
                id: id.to_string(),
                message: format!("{} returned status {}", url, response.status),
            });
        }

        let body: CollectionResponse =
            response
                .json()
                .map_err(|e| MetadataError::CollectionLookup {
                    id: id.to_string(),
                    message: e.to_string(),
                })?;

        let mut names = body.ancestors;
        names.push(body.name);
        Ok(names)
    }
}

#[async_trait]
impl CollectionLookup for HttpCollectionLookup {
    async fn ancestors(&self, id: &str) -> Result<Vec<String>> {
        let key = collection_key(id);
        if let Some(names) = self.cached(&key).await {
            debug!(collection = id, "Collection ancestry served from cache");
            return Ok(names);
        }

        let names = self.fetch(id).await?;
        match serde_json::to_vec(&names) {
            Ok(bytes) => {
                if let Err(e) = self.cache.set(&key, &bytes, COLLECTION_TTL).await {
                    warn!(key = %key, error = %e, "Collection cache write failed");
                }
            }
            Err(e) => warn!(key = %key, error = %e, "Failed to encode collection ancestry"),
        }
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::{HttpResponse, MemoryCacheStore};
    use mockall::mock;

    mock! {
        HttpClient {}

        #[async_trait]
        impl HttpClient for HttpClient {
            async fn execute(&self, request: HttpRequest) -> bridge_traits::error::Result<HttpResponse>;
            async fn download_stream(&self, url: String) -> bridge_traits::error::Result<Box<dyn tokio::io::AsyncRead + Send + Unpin>>;
        }
    }

    #[tokio::test]
    async fn test_live_lookup_then_cache() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute()
            .withf(|req| req.url == "https://collections.test/42/?key=v")
            .times(1)
            .returning(|_| {
                Ok(HttpResponse::new(
                    200,
                    r#"{"ancestors": ["Library", "Archives"], "name": "Theses"}"#,
                ))
            });

        let cache = Arc::new(MemoryCacheStore::new());
        let lookup = HttpCollectionLookup::new(
            Arc::new(mock),
            cache.clone(),
            "https://collections.test/",
            "key=v",
        );

        let expected = vec!["Library", "Archives", "Theses"];
        assert_eq!(lookup.ancestors("42").await.unwrap(), expected);
        // second call must not reach the service
        assert_eq!(lookup.ancestors("42").await.unwrap(), expected);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_live_failure_is_error() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute()
            .returning(|_| Ok(HttpResponse::new(500, "boom")));

        let lookup = HttpCollectionLookup::new(
            Arc::new(mock),
            Arc::new(MemoryCacheStore::new()),
            "https://collections.test/",
            "",
        );
        let err = lookup.ancestors("7").await.unwrap_err();
        assert!(matches!(err, MetadataError::CollectionLookup { .. }));
    }
}
