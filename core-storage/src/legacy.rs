//! Legacy HTTP storage backend
//!
//! Objects not yet migrated to the local store are served by a file-listing
//! service. One GET returns object timestamps and every file's profile.

use async_trait::async_trait;
use bridge_traits::{BridgeError, HttpClient, HttpRequest};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::backend::{ContentStream, FileContent, StorageBackend};
use crate::error::{Result, StorageError};
use crate::timestamp::parse_utc;
use crate::types::{BackendKind, FileProfile, FileState, ObjectId, StorageObject};

/// Location label when the service does not report one
pub const DEFAULT_LOCATION: &str = "fedora";

const LISTING_FIELDS: &str = "objectTimestamps=true&fields=state,size,mimetype,checksum,lastModified";

#[derive(Debug, Deserialize)]
struct FilesResponse {
    object: ObjectTimestamps,
    #[serde(default)]
    files: BTreeMap<String, WireFile>,
    #[serde(default)]
    storage: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ObjectTimestamps {
    created: String,
    #[serde(rename = "lastModified")]
    last_modified: String,
}

#[derive(Debug, Deserialize)]
struct WireFile {
    state: String,
    #[serde(default)]
    mimetype: Option<String>,
    #[serde(default)]
    size: Option<u64>,
    #[serde(default)]
    checksum: Option<String>,
    #[serde(rename = "checksumType", default)]
    checksum_type: Option<String>,
    #[serde(rename = "lastModified", default)]
    last_modified: Option<String>,
}

/// File-listing service client
pub struct LegacyHttpBackend {
    http_client: Arc<dyn HttpClient>,
    root: String,
    param: String,
}

impl LegacyHttpBackend {
    /// `root` must end with `/`; `param` is an extra query string such as an
    /// API key and may be empty.
    pub fn new(http_client: Arc<dyn HttpClient>, root: impl Into<String>, param: impl Into<String>) -> Self {
        Self {
            http_client,
            root: root.into(),
            param: param.into(),
        }
    }

    fn query(&self, extra: &str) -> String {
        match (self.param.is_empty(), extra.is_empty()) {
            (true, _) => extra.to_string(),
            (false, true) => self.param.clone(),
            (false, false) => format!("{}&{}", self.param, extra),
        }
    }

    pub fn listing_url(&self, pid: &ObjectId) -> String {
        format!("{}{}/files/?{}", self.root, pid, self.query(LISTING_FIELDS))
    }

    pub fn content_url(&self, pid: &ObjectId, name: &str) -> String {
        format!(
            "{}{}/files/{}/content/?{}",
            self.root,
            pid,
            urlencoding::encode(name),
            self.query("")
        )
    }

    fn to_object(pid: &ObjectId, response: FilesResponse) -> Result<StorageObject> {
        let parse = |value: &str| {
            parse_utc(value)
                .ok_or_else(|| StorageError::Parse(format!("bad timestamp {:?} for {}", value, pid)))
        };
        let created = parse(&response.object.created)?;
        let modified = parse(&response.object.last_modified)?;

        let mut files = BTreeMap::new();
        for (name, file) in response.files {
            if file.state != "A" {
                files.insert(name, FileState::Deleted);
                continue;
            }
            let last_modified = match file.last_modified.as_deref() {
                Some(value) => parse(value)?,
                None => modified,
            };
            files.insert(
                name,
                FileState::Active(FileProfile {
                    mimetype: file.mimetype.unwrap_or_default(),
                    size: file.size.unwrap_or(0),
                    checksum: file.checksum.unwrap_or_default(),
                    checksum_type: file.checksum_type.unwrap_or_default(),
                    last_modified,
                }),
            );
        }

        Ok(StorageObject {
            id: pid.clone(),
            created,
            modified,
            kind: BackendKind::Legacy,
            location: response
                .storage
                .unwrap_or_else(|| DEFAULT_LOCATION.to_string()),
            head_version: None,
            files,
        })
    }
}

#[async_trait]
impl StorageBackend for LegacyHttpBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Legacy
    }

    async fn resolve(&self, pid: &ObjectId) -> Result<StorageObject> {
        let url = self.listing_url(pid);
        debug!(pid = %pid, "Fetching legacy file listing");

        let response = self.http_client.execute(HttpRequest::get(&url)).await?;
        match response.status {
            404 => {
                return Err(StorageError::NotFound {
                    pid: pid.to_string(),
                })
            }
            410 => {
                return Err(StorageError::Deleted {
                    pid: pid.to_string(),
                })
            }
            _ if !response.is_success() => {
                warn!(pid = %pid, status = response.status, "Legacy listing failed");
                return Err(StorageError::Service {
                    url,
                    status: response.status,
                });
            }
            _ => {}
        }

        let listing: FilesResponse = response
            .json()
            .map_err(|e| StorageError::Parse(e.to_string()))?;
        let object = Self::to_object(pid, listing)?;
        info!(pid = %pid, location = %object.location, "Resolved object from legacy listing");
        Ok(object)
    }

    async fn get_content(&self, object: &StorageObject, name: &str) -> Result<FileContent> {
        let url = self.content_url(&object.id, name);
        let response = self.http_client.execute(HttpRequest::get(&url)).await?;

        if response.status == 404 {
            return Err(StorageError::FileNotFound {
                pid: object.id.to_string(),
                name: name.to_string(),
            });
        }
        if !response.is_success() {
            return Err(StorageError::Service {
                url,
                status: response.status,
            });
        }

        let content_type = response.content_type().map(str::to_string);
        Ok(FileContent::new(response.body, content_type))
    }

    async fn open_stream(&self, object: &StorageObject, name: &str) -> Result<ContentStream> {
        let url = self.content_url(&object.id, name);
        match self.http_client.download_stream(url).await {
            Ok(stream) => Ok(stream),
            Err(BridgeError::HttpStatus { status: 404, .. }) => Err(StorageError::FileNotFound {
                pid: object.id.to_string(),
                name: name.to_string(),
            }),
            Err(BridgeError::HttpStatus { url, status }) => Err(StorageError::Service { url, status }),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::HttpResponse;
    use mockall::mock;

    mock! {
        HttpClient {}

        #[async_trait]
        impl HttpClient for HttpClient {
            async fn execute(&self, request: HttpRequest) -> bridge_traits::error::Result<HttpResponse>;
            async fn download_stream(&self, url: String) -> bridge_traits::error::Result<Box<dyn tokio::io::AsyncRead + Send + Unpin>>;
        }
    }

    const LISTING: &str = r#"{
        "object": {"created": "2020-01-01T10:00:00Z", "lastModified": "2021-03-23T10:20:30.123Z"},
        "files": {
            "MODS": {"state": "A", "mimetype": "text/xml", "size": 120, "checksum": "abc",
                     "checksumType": "SHA-256", "lastModified": "2021-03-23T06:20:30-04:00"},
            "OLD": {"state": "D"}
        },
        "storage": "fedora"
    }"#;

    fn backend(mock: MockHttpClient) -> LegacyHttpBackend {
        LegacyHttpBackend::new(Arc::new(mock), "https://storage.test/api/", "api_key=k")
    }

    #[tokio::test]
    async fn test_resolve_listing() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute()
            .withf(|req| {
                req.url
                    == "https://storage.test/api/test:1/files/?api_key=k&objectTimestamps=true&fields=state,size,mimetype,checksum,lastModified"
            })
            .times(1)
            .returning(|_| Ok(HttpResponse::new(200, LISTING)));

        let object = backend(mock).resolve(&ObjectId::new("test:1")).await.unwrap();

        assert_eq!(object.kind, BackendKind::Legacy);
        assert_eq!(object.location, "fedora");
        assert_eq!(object.active_file_names(), vec!["MODS"]);
        assert_eq!(object.all_file_names(), vec!["MODS", "OLD"]);

        let mods = object.active_file("MODS").unwrap();
        assert_eq!(mods.size, 120);
        assert_eq!(mods.last_modified.to_rfc3339(), "2021-03-23T10:20:30+00:00");
    }

    #[tokio::test]
    async fn test_status_mapping() {
        for (status, expected) in [(404u16, "not_found"), (410, "deleted"), (503, "service")] {
            let mut mock = MockHttpClient::new();
            mock.expect_execute()
                .returning(move |_| Ok(HttpResponse::new(status, "")));

            let err = backend(mock)
                .resolve(&ObjectId::new("test:1"))
                .await
                .unwrap_err();
            let kind = match err {
                StorageError::NotFound { .. } => "not_found",
                StorageError::Deleted { .. } => "deleted",
                StorageError::Service { status: 503, .. } => "service",
                other => panic!("unexpected error {other:?}"),
            };
            assert_eq!(kind, expected);
        }
    }

    #[tokio::test]
    async fn test_get_content_missing_file() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute()
            .times(2)
            .returning(|req| {
                if req.url.contains("/content/") {
                    Ok(HttpResponse::new(404, ""))
                } else {
                    Ok(HttpResponse::new(200, LISTING))
                }
            });

        let backend = backend(mock);
        let object = backend.resolve(&ObjectId::new("test:1")).await.unwrap();
        let err = backend.get_content(&object, "DWC").await.unwrap_err();
        assert!(err.is_file_not_found());
    }

    #[test]
    fn test_content_url_without_param() {
        let backend = LegacyHttpBackend::new(
            Arc::new(MockHttpClient::new()),
            "https://storage.test/",
            "",
        );
        assert_eq!(
            backend.content_url(&ObjectId::new("test:1"), "MODS"),
            "https://storage.test/test:1/files/MODS/content/?"
        );
    }
}
