//! Search engine client
//!
//! Writes go to `{root}update/json?commitWithin={ms}`; reads go to
//! `{root}select/`. The engine commits on its own schedule, so a write
//! returning does not mean the document is searchable yet.

use async_trait::async_trait;
use bridge_traits::http::{HttpClient, HttpRequest};
use core_metadata::{DocumentSnapshot, UpdateCommand};
use core_storage::ObjectId;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{Result, SyncError};
use crate::job::JobAction;

/// Rows fetched per page when listing dependents
const DEPENDENTS_PAGE_SIZE: usize = 500;

/// Stored fields needed to decide whether an archive must be relisted
pub const SNAPSHOT_FIELDS: &str = "pid,zip_filelist_timestamp_dsi";

/// Search engine operations used by the orchestrator
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Send one write; a non-2xx answer is an error
    async fn post(&self, command: &UpdateCommand, action: JobAction) -> Result<()>;

    /// Objects whose relationship graph names `pid` as derivation source or
    /// part-of parent, excluding `pid` itself
    async fn dependents(&self, pid: &ObjectId) -> Result<Vec<ObjectId>>;

    /// Stored fields of the current document; empty when it is not indexed
    async fn snapshot(&self, pid: &ObjectId) -> Result<DocumentSnapshot>;
}

#[derive(Debug, Deserialize)]
struct SelectResponse {
    response: SelectBody,
}

#[derive(Debug, Deserialize)]
struct SelectBody {
    #[serde(rename = "numFound")]
    num_found: usize,
    #[serde(default)]
    docs: Vec<Map<String, Value>>,
}

/// Solr over the shared HTTP client
pub struct SolrClient {
    http: Arc<dyn HttpClient>,
    root: String,
    commit_within: Duration,
    commit_within_add: Duration,
}

impl SolrClient {
    /// `root` must end with `/`
    pub fn new(
        http: Arc<dyn HttpClient>,
        root: impl Into<String>,
        commit_within: Duration,
        commit_within_add: Duration,
    ) -> Self {
        Self {
            http,
            root: root.into(),
            commit_within,
            commit_within_add,
        }
    }

    /// Update URL; adds and deletes get the shorter commit delay
    pub fn update_url(&self, command: &UpdateCommand, action: JobAction) -> String {
        let delay = if matches!(command, UpdateCommand::Delete(_)) || action.uses_add_commit() {
            self.commit_within_add
        } else {
            self.commit_within
        };
        format!(
            "{}update/json?commitWithin={}",
            self.root,
            delay.as_millis()
        )
    }

    fn select_url(&self, query: &str, fields: &str, extra: &str) -> String {
        format!(
            "{}select/?q={}&fl={}{}",
            self.root,
            urlencoding::encode(query),
            fields,
            extra
        )
    }

    async fn select(&self, url: String) -> Result<Option<SelectBody>> {
        let response = self.http.execute(HttpRequest::get(url.clone())).await?;
        if !response.is_success() {
            warn!(
                url = %url,
                status = response.status,
                body = %String::from_utf8_lossy(&response.body),
                "Search index query failed"
            );
            return Ok(None);
        }
        let parsed: SelectResponse = response
            .json()
            .map_err(|e| SyncError::IndexResponse(e.to_string()))?;
        Ok(Some(parsed.response))
    }
}

#[async_trait]
impl SearchIndex for SolrClient {
    async fn post(&self, command: &UpdateCommand, action: JobAction) -> Result<()> {
        let url = self.update_url(command, action);
        let request = HttpRequest::post(url).json(&command.to_body())?;
        let response = self.http.execute(request).await?;

        if !response.is_success() {
            return Err(SyncError::IndexWrite {
                pid: command_pid(command).to_string(),
                action: command.kind().to_string(),
                status: response.status,
                body: String::from_utf8_lossy(&response.body).into_owned(),
            });
        }
        debug!(pid = %command_pid(command), kind = command.kind(), "Posted to search index");
        Ok(())
    }

    async fn dependents(&self, pid: &ObjectId) -> Result<Vec<ObjectId>> {
        let query = format!(
            "rel_is_derivation_of_ssim:\"{0}\" OR rel_is_part_of_ssim:\"{0}\"",
            pid
        );
        let mut dependents = Vec::new();
        let mut start = 0;

        loop {
            let url = self.select_url(
                &query,
                "pid",
                &format!("&rows={}&start={}", DEPENDENTS_PAGE_SIZE, start),
            );
            let Some(page) = self.select(url.clone()).await? else {
                return Err(SyncError::IndexResponse(format!(
                    "dependents query failed: {}",
                    url
                )));
            };

            let fetched = page.docs.len();
            dependents.extend(
                page.docs
                    .iter()
                    .filter_map(|doc| doc.get("pid").and_then(Value::as_str))
                    .filter(|dependent| *dependent != pid.as_str())
                    .map(ObjectId::from),
            );

            start += fetched;
            if fetched == 0 || start >= page.num_found {
                break;
            }
        }

        Ok(dependents)
    }

    async fn snapshot(&self, pid: &ObjectId) -> Result<DocumentSnapshot> {
        let url = self.select_url(&format!("pid:\"{}\"", pid), SNAPSHOT_FIELDS, "");
        let Some(body) = self.select(url).await? else {
            return Ok(DocumentSnapshot::default());
        };

        if body.num_found != 1 {
            warn!(pid = %pid, found = body.num_found, "Expected exactly one indexed document");
            return Ok(DocumentSnapshot::default());
        }
        Ok(body
            .docs
            .into_iter()
            .next()
            .map(DocumentSnapshot::new)
            .unwrap_or_default())
    }
}

fn command_pid(command: &UpdateCommand) -> &str {
    match command {
        UpdateCommand::Add(doc) => doc.get_text("pid").unwrap_or_default(),
        UpdateCommand::Patch(patch) => patch.pid.as_str(),
        UpdateCommand::Delete(pid) => pid.as_str(),
    }
}
