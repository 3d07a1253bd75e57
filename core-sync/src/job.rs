//! # Indexing Jobs
//!
//! One job asks the orchestrator to perform one action for one identifier.
//!
//! ## Tiers
//!
//! ```text
//! add, delete            → high
//! update, zip, image     → medium
//! batch                  → low (always)
//! ```
//!
//! A requested tier may lower a job below its default but never raise it,
//! so interactive updates are never queued behind bulk reindexing.

use core_storage::ObjectId;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

use crate::error::{Result, SyncError};

/// Time allowed for a single job before it is failed
pub const DEFAULT_JOB_TIMEOUT: Duration = Duration::from_secs(2880);

// ============================================================================
// ID Types
// ============================================================================

/// Unique identifier for a queued job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(Uuid);

impl JobId {
    /// Create a new random job ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a job ID from a string
    pub fn from_string(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| SyncError::InvalidJobId(e.to_string()))
    }

    /// Get the string representation
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Actions and Tiers
// ============================================================================

/// What the orchestrator should do for an identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobAction {
    /// Index a new object
    Add,
    /// Reindex a changed object
    Update,
    /// Remove the object from the index
    Delete,
    /// Refresh the archive member listing
    Zip,
    /// Flag the object as the parent of image children
    ImageParent,
    /// Bulk reindex; never cascades to dependents
    Batch,
}

impl JobAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Zip => "zip",
            Self::ImageParent => "image_parent",
            Self::Batch => "batch",
        }
    }

    /// Tier a job lands in when no override is requested
    pub fn default_priority(&self) -> Priority {
        match self {
            Self::Add | Self::Update | Self::Delete => Priority::High,
            Self::Batch => Priority::Low,
            Self::Zip | Self::ImageParent => Priority::Medium,
        }
    }

    /// Whether documents written by this action use the short commit delay
    pub fn uses_add_commit(&self) -> bool {
        matches!(self, Self::Add | Self::Delete)
    }
}

impl std::fmt::Display for JobAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobAction {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "add" => Ok(Self::Add),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            "zip" => Ok(Self::Zip),
            "image_parent" => Ok(Self::ImageParent),
            "batch" => Ok(Self::Batch),
            _ => Err(SyncError::InvalidAction(s.to_string())),
        }
    }
}

/// Queue tier; higher tiers always drain first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low = 0,
    Medium = 1,
    High = 2,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::High, Priority::Medium, Priority::Low];

    /// Tier for an action, honouring a requested tier only when it is lower
    pub fn for_action(action: JobAction, requested: Option<Priority>) -> Priority {
        let default = action.default_priority();
        match requested {
            Some(requested) if requested < default => requested,
            _ => default,
        }
    }

    /// Convert priority to database integer
    pub fn as_i32(&self) -> i32 {
        *self as i32
    }

    /// Parse priority from database integer
    pub fn from_i32(i: i32) -> Result<Self> {
        match i {
            0 => Ok(Self::Low),
            1 => Ok(Self::Medium),
            2 => Ok(Self::High),
            _ => Err(SyncError::InvalidTier(format!("priority {}", i))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(SyncError::InvalidTier(s.to_string())),
        }
    }
}

// ============================================================================
// Job
// ============================================================================

/// A queued unit of indexing work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub pid: ObjectId,
    pub action: JobAction,
    /// Tier the job was enqueued into; requeued failures return here
    pub priority: Priority,
    #[serde(with = "duration_millis")]
    pub timeout: Duration,
    /// Whether processing may enqueue jobs for dependent objects
    pub cascade: bool,
    /// Unix timestamp when enqueued
    pub enqueued_at: i64,
    /// Failure message once the job has failed
    pub error: Option<String>,
}

impl Job {
    /// Create a job in its default tier
    pub fn new(pid: impl Into<ObjectId>, action: JobAction) -> Self {
        Self {
            id: JobId::new(),
            pid: pid.into(),
            action,
            priority: action.default_priority(),
            timeout: DEFAULT_JOB_TIMEOUT,
            cascade: action != JobAction::Batch,
            enqueued_at: chrono::Utc::now().timestamp(),
            error: None,
        }
    }

    /// Request a tier; see [`Priority::for_action`]
    pub fn with_priority(mut self, requested: Priority) -> Self {
        self.priority = Priority::for_action(self.action, Some(requested));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Mark the job as a cascaded dependent that must not cascade further
    pub fn without_cascade(mut self) -> Self {
        self.cascade = false;
        self
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
