//! # Host Bridge Traits
//!
//! Capability contracts shared by the indexing crates.
//!
//! ## Overview
//!
//! The core never talks to the network, the shared cache or the wall clock
//! directly. Each of those is a trait defined here and implemented by an
//! adapter crate (`bridge-desktop` for the worker host), which keeps the core
//! testable with mocks and lets every component receive its collaborators
//! through an explicit context instead of module-level singletons.
//!
//! ## Traits
//!
//! - [`HttpClient`](http::HttpClient) - Single-attempt async HTTP plus streaming downloads
//! - [`CacheStore`](cache::CacheStore) - Keyed TTL byte store shared across workers
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type. Adapters
//! convert their native errors into it and include context such as the URL or
//! cache key involved.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so one adapter instance can be
//! shared by every worker task.

pub mod cache;
pub mod error;
pub mod http;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use cache::{CacheStore, MemoryCacheStore};
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use time::{Clock, FixedClock, SystemClock};
