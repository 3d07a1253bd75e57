//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for the worker host.
//!
//! ## Overview
//!
//! - `HttpClient` over a pooled `reqwest` client
//! - `CacheStore` using a SQLite database shared by all worker processes
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{ReqwestHttpClient, SqliteCacheStore};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let http_client = ReqwestHttpClient::new()?;
//!     let cache = SqliteCacheStore::new("/var/cache/indexer/cache.db".into()).await?;
//!     // Pass both into the indexing context
//!     Ok(())
//! }
//! ```

mod cache_store;
mod http;

pub use cache_store::SqliteCacheStore;
pub use http::ReqwestHttpClient;
