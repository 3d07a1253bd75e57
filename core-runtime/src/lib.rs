//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the indexing workers:
//! - Logging and tracing infrastructure
//! - Configuration management
//!
//! ## Overview
//!
//! Every other crate depends on this one for its configuration type and the
//! logging conventions used throughout the system.

pub mod config;
pub mod error;
pub mod logging;

pub use config::{IndexerConfig, IndexerConfigBuilder};
pub use error::{Error, Result};
