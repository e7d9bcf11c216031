//! # LCA Common Library
//!
//! Shared code for the Legal Compliance Analyzer client:
//! - Configuration loading (TOML + environment + defaults)
//! - Wire types for the analysis backend endpoints
//! - Domain models (clauses, missing clauses, notifications, chart buckets)
//! - Error types

pub mod api;
pub mod config;
pub mod error;
pub mod models;

pub use error::{Error, Result};
pub use models::{ChartBucket, Clause, MissingClause, Notification};
