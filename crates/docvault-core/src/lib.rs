//! Docvault Core Library
//!
//! This crate provides the domain models, error types, configuration, and the
//! document graph merge algorithm shared across all docvault components.

pub mod config;
pub mod error;
pub mod merge;
pub mod models;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use merge::{merge_collection, CollectionMerge, HasId, RemovalPolicy};
