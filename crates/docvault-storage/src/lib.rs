//! Docvault Storage Library
//!
//! Object store gateway for docvault: the `Storage` trait plus S3-compatible
//! and local filesystem backends.
//!
//! # Storage key format
//!
//! An attachment's blob is stored under key = the attachment id, with no path
//! prefix beyond the configured container. The object store has no
//! transactional link to the relational store; the attachment ledger is
//! authoritative for logical existence and the reconciliation sweeps bound
//! how far the two may drift apart.

pub mod bucket;
pub mod factory;
pub mod local;
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use bucket::validate_bucket_name;
pub use docvault_core::models::StorageBackend;
pub use factory::create_storage;
pub use local::LocalStorage;
pub use s3::S3Storage;
pub use traits::{is_clean_removal, Storage, StorageError, StorageResult};
