//! Configuration module
//!
//! This module provides the env-driven configuration for the API service,
//! including database, storage, removal-queue, and sweep scheduling settings.

use std::env;
use std::str::FromStr;

use crate::models::StorageBackend;

// Common defaults
const DEFAULT_SERVER_PORT: u16 = 3000;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 20;
const DEFAULT_REMOVAL_QUEUE_WORKERS: usize = 4;
const DEFAULT_REMOVAL_QUEUE_CAPACITY: usize = 1024;
// Weekly sweeps; the audit retry sweep is offset so the two never coincide.
const DEFAULT_STALE_UPLOAD_SWEEP_INTERVAL_SECS: u64 = 7 * 24 * 3600;
const DEFAULT_STALE_UPLOAD_GRACE_HOURS: i64 = 24;
const DEFAULT_AUDIT_RETRY_SWEEP_INTERVAL_SECS: u64 = 7 * 24 * 3600;
const DEFAULT_AUDIT_RETRY_SWEEP_OFFSET_SECS: u64 = 12 * 3600;
const DEFAULT_MAX_UPLOAD_BODY_BYTES: usize = 100 * 1024 * 1024;

/// Application configuration, loaded from the environment.
#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub environment: String,
    pub cors_origins: Vec<String>,
    // Database
    pub database_url: String,
    pub db_max_connections: u32,
    // Storage configuration
    pub storage_backend: StorageBackend,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>, // Custom endpoint for S3-compatible providers (MinIO etc.)
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,
    // Upload limits
    pub max_upload_body_bytes: usize,
    // Blob removal queue
    pub removal_queue_workers: usize,
    pub removal_queue_capacity: usize,
    // Reconciliation sweeps
    pub stale_upload_sweep_interval_secs: u64,
    pub stale_upload_grace_hours: i64,
    pub audit_retry_sweep_interval_secs: u64,
    pub audit_retry_sweep_offset_secs: u64,
}

fn parse_env<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn optional_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}

impl Config {
    /// Load configuration from the environment.
    ///
    /// `DATABASE_URL` is required; everything else has a default. Storage
    /// backend selection is driven by `STORAGE_BACKEND` (`s3` or `local`).
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?;

        let storage_backend = optional_env("STORAGE_BACKEND")
            .map(|v| v.parse())
            .transpose()
            .map_err(|e: String| anyhow::anyhow!(e))?
            .unwrap_or(StorageBackend::S3);

        let cors_origins = optional_env("CORS_ORIGINS")
            .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
            .unwrap_or_default();

        Ok(Self {
            server_port: parse_env("SERVER_PORT", DEFAULT_SERVER_PORT),
            environment: optional_env("ENVIRONMENT").unwrap_or_else(|| "development".to_string()),
            cors_origins,
            database_url,
            db_max_connections: parse_env("DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS),
            storage_backend,
            s3_bucket: optional_env("S3_BUCKET"),
            s3_region: optional_env("S3_REGION").or_else(|| optional_env("AWS_REGION")),
            s3_endpoint: optional_env("S3_ENDPOINT"),
            local_storage_path: optional_env("LOCAL_STORAGE_PATH"),
            local_storage_base_url: optional_env("LOCAL_STORAGE_BASE_URL"),
            max_upload_body_bytes: parse_env("MAX_UPLOAD_BODY_BYTES", DEFAULT_MAX_UPLOAD_BODY_BYTES),
            removal_queue_workers: parse_env("REMOVAL_QUEUE_WORKERS", DEFAULT_REMOVAL_QUEUE_WORKERS),
            removal_queue_capacity: parse_env(
                "REMOVAL_QUEUE_CAPACITY",
                DEFAULT_REMOVAL_QUEUE_CAPACITY,
            ),
            stale_upload_sweep_interval_secs: parse_env(
                "STALE_UPLOAD_SWEEP_INTERVAL_SECS",
                DEFAULT_STALE_UPLOAD_SWEEP_INTERVAL_SECS,
            ),
            stale_upload_grace_hours: parse_env(
                "STALE_UPLOAD_GRACE_HOURS",
                DEFAULT_STALE_UPLOAD_GRACE_HOURS,
            ),
            audit_retry_sweep_interval_secs: parse_env(
                "AUDIT_RETRY_SWEEP_INTERVAL_SECS",
                DEFAULT_AUDIT_RETRY_SWEEP_INTERVAL_SECS,
            ),
            audit_retry_sweep_offset_secs: parse_env(
                "AUDIT_RETRY_SWEEP_OFFSET_SECS",
                DEFAULT_AUDIT_RETRY_SWEEP_OFFSET_SECS,
            ),
        })
    }

    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_env_default_on_missing() {
        assert_eq!(parse_env("DOCVAULT_TEST_UNSET_KEY", 42u32), 42);
    }

    #[test]
    fn test_storage_backend_parse() {
        assert_eq!("s3".parse::<StorageBackend>().unwrap(), StorageBackend::S3);
        assert_eq!(
            "local".parse::<StorageBackend>().unwrap(),
            StorageBackend::Local
        );
        assert!("nfs".parse::<StorageBackend>().is_err());
    }
}
