//! Synchronizer configuration.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use notesync_core::defaults::{CALL_TIMEOUT_SECS, MAX_CONCURRENT_RESOLUTIONS, MAX_IMAGE_BYTES};
use notesync_core::{Error, Result};

/// What `create` does when the image upload fails after the record exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadFailurePolicy {
    /// Delete the just-created record so no note points at a missing image.
    #[default]
    Compensate,
    /// Leave the record in place and report the dangling reference.
    Report,
}

impl FromStr for UploadFailurePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "compensate" => Ok(Self::Compensate),
            "report" => Ok(Self::Report),
            _ => Err(Error::Config(format!("Invalid upload failure policy: {}", s))),
        }
    }
}

impl fmt::Display for UploadFailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compensate => write!(f, "compensate"),
            Self::Report => write!(f, "report"),
        }
    }
}

/// What `delete` does with the note's stored image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageRetention {
    /// Leave the object in storage; only the record is deleted.
    #[default]
    Keep,
    /// Remove the object after the record is deleted.
    Purge,
}

impl FromStr for ImageRetention {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "keep" => Ok(Self::Keep),
            "purge" => Ok(Self::Purge),
            _ => Err(Error::Config(format!("Invalid image retention: {}", s))),
        }
    }
}

impl fmt::Display for ImageRetention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Keep => write!(f, "keep"),
            Self::Purge => write!(f, "purge"),
        }
    }
}

/// Configuration for the note synchronizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Upper bound on every individual gateway call.
    pub call_timeout: Duration,
    /// Maximum URL resolutions in flight during one refresh.
    pub max_concurrent_resolutions: usize,
    /// Largest image accepted by `create`.
    pub max_image_bytes: usize,
    pub upload_failure_policy: UploadFailurePolicy,
    pub image_retention: ImageRetention,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(CALL_TIMEOUT_SECS),
            max_concurrent_resolutions: MAX_CONCURRENT_RESOLUTIONS,
            max_image_bytes: MAX_IMAGE_BYTES,
            upload_failure_policy: UploadFailurePolicy::default(),
            image_retention: ImageRetention::default(),
        }
    }
}

impl SyncConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `NOTESYNC_CALL_TIMEOUT_SECS` | `30` | Timeout per gateway call |
    /// | `NOTESYNC_MAX_CONCURRENT_RESOLUTIONS` | `8` | Parallel URL resolutions per refresh |
    /// | `NOTESYNC_MAX_IMAGE_BYTES` | `10485760` | Largest accepted image |
    /// | `NOTESYNC_UPLOAD_FAILURE_POLICY` | `compensate` | `compensate` or `report` |
    /// | `NOTESYNC_IMAGE_RETENTION` | `keep` | `keep` or `purge` |
    pub fn from_env() -> Result<Self> {
        let default = Self::default();

        let call_timeout = std::env::var("NOTESYNC_CALL_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(default.call_timeout);

        let max_concurrent_resolutions = std::env::var("NOTESYNC_MAX_CONCURRENT_RESOLUTIONS")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(default.max_concurrent_resolutions)
            .max(1);

        let max_image_bytes = std::env::var("NOTESYNC_MAX_IMAGE_BYTES")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(default.max_image_bytes);

        let upload_failure_policy = match std::env::var("NOTESYNC_UPLOAD_FAILURE_POLICY") {
            Ok(v) => v.parse()?,
            Err(_) => default.upload_failure_policy,
        };

        let image_retention = match std::env::var("NOTESYNC_IMAGE_RETENTION") {
            Ok(v) => v.parse()?,
            Err(_) => default.image_retention,
        };

        Ok(Self {
            call_timeout,
            max_concurrent_resolutions,
            max_image_bytes,
            upload_failure_policy,
            image_retention,
        })
    }

    /// Set the per-call timeout.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Set the number of URL resolutions run in parallel.
    pub fn with_max_concurrent_resolutions(mut self, max: usize) -> Self {
        self.max_concurrent_resolutions = max.max(1);
        self
    }

    /// Set the largest accepted image.
    pub fn with_max_image_bytes(mut self, max: usize) -> Self {
        self.max_image_bytes = max;
        self
    }

    pub fn with_upload_failure_policy(mut self, policy: UploadFailurePolicy) -> Self {
        self.upload_failure_policy = policy;
        self
    }

    pub fn with_image_retention(mut self, retention: ImageRetention) -> Self {
        self.image_retention = retention;
        self
    }
}
