// src/stage/mod.rs

//! Input/output staging against an object store.
//!
//! A task's inputs are downloaded into local directories before its command
//! runs, and its outputs uploaded afterwards. The [`Stager`] trait is the
//! seam tests use to substitute an in-memory store; [`s3::S3Stager`] is the
//! production implementation.

pub mod s3;

use std::path::Path;
use std::str::FromStr;

use anyhow::anyhow;
use async_trait::async_trait;

use crate::errors::{PipedagError, Result};

pub use s3::S3Stager;

/// Parsed `scheme://bucket/key-prefix` object-store URL.
///
/// The scheme identifies the provider, the bucket is the URL host, and the
/// prefix is the URL path with its leading slash stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectUrl {
    pub scheme: String,
    pub bucket: String,
    pub prefix: String,
}

impl FromStr for ObjectUrl {
    type Err = PipedagError;

    fn from_str(s: &str) -> Result<Self> {
        let malformed = || PipedagError::Staging {
            url: s.to_string(),
            cause: anyhow!("malformed object-store URL (expected scheme://bucket/prefix)"),
        };

        let (scheme, rest) = s.split_once("://").ok_or_else(malformed)?;
        let (bucket, prefix) = match rest.split_once('/') {
            Some((bucket, prefix)) => (bucket, prefix),
            None => (rest, ""),
        };

        if scheme.is_empty() || bucket.is_empty() {
            return Err(malformed());
        }

        Ok(Self {
            scheme: scheme.to_string(),
            bucket: bucket.to_string(),
            prefix: prefix.trim_start_matches('/').to_string(),
        })
    }
}

/// Uploads and downloads directory subtrees against object-store prefixes.
///
/// Both operations are idempotent at the store level: a re-upload simply
/// overwrites the same keys.
#[async_trait]
pub trait Stager: Send + Sync {
    /// Materialize every object under `url`'s prefix below `dir`, preserving
    /// relative paths and creating missing parent directories. An empty
    /// prefix is a no-op.
    async fn download(&self, url: &str, dir: &Path) -> Result<()>;

    /// Walk `dir` recursively and upload each regular file under `url`'s
    /// prefix at its relative path. Symlinks and directories themselves are
    /// not uploaded.
    async fn upload(&self, dir: &Path, url: &str) -> Result<()>;
}
