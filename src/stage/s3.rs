// src/stage/s3.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::TryStreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::path::Path as StorePath;
use object_store::ObjectStore;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::errors::{PipedagError, Result};
use crate::stage::{ObjectUrl, Stager};

/// Staging adapter backed by an S3-compatible object store.
///
/// Credentials, region, and the optional endpoint override come from the
/// environment (`AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`, `AWS_ENDPOINT`,
/// ...); nothing is read from the pipeline document.
#[derive(Debug, Default)]
pub struct S3Stager;

impl S3Stager {
    pub fn new() -> Self {
        Self
    }

    fn store_for(url: &ObjectUrl) -> anyhow::Result<Arc<dyn ObjectStore>> {
        match url.scheme.as_str() {
            "s3" => {
                let store = AmazonS3Builder::from_env()
                    .with_bucket_name(&url.bucket)
                    .build()
                    .with_context(|| format!("building S3 client for bucket '{}'", url.bucket))?;
                Ok(Arc::new(store))
            }
            other => Err(anyhow!("unsupported object-store scheme '{other}'")),
        }
    }
}

#[async_trait]
impl Stager for S3Stager {
    async fn download(&self, url: &str, dir: &Path) -> Result<()> {
        let parsed: ObjectUrl = url.parse()?;
        download_prefix(&parsed, dir)
            .await
            .map_err(|cause| PipedagError::Staging {
                url: url.to_string(),
                cause,
            })
    }

    async fn upload(&self, dir: &Path, url: &str) -> Result<()> {
        let parsed: ObjectUrl = url.parse()?;
        upload_dir(dir, &parsed)
            .await
            .map_err(|cause| PipedagError::Staging {
                url: url.to_string(),
                cause,
            })
    }
}

async fn download_prefix(url: &ObjectUrl, dir: &Path) -> anyhow::Result<()> {
    // An empty prefix is a no-op, not "the whole bucket".
    if url.prefix.is_empty() {
        debug!(bucket = %url.bucket, "empty prefix; nothing to download");
        return Ok(());
    }

    let store = S3Stager::store_for(url)?;
    let prefix = StorePath::from(url.prefix.as_str());
    let mut objects = store.list(Some(&prefix));
    let mut count = 0usize;

    while let Some(meta) = objects.try_next().await? {
        let key: &str = meta.location.as_ref();
        let rel = key
            .strip_prefix(url.prefix.as_str())
            .unwrap_or(key)
            .trim_start_matches('/');
        let target = dir.join(rel);

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("creating directory {:?}", parent))?;
        }

        let data = store.get(&meta.location).await?.bytes().await?;
        tokio::fs::write(&target, &data)
            .await
            .with_context(|| format!("writing {:?}", target))?;

        debug!(key = %key, target = ?target, bytes = data.len(), "downloaded object");
        count += 1;
    }

    info!(bucket = %url.bucket, prefix = %url.prefix, objects = count, "download complete");
    Ok(())
}

async fn upload_dir(dir: &Path, url: &ObjectUrl) -> anyhow::Result<()> {
    let store = S3Stager::store_for(url)?;
    let mut count = 0usize;

    let files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .collect();

    for path in files {
        let rel = path
            .strip_prefix(dir)
            .with_context(|| format!("computing relative path of {:?}", path))?;
        let rel = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        let key = if url.prefix.is_empty() {
            rel.clone()
        } else {
            format!("{}/{}", url.prefix.trim_end_matches('/'), rel)
        };

        let data = tokio::fs::read(&path)
            .await
            .with_context(|| format!("reading {:?}", path))?;
        store
            .put(&StorePath::from(key.as_str()), Bytes::from(data).into())
            .await
            .with_context(|| format!("uploading key '{key}'"))?;

        debug!(path = ?path, key = %key, "uploaded object");
        count += 1;
    }

    info!(bucket = %url.bucket, prefix = %url.prefix, objects = count, "upload complete");
    Ok(())
}
