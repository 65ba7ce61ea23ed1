use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use uuid::Uuid;

use crate::storage::ObjectStore;

/// Object store backed by a local directory tree: `{root}/{bucket}/{key}`.
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    /// Create a new FsObjectStore, creating the root directory if needed.
    pub async fn new(root: PathBuf) -> Result<Self> {
        tokio::fs::create_dir_all(&root)
            .await
            .context("Failed to create storage root")?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve an object to its file path, rejecting keys that would escape
    /// the bucket directory.
    pub fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf> {
        validate_segment(bucket).with_context(|| format!("Invalid bucket '{}'", bucket))?;

        if key.is_empty() || key.starts_with('/') || key.ends_with('/') {
            return Err(anyhow::anyhow!("Invalid object key '{}'", key));
        }
        let mut path = self.root.join(bucket);
        for segment in key.split('/') {
            validate_segment(segment).with_context(|| format!("Invalid object key '{}'", key))?;
            path.push(segment);
        }
        Ok(path)
    }

    /// Write an object, replacing any previous content.
    pub async fn put_object(&self, bucket: &str, key: &str, data: &[u8]) -> Result<()> {
        let path = self.object_path(bucket, key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .context("Failed to create object directory")?;
        }
        tokio::fs::write(&path, data)
            .await
            .with_context(|| format!("Failed to write object {}/{}", bucket, key))?;
        Ok(())
    }

    /// Read an object, or `None` if it does not exist.
    pub async fn read_object(&self, bucket: &str, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.object_path(bucket, key)?;
        if !path.exists() {
            return Ok(None);
        }
        let data = tokio::fs::read(&path)
            .await
            .with_context(|| format!("Failed to read object {}/{}", bucket, key))?;
        Ok(Some(data))
    }
}

fn validate_segment(segment: &str) -> Result<()> {
    let mut components = Path::new(segment).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) if !segment.contains('\\') => Ok(()),
        _ => Err(anyhow::anyhow!("bad path segment '{}'", segment)),
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn copy_object(
        &self,
        bucket: &str,
        source_key: &str,
        destination_key: &str,
    ) -> Result<()> {
        let source = self.object_path(bucket, source_key)?;
        let destination = self.object_path(bucket, destination_key)?;

        if !source.is_file() {
            return Err(anyhow::anyhow!(
                "Source object not found: {}/{}",
                bucket,
                source_key
            ));
        }

        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .context("Failed to create destination directory")?;
        }

        // Stage next to the destination and rename over it, so a failed copy
        // never leaves a previous report truncated.
        let file_name = destination_key.rsplit('/').next().unwrap_or(destination_key);
        let staged = destination.with_file_name(format!(".{}.{}.tmp", file_name, Uuid::now_v7()));

        let replaced = match tokio::fs::copy(&source, &staged).await {
            Ok(_) => tokio::fs::rename(&staged, &destination).await,
            Err(e) => Err(e),
        };
        if let Err(e) = replaced {
            if let Err(cleanup) = tokio::fs::remove_file(&staged).await {
                tracing::debug!("Staged copy {} not removed: {}", staged.display(), cleanup);
            }
            return Err(e).with_context(|| {
                format!(
                    "Failed to copy {}/{} to {}/{}",
                    bucket, source_key, bucket, destination_key
                )
            });
        }

        tracing::debug!(
            bucket,
            source_key,
            destination_key,
            "Copied object"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn make_store() -> (TempDir, FsObjectStore) {
        let tmp = TempDir::new().expect("temp dir");
        let store = FsObjectStore::new(tmp.path().join("objects"))
            .await
            .expect("create store");
        (tmp, store)
    }

    #[tokio::test]
    async fn test_copy_creates_destination() {
        let (_tmp, store) = make_store().await;
        store
            .put_object("bucket", "results/exec-123.csv", b"a,b\n1,2\n")
            .await
            .expect("put");

        store
            .copy_object("bucket", "results/exec-123.csv", "reports/x_2024-05-01.csv")
            .await
            .expect("copy");

        let copied = store
            .read_object("bucket", "reports/x_2024-05-01.csv")
            .await
            .expect("read");
        assert_eq!(copied.as_deref(), Some(&b"a,b\n1,2\n"[..]));

        // Source is left in place
        assert!(store
            .read_object("bucket", "results/exec-123.csv")
            .await
            .expect("read")
            .is_some());
    }

    #[tokio::test]
    async fn test_copy_overwrites_destination() {
        let (_tmp, store) = make_store().await;
        store.put_object("b", "src.csv", b"new").await.expect("put");
        store.put_object("b", "dst.csv", b"old content").await.expect("put");

        store.copy_object("b", "src.csv", "dst.csv").await.expect("copy");

        let data = store.read_object("b", "dst.csv").await.expect("read");
        assert_eq!(data.as_deref(), Some(&b"new"[..]));
        assert_eq!(bucket_entries(&store, "b"), vec!["dst.csv", "src.csv"]);
    }

    fn bucket_entries(store: &FsObjectStore, bucket: &str) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(store.root().join(bucket))
            .expect("bucket dir")
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_failed_copy_leaves_destination_intact() {
        let (_tmp, store) = make_store().await;
        store.put_object("b", "src.csv", b"new").await.expect("put");
        // A directory at the destination makes the final rename fail
        store
            .put_object("b", "dst.csv/keep.csv", b"keep")
            .await
            .expect("put");

        assert!(store.copy_object("b", "src.csv", "dst.csv").await.is_err());

        let kept = store.read_object("b", "dst.csv/keep.csv").await.expect("read");
        assert_eq!(kept.as_deref(), Some(&b"keep"[..]));
        assert_eq!(bucket_entries(&store, "b"), vec!["dst.csv", "src.csv"]);
    }

    #[tokio::test]
    async fn test_copy_missing_source_errors() {
        let (_tmp, store) = make_store().await;
        let err = store
            .copy_object("b", "results/missing.csv", "reports/out.csv")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn test_object_path_rejects_traversal() {
        let (_tmp, store) = make_store().await;
        assert!(store.object_path("b", "../escape.csv").is_err());
        assert!(store.object_path("b", "a/../../escape.csv").is_err());
        assert!(store.object_path("b", "/abs.csv").is_err());
        assert!(store.object_path("b", "a//b.csv").is_err());
        assert!(store.object_path("b", "dir/").is_err());
        assert!(store.object_path("b", "").is_err());
        assert!(store.object_path("..", "x.csv").is_err());
        assert!(store.object_path("b", "./x.csv").is_err());
    }

    #[tokio::test]
    async fn test_object_path_layout() {
        let (_tmp, store) = make_store().await;
        let path = store.object_path("bucket", "a/b.csv").expect("path");
        assert_eq!(path, store.root().join("bucket").join("a").join("b.csv"));
    }

    #[tokio::test]
    async fn test_read_missing_returns_none() {
        let (_tmp, store) = make_store().await;
        assert!(store.read_object("b", "nope.csv").await.expect("read").is_none());
    }
}
