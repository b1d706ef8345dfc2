use std::collections::HashSet;

use anyhow::Result;
use async_trait::async_trait;

/// Object-store capability this pipeline writes to.
///
/// The wire protocol (and its timeouts) live entirely behind this trait;
/// implementations are injected by the surrounding application.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Names of the objects currently stored under `prefix`.
    async fn list_names(&self, bucket: &str, prefix: &str) -> Result<HashSet<String>>;

    /// Write one object. With `upsert` an existing object at `key` is
    /// overwritten instead of rejected.
    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
        upsert: bool,
    ) -> Result<()>;

    /// Delete up to 1000 keys in one call; callers chunk accordingly.
    async fn delete_batch(&self, bucket: &str, keys: &[String]) -> Result<()>;
}

/// Destination of one ingestion: a bucket plus a key prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreContext {
    pub bucket: String,
    pub prefix: String,
}

impl StoreContext {
    pub fn new(bucket: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            prefix: prefix.into(),
        }
    }

    /// Destination key for a resolved relative path.
    pub fn key_for(&self, dest_relative_path: &str) -> String {
        let prefix = self.prefix.trim_matches('/');
        if prefix.is_empty() {
            dest_relative_path.to_string()
        } else {
            format!("{prefix}/{dest_relative_path}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_for_joins_prefix_and_path() {
        let ctx = StoreContext::new("attachments", "org/42");
        assert_eq!(ctx.key_for("a.txt"), "org/42/a.txt");
        assert_eq!(ctx.key_for("sub/b.txt"), "org/42/sub/b.txt");
    }

    #[test]
    fn key_for_tolerates_slashes_around_the_prefix() {
        let ctx = StoreContext::new("attachments", "/org/42/");
        assert_eq!(ctx.key_for("a.txt"), "org/42/a.txt");
    }

    #[test]
    fn empty_prefix_uses_bare_paths() {
        let ctx = StoreContext::new("attachments", "");
        assert_eq!(ctx.key_for("a.txt"), "a.txt");
    }
}
