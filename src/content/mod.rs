//! Size-bounded file content loading with an optional in-memory cache.
//!
//! The loader stats before reading so an oversized file is rejected
//! without pulling its bytes into memory. Invalid UTF-8 is decoded
//! lossily (replacement characters make the substitution visible);
//! valid text is never altered.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;
use tracing::debug;

/// Errors from content loading. The file-review pipeline converts both
/// variants into placeholder reviews rather than propagating them.
#[derive(Error, Debug)]
pub enum ContentError {
    #[error("file too large: {path} is {size} bytes (limit {limit})")]
    FileTooLarge {
        path: PathBuf,
        size: u64,
        limit: u64,
    },

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Loads file text with a byte ceiling and memoizes by path.
///
/// The cache has no eviction policy; it lives for the process. Callers
/// must call [`ContentLoader::invalidate`] when the watcher reports a
/// change, or a stale entry will be served.
pub struct ContentLoader {
    /// Inclusive byte ceiling; a file of exactly this size is accepted.
    max_bytes: u64,
    cache: Mutex<HashMap<PathBuf, String>>,
}

impl ContentLoader {
    /// Create a loader with the given inclusive byte ceiling.
    pub fn new(max_bytes: u64) -> Self {
        Self {
            max_bytes,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// The configured byte ceiling.
    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Load a file's text, serving from cache when possible.
    ///
    /// A cache hit skips the filesystem entirely, including the size
    /// check — entries are only ever inserted after passing it.
    pub async fn load(&self, path: &Path) -> Result<String, ContentError> {
        if let Some(text) = self
            .cache
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(path)
        {
            debug!("content cache hit: {}", path.display());
            return Ok(text.clone());
        }

        let meta = tokio::fs::metadata(path)
            .await
            .map_err(|e| ContentError::Read {
                path: path.to_path_buf(),
                source: e,
            })?;
        if meta.len() > self.max_bytes {
            return Err(ContentError::FileTooLarge {
                path: path.to_path_buf(),
                size: meta.len(),
                limit: self.max_bytes,
            });
        }

        let bytes = tokio::fs::read(path).await.map_err(|e| ContentError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        let text = String::from_utf8_lossy(&bytes).into_owned();

        self.cache
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(path.to_path_buf(), text.clone());
        Ok(text)
    }

    /// Drop a cached entry after a file-change notification.
    pub fn invalidate(&self, path: &Path) {
        self.cache
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(path);
    }

    /// Drop all cached entries.
    pub fn clear(&self) {
        self.cache
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn loads_small_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.rs");
        std::fs::write(&path, "fn main() {}").unwrap();

        let loader = ContentLoader::new(1000);
        let text = loader.load(&path).await.unwrap();
        assert_eq!(text, "fn main() {}");
    }

    #[tokio::test]
    async fn ceiling_is_inclusive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exact.txt");
        std::fs::write(&path, "x".repeat(100)).unwrap();

        // Exactly at the ceiling: accepted.
        let loader = ContentLoader::new(100);
        assert!(loader.load(&path).await.is_ok());

        // One byte over: rejected.
        let path2 = dir.path().join("over.txt");
        std::fs::write(&path2, "x".repeat(101)).unwrap();
        let err = loader.load(&path2).await.unwrap_err();
        match err {
            ContentError::FileTooLarge { size, limit, .. } => {
                assert_eq!(size, 101);
                assert_eq!(limit, 100);
            }
            other => panic!("expected FileTooLarge, got {other}"),
        }
    }

    #[tokio::test]
    async fn missing_file_is_read_error() {
        let loader = ContentLoader::new(100);
        let err = loader
            .load(Path::new("/tmp/redline_missing_file_12345"))
            .await
            .unwrap_err();
        assert!(matches!(err, ContentError::Read { .. }));
    }

    #[tokio::test]
    async fn invalid_utf8_is_replaced_not_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mixed.bin");
        std::fs::write(&path, [b'o', b'k', 0xFF, b'!']).unwrap();

        let loader = ContentLoader::new(100);
        let text = loader.load(&path).await.unwrap();
        assert!(text.starts_with("ok"));
        assert!(text.contains('\u{FFFD}'));
        assert!(text.ends_with('!'));
    }

    #[tokio::test]
    async fn cache_hit_skips_filesystem() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cached.rs");
        std::fs::write(&path, "original").unwrap();

        let loader = ContentLoader::new(1000);
        assert_eq!(loader.load(&path).await.unwrap(), "original");

        // Change the file on disk; the cached text is still served.
        std::fs::write(&path, "changed").unwrap();
        assert_eq!(loader.load(&path).await.unwrap(), "original");

        // After invalidation the new content is read.
        loader.invalidate(&path);
        assert_eq!(loader.load(&path).await.unwrap(), "changed");
    }

    #[tokio::test]
    async fn clear_drops_all_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.rs");
        std::fs::write(&path, "one").unwrap();

        let loader = ContentLoader::new(1000);
        loader.load(&path).await.unwrap();
        std::fs::write(&path, "two").unwrap();
        loader.clear();
        assert_eq!(loader.load(&path).await.unwrap(), "two");
    }
}
