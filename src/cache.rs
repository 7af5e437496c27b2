use crate::error::CompressError;
use crate::filter::is_file_valid;
use md5::{Digest, Md5};
use std::path::{Path, PathBuf};

const COMPRESS_DIR: &str = ".compress";
const COMPRESS_FILE_PREFIX: &str = "compress-";

/// Content-addressed naming for compressed copies.
///
/// Output files live under `<cache root>/.compress/` and are named
/// `compress-<32-hex-md5-of-source-path>.jpg`, so repeated compressions of
/// the same source resolve to the same file without any bookkeeping. The
/// directory is created lazily on first use.
#[derive(Debug, Clone)]
pub struct CompressCache {
    root: PathBuf,
}

impl CompressCache {
    pub fn new(cache_dir: &Path) -> Self {
        Self {
            root: cache_dir.join(COMPRESS_DIR),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Deterministic output path for a source path.
    pub fn out_path(&self, source_path: &str) -> PathBuf {
        let digest = Md5::digest(source_path.as_bytes());
        self.root
            .join(format!("{}{:x}.jpg", COMPRESS_FILE_PREFIX, digest))
    }

    /// Existing usable output for a source path.
    ///
    /// The check is existence plus non-zero length only; the current source
    /// bytes are not re-hashed. A source file rewritten in place under the
    /// same path keeps serving its previously cached compression until the
    /// caller removes the cache entry.
    pub fn lookup(&self, source_path: &str) -> Option<PathBuf> {
        let path = self.out_path(source_path);
        if is_file_valid(&path) {
            Some(path)
        } else {
            None
        }
    }

    pub fn ensure_root(&self) -> Result<(), CompressError> {
        std::fs::create_dir_all(&self.root).map_err(CompressError::CacheDir)
    }

    /// Whether `path` is an artifact this cache produced. Pass-through
    /// results alias the original source file and must not be deleted as
    /// disposable copies; this is the check callers use to tell the two
    /// apart.
    pub fn owns(&self, path: &Path) -> bool {
        path.starts_with(&self.root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn naming_is_deterministic_and_hex_addressed() {
        let cache = CompressCache::new(Path::new("/tmp/cache"));
        let a = cache.out_path("/pictures/a.jpg");
        let b = cache.out_path("/pictures/a.jpg");
        assert_eq!(a, b);

        let name = a.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with(COMPRESS_FILE_PREFIX));
        assert!(name.ends_with(".jpg"));
        let digest = &name[COMPRESS_FILE_PREFIX.len()..name.len() - 4];
        assert_eq!(digest.len(), 32);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn different_sources_get_different_names() {
        let cache = CompressCache::new(Path::new("/tmp/cache"));
        assert_ne!(
            cache.out_path("/pictures/a.jpg"),
            cache.out_path("/pictures/b.jpg")
        );
    }

    #[test]
    fn lookup_requires_a_non_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CompressCache::new(dir.path());
        assert!(cache.lookup("/pictures/a.jpg").is_none());

        cache.ensure_root().unwrap();
        let out = cache.out_path("/pictures/a.jpg");
        std::fs::write(&out, b"").unwrap();
        assert!(cache.lookup("/pictures/a.jpg").is_none());

        std::fs::write(&out, b"jpeg bytes").unwrap();
        assert_eq!(cache.lookup("/pictures/a.jpg"), Some(out));
    }

    #[test]
    fn root_is_created_lazily() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CompressCache::new(dir.path());
        assert!(!cache.root().exists());
        cache.ensure_root().unwrap();
        assert!(cache.root().is_dir());
        // Idempotent.
        cache.ensure_root().unwrap();
    }

    #[test]
    fn ownership_distinguishes_cache_artifacts_from_sources() {
        let cache = CompressCache::new(Path::new("/data/cache"));
        assert!(cache.owns(&cache.out_path("/pictures/a.jpg")));
        assert!(!cache.owns(Path::new("/pictures/a.jpg")));
    }
}
