use std::path::Path;

/// Row-level filter consulted while catalog rows are iterated, before any
/// item is materialized.
///
/// Returning `true` rejects the row. Implementations run on the worker pool
/// and must be `Send + Sync`.
pub trait MediaFilter: Send + Sync {
    fn need_filter(&self, path: &str) -> bool;
}

/// Default filter: rejects rows whose path is empty or no longer exists on
/// disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathValidityFilter;

impl MediaFilter for PathValidityFilter {
    fn need_filter(&self, path: &str) -> bool {
        path.is_empty() || !Path::new(path).exists()
    }
}

/// Filter that keeps every row. Useful when the catalog is known to be in
/// sync with the filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAllFilter;

impl MediaFilter for AcceptAllFilter {
    fn need_filter(&self, _path: &str) -> bool {
        false
    }
}

/// A file is usable when it exists, is a regular file and has content.
pub fn is_file_valid(path: &Path) -> bool {
    if path.as_os_str().is_empty() {
        return false;
    }
    match std::fs::metadata(path) {
        Ok(meta) => meta.is_file() && meta.len() > 0,
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn path_validity_filter_rejects_empty_and_missing() {
        let filter = PathValidityFilter;
        assert!(filter.need_filter(""));
        assert!(filter.need_filter("/definitely/not/here.jpg"));
    }

    #[test]
    fn path_validity_filter_keeps_existing() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.jpg");
        fs::write(&file, b"data").unwrap();
        let filter = PathValidityFilter;
        assert!(!filter.need_filter(file.to_str().unwrap()));
    }

    #[test]
    fn accept_all_keeps_everything() {
        let filter = AcceptAllFilter;
        assert!(!filter.need_filter(""));
        assert!(!filter.need_filter("/nope.jpg"));
    }

    #[test]
    fn file_validity() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.bin");
        assert!(!is_file_valid(&file));
        fs::write(&file, b"").unwrap();
        assert!(!is_file_valid(&file));
        fs::write(&file, b"x").unwrap();
        assert!(is_file_valid(&file));
        assert!(!is_file_valid(dir.path()));
        assert!(!is_file_valid(Path::new("")));
    }
}
