use crate::error::StoreError;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Handle to the device-local media catalog database.
///
/// The catalog mirrors the external media store tables: `images`, `videos`
/// and `thumbnails`. The connection is shared behind a mutex so catalog
/// queries can run from the worker pool.
#[derive(Clone)]
pub struct MediaStore {
    conn: Arc<Mutex<Connection>>,
}

impl MediaStore {
    /// Open (or create) the catalog database at `path`.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        init_media_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// In-memory catalog, used by tests and transient sessions.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        init_media_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub(crate) fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> Result<T, StoreError> {
        let guard = self
            .conn
            .lock()
            .map_err(|_| StoreError::Unavailable("media store lock poisoned".to_string()))?;
        f(&guard).map_err(StoreError::from)
    }

    /// Index an image row.
    pub fn add_image(&self, record: &ImageRecord) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO images (id, path, size, mime_type, width, height, bucket_id, bucket_display_name, date_modified)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    record.id,
                    record.path,
                    record.size,
                    record.mime_type,
                    record.width,
                    record.height,
                    record.bucket_id,
                    record.bucket_name,
                    record.date_modified,
                ],
            )
            .map(|_| ())
        })
    }

    /// Index a video row.
    pub fn add_video(&self, record: &VideoRecord) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO videos (id, path, title, mime_type, size, date_taken, duration, date_modified)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    record.id,
                    record.path,
                    record.title,
                    record.mime_type,
                    record.size,
                    record.date_taken,
                    record.duration_ms,
                    record.date_modified,
                ],
            )
            .map(|_| ())
        })
    }

    /// Register a pre-generated thumbnail for an image id.
    pub fn add_thumbnail(&self, image_id: &str, path: &str) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO thumbnails (image_id, path) VALUES (?1, ?2)",
                params![image_id, path],
            )
            .map(|_| ())
        })
    }
}

impl std::fmt::Debug for MediaStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaStore").finish()
    }
}

/// Row shape of the `images` table.
#[derive(Debug, Clone, Default)]
pub struct ImageRecord {
    pub id: String,
    pub path: String,
    /// Stored as text; consumers parse it leniently.
    pub size: String,
    pub mime_type: String,
    pub width: u32,
    pub height: u32,
    pub bucket_id: String,
    pub bucket_name: String,
    /// Epoch seconds; newest rows are listed first.
    pub date_modified: i64,
}

/// Row shape of the `videos` table.
#[derive(Debug, Clone, Default)]
pub struct VideoRecord {
    pub id: String,
    pub path: String,
    pub title: String,
    pub mime_type: String,
    pub size: String,
    /// Epoch milliseconds.
    pub date_taken: i64,
    pub duration_ms: i64,
    pub date_modified: i64,
}

fn init_media_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS images (
            id TEXT PRIMARY KEY,
            path TEXT NOT NULL,
            size TEXT,
            mime_type TEXT,
            width INTEGER NOT NULL DEFAULT 0,
            height INTEGER NOT NULL DEFAULT 0,
            bucket_id TEXT NOT NULL DEFAULT '',
            bucket_display_name TEXT NOT NULL DEFAULT '',
            date_modified INTEGER NOT NULL DEFAULT 0
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS videos (
            id TEXT PRIMARY KEY,
            path TEXT NOT NULL,
            title TEXT NOT NULL DEFAULT '',
            mime_type TEXT,
            size TEXT,
            date_taken INTEGER NOT NULL DEFAULT 0,
            duration INTEGER NOT NULL DEFAULT 0,
            date_modified INTEGER NOT NULL DEFAULT 0
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS thumbnails (
            image_id TEXT NOT NULL,
            path TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_images_bucket ON images(bucket_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_images_date_modified ON images(date_modified DESC)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_videos_date_modified ON videos(date_modified DESC)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_thumbnails_image ON thumbnails(image_id)",
        [],
    )?;

    Ok(())
}
