use crate::config::PickerConfig;
use crate::error::StoreError;
use crate::filter::MediaFilter;
use crate::models::{Album, ImageItem, MediaItem, MimeKind, VideoItem};
use crate::store::MediaStore;
use rusqlite::params_from_iter;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Fixed window bounding a single catalog query.
pub const PAGE_LIMIT: usize = 1000;

const IMAGE_MIME_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/jpg"];
const GIF_MIME_TYPE: &str = "image/gif";

/// Paged queries against the media catalog.
///
/// Every public method fails soft: a store error is logged and surfaces as
/// an empty result, indistinguishable from a genuinely empty catalog. The
/// caller gets its answer through the normal success path either way.
#[derive(Clone)]
pub struct CatalogService {
    store: MediaStore,
    config: PickerConfig,
    filter: Arc<dyn MediaFilter>,
}

impl CatalogService {
    pub fn new(store: MediaStore, config: PickerConfig, filter: Arc<dyn MediaFilter>) -> Self {
        Self {
            store,
            config,
            filter,
        }
    }

    /// Load one page of the album `album_id` (empty id = all media).
    ///
    /// Returns the page items and the total unpaged row count for the same
    /// constraints. In video mode the reported total is the page's own row
    /// count.
    pub fn load_page(&self, album_id: &str, page: usize) -> (Vec<MediaItem>, usize) {
        let result = if self.config.is_video_mode() {
            self.query_video_page(page)
        } else {
            self.query_image_page(album_id, page)
        };
        match result {
            Ok(loaded) => loaded,
            Err(e) => {
                log::warn!("media page query failed, returning empty page: {}", e);
                (Vec::new(), 0)
            }
        }
    }

    /// Enumerate albums, most recently touched bucket first, preceded by the
    /// synthetic "all media" album.
    pub fn load_albums(&self) -> Vec<Album> {
        match self.query_albums() {
            Ok(albums) => albums,
            Err(e) => {
                log::warn!("album query failed, returning empty list: {}", e);
                Vec::new()
            }
        }
    }

    fn mime_args(&self) -> Vec<&'static str> {
        let mut mimes = IMAGE_MIME_TYPES.to_vec();
        if self.config.include_gif {
            mimes.push(GIF_MIME_TYPE);
        }
        mimes
    }

    fn page_window(&self, page: usize) -> String {
        if self.config.paging_enabled {
            format!(" LIMIT {}, {}", page * PAGE_LIMIT, PAGE_LIMIT)
        } else {
            String::new()
        }
    }

    /// Two-phase image load: first the thumbnail index, then the main table.
    fn query_image_page(
        &self,
        album_id: &str,
        page: usize,
    ) -> Result<(Vec<MediaItem>, usize), StoreError> {
        let thumbnails = self.thumbnail_map()?;
        let total_count = self.count_images(album_id)?;

        let mimes = self.mime_args();
        let placeholders = placeholders(mimes.len());
        let (condition, args) = if album_id.is_empty() {
            (
                format!("mime_type IN ({})", placeholders),
                mimes.iter().map(|m| m.to_string()).collect::<Vec<_>>(),
            )
        } else {
            let mut args = vec![album_id.to_string()];
            args.extend(mimes.iter().map(|m| m.to_string()));
            (
                format!("bucket_id = ? AND (mime_type IN ({}))", placeholders),
                args,
            )
        };
        let sql = format!(
            "SELECT id, path, size, mime_type, width, height FROM images
             WHERE {} ORDER BY date_modified DESC{}",
            condition,
            self.page_window(page)
        );

        let rows = self.store.with_conn(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let mapped = stmt.query_map(params_from_iter(args.iter()), |row| {
                Ok(ImageRow {
                    id: row.get(0)?,
                    path: row.get(1)?,
                    size: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                    mime_type: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                    width: row.get::<_, i64>(4)?,
                    height: row.get::<_, i64>(5)?,
                })
            })?;
            mapped.collect::<rusqlite::Result<Vec<_>>>()
        })?;

        // Filter and dedup inline while materializing, never as a post-pass
        // over an existing collection.
        let mut items = Vec::with_capacity(rows.len());
        let mut seen_paths = HashSet::with_capacity(rows.len());
        for row in rows {
            if self.filter.need_filter(&row.path) {
                log::debug!("path filtered: {}", row.path);
                continue;
            }
            if !seen_paths.insert(row.path.clone()) {
                continue;
            }
            let mut image = match ImageItem::new(row.id, row.path) {
                Ok(image) => image,
                Err(e) => {
                    log::warn!("skipping malformed image row: {}", e);
                    continue;
                }
            };
            image.size = row.size;
            image.mime = MimeKind::from_mime(&row.mime_type);
            image.width = row.width.max(0) as u32;
            image.height = row.height.max(0) as u32;
            if let Some(thumb) = thumbnails.get(&image.id) {
                image.thumbnail_path = thumb.clone();
            }
            items.push(MediaItem::Image(image));
        }

        Ok((items, total_count))
    }

    fn thumbnail_map(&self) -> Result<HashMap<String, String>, StoreError> {
        self.store.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT image_id, path FROM thumbnails")?;
            let mapped = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
            mapped.collect::<rusqlite::Result<HashMap<String, String>>>()
        })
    }

    /// Unpaged row count for the same mime/bucket constraints as the page
    /// query. Deliberately independent of the row filter and the window.
    fn count_images(&self, album_id: &str) -> Result<usize, StoreError> {
        let mimes = self.mime_args();
        let placeholders = placeholders(mimes.len());
        let (condition, args) = if album_id.is_empty() {
            (
                format!("mime_type IN ({})", placeholders),
                mimes.iter().map(|m| m.to_string()).collect::<Vec<_>>(),
            )
        } else {
            let mut args = vec![album_id.to_string()];
            args.extend(mimes.iter().map(|m| m.to_string()));
            (
                format!("bucket_id = ? AND (mime_type IN ({}))", placeholders),
                args,
            )
        };
        let sql = format!("SELECT COUNT(*) FROM images WHERE {}", condition);
        let count: i64 = self
            .store
            .with_conn(|conn| conn.query_row(&sql, params_from_iter(args.iter()), |row| row.get(0)))?;
        Ok(count.max(0) as usize)
    }

    /// Single-phase video load: no thumbnail join, no dedup, no
    /// catalog-wide count.
    fn query_video_page(&self, page: usize) -> Result<(Vec<MediaItem>, usize), StoreError> {
        let sql = format!(
            "SELECT id, path, title, mime_type, size, date_taken, duration FROM videos
             ORDER BY date_modified DESC{}",
            self.page_window(page)
        );
        let rows = self.store.with_conn(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let mapped = stmt.query_map([], |row| {
                Ok(VideoRow {
                    id: row.get(0)?,
                    path: row.get(1)?,
                    title: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                    mime_type: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                    size: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
                    date_taken: row.get(5)?,
                    duration_ms: row.get(6)?,
                })
            })?;
            mapped.collect::<rusqlite::Result<Vec<_>>>()
        })?;

        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            let mut video = match VideoItem::new(row.id, row.path) {
                Ok(video) => video,
                Err(e) => {
                    log::warn!("skipping malformed video row: {}", e);
                    continue;
                }
            };
            video.title = row.title;
            video.mime_type = row.mime_type;
            video.size = row.size;
            video.date_taken = row.date_taken;
            video.duration_ms = row.duration_ms;
            items.push(MediaItem::Video(video));
        }
        let count = items.len();
        Ok((items, count))
    }

    fn query_albums(&self) -> Result<Vec<Album>, StoreError> {
        let buckets = self.store.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT bucket_id, bucket_display_name, MAX(date_modified) AS last_modified
                 FROM images GROUP BY bucket_id ORDER BY last_modified DESC",
            )?;
            let mapped = stmt.query_map([], |row| {
                Ok((
                    row.get::<_, Option<String>>(0)?.unwrap_or_default(),
                    row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                ))
            })?;
            mapped.collect::<rusqlite::Result<Vec<_>>>()
        })?;

        let mut albums = Vec::with_capacity(buckets.len());
        let mut unknown_album_number: u32 = 1;
        for (bucket_id, bucket_name) in buckets {
            let album_id = if bucket_id.is_empty() {
                let synthetic = format!("album-{}", unknown_album_number);
                unknown_album_number += 1;
                synthetic
            } else {
                bucket_id.clone()
            };
            let display_name = if bucket_name.is_empty() {
                let placeholder = format!("Album {}", unknown_album_number);
                unknown_album_number += 1;
                placeholder
            } else {
                bucket_name
            };

            // Buckets without at least one cover image are dropped.
            let Some(cover) = self.bucket_cover(&bucket_id)? else {
                continue;
            };
            let mut album = Album::new(album_id, display_name);
            album.count = self.bucket_count(&bucket_id)?;
            album.cover = Some(cover);
            albums.push(album);
        }

        if !albums.is_empty() {
            let mut all = Album::all_media();
            all.count = albums.iter().map(|a| a.count).sum();
            all.cover = albums[0].cover.clone();
            albums.insert(0, all);
        }
        Ok(albums)
    }

    /// Most recent matching image of a bucket.
    fn bucket_cover(&self, bucket_id: &str) -> Result<Option<ImageItem>, StoreError> {
        let mimes = self.mime_args();
        let sql = format!(
            "SELECT id, path, size, mime_type, width, height FROM images
             WHERE bucket_id = ? AND (mime_type IN ({}))
             ORDER BY date_modified DESC LIMIT 1",
            placeholders(mimes.len())
        );
        let mut args = vec![bucket_id.to_string()];
        args.extend(mimes.iter().map(|m| m.to_string()));
        let row = self.store.with_conn(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt.query_map(params_from_iter(args.iter()), |row| {
                Ok(ImageRow {
                    id: row.get(0)?,
                    path: row.get(1)?,
                    size: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                    mime_type: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                    width: row.get::<_, i64>(4)?,
                    height: row.get::<_, i64>(5)?,
                })
            })?;
            rows.next().transpose()
        })?;
        let Some(row) = row else {
            return Ok(None);
        };
        let mut cover = match ImageItem::new(row.id, row.path) {
            Ok(cover) => cover,
            Err(e) => {
                log::warn!("skipping malformed cover row: {}", e);
                return Ok(None);
            }
        };
        cover.size = row.size;
        cover.mime = MimeKind::from_mime(&row.mime_type);
        cover.width = row.width.max(0) as u32;
        cover.height = row.height.max(0) as u32;
        Ok(Some(cover))
    }

    fn bucket_count(&self, bucket_id: &str) -> Result<usize, StoreError> {
        let mimes = self.mime_args();
        let sql = format!(
            "SELECT COUNT(*) FROM images WHERE bucket_id = ? AND (mime_type IN ({}))",
            placeholders(mimes.len())
        );
        let mut args = vec![bucket_id.to_string()];
        args.extend(mimes.iter().map(|m| m.to_string()));
        let count: i64 = self
            .store
            .with_conn(|conn| conn.query_row(&sql, params_from_iter(args.iter()), |row| row.get(0)))?;
        Ok(count.max(0) as usize)
    }
}

struct ImageRow {
    id: String,
    path: String,
    size: String,
    mime_type: String,
    width: i64,
    height: i64,
}

struct VideoRow {
    id: String,
    path: String,
    title: String,
    mime_type: String,
    size: String,
    date_taken: i64,
    duration_ms: i64,
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}
