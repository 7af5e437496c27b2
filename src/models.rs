use crate::error::MediaError;
use crate::filter::is_file_valid;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// GIFs above this size are never added to a selection.
pub const MAX_GIF_SIZE: u64 = 1024 * 1024;

/// Image kind as reported by the catalog's mime column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MimeKind {
    Jpg,
    Png,
    Gif,
}

impl MimeKind {
    /// Classify a raw mime string. Unknown non-empty values are treated as
    /// JPEG, an absent value as PNG.
    pub fn from_mime(mime: &str) -> MimeKind {
        match mime {
            "" => MimeKind::Png,
            "image/gif" => MimeKind::Gif,
            "image/png" => MimeKind::Png,
            _ => MimeKind::Jpg,
        }
    }

    /// The mime string written back to the catalog.
    pub fn mime_type(&self) -> &'static str {
        match self {
            MimeKind::Gif => "image/gif",
            _ => "image/jpeg",
        }
    }
}

/// An image row materialized from the catalog.
///
/// Equality is path-based: two items with equal non-empty paths are the same
/// item regardless of any other field. This is what page dedup and selection
/// matching rely on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageItem {
    pub id: String,
    pub path: String,
    /// Raw size column value; see [`ImageItem::size_bytes`].
    pub size: String,
    pub width: u32,
    pub height: u32,
    pub mime: MimeKind,
    pub thumbnail_path: String,
    pub compressed_path: String,
    pub selected: bool,
}

impl ImageItem {
    pub fn new(id: impl Into<String>, path: impl Into<String>) -> Result<Self, MediaError> {
        let id = id.into();
        let path = path.into();
        if id.is_empty() {
            return Err(MediaError::MissingId);
        }
        if path.is_empty() {
            return Err(MediaError::MissingPath);
        }
        Ok(Self {
            id,
            path,
            size: String::new(),
            width: 0,
            height: 0,
            mime: MimeKind::Png,
            thumbnail_path: String::new(),
            compressed_path: String::new(),
            selected: false,
        })
    }

    /// Lenient parse of the raw size column; invalid or negative values
    /// yield zero.
    pub fn size_bytes(&self) -> u64 {
        parse_size(&self.size)
    }

    pub fn is_gif(&self) -> bool {
        self.mime == MimeKind::Gif
    }

    pub fn is_gif_oversize(&self) -> bool {
        self.is_gif() && self.size_bytes() > MAX_GIF_SIZE
    }

    /// Best available path for a thumbnail display: the indexed thumbnail if
    /// it still exists, then the compressed copy, then the original.
    pub fn display_thumbnail(&self) -> &str {
        if is_file_valid(Path::new(&self.thumbnail_path)) {
            &self.thumbnail_path
        } else if is_file_valid(Path::new(&self.compressed_path)) {
            &self.compressed_path
        } else {
            &self.path
        }
    }
}

impl PartialEq for ImageItem {
    fn eq(&self, other: &Self) -> bool {
        !self.path.is_empty() && self.path == other.path
    }
}

/// A video row materialized from the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoItem {
    pub id: String,
    pub path: String,
    /// Raw size column value; see [`VideoItem::size_bytes`].
    pub size: String,
    pub title: String,
    pub mime_type: String,
    pub duration_ms: i64,
    /// Capture timestamp in epoch milliseconds, zero when unknown.
    pub date_taken: i64,
}

impl VideoItem {
    pub fn new(id: impl Into<String>, path: impl Into<String>) -> Result<Self, MediaError> {
        let id = id.into();
        let path = path.into();
        if id.is_empty() {
            return Err(MediaError::MissingId);
        }
        if path.is_empty() {
            return Err(MediaError::MissingPath);
        }
        Ok(Self {
            id,
            path,
            size: String::new(),
            title: String::new(),
            mime_type: String::new(),
            duration_ms: 0,
            date_taken: 0,
        })
    }

    pub fn size_bytes(&self) -> u64 {
        parse_size(&self.size)
    }

    pub fn taken_at(&self) -> Option<DateTime<Utc>> {
        if self.date_taken <= 0 {
            return None;
        }
        Utc.timestamp_millis_opt(self.date_taken).single()
    }

    /// Duration rendered as `mm:ss`, with hours folded into the minute field.
    pub fn formatted_duration(&self) -> String {
        if self.duration_ms <= 0 {
            return "00:00".to_string();
        }
        let total_seconds = self.duration_ms / 1000;
        let seconds = total_seconds % 60;
        let minutes = total_seconds / 60 % 60;
        let hours = total_seconds / 3600;
        format!("{:02}:{:02}", hours * 60 + minutes, seconds)
    }

    /// Human readable size with a `K`/`M` suffix.
    pub fn size_label(&self) -> String {
        let size = self.size_bytes() as f64;
        if size == 0.0 {
            return "0K".to_string();
        }
        const MB: f64 = 1024.0 * 1024.0;
        if size >= MB {
            format!("{:.1}M", size / MB)
        } else {
            format!("{:.1}K", size / 1024.0)
        }
    }
}

impl PartialEq for VideoItem {
    fn eq(&self, other: &Self) -> bool {
        !self.path.is_empty() && self.path == other.path
    }
}

/// A single catalog entry, image or video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MediaItem {
    Image(ImageItem),
    Video(VideoItem),
}

impl MediaItem {
    pub fn id(&self) -> &str {
        match self {
            MediaItem::Image(image) => &image.id,
            MediaItem::Video(video) => &video.id,
        }
    }

    pub fn path(&self) -> &str {
        match self {
            MediaItem::Image(image) => &image.path,
            MediaItem::Video(video) => &video.path,
        }
    }

    pub fn size_bytes(&self) -> u64 {
        match self {
            MediaItem::Image(image) => image.size_bytes(),
            MediaItem::Video(video) => video.size_bytes(),
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, MediaItem::Image(_))
    }

    pub fn as_image(&self) -> Option<&ImageItem> {
        match self {
            MediaItem::Image(image) => Some(image),
            MediaItem::Video(_) => None,
        }
    }

    pub fn as_image_mut(&mut self) -> Option<&mut ImageItem> {
        match self {
            MediaItem::Image(image) => Some(image),
            MediaItem::Video(_) => None,
        }
    }
}

/// A logical album grouping media that share a catalog bucket id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Album {
    /// Empty string for the synthetic "all media" album.
    pub bucket_id: String,
    pub display_name: String,
    pub count: usize,
    /// Most recent matching image of the bucket.
    pub cover: Option<ImageItem>,
    /// Exactly one album is selected at a time; the "all" album starts out
    /// selected.
    pub is_selected: bool,
}

impl Album {
    pub fn new(bucket_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            bucket_id: bucket_id.into(),
            display_name: display_name.into(),
            count: 0,
            cover: None,
            is_selected: false,
        }
    }

    /// The synthetic album aggregating every bucket.
    pub fn all_media() -> Self {
        Self {
            bucket_id: String::new(),
            display_name: "All media".to_string(),
            count: 0,
            cover: None,
            is_selected: true,
        }
    }

    pub fn has_cover(&self) -> bool {
        self.cover.is_some()
    }
}

fn parse_size(raw: &str) -> u64 {
    match raw.trim().parse::<i64>() {
        Ok(value) if value > 0 => value as u64,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_parses_leniently() {
        let mut image = ImageItem::new("1", "/a.jpg").unwrap();
        image.size = "2048".to_string();
        assert_eq!(image.size_bytes(), 2048);
        image.size = "-5".to_string();
        assert_eq!(image.size_bytes(), 0);
        image.size = "garbage".to_string();
        assert_eq!(image.size_bytes(), 0);
        image.size = String::new();
        assert_eq!(image.size_bytes(), 0);
    }

    #[test]
    fn path_equality_ignores_other_fields() {
        let mut a = ImageItem::new("1", "/same.jpg").unwrap();
        let b = ImageItem::new("2", "/same.jpg").unwrap();
        a.width = 640;
        a.selected = true;
        assert_eq!(a, b);
        let c = ImageItem::new("1", "/other.jpg").unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn construction_validates_required_fields() {
        assert_eq!(ImageItem::new("", "/a.jpg"), Err(MediaError::MissingId));
        assert_eq!(ImageItem::new("1", ""), Err(MediaError::MissingPath));
        assert_eq!(VideoItem::new("", "/v.mp4"), Err(MediaError::MissingId));
        assert_eq!(VideoItem::new("1", ""), Err(MediaError::MissingPath));
    }

    #[test]
    fn mime_classification() {
        assert_eq!(MimeKind::from_mime("image/gif"), MimeKind::Gif);
        assert_eq!(MimeKind::from_mime("image/png"), MimeKind::Png);
        assert_eq!(MimeKind::from_mime("image/jpeg"), MimeKind::Jpg);
        assert_eq!(MimeKind::from_mime("image/webp"), MimeKind::Jpg);
        assert_eq!(MimeKind::from_mime(""), MimeKind::Png);
        assert_eq!(MimeKind::Gif.mime_type(), "image/gif");
        assert_eq!(MimeKind::Png.mime_type(), "image/jpeg");
    }

    #[test]
    fn oversized_gif_detection() {
        let mut gif = ImageItem::new("1", "/a.gif").unwrap();
        gif.mime = MimeKind::Gif;
        gif.size = (MAX_GIF_SIZE + 1).to_string();
        assert!(gif.is_gif_oversize());
        gif.size = MAX_GIF_SIZE.to_string();
        assert!(!gif.is_gif_oversize());
        let mut jpg = ImageItem::new("1", "/a.jpg").unwrap();
        jpg.mime = MimeKind::Jpg;
        jpg.size = (MAX_GIF_SIZE * 4).to_string();
        assert!(!jpg.is_gif_oversize());
    }

    #[test]
    fn duration_formatting() {
        let mut video = VideoItem::new("1", "/v.mp4").unwrap();
        video.duration_ms = 65_000;
        assert_eq!(video.formatted_duration(), "01:05");
        video.duration_ms = 3_725_000; // 1h 2m 5s
        assert_eq!(video.formatted_duration(), "62:05");
        video.duration_ms = 0;
        assert_eq!(video.formatted_duration(), "00:00");
        video.duration_ms = -3;
        assert_eq!(video.formatted_duration(), "00:00");
    }

    #[test]
    fn size_labels() {
        let mut video = VideoItem::new("1", "/v.mp4").unwrap();
        video.size = "512".to_string();
        assert_eq!(video.size_label(), "0.5K");
        video.size = (3 * 1024 * 1024).to_string();
        assert_eq!(video.size_label(), "3.0M");
        video.size = "bogus".to_string();
        assert_eq!(video.size_label(), "0K");
    }

    #[test]
    fn taken_at_conversion() {
        let mut video = VideoItem::new("1", "/v.mp4").unwrap();
        video.date_taken = 0;
        assert!(video.taken_at().is_none());
        video.date_taken = 1_600_000_000_000;
        let taken = video.taken_at().unwrap();
        assert_eq!(taken.timestamp_millis(), 1_600_000_000_000);
    }

    #[test]
    fn all_media_album_defaults() {
        let album = Album::all_media();
        assert!(album.bucket_id.is_empty());
        assert!(album.is_selected);
        assert!(!album.has_cover());
        assert_eq!(album.count, 0);
    }
}
