//! # media-picker
//!
//! A library for browsing a device-local media catalog and preparing picked
//! images for use, including:
//! - Paged catalog queries over images and videos (SQLite-backed)
//! - Album enumeration with per-bucket covers and counts
//! - A selection coordinator with single-flight next-page control and
//!   cross-page selection reconciliation
//! - A compression engine producing size-bounded JPEG copies behind a
//!   content-addressed on-disk cache
//!
//! ## Architecture
//!
//! All services for one picking flow are assembled into a [`PickerSession`]:
//! catalog queries and compressions run on a worker pool, results come back
//! as events on a single callback queue, and the session owner applies them
//! from one logical context. Nothing is process-wide; dropping the session
//! ends the flow and strands any in-flight results harmlessly.
//!
//! UI concerns (rendering, gestures, permissions, camera and crop flows)
//! are out of scope and sit on top of the [`PickerListener`] callbacks.
//!
//! ## Example
//!
//! ```rust,ignore
//! use media_picker::{MediaStore, PickerConfig, PickerMode, PickerSession};
//!
//! let store = MediaStore::open(std::path::Path::new("/data/media.db"))?;
//! let config = PickerConfig::new(PickerMode::MultiImage).with_gif();
//! let mut session = PickerSession::new(
//!     config,
//!     store,
//!     std::path::Path::new("/data/cache"),
//!     tokio::runtime::Handle::current(),
//! );
//! session.coordinator().load_albums();
//! session.coordinator().load_page(0, "");
//! while session.pump().await { /* state updated, listener notified */ }
//! ```

pub mod cache;
pub mod catalog;
pub mod compress;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod exif;
pub mod filter;
pub mod models;
pub mod selection;
pub mod session;
pub mod store;

pub use cache::CompressCache;
pub use catalog::{CatalogService, PAGE_LIMIT};
pub use compress::ImageCompressor;
pub use config::{PickerConfig, PickerMode, DEFAULT_SELECTION_COUNT};
pub use dispatch::{EventQueue, PickerEvent, TaskDispatcher};
pub use error::{CompressError, MediaError, StoreError};
pub use filter::{AcceptAllFilter, MediaFilter, PathValidityFilter};
pub use models::{Album, ImageItem, MediaItem, MimeKind, VideoItem, MAX_GIF_SIZE};
pub use selection::{PageState, PickerListener, SelectionCoordinator};
pub use session::PickerSession;
pub use store::{ImageRecord, MediaStore, VideoRecord};
