use crate::catalog::CatalogService;
use crate::compress::ImageCompressor;
use crate::config::PickerConfig;
use crate::dispatch::{EventQueue, TaskDispatcher};
use crate::filter::{MediaFilter, PathValidityFilter};
use crate::selection::SelectionCoordinator;
use crate::store::MediaStore;
use std::path::Path;
use std::sync::Arc;
use tokio::runtime::Handle;

/// One picking session: config, catalog access, coordinator and compressor
/// wired to a shared dispatcher.
///
/// Construct one per picking flow and drop it when the flow ends; there is
/// no process-wide state. The owner drives the session from a single
/// context by pumping worker results into the coordinator via
/// [`pump`](Self::pump) or [`pump_now`](Self::pump_now).
pub struct PickerSession {
    config: PickerConfig,
    coordinator: SelectionCoordinator,
    compressor: ImageCompressor,
    events: EventQueue,
}

impl PickerSession {
    /// Session with the default row filter (paths must exist on disk).
    pub fn new(
        config: PickerConfig,
        store: MediaStore,
        cache_dir: &Path,
        handle: Handle,
    ) -> Self {
        Self::with_filter(config, store, cache_dir, handle, Arc::new(PathValidityFilter))
    }

    /// Session with a caller-supplied row filter.
    pub fn with_filter(
        config: PickerConfig,
        store: MediaStore,
        cache_dir: &Path,
        handle: Handle,
        filter: Arc<dyn MediaFilter>,
    ) -> Self {
        let (dispatch, events) = TaskDispatcher::new(handle);
        let catalog = CatalogService::new(store, config.clone(), filter);
        let coordinator = SelectionCoordinator::new(config.clone(), catalog, dispatch.clone());
        let compressor = ImageCompressor::new(cache_dir, dispatch);
        Self {
            config,
            coordinator,
            compressor,
            events,
        }
    }

    pub fn config(&self) -> &PickerConfig {
        &self.config
    }

    pub fn coordinator(&mut self) -> &mut SelectionCoordinator {
        &mut self.coordinator
    }

    pub fn compressor(&self) -> &ImageCompressor {
        &self.compressor
    }

    /// Wait for the next worker result and apply it. Returns false once the
    /// queue can produce nothing more.
    pub async fn pump(&mut self) -> bool {
        match self.events.next().await {
            Some(event) => {
                self.coordinator.handle_event(event);
                true
            }
            None => false,
        }
    }

    /// Apply one already-delivered worker result, if any.
    pub fn pump_now(&mut self) -> bool {
        match self.events.try_next() {
            Some(event) => {
                self.coordinator.handle_event(event);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PickerMode;
    use crate::filter::AcceptAllFilter;
    use crate::store::ImageRecord;

    fn seeded_store() -> MediaStore {
        let store = MediaStore::open_in_memory().unwrap();
        for i in 0..3u32 {
            store
                .add_image(&ImageRecord {
                    id: i.to_string(),
                    path: format!("/pictures/{}.jpg", i),
                    size: "1000".to_string(),
                    mime_type: "image/jpeg".to_string(),
                    width: 640,
                    height: 480,
                    bucket_id: "camera".to_string(),
                    bucket_name: "Camera".to_string(),
                    date_modified: i as i64,
                })
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn end_to_end_page_load_through_the_session() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = PickerSession::with_filter(
            PickerConfig::new(PickerMode::MultiImage),
            seeded_store(),
            dir.path(),
            Handle::current(),
            Arc::new(AcceptAllFilter),
        );

        session.coordinator().load_page(0, "");
        assert!(session.pump().await);
        assert_eq!(session.coordinator().items().len(), 3);
        assert_eq!(session.coordinator().state().total_page, Some(0));
        assert!(!session.coordinator().has_next_page());
    }

    #[tokio::test]
    async fn end_to_end_album_load_through_the_session() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = PickerSession::with_filter(
            PickerConfig::new(PickerMode::MultiImage),
            seeded_store(),
            dir.path(),
            Handle::current(),
            Arc::new(AcceptAllFilter),
        );

        session.coordinator().load_albums();
        assert!(session.pump().await);
        // Listener-free sessions still apply state; albums only notify the
        // listener, so just verify the pump consumed the event.
        assert!(!session.pump_now());
    }

    #[tokio::test]
    async fn pump_now_is_non_blocking() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = PickerSession::new(
            PickerConfig::new(PickerMode::MultiImage),
            MediaStore::open_in_memory().unwrap(),
            dir.path(),
            Handle::current(),
        );
        assert!(!session.pump_now());
    }
}
