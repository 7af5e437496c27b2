use crate::catalog::{CatalogService, PAGE_LIMIT};
use crate::config::PickerConfig;
use crate::dispatch::{PickerEvent, TaskDispatcher};
use crate::models::{Album, MediaItem};
use std::collections::HashMap;

/// Callbacks delivered to the UI collaborator after coordinator state has
/// been updated.
pub trait PickerListener {
    /// The accumulated item collection after a page was applied, plus the
    /// catalog-wide total for the current constraints.
    fn on_media(&mut self, items: &[MediaItem], total_count: usize);
    /// The freshly loaded album list.
    fn on_albums(&mut self, albums: &[Album]);
}

/// Pagination state owned by the coordinator.
#[derive(Debug, Clone, Default)]
pub struct PageState {
    pub current_page: usize,
    /// Unset until the first page response arrives; treated as zero, so
    /// `has_next_page()` is false for loads issued before any response.
    pub total_page: Option<usize>,
    /// True while exactly one next-page fetch is in flight.
    pub is_fetching_next_page: bool,
    pub current_album_id: String,
}

/// Owns the page-accumulated media collection and the cross-page selection
/// for one picking session.
///
/// All mutation happens on the session's single callback context: loads are
/// dispatched to the worker pool and come back as [`PickerEvent`]s that the
/// owner feeds into [`handle_event`](Self::handle_event). The page counters
/// and the single-flight flag are not lock-guarded; invoking this type from
/// concurrent contexts is out of contract.
pub struct SelectionCoordinator {
    config: PickerConfig,
    catalog: CatalogService,
    dispatch: TaskDispatcher,
    state: PageState,
    items: Vec<MediaItem>,
    selected: Vec<MediaItem>,
    /// Bumped whenever accumulated state is reset; responses stamped with an
    /// older generation are dropped instead of mutating fresh state.
    generation: u64,
    listener: Option<Box<dyn PickerListener>>,
}

impl SelectionCoordinator {
    pub fn new(config: PickerConfig, catalog: CatalogService, dispatch: TaskDispatcher) -> Self {
        Self {
            config,
            catalog,
            dispatch,
            state: PageState::default(),
            items: Vec::new(),
            selected: Vec::new(),
            generation: 0,
            listener: None,
        }
    }

    pub fn set_listener(&mut self, listener: Box<dyn PickerListener>) {
        self.listener = Some(listener);
    }

    pub fn state(&self) -> &PageState {
        &self.state
    }

    /// The merged collection accumulated across pages.
    pub fn items(&self) -> &[MediaItem] {
        &self.items
    }

    pub fn selected(&self) -> &[MediaItem] {
        &self.selected
    }

    /// Load `page` of `album_id` on the worker pool.
    ///
    /// Page zero starts the album over: accumulated items are cleared, the
    /// page counter resets and in-flight responses from before the reset are
    /// invalidated. Any other page appends to the running collection.
    pub fn load_page(&mut self, page: usize, album_id: &str) {
        self.state.current_album_id = album_id.to_string();
        if page == 0 {
            self.items.clear();
            self.state.current_page = 0;
            // A fetch from before the reset can no longer clear the flag.
            self.state.is_fetching_next_page = false;
            self.generation += 1;
        }
        let generation = self.generation;
        let catalog = self.catalog.clone();
        let dispatch = self.dispatch.clone();
        let album = album_id.to_string();
        self.dispatch.run_worker(move || {
            let (items, total_count) = catalog.load_page(&album, page);
            dispatch.post(PickerEvent::MediaLoaded {
                generation,
                items,
                total_count,
            });
        });
    }

    /// Enumerate albums on the worker pool.
    pub fn load_albums(&mut self) {
        let generation = self.generation;
        let catalog = self.catalog.clone();
        let dispatch = self.dispatch.clone();
        self.dispatch.run_worker(move || {
            let albums = catalog.load_albums();
            dispatch.post(PickerEvent::AlbumsLoaded { generation, albums });
        });
    }

    pub fn has_next_page(&self) -> bool {
        self.state.current_page < self.state.total_page.unwrap_or(0)
    }

    pub fn can_load_next_page(&self) -> bool {
        !self.state.is_fetching_next_page
    }

    /// Fetch the next page of the current album. No-op while a next-page
    /// fetch is already in flight; the flag clears only when the matching
    /// response is applied.
    pub fn on_load_next_page(&mut self) {
        if !self.can_load_next_page() {
            return;
        }
        self.state.current_page += 1;
        self.state.is_fetching_next_page = true;
        let page = self.state.current_page;
        let album = self.state.current_album_id.clone();
        self.load_page(page, &album);
    }

    /// Apply a worker result to coordinator state and notify the listener.
    /// Stale-generation events are dropped without side effects.
    pub fn handle_event(&mut self, event: PickerEvent) {
        match event {
            PickerEvent::MediaLoaded {
                generation,
                items,
                total_count,
            } => {
                if generation != self.generation {
                    log::debug!("dropping stale media response (generation {})", generation);
                    return;
                }
                self.state.total_page = Some(total_count / PAGE_LIMIT);
                self.state.is_fetching_next_page = false;
                self.items.extend(items);
                Self::check_selected_media(&mut self.items, &self.selected);
                if let Some(listener) = self.listener.as_mut() {
                    listener.on_media(&self.items, total_count);
                }
            }
            PickerEvent::AlbumsLoaded { generation, albums } => {
                if generation != self.generation {
                    log::debug!("dropping stale album response (generation {})", generation);
                    return;
                }
                if let Some(listener) = self.listener.as_mut() {
                    listener.on_albums(&albums);
                }
            }
        }
    }

    /// Reconcile selection flags against a freshly merged collection.
    ///
    /// Every image in `all` is first deselected, then items whose path
    /// appears in `selected` are re-marked. Matching is by path, never id.
    /// O(|all| + |selected|). No-op when either side is empty.
    pub fn check_selected_media(all: &mut [MediaItem], selected: &[MediaItem]) {
        if all.is_empty() || selected.is_empty() {
            return;
        }
        let mut by_path: HashMap<String, usize> = HashMap::with_capacity(all.len());
        for (index, item) in all.iter_mut().enumerate() {
            if let MediaItem::Image(image) = item {
                image.selected = false;
                by_path.insert(image.path.clone(), index);
            }
        }
        for sel in selected {
            if let Some(&index) = by_path.get(sel.path()) {
                if let MediaItem::Image(image) = &mut all[index] {
                    image.selected = true;
                }
            }
        }
    }

    /// Pure admission check for adding `item` to the selection: the ceiling
    /// must not be reached and oversized GIFs are never admitted.
    pub fn can_select(&self, item: &MediaItem) -> bool {
        if let MediaItem::Image(image) = item {
            if image.is_gif_oversize() {
                return false;
            }
        }
        self.selected.len() < self.config.max_selection_count()
    }

    /// Add `item` to the selection if admitted and not already present.
    pub fn try_select(&mut self, item: &MediaItem) -> bool {
        if !self.can_select(item) {
            return false;
        }
        if self.selected.iter().any(|m| m.path() == item.path()) {
            return false;
        }
        self.selected.push(item.clone());
        self.mark_selected(item.path(), true);
        true
    }

    /// Remove `item` from the selection.
    pub fn deselect(&mut self, item: &MediaItem) {
        self.selected.retain(|m| m.path() != item.path());
        self.mark_selected(item.path(), false);
    }

    /// Invalidate every outstanding async request, e.g. on session teardown.
    pub fn invalidate(&mut self) {
        self.generation += 1;
        self.state.is_fetching_next_page = false;
    }

    fn mark_selected(&mut self, path: &str, selected: bool) {
        for item in &mut self.items {
            if let MediaItem::Image(image) = item {
                if image.path == path {
                    image.selected = selected;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PickerMode;
    use crate::filter::AcceptAllFilter;
    use crate::models::{ImageItem, MimeKind, MAX_GIF_SIZE};
    use crate::store::MediaStore;
    use std::sync::Arc;

    fn image(id: &str, path: &str, selected: bool) -> MediaItem {
        let mut item = ImageItem::new(id, path).unwrap();
        item.selected = selected;
        MediaItem::Image(item)
    }

    fn coordinator(
        runtime: &tokio::runtime::Runtime,
        config: PickerConfig,
    ) -> (SelectionCoordinator, crate::dispatch::EventQueue) {
        let store = MediaStore::open_in_memory().unwrap();
        let catalog = CatalogService::new(store, config.clone(), Arc::new(AcceptAllFilter));
        let (dispatch, queue) = TaskDispatcher::new(runtime.handle().clone());
        (SelectionCoordinator::new(config, catalog, dispatch), queue)
    }

    #[test]
    fn reconciliation_marks_by_path() {
        let mut all = vec![
            image("1", "a", true),
            image("2", "b", false),
            image("3", "c", false),
        ];
        // Same path as item 2 but a different id.
        let selected = vec![image("99", "b", false)];
        SelectionCoordinator::check_selected_media(&mut all, &selected);
        let flags: Vec<bool> = all
            .iter()
            .map(|m| m.as_image().unwrap().selected)
            .collect();
        assert_eq!(flags, vec![false, true, false]);
    }

    #[test]
    fn reconciliation_is_noop_for_empty_inputs() {
        let mut all = vec![image("1", "a", true)];
        SelectionCoordinator::check_selected_media(&mut all, &[]);
        assert!(all[0].as_image().unwrap().selected);

        let mut empty: Vec<MediaItem> = Vec::new();
        SelectionCoordinator::check_selected_media(&mut empty, &[image("1", "a", false)]);
        assert!(empty.is_empty());
    }

    #[test]
    fn total_page_derivation_and_has_next_page() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let (mut coordinator, _queue) =
            coordinator(&runtime, PickerConfig::new(PickerMode::MultiImage));

        // No response yet: total page unset, no next page.
        assert!(!coordinator.has_next_page());

        coordinator.handle_event(PickerEvent::MediaLoaded {
            generation: coordinator.generation,
            items: Vec::new(),
            total_count: 2500,
        });
        assert_eq!(coordinator.state().total_page, Some(2));
        assert!(coordinator.has_next_page()); // page 0 of 2

        coordinator.state.current_page = 1;
        assert!(coordinator.has_next_page());
        coordinator.state.current_page = 2;
        assert!(!coordinator.has_next_page());
    }

    #[test]
    fn next_page_requests_are_single_flight() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let (mut coordinator, mut queue) =
            coordinator(&runtime, PickerConfig::new(PickerMode::MultiImage));
        coordinator.handle_event(PickerEvent::MediaLoaded {
            generation: coordinator.generation,
            items: Vec::new(),
            total_count: 2500,
        });

        coordinator.on_load_next_page();
        assert_eq!(coordinator.state().current_page, 1);
        assert!(coordinator.state().is_fetching_next_page);
        assert!(!coordinator.can_load_next_page());

        // Second request while the first is in flight: ignored.
        coordinator.on_load_next_page();
        assert_eq!(coordinator.state().current_page, 1);

        // Exactly one response arrives, and applying it re-arms the flag.
        let event = runtime.block_on(queue.next()).unwrap();
        coordinator.handle_event(event);
        assert!(coordinator.can_load_next_page());
        assert!(queue.try_next().is_none());
    }

    #[test]
    fn page_zero_resets_accumulated_items() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let (mut coordinator, mut queue) =
            coordinator(&runtime, PickerConfig::new(PickerMode::MultiImage));

        coordinator.items.push(image("1", "a", false));
        coordinator.state.current_page = 3;
        coordinator.load_page(0, "bucket");
        assert!(coordinator.items().is_empty());
        assert_eq!(coordinator.state().current_page, 0);
        assert_eq!(coordinator.state().current_album_id, "bucket");

        // The dispatched page-0 query against the empty store still answers.
        let event = runtime.block_on(queue.next()).unwrap();
        coordinator.handle_event(event);
        assert_eq!(coordinator.state().total_page, Some(0));
    }

    #[test]
    fn stale_generation_responses_are_dropped() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let (mut coordinator, _queue) =
            coordinator(&runtime, PickerConfig::new(PickerMode::MultiImage));

        let stale = coordinator.generation;
        coordinator.invalidate();
        coordinator.handle_event(PickerEvent::MediaLoaded {
            generation: stale,
            items: vec![image("1", "a", false)],
            total_count: 2500,
        });
        assert!(coordinator.items().is_empty());
        assert!(coordinator.state().total_page.is_none());
    }

    #[test]
    fn album_switch_invalidates_inflight_next_page() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let (mut coordinator, _queue) =
            coordinator(&runtime, PickerConfig::new(PickerMode::MultiImage));
        coordinator.handle_event(PickerEvent::MediaLoaded {
            generation: coordinator.generation,
            items: Vec::new(),
            total_count: 2500,
        });
        coordinator.on_load_next_page();
        let inflight = coordinator.generation;

        // Album switch resets to page zero before the next-page response
        // lands; the late response must not append to the new album.
        coordinator.load_page(0, "other");
        assert!(coordinator.can_load_next_page());
        coordinator.handle_event(PickerEvent::MediaLoaded {
            generation: inflight,
            items: vec![image("1", "a", false)],
            total_count: 2500,
        });
        assert!(coordinator.items().is_empty());
    }

    #[test]
    fn selection_respects_ceiling_and_gif_limit() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let config = PickerConfig::new(PickerMode::MultiImage).with_max_selection_count(2);
        let (mut coordinator, _queue) = coordinator(&runtime, config);

        assert!(coordinator.try_select(&image("1", "a", false)));
        // Same path again: rejected, not double counted.
        assert!(!coordinator.try_select(&image("9", "a", false)));
        assert!(coordinator.try_select(&image("2", "b", false)));
        // Ceiling reached.
        assert!(!coordinator.try_select(&image("3", "c", false)));
        assert_eq!(coordinator.selected().len(), 2);

        coordinator.deselect(&image("1", "a", false));
        assert_eq!(coordinator.selected().len(), 1);

        // Oversized GIFs are never admitted, even below the ceiling.
        let mut gif = ImageItem::new("4", "d.gif").unwrap();
        gif.mime = MimeKind::Gif;
        gif.size = (MAX_GIF_SIZE + 1).to_string();
        assert!(!coordinator.try_select(&MediaItem::Image(gif)));
    }

    #[test]
    fn applied_pages_reconcile_against_the_selection() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let (mut coordinator, _queue) =
            coordinator(&runtime, PickerConfig::new(PickerMode::MultiImage));
        coordinator.try_select(&image("7", "b", false));

        coordinator.handle_event(PickerEvent::MediaLoaded {
            generation: coordinator.generation,
            items: vec![image("1", "a", false), image("2", "b", false)],
            total_count: 2,
        });
        let flags: Vec<bool> = coordinator
            .items()
            .iter()
            .map(|m| m.as_image().unwrap().selected)
            .collect();
        assert_eq!(flags, vec![false, true]);
    }

    #[test]
    fn listener_receives_accumulated_items_and_albums() {
        use std::cell::RefCell;
        use std::rc::Rc;

        #[derive(Default)]
        struct Recorded {
            media_calls: Vec<(usize, usize)>,
            album_calls: Vec<usize>,
        }
        struct Recorder(Rc<RefCell<Recorded>>);
        impl PickerListener for Recorder {
            fn on_media(&mut self, items: &[MediaItem], total_count: usize) {
                self.0
                    .borrow_mut()
                    .media_calls
                    .push((items.len(), total_count));
            }
            fn on_albums(&mut self, albums: &[Album]) {
                self.0.borrow_mut().album_calls.push(albums.len());
            }
        }

        let runtime = tokio::runtime::Runtime::new().unwrap();
        let (mut coordinator, _queue) =
            coordinator(&runtime, PickerConfig::new(PickerMode::MultiImage));
        let recorded = Rc::new(RefCell::new(Recorded::default()));
        coordinator.set_listener(Box::new(Recorder(recorded.clone())));

        coordinator.handle_event(PickerEvent::MediaLoaded {
            generation: 0,
            items: vec![image("1", "a", false)],
            total_count: 1,
        });
        coordinator.handle_event(PickerEvent::MediaLoaded {
            generation: 0,
            items: vec![image("2", "b", false)],
            total_count: 2,
        });
        coordinator.handle_event(PickerEvent::AlbumsLoaded {
            generation: 0,
            albums: vec![Album::all_media()],
        });

        let recorded = recorded.borrow();
        assert_eq!(recorded.media_calls, vec![(1, 1), (2, 2)]);
        assert_eq!(recorded.album_calls, vec![1]);
    }
}
