use crate::models::{Album, MediaItem};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// A result delivered back to the session's callback context.
#[derive(Debug)]
pub enum PickerEvent {
    /// One page of media finished loading.
    MediaLoaded {
        generation: u64,
        items: Vec<MediaItem>,
        total_count: usize,
    },
    /// The album list finished loading.
    AlbumsLoaded {
        generation: u64,
        albums: Vec<Album>,
    },
}

/// Bridges the unordered worker pool and the single logical callback context.
///
/// Workers run on the tokio blocking pool; their results come back as
/// [`PickerEvent`]s on one queue that the session owner drains from a single
/// context. Catalog loads and compressions may complete in any order; the
/// queue is the only ordering point.
#[derive(Clone)]
pub struct TaskDispatcher {
    handle: Handle,
    events: mpsc::UnboundedSender<PickerEvent>,
}

impl TaskDispatcher {
    /// Create a dispatcher bound to `handle` and the queue its events land
    /// on.
    pub fn new(handle: Handle) -> (Self, EventQueue) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self { handle, events: tx },
            EventQueue { rx },
        )
    }

    /// Dispatcher bound to the ambient runtime. Panics outside of one.
    pub fn current() -> (Self, EventQueue) {
        Self::new(Handle::current())
    }

    /// Run a unit of work on the blocking worker pool.
    pub fn run_worker<F, T>(&self, job: F) -> JoinHandle<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        self.handle.spawn_blocking(job)
    }

    /// Deliver an event to the callback context. Dropped silently once the
    /// queue owner is gone; a torn-down session simply never sees it.
    pub fn post(&self, event: PickerEvent) {
        if self.events.send(event).is_err() {
            log::debug!("callback queue closed, event dropped");
        }
    }

    pub(crate) fn runtime(&self) -> &Handle {
        &self.handle
    }
}

/// Receiving side of the callback context. Drained by exactly one owner.
pub struct EventQueue {
    rx: mpsc::UnboundedReceiver<PickerEvent>,
}

impl EventQueue {
    /// Wait for the next event. `None` once every dispatcher clone is gone.
    pub async fn next(&mut self) -> Option<PickerEvent> {
        self.rx.recv().await
    }

    /// Non-blocking poll, for callers pumping the queue from a loop.
    pub fn try_next(&mut self) -> Option<PickerEvent> {
        self.rx.try_recv().ok()
    }
}
