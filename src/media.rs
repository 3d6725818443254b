use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};

use crate::data::{describe_error, PostService};
use crate::models::{MediaItem, PostId};

#[derive(Debug, Clone)]
pub struct Config {
    pub workers: usize,
    pub max_queue_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workers: 4,
            max_queue_depth: 64,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request {
    pub post_id: PostId,
    pub index: usize,
    /// Mount generation of the gallery that asked for this item.
    pub generation: u64,
}

#[derive(Debug)]
pub struct ResultEntry {
    pub request: Request,
    pub result: Result<MediaItem, String>,
}

struct Job {
    request: Request,
    tx: Sender<ResultEntry>,
}

struct Inner {
    service: Arc<dyn PostService>,
    jobs: Sender<Job>,
    stop: Sender<()>,
    queued: AtomicUsize,
    max_queue_depth: usize,
}

/// Fixed pool of workers fetching media items by index.
pub struct Manager {
    inner: Arc<Inner>,
    handles: Vec<thread::JoinHandle<()>>,
}

impl Manager {
    pub fn new(service: Arc<dyn PostService>, cfg: Config) -> Result<Self> {
        let workers = if cfg.workers == 0 { 4 } else { cfg.workers };
        let (job_tx, job_rx) = unbounded();
        let (stop_tx, stop_rx) = unbounded();

        let inner = Arc::new(Inner {
            service,
            jobs: job_tx,
            stop: stop_tx,
            queued: AtomicUsize::new(0),
            max_queue_depth: cfg.max_queue_depth,
        });

        let mut handles = Vec::new();
        for n in 0..workers {
            let rx_jobs = job_rx.clone();
            let rx_stop = stop_rx.clone();
            let worker_inner = inner.clone();
            let handle = thread::Builder::new()
                .name(format!("media-{n}"))
                .spawn(move || worker_inner.worker(rx_jobs, rx_stop))
                .context("media: spawn worker")?;
            handles.push(handle);
        }

        Ok(Self { inner, handles })
    }

    /// Queues one fetch; the outcome is delivered on `tx`. Returns false when
    /// the queue is full. Nothing is delivered then and the caller keeps the
    /// request for a later attempt.
    pub fn enqueue(&self, request: Request, tx: Sender<ResultEntry>) -> bool {
        let depth = self.inner.max_queue_depth;
        if depth > 0 && self.inner.queued.load(Ordering::SeqCst) >= depth {
            log::debug!(
                "media: queue full, holding item {} of post {}",
                request.index,
                request.post_id
            );
            return false;
        }
        self.inner.queued.fetch_add(1, Ordering::SeqCst);
        if self.inner.jobs.send(Job { request, tx }).is_err() {
            self.inner.queued.fetch_sub(1, Ordering::SeqCst);
            return false;
        }
        true
    }

    /// Blocking single fetch, mostly for tooling.
    pub fn fetch_now(&self, request: Request) -> Option<ResultEntry> {
        let (tx, rx) = bounded(1);
        if !self.enqueue(request, tx) {
            return None;
        }
        rx.recv().ok()
    }

    fn shutdown(&mut self) {
        for _ in &self.handles {
            let _ = self.inner.stop.send(());
        }
        while let Some(handle) = self.handles.pop() {
            let _ = handle.join();
        }
    }
}

impl Drop for Manager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl Inner {
    fn worker(&self, jobs: Receiver<Job>, stop: Receiver<()>) {
        loop {
            crossbeam_channel::select! {
                recv(stop) -> _ => break,
                recv(jobs) -> msg => {
                    match msg {
                        Ok(job) => self.process(job),
                        Err(_) => break,
                    }
                }
            }
        }
    }

    fn process(&self, job: Job) {
        self.queued.fetch_sub(1, Ordering::SeqCst);
        let Request { post_id, index, .. } = job.request;
        let result = self.service.media(post_id, index).map_err(|err| {
            log::warn!("media: item {index} of post {post_id} failed: {err:#}");
            describe_error(&err)
        });
        let _ = job.tx.send(ResultEntry {
            request: job.request,
            result,
        });
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    Pending,
    Ready(MediaItem),
    Failed { placeholder: MediaItem, reason: String },
}

impl Slot {
    pub fn item(&self) -> Option<&MediaItem> {
        match self {
            Slot::Pending => None,
            Slot::Ready(item) => Some(item),
            Slot::Failed { placeholder, .. } => Some(placeholder),
        }
    }
}

/// Media of one mounted post card, one slot per declared index.
///
/// The slot count always equals the post's media count. A failed index holds
/// an error placeholder, and a result whose `src` already fills its slot is
/// dropped as a repeat delivery. Distinct indices that resolve to the same
/// URL each keep their own slot.
#[derive(Debug, Clone)]
pub struct Gallery {
    post_id: PostId,
    generation: u64,
    slots: Vec<Slot>,
}

impl Gallery {
    pub fn new(post_id: PostId, media_count: usize, generation: u64) -> Self {
        Self {
            post_id,
            generation,
            slots: vec![Slot::Pending; media_count],
        }
    }

    pub fn post_id(&self) -> PostId {
        self.post_id
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn requests(&self) -> Vec<Request> {
        (0..self.slots.len())
            .map(|index| Request {
                post_id: self.post_id,
                index,
                generation: self.generation,
            })
            .collect()
    }

    /// Returns whether the slot changed.
    pub fn apply(&mut self, index: usize, result: Result<MediaItem, String>) -> bool {
        let Some(slot) = self.slots.get_mut(index) else {
            return false;
        };
        match result {
            Ok(item) => {
                if let Slot::Ready(existing) = slot {
                    if existing.src == item.src {
                        return false;
                    }
                }
                *slot = Slot::Ready(item);
            }
            Err(reason) => {
                if matches!(slot, Slot::Ready(_)) {
                    return false;
                }
                *slot = Slot::Failed {
                    placeholder: MediaItem::error(index),
                    reason,
                };
            }
        }
        true
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        self.slots.iter().all(|slot| !matches!(slot, Slot::Pending))
    }

    /// Settled items in index order; pending slots are skipped.
    pub fn items(&self) -> Vec<MediaItem> {
        self.slots.iter().filter_map(Slot::item).cloned().collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Loading,
    Loaded,
    Failed,
}

/// Full-screen viewer with wraparound navigation. Positions are gallery slot
/// indices; a slot whose media has not arrived yet has no item and counts as
/// loading.
#[derive(Debug, Clone)]
pub struct Viewer {
    items: Vec<Option<MediaItem>>,
    states: Vec<LoadState>,
    cursor: usize,
}

impl Viewer {
    pub fn new(items: Vec<MediaItem>, start: usize) -> Self {
        Self::from_slots(items.into_iter().map(Some).collect(), start)
    }

    pub fn from_gallery(gallery: &Gallery, start: usize) -> Self {
        Self::from_slots(
            gallery.slots().iter().map(|slot| slot.item().cloned()).collect(),
            start,
        )
    }

    fn from_slots(items: Vec<Option<MediaItem>>, start: usize) -> Self {
        let states = items
            .iter()
            .map(|item| match item {
                Some(item) if item.is_error() => LoadState::Failed,
                _ => LoadState::Loading,
            })
            .collect();
        let cursor = if items.is_empty() {
            0
        } else {
            start.min(items.len() - 1)
        };
        Self {
            items,
            states,
            cursor,
        }
    }

    /// Fills slots that were still in flight when the viewer opened.
    pub fn sync(&mut self, gallery: &Gallery) {
        for (index, slot) in gallery.slots().iter().enumerate() {
            let Some(target) = self.items.get_mut(index) else {
                break;
            };
            if target.is_some() {
                continue;
            }
            if let Some(item) = slot.item() {
                if item.is_error() {
                    if let Some(state) = self.states.get_mut(index) {
                        *state = LoadState::Failed;
                    }
                }
                *target = Some(item.clone());
            }
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn index(&self) -> usize {
        self.cursor
    }

    /// None while the slot's media is still being fetched.
    pub fn current(&self) -> Option<&MediaItem> {
        self.item(self.cursor)
    }

    pub fn item(&self, index: usize) -> Option<&MediaItem> {
        self.items.get(index)?.as_ref()
    }

    pub fn current_state(&self) -> Option<LoadState> {
        self.states.get(self.cursor).copied()
    }

    pub fn state(&self, index: usize) -> Option<LoadState> {
        self.states.get(index).copied()
    }

    pub fn next(&mut self) -> usize {
        if !self.items.is_empty() {
            self.cursor = (self.cursor + 1) % self.items.len();
        }
        self.cursor
    }

    pub fn previous(&mut self) -> usize {
        if !self.items.is_empty() {
            self.cursor = if self.cursor == 0 {
                self.items.len() - 1
            } else {
                self.cursor - 1
            };
        }
        self.cursor
    }

    pub fn mark_loaded(&mut self, index: usize) {
        if let Some(state) = self.states.get_mut(index) {
            *state = LoadState::Loaded;
        }
    }

    pub fn mark_failed(&mut self, index: usize) {
        if let Some(state) = self.states.get_mut(index) {
            *state = LoadState::Failed;
        }
    }
}
