use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::cache::{PostCache, Stamp};
use crate::comments::CommentsView;
use crate::coordination::{self, Overlay};
use crate::data::{describe_error, Services};
use crate::gateway::GatewayError;
use crate::gesture::{Card, Effect, Event};
use crate::media::{self, Gallery, Viewer};
use crate::models::{Comment, CommentId, FeedMode, Post, PostId, UserId};
use crate::queue::PostIdQueue;
use crate::session;

pub const DEFAULT_PAGE_SIZE: usize = 10;

pub struct Options {
    pub services: Services,
    pub session: Arc<session::Manager>,
    pub ui: coordination::Context,
    pub mode: FeedMode,
    pub page_size: usize,
    pub media: media::Config,
}

/// User-facing feedback produced by feed actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Info(String),
    Error(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CommentAction {
    Create,
    Delete,
}

enum AsyncResponse {
    Ids {
        request_id: u64,
        mode: FeedMode,
        result: Result<Vec<PostId>>,
    },
    Summary {
        post_id: PostId,
        stamp: Stamp,
        result: Result<Post>,
    },
    Like {
        post_id: PostId,
        result: Result<()>,
    },
    CommentLike {
        comment_id: CommentId,
        result: Result<()>,
    },
    CommentMutation {
        post_id: PostId,
        action: CommentAction,
        result: Result<()>,
    },
    Follow {
        user_id: UserId,
        follow: bool,
        result: Result<()>,
    },
    Comments {
        request_id: u64,
        post_id: PostId,
        result: Result<Vec<Comment>>,
    },
}

struct PendingIds {
    request_id: u64,
    mode: FeedMode,
}

struct PendingComments {
    request_id: u64,
    post_id: PostId,
}

/// Event-loop side of the client. All state lives here and is only touched
/// from the owning thread; network calls run on background threads and report
/// back through channels drained by [`Feed::poll`].
pub struct Feed {
    services: Services,
    session: Arc<session::Manager>,
    ui: coordination::Context,
    cache: PostCache,
    queue: PostIdQueue,
    page_size: usize,
    media: media::Manager,
    media_tx: Sender<media::ResultEntry>,
    media_rx: Receiver<media::ResultEntry>,
    media_backlog: VecDeque<media::Request>,
    media_in_flight: usize,
    galleries: HashMap<PostId, Gallery>,
    viewer: Option<(PostId, Viewer)>,
    cards: HashMap<PostId, Card>,
    next_generation: u64,
    response_tx: Sender<AsyncResponse>,
    response_rx: Receiver<AsyncResponse>,
    next_request_id: u64,
    pending_ids: Option<PendingIds>,
    pending_comments: Option<PendingComments>,
    comments: Option<CommentsView>,
    likes_in_flight: HashSet<PostId>,
    follows_in_flight: HashSet<UserId>,
    outstanding: usize,
    notices: Vec<Notice>,
}

impl Feed {
    pub fn new(options: Options) -> Result<Self> {
        let media = media::Manager::new(options.services.posts.clone(), options.media)?;
        let (media_tx, media_rx) = unbounded();
        let (response_tx, response_rx) = unbounded();
        let page_size = if options.page_size == 0 {
            DEFAULT_PAGE_SIZE
        } else {
            options.page_size
        };

        Ok(Self {
            services: options.services,
            session: options.session,
            ui: options.ui,
            cache: PostCache::new(),
            queue: PostIdQueue::new(options.mode),
            page_size,
            media,
            media_tx,
            media_rx,
            media_backlog: VecDeque::new(),
            media_in_flight: 0,
            galleries: HashMap::new(),
            viewer: None,
            cards: HashMap::new(),
            next_generation: 1,
            response_tx,
            response_rx,
            next_request_id: 1,
            pending_ids: None,
            pending_comments: None,
            comments: None,
            likes_in_flight: HashSet::new(),
            follows_in_flight: HashSet::new(),
            outstanding: 0,
            notices: Vec::new(),
        })
    }

    pub fn cache(&self) -> &PostCache {
        &self.cache
    }

    pub fn queue(&self) -> &PostIdQueue {
        &self.queue
    }

    pub fn mode(&self) -> FeedMode {
        self.queue.mode()
    }

    pub fn ui(&self) -> &coordination::Context {
        &self.ui
    }

    pub fn post(&self, id: PostId) -> Option<&Post> {
        self.cache.find_by_id(id)
    }

    /// Posts of the current feed in queue order, skipping ids not hydrated yet.
    pub fn visible_posts(&self) -> Vec<&Post> {
        self.queue
            .ids()
            .iter()
            .filter_map(|id| self.cache.find_by_id(*id))
            .collect()
    }

    pub fn gallery(&self, id: PostId) -> Option<&Gallery> {
        self.galleries.get(&id)
    }

    pub fn card(&self, id: PostId) -> Option<&Card> {
        self.cards.get(&id)
    }

    pub fn comments(&self) -> Option<&CommentsView> {
        self.comments.as_ref()
    }

    pub fn is_loading_page(&self) -> bool {
        self.pending_ids.is_some()
    }

    pub fn is_like_in_flight(&self, id: PostId) -> bool {
        self.likes_in_flight.contains(&id)
    }

    pub fn is_idle(&self) -> bool {
        self.outstanding == 0 && self.media_backlog.is_empty()
    }

    /// Media requests waiting for room in the worker pool.
    pub fn media_backlog(&self) -> usize {
        self.media_backlog.len()
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Clears the current feed and requests its first page again.
    pub fn refresh(&mut self) {
        let mode = self.queue.mode();
        self.switch_mode(mode);
    }

    pub fn switch_mode(&mut self, mode: FeedMode) {
        self.queue.reset(mode);
        self.pending_ids = None;
        self.dispatch_ids(0);
    }

    /// Requests the next page unless one is in flight or the feed has ended.
    pub fn load_more(&mut self) -> bool {
        if self.pending_ids.is_some() || self.queue.is_exhausted() {
            return false;
        }
        self.dispatch_ids(self.queue.next_skip())
    }

    fn dispatch_ids(&mut self, skip: usize) -> bool {
        let mode = self.queue.mode();
        let viewer = self.session.user_id();
        if mode == FeedMode::Following && viewer.is_none() {
            self.notices
                .push(Notice::Error("Sign in to see posts from people you follow.".into()));
            return false;
        }

        let request_id = self.next_request_id;
        self.next_request_id = self.next_request_id.wrapping_add(1);
        self.pending_ids = Some(PendingIds { request_id, mode });
        log::debug!("feed: loading {} ids from {skip}", mode.as_str());

        let tx = self.response_tx.clone();
        let service = self.services.feed.clone();
        let limit = self.page_size;
        self.outstanding += 1;
        thread::spawn(move || {
            let result = service.load_ids(mode, skip, limit, viewer);
            let _ = tx.send(AsyncResponse::Ids {
                request_id,
                mode,
                result,
            });
        });
        true
    }

    /// Fetches the summary only when it is neither cached nor already on its way.
    pub fn ensure_post(&mut self, id: PostId) -> bool {
        if self.cache.contains(id) || self.cache.fetch_in_flight(id) {
            return false;
        }
        self.refetch(id);
        true
    }

    pub fn hydrate(&mut self, ids: &[PostId]) -> usize {
        ids.iter().filter(|id| self.ensure_post(**id)).count()
    }

    /// Always fetches a fresh summary; older in-flight fetches for the same
    /// post lose their right to write.
    pub fn refetch(&mut self, id: PostId) {
        let stamp = self.cache.begin_fetch(id);
        let tx = self.response_tx.clone();
        let service = self.services.posts.clone();
        let viewer = self.session.user_id();
        self.outstanding += 1;
        thread::spawn(move || {
            let result = service.summary(id, viewer);
            let _ = tx.send(AsyncResponse::Summary {
                post_id: id,
                stamp,
                result,
            });
        });
    }

    /// Drops a post that no longer exists along with its card state.
    pub fn forget_post(&mut self, id: PostId) {
        self.cache.remove(id);
        self.galleries.remove(&id);
        self.cards.remove(&id);
    }

    pub fn mount_card(&mut self, id: PostId, viewport_width: f64) {
        match self.cards.get_mut(&id) {
            Some(card) => {
                card.handle(Event::Resize {
                    width: viewport_width,
                });
            }
            None => {
                self.cards.insert(id, Card::new(viewport_width));
            }
        }
        self.ensure_post(id);
        if let Some(count) = self.cache.find_by_id(id).map(|post| post.media_count) {
            self.start_gallery(id, count);
        }
    }

    /// Discards the card's gallery; media still in flight for it is ignored.
    pub fn unmount_card(&mut self, id: PostId) {
        self.cards.remove(&id);
        self.galleries.remove(&id);
    }

    fn start_gallery(&mut self, id: PostId, media_count: usize) {
        if media_count == 0 || !self.cards.contains_key(&id) {
            return;
        }
        if let Some(existing) = self.galleries.get(&id) {
            if existing.len() == media_count {
                return;
            }
        }
        let generation = self.next_generation;
        self.next_generation = self.next_generation.wrapping_add(1);
        let gallery = Gallery::new(id, media_count, generation);
        self.media_backlog.extend(gallery.requests());
        self.galleries.insert(id, gallery);
        self.dispatch_media();
    }

    /// Hands backlogged requests to the pool while it has room. Requests of
    /// unmounted or restarted galleries are dropped unsent.
    fn dispatch_media(&mut self) {
        while let Some(request) = self.media_backlog.front().copied() {
            let live = self
                .galleries
                .get(&request.post_id)
                .is_some_and(|gallery| gallery.generation() == request.generation);
            if !live {
                self.media_backlog.pop_front();
                continue;
            }
            if self.media.enqueue(request, self.media_tx.clone()) {
                self.media_backlog.pop_front();
                self.media_in_flight += 1;
                self.outstanding += 1;
                continue;
            }
            if self.media_in_flight > 0 {
                // Retried when the next result frees a queue place.
                break;
            }
            // Refused with nothing running: the pool is gone.
            self.media_backlog.pop_front();
            if let Some(gallery) = self.galleries.get_mut(&request.post_id) {
                gallery.apply(request.index, Err("media pool unavailable".to_string()));
            }
        }
    }

    /// Feeds one input event to a mounted card and carries out the resulting
    /// actions. The returned effects are for the renderer.
    pub fn card_event(&mut self, id: PostId, event: Event) -> Vec<Effect> {
        let Some(card) = self.cards.get_mut(&id) else {
            return Vec::new();
        };
        let effects = card.handle(event);
        for effect in &effects {
            match effect {
                Effect::Like => {
                    self.toggle_like(id);
                    if !self.likes_in_flight.contains(&id) {
                        self.settle_card_like(id);
                    }
                }
                Effect::OpenComments => self.open_comments(id),
                _ => {}
            }
        }
        effects
    }

    /// Advances timers of every mounted card up to `now`.
    pub fn tick_cards(&mut self, now: Duration) -> Vec<(PostId, Vec<Effect>)> {
        let due: Vec<PostId> = self
            .cards
            .iter()
            .filter(|(_, card)| card.next_deadline().is_some_and(|deadline| deadline <= now))
            .map(|(id, _)| *id)
            .collect();
        due.into_iter()
            .map(|id| (id, self.card_event(id, Event::Tick { time: now })))
            .filter(|(_, effects)| !effects.is_empty())
            .collect()
    }

    fn settle_card_like(&mut self, id: PostId) {
        if let Some(card) = self.cards.get_mut(&id) {
            card.handle(Event::LikeSettled);
        }
    }

    /// Returns whether a request was sent.
    pub fn toggle_like(&mut self, id: PostId) -> bool {
        if self.likes_in_flight.contains(&id) {
            return false;
        }
        let creds = match self.session.require() {
            Ok(creds) => creds,
            Err(err) => {
                self.notices
                    .push(Notice::Error(format!("Sign in to like posts ({err}).")));
                return false;
            }
        };
        self.likes_in_flight.insert(id);
        let tx = self.response_tx.clone();
        let service = self.services.interactions.clone();
        self.outstanding += 1;
        thread::spawn(move || {
            let result = service.toggle_like(&creds, id);
            let _ = tx.send(AsyncResponse::Like { post_id: id, result });
        });
        true
    }

    pub fn open_comments(&mut self, id: PostId) {
        self.comments = Some(CommentsView::new(id));
        self.dispatch_comments(id);
    }

    pub fn close_comments(&mut self) {
        self.comments = None;
        self.pending_comments = None;
    }

    pub fn reload_comments(&mut self) -> bool {
        let Some(view) = self.comments.as_mut() else {
            return false;
        };
        view.begin_reload();
        let id = view.post_id();
        self.dispatch_comments(id);
        true
    }

    fn dispatch_comments(&mut self, id: PostId) {
        let request_id = self.next_request_id;
        self.next_request_id = self.next_request_id.wrapping_add(1);
        self.pending_comments = Some(PendingComments {
            request_id,
            post_id: id,
        });
        let tx = self.response_tx.clone();
        let service = self.services.comments.clone();
        let viewer = self.session.user_id();
        self.outstanding += 1;
        thread::spawn(move || {
            let result = service.load_comments(id, viewer);
            let _ = tx.send(AsyncResponse::Comments {
                request_id,
                post_id: id,
                result,
            });
        });
    }

    /// Optimistic only: the local like flips at once and the server call is
    /// not awaited for confirmation.
    pub fn like_comment(&mut self, comment_id: CommentId) -> bool {
        let creds = match self.session.require() {
            Ok(creds) => creds,
            Err(err) => {
                self.notices
                    .push(Notice::Error(format!("Sign in to like comments ({err}).")));
                return false;
            }
        };
        let Some(view) = self.comments.as_mut() else {
            return false;
        };
        if view.toggle_like(comment_id, creds.user_id).is_none() {
            return false;
        }
        let tx = self.response_tx.clone();
        let service = self.services.interactions.clone();
        self.outstanding += 1;
        thread::spawn(move || {
            let result = service.like_comment(&creds, comment_id);
            let _ = tx.send(AsyncResponse::CommentLike { comment_id, result });
        });
        true
    }

    pub fn create_comment(&mut self, text: &str) -> bool {
        let text = text.trim().to_string();
        if text.is_empty() {
            self.notices
                .push(Notice::Error("Comment cannot be empty.".into()));
            return false;
        }
        let Some(post_id) = self.comments.as_ref().map(CommentsView::post_id) else {
            return false;
        };
        let creds = match self.session.require() {
            Ok(creds) => creds,
            Err(err) => {
                self.notices
                    .push(Notice::Error(format!("Sign in to comment ({err}).")));
                return false;
            }
        };
        let tx = self.response_tx.clone();
        let service = self.services.interactions.clone();
        self.outstanding += 1;
        thread::spawn(move || {
            let result = service.create_comment(&creds, post_id, &text);
            let _ = tx.send(AsyncResponse::CommentMutation {
                post_id,
                action: CommentAction::Create,
                result,
            });
        });
        true
    }

    pub fn delete_comment(&mut self, comment_id: CommentId) -> bool {
        let Some(post_id) = self.comments.as_ref().map(CommentsView::post_id) else {
            return false;
        };
        let creds = match self.session.require() {
            Ok(creds) => creds,
            Err(err) => {
                self.notices
                    .push(Notice::Error(format!("Sign in to delete comments ({err}).")));
                return false;
            }
        };
        let tx = self.response_tx.clone();
        let service = self.services.interactions.clone();
        self.outstanding += 1;
        thread::spawn(move || {
            let result = service.delete_comment(&creds, comment_id);
            let _ = tx.send(AsyncResponse::CommentMutation {
                post_id,
                action: CommentAction::Delete,
                result,
            });
        });
        true
    }

    pub fn follow(&mut self, user: UserId) -> bool {
        self.set_following(user, true)
    }

    pub fn unfollow(&mut self, user: UserId) -> bool {
        self.set_following(user, false)
    }

    fn set_following(&mut self, user: UserId, follow: bool) -> bool {
        if self.follows_in_flight.contains(&user) {
            return false;
        }
        let creds = match self.session.require() {
            Ok(creds) => creds,
            Err(err) => {
                self.notices
                    .push(Notice::Error(format!("Sign in to follow people ({err}).")));
                return false;
            }
        };
        self.follows_in_flight.insert(user);
        let tx = self.response_tx.clone();
        let service = self.services.interactions.clone();
        self.outstanding += 1;
        thread::spawn(move || {
            let result = if follow {
                service.follow(&creds, user)
            } else {
                service.unfollow(&creds, user)
            };
            let _ = tx.send(AsyncResponse::Follow {
                user_id: user,
                follow,
                result,
            });
        });
        true
    }

    pub fn open_user(&mut self, user: UserId) {
        self.ui.set_user_overlay(true, Some(user));
    }

    /// Opens the full-screen viewer at gallery slot `index`. Slots still in
    /// flight show as loading and fill in as their media arrives.
    pub fn open_viewer(&mut self, id: PostId, index: usize) -> Option<&Viewer> {
        let gallery = self.galleries.get(&id)?;
        if gallery.is_empty() {
            return None;
        }
        let viewer = Viewer::from_gallery(gallery, index);
        self.ui.set_overlay(Overlay::FullMedia {
            post_id: id,
            index: viewer.index(),
        });
        self.viewer = Some((id, viewer));
        self.viewer.as_ref().map(|(_, viewer)| viewer)
    }

    pub fn viewer(&self) -> Option<&Viewer> {
        self.viewer.as_ref().map(|(_, viewer)| viewer)
    }

    /// For reporting per-item load results from the renderer.
    pub fn viewer_mut(&mut self) -> Option<&mut Viewer> {
        self.viewer.as_mut().map(|(_, viewer)| viewer)
    }

    pub fn viewer_next(&mut self) -> Option<usize> {
        self.step_viewer(true)
    }

    pub fn viewer_previous(&mut self) -> Option<usize> {
        self.step_viewer(false)
    }

    fn step_viewer(&mut self, forward: bool) -> Option<usize> {
        let (post_id, viewer) = self.viewer.as_mut()?;
        let index = if forward {
            viewer.next()
        } else {
            viewer.previous()
        };
        self.ui.set_overlay(Overlay::FullMedia {
            post_id: *post_id,
            index,
        });
        Some(index)
    }

    pub fn close_overlay(&mut self) {
        self.viewer = None;
        self.ui.close_overlay();
    }

    /// Applies every response that has already arrived.
    pub fn poll(&mut self) -> bool {
        let mut changed = false;
        while let Ok(message) = self.response_rx.try_recv() {
            self.outstanding = self.outstanding.saturating_sub(1);
            self.handle_async_response(message);
            changed = true;
        }
        while let Ok(entry) = self.media_rx.try_recv() {
            self.handle_media(entry);
            changed = true;
        }
        changed
    }

    /// Blocks up to `timeout` for the next response, then drains the rest.
    pub fn pump(&mut self, timeout: Duration) -> bool {
        let responses = self.response_rx.clone();
        let media = self.media_rx.clone();
        crossbeam_channel::select! {
            recv(responses) -> msg => {
                if let Ok(message) = msg {
                    self.outstanding = self.outstanding.saturating_sub(1);
                    self.handle_async_response(message);
                }
            }
            recv(media) -> msg => {
                if let Ok(entry) = msg {
                    self.handle_media(entry);
                }
            }
            default(timeout) => return self.poll(),
        }
        self.poll();
        true
    }

    /// Runs the loop until nothing is outstanding. Returns false on timeout.
    pub fn settle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while !self.is_idle() {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            self.pump(deadline - now);
        }
        true
    }

    fn handle_async_response(&mut self, message: AsyncResponse) {
        match message {
            AsyncResponse::Ids {
                request_id,
                mode,
                result,
            } => {
                let Some(pending) = &self.pending_ids else {
                    return;
                };
                if pending.request_id != request_id
                    || pending.mode != mode
                    || self.queue.mode() != mode
                {
                    log::debug!("feed: dropping stale {} id page", mode.as_str());
                    return;
                }
                self.pending_ids = None;
                match result {
                    Ok(ids) => {
                        let received = ids.len();
                        let added = self.queue.append_page(&ids);
                        if received < self.page_size {
                            self.queue.mark_exhausted();
                        }
                        log::debug!(
                            "feed: {} ids received, {} new",
                            received,
                            added.len()
                        );
                    }
                    Err(err) => self.note_failure("load feed", &err),
                }
            }
            AsyncResponse::Summary {
                post_id,
                stamp,
                result,
            } => match result {
                Ok(post) => {
                    if post.id != post_id {
                        log::warn!("feed: summary for {post_id} returned post {}", post.id);
                        self.cache.abandon_fetch(post_id, stamp);
                        return;
                    }
                    let media_count = post.media_count;
                    if self.cache.apply_fetch(stamp, post) {
                        self.start_gallery(post_id, media_count);
                    } else {
                        log::debug!("feed: dropping stale summary of post {post_id}");
                    }
                }
                Err(err) => {
                    if self.cache.abandon_fetch(post_id, stamp) {
                        self.note_failure("load post", &err);
                    }
                }
            },
            AsyncResponse::Like { post_id, result } => {
                self.likes_in_flight.remove(&post_id);
                self.settle_card_like(post_id);
                match result {
                    Ok(()) => self.refetch(post_id),
                    Err(err) => self.note_failure("like post", &err),
                }
            }
            AsyncResponse::CommentLike { comment_id, result } => {
                if let Err(err) = result {
                    log::warn!("feed: like on comment {comment_id} failed: {err:#}");
                }
            }
            AsyncResponse::CommentMutation {
                post_id,
                action,
                result,
            } => match result {
                Ok(()) => {
                    self.refetch(post_id);
                    if self.comments.as_ref().map(CommentsView::post_id) == Some(post_id) {
                        self.reload_comments();
                    }
                    let message = match action {
                        CommentAction::Create => "Comment posted.",
                        CommentAction::Delete => "Comment deleted.",
                    };
                    self.notices.push(Notice::Info(message.into()));
                }
                Err(err) => {
                    let what = match action {
                        CommentAction::Create => "post comment",
                        CommentAction::Delete => "delete comment",
                    };
                    self.note_failure(what, &err);
                }
            },
            AsyncResponse::Follow {
                user_id,
                follow,
                result,
            } => {
                self.follows_in_flight.remove(&user_id);
                match result {
                    Ok(()) => {
                        let message = if follow {
                            format!("Following user {user_id}.")
                        } else {
                            format!("Unfollowed user {user_id}.")
                        };
                        self.notices.push(Notice::Info(message));
                    }
                    Err(err) => {
                        let what = if follow { "follow" } else { "unfollow" };
                        self.note_failure(what, &err);
                    }
                }
            }
            AsyncResponse::Comments {
                request_id,
                post_id,
                result,
            } => {
                let Some(pending) = &self.pending_comments else {
                    return;
                };
                if pending.request_id != request_id || pending.post_id != post_id {
                    return;
                }
                self.pending_comments = None;
                let Some(view) = self.comments.as_mut() else {
                    return;
                };
                if view.post_id() != post_id {
                    return;
                }
                match result {
                    Ok(comments) => view.replace(comments),
                    Err(err) => view.fail(describe_error(&err)),
                }
            }
        }
    }

    fn handle_media(&mut self, entry: media::ResultEntry) {
        self.outstanding = self.outstanding.saturating_sub(1);
        self.media_in_flight = self.media_in_flight.saturating_sub(1);
        self.apply_media(entry);
        self.dispatch_media();
    }

    fn apply_media(&mut self, entry: media::ResultEntry) {
        let media::ResultEntry { request, result } = entry;
        let Some(gallery) = self.galleries.get_mut(&request.post_id) else {
            log::debug!("feed: media for unmounted post {} ignored", request.post_id);
            return;
        };
        if gallery.generation() != request.generation {
            return;
        }
        if !gallery.apply(request.index, result) {
            return;
        }
        if let Some((post_id, viewer)) = self.viewer.as_mut() {
            if *post_id == request.post_id {
                viewer.sync(gallery);
            }
        }
    }

    fn note_failure(&mut self, what: &str, err: &anyhow::Error) {
        log::warn!("feed: {what} failed: {err:#}");
        if let Some(GatewayError::Status { status: 401, .. }) = err.downcast_ref::<GatewayError>()
        {
            self.session.invalidate("server rejected the session");
        }
        self.notices.push(Notice::Error(format!(
            "Could not {what}: {}",
            describe_error(err)
        )));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{sample_post, MockBackend};
    use crate::session::Credentials;

    const WAIT: Duration = Duration::from_secs(5);

    fn feed_with(backend: Arc<MockBackend>, signed_in: bool) -> Feed {
        let session = if signed_in {
            session::Manager::with_credentials(Credentials {
                user_id: UserId(1),
                token: "token".into(),
            })
        } else {
            session::Manager::new()
        };
        Feed::new(Options {
            services: Services::from_mock(backend),
            session: Arc::new(session),
            ui: coordination::Context::new(),
            mode: FeedMode::Latest,
            page_size: 3,
            media: media::Config::default(),
        })
        .unwrap()
    }

    #[test]
    fn pages_append_without_duplicates() {
        let backend = Arc::new(MockBackend::new().with_feed(
            FeedMode::Latest,
            [1, 2, 3, 3, 4].into_iter().map(PostId).collect(),
        ));
        let mut feed = feed_with(backend, false);
        feed.refresh();
        assert!(feed.settle(WAIT));
        assert_eq!(feed.queue().len(), 3);
        assert!(feed.load_more());
        assert!(feed.settle(WAIT));
        let ids: Vec<i64> = feed.queue().ids().iter().map(|id| id.0).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
        assert!(feed.queue().is_exhausted());
        assert!(!feed.load_more());
    }

    #[test]
    fn ensure_post_fetches_once() {
        let backend = Arc::new(MockBackend::new().with_post(sample_post(1, 0)));
        let mut feed = feed_with(backend.clone(), false);
        assert!(feed.ensure_post(PostId(1)));
        assert!(!feed.ensure_post(PostId(1)));
        assert!(feed.settle(WAIT));
        assert!(!feed.ensure_post(PostId(1)));
        assert_eq!(backend.summary_calls(PostId(1)), 1);
        assert!(feed.post(PostId(1)).is_some());
    }

    #[test]
    fn failed_fetch_leaves_cache_and_allows_retry() {
        let backend = Arc::new(MockBackend::new());
        let mut feed = feed_with(backend.clone(), false);
        feed.ensure_post(PostId(5));
        assert!(feed.settle(WAIT));
        assert!(feed.post(PostId(5)).is_none());
        assert!(matches!(feed.take_notices().as_slice(), [Notice::Error(_)]));

        backend.set_post(sample_post(5, 0));
        assert!(feed.ensure_post(PostId(5)));
        assert!(feed.settle(WAIT));
        assert!(feed.post(PostId(5)).is_some());
    }

    #[test]
    fn like_requires_session() {
        let backend = Arc::new(MockBackend::new().with_post(sample_post(1, 0)));
        let mut feed = feed_with(backend.clone(), false);
        assert!(!feed.toggle_like(PostId(1)));
        assert_eq!(backend.like_calls(PostId(1)), 0);
        assert_eq!(feed.take_notices().len(), 1);
    }

    #[test]
    fn like_refetches_summary_and_guards_reentry() {
        let backend = Arc::new(MockBackend::new().with_post(sample_post(1, 0)));
        let mut feed = feed_with(backend.clone(), true);
        feed.ensure_post(PostId(1));
        assert!(feed.settle(WAIT));

        assert!(feed.toggle_like(PostId(1)));
        assert!(!feed.toggle_like(PostId(1)));
        assert!(feed.settle(WAIT));

        let post = feed.post(PostId(1)).unwrap();
        assert!(post.is_liked);
        assert_eq!(post.likes_count, 1);
        assert_eq!(backend.like_calls(PostId(1)), 1);
        assert!(!feed.is_like_in_flight(PostId(1)));
    }

    #[test]
    fn failed_like_keeps_cached_post() {
        let backend = Arc::new(MockBackend::new().with_post(sample_post(1, 0)));
        let mut feed = feed_with(backend.clone(), true);
        feed.ensure_post(PostId(1));
        assert!(feed.settle(WAIT));
        let before = feed.post(PostId(1)).cloned();

        backend.fail_mutations(true);
        feed.toggle_like(PostId(1));
        assert!(feed.settle(WAIT));
        assert_eq!(feed.post(PostId(1)).cloned(), before);
        assert!(matches!(feed.take_notices().as_slice(), [Notice::Error(_)]));
    }

    #[test]
    fn unmounted_card_ignores_media() {
        let backend = Arc::new(
            MockBackend::new()
                .with_post(sample_post(2, 1))
                .with_media(PostId(2), 0, "a.jpg"),
        );
        let mut feed = feed_with(backend, false);
        feed.ensure_post(PostId(2));
        assert!(feed.settle(WAIT));
        feed.mount_card(PostId(2), 400.0);
        feed.unmount_card(PostId(2));
        assert!(feed.settle(WAIT));
        assert!(feed.gallery(PostId(2)).is_none());
    }

    #[test]
    fn following_feed_needs_session() {
        let backend = Arc::new(MockBackend::new());
        let mut feed = feed_with(backend, false);
        feed.switch_mode(FeedMode::Following);
        assert!(!feed.is_loading_page());
        assert_eq!(feed.take_notices().len(), 1);
    }
}
