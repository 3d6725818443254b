use std::sync::Arc;

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::{Mutex, RwLock};

use crate::models::{PostId, UserId};

/// Offsets below this always show navigation chrome.
pub const CHROME_TOP_ZONE: f64 = 50.0;
/// Downward travel needed before chrome hides.
pub const CHROME_HIDE_DELTA: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScrollDirection {
    #[default]
    Idle,
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollState {
    pub direction: ScrollDirection,
    pub offset: f64,
    pub chrome_visible: bool,
}

impl Default for ScrollState {
    fn default() -> Self {
        Self {
            direction: ScrollDirection::Idle,
            offset: 0.0,
            chrome_visible: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextPage {
    Rules,
    Privacy,
}

impl TextPage {
    pub fn from_key(key: &str) -> Option<Self> {
        match key.trim() {
            "rules" => Some(TextPage::Rules),
            "privacy" => Some(TextPage::Privacy),
            _ => None,
        }
    }
}

/// The single overlay shown above the feed. Target and visibility live in one
/// value so readers never observe one without the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Overlay {
    #[default]
    None,
    User(UserId),
    FullMedia {
        post_id: PostId,
        index: usize,
    },
    Search,
    Text(TextPage),
}

impl Overlay {
    pub fn is_shown(&self) -> bool {
        !matches!(self, Overlay::None)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Snapshot {
    pub scroll: ScrollState,
    pub overlay: Overlay,
}

type HomeHandler = Box<dyn FnMut() + Send>;

#[derive(Default)]
struct Inner {
    state: RwLock<Snapshot>,
    home: Mutex<Option<HomeHandler>>,
    home_generation: Mutex<u64>,
    subscribers: Mutex<Vec<Sender<Snapshot>>>,
}

/// Session-lifetime UI state shared by navigation chrome and feed views.
/// Cloning yields another handle to the same state.
#[derive(Clone, Default)]
pub struct Context {
    inner: Arc<Inner>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Snapshot {
        *self.inner.state.read()
    }

    pub fn scroll(&self) -> ScrollState {
        self.inner.state.read().scroll
    }

    pub fn overlay(&self) -> Overlay {
        self.inner.state.read().overlay
    }

    pub fn report_scroll(&self, offset: f64) {
        self.update(|snapshot| {
            let previous = snapshot.scroll;
            let delta = offset - previous.offset;
            let direction = if delta > 0.0 {
                ScrollDirection::Down
            } else if delta < 0.0 {
                ScrollDirection::Up
            } else {
                previous.direction
            };
            let chrome_visible = if offset < CHROME_TOP_ZONE {
                true
            } else if delta > CHROME_HIDE_DELTA {
                false
            } else if delta < 0.0 {
                true
            } else {
                previous.chrome_visible
            };
            snapshot.scroll = ScrollState {
                direction,
                offset,
                chrome_visible,
            };
        });
    }

    pub fn set_overlay(&self, overlay: Overlay) {
        self.update(|snapshot| snapshot.overlay = overlay);
    }

    /// `{show, userId}` style toggle for the user preview overlay.
    pub fn set_user_overlay(&self, show: bool, user: Option<UserId>) {
        let overlay = match (show, user) {
            (true, Some(user)) => Overlay::User(user),
            _ => Overlay::None,
        };
        self.set_overlay(overlay);
    }

    /// `{show, text}` style toggle where text is `"rules"`, `"privacy"` or empty.
    pub fn set_text_overlay(&self, show: bool, text: &str) {
        let overlay = match (show, TextPage::from_key(text)) {
            (true, Some(page)) => Overlay::Text(page),
            _ => Overlay::None,
        };
        self.set_overlay(overlay);
    }

    pub fn close_overlay(&self) {
        self.set_overlay(Overlay::None);
    }

    /// Installs the home re-click handler, replacing any previous one.
    pub fn register_home_reclick<F>(&self, handler: F)
    where
        F: FnMut() + Send + 'static,
    {
        *self.inner.home.lock() = Some(Box::new(handler));
        *self.inner.home_generation.lock() += 1;
    }

    pub fn clear_home_reclick(&self) {
        *self.inner.home.lock() = None;
        *self.inner.home_generation.lock() += 1;
    }

    /// Runs the registered handler. Returns false when none is registered.
    pub fn home_reclicked(&self) -> bool {
        let generation = *self.inner.home_generation.lock();
        let Some(mut handler) = self.inner.home.lock().take() else {
            return false;
        };
        handler();
        // The handler may have replaced or cleared itself while running.
        if *self.inner.home_generation.lock() == generation {
            let mut slot = self.inner.home.lock();
            if slot.is_none() {
                *slot = Some(handler);
            }
        }
        true
    }

    pub fn subscribe(&self) -> Receiver<Snapshot> {
        let (tx, rx) = unbounded();
        self.inner.subscribers.lock().push(tx);
        rx
    }

    fn update<F: FnOnce(&mut Snapshot)>(&self, apply: F) {
        let snapshot = {
            let mut state = self.inner.state.write();
            let before = *state;
            apply(&mut *state);
            if *state == before {
                return;
            }
            *state
        };
        self.inner
            .subscribers
            .lock()
            .retain(|subscriber| subscriber.send(snapshot).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn chrome_hides_when_scrolling_down_and_returns_on_up() {
        let ctx = Context::new();
        ctx.report_scroll(30.0);
        assert!(ctx.scroll().chrome_visible);
        ctx.report_scroll(200.0);
        assert_eq!(ctx.scroll().direction, ScrollDirection::Down);
        assert!(!ctx.scroll().chrome_visible);
        ctx.report_scroll(205.0);
        assert!(!ctx.scroll().chrome_visible);
        ctx.report_scroll(190.0);
        assert_eq!(ctx.scroll().direction, ScrollDirection::Up);
        assert!(ctx.scroll().chrome_visible);
    }

    #[test]
    fn chrome_visible_near_top() {
        let ctx = Context::new();
        ctx.report_scroll(45.0);
        assert!(ctx.scroll().chrome_visible);
        assert_eq!(ctx.scroll().direction, ScrollDirection::Down);
    }

    #[test]
    fn overlay_updates_are_atomic_for_subscribers() {
        let ctx = Context::new();
        let rx = ctx.subscribe();
        ctx.set_user_overlay(true, Some(UserId(8)));
        ctx.set_text_overlay(true, "privacy");
        ctx.set_user_overlay(false, Some(UserId(8)));

        let seen: Vec<Overlay> = rx.try_iter().map(|snap| snap.overlay).collect();
        assert_eq!(
            seen,
            vec![
                Overlay::User(UserId(8)),
                Overlay::Text(TextPage::Privacy),
                Overlay::None
            ]
        );
    }

    #[test]
    fn unknown_text_hides_overlay() {
        let ctx = Context::new();
        ctx.set_text_overlay(true, "rules");
        assert!(ctx.overlay().is_shown());
        ctx.set_text_overlay(true, "");
        assert_eq!(ctx.overlay(), Overlay::None);
    }

    #[test]
    fn home_reclick_slot_holds_one_handler() {
        let ctx = Context::new();
        assert!(!ctx.home_reclicked());

        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let f = first.clone();
        ctx.register_home_reclick(move || {
            f.fetch_add(1, Ordering::SeqCst);
        });
        let s = second.clone();
        ctx.register_home_reclick(move || {
            s.fetch_add(1, Ordering::SeqCst);
        });

        assert!(ctx.home_reclicked());
        assert!(ctx.home_reclicked());
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 2);

        ctx.clear_home_reclick();
        assert!(!ctx.home_reclicked());
    }

    #[test]
    fn handler_may_replace_itself() {
        let ctx = Context::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let inner_ctx = ctx.clone();
        let h = hits.clone();
        ctx.register_home_reclick(move || {
            let h2 = h.clone();
            inner_ctx.register_home_reclick(move || {
                h2.fetch_add(10, Ordering::SeqCst);
            });
        });
        ctx.home_reclicked();
        ctx.home_reclicked();
        assert_eq!(hits.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn clones_share_state() {
        let ctx = Context::new();
        let other = ctx.clone();
        other.set_overlay(Overlay::Search);
        assert_eq!(ctx.overlay(), Overlay::Search);
    }
}
