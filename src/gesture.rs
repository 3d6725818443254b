//! Post card interaction state machine.
//!
//! A card turns raw pointer and touch input into one of four outcomes: nothing,
//! a single tap, a double-tap like, or a leftward swipe that opens comments.
//! Vertical-dominant movement is left to the scroll container. Every step is a
//! pure function of the previous state and one [`Event`], so thresholds can be
//! exercised without a real input device. Timestamps are monotonic offsets
//! supplied by the host, and timers are driven by [`Event::Tick`].

use std::time::Duration;

pub const TOUCH_DEAD_ZONE: f64 = 10.0;
pub const POINTER_DEAD_ZONE: f64 = 5.0;
pub const COMMIT_DISTANCE: f64 = 100.0;
pub const HORIZONTAL_DOMINANCE: f64 = 2.0;
pub const COMMIT_MAX_DURATION: Duration = Duration::from_millis(400);
pub const COMMIT_WIDTH_FRACTION: f64 = 0.3;
pub const MAX_OFFSET_FRACTION: f64 = 0.7;
pub const SETTLE_DURATION: Duration = Duration::from_millis(300);
pub const DOUBLE_TAP_WINDOW: Duration = Duration::from_millis(300);
/// Mouse events this close to a touch event are the browser's emulation.
pub const SYNTHETIC_MOUSE_WINDOW: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Touch,
    Mouse,
}

impl Source {
    pub fn dead_zone(self) -> f64 {
        match self {
            Source::Touch => TOUCH_DEAD_ZONE,
            Source::Mouse => POINTER_DEAD_ZONE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Event {
    Down {
        source: Source,
        at: Point,
        time: Duration,
    },
    Move {
        source: Source,
        at: Point,
        time: Duration,
    },
    Up {
        source: Source,
        at: Point,
        time: Duration,
    },
    /// Clock advance; fires expired tap and animation timers.
    Tick { time: Duration },
    /// The like request started by a double tap has completed.
    LikeSettled,
    /// Pointer cancelled or card unmounted.
    Cancel,
    Resize { width: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Effect {
    /// Move the card to `px` (negative is left), animated over the duration.
    Offset {
        px: f64,
        animate: Option<Duration>,
    },
    /// Suppress the platform default (scrolling) for the current move.
    PreventDefault,
    OpenComments,
    Like,
    SingleTap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Phase {
    Idle,
    Down {
        source: Source,
        origin: Point,
        started: Duration,
        travelled: bool,
    },
    Swiping {
        source: Source,
        origin: Point,
        started: Duration,
        direction: Direction,
    },
    Committing {
        until: Duration,
    },
    SnappingBack {
        until: Duration,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CardState {
    phase: Phase,
    offset: f64,
    viewport_width: f64,
    taps: u8,
    tap_deadline: Option<Duration>,
    like_in_flight: bool,
    last_touch: Option<Duration>,
}

impl CardState {
    pub fn new(viewport_width: f64) -> Self {
        Self {
            phase: Phase::Idle,
            offset: 0.0,
            viewport_width: viewport_width.max(0.0),
            taps: 0,
            tap_deadline: None,
            like_in_flight: false,
            last_touch: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Target visual offset in pixels.
    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn viewport_width(&self) -> f64 {
        self.viewport_width
    }

    pub fn swipe_active(&self) -> bool {
        matches!(self.phase, Phase::Swiping { .. })
    }

    pub fn like_in_flight(&self) -> bool {
        self.like_in_flight
    }

    pub fn pending_taps(&self) -> u8 {
        self.taps
    }

    /// Earliest time at which a [`Event::Tick`] would change the state.
    pub fn next_deadline(&self) -> Option<Duration> {
        let animation = match self.phase {
            Phase::Committing { until } | Phase::SnappingBack { until } => Some(until),
            _ => None,
        };
        match (animation, self.tap_deadline) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    fn synthetic_mouse(&mut self, source: Source, time: Duration) -> bool {
        match source {
            Source::Touch => {
                self.last_touch = Some(time);
                false
            }
            Source::Mouse => self
                .last_touch
                .is_some_and(|touch| time.saturating_sub(touch) < SYNTHETIC_MOUSE_WINDOW),
        }
    }

    fn expire_taps(&mut self, now: Duration, effects: &mut Vec<Effect>) {
        let Some(deadline) = self.tap_deadline else {
            return;
        };
        if now < deadline {
            return;
        }
        if self.taps == 1 {
            effects.push(Effect::SingleTap);
        }
        self.taps = 0;
        self.tap_deadline = None;
    }

    fn on_down(&mut self, source: Source, at: Point, time: Duration, effects: &mut Vec<Effect>) {
        if self.synthetic_mouse(source, time) {
            return;
        }
        self.expire_taps(time, effects);
        if matches!(self.phase, Phase::Committing { .. }) {
            return;
        }
        self.phase = Phase::Down {
            source,
            origin: at,
            started: time,
            travelled: false,
        };
    }

    fn on_move(&mut self, source: Source, at: Point, time: Duration, effects: &mut Vec<Effect>) {
        if self.synthetic_mouse(source, time) {
            return;
        }
        let (active, origin, started, swiping) = match self.phase {
            Phase::Down {
                source, origin, started, ..
            } => (source, origin, started, false),
            Phase::Swiping {
                source, origin, started, ..
            } => (source, origin, started, true),
            _ => return,
        };
        if active != source {
            return;
        }

        let dx = at.x - origin.x;
        let dy = at.y - origin.y;

        // Travel past the dead zone in any direction other than a left swipe
        // rules out a tap on release.
        if dy.abs() > dx.abs() || dx > 0.0 {
            if let Phase::Down { travelled, .. } = &mut self.phase {
                if dx.abs().max(dy.abs()) > source.dead_zone() {
                    *travelled = true;
                }
            }
        }

        if dy.abs() > dx.abs() {
            return;
        }

        if dx > 0.0 {
            if self.offset != 0.0 {
                self.offset = 0.0;
                effects.push(Effect::Offset {
                    px: 0.0,
                    animate: None,
                });
            }
            return;
        }

        if !swiping && dx.abs() <= source.dead_zone() {
            return;
        }

        self.phase = Phase::Swiping {
            source,
            origin,
            started,
            direction: Direction::Left,
        };
        self.offset = swipe_offset(dx, self.viewport_width);
        effects.push(Effect::PreventDefault);
        effects.push(Effect::Offset {
            px: self.offset,
            animate: None,
        });
    }

    fn on_up(&mut self, source: Source, at: Point, time: Duration, effects: &mut Vec<Effect>) {
        if self.synthetic_mouse(source, time) {
            return;
        }
        match self.phase {
            Phase::Down {
                source: active,
                travelled,
                ..
            } if active == source => {
                self.phase = Phase::Idle;
                if !travelled {
                    self.register_tap(time, effects);
                }
            }
            Phase::Swiping {
                source: active,
                origin,
                started,
                ..
            } if active == source => {
                self.release_swipe(at, time, origin, started, effects);
            }
            _ => {}
        }
    }

    fn release_swipe(
        &mut self,
        at: Point,
        time: Duration,
        origin: Point,
        started: Duration,
        effects: &mut Vec<Effect>,
    ) {
        let dx = at.x - origin.x;
        let dy = at.y - origin.y;
        let elapsed = time.saturating_sub(started);
        let width = self.viewport_width;

        let quick_flick = dx < -COMMIT_DISTANCE
            && dx.abs() > HORIZONTAL_DOMINANCE * dy.abs()
            && elapsed < COMMIT_MAX_DURATION;
        let dragged_far = self.offset.abs() > COMMIT_WIDTH_FRACTION * width;

        if quick_flick || dragged_far {
            self.offset = -MAX_OFFSET_FRACTION * width;
            effects.push(Effect::Offset {
                px: self.offset,
                animate: Some(SETTLE_DURATION),
            });
            effects.push(Effect::OpenComments);
            self.phase = Phase::Committing {
                until: time + SETTLE_DURATION,
            };
            return;
        }

        let span = MAX_OFFSET_FRACTION * width;
        let progress = if span > 0.0 {
            (self.offset.abs() / span).min(1.0)
        } else {
            0.0
        };
        let duration = SETTLE_DURATION.mul_f64(progress);
        self.offset = 0.0;
        effects.push(Effect::Offset {
            px: 0.0,
            animate: (!duration.is_zero()).then_some(duration),
        });
        self.phase = if duration.is_zero() {
            Phase::Idle
        } else {
            Phase::SnappingBack {
                until: time + duration,
            }
        };
    }

    fn register_tap(&mut self, time: Duration, effects: &mut Vec<Effect>) {
        self.expire_taps(time, effects);
        self.taps += 1;
        if self.taps == 1 {
            self.tap_deadline = Some(time + DOUBLE_TAP_WINDOW);
            return;
        }
        self.taps = 0;
        self.tap_deadline = None;
        if self.like_in_flight {
            log::debug!("gesture: double tap ignored, like already in flight");
            return;
        }
        self.like_in_flight = true;
        effects.push(Effect::Like);
    }

    fn on_tick(&mut self, time: Duration, effects: &mut Vec<Effect>) {
        self.expire_taps(time, effects);
        match self.phase {
            Phase::Committing { until } if time >= until => {
                self.offset = 0.0;
                effects.push(Effect::Offset {
                    px: 0.0,
                    animate: None,
                });
                self.phase = Phase::Idle;
            }
            Phase::SnappingBack { until } if time >= until => {
                self.phase = Phase::Idle;
            }
            _ => {}
        }
    }

    fn on_cancel(&mut self, effects: &mut Vec<Effect>) {
        self.phase = Phase::Idle;
        self.taps = 0;
        self.tap_deadline = None;
        if self.offset != 0.0 {
            self.offset = 0.0;
            effects.push(Effect::Offset {
                px: 0.0,
                animate: None,
            });
        }
    }
}

/// Eased drag offset: diminishing returns, capped at 70% of the viewport.
pub fn swipe_offset(dx: f64, viewport_width: f64) -> f64 {
    if viewport_width <= 0.0 || dx >= 0.0 {
        return 0.0;
    }
    let progress = (dx.abs() / viewport_width).min(1.0);
    let eased = 1.0 - (1.0 - progress).powi(2);
    -eased * viewport_width * MAX_OFFSET_FRACTION
}

pub fn transition(mut state: CardState, event: Event) -> (CardState, Vec<Effect>) {
    let mut effects = Vec::new();
    match event {
        Event::Down { source, at, time } => state.on_down(source, at, time, &mut effects),
        Event::Move { source, at, time } => state.on_move(source, at, time, &mut effects),
        Event::Up { source, at, time } => state.on_up(source, at, time, &mut effects),
        Event::Tick { time } => state.on_tick(time, &mut effects),
        Event::LikeSettled => state.like_in_flight = false,
        Event::Cancel => state.on_cancel(&mut effects),
        Event::Resize { width } => state.viewport_width = width.max(0.0),
    }
    (state, effects)
}

/// Stateful wrapper holding one card's [`CardState`].
#[derive(Debug, Clone)]
pub struct Card {
    state: CardState,
}

impl Card {
    pub fn new(viewport_width: f64) -> Self {
        Self {
            state: CardState::new(viewport_width),
        }
    }

    pub fn handle(&mut self, event: Event) -> Vec<Effect> {
        let (next, effects) = transition(self.state, event);
        self.state = next;
        effects
    }

    pub fn state(&self) -> &CardState {
        &self.state
    }

    pub fn offset(&self) -> f64 {
        self.state.offset()
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.state.next_deadline()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WIDTH: f64 = 400.0;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn down(source: Source, x: f64, y: f64, t: u64) -> Event {
        Event::Down {
            source,
            at: Point::new(x, y),
            time: ms(t),
        }
    }

    fn mv(source: Source, x: f64, y: f64, t: u64) -> Event {
        Event::Move {
            source,
            at: Point::new(x, y),
            time: ms(t),
        }
    }

    fn up(source: Source, x: f64, y: f64, t: u64) -> Event {
        Event::Up {
            source,
            at: Point::new(x, y),
            time: ms(t),
        }
    }

    /// Drives a straight drag from the origin to `(dx, dy)` in ten steps.
    fn drag(card: &mut Card, source: Source, dx: f64, dy: f64, duration: u64) -> Vec<Effect> {
        let (x0, y0) = (300.0, 300.0);
        let mut effects = card.handle(down(source, x0, y0, 0));
        for step in 1..=10u64 {
            let f = step as f64 / 10.0;
            effects.extend(card.handle(mv(
                source,
                x0 + dx * f,
                y0 + dy * f,
                duration * step / 10,
            )));
        }
        effects.extend(card.handle(up(source, x0 + dx, y0 + dy, duration)));
        effects
    }

    fn count(effects: &[Effect], wanted: Effect) -> usize {
        effects.iter().filter(|effect| **effect == wanted).count()
    }

    fn tap(card: &mut Card, t: u64) -> Vec<Effect> {
        let mut effects = card.handle(down(Source::Touch, 50.0, 50.0, t));
        effects.extend(card.handle(up(Source::Touch, 50.0, 50.0, t + 40)));
        effects
    }

    #[test]
    fn vertical_drag_never_swipes() {
        let mut card = Card::new(WIDTH);
        card.handle(down(Source::Touch, 300.0, 300.0, 0));
        for step in 1..=10u64 {
            let f = step as f64 / 10.0;
            let effects = card.handle(mv(Source::Touch, 300.0 - 150.0 * f, 300.0 - 200.0 * f, step * 20));
            assert!(effects.is_empty());
            assert!(!card.state().swipe_active());
        }
        let effects = card.handle(up(Source::Touch, 150.0, 100.0, 200));
        assert_eq!(count(&effects, Effect::OpenComments), 0);
        assert_eq!(card.offset(), 0.0);
    }

    #[test]
    fn quick_left_flick_opens_comments_once() {
        let mut card = Card::new(WIDTH);
        let effects = drag(&mut card, Source::Touch, -120.0, -10.0, 300);
        assert_eq!(count(&effects, Effect::OpenComments), 1);
        assert!(effects.contains(&Effect::Offset {
            px: -MAX_OFFSET_FRACTION * WIDTH,
            animate: Some(SETTLE_DURATION),
        }));
        assert!(matches!(card.state().phase(), Phase::Committing { .. }));

        let settle = card.handle(Event::Tick { time: ms(600) });
        assert_eq!(
            settle,
            vec![Effect::Offset {
                px: 0.0,
                animate: None
            }]
        );
        assert_eq!(card.state().phase(), Phase::Idle);
        assert!(card.handle(Event::Tick { time: ms(900) }).is_empty());
    }

    #[test]
    fn short_swipe_snaps_back_proportionally() {
        let mut card = Card::new(WIDTH);
        let effects = drag(&mut card, Source::Touch, -80.0, -10.0, 300);
        assert_eq!(count(&effects, Effect::OpenComments), 0);

        let offset = swipe_offset(-80.0, WIDTH);
        assert!(offset.abs() < COMMIT_WIDTH_FRACTION * WIDTH);
        let expected = SETTLE_DURATION.mul_f64(offset.abs() / (MAX_OFFSET_FRACTION * WIDTH));
        assert_eq!(
            effects.last(),
            Some(&Effect::Offset {
                px: 0.0,
                animate: Some(expected),
            })
        );
        assert_eq!(card.offset(), 0.0);
        assert!(matches!(card.state().phase(), Phase::SnappingBack { .. }));
        card.handle(Event::Tick { time: ms(300) + expected });
        assert_eq!(card.state().phase(), Phase::Idle);
    }

    #[test]
    fn slow_long_drag_commits_on_offset() {
        let mut card = Card::new(WIDTH);
        let effects = drag(&mut card, Source::Mouse, -200.0, 0.0, 900);
        assert_eq!(count(&effects, Effect::OpenComments), 1);
    }

    #[test]
    fn slow_medium_drag_does_not_commit() {
        let mut card = Card::new(WIDTH);
        let effects = drag(&mut card, Source::Touch, -90.0, 0.0, 900);
        assert_eq!(count(&effects, Effect::OpenComments), 0);
    }

    #[test]
    fn flick_with_too_much_vertical_travel_needs_offset() {
        // |dx| = 110 is not more than twice |dy| = 60.
        let mut card = Card::new(WIDTH);
        let effects = drag(&mut card, Source::Touch, -110.0, -60.0, 200);
        assert!(swipe_offset(-110.0, WIDTH).abs() > COMMIT_WIDTH_FRACTION * WIDTH);
        assert_eq!(count(&effects, Effect::OpenComments), 1);

        let mut wide = Card::new(1000.0);
        let effects = drag(&mut wide, Source::Touch, -110.0, -60.0, 200);
        assert_eq!(count(&effects, Effect::OpenComments), 0);
    }

    #[test]
    fn dead_zones_differ_by_source() {
        let mut card = Card::new(WIDTH);
        card.handle(down(Source::Touch, 300.0, 300.0, 0));
        assert!(card.handle(mv(Source::Touch, 292.0, 300.0, 10)).is_empty());
        assert!(!card.state().swipe_active());
        let effects = card.handle(mv(Source::Touch, 289.0, 300.0, 20));
        assert!(effects.contains(&Effect::PreventDefault));
        assert!(card.state().swipe_active());

        let mut mouse = Card::new(WIDTH);
        mouse.handle(down(Source::Mouse, 300.0, 300.0, 0));
        mouse.handle(mv(Source::Mouse, 294.0, 300.0, 10));
        assert!(mouse.state().swipe_active());
    }

    #[test]
    fn rightward_drag_is_clamped() {
        let mut card = Card::new(WIDTH);
        card.handle(down(Source::Touch, 300.0, 300.0, 0));
        card.handle(mv(Source::Touch, 250.0, 300.0, 10));
        assert!(card.offset() < 0.0);
        let effects = card.handle(mv(Source::Touch, 400.0, 300.0, 20));
        assert_eq!(
            effects,
            vec![Effect::Offset {
                px: 0.0,
                animate: None
            }]
        );
        assert_eq!(card.offset(), 0.0);
        let effects = card.handle(up(Source::Touch, 400.0, 300.0, 30));
        assert_eq!(count(&effects, Effect::OpenComments), 0);
    }

    #[test]
    fn offset_is_eased_and_capped() {
        assert_eq!(swipe_offset(10.0, WIDTH), 0.0);
        let half = swipe_offset(-200.0, WIDTH);
        assert!((half + 0.75 * WIDTH * MAX_OFFSET_FRACTION).abs() < 1e-9);
        assert_eq!(swipe_offset(-4000.0, WIDTH), -MAX_OFFSET_FRACTION * WIDTH);
        assert_eq!(swipe_offset(-50.0, 0.0), 0.0);
    }

    #[test]
    fn vertical_then_horizontal_still_engages() {
        let mut card = Card::new(WIDTH);
        card.handle(down(Source::Touch, 300.0, 300.0, 0));
        card.handle(mv(Source::Touch, 298.0, 330.0, 20));
        assert!(!card.state().swipe_active());
        card.handle(mv(Source::Touch, 200.0, 320.0, 60));
        assert!(card.state().swipe_active());
    }

    #[test]
    fn rightward_release_is_not_a_tap() {
        let mut card = Card::new(WIDTH);
        card.handle(down(Source::Touch, 100.0, 300.0, 0));
        card.handle(mv(Source::Touch, 160.0, 302.0, 30));
        let effects = card.handle(up(Source::Touch, 160.0, 302.0, 60));
        assert!(effects.is_empty());
        assert_eq!(card.state().pending_taps(), 0);

        let mut effects = tap(&mut card, 150);
        effects.extend(card.handle(Event::Tick { time: ms(1000) }));
        assert_eq!(count(&effects, Effect::Like), 0);
        assert_eq!(count(&effects, Effect::SingleTap), 1);
    }

    #[test]
    fn small_rightward_jitter_still_taps() {
        let mut card = Card::new(WIDTH);
        card.handle(down(Source::Touch, 100.0, 300.0, 0));
        card.handle(mv(Source::Touch, 106.0, 301.0, 20));
        card.handle(up(Source::Touch, 106.0, 301.0, 40));
        assert_eq!(card.state().pending_taps(), 1);
    }

    #[test]
    fn scroll_release_is_not_a_tap() {
        let mut card = Card::new(WIDTH);
        card.handle(down(Source::Touch, 300.0, 300.0, 0));
        card.handle(mv(Source::Touch, 300.0, 200.0, 50));
        card.handle(up(Source::Touch, 300.0, 200.0, 80));
        assert_eq!(card.state().pending_taps(), 0);
    }

    #[test]
    fn double_tap_within_window_likes_once() {
        let mut card = Card::new(WIDTH);
        let mut effects = tap(&mut card, 0);
        effects.extend(tap(&mut card, 200));
        effects.extend(card.handle(Event::Tick { time: ms(1000) }));
        assert_eq!(count(&effects, Effect::Like), 1);
        assert_eq!(count(&effects, Effect::SingleTap), 0);
        assert!(card.state().like_in_flight());
    }

    #[test]
    fn taps_far_apart_are_single_taps() {
        let mut card = Card::new(WIDTH);
        let mut effects = tap(&mut card, 0);
        effects.extend(tap(&mut card, 400));
        effects.extend(card.handle(Event::Tick { time: ms(2000) }));
        assert_eq!(count(&effects, Effect::Like), 0);
        assert_eq!(count(&effects, Effect::SingleTap), 2);
    }

    #[test]
    fn tick_resolves_single_tap_at_deadline() {
        let mut card = Card::new(WIDTH);
        tap(&mut card, 0);
        assert_eq!(card.next_deadline(), Some(ms(340)));
        assert!(card.handle(Event::Tick { time: ms(339) }).is_empty());
        assert_eq!(
            card.handle(Event::Tick { time: ms(340) }),
            vec![Effect::SingleTap]
        );
        assert_eq!(card.next_deadline(), None);
    }

    #[test]
    fn double_tap_ignored_while_like_in_flight() {
        let mut card = Card::new(WIDTH);
        let mut effects = tap(&mut card, 0);
        effects.extend(tap(&mut card, 100));
        effects.extend(tap(&mut card, 1000));
        effects.extend(tap(&mut card, 1100));
        assert_eq!(count(&effects, Effect::Like), 1);

        card.handle(Event::LikeSettled);
        let mut effects = tap(&mut card, 3000);
        effects.extend(tap(&mut card, 3100));
        assert_eq!(count(&effects, Effect::Like), 1);
    }

    #[test]
    fn synthetic_mouse_after_touch_is_ignored() {
        let mut card = Card::new(WIDTH);
        let mut effects = tap(&mut card, 0);
        // Emulated mouse sequence for the same tap.
        effects.extend(card.handle(down(Source::Mouse, 50.0, 50.0, 60)));
        effects.extend(card.handle(up(Source::Mouse, 50.0, 50.0, 70)));
        effects.extend(card.handle(Event::Tick { time: ms(1000) }));
        assert_eq!(count(&effects, Effect::Like), 0);
        assert_eq!(count(&effects, Effect::SingleTap), 1);

        // Real mouse use long after the touch works normally.
        let mut effects = card.handle(down(Source::Mouse, 50.0, 50.0, 2000));
        effects.extend(card.handle(up(Source::Mouse, 50.0, 50.0, 2010)));
        effects.extend(card.handle(down(Source::Mouse, 50.0, 50.0, 2100)));
        effects.extend(card.handle(up(Source::Mouse, 50.0, 50.0, 2110)));
        assert_eq!(count(&effects, Effect::Like), 1);
    }

    #[test]
    fn cancel_resets_offset() {
        let mut card = Card::new(WIDTH);
        card.handle(down(Source::Touch, 300.0, 300.0, 0));
        card.handle(mv(Source::Touch, 200.0, 300.0, 30));
        let effects = card.handle(Event::Cancel);
        assert_eq!(
            effects,
            vec![Effect::Offset {
                px: 0.0,
                animate: None
            }]
        );
        assert_eq!(card.state().phase(), Phase::Idle);
    }

    #[test]
    fn transition_is_pure() {
        let state = CardState::new(WIDTH);
        let event = down(Source::Touch, 1.0, 2.0, 5);
        let (a, ea) = transition(state, event);
        let (b, eb) = transition(state, event);
        assert_eq!(a, b);
        assert_eq!(ea, eb);
        assert_eq!(state.phase(), Phase::Idle);
    }
}
