//! Transient shell state and the decision of what the shell renders.
//!
//! Everything here is plain data so the layout rules can be exercised without a window:
//! the GPUI view in [`crate::app`] owns a [`ShellState`], feeds it runtime and timer
//! events, and renders whatever [`ShellState::layout`] returns.

use std::time::{Duration, Instant};

use crate::viewport::ViewportClassifier;

/// Delay between the runtime handle becoming available and the thread being revealed.
pub const LOADING_DELAY: Duration = Duration::from_millis(800);
/// Duration of the overlay panel slide.
pub const PANEL_SLIDE_DURATION: Duration = Duration::from_millis(300);
/// Duration of the thread fade-in once loading completes.
pub const THREAD_FADE_DURATION: Duration = Duration::from_millis(400);
/// Width of the navigation panel when it slides over a narrow viewport.
pub const OVERLAY_PANEL_WIDTH: f32 = 288.0;
/// Width of the navigation panel column on large viewports.
pub const INLINE_PANEL_WIDTH: f32 = 256.0;
/// Opacity of the backdrop behind the open overlay panel.
pub const BACKDROP_OPACITY: f32 = 0.4;

/// Identity of one armed loading timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadingTicket {
    generation: u64,
    deadline: Instant,
}

impl LoadingTicket {
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn remaining(&self, now: Instant) -> Duration {
        self.deadline.saturating_duration_since(now)
    }
}

/// Outcome of a loading timer firing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadingFire {
    /// The shell left the loading state.
    Ready,
    /// The ticket is current but its deadline has not passed; wait this much longer.
    Early(Duration),
    /// The ticket was superseded or cancelled, or loading already finished.
    Stale,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum LoadingPhase {
    #[default]
    AwaitingRuntime,
    Armed(LoadingTicket),
    Ready,
}

/// One-shot loading-to-ready transition.
///
/// `Ready` is terminal: nothing re-arms the gate once it has fired.
#[derive(Debug, Default)]
pub struct LoadingGate {
    phase: LoadingPhase,
    generation: u64,
}

impl LoadingGate {
    pub fn is_loading(&self) -> bool {
        !matches!(self.phase, LoadingPhase::Ready)
    }

    /// Arms a fresh timer, superseding any pending one.
    pub fn arm(&mut self, now: Instant) -> Option<LoadingTicket> {
        if self.phase == LoadingPhase::Ready {
            return None;
        }

        self.generation = self.generation.wrapping_add(1);
        let ticket = LoadingTicket {
            generation: self.generation,
            deadline: now + LOADING_DELAY,
        };
        self.phase = LoadingPhase::Armed(ticket);
        Some(ticket)
    }

    /// Cancels the pending timer. Returns whether one was pending.
    pub fn disarm(&mut self) -> bool {
        if matches!(self.phase, LoadingPhase::Armed(_)) {
            self.phase = LoadingPhase::AwaitingRuntime;
            return true;
        }
        false
    }

    pub fn fire(&mut self, ticket: LoadingTicket, now: Instant) -> LoadingFire {
        match self.phase {
            LoadingPhase::Armed(current) if current == ticket => {
                if now >= ticket.deadline {
                    self.phase = LoadingPhase::Ready;
                    LoadingFire::Ready
                } else {
                    LoadingFire::Early(ticket.remaining(now))
                }
            }
            LoadingPhase::Armed(_) | LoadingPhase::AwaitingRuntime | LoadingPhase::Ready => {
                LoadingFire::Stale
            }
        }
    }
}

/// What the shell renders, decided from state and viewport alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellLayout {
    /// Only the error message renders.
    Error { message: String },
    Normal(NormalLayout),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalLayout {
    pub header: HeaderLayout,
    pub panel: PanelLayout,
    pub content: ContentLayout,
    pub backdrop: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderLayout {
    /// Close affordance for the panel; hidden on large viewports where the panel is inline.
    pub show_close: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelLayout {
    /// Narrow viewport: the panel floats over the content and slides in from the left.
    Overlay { open: bool },
    /// Large viewport: the panel is a permanent column.
    Inline,
    /// Between the two breakpoints there is no room for a column and no overlay either.
    Hidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentLayout {
    Spinner,
    Thread,
}

/// Transient state owned by the shell; recreated on every launch.
#[derive(Debug, Default)]
pub struct ShellState {
    loading: LoadingGate,
    panel_open: bool,
    last_error: Option<String>,
}

impl ShellState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.is_loading()
    }

    pub fn is_panel_open(&self) -> bool {
        self.panel_open
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Reacts to the runtime handle appearing, changing, or going away.
    ///
    /// A present handle arms a new timer and supersedes any pending one; an absent handle
    /// cancels it. After the thread has been revealed this is a no-op.
    pub fn runtime_changed(&mut self, present: bool, now: Instant) -> Option<LoadingTicket> {
        if present {
            self.loading.arm(now)
        } else {
            self.loading.disarm();
            None
        }
    }

    pub fn fire_loading(&mut self, ticket: LoadingTicket, now: Instant) -> LoadingFire {
        self.loading.fire(ticket, now)
    }

    /// Flips the panel and returns the new value.
    pub fn toggle_panel(&mut self) -> bool {
        self.panel_open = !self.panel_open;
        self.panel_open
    }

    /// Closes the panel. Returns whether it was open.
    pub fn close_panel(&mut self) -> bool {
        std::mem::replace(&mut self.panel_open, false)
    }

    /// Enters error mode. Blank messages are ignored and the first error sticks.
    pub fn fail(&mut self, message: impl Into<String>) -> bool {
        if self.last_error.is_some() {
            return false;
        }

        let message = message.into();
        if message.trim().is_empty() {
            return false;
        }

        self.last_error = Some(message);
        true
    }

    /// Cancels the pending loading timer when the shell goes away.
    pub fn teardown(&mut self) {
        self.loading.disarm();
    }

    pub fn layout(&self, viewport: &ViewportClassifier) -> ShellLayout {
        if let Some(message) = &self.last_error {
            return ShellLayout::Error {
                message: message.clone(),
            };
        }

        let narrow = viewport.is_narrow();
        let panel = if narrow {
            PanelLayout::Overlay {
                open: self.panel_open,
            }
        } else if viewport.is_large() {
            PanelLayout::Inline
        } else {
            PanelLayout::Hidden
        };

        let content = if self.is_loading() {
            ContentLayout::Spinner
        } else {
            ContentLayout::Thread
        };

        ShellLayout::Normal(NormalLayout {
            header: HeaderLayout {
                show_close: !viewport.is_large(),
            },
            panel,
            content,
            backdrop: narrow && self.panel_open,
        })
    }
}

/// Start and end of the current overlay slide.
///
/// The trigger is bumped on every open/close so the animation restarts under a new id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PanelMotion {
    pub from_open: bool,
    pub trigger: usize,
}

impl PanelMotion {
    pub fn retarget(&mut self, was_open: bool) {
        self.from_open = was_open;
        self.trigger = self.trigger.wrapping_add(1);
    }
}

/// Horizontal offset of the overlay panel at eased progress `delta`.
///
/// Closed sits one panel width off-screen to the left, open sits flush at zero.
pub fn slide_offset(from_open: bool, to_open: bool, delta: f32) -> f32 {
    let position = |open: bool| if open { 0.0 } else { -OVERLAY_PANEL_WIDTH };
    let start = position(from_open);
    let end = position(to_open);
    start + (end - start) * delta.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    impl ShellLayout {
        fn normal(&self) -> Option<&NormalLayout> {
            match self {
                Self::Normal(layout) => Some(layout),
                Self::Error { .. } => None,
            }
        }
    }

    impl ShellState {
        fn pending_loading(&self) -> Option<LoadingTicket> {
            match self.loading.phase {
                LoadingPhase::Armed(ticket) => Some(ticket),
                LoadingPhase::AwaitingRuntime | LoadingPhase::Ready => None,
            }
        }

        /// Simulated clock tick: fires the pending ticket. Returns whether still loading.
        fn poll_loading(&mut self, now: Instant) -> bool {
            if let Some(ticket) = self.pending_loading() {
                self.fire_loading(ticket, now);
            }
            self.is_loading()
        }
    }

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    fn narrow() -> ViewportClassifier {
        ViewportClassifier::measured(600.0)
    }

    fn large() -> ViewportClassifier {
        ViewportClassifier::measured(1280.0)
    }

    #[test]
    fn loading_lasts_exactly_the_configured_delay() {
        let start = Instant::now();
        let mut state = ShellState::new();
        assert!(state.is_loading());

        let ticket = state
            .runtime_changed(true, start)
            .expect("present runtime arms the timer");
        assert_eq!(ticket.deadline(), start + LOADING_DELAY);

        assert!(state.poll_loading(start + ms(1)));
        assert!(state.poll_loading(start + ms(799)));
        assert!(!state.poll_loading(start + ms(800)));

        for later in [801, 5_000, 60_000] {
            assert!(!state.poll_loading(start + ms(later)));
        }
    }

    #[test]
    fn early_fire_reports_the_remaining_wait() {
        let start = Instant::now();
        let mut gate = LoadingGate::default();
        let ticket = gate.arm(start).expect("armed");

        assert_eq!(gate.fire(ticket, start + ms(300)), LoadingFire::Early(ms(500)));
        assert!(gate.is_loading());
        assert_eq!(gate.fire(ticket, start + ms(800)), LoadingFire::Ready);
        assert!(!gate.is_loading());
    }

    #[test]
    fn ready_fires_at_most_once_and_never_rearms() {
        let start = Instant::now();
        let mut state = ShellState::new();
        let ticket = state.runtime_changed(true, start).expect("armed");

        assert_eq!(state.fire_loading(ticket, start + ms(800)), LoadingFire::Ready);
        assert_eq!(state.fire_loading(ticket, start + ms(900)), LoadingFire::Stale);

        assert_eq!(state.runtime_changed(true, start + ms(1_000)), None);
        assert_eq!(state.runtime_changed(false, start + ms(1_000)), None);
        assert!(!state.is_loading());
    }

    #[test]
    fn absent_runtime_keeps_loading_forever() {
        let start = Instant::now();
        let mut state = ShellState::new();

        assert_eq!(state.runtime_changed(false, start), None);
        assert_eq!(state.pending_loading(), None);
        assert!(state.poll_loading(start + ms(800)));
        assert!(state.poll_loading(start + Duration::from_secs(3_600)));
    }

    #[test]
    fn teardown_before_deadline_prevents_ready() {
        let start = Instant::now();
        let mut state = ShellState::new();
        let ticket = state.runtime_changed(true, start).expect("armed");

        state.teardown();

        assert_eq!(state.fire_loading(ticket, start + ms(800)), LoadingFire::Stale);
        assert!(state.poll_loading(start + ms(10_000)));
    }

    #[test]
    fn runtime_change_supersedes_pending_timer() {
        let start = Instant::now();
        let mut state = ShellState::new();
        let first = state.runtime_changed(true, start).expect("armed");
        let second = state
            .runtime_changed(true, start + ms(500))
            .expect("rearmed");

        assert_ne!(first, second);
        assert_eq!(state.fire_loading(first, start + ms(800)), LoadingFire::Stale);
        assert!(state.is_loading());
        assert_eq!(
            state.fire_loading(second, start + ms(1_299)),
            LoadingFire::Early(ms(1))
        );
        assert_eq!(state.fire_loading(second, start + ms(1_300)), LoadingFire::Ready);
    }

    #[test]
    fn runtime_going_away_cancels_pending_timer() {
        let start = Instant::now();
        let mut state = ShellState::new();
        let ticket = state.runtime_changed(true, start).expect("armed");

        assert_eq!(state.runtime_changed(false, start + ms(100)), None);
        assert_eq!(state.fire_loading(ticket, start + ms(800)), LoadingFire::Stale);
        assert!(state.is_loading());
    }

    #[test]
    fn backdrop_click_closes_and_repeated_click_is_noop() {
        let mut state = ShellState::new();
        state.toggle_panel();

        let layout = state.layout(&narrow());
        let normal = layout.normal().expect("normal mode");
        assert!(normal.backdrop);
        assert_eq!(normal.panel, PanelLayout::Overlay { open: true });

        assert!(state.close_panel());
        assert!(!state.is_panel_open());
        assert!(!state.layout(&narrow()).normal().expect("normal").backdrop);

        assert!(!state.close_panel());
        assert!(!state.is_panel_open());
    }

    #[test]
    fn closed_overlay_has_no_backdrop() {
        let state = ShellState::new();
        let layout = state.layout(&narrow());
        let normal = layout.normal().expect("normal mode");

        assert_eq!(normal.panel, PanelLayout::Overlay { open: false });
        assert!(!normal.backdrop);
        assert!(normal.header.show_close);
    }

    #[test]
    fn error_preempts_everything() {
        let mut state = ShellState::new();
        state.toggle_panel();
        assert!(state.fail("runtime factory exploded"));

        for viewport in [narrow(), large(), ViewportClassifier::unmeasured()] {
            assert_eq!(
                state.layout(&viewport),
                ShellLayout::Error {
                    message: "runtime factory exploded".into()
                }
            );
        }
    }

    #[test]
    fn blank_errors_are_ignored_and_first_error_sticks() {
        let mut state = ShellState::new();

        assert!(!state.fail(""));
        assert!(!state.fail("   "));
        assert!(state.layout(&large()).normal().is_some());

        assert!(state.fail("first"));
        assert!(!state.fail("second"));
        assert_eq!(state.last_error(), Some("first"));
    }

    #[test]
    fn widening_while_open_renders_inline_without_touching_the_flag() {
        let mut state = ShellState::new();
        state.toggle_panel();
        let mut viewport = narrow();
        assert!(state.layout(&viewport).normal().expect("normal").backdrop);

        viewport.observe(1280.0);
        let layout = state.layout(&viewport);
        let normal = layout.normal().expect("normal mode");

        assert_eq!(normal.panel, PanelLayout::Inline);
        assert!(!normal.backdrop);
        assert!(!normal.header.show_close);
        assert!(state.is_panel_open());
    }

    #[test]
    fn medium_viewport_hides_the_panel_column() {
        let mut state = ShellState::new();
        state.toggle_panel();
        let layout = state.layout(&ViewportClassifier::measured(900.0));
        let normal = layout.normal().expect("normal mode");

        assert_eq!(normal.panel, PanelLayout::Hidden);
        assert!(!normal.backdrop);
        assert!(normal.header.show_close);
    }

    #[test]
    fn unmeasured_viewport_renders_the_wide_shape() {
        let layout = ShellState::new().layout(&ViewportClassifier::unmeasured());
        let normal = layout.normal().expect("normal mode");

        assert_eq!(normal.panel, PanelLayout::Hidden);
        assert!(!normal.backdrop);
    }

    #[test]
    fn content_switches_from_spinner_to_thread() {
        let start = Instant::now();
        let mut state = ShellState::new();
        let ticket = state.runtime_changed(true, start).expect("armed");
        assert_eq!(
            state.layout(&large()).normal().expect("normal").content,
            ContentLayout::Spinner
        );

        state.fire_loading(ticket, start + LOADING_DELAY);
        assert_eq!(
            state.layout(&large()).normal().expect("normal").content,
            ContentLayout::Thread
        );
    }

    #[test]
    fn slide_offset_interpolates_between_edges() {
        assert_eq!(slide_offset(false, true, 0.0), -OVERLAY_PANEL_WIDTH);
        assert_eq!(slide_offset(false, true, 1.0), 0.0);
        assert_eq!(slide_offset(true, false, 0.5), -OVERLAY_PANEL_WIDTH / 2.0);
        assert_eq!(slide_offset(false, false, 0.3), -OVERLAY_PANEL_WIDTH);
        assert_eq!(slide_offset(false, true, 1.5), 0.0);
    }

    #[test]
    fn panel_motion_restarts_on_every_retarget() {
        let mut motion = PanelMotion::default();
        motion.retarget(false);
        assert_eq!(motion, PanelMotion { from_open: false, trigger: 1 });
        motion.retarget(true);
        assert_eq!(motion, PanelMotion { from_open: true, trigger: 2 });
    }
}
