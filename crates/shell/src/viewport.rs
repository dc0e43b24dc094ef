use gpui::*;

/// Widths strictly below this are laid out as a narrow (overlay panel) viewport.
pub const NARROW_BREAKPOINT: f32 = 768.0;
/// Widths at or above this have room for the inline navigation panel.
pub const LARGE_BREAKPOINT: f32 = 1024.0;

const _: () = assert!(NARROW_BREAKPOINT < LARGE_BREAKPOINT);

pub fn is_narrow_width(width: f32) -> bool {
    width < NARROW_BREAKPOINT
}

pub fn is_large_width(width: f32) -> bool {
    width >= LARGE_BREAKPOINT
}

/// Emitted once per crossing of either breakpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewportChange {
    pub narrow: bool,
    pub large: bool,
}

/// Classifies the last observed viewport width.
///
/// Before the first measurement the viewport is treated as not narrow, which is the
/// only answer available when no display surface exists yet.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ViewportClassifier {
    width: Option<f32>,
}

impl ViewportClassifier {
    pub const fn unmeasured() -> Self {
        Self { width: None }
    }

    pub fn measured(width: f32) -> Self {
        Self { width: Some(width) }
    }

    pub fn width(&self) -> Option<f32> {
        self.width
    }

    pub fn is_narrow(&self) -> bool {
        self.width.is_some_and(is_narrow_width)
    }

    pub fn is_large(&self) -> bool {
        self.width.is_some_and(is_large_width)
    }

    /// Records a new width and reports a change only when a breakpoint was crossed.
    pub fn observe(&mut self, width: f32) -> Option<ViewportChange> {
        let before = (self.is_narrow(), self.is_large());
        self.width = Some(width);
        let after = (self.is_narrow(), self.is_large());

        (before != after).then_some(ViewportChange {
            narrow: after.0,
            large: after.1,
        })
    }
}

/// Window-bound viewport observer.
///
/// Measures the window synchronously on creation, then follows window bounds changes
/// until the entity is released, which revokes the subscription.
pub struct ViewportWatch {
    classifier: ViewportClassifier,
    _bounds_subscription: Subscription,
}

impl EventEmitter<ViewportChange> for ViewportWatch {}

impl ViewportWatch {
    pub fn new(window: &mut Window, cx: &mut Context<Self>) -> Self {
        let classifier = ViewportClassifier::measured(f32::from(window.viewport_size().width));
        tracing::debug!(
            width = ?classifier.width(),
            narrow = classifier.is_narrow(),
            "initial viewport measurement"
        );

        let bounds_subscription = cx.observe_window_bounds(window, |this, window, cx| {
            this.measure(f32::from(window.viewport_size().width), cx);
        });

        Self {
            classifier,
            _bounds_subscription: bounds_subscription,
        }
    }

    pub fn classifier(&self) -> ViewportClassifier {
        self.classifier
    }

    pub fn is_narrow(&self) -> bool {
        self.classifier.is_narrow()
    }

    fn measure(&mut self, width: f32, cx: &mut Context<Self>) {
        let Some(change) = self.classifier.observe(width) else {
            return;
        };

        tracing::debug!(
            width,
            narrow = change.narrow,
            large = change.large,
            "viewport crossed a breakpoint"
        );
        cx.emit(change);
        cx.notify();
    }
}
