use std::time::{Duration, Instant};

use assistant_runtime::ChatRuntime;
use gpui::prelude::FluentBuilder;
use gpui::*;
use gpui_component::{ActiveTheme, h_flex, label::Label, v_flex};

use crate::chat::ThreadView;
use crate::header::AppHeader;
use crate::layout::{
    BACKDROP_OPACITY, ContentLayout, INLINE_PANEL_WIDTH, LoadingFire, LoadingTicket,
    NormalLayout, OVERLAY_PANEL_WIDTH, PANEL_SLIDE_DURATION, PanelLayout, PanelMotion,
    ShellLayout, ShellState, THREAD_FADE_DURATION, slide_offset,
};
use crate::nav_panel::{NavPanel, NewThreadRequested};
use crate::viewport::{ViewportChange, ViewportWatch};

gpui::actions!(assistant_shell, [TogglePanel, ClosePanel, NewThread, Quit]);

/// Icon rotated while the runtime is loading.
const SPINNER_PATH: &str = "icons/loader-circle.svg";
/// One full spinner revolution.
const SPINNER_TURN: Duration = Duration::from_secs(1);

/// Text shown in error mode.
pub fn error_text(message: &str) -> String {
    format!("Something went wrong: {message}")
}

/// Caption for the runtime currently driving the thread.
pub fn runtime_label(runtime: &ChatRuntime) -> String {
    format!("{} / {}", runtime.provider_name(), runtime.model_id())
}

/// Top-level window view that owns the responsive layout.
///
/// The shell provides:
/// - A header with the panel toggle and, below the large breakpoint, a close button
/// - A navigation panel that overlays narrow windows and sits inline on large ones
/// - A content slot showing a spinner until the runtime has settled, then the thread
/// - An error screen that replaces everything once an error is reported
pub struct AssistantShell {
    /// Window title, also shown in the header and the panel.
    title: SharedString,
    /// Loading, panel, and error state. All layout decisions read from here.
    state: ShellState,
    /// Breakpoint classifier fed by window-bounds changes.
    viewport: Entity<ViewportWatch>,
    /// Current runtime handle, compared by id to detect changes.
    runtime: Option<ChatRuntime>,
    nav_panel: Entity<NavPanel>,
    thread: Entity<ThreadView>,
    /// Start position and animation key for the overlay slide.
    panel_motion: PanelMotion,
    /// Pending loading timer. Dropping it cancels the timer.
    loading_task: Option<Task<()>>,
    _subscriptions: Vec<Subscription>,
}

impl AssistantShell {
    /// Creates the shell in the loading state with no runtime and the panel closed.
    ///
    /// # Arguments
    /// * `title` - Text for the header and the navigation panel
    /// * `window` - Window whose bounds drive the viewport classifier
    /// * `cx` - GPUI context used to create the child entities
    pub fn new(
        title: impl Into<SharedString>,
        window: &mut Window,
        cx: &mut Context<Self>,
    ) -> Self {
        let title = title.into();
        let viewport = cx.new(|cx| ViewportWatch::new(window, cx));
        let nav_panel = cx.new(|cx| NavPanel::new(title.clone(), cx));
        let thread = cx.new(|cx| ThreadView::new(None, window, cx));

        let subscriptions = vec![
            cx.subscribe(&viewport, |this, _, change: &ViewportChange, cx| {
                this.viewport_changed(*change, cx);
            }),
            cx.subscribe(&nav_panel, |this, _, _: &NewThreadRequested, cx| {
                this.new_thread(cx);
            }),
        ];

        cx.on_release(|this: &mut Self, _cx| {
            this.state.teardown();
            this.loading_task = None;
        })
        .detach();

        Self {
            title,
            state: ShellState::new(),
            viewport,
            runtime: None,
            nav_panel,
            thread,
            panel_motion: PanelMotion::default(),
            loading_task: None,
            _subscriptions: subscriptions,
        }
    }

    /// Hands the shell a runtime handle, or takes it away.
    ///
    /// A new or different handle restarts the loading delay while the spinner is still
    /// showing; an absent handle keeps the shell loading.
    pub fn set_runtime(&mut self, runtime: Option<ChatRuntime>, cx: &mut Context<Self>) {
        let changed = match (&self.runtime, &runtime) {
            (Some(current), Some(next)) => current.id() != next.id(),
            (None, None) => false,
            _ => true,
        };
        if !changed {
            return;
        }

        tracing::debug!(
            runtime = ?runtime.as_ref().map(ChatRuntime::id),
            loading = self.state.is_loading(),
            "runtime handle changed"
        );

        let label = runtime
            .as_ref()
            .map(|runtime| SharedString::from(runtime_label(runtime)));
        self.nav_panel.update(cx, |panel, cx| {
            panel.set_runtime_label(label, cx);
        });
        self.thread.update(cx, |thread, cx| {
            thread.set_runtime(runtime.clone(), cx);
        });

        let present = runtime.is_some();
        self.runtime = runtime;
        match self.state.runtime_changed(present, Instant::now()) {
            Some(ticket) => self.schedule_loading(ticket, cx),
            None => self.loading_task = None,
        }
        cx.notify();
    }

    /// Switches the shell into error mode. Only the first non-blank message is kept.
    pub fn show_error(&mut self, message: impl Into<String>, cx: &mut Context<Self>) {
        let message = message.into();
        if self.state.fail(message.clone()) {
            tracing::error!(error = %message, "shell entered error mode");
            cx.notify();
        }
    }

    /// Opens or closes the navigation panel and restarts the slide animation.
    pub fn toggle_panel(&mut self, cx: &mut Context<Self>) {
        let was_open = self.state.is_panel_open();
        let open = self.state.toggle_panel();
        self.panel_motion.retarget(was_open);
        tracing::debug!(open, "navigation panel toggled");
        cx.notify();
    }

    /// Closes the navigation panel. Does nothing when it is already closed.
    pub fn close_panel(&mut self, cx: &mut Context<Self>) {
        if self.state.close_panel() {
            self.panel_motion.retarget(true);
            tracing::debug!("navigation panel closed");
            cx.notify();
        }
    }

    /// Clears the thread, cancelling any in-flight reply.
    ///
    /// On narrow windows the overlay panel is closed as well so the fresh thread is
    /// visible.
    pub fn new_thread(&mut self, cx: &mut Context<Self>) {
        self.thread.update(cx, |thread, cx| thread.reset(cx));
        if self.viewport.read(cx).is_narrow() {
            self.close_panel(cx);
        }
    }

    fn viewport_changed(&mut self, change: ViewportChange, cx: &mut Context<Self>) {
        tracing::debug!(
            narrow = change.narrow,
            large = change.large,
            panel_open = self.state.is_panel_open(),
            "relayout after viewport change"
        );
        cx.notify();
    }

    /// Waits out the ticket's remaining delay, then tries to reveal the thread.
    fn schedule_loading(&mut self, ticket: LoadingTicket, cx: &mut Context<Self>) {
        let wait = ticket.remaining(Instant::now());
        self.loading_task = Some(cx.spawn(async move |this, cx| {
            cx.background_executor().timer(wait).await;
            let _ = this.update(cx, |this, cx| this.finish_loading(ticket, cx));
        }));
    }

    fn finish_loading(&mut self, ticket: LoadingTicket, cx: &mut Context<Self>) {
        match self.state.fire_loading(ticket, Instant::now()) {
            LoadingFire::Ready => {
                self.loading_task = None;
                tracing::info!("assistant ready, revealing thread");
                cx.notify();
            }
            LoadingFire::Early(rest) => {
                tracing::debug!(?rest, "loading timer fired early, waiting the remainder");
                self.schedule_loading(ticket, cx);
            }
            LoadingFire::Stale => {}
        }
    }

    fn render_error(&self, message: &str, cx: &Context<Self>) -> AnyElement {
        let theme = cx.theme();

        div()
            .id("shell-error")
            .size_full()
            .flex()
            .items_center()
            .justify_center()
            .p_4()
            .bg(theme.background)
            .child(Label::new(error_text(message)).text_color(theme.danger))
            .into_any_element()
    }

    fn render_normal(&self, layout: NormalLayout, cx: &mut Context<Self>) -> AnyElement {
        let mut header = AppHeader::new(
            self.title.clone(),
            cx.listener(|this, _: &ClickEvent, _window, cx| this.toggle_panel(cx)),
        );
        if layout.header.show_close {
            header = header.on_close(
                cx.listener(|this, _: &ClickEvent, _window, cx| this.close_panel(cx)),
            );
        }

        let content = match layout.content {
            ContentLayout::Spinner => self.render_spinner(cx),
            ContentLayout::Thread => div()
                .id("thread-reveal")
                .size_full()
                .child(self.thread.clone())
                .with_animation(
                    "thread-fade-in",
                    Animation::new(THREAD_FADE_DURATION).with_easing(ease_in_out),
                    |el, delta| el.opacity(delta),
                )
                .into_any_element(),
        };

        let theme = cx.theme();
        let inline = matches!(layout.panel, PanelLayout::Inline);
        let overlay = match layout.panel {
            PanelLayout::Overlay { open } => Some(self.render_overlay_panel(open)),
            PanelLayout::Inline | PanelLayout::Hidden => None,
        };

        div()
            .id("assistant-shell")
            .relative()
            .size_full()
            .bg(theme.background)
            .text_color(theme.foreground)
            .child(
                h_flex()
                    .size_full()
                    .when(inline, |row| {
                        row.child(
                            div()
                                .id("nav-panel-inline")
                                .w(px(INLINE_PANEL_WIDTH))
                                .h_full()
                                .flex_shrink_0()
                                .child(self.nav_panel.clone()),
                        )
                    })
                    .child(
                        v_flex()
                            .id("main-content")
                            .flex_1()
                            .h_full()
                            .min_w_0()
                            .min_h_0()
                            .overflow_hidden()
                            .child(header)
                            .child(div().flex_1().min_h_0().child(content)),
                    ),
            )
            .when(layout.backdrop, |shell| {
                shell.child(
                    div()
                        .id("panel-backdrop")
                        .absolute()
                        .inset_0()
                        .bg(black().opacity(BACKDROP_OPACITY))
                        .occlude()
                        .on_click(cx.listener(|this, _: &ClickEvent, _window, cx| {
                            this.close_panel(cx);
                        })),
                )
            })
            .when_some(overlay, |shell, overlay| shell.child(overlay))
            .into_any_element()
    }

    fn render_overlay_panel(&self, open: bool) -> AnyElement {
        let PanelMotion { from_open, trigger } = self.panel_motion;

        div()
            .id("nav-panel-overlay")
            .absolute()
            .top_0()
            .bottom_0()
            .left(px(slide_offset(from_open, open, 1.0)))
            .w(px(OVERLAY_PANEL_WIDTH))
            .occlude()
            .shadow_lg()
            .child(self.nav_panel.clone())
            .with_animation(
                ("nav-panel-slide", trigger),
                Animation::new(PANEL_SLIDE_DURATION).with_easing(ease_in_out),
                move |el, delta| el.left(px(slide_offset(from_open, open, delta))),
            )
            .into_any_element()
    }

    fn render_spinner(&self, cx: &Context<Self>) -> AnyElement {
        let theme = cx.theme();

        div()
            .id("loading-spinner")
            .size_full()
            .flex()
            .items_center()
            .justify_center()
            .child(
                svg()
                    .size(px(24.))
                    .path(SharedString::from(SPINNER_PATH))
                    .text_color(theme.muted_foreground)
                    .with_animation(
                        "loading-spinner-turn",
                        Animation::new(SPINNER_TURN).repeat(),
                        |svg, delta| {
                            svg.with_transformation(Transformation::rotate(percentage(delta)))
                        },
                    ),
            )
            .into_any_element()
    }
}

impl Render for AssistantShell {
    fn render(&mut self, _window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        let viewport = self.viewport.read(cx).classifier();

        match self.state.layout(&viewport) {
            ShellLayout::Error { message } => self.render_error(&message, cx),
            ShellLayout::Normal(layout) => self.render_normal(layout, cx),
        }
    }
}

/// Routes the shell's key-bound actions to `shell` regardless of which element holds focus.
pub fn bind_shell_actions(shell: WeakEntity<AssistantShell>, cx: &mut App) {
    let toggle = shell.clone();
    cx.on_action(move |_: &TogglePanel, cx| {
        let _ = toggle.update(cx, |shell, cx| shell.toggle_panel(cx));
    });

    let close = shell.clone();
    cx.on_action(move |_: &ClosePanel, cx| {
        let _ = close.update(cx, |shell, cx| shell.close_panel(cx));
    });

    cx.on_action(move |_: &NewThread, cx| {
        let _ = shell.update(cx, |shell, cx| shell.new_thread(cx));
    });

    cx.on_action(|_: &Quit, cx| {
        cx.quit();
    });
}

#[cfg(test)]
mod tests {
    use assistant_runtime::{RuntimeConfig, create_runtime};

    use super::*;

    #[::core::prelude::v1::test]
    fn runtime_label_names_provider_and_model() {
        let runtime = create_runtime(RuntimeConfig::new(
            "openai",
            "sk-test",
            "",
            Some("gpt-4.1".into()),
        ))
        .expect("openai runtime");

        assert_eq!(runtime_label(&runtime), "OpenAI / gpt-4.1");
    }

    #[::core::prelude::v1::test]
    fn error_text_wraps_the_message() {
        assert_eq!(
            error_text("missing API key for provider 'openai'"),
            "Something went wrong: missing API key for provider 'openai'"
        );
    }
}
