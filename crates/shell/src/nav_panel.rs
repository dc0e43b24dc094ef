use gpui::*;
use gpui_component::{
    ActiveTheme, IconName, Sizable,
    button::{Button, ButtonVariants},
    label::Label,
    v_flex,
};

/// Emitted when the panel's "New thread" button is pressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewThreadRequested;

/// Navigation panel slot content.
///
/// Shows the app title, a "New thread" button, and a caption naming the runtime in
/// use. The shell decides where the panel sits; the panel itself is layout-agnostic.
pub struct NavPanel {
    title: SharedString,
    /// `None` until the shell hands over a runtime.
    runtime_label: Option<SharedString>,
}

impl EventEmitter<NewThreadRequested> for NavPanel {}

impl NavPanel {
    /// Creates the panel with no runtime caption.
    pub fn new(title: impl Into<SharedString>, _cx: &mut Context<Self>) -> Self {
        Self {
            title: title.into(),
            runtime_label: None,
        }
    }

    /// Caption naming the provider and model behind the current runtime.
    pub fn set_runtime_label(&mut self, label: Option<SharedString>, cx: &mut Context<Self>) {
        self.runtime_label = label;
        cx.notify();
    }

    fn request_new_thread(&mut self, cx: &mut Context<Self>) {
        cx.emit(NewThreadRequested);
    }
}

impl Render for NavPanel {
    fn render(&mut self, _window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        let theme = cx.theme();
        let runtime_label = self
            .runtime_label
            .clone()
            .unwrap_or_else(|| SharedString::from("No runtime"));

        v_flex()
            .id("nav-panel")
            .size_full()
            .gap_3()
            .p_3()
            .bg(theme.background)
            .border_r_1()
            .border_color(theme.border)
            .child(
                Label::new(self.title.clone())
                    .text_sm()
                    .font_weight(FontWeight::SEMIBOLD)
                    .text_color(theme.foreground),
            )
            .child(
                Button::new("new-thread")
                    .small()
                    .ghost()
                    .icon(IconName::Plus)
                    .child("New thread")
                    .on_click(cx.listener(|this, _, _window, cx| {
                        this.request_new_thread(cx);
                    })),
            )
            .child(div().flex_1())
            .child(
                Label::new(runtime_label)
                    .text_xs()
                    .text_color(theme.muted_foreground),
            )
    }
}
