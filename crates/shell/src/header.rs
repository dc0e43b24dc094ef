use gpui::prelude::FluentBuilder as _;
use gpui::*;
use gpui_component::{
    ActiveTheme, IconName, Sizable,
    button::{Button, ButtonVariants},
    h_flex,
    label::Label,
};

/// Fixed height of the header bar.
pub const HEADER_HEIGHT: Pixels = px(48.);

type ClickHandler = Box<dyn Fn(&ClickEvent, &mut Window, &mut App) + 'static>;

/// Header bar: panel toggle, title, and an optional close affordance.
#[derive(IntoElement)]
pub struct AppHeader {
    /// Title shown next to the toggle.
    title: SharedString,
    /// Handler for the panel toggle button.
    on_toggle: ClickHandler,
    /// Handler for the close button. The button renders only when this is set.
    on_close: Option<ClickHandler>,
}

impl AppHeader {
    /// Creates a header with a toggle button and no close button.
    ///
    /// # Arguments
    /// * `title` - Text rendered after the toggle
    /// * `on_toggle` - Called when the toggle button is clicked
    pub fn new(
        title: impl Into<SharedString>,
        on_toggle: impl Fn(&ClickEvent, &mut Window, &mut App) + 'static,
    ) -> Self {
        Self {
            title: title.into(),
            on_toggle: Box::new(on_toggle),
            on_close: None,
        }
    }

    /// Shows the close button. Callers omit it once the layout is large enough to keep
    /// the panel inline.
    pub fn on_close(
        mut self,
        on_close: impl Fn(&ClickEvent, &mut Window, &mut App) + 'static,
    ) -> Self {
        self.on_close = Some(Box::new(on_close));
        self
    }
}

impl RenderOnce for AppHeader {
    fn render(self, _window: &mut Window, cx: &mut App) -> impl IntoElement {
        let theme = cx.theme();
        let on_toggle = self.on_toggle;

        h_flex()
            .id("app-header")
            .h(HEADER_HEIGHT)
            .flex_shrink_0()
            .w_full()
            .gap_2()
            .px_4()
            .items_center()
            .border_b_1()
            .border_color(theme.border)
            .bg(theme.background)
            .child(
                Button::new("toggle-panel")
                    .ghost()
                    .small()
                    .icon(IconName::PanelLeft)
                    .on_click(move |event, window, cx| on_toggle(event, window, cx)),
            )
            .child(div().h(px(16.)).w(px(1.)).bg(theme.border))
            .child(
                div().flex_1().min_w_0().truncate().child(
                    Label::new(self.title)
                        .text_sm()
                        .text_color(theme.foreground),
                ),
            )
            .when_some(self.on_close, |header, on_close| {
                header.child(
                    Button::new("close-panel")
                        .ghost()
                        .small()
                        .icon(IconName::Close)
                        .on_click(move |event, window, cx| on_close(event, window, cx)),
                )
            })
    }
}
