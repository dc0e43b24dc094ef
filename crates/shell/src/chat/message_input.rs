use assistant_runtime::SessionId;
use gpui::*;
use gpui_component::{
    ActiveTheme, IconName, Sizable,
    button::{Button, ButtonVariants},
    h_flex,
    input::{Input, InputEvent, InputState},
};

use crate::chat::events::{Stop, Submit};

pub struct MessageInput {
    input_state: Entity<InputState>,
    session: SessionId,
    is_streaming: bool,
    _input_subscription: Subscription,
}

impl EventEmitter<Submit> for MessageInput {}
impl EventEmitter<Stop> for MessageInput {}

impl MessageInput {
    pub fn new(window: &mut Window, cx: &mut Context<Self>) -> Self {
        let input_state = cx.new(|cx| {
            InputState::new(window, cx)
                .placeholder("Send a message...")
                .clean_on_escape()
        });

        let input_subscription = cx.subscribe_in(
            &input_state,
            window,
            |this, _, event: &InputEvent, window, cx| {
                if let InputEvent::PressEnter { secondary: false } = event {
                    this.handle_submit(window, cx);
                }
            },
        );

        Self {
            input_state,
            session: SessionId::new(1),
            is_streaming: false,
            _input_subscription: input_subscription,
        }
    }

    /// Session id carried by the next Submit or Stop.
    pub fn set_session(&mut self, session: SessionId, cx: &mut Context<Self>) {
        self.session = session;
        cx.notify();
    }

    pub fn set_streaming(&mut self, streaming: bool, cx: &mut Context<Self>) {
        self.is_streaming = streaming;
        cx.notify();
    }

    pub fn clear(&mut self, window: &mut Window, cx: &mut Context<Self>) {
        self.input_state.update(cx, |state, cx| {
            state.set_value("", window, cx);
        });
    }

    fn handle_submit(&mut self, window: &mut Window, cx: &mut Context<Self>) {
        if self.is_streaming {
            return;
        }

        let content = self.input_state.read(cx).value().trim().to_string();
        if content.is_empty() {
            return;
        }

        cx.emit(Submit::new(self.session, content));
        self.clear(window, cx);
    }

    fn handle_stop(&mut self, cx: &mut Context<Self>) {
        if !self.is_streaming {
            return;
        }

        // The thread unlocks the input once the reply has actually settled.
        cx.emit(Stop {
            session: self.session,
        });
    }
}

impl Render for MessageInput {
    fn render(&mut self, _window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        let theme = cx.theme();
        let action = if self.is_streaming {
            Button::new("thread-stop")
                .small()
                .danger()
                .icon(IconName::CircleX)
                .child("Stop")
                .on_click(cx.listener(|this, _, _window, cx| {
                    this.handle_stop(cx);
                }))
                .into_any_element()
        } else {
            Button::new("thread-send")
                .small()
                .primary()
                .icon(IconName::ArrowUp)
                .on_click(cx.listener(|this, _, window, cx| {
                    this.handle_submit(window, cx);
                }))
                .into_any_element()
        };

        h_flex()
            .w_full()
            .gap_2()
            .p_3()
            .items_center()
            .bg(theme.background)
            .child(
                div()
                    .flex_1()
                    .min_w_0()
                    .child(Input::new(&self.input_state).disabled(self.is_streaming)),
            )
            .child(action)
    }
}
