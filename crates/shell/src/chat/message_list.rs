use assistant_runtime::Role;
use gpui::prelude::FluentBuilder as _;
use gpui::*;
use gpui_component::{ActiveTheme, h_flex, label::Label, text::TextView, v_flex};

use crate::chat::message::{Message, MessageStatus};

const USER_BUBBLE_MAX_WIDTH: Pixels = px(540.);
const CONTENT_MAX_WIDTH: Pixels = px(720.);
const MARKDOWN_SAFE_FALLBACK_THRESHOLD_BYTES: usize = 128 * 1024;

pub const WELCOME_TEXT: &str = "How can I help you today?";

pub struct MessageList {
    messages: Vec<Message>,
    scroll_handle: ScrollHandle,
}

impl MessageList {
    pub fn new(_cx: &mut Context<Self>) -> Self {
        Self {
            messages: Vec::new(),
            scroll_handle: ScrollHandle::new(),
        }
    }

    pub fn set_messages(&mut self, messages: Vec<Message>, cx: &mut Context<Self>) {
        let grew =
            messages.len() > self.messages.len() || messages.iter().any(Message::is_streaming);
        self.messages = messages;

        if grew {
            self.scroll_handle.scroll_to_bottom();
        }
        cx.notify();
    }

    fn render_message_row(&self, message: &Message, cx: &mut Context<Self>) -> AnyElement {
        let theme = cx.theme();

        if message.role == Role::User {
            return v_flex()
                .w_full()
                .items_end()
                .child(
                    div()
                        .max_w(USER_BUBBLE_MAX_WIDTH)
                        .px_3()
                        .py_2()
                        .rounded_lg()
                        .bg(theme.accent)
                        .text_color(theme.accent_foreground)
                        .child(Label::new(message.content.clone()).text_sm()),
                )
                .into_any_element();
        }

        v_flex()
            .w_full()
            .gap_2()
            .child(
                Label::new("Assistant")
                    .text_xs()
                    .text_color(theme.foreground.opacity(0.5)),
            )
            .child(render_assistant_content(message))
            .when(message.is_streaming(), |column| {
                column.child(
                    h_flex()
                        .gap_2()
                        .items_center()
                        .child(div().size(px(8.)).rounded_full().bg(theme.primary))
                        .child(
                            Label::new("Streaming")
                                .text_xs()
                                .text_color(theme.foreground.opacity(0.65)),
                        ),
                )
            })
            .when_some(status_caption(&message.status), |column, caption| {
                let color = if matches!(message.status, MessageStatus::Error(_)) {
                    theme.danger
                } else {
                    theme.muted_foreground
                };
                column.child(Label::new(caption).text_xs().text_color(color))
            })
            .into_any_element()
    }
}

fn render_assistant_content(message: &Message) -> AnyElement {
    if message.content.trim().is_empty() {
        let placeholder = if message.is_streaming() {
            "Waiting for response..."
        } else {
            "(empty response)"
        };
        return Label::new(placeholder).text_sm().into_any_element();
    }

    if message.content.len() > MARKDOWN_SAFE_FALLBACK_THRESHOLD_BYTES {
        return Label::new(message.content.clone())
            .text_sm()
            .into_any_element();
    }

    let markdown_id = ElementId::Name(SharedString::from(format!(
        "assistant-markdown-{}",
        message.id.0
    )));
    TextView::markdown(markdown_id, message.content.clone())
        .selectable(true)
        .into_any_element()
}

/// Footer text shown under a settled assistant reply, if any.
pub fn status_caption(status: &MessageStatus) -> Option<String> {
    match status {
        MessageStatus::Error(error) => Some(format!("Error: {error}")),
        MessageStatus::Cancelled => Some("Stopped".to_string()),
        MessageStatus::Streaming(_) | MessageStatus::Done => None,
    }
}

impl Render for MessageList {
    fn render(&mut self, _window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        if self.messages.is_empty() {
            return div()
                .id("message-list")
                .size_full()
                .flex()
                .items_center()
                .justify_center()
                .child(
                    Label::new(WELCOME_TEXT)
                        .text_lg()
                        .text_color(cx.theme().muted_foreground),
                );
        }

        let rows = self
            .messages
            .iter()
            .map(|message| self.render_message_row(message, cx))
            .collect::<Vec<_>>();

        div()
            .id("message-list")
            .size_full()
            .min_h_0()
            .overflow_y_scroll()
            .track_scroll(&self.scroll_handle)
            .child(
                v_flex()
                    .w_full()
                    .max_w(CONTENT_MAX_WIDTH)
                    .mx_auto()
                    .px_4()
                    .py_3()
                    .gap_4()
                    .children(rows),
            )
    }
}
