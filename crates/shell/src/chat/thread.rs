use std::time::Duration;

use assistant_runtime::{
    ChatRuntime, EventStream, SessionId, StreamEvent, StreamHandle, StreamPayload, StreamWorker,
};
use gpui::*;
use gpui_component::{ActiveTheme, v_flex};
use gpui_tokio_bridge::Tokio;

use crate::chat::events::{Stop, Submit, stream_transition};
use crate::chat::message::{StreamTransition, Thread};
use crate::chat::{MessageInput, MessageList};

pub const STREAM_DEBOUNCE: Duration = Duration::from_millis(50);
pub const RUNTIME_UNAVAILABLE_TEXT: &str =
    "The assistant runtime is not available. Check the provider settings and restart.";

/// Content slot: one conversation thread streamed from the chat runtime.
pub struct ThreadView {
    message_list: Entity<MessageList>,
    message_input: Entity<MessageInput>,
    runtime: Option<ChatRuntime>,
    thread: Thread,
    stream_worker_task: Option<Task<Result<(), gpui_tokio_bridge::JoinError>>>,
    stream_reader_task: Option<Task<()>>,
    stream_debounce_task: Option<Task<()>>,
    pending_chunk: String,
    _subscriptions: Vec<Subscription>,
}

impl ThreadView {
    pub fn new(
        runtime: Option<ChatRuntime>,
        window: &mut Window,
        cx: &mut Context<Self>,
    ) -> Self {
        let message_list = cx.new(MessageList::new);
        let message_input = cx.new(|cx| MessageInput::new(window, cx));

        let subscriptions = vec![
            cx.subscribe(&message_input, |this, _, event: &Submit, cx| {
                this.handle_submit(event.clone(), cx);
            }),
            cx.subscribe(&message_input, |this, _, event: &Stop, cx| {
                this.handle_stop(*event, cx);
            }),
        ];

        Self {
            message_list,
            message_input,
            runtime,
            thread: Thread::new(),
            stream_worker_task: None,
            stream_reader_task: None,
            stream_debounce_task: None,
            pending_chunk: String::new(),
            _subscriptions: subscriptions,
        }
    }

    /// Swaps the runtime handle. An in-flight reply from the old handle is cancelled.
    pub fn set_runtime(&mut self, runtime: Option<ChatRuntime>, cx: &mut Context<Self>) {
        let unchanged = match (&self.runtime, &runtime) {
            (Some(current), Some(next)) => current.id() == next.id(),
            (None, None) => true,
            _ => false,
        };
        if unchanged {
            return;
        }

        self.cancel_active_stream(cx);
        self.runtime = runtime;
        cx.notify();
    }

    /// Starts a fresh thread, cancelling any in-flight reply.
    pub fn reset(&mut self, cx: &mut Context<Self>) {
        self.cancel_active_stream(cx);
        self.thread.clear();
        tracing::debug!("thread reset");
        let session = self.thread.input_session();
        self.message_input.update(cx, |input, cx| {
            input.set_session(session, cx);
        });
        self.sync_messages(cx);
        cx.notify();
    }

    fn handle_submit(&mut self, event: Submit, cx: &mut Context<Self>) {
        if !self.thread.accepts_submit(event.session) {
            tracing::debug!(session = ?event.session, "ignored submit for a stale session");
            return;
        }

        let Some(runtime) = self.runtime.clone() else {
            tracing::warn!("submit without a chat runtime");
            self.thread
                .push_notice(RUNTIME_UNAVAILABLE_TEXT, "runtime not available");
            self.sync_messages(cx);
            return;
        };

        if let Err(rejection) = self.thread.begin_reply(event.session, event.content) {
            tracing::warn!(?rejection, "submit rejected by stream state");
            return;
        }

        let session = self.thread.input_session();
        self.pending_chunk.clear();
        self.stream_debounce_task = None;
        self.message_input.update(cx, |input, cx| {
            input.set_session(session, cx);
            input.set_streaming(true, cx);
        });
        self.sync_messages(cx);

        match runtime.stream(event.session, self.thread.provider_messages()) {
            Ok(handle) => self.spawn_stream_pipeline(handle, cx),
            Err(error) => {
                tracing::error!(
                    session = ?event.session,
                    stage = error.stage(),
                    error = %error,
                    "failed to open reply stream"
                );
                self.finalize_stream(
                    StreamTransition::Fail {
                        session: event.session,
                        message: error.to_string(),
                    },
                    cx,
                );
            }
        }
    }

    fn handle_stop(&mut self, event: Stop, cx: &mut Context<Self>) {
        if self.thread.accepts_stop(event.session) {
            self.cancel_active_stream(cx);
        } else {
            tracing::debug!(session = ?event.session, "ignored stop for a settled session");
        }
    }

    fn spawn_stream_pipeline(&mut self, handle: StreamHandle, cx: &mut Context<Self>) {
        self.spawn_stream_worker(handle.worker, cx);
        self.spawn_stream_reader(handle.stream, cx);
    }

    fn spawn_stream_worker(&mut self, worker: StreamWorker, cx: &mut Context<Self>) {
        self.stream_worker_task = Some(Tokio::spawn(cx, worker));
    }

    fn spawn_stream_reader(&mut self, mut stream: EventStream, cx: &mut Context<Self>) {
        let session = stream.session();

        self.stream_reader_task = Some(cx.spawn(async move |this, cx| {
            while let Some(event) = stream.recv().await {
                let _ = this.update(cx, |this, cx| {
                    this.handle_stream_event(event, cx);
                });
            }

            let _ = this.update(cx, |this, cx| {
                this.handle_stream_reader_closed(session, cx);
            });
        }));
    }

    fn handle_stream_event(&mut self, event: StreamEvent, cx: &mut Context<Self>) {
        if !self.thread.stream_state().accepts_stream_event(event.session) {
            return;
        }

        if let StreamPayload::Delta(chunk) = &event.payload {
            self.pending_chunk.push_str(chunk);
            self.schedule_debounced_flush(cx);
            return;
        }

        self.flush_pending_chunk(cx);
        if let Some(transition) = stream_transition(&event) {
            self.finalize_stream(transition, cx);
        }
    }

    fn handle_stream_reader_closed(&mut self, session: SessionId, cx: &mut Context<Self>) {
        self.stream_worker_task = None;
        self.stream_reader_task = None;

        if self.thread.stream_state().accepts_stream_event(session) {
            self.flush_pending_chunk(cx);
            self.finalize_stream(
                StreamTransition::Fail {
                    session,
                    message: "provider stream ended before a terminal event".to_string(),
                },
                cx,
            );
        }
    }

    fn schedule_debounced_flush(&mut self, cx: &mut Context<Self>) {
        if self.stream_debounce_task.is_some() {
            return;
        }

        self.stream_debounce_task = Some(cx.spawn(async move |this, cx| {
            cx.background_executor().timer(STREAM_DEBOUNCE).await;

            let _ = this.update(cx, |this, cx| {
                this.stream_debounce_task = None;
                this.flush_pending_chunk(cx);
            });
        }));
    }

    fn flush_pending_chunk(&mut self, cx: &mut Context<Self>) {
        if self.pending_chunk.is_empty() {
            return;
        }

        let chunk = std::mem::take(&mut self.pending_chunk);
        let Some(session) = self.thread.stream_state().active_session() else {
            return;
        };

        if self.thread.append_delta(session, &chunk) {
            self.sync_messages(cx);
        }
    }

    fn cancel_active_stream(&mut self, cx: &mut Context<Self>) {
        let Some(session) = self.thread.stream_state().active_session() else {
            return;
        };

        // Dropping the reader drops the event stream, which signals the worker to stop.
        self.stream_reader_task = None;
        self.stream_worker_task = None;
        self.flush_pending_chunk(cx);
        tracing::debug!(?session, "reply cancelled");
        self.finalize_stream(StreamTransition::Cancel(session), cx);
    }

    fn finalize_stream(&mut self, transition: StreamTransition, cx: &mut Context<Self>) {
        self.pending_chunk.clear();
        self.stream_debounce_task = None;
        self.stream_worker_task = None;

        if let Err(rejection) = self.thread.finish_reply(transition) {
            tracing::debug!(?rejection, "ignored stale stream transition");
        }

        let session = self.thread.input_session();
        self.message_input.update(cx, |input, cx| {
            input.set_session(session, cx);
            input.set_streaming(false, cx);
        });
        self.sync_messages(cx);
        cx.notify();
    }

    fn sync_messages(&mut self, cx: &mut Context<Self>) {
        let messages = self.thread.messages().to_vec();
        self.message_list.update(cx, |list, cx| {
            list.set_messages(messages, cx);
        });
    }
}

impl Render for ThreadView {
    fn render(&mut self, _window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        v_flex()
            .id("thread-view")
            .size_full()
            .min_h_0()
            .overflow_hidden()
            .bg(cx.theme().background)
            .child(
                div()
                    .flex_1()
                    .min_h_0()
                    .child(self.message_list.clone()),
            )
            .child(
                div()
                    .flex_shrink_0()
                    .w_full()
                    .border_t_1()
                    .border_color(cx.theme().border)
                    .child(self.message_input.clone()),
            )
    }
}
