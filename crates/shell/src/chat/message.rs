use assistant_runtime::{ProviderMessage, Role, SessionId};

/// Stable identifier for one message in the thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(pub u64);

impl MessageId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageStatus {
    Streaming(SessionId),
    Done,
    Error(String),
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    pub content: String,
    pub status: MessageStatus,
}

impl Message {
    pub fn new(
        id: MessageId,
        role: Role,
        content: impl Into<String>,
        status: MessageStatus,
    ) -> Self {
        Self {
            id,
            role,
            content: content.into(),
            status,
        }
    }

    /// Creates an assistant placeholder while streaming.
    pub fn assistant_streaming(id: MessageId, session: SessionId) -> Self {
        Self::new(
            id,
            Role::Assistant,
            String::new(),
            MessageStatus::Streaming(session),
        )
    }

    pub fn is_streaming(&self) -> bool {
        matches!(self.status, MessageStatus::Streaming(_))
    }
}

/// Stream lifecycle of the thread's reply slot.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StreamState {
    #[default]
    Idle,
    Streaming(SessionId),
    Done(SessionId),
    Error {
        session: SessionId,
        message: String,
    },
    Cancelled(SessionId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamTransition {
    Start(SessionId),
    Complete(SessionId),
    Fail { session: SessionId, message: String },
    Cancel(SessionId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamTransitionRejection {
    AlreadyStreaming {
        active: SessionId,
        attempted: SessionId,
    },
    NoActiveStream,
    SessionMismatch {
        active: SessionId,
        attempted: SessionId,
    },
    UnexpectedSession {
        expected: SessionId,
        attempted: SessionId,
    },
}

pub type StreamTransitionResult = Result<StreamState, StreamTransitionRejection>;

impl StreamState {
    pub fn active_session(&self) -> Option<SessionId> {
        match self {
            Self::Streaming(session) => Some(*session),
            Self::Idle | Self::Done(_) | Self::Error { .. } | Self::Cancelled(_) => None,
        }
    }

    /// True when an incoming stream event belongs to the in-flight session.
    pub fn accepts_stream_event(&self, session: SessionId) -> bool {
        matches!(self, Self::Streaming(active) if *active == session)
    }

    /// Applies one transition.
    ///
    /// Any non-streaming state may start a new session. Terminal transitions must name
    /// the in-flight session exactly.
    pub fn apply(&self, transition: StreamTransition) -> StreamTransitionResult {
        match transition {
            StreamTransition::Start(session) => match self {
                Self::Streaming(active) if *active != session => {
                    Err(StreamTransitionRejection::AlreadyStreaming {
                        active: *active,
                        attempted: session,
                    })
                }
                Self::Streaming(_) => Ok(self.clone()),
                _ => Ok(Self::Streaming(session)),
            },
            StreamTransition::Complete(session) => {
                self.finish(session, || Self::Done(session))
            }
            StreamTransition::Fail { session, message } => {
                self.finish(session, || Self::Error { session, message })
            }
            StreamTransition::Cancel(session) => {
                self.finish(session, || Self::Cancelled(session))
            }
        }
    }

    fn finish(
        &self,
        session: SessionId,
        next: impl FnOnce() -> StreamState,
    ) -> StreamTransitionResult {
        match self {
            Self::Streaming(active) if *active == session => Ok(next()),
            Self::Streaming(active) => Err(StreamTransitionRejection::SessionMismatch {
                active: *active,
                attempted: session,
            }),
            Self::Idle | Self::Done(_) | Self::Error { .. } | Self::Cancelled(_) => {
                Err(StreamTransitionRejection::NoActiveStream)
            }
        }
    }
}

/// The single in-memory conversation shown in the content slot.
#[derive(Debug, Clone, PartialEq, Eq)]
///
/// The thread also owns the session handoff with the input: while a reply streams the
/// input carries the in-flight session so Stop can name it, and the next session opens
/// only after that reply settles.
pub struct Thread {
    messages: Vec<Message>,
    stream_state: StreamState,
    next_session: SessionId,
    next_message_id: u64,
}

impl Default for Thread {
    fn default() -> Self {
        Self::new()
    }
}

impl Thread {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            stream_state: StreamState::Idle,
            next_session: SessionId::new(1),
            next_message_id: 1,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn stream_state(&self) -> &StreamState {
        &self.stream_state
    }

    pub fn is_streaming(&self) -> bool {
        self.stream_state.active_session().is_some()
    }

    /// Session the input should carry: the in-flight one while a reply streams,
    /// otherwise the one the next submit opens.
    pub fn input_session(&self) -> SessionId {
        self.stream_state
            .active_session()
            .unwrap_or(self.next_session)
    }

    /// True when a submit tagged with `session` may open a reply.
    pub fn accepts_submit(&self, session: SessionId) -> bool {
        !self.is_streaming() && session == self.next_session
    }

    /// True when a Stop tagged with `session` targets the in-flight reply.
    pub fn accepts_stop(&self, session: SessionId) -> bool {
        self.stream_state.accepts_stream_event(session)
    }

    pub fn apply_stream_transition(
        &mut self,
        transition: StreamTransition,
    ) -> StreamTransitionResult {
        let next_state = self.stream_state.apply(transition)?;
        self.stream_state = next_state.clone();
        Ok(next_state)
    }

    /// Starts a reply: records the user turn and an empty streaming assistant turn.
    ///
    /// Returns the assistant message id, or the rejection when a reply is already in
    /// flight or `session` is not the one the thread expects next.
    pub fn begin_reply(
        &mut self,
        session: SessionId,
        content: impl Into<String>,
    ) -> Result<MessageId, StreamTransitionRejection> {
        if let Some(active) = self.stream_state.active_session() {
            return Err(StreamTransitionRejection::AlreadyStreaming {
                active,
                attempted: session,
            });
        }
        if session != self.next_session {
            return Err(StreamTransitionRejection::UnexpectedSession {
                expected: self.next_session,
                attempted: session,
            });
        }

        self.apply_stream_transition(StreamTransition::Start(session))?;

        let user_id = self.alloc_message_id();
        self.messages
            .push(Message::new(user_id, Role::User, content, MessageStatus::Done));

        let assistant_id = self.alloc_message_id();
        self.messages
            .push(Message::assistant_streaming(assistant_id, session));
        Ok(assistant_id)
    }

    /// Appends streamed text to the reply owned by `session`.
    pub fn append_delta(&mut self, session: SessionId, chunk: &str) -> bool {
        if !self.stream_state.accepts_stream_event(session) {
            return false;
        }

        match self.streaming_message_mut(session) {
            Some(message) => {
                message.content.push_str(chunk);
                true
            }
            None => false,
        }
    }

    /// Applies a terminal transition and stamps the reply with the matching status.
    pub fn finish_reply(
        &mut self,
        transition: StreamTransition,
    ) -> StreamTransitionResult {
        let (session, status) = match &transition {
            StreamTransition::Complete(session) => (*session, MessageStatus::Done),
            StreamTransition::Fail { session, message } => {
                (*session, MessageStatus::Error(message.clone()))
            }
            StreamTransition::Cancel(session) => (*session, MessageStatus::Cancelled),
            StreamTransition::Start(_) => {
                return self.apply_stream_transition(transition);
            }
        };

        let next_state = self.apply_stream_transition(transition)?;
        if let Some(message) = self.streaming_message_mut(session) {
            message.status = status;
        }
        self.next_session = session.next();
        Ok(next_state)
    }

    /// Appends an assistant-side notice that is not tied to any stream.
    pub fn push_notice(&mut self, text: impl Into<String>, reason: impl Into<String>) {
        let id = self.alloc_message_id();
        self.messages.push(Message::new(
            id,
            Role::Assistant,
            text,
            MessageStatus::Error(reason.into()),
        ));
    }

    /// Settled, non-empty turns in provider form.
    pub fn provider_messages(&self) -> Vec<ProviderMessage> {
        self.messages
            .iter()
            .filter(|message| !message.content.trim().is_empty())
            .filter(|message| matches!(message.status, MessageStatus::Done))
            .map(|message| ProviderMessage::new(message.role, message.content.clone()))
            .collect()
    }

    /// Drops every message. An in-flight session is retired so its late events stay
    /// stale.
    pub fn clear(&mut self) {
        if let Some(active) = self.stream_state.active_session() {
            self.next_session = active.next();
        }
        self.messages.clear();
        self.stream_state = StreamState::Idle;
    }

    fn streaming_message_mut(&mut self, session: SessionId) -> Option<&mut Message> {
        self.messages
            .iter_mut()
            .rev()
            .find(|message| message.status == MessageStatus::Streaming(session))
    }

    fn alloc_message_id(&mut self) -> MessageId {
        let id = MessageId::new(self.next_message_id);
        self.next_message_id = self.next_message_id.saturating_add(1);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIRST: SessionId = SessionId::new(1);
    const SECOND: SessionId = SessionId::new(2);

    #[test]
    fn start_is_idempotent_for_the_same_session_and_rejects_others() {
        let streaming = StreamState::Idle
            .apply(StreamTransition::Start(FIRST))
            .expect("idle can start");

        assert_eq!(
            streaming.apply(StreamTransition::Start(FIRST)),
            Ok(StreamState::Streaming(FIRST))
        );
        assert_eq!(
            streaming.apply(StreamTransition::Start(SECOND)),
            Err(StreamTransitionRejection::AlreadyStreaming {
                active: FIRST,
                attempted: SECOND,
            })
        );
    }

    #[test]
    fn terminal_transitions_require_the_active_session() {
        let streaming = StreamState::Streaming(SECOND);

        assert_eq!(
            streaming.apply(StreamTransition::Complete(FIRST)),
            Err(StreamTransitionRejection::SessionMismatch {
                active: SECOND,
                attempted: FIRST,
            })
        );
        assert_eq!(
            StreamState::Done(FIRST).apply(StreamTransition::Cancel(FIRST)),
            Err(StreamTransitionRejection::NoActiveStream)
        );
        assert_eq!(
            streaming.apply(StreamTransition::Fail {
                session: SECOND,
                message: "boom".into(),
            }),
            Ok(StreamState::Error {
                session: SECOND,
                message: "boom".into(),
            })
        );
    }

    #[test]
    fn stale_session_deltas_are_rejected() {
        let mut thread = Thread::new();
        thread.begin_reply(FIRST, "hello").expect("start first");
        thread
            .finish_reply(StreamTransition::Cancel(FIRST))
            .expect("cancel first");
        let reply = thread.begin_reply(SECOND, "again").expect("start second");

        assert!(!thread.append_delta(FIRST, "late chunk"));
        assert!(thread.append_delta(SECOND, "fresh"));

        let reply = thread
            .messages()
            .iter()
            .find(|message| message.id == reply)
            .expect("reply present");
        assert_eq!(reply.content, "fresh");
        assert!(!thread.messages().iter().any(|m| m.content.contains("late")));
    }

    #[test]
    fn finishing_stamps_the_reply_status() {
        let mut thread = Thread::new();
        thread.begin_reply(FIRST, "hi").expect("start");
        thread.append_delta(FIRST, "hello there");

        thread
            .finish_reply(StreamTransition::Complete(FIRST))
            .expect("complete");

        assert_eq!(thread.stream_state(), &StreamState::Done(FIRST));
        assert_eq!(thread.messages()[1].status, MessageStatus::Done);
        assert!(!thread.is_streaming());
    }

    #[test]
    fn provider_messages_skip_unsettled_and_blank_turns() {
        let mut thread = Thread::new();
        thread.begin_reply(FIRST, "first question").expect("start");
        thread.append_delta(FIRST, "first answer");
        thread
            .finish_reply(StreamTransition::Complete(FIRST))
            .expect("complete");
        thread.push_notice("runtime unavailable", "no runtime");
        thread.begin_reply(SECOND, "second question").expect("start");

        let messages = thread.provider_messages();
        let contents = messages
            .iter()
            .map(|message| message.content.as_str())
            .collect::<Vec<_>>();

        assert_eq!(
            contents,
            ["first question", "first answer", "second question"]
        );
        assert_eq!(messages[1].role, Role::Assistant);
    }

    #[test]
    fn clear_resets_messages_and_stream_state() {
        let mut thread = Thread::new();
        thread.begin_reply(FIRST, "hi").expect("start");

        thread.clear();

        assert!(thread.messages().is_empty());
        assert_eq!(thread.stream_state(), &StreamState::Idle);
        assert_eq!(thread.input_session(), SECOND);
        assert!(thread.begin_reply(SECOND, "fresh start").is_ok());
    }

    #[test]
    fn input_keeps_the_active_session_until_the_reply_settles() {
        let mut thread = Thread::new();
        assert_eq!(thread.input_session(), FIRST);
        assert!(thread.accepts_submit(FIRST));

        thread.begin_reply(FIRST, "hello").expect("start first");

        // Stop from the input names the in-flight session.
        assert_eq!(thread.input_session(), FIRST);
        assert!(thread.accepts_stop(thread.input_session()));
        assert!(!thread.accepts_submit(FIRST));
        assert!(!thread.accepts_submit(SECOND));

        thread
            .finish_reply(StreamTransition::Cancel(FIRST))
            .expect("stop cancels the in-flight reply");
        assert_eq!(thread.messages()[1].status, MessageStatus::Cancelled);

        assert_eq!(thread.input_session(), SECOND);
        assert!(!thread.accepts_stop(FIRST));
        assert!(thread.accepts_submit(SECOND));
        assert_eq!(
            thread.begin_reply(FIRST, "replayed"),
            Err(StreamTransitionRejection::UnexpectedSession {
                expected: SECOND,
                attempted: FIRST,
            })
        );
        assert!(thread.begin_reply(SECOND, "again").is_ok());
        assert!(thread.accepts_stop(SECOND));
    }

    #[test]
    fn a_second_submit_while_streaming_is_rejected() {
        let mut thread = Thread::new();
        thread.begin_reply(FIRST, "hello").expect("start first");

        assert_eq!(
            thread.begin_reply(FIRST, "again"),
            Err(StreamTransitionRejection::AlreadyStreaming {
                active: FIRST,
                attempted: FIRST,
            })
        );
        assert_eq!(thread.messages().len(), 2);
    }
}
