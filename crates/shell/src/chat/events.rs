use assistant_runtime::{SessionId, StreamEvent, StreamPayload};

use crate::chat::message::StreamTransition;

/// Emitted when the user submits a prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submit {
    pub session: SessionId,
    pub content: String,
}

impl Submit {
    pub fn new(session: SessionId, content: impl Into<String>) -> Self {
        Self {
            session,
            content: content.into(),
        }
    }
}

/// Emitted when the user cancels the in-flight reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Stop {
    pub session: SessionId,
}

/// Maps terminal stream payloads to lifecycle transitions.
///
/// Deltas return `None`: they grow the reply buffer, not the lifecycle.
pub fn stream_transition(event: &StreamEvent) -> Option<StreamTransition> {
    match &event.payload {
        StreamPayload::Delta(_) => None,
        StreamPayload::Done => Some(StreamTransition::Complete(event.session)),
        StreamPayload::Error(message) => Some(StreamTransition::Fail {
            session: event.session,
            message: message.clone(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_payloads_map_to_transitions() {
        let session = SessionId::new(3);
        let event = |payload| StreamEvent { session, payload };

        assert_eq!(
            stream_transition(&event(StreamPayload::Delta("x".into()))),
            None
        );
        assert_eq!(
            stream_transition(&event(StreamPayload::Done)),
            Some(StreamTransition::Complete(session))
        );
        assert_eq!(
            stream_transition(&event(StreamPayload::Error("rate limited".into()))),
            Some(StreamTransition::Fail {
                session,
                message: "rate limited".into(),
            })
        );
    }
}
